// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

//! Schema driven protobuf wire codec.
//!
//! Messages are described at runtime by a [`schema::ProtoSchema`] and application objects are
//! described by [`bean::ProtoBean`] property tables, so no generated message code is required.
//! [`mapper::ProtoMapper`] is the entry point: it hands out [`root::RootSerializer`] and
//! [`root::RootDeserializer`] instances bound to one root message.

pub mod bean;
pub mod codec;
pub mod config;
pub mod convert;
pub mod declared;
pub mod error;
pub mod mapper;
mod registry;
pub mod root;
pub mod schema;
pub mod value;
pub mod wire;

#[cfg(test)]
mod test_models;

pub use bean::{BeanType, DynBean, PropertiesBuilder, ProtoBean};
pub use config::CodecOptions;
pub use declared::{DeclaredType, EnumType, ScalarKind};
pub use error::{Error, Result};
pub use mapper::ProtoMapper;
pub use root::{RootDeserializer, RootSerializer};
pub use schema::ProtoSchema;
pub use value::{FromValue, PrimitiveArray, Record, Value};

#[cfg(test)]
#[ctor::ctor]
fn test_global_init() {
  pbx_test_helpers::test_global_init();
}
