// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

#[cfg(test)]
#[path = "./mapper_test.rs"]
mod tests;

use crate::bean::{BeanDescriptor, BeanDescriptorManager, BeanType};
use crate::config::CodecOptions;
use crate::declared::DeclaredType;
use crate::error::Result;
use crate::registry::SchemaBuilder;
use crate::root::{RootDeserializer, RootSerializer};
use crate::schema::ProtoSchema;
use dashmap::DashMap;
use std::sync::Arc;

/// State shared by a mapper and every serializer it creates.
#[derive(Debug)]
pub(crate) struct Shared {
  pub(crate) proto: Arc<ProtoSchema>,
  pub(crate) beans: BeanDescriptorManager,
  pub(crate) options: CodecOptions,
}

//
// ProtoMapper
//

/// Entry point of the codec. Cloning is cheap and clones share their caches.
#[derive(Clone, Debug)]
pub struct ProtoMapper {
  shared: Arc<Shared>,
  serializers: Arc<DashMap<String, Arc<RootSerializer>>>,
}

impl ProtoMapper {
  #[must_use]
  pub fn new(proto: ProtoSchema) -> Self {
    Self::with_options(proto, CodecOptions::default())
  }

  #[must_use]
  pub fn with_options(proto: ProtoSchema, options: CodecOptions) -> Self {
    Self {
      shared: Arc::new(Shared {
        proto: Arc::new(proto),
        beans: BeanDescriptorManager::new(),
        options,
      }),
      serializers: Arc::new(DashMap::new()),
    }
  }

  #[must_use]
  pub fn proto(&self) -> &ProtoSchema {
    &self.shared.proto
  }

  #[must_use]
  pub fn options(&self) -> &CodecOptions {
    &self.shared.options
  }

  /// The cached property table of a bean type.
  #[must_use]
  pub fn bean_descriptor(&self, bean_type: BeanType) -> Arc<BeanDescriptor> {
    self.shared.beans.get_or_create(bean_type)
  }

  /// Returns the serializer of `message`, creating it on first use. Every later call for the
  /// same message returns the same instance.
  pub fn find_root_serializer(&self, message: &str) -> Result<Arc<RootSerializer>> {
    let full_name = &self.shared.proto.message(message)?.full_name;
    if let Some(serializer) = self.serializers.get(full_name) {
      return Ok(serializer.clone());
    }

    let serializer = Arc::new(self.create_root_serializer(message)?);
    Ok(
      self
        .serializers
        .entry(full_name.clone())
        .or_insert(serializer)
        .clone(),
    )
  }

  pub fn create_root_serializer(&self, message: &str) -> Result<RootSerializer> {
    RootSerializer::new(self.shared.clone(), message, false)
  }

  /// Serializer for a wrapper message: the root value is written as its single field.
  pub fn create_wrapped_root_serializer(&self, message: &str) -> Result<RootSerializer> {
    RootSerializer::new(self.shared.clone(), message, true)
  }

  /// Deserializer producing values of `target`: a bean type, or a record for anything generic.
  pub fn create_root_deserializer(
    &self,
    message: &str,
    target: DeclaredType,
  ) -> Result<RootDeserializer> {
    let proto_message = self.shared.proto.message(message)?;
    let schema = SchemaBuilder::new(&self.shared.proto, &self.shared.beans)
      .message_schema(proto_message, target.bean_type())?;
    Ok(RootDeserializer::new(self.shared.clone(), schema, target, false))
  }

  /// Deserializer for a wrapper message, producing the value of its single field as `target`.
  pub fn create_wrapped_root_deserializer(
    &self,
    message: &str,
    target: DeclaredType,
  ) -> Result<RootDeserializer> {
    let proto_message = self.shared.proto.message(message)?;
    let schema = SchemaBuilder::new(&self.shared.proto, &self.shared.beans)
      .wrapper_schema(proto_message, &target)?;
    Ok(RootDeserializer::new(self.shared.clone(), schema, target, true))
  }
}
