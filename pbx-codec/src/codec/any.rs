// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

//! `google.protobuf.Any` fields.
//!
//! An `Any` holds a type URL (field 1) and the serialized bytes of the packed message (field 2).
//! The packed type is only known at runtime, so schemas are resolved per type name against the
//! mapper's proto schema and cached by the codec.
//!
//! In memory a packed message is a [`Record`] whose `@type` entry names the message, or a bean
//! whose type name is the name of a message in the schema.

#[cfg(test)]
#[path = "./any_test.rs"]
mod tests;

use super::FieldInfo;
use super::message::MessageSchema;
use crate::bean::{BeanDescriptorManager, BeanType};
use crate::error::Result;
use crate::registry::SchemaBuilder;
use crate::schema::{ANY_MESSAGE, MessageDef, ProtoSchema};
use crate::value::{Record, Value};
use crate::wire::{ProtoInput, ProtoOutput};
use dashmap::DashMap;
use protobuf::rt::WireType;
use std::any::TypeId;
use std::sync::Arc;

/// Prefix of the type URLs written for packed messages.
pub const TYPE_URL_PREFIX: &str = "type.googleapis.com/";

/// Record entry naming the message a packed record holds.
pub const TYPE_KEY: &str = "@type";

const TYPE_URL_FIELD: u32 = 1;
const VALUE_FIELD: u32 = 2;

type Packed = (Arc<MessageDef>, Arc<MessageSchema>);

#[derive(Debug)]
pub struct AnyCodec {
  proto: Arc<ProtoSchema>,
  record_schemas: DashMap<String, Packed>,
  bean_schemas: DashMap<TypeId, Packed>,
}

impl AnyCodec {
  #[must_use]
  pub fn new(proto: Arc<ProtoSchema>) -> Self {
    Self {
      proto,
      record_schemas: DashMap::new(),
      bean_schemas: DashMap::new(),
    }
  }

  /// Writes `value` as a length-delimited `Any` field.
  pub fn write_field(&self, field: &FieldInfo, value: &Value, out: &mut ProtoOutput<'_>) -> Result<()> {
    let (message, schema) = match value {
      Value::Record(record) => match record.get(TYPE_KEY) {
        Some(Value::String(type_name)) => self.record_schema(type_name)?,
        Some(other) => {
          return Err(field.unsupported(other, format!("{ANY_MESSAGE} {TYPE_KEY}")));
        },
        None if record.is_empty() => {
          return out.write_length_delimited(field.number, |_| Ok(()));
        },
        None => {
          return Err(field.unsupported(value, format!("{ANY_MESSAGE} without {TYPE_KEY}")));
        },
      },
      Value::Bean(bean) => self.bean_schema(bean.bean_type(), out.beans())?,
      other => return Err(field.unsupported(other, ANY_MESSAGE)),
    };

    let type_url = format!("{TYPE_URL_PREFIX}{}", message.full_name);
    out.write_length_delimited(field.number, |out| {
      out.write_tag(TYPE_URL_FIELD, WireType::LengthDelimited)?;
      out.stream().write_string_no_tag(&type_url)?;
      out.write_length_delimited(VALUE_FIELD, |out| schema.write_value(value, out))
    })
  }

  /// Reads a length-delimited `Any` and unpacks the message it holds into a record.
  pub fn read(&self, field: &FieldInfo, input: &mut ProtoInput<'_>) -> Result<Value> {
    let (type_url, payload) = input.read_nested(|input| {
      let mut type_url = String::new();
      let mut payload = Vec::new();
      let mut number = input.read_field_number()?;
      while number != 0 {
        match (number, input.last_wire_type()?) {
          (TYPE_URL_FIELD, WireType::LengthDelimited) => type_url = input.stream().read_string()?,
          (VALUE_FIELD, WireType::LengthDelimited) => payload = input.stream().read_bytes()?,
          (_, wire_type) => input.skip_field(wire_type)?,
        }
        number = input.read_field_number()?;
      }
      Ok((type_url, payload))
    })?;

    if type_url.is_empty() && payload.is_empty() {
      return Ok(Value::Record(Record::new()));
    }
    let Some((_, type_name)) = type_url.rsplit_once('/') else {
      return Err(field.unsupported(&Value::String(type_url.clone()), ANY_MESSAGE));
    };

    let (message, schema) = self.record_schema(type_name)?;
    let mut record = input.read_detached(&payload, |input| schema.read_fields(input))?;
    record.insert(TYPE_KEY.to_string(), Value::String(message.full_name.clone()));
    Ok(Value::Record(record))
  }

  fn record_schema(&self, type_name: &str) -> Result<Packed> {
    let message = self.proto.message(type_name)?;
    if let Some(packed) = self.record_schemas.get(&message.full_name) {
      return Ok(packed.clone());
    }

    // Record schemas never consult bean descriptors.
    let beans = BeanDescriptorManager::new();
    let schema = SchemaBuilder::new(&self.proto, &beans).message_schema(message, None)?;
    Ok(
      self
        .record_schemas
        .entry(message.full_name.clone())
        .or_insert_with(|| (message.clone(), schema))
        .clone(),
    )
  }

  fn bean_schema(&self, bean_type: BeanType, beans: &BeanDescriptorManager) -> Result<Packed> {
    if let Some(packed) = self.bean_schemas.get(&bean_type.id()) {
      return Ok(packed.clone());
    }

    let message = self.proto.message(simple_name(bean_type.name()))?;
    let schema = SchemaBuilder::new(&self.proto, beans).message_schema(message, Some(bean_type))?;
    log::debug!("packing {} as {}", bean_type.name(), message.full_name);
    Ok(
      self
        .bean_schemas
        .entry(bean_type.id())
        .or_insert_with(|| (message.clone(), schema))
        .clone(),
    )
  }
}

/// `a::b::User<T>` is packed as message `User`.
fn simple_name(type_name: &str) -> &str {
  let path = type_name.split('<').next().unwrap_or(type_name);
  path.rsplit("::").next().unwrap_or(path)
}
