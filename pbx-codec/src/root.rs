// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

//! Root serializers and deserializers: whole messages to and from bytes.

#[cfg(test)]
#[path = "./root_test.rs"]
mod tests;

use crate::bean::{BeanType, ProtoBean};
use crate::codec::FieldDescriptor;
use crate::codec::message::MessageSchema;
use crate::convert::{convert_message, convert_value, need_convert};
use crate::declared::DeclaredType;
use crate::error::{Error, Result};
use crate::mapper::Shared;
use crate::registry::SchemaBuilder;
use crate::schema::MessageDef;
use crate::value::Value;
use crate::wire::{ProtoInput, ProtoOutput};
use dashmap::DashMap;
use std::any::TypeId;
use std::sync::Arc;

fn wrapped_field(schema: &MessageSchema) -> Result<&FieldDescriptor> {
  schema.fields().first().ok_or_else(|| {
    Error::InvalidSchema(format!(
      "wrapper message {} has no field",
      schema.message().full_name
    ))
  })
}

//
// RootSerializer
//

/// Serializes records and beans as one root message. Bean schemas are built once per bean type
/// and reused by every later call.
#[derive(Debug)]
pub struct RootSerializer {
  shared: Arc<Shared>,
  message: Arc<MessageDef>,
  record_schema: Arc<MessageSchema>,
  bean_schemas: DashMap<TypeId, Arc<MessageSchema>>,
  wrapped: bool,
}

impl RootSerializer {
  pub(crate) fn new(shared: Arc<Shared>, message: &str, wrapped: bool) -> Result<Self> {
    let message = shared.proto.message(message)?.clone();
    let mut builder = SchemaBuilder::new(&shared.proto, &shared.beans);
    let record_schema = if wrapped {
      builder.wrapper_schema(&message, &DeclaredType::Any)?
    } else {
      builder.message_schema(&message, None)?
    };
    Ok(Self {
      shared,
      message,
      record_schema,
      bean_schemas: DashMap::new(),
      wrapped,
    })
  }

  #[must_use]
  pub fn message(&self) -> &MessageDef {
    &self.message
  }

  /// Serializes `value`. Null serializes to no bytes, as does a message whose fields all hold
  /// their defaults. A wrapped serializer accepts any value its field can hold.
  pub fn serialize(&self, value: &Value) -> Result<Vec<u8>> {
    if self.wrapped {
      let field = wrapped_field(&self.record_schema)?;
      return self.encode(|out| field.write(value, out));
    }

    match value {
      Value::Null => Ok(Vec::new()),
      Value::Record(record) => self.encode(|out| self.record_schema.write_record(record, out)),
      Value::Bean(bean) => {
        let schema = self.bean_schema(bean.bean_type())?;
        self.encode(|out| schema.write_bean(bean.as_ref(), out))
      },
      other => Err(Error::UnsupportedConversion {
        field: self.message.full_name.clone(),
        source_type: other.type_name(),
        target: format!("message {}", self.message.full_name),
      }),
    }
  }

  pub fn serialize_bean<T: ProtoBean>(&self, bean: &T) -> Result<Vec<u8>> {
    if self.wrapped {
      return self.serialize(&Value::bean(bean.clone()));
    }
    let schema = self.bean_schema(BeanType::of::<T>())?;
    self.encode(|out| schema.write_bean(bean, out))
  }

  fn bean_schema(&self, bean_type: BeanType) -> Result<Arc<MessageSchema>> {
    if let Some(schema) = self.bean_schemas.get(&bean_type.id()) {
      return Ok(schema.clone());
    }

    let schema = SchemaBuilder::new(&self.shared.proto, &self.shared.beans)
      .message_schema(&self.message, Some(bean_type))?;
    Ok(
      self
        .bean_schemas
        .entry(bean_type.id())
        .or_insert(schema)
        .clone(),
    )
  }

  fn encode(&self, write: impl FnOnce(&mut ProtoOutput<'_>) -> Result<()>) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    {
      let mut out = ProtoOutput::new(&mut bytes, &self.shared.beans, &self.shared.options);
      write(&mut out)?;
      out.flush()?;
    }
    log::trace!(
      "serialized {} into {} bytes",
      self.message.full_name,
      bytes.len()
    );
    Ok(bytes)
  }
}

//
// RootDeserializer
//

/// Deserializes one root message into a declared target type.
#[derive(Debug)]
pub struct RootDeserializer {
  shared: Arc<Shared>,
  schema: Arc<MessageSchema>,
  target: DeclaredType,
  wrapped: bool,
}

impl RootDeserializer {
  pub(crate) const fn new(
    shared: Arc<Shared>,
    schema: Arc<MessageSchema>,
    target: DeclaredType,
    wrapped: bool,
  ) -> Self {
    Self {
      shared,
      schema,
      target,
      wrapped,
    }
  }

  #[must_use]
  pub const fn target(&self) -> &DeclaredType {
    &self.target
  }

  #[must_use]
  pub const fn schema(&self) -> &Arc<MessageSchema> {
    &self.schema
  }

  /// Decodes `bytes` into the intermediate form: a record of the message's fields, or the
  /// value of the wrapped field (null when absent). No conversion to the target is done.
  pub fn deserialize(&self, bytes: &[u8]) -> Result<Value> {
    let mut input = ProtoInput::new(bytes, &self.shared.options);
    let mut record = self.schema.read_fields(&mut input)?;
    log::trace!(
      "deserialized {} fields of {} from {} bytes",
      record.len(),
      self.schema.message().full_name,
      bytes.len()
    );

    if self.wrapped {
      let field = wrapped_field(&self.schema)?;
      return Ok(record.remove(&field.info.name).unwrap_or(Value::Null));
    }
    Ok(Value::Record(record))
  }

  /// Decodes `bytes` and converts the result into the target type.
  pub fn deserialize_target(&self, bytes: &[u8]) -> Result<Value> {
    let value = self.deserialize(bytes)?;
    self.convert(value)
  }

  pub fn deserialize_as<T: ProtoBean>(&self, bytes: &[u8]) -> Result<T> {
    self.deserialize_target(bytes)?.into_bean()
  }

  /// Converts an intermediate value produced by [`Self::deserialize`] into the target type.
  pub fn convert(&self, value: Value) -> Result<Value> {
    if value.is_null() {
      return Ok(match &self.target {
        DeclaredType::Scalar(kind) => kind.default_value(),
        _ => Value::Null,
      });
    }
    if !need_convert(&value, &self.target) {
      return Ok(value);
    }

    if self.wrapped {
      return convert_value(wrapped_field(&self.schema)?, value, &self.target);
    }
    match value {
      Value::Record(record) if self.schema.bean().is_some() => {
        convert_message(&self.schema, record)
      },
      other => Err(Error::UnsupportedConversion {
        field: self.schema.message().full_name.clone(),
        source_type: other.type_name(),
        target: self.target.to_string(),
      }),
    }
  }
}
