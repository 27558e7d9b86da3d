// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

//! Builds message schemas: binds every proto field to a bean property and selects its codec.

#[cfg(test)]
#[path = "./registry_test.rs"]
mod tests;

use crate::bean::{BeanDescriptor, BeanDescriptorManager, BeanType, PropertyDescriptor};
use crate::codec::any::AnyCodec;
use crate::codec::enumeration::EnumCodec;
use crate::codec::map::MapCodec;
use crate::codec::message::MessageSchema;
use crate::codec::repeated::repeated_scalar_codec;
use crate::codec::scalar::scalar_codec;
use crate::codec::{FieldCodec, FieldDescriptor, FieldInfo, Representation};
use crate::declared::DeclaredType;
use crate::error::{Error, Result};
use crate::schema::validation::validate_field_type;
use crate::schema::{ANY_MESSAGE, FieldDef, FieldType, MessageDef, ProtoSchema};
use itertools::Itertools;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ShapeKey {
  Record,
  Bean(TypeId),
}

/// Builds the schemas reachable from one root. Schemas created during one build are shared by
/// every field referring to the same (message, shape) pair, which is what terminates recursive
/// messages.
pub(crate) struct SchemaBuilder<'a> {
  proto: &'a Arc<ProtoSchema>,
  beans: &'a BeanDescriptorManager,
  created: HashMap<(String, ShapeKey), Arc<MessageSchema>>,
  any: Option<Arc<AnyCodec>>,
}

impl<'a> SchemaBuilder<'a> {
  pub(crate) fn new(proto: &'a Arc<ProtoSchema>, beans: &'a BeanDescriptorManager) -> Self {
    Self {
      proto,
      beans,
      created: HashMap::new(),
      any: None,
    }
  }

  /// Schema of `message` bound to `bean`, or to generic records when `bean` is `None`.
  pub(crate) fn message_schema(
    &mut self,
    message: &Arc<MessageDef>,
    bean: Option<BeanType>,
  ) -> Result<Arc<MessageSchema>> {
    let key = (
      message.full_name.clone(),
      bean.map_or(ShapeKey::Record, |bean| ShapeKey::Bean(bean.id())),
    );
    if let Some(schema) = self.created.get(&key) {
      return Ok(schema.clone());
    }

    let descriptor = bean.map(|bean| self.beans.get_or_create(bean));
    let schema = Arc::new(MessageSchema::new(message.clone(), descriptor.clone()));
    self.created.insert(key, schema.clone());

    let fields = match descriptor.as_deref() {
      Some(descriptor) => self.bind_bean_fields(message, descriptor)?,
      None => message
        .fields
        .iter()
        .map(|field| self.bind(message, field, DeclaredType::Any, None, true))
        .collect::<Result<_>>()?,
    };
    schema.set_fields(fields);
    Ok(schema)
  }

  /// Schema of a wrapper message: a message with a single field carrying a non message root
  /// value of type `declared`.
  pub(crate) fn wrapper_schema(
    &mut self,
    message: &Arc<MessageDef>,
    declared: &DeclaredType,
  ) -> Result<Arc<MessageSchema>> {
    let [field] = message.fields.as_slice() else {
      return Err(Error::InvalidSchema(format!(
        "wrapper message {} must have exactly one field",
        message.full_name
      )));
    };

    let schema = Arc::new(MessageSchema::new(message.clone(), None));
    let descriptor = self.bind(message, field, declared.clone(), None, true)?;
    schema.set_fields(vec![descriptor]);
    Ok(schema)
  }

  fn bind_bean_fields(
    &mut self,
    message: &MessageDef,
    bean: &BeanDescriptor,
  ) -> Result<Vec<FieldDescriptor>> {
    let unmatched = bean
      .properties()
      .iter()
      .filter(|property| message.field_by_name(property.name()).is_none())
      .map(|property| property.name())
      .join(", ");
    if !unmatched.is_empty() {
      log::debug!(
        "properties of {} without a field in proto message {}, ignored: {unmatched}",
        bean.bean_type().name(),
        message.full_name
      );
    }

    message
      .fields
      .iter()
      .map(|field| match bean.property(&field.name) {
        Some(property) => self.bind(
          message,
          field,
          property.declared().clone(),
          Some(property.clone()),
          property.is_writable(),
        ),
        None => {
          log::debug!(
            "proto field {}.{} has no property in {}",
            message.full_name,
            field.name,
            bean.bean_type().name()
          );
          self.bind(message, field, DeclaredType::Any, None, false)
        },
      })
      .collect()
  }

  fn bind(
    &mut self,
    message: &MessageDef,
    field: &FieldDef,
    declared: DeclaredType,
    property: Option<Arc<PropertyDescriptor>>,
    keep_decoded: bool,
  ) -> Result<FieldDescriptor> {
    let info = FieldInfo::new(&message.full_name, field);
    validate_field_type(field, &declared).into_result(&info.qualified)?;
    let codec = self.select_codec(field, &info, &declared)?;
    Ok(FieldDescriptor {
      info,
      declared,
      property,
      codec,
      keep_decoded,
    })
  }

  /// Picks the strategy for a field. Repeated fields get the representation implied by the
  /// declared type, fixed here for the lifetime of the schema.
  fn select_codec(
    &mut self,
    field: &FieldDef,
    info: &FieldInfo,
    declared: &DeclaredType,
  ) -> Result<FieldCodec> {
    let repr = Representation::for_declared(declared);
    Ok(match &field.field_type {
      FieldType::Scalar(scalar) if field.repeated => FieldCodec::RepeatedScalar {
        codec: repeated_scalar_codec(*scalar, field.packed),
        repr,
      },
      FieldType::Scalar(scalar) => FieldCodec::Scalar(scalar_codec(*scalar)),
      FieldType::Enum(name) => {
        let codec = EnumCodec::new(self.proto.enum_def(name)?.clone());
        if field.repeated {
          FieldCodec::RepeatedEnum { codec, repr }
        } else {
          FieldCodec::Enum(codec)
        }
      },
      FieldType::Message(name) if name == ANY_MESSAGE => {
        let codec = self
          .any
          .get_or_insert_with(|| Arc::new(AnyCodec::new(self.proto.clone())))
          .clone();
        if field.repeated {
          FieldCodec::RepeatedAny { codec, repr }
        } else {
          FieldCodec::Any(codec)
        }
      },
      FieldType::Message(name) => {
        let message = self.proto.message(name)?.clone();
        let element = if field.repeated {
          declared.element()
        } else {
          Some(declared)
        };
        let schema = self.message_schema(&message, element.and_then(DeclaredType::bean_type))?;
        if field.repeated {
          FieldCodec::RepeatedMessage { schema, repr }
        } else {
          FieldCodec::Message(schema)
        }
      },
      FieldType::Map { key, value } => {
        let value_declared = declared.element().cloned().unwrap_or(DeclaredType::Any);
        let value_def = FieldDef::new("value", 2, (**value).clone());
        let value_codec = self.select_codec(&value_def, info, &value_declared)?;
        FieldCodec::Map(Box::new(MapCodec::new(
          info,
          scalar_codec(*key),
          value_codec,
          value.wire_type(),
        )))
      },
    })
  }
}
