// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

//! Conversion from compiled descriptors into a [`ProtoSchema`].

use super::{EnumDef, FieldDef, FieldType, MessageDef, ProtoSchema, ProtoSchemaBuilder, ScalarType};
use crate::error::{Error, Result};
use protobuf::descriptor::field_descriptor_proto::{Label, Type};
use protobuf::descriptor::{
  DescriptorProto,
  EnumDescriptorProto,
  FieldDescriptorProto,
  FileDescriptorProto,
};
use std::collections::HashMap;

struct MapEntry {
  key: ScalarType,
  value: FieldType,
}

struct Conversion {
  proto3: bool,
  map_entries: HashMap<String, MapEntry>,
}

impl ProtoSchema {
  /// Builds a schema from a compiled file descriptor. Map entry messages are folded into the
  /// map fields that use them.
  pub fn from_file_descriptor_proto(file: &FileDescriptorProto) -> Result<Self> {
    let package = file.package();
    let mut conversion = Conversion {
      proto3: file.syntax() == "proto3",
      map_entries: HashMap::new(),
    };
    for message in &file.message_type {
      conversion.collect_map_entries(message, package)?;
    }

    let mut builder = Self::builder(package);
    for enum_type in &file.enum_type {
      builder = builder.enumeration(convert_enum(enum_type, package));
    }
    for message in &file.message_type {
      builder = conversion.convert_message(builder, message, package)?;
    }
    builder.build()
  }
}

fn qualified(scope: &str, name: &str) -> String {
  if scope.is_empty() {
    name.to_string()
  } else {
    format!("{scope}.{name}")
  }
}

fn is_map_entry(message: &DescriptorProto) -> bool {
  message
    .options
    .as_ref()
    .and_then(|options| options.map_entry)
    .unwrap_or(false)
}

fn convert_enum(enum_type: &EnumDescriptorProto, scope: &str) -> EnumDef {
  EnumDef::new(
    enum_type.name(),
    enum_type.value.iter().map(|v| (v.name(), v.number())),
  )
  .with_full_name(&qualified(scope, enum_type.name()))
}

fn scalar_type(field_type: Type) -> Option<ScalarType> {
  Some(match field_type {
    Type::TYPE_DOUBLE => ScalarType::Double,
    Type::TYPE_FLOAT => ScalarType::Float,
    Type::TYPE_INT64 => ScalarType::Int64,
    Type::TYPE_UINT64 => ScalarType::UInt64,
    Type::TYPE_INT32 => ScalarType::Int32,
    Type::TYPE_FIXED64 => ScalarType::Fixed64,
    Type::TYPE_FIXED32 => ScalarType::Fixed32,
    Type::TYPE_BOOL => ScalarType::Bool,
    Type::TYPE_STRING => ScalarType::String,
    Type::TYPE_BYTES => ScalarType::Bytes,
    Type::TYPE_UINT32 => ScalarType::UInt32,
    Type::TYPE_SFIXED32 => ScalarType::SFixed32,
    Type::TYPE_SFIXED64 => ScalarType::SFixed64,
    Type::TYPE_SINT32 => ScalarType::SInt32,
    Type::TYPE_SINT64 => ScalarType::SInt64,
    Type::TYPE_ENUM | Type::TYPE_MESSAGE | Type::TYPE_GROUP => return None,
  })
}

fn field_type(field: &FieldDescriptorProto, scope: &str) -> Result<FieldType> {
  let type_name = field.type_name().trim_start_matches('.').to_string();
  match field.type_() {
    Type::TYPE_ENUM => Ok(FieldType::Enum(type_name)),
    Type::TYPE_MESSAGE => Ok(FieldType::Message(type_name)),
    Type::TYPE_GROUP => Err(Error::InvalidSchema(format!(
      "field {}: groups are not supported",
      qualified(scope, field.name())
    ))),
    other => scalar_type(other).map(FieldType::Scalar).ok_or_else(|| {
      Error::InvalidSchema(format!("field {}: unknown type", qualified(scope, field.name())))
    }),
  }
}

impl Conversion {
  fn collect_map_entries(&mut self, message: &DescriptorProto, scope: &str) -> Result<()> {
    let full_name = qualified(scope, message.name());
    if is_map_entry(message) {
      let key = message
        .field
        .iter()
        .find(|f| f.number() == 1)
        .and_then(|f| scalar_type(f.type_()));
      let value = message.field.iter().find(|f| f.number() == 2);
      let (Some(key), Some(value)) = (key, value) else {
        return Err(Error::InvalidSchema(format!(
          "map entry {full_name} has no key or value"
        )));
      };
      let value = field_type(value, &full_name)?;
      self.map_entries.insert(full_name, MapEntry { key, value });
      return Ok(());
    }

    for nested in &message.nested_type {
      self.collect_map_entries(nested, &full_name)?;
    }
    Ok(())
  }

  fn convert_message(
    &self,
    mut builder: ProtoSchemaBuilder,
    message: &DescriptorProto,
    scope: &str,
  ) -> Result<ProtoSchemaBuilder> {
    if is_map_entry(message) {
      return Ok(builder);
    }

    let full_name = qualified(scope, message.name());
    for enum_type in &message.enum_type {
      builder = builder.enumeration(convert_enum(enum_type, &full_name));
    }
    for nested in &message.nested_type {
      builder = self.convert_message(builder, nested, &full_name)?;
    }

    let mut def = MessageDef::new(message.name()).with_full_name(&full_name);
    for field in &message.field {
      def = def.field(self.convert_field(field, &full_name)?);
    }
    Ok(builder.message(def))
  }

  fn convert_field(&self, field: &FieldDescriptorProto, scope: &str) -> Result<FieldDef> {
    let repeated = field.label() == Label::LABEL_REPEATED;
    let field_type = field_type(field, scope)?;

    if repeated
      && let FieldType::Message(name) = &field_type
      && let Some(entry) = self.map_entries.get(name)
    {
      return Ok(FieldDef::map(
        field.name(),
        field_number(field)?,
        entry.key,
        entry.value.clone(),
      ));
    }

    let mut def = FieldDef::new(field.name(), field_number(field)?, field_type);
    if repeated {
      def = def.repeated();
      let explicit = field.options.as_ref().and_then(|options| options.packed);
      let packed = explicit.unwrap_or(self.proto3) && def.is_packable();
      def = def.packed(packed);
    }
    Ok(def)
  }
}

fn field_number(field: &FieldDescriptorProto) -> Result<u32> {
  u32::try_from(field.number()).map_err(|_| {
    Error::InvalidSchema(format!(
      "field {} has invalid number {}",
      field.name(),
      field.number()
    ))
  })
}
