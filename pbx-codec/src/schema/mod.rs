// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

//! The resolved proto descriptor set the codec works against.
//!
//! Nothing here parses `.proto` text. A [`ProtoSchema`] is either assembled with
//! [`ProtoSchemaBuilder`] or converted from a `FileDescriptorProto`, and is validated once when
//! built.

#[cfg(test)]
#[path = "./schema_test.rs"]
mod tests;

pub mod descriptor;
pub mod validation;

use crate::declared::ScalarKind;
use crate::error::{Error, Result};
use protobuf::rt::WireType;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

// Field numbers are 29 bit.
const MAX_FIELD_NUMBER: u32 = (1 << 29) - 1;

/// Full name of the well known message that packs any other message. Fields of this type
/// resolve whether or not the schema declares it.
pub const ANY_MESSAGE: &str = "google.protobuf.Any";

//
// ScalarType
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
  Double,
  Float,
  Int32,
  Int64,
  UInt32,
  UInt64,
  SInt32,
  SInt64,
  Fixed32,
  Fixed64,
  SFixed32,
  SFixed64,
  Bool,
  String,
  Bytes,
}

impl ScalarType {
  #[must_use]
  pub const fn proto_name(self) -> &'static str {
    match self {
      Self::Double => "double",
      Self::Float => "float",
      Self::Int32 => "int32",
      Self::Int64 => "int64",
      Self::UInt32 => "uint32",
      Self::UInt64 => "uint64",
      Self::SInt32 => "sint32",
      Self::SInt64 => "sint64",
      Self::Fixed32 => "fixed32",
      Self::Fixed64 => "fixed64",
      Self::SFixed32 => "sfixed32",
      Self::SFixed64 => "sfixed64",
      Self::Bool => "bool",
      Self::String => "string",
      Self::Bytes => "bytes",
    }
  }

  #[must_use]
  pub const fn wire_type(self) -> WireType {
    match self {
      Self::Int32
      | Self::Int64
      | Self::UInt32
      | Self::UInt64
      | Self::SInt32
      | Self::SInt64
      | Self::Bool => WireType::Varint,
      Self::Fixed32 | Self::SFixed32 | Self::Float => WireType::Fixed32,
      Self::Fixed64 | Self::SFixed64 | Self::Double => WireType::Fixed64,
      Self::String | Self::Bytes => WireType::LengthDelimited,
    }
  }

  /// The native kind values of this type decode into. `None` for string and bytes.
  #[must_use]
  pub const fn native_kind(self) -> Option<ScalarKind> {
    match self {
      Self::Int32 | Self::SInt32 | Self::SFixed32 => Some(ScalarKind::I32),
      Self::Int64 | Self::SInt64 | Self::SFixed64 => Some(ScalarKind::I64),
      Self::UInt32 | Self::Fixed32 => Some(ScalarKind::U32),
      Self::UInt64 | Self::Fixed64 => Some(ScalarKind::U64),
      Self::Float => Some(ScalarKind::F32),
      Self::Double => Some(ScalarKind::F64),
      Self::Bool => Some(ScalarKind::Bool),
      Self::String | Self::Bytes => None,
    }
  }

  /// Whether a repeated field of this type may use the packed encoding.
  #[must_use]
  pub const fn is_packable(self) -> bool {
    self.native_kind().is_some()
  }

  const fn is_valid_map_key(self) -> bool {
    !matches!(self, Self::Double | Self::Float | Self::Bytes)
  }
}

impl fmt::Display for ScalarType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.proto_name())
  }
}

//
// FieldType
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
  Scalar(ScalarType),
  /// Name of a proto enum. Fully qualified once the schema is built.
  Enum(String),
  /// Name of a proto message. Fully qualified once the schema is built.
  Message(String),
  Map {
    key: ScalarType,
    value: Box<FieldType>,
  },
}

impl FieldType {
  #[must_use]
  pub fn wire_type(&self) -> WireType {
    match self {
      Self::Scalar(scalar) => scalar.wire_type(),
      Self::Enum(_) => WireType::Varint,
      Self::Message(_) | Self::Map { .. } => WireType::LengthDelimited,
    }
  }
}

impl fmt::Display for FieldType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Scalar(scalar) => write!(f, "{scalar}"),
      Self::Enum(name) => write!(f, "enum {name}"),
      Self::Message(name) => write!(f, "message {name}"),
      Self::Map { key, value } => write!(f, "map<{key}, {value}>"),
    }
  }
}

//
// FieldDef
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
  pub name: String,
  pub number: u32,
  pub field_type: FieldType,
  pub repeated: bool,
  pub packed: bool,
}

impl FieldDef {
  #[must_use]
  pub fn new(name: &str, number: u32, field_type: FieldType) -> Self {
    Self {
      name: name.to_string(),
      number,
      field_type,
      repeated: false,
      packed: false,
    }
  }

  #[must_use]
  pub fn scalar(name: &str, number: u32, scalar: ScalarType) -> Self {
    Self::new(name, number, FieldType::Scalar(scalar))
  }

  #[must_use]
  pub fn enumeration(name: &str, number: u32, enum_name: &str) -> Self {
    Self::new(name, number, FieldType::Enum(enum_name.to_string()))
  }

  #[must_use]
  pub fn message(name: &str, number: u32, message_name: &str) -> Self {
    Self::new(name, number, FieldType::Message(message_name.to_string()))
  }

  #[must_use]
  pub fn map(name: &str, number: u32, key: ScalarType, value: FieldType) -> Self {
    Self {
      repeated: true,
      ..Self::new(
        name,
        number,
        FieldType::Map {
          key,
          value: Box::new(value),
        },
      )
    }
  }

  #[must_use]
  pub const fn repeated(mut self) -> Self {
    self.repeated = true;
    self
  }

  #[must_use]
  pub const fn packed(mut self, packed: bool) -> Self {
    self.packed = packed;
    self
  }

  #[must_use]
  pub const fn is_map(&self) -> bool {
    matches!(self.field_type, FieldType::Map { .. })
  }

  /// Whether this repeated field may appear in the packed form on the wire.
  #[must_use]
  pub const fn is_packable(&self) -> bool {
    self.repeated
      && match &self.field_type {
        FieldType::Scalar(scalar) => scalar.is_packable(),
        FieldType::Enum(_) => true,
        FieldType::Message(_) | FieldType::Map { .. } => false,
      }
  }
}

//
// MessageDef
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDef {
  pub name: String,
  pub full_name: String,
  /// Sorted by field number once the schema is built.
  pub fields: Vec<FieldDef>,
}

impl MessageDef {
  #[must_use]
  pub fn new(name: &str) -> Self {
    Self {
      name: name.to_string(),
      full_name: String::new(),
      fields: Vec::new(),
    }
  }

  #[must_use]
  pub fn with_full_name(mut self, full_name: &str) -> Self {
    self.full_name = full_name.to_string();
    self
  }

  #[must_use]
  pub fn field(mut self, field: FieldDef) -> Self {
    self.fields.push(field);
    self
  }

  #[must_use]
  pub fn field_by_name(&self, name: &str) -> Option<&FieldDef> {
    self.fields.iter().find(|f| f.name == name)
  }

  #[must_use]
  pub fn field_by_number(&self, number: u32) -> Option<&FieldDef> {
    self.fields.iter().find(|f| f.number == number)
  }
}

//
// EnumDef
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDef {
  pub name: String,
  pub full_name: String,
  pub values: Vec<(String, i32)>,
}

impl EnumDef {
  #[must_use]
  pub fn new<'a>(name: &str, values: impl IntoIterator<Item = (&'a str, i32)>) -> Self {
    Self {
      name: name.to_string(),
      full_name: String::new(),
      values: values
        .into_iter()
        .map(|(symbol, number)| (symbol.to_string(), number))
        .collect(),
    }
  }

  #[must_use]
  pub fn with_full_name(mut self, full_name: &str) -> Self {
    self.full_name = full_name.to_string();
    self
  }

  #[must_use]
  pub fn number_of(&self, symbol: &str) -> Option<i32> {
    self
      .values
      .iter()
      .find(|(name, _)| name == symbol)
      .map(|(_, number)| *number)
  }

  /// The first symbol defined for `number`. Aliases resolve to the first declaration.
  #[must_use]
  pub fn name_of(&self, number: i32) -> Option<&str> {
    self
      .values
      .iter()
      .find(|(_, n)| *n == number)
      .map(|(name, _)| name.as_str())
  }

  #[must_use]
  pub fn contains_number(&self, number: i32) -> bool {
    self.values.iter().any(|(_, n)| *n == number)
  }
}

//
// ProtoSchema
//

/// A validated set of messages and enums. Lookups accept the fully qualified name, with or
/// without a leading dot, or the unqualified name.
#[derive(Debug, Default)]
pub struct ProtoSchema {
  package: String,
  messages: HashMap<String, Arc<MessageDef>>,
  enums: HashMap<String, Arc<EnumDef>>,
}

impl ProtoSchema {
  #[must_use]
  pub fn builder(package: &str) -> ProtoSchemaBuilder {
    ProtoSchemaBuilder {
      package: package.to_string(),
      messages: Vec::new(),
      enums: Vec::new(),
    }
  }

  #[must_use]
  pub fn package(&self) -> &str {
    &self.package
  }

  pub fn message(&self, name: &str) -> Result<&Arc<MessageDef>> {
    self
      .messages
      .get(name.trim_start_matches('.'))
      .ok_or_else(|| Error::UnknownMessage(name.to_string()))
  }

  pub fn enum_def(&self, name: &str) -> Result<&Arc<EnumDef>> {
    self
      .enums
      .get(name.trim_start_matches('.'))
      .ok_or_else(|| Error::UnknownEnum(name.to_string()))
  }
}

//
// ProtoSchemaBuilder
//

pub struct ProtoSchemaBuilder {
  package: String,
  messages: Vec<MessageDef>,
  enums: Vec<EnumDef>,
}

impl ProtoSchemaBuilder {
  #[must_use]
  pub fn message(mut self, message: MessageDef) -> Self {
    self.messages.push(message);
    self
  }

  #[must_use]
  pub fn enumeration(mut self, enum_def: EnumDef) -> Self {
    self.enums.push(enum_def);
    self
  }

  pub fn build(mut self) -> Result<ProtoSchema> {
    let mut full_names = HashSet::new();
    for message in &mut self.messages {
      if message.full_name.is_empty() {
        message.full_name = qualify(&self.package, &message.name);
      }
      if !full_names.insert(message.full_name.clone()) {
        return Err(Error::InvalidSchema(format!(
          "duplicate message {}",
          message.full_name
        )));
      }
    }
    for enum_def in &mut self.enums {
      if enum_def.full_name.is_empty() {
        enum_def.full_name = qualify(&self.package, &enum_def.name);
      }
      if enum_def.values.is_empty() {
        return Err(Error::InvalidSchema(format!(
          "enum {} defines no values",
          enum_def.full_name
        )));
      }
    }

    // Short names are registered after full names so they never shadow one.
    let enum_names = name_index(self.enums.iter().map(|e| (&e.name, &e.full_name)));
    let message_names = name_index(self.messages.iter().map(|m| (&m.name, &m.full_name)));

    for message in &mut self.messages {
      validate_fields(message)?;
      for field in &mut message.fields {
        resolve_references(
          &message.full_name,
          field,
          &enum_names,
          &message_names,
        )?;
      }
      message.fields.sort_by_key(|f| f.number);
    }

    let mut messages = HashMap::new();
    for message in self.messages {
      let message = Arc::new(message);
      messages.insert(message.full_name.clone(), message.clone());
      messages
        .entry(message.name.clone())
        .or_insert_with(|| message.clone());
    }
    let mut enums = HashMap::new();
    for enum_def in self.enums {
      let enum_def = Arc::new(enum_def);
      enums.insert(enum_def.full_name.clone(), enum_def.clone());
      enums
        .entry(enum_def.name.clone())
        .or_insert_with(|| enum_def.clone());
    }

    Ok(ProtoSchema {
      package: self.package,
      messages,
      enums,
    })
  }
}

fn qualify(package: &str, name: &str) -> String {
  if package.is_empty() {
    name.to_string()
  } else {
    format!("{package}.{name}")
  }
}

fn name_index<'a>(
  names: impl Iterator<Item = (&'a String, &'a String)> + Clone,
) -> HashMap<String, String> {
  let mut index: HashMap<String, String> = names
    .clone()
    .map(|(_, full)| (full.clone(), full.clone()))
    .collect();
  for (short, full) in names {
    index.entry(short.clone()).or_insert_with(|| full.clone());
  }
  index
}

fn validate_fields(message: &MessageDef) -> Result<()> {
  let mut numbers = HashSet::new();
  let mut names = HashSet::new();
  for field in &message.fields {
    let qualified = format!("{}.{}", message.full_name, field.name);
    if field.number == 0 || field.number > MAX_FIELD_NUMBER {
      return Err(Error::InvalidSchema(format!(
        "field {qualified} has invalid number {}",
        field.number
      )));
    }
    if !numbers.insert(field.number) {
      return Err(Error::InvalidSchema(format!(
        "field {qualified} reuses number {}",
        field.number
      )));
    }
    if !names.insert(field.name.as_str()) {
      return Err(Error::InvalidSchema(format!(
        "duplicate field name {qualified}"
      )));
    }
    if field.packed && !field.is_packable() {
      return Err(Error::InvalidSchema(format!(
        "field {qualified} can not be packed"
      )));
    }
    if let FieldType::Map { key, value } = &field.field_type {
      if !key.is_valid_map_key() {
        return Err(Error::InvalidSchema(format!(
          "field {qualified} uses {key} as map key"
        )));
      }
      if matches!(**value, FieldType::Map { .. }) {
        return Err(Error::InvalidSchema(format!(
          "field {qualified} nests a map in a map value"
        )));
      }
      if !field.repeated {
        return Err(Error::InvalidSchema(format!(
          "map field {qualified} must be repeated"
        )));
      }
    }
  }
  Ok(())
}

fn resolve_references(
  message: &str,
  field: &mut FieldDef,
  enum_names: &HashMap<String, String>,
  message_names: &HashMap<String, String>,
) -> Result<()> {
  fn resolve(
    field_type: &mut FieldType,
    enum_names: &HashMap<String, String>,
    message_names: &HashMap<String, String>,
  ) -> std::result::Result<(), String> {
    match field_type {
      FieldType::Scalar(_) => Ok(()),
      FieldType::Enum(name) => {
        let full = enum_names
          .get(name.trim_start_matches('.'))
          .ok_or_else(|| format!("unknown enum {name}"))?;
        *name = full.clone();
        Ok(())
      },
      FieldType::Message(name) => {
        let short = name.trim_start_matches('.');
        *name = match message_names.get(short) {
          Some(full) => full.clone(),
          None if short == ANY_MESSAGE => ANY_MESSAGE.to_string(),
          None => return Err(format!("unknown message {name}")),
        };
        Ok(())
      },
      FieldType::Map { value, .. } => resolve(value, enum_names, message_names),
    }
  }

  resolve(&mut field.field_type, enum_names, message_names).map_err(|reason| {
    Error::InvalidSchema(format!("field {message}.{}: {reason}", field.name))
  })
}
