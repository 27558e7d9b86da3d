// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

//! Field codecs.
//!
//! Every proto field of a message is bound once to a [`FieldDescriptor`], which pairs the
//! static facts about the field ([`FieldInfo`]) with the [`FieldCodec`] selected for it. Scalar
//! strategies are stateless statics shared by all fields of the same scalar type and packing.
//!
//! Readers share one protocol: they are entered right after the field's tag was read, and
//! return the decoded value together with the number of the next field on the wire (0 at the
//! end of input). Repeated readers use this to keep consuming consecutive elements of their own
//! field.

pub mod any;
pub mod enumeration;
pub mod map;
pub mod message;
pub mod repeated;
pub mod scalar;

use crate::bean::PropertyDescriptor;
use crate::declared::DeclaredType;
use crate::error::{Error, Result};
use crate::schema::{EnumDef, FieldDef};
use crate::value::Value;
use crate::wire::{ProtoInput, ProtoOutput};
use any::AnyCodec;
use enumeration::EnumCodec;
use map::MapCodec;
use message::MessageSchema;
use protobuf::rt::WireType;
use repeated::RepeatedScalarCodec;
use scalar::ScalarCodec;
use std::fmt;
use std::sync::Arc;

//
// FieldInfo
//

/// Static facts about one proto field, handed to every strategy call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
  /// Proto field name.
  pub name: String,
  /// `Message.field`, used in error messages.
  pub qualified: String,
  pub number: u32,
  pub wire_type: WireType,
  pub repeated: bool,
  pub packed: bool,
  packable: bool,
}

impl FieldInfo {
  #[must_use]
  pub fn new(message: &str, field: &FieldDef) -> Self {
    Self {
      name: field.name.clone(),
      qualified: format!("{message}.{}", field.name),
      number: field.number,
      wire_type: field.field_type.wire_type(),
      repeated: field.repeated,
      packed: field.packed,
      packable: field.is_packable(),
    }
  }

  /// Synthetic info for the key (1) and value (2) fields of a map entry.
  #[must_use]
  pub fn map_entry(parent: &Self, name: &str, number: u32, wire_type: WireType) -> Self {
    Self {
      name: name.to_string(),
      qualified: format!("{}.{name}", parent.qualified),
      number,
      wire_type,
      repeated: false,
      packed: false,
      packable: false,
    }
  }

  /// Whether a value with this wire type on the wire belongs to this field. Packable repeated
  /// fields accept both encodings whatever their own `packed` flag says.
  #[must_use]
  pub fn accepts(&self, wire_type: WireType) -> bool {
    wire_type == self.wire_type || (self.packable && wire_type == WireType::LengthDelimited)
  }

  pub(crate) fn unsupported(&self, value: &Value, target: impl fmt::Display) -> Error {
    Error::UnsupportedConversion {
      field: self.qualified.clone(),
      source_type: value.type_name(),
      target: target.to_string(),
    }
  }

  pub(crate) fn null_element(&self) -> Error {
    Error::NullElementInRepeatedField {
      field: self.qualified.clone(),
    }
  }
}

//
// Presence
//

/// Whether default values are written. Singular fields use implicit presence; map entry keys and
/// values are always written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
  Implicit,
  Explicit,
}

//
// Representation
//

/// The in-memory shape a repeated field decodes into, chosen from the declared type of the bound
/// property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Representation {
  PrimitiveArray,
  ObjectArray,
  Collection,
  StringArray,
}

impl Representation {
  #[must_use]
  pub const fn for_declared(declared: &DeclaredType) -> Self {
    match declared {
      DeclaredType::PrimitiveArray(_) => Self::PrimitiveArray,
      DeclaredType::ObjectArray(_) => Self::ObjectArray,
      DeclaredType::StringArray => Self::StringArray,
      _ => Self::Collection,
    }
  }

  /// Wraps decoded elements in the sequence variant of this representation. Primitive and
  /// string arrays are produced by their own readers and never pass through here.
  #[must_use]
  pub fn wrap(self, items: Vec<Value>) -> Value {
    match self {
      Self::ObjectArray => Value::Array(items),
      _ => Value::List(items),
    }
  }
}

/// Borrows the elements of any boxed sequence value.
pub(crate) fn sequence_items<'v>(
  field: &FieldInfo,
  value: &'v Value,
  target: &str,
) -> Result<&'v [Value]> {
  match value {
    Value::Array(items) | Value::List(items) => Ok(items),
    other => Err(field.unsupported(other, target)),
  }
}

//
// FieldCodec
//

/// The strategy bound to one field.
#[derive(Debug)]
pub enum FieldCodec {
  Scalar(&'static dyn ScalarCodec),
  RepeatedScalar {
    codec: &'static dyn RepeatedScalarCodec,
    repr: Representation,
  },
  Enum(EnumCodec),
  RepeatedEnum {
    codec: EnumCodec,
    repr: Representation,
  },
  Message(Arc<MessageSchema>),
  RepeatedMessage {
    schema: Arc<MessageSchema>,
    repr: Representation,
  },
  Map(Box<MapCodec>),
  Any(Arc<AnyCodec>),
  RepeatedAny {
    codec: Arc<AnyCodec>,
    repr: Representation,
  },
}

impl FieldCodec {
  /// Writes `value` for `field`. Null and (with implicit presence) default values write
  /// nothing.
  pub fn write(
    &self,
    field: &FieldInfo,
    value: &Value,
    presence: Presence,
    out: &mut ProtoOutput<'_>,
  ) -> Result<()> {
    if value.is_null() {
      return Ok(());
    }

    match self {
      Self::Scalar(codec) => codec.write(field, value, presence, out),
      Self::RepeatedScalar { codec, .. } => match value {
        Value::PrimitiveArray(array) => codec.write_primitive_array(field, array, out),
        Value::StringArray(items) => codec.write_strings(field, items, out),
        Value::Array(items) | Value::List(items) => codec.write_values(field, items, out),
        other => Err(field.unsupported(other, format!("repeated {}", codec.scalar_type()))),
      },
      Self::Enum(codec) => codec.write(field, value, presence, out),
      Self::RepeatedEnum { codec, .. } => codec.write_repeated(field, value, out),
      Self::Message(schema) => schema.write_field(field, value, out),
      Self::RepeatedMessage { schema, .. } => {
        for item in sequence_items(field, value, "repeated message")? {
          if item.is_null() {
            return Err(field.null_element());
          }
          schema.write_field(field, item, out)?;
        }
        Ok(())
      },
      Self::Map(codec) => codec.write(field, value, out),
      Self::Any(codec) => codec.write_field(field, value, out),
      Self::RepeatedAny { codec, .. } => {
        for item in sequence_items(field, value, "repeated any")? {
          if item.is_null() {
            return Err(field.null_element());
          }
          codec.write_field(field, item, out)?;
        }
        Ok(())
      },
    }
  }

  /// Reads the field whose tag was just consumed. Returns the value and the next field number.
  pub fn read(&self, field: &FieldInfo, input: &mut ProtoInput<'_>) -> Result<(Value, u32)> {
    match self {
      Self::Scalar(codec) => {
        let value = codec.read(input)?;
        Ok((value, input.read_field_number()?))
      },
      Self::RepeatedScalar { codec, repr } => codec.read(field, *repr, input),
      Self::Enum(codec) => {
        let value = codec.read(input)?;
        Ok((value, input.read_field_number()?))
      },
      Self::RepeatedEnum { codec, repr } => codec.read_repeated(field, *repr, input),
      Self::Message(schema) => {
        let value = schema.read_nested(input)?;
        Ok((value, input.read_field_number()?))
      },
      Self::RepeatedMessage { schema, repr } => {
        let mut items = Vec::new();
        loop {
          items.push(schema.read_nested(input)?);
          let next = input.read_field_number()?;
          if next != field.number || input.last_wire_type()? != WireType::LengthDelimited {
            return Ok((repr.wrap(items), next));
          }
        }
      },
      Self::Map(codec) => codec.read(field, input),
      Self::Any(codec) => {
        let value = codec.read(field, input)?;
        Ok((value, input.read_field_number()?))
      },
      Self::RepeatedAny { codec, repr } => {
        let mut items = Vec::new();
        loop {
          items.push(codec.read(field, input)?);
          let next = input.read_field_number()?;
          if next != field.number || input.last_wire_type()? != WireType::LengthDelimited {
            return Ok((repr.wrap(items), next));
          }
        }
      },
    }
  }

  /// The value a field takes when it is absent from an entry, used for map values.
  #[must_use]
  pub fn default_value(&self) -> Value {
    match self {
      Self::Scalar(codec) => codec.default_value(),
      Self::Enum(_) => Value::I32(0),
      Self::Message(_) | Self::Map(_) | Self::Any(_) => Value::Record(crate::value::Record::new()),
      Self::RepeatedScalar { repr, .. }
      | Self::RepeatedEnum { repr, .. }
      | Self::RepeatedMessage { repr, .. }
      | Self::RepeatedAny { repr, .. } => repr.wrap(Vec::new()),
    }
  }

  /// The schema of message values, looking through repetition and maps.
  #[must_use]
  pub fn message_schema(&self) -> Option<&Arc<MessageSchema>> {
    match self {
      Self::Message(schema) | Self::RepeatedMessage { schema, .. } => Some(schema),
      Self::Map(codec) => codec.value_codec().message_schema(),
      _ => None,
    }
  }

  /// The proto enum of enum values, looking through repetition and maps.
  #[must_use]
  pub fn enum_def(&self) -> Option<&Arc<EnumDef>> {
    match self {
      Self::Enum(codec) | Self::RepeatedEnum { codec, .. } => Some(codec.enum_def()),
      Self::Map(codec) => codec.value_codec().enum_def(),
      _ => None,
    }
  }
}

//
// FieldDescriptor
//

/// One proto field bound to a property (if the bean has one) and to its codec.
#[derive(Debug)]
pub struct FieldDescriptor {
  pub info: FieldInfo,
  /// The declared type the codec was selected for.
  pub declared: DeclaredType,
  pub property: Option<Arc<PropertyDescriptor>>,
  pub codec: FieldCodec,
  /// Whether decoded values are kept. False for bean fields that cannot be written back.
  pub keep_decoded: bool,
}

impl FieldDescriptor {
  pub fn write(&self, value: &Value, out: &mut ProtoOutput<'_>) -> Result<()> {
    self.codec.write(&self.info, value, Presence::Implicit, out)
  }
}
