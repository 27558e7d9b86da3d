// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

//! Wire formats of the numeric proto scalar types.
//!
//! Each proto scalar type has a unit struct implementing [`ScalarWire`], which knows the wire
//! type and how to move one untagged value of its [`NativeScalar`] to and from the coded
//! streams. Several proto types share a native type (`int32`, `sint32` and `sfixed32` are all
//! `i32`), so value coercion lives on [`NativeScalar`] and wire handling on [`ScalarWire`].

use crate::declared::ScalarKind;
use crate::schema::ScalarType;
use crate::value::{PrimitiveArray, Value};
use protobuf::rt::WireType;
use protobuf::{CodedInputStream, CodedOutputStream};
use std::fmt;

//
// NativeScalar
//

/// A Rust primitive that proto scalar values decode into.
pub trait NativeScalar: Copy + PartialEq + Default + fmt::Debug + fmt::Display + Send + Sync + 'static {
  const KIND: ScalarKind;

  /// Coerces a runtime value. Strings are parsed. `None` when there is no lossless mapping.
  fn from_value(value: &Value) -> Option<Self>;

  fn parse_text(text: &str) -> Option<Self>;

  fn into_value(self) -> Value;

  /// Whether this is the proto default, which singular fields do not write.
  fn is_default(self) -> bool;

  fn wrap(values: Vec<Self>) -> PrimitiveArray;

  fn slice(array: &PrimitiveArray) -> Option<&[Self]>;
}

macro_rules! native_integer {
  ($($native:ty => $variant:ident),* $(,)?) => {
    $(
      impl NativeScalar for $native {
        const KIND: ScalarKind = ScalarKind::$variant;

        fn from_value(value: &Value) -> Option<Self> {
          match value {
            Value::I32(v) => Self::try_from(*v).ok(),
            Value::I64(v) => Self::try_from(*v).ok(),
            Value::U32(v) => Self::try_from(*v).ok(),
            Value::U64(v) => Self::try_from(*v).ok(),
            Value::String(text) => Self::parse_text(text),
            _ => None,
          }
        }

        fn parse_text(text: &str) -> Option<Self> {
          text.trim().parse().ok()
        }

        fn into_value(self) -> Value {
          Value::$variant(self)
        }

        fn is_default(self) -> bool {
          self == 0
        }

        fn wrap(values: Vec<Self>) -> PrimitiveArray {
          PrimitiveArray::$variant(values)
        }

        fn slice(array: &PrimitiveArray) -> Option<&[Self]> {
          match array {
            PrimitiveArray::$variant(values) => Some(values),
            _ => None,
          }
        }
      }
    )*
  };
}

native_integer!(i32 => I32, i64 => I64, u32 => U32, u64 => U64);

macro_rules! native_float {
  ($($native:ty => $variant:ident),* $(,)?) => {
    $(
      impl NativeScalar for $native {
        const KIND: ScalarKind = ScalarKind::$variant;

        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
        fn from_value(value: &Value) -> Option<Self> {
          match value {
            Value::F32(v) => Some(*v as Self),
            Value::F64(v) => Some(*v as Self),
            Value::I32(v) => Some(*v as Self),
            Value::I64(v) => Some(*v as Self),
            Value::U32(v) => Some(*v as Self),
            Value::U64(v) => Some(*v as Self),
            Value::String(text) => Self::parse_text(text),
            _ => None,
          }
        }

        fn parse_text(text: &str) -> Option<Self> {
          text.trim().parse().ok()
        }

        fn into_value(self) -> Value {
          Value::$variant(self)
        }

        // Compared by bit pattern: negative zero is not the default and is written.
        fn is_default(self) -> bool {
          self.to_bits() == 0
        }

        fn wrap(values: Vec<Self>) -> PrimitiveArray {
          PrimitiveArray::$variant(values)
        }

        fn slice(array: &PrimitiveArray) -> Option<&[Self]> {
          match array {
            PrimitiveArray::$variant(values) => Some(values),
            _ => None,
          }
        }
      }
    )*
  };
}

native_float!(f32 => F32, f64 => F64);

impl NativeScalar for bool {
  const KIND: ScalarKind = ScalarKind::Bool;

  fn from_value(value: &Value) -> Option<Self> {
    match value {
      Value::Bool(v) => Some(*v),
      Value::String(text) => Self::parse_text(text),
      _ => None,
    }
  }

  fn parse_text(text: &str) -> Option<Self> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("true") {
      Some(true)
    } else if text.eq_ignore_ascii_case("false") {
      Some(false)
    } else {
      None
    }
  }

  fn into_value(self) -> Value {
    Value::Bool(self)
  }

  fn is_default(self) -> bool {
    !self
  }

  fn wrap(values: Vec<Self>) -> PrimitiveArray {
    PrimitiveArray::Bool(values)
  }

  fn slice(array: &PrimitiveArray) -> Option<&[Self]> {
    match array {
      PrimitiveArray::Bool(values) => Some(values),
      _ => None,
    }
  }
}

//
// ScalarWire
//

/// Wire handling of one numeric proto scalar type.
pub trait ScalarWire: fmt::Debug + Send + Sync + 'static {
  type Native: NativeScalar;

  const SCALAR: ScalarType;

  const WIRE_TYPE: WireType;

  /// Serializes the value without a tag.
  fn write_no_tag(value: Self::Native, os: &mut CodedOutputStream<'_>) -> protobuf::Result<()>;

  /// Deserializes a value from the input stream (tag already consumed).
  fn read(is: &mut CodedInputStream<'_>) -> protobuf::Result<Self::Native>;
}

macro_rules! scalar_wire {
  ($($name:ident: $native:ty, $scalar:ident, $wire:ident, $write:ident, $read:ident;)*) => {
    $(
      #[doc = concat!("Wire format of `ScalarType::", stringify!($scalar), "`.")]
      #[derive(Debug, Clone, Copy)]
      pub struct $name;

      impl ScalarWire for $name {
        type Native = $native;

        const SCALAR: ScalarType = ScalarType::$scalar;

        const WIRE_TYPE: WireType = WireType::$wire;

        fn write_no_tag(value: $native, os: &mut CodedOutputStream<'_>) -> protobuf::Result<()> {
          os.$write(value)
        }

        fn read(is: &mut CodedInputStream<'_>) -> protobuf::Result<$native> {
          is.$read()
        }
      }
    )*
  };
}

scalar_wire! {
  Bool: bool, Bool, Varint, write_bool_no_tag, read_bool;
  Int32: i32, Int32, Varint, write_int32_no_tag, read_int32;
  Int64: i64, Int64, Varint, write_int64_no_tag, read_int64;
  UInt32: u32, UInt32, Varint, write_uint32_no_tag, read_uint32;
  UInt64: u64, UInt64, Varint, write_uint64_no_tag, read_uint64;
  SInt32: i32, SInt32, Varint, write_sint32_no_tag, read_sint32;
  SInt64: i64, SInt64, Varint, write_sint64_no_tag, read_sint64;
  Fixed32: u32, Fixed32, Fixed32, write_fixed32_no_tag, read_fixed32;
  Fixed64: u64, Fixed64, Fixed64, write_fixed64_no_tag, read_fixed64;
  SFixed32: i32, SFixed32, Fixed32, write_sfixed32_no_tag, read_sfixed32;
  SFixed64: i64, SFixed64, Fixed64, write_sfixed64_no_tag, read_sfixed64;
  Float: f32, Float, Fixed32, write_float_no_tag, read_float;
  Double: f64, Double, Fixed64, write_double_no_tag, read_double;
}
