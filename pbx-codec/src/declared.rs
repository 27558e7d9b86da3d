// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

//! Static types of bean properties.
//!
//! A [`DeclaredType`] is what a property promises to hold, as opposed to whatever [`Value`]
//! happens to be passed at runtime. Codec representation selection, schema validation and
//! decode-side shape conversion are all driven by it.

use crate::bean::{BeanType, ProtoBean};
use crate::value::Value;
use std::fmt;

//
// ScalarKind
//

/// The native primitive kinds. Every numeric proto scalar type maps onto exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
  Bool,
  I32,
  I64,
  U32,
  U64,
  F32,
  F64,
}

impl ScalarKind {
  #[must_use]
  pub const fn name(self) -> &'static str {
    match self {
      Self::Bool => "bool",
      Self::I32 => "i32",
      Self::I64 => "i64",
      Self::U32 => "u32",
      Self::U64 => "u64",
      Self::F32 => "f32",
      Self::F64 => "f64",
    }
  }

  #[must_use]
  pub const fn default_value(self) -> Value {
    match self {
      Self::Bool => Value::Bool(false),
      Self::I32 => Value::I32(0),
      Self::I64 => Value::I64(0),
      Self::U32 => Value::U32(0),
      Self::U64 => Value::U64(0),
      Self::F32 => Value::F32(0.0),
      Self::F64 => Value::F64(0.0),
    }
  }
}

impl fmt::Display for ScalarKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

//
// EnumType
//

/// An application enum: its name and the symbols it defines. Symbols are matched against proto
/// enum value names when decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumType {
  pub name: &'static str,
  pub symbols: &'static [&'static str],
}

impl EnumType {
  #[must_use]
  pub const fn new(name: &'static str, symbols: &'static [&'static str]) -> Self {
    Self { name, symbols }
  }

  #[must_use]
  pub fn contains(&self, symbol: &str) -> bool {
    self.symbols.contains(&symbol)
  }
}

//
// DeclaredType
//

#[derive(Debug, Clone, PartialEq)]
pub enum DeclaredType {
  /// Fully generic. Whatever is decoded is kept as is.
  Any,
  /// A primitive that cannot be null.
  Scalar(ScalarKind),
  /// A nullable primitive.
  Boxed(ScalarKind),
  String,
  Bytes,
  Enum(EnumType),
  /// An unboxed array, held as [`Value::PrimitiveArray`].
  PrimitiveArray(ScalarKind),
  /// A boxed array whose elements may be null, held as [`Value::Array`].
  ObjectArray(Box<DeclaredType>),
  /// A generic collection, held as [`Value::List`].
  Collection(Box<DeclaredType>),
  /// An array of nullable strings, held as [`Value::StringArray`].
  StringArray,
  /// A string keyed map with typed values, held as [`Value::Record`].
  Map(Box<DeclaredType>),
  /// A generic key/value record.
  Record,
  Bean(BeanType),
}

impl DeclaredType {
  #[must_use]
  pub fn bean<T: ProtoBean>() -> Self {
    Self::Bean(BeanType::of::<T>())
  }

  #[must_use]
  pub fn collection(element: Self) -> Self {
    Self::Collection(Box::new(element))
  }

  #[must_use]
  pub fn object_array(element: Self) -> Self {
    Self::ObjectArray(Box::new(element))
  }

  #[must_use]
  pub fn map(value: Self) -> Self {
    Self::Map(Box::new(value))
  }

  /// The element type of a sequence or the value type of a map.
  #[must_use]
  pub fn element(&self) -> Option<&Self> {
    match self {
      Self::ObjectArray(element) | Self::Collection(element) | Self::Map(element) => Some(element),
      _ => None,
    }
  }

  #[must_use]
  pub const fn bean_type(&self) -> Option<BeanType> {
    match self {
      Self::Bean(bean_type) => Some(*bean_type),
      _ => None,
    }
  }
}

impl fmt::Display for DeclaredType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Any => f.write_str("any"),
      Self::Scalar(kind) => write!(f, "{kind}"),
      Self::Boxed(kind) => write!(f, "Option<{kind}>"),
      Self::String => f.write_str("string"),
      Self::Bytes => f.write_str("bytes"),
      Self::Enum(enum_type) => write!(f, "enum {}", enum_type.name),
      Self::PrimitiveArray(kind) => write!(f, "[{kind}]"),
      Self::ObjectArray(element) => write!(f, "[Option<{element}>]"),
      Self::Collection(element) => write!(f, "list<{element}>"),
      Self::StringArray => f.write_str("[Option<string>]"),
      Self::Map(value) => write!(f, "map<string, {value}>"),
      Self::Record => f.write_str("record"),
      Self::Bean(bean_type) => f.write_str(bean_type.name()),
    }
  }
}
