// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

//! The dynamic value model.
//!
//! [`Value`] is both the input of the serializer and the intermediate form produced by the
//! deserializer before it is converted into the caller's declared shape.

#[cfg(test)]
#[path = "./value_test.rs"]
mod tests;

use crate::bean::{DynBean, ProtoBean};
use crate::declared::ScalarKind;
use crate::error::{Error, Result};
use bytes::Bytes;
use std::collections::BTreeMap;

/// A generic key/value record, ordered by key.
pub type Record = BTreeMap<String, Value>;

//
// PrimitiveArray
//

/// An unboxed array of one primitive kind. It cannot hold nulls.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveArray {
  Bool(Vec<bool>),
  I32(Vec<i32>),
  I64(Vec<i64>),
  U32(Vec<u32>),
  U64(Vec<u64>),
  F32(Vec<f32>),
  F64(Vec<f64>),
}

impl PrimitiveArray {
  #[must_use]
  pub const fn kind(&self) -> ScalarKind {
    match self {
      Self::Bool(_) => ScalarKind::Bool,
      Self::I32(_) => ScalarKind::I32,
      Self::I64(_) => ScalarKind::I64,
      Self::U32(_) => ScalarKind::U32,
      Self::U64(_) => ScalarKind::U64,
      Self::F32(_) => ScalarKind::F32,
      Self::F64(_) => ScalarKind::F64,
    }
  }

  #[must_use]
  pub fn len(&self) -> usize {
    match self {
      Self::Bool(values) => values.len(),
      Self::I32(values) => values.len(),
      Self::I64(values) => values.len(),
      Self::U32(values) => values.len(),
      Self::U64(values) => values.len(),
      Self::F32(values) => values.len(),
      Self::F64(values) => values.len(),
    }
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Appends `other`. Arrays of different kinds cannot be combined, so `other` replaces this
  /// one.
  pub fn extend(&mut self, other: Self) {
    match (self, other) {
      (Self::Bool(values), Self::Bool(more)) => values.extend(more),
      (Self::I32(values), Self::I32(more)) => values.extend(more),
      (Self::I64(values), Self::I64(more)) => values.extend(more),
      (Self::U32(values), Self::U32(more)) => values.extend(more),
      (Self::U64(values), Self::U64(more)) => values.extend(more),
      (Self::F32(values), Self::F32(more)) => values.extend(more),
      (Self::F64(values), Self::F64(more)) => values.extend(more),
      (this, other) => *this = other,
    }
  }

  /// Boxes every element.
  #[must_use]
  pub fn to_values(&self) -> Vec<Value> {
    match self {
      Self::Bool(values) => values.iter().copied().map(Value::Bool).collect(),
      Self::I32(values) => values.iter().copied().map(Value::I32).collect(),
      Self::I64(values) => values.iter().copied().map(Value::I64).collect(),
      Self::U32(values) => values.iter().copied().map(Value::U32).collect(),
      Self::U64(values) => values.iter().copied().map(Value::U64).collect(),
      Self::F32(values) => values.iter().copied().map(Value::F32).collect(),
      Self::F64(values) => values.iter().copied().map(Value::F64).collect(),
    }
  }
}

//
// Value
//

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
  Null,
  Bool(bool),
  I32(i32),
  I64(i64),
  U32(u32),
  U64(u64),
  F32(f32),
  F64(f64),
  String(String),
  Bytes(Bytes),
  /// The symbol of an application enum.
  Enum(String),
  PrimitiveArray(PrimitiveArray),
  /// A boxed object array. Elements may be [`Value::Null`].
  Array(Vec<Value>),
  /// A generic collection.
  List(Vec<Value>),
  StringArray(Vec<Option<String>>),
  Record(Record),
  Bean(Box<dyn DynBean>),
}

impl Value {
  #[must_use]
  pub fn bean<T: ProtoBean>(bean: T) -> Self {
    Self::Bean(Box::new(bean))
  }

  #[must_use]
  pub fn beans<T: ProtoBean>(beans: impl IntoIterator<Item = T>) -> Self {
    Self::List(beans.into_iter().map(Self::bean).collect())
  }

  /// Builds a boxed object array.
  #[must_use]
  pub fn array<T: Into<Self>>(items: impl IntoIterator<Item = Option<T>>) -> Self {
    Self::Array(items.into_iter().map(Into::into).collect())
  }

  #[must_use]
  pub fn enum_symbol(symbol: impl Into<String>) -> Self {
    Self::Enum(symbol.into())
  }

  #[must_use]
  pub fn record<K: Into<String>>(entries: impl IntoIterator<Item = (K, Self)>) -> Self {
    Self::Record(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
  }

  #[must_use]
  pub const fn is_null(&self) -> bool {
    matches!(self, Self::Null)
  }

  /// The primitive kind of a scalar value, if it is one.
  #[must_use]
  pub const fn scalar_kind(&self) -> Option<ScalarKind> {
    match self {
      Self::Bool(_) => Some(ScalarKind::Bool),
      Self::I32(_) => Some(ScalarKind::I32),
      Self::I64(_) => Some(ScalarKind::I64),
      Self::U32(_) => Some(ScalarKind::U32),
      Self::U64(_) => Some(ScalarKind::U64),
      Self::F32(_) => Some(ScalarKind::F32),
      Self::F64(_) => Some(ScalarKind::F64),
      _ => None,
    }
  }

  /// A short description of the runtime type, used in error messages.
  #[must_use]
  pub fn type_name(&self) -> String {
    match self {
      Self::Null => "null".to_string(),
      Self::Bool(_) => "bool".to_string(),
      Self::I32(_) => "i32".to_string(),
      Self::I64(_) => "i64".to_string(),
      Self::U32(_) => "u32".to_string(),
      Self::U64(_) => "u64".to_string(),
      Self::F32(_) => "f32".to_string(),
      Self::F64(_) => "f64".to_string(),
      Self::String(_) => "string".to_string(),
      Self::Bytes(_) => "bytes".to_string(),
      Self::Enum(_) => "enum".to_string(),
      Self::PrimitiveArray(array) => format!("[{}]", array.kind()),
      Self::Array(_) => "array".to_string(),
      Self::List(_) => "list".to_string(),
      Self::StringArray(_) => "[Option<string>]".to_string(),
      Self::Record(_) => "record".to_string(),
      Self::Bean(bean) => bean.bean_type().name().to_string(),
    }
  }

  #[must_use]
  pub const fn as_record(&self) -> Option<&Record> {
    match self {
      Self::Record(record) => Some(record),
      _ => None,
    }
  }

  pub fn into_typed<T: FromValue>(self) -> Result<T> {
    T::from_value(self)
  }

  pub fn into_bean<T: ProtoBean>(self) -> Result<T> {
    match self {
      Self::Bean(bean) => {
        let actual = bean.bean_type().name().to_string();
        bean
          .into_any()
          .downcast::<T>()
          .map(|bean| *bean)
          .map_err(|_| Error::ValueType {
            expected: std::any::type_name::<T>(),
            actual,
          })
      },
      other => Err(Error::ValueType {
        expected: std::any::type_name::<T>(),
        actual: other.type_name(),
      }),
    }
  }

  pub fn into_optional_bean<T: ProtoBean>(self) -> Result<Option<T>> {
    if self.is_null() {
      return Ok(None);
    }
    self.into_bean().map(Some)
  }

  /// Extracts every bean out of a list or array. Null elements are rejected.
  pub fn into_beans<T: ProtoBean>(self) -> Result<Vec<T>> {
    match self {
      Self::List(items) | Self::Array(items) => items.into_iter().map(Self::into_bean).collect(),
      other => Err(Error::ValueType {
        expected: "list of beans",
        actual: other.type_name(),
      }),
    }
  }
}

macro_rules! value_from {
  ($($native:ty => $variant:ident),* $(,)?) => {
    $(
      impl From<$native> for Value {
        fn from(value: $native) -> Self {
          Self::$variant(value)
        }
      }

      impl From<Vec<$native>> for Value {
        fn from(values: Vec<$native>) -> Self {
          Self::PrimitiveArray(PrimitiveArray::$variant(values))
        }
      }
    )*
  };
}

value_from!(bool => Bool, i32 => I32, i64 => I64, u32 => U32, u64 => U64, f32 => F32, f64 => F64);

impl From<String> for Value {
  fn from(value: String) -> Self {
    Self::String(value)
  }
}

impl From<&str> for Value {
  fn from(value: &str) -> Self {
    Self::String(value.to_string())
  }
}

impl From<Bytes> for Value {
  fn from(value: Bytes) -> Self {
    Self::Bytes(value)
  }
}

impl From<Record> for Value {
  fn from(value: Record) -> Self {
    Self::Record(value)
  }
}

impl From<Vec<String>> for Value {
  fn from(values: Vec<String>) -> Self {
    Self::List(values.into_iter().map(Self::String).collect())
  }
}

impl From<Vec<Option<String>>> for Value {
  fn from(values: Vec<Option<String>>) -> Self {
    Self::StringArray(values)
  }
}

impl From<Vec<Bytes>> for Value {
  fn from(values: Vec<Bytes>) -> Self {
    Self::List(values.into_iter().map(Self::Bytes).collect())
  }
}

impl<T: Into<Self>> From<Option<T>> for Value {
  fn from(value: Option<T>) -> Self {
    value.map_or(Self::Null, Into::into)
  }
}

//
// FromValue
//

/// Typed extraction out of a [`Value`], used by bean setters.
pub trait FromValue: Sized {
  fn from_value(value: Value) -> Result<Self>;
}

fn type_error<T>(expected: &'static str, value: &Value) -> Result<T> {
  Err(Error::ValueType {
    expected,
    actual: value.type_name(),
  })
}

macro_rules! from_value_native {
  ($($native:ty => $variant:ident),* $(,)?) => {
    $(
      impl FromValue for $native {
        fn from_value(value: Value) -> Result<Self> {
          match value {
            Value::$variant(value) => Ok(value),
            other => type_error(stringify!($native), &other),
          }
        }
      }

      impl FromValue for Vec<$native> {
        fn from_value(value: Value) -> Result<Self> {
          match value {
            Value::PrimitiveArray(PrimitiveArray::$variant(values)) => Ok(values),
            Value::List(items) | Value::Array(items) => {
              items.into_iter().map(<$native>::from_value).collect()
            },
            Value::Null => Ok(Self::new()),
            other => type_error(concat!("[", stringify!($native), "]"), &other),
          }
        }
      }
    )*
  };
}

from_value_native!(
  bool => Bool,
  i32 => I32,
  i64 => I64,
  u32 => U32,
  u64 => U64,
  f32 => F32,
  f64 => F64,
);

impl FromValue for Value {
  fn from_value(value: Value) -> Result<Self> {
    Ok(value)
  }
}

impl FromValue for String {
  fn from_value(value: Value) -> Result<Self> {
    match value {
      Value::String(value) | Value::Enum(value) => Ok(value),
      other => type_error("string", &other),
    }
  }
}

impl FromValue for Bytes {
  fn from_value(value: Value) -> Result<Self> {
    match value {
      Value::Bytes(value) => Ok(value),
      other => type_error("bytes", &other),
    }
  }
}

impl FromValue for Record {
  fn from_value(value: Value) -> Result<Self> {
    match value {
      Value::Record(record) => Ok(record),
      Value::Null => Ok(Self::new()),
      other => type_error("record", &other),
    }
  }
}

impl FromValue for Vec<String> {
  fn from_value(value: Value) -> Result<Self> {
    match value {
      Value::List(items) | Value::Array(items) => items.into_iter().map(String::from_value).collect(),
      Value::StringArray(items) => items
        .into_iter()
        .map(|item| item.ok_or_else(|| Error::ValueType {
          expected: "string",
          actual: "null".to_string(),
        }))
        .collect(),
      Value::Null => Ok(Self::new()),
      other => type_error("[string]", &other),
    }
  }
}

impl FromValue for Vec<Bytes> {
  fn from_value(value: Value) -> Result<Self> {
    match value {
      Value::List(items) | Value::Array(items) => items.into_iter().map(Bytes::from_value).collect(),
      Value::Null => Ok(Self::new()),
      other => type_error("[bytes]", &other),
    }
  }
}

impl<T: FromValue> FromValue for Option<T> {
  fn from_value(value: Value) -> Result<Self> {
    match value {
      Value::Null => Ok(None),
      other => T::from_value(other).map(Some),
    }
  }
}

impl<T: FromValue> FromValue for Vec<Option<T>> {
  fn from_value(value: Value) -> Result<Self> {
    match value {
      Value::Array(items) | Value::List(items) => {
        items.into_iter().map(Option::<T>::from_value).collect()
      },
      Value::StringArray(items) => items
        .into_iter()
        .map(|item| Option::<T>::from_value(item.map_or(Value::Null, Value::String)))
        .collect(),
      Value::PrimitiveArray(array) => array
        .to_values()
        .into_iter()
        .map(Option::<T>::from_value)
        .collect(),
      Value::Null => Ok(Self::new()),
      other => type_error("array", &other),
    }
  }
}
