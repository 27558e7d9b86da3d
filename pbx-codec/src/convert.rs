// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

//! Conversion of decoded intermediate values into declared types.
//!
//! Decoding produces records, lists, primitive arrays and enum numbers. Callers that declared a
//! bean, an application enum or a specific sequence shape get those values converted after
//! decoding, using the descriptors of the field they were read from.

#[cfg(test)]
#[path = "./convert_test.rs"]
mod tests;

use crate::codec::FieldDescriptor;
use crate::codec::message::MessageSchema;
use crate::declared::{DeclaredType, EnumType, ScalarKind};
use crate::error::{Error, Result};
use crate::value::{PrimitiveArray, Record, Value};
use crate::wire::scalar::NativeScalar;

/// Whether `value` has to be converted before it can be handed out as `target`.
///
/// Sequences of beans always report true, even when every element already is a bean of the
/// right type. Converting those is a no-op.
#[must_use]
pub fn need_convert(value: &Value, target: &DeclaredType) -> bool {
  if value.is_null() {
    return false;
  }
  match target {
    DeclaredType::Any => false,
    DeclaredType::Collection(element) | DeclaredType::ObjectArray(element)
      if matches!(**element, DeclaredType::Bean(_)) =>
    {
      true
    },
    _ => !is_assignable(value, target),
  }
}

/// Whether `value` already has the in-memory shape of `target`.
#[must_use]
pub fn is_assignable(value: &Value, target: &DeclaredType) -> bool {
  match (target, value) {
    (_, Value::Null) | (DeclaredType::Any, _) => true,
    (DeclaredType::Scalar(kind) | DeclaredType::Boxed(kind), value) => {
      value.scalar_kind() == Some(*kind)
    },
    (DeclaredType::String, Value::String(_))
    | (DeclaredType::Bytes, Value::Bytes(_))
    | (DeclaredType::StringArray, Value::StringArray(_))
    | (DeclaredType::Record, Value::Record(_)) => true,
    (DeclaredType::Enum(enum_type), Value::Enum(symbol)) => enum_type.contains(symbol),
    (DeclaredType::PrimitiveArray(kind), Value::PrimitiveArray(array)) => array.kind() == *kind,
    (DeclaredType::ObjectArray(element), Value::Array(items))
    | (DeclaredType::Collection(element), Value::List(items)) => {
      items.iter().all(|item| is_assignable(item, element))
    },
    (DeclaredType::Map(element), Value::Record(entries)) => {
      entries.values().all(|item| is_assignable(item, element))
    },
    (DeclaredType::Bean(bean_type), Value::Bean(bean)) => bean.bean_type() == *bean_type,
    _ => false,
  }
}

/// Builds the value of a message schema from a decoded record: a bean when the schema is bound
/// to one, the record itself otherwise.
pub(crate) fn convert_message(schema: &MessageSchema, record: Record) -> Result<Value> {
  let Some(descriptor) = schema.bean() else {
    return Ok(Value::Record(record));
  };

  let mut bean = descriptor.instantiate();
  for (name, value) in record {
    let Some(field) = schema.field_by_name(&name) else {
      continue;
    };
    let Some(property) = field.property.as_ref().filter(|p| p.is_writable()) else {
      continue;
    };
    let value = convert_value(field, value, property.declared())?;
    property.set(bean.as_any_mut(), value)?;
  }
  Ok(Value::Bean(bean))
}

/// Converts a value decoded from `field` into `declared`.
pub(crate) fn convert_value(
  field: &FieldDescriptor,
  value: Value,
  declared: &DeclaredType,
) -> Result<Value> {
  if value.is_null() {
    return Ok(match declared {
      DeclaredType::Scalar(kind) => kind.default_value(),
      _ => Value::Null,
    });
  }
  if !need_convert(&value, declared) {
    return Ok(value);
  }

  match declared {
    DeclaredType::Any | DeclaredType::Record => Ok(value),
    DeclaredType::Scalar(kind) | DeclaredType::Boxed(kind) => to_scalar(field, &value, *kind),
    DeclaredType::String => to_text(field, value),
    DeclaredType::Bytes => Err(unsupported(field, &value, declared)),
    DeclaredType::Enum(enum_type) => to_enum(field, value, enum_type),
    DeclaredType::PrimitiveArray(kind) => to_primitive_array(field, value, *kind),
    DeclaredType::StringArray => to_string_array(field, value),
    DeclaredType::ObjectArray(element) => {
      let items = into_items(field, value, declared)?;
      Ok(Value::Array(convert_items(field, items, element)?))
    },
    DeclaredType::Collection(element) => {
      let items = into_items(field, value, declared)?;
      Ok(Value::List(convert_items(field, items, element)?))
    },
    DeclaredType::Map(element) => match value {
      Value::Record(entries) => entries
        .into_iter()
        .map(|(key, item)| Ok((key, convert_value(field, item, element)?)))
        .collect::<Result<Record>>()
        .map(Value::Record),
      other => Err(unsupported(field, &other, declared)),
    },
    DeclaredType::Bean(bean_type) => match value {
      Value::Bean(bean) if bean.bean_type() == *bean_type => Ok(Value::Bean(bean)),
      Value::Record(record) => match field.codec.message_schema() {
        Some(schema) if schema.bean().map(|b| b.bean_type()) == Some(*bean_type) => {
          convert_message(schema, record)
        },
        _ => Err(unsupported(field, &Value::Record(record), declared)),
      },
      other => Err(unsupported(field, &other, declared)),
    },
  }
}

fn unsupported(field: &FieldDescriptor, value: &Value, target: &DeclaredType) -> Error {
  field.info.unsupported(value, target)
}

fn convert_items(
  field: &FieldDescriptor,
  items: Vec<Value>,
  element: &DeclaredType,
) -> Result<Vec<Value>> {
  items
    .into_iter()
    .map(|item| convert_value(field, item, element))
    .collect()
}

fn into_items(field: &FieldDescriptor, value: Value, target: &DeclaredType) -> Result<Vec<Value>> {
  match value {
    Value::List(items) | Value::Array(items) => Ok(items),
    Value::PrimitiveArray(array) => Ok(array.to_values()),
    Value::StringArray(items) => Ok(
      items
        .into_iter()
        .map(|item| item.map_or(Value::Null, Value::String))
        .collect(),
    ),
    other => Err(unsupported(field, &other, target)),
  }
}

fn to_scalar(field: &FieldDescriptor, value: &Value, kind: ScalarKind) -> Result<Value> {
  fn native<N: NativeScalar>(value: &Value) -> Option<Value> {
    N::from_value(value).map(N::into_value)
  }

  match kind {
    ScalarKind::Bool => native::<bool>(value),
    ScalarKind::I32 => native::<i32>(value),
    ScalarKind::I64 => native::<i64>(value),
    ScalarKind::U32 => native::<u32>(value),
    ScalarKind::U64 => native::<u64>(value),
    ScalarKind::F32 => native::<f32>(value),
    ScalarKind::F64 => native::<f64>(value),
  }
  .ok_or_else(|| field.info.unsupported(value, kind))
}

/// Text form of a scalar. Enum numbers decoded from an enum field become their proto name.
fn to_text(field: &FieldDescriptor, value: Value) -> Result<Value> {
  let text = match value {
    Value::String(text) | Value::Enum(text) => text,
    Value::I32(number) => field
      .codec
      .enum_def()
      .and_then(|def| def.name_of(number))
      .map_or_else(|| number.to_string(), str::to_string),
    Value::Bool(v) => v.to_string(),
    Value::I64(v) => v.to_string(),
    Value::U32(v) => v.to_string(),
    Value::U64(v) => v.to_string(),
    Value::F32(v) => v.to_string(),
    Value::F64(v) => v.to_string(),
    other => return Err(unsupported(field, &other, &DeclaredType::String)),
  };
  Ok(Value::String(text))
}

/// Maps a proto enum number to the application enum symbol of the same name.
fn to_enum(field: &FieldDescriptor, value: Value, enum_type: &EnumType) -> Result<Value> {
  let target = DeclaredType::Enum(*enum_type);
  let symbol = match value {
    Value::String(symbol) | Value::Enum(symbol) => symbol,
    Value::I32(number) => {
      let Some(enum_def) = field.codec.enum_def() else {
        return Err(unsupported(field, &Value::I32(number), &target));
      };
      enum_def
        .name_of(number)
        .ok_or_else(|| Error::InvalidEnumValue {
          field: field.info.qualified.clone(),
          enum_name: enum_def.full_name.clone(),
          value: number.to_string(),
        })?
        .to_string()
    },
    other => return Err(unsupported(field, &other, &target)),
  };

  if enum_type.contains(&symbol) {
    Ok(Value::Enum(symbol))
  } else {
    Err(Error::UnsupportedConversion {
      field: field.info.qualified.clone(),
      source_type: format!("enum symbol {symbol}"),
      target: target.to_string(),
    })
  }
}

fn to_primitive_array(field: &FieldDescriptor, value: Value, kind: ScalarKind) -> Result<Value> {
  fn natives<N: NativeScalar>(field: &FieldDescriptor, items: &[Value]) -> Result<PrimitiveArray> {
    items
      .iter()
      .map(|item| {
        if item.is_null() {
          return Err(field.info.null_element());
        }
        N::from_value(item).ok_or_else(|| field.info.unsupported(item, N::KIND))
      })
      .collect::<Result<Vec<N>>>()
      .map(N::wrap)
  }

  let items = into_items(field, value, &DeclaredType::PrimitiveArray(kind))?;
  let array = match kind {
    ScalarKind::Bool => natives::<bool>(field, &items),
    ScalarKind::I32 => natives::<i32>(field, &items),
    ScalarKind::I64 => natives::<i64>(field, &items),
    ScalarKind::U32 => natives::<u32>(field, &items),
    ScalarKind::U64 => natives::<u64>(field, &items),
    ScalarKind::F32 => natives::<f32>(field, &items),
    ScalarKind::F64 => natives::<f64>(field, &items),
  }?;
  Ok(Value::PrimitiveArray(array))
}

fn to_string_array(field: &FieldDescriptor, value: Value) -> Result<Value> {
  into_items(field, value, &DeclaredType::StringArray)?
    .into_iter()
    .map(|item| match item {
      Value::Null => Ok(None),
      item => match to_text(field, item)? {
        Value::String(text) => Ok(Some(text)),
        other => Err(unsupported(field, &other, &DeclaredType::StringArray)),
      },
    })
    .collect::<Result<Vec<_>>>()
    .map(Value::StringArray)
}
