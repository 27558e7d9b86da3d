// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

//! Message schemas: the ordered field descriptors of one message, bound to one value shape.

use super::{FieldCodec, FieldDescriptor, FieldInfo};
use crate::bean::{BeanDescriptor, DynBean};
use crate::error::Result;
use crate::schema::MessageDef;
use crate::value::{Record, Value};
use crate::wire::{ProtoInput, ProtoOutput};
use std::collections::HashMap;
use std::collections::btree_map::Entry;
use std::fmt;
use std::sync::{Arc, OnceLock};

// Messages whose highest field number is below this are indexed with a flat table.
const DENSE_INDEX_LIMIT: u32 = 1024;

enum FieldIndex {
  Dense(Vec<Option<usize>>),
  Sparse(HashMap<u32, usize>),
}

struct FieldTable {
  fields: Vec<FieldDescriptor>,
  by_number: FieldIndex,
  by_name: HashMap<String, usize>,
}

impl FieldTable {
  fn new(mut fields: Vec<FieldDescriptor>) -> Self {
    fields.sort_by_key(|f| f.info.number);
    let max_number = fields.last().map_or(0, |f| f.info.number);
    let by_number = if max_number < DENSE_INDEX_LIMIT {
      let mut index = vec![None; max_number as usize + 1];
      for (i, field) in fields.iter().enumerate() {
        index[field.info.number as usize] = Some(i);
      }
      FieldIndex::Dense(index)
    } else {
      FieldIndex::Sparse(
        fields
          .iter()
          .enumerate()
          .map(|(i, f)| (f.info.number, i))
          .collect(),
      )
    };
    let by_name = fields
      .iter()
      .enumerate()
      .map(|(i, f)| (f.info.name.clone(), i))
      .collect();
    Self {
      fields,
      by_number,
      by_name,
    }
  }

  fn by_number(&self, number: u32) -> Option<&FieldDescriptor> {
    let i = match &self.by_number {
      FieldIndex::Dense(index) => index.get(number as usize).copied().flatten(),
      FieldIndex::Sparse(index) => index.get(&number).copied(),
    }?;
    self.fields.get(i)
  }
}

//
// MessageSchema
//

/// The field descriptors of one message bound to one shape: a bean type, or generic records when
/// `bean` is `None`.
///
/// Fields are filled in after the schema is registered, which lets recursive messages refer to
/// their own schema. After that the schema is immutable and shared by every call.
pub struct MessageSchema {
  message: Arc<MessageDef>,
  bean: Option<Arc<BeanDescriptor>>,
  table: OnceLock<FieldTable>,
}

impl MessageSchema {
  pub(crate) const fn new(message: Arc<MessageDef>, bean: Option<Arc<BeanDescriptor>>) -> Self {
    Self {
      message,
      bean,
      table: OnceLock::new(),
    }
  }

  pub(crate) fn set_fields(&self, fields: Vec<FieldDescriptor>) {
    // The registry fills each schema exactly once.
    let _ = self.table.set(FieldTable::new(fields));
  }

  #[must_use]
  pub const fn message(&self) -> &Arc<MessageDef> {
    &self.message
  }

  #[must_use]
  pub const fn bean(&self) -> Option<&Arc<BeanDescriptor>> {
    self.bean.as_ref()
  }

  /// Field descriptors in ascending field number order.
  #[must_use]
  pub fn fields(&self) -> &[FieldDescriptor] {
    self.table.get().map_or(&[], |table| &table.fields)
  }

  #[must_use]
  pub fn field_by_number(&self, number: u32) -> Option<&FieldDescriptor> {
    self.table.get()?.by_number(number)
  }

  #[must_use]
  pub fn field_by_name(&self, name: &str) -> Option<&FieldDescriptor> {
    let table = self.table.get()?;
    table.by_name.get(name).map(|i| &table.fields[*i])
  }

  /// Writes the fields of a record or bean, without an enclosing tag.
  pub fn write_value(&self, value: &Value, out: &mut ProtoOutput<'_>) -> Result<()> {
    match value {
      Value::Null => Ok(()),
      Value::Record(record) => self.write_record(record, out),
      Value::Bean(bean) => self.write_bean(bean.as_ref(), out),
      other => Err(crate::error::Error::UnsupportedConversion {
        field: self.message.full_name.clone(),
        source_type: other.type_name(),
        target: format!("message {}", self.message.full_name),
      }),
    }
  }

  /// Record fields are looked up by proto field name. Entries without a field are ignored.
  pub fn write_record(&self, record: &Record, out: &mut ProtoOutput<'_>) -> Result<()> {
    for field in self.fields() {
      if let Some(value) = record.get(&field.info.name) {
        field.write(value, out)?;
      }
    }
    Ok(())
  }

  /// Bean fields are read through their getters. Properties without a getter count as absent.
  pub fn write_bean(&self, bean: &dyn DynBean, out: &mut ProtoOutput<'_>) -> Result<()> {
    let bean_type = bean.bean_type();
    if let Some(descriptor) = &self.bean
      && descriptor.bean_type() == bean_type
    {
      for field in self.fields() {
        let Some(property) = field.property.as_ref().filter(|p| p.is_readable()) else {
          continue;
        };
        field.write(&property.get(bean.as_any())?, out)?;
      }
      return Ok(());
    }

    // A bean of a type this schema was not bound to, e.g. inside a generic record. Its
    // properties are matched to fields by name.
    let descriptor = out.beans().get_or_create(bean_type);
    for field in self.fields() {
      let Some(property) = descriptor
        .property(&field.info.name)
        .filter(|p| p.is_readable())
      else {
        continue;
      };
      field.write(&property.get(bean.as_any())?, out)?;
    }
    Ok(())
  }

  /// Writes `value` as a length-delimited message field.
  pub fn write_field(&self, field: &FieldInfo, value: &Value, out: &mut ProtoOutput<'_>) -> Result<()> {
    out.write_length_delimited(field.number, |out| self.write_value(value, out))
  }

  /// Reads fields until the input (or the current length limit) is exhausted. Unknown fields and
  /// fields with an unexpected wire type are skipped.
  pub fn read_fields(&self, input: &mut ProtoInput<'_>) -> Result<Record> {
    let mut record = Record::new();
    let mut number = input.read_field_number()?;
    while number != 0 {
      let wire_type = input.last_wire_type()?;
      match self.field_by_number(number) {
        Some(field) if field.info.accepts(wire_type) => {
          let (value, next) = field.codec.read(&field.info, input).inspect_err(|e| {
            log::debug!("failed to decode field {}: {e}", field.info.qualified);
          })?;
          if field.keep_decoded {
            merge(&mut record, field, value);
          }
          number = next;
        },
        _ => {
          input.skip_field(wire_type)?;
          number = input.read_field_number()?;
        },
      }
    }
    Ok(record)
  }

  /// Reads a length-delimited nested message.
  pub fn read_nested(&self, input: &mut ProtoInput<'_>) -> Result<Value> {
    input
      .read_nested(|input| self.read_fields(input))
      .map(Value::Record)
  }
}

impl fmt::Debug for MessageSchema {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    // Child schemas are not printed, recursive messages would never terminate.
    f.debug_struct("MessageSchema")
      .field("message", &self.message.full_name)
      .field("bean", &self.bean.as_ref().map(|b| b.bean_type()))
      .field("fields", &self.fields().len())
      .finish()
  }
}

/// Stores a decoded value. A field seen again extends a repeated value, merges a message field by
/// field, adds map entries (replacing equal keys) and replaces anything else.
fn merge(record: &mut Record, field: &FieldDescriptor, value: Value) {
  match record.entry(field.info.name.clone()) {
    Entry::Vacant(entry) => {
      entry.insert(value);
    },
    Entry::Occupied(mut entry) => merge_into(entry.get_mut(), field, value),
  }
}

fn merge_into(slot: &mut Value, field: &FieldDescriptor, value: Value) {
  match (slot, value) {
    (Value::List(existing), Value::List(more)) | (Value::Array(existing), Value::Array(more)) => {
      existing.extend(more);
    },
    (Value::StringArray(existing), Value::StringArray(more)) => existing.extend(more),
    (Value::PrimitiveArray(existing), Value::PrimitiveArray(more)) => existing.extend(more),
    (Value::Record(existing), Value::Record(more)) => match &field.codec {
      FieldCodec::Message(schema) => {
        for (name, value) in more {
          match schema.field_by_name(&name) {
            Some(child) => merge(existing, child, value),
            None => {
              existing.insert(name, value);
            },
          }
        }
      },
      _ => existing.extend(more),
    },
    (slot, value) => *slot = value,
  }
}
