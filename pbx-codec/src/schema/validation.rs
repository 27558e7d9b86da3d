// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

//! Compatibility checks between proto fields and the declared type of the property bound to
//! them. Run once per field while descriptors are built.

#[cfg(test)]
#[path = "./validation_test.rs"]
mod tests;

use super::{ANY_MESSAGE, FieldDef, FieldType, ScalarType};
use crate::declared::{DeclaredType, ScalarKind};
use crate::error::{Error, Result};

/// Result of validating a declared type against a proto field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
  /// The types are compatible
  Ok,
  /// Type mismatch
  TypeMismatch { proto: String, declared: String },
}

impl ValidationResult {
  #[must_use]
  pub const fn is_ok(&self) -> bool {
    matches!(self, Self::Ok)
  }

  /// Converts the result into a [`Error::SchemaMismatch`] naming `field`.
  pub fn into_result(self, field: &str) -> Result<()> {
    match self {
      Self::Ok => Ok(()),
      Self::TypeMismatch { proto, declared } => Err(Error::SchemaMismatch {
        field: field.to_string(),
        proto_type: proto,
        declared,
      }),
    }
  }
}

/// Validates that a property of type `declared` can hold values of `field`.
#[must_use]
pub fn validate_field_type(field: &FieldDef, declared: &DeclaredType) -> ValidationResult {
  let compatible = match (&field.field_type, declared) {
    (_, DeclaredType::Any) => true,

    // Maps
    (FieldType::Map { .. }, DeclaredType::Record) => true,
    (FieldType::Map { value, .. }, DeclaredType::Map(element)) => singular_compatible(value, element),
    (FieldType::Map { .. }, _) => false,

    // Repeated fields
    (field_type, declared) if field.repeated => repeated_compatible(field_type, declared),

    // Singular fields
    (field_type, declared) => singular_compatible(field_type, declared),
  };

  if compatible {
    ValidationResult::Ok
  } else {
    ValidationResult::TypeMismatch {
      proto: format_proto_type(field),
      declared: declared.to_string(),
    }
  }
}

fn repeated_compatible(field_type: &FieldType, declared: &DeclaredType) -> bool {
  match (field_type, declared) {
    (FieldType::Scalar(scalar), DeclaredType::PrimitiveArray(kind)) => {
      scalar.native_kind() == Some(*kind)
    },
    (FieldType::Enum(_), DeclaredType::PrimitiveArray(kind)) => *kind == ScalarKind::I32,
    (FieldType::Scalar(scalar), DeclaredType::StringArray) => *scalar != ScalarType::Bytes,
    (field_type, DeclaredType::ObjectArray(element) | DeclaredType::Collection(element)) => {
      singular_compatible(field_type, element)
    },
    _ => false,
  }
}

fn singular_compatible(field_type: &FieldType, declared: &DeclaredType) -> bool {
  // Packed messages decode to records carrying their type name.
  if let FieldType::Message(name) = field_type
    && name == ANY_MESSAGE
  {
    return matches!(declared, DeclaredType::Any | DeclaredType::Record);
  }

  match (field_type, declared) {
    (_, DeclaredType::Any)
    | (FieldType::Scalar(ScalarType::String), DeclaredType::String)
    | (FieldType::Scalar(ScalarType::Bytes), DeclaredType::Bytes)
    | (
      FieldType::Enum(_),
      DeclaredType::Enum(_)
      | DeclaredType::String
      | DeclaredType::Scalar(ScalarKind::I32)
      | DeclaredType::Boxed(ScalarKind::I32),
    )
    | (
      FieldType::Message(_),
      DeclaredType::Bean(_) | DeclaredType::Record | DeclaredType::Map(_),
    ) => true,
    (FieldType::Scalar(scalar), DeclaredType::Scalar(kind) | DeclaredType::Boxed(kind)) => {
      scalar.native_kind() == Some(*kind)
    },
    // Numbers and bools may be carried as text.
    (FieldType::Scalar(scalar), DeclaredType::String) => scalar.native_kind().is_some(),
    _ => false,
  }
}

/// Formats a proto field type for error messages.
fn format_proto_type(field: &FieldDef) -> String {
  if field.repeated && !field.is_map() {
    format!("repeated {}", field.field_type)
  } else {
    field.field_type.to_string()
  }
}
