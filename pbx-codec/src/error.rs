// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

//
// Error
//

/// Every failure is returned from the encode or decode call that hit it. Nothing is retried,
/// and no partial result is produced.
#[derive(thiserror::Error, Debug)]
pub enum Error {
  /// A bound property cannot hold the proto field it is bound to. Raised while building
  /// descriptors, before any bytes are touched.
  #[error("field {field}: proto type {proto_type} is not compatible with declared type {declared}")]
  SchemaMismatch {
    field: String,
    proto_type: String,
    declared: String,
  },

  #[error("invalid enum value {value} for proto enum {enum_name}, field={field}")]
  InvalidEnumValue {
    field: String,
    enum_name: String,
    value: String,
  },

  #[error("not supported: type {source_type} to proto {target}, field={field}")]
  UnsupportedConversion {
    field: String,
    source_type: String,
    target: String,
  },

  #[error("repeated field {field} does not support null elements")]
  NullElementInRepeatedField { field: String },

  #[error("malformed protobuf buffer: {0}")]
  MalformedBuffer(#[from] protobuf::Error),

  #[error("invalid wire data: {0}")]
  InvalidWire(String),

  #[error("message nesting exceeds the recursion limit of {0}")]
  RecursionLimitExceeded(u32),

  #[error("property {property} of {bean} is not readable")]
  PropertyNotReadable {
    bean: &'static str,
    property: String,
  },

  #[error("property {property} of {bean} is not writable")]
  PropertyNotWritable {
    bean: &'static str,
    property: String,
  },

  #[error("expected {expected}, got {actual}")]
  ValueType {
    expected: &'static str,
    actual: String,
  },

  #[error("can not find proto message {0}")]
  UnknownMessage(String),

  #[error("can not find proto enum {0}")]
  UnknownEnum(String),

  #[error("invalid proto schema: {0}")]
  InvalidSchema(String),
}

pub type Result<T> = std::result::Result<T, Error>;
