// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

//! Beans and proto schemas shared by the unit tests.

#![allow(clippy::unwrap_used)]

use crate::bean::{PropertiesBuilder, ProtoBean};
use crate::declared::{DeclaredType, EnumType, ScalarKind};
use crate::error::{Error, Result};
use crate::schema::{EnumDef, FieldDef, FieldType, MessageDef, ProtoSchema, ScalarType};
use crate::value::{FromValue, Record, Value};
use bytes::Bytes;
use std::collections::BTreeMap;

//
// Color
//

pub const COLOR: EnumType = EnumType::new("Color", &["RED", "YELLOW", "BLUE"]);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Color {
  #[default]
  Red,
  Yellow,
  Blue,
}

impl Color {
  pub const fn symbol(self) -> &'static str {
    match self {
      Self::Red => "RED",
      Self::Yellow => "YELLOW",
      Self::Blue => "BLUE",
    }
  }
}

impl From<Color> for Value {
  fn from(color: Color) -> Self {
    Self::enum_symbol(color.symbol())
  }
}

impl FromValue for Color {
  fn from_value(value: Value) -> Result<Self> {
    match value {
      Value::Enum(symbol) | Value::String(symbol) => match symbol.as_str() {
        "RED" => Ok(Self::Red),
        "YELLOW" => Ok(Self::Yellow),
        "BLUE" => Ok(Self::Blue),
        _ => Err(Error::ValueType {
          expected: "Color",
          actual: symbol,
        }),
      },
      other => Err(Error::ValueType {
        expected: "Color",
        actual: other.type_name(),
      }),
    }
  }
}

fn colors_from(value: Value) -> Result<Vec<Color>> {
  match value {
    Value::List(items) | Value::Array(items) => items.into_iter().map(Color::from_value).collect(),
    Value::Null => Ok(Vec::new()),
    other => Err(Error::ValueType {
      expected: "[Color]",
      actual: other.type_name(),
    }),
  }
}

//
// User
//

#[derive(Debug, Clone, Default, PartialEq)]
pub struct User {
  pub name: String,
  pub id: i64,
}

impl User {
  pub fn new(name: &str, id: i64) -> Self {
    Self {
      name: name.to_string(),
      id,
    }
  }
}

impl ProtoBean for User {
  fn describe(properties: &mut PropertiesBuilder<Self>) {
    properties
      .bind("name", DeclaredType::String, |b| &b.name, |b| &mut b.name)
      .bind("id", DeclaredType::Scalar(ScalarKind::I64), |b| &b.id, |b| &mut b.id);
  }
}

//
// Root
//

/// Exercises every field kind of the `test.Root` message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Root {
  pub int_value: i32,
  pub long_value: i64,
  pub uint_value: u32,
  pub ulong_value: u64,
  pub sint_value: i32,
  pub slong_value: i64,
  pub fixed_value: u32,
  pub fixed64_value: u64,
  pub sfixed_value: i32,
  pub sfixed64_value: i64,
  pub float_value: f32,
  pub double_value: f64,
  pub bool_value: bool,
  pub string_value: String,
  pub bytes_value: Bytes,
  pub color: Color,
  pub user: Option<User>,
  pub users: Vec<User>,
  pub ints: Vec<i32>,
  pub longs: Vec<Option<i64>>,
  pub colors: Vec<Color>,
  pub names: Vec<String>,
  pub scores: BTreeMap<String, i32>,
  pub users_by_id: BTreeMap<String, User>,
  pub sfixed32s_not_packed: Vec<i32>,
}

impl ProtoBean for Root {
  fn describe(properties: &mut PropertiesBuilder<Self>) {
    use DeclaredType::Scalar;

    properties
      .bind("intValue", Scalar(ScalarKind::I32), |b| &b.int_value, |b| &mut b.int_value)
      .bind("longValue", Scalar(ScalarKind::I64), |b| &b.long_value, |b| &mut b.long_value)
      .bind("uintValue", Scalar(ScalarKind::U32), |b| &b.uint_value, |b| &mut b.uint_value)
      .bind("ulongValue", Scalar(ScalarKind::U64), |b| &b.ulong_value, |b| &mut b.ulong_value)
      .bind("sintValue", Scalar(ScalarKind::I32), |b| &b.sint_value, |b| &mut b.sint_value)
      .bind("slongValue", Scalar(ScalarKind::I64), |b| &b.slong_value, |b| &mut b.slong_value)
      .bind("fixedValue", Scalar(ScalarKind::U32), |b| &b.fixed_value, |b| &mut b.fixed_value)
      .bind(
        "fixed64Value",
        Scalar(ScalarKind::U64),
        |b| &b.fixed64_value,
        |b| &mut b.fixed64_value,
      )
      .bind("sfixedValue", Scalar(ScalarKind::I32), |b| &b.sfixed_value, |b| &mut b.sfixed_value)
      .bind(
        "sfixed64Value",
        Scalar(ScalarKind::I64),
        |b| &b.sfixed64_value,
        |b| &mut b.sfixed64_value,
      )
      .bind("floatValue", Scalar(ScalarKind::F32), |b| &b.float_value, |b| &mut b.float_value)
      .bind("doubleValue", Scalar(ScalarKind::F64), |b| &b.double_value, |b| &mut b.double_value)
      .bind("boolValue", Scalar(ScalarKind::Bool), |b| &b.bool_value, |b| &mut b.bool_value)
      .bind("stringValue", DeclaredType::String, |b| &b.string_value, |b| &mut b.string_value)
      .bind("bytesValue", DeclaredType::Bytes, |b| &b.bytes_value, |b| &mut b.bytes_value)
      .bind("color", DeclaredType::Enum(COLOR), |b| &b.color, |b| &mut b.color)
      .field(
        "user",
        DeclaredType::bean::<User>(),
        |b| b.user.clone().map_or(Value::Null, Value::bean),
        |b, v| {
          b.user = v.into_optional_bean()?;
          Ok(())
        },
      )
      .field(
        "users",
        DeclaredType::collection(DeclaredType::bean::<User>()),
        |b| Value::beans(b.users.clone()),
        |b, v| {
          b.users = v.into_beans()?;
          Ok(())
        },
      )
      .bind(
        "ints",
        DeclaredType::PrimitiveArray(ScalarKind::I32),
        |b| &b.ints,
        |b| &mut b.ints,
      )
      .field(
        "longs",
        DeclaredType::object_array(DeclaredType::Boxed(ScalarKind::I64)),
        |b| Value::array(b.longs.clone()),
        |b, v| {
          b.longs = FromValue::from_value(v)?;
          Ok(())
        },
      )
      .field(
        "colors",
        DeclaredType::collection(DeclaredType::Enum(COLOR)),
        |b| Value::List(b.colors.iter().map(|c| (*c).into()).collect()),
        |b, v| {
          b.colors = colors_from(v)?;
          Ok(())
        },
      )
      .bind(
        "names",
        DeclaredType::collection(DeclaredType::String),
        |b| &b.names,
        |b| &mut b.names,
      )
      .field(
        "scores",
        DeclaredType::map(Scalar(ScalarKind::I32)),
        |b| {
          Value::Record(
            b.scores
              .iter()
              .map(|(k, v)| (k.clone(), Value::I32(*v)))
              .collect(),
          )
        },
        |b, v| {
          b.scores = Record::from_value(v)?
            .into_iter()
            .map(|(k, v)| Ok((k, i32::from_value(v)?)))
            .collect::<Result<_>>()?;
          Ok(())
        },
      )
      .field(
        "usersById",
        DeclaredType::map(DeclaredType::bean::<User>()),
        |b| {
          Value::Record(
            b.users_by_id
              .iter()
              .map(|(k, v)| (k.clone(), Value::bean(v.clone())))
              .collect(),
          )
        },
        |b, v| {
          b.users_by_id = Record::from_value(v)?
            .into_iter()
            .map(|(k, v)| Ok((k, v.into_bean()?)))
            .collect::<Result<_>>()?;
          Ok(())
        },
      )
      .field(
        "sfixed32sNotPacked",
        DeclaredType::collection(DeclaredType::Boxed(ScalarKind::I32)),
        |b| Value::List(b.sfixed32s_not_packed.iter().copied().map(Value::I32).collect()),
        |b, v| {
          b.sfixed32s_not_packed = FromValue::from_value(v)?;
          Ok(())
        },
      );
  }
}

/// A fully populated `Root`, with no field at its default.
pub fn full_root() -> Root {
  Root {
    int_value: -7,
    long_value: i64::MIN,
    uint_value: u32::MAX,
    ulong_value: u64::MAX,
    sint_value: -150,
    slong_value: 1 << 40,
    fixed_value: 0xDEAD_BEEF,
    fixed64_value: 42,
    sfixed_value: -1,
    sfixed64_value: i64::MAX,
    float_value: 1.5,
    double_value: -2.25,
    bool_value: true,
    string_value: "hello".to_string(),
    bytes_value: Bytes::from_static(b"\x00\x01\xff"),
    color: Color::Blue,
    user: Some(User::new("alice", 1)),
    users: vec![User::new("bob", 2), User::default(), User::new("carol", 3)],
    ints: vec![i32::MIN, 0, i32::MAX],
    longs: vec![Some(1), Some(-1)],
    colors: vec![Color::Yellow, Color::Red, Color::Blue],
    names: vec!["a".to_string(), String::new(), "c".to_string()],
    scores: [("x".to_string(), 1), ("y".to_string(), 0)].into(),
    users_by_id: [("7".to_string(), User::new("dave", 7))].into(),
    sfixed32s_not_packed: vec![30, -30],
  }
}

//
// Schemas
//

pub fn color_enum() -> EnumDef {
  EnumDef::new("Color", [("RED", 0), ("YELLOW", 1), ("BLUE", 2)])
}

pub fn user_message() -> MessageDef {
  MessageDef::new("User")
    .field(FieldDef::scalar("name", 1, ScalarType::String))
    .field(FieldDef::scalar("id", 2, ScalarType::Int64))
}

pub fn root_message() -> MessageDef {
  MessageDef::new("Root")
    .field(FieldDef::scalar("intValue", 1, ScalarType::Int32))
    .field(FieldDef::scalar("longValue", 2, ScalarType::Int64))
    .field(FieldDef::scalar("uintValue", 3, ScalarType::UInt32))
    .field(FieldDef::scalar("ulongValue", 4, ScalarType::UInt64))
    .field(FieldDef::scalar("sintValue", 5, ScalarType::SInt32))
    .field(FieldDef::scalar("slongValue", 6, ScalarType::SInt64))
    .field(FieldDef::scalar("fixedValue", 7, ScalarType::Fixed32))
    .field(FieldDef::scalar("fixed64Value", 8, ScalarType::Fixed64))
    .field(FieldDef::scalar("sfixedValue", 9, ScalarType::SFixed32))
    .field(FieldDef::scalar("sfixed64Value", 10, ScalarType::SFixed64))
    .field(FieldDef::scalar("floatValue", 11, ScalarType::Float))
    .field(FieldDef::scalar("doubleValue", 12, ScalarType::Double))
    .field(FieldDef::scalar("boolValue", 13, ScalarType::Bool))
    .field(FieldDef::scalar("stringValue", 14, ScalarType::String))
    .field(FieldDef::scalar("bytesValue", 15, ScalarType::Bytes))
    .field(FieldDef::enumeration("color", 16, "Color"))
    .field(FieldDef::message("user", 17, "User"))
    .field(FieldDef::message("users", 18, "User").repeated())
    .field(
      FieldDef::scalar("ints", 19, ScalarType::Int32)
        .repeated()
        .packed(true),
    )
    .field(FieldDef::scalar("longs", 20, ScalarType::Int64).repeated())
    .field(
      FieldDef::enumeration("colors", 21, "Color")
        .repeated()
        .packed(true),
    )
    .field(FieldDef::scalar("names", 22, ScalarType::String).repeated())
    .field(FieldDef::map(
      "scores",
      23,
      ScalarType::String,
      FieldType::Scalar(ScalarType::Int32),
    ))
    .field(FieldDef::map(
      "usersById",
      24,
      ScalarType::Int64,
      FieldType::Message("User".to_string()),
    ))
    .field(FieldDef::scalar("sfixed32sNotPacked", 96, ScalarType::SFixed32).repeated())
}

/// A message referring to itself, directly and through a repeated field.
pub fn node_message() -> MessageDef {
  MessageDef::new("Node")
    .field(FieldDef::scalar("value", 1, ScalarType::Int32))
    .field(FieldDef::message("child", 2, "Node"))
    .field(FieldDef::message("children", 3, "Node").repeated())
}

/// The `test` package: `Root`, `User`, `Node`, `Color` and a few wrapper messages.
pub fn root_proto() -> ProtoSchema {
  ProtoSchema::builder("test")
    .enumeration(color_enum())
    .message(user_message())
    .message(root_message())
    .message(node_message())
    .message(MessageDef::new("Int32Value").field(FieldDef::scalar("value", 1, ScalarType::Int32)))
    .message(MessageDef::new("ColorValue").field(FieldDef::enumeration("value", 1, "Color")))
    .message(MessageDef::new("UserList").field(FieldDef::message("value", 1, "User").repeated()))
    .message(
      MessageDef::new("Int32List").field(
        FieldDef::scalar("value", 1, ScalarType::Int32)
          .repeated()
          .packed(true),
      ),
    )
    .build()
    .unwrap()
}
