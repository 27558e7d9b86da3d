// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

#![allow(clippy::unwrap_used)]

use super::{FromValue, PrimitiveArray, Record, Value};
use crate::declared::ScalarKind;
use crate::error::Error;
use crate::test_models::User;
use assert_matches::assert_matches;
use bytes::Bytes;
use pretty_assertions::assert_eq;

#[test]
fn from_natives() {
  assert_eq!(Value::from(3_i32), Value::I32(3));
  assert_eq!(Value::from(u64::MAX), Value::U64(u64::MAX));
  assert_eq!(Value::from("x"), Value::String("x".to_string()));
  assert_eq!(
    Value::from(vec![1_i64, 2]),
    Value::PrimitiveArray(PrimitiveArray::I64(vec![1, 2]))
  );
  assert_eq!(
    Value::from(vec!["a".to_string()]),
    Value::List(vec![Value::String("a".to_string())])
  );
  assert_eq!(Value::from(None::<i32>), Value::Null);
  assert_eq!(Value::from(Some(1.5_f32)), Value::F32(1.5));
}

#[test]
fn array_keeps_nulls() {
  assert_eq!(
    Value::array([Some(1_i32), None]),
    Value::Array(vec![Value::I32(1), Value::Null])
  );
}

#[test]
fn primitive_array_extend() {
  let mut array = PrimitiveArray::I32(vec![1]);
  array.extend(PrimitiveArray::I32(vec![2, 3]));
  assert_eq!(array, PrimitiveArray::I32(vec![1, 2, 3]));
  assert_eq!(array.len(), 3);
  assert_eq!(array.kind(), ScalarKind::I32);

  array.extend(PrimitiveArray::Bool(vec![true]));
  assert_eq!(array, PrimitiveArray::Bool(vec![true]));
}

#[test]
fn type_names() {
  assert_eq!(Value::Null.type_name(), "null");
  assert_eq!(
    Value::PrimitiveArray(PrimitiveArray::F64(vec![])).type_name(),
    "[f64]"
  );
  assert_eq!(Value::Record(Record::new()).type_name(), "record");
  assert!(Value::bean(User::default()).type_name().ends_with("User"));
}

#[test]
fn typed_extraction() {
  assert_eq!(i32::from_value(Value::I32(5)).unwrap(), 5);
  assert_matches!(
    i32::from_value(Value::I64(5)),
    Err(Error::ValueType { expected: "i32", .. })
  );
  assert_eq!(
    Vec::<i32>::from_value(Value::List(vec![Value::I32(1), Value::I32(2)])).unwrap(),
    vec![1, 2]
  );
  assert_eq!(Vec::<u32>::from_value(Value::Null).unwrap(), Vec::<u32>::new());
  assert_eq!(
    String::from_value(Value::enum_symbol("RED")).unwrap(),
    "RED".to_string()
  );
  assert_eq!(
    Bytes::from_value(Value::Bytes(Bytes::from_static(b"ab"))).unwrap(),
    Bytes::from_static(b"ab")
  );
  assert_eq!(Option::<i64>::from_value(Value::Null).unwrap(), None);
  assert_eq!(
    Vec::<Option<String>>::from_value(Value::StringArray(vec![Some("a".to_string()), None]))
      .unwrap(),
    vec![Some("a".to_string()), None]
  );
  assert_matches!(
    Vec::<String>::from_value(Value::StringArray(vec![None])),
    Err(Error::ValueType { .. })
  );
}

#[test]
fn beans() {
  let user = User::new("a", 1);
  let value = Value::bean(user.clone());
  assert_eq!(value.clone(), value);
  assert_ne!(value, Value::bean(User::new("b", 1)));
  assert_eq!(value.into_bean::<User>().unwrap(), user);

  assert_eq!(Value::Null.into_optional_bean::<User>().unwrap(), None);
  assert_matches!(
    Value::I32(1).into_bean::<User>(),
    Err(Error::ValueType { actual, .. }) if actual == "i32"
  );

  let users = Value::beans([User::new("a", 1), User::new("b", 2)]);
  assert_eq!(
    users.into_beans::<User>().unwrap(),
    vec![User::new("a", 1), User::new("b", 2)]
  );
}
