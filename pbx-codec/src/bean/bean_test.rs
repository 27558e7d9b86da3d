// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

#![allow(clippy::unwrap_used)]

use super::{BeanDescriptorManager, BeanType, PropertiesBuilder, ProtoBean};
use crate::declared::{DeclaredType, ScalarKind};
use crate::error::Error;
use crate::test_models::User;
use crate::value::{FromValue, Value};
use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq)]
struct Counter {
  count: i32,
  label: String,
  touched: bool,
}

impl ProtoBean for Counter {
  fn describe(properties: &mut PropertiesBuilder<Self>) {
    // The accessor pair is registered after the field and still wins.
    properties
      .bind(
        "count",
        DeclaredType::Scalar(ScalarKind::I64),
        |b| &b.count,
        |b| &mut b.count,
      )
      .getter("count", DeclaredType::Scalar(ScalarKind::I32), |b| {
        Value::I32(b.count * 10)
      })
      .setter("count", DeclaredType::Scalar(ScalarKind::I32), |b, v| {
        b.count = i32::from_value(v)? / 10;
        b.touched = true;
        Ok(())
      })
      .getter("label", DeclaredType::String, |b| Value::String(b.label.clone()))
      .setter("secret", DeclaredType::String, |b, v| {
        b.label = String::from_value(v)?;
        Ok(())
      });
  }
}

#[test]
fn accessors_win_over_fields() {
  let descriptor = BeanDescriptorManager::new().get_or_create(BeanType::of::<Counter>());
  let count = descriptor.property("count").unwrap();
  assert_eq!(count.declared(), &DeclaredType::Scalar(ScalarKind::I32));

  let mut bean = Counter {
    count: 2,
    ..Counter::default()
  };
  assert_eq!(count.get(&bean).unwrap(), Value::I32(20));

  count.set(&mut bean, Value::I32(70)).unwrap();
  assert_eq!(bean.count, 7);
  assert!(bean.touched);
}

#[test]
fn read_only_and_write_only() {
  let descriptor = BeanDescriptorManager::new().get_or_create(BeanType::of::<Counter>());
  let label = descriptor.property("label").unwrap();
  assert!(label.is_readable());
  assert!(!label.is_writable());

  let mut bean = Counter::default();
  assert_matches!(
    label.set(&mut bean, Value::from("x")),
    Err(Error::PropertyNotWritable { property, .. }) if property == "label"
  );

  let secret = descriptor.property("secret").unwrap();
  assert!(!secret.is_readable());
  assert_matches!(
    secret.get(&bean),
    Err(Error::PropertyNotReadable { property, .. }) if property == "secret"
  );
  secret.set(&mut bean, Value::from("hidden")).unwrap();
  assert_eq!(bean.label, "hidden");
}

#[test]
fn declaration_order_is_kept() {
  let descriptor = BeanDescriptorManager::new().get_or_create(BeanType::of::<Counter>());
  let names: Vec<_> = descriptor.properties().iter().map(|p| p.name()).collect();
  assert_eq!(names, vec!["count", "label", "secret"]);
  assert!(descriptor.property("missing").is_none());
}

#[test]
fn wrong_bean_type() {
  let descriptor = BeanDescriptorManager::new().get_or_create(BeanType::of::<User>());
  let name = descriptor.property("name").unwrap();
  assert_matches!(name.get(&Counter::default()), Err(Error::ValueType { .. }));
}

#[test]
fn descriptors_are_cached_per_type() {
  let manager = BeanDescriptorManager::new();
  let first = manager.get_or_create(BeanType::of::<User>());
  let second = manager.get_or_create(BeanType::of::<User>());
  assert!(Arc::ptr_eq(&first, &second));
  assert!(!Arc::ptr_eq(
    &first,
    &manager.get_or_create(BeanType::of::<Counter>())
  ));
}

#[test]
fn concurrent_lookups_share_one_descriptor() {
  let manager = Arc::new(BeanDescriptorManager::new());
  let handles: Vec<_> = (0 .. 8)
    .map(|_| {
      let manager = manager.clone();
      std::thread::spawn(move || manager.get_or_create(BeanType::of::<User>()))
    })
    .collect();
  let descriptors: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
  for descriptor in &descriptors[1 ..] {
    assert!(Arc::ptr_eq(&descriptors[0], descriptor));
  }
}

#[test]
fn instantiate_default() {
  let descriptor = BeanDescriptorManager::new().get_or_create(BeanType::of::<User>());
  let bean = descriptor.instantiate();
  assert_eq!(bean.bean_type(), BeanType::of::<User>());
  assert_eq!(Value::Bean(bean).into_bean::<User>().unwrap(), User::default());
}
