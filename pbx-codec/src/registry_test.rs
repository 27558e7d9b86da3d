// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

#![allow(clippy::unwrap_used)]

use super::SchemaBuilder;
use crate::bean::{BeanDescriptorManager, BeanType, PropertiesBuilder, ProtoBean};
use crate::codec::{FieldCodec, Representation};
use crate::declared::{DeclaredType, ScalarKind};
use crate::error::Error;
use crate::test_models::{Root, User, root_proto};
use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq)]
struct Partial {
  name: String,
  extra: i32,
}

impl ProtoBean for Partial {
  fn describe(properties: &mut PropertiesBuilder<Self>) {
    properties
      .bind("name", DeclaredType::String, |b| &b.name, |b| &mut b.name)
      .bind("extra", DeclaredType::Scalar(ScalarKind::I32), |b| &b.extra, |b| &mut b.extra);
  }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Mismatched {
  id: String,
}

impl ProtoBean for Mismatched {
  fn describe(properties: &mut PropertiesBuilder<Self>) {
    properties.bind("id", DeclaredType::Bytes, |b| &b.id, |b| &mut b.id);
  }
}

#[test]
fn root_bean_schema() {
  let proto = Arc::new(root_proto());
  let beans = BeanDescriptorManager::new();
  let mut builder = SchemaBuilder::new(&proto, &beans);
  let schema = builder
    .message_schema(proto.message("Root").unwrap(), Some(BeanType::of::<Root>()))
    .unwrap();

  assert_eq!(schema.fields().len(), 25);
  assert!(schema.fields().iter().all(|f| f.keep_decoded && f.property.is_some()));
  assert_eq!(schema.field_by_number(96).unwrap().info.name, "sfixed32sNotPacked");
  assert!(schema.field_by_number(97).is_none());

  assert_matches!(
    schema.field_by_name("ints").unwrap().codec,
    FieldCodec::RepeatedScalar {
      repr: Representation::PrimitiveArray,
      ..
    }
  );
  assert_matches!(
    schema.field_by_name("longs").unwrap().codec,
    FieldCodec::RepeatedScalar {
      repr: Representation::ObjectArray,
      ..
    }
  );
  assert_matches!(
    schema.field_by_name("colors").unwrap().codec,
    FieldCodec::RepeatedEnum {
      repr: Representation::Collection,
      ..
    }
  );

  // Every field holding a User shares one schema bound to the User bean.
  let user = schema.field_by_name("user").unwrap().codec.message_schema().unwrap();
  let users = schema.field_by_name("users").unwrap().codec.message_schema().unwrap();
  let by_id = schema.field_by_name("usersById").unwrap().codec.message_schema().unwrap();
  assert!(Arc::ptr_eq(user, users));
  assert!(Arc::ptr_eq(user, by_id));
  assert_eq!(user.bean().unwrap().bean_type(), BeanType::of::<User>());
}

#[test]
fn recursive_record_schema() {
  let proto = Arc::new(root_proto());
  let beans = BeanDescriptorManager::new();
  let schema = SchemaBuilder::new(&proto, &beans)
    .message_schema(proto.message("Node").unwrap(), None)
    .unwrap();

  let child = schema.field_by_name("child").unwrap().codec.message_schema().unwrap();
  let children = schema.field_by_name("children").unwrap().codec.message_schema().unwrap();
  assert!(Arc::ptr_eq(&schema, child));
  assert!(Arc::ptr_eq(&schema, children));
  assert!(schema.bean().is_none());
}

#[test]
fn unmatched_properties_and_fields() {
  let proto = Arc::new(root_proto());
  let beans = BeanDescriptorManager::new();
  let schema = SchemaBuilder::new(&proto, &beans)
    .message_schema(proto.message("User").unwrap(), Some(BeanType::of::<Partial>()))
    .unwrap();

  let name = schema.field_by_name("name").unwrap();
  assert!(name.keep_decoded);
  let id = schema.field_by_name("id").unwrap();
  assert!(id.property.is_none());
  assert!(!id.keep_decoded);
  assert_eq!(id.declared, DeclaredType::Any);
  assert!(schema.field_by_name("extra").is_none());
}

#[test]
fn mismatch_fails_the_build() {
  let proto = Arc::new(root_proto());
  let beans = BeanDescriptorManager::new();
  assert_matches!(
    SchemaBuilder::new(&proto, &beans)
      .message_schema(proto.message("User").unwrap(), Some(BeanType::of::<Mismatched>())),
    Err(Error::SchemaMismatch { field, proto_type, declared })
      if field == "test.User.id" && proto_type == "int64" && declared == "bytes"
  );
}

#[test]
fn wrapper_needs_one_field() {
  let proto = Arc::new(root_proto());
  let beans = BeanDescriptorManager::new();
  let mut builder = SchemaBuilder::new(&proto, &beans);
  assert_matches!(
    builder.wrapper_schema(proto.message("User").unwrap(), &DeclaredType::Any),
    Err(Error::InvalidSchema(_))
  );

  let schema = builder
    .wrapper_schema(
      proto.message("UserList").unwrap(),
      &DeclaredType::object_array(DeclaredType::bean::<User>()),
    )
    .unwrap();
  assert_matches!(
    schema.fields()[0].codec,
    FieldCodec::RepeatedMessage {
      repr: Representation::ObjectArray,
      ..
    }
  );
  assert_matches!(
    builder.wrapper_schema(
      proto.message("Int32Value").unwrap(),
      &DeclaredType::String,
    ),
    Ok(_)
  );
  assert_matches!(
    builder.wrapper_schema(proto.message("Int32Value").unwrap(), &DeclaredType::Bytes),
    Err(Error::SchemaMismatch { .. })
  );
}
