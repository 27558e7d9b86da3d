// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

#![allow(clippy::unwrap_used)]

use super::ProtoMapper;
use crate::bean::BeanType;
use crate::config::CodecOptions;
use crate::declared::DeclaredType;
use crate::error::Error;
use crate::test_models::{User, root_proto};
use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use std::sync::Arc;

#[test]
fn serializers_are_cached_by_full_name() {
  let mapper = ProtoMapper::new(root_proto());
  let first = mapper.find_root_serializer("User").unwrap();
  let second = mapper.find_root_serializer("test.User").unwrap();
  assert!(Arc::ptr_eq(&first, &second));
  assert_eq!(first.message().full_name, "test.User");

  let clone = mapper.clone();
  assert!(Arc::ptr_eq(&first, &clone.find_root_serializer("User").unwrap()));
  assert!(!Arc::ptr_eq(&first, &mapper.find_root_serializer("Root").unwrap()));
}

#[test]
fn concurrent_lookups() {
  let mapper = ProtoMapper::new(root_proto());
  let serializers: Vec<_> = std::thread::scope(|scope| {
    let handles: Vec<_> = (0 .. 8)
      .map(|_| scope.spawn(|| mapper.find_root_serializer("Root").unwrap()))
      .collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
  });
  for serializer in &serializers[1 ..] {
    assert!(Arc::ptr_eq(&serializers[0], serializer));
  }
}

#[test]
fn unknown_message() {
  let mapper = ProtoMapper::new(root_proto());
  assert_matches!(
    mapper.find_root_serializer("Missing"),
    Err(Error::UnknownMessage(name)) if name == "Missing"
  );
  assert_matches!(
    mapper.create_root_deserializer("Missing", DeclaredType::Record),
    Err(Error::UnknownMessage(_))
  );
  assert_matches!(
    mapper.create_wrapped_root_deserializer("Root", DeclaredType::Any),
    Err(Error::InvalidSchema(_))
  );
}

#[test]
fn options_and_descriptors() {
  let options = CodecOptions {
    primitive_chunk_len: 4,
    ..CodecOptions::default()
  };
  let mapper = ProtoMapper::with_options(root_proto(), options.clone());
  assert_eq!(mapper.options(), &options);
  assert!(mapper.proto().message("Node").is_ok());

  let descriptor = mapper.bean_descriptor(BeanType::of::<User>());
  assert!(Arc::ptr_eq(
    &descriptor,
    &mapper.bean_descriptor(BeanType::of::<User>())
  ));
  assert_eq!(
    descriptor
      .properties()
      .iter()
      .map(|p| p.name())
      .collect::<Vec<_>>(),
    vec!["name", "id"]
  );
}

#[test]
fn deserializer_targets() {
  let mapper = ProtoMapper::new(root_proto());
  let deserializer = mapper
    .create_root_deserializer("User", DeclaredType::bean::<User>())
    .unwrap();
  assert_eq!(deserializer.target(), &DeclaredType::bean::<User>());
  assert_eq!(
    deserializer.schema().bean().unwrap().bean_type(),
    BeanType::of::<User>()
  );

  let records = mapper
    .create_root_deserializer("User", DeclaredType::Record)
    .unwrap();
  assert!(records.schema().bean().is_none());
}
