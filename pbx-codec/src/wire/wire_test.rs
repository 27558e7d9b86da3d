// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

#![allow(clippy::unwrap_used)]

use super::scalar::{Int32, NativeScalar, SFixed32, SInt32, ScalarWire};
use super::{ProtoInput, ProtoOutput, wire_type_of};
use crate::bean::BeanDescriptorManager;
use crate::config::CodecOptions;
use crate::error::{Error, Result};
use crate::value::Value;
use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use protobuf::rt::WireType;
use rstest::rstest;

fn write(options: &CodecOptions, f: impl FnOnce(&mut ProtoOutput<'_>) -> Result<()>) -> Result<Vec<u8>> {
  let beans = BeanDescriptorManager::new();
  let mut bytes = Vec::new();
  {
    let mut out = ProtoOutput::new(&mut bytes, &beans, options);
    f(&mut out)?;
    out.flush()?;
  }
  Ok(bytes)
}

#[test]
fn wire_types() {
  assert_eq!(wire_type_of(8).unwrap(), WireType::Varint);
  assert_eq!(wire_type_of(0x0D).unwrap(), WireType::Fixed32);
  assert_eq!(wire_type_of(0x12).unwrap(), WireType::LengthDelimited);
  assert_matches!(wire_type_of(0x0F), Err(Error::InvalidWire(_)));
}

#[test]
fn negative_int32_is_ten_bytes() {
  let bytes = write(&CodecOptions::default(), |out| {
    out.write_tag(1, WireType::Varint)?;
    Int32::write_no_tag(-1, out.stream())?;
    Ok(())
  })
  .unwrap();
  assert_eq!(bytes.len(), 11);
  assert_eq!(&bytes[.. 2], &[0x08, 0xFF]);
  assert_eq!(bytes[10], 0x01);
}

#[test]
fn zigzag_and_fixed() {
  let bytes = write(&CodecOptions::default(), |out| {
    SInt32::write_no_tag(-1, out.stream())?;
    SFixed32::write_no_tag(30, out.stream())?;
    Ok(())
  })
  .unwrap();
  assert_eq!(bytes, vec![0x01, 0x1E, 0, 0, 0]);
}

#[test]
fn field_numbers_until_eof() {
  let options = CodecOptions::default();
  // field 1 varint 150, field 96 fixed32 30
  let bytes = [0x08, 0x96, 0x01, 0x85, 0x06, 0x1E, 0, 0, 0];
  let mut input = ProtoInput::new(&bytes, &options);

  assert_eq!(input.read_field_number().unwrap(), 1);
  assert_eq!(input.last_wire_type().unwrap(), WireType::Varint);
  assert_eq!(Int32::read(input.stream()).unwrap(), 150);
  assert_eq!(input.read_field_number().unwrap(), 96);
  assert_eq!(input.last_wire_type().unwrap(), WireType::Fixed32);
  assert_eq!(SFixed32::read(input.stream()).unwrap(), 30);
  assert_eq!(input.read_field_number().unwrap(), 0);
  assert_eq!(input.read_field_number().unwrap(), 0);
}

#[test]
fn field_number_zero_is_rejected() {
  let options = CodecOptions::default();
  let mut input = ProtoInput::new(&[0x00, 0x01], &options);
  assert_matches!(input.read_field_number(), Err(Error::InvalidWire(_)));
}

#[test]
fn truncated_input() {
  let options = CodecOptions::default();
  let mut input = ProtoInput::new(&[0x0D, 0x01], &options);
  assert_eq!(input.read_field_number().unwrap(), 1);
  assert_matches!(SFixed32::read(input.stream()), Err(_));
}

#[test]
fn nested_payload_is_limited() {
  let options = CodecOptions::default();
  let bytes = write(&options, |out| {
    out.write_length_delimited(1, |out| {
      out.write_tag(1, WireType::Varint)?;
      Int32::write_no_tag(5, out.stream())?;
      // Left unread by the reader below.
      out.write_tag(2, WireType::Varint)?;
      Int32::write_no_tag(6, out.stream())?;
      Ok(())
    })?;
    out.write_tag(2, WireType::Varint)?;
    Int32::write_no_tag(7, out.stream())?;
    Ok(())
  })
  .unwrap();
  assert_eq!(bytes, vec![0x0A, 0x04, 0x08, 0x05, 0x10, 0x06, 0x10, 0x07]);

  let mut input = ProtoInput::new(&bytes, &options);
  assert_eq!(input.read_field_number().unwrap(), 1);
  let inner = input
    .read_nested(|input| {
      assert_eq!(input.read_field_number()?, 1);
      Ok(Int32::read(input.stream())?)
    })
    .unwrap();
  assert_eq!(inner, 5);
  assert_eq!(input.read_field_number().unwrap(), 2);
  assert_eq!(Int32::read(input.stream()).unwrap(), 7);
}

#[test]
fn packed_payload() {
  let options = CodecOptions::default();
  let bytes = [0x03, 0x01, 0x02, 0x03];
  let mut input = ProtoInput::new(&bytes, &options);
  let mut values = Vec::new();
  input
    .read_packed(|input| {
      values.push(Int32::read(input.stream())?);
      Ok(())
    })
    .unwrap();
  assert_eq!(values, vec![1, 2, 3]);
  assert_eq!(input.read_field_number().unwrap(), 0);
}

#[test]
fn recursion_limit() {
  let options = CodecOptions {
    recursion_limit: 2,
    ..CodecOptions::default()
  };

  fn nest(out: &mut ProtoOutput<'_>, depth: u32) -> Result<()> {
    if depth == 0 {
      return Ok(());
    }
    out.write_length_delimited(1, |out| nest(out, depth - 1))
  }

  assert!(write(&options, |out| nest(out, 2)).is_ok());
  assert_matches!(
    write(&options, |out| nest(out, 3)),
    Err(Error::RecursionLimitExceeded(2))
  );

  let bytes = write(&CodecOptions::default(), |out| nest(out, 3)).unwrap();
  let mut input = ProtoInput::new(&bytes, &options);
  fn read(input: &mut ProtoInput<'_>) -> Result<()> {
    while input.read_field_number()? != 0 {
      input.read_nested(read)?;
    }
    Ok(())
  }
  assert_matches!(read(&mut input), Err(Error::RecursionLimitExceeded(2)));
}

#[rstest]
#[case(&[0x05, 0x08, 0x01])]
#[case(&[0x10, 0x08, 0x05])]
fn truncated_nested_payload(#[case] bytes: &[u8]) {
  let options = CodecOptions::default();
  let mut input = ProtoInput::new(bytes, &options);
  assert_matches!(
    input.read_nested(|input| {
      while input.read_field_number()? != 0 {
        input.skip_field(input.last_wire_type()?)?;
      }
      Ok(())
    }),
    Err(Error::InvalidWire(message)) if message.starts_with("truncated payload")
  );
}

#[test]
fn truncated_packed_payload() {
  let options = CodecOptions::default();
  let mut input = ProtoInput::new(&[0x05, 0x01, 0x02], &options);
  let mut values = Vec::new();
  assert_matches!(
    input.read_packed(|input| {
      values.push(Int32::read(input.stream())?);
      Ok(())
    }),
    Err(Error::InvalidWire(_))
  );
  assert_eq!(values, vec![1, 2]);
}

#[test]
fn packed_payload_is_not_nesting() {
  let options = CodecOptions {
    recursion_limit: 1,
    ..CodecOptions::default()
  };
  let bytes = write(&options, |out| {
    out.write_length_delimited(1, |out| {
      out.write_packed(1, |out| {
        Int32::write_no_tag(1, out.stream())?;
        Int32::write_no_tag(2, out.stream())?;
        Ok(())
      })
    })
  })
  .unwrap();
  assert_eq!(bytes, vec![0x0A, 0x04, 0x0A, 0x02, 0x01, 0x02]);

  let mut input = ProtoInput::new(&bytes, &options);
  assert_eq!(input.read_field_number().unwrap(), 1);
  let values = input
    .read_nested(|input| {
      assert_eq!(input.read_field_number()?, 1);
      let mut values = Vec::new();
      input.read_packed(|input| {
        values.push(Int32::read(input.stream())?);
        Ok(())
      })?;
      Ok(values)
    })
    .unwrap();
  assert_eq!(values, vec![1, 2]);
}

#[test]
fn detached_payload_counts_as_nesting() {
  let options = CodecOptions {
    recursion_limit: 1,
    ..CodecOptions::default()
  };
  let input = ProtoInput::new(&[], &options);
  let value = input
    .read_detached(&[0x08, 0x07], |nested| {
      assert_eq!(nested.read_field_number()?, 1);
      assert_matches!(
        nested.read_detached(&[], |_| Ok(())),
        Err(Error::RecursionLimitExceeded(1))
      );
      Ok(Int32::read(nested.stream())?)
    })
    .unwrap();
  assert_eq!(value, 7);
}

#[test]
fn native_coercion() {
  assert_eq!(i32::from_value(&Value::I64(-5)), Some(-5));
  assert_eq!(i32::from_value(&Value::I64(i64::MAX)), None);
  assert_eq!(u32::from_value(&Value::I32(-1)), None);
  assert_eq!(u64::from_value(&Value::String(" 42 ".to_string())), Some(42));
  assert_eq!(i64::from_value(&Value::F64(1.0)), None);
  assert_eq!(f32::from_value(&Value::I32(3)), Some(3.0));
  assert_eq!(bool::from_value(&Value::String("TRUE".to_string())), Some(true));
  assert_eq!(bool::from_value(&Value::I32(1)), None);
  assert!(0.0_f64.is_default());
  assert!(!(-0.0_f64).is_default());
}
