// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

//! Per call byte cursors.
//!
//! [`ProtoInput`] and [`ProtoOutput`] wrap the protobuf coded streams with the little state one
//! decode or encode call needs: the last tag read, the current nesting depth and the options in
//! effect. Each is owned by a single call and never shared.

#[cfg(test)]
#[path = "./wire_test.rs"]
mod tests;

pub mod chunked;
pub mod scalar;

use crate::bean::BeanDescriptorManager;
use crate::config::CodecOptions;
use crate::error::{Error, Result};
use protobuf::rt::WireType;
use protobuf::{CodedInputStream, CodedOutputStream};

/// Decodes the wire type bits of a tag.
pub fn wire_type_of(tag: u32) -> Result<WireType> {
  let wire_type_bits = tag & 0x07;
  match wire_type_bits {
    0 => Ok(WireType::Varint),
    1 => Ok(WireType::Fixed64),
    2 => Ok(WireType::LengthDelimited),
    3 => Ok(WireType::StartGroup),
    4 => Ok(WireType::EndGroup),
    5 => Ok(WireType::Fixed32),
    _ => Err(Error::InvalidWire(format!(
      "unknown wire type {wire_type_bits} (tag={tag}, field={})",
      tag >> 3
    ))),
  }
}

//
// ProtoInput
//

pub struct ProtoInput<'a> {
  is: CodedInputStream<'a>,
  options: &'a CodecOptions,
  last_tag: u32,
  depth: u32,
}

impl<'a> ProtoInput<'a> {
  #[must_use]
  pub fn new(bytes: &'a [u8], options: &'a CodecOptions) -> Self {
    Self {
      is: CodedInputStream::from_bytes(bytes),
      options,
      last_tag: 0,
      depth: 0,
    }
  }

  #[must_use]
  pub const fn options(&self) -> &CodecOptions {
    self.options
  }

  pub fn stream(&mut self) -> &mut CodedInputStream<'a> {
    &mut self.is
  }

  /// Reads the next tag and returns its field number, or 0 once the input (or the current
  /// length limit) is exhausted.
  pub fn read_field_number(&mut self) -> Result<u32> {
    if self.is.eof()? {
      self.last_tag = 0;
      return Ok(0);
    }

    let tag = self.is.read_raw_varint32()?;
    let field_number = tag >> 3;
    if field_number == 0 {
      return Err(Error::InvalidWire(format!("invalid tag {tag}: field number 0")));
    }
    wire_type_of(tag)?;
    self.last_tag = tag;
    Ok(field_number)
  }

  /// Wire type of the tag returned by the last [`Self::read_field_number`].
  pub fn last_wire_type(&self) -> Result<WireType> {
    wire_type_of(self.last_tag)
  }

  pub fn skip_field(&mut self, wire_type: WireType) -> Result<()> {
    self.is.skip_field(wire_type)?;
    Ok(())
  }

  /// Runs `read` against the next length-delimited payload, with the stream limited to it.
  pub fn read_nested<T>(&mut self, read: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
    if self.depth >= self.options.recursion_limit {
      return Err(Error::RecursionLimitExceeded(self.options.recursion_limit));
    }

    let len = self.is.read_raw_varint32()?;
    let start = self.is.pos();
    let old_limit = self.is.push_limit(u64::from(len))?;
    self.depth += 1;
    let result = read(self);
    self.depth -= 1;
    let value = result?;
    // Anything the reader did not consume is discarded with the payload.
    while !self.is.eof()? {
      let tag = self.is.read_raw_varint32()?;
      self.is.skip_field(wire_type_of(tag)?)?;
    }
    self.check_consumed(start, len)?;
    self.is.pop_limit(old_limit);
    self.last_tag = 0;
    Ok(value)
  }

  /// Calls `read` once per element of a packed payload.
  pub fn read_packed(&mut self, mut read: impl FnMut(&mut Self) -> Result<()>) -> Result<()> {
    let len = self.is.read_raw_varint32()?;
    let start = self.is.pos();
    let old_limit = self.is.push_limit(u64::from(len))?;
    while !self.is.eof()? {
      read(self)?;
    }
    self.check_consumed(start, len)?;
    self.is.pop_limit(old_limit);
    Ok(())
  }

  /// Decodes a length-delimited payload that was read as raw bytes, one level below the current
  /// depth.
  pub fn read_detached<T>(
    &self,
    bytes: &[u8],
    read: impl FnOnce(&mut ProtoInput<'_>) -> Result<T>,
  ) -> Result<T> {
    if self.depth >= self.options.recursion_limit {
      return Err(Error::RecursionLimitExceeded(self.options.recursion_limit));
    }

    let mut nested = ProtoInput {
      is: CodedInputStream::from_bytes(bytes),
      options: self.options,
      last_tag: 0,
      depth: self.depth + 1,
    };
    read(&mut nested)
  }

  // The stream reports eof at the end of the buffer as well as at the limit, so a payload cut
  // short by the end of input only shows up as fewer bytes consumed than its length.
  fn check_consumed(&self, start: u64, len: u32) -> Result<()> {
    let consumed = self.is.pos() - start;
    if consumed == u64::from(len) {
      Ok(())
    } else {
      Err(Error::InvalidWire(format!(
        "truncated payload: length {len}, {consumed} bytes available"
      )))
    }
  }
}

//
// ProtoOutput
//

pub struct ProtoOutput<'a> {
  os: CodedOutputStream<'a>,
  beans: &'a BeanDescriptorManager,
  options: &'a CodecOptions,
  depth: u32,
}

impl<'a> ProtoOutput<'a> {
  pub fn new(
    buffer: &'a mut Vec<u8>,
    beans: &'a BeanDescriptorManager,
    options: &'a CodecOptions,
  ) -> Self {
    Self {
      os: CodedOutputStream::vec(buffer),
      beans,
      options,
      depth: 0,
    }
  }

  /// Bean descriptors, for beans whose type is only known at runtime.
  #[must_use]
  pub const fn beans(&self) -> &'a BeanDescriptorManager {
    self.beans
  }

  pub fn stream(&mut self) -> &mut CodedOutputStream<'a> {
    &mut self.os
  }

  pub fn write_tag(&mut self, field_number: u32, wire_type: WireType) -> Result<()> {
    self.os.write_tag(field_number, wire_type)?;
    Ok(())
  }

  /// Writes `field_number` as a length-delimited field whose payload is produced by `write`. The
  /// payload is one nesting level deeper.
  pub fn write_length_delimited(
    &mut self,
    field_number: u32,
    write: impl FnOnce(&mut ProtoOutput<'_>) -> Result<()>,
  ) -> Result<()> {
    if self.depth >= self.options.recursion_limit {
      return Err(Error::RecursionLimitExceeded(self.options.recursion_limit));
    }
    self.write_payload(field_number, self.depth + 1, write)
  }

  /// Writes the packed payload of a repeated scalar field. Packed elements are not messages and
  /// stay at the current depth.
  pub fn write_packed(
    &mut self,
    field_number: u32,
    write: impl FnOnce(&mut ProtoOutput<'_>) -> Result<()>,
  ) -> Result<()> {
    self.write_payload(field_number, self.depth, write)
  }

  fn write_payload(
    &mut self,
    field_number: u32,
    depth: u32,
    write: impl FnOnce(&mut ProtoOutput<'_>) -> Result<()>,
  ) -> Result<()> {
    let mut payload = Vec::new();
    {
      let mut nested = ProtoOutput {
        os: CodedOutputStream::vec(&mut payload),
        beans: self.beans,
        options: self.options,
        depth,
      };
      write(&mut nested)?;
      nested.flush()?;
    }

    let len = u32::try_from(payload.len())
      .map_err(|_| Error::InvalidWire(format!("payload of {} bytes", payload.len())))?;
    self.os.write_tag(field_number, WireType::LengthDelimited)?;
    self.os.write_raw_varint32(len)?;
    self.os.write_raw_bytes(&payload)?;
    Ok(())
  }

  pub fn flush(&mut self) -> Result<()> {
    self.os.flush()?;
    Ok(())
  }
}
