// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

#[cfg(test)]
#[path = "./chunked_test.rs"]
mod tests;

//
// ChunkedBuffer
//

/// Growable buffer for decoding primitive arrays whose length is not known up front.
///
/// Values fill a fixed size chunk. A full chunk is moved to the list of completed chunks and a
/// new one is started, so no element is ever copied before [`Self::into_vec`].
pub struct ChunkedBuffer<T> {
  chunk_len: usize,
  full: Vec<Vec<T>>,
  current: Vec<T>,
  len: usize,
}

impl<T: Copy> ChunkedBuffer<T> {
  #[must_use]
  pub fn new(chunk_len: usize) -> Self {
    let chunk_len = chunk_len.max(1);
    Self {
      chunk_len,
      full: Vec::new(),
      current: Vec::with_capacity(chunk_len),
      len: 0,
    }
  }

  pub fn push(&mut self, value: T) {
    if self.current.len() == self.chunk_len {
      let next = Vec::with_capacity(self.chunk_len);
      self.full.push(std::mem::replace(&mut self.current, next));
    }
    self.current.push(value);
    self.len += 1;
  }

  #[must_use]
  pub const fn len(&self) -> usize {
    self.len
  }

  #[must_use]
  pub const fn is_empty(&self) -> bool {
    self.len == 0
  }

  /// Concatenates every chunk into a vector of exactly [`Self::len`] elements.
  #[must_use]
  pub fn into_vec(self) -> Vec<T> {
    if self.full.is_empty() {
      let mut values = self.current;
      values.shrink_to_fit();
      return values;
    }

    let mut values = Vec::with_capacity(self.len);
    for chunk in &self.full {
      values.extend_from_slice(chunk);
    }
    values.extend_from_slice(&self.current);
    values
  }
}
