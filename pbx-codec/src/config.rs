// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

#[cfg(test)]
#[path = "./config_test.rs"]
mod tests;

use anyhow::bail;
use serde::Deserialize;

//
// CodecOptions
//

/// Tunables shared by every serializer and deserializer created from one mapper.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CodecOptions {
  /// Elements per chunk when decoding primitive arrays of unknown length.
  pub primitive_chunk_len: usize,
  /// Maximum message nesting depth, enforced on both encode and decode.
  pub recursion_limit: u32,
}

impl Default for CodecOptions {
  fn default() -> Self {
    Self {
      primitive_chunk_len: 128,
      recursion_limit: 100,
    }
  }
}

impl CodecOptions {
  /// Loads options from YAML. Missing keys keep their defaults.
  pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
    let options: Self = serde_yaml::from_str(yaml)?;
    options.validate()?;
    Ok(options)
  }

  pub fn validate(&self) -> anyhow::Result<()> {
    if self.primitive_chunk_len == 0 {
      bail!("primitive_chunk_len must be positive");
    }
    if self.recursion_limit == 0 {
      bail!("recursion_limit must be positive");
    }
    Ok(())
  }
}
