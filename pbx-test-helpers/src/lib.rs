// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

// Process wide setup shared by every test binary in the workspace. Call from a #[ctor::ctor]
// in the crate root.
pub fn test_global_init() {
  pbx_log::SwapLogger::initialize();
  log::debug!("test logging initialized");
}
