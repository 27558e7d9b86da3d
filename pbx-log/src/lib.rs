// shared-core - bitdrift's common client/server libraries
// Copyright Bitdrift, Inc. All rights reserved.
//
// Use of this source code is governed by a source available license that can be found in the
// LICENSE file or at:
// https://polyformproject.org/wp-content/uploads/2020/06/PolyForm-Shield-1.0.0.txt

use anyhow::anyhow;
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::reload::Handle as ReloadHandle;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

// Codec internals are chatty at debug (descriptor building) and trace (per call sizes), so the
// default keeps them quiet.
const DEFAULT_FILTER_RULES: &str = "info";

//
// SwapLogger
//

// Owns the process wide tracing subscriber. The codec crates only use the log facade, which is
// bridged into tracing, so the filter installed here governs both.
#[derive(Default)]
pub struct SwapLogger {
  handle: Mutex<Option<ReloadHandle<EnvFilter, Registry>>>,
}

impl SwapLogger {
  const fn new() -> Self {
    Self {
      handle: Mutex::new(None),
    }
  }

  fn get() -> &'static Self {
    static LOGGER: SwapLogger = SwapLogger::new();

    &LOGGER
  }

  // Install the subscriber, reading the filter from RUST_LOG. Calling this more than once is a
  // no-op so that several test binaries sharing a helper can all request initialization.
  pub fn initialize() {
    let mut handle = match Self::get().handle.lock() {
      Ok(handle) => handle,
      Err(poisoned) => poisoned.into_inner(),
    };
    if handle.is_some() {
      return;
    }

    // Gate ANSI on whether PBX_LOG_ANSI is set so that captured output stays plain by default.
    let stderr = tracing_subscriber::fmt::layer()
      .with_writer(std::io::stderr)
      .with_ansi(std::env::var("PBX_LOG_ANSI").is_ok())
      .with_line_number(true)
      .with_thread_ids(true)
      .compact();

    let filter = EnvFilter::new(
      std::env::var("RUST_LOG")
        .as_deref()
        .unwrap_or(DEFAULT_FILTER_RULES),
    );

    let (filter, reload_handle) = tracing_subscriber::reload::Layer::new(filter);
    *handle = Some(reload_handle);

    // try_init also installs the tracing-log bridge so log:: macros reach the subscriber.
    if let Err(e) = Registry::default().with(filter).with(stderr).try_init() {
      eprintln!("failed to install log subscriber: {e}");
    }
  }

  // Swap in a new filter with the provided RUST_LOG string.
  pub fn swap(new_rust_log: &str) -> anyhow::Result<()> {
    Self::get()
      .handle
      .lock()
      .map_err(|_| anyhow!("logger lock poisoned"))?
      .as_mut()
      .ok_or_else(|| anyhow!("logger not initialized"))?
      .reload(EnvFilter::try_new(new_rust_log)?)?;

    // The log facade max level is captured at init, so it has to follow each reload by hand.
    log::set_max_level(tracing_log::AsLog::as_log(
      &tracing_subscriber::filter::LevelFilter::current(),
    ));

    Ok(())
  }
}
