// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The `run` command: start the gateway.

use std::path::Path;

use twig_core::platform::MemoryStateStore;

use crate::cli::RunArgs;
use crate::config::load_config;
use crate::error::BinResult;
use crate::runtime::AdapterRuntime;

/// Loads the configuration and runs the adapter until shutdown.
pub async fn execute(config_path: &Path, args: &RunArgs) -> BinResult<()> {
    let config = load_config(config_path)?;

    // Standalone runs use the in-process store; a platform binding would
    // hand its own StateStore in here.
    let store = MemoryStateStore::new();

    let mut runtime = AdapterRuntime::new(config, store);
    if args.no_handlers {
        runtime = runtime.without_handlers();
    }

    let shutdown = runtime.shutdown_coordinator();
    tokio::spawn(async move {
        shutdown.wait_for_shutdown().await;
    });

    runtime.run().await
}
