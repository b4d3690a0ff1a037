// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The `validate` command: parse and check a configuration file.

use std::path::Path;

use crate::cli::ValidateArgs;
use crate::config::load_config;
use crate::error::BinResult;

/// Validates the configuration file and prints a summary.
pub async fn execute(config_path: &Path, args: &ValidateArgs) -> BinResult<()> {
    let config = load_config(config_path)?;

    println!("Configuration OK: {}", config_path.display());
    println!("  namespace:   {}", config.namespace);
    println!("  bus:         /dev/i2c-{}", config.bus_number);
    match config.server_port {
        Some(port) => println!("  RPC server:  port {}", port),
        None => println!("  RPC server:  disabled"),
    }
    match config.remote_address() {
        Some(address) => println!("  bus source:  remote ({})", address),
        None => println!("  bus source:  local"),
    }

    let complete = config.complete_devices().count();
    println!(
        "  devices:     {} configured, {} complete",
        config.devices.len(),
        complete
    );
    for device in config.complete_devices() {
        println!(
            "    {} {} ({})",
            device.device_type.as_deref().unwrap_or("?"),
            device.address,
            device.name.as_deref().unwrap_or("?")
        );
    }

    if args.show_config {
        println!("{}", serde_json::to_string_pretty(&config).unwrap_or_default());
    }

    Ok(())
}
