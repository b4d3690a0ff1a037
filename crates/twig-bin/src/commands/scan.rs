// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The `scan` command: probe a local bus for responding devices.

use std::path::Path;

use twig_core::bus::I2cBus;
use twig_core::types::{BusAddress, ScanRange};
use twig_linux::LinuxI2cBus;

use crate::cli::ScanArgs;
use crate::config::load_config;
use crate::error::{BinError, BinResult};

/// Scans the requested bus and prints the responding addresses.
pub async fn execute(config_path: &Path, args: &ScanArgs) -> BinResult<()> {
    // The bus flag works without a config file; the configured bus number
    // is only needed as a fallback.
    let bus_number = match args.bus {
        Some(bus) => bus,
        None => load_config(config_path)?.bus_number,
    };

    let range = scan_range(args)?;
    let bus = LinuxI2cBus::open(bus_number)?;
    let found = bus.scan(range).await?;
    bus.close().await?;

    if found.is_empty() {
        println!("No devices found on /dev/i2c-{}", bus_number);
    } else {
        println!("Found {} device(s) on /dev/i2c-{}:", found.len(), bus_number);
        for address in found {
            println!("  {}", address);
        }
    }
    Ok(())
}

fn scan_range(args: &ScanArgs) -> BinResult<ScanRange> {
    let address = |raw: u8| {
        BusAddress::new(raw).map_err(|e| BinError::init(format!("invalid scan bound: {}", e)))
    };
    match (args.start, args.end) {
        (None, None) => Ok(ScanRange::Full),
        (Some(start), None) => Ok(ScanRange::Range {
            start: address(start)?,
            end: BusAddress::MAX,
        }),
        (None, Some(end)) => Ok(ScanRange::Range {
            start: BusAddress::MIN,
            end: address(end)?,
        }),
        (Some(start), Some(end)) => Ok(ScanRange::Range {
            start: address(start)?,
            end: address(end)?,
        }),
    }
}
