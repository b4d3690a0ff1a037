// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Runtime Integration Tests
//!
//! Configuration loading across formats and the platform message box
//! against a [`MockBus`].

use std::io::Write;

use tempfile::NamedTempFile;
use tokio::sync::oneshot;

use twig_bin::config::{load_config, parse_config, ConfigFormat};
use twig_bin::runtime::handle_command;
use twig_core::platform::Command;
use twig_core::types::BusAddress;
use twig_tests::prelude::*;

fn addr(raw: u8) -> BusAddress {
    BusAddress::new(raw).unwrap()
}

// =============================================================================
// Configuration
// =============================================================================

#[tokio::test]
async fn test_config_loads_all_three_formats() {
    let toml = "busNumber = 2\nserverPort = 9123\n";
    let yaml = "busNumber: 2\nserverPort: 9123\n";
    let json = r#"{"busNumber": 2, "serverPort": 9123}"#;

    for (content, suffix) in [(toml, ".toml"), (yaml, ".yaml"), (json, ".json")] {
        let mut file = NamedTempFile::with_suffix(suffix).unwrap();
        file.write_all(content.as_bytes()).unwrap();

        let config = load_config(file.path())
            .unwrap_or_else(|e| panic!("format {} failed: {}", suffix, e));
        assert_eq!(config.bus_number, 2, "format {}", suffix);
        assert_eq!(config.server_port, Some(9123), "format {}", suffix);
    }
}

#[tokio::test]
async fn test_config_device_options_ride_along() {
    let json = r#"{
        "devices": [{
            "name": "thermo",
            "type": "generic",
            "address": 72,
            "registers": [{"name": "temp", "register": 0}]
        }]
    }"#;
    let config = parse_config(json, ConfigFormat::Json).unwrap();
    let device = &config.devices[0];

    assert_eq!(device.address, addr(0x48));
    assert!(device.options.contains_key("registers"));
}

// =============================================================================
// Message Box
// =============================================================================

#[tokio::test]
async fn test_search_command_scans_the_active_bus() {
    let bus = MockBus::new();
    bus.add_device(addr(0x23));
    bus.add_device(addr(0x48));
    let (tx, rx) = oneshot::channel();

    handle_command(
        bus.as_ref(),
        1,
        Command::Search {
            bus: 1,
            reply: Some(tx),
        },
    )
    .await;

    assert_eq!(rx.await.unwrap(), vec![addr(0x23), addr(0x48)]);
}

#[tokio::test]
async fn test_read_command_via_register_and_raw() {
    let bus = MockBus::new();
    bus.set_register(addr(0x48), 0x10, 0xaa);
    bus.set_register(addr(0x48), 0x11, 0xbb);
    bus.set_memory(addr(0x48), vec![0xde, 0xad]);

    let (tx, rx) = oneshot::channel();
    handle_command(
        bus.as_ref(),
        1,
        Command::Read {
            address: addr(0x48),
            register: Some(0x10),
            bytes: Some(2),
            reply: Some(tx),
        },
    )
    .await;
    assert_eq!(rx.await.unwrap(), vec![0xaa, 0xbb]);

    let (tx, rx) = oneshot::channel();
    handle_command(
        bus.as_ref(),
        1,
        Command::Read {
            address: addr(0x48),
            register: None,
            bytes: None,
            reply: Some(tx),
        },
    )
    .await;
    assert_eq!(rx.await.unwrap(), vec![0xde]);
}

#[tokio::test]
async fn test_write_command_reaches_the_bus() {
    let bus = MockBus::new();
    let (tx, rx) = oneshot::channel();

    handle_command(
        bus.as_ref(),
        1,
        Command::Write {
            address: addr(0x20),
            register: Some(0x01),
            data: vec![0x05, 0x06],
            reply: Some(tx),
        },
    )
    .await;

    assert_eq!(rx.await.unwrap(), vec![0x05, 0x06]);
    assert_eq!(
        bus.writes(),
        vec![WriteOp::Block {
            address: addr(0x20),
            command: 0x01,
            data: vec![0x05, 0x06]
        }]
    );
}

#[tokio::test]
async fn test_failed_command_drops_the_reply() {
    let bus = MockBus::new();
    bus.fail_reads(true);
    let (tx, rx) = oneshot::channel();

    handle_command(
        bus.as_ref(),
        1,
        Command::Read {
            address: addr(0x48),
            register: None,
            bytes: None,
            reply: Some(tx),
        },
    )
    .await;

    // The reply sender was dropped without a payload.
    assert!(rx.await.is_err());
}
