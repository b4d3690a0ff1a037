// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # RPC Integration Tests
//!
//! Full HTTP round trips: a [`MockBus`] behind an [`RpcHarness`] server,
//! driven through [`RemoteBus`] and raw `reqwest` requests.
//!
//! ## Test Categories
//!
//! - `test_roundtrip_*`: RemoteBus → server → MockBus → back
//! - `test_wire_*`: raw HTTP shapes (status codes, bodies, field names)
//! - `test_error_*`: error propagation across the wire

use std::sync::Arc;

use twig_core::bus::I2cBus;
use twig_core::error::BusError;
use twig_core::types::{BusAddress, DeviceIdInfo, ScanRange};
use twig_tests::prelude::*;

fn addr(raw: u8) -> BusAddress {
    BusAddress::new(raw).unwrap()
}

// =============================================================================
// Round Trips
// =============================================================================

#[tokio::test]
async fn test_roundtrip_full_scan() {
    let bus = MockBus::new();
    bus.add_device(addr(0x23));
    bus.add_device(addr(0x48));
    let harness = RpcHarness::start(bus.clone()).await;
    let remote = harness.remote();

    let found = remote.scan(ScanRange::Full).await.unwrap();
    assert_eq!(found, vec![addr(0x23), addr(0x48)]);

    harness.stop().await;
}

#[tokio::test]
async fn test_roundtrip_single_and_range_scan() {
    let bus = MockBus::new();
    bus.add_device(addr(0x23));
    bus.add_device(addr(0x48));
    let harness = RpcHarness::start(bus.clone()).await;
    let remote = harness.remote();

    let single = remote.scan(ScanRange::Single(addr(0x48))).await.unwrap();
    assert_eq!(single, vec![addr(0x48)]);

    let range = remote
        .scan(ScanRange::Range {
            start: addr(0x20),
            end: addr(0x2f),
        })
        .await
        .unwrap();
    assert_eq!(range, vec![addr(0x23)]);

    harness.stop().await;
}

#[tokio::test]
async fn test_roundtrip_raw_read_and_write() {
    let bus = MockBus::new();
    bus.set_memory(addr(0x48), vec![0xde, 0xad, 0xbe, 0xef]);
    let harness = RpcHarness::start(bus.clone()).await;
    let remote = harness.remote();

    let read = remote.i2c_read(addr(0x48), 2).await.unwrap();
    assert_eq!(read.bytes_read, 2);
    assert_eq!(read.buffer, vec![0xde, 0xad]);

    let written = remote.i2c_write(addr(0x48), vec![0x01, 0x02]).await.unwrap();
    assert_eq!(written.bytes_written, 2);
    assert_eq!(
        bus.writes(),
        vec![WriteOp::Raw {
            address: addr(0x48),
            data: vec![0x01, 0x02]
        }]
    );

    harness.stop().await;
}

#[tokio::test]
async fn test_roundtrip_register_operations() {
    let bus = MockBus::new();
    bus.set_register(addr(0x48), 0x00, 0x2a);
    bus.set_word_register(addr(0x48), 0x02, 0xbeef);
    bus.set_memory(addr(0x48), vec![0x11]);
    let harness = RpcHarness::start(bus.clone()).await;
    let remote = harness.remote();

    assert_eq!(remote.read_byte(addr(0x48), 0x00).await.unwrap(), 0x2a);
    assert_eq!(remote.read_word(addr(0x48), 0x02).await.unwrap(), 0xbeef);
    assert_eq!(remote.receive_byte(addr(0x48)).await.unwrap(), 0x11);

    remote.write_byte(addr(0x48), 0x01, 0x55).await.unwrap();
    remote.write_word(addr(0x48), 0x03, 0x1234).await.unwrap();
    remote.send_byte(addr(0x48), 0x0f).await.unwrap();
    remote.write_quick(addr(0x48), 0x90, 1).await.unwrap();

    assert_eq!(
        bus.writes(),
        vec![
            WriteOp::Byte {
                address: addr(0x48),
                command: 0x01,
                byte: 0x55
            },
            WriteOp::Word {
                address: addr(0x48),
                command: 0x03,
                word: 0x1234
            },
            WriteOp::SendByte {
                address: addr(0x48),
                byte: 0x0f
            },
            WriteOp::Quick {
                address: addr(0x48),
                bit: 1
            },
        ]
    );

    harness.stop().await;
}

#[tokio::test]
async fn test_roundtrip_block_operations() {
    let bus = MockBus::new();
    let harness = RpcHarness::start(bus.clone()).await;
    let remote = harness.remote();

    let written = remote
        .write_i2c_block(addr(0x50), 0x10, vec![1, 2, 3])
        .await
        .unwrap();
    assert_eq!(written.bytes_written, 3);
    assert_eq!(written.buffer, vec![1, 2, 3]);

    // Block writes land in the registers and can be read back.
    let read = remote.read_i2c_block(addr(0x50), 0x10, 3).await.unwrap();
    assert_eq!(read.buffer, vec![1, 2, 3]);

    harness.stop().await;
}

#[tokio::test]
async fn test_roundtrip_device_id() {
    let bus = MockBus::new();
    bus.set_device_id(
        addr(0x48),
        DeviceIdInfo {
            manufacturer: 0x004,
            product: 0x12,
            revision: 3,
        },
    );
    let harness = RpcHarness::start(bus.clone()).await;
    let remote = harness.remote();

    let id = remote.device_id(addr(0x48)).await.unwrap();
    assert_eq!(id.manufacturer, 0x004);
    assert_eq!(id.product, 0x12);
    assert_eq!(id.revision, 3);

    harness.stop().await;
}

// =============================================================================
// Wire Shapes
// =============================================================================

#[tokio::test]
async fn test_wire_read_response_uses_hex_buffer() {
    let bus = MockBus::new();
    bus.set_memory(addr(0x48), vec![0xde, 0xad]);
    let harness = RpcHarness::start(bus.clone()).await;

    let response = reqwest::Client::new()
        .post(format!("{}/rpc", harness.url()))
        .body(r#"{"method":"i2cRead","args":{"address":72,"length":2}}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["bytesRead"], 2);
    assert_eq!(body["buffer"], "dead");

    harness.stop().await;
}

#[tokio::test]
async fn test_wire_block_write_reports_bytes_read_field() {
    // The write response reuses the read field name; the count carries the
    // bytes written.
    let bus = MockBus::new();
    let harness = RpcHarness::start(bus.clone()).await;

    let response = reqwest::Client::new()
        .post(format!("{}/rpc", harness.url()))
        .body(r#"{"method":"writeI2cBlock","args":{"address":80,"command":16,"length":3,"buffer":"010203"}}"#)
        .send()
        .await
        .unwrap();

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["bytesRead"], 3);
    assert!(body.get("bytesWritten").is_none());
    assert_eq!(body["buffer"], "010203");

    harness.stop().await;
}

#[tokio::test]
async fn test_wire_hex_payload_accepts_both_cases() {
    let bus = MockBus::new();
    let harness = RpcHarness::start(bus.clone()).await;

    let response = reqwest::Client::new()
        .post(format!("{}/rpc", harness.url()))
        .body(r#"{"method":"i2cWrite","args":{"address":72,"length":2,"buffer":"DEad"}}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    assert_eq!(
        bus.writes(),
        vec![WriteOp::Raw {
            address: addr(0x48),
            data: vec![0xde, 0xad]
        }]
    );

    harness.stop().await;
}

#[tokio::test]
async fn test_wire_unknown_path_is_404_naming_the_path() {
    let bus = MockBus::new();
    let harness = RpcHarness::start(bus.clone()).await;

    let response = reqwest::Client::new()
        .post(format!("{}/somewhere/else", harness.url()))
        .body("{}")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 404);
    assert_eq!(
        response.text().await.unwrap(),
        "oops! /somewhere/else not found here"
    );

    harness.stop().await;
}

#[tokio::test]
async fn test_wire_unknown_method_is_500() {
    let bus = MockBus::new();
    let harness = RpcHarness::start(bus.clone()).await;

    let response = reqwest::Client::new()
        .post(format!("{}/rpc", harness.url()))
        .body(r#"{"method":"mystery","args":{}}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 500);
    let body = response.text().await.unwrap();
    assert!(body.starts_with("oops! server error: "), "body: {}", body);
    assert!(body.contains("mystery"));

    harness.stop().await;
}

#[tokio::test]
async fn test_wire_malformed_json_is_500_not_a_crash() {
    let bus = MockBus::new();
    let harness = RpcHarness::start(bus.clone()).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/rpc", harness.url()))
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 500);

    // The server survives and keeps serving.
    let response = client
        .post(format!("{}/rpc", harness.url()))
        .body(r#"{"method":"scan","args":{}}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    harness.stop().await;
}

#[tokio::test]
async fn test_wire_missing_method_is_500() {
    let bus = MockBus::new();
    let harness = RpcHarness::start(bus.clone()).await;

    let response = reqwest::Client::new()
        .post(format!("{}/rpc", harness.url()))
        .body(r#"{"args":{}}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 500);
    assert!(response
        .text()
        .await
        .unwrap()
        .contains("Property 'method' is not defined"));

    harness.stop().await;
}

// =============================================================================
// Error Propagation
// =============================================================================

#[tokio::test]
async fn test_error_bus_fault_surfaces_as_remote() {
    let bus = MockBus::new();
    bus.fail_reads(true);
    let harness = RpcHarness::start(bus.clone()).await;
    let remote = harness.remote();

    let err = remote.receive_byte(addr(0x48)).await.unwrap_err();
    match err {
        BusError::Remote { method, detail } => {
            assert_eq!(method, "receiveByte");
            assert!(detail.contains("injected read failure"), "detail: {}", detail);
        }
        other => panic!("unexpected error: {:?}", other),
    }

    harness.stop().await;
}

#[tokio::test]
async fn test_error_invalid_address_rejected_before_the_bus() {
    let bus = MockBus::new();
    let harness = RpcHarness::start(bus.clone()).await;

    let response = reqwest::Client::new()
        .post(format!("{}/rpc", harness.url()))
        .body(r#"{"method":"receiveByte","args":{"address":200}}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 500);
    // The mock never saw a read attempt.
    assert_eq!(bus.read_count(), 0);

    harness.stop().await;
}

#[tokio::test]
async fn test_error_remote_close_leaves_server_bus_open() {
    let bus = MockBus::new();
    bus.set_memory(addr(0x48), vec![0x01]);
    let harness = RpcHarness::start(bus.clone()).await;
    let remote = harness.remote();

    remote.close().await.unwrap();

    // The peer's bus was not closed and still answers.
    assert_eq!(remote.receive_byte(addr(0x48)).await.unwrap(), 0x01);
    assert_eq!(bus.close_count(), 0);

    harness.stop().await;
}
