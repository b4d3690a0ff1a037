// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The I2C bus capability trait.
//!
//! Everything above the hardware depends only on this trait: device
//! handlers, the RPC server and the message-box commands all take an
//! `Arc<dyn I2cBus>` and never know whether it is the local kernel bus,
//! the remote client talking to another gateway, or a test double.
//!
//! # Thread Safety
//!
//! Implementations must be `Send + Sync`. The trait takes `&self` for every
//! operation so a single instance can be shared; implementations that wrap
//! a non-reentrant handle are expected to serialize internally (the local
//! bus holds its file descriptor behind a mutex so concurrent operations
//! cannot interleave at the byte level).

use async_trait::async_trait;

use crate::error::BusError;
use crate::types::{BusAddress, DeviceIdInfo, ReadResult, ScanRange, WriteResult};

/// Result alias for bus operations.
pub type BusResult<T> = Result<T, BusError>;

/// The I2C primitive operations of an addressed, numbered bus.
///
/// The operation set mirrors the SMBus command vocabulary: raw transfers
/// (`i2c_read` / `i2c_write`), register-addressed byte/word/block commands,
/// the bare receive/send byte forms, and the data-less quick write.
#[async_trait]
pub trait I2cBus: Send + Sync {
    /// Probes the given range and returns the addresses that responded,
    /// in ascending order.
    async fn scan(&self, range: ScanRange) -> BusResult<Vec<BusAddress>>;

    /// Runs the standard device-ID probe against one address.
    async fn device_id(&self, address: BusAddress) -> BusResult<DeviceIdInfo>;

    /// Plain I2C read of `length` bytes.
    async fn i2c_read(&self, address: BusAddress, length: usize) -> BusResult<ReadResult>;

    /// Plain I2C write of the full buffer.
    async fn i2c_write(&self, address: BusAddress, buffer: Vec<u8>) -> BusResult<WriteResult>;

    /// SMBus read byte from a command register.
    async fn read_byte(&self, address: BusAddress, command: u8) -> BusResult<u8>;

    /// SMBus read word from a command register.
    async fn read_word(&self, address: BusAddress, command: u8) -> BusResult<u16>;

    /// SMBus block read of `length` bytes from a command register.
    async fn read_i2c_block(
        &self,
        address: BusAddress,
        command: u8,
        length: usize,
    ) -> BusResult<ReadResult>;

    /// SMBus block write to a command register.
    async fn write_i2c_block(
        &self,
        address: BusAddress,
        command: u8,
        buffer: Vec<u8>,
    ) -> BusResult<WriteResult>;

    /// SMBus receive byte (no command register).
    async fn receive_byte(&self, address: BusAddress) -> BusResult<u8>;

    /// SMBus send byte (no command register).
    async fn send_byte(&self, address: BusAddress, byte: u8) -> BusResult<()>;

    /// SMBus write byte to a command register.
    async fn write_byte(&self, address: BusAddress, command: u8, byte: u8) -> BusResult<()>;

    /// SMBus write word to a command register.
    async fn write_word(&self, address: BusAddress, command: u8, word: u16) -> BusResult<()>;

    /// SMBus quick write carrying a single bit and no data bytes.
    ///
    /// `command` is carried for wire compatibility with existing callers;
    /// the transfer itself only encodes `bit`.
    async fn write_quick(&self, address: BusAddress, command: u8, bit: u8) -> BusResult<()>;

    /// Releases the bus handle. Idempotent; later calls are no-ops.
    async fn close(&self) -> BusResult<()>;
}
