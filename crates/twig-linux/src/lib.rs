// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # twig-linux
//!
//! The local bus variant: a thin pass-through from the [`I2cBus`] trait to
//! the kernel's i2c-dev character devices.
//!
//! The file descriptor sits behind a mutex and every transfer runs on a
//! blocking thread while holding it, so concurrent callers (a scan racing
//! an `i2cWrite` from the RPC server, say) serialize at the transaction
//! boundary and never interleave at the byte level.

#![warn(missing_docs)]

mod smbus;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::debug;

use twig_core::bus::{BusResult, I2cBus};
use twig_core::error::BusError;
use twig_core::types::{BusAddress, DeviceIdInfo, ReadResult, ScanRange, WriteResult};

pub use smbus::I2C_SMBUS_BLOCK_MAX;

use smbus::I2cDev;

// =============================================================================
// LinuxI2cBus
// =============================================================================

/// An open local bus on `/dev/i2c-<N>`.
pub struct LinuxI2cBus {
    bus_number: u32,
    dev: Arc<Mutex<Option<I2cDev>>>,
}

impl LinuxI2cBus {
    /// Opens the numbered bus device.
    pub fn open(bus_number: u32) -> BusResult<Self> {
        let dev = I2cDev::open(bus_number).map_err(|source| BusError::OpenFailed {
            bus: bus_number,
            source,
        })?;
        debug!(bus = bus_number, "Opened local I2C bus");
        Ok(Self {
            bus_number,
            dev: Arc::new(Mutex::new(Some(dev))),
        })
    }

    /// Returns the bus number.
    pub fn bus_number(&self) -> u32 {
        self.bus_number
    }

    /// Runs one transfer on a blocking thread with the device locked.
    async fn transfer<T, F>(&self, op: F) -> BusResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&I2cDev) -> BusResult<T> + Send + 'static,
    {
        let dev = self.dev.clone();
        tokio::task::spawn_blocking(move || {
            let guard = dev.lock().expect("i2c device mutex poisoned");
            let dev = guard.as_ref().ok_or(BusError::Closed)?;
            op(dev)
        })
        .await
        .map_err(|e| BusError::Unsupported {
            operation: format!("blocking transfer panicked: {}", e),
        })?
    }
}

fn read_err(address: BusAddress) -> impl Fn(std::io::Error) -> BusError {
    move |e| BusError::read_failed(address, e.to_string())
}

fn write_err(address: BusAddress) -> impl Fn(std::io::Error) -> BusError {
    move |e| BusError::write_failed(address, e.to_string())
}

#[async_trait]
impl I2cBus for LinuxI2cBus {
    async fn scan(&self, range: ScanRange) -> BusResult<Vec<BusAddress>> {
        debug!(%range, bus = self.bus_number, "Scanning");
        self.transfer(move |dev| {
            Ok(range
                .addresses()
                .into_iter()
                .filter(|addr| dev.probe(addr.raw()))
                .collect())
        })
        .await
    }

    async fn device_id(&self, address: BusAddress) -> BusResult<DeviceIdInfo> {
        self.transfer(move |dev| {
            let raw = dev.device_id(address.raw()).map_err(read_err(address))?;
            Ok(DeviceIdInfo::from_raw(raw))
        })
        .await
    }

    async fn i2c_read(&self, address: BusAddress, length: usize) -> BusResult<ReadResult> {
        self.transfer(move |dev| {
            let buffer = dev
                .raw_read(address.raw(), length)
                .map_err(read_err(address))?;
            Ok(ReadResult::from_buffer(buffer))
        })
        .await
    }

    async fn i2c_write(&self, address: BusAddress, buffer: Vec<u8>) -> BusResult<WriteResult> {
        self.transfer(move |dev| {
            let bytes_written = dev
                .raw_write(address.raw(), &buffer)
                .map_err(write_err(address))?;
            Ok(WriteResult {
                bytes_written,
                buffer,
            })
        })
        .await
    }

    async fn read_byte(&self, address: BusAddress, command: u8) -> BusResult<u8> {
        self.transfer(move |dev| {
            dev.read_byte(address.raw(), command)
                .map_err(read_err(address))
        })
        .await
    }

    async fn read_word(&self, address: BusAddress, command: u8) -> BusResult<u16> {
        self.transfer(move |dev| {
            dev.read_word(address.raw(), command)
                .map_err(read_err(address))
        })
        .await
    }

    async fn read_i2c_block(
        &self,
        address: BusAddress,
        command: u8,
        length: usize,
    ) -> BusResult<ReadResult> {
        self.transfer(move |dev| {
            let buffer = dev
                .read_block(address.raw(), command, length)
                .map_err(read_err(address))?;
            Ok(ReadResult::from_buffer(buffer))
        })
        .await
    }

    async fn write_i2c_block(
        &self,
        address: BusAddress,
        command: u8,
        buffer: Vec<u8>,
    ) -> BusResult<WriteResult> {
        self.transfer(move |dev| {
            let bytes_written = dev
                .write_block(address.raw(), command, &buffer)
                .map_err(write_err(address))?;
            Ok(WriteResult {
                bytes_written,
                buffer,
            })
        })
        .await
    }

    async fn receive_byte(&self, address: BusAddress) -> BusResult<u8> {
        self.transfer(move |dev| dev.receive_byte(address.raw()).map_err(read_err(address)))
            .await
    }

    async fn send_byte(&self, address: BusAddress, byte: u8) -> BusResult<()> {
        self.transfer(move |dev| {
            dev.send_byte(address.raw(), byte)
                .map_err(write_err(address))
        })
        .await
    }

    async fn write_byte(&self, address: BusAddress, command: u8, byte: u8) -> BusResult<()> {
        self.transfer(move |dev| {
            dev.write_byte(address.raw(), command, byte)
                .map_err(write_err(address))
        })
        .await
    }

    async fn write_word(&self, address: BusAddress, command: u8, word: u16) -> BusResult<()> {
        self.transfer(move |dev| {
            dev.write_word(address.raw(), command, word)
                .map_err(write_err(address))
        })
        .await
    }

    async fn write_quick(&self, address: BusAddress, _command: u8, bit: u8) -> BusResult<()> {
        self.transfer(move |dev| dev.quick(address.raw(), bit).map_err(write_err(address)))
            .await
    }

    async fn close(&self) -> BusResult<()> {
        let dropped = self.dev.lock().expect("i2c device mutex poisoned").take();
        if dropped.is_some() {
            debug!(bus = self.bus_number, "Closed local I2C bus");
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // Hardware-backed behavior needs a real /dev/i2c-N; these tests cover
    // what can be verified without one.

    #[tokio::test]
    async fn test_open_missing_bus_fails() {
        // Bus 250 does not exist on any sane machine.
        let result = LinuxI2cBus::open(250);
        assert!(matches!(result, Err(BusError::OpenFailed { bus: 250, .. })));
    }

    #[tokio::test]
    async fn test_operations_after_close_report_closed() {
        // Fabricate a bus that is already closed.
        let bus = LinuxI2cBus {
            bus_number: 0,
            dev: Arc::new(Mutex::new(None)),
        };
        bus.close().await.unwrap();
        bus.close().await.unwrap(); // idempotent

        let err = bus
            .receive_byte(BusAddress::new(0x20).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, BusError::Closed));
    }
}
