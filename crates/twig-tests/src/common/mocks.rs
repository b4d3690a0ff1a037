// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Mock Implementations
//!
//! A configurable mock bus for testing TWIG components in isolation.
//!
//! ## Design Principles
//!
//! - Fixture data per address (register bytes, raw memory, presence)
//! - Recording of every write for verification
//! - Thread-safe for concurrent testing
//! - Simple error injection

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

use twig_core::bus::I2cBus;
use twig_core::error::BusError;
use twig_core::types::{BusAddress, DeviceIdInfo, ReadResult, ScanRange, WriteResult};

// =============================================================================
// Write Recording
// =============================================================================

/// One recorded write operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// Plain `i2c_write`.
    Raw {
        /// Target address.
        address: BusAddress,
        /// Written bytes.
        data: Vec<u8>,
    },
    /// `write_i2c_block`.
    Block {
        /// Target address.
        address: BusAddress,
        /// Command register.
        command: u8,
        /// Written bytes.
        data: Vec<u8>,
    },
    /// `write_byte`.
    Byte {
        /// Target address.
        address: BusAddress,
        /// Command register.
        command: u8,
        /// Written byte.
        byte: u8,
    },
    /// `write_word`.
    Word {
        /// Target address.
        address: BusAddress,
        /// Command register.
        command: u8,
        /// Written word.
        word: u16,
    },
    /// `send_byte`.
    SendByte {
        /// Target address.
        address: BusAddress,
        /// Written byte.
        byte: u8,
    },
    /// `write_quick`.
    Quick {
        /// Target address.
        address: BusAddress,
        /// The R/W bit.
        bit: u8,
    },
}

// =============================================================================
// MockBus
// =============================================================================

/// A configurable mock [`I2cBus`] with fixtures and error injection.
pub struct MockBus {
    /// Register contents keyed by `(address, command)`.
    registers: RwLock<HashMap<(BusAddress, u8), u8>>,
    /// Word register contents keyed by `(address, command)`.
    word_registers: RwLock<HashMap<(BusAddress, u8), u16>>,
    /// Raw memory served by `i2c_read` / `receive_byte`.
    memory: RwLock<HashMap<BusAddress, Vec<u8>>>,
    /// Device-ID fixtures.
    ids: RwLock<HashMap<BusAddress, DeviceIdInfo>>,
    /// Addresses that answer a scan probe.
    present: RwLock<Vec<BusAddress>>,

    fail_all_reads: AtomicBool,
    fail_all_writes: AtomicBool,
    closed: AtomicBool,

    read_count: AtomicU64,
    close_count: AtomicU64,
    writes: Mutex<Vec<WriteOp>>,
}

impl MockBus {
    /// Creates an empty mock bus.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            registers: RwLock::new(HashMap::new()),
            word_registers: RwLock::new(HashMap::new()),
            memory: RwLock::new(HashMap::new()),
            ids: RwLock::new(HashMap::new()),
            present: RwLock::new(Vec::new()),
            fail_all_reads: AtomicBool::new(false),
            fail_all_writes: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            read_count: AtomicU64::new(0),
            close_count: AtomicU64::new(0),
            writes: Mutex::new(Vec::new()),
        })
    }

    /// Marks an address as present on the bus.
    pub fn add_device(&self, address: BusAddress) {
        self.present.write().push(address);
    }

    /// Sets a byte register fixture.
    pub fn set_register(&self, address: BusAddress, command: u8, value: u8) {
        self.registers.write().insert((address, command), value);
    }

    /// Sets a word register fixture.
    pub fn set_word_register(&self, address: BusAddress, command: u8, value: u16) {
        self.word_registers.write().insert((address, command), value);
    }

    /// Sets the raw memory served to plain reads.
    pub fn set_memory(&self, address: BusAddress, bytes: Vec<u8>) {
        self.memory.write().insert(address, bytes);
    }

    /// Sets a device-ID fixture.
    pub fn set_device_id(&self, address: BusAddress, id: DeviceIdInfo) {
        self.ids.write().insert(address, id);
    }

    /// Makes every read fail until reset.
    pub fn fail_reads(&self, enabled: bool) {
        self.fail_all_reads.store(enabled, Ordering::SeqCst);
    }

    /// Makes every write fail until reset.
    pub fn fail_writes(&self, enabled: bool) {
        self.fail_all_writes.store(enabled, Ordering::SeqCst);
    }

    /// Returns all recorded writes.
    pub fn writes(&self) -> Vec<WriteOp> {
        self.writes.lock().clone()
    }

    /// Returns the number of reads served.
    pub fn read_count(&self) -> u64 {
        self.read_count.load(Ordering::SeqCst)
    }

    /// Returns how many times `close` was called.
    pub fn close_count(&self) -> u64 {
        self.close_count.load(Ordering::SeqCst)
    }

    fn check_open(&self) -> Result<(), BusError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BusError::Closed);
        }
        Ok(())
    }

    fn check_read(&self, address: BusAddress) -> Result<(), BusError> {
        self.check_open()?;
        self.read_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_all_reads.load(Ordering::SeqCst) {
            return Err(BusError::read_failed(address, "injected read failure"));
        }
        Ok(())
    }

    fn check_write(&self, address: BusAddress) -> Result<(), BusError> {
        self.check_open()?;
        if self.fail_all_writes.load(Ordering::SeqCst) {
            return Err(BusError::write_failed(address, "injected write failure"));
        }
        Ok(())
    }

    fn record(&self, op: WriteOp) {
        self.writes.lock().push(op);
    }
}

#[async_trait]
impl I2cBus for MockBus {
    async fn scan(&self, range: ScanRange) -> Result<Vec<BusAddress>, BusError> {
        self.check_read(BusAddress::MIN)?;
        let present = self.present.read();
        Ok(range
            .addresses()
            .into_iter()
            .filter(|a| present.contains(a))
            .collect())
    }

    async fn device_id(&self, address: BusAddress) -> Result<DeviceIdInfo, BusError> {
        self.check_read(address)?;
        self.ids
            .read()
            .get(&address)
            .copied()
            .ok_or_else(|| BusError::read_failed(address, "no device-id fixture"))
    }

    async fn i2c_read(&self, address: BusAddress, length: usize) -> Result<ReadResult, BusError> {
        self.check_read(address)?;
        let memory = self.memory.read();
        let bytes = memory
            .get(&address)
            .ok_or_else(|| BusError::read_failed(address, "no memory fixture"))?;
        let mut buffer = bytes.clone();
        buffer.truncate(length);
        Ok(ReadResult::from_buffer(buffer))
    }

    async fn i2c_write(
        &self,
        address: BusAddress,
        buffer: Vec<u8>,
    ) -> Result<WriteResult, BusError> {
        self.check_write(address)?;
        self.record(WriteOp::Raw {
            address,
            data: buffer.clone(),
        });
        Ok(WriteResult::from_buffer(buffer))
    }

    async fn read_byte(&self, address: BusAddress, command: u8) -> Result<u8, BusError> {
        self.check_read(address)?;
        self.registers
            .read()
            .get(&(address, command))
            .copied()
            .ok_or_else(|| BusError::read_failed(address, "no register fixture"))
    }

    async fn read_word(&self, address: BusAddress, command: u8) -> Result<u16, BusError> {
        self.check_read(address)?;
        self.word_registers
            .read()
            .get(&(address, command))
            .copied()
            .ok_or_else(|| BusError::read_failed(address, "no word register fixture"))
    }

    async fn read_i2c_block(
        &self,
        address: BusAddress,
        command: u8,
        length: usize,
    ) -> Result<ReadResult, BusError> {
        self.check_read(address)?;
        let registers = self.registers.read();
        let mut buffer = Vec::with_capacity(length);
        for offset in 0..length {
            let reg = command.wrapping_add(offset as u8);
            match registers.get(&(address, reg)) {
                Some(byte) => buffer.push(*byte),
                None => break,
            }
        }
        Ok(ReadResult::from_buffer(buffer))
    }

    async fn write_i2c_block(
        &self,
        address: BusAddress,
        command: u8,
        buffer: Vec<u8>,
    ) -> Result<WriteResult, BusError> {
        self.check_write(address)?;
        let mut registers = self.registers.write();
        for (offset, byte) in buffer.iter().enumerate() {
            registers.insert((address, command.wrapping_add(offset as u8)), *byte);
        }
        drop(registers);
        self.record(WriteOp::Block {
            address,
            command,
            data: buffer.clone(),
        });
        Ok(WriteResult::from_buffer(buffer))
    }

    async fn receive_byte(&self, address: BusAddress) -> Result<u8, BusError> {
        self.check_read(address)?;
        let memory = self.memory.read();
        memory
            .get(&address)
            .and_then(|bytes| bytes.first())
            .copied()
            .ok_or_else(|| BusError::read_failed(address, "no memory fixture"))
    }

    async fn send_byte(&self, address: BusAddress, byte: u8) -> Result<(), BusError> {
        self.check_write(address)?;
        self.record(WriteOp::SendByte { address, byte });
        Ok(())
    }

    async fn write_byte(&self, address: BusAddress, command: u8, byte: u8) -> Result<(), BusError> {
        self.check_write(address)?;
        self.registers.write().insert((address, command), byte);
        self.record(WriteOp::Byte {
            address,
            command,
            byte,
        });
        Ok(())
    }

    async fn write_word(
        &self,
        address: BusAddress,
        command: u8,
        word: u16,
    ) -> Result<(), BusError> {
        self.check_write(address)?;
        self.word_registers.write().insert((address, command), word);
        self.record(WriteOp::Word {
            address,
            command,
            word,
        });
        Ok(())
    }

    async fn write_quick(&self, address: BusAddress, _command: u8, bit: u8) -> Result<(), BusError> {
        self.check_write(address)?;
        self.record(WriteOp::Quick { address, bit });
        Ok(())
    }

    async fn close(&self) -> Result<(), BusError> {
        self.close_count.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
