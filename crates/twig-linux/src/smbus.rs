// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Raw `/dev/i2c-N` plumbing.
//!
//! Synchronous ioctl calls against the kernel's i2c-dev interface; the
//! async wrapper in `lib.rs` moves these onto blocking threads. Constants
//! come from `linux/i2c.h` and `linux/i2c-dev.h`.

#![allow(unsafe_code)]

use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::AsRawFd;

// Ioctl requests.
const I2C_SLAVE: libc::c_ulong = 0x0703;
const I2C_RDWR: libc::c_ulong = 0x0707;
const I2C_SMBUS: libc::c_ulong = 0x0720;

// SMBus transfer direction.
const I2C_SMBUS_WRITE: u8 = 0;
const I2C_SMBUS_READ: u8 = 1;

// SMBus transaction sizes.
const I2C_SMBUS_QUICK: u32 = 0;
const I2C_SMBUS_BYTE: u32 = 1;
const I2C_SMBUS_BYTE_DATA: u32 = 2;
const I2C_SMBUS_WORD_DATA: u32 = 3;
const I2C_SMBUS_I2C_BLOCK_DATA: u32 = 8;

/// Largest SMBus block payload.
pub const I2C_SMBUS_BLOCK_MAX: usize = 32;

// Combined-transaction message flag.
const I2C_M_RD: u16 = 0x0001;

// Reserved address the device-ID probe talks to.
const DEVICE_ID_ADDR: u16 = 0x7c;

#[repr(C)]
union SmbusData {
    byte: u8,
    word: u16,
    // block[0] is the byte count, data follows.
    block: [u8; I2C_SMBUS_BLOCK_MAX + 2],
}

#[repr(C)]
struct SmbusIoctlData {
    read_write: u8,
    command: u8,
    size: u32,
    data: *mut SmbusData,
}

#[repr(C)]
struct I2cMsg {
    addr: u16,
    flags: u16,
    len: u16,
    buf: *mut u8,
}

#[repr(C)]
struct I2cRdwrIoctlData {
    msgs: *mut I2cMsg,
    nmsgs: u32,
}

/// An open i2c-dev file descriptor with synchronous transfer methods.
///
/// Not reentrant: callers serialize access (the async wrapper keeps it
/// behind a mutex for exactly that reason).
pub struct I2cDev {
    file: File,
}

impl I2cDev {
    /// Opens `/dev/i2c-<bus>` for read/write.
    pub fn open(bus: u32) -> io::Result<Self> {
        let path = format!("/dev/i2c-{}", bus);
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self { file })
    }

    fn select(&self, addr: u8) -> io::Result<()> {
        let rc = unsafe {
            libc::ioctl(
                self.file.as_raw_fd(),
                I2C_SLAVE,
                libc::c_ulong::from(addr),
            )
        };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn smbus_transfer(
        &self,
        addr: u8,
        read_write: u8,
        command: u8,
        size: u32,
        data: *mut SmbusData,
    ) -> io::Result<()> {
        self.select(addr)?;
        let mut args = SmbusIoctlData {
            read_write,
            command,
            size,
            data,
        };
        let rc = unsafe {
            libc::ioctl(
                self.file.as_raw_fd(),
                I2C_SMBUS,
                &mut args as *mut SmbusIoctlData,
            )
        };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// SMBus quick write: the R/W bit is the whole payload.
    pub fn quick(&self, addr: u8, bit: u8) -> io::Result<()> {
        self.smbus_transfer(addr, bit & 1, 0, I2C_SMBUS_QUICK, std::ptr::null_mut())
    }

    /// SMBus receive byte.
    pub fn receive_byte(&self, addr: u8) -> io::Result<u8> {
        let mut data = SmbusData { byte: 0 };
        self.smbus_transfer(addr, I2C_SMBUS_READ, 0, I2C_SMBUS_BYTE, &mut data)?;
        Ok(unsafe { data.byte })
    }

    /// SMBus send byte.
    pub fn send_byte(&self, addr: u8, byte: u8) -> io::Result<()> {
        self.smbus_transfer(addr, I2C_SMBUS_WRITE, byte, I2C_SMBUS_BYTE, std::ptr::null_mut())
    }

    /// SMBus read byte from a command register.
    pub fn read_byte(&self, addr: u8, command: u8) -> io::Result<u8> {
        let mut data = SmbusData { byte: 0 };
        self.smbus_transfer(addr, I2C_SMBUS_READ, command, I2C_SMBUS_BYTE_DATA, &mut data)?;
        Ok(unsafe { data.byte })
    }

    /// SMBus write byte to a command register.
    pub fn write_byte(&self, addr: u8, command: u8, byte: u8) -> io::Result<()> {
        let mut data = SmbusData { byte };
        self.smbus_transfer(addr, I2C_SMBUS_WRITE, command, I2C_SMBUS_BYTE_DATA, &mut data)
    }

    /// SMBus read word from a command register.
    pub fn read_word(&self, addr: u8, command: u8) -> io::Result<u16> {
        let mut data = SmbusData { word: 0 };
        self.smbus_transfer(addr, I2C_SMBUS_READ, command, I2C_SMBUS_WORD_DATA, &mut data)?;
        Ok(unsafe { data.word })
    }

    /// SMBus write word to a command register.
    pub fn write_word(&self, addr: u8, command: u8, word: u16) -> io::Result<()> {
        let mut data = SmbusData { word };
        self.smbus_transfer(addr, I2C_SMBUS_WRITE, command, I2C_SMBUS_WORD_DATA, &mut data)
    }

    /// SMBus block read of up to [`I2C_SMBUS_BLOCK_MAX`] bytes.
    pub fn read_block(&self, addr: u8, command: u8, length: usize) -> io::Result<Vec<u8>> {
        let length = length.min(I2C_SMBUS_BLOCK_MAX);
        let mut data = SmbusData {
            block: [0; I2C_SMBUS_BLOCK_MAX + 2],
        };
        unsafe {
            data.block[0] = length as u8;
        }
        self.smbus_transfer(
            addr,
            I2C_SMBUS_READ,
            command,
            I2C_SMBUS_I2C_BLOCK_DATA,
            &mut data,
        )?;
        let block = unsafe { &data.block };
        let count = usize::from(block[0]).min(I2C_SMBUS_BLOCK_MAX);
        Ok(block[1..=count].to_vec())
    }

    /// SMBus block write of up to [`I2C_SMBUS_BLOCK_MAX`] bytes.
    pub fn write_block(&self, addr: u8, command: u8, buffer: &[u8]) -> io::Result<usize> {
        if buffer.len() > I2C_SMBUS_BLOCK_MAX {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("block write limited to {} bytes", I2C_SMBUS_BLOCK_MAX),
            ));
        }
        let mut data = SmbusData {
            block: [0; I2C_SMBUS_BLOCK_MAX + 2],
        };
        unsafe {
            data.block[0] = buffer.len() as u8;
            data.block[1..=buffer.len()].copy_from_slice(buffer);
        }
        self.smbus_transfer(
            addr,
            I2C_SMBUS_WRITE,
            command,
            I2C_SMBUS_I2C_BLOCK_DATA,
            &mut data,
        )?;
        Ok(buffer.len())
    }

    /// Plain I2C read.
    pub fn raw_read(&self, addr: u8, length: usize) -> io::Result<Vec<u8>> {
        self.select(addr)?;
        let mut buffer = vec![0u8; length];
        let rc = unsafe {
            libc::read(
                self.file.as_raw_fd(),
                buffer.as_mut_ptr() as *mut libc::c_void,
                buffer.len(),
            )
        };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        buffer.truncate(rc as usize);
        Ok(buffer)
    }

    /// Plain I2C write. Returns the byte count accepted by the device.
    pub fn raw_write(&self, addr: u8, buffer: &[u8]) -> io::Result<usize> {
        self.select(addr)?;
        let rc = unsafe {
            libc::write(
                self.file.as_raw_fd(),
                buffer.as_ptr() as *const libc::c_void,
                buffer.len(),
            )
        };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(rc as usize)
    }

    /// Runs the standard device-ID probe: a combined transaction against
    /// the reserved 0x7c address, write target, read three bytes.
    pub fn device_id(&self, addr: u8) -> io::Result<[u8; 3]> {
        let mut target = [addr << 1];
        let mut id = [0u8; 3];
        let mut msgs = [
            I2cMsg {
                addr: DEVICE_ID_ADDR,
                flags: 0,
                len: 1,
                buf: target.as_mut_ptr(),
            },
            I2cMsg {
                addr: DEVICE_ID_ADDR,
                flags: I2C_M_RD,
                len: 3,
                buf: id.as_mut_ptr(),
            },
        ];
        let mut args = I2cRdwrIoctlData {
            msgs: msgs.as_mut_ptr(),
            nmsgs: 2,
        };
        let rc = unsafe {
            libc::ioctl(
                self.file.as_raw_fd(),
                I2C_RDWR,
                &mut args as *mut I2cRdwrIoctlData,
            )
        };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(id)
    }

    /// Probes one address for presence.
    ///
    /// Quick write everywhere except the EEPROM and 0x30 ranges, where a
    /// read is safer (same policy as i2cdetect).
    pub fn probe(&self, addr: u8) -> bool {
        let read_probe = (0x30..=0x37).contains(&addr) || (0x50..=0x5f).contains(&addr);
        if read_probe {
            self.receive_byte(addr).is_ok()
        } else {
            self.quick(addr, I2C_SMBUS_WRITE).is_ok()
        }
    }
}
