// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Core data types shared across the TWIG gateway.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::BusError;

// =============================================================================
// BusAddress
// =============================================================================

/// A 7-bit I2C device address.
///
/// Valid addresses are `0x00..=0x7f`. The address doubles as a routing key
/// (device handlers are keyed by it) and a display value; logs always show
/// the conventional hex form (`0x48`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BusAddress(u8);

impl BusAddress {
    /// The lowest valid address.
    pub const MIN: BusAddress = BusAddress(0x00);

    /// The highest valid address in the 7-bit space.
    pub const MAX: BusAddress = BusAddress(0x7f);

    /// Creates a new address, validating the 7-bit range.
    pub fn new(raw: u8) -> Result<Self, BusError> {
        if raw > 0x7f {
            return Err(BusError::InvalidAddress { value: raw as u16 });
        }
        Ok(Self(raw))
    }

    /// Returns the raw address value.
    pub fn raw(&self) -> u8 {
        self.0
    }

    /// Iterates all addresses in `[self, end]` inclusive.
    pub fn to_inclusive(self, end: BusAddress) -> impl Iterator<Item = BusAddress> {
        (self.0..=end.0).map(BusAddress)
    }
}

impl fmt::Display for BusAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02x}", self.0)
    }
}

impl TryFrom<u8> for BusAddress {
    type Error = BusError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<u16> for BusAddress {
    type Error = BusError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        if value > 0x7f {
            return Err(BusError::InvalidAddress { value });
        }
        Ok(Self(value as u8))
    }
}

impl TryFrom<i64> for BusAddress {
    type Error = BusError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if !(0..=0x7f).contains(&value) {
            return Err(BusError::InvalidAddress {
                value: value.clamp(0, u16::MAX as i64) as u16,
            });
        }
        Ok(Self(value as u8))
    }
}

impl From<BusAddress> for u8 {
    fn from(addr: BusAddress) -> Self {
        addr.0
    }
}

// =============================================================================
// Scan Range
// =============================================================================

/// The address range covered by a bus scan.
///
/// Mirrors the three argument shapes of the wire protocol's `scan` method:
/// no arguments, a single address, or an inclusive range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanRange {
    /// Scan the full 7-bit address space.
    Full,
    /// Probe exactly one address.
    Single(BusAddress),
    /// Probe every address in `[start, end]` inclusive.
    Range {
        /// First address probed.
        start: BusAddress,
        /// Last address probed.
        end: BusAddress,
    },
}

impl ScanRange {
    /// Returns the addresses this range covers, in order.
    pub fn addresses(&self) -> Vec<BusAddress> {
        match *self {
            ScanRange::Full => BusAddress::MIN.to_inclusive(BusAddress::MAX).collect(),
            ScanRange::Single(addr) => vec![addr],
            ScanRange::Range { start, end } => start.to_inclusive(end).collect(),
        }
    }
}

impl Default for ScanRange {
    fn default() -> Self {
        ScanRange::Full
    }
}

impl fmt::Display for ScanRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanRange::Full => write!(f, "0x00-0x7f"),
            ScanRange::Single(addr) => write!(f, "{}", addr),
            ScanRange::Range { start, end } => write!(f, "{}-{}", start, end),
        }
    }
}

// =============================================================================
// Bus Operation Results
// =============================================================================

/// Result of a raw or block read.
///
/// The buffer is freshly owned by the result; callers never supply an
/// output buffer. On the wire the buffer travels as a lowercase hex string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadResult {
    /// Number of bytes actually read.
    pub bytes_read: usize,
    /// The bytes read.
    #[serde(with = "crate::hex::serde_hex")]
    pub buffer: Vec<u8>,
}

impl ReadResult {
    /// Creates a read result from a buffer, counting its full length.
    pub fn from_buffer(buffer: Vec<u8>) -> Self {
        Self {
            bytes_read: buffer.len(),
            buffer,
        }
    }
}

/// Result of a raw or block write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteResult {
    /// Number of bytes actually written.
    pub bytes_written: usize,
    /// The bytes that were written (echoed back).
    #[serde(with = "crate::hex::serde_hex")]
    pub buffer: Vec<u8>,
}

impl WriteResult {
    /// Creates a write result from a buffer, counting its full length.
    pub fn from_buffer(buffer: Vec<u8>) -> Self {
        Self {
            bytes_written: buffer.len(),
            buffer,
        }
    }
}

/// Identification record returned by the I2C device-ID probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceIdInfo {
    /// 12-bit manufacturer identifier assigned by NXP.
    pub manufacturer: u16,
    /// 9-bit part identifier.
    pub product: u16,
    /// 3-bit die revision.
    pub revision: u8,
}

impl DeviceIdInfo {
    /// Decodes the three raw bytes of a device-ID response.
    pub fn from_raw(bytes: [u8; 3]) -> Self {
        Self {
            manufacturer: ((bytes[0] as u16) << 4) | ((bytes[1] as u16) >> 4),
            product: (((bytes[1] as u16) & 0x0f) << 5) | ((bytes[2] as u16) >> 3),
            revision: bytes[2] & 0x07,
        }
    }
}

// =============================================================================
// Platform State Types
// =============================================================================

/// A value stored in the platform's state tree.
pub type StateValue = serde_json::Value;

/// A state-change notification payload from the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
    /// The new value.
    pub val: StateValue,
    /// Whether the value is acknowledged (settled) or a pending write.
    pub ack: bool,
}

impl StateRecord {
    /// Creates an acknowledged record.
    pub fn acked(val: impl Into<StateValue>) -> Self {
        Self {
            val: val.into(),
            ack: true,
        }
    }

    /// Creates a pending (unacknowledged) record.
    pub fn pending(val: impl Into<StateValue>) -> Self {
        Self {
            val: val.into(),
            ack: false,
        }
    }
}

// =============================================================================
// Device Configuration
// =============================================================================

/// Configuration for one peripheral on the bus.
///
/// Entries missing `name` or `type` are ignored at startup; everything the
/// concrete handler needs beyond the common fields rides in `options`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Display name of the device.
    #[serde(default)]
    pub name: Option<String>,
    /// Handler type, matched case-insensitively against the factory registry.
    #[serde(rename = "type", default)]
    pub device_type: Option<String>,
    /// 7-bit bus address.
    pub address: BusAddress,
    /// Handler-specific options.
    #[serde(default, flatten)]
    pub options: serde_json::Map<String, serde_json::Value>,
}

impl DeviceConfig {
    /// Returns `true` if this entry names both a device and a handler type.
    pub fn is_complete(&self) -> bool {
        self.name.as_deref().is_some_and(|n| !n.is_empty())
            && self.device_type.as_deref().is_some_and(|t| !t.is_empty())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bus_address_range() {
        assert!(BusAddress::new(0x00).is_ok());
        assert!(BusAddress::new(0x7f).is_ok());
        assert!(BusAddress::new(0x80).is_err());
        assert!(BusAddress::try_from(128u16).is_err());
        assert!(BusAddress::try_from(-1i64).is_err());
    }

    #[test]
    fn test_bus_address_display() {
        let addr = BusAddress::new(0x48).unwrap();
        assert_eq!(format!("{}", addr), "0x48");
        assert_eq!(format!("{}", BusAddress::MIN), "0x00");
    }

    #[test]
    fn test_bus_address_serde_plain_integer() {
        let addr = BusAddress::new(0x20).unwrap();
        assert_eq!(serde_json::to_string(&addr).unwrap(), "32");
        let back: BusAddress = serde_json::from_str("32").unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn test_scan_range_addresses() {
        assert_eq!(ScanRange::Full.addresses().len(), 128);

        let single = ScanRange::Single(BusAddress::new(0x11).unwrap());
        assert_eq!(single.addresses(), vec![BusAddress::new(0x11).unwrap()]);

        let range = ScanRange::Range {
            start: BusAddress::new(0x10).unwrap(),
            end: BusAddress::new(0x12).unwrap(),
        };
        assert_eq!(range.addresses().len(), 3);
    }

    #[test]
    fn test_read_result_wire_shape() {
        let result = ReadResult::from_buffer(vec![0xde, 0xad]);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["bytesRead"], 2);
        assert_eq!(json["buffer"], "dead");
    }

    #[test]
    fn test_device_id_decode() {
        // Manufacturer 0x008 (NXP), part 0x1a5, revision 2.
        let info = DeviceIdInfo::from_raw([0x00, 0x8d, 0x2a]);
        assert_eq!(info.manufacturer, 0x008);
        assert_eq!(info.product, 0x1a5);
        assert_eq!(info.revision, 2);
    }

    #[test]
    fn test_device_config_completeness() {
        let mut config = DeviceConfig {
            name: Some("thermo".to_string()),
            device_type: Some("generic".to_string()),
            address: BusAddress::new(0x48).unwrap(),
            options: Default::default(),
        };
        assert!(config.is_complete());

        config.device_type = None;
        assert!(!config.is_complete());

        config.device_type = Some(String::new());
        assert!(!config.is_complete());
    }
}
