// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Wire protocol types.
//!
//! One envelope shape for every call: `{"method": <name>, "args": {...}}`,
//! POSTed to `/rpc`. Responses are the method-specific JSON result on
//! success and plain text on failure. Binary buffers always travel as
//! lowercase hex strings.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use twig_core::error::RpcError;

// =============================================================================
// Method
// =============================================================================

/// The fixed method set of the wire protocol, one per bus primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Method {
    /// Probe a range of addresses.
    Scan,
    /// Standard device-ID probe.
    DeviceId,
    /// Plain read.
    I2cRead,
    /// Plain write.
    I2cWrite,
    /// SMBus read byte.
    ReadByte,
    /// SMBus read word.
    ReadWord,
    /// SMBus block read.
    ReadI2cBlock,
    /// SMBus receive byte.
    ReceiveByte,
    /// SMBus send byte.
    SendByte,
    /// SMBus write byte.
    WriteByte,
    /// SMBus write word.
    WriteWord,
    /// SMBus quick write.
    WriteQuick,
    /// SMBus block write.
    WriteI2cBlock,
}

impl Method {
    /// The wire name of this method.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Scan => "scan",
            Method::DeviceId => "deviceId",
            Method::I2cRead => "i2cRead",
            Method::I2cWrite => "i2cWrite",
            Method::ReadByte => "readByte",
            Method::ReadWord => "readWord",
            Method::ReadI2cBlock => "readI2cBlock",
            Method::ReceiveByte => "receiveByte",
            Method::SendByte => "sendByte",
            Method::WriteByte => "writeByte",
            Method::WriteWord => "writeWord",
            Method::WriteQuick => "writeQuick",
            Method::WriteI2cBlock => "writeI2cBlock",
        }
    }

    /// Parses a wire method name.
    pub fn parse(name: &str) -> Result<Self, RpcError> {
        serde_json::from_value(serde_json::Value::String(name.to_string()))
            .map_err(|_| RpcError::unknown_method(name))
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Envelope
// =============================================================================

/// The request envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Wire method name.
    pub method: String,
    /// Method-specific arguments.
    #[serde(default)]
    pub args: serde_json::Value,
}

impl RpcRequest {
    /// Builds an envelope for a method with typed arguments.
    pub fn new<A: Serialize>(method: Method, args: &A) -> Self {
        Self {
            method: method.as_str().to_string(),
            args: serde_json::to_value(args).unwrap_or(serde_json::Value::Null),
        }
    }

    /// Parses the raw request body.
    ///
    /// A body that is not JSON, or whose `method` property is missing or
    /// not a string, is a protocol error; the caller converts it to the
    /// 500 response texture.
    pub fn from_body(body: &str) -> Result<(Method, serde_json::Value), RpcError> {
        let json: serde_json::Value =
            serde_json::from_str(body).map_err(|e| RpcError::MalformedJson {
                message: e.to_string(),
            })?;
        let method = json
            .get("method")
            .and_then(|m| m.as_str())
            .ok_or(RpcError::MissingMethod)?;
        let method = Method::parse(method)?;
        let args = json.get("args").cloned().unwrap_or(serde_json::Value::Null);
        Ok((method, args))
    }

    /// Deserializes `args` into the per-method shape.
    pub fn parse_args<T: DeserializeOwned>(
        method: Method,
        args: &serde_json::Value,
    ) -> Result<T, RpcError> {
        // Absent args deserialize like an empty object so no-arg calls work.
        let empty = serde_json::Value::Object(Default::default());
        let args = if args.is_null() { &empty } else { args };
        serde_json::from_value(args.clone())
            .map_err(|e| RpcError::invalid_args(method.as_str(), e.to_string()))
    }
}

// =============================================================================
// Per-Method Argument Shapes
// =============================================================================

/// Arguments for `scan`.
///
/// Three shapes share one struct: empty (full range), `{address}` (single),
/// `{startAddr, endAddr}` (inclusive range, `endAddr` defaulting to 0x7f).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanArgs {
    /// Probe exactly this address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<u8>,
    /// First address of a range probe.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_addr: Option<u8>,
    /// Last address of a range probe.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_addr: Option<u8>,
}

/// Arguments carrying only a target address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressArgs {
    /// Target address.
    pub address: u8,
}

/// Arguments for `i2cRead`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawReadArgs {
    /// Target address.
    pub address: u8,
    /// Number of bytes to read.
    pub length: usize,
}

/// Arguments for `i2cWrite`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawWriteArgs {
    /// Target address.
    pub address: u8,
    /// Declared buffer length.
    pub length: usize,
    /// Bytes to write, hex encoded on the wire.
    #[serde(with = "twig_core::hex::serde_hex")]
    pub buffer: Vec<u8>,
}

/// Arguments for `readByte` / `readWord`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterArgs {
    /// Target address.
    pub address: u8,
    /// Command register.
    pub command: u8,
}

/// Arguments for `readI2cBlock`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockReadArgs {
    /// Target address.
    pub address: u8,
    /// Command register.
    pub command: u8,
    /// Number of bytes to read.
    pub length: usize,
}

/// Arguments for `writeI2cBlock`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockWriteArgs {
    /// Target address.
    pub address: u8,
    /// Command register.
    pub command: u8,
    /// Declared buffer length.
    pub length: usize,
    /// Bytes to write, hex encoded on the wire.
    #[serde(with = "twig_core::hex::serde_hex")]
    pub buffer: Vec<u8>,
}

/// Arguments for `sendByte`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendByteArgs {
    /// Target address.
    pub address: u8,
    /// Byte to send.
    pub byte: u8,
}

/// Arguments for `writeByte`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteByteArgs {
    /// Target address.
    pub address: u8,
    /// Command register.
    pub command: u8,
    /// Byte to write.
    pub byte: u8,
}

/// Arguments for `writeWord`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteWordArgs {
    /// Target address.
    pub address: u8,
    /// Command register.
    pub command: u8,
    /// Word to write.
    pub word: u16,
}

/// Arguments for `writeQuick`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteQuickArgs {
    /// Target address.
    pub address: u8,
    /// Command value, carried for compatibility.
    pub command: u8,
    /// The single transferred bit.
    pub bit: u8,
}

// =============================================================================
// Result Shapes
// =============================================================================

/// Response of `writeI2cBlock`.
///
/// The written count travels in a field named `bytesRead`. This asymmetry
/// is inherited from the original wire protocol and preserved so existing
/// peers keep working.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockWriteResponse {
    /// Number of bytes written, despite the field name.
    pub bytes_read: usize,
    /// The bytes written, hex encoded on the wire.
    #[serde(with = "twig_core::hex::serde_hex")]
    pub buffer: Vec<u8>,
}

// =============================================================================
// Tests
// =============================================================================
