// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Unified error hierarchy for TWIG.
//!
//! # Error Hierarchy
//!
//! ```text
//! TwigError (root)
//! ├── ConfigError    - Configuration parsing, validation, device types
//! ├── BusError       - I2C hardware / remote transport faults
//! ├── RpcError       - Wire protocol faults (bad JSON, unknown method, ...)
//! └── ListenerError  - State-change dispatch faults
//! ```
//!
//! The RPC server never crashes the process on a per-request error; every
//! error maps to an HTTP status via [`TwigError::status_code`].

use std::path::PathBuf;

use thiserror::Error;

use crate::types::BusAddress;

/// Convenience alias for results carrying the root error.
pub type TwigResult<T> = Result<T, TwigError>;

// =============================================================================
// TwigError - Root Error Type
// =============================================================================

/// The root error type for TWIG.
#[derive(Debug, Error)]
pub enum TwigError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Bus error.
    #[error("Bus error: {0}")]
    Bus(#[from] BusError),

    /// Wire protocol error.
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    /// Event dispatch error.
    #[error("Listener error: {0}")]
    Listener(#[from] ListenerError),
}

impl TwigError {
    /// Returns the HTTP status code for this error at the server boundary.
    pub fn status_code(&self) -> u16 {
        match self {
            TwigError::Rpc(e) => e.status_code(),
            TwigError::Config(_) => 400,
            _ => 500,
        }
    }

    /// Returns the error type as a string for logging.
    pub fn error_type(&self) -> &'static str {
        match self {
            TwigError::Config(_) => "config",
            TwigError::Bus(_) => "bus",
            TwigError::Rpc(_) => "rpc",
            TwigError::Listener(_) => "listener",
        }
    }
}

// =============================================================================
// ConfigError
// =============================================================================

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No handler factory is registered for a configured device type.
    #[error("Unknown device type '{device_type}' for {address}")]
    UnknownDeviceType {
        /// The unresolvable type string.
        device_type: String,
        /// The device's bus address.
        address: BusAddress,
    },

    /// A required field is missing.
    #[error("Missing required field: {field}")]
    MissingField {
        /// The missing field name.
        field: String,
    },

    /// A field failed validation.
    #[error("Validation failed for '{field}': {message}")]
    Validation {
        /// The offending field.
        field: String,
        /// What went wrong.
        message: String,
    },

    /// Failed to parse a configuration file.
    #[error("Failed to parse config file '{path}': {message}")]
    Parse {
        /// Path to the configuration file.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// Unsupported configuration file extension.
    #[error("Unsupported config format: '{path}' (expected .toml, .yaml or .json)")]
    UnsupportedFormat {
        /// Path to the configuration file.
        path: PathBuf,
    },

    /// File I/O error.
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        /// Path to the file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Creates a validation error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates a missing field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }
}

// =============================================================================
// BusError
// =============================================================================

/// I2C hardware and remote transport errors.
#[derive(Debug, Error)]
pub enum BusError {
    /// Failed to open the bus device.
    #[error("Failed to open bus {bus}: {source}")]
    OpenFailed {
        /// The bus number.
        bus: u32,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An address outside the 7-bit space.
    #[error("Invalid bus address: {value} (valid range is 0-127)")]
    InvalidAddress {
        /// The out-of-range value.
        value: u16,
    },

    /// A read transaction failed.
    #[error("Read failed at {address}: {message}")]
    ReadFailed {
        /// The target address.
        address: BusAddress,
        /// What went wrong.
        message: String,
    },

    /// A write transaction failed.
    #[error("Write failed at {address}: {message}")]
    WriteFailed {
        /// The target address.
        address: BusAddress,
        /// What went wrong.
        message: String,
    },

    /// The remote RPC endpoint rejected or garbled a call.
    ///
    /// Carries the raw response body as detail, per the client contract.
    #[error("Remote bus call '{method}' failed: {detail}")]
    Remote {
        /// The wire method that failed.
        method: String,
        /// The response body or transport error.
        detail: String,
    },

    /// Operation on a bus that was already closed.
    #[error("Bus is closed")]
    Closed,

    /// Operation the bus implementation does not provide.
    #[error("Operation not supported: {operation}")]
    Unsupported {
        /// The unsupported operation name.
        operation: String,
    },
}

impl BusError {
    /// Creates a read failure.
    pub fn read_failed(address: BusAddress, message: impl Into<String>) -> Self {
        Self::ReadFailed {
            address,
            message: message.into(),
        }
    }

    /// Creates a write failure.
    pub fn write_failed(address: BusAddress, message: impl Into<String>) -> Self {
        Self::WriteFailed {
            address,
            message: message.into(),
        }
    }

    /// Creates a remote call failure carrying the response body.
    pub fn remote(method: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Remote {
            method: method.into(),
            detail: detail.into(),
        }
    }
}

// =============================================================================
// RpcError
// =============================================================================

/// Wire protocol errors.
#[derive(Debug, Error)]
pub enum RpcError {
    /// Request body is not valid JSON.
    #[error("Malformed JSON body: {message}")]
    MalformedJson {
        /// Parser message.
        message: String,
    },

    /// The envelope has no `method` property.
    #[error("Property 'method' is not defined")]
    MissingMethod,

    /// The `method` value is not in the supported set.
    #[error("Property 'method' is unknown: {method}")]
    UnknownMethod {
        /// The unrecognized method name.
        method: String,
    },

    /// Method arguments did not match the expected shape.
    #[error("Invalid arguments for '{method}': {message}")]
    InvalidArgs {
        /// The method whose arguments failed to parse.
        method: String,
        /// Parser message.
        message: String,
    },

    /// A hex payload failed to decode.
    #[error("Invalid hex payload: {message}")]
    InvalidPayload {
        /// Decoder message.
        message: String,
    },

    /// Request path other than `/rpc`.
    #[error("Path not found: {path}")]
    NotFound {
        /// The requested path.
        path: String,
    },

    /// The server socket could not be bound.
    #[error("Failed to bind RPC server on port {port}: {source}")]
    Bind {
        /// The configured port.
        port: u16,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl RpcError {
    /// Creates an unknown-method error.
    pub fn unknown_method(method: impl Into<String>) -> Self {
        Self::UnknownMethod {
            method: method.into(),
        }
    }

    /// Creates an invalid-arguments error.
    pub fn invalid_args(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgs {
            method: method.into(),
            message: message.into(),
        }
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            RpcError::NotFound { .. } => 404,
            _ => 500,
        }
    }
}

// =============================================================================
// ListenerError
// =============================================================================

/// Event dispatch errors.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// A pending state change arrived for an id nobody listens to.
    #[error("Unsupported state change: {id}")]
    UnsupportedState {
        /// The fully qualified state id.
        id: String,
    },

    /// Subscribing to a foreign state failed at the platform boundary.
    #[error("Failed to subscribe to foreign state '{id}': {message}")]
    SubscribeFailed {
        /// The foreign state id.
        id: String,
        /// What went wrong.
        message: String,
    },
}

// =============================================================================
// Tests
// =============================================================================
