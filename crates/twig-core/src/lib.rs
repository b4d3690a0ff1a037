// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # twig-core
//!
//! Core abstractions for TWIG, the Two-Wire Interface Gateway:
//!
//! - **Bus abstraction**: the [`bus::I2cBus`] capability trait all bus
//!   variants (local hardware, remote RPC client, test doubles) satisfy
//! - **Event dispatch**: listener registries and the last-acknowledged
//!   value cache routing platform state changes to device handlers
//! - **Handler lifecycle**: the factory registry and the parallel
//!   start/stop fan-out with per-device failure isolation
//! - **Platform boundary**: the state store and message-box contracts the
//!   hosting automation platform fulfills
//! - **Wire payload codec**: lowercase hex encoding for binary buffers
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      twig-bin runtime                    │
//! └──────────────────────────────────────────────────────────┘
//!        │                 │                      │
//!        ▼                 ▼                      ▼
//! ┌────────────┐   ┌───────────────┐   ┌──────────────────┐
//! │ HandlerSet │   │EventDispatcher│   │ RPC server (/rpc)│
//! └────────────┘   └───────────────┘   └──────────────────┘
//!        │                 │                      │
//!        └────────────┬────┘──────────────────────┘
//!                     ▼
//!            ┌─────────────────┐
//!            │  dyn I2cBus     │  local (/dev/i2c-N) or remote (HTTP)
//!            └─────────────────┘
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod bus;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod hex;
pub mod platform;
pub mod types;

pub use bus::{BusResult, I2cBus};
pub use dispatch::{
    foreign_listener, state_listener, EventDispatcher, ForeignStateChangeListener,
    StateChangeListener,
};
pub use error::{BusError, ConfigError, ListenerError, RpcError, TwigError, TwigResult};
pub use handler::{DeviceHandler, HandlerContext, HandlerFactory, HandlerRegistry, HandlerSet};
pub use platform::{command_channel, Command, CommandSender, MemoryStateStore, StateStore};
pub use types::{
    BusAddress, DeviceConfig, DeviceIdInfo, ReadResult, ScanRange, StateRecord, StateValue,
    WriteResult,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
