// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # twig-rpc
//!
//! The HTTP/JSON wire protocol of the TWIG gateway.
//!
//! One fixed method set tied to the I2C primitives, one fixed path
//! (`POST /rpc`), JSON envelopes, binary payloads as lowercase hex. This
//! is deliberately not a general RPC framework.
//!
//! ```text
//! ┌─────────────┐   {"method":"i2cRead","args":{...}}   ┌─────────────┐
//! │  RemoteBus  │ ────────────────────────────────────▶ │  RpcServer  │
//! │ (I2cBus)    │ ◀──────────────────────────────────── │  (axum)     │
//! └─────────────┘      {"bytesRead":2,"buffer":"dead"}  └─────────────┘
//!                                                              │
//!                                                              ▼
//!                                                       local dyn I2cBus
//! ```
//!
//! The wire carries no authentication; any reachable caller can issue bus
//! operations. Deploy inside a trusted network boundary.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod protocol;
pub mod server;

pub use client::RemoteBus;
pub use protocol::{Method, RpcRequest};
pub use server::{dispatch, BoundRpcServer, RpcServer};
