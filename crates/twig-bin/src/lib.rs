// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # twig-bin
//!
//! The TWIG gateway binary: CLI parsing, logging setup, configuration
//! loading and the adapter runtime that wires the bus, the RPC server and
//! the device handlers together.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod shutdown;

pub use config::{load_config, AdapterConfig};
pub use error::{BinError, BinResult};
pub use runtime::AdapterRuntime;
pub use shutdown::ShutdownCoordinator;
