// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # TWIG Integration Tests
//!
//! Shared test utilities and integration tests for the TWIG gateway.
//!
//! ## Module Structure
//!
//! - [`common`]: Shared test utilities
//!   - `mocks`: Mock bus with register/memory fixtures and error injection
//!   - `harness`: RPC server harness bound to an ephemeral port
//!
//! ## Running Tests
//!
//! ```bash
//! # Run all integration tests
//! cargo test -p twig-tests
//!
//! # Run specific test suite
//! cargo test -p twig-tests --test integration_rpc
//! cargo test -p twig-tests --test integration_dispatch
//! cargo test -p twig-tests --test integration_devices
//! cargo test -p twig-tests --test integration_runtime
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod common;

/// Re-export commonly used items for convenience.
pub mod prelude {
    pub use crate::common::harness::*;
    pub use crate::common::mocks::*;
}
