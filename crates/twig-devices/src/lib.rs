// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # twig-devices
//!
//! Device handler implementations and the registry wiring that makes them
//! reachable from configuration. Handler types resolve through an explicit
//! factory map built at startup; configuration names a type, the registry
//! builds the handler.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod generic;

pub use generic::{GenericDevice, GenericDeviceFactory};

use twig_core::handler::HandlerRegistry;

/// Builds the registry with every built-in device type.
pub fn default_registry() -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    registry.register(Box::new(GenericDeviceFactory));
    registry
}
