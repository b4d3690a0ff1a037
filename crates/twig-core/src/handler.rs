// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Device handler abstraction and lifecycle management.
//!
//! A device handler translates generic bus operations into semantics for
//! one peripheral. Handlers are constructed from configuration through an
//! explicit factory registry (type name → factory, resolved at build time)
//! and owned by a [`HandlerSet`] for their whole lifetime.
//!
//! # Failure isolation
//!
//! Construction, start and stop are all isolated per device: a bad type
//! name or a failing `start` is logged with the device's type and hex
//! address and never aborts its siblings. Stop errors are swallowed
//! entirely; teardown is best-effort.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, error};

use crate::bus::I2cBus;
use crate::dispatch::EventDispatcher;
use crate::error::{ConfigError, TwigError};
use crate::types::{BusAddress, DeviceConfig};

// =============================================================================
// DeviceHandler
// =============================================================================

/// The capability every device handler provides.
#[async_trait]
pub trait DeviceHandler: Send + Sync {
    /// The handler type name (lowercase, as configured).
    fn type_name(&self) -> &str;

    /// The device's bus address.
    fn address(&self) -> BusAddress;

    /// Begins operation: registers listeners, spawns poll loops.
    async fn start(&self) -> Result<(), TwigError>;

    /// Ends operation: cancels poll loops, releases device resources.
    async fn stop(&self) -> Result<(), TwigError>;
}

// =============================================================================
// HandlerContext
// =============================================================================

/// Shared collaborators handed to every handler at construction.
#[derive(Clone)]
pub struct HandlerContext {
    /// The bus the device lives on.
    pub bus: Arc<dyn I2cBus>,
    /// Dispatcher for state listeners and acknowledged writes.
    pub dispatcher: Arc<EventDispatcher>,
}

// =============================================================================
// HandlerFactory / HandlerRegistry
// =============================================================================

/// Constructs handlers of one device type.
pub trait HandlerFactory: Send + Sync {
    /// The type name this factory serves, lowercase.
    fn type_name(&self) -> &'static str;

    /// Builds a handler for one configured device.
    fn create(
        &self,
        config: &DeviceConfig,
        ctx: HandlerContext,
    ) -> Result<Arc<dyn DeviceHandler>, ConfigError>;
}

/// Maps lowercased device type names to factories.
///
/// This replaces the dynamic module loading of older gateways with a
/// registry populated at build time; unknown names fail construction with
/// [`ConfigError::UnknownDeviceType`].
#[derive(Default)]
pub struct HandlerRegistry {
    factories: HashMap<String, Box<dyn HandlerFactory>>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory under its type name.
    pub fn register(&mut self, factory: Box<dyn HandlerFactory>) {
        let name = factory.type_name().to_lowercase();
        debug!(device_type = %name, "Registered device handler factory");
        self.factories.insert(name, factory);
    }

    /// Returns the registered type names.
    pub fn supported_types(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Constructs a handler for one device entry.
    pub fn create(
        &self,
        config: &DeviceConfig,
        ctx: HandlerContext,
    ) -> Result<Arc<dyn DeviceHandler>, ConfigError> {
        let device_type = config
            .device_type
            .as_deref()
            .ok_or_else(|| ConfigError::missing_field("type"))?;
        let factory = self.factories.get(&device_type.to_lowercase()).ok_or(
            ConfigError::UnknownDeviceType {
                device_type: device_type.to_string(),
                address: config.address,
            },
        )?;
        factory.create(config, ctx)
    }
}

// =============================================================================
// HandlerSet
// =============================================================================

/// The set of successfully constructed handlers, owned for their lifetime.
pub struct HandlerSet {
    handlers: Vec<Arc<dyn DeviceHandler>>,
}

impl HandlerSet {
    /// Constructs handlers for every complete device entry.
    ///
    /// Entries missing `name` or `type` are skipped silently (they are
    /// placeholders in the configuration UI); construction failures are
    /// logged with the device's type and hex address and skipped.
    pub fn construct(
        registry: &HandlerRegistry,
        devices: &[DeviceConfig],
        ctx: HandlerContext,
    ) -> Self {
        let mut handlers = Vec::new();
        for config in devices {
            if !config.is_complete() {
                continue;
            }
            match registry.create(config, ctx.clone()) {
                Ok(handler) => handlers.push(handler),
                Err(e) => {
                    error!(
                        "Couldn't create {} {}: {}",
                        config.device_type.as_deref().unwrap_or("?"),
                        config.address,
                        e
                    );
                }
            }
        }
        Self { handlers }
    }

    /// Returns the number of live handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns `true` if no handlers were constructed.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Starts all handlers concurrently.
    ///
    /// Waits for every start to finish; each failure is logged on its own
    /// and never cancels a sibling already in flight.
    pub async fn start_all(&self) {
        join_all(self.handlers.iter().map(|h| async move {
            if let Err(e) = h.start().await {
                error!("Couldn't start {} {}: {}", h.type_name(), h.address(), e);
            }
        }))
        .await;
    }

    /// Stops all handlers concurrently, swallowing errors.
    pub async fn stop_all(&self) {
        join_all(self.handlers.iter().map(|h| async move {
            if let Err(e) = h.stop().await {
                debug!("Stop of {} {} failed: {}", h.type_name(), h.address(), e);
            }
        }))
        .await;
    }
}

// =============================================================================
// Tests
// =============================================================================
