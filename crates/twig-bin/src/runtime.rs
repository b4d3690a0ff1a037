// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Adapter runtime orchestration.
//!
//! Startup order:
//!
//! 1. Seed the dispatcher's last-acknowledged cache from persisted states
//! 2. Open the bus (remote when a client address is configured, else the
//!    local `/dev/i2c-N` device)
//! 3. Start the RPC server when a port is configured
//! 4. Construct and start device handlers (failures isolated per device)
//! 5. Subscribe to own state changes and pump notifications
//!
//! Shutdown runs the reverse of what matters: RPC server first, then
//! handlers, then the bus is closed.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use twig_core::bus::I2cBus;
use twig_core::dispatch::EventDispatcher;
use twig_core::handler::{HandlerContext, HandlerRegistry, HandlerSet};
use twig_core::platform::{command_channel, Command, CommandSender, StateStore};
use twig_core::types::ScanRange;
use twig_linux::LinuxI2cBus;
use twig_rpc::{RemoteBus, RpcServer};

use crate::config::AdapterConfig;
use crate::error::BinResult;
use crate::shutdown::ShutdownCoordinator;

// =============================================================================
// AdapterRuntime
// =============================================================================

/// The main runtime wiring configuration, platform and bus together.
pub struct AdapterRuntime {
    config: AdapterConfig,
    store: Arc<dyn StateStore>,
    registry: HandlerRegistry,
    shutdown: ShutdownCoordinator,
    command_tx: CommandSender,
    command_rx: mpsc::Receiver<Command>,
    start_handlers: bool,
}

impl AdapterRuntime {
    /// Creates a runtime with the built-in device registry.
    pub fn new(config: AdapterConfig, store: Arc<dyn StateStore>) -> Self {
        Self::with_registry(config, store, twig_devices::default_registry())
    }

    /// Creates a runtime with a caller-supplied device registry.
    pub fn with_registry(
        config: AdapterConfig,
        store: Arc<dyn StateStore>,
        registry: HandlerRegistry,
    ) -> Self {
        let (command_tx, command_rx) = command_channel(64);
        Self {
            config,
            store,
            registry,
            shutdown: ShutdownCoordinator::new(),
            command_tx,
            command_rx,
            start_handlers: true,
        }
    }

    /// Disables device handlers (bus and RPC server only).
    pub fn without_handlers(mut self) -> Self {
        self.start_handlers = false;
        self
    }

    /// Returns the shutdown coordinator driving this runtime.
    pub fn shutdown_coordinator(&self) -> ShutdownCoordinator {
        self.shutdown.clone()
    }

    /// Returns a sender for the inbound message box.
    pub fn command_sender(&self) -> CommandSender {
        self.command_tx.clone()
    }

    /// Runs the adapter until shutdown is signaled.
    pub async fn run(mut self) -> BinResult<()> {
        info!("Starting TWIG v{}", twig_core::VERSION);

        let dispatcher = EventDispatcher::new(self.config.namespace.clone(), self.store.clone());
        dispatcher.seed_from_store().await?;

        let bus = open_bus(&self.config)?;

        let server_task = match self.config.server_port {
            Some(port) => {
                let bound = RpcServer::new(bus.clone()).bind(port).await?;
                info!("RPC server listening on {}", bound.local_addr());
                let signal = self.shutdown.shutdown_signal();
                Some(tokio::spawn(bound.serve(signal)))
            }
            None => None,
        };

        let handlers = if self.start_handlers {
            let ctx = HandlerContext {
                bus: bus.clone(),
                dispatcher: dispatcher.clone(),
            };
            let set = HandlerSet::construct(&self.registry, &self.config.devices, ctx);
            info!("Starting {} device handler(s)", set.len());
            set.start_all().await;
            Some(set)
        } else {
            None
        };

        let own_pattern = format!("{}.*", self.config.namespace);
        self.store.subscribe_states(&own_pattern).await?;

        let mut changes = self.store.changes();
        let mut shutdown_rx = self.shutdown.subscribe();
        info!("TWIG ready on bus {}", self.config.bus_number);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => break,
                change = changes.recv() => match change {
                    Ok((id, record)) => dispatcher.on_state_change(&id, record).await,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "State change stream lagged");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        warn!("State change stream closed, shutting down");
                        self.shutdown.initiate_shutdown();
                    }
                },
                command = self.command_rx.recv() => match command {
                    Some(command) => {
                        handle_command(bus.as_ref(), self.config.bus_number, command).await;
                    }
                    None => break,
                },
            }
        }

        info!("Shutting down");
        // The loop can also exit via a closed command channel; make sure
        // the server's shutdown signal fires before waiting on it.
        self.shutdown.initiate_shutdown();
        if let Some(task) = server_task {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("RPC server stopped with error: {}", e),
                Err(e) => error!("RPC server task failed: {}", e),
            }
        }
        if let Some(handlers) = handlers {
            handlers.stop_all().await;
        }
        bus.close().await?;

        info!("TWIG shutdown complete");
        Ok(())
    }
}

/// Opens the configured bus: remote when a client address is set, local
/// otherwise.
fn open_bus(config: &AdapterConfig) -> BinResult<Arc<dyn I2cBus>> {
    match config.remote_address() {
        Some(address) => {
            info!("Using remote bus at {}", address);
            Ok(Arc::new(RemoteBus::new(address)))
        }
        None => {
            let bus = LinuxI2cBus::open(config.bus_number)?;
            info!("Using local bus /dev/i2c-{}", config.bus_number);
            Ok(Arc::new(bus))
        }
    }
}

// =============================================================================
// Message Box
// =============================================================================

/// Handles one inbound platform command.
///
/// Bus faults are logged with the hex address; the command finishes
/// without a reply payload, never propagating the error.
pub async fn handle_command(bus: &dyn I2cBus, bus_number: u32, command: Command) {
    match command {
        Command::Search { bus: wanted, reply } => {
            let found = if wanted == bus_number {
                bus.scan(ScanRange::Full).await
            } else {
                scan_other_bus(wanted).await
            };
            match found {
                Ok(addresses) => {
                    info!("Search on bus {} found {} device(s)", wanted, addresses.len());
                    if let Some(reply) = reply {
                        let _ = reply.send(addresses);
                    }
                }
                Err(e) => error!("Search on bus {} failed: {}", wanted, e),
            }
        }
        Command::Read {
            address,
            register,
            bytes,
            reply,
        } => {
            let length = bytes.unwrap_or(1);
            let result = match register {
                Some(command) => bus.read_i2c_block(address, command, length).await,
                None => bus.i2c_read(address, length).await,
            };
            match result {
                Ok(read) => {
                    if let Some(reply) = reply {
                        let _ = reply.send(read.buffer);
                    }
                }
                Err(e) => error!("Read from {} failed: {}", address, e),
            }
        }
        Command::Write {
            address,
            register,
            data,
            reply,
        } => {
            let result = match register {
                Some(command) => bus.write_i2c_block(address, command, data).await,
                None => bus.i2c_write(address, data).await,
            };
            match result {
                Ok(written) => {
                    if let Some(reply) = reply {
                        let _ = reply.send(written.buffer);
                    }
                }
                Err(e) => error!("Write to {} failed: {}", address, e),
            }
        }
    }
}

/// Opens a second local bus for a one-off search, closing it afterwards.
async fn scan_other_bus(
    bus_number: u32,
) -> Result<Vec<twig_core::types::BusAddress>, twig_core::error::BusError> {
    let other = LinuxI2cBus::open(bus_number)?;
    let result = other.scan(ScanRange::Full).await;
    other.close().await?;
    result
}

// =============================================================================
// Tests
// =============================================================================
