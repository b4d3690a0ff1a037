// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Generic register device.
//!
//! Covers the long tail of simple peripherals without a dedicated handler:
//! each configured register becomes one platform state. Readable registers
//! are read once at start and then on their polling interval, publishing
//! acknowledged values; writable registers listen for pending state changes
//! and push the byte to the device.
//!
//! A register without a command byte maps to the plain receive-byte /
//! send-byte transfers instead of the register-addressed ones.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use twig_core::bus::I2cBus;
use twig_core::dispatch::{state_listener, EventDispatcher};
use twig_core::error::{ConfigError, TwigError};
use twig_core::handler::{DeviceHandler, HandlerContext, HandlerFactory};
use twig_core::types::{BusAddress, DeviceConfig, StateValue};

// =============================================================================
// Configuration
// =============================================================================

/// Options of a generic device, parsed from the entry's extra fields.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenericOptions {
    #[serde(default)]
    registers: Vec<RegisterConfig>,
}

/// One register of a generic device.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterConfig {
    /// State name, unique within the device.
    name: String,
    /// Command byte; `None` selects receive-byte / send-byte transfers.
    #[serde(default)]
    register: Option<u8>,
    /// Whether the register is read (polled).
    #[serde(default = "default_true")]
    read: bool,
    /// Whether the register accepts writes from state changes.
    #[serde(default)]
    write: bool,
    /// Poll period in milliseconds; `None` reads once at start only.
    #[serde(default)]
    polling_interval: Option<u64>,
}

fn default_true() -> bool {
    true
}

// =============================================================================
// GenericDevice
// =============================================================================

/// Handler for a device described entirely by its register list.
pub struct GenericDevice {
    address: BusAddress,
    registers: Vec<RegisterConfig>,
    bus: Arc<dyn I2cBus>,
    dispatcher: Arc<EventDispatcher>,
    poll_tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl GenericDevice {
    fn new(
        config: &DeviceConfig,
        ctx: HandlerContext,
    ) -> Result<Self, ConfigError> {
        let options: GenericOptions =
            serde_json::from_value(serde_json::Value::Object(config.options.clone()))
                .map_err(|e| ConfigError::validation("registers", e.to_string()))?;
        for reg in &options.registers {
            if reg.name.is_empty() {
                return Err(ConfigError::missing_field("registers[].name"));
            }
            if !reg.read && !reg.write {
                return Err(ConfigError::validation(
                    "registers[].read",
                    format!("register '{}' is neither readable nor writable", reg.name),
                ));
            }
        }
        Ok(Self {
            address: config.address,
            registers: options.registers,
            bus: ctx.bus,
            dispatcher: ctx.dispatcher,
            poll_tasks: Mutex::new(Vec::new()),
        })
    }

    /// Namespace-relative state id of one register.
    fn state_id(&self, reg: &RegisterConfig) -> String {
        format!("{}.{}", self.address, reg.name)
    }

    async fn read_register(
        bus: &dyn I2cBus,
        address: BusAddress,
        register: Option<u8>,
    ) -> Result<u8, TwigError> {
        let byte = match register {
            Some(command) => bus.read_byte(address, command).await?,
            None => bus.receive_byte(address).await?,
        };
        Ok(byte)
    }

    /// Reads one register and publishes the value if it changed.
    async fn poll_once(
        bus: &dyn I2cBus,
        dispatcher: &EventDispatcher,
        address: BusAddress,
        register: Option<u8>,
        state_id: &str,
    ) {
        match Self::read_register(bus, address, register).await {
            Ok(byte) => {
                let value = json!(byte);
                if dispatcher.get_state_value(state_id).as_ref() == Some(&value) {
                    return;
                }
                if let Err(e) = dispatcher.set_state_ack(state_id, value).await {
                    warn!(state_id, "Couldn't publish register value: {}", e);
                }
            }
            Err(e) => {
                warn!(%address, state_id, "Couldn't read register: {}", e);
            }
        }
    }

    async fn write_register(
        bus: &dyn I2cBus,
        dispatcher: &EventDispatcher,
        address: BusAddress,
        reg: &RegisterConfig,
        state_id: &str,
        value: &StateValue,
    ) {
        let Some(byte) = byte_from_value(value) else {
            warn!(
                %address,
                register = reg.name,
                %value,
                "Ignoring state change that is not a byte value"
            );
            return;
        };
        let result = match reg.register {
            Some(command) => bus.write_byte(address, command, byte).await,
            None => bus.send_byte(address, byte).await,
        };
        match result {
            // Acknowledge with what the device actually received.
            Ok(()) => {
                if let Err(e) = dispatcher.set_state_ack(state_id, json!(byte)).await {
                    warn!(register = reg.name, "Couldn't acknowledge write: {}", e);
                }
            }
            Err(e) => {
                warn!(%address, register = reg.name, "Write failed: {}", e);
            }
        }
    }
}

/// Converts a platform state value to a register byte.
fn byte_from_value(value: &StateValue) -> Option<u8> {
    match value {
        StateValue::Bool(b) => Some(u8::from(*b)),
        StateValue::Number(n) => n.as_u64().and_then(|v| u8::try_from(v).ok()),
        _ => None,
    }
}

#[async_trait]
impl DeviceHandler for GenericDevice {
    fn type_name(&self) -> &str {
        "generic"
    }

    fn address(&self) -> BusAddress {
        self.address
    }

    async fn start(&self) -> Result<(), TwigError> {
        for reg in &self.registers {
            let state_id = self.state_id(reg);

            if reg.write {
                let bus = self.bus.clone();
                let dispatcher = self.dispatcher.clone();
                let address = self.address;
                let reg = reg.clone();
                let id = state_id.clone();
                self.dispatcher.add_state_change_listener(
                    &state_id,
                    state_listener(move |_old, new| {
                        let bus = bus.clone();
                        let dispatcher = dispatcher.clone();
                        let reg = reg.clone();
                        let id = id.clone();
                        async move {
                            Self::write_register(
                                bus.as_ref(),
                                &dispatcher,
                                address,
                                &reg,
                                &id,
                                &new,
                            )
                            .await
                        }
                    }),
                );
            }

            if reg.read {
                Self::poll_once(
                    self.bus.as_ref(),
                    &self.dispatcher,
                    self.address,
                    reg.register,
                    &state_id,
                )
                .await;

                if let Some(interval_ms) = reg.polling_interval {
                    let bus = self.bus.clone();
                    let dispatcher = self.dispatcher.clone();
                    let address = self.address;
                    let register = reg.register;
                    debug!(%address, state_id, interval_ms, "Polling register");
                    let task = tokio::spawn(async move {
                        let mut ticker =
                            tokio::time::interval(Duration::from_millis(interval_ms.max(1)));
                        // First tick fires immediately; the start read above
                        // already covered it.
                        ticker.tick().await;
                        loop {
                            ticker.tick().await;
                            Self::poll_once(
                                bus.as_ref(),
                                &dispatcher,
                                address,
                                register,
                                &state_id,
                            )
                            .await;
                        }
                    });
                    self.poll_tasks.lock().push(task);
                }
            }
        }
        Ok(())
    }

    async fn stop(&self) -> Result<(), TwigError> {
        for task in self.poll_tasks.lock().drain(..) {
            task.abort();
        }
        Ok(())
    }
}

// =============================================================================
// Factory
// =============================================================================

/// Builds [`GenericDevice`] handlers; registered as `"generic"`.
#[derive(Default)]
pub struct GenericDeviceFactory;

impl HandlerFactory for GenericDeviceFactory {
    fn type_name(&self) -> &'static str {
        "generic"
    }

    fn create(
        &self,
        config: &DeviceConfig,
        ctx: HandlerContext,
    ) -> Result<Arc<dyn DeviceHandler>, ConfigError> {
        Ok(Arc::new(GenericDevice::new(config, ctx)?))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex as PlMutex;
    use twig_core::error::BusError;
    use twig_core::platform::MemoryStateStore;
    use twig_core::types::{DeviceIdInfo, ReadResult, ScanRange, StateRecord, WriteResult};

    /// Bus stub serving fixed register contents and recording writes.
    struct ScriptBus {
        reads: PlMutex<Vec<u8>>,
        writes: PlMutex<Vec<(Option<u8>, u8)>>,
    }

    impl ScriptBus {
        fn new(reads: Vec<u8>) -> Arc<Self> {
            Arc::new(Self {
                reads: PlMutex::new(reads),
                writes: PlMutex::new(Vec::new()),
            })
        }

        fn next_read(&self) -> Result<u8, BusError> {
            let mut reads = self.reads.lock();
            if reads.is_empty() {
                return Err(BusError::Closed);
            }
            Ok(reads.remove(0))
        }
    }

    #[async_trait]
    impl I2cBus for ScriptBus {
        async fn scan(&self, _: ScanRange) -> Result<Vec<BusAddress>, BusError> {
            Ok(Vec::new())
        }
        async fn device_id(&self, a: BusAddress) -> Result<DeviceIdInfo, BusError> {
            Err(BusError::read_failed(a, "script bus"))
        }
        async fn i2c_read(&self, _: BusAddress, n: usize) -> Result<ReadResult, BusError> {
            Ok(ReadResult::from_buffer(vec![0; n]))
        }
        async fn i2c_write(&self, _: BusAddress, b: Vec<u8>) -> Result<WriteResult, BusError> {
            Ok(WriteResult::from_buffer(b))
        }
        async fn read_byte(&self, _: BusAddress, _: u8) -> Result<u8, BusError> {
            self.next_read()
        }
        async fn read_word(&self, _: BusAddress, _: u8) -> Result<u16, BusError> {
            Ok(0)
        }
        async fn read_i2c_block(
            &self,
            _: BusAddress,
            _: u8,
            n: usize,
        ) -> Result<ReadResult, BusError> {
            Ok(ReadResult::from_buffer(vec![0; n]))
        }
        async fn write_i2c_block(
            &self,
            _: BusAddress,
            _: u8,
            b: Vec<u8>,
        ) -> Result<WriteResult, BusError> {
            Ok(WriteResult::from_buffer(b))
        }
        async fn receive_byte(&self, _: BusAddress) -> Result<u8, BusError> {
            self.next_read()
        }
        async fn send_byte(&self, _: BusAddress, byte: u8) -> Result<(), BusError> {
            self.writes.lock().push((None, byte));
            Ok(())
        }
        async fn write_byte(&self, _: BusAddress, command: u8, byte: u8) -> Result<(), BusError> {
            self.writes.lock().push((Some(command), byte));
            Ok(())
        }
        async fn write_word(&self, _: BusAddress, _: u8, _: u16) -> Result<(), BusError> {
            Ok(())
        }
        async fn write_quick(&self, _: BusAddress, _: u8, _: u8) -> Result<(), BusError> {
            Ok(())
        }
        async fn close(&self) -> Result<(), BusError> {
            Ok(())
        }
    }

    fn config(options: serde_json::Value) -> DeviceConfig {
        let serde_json::Value::Object(options) = options else {
            panic!("options must be an object");
        };
        DeviceConfig {
            name: Some("generic under test".to_string()),
            device_type: Some("generic".to_string()),
            address: BusAddress::new(0x48).unwrap(),
            options,
        }
    }

    fn context(bus: Arc<ScriptBus>) -> (HandlerContext, Arc<EventDispatcher>) {
        let dispatcher = EventDispatcher::new("twig.0", MemoryStateStore::new());
        (
            HandlerContext {
                bus,
                dispatcher: dispatcher.clone(),
            },
            dispatcher,
        )
    }

    #[tokio::test]
    async fn test_start_reads_and_publishes_each_readable_register() {
        let bus = ScriptBus::new(vec![0x2a]);
        let (ctx, dispatcher) = context(bus);
        let device = GenericDevice::new(
            &config(serde_json::json!({
                "registers": [{"name": "temp", "register": 0}]
            })),
            ctx,
        )
        .unwrap();

        device.start().await.unwrap();

        assert_eq!(
            dispatcher.get_state_value("0x48.temp"),
            Some(serde_json::json!(0x2a))
        );
        device.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_pending_state_change_writes_register() {
        let bus = ScriptBus::new(vec![0]);
        let (ctx, dispatcher) = context(bus.clone());
        let device = GenericDevice::new(
            &config(serde_json::json!({
                "registers": [{"name": "ctl", "register": 7, "write": true}]
            })),
            ctx,
        )
        .unwrap();
        device.start().await.unwrap();

        dispatcher
            .on_state_change("twig.0.0x48.ctl", Some(StateRecord::pending(0x55)))
            .await;

        assert_eq!(bus.writes.lock().as_slice(), &[(Some(7), 0x55)]);
        // The write was acknowledged back into the state tree.
        assert_eq!(
            dispatcher.get_state_value("0x48.ctl"),
            Some(serde_json::json!(0x55))
        );
        device.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_register_without_command_uses_plain_transfers() {
        let bus = ScriptBus::new(vec![0x11]);
        let (ctx, dispatcher) = context(bus.clone());
        let device = GenericDevice::new(
            &config(serde_json::json!({
                "registers": [{"name": "raw", "write": true}]
            })),
            ctx,
        )
        .unwrap();
        device.start().await.unwrap();

        dispatcher
            .on_state_change("twig.0.0x48.raw", Some(StateRecord::pending(3)))
            .await;

        assert_eq!(bus.writes.lock().as_slice(), &[(None, 3)]);
        device.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_non_byte_values_are_ignored() {
        let bus = ScriptBus::new(vec![0]);
        let (ctx, dispatcher) = context(bus.clone());
        let device = GenericDevice::new(
            &config(serde_json::json!({
                "registers": [{"name": "ctl", "register": 7, "read": false, "write": true}]
            })),
            ctx,
        )
        .unwrap();
        device.start().await.unwrap();

        for value in [
            serde_json::json!("fast"),
            serde_json::json!(300),
            serde_json::json!(-1),
        ] {
            dispatcher
                .on_state_change(
                    "twig.0.0x48.ctl",
                    Some(StateRecord { val: value, ack: false }),
                )
                .await;
        }

        assert!(bus.writes.lock().is_empty());
        device.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_bool_maps_to_zero_or_one() {
        let bus = ScriptBus::new(vec![]);
        let (ctx, dispatcher) = context(bus.clone());
        let device = GenericDevice::new(
            &config(serde_json::json!({
                "registers": [{"name": "en", "register": 1, "read": false, "write": true}]
            })),
            ctx,
        )
        .unwrap();
        device.start().await.unwrap();

        dispatcher
            .on_state_change("twig.0.0x48.en", Some(StateRecord::pending(true)))
            .await;
        dispatcher
            .on_state_change("twig.0.0x48.en", Some(StateRecord::pending(false)))
            .await;

        assert_eq!(bus.writes.lock().as_slice(), &[(Some(1), 1), (Some(1), 0)]);
        device.stop().await.unwrap();
    }

    #[test]
    fn test_register_must_be_readable_or_writable() {
        let bus = ScriptBus::new(vec![]);
        let (ctx, _) = context(bus);
        let result = GenericDevice::new(
            &config(serde_json::json!({
                "registers": [{"name": "dead", "read": false, "write": false}]
            })),
            ctx,
        );
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_unnamed_register_is_rejected() {
        let bus = ScriptBus::new(vec![]);
        let (ctx, _) = context(bus);
        let result = GenericDevice::new(
            &config(serde_json::json!({"registers": [{"name": ""}]})),
            ctx,
        );
        assert!(matches!(result, Err(ConfigError::MissingField { .. })));
    }
}
