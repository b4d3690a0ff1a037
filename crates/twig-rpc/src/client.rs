// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The remote bus client.
//!
//! [`RemoteBus`] satisfies the [`I2cBus`] trait by translating every
//! operation into one `{method, args}` POST to a peer gateway's `/rpc`
//! endpoint. There is no built-in retry: one request, one response, and
//! any non-2xx status or unparsable body surfaces as [`BusError::Remote`]
//! carrying the response body as detail. Retry policy belongs to the
//! device handler driving the bus.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use twig_core::bus::{BusResult, I2cBus};
use twig_core::error::BusError;
use twig_core::types::{BusAddress, DeviceIdInfo, ReadResult, ScanRange, WriteResult};

use crate::protocol::{
    AddressArgs, BlockReadArgs, BlockWriteArgs, BlockWriteResponse, Method, RawReadArgs,
    RawWriteArgs, RegisterArgs, RpcRequest, ScanArgs, SendByteArgs, WriteByteArgs, WriteQuickArgs,
    WriteWordArgs,
};

// =============================================================================
// RemoteBus
// =============================================================================

/// A bus variant delegating every primitive to a remote RPC server.
pub struct RemoteBus {
    client: reqwest::Client,
    endpoint: String,
}

impl RemoteBus {
    /// Creates a client for `http://<host>:<port>/rpc`.
    ///
    /// `address` is `host:port`, with or without the `http://` scheme.
    pub fn new(address: &str) -> Self {
        let base = address.trim_end_matches('/');
        let endpoint = if base.starts_with("http://") || base.starts_with("https://") {
            format!("{}/rpc", base)
        } else {
            format!("http://{}/rpc", base)
        };
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }

    /// Returns the endpoint URL this client posts to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn call<A: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        args: &A,
    ) -> BusResult<T> {
        let request = RpcRequest::new(method, args);
        debug!(%method, "RPC Client: sending request");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| BusError::remote(method.as_str(), e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BusError::remote(method.as_str(), e.to_string()))?;

        if !status.is_success() {
            return Err(BusError::remote(method.as_str(), body));
        }

        serde_json::from_str(&body).map_err(|_| BusError::remote(method.as_str(), body))
    }
}

#[async_trait]
impl I2cBus for RemoteBus {
    async fn scan(&self, range: ScanRange) -> BusResult<Vec<BusAddress>> {
        let args = match range {
            ScanRange::Full => ScanArgs::default(),
            ScanRange::Single(addr) => ScanArgs {
                address: Some(addr.raw()),
                ..Default::default()
            },
            ScanRange::Range { start, end } => ScanArgs {
                address: None,
                start_addr: Some(start.raw()),
                end_addr: Some(end.raw()),
            },
        };
        self.call(Method::Scan, &args).await
    }

    async fn device_id(&self, address: BusAddress) -> BusResult<DeviceIdInfo> {
        self.call(
            Method::DeviceId,
            &AddressArgs {
                address: address.raw(),
            },
        )
        .await
    }

    async fn i2c_read(&self, address: BusAddress, length: usize) -> BusResult<ReadResult> {
        self.call(
            Method::I2cRead,
            &RawReadArgs {
                address: address.raw(),
                length,
            },
        )
        .await
    }

    async fn i2c_write(&self, address: BusAddress, buffer: Vec<u8>) -> BusResult<WriteResult> {
        self.call(
            Method::I2cWrite,
            &RawWriteArgs {
                address: address.raw(),
                length: buffer.len(),
                buffer,
            },
        )
        .await
    }

    async fn read_byte(&self, address: BusAddress, command: u8) -> BusResult<u8> {
        self.call(
            Method::ReadByte,
            &RegisterArgs {
                address: address.raw(),
                command,
            },
        )
        .await
    }

    async fn read_word(&self, address: BusAddress, command: u8) -> BusResult<u16> {
        self.call(
            Method::ReadWord,
            &RegisterArgs {
                address: address.raw(),
                command,
            },
        )
        .await
    }

    async fn read_i2c_block(
        &self,
        address: BusAddress,
        command: u8,
        length: usize,
    ) -> BusResult<ReadResult> {
        self.call(
            Method::ReadI2cBlock,
            &BlockReadArgs {
                address: address.raw(),
                command,
                length,
            },
        )
        .await
    }

    async fn write_i2c_block(
        &self,
        address: BusAddress,
        command: u8,
        buffer: Vec<u8>,
    ) -> BusResult<WriteResult> {
        let response: BlockWriteResponse = self
            .call(
                Method::WriteI2cBlock,
                &BlockWriteArgs {
                    address: address.raw(),
                    command,
                    length: buffer.len(),
                    buffer,
                },
            )
            .await?;
        // The wire calls the written count `bytesRead`; undo that here so
        // callers see the symmetric shape.
        Ok(WriteResult {
            bytes_written: response.bytes_read,
            buffer: response.buffer,
        })
    }

    async fn receive_byte(&self, address: BusAddress) -> BusResult<u8> {
        self.call(
            Method::ReceiveByte,
            &AddressArgs {
                address: address.raw(),
            },
        )
        .await
    }

    async fn send_byte(&self, address: BusAddress, byte: u8) -> BusResult<()> {
        let _: serde_json::Value = self
            .call(
                Method::SendByte,
                &SendByteArgs {
                    address: address.raw(),
                    byte,
                },
            )
            .await?;
        Ok(())
    }

    async fn write_byte(&self, address: BusAddress, command: u8, byte: u8) -> BusResult<()> {
        let _: serde_json::Value = self
            .call(
                Method::WriteByte,
                &WriteByteArgs {
                    address: address.raw(),
                    command,
                    byte,
                },
            )
            .await?;
        Ok(())
    }

    async fn write_word(&self, address: BusAddress, command: u8, word: u16) -> BusResult<()> {
        let _: serde_json::Value = self
            .call(
                Method::WriteWord,
                &WriteWordArgs {
                    address: address.raw(),
                    command,
                    word,
                },
            )
            .await?;
        Ok(())
    }

    async fn write_quick(&self, address: BusAddress, command: u8, bit: u8) -> BusResult<()> {
        let _: serde_json::Value = self
            .call(
                Method::WriteQuick,
                &WriteQuickArgs {
                    address: address.raw(),
                    command,
                    bit,
                },
            )
            .await?;
        Ok(())
    }

    /// Closing the remote handle releases nothing on the peer; its bus
    /// stays open for other clients.
    async fn close(&self) -> BusResult<()> {
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
