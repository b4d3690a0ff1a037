// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The RPC server.
//!
//! Listens on a configured TCP port with a bounded accept backlog and
//! answers HTTP POSTs on the fixed `/rpc` path. Any other path gets a
//! plain-text 404 naming the path; any dispatch error (malformed JSON,
//! unknown method, bus fault) gets a plain-text 500. A per-request error
//! never takes the process down.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use twig_core::bus::I2cBus;
use twig_core::error::{RpcError, TwigError};
use twig_core::types::{BusAddress, ScanRange};

use crate::protocol::{
    AddressArgs, BlockReadArgs, BlockWriteArgs, BlockWriteResponse, Method, RawReadArgs,
    RawWriteArgs, RegisterArgs, RpcRequest, ScanArgs, SendByteArgs, WriteByteArgs, WriteQuickArgs,
    WriteWordArgs,
};

/// Accept backlog for the listening socket.
const ACCEPT_BACKLOG: u32 = 100;

// =============================================================================
// RpcServer
// =============================================================================

/// The RPC server, parameterized over any bus variant.
pub struct RpcServer {
    bus: Arc<dyn I2cBus>,
}

impl RpcServer {
    /// Creates a server fronting the given bus.
    pub fn new(bus: Arc<dyn I2cBus>) -> Self {
        Self { bus }
    }

    /// Creates the router with the single `/rpc` route and the 404 fallback.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/rpc", post(handle_rpc))
            .fallback(handle_not_found)
            .layer(TraceLayer::new_for_http())
            .with_state(self.bus.clone())
    }

    /// Binds the listening socket.
    ///
    /// Port 0 asks the OS for an ephemeral port; the bound address is
    /// available on the returned server, which tests rely on.
    pub async fn bind(self, port: u16) -> Result<BoundRpcServer, TwigError> {
        let addr: SocketAddr = ([0, 0, 0, 0], port).into();
        fn bind_err(port: u16) -> impl Fn(std::io::Error) -> TwigError {
            move |source| TwigError::Rpc(RpcError::Bind { port, source })
        }

        let socket = tokio::net::TcpSocket::new_v4().map_err(bind_err(port))?;
        socket.set_reuseaddr(true).map_err(bind_err(port))?;
        socket.bind(addr).map_err(bind_err(port))?;
        let listener = socket.listen(ACCEPT_BACKLOG).map_err(bind_err(port))?;

        let local_addr = listener.local_addr().map_err(bind_err(port))?;
        info!("RPC Server: listening on port {}", local_addr.port());

        Ok(BoundRpcServer {
            router: self.router(),
            listener,
            local_addr,
        })
    }
}

/// A server with its socket bound, ready to serve.
pub struct BoundRpcServer {
    router: Router,
    listener: tokio::net::TcpListener,
    local_addr: SocketAddr,
}

impl BoundRpcServer {
    /// Returns the bound address.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serves until the shutdown future resolves.
    pub async fn serve(
        self,
        shutdown: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), TwigError> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| {
                TwigError::Rpc(RpcError::Bind {
                    port: self.local_addr.port(),
                    source: e,
                })
            })?;
        info!("RPC Server: shutdown complete");
        Ok(())
    }
}

// =============================================================================
// Handlers
// =============================================================================

async fn handle_rpc(State(bus): State<Arc<dyn I2cBus>>, body: String) -> Response {
    debug!(body = %body, "RPC Server: handling request");
    match RpcRequest::from_body(&body) {
        Ok((method, args)) => match dispatch(bus.as_ref(), method, &args).await {
            Ok(result) => {
                debug!(%method, "RPC Server: sending response");
                (
                    StatusCode::OK,
                    [(header::CONTENT_TYPE, "application/json")],
                    result.to_string(),
                )
                    .into_response()
            }
            Err(e) => server_error(e),
        },
        Err(e) => server_error(TwigError::Rpc(e)),
    }
}

async fn handle_not_found(uri: Uri) -> Response {
    let path = uri.path().to_string();
    (
        StatusCode::NOT_FOUND,
        format!("oops! {} not found here", path),
    )
        .into_response()
}

fn server_error(e: TwigError) -> Response {
    error!(error_type = e.error_type(), "RPC Server: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("oops! server error: {}", e),
    )
        .into_response()
}

// =============================================================================
// Dispatch
// =============================================================================

fn address(raw: u8) -> Result<BusAddress, TwigError> {
    BusAddress::new(raw).map_err(TwigError::Bus)
}

/// Dispatches one decoded request against the bus and encodes the result.
///
/// Buffers arriving in `args` were already hex-decoded by the argument
/// shapes; buffers in results are hex-encoded by their serde impls.
pub async fn dispatch(
    bus: &dyn I2cBus,
    method: Method,
    args: &serde_json::Value,
) -> Result<serde_json::Value, TwigError> {
    let value = match method {
        Method::Scan => {
            let args: ScanArgs = RpcRequest::parse_args(method, args)?;
            let range = scan_range(&args)?;
            let found = bus.scan(range).await?;
            serde_json::to_value(found)
        }
        Method::DeviceId => {
            let args: AddressArgs = RpcRequest::parse_args(method, args)?;
            let info = bus.device_id(address(args.address)?).await?;
            serde_json::to_value(info)
        }
        Method::I2cRead => {
            let args: RawReadArgs = RpcRequest::parse_args(method, args)?;
            let result = bus.i2c_read(address(args.address)?, args.length).await?;
            serde_json::to_value(result)
        }
        Method::I2cWrite => {
            let args: RawWriteArgs = RpcRequest::parse_args(method, args)?;
            let buffer = take_exact(method, args.buffer, args.length)?;
            let result = bus.i2c_write(address(args.address)?, buffer).await?;
            serde_json::to_value(result)
        }
        Method::ReadByte => {
            let args: RegisterArgs = RpcRequest::parse_args(method, args)?;
            let byte = bus.read_byte(address(args.address)?, args.command).await?;
            serde_json::to_value(byte)
        }
        Method::ReadWord => {
            let args: RegisterArgs = RpcRequest::parse_args(method, args)?;
            let word = bus.read_word(address(args.address)?, args.command).await?;
            serde_json::to_value(word)
        }
        Method::ReadI2cBlock => {
            let args: BlockReadArgs = RpcRequest::parse_args(method, args)?;
            let result = bus
                .read_i2c_block(address(args.address)?, args.command, args.length)
                .await?;
            serde_json::to_value(result)
        }
        Method::ReceiveByte => {
            let args: AddressArgs = RpcRequest::parse_args(method, args)?;
            let byte = bus.receive_byte(address(args.address)?).await?;
            serde_json::to_value(byte)
        }
        Method::SendByte => {
            let args: SendByteArgs = RpcRequest::parse_args(method, args)?;
            bus.send_byte(address(args.address)?, args.byte).await?;
            Ok(empty_object())
        }
        Method::WriteByte => {
            let args: WriteByteArgs = RpcRequest::parse_args(method, args)?;
            bus.write_byte(address(args.address)?, args.command, args.byte)
                .await?;
            Ok(empty_object())
        }
        Method::WriteWord => {
            let args: WriteWordArgs = RpcRequest::parse_args(method, args)?;
            bus.write_word(address(args.address)?, args.command, args.word)
                .await?;
            Ok(empty_object())
        }
        Method::WriteQuick => {
            let args: WriteQuickArgs = RpcRequest::parse_args(method, args)?;
            bus.write_quick(address(args.address)?, args.command, args.bit)
                .await?;
            Ok(empty_object())
        }
        Method::WriteI2cBlock => {
            let args: BlockWriteArgs = RpcRequest::parse_args(method, args)?;
            let buffer = take_exact(method, args.buffer, args.length)?;
            let result = bus
                .write_i2c_block(address(args.address)?, args.command, buffer)
                .await?;
            // Field naming is asymmetric with the request on purpose; see
            // BlockWriteResponse.
            serde_json::to_value(BlockWriteResponse {
                bytes_read: result.bytes_written,
                buffer: result.buffer,
            })
        }
    };
    value.map_err(|e| {
        TwigError::Rpc(RpcError::invalid_args(
            method.as_str(),
            format!("result serialization: {}", e),
        ))
    })
}

fn scan_range(args: &ScanArgs) -> Result<ScanRange, TwigError> {
    if let Some(addr) = args.address {
        return Ok(ScanRange::Single(address(addr)?));
    }
    if let Some(start) = args.start_addr {
        let end = args.end_addr.unwrap_or(BusAddress::MAX.raw());
        return Ok(ScanRange::Range {
            start: address(start)?,
            end: address(end)?,
        });
    }
    Ok(ScanRange::Full)
}

/// Trims a wire buffer to its declared length.
fn take_exact(method: Method, mut buffer: Vec<u8>, length: usize) -> Result<Vec<u8>, TwigError> {
    if length > buffer.len() {
        return Err(TwigError::Rpc(RpcError::invalid_args(
            method.as_str(),
            format!(
                "declared length {} exceeds buffer length {}",
                length,
                buffer.len()
            ),
        )));
    }
    buffer.truncate(length);
    Ok(buffer)
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(Default::default())
}

// =============================================================================
// Tests
// =============================================================================
