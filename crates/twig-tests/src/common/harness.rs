// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Test harness: an RPC server bound to an ephemeral port.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use twig_core::bus::I2cBus;
use twig_core::error::TwigError;
use twig_rpc::{RemoteBus, RpcServer};

/// A running RPC server plus the handles to talk to and stop it.
pub struct RpcHarness {
    addr: SocketAddr,
    stop: oneshot::Sender<()>,
    task: JoinHandle<Result<(), TwigError>>,
}

impl RpcHarness {
    /// Binds an RPC server for the given bus on an ephemeral port.
    pub async fn start(bus: Arc<dyn I2cBus>) -> Self {
        let bound = RpcServer::new(bus)
            .bind(0)
            .await
            .expect("harness server must bind");
        let addr = bound.local_addr();
        let (stop, stopped) = oneshot::channel();
        let task = tokio::spawn(bound.serve(async move {
            let _ = stopped.await;
        }));
        Self { addr, stop, task }
    }

    /// The bound socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The server's base URL.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// A remote bus client pointed at this server.
    pub fn remote(&self) -> RemoteBus {
        RemoteBus::new(&self.addr.to_string())
    }

    /// Stops the server and waits for it to finish.
    pub async fn stop(self) {
        let _ = self.stop.send(());
        let _ = self.task.await;
    }
}
