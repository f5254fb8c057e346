//! Request loop with lifecycle management.

use crate::error::{GatewayError, Result};
use crate::protocol::handler::Handler;
use crate::protocol::transport::{StdioTransport, Transport};
use crate::protocol::types::{GatewayResponse, RequestId};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, error, info, instrument};

/// Gateway server: reads requests, dispatches them, writes responses.
pub struct GatewayServer<H: Handler> {
    name: String,
    version: String,
    handler: Arc<H>,
    running: AtomicBool,
    handled: AtomicU64,
}

impl<H: Handler> GatewayServer<H> {
    pub fn new(handler: H, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            handler: Arc::new(handler),
            running: AtomicBool::new(false),
            handled: AtomicU64::new(0),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Requests answered so far.
    pub fn handled(&self) -> u64 {
        self.handled.load(Ordering::SeqCst)
    }

    /// Run the server on stdin/stdout.
    #[instrument(skip(self), fields(server = %self.name))]
    pub async fn run(&self) -> Result<()> {
        let transport = Arc::new(StdioTransport::stdio());
        self.run_with_transport(transport).await
    }

    /// Run the server with a custom transport until end of input.
    pub async fn run_with_transport<T: Transport + 'static>(&self, transport: Arc<T>) -> Result<()> {
        info!("Starting gateway server: {} v{}", self.name, self.version);
        self.running.store(true, Ordering::SeqCst);

        loop {
            if !self.running.load(Ordering::SeqCst) {
                info!("Server stopping...");
                break;
            }

            let request = match transport.read_request().await {
                Ok(Some(request)) => request,
                Ok(None) => {
                    debug!("EOF received, shutting down");
                    break;
                }
                Err(e @ GatewayError::Protocol(_)) => {
                    let response = GatewayResponse::error(RequestId::Null, &e);
                    if let Err(e) = transport.write_response(&response).await {
                        error!("Failed to send error response: {}", e);
                    }
                    continue;
                }
                Err(e) => {
                    error!("Transport error: {}", e);
                    break;
                }
            };

            let response = self.handler.handle(request).await;
            self.handled.fetch_add(1, Ordering::SeqCst);

            if let Err(e) = transport.write_response(&response).await {
                error!("Failed to send response: {}", e);
                break;
            }
        }

        self.running.store(false, Ordering::SeqCst);
        info!("Server stopped after {} requests", self.handled());
        Ok(())
    }

    /// Stop after the request in flight.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Builder for GatewayServer.
pub struct GatewayServerBuilder<H: Handler> {
    handler: Option<H>,
    name: String,
    version: String,
}

impl<H: Handler> GatewayServerBuilder<H> {
    pub fn new() -> Self {
        Self {
            handler: None,
            name: env!("CARGO_PKG_NAME").into(),
            version: env!("CARGO_PKG_VERSION").into(),
        }
    }

    pub fn handler(mut self, handler: H) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn build(self) -> Result<GatewayServer<H>> {
        let handler = self
            .handler
            .ok_or_else(|| GatewayError::internal("Handler is required"))?;
        Ok(GatewayServer::new(handler, self.name, self.version))
    }
}

impl<H: Handler> Default for GatewayServerBuilder<H> {
    fn default() -> Self {
        Self::new()
    }
}
