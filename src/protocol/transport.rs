//! Line-delimited JSON transport.

use crate::error::{GatewayError, ProtocolError, Result};
use crate::protocol::types::{GatewayRequest, GatewayResponse};
use serde_json::Value;
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout,
};
use tokio::sync::Mutex;
use tracing::{debug, error, trace};

/// Transport trait for gateway communication.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Next request, or `None` at end of input.
    async fn read_request(&self) -> Result<Option<GatewayRequest>>;
    async fn write_response(&self, response: &GatewayResponse) -> Result<()>;
}

/// One JSON object per line over any async reader/writer pair.
pub struct LineTransport<R, W> {
    reader: Mutex<BufReader<R>>,
    writer: Mutex<W>,
}

/// Requests on stdin, responses on stdout.
pub type StdioTransport = LineTransport<Stdin, Stdout>;

impl StdioTransport {
    pub fn stdio() -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout())
    }
}

impl<R, W> LineTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: Mutex::new(BufReader::new(reader)),
            writer: Mutex::new(writer),
        }
    }

    pub fn into_parts(self) -> (R, W) {
        (
            self.reader.into_inner().into_inner(),
            self.writer.into_inner(),
        )
    }

    /// Read the next non-blank line.
    async fn read_line(&self) -> Result<Option<String>> {
        let mut reader = self.reader.lock().await;
        loop {
            let mut line = String::new();
            match reader.read_line(&mut line).await {
                Ok(0) => return Ok(None), // EOF
                Ok(_) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    trace!("Received line: {}", line);
                    return Ok(Some(line.to_string()));
                }
                Err(e) => {
                    error!("Error reading request stream: {}", e);
                    return Err(GatewayError::Io(e));
                }
            }
        }
    }

    async fn write_line(&self, content: &str) -> Result<()> {
        let mut writer = self.writer.lock().await;
        trace!("Sending line: {}", content);
        writer.write_all(content.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl<R, W> Transport for LineTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn read_request(&self) -> Result<Option<GatewayRequest>> {
        let Some(line) = self.read_line().await? else {
            return Ok(None);
        };

        let value: Value = serde_json::from_str(&line).map_err(|e| {
            error!("Failed to parse request line: {}", e);
            ProtocolError::ParseError
        })?;

        let request: GatewayRequest = serde_json::from_value(value)
            .map_err(|e| ProtocolError::InvalidRequest(e.to_string().into()))?;
        debug!("Received request: {} {}", request.method, request.path);
        Ok(Some(request))
    }

    async fn write_response(&self, response: &GatewayResponse) -> Result<()> {
        let json = serde_json::to_string(response)?;
        debug!("Sending response: id={:?} status={}", response.id, response.status);
        self.write_line(&json).await
    }
}
