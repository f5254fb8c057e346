//! Line-delimited JSON request protocol.

pub mod handler;
pub mod server;
pub mod transport;
pub mod types;

pub use handler::Handler;
pub use server::{GatewayServer, GatewayServerBuilder};
pub use transport::{LineTransport, StdioTransport, Transport};
pub use types::*;
