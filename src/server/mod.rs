//! Gateway server: routing, shared state and request handling.

pub mod handler;
pub mod routes;
pub mod state;

pub use handler::GatewayHandler;
pub use routes::Route;
pub use state::{ServerState, ServerStateBuilder};
