//! Request handler trait.

use crate::protocol::types::{GatewayRequest, GatewayResponse};
use async_trait::async_trait;

/// Handler trait for processing gateway requests.
///
/// Every request produces exactly one response; failures are reported in the
/// response envelope, never as an `Err`.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, request: GatewayRequest) -> GatewayResponse;
}
