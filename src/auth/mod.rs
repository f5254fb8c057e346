//! API key management and request authentication.

pub mod authenticator;
pub mod keys;

pub use authenticator::{Authenticator, bearer_token, constant_time_eq};
pub use keys::{
    ApiKeyData, ApiKeyManager, ApiKeySummary, KeyStore, MemoryKeyStore, generate_api_key,
};
