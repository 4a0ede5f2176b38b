//! Core types for the chat gateway
//!
//! - `GatewayError` - Error taxonomy rendered to HTTP clients
//! - `ProviderError` - Failure of the external model call
//! - `env` - Environment variable parsing for `from_env` constructors

pub mod env;
pub mod error;

pub use error::{GatewayError, GatewayResult, ProviderError};
