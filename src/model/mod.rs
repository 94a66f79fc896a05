//! Model Call Service: prompt in, text out.
//!
//! The pipeline consumes models through the [`ModelCallService`] trait so
//! stage handlers and the scheduler never touch provider transports
//! directly. [`HttpModelClient`] is the concrete implementation.

mod client;
mod types;

pub use client::*;
pub use types::*;

use crate::error::ModelResult;

/// A language-model provider: prompt in, completion text out.
///
/// Fails with transport, non-2xx, quota or timeout errors; malformed
/// response *bodies* surface as `ModelError::InvalidResponse`, while
/// malformed completion *content* is the extractor fallback chain's
/// problem, not this trait's.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ModelCallService: Send + Sync {
    /// Execute a single model call.
    async fn call(&self, request: ModelRequest) -> ModelResult<ModelResponse>;
}
