//! Completion capability and its provider implementations

pub mod gemini;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Error;
use crate::schema::Schema;

// Re-export for convenience
pub use gemini::GeminiClient;

/// Turns a prompt plus an expected output shape into structured JSON.
///
/// Implementations only report transport and decoding failures; the
/// orchestrator owns schema validation and retries.
#[async_trait]
pub trait Completion: Send + Sync
{   async fn complete(
      &self
    , prompt: &str
    , schema: &Schema
    , model_hint: Option<&str>
    ) -> Result<Value, Error>;
}
