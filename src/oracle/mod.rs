//! Language-model boundary
//!
//! The model is treated as an opaque function from (instruction, utterance,
//! function definitions) to either one structured function call or a plain
//! message. [`IntentOracle`] is the seam: the HTTP client in [`openai`] is the
//! production implementation and tests substitute scripted oracles.

mod openai;
mod prompt;

pub use openai::OpenAiOracle;
pub use prompt::{build_request, SYSTEM_PROMPT};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// One constrained generation request
#[derive(Debug, Clone)]
pub struct OracleRequest {
    pub model: String,
    pub system_prompt: String,
    pub utterance: String,
    /// Callable-function definitions the reply is constrained to
    pub tools: Vec<Value>,
}

/// What the model answered
#[derive(Debug, Clone, PartialEq)]
pub enum OracleReply {
    /// The model chose a function and produced its arguments
    FunctionCall { name: String, arguments: Value },
    /// The model answered in text instead of calling a function
    Message(String),
}

#[derive(Error, Debug)]
pub enum OracleError {
    #[error("API key not configured: set {0}")]
    MissingApiKey(String),

    #[error("request to model provider failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("model provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed model response: {0}")]
    MalformedResponse(String),

    #[error("model response contained neither a function call nor a message")]
    EmptyReply,
}

/// A language model that maps an utterance onto the registered functions
#[async_trait]
pub trait IntentOracle: Send + Sync {
    /// Issue exactly one generation request; implementations must not retry
    async fn complete(&self, request: &OracleRequest) -> Result<OracleReply, OracleError>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}
