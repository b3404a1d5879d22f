//! Text-generation capability consumed by the presentation pipeline.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Output constraints attached to one generation request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationConstraints {
    /// Upper bound on generated tokens, if the provider supports one.
    pub max_tokens: Option<u32>,
    /// JSON shape the response is expected to follow.
    pub schema_hint: Option<Value>,
}

/// A single structured-generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Instructions describing the assistant's role.
    pub system_prompt: String,
    /// The task content.
    pub prompt: String,
    /// Output constraints.
    pub constraints: GenerationConstraints,
}

impl GenerationRequest {
    /// Creates a request without constraints.
    #[must_use]
    pub fn new(system_prompt: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            prompt: prompt.into(),
            constraints: GenerationConstraints::default(),
        }
    }

    /// Sets the output constraints.
    #[must_use]
    pub fn with_constraints(mut self, constraints: GenerationConstraints) -> Self {
        self.constraints = constraints;
        self
    }
}

/// Failures reported by a text-generation provider.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    /// The provider did not answer in time.
    #[error("generation request timed out")]
    Timeout,

    /// The provider rejected the request because of rate limiting.
    #[error("generation provider rate limited the request: {message}")]
    RateLimited {
        /// Provider response detail.
        message: String,
    },

    /// The request never reached the provider or the connection failed.
    #[error("generation transport failed: {message}")]
    Transport {
        /// Transport error detail.
        message: String,
    },

    /// The provider returned an error response.
    #[error("generation provider error: {message}")]
    Api {
        /// Status and truncated body.
        message: String,
    },

    /// The provider answered without any assistant text.
    #[error("generation provider returned no text")]
    EmptyResponse,

    /// The client is misconfigured; retrying cannot help.
    #[error("generation is misconfigured: {message}")]
    Configuration {
        /// What is missing or invalid.
        message: String,
    },
}

/// Opaque text-completion capability.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Completes `request`, returning the raw assistant text.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError`] when the provider call fails; timeouts and
    /// rate limiting are reported as distinct variants.
    async fn complete(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}
