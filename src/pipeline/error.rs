//! Error taxonomy surfaced by the presentation pipeline.

use std::fmt;

use thiserror::Error;

use crate::github::IntakeError;

/// Pipeline stage, reported with every failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Fetching and filtering file diffs.
    Extraction,
    /// Cleaning and bounding hunk text.
    Normalization,
    /// Synthesising and validating the blueprint.
    Blueprint,
    /// Planning and validating slides.
    SlidePlan,
    /// Rendering slides to markdown.
    Rendering,
}

impl Stage {
    /// Stable lowercase name used in logs and messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Extraction => "extraction",
            Self::Normalization => "normalization",
            Self::Blueprint => "blueprint",
            Self::SlidePlan => "slide-plan",
            Self::Rendering => "rendering",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.name())
    }
}

/// Category of a repository collaborator failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFailureKind {
    /// The repository, pull request or commit does not exist.
    NotFound,
    /// Credentials were missing, rejected or lacked permission.
    PermissionDenied,
    /// A transient transport failure.
    Network,
    /// The API quota was exhausted.
    RateLimited,
    /// The commit range does not resolve against the pull request.
    InvalidRange,
    /// Any other API failure.
    Other,
}

impl fmt::Display for SourceFailureKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NotFound => "not found",
            Self::PermissionDenied => "permission denied",
            Self::Network => "network",
            Self::RateLimited => "rate limited",
            Self::InvalidRange => "invalid range",
            Self::Other => "other",
        };
        formatter.write_str(label)
    }
}

/// The single failure type returned by [`crate::generate_presentation`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PipelineError {
    /// The pull request identifier or commit range is malformed.
    #[error("invalid request: {message}")]
    InvalidRequest {
        /// What was wrong with the input.
        message: String,
    },

    /// The repository collaborator could not produce the requested diffs.
    #[error("source unavailable ({kind}): {message}")]
    SourceUnavailable {
        /// Failure category.
        kind: SourceFailureKind,
        /// Collaborator error detail.
        message: String,
    },

    /// Filtering removed every file, leaving nothing to summarise.
    #[error("no text changes to summarise ({} non-text files skipped)", .skipped_files.len())]
    EmptyDiffSet {
        /// Files that were skipped as binary, formatted `Status: path`.
        skipped_files: Vec<String>,
    },

    /// Every generation attempt timed out.
    #[error("{stage} generation timed out after {attempts} attempts")]
    GenerationTimeout {
        /// Stage that was generating.
        stage: Stage,
        /// Calls made before giving up.
        attempts: u32,
    },

    /// The generation provider kept rate limiting the requests.
    #[error("{stage} generation was rate limited after {attempts} attempts: {message}")]
    GenerationRateLimited {
        /// Stage that was generating.
        stage: Stage,
        /// Calls made before giving up.
        attempts: u32,
        /// Provider detail from the last attempt.
        message: String,
    },

    /// The generation provider failed for a reason other than timeouts or
    /// rate limiting.
    #[error("{stage} generation failed after {attempts} attempts: {message}")]
    GenerationUnavailable {
        /// Stage that was generating.
        stage: Stage,
        /// Calls made before giving up.
        attempts: u32,
        /// Provider detail from the last attempt.
        message: String,
    },

    /// Generated output never matched the schema within the repair budget.
    #[error("{stage} output failed validation after {attempts} attempts: {error}")]
    SchemaValidationFailed {
        /// Stage whose output was invalid.
        stage: Stage,
        /// Calls made before giving up.
        attempts: u32,
        /// Truncated raw text from the last attempt.
        last_raw_output: String,
        /// Validation error for the last attempt.
        error: String,
    },

    /// A validated slide plan broke a rendering invariant.
    #[error("render invariant violated at slide {slide_index}: {message}")]
    RenderInvariantViolation {
        /// Zero-based slide position.
        slide_index: usize,
        /// Which invariant failed.
        message: String,
    },

    /// The caller cancelled the run.
    #[error("cancelled before {stage}")]
    Cancelled {
        /// Stage that would have run next.
        stage: Stage,
    },

    /// Budget or client configuration is unusable.
    #[error("configuration error: {message}")]
    Configuration {
        /// What is wrong.
        message: String,
    },

    /// A prompt template failed to render.
    #[error("prompt rendering failed: {message}")]
    Prompt {
        /// Template engine detail.
        message: String,
    },
}

impl PipelineError {
    /// Stage the failure belongs to, where one applies.
    #[must_use]
    pub const fn stage(&self) -> Option<Stage> {
        match self {
            Self::SourceUnavailable { .. } | Self::EmptyDiffSet { .. } => Some(Stage::Extraction),
            Self::GenerationTimeout { stage, .. }
            | Self::GenerationRateLimited { stage, .. }
            | Self::GenerationUnavailable { stage, .. }
            | Self::SchemaValidationFailed { stage, .. }
            | Self::Cancelled { stage } => Some(*stage),
            Self::RenderInvariantViolation { .. } => Some(Stage::Rendering),
            Self::InvalidRequest { .. } | Self::Configuration { .. } | Self::Prompt { .. } => None,
        }
    }
}

impl From<IntakeError> for PipelineError {
    fn from(error: IntakeError) -> Self {
        let message = error.to_string();
        let kind = match error {
            IntakeError::MissingPullRequestUrl
            | IntakeError::InvalidUrl(_)
            | IntakeError::MissingPathSegments
            | IntakeError::InvalidPullRequestNumber => return Self::InvalidRequest { message },
            IntakeError::Configuration { .. } => return Self::Configuration { message },
            IntakeError::InvalidCommitRange { .. } => SourceFailureKind::InvalidRange,
            IntakeError::NotFound { .. } => SourceFailureKind::NotFound,
            IntakeError::MissingToken | IntakeError::Authentication { .. } => {
                SourceFailureKind::PermissionDenied
            }
            IntakeError::Network { .. } => SourceFailureKind::Network,
            IntakeError::RateLimitExceeded { .. } => SourceFailureKind::RateLimited,
            IntakeError::Api { .. } => SourceFailureKind::Other,
        };
        Self::SourceUnavailable { kind, message }
    }
}
