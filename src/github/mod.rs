//! GitHub pull request intake.
//!
//! This module wraps Octocrab to parse pull request URLs and commit ranges,
//! and to retrieve the metadata, commits and per-file diffs that feed the
//! presentation pipeline. Errors are mapped into variants that distinguish
//! missing resources, rejected credentials, rate limiting and transport
//! failures without exposing Octocrab internals.

pub mod error;
pub mod gateway;
pub mod locator;
pub mod models;

pub use error::IntakeError;
pub use gateway::{DiffSource, OctocrabGateway};
pub use locator::{
    CommitRange, CommitSha, PersonalAccessToken, PullRequestLocator, PullRequestNumber,
    RepositoryName, RepositoryOwner,
};
pub use models::{
    ChangeStatus, CommitSummary, PullRequestChangeSet, PullRequestMetadata, RawFileDiff,
};

#[cfg(test)]
pub use gateway::MockDiffSource;

#[cfg(test)]
mod tests;
