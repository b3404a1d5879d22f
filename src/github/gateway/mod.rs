//! Gateways for loading pull request diffs through Octocrab.
//!
//! The [`DiffSource`] trait is the pipeline's only view of the repository
//! collaborator, so extraction can be exercised against scripted sources while
//! [`OctocrabGateway`] performs the real HTTP requests.

mod error_mapping;
mod octocrab_source;
mod range;

pub use octocrab_source::OctocrabGateway;

use async_trait::async_trait;

use crate::github::error::IntakeError;
use crate::github::locator::{CommitRange, PullRequestLocator};
use crate::github::models::PullRequestChangeSet;

/// Source of pull request metadata, commits and per-file diffs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DiffSource: Send + Sync {
    /// Fetches metadata, commits and file diffs for the pull request.
    ///
    /// When `range` is present only its commits are returned and the files
    /// reflect the combined diff from the parent of its first commit to its
    /// last commit.
    async fn fetch_change_set<'a>(
        &self,
        locator: &PullRequestLocator,
        range: Option<&'a CommitRange>,
    ) -> Result<PullRequestChangeSet, IntakeError>;
}
