//! Octocrab implementation of [`DiffSource`].

use async_trait::async_trait;
use http::Uri;
use octocrab::{Octocrab, Page};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::github::error::IntakeError;
use crate::github::locator::{CommitRange, PersonalAccessToken, PullRequestLocator};
use crate::github::models::{
    ApiCommit, ApiComparison, ApiFile, ApiPullRequest, CommitSummary, PullRequestChangeSet,
    PullRequestMetadata, RawFileDiff,
};

use super::DiffSource;
use super::error_mapping::map_octocrab_error;
use super::range::resolve_range;

/// Octocrab-backed diff source.
pub struct OctocrabGateway {
    client: Octocrab,
}

impl OctocrabGateway {
    /// Creates a new gateway from an Octocrab client.
    #[must_use]
    pub const fn new(client: Octocrab) -> Self {
        Self { client }
    }

    /// Builds an authenticated client rooted at the locator's API base.
    ///
    /// # Errors
    ///
    /// Returns `IntakeError::InvalidUrl` when the base URI cannot be parsed or
    /// `IntakeError::Api` when Octocrab fails to construct a client.
    pub fn for_token(
        token: &PersonalAccessToken,
        locator: &PullRequestLocator,
    ) -> Result<Self, IntakeError> {
        let base_uri = locator
            .api_base()
            .as_str()
            .parse::<Uri>()
            .map_err(|error| IntakeError::InvalidUrl(error.to_string()))?;

        let client = Octocrab::builder()
            .personal_token(token.value())
            .base_uri(base_uri)
            .map_err(|error| IntakeError::Api {
                message: format!("build client failed: {error}"),
            })?
            .build()
            .map_err(|error| map_octocrab_error("build client", &error))?;

        Ok(Self::new(client))
    }

    async fn get_one<T: DeserializeOwned + Send>(
        &self,
        operation: &str,
        path: String,
    ) -> Result<T, IntakeError> {
        self.client
            .get::<T, _, _>(path, None::<&()>)
            .await
            .map_err(|error| map_octocrab_error(operation, &error))
    }

    async fn get_all<T: DeserializeOwned + Send>(
        &self,
        operation: &str,
        path: String,
    ) -> Result<Vec<T>, IntakeError> {
        let page = self
            .client
            .get::<Page<T>, _, _>(path, None::<&()>)
            .await
            .map_err(|error| map_octocrab_error(operation, &error))?;

        self.client
            .all_pages(page)
            .await
            .map_err(|error| map_octocrab_error(operation, &error))
    }
}

#[async_trait]
impl DiffSource for OctocrabGateway {
    async fn fetch_change_set<'a>(
        &self,
        locator: &PullRequestLocator,
        range: Option<&'a CommitRange>,
    ) -> Result<PullRequestChangeSet, IntakeError> {
        let metadata: PullRequestMetadata = self
            .get_one::<ApiPullRequest>("pull request", locator.pull_request_path())
            .await?
            .into();

        let all_commits: Vec<ApiCommit> = self
            .get_all("pull request commits", locator.commits_path())
            .await?;

        let (commits, api_files): (Vec<ApiCommit>, Vec<ApiFile>) = match range {
            None => {
                let files = self
                    .get_all("pull request files", locator.files_path())
                    .await?;
                (all_commits, files)
            }
            Some(commit_range) => {
                let resolved = resolve_range(&all_commits, commit_range)?;
                debug!(
                    base = resolved.base,
                    head = resolved.head,
                    commits = resolved.commits.len(),
                    "comparing commit range"
                );
                let comparison: ApiComparison = self
                    .get_one(
                        "compare commits",
                        locator.compare_path(resolved.base, resolved.head),
                    )
                    .await?;
                (resolved.commits.to_vec(), comparison.files)
            }
        };

        Ok(PullRequestChangeSet {
            metadata,
            commits: commits.into_iter().map(CommitSummary::from).collect(),
            files: api_files.into_iter().map(RawFileDiff::from).collect(),
        })
    }
}
