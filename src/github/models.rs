//! Data models representing pull request metadata, commits and file diffs.
//!
//! Types prefixed with `Api` are internal deserialisation targets that convert
//! into the public domain types consumed by the extraction stage.

use chrono::{DateTime, Utc};
use serde::Deserialize;

const SHORT_SHA_LEN: usize = 7;

/// Pull request metadata used to frame the presentation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullRequestMetadata {
    /// Pull request number.
    pub number: u64,
    /// Title of the pull request.
    pub title: Option<String>,
    /// Pull request body as written by the author.
    pub description: Option<String>,
    /// Author login if present.
    pub author: Option<String>,
    /// HTML URL for displaying to a user.
    pub html_url: Option<String>,
}

/// One commit belonging to the pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitSummary {
    /// Full commit SHA.
    pub sha: String,
    /// First seven characters of the SHA.
    pub short_sha: String,
    /// Full commit message.
    pub message: String,
    /// Git author name, when recorded.
    pub author_name: Option<String>,
    /// Author timestamp, when recorded.
    pub date: Option<DateTime<Utc>>,
    /// Browser URL for the commit.
    pub url: Option<String>,
}

impl CommitSummary {
    /// First line of the commit message.
    #[must_use]
    pub fn headline(&self) -> &str {
        self.message.lines().next().unwrap_or_default().trim()
    }
}

/// File status as reported by GitHub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeStatus {
    /// File added in the range.
    Added,
    /// File contents modified.
    Modified,
    /// File deleted.
    Removed,
    /// File moved, possibly with edits.
    Renamed,
    /// File copied from another path.
    Copied,
    /// Listed without changes.
    Unchanged,
    /// Mode or other metadata changed, and any status GitHub adds later.
    #[serde(other)]
    Changed,
}

impl ChangeStatus {
    /// Capitalised label used when reporting skipped files.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Added => "Added",
            Self::Modified => "Modified",
            Self::Removed => "Removed",
            Self::Renamed => "Renamed",
            Self::Copied => "Copied",
            Self::Changed => "Changed",
            Self::Unchanged => "Unchanged",
        }
    }
}

/// Unprocessed per-file diff as returned by GitHub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFileDiff {
    /// Path of the file after the change.
    pub path: String,
    /// Path before a rename or copy.
    pub previous_path: Option<String>,
    /// Change status.
    pub status: ChangeStatus,
    /// Unified diff patch. GitHub omits it for binary and very large files.
    pub patch: Option<String>,
    /// Added line count.
    pub additions: u64,
    /// Deleted line count.
    pub deletions: u64,
}

/// Everything the extractor needs from the repository collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestChangeSet {
    /// Pull request metadata.
    pub metadata: PullRequestMetadata,
    /// Commits in the requested range, oldest first.
    pub commits: Vec<CommitSummary>,
    /// File diffs spanning the requested range.
    pub files: Vec<RawFileDiff>,
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct ApiPullRequest {
    pub(super) number: u64,
    pub(super) title: Option<String>,
    pub(super) body: Option<String>,
    pub(super) html_url: Option<String>,
    pub(super) user: Option<ApiUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct ApiUser {
    pub(super) login: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct ApiCommit {
    pub(super) sha: String,
    pub(super) html_url: Option<String>,
    pub(super) commit: ApiCommitDetail,
    #[serde(default)]
    pub(super) parents: Vec<ApiCommitParent>,
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct ApiCommitDetail {
    #[serde(default)]
    pub(super) message: String,
    pub(super) author: Option<ApiCommitAuthor>,
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct ApiCommitAuthor {
    pub(super) name: Option<String>,
    pub(super) date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct ApiCommitParent {
    pub(super) sha: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct ApiFile {
    pub(super) filename: String,
    pub(super) previous_filename: Option<String>,
    pub(super) status: ChangeStatus,
    pub(super) patch: Option<String>,
    #[serde(default)]
    pub(super) additions: u64,
    #[serde(default)]
    pub(super) deletions: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct ApiComparison {
    #[serde(default)]
    pub(super) files: Vec<ApiFile>,
}

impl From<ApiPullRequest> for PullRequestMetadata {
    fn from(value: ApiPullRequest) -> Self {
        Self {
            number: value.number,
            title: value.title,
            description: value.body,
            author: value.user.and_then(|user| user.login),
            html_url: value.html_url,
        }
    }
}

impl From<ApiCommit> for CommitSummary {
    fn from(value: ApiCommit) -> Self {
        let short_sha = value.sha.chars().take(SHORT_SHA_LEN).collect();
        let (author_name, date) = value
            .commit
            .author
            .map_or((None, None), |author| (author.name, author.date));
        Self {
            sha: value.sha,
            short_sha,
            message: value.commit.message,
            author_name,
            date,
            url: value.html_url,
        }
    }
}

impl From<ApiFile> for RawFileDiff {
    fn from(value: ApiFile) -> Self {
        Self {
            path: value.filename,
            previous_path: value.previous_filename,
            status: value.status,
            patch: value.patch,
            additions: value.additions,
            deletions: value.deletions,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::{ApiCommit, ApiFile, ChangeStatus, CommitSummary, RawFileDiff};

    #[rstest]
    fn api_commit_converts_into_commit_summary() {
        let value = json!({
            "sha": "0123456789abcdef0123456789abcdef01234567",
            "html_url": "https://github.com/octo/repo/commit/0123456",
            "commit": {
                "message": "Add parser\n\nLonger body",
                "author": { "name": "Octo Cat", "date": "2025-01-01T00:00:00Z" }
            },
            "parents": [{ "sha": "fedcba9876543210fedcba9876543210fedcba98" }]
        });

        let api: ApiCommit = serde_json::from_value(value).expect("ApiCommit should deserialise");
        assert_eq!(api.parents.len(), 1);

        let summary = CommitSummary::from(api);
        assert_eq!(summary.short_sha, "0123456");
        assert_eq!(summary.headline(), "Add parser");
        assert_eq!(summary.author_name.as_deref(), Some("Octo Cat"));
        assert!(summary.date.is_some(), "date should parse");
    }

    #[rstest]
    #[case::added("added", ChangeStatus::Added)]
    #[case::removed("removed", ChangeStatus::Removed)]
    #[case::renamed("renamed", ChangeStatus::Renamed)]
    #[case::unchanged("unchanged", ChangeStatus::Unchanged)]
    #[case::changed("changed", ChangeStatus::Changed)]
    #[case::unknown_status_maps_to_changed("typechange", ChangeStatus::Changed)]
    fn api_file_status_deserialises(#[case] status: &str, #[case] expected: ChangeStatus) {
        let value = json!({
            "filename": "src/lib.rs",
            "status": status,
            "additions": 3,
            "deletions": 1,
            "patch": "@@ -1 +1 @@\n-a\n+b"
        });

        let file: RawFileDiff = serde_json::from_value::<ApiFile>(value)
            .expect("ApiFile should deserialise")
            .into();
        assert_eq!(file.status, expected);
        assert_eq!(file.additions, 3);
    }

    #[rstest]
    fn api_file_without_patch_keeps_patch_absent() {
        let value = json!({ "filename": "logo.png", "status": "added" });

        let file: ApiFile = serde_json::from_value(value).expect("ApiFile should deserialise");
        assert!(file.patch.is_none());
        assert_eq!(file.additions, 0);
    }
}
