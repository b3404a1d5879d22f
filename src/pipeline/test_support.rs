//! Deterministic collaborators and fixtures for integration tests.
//!
//! Compiled only with the `test-support` feature.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::ai::{GenerationError, GenerationRequest, TextGenerator};
use crate::github::{
    ChangeStatus, CommitRange, CommitSummary, DiffSource, IntakeError, PullRequestChangeSet,
    PullRequestLocator, PullRequestMetadata, RawFileDiff,
};

/// Text generator replaying a fixed script of responses.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    script: Mutex<VecDeque<Result<String, GenerationError>>>,
    fallback: Option<Result<String, GenerationError>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    /// Replays `responses` in order, then fails with
    /// [`GenerationError::EmptyResponse`].
    #[must_use]
    pub fn new(responses: impl IntoIterator<Item = Result<String, GenerationError>>) -> Self {
        Self {
            script: Mutex::new(responses.into_iter().collect()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answers every call with `response`.
    #[must_use]
    pub fn repeating(response: Result<String, GenerationError>) -> Self {
        Self {
            fallback: Some(response),
            ..Self::default()
        }
    }

    /// Number of calls made so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Requests received, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn complete(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        let next = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        next.or_else(|| self.fallback.clone())
            .unwrap_or(Err(GenerationError::EmptyResponse))
    }
}

/// Repository collaborator returning a fixed change set or error.
#[derive(Debug)]
pub struct StaticDiffSource {
    response: Result<PullRequestChangeSet, IntakeError>,
    calls: AtomicUsize,
}

impl StaticDiffSource {
    /// Always returns `change_set`.
    #[must_use]
    pub const fn new(change_set: PullRequestChangeSet) -> Self {
        Self {
            response: Ok(change_set),
            calls: AtomicUsize::new(0),
        }
    }

    /// Always fails with `error`.
    #[must_use]
    pub const fn failing(error: IntakeError) -> Self {
        Self {
            response: Err(error),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of fetches made so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DiffSource for StaticDiffSource {
    async fn fetch_change_set<'a>(
        &self,
        _locator: &PullRequestLocator,
        _range: Option<&'a CommitRange>,
    ) -> Result<PullRequestChangeSet, IntakeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response.clone()
    }
}

/// A modified text file whose patch replaces `old` with `new`.
#[must_use]
pub fn text_file(path: &str, old: &str, new: &str) -> RawFileDiff {
    RawFileDiff {
        path: path.to_owned(),
        previous_path: None,
        status: ChangeStatus::Modified,
        patch: Some(format!("@@ -1 +1 @@\n-{old}\n+{new}")),
        additions: 1,
        deletions: 1,
    }
}

/// An added binary file without a patch.
#[must_use]
pub fn binary_file(path: &str) -> RawFileDiff {
    RawFileDiff {
        path: path.to_owned(),
        previous_path: None,
        status: ChangeStatus::Added,
        patch: None,
        additions: 0,
        deletions: 0,
    }
}

/// A change set for pull request 42 with one commit and `files`.
#[must_use]
pub fn change_set(files: Vec<RawFileDiff>) -> PullRequestChangeSet {
    PullRequestChangeSet {
        metadata: PullRequestMetadata {
            number: 42,
            title: Some("Speed up lookups".to_owned()),
            description: Some("Adds a cache in front of the store.".to_owned()),
            author: Some("octocat".to_owned()),
            html_url: Some("https://github.com/octo/repo/pull/42".to_owned()),
        },
        commits: vec![CommitSummary {
            sha: "0123456789abcdef0123456789abcdef01234567".to_owned(),
            short_sha: "0123456".to_owned(),
            message: "Add lookup cache".to_owned(),
            author_name: Some("Octo Cat".to_owned()),
            date: None,
            url: None,
        }],
        files,
    }
}

/// Blueprint JSON with `key_changes` numbered entries.
#[must_use]
pub fn blueprint_json(key_changes: usize) -> String {
    let changes: Vec<String> = (1..=key_changes)
        .map(|index| format!("Key change {index}"))
        .collect();
    json!({
        "problem": "Lookups hit the store every time.",
        "solution": "Cache results in memory.",
        "key_changes": changes,
        "impact": "Faster responses.",
    })
    .to_string()
}

/// Slide plan JSON with a cover, `slides - 2` bullet slides and a closing
/// code slide quoting `code_line`.
#[must_use]
pub fn slide_plan_json(slides: usize, code_line: &str) -> String {
    let mut records: Vec<Value> = vec![json!({
        "title": "Speed up lookups",
        "layout": "cover",
        "subtitle": "Pull request #42",
    })];
    records.extend((1..slides.saturating_sub(1)).map(|index| {
        json!({
            "title": format!("Section {index}"),
            "layout": "default",
            "bullets": ["First point", "Second point"],
        })
    }));
    if slides > 1 {
        records.push(json!({
            "title": "The change",
            "layout": "code",
            "code_excerpt": { "language": "rust", "content": code_line },
            "speaker_notes": "Walk through the new line.",
        }));
    }
    json!({ "title": "Speed up lookups", "slides": records }).to_string()
}
