//! Blueprint synthesis: a structured summary of the pull request.

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::ai::TextGenerator;
use crate::github::{CommitSummary, PullRequestMetadata};

use super::budget::PipelineBudget;
use super::cancel::CancellationFlag;
use super::error::{PipelineError, Stage};
use super::extract::ExtractedChanges;
use super::normalize::DiffHunk;
use super::prompts::{self, BlueprintPromptInput, PromptHunk};
use super::repair::{GenerationTrace, generate_structured};
use super::select::HunkSelection;
use super::structured::{SchemaViolation, StructuredOutput, parse_json, require_text};

const NO_DESCRIPTION: &str = "No description provided.";

/// The part of a blueprint written by the model.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BlueprintDraft {
    /// What was wrong or missing.
    pub problem: String,
    /// How the change addresses it.
    pub solution: String,
    /// Concrete changes, most important first.
    pub key_changes: Vec<String>,
    /// Consequences for users or maintainers; may be empty.
    #[serde(default)]
    pub impact: String,
}

/// Validates model output against the blueprint schema.
#[derive(Debug, Clone, Copy)]
pub struct BlueprintSchema {
    max_key_changes: usize,
}

impl BlueprintSchema {
    /// Creates a schema allowing up to `max_key_changes` key changes.
    #[must_use]
    pub const fn new(max_key_changes: usize) -> Self {
        Self { max_key_changes }
    }
}

impl StructuredOutput for BlueprintSchema {
    type Output = BlueprintDraft;

    fn stage(&self) -> Stage {
        Stage::Blueprint
    }

    fn schema_hint(&self) -> Value {
        json!({
            "problem": "string, required",
            "solution": "string, required",
            "key_changes": [format!("string, 1 to {} items", self.max_key_changes)],
            "impact": "string, may be empty",
        })
    }

    fn validate(&self, raw: &str) -> Result<BlueprintDraft, SchemaViolation> {
        let draft: BlueprintDraft = parse_json(raw)?;
        require_text("problem", &draft.problem)?;
        require_text("solution", &draft.solution)?;

        if draft.key_changes.is_empty() {
            return Err(SchemaViolation::constraint(
                "key_changes",
                "must contain at least one entry",
            ));
        }
        if draft.key_changes.len() > self.max_key_changes {
            return Err(SchemaViolation::constraint(
                "key_changes",
                format!(
                    "has {} entries, at most {} allowed",
                    draft.key_changes.len(),
                    self.max_key_changes
                ),
            ));
        }
        for (index, change) in draft.key_changes.iter().enumerate() {
            require_text(&format!("key_changes[{index}]"), change)?;
        }

        Ok(BlueprintDraft {
            problem: draft.problem.trim().to_owned(),
            solution: draft.solution.trim().to_owned(),
            key_changes: draft
                .key_changes
                .iter()
                .map(|change| change.trim().to_owned())
                .collect(),
            impact: draft.impact.trim().to_owned(),
        })
    }
}

/// Validated summary of a pull request, the input to slide planning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blueprint {
    pr_number: u64,
    pr_title: String,
    pr_description: String,
    pr_author: Option<String>,
    pr_url: Option<String>,
    commits: Vec<CommitSummary>,
    non_text_files: Vec<String>,
    source_hunks: Vec<DiffHunk>,
    problem: String,
    solution: String,
    key_changes: Vec<String>,
    impact: String,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|text| !text.is_empty())
}

fn title_or_fallback(metadata: &PullRequestMetadata) -> String {
    non_blank(metadata.title.as_deref()).map_or_else(
        || format!("Pull request #{}", metadata.number),
        ToOwned::to_owned,
    )
}

impl Blueprint {
    /// Combines a validated draft with the extracted pull request context.
    #[must_use]
    pub fn assemble(
        draft: BlueprintDraft,
        changes: ExtractedChanges,
        source_hunks: Vec<DiffHunk>,
    ) -> Self {
        let metadata = changes.metadata;
        let pr_title = title_or_fallback(&metadata);
        let pr_description = non_blank(metadata.description.as_deref())
            .unwrap_or(NO_DESCRIPTION)
            .to_owned();

        Self {
            pr_number: metadata.number,
            pr_title,
            pr_description,
            pr_author: metadata.author,
            pr_url: metadata.html_url,
            commits: changes.commits,
            non_text_files: changes.non_text_files,
            source_hunks,
            problem: draft.problem,
            solution: draft.solution,
            key_changes: draft.key_changes,
            impact: draft.impact,
        }
    }

    /// Pull request number.
    #[must_use]
    pub const fn pr_number(&self) -> u64 {
        self.pr_number
    }

    /// Pull request title, or `Pull request #<n>` when it was blank.
    #[must_use]
    pub fn pr_title(&self) -> &str {
        &self.pr_title
    }

    /// Pull request description, or a placeholder when it was blank.
    #[must_use]
    pub fn pr_description(&self) -> &str {
        &self.pr_description
    }

    /// Author login.
    #[must_use]
    pub fn pr_author(&self) -> Option<&str> {
        self.pr_author.as_deref()
    }

    /// Browser URL of the pull request.
    #[must_use]
    pub fn pr_url(&self) -> Option<&str> {
        self.pr_url.as_deref()
    }

    /// Commits in the summarised range, oldest first.
    #[must_use]
    pub fn commits(&self) -> &[CommitSummary] {
        &self.commits
    }

    /// Skipped non-text files, formatted `Status: path`.
    #[must_use]
    pub fn non_text_files(&self) -> &[String] {
        &self.non_text_files
    }

    /// Hunks the summary was generated from, in file order.
    #[must_use]
    pub fn source_hunks(&self) -> &[DiffHunk] {
        &self.source_hunks
    }

    /// What was wrong or missing.
    #[must_use]
    pub fn problem(&self) -> &str {
        &self.problem
    }

    /// How the change addresses the problem.
    #[must_use]
    pub fn solution(&self) -> &str {
        &self.solution
    }

    /// Concrete changes, most important first.
    #[must_use]
    pub fn key_changes(&self) -> &[String] {
        &self.key_changes
    }

    /// Consequences of the change; empty when none were given.
    #[must_use]
    pub fn impact(&self) -> &str {
        &self.impact
    }

    /// JSON rendering handed to the slide planner. Hunk text is omitted
    /// because the planner receives the hunks separately.
    #[must_use]
    pub fn to_prompt_json(&self) -> String {
        let commits: Vec<String> = self.commits.iter().map(commit_line).collect();
        let files: Vec<&str> = self
            .source_hunks
            .iter()
            .map(|hunk| hunk.file_path.as_str())
            .collect();
        let value = json!({
            "pr_number": self.pr_number,
            "pr_title": self.pr_title,
            "pr_description": self.pr_description,
            "pr_author": self.pr_author,
            "commits": commits,
            "changed_files": files,
            "non_text_files": self.non_text_files,
            "problem": self.problem,
            "solution": self.solution,
            "key_changes": self.key_changes,
            "impact": self.impact,
        });
        serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
    }
}

fn commit_line(commit: &CommitSummary) -> String {
    format!("{}: {}", commit.short_sha, commit.headline())
}

/// Generates and validates the blueprint for the selected hunks.
///
/// # Errors
///
/// Returns the repair loop's failure when no valid blueprint is produced
/// within the budget, or [`PipelineError::Prompt`] when the prompt cannot be
/// rendered.
pub async fn synthesize_blueprint<G>(
    generator: &G,
    changes: ExtractedChanges,
    selection: HunkSelection,
    budget: &PipelineBudget,
    cancel: &CancellationFlag,
) -> Result<(Blueprint, GenerationTrace), PipelineError>
where
    G: TextGenerator + ?Sized,
{
    let schema = BlueprintSchema::new(budget.max_key_changes);
    let request = {
        let title = title_or_fallback(&changes.metadata);
        let input = BlueprintPromptInput {
            number: changes.metadata.number,
            title: &title,
            description: non_blank(changes.metadata.description.as_deref())
                .unwrap_or(NO_DESCRIPTION),
            author: changes.metadata.author.as_deref(),
            commits: changes.commits.iter().map(commit_line).collect(),
            non_text_files: &changes.non_text_files,
            hunks: selection.hunks.iter().map(PromptHunk::from).collect(),
            omitted_hunks: selection.omitted,
        };
        prompts::blueprint_request(&input, &schema.schema_hint(), budget)?
    };

    let (draft, trace) = generate_structured(generator, &schema, &request, budget, cancel).await?;
    info!(
        stage = %Stage::Blueprint,
        attempts = trace.final_attempt_number(),
        key_changes = draft.key_changes.len(),
        "blueprint validated"
    );
    Ok((Blueprint::assemble(draft, changes, selection.hunks), trace))
}
