//! The presentation pipeline: extraction, normalisation, blueprint synthesis,
//! slide planning and rendering.
//!
//! Stages run strictly in sequence. Each either returns a fully validated
//! value or a [`PipelineError`]; the two generation stages share the bounded
//! repair loop in [`repair`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::ai::TextGenerator;
use crate::github::{CommitRange, DiffSource, PullRequestLocator};

pub mod blueprint;
pub mod budget;
pub mod cancel;
pub mod error;
pub mod extract;
pub mod normalize;
pub mod prompts;
pub mod render;
pub mod repair;
pub mod sanitize;
pub mod select;
pub mod slides;
pub mod structured;

#[cfg(feature = "test-support")]
#[doc(hidden)]
pub mod test_support;

pub use blueprint::Blueprint;
pub use budget::PipelineBudget;
pub use cancel::CancellationFlag;
pub use error::{PipelineError, SourceFailureKind, Stage};
pub use normalize::{ChangeKind, DiffHunk};
pub use repair::{AttemptOutcome, GenerationAttempt, GenerationTrace, RepairLoop, RepairState};
pub use select::{HunkRanker, LargestChangeFirst};
pub use slides::{CodeExcerpt, SlideLayout, SlidePlan, SlideRecord};

/// A parsed pull request and optional commit range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentationRequest {
    locator: PullRequestLocator,
    range: Option<CommitRange>,
}

impl PresentationRequest {
    /// Parses a pull request URL and an optional `START..END` commit range.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidRequest`] when either input is
    /// malformed.
    pub fn parse(pr_url: &str, commit_range: Option<&str>) -> Result<Self, PipelineError> {
        let locator = PullRequestLocator::parse(pr_url)?;
        let range = commit_range
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(CommitRange::parse)
            .transpose()
            .map_err(|error| PipelineError::InvalidRequest {
                message: error.to_string(),
            })?;
        Ok(Self { locator, range })
    }

    /// Creates a request from already parsed parts.
    #[must_use]
    pub const fn new(locator: PullRequestLocator, range: Option<CommitRange>) -> Self {
        Self { locator, range }
    }

    /// Pull request to present.
    #[must_use]
    pub const fn locator(&self) -> &PullRequestLocator {
        &self.locator
    }

    /// Commit range to limit the diff to.
    #[must_use]
    pub const fn range(&self) -> Option<&CommitRange> {
        self.range.as_ref()
    }
}

/// Result of a successful pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presentation {
    /// Rendered Slidev markdown.
    pub markdown: String,
    /// Validated blueprint the slides were planned from.
    pub blueprint: Blueprint,
    /// Validated slide plan that was rendered.
    pub slide_plan: SlidePlan,
    /// Attempts made while generating the blueprint.
    pub blueprint_trace: GenerationTrace,
    /// Attempts made while generating the slide plan.
    pub plan_trace: GenerationTrace,
    /// When rendering finished.
    pub generated_at: DateTime<Utc>,
}

impl Presentation {
    /// Attempt number that produced the final slide plan.
    #[must_use]
    pub fn final_attempt_number(&self) -> u32 {
        self.plan_trace.final_attempt_number()
    }
}

async fn run_stages<S, G>(
    source: &S,
    generator: &G,
    ranker: &dyn HunkRanker,
    request: &PresentationRequest,
    budget: &PipelineBudget,
    cancel: &CancellationFlag,
) -> Result<Presentation, PipelineError>
where
    S: DiffSource + ?Sized,
    G: TextGenerator + ?Sized,
{
    budget.validate()?;

    cancel.check(Stage::Extraction)?;
    let mut changes = extract::extract_changes(source, request.locator(), request.range()).await?;

    cancel.check(Stage::Normalization)?;
    let text_files = std::mem::take(&mut changes.text_files);
    let hunks = normalize::normalize_diffs(&text_files, budget.hunk_char_ceiling);
    if hunks.is_empty() {
        return Err(PipelineError::EmptyDiffSet {
            skipped_files: changes.non_text_files,
        });
    }
    let selection = select::select_hunks(hunks, ranker, budget.prompt_char_budget);
    info!(
        stage = %Stage::Normalization,
        hunks = selection.hunks.len(),
        omitted = selection.omitted,
        "selected hunks for the prompt"
    );

    cancel.check(Stage::Blueprint)?;
    let (blueprint, blueprint_trace) =
        blueprint::synthesize_blueprint(generator, changes, selection, budget, cancel).await?;

    cancel.check(Stage::SlidePlan)?;
    let (slide_plan, plan_trace) = slides::plan_slides(generator, &blueprint, budget, cancel).await?;

    cancel.check(Stage::Rendering)?;
    let markdown = render::render_plan(&slide_plan, blueprint.pr_title())?;
    info!(
        stage = %Stage::Rendering,
        slides = slide_plan.slides().len(),
        bytes = markdown.len(),
        "rendered presentation"
    );

    Ok(Presentation {
        markdown,
        blueprint,
        slide_plan,
        blueprint_trace,
        plan_trace,
        generated_at: Utc::now(),
    })
}

/// Turns a pull request into Slidev markdown.
///
/// Hunks are ranked with [`LargestChangeFirst`]; use
/// [`PresentationPipeline`] to plug in another ranker.
///
/// # Errors
///
/// Returns the first stage failure; see [`PipelineError`].
pub async fn generate_presentation<S, G>(
    source: &S,
    generator: &G,
    request: &PresentationRequest,
    budget: &PipelineBudget,
    cancel: &CancellationFlag,
) -> Result<Presentation, PipelineError>
where
    S: DiffSource + ?Sized,
    G: TextGenerator + ?Sized,
{
    run_stages(source, generator, &LargestChangeFirst, request, budget, cancel).await
}

/// Collaborators, limits and ranking policy bundled for repeated runs.
pub struct PresentationPipeline {
    source: Arc<dyn DiffSource>,
    generator: Arc<dyn TextGenerator>,
    budget: PipelineBudget,
    ranker: Box<dyn HunkRanker>,
}

impl PresentationPipeline {
    /// Creates a pipeline with the default budget and ranker.
    #[must_use]
    pub fn new(source: Arc<dyn DiffSource>, generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            source,
            generator,
            budget: PipelineBudget::default(),
            ranker: Box::new(LargestChangeFirst),
        }
    }

    /// Replaces the budget.
    #[must_use]
    pub fn with_budget(mut self, budget: PipelineBudget) -> Self {
        self.budget = budget;
        self
    }

    /// Replaces the hunk ranking policy.
    #[must_use]
    pub fn with_ranker(mut self, ranker: impl HunkRanker + 'static) -> Self {
        self.ranker = Box::new(ranker);
        self
    }

    /// Limits used for each run.
    #[must_use]
    pub const fn budget(&self) -> &PipelineBudget {
        &self.budget
    }

    /// Runs the pipeline for `request`.
    ///
    /// # Errors
    ///
    /// Returns the first stage failure; see [`PipelineError`].
    pub async fn run(
        &self,
        request: &PresentationRequest,
        cancel: &CancellationFlag,
    ) -> Result<Presentation, PipelineError> {
        run_stages(
            self.source.as_ref(),
            self.generator.as_ref(),
            self.ranker.as_ref(),
            request,
            &self.budget,
            cancel,
        )
        .await
    }
}
