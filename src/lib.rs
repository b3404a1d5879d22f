//! prdeck turns a GitHub pull request into a slide deck.
//!
//! The library fetches a pull request's diffs through Octocrab, drops
//! non-text files, normalises and ranks the remaining hunks, and asks a text
//! generator for a structured blueprint and then a slide plan. Both
//! generated documents are validated against their schemas inside a bounded
//! repair loop before the plan is rendered as Slidev markdown.
//!
//! The entry point is [`generate_presentation`]; [`PresentationPipeline`]
//! bundles the collaborators for repeated runs.

pub mod ai;
pub mod config;
pub mod github;
pub mod output;
pub mod pipeline;
pub mod telemetry;

pub use ai::{GenerationError, OpenAiConfig, OpenAiTextGenerator, TextGenerator};
pub use config::PrdeckConfig;
pub use github::{
    CommitRange, DiffSource, IntakeError, OctocrabGateway, PersonalAccessToken,
    PullRequestLocator,
};
pub use output::{OutputError, write_markdown, write_markdown_to};
pub use pipeline::{
    CancellationFlag, PipelineBudget, PipelineError, Presentation, PresentationPipeline,
    PresentationRequest, generate_presentation,
};
