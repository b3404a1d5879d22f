//! Application configuration loaded from CLI, environment, and files.
//!
//! This module provides a unified configuration struct that merges values
//! from command-line arguments, environment variables, and configuration
//! files using ortho-config's layered approach.
//!
//! # Precedence
//!
//! Configuration values are loaded with the following precedence (lowest to
//! highest):
//!
//! 1. **Defaults** – Built-in application defaults
//! 2. **Configuration file** – `.prdeck.toml` in current directory, home
//!    directory, or XDG config directory
//! 3. **Environment variables** – `PRDECK_PR_URL`, `PRDECK_TOKEN`,
//!    `PRDECK_AI_API_KEY`, or the conventional `GITHUB_TOKEN` and
//!    `OPENAI_API_KEY`
//! 4. **Command-line arguments** – `--pr-url`/`-u`, `--token`/`-t`,
//!    `--commits`/`-c`, `--output`/`-o`, and the `--ai-*` and budget flags
//!
//! # Configuration File
//!
//! ```toml
//! pr_url = "https://github.com/owner/repo/pull/123"
//! token = "ghp_example"
//! commits = "a1b2c3d..e4f5a6b"
//! output = "slides/deck.md"
//! ai_model = "gpt-4o-mini"
//! max_repair_attempts = 2
//! max_slides = 10
//! ```

use std::env;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

use crate::ai::OpenAiConfig;
use crate::github::IntakeError;
use crate::pipeline::{PipelineBudget, PipelineError};

const DEFAULT_AI_TIMEOUT_SECONDS: u64 = 60;

/// Application configuration supporting CLI, environment, and file sources.
///
/// # Environment Variables
///
/// - `PRDECK_PR_URL` or `--pr-url`: Pull request URL
/// - `PRDECK_TOKEN`, `GITHUB_TOKEN`, or `--token`: GitHub token
/// - `PRDECK_COMMITS` or `--commits`: Commit range `START..END`
/// - `PRDECK_OUTPUT` or `--output`: Markdown output path
/// - `PRDECK_AI_API_KEY`, `OPENAI_API_KEY`, or `--ai-api-key`: AI API key
///
/// # Example
///
/// ```no_run
/// use ortho_config::OrthoConfig;
/// use prdeck::PrdeckConfig;
///
/// let config = PrdeckConfig::load().expect("failed to load configuration");
/// let pr_url = config.require_pr_url().expect("PR URL required");
/// let budget = config.pipeline_budget().expect("budget should be valid");
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, OrthoConfig)]
#[serde(default)]
#[ortho_config(
    prefix = "PRDECK",
    discovery(
        dotfile_name = ".prdeck.toml",
        config_file_name = "prdeck.toml",
        app_name = "prdeck"
    )
)]
pub struct PrdeckConfig {
    /// GitHub pull request URL to present.
    ///
    /// Can be provided via:
    /// - CLI: `--pr-url <URL>` or `-u <URL>`
    /// - Environment: `PRDECK_PR_URL`
    /// - Config file: `pr_url = "..."`
    #[ortho_config(cli_short = 'u')]
    pub pr_url: Option<String>,

    /// Personal access token for GitHub API authentication.
    ///
    /// Can be provided via:
    /// - CLI: `--token <TOKEN>` or `-t <TOKEN>`
    /// - Environment: `PRDECK_TOKEN` or `GITHUB_TOKEN`
    /// - Config file: `token = "..."`
    #[ortho_config(cli_short = 't')]
    pub token: Option<String>,

    /// Commit range limiting the diff, `START..END` or a single SHA.
    ///
    /// Both commits must belong to the pull request. When absent the whole
    /// pull request is presented.
    #[ortho_config(cli_short = 'c')]
    pub commits: Option<String>,

    /// Path the markdown is written to; standard output when absent.
    ///
    /// Missing parent directories are created.
    #[ortho_config(cli_short = 'o')]
    pub output: Option<String>,

    /// Base URL of the OpenAI-compatible API.
    #[ortho_config()]
    pub ai_base_url: Option<String>,

    /// Model identifier sent with each generation request.
    #[ortho_config()]
    pub ai_model: Option<String>,

    /// API key for the generation provider.
    ///
    /// Can be provided via:
    /// - CLI: `--ai-api-key <KEY>`
    /// - Environment: `PRDECK_AI_API_KEY` or `OPENAI_API_KEY`
    /// - Config file: `ai_api_key = "..."`
    #[ortho_config()]
    pub ai_api_key: Option<String>,

    /// Deadline for a single generation call, in seconds.
    #[ortho_config()]
    pub ai_timeout_seconds: u64,

    /// Token cap for each generation call.
    #[ortho_config()]
    pub ai_max_tokens: Option<u32>,

    /// Repair attempts allowed after the first generation call of a stage.
    #[ortho_config()]
    pub max_repair_attempts: Option<u32>,

    /// Fewest slides a plan may contain.
    #[ortho_config()]
    pub min_slides: Option<usize>,

    /// Most slides a plan may contain.
    #[ortho_config()]
    pub max_slides: Option<usize>,

    /// Maximum characters kept from a single file's diff.
    #[ortho_config()]
    pub hunk_char_ceiling: Option<usize>,

    /// Maximum characters of diff content embedded in the blueprint prompt.
    #[ortho_config()]
    pub prompt_char_budget: Option<usize>,

    /// Emits logs as JSON lines.
    ///
    /// Note: `ortho_config` does not load boolean values from the
    /// environment; use the CLI flag or the configuration file.
    #[ortho_config()]
    pub log_json: bool,
}

impl Default for PrdeckConfig {
    fn default() -> Self {
        Self {
            pr_url: None,
            token: None,
            commits: None,
            output: None,
            ai_base_url: None,
            ai_model: None,
            ai_api_key: None,
            ai_timeout_seconds: DEFAULT_AI_TIMEOUT_SECONDS,
            ai_max_tokens: None,
            max_repair_attempts: None,
            min_slides: None,
            max_slides: None,
            hunk_char_ceiling: None,
            prompt_char_budget: None,
            log_json: false,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

impl PrdeckConfig {
    /// Resolves the token from configuration or the `GITHUB_TOKEN`
    /// environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::MissingToken`] when no token source provides a
    /// value.
    pub fn resolve_token(&self) -> Result<String, IntakeError> {
        non_blank(self.token.clone())
            .or_else(|| non_blank(env::var("GITHUB_TOKEN").ok()))
            .ok_or(IntakeError::MissingToken)
    }

    /// Returns the pull request URL or an error if missing.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::MissingPullRequestUrl`] when no URL is configured.
    pub fn require_pr_url(&self) -> Result<&str, IntakeError> {
        self.pr_url
            .as_deref()
            .ok_or(IntakeError::MissingPullRequestUrl)
    }

    /// Resolves the AI API key from configuration or `OPENAI_API_KEY`.
    #[must_use]
    pub fn resolve_ai_api_key(&self) -> Option<String> {
        non_blank(self.ai_api_key.clone()).or_else(|| non_blank(env::var("OPENAI_API_KEY").ok()))
    }

    fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.ai_timeout_seconds)
    }

    /// Builds the generation client configuration, filling unset values with
    /// provider defaults.
    #[must_use]
    pub fn ai_config(&self) -> OpenAiConfig {
        let defaults = OpenAiConfig::default();
        OpenAiConfig::new(
            non_blank(self.ai_base_url.clone()).unwrap_or(defaults.base_url),
            non_blank(self.ai_model.clone()).unwrap_or(defaults.model),
            self.resolve_ai_api_key(),
            self.generation_timeout(),
        )
    }

    /// Converts the budget overrides into a validated [`PipelineBudget`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Configuration`] when the resulting limits are
    /// inconsistent.
    pub fn pipeline_budget(&self) -> Result<PipelineBudget, PipelineError> {
        let defaults = PipelineBudget::default();
        let budget = PipelineBudget {
            max_repair_attempts: self
                .max_repair_attempts
                .unwrap_or(defaults.max_repair_attempts),
            hunk_char_ceiling: self.hunk_char_ceiling.unwrap_or(defaults.hunk_char_ceiling),
            prompt_char_budget: self
                .prompt_char_budget
                .unwrap_or(defaults.prompt_char_budget),
            min_slides: self.min_slides.unwrap_or(defaults.min_slides),
            max_slides: self.max_slides.unwrap_or(defaults.max_slides),
            generation_timeout: self.generation_timeout(),
            max_tokens: self.ai_max_tokens.or(defaults.max_tokens),
            ..defaults
        };
        budget.validate()?;
        Ok(budget)
    }
}
