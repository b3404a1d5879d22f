//! prdeck CLI entrypoint: render a pull request as Slidev markdown.

use std::io::{self, Write};
use std::process::ExitCode;

use camino::Utf8Path;
use ortho_config::OrthoConfig;
use prdeck::telemetry::init_tracing;
use prdeck::{
    CancellationFlag, GenerationError, IntakeError, OctocrabGateway, OpenAiTextGenerator,
    OutputError, PersonalAccessToken, PipelineError, PrdeckConfig, PresentationRequest,
    generate_presentation, write_markdown, write_markdown_to,
};
use thiserror::Error;
use tracing::{Level, info};

/// Any failure the CLI reports before exiting.
#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Intake(#[from] IntakeError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Output(#[from] OutputError),
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            if writeln!(io::stderr().lock(), "error: {error}").is_err() {
                return ExitCode::FAILURE;
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), CliError> {
    let config = load_config()?;
    init_tracing(config.log_json, Level::INFO);

    let request = PresentationRequest::parse(config.require_pr_url()?, config.commits.as_deref())?;
    let budget = config.pipeline_budget()?;
    let token = PersonalAccessToken::new(config.resolve_token()?)?;

    let gateway = OctocrabGateway::for_token(&token, request.locator())?;
    let generator = OpenAiTextGenerator::new(config.ai_config())?;

    let presentation = generate_presentation(
        &gateway,
        &generator,
        &request,
        &budget,
        &CancellationFlag::new(),
    )
    .await?;

    match config.output.as_deref() {
        Some(path) => {
            write_markdown(Utf8Path::new(path), &presentation.markdown)?;
            info!(path, slides = presentation.slide_plan.slides().len(), "presentation written");
        }
        None => write_markdown_to(&mut io::stdout().lock(), &presentation.markdown)?,
    }
    Ok(())
}

/// Loads configuration from CLI, environment, and files.
///
/// # Errors
///
/// Returns [`IntakeError::Configuration`] when ortho-config fails to parse
/// arguments or load configuration files.
fn load_config() -> Result<PrdeckConfig, IntakeError> {
    PrdeckConfig::load().map_err(|error| IntakeError::Configuration {
        message: error.to_string(),
    })
}
