//! End-to-end pipeline scenarios using deterministic collaborators.

use std::error::Error;
use std::sync::Arc;

use prdeck::ai::GenerationError;
use prdeck::pipeline::Stage;
use prdeck::pipeline::test_support::{
    ScriptedGenerator, StaticDiffSource, binary_file, blueprint_json, change_set,
    slide_plan_json, text_file,
};
use prdeck::{
    CancellationFlag, PipelineBudget, PipelineError, PresentationPipeline, PresentationRequest,
    generate_presentation,
};
use rstest::{fixture, rstest};

type TestResult = Result<(), Box<dyn Error>>;

const CODE_LINE: &str = "let cached = cache.get(&key);";

#[fixture]
fn request() -> PresentationRequest {
    match PresentationRequest::parse("https://github.com/octo/repo/pull/42", None) {
        Ok(request) => request,
        Err(error) => panic!("fixture URL should parse: {error}"),
    }
}

fn mixed_source() -> StaticDiffSource {
    StaticDiffSource::new(change_set(vec![
        text_file("src/lookup.rs", "let value = store.get(&key);", CODE_LINE),
        binary_file("docs/architecture.png"),
        text_file("src/cache.rs", "struct Store;", "struct Cache { entries: Vec<u8> }"),
    ]))
}

fn valid(text: String) -> Result<String, GenerationError> {
    Ok(text)
}

fn malformed() -> Result<String, GenerationError> {
    Ok("Sure! Here is your slide plan: {not json".to_owned())
}

#[rstest]
#[tokio::test]
async fn mixed_pull_request_becomes_a_six_slide_deck(request: PresentationRequest) -> TestResult {
    let source = mixed_source();
    let generator = ScriptedGenerator::new([
        valid(blueprint_json(3)),
        valid(slide_plan_json(6, CODE_LINE)),
    ]);

    let presentation = generate_presentation(
        &source,
        &generator,
        &request,
        &PipelineBudget::default(),
        &CancellationFlag::new(),
    )
    .await?;

    let hunk_paths: Vec<&str> = presentation
        .blueprint
        .source_hunks()
        .iter()
        .map(|hunk| hunk.file_path.as_str())
        .collect();
    assert_eq!(hunk_paths, ["src/lookup.rs", "src/cache.rs"]);
    assert_eq!(
        presentation.blueprint.non_text_files(),
        ["Added: docs/architecture.png"]
    );
    assert_eq!(presentation.blueprint.key_changes().len(), 3);
    assert_eq!(presentation.slide_plan.slides().len(), 6);
    assert_eq!(presentation.markdown.matches("layout: ").count(), 6);
    assert!(presentation.markdown.starts_with("---\nlayout: cover\n"));
    assert!(presentation.markdown.contains(CODE_LINE));
    assert_eq!(presentation.final_attempt_number(), 1);
    assert_eq!(generator.calls(), 2);
    assert_eq!(source.calls(), 1);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn malformed_plans_are_repaired_on_the_third_attempt(
    request: PresentationRequest,
) -> TestResult {
    let generator = ScriptedGenerator::new([
        valid(blueprint_json(2)),
        malformed(),
        malformed(),
        valid(slide_plan_json(4, CODE_LINE)),
    ]);

    let presentation = generate_presentation(
        &mixed_source(),
        &generator,
        &request,
        &PipelineBudget::default(),
        &CancellationFlag::new(),
    )
    .await?;

    assert_eq!(presentation.final_attempt_number(), 3);
    assert_eq!(presentation.blueprint_trace.final_attempt_number(), 1);
    assert_eq!(presentation.plan_trace.attempts().len(), 3);
    assert!(
        presentation
            .plan_trace
            .attempts()
            .iter()
            .take(2)
            .all(|attempt| attempt.parse_error().is_some())
    );
    let requests = generator.requests();
    let last_prompt = requests
        .last()
        .map(|request| request.prompt.as_str())
        .unwrap_or_default();
    assert!(last_prompt.contains("<validation_error>"));
    assert!(last_prompt.contains("{not json"));
    Ok(())
}

#[rstest]
#[tokio::test]
async fn persistently_malformed_output_exhausts_the_repair_budget(request: PresentationRequest) {
    let generator = ScriptedGenerator::repeating(malformed());
    let budget = PipelineBudget::default();

    let result = generate_presentation(
        &mixed_source(),
        &generator,
        &request,
        &budget,
        &CancellationFlag::new(),
    )
    .await;

    match result {
        Err(PipelineError::SchemaValidationFailed {
            stage,
            attempts,
            last_raw_output,
            ..
        }) => {
            assert_eq!(stage, Stage::Blueprint);
            assert_eq!(attempts, budget.max_generation_calls());
            assert!(last_raw_output.contains("not json"));
        }
        other => panic!("expected SchemaValidationFailed, got {other:?}"),
    }
    assert_eq!(
        generator.calls(),
        usize::try_from(budget.max_generation_calls()).unwrap_or(usize::MAX)
    );
}

#[rstest]
#[tokio::test]
async fn binary_only_pull_request_has_nothing_to_present(request: PresentationRequest) {
    let source = StaticDiffSource::new(change_set(vec![
        binary_file("assets/logo.png"),
        binary_file("fonts/Inter.woff2"),
    ]));
    let generator = ScriptedGenerator::repeating(valid(blueprint_json(1)));

    let result = generate_presentation(
        &source,
        &generator,
        &request,
        &PipelineBudget::default(),
        &CancellationFlag::new(),
    )
    .await;

    assert_eq!(
        result.err(),
        Some(PipelineError::EmptyDiffSet {
            skipped_files: vec![
                "Added: assets/logo.png".to_owned(),
                "Added: fonts/Inter.woff2".to_owned(),
            ],
        })
    );
    assert_eq!(generator.calls(), 0);
}

#[rstest]
#[tokio::test]
async fn pipeline_reports_the_stage_that_timed_out(request: PresentationRequest) {
    let generator = ScriptedGenerator::repeating(Err(GenerationError::Timeout));
    let budget = PipelineBudget {
        max_repair_attempts: 1,
        ..PipelineBudget::default()
    };
    let pipeline = PresentationPipeline::new(Arc::new(mixed_source()), Arc::new(generator))
        .with_budget(budget);

    let result = pipeline.run(&request, &CancellationFlag::new()).await;

    assert_eq!(
        result.err(),
        Some(PipelineError::GenerationTimeout {
            stage: Stage::Blueprint,
            attempts: 2,
        })
    );
}

#[rstest]
#[tokio::test]
async fn cancelled_runs_never_reach_the_collaborators(request: PresentationRequest) {
    let source = mixed_source();
    let generator = ScriptedGenerator::repeating(valid(blueprint_json(1)));
    let cancel = CancellationFlag::new();
    cancel.cancel();

    let result = generate_presentation(
        &source,
        &generator,
        &request,
        &PipelineBudget::default(),
        &cancel,
    )
    .await;

    assert_eq!(
        result.err(),
        Some(PipelineError::Cancelled {
            stage: Stage::Extraction,
        })
    );
    assert_eq!(source.calls(), 0);
    assert_eq!(generator.calls(), 0);
}
