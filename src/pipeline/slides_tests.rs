//! Unit tests for slide-plan validation.

use rstest::{fixture, rstest};
use serde_json::{Value, json};

use super::{SlideLayout, SlidePlanSchema};
use crate::github::PullRequestMetadata;
use crate::pipeline::blueprint::{Blueprint, BlueprintDraft};
use crate::pipeline::budget::PipelineBudget;
use crate::pipeline::extract::ExtractedChanges;
use crate::pipeline::normalize::{ChangeKind, DiffHunk};
use crate::pipeline::structured::{SchemaViolation, StructuredOutput};

#[fixture]
fn blueprint() -> Blueprint {
    let changes = ExtractedChanges {
        metadata: PullRequestMetadata {
            number: 3,
            title: Some("Cache lookups".to_owned()),
            ..PullRequestMetadata::default()
        },
        commits: Vec::new(),
        text_files: Vec::new(),
        non_text_files: Vec::new(),
    };
    let draft = BlueprintDraft {
        problem: "Lookups are slow".to_owned(),
        solution: "Cache them".to_owned(),
        key_changes: vec!["Add an LRU cache".to_owned()],
        impact: String::new(),
    };
    let hunk = DiffHunk {
        file_path: "src/cache.rs".to_owned(),
        previous_path: None,
        change_kind: ChangeKind::Added,
        language_hint: Some("rust".to_owned()),
        text: "@@ -0,0 +1,3 @@\n+pub fn lookup(key: &str) -> Option<String> {\n+    CACHE.get(key)\n+}"
            .to_owned(),
        is_binary: false,
        changed_lines: 3,
    };
    Blueprint::assemble(draft, changes, vec![hunk])
}

fn cover() -> Value {
    json!({ "title": "Cache lookups", "layout": "cover", "subtitle": "PR #3" })
}

fn bullets(title: &str) -> Value {
    json!({ "title": title, "layout": "default", "bullets": ["One", "Two"] })
}

fn code(content: &str) -> Value {
    json!({
        "title": "The lookup",
        "layout": "code",
        "code_excerpt": { "language": "rust", "content": content },
    })
}

fn plan(slides: Vec<Value>) -> String {
    json!({ "title": "Cache lookups", "slides": slides }).to_string()
}

fn six_slide_plan() -> String {
    plan(vec![
        cover(),
        bullets("Overview"),
        bullets("Problem"),
        bullets("Solution"),
        code("pub fn lookup(key: &str) -> Option<String> {\n    CACHE.get(key)\n}"),
        bullets("Next steps"),
    ])
}

#[rstest]
fn accepts_a_well_formed_plan(blueprint: Blueprint) {
    let budget = PipelineBudget::default();
    let schema = SlidePlanSchema::new(&blueprint, &budget);

    let validated = schema
        .validate(&six_slide_plan())
        .expect("plan should validate");

    assert_eq!(validated.slides().len(), 6);
    assert_eq!(validated.title(), Some("Cache lookups"));
    assert_eq!(
        validated.slides().first().map(|slide| slide.layout),
        Some(SlideLayout::Cover)
    );
}

#[rstest]
#[case::too_few(plan(vec![cover(), bullets("Only")]), "slides")]
#[case::cover_not_first(plan(vec![bullets("A"), cover(), bullets("B")]), "slides")]
#[case::two_covers(plan(vec![cover(), cover(), bullets("B")]), "slides")]
#[case::no_cover(plan(vec![bullets("A"), bullets("B"), bullets("C")]), "slides")]
#[case::cover_with_bullets(
    plan(vec![
        json!({ "title": "Deck", "layout": "cover", "bullets": ["x"] }),
        bullets("A"),
        bullets("B"),
    ]),
    "slides[0].bullets"
)]
#[case::blank_title(plan(vec![cover(), bullets("  "), bullets("B")]), "slides[1].title")]
#[case::code_without_excerpt(
    plan(vec![cover(), json!({ "title": "Code", "layout": "code" }), bullets("B")]),
    "slides[1].code_excerpt"
)]
#[case::too_many_bullets(
    plan(vec![
        cover(),
        json!({ "title": "Busy", "layout": "default", "bullets": ["1", "2", "3", "4", "5", "6", "7"] }),
        bullets("B"),
    ]),
    "slides[1].bullets"
)]
#[case::blank_bullet(
    plan(vec![
        cover(),
        json!({ "title": "Gap", "layout": "default", "bullets": ["ok", " "] }),
        bullets("B"),
    ]),
    "slides[1].bullets[1]"
)]
#[case::invented_code(
    plan(vec![cover(), code("fn made_up() {}"), bullets("B")]),
    "slides[1].code_excerpt.content"
)]
#[case::punctuation_only_code(
    plan(vec![cover(), code("}\n{"), bullets("B")]),
    "slides[1].code_excerpt.content"
)]
#[case::blank_language(
    plan(vec![
        cover(),
        json!({
            "title": "Code",
            "layout": "code",
            "code_excerpt": { "language": "", "content": "CACHE.get(key)" },
        }),
        bullets("B"),
    ]),
    "slides[1].code_excerpt.language"
)]
fn rejects_invalid_plans(blueprint: Blueprint, #[case] raw: String, #[case] expected_field: &str) {
    let budget = PipelineBudget::default();
    let schema = SlidePlanSchema::new(&blueprint, &budget);

    let result = schema.validate(&raw);

    assert!(
        matches!(&result, Err(SchemaViolation::Constraint { field, .. }) if field == expected_field),
        "unexpected result: {result:?}"
    );
}

#[rstest]
fn rejects_excerpts_over_the_line_limit(blueprint: Blueprint) {
    let budget = PipelineBudget {
        max_code_lines: 2,
        ..PipelineBudget::default()
    };
    let schema = SlidePlanSchema::new(&blueprint, &budget);
    let raw = plan(vec![
        cover(),
        code("pub fn lookup(key: &str) -> Option<String> {\n    CACHE.get(key)\n}"),
        bullets("B"),
    ]);

    assert!(matches!(
        schema.validate(&raw),
        Err(SchemaViolation::Constraint { field, .. }) if field == "slides[1].code_excerpt.content"
    ));
}

#[rstest]
fn excerpts_may_keep_diff_markers(blueprint: Blueprint) {
    let budget = PipelineBudget::default();
    let schema = SlidePlanSchema::new(&blueprint, &budget);
    let raw = plan(vec![cover(), code("+    CACHE.get(key)"), bullets("B")]);

    assert!(schema.validate(&raw).is_ok());
}

#[rstest]
fn unknown_layouts_are_shape_errors(blueprint: Blueprint) {
    let budget = PipelineBudget::default();
    let schema = SlidePlanSchema::new(&blueprint, &budget);
    let raw = plan(vec![
        cover(),
        json!({ "title": "A", "layout": "two-cols" }),
        bullets("B"),
    ]);

    assert!(matches!(
        schema.validate(&raw),
        Err(SchemaViolation::Shape { .. })
    ));
}
