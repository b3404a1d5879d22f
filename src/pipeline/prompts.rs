//! Prompt templates for the blueprint, slide-plan and repair requests.
//!
//! Templates use Jinja2 syntax rendered by `minijinja`. Prompt text is never
//! logged above `trace` and never copied into user-facing errors.

use minijinja::{AutoEscape, Environment, Value as TemplateValue};
use serde::Serialize;
use serde_json::Value;

use crate::ai::{GenerationConstraints, GenerationRequest};
use crate::ai::openai::truncate_for_message;

use super::budget::PipelineBudget;
use super::error::PipelineError;
use super::normalize::DiffHunk;
use super::structured::SchemaViolation;

const BLUEPRINT_SYSTEM: &str = "\
You are a senior software engineer who explains pull requests to colleagues.
Read the pull request context and diffs supplied by the user and summarise the change.

Respond with a single JSON object and nothing else: no prose, no markdown fences.
The object must match this schema:
{{ schema }}

Rules:
- \"problem\" states what was wrong or missing before the change.
- \"solution\" states how the change addresses it.
- \"key_changes\" lists between 1 and {{ max_key_changes }} concrete changes, most important first, each one sentence.
- \"impact\" describes consequences for users or maintainers; use an empty string when the change is trivial.
- Be factual and specific. Mention files, functions and behaviour, not intentions you cannot see.";

const BLUEPRINT_USER: &str = "\
Pull request #{{ number }}: {{ title }}
{% if author %}Author: {{ author }}
{% endif %}

Description:
---
{{ description }}
---

{% if commits %}
Commits:
{% for commit in commits %}
- {{ commit }}
{% endfor %}

{% endif %}
{% if non_text_files %}
Non-text files changed (content not shown):
{% for file in non_text_files %}
- {{ file }}
{% endfor %}

{% endif %}
{% if omitted_hunks %}
{{ omitted_hunks }} smaller file diffs were left out to fit the prompt budget.

{% endif %}
Diffs:
{% for hunk in hunks %}
### {{ hunk.file_path }} ({{ hunk.change_kind }}{% if hunk.previous_path %}, from {{ hunk.previous_path }}{% endif %})
```diff
{{ hunk.text }}
```

{% endfor %}
Return the JSON object now.";

const SLIDE_PLAN_SYSTEM: &str = "\
You are a presentation designer who turns a pull request summary into a short slide deck.

Respond with a single JSON object and nothing else: no prose, no markdown fences.
The object must match this schema:
{{ schema }}

Follow this slide skeleton, in order:
1. cover: presentation title and a subtitle naming the pull request. A cover has no bullets and no code.
2. default: overview of the change.
3. default: the problem.
4. default: the solution.
5. default: key changes.
6. code (optional): one short, representative excerpt copied verbatim from the provided diffs.
7. default: impact and next steps.

Constraints:
- Between {{ min_slides }} and {{ max_slides }} slides, exactly one cover and it comes first.
- Layout is one of \"cover\", \"default\" or \"code\"; every \"code\" slide has a code_excerpt.
- At most {{ max_bullets }} short bullets per slide; bullets are plain text without list markers.
- A code excerpt is at most {{ max_code_lines }} lines and must be copied from the diffs, without leading +/- diff markers.
- Put extra explanation in speaker_notes rather than in bullets.";

const SLIDE_PLAN_USER: &str = "\
Build the slide plan for this pull request summary.

<blueprint>
{{ blueprint }}
</blueprint>

Source diffs available for code excerpts:
{% for hunk in hunks %}
### {{ hunk.file_path }}{% if hunk.language_hint %} ({{ hunk.language_hint }}){% endif %}

```diff
{{ hunk.text }}
```

{% endfor %}
Return the JSON object now.";

const REPAIR_SECTION: &str = "\
{{ original }}

---
Your previous answer could not be used. Correct it so that it matches the schema exactly.

<desired_schema>
{{ schema }}
</desired_schema>

<previous_answer>
{{ previous }}
</previous_answer>

<validation_error>
{{ error }}
</validation_error>

Respond with the corrected JSON object only.";

fn render(source: &str, ctx: TemplateValue) -> Result<String, PipelineError> {
    let mut env = Environment::new();
    env.set_auto_escape_callback(|_| AutoEscape::None);
    env.set_trim_blocks(true);

    env.render_str(source, ctx)
        .map_err(|error| PipelineError::Prompt {
            message: error.to_string(),
        })
}

fn pretty_schema(schema: &Value) -> String {
    serde_json::to_string_pretty(schema).unwrap_or_else(|_| schema.to_string())
}

/// Diff excerpt as presented to the model.
#[derive(Debug, Clone, Serialize)]
pub struct PromptHunk<'a> {
    /// File path.
    pub file_path: &'a str,
    /// Path before a rename.
    pub previous_path: Option<&'a str>,
    /// `added`, `modified`, `deleted` or `renamed`.
    pub change_kind: &'static str,
    /// Language hint for the file.
    pub language_hint: Option<&'a str>,
    /// Normalised diff text.
    pub text: &'a str,
}

impl<'a> From<&'a DiffHunk> for PromptHunk<'a> {
    fn from(hunk: &'a DiffHunk) -> Self {
        Self {
            file_path: &hunk.file_path,
            previous_path: hunk.previous_path.as_deref(),
            change_kind: hunk.change_kind.as_str(),
            language_hint: hunk.language_hint.as_deref(),
            text: &hunk.text,
        }
    }
}

/// Inputs to the blueprint prompt.
#[derive(Debug, Clone, Serialize)]
pub struct BlueprintPromptInput<'a> {
    /// Pull request number.
    pub number: u64,
    /// Pull request title.
    pub title: &'a str,
    /// Pull request description.
    pub description: &'a str,
    /// Author login.
    pub author: Option<&'a str>,
    /// Commit headlines formatted `sha: headline`.
    pub commits: Vec<String>,
    /// Skipped non-text files.
    pub non_text_files: &'a [String],
    /// Selected diffs, in file order.
    pub hunks: Vec<PromptHunk<'a>>,
    /// Diffs left out for budget reasons.
    pub omitted_hunks: usize,
}

fn constraints(budget: &PipelineBudget, schema: &Value) -> GenerationConstraints {
    GenerationConstraints {
        max_tokens: budget.max_tokens,
        schema_hint: Some(schema.clone()),
    }
}

/// Builds the blueprint synthesis request.
///
/// # Errors
///
/// Returns [`PipelineError::Prompt`] when a template fails to render.
pub fn blueprint_request(
    input: &BlueprintPromptInput<'_>,
    schema: &Value,
    budget: &PipelineBudget,
) -> Result<GenerationRequest, PipelineError> {
    let system = render(
        BLUEPRINT_SYSTEM,
        minijinja::context! {
            schema => pretty_schema(schema),
            max_key_changes => budget.max_key_changes,
        },
    )?;
    let user = render(BLUEPRINT_USER, TemplateValue::from_serialize(input))?;
    Ok(GenerationRequest::new(system, user).with_constraints(constraints(budget, schema)))
}

/// Builds the slide-plan request from the blueprint JSON and its source diffs.
///
/// # Errors
///
/// Returns [`PipelineError::Prompt`] when a template fails to render.
pub fn slide_plan_request(
    blueprint_json: &str,
    hunks: &[PromptHunk<'_>],
    schema: &Value,
    budget: &PipelineBudget,
) -> Result<GenerationRequest, PipelineError> {
    let system = render(
        SLIDE_PLAN_SYSTEM,
        minijinja::context! {
            schema => pretty_schema(schema),
            min_slides => budget.min_slides,
            max_slides => budget.max_slides,
            max_bullets => budget.max_bullets,
            max_code_lines => budget.max_code_lines,
        },
    )?;
    let user = render(
        SLIDE_PLAN_USER,
        minijinja::context! {
            blueprint => blueprint_json,
            hunks => hunks,
        },
    )?;
    Ok(GenerationRequest::new(system, user).with_constraints(constraints(budget, schema)))
}

/// Builds a repair request: the original request plus the schema, the
/// previous answer and the validation error.
///
/// # Errors
///
/// Returns [`PipelineError::Prompt`] when the template fails to render.
pub fn repair_request(
    original: &GenerationRequest,
    schema: &Value,
    previous_output: &str,
    violation: &SchemaViolation,
    budget: &PipelineBudget,
) -> Result<GenerationRequest, PipelineError> {
    let user = render(
        REPAIR_SECTION,
        minijinja::context! {
            original => original.prompt.as_str(),
            schema => pretty_schema(schema),
            previous => truncate_for_message(previous_output, budget.repair_context_chars),
            error => violation.to_string(),
        },
    )?;
    Ok(GenerationRequest {
        system_prompt: original.system_prompt.clone(),
        prompt: user,
        constraints: original.constraints.clone(),
    })
}
