//! Slide planning and plan validation.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use crate::ai::TextGenerator;

use super::blueprint::Blueprint;
use super::budget::PipelineBudget;
use super::cancel::CancellationFlag;
use super::error::{PipelineError, Stage};
use super::prompts::{self, PromptHunk};
use super::repair::{GenerationTrace, generate_structured};
use super::structured::{SchemaViolation, StructuredOutput, parse_json, require_text};

/// Slidev layout of a slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlideLayout {
    /// Title slide.
    Cover,
    /// Heading with bullets.
    Default,
    /// Heading with a code excerpt.
    Code,
}

impl SlideLayout {
    /// Layout name written to the slide front matter. Code slides use the
    /// default Slidev layout.
    #[must_use]
    pub const fn front_matter_name(self) -> &'static str {
        match self {
            Self::Cover => "cover",
            Self::Default | Self::Code => "default",
        }
    }
}

/// Code shown on a slide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeExcerpt {
    /// Fence language.
    pub language: String,
    /// Code text without diff markers.
    pub content: String,
}

/// One planned slide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideRecord {
    /// Slide heading.
    pub title: String,
    /// Layout.
    pub layout: SlideLayout,
    /// Line shown under the heading.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    /// Bullet points, without list markers.
    #[serde(default)]
    pub bullets: Vec<String>,
    /// Code excerpt; required on code slides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_excerpt: Option<CodeExcerpt>,
    /// Presenter notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker_notes: Option<String>,
}

/// A validated, ordered slide plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlidePlan {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    slides: Vec<SlideRecord>,
}

impl SlidePlan {
    /// Deck title, when the planner gave one.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Slides in presentation order. The first is always the cover.
    #[must_use]
    pub fn slides(&self) -> &[SlideRecord] {
        &self.slides
    }
}

/// Validates model output against the slide-plan schema, checking code
/// excerpts against the blueprint's source hunks.
#[derive(Debug, Clone, Copy)]
pub struct SlidePlanSchema<'a> {
    blueprint: &'a Blueprint,
    budget: &'a PipelineBudget,
}

impl<'a> SlidePlanSchema<'a> {
    /// Creates a schema bound to `blueprint` and the budget's slide limits.
    #[must_use]
    pub const fn new(blueprint: &'a Blueprint, budget: &'a PipelineBudget) -> Self {
        Self { blueprint, budget }
    }

    fn source_lines(&self) -> HashSet<&'a str> {
        self.blueprint
            .source_hunks()
            .iter()
            .flat_map(|hunk| hunk.text.lines())
            .map(strip_diff_marker)
            .filter(|line| is_meaningful(line))
            .collect()
    }

    fn check_slide(
        &self,
        index: usize,
        slide: &SlideRecord,
        source_lines: &HashSet<&str>,
    ) -> Result<(), SchemaViolation> {
        let field = |name: &str| format!("slides[{index}].{name}");
        require_text(&field("title"), &slide.title)?;

        if slide.bullets.len() > self.budget.max_bullets {
            return Err(SchemaViolation::constraint(
                field("bullets"),
                format!(
                    "has {} bullets, at most {} allowed",
                    slide.bullets.len(),
                    self.budget.max_bullets
                ),
            ));
        }
        for (bullet_index, bullet) in slide.bullets.iter().enumerate() {
            require_text(&field(&format!("bullets[{bullet_index}]")), bullet)?;
        }

        match (slide.layout, &slide.code_excerpt) {
            (SlideLayout::Cover, _) if !slide.bullets.is_empty() => {
                return Err(SchemaViolation::constraint(
                    field("bullets"),
                    "a cover slide has no bullets",
                ));
            }
            (SlideLayout::Cover, Some(_)) => {
                return Err(SchemaViolation::constraint(
                    field("code_excerpt"),
                    "a cover slide has no code excerpt",
                ));
            }
            (SlideLayout::Code, None) => {
                return Err(SchemaViolation::constraint(
                    field("code_excerpt"),
                    "a code slide needs a code excerpt",
                ));
            }
            _ => {}
        }

        if let Some(excerpt) = &slide.code_excerpt {
            self.check_excerpt(&field("code_excerpt"), excerpt, source_lines)?;
        }
        Ok(())
    }

    fn check_excerpt(
        &self,
        field: &str,
        excerpt: &CodeExcerpt,
        source_lines: &HashSet<&str>,
    ) -> Result<(), SchemaViolation> {
        require_text(&format!("{field}.language"), &excerpt.language)?;
        require_text(&format!("{field}.content"), &excerpt.content)?;

        let line_count = excerpt.content.trim_end().lines().count();
        if line_count > self.budget.max_code_lines {
            return Err(SchemaViolation::constraint(
                format!("{field}.content"),
                format!(
                    "has {line_count} lines, at most {} allowed",
                    self.budget.max_code_lines
                ),
            ));
        }

        let quotes_source = excerpt
            .content
            .lines()
            .map(strip_diff_marker)
            .filter(|line| is_meaningful(line))
            .any(|line| source_lines.contains(line));
        if !quotes_source {
            return Err(SchemaViolation::constraint(
                format!("{field}.content"),
                "must quote at least one line from the provided diffs",
            ));
        }
        Ok(())
    }
}

/// Drops a leading `+`, `-` or space diff marker and surrounding whitespace.
fn strip_diff_marker(line: &str) -> &str {
    line.strip_prefix(['+', '-', ' '])
        .unwrap_or(line)
        .trim()
}

/// Lines made only of punctuation match too much to count as a quote.
fn is_meaningful(line: &str) -> bool {
    !line.starts_with("@@") && line.chars().any(char::is_alphanumeric)
}

impl StructuredOutput for SlidePlanSchema<'_> {
    type Output = SlidePlan;

    fn stage(&self) -> Stage {
        Stage::SlidePlan
    }

    fn schema_hint(&self) -> Value {
        json!({
            "title": "string, deck title",
            "slides": [{
                "title": "string, required",
                "layout": "cover | default | code",
                "subtitle": "string, optional",
                "bullets": [format!("string, at most {} items", self.budget.max_bullets)],
                "code_excerpt": {
                    "language": "string",
                    "content": format!("string, at most {} lines", self.budget.max_code_lines),
                },
                "speaker_notes": "string, optional",
            }],
        })
    }

    fn validate(&self, raw: &str) -> Result<SlidePlan, SchemaViolation> {
        let plan: SlidePlan = parse_json(raw)?;
        let count = plan.slides.len();
        if count < self.budget.min_slides || count > self.budget.max_slides {
            return Err(SchemaViolation::constraint(
                "slides",
                format!(
                    "has {count} slides, expected between {} and {}",
                    self.budget.min_slides, self.budget.max_slides
                ),
            ));
        }

        let covers: Vec<usize> = plan
            .slides
            .iter()
            .enumerate()
            .filter(|(_, slide)| slide.layout == SlideLayout::Cover)
            .map(|(index, _)| index)
            .collect();
        if covers != [0] {
            return Err(SchemaViolation::constraint(
                "slides",
                "exactly one cover slide is required and it must come first",
            ));
        }

        let source_lines = self.source_lines();
        for (index, slide) in plan.slides.iter().enumerate() {
            self.check_slide(index, slide, &source_lines)?;
        }
        Ok(plan)
    }
}

/// Generates and validates the slide plan for `blueprint`.
///
/// # Errors
///
/// Returns the repair loop's failure when no valid plan is produced within
/// the budget, or [`PipelineError::Prompt`] when the prompt cannot be
/// rendered.
pub async fn plan_slides<G>(
    generator: &G,
    blueprint: &Blueprint,
    budget: &PipelineBudget,
    cancel: &CancellationFlag,
) -> Result<(SlidePlan, GenerationTrace), PipelineError>
where
    G: TextGenerator + ?Sized,
{
    let schema = SlidePlanSchema::new(blueprint, budget);
    let hunks: Vec<PromptHunk<'_>> = blueprint
        .source_hunks()
        .iter()
        .map(PromptHunk::from)
        .collect();
    let request = prompts::slide_plan_request(
        &blueprint.to_prompt_json(),
        &hunks,
        &schema.schema_hint(),
        budget,
    )?;

    let (plan, trace) = generate_structured(generator, &schema, &request, budget, cancel).await?;
    info!(
        stage = %Stage::SlidePlan,
        attempts = trace.final_attempt_number(),
        slides = plan.slides().len(),
        "slide plan validated"
    );
    Ok((plan, trace))
}

#[cfg(test)]
#[path = "slides_tests.rs"]
mod tests;
