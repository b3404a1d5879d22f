//! Slidev markdown rendering.
//!
//! Each slide becomes a section opening with a `---` / `layout: …` / `---`
//! front-matter block. Model-authored text is cleaned of wrapping fences and
//! tags before it is written, and code fences are sized so excerpt content
//! cannot close them early.

use super::error::PipelineError;
use super::sanitize::strip_wrapping_artifacts;
use super::slides::{CodeExcerpt, SlideLayout, SlidePlan, SlideRecord};

const DEFAULT_CODE_LANGUAGE: &str = "text";

/// Computes a backtick fence longer than any backtick run in `content`.
fn compute_fence(content: &str) -> String {
    let max_backticks = content
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    let fence_len = max_backticks.max(2) + 1;
    "`".repeat(fence_len)
}

/// Joins the lines of a cleaned string with single spaces.
fn single_line(text: &str) -> String {
    strip_wrapping_artifacts(text)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn clean_title(title: &str) -> String {
    single_line(title).trim_start_matches('#').trim().to_owned()
}

/// Removes list markers the model may have added to a bullet.
fn clean_bullet(bullet: &str) -> String {
    let text = single_line(bullet);
    let unmarked = text
        .strip_prefix("- ")
        .or_else(|| text.strip_prefix("* "))
        .or_else(|| text.strip_prefix("+ "))
        .or_else(|| text.strip_prefix("• "))
        .or_else(|| strip_ordinal(&text))
        .unwrap_or(&text);
    unmarked.trim().to_owned()
}

/// Strips `1. ` or `1) ` style prefixes.
fn strip_ordinal(text: &str) -> Option<&str> {
    let rest = text.trim_start_matches(|c: char| c.is_ascii_digit());
    if rest.len() == text.len() {
        return None;
    }
    rest.strip_prefix(". ").or_else(|| rest.strip_prefix(") "))
}

fn clean_language(language: &str) -> String {
    let cleaned: String = language
        .trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '#' | '_'))
        .collect::<String>()
        .to_ascii_lowercase();
    if cleaned.is_empty() {
        DEFAULT_CODE_LANGUAGE.to_owned()
    } else {
        cleaned
    }
}

fn clean_code(content: &str) -> String {
    if content.trim_start().starts_with("```") {
        return strip_wrapping_artifacts(content);
    }
    content
        .trim_end()
        .trim_start_matches(['\n', '\r'])
        .replace("\r\n", "\n")
}

/// Escapes a line Slidev would read as a slide separator or a code fence.
fn escape_block_marker(line: &str) -> String {
    let trimmed = line.trim_start();
    if ["---", "```", "~~~"]
        .iter()
        .any(|marker| trimmed.starts_with(marker))
    {
        format!("\\{trimmed}")
    } else {
        line.to_owned()
    }
}

/// Notes live in an HTML comment, so a `-->` inside them is defused.
fn clean_notes(notes: &str) -> String {
    strip_wrapping_artifacts(notes)
        .replace("-->", "-- >")
        .lines()
        .map(escape_block_marker)
        .collect::<Vec<_>>()
        .join("\n")
}

fn invariant(slide_index: usize, message: &str) -> PipelineError {
    PipelineError::RenderInvariantViolation {
        slide_index,
        message: message.to_owned(),
    }
}

fn check_invariants(slides: &[SlideRecord]) -> Result<(), PipelineError> {
    if slides.is_empty() {
        return Err(invariant(0, "a deck needs at least one slide"));
    }
    for (index, slide) in slides.iter().enumerate() {
        let is_cover = slide.layout == SlideLayout::Cover;
        if is_cover != (index == 0) {
            return Err(invariant(
                index,
                "the cover must be the first and only cover slide",
            ));
        }
        if clean_title(&slide.title).is_empty() {
            return Err(invariant(index, "slide title is empty"));
        }
        if is_cover && (!slide.bullets.is_empty() || slide.code_excerpt.is_some()) {
            return Err(invariant(index, "a cover slide carries only a title and subtitle"));
        }
        if slide.layout == SlideLayout::Code && slide.code_excerpt.is_none() {
            return Err(invariant(index, "a code slide has no code excerpt"));
        }
    }
    Ok(())
}

fn push_code(output: &mut String, excerpt: &CodeExcerpt) {
    let content = clean_code(&excerpt.content);
    let fence = compute_fence(&content);
    output.push('\n');
    output.push_str(&fence);
    output.push_str(&clean_language(&excerpt.language));
    output.push('\n');
    output.push_str(&content);
    output.push('\n');
    output.push_str(&fence);
    output.push('\n');
}

fn render_slide(output: &mut String, slide: &SlideRecord, deck_title: Option<&str>) {
    output.push_str("---\n");
    output.push_str("layout: ");
    output.push_str(slide.layout.front_matter_name());
    output.push('\n');
    if let Some(title) = deck_title {
        let quoted = serde_json::to_string(&single_line(title))
            .unwrap_or_else(|_| "\"\"".to_owned());
        output.push_str("title: ");
        output.push_str(&quoted);
        output.push('\n');
    }
    output.push_str("---\n\n# ");
    output.push_str(&clean_title(&slide.title));
    output.push('\n');

    if let Some(subtitle) = slide.subtitle.as_deref().map(single_line)
        && !subtitle.is_empty()
    {
        output.push('\n');
        output.push_str(&escape_block_marker(&subtitle));
        output.push('\n');
    }

    let bullets: Vec<String> = slide
        .bullets
        .iter()
        .map(|bullet| clean_bullet(bullet))
        .filter(|bullet| !bullet.is_empty())
        .collect();
    if !bullets.is_empty() {
        output.push('\n');
        for bullet in &bullets {
            output.push_str("- ");
            output.push_str(bullet);
            output.push('\n');
        }
    }

    if let Some(excerpt) = &slide.code_excerpt {
        push_code(output, excerpt);
    }

    if let Some(notes) = slide.speaker_notes.as_deref().map(clean_notes)
        && !notes.is_empty()
    {
        output.push_str("\n<!--\n");
        output.push_str(&notes);
        output.push_str("\n-->\n");
    }
}

fn render_deck(deck_title: Option<&str>, slides: &[SlideRecord]) -> Result<String, PipelineError> {
    check_invariants(slides)?;

    let mut output = String::new();
    for (index, slide) in slides.iter().enumerate() {
        if index > 0 {
            output.push('\n');
        }
        let headmatter_title = if index == 0 {
            deck_title.filter(|title| !title.trim().is_empty())
        } else {
            None
        };
        render_slide(&mut output, slide, headmatter_title);
    }
    Ok(output)
}

/// Renders slides to Slidev markdown.
///
/// # Errors
///
/// Returns [`PipelineError::RenderInvariantViolation`] when the slides are
/// empty, the cover is missing or misplaced, a title is blank, or a code
/// slide has no excerpt.
pub fn render_slides(slides: &[SlideRecord]) -> Result<String, PipelineError> {
    render_deck(None, slides)
}

/// Renders a validated plan, adding its deck title to the first front-matter
/// block. Plans without a title use `fallback_title`, normally the pull
/// request title.
///
/// # Errors
///
/// Returns [`PipelineError::RenderInvariantViolation`] as [`render_slides`]
/// does.
pub fn render_plan(plan: &SlidePlan, fallback_title: &str) -> Result<String, PipelineError> {
    let title = plan
        .title()
        .filter(|title| !title.trim().is_empty())
        .unwrap_or(fallback_title);
    render_deck(Some(title), plan.slides())
}

#[cfg(test)]
#[path = "render_tests.rs"]
mod tests;
