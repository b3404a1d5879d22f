//! Structured output parsing shared by the blueprint and slide-plan stages.

use serde::de::DeserializeOwned;
use serde_json::Value;
use serde_json::error::Category;
use thiserror::Error;

use super::error::Stage;
use super::sanitize::strip_wrapping_artifacts;

/// Why generated text was rejected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaViolation {
    /// No parseable JSON object was found.
    #[error("output is not valid JSON: {message}")]
    Malformed {
        /// Parser detail.
        message: String,
    },

    /// JSON was found but fields are missing or have the wrong type.
    #[error("output does not match the expected shape: {message}")]
    Shape {
        /// Deserialiser detail.
        message: String,
    },

    /// The shape is right but a value breaks a constraint.
    #[error("field `{field}` is invalid: {message}")]
    Constraint {
        /// Path of the offending field.
        field: String,
        /// Which constraint failed.
        message: String,
    },
}

impl SchemaViolation {
    /// Builds a constraint violation.
    #[must_use]
    pub fn constraint(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Constraint {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// A target schema for one generation stage.
///
/// Implementations describe the JSON they expect and turn raw generated text
/// into a validated value. `validate` must only return values that satisfy
/// every constraint of the schema.
pub trait StructuredOutput {
    /// Validated value produced from generated text.
    type Output;

    /// Stage this schema belongs to.
    fn stage(&self) -> Stage;

    /// JSON skeleton shown to the model and embedded in repair prompts.
    fn schema_hint(&self) -> Value;

    /// Parses and validates raw generated text.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaViolation`] describing the first problem found.
    fn validate(&self, raw: &str) -> Result<Self::Output, SchemaViolation>;
}

/// Returns the first balanced top-level `{…}` object in `text`, ignoring
/// braces inside JSON strings.
fn find_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let candidate = text.get(start..)?;

    let mut depth = 0_usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in candidate.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return candidate.get(..=offset);
                }
            }
            _ => {}
        }
    }

    None
}

/// Extracts the JSON object from generated text that may be wrapped in code
/// fences, tags or prose.
///
/// # Errors
///
/// Returns [`SchemaViolation::Malformed`] when no complete object is present.
pub fn extract_json_payload(raw: &str) -> Result<String, SchemaViolation> {
    let cleaned = strip_wrapping_artifacts(raw);
    find_json_object(&cleaned)
        .map(ToOwned::to_owned)
        .ok_or_else(|| SchemaViolation::Malformed {
            message: "no complete JSON object found".to_owned(),
        })
}

/// Extracts and deserialises a JSON object into `T`.
///
/// # Errors
///
/// Returns [`SchemaViolation::Malformed`] for syntax errors and
/// [`SchemaViolation::Shape`] for missing fields or wrong types.
pub fn parse_json<T: DeserializeOwned>(raw: &str) -> Result<T, SchemaViolation> {
    let payload = extract_json_payload(raw)?;
    serde_json::from_str(&payload).map_err(|error| match error.classify() {
        Category::Data => SchemaViolation::Shape {
            message: error.to_string(),
        },
        Category::Io | Category::Syntax | Category::Eof => SchemaViolation::Malformed {
            message: error.to_string(),
        },
    })
}

/// Rejects blank strings.
///
/// # Errors
///
/// Returns a constraint violation naming `field`.
pub fn require_text(field: &str, value: &str) -> Result<(), SchemaViolation> {
    if value.trim().is_empty() {
        return Err(SchemaViolation::constraint(field, "must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde::Deserialize;

    use super::{SchemaViolation, extract_json_payload, parse_json};

    #[derive(Debug, Deserialize, PartialEq, Eq)]
    struct Sample {
        name: String,
    }

    #[rstest]
    #[case::bare("{\"name\":\"a\"}", "{\"name\":\"a\"}")]
    #[case::fenced("```json\n{\"name\":\"a\"}\n```", "{\"name\":\"a\"}")]
    #[case::prose_around(
        "Here you go: {\"name\":\"a\"} hope it helps {not json}",
        "{\"name\":\"a\"}"
    )]
    #[case::braces_in_strings(
        "{\"name\":\"}{ \\\" }\"}",
        "{\"name\":\"}{ \\\" }\"}"
    )]
    #[case::nested("{\"a\":{\"b\":[{}]}} trailing", "{\"a\":{\"b\":[{}]}}")]
    fn extracts_first_object(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(
            extract_json_payload(raw).expect("payload should be found"),
            expected
        );
    }

    #[rstest]
    #[case::no_object("I could not do that")]
    #[case::unterminated("{\"name\": \"a\"")]
    fn reports_missing_objects_as_malformed(#[case] raw: &str) {
        assert!(matches!(
            extract_json_payload(raw),
            Err(SchemaViolation::Malformed { .. })
        ));
    }

    #[rstest]
    fn distinguishes_shape_errors_from_syntax_errors() {
        assert!(matches!(
            parse_json::<Sample>("{\"title\": 1}"),
            Err(SchemaViolation::Shape { .. })
        ));
        assert!(matches!(
            parse_json::<Sample>("{\"name\": 'single'}"),
            Err(SchemaViolation::Malformed { .. })
        ));
        assert_eq!(
            parse_json::<Sample>("{\"name\": \"ok\"}"),
            Ok(Sample {
                name: "ok".to_owned()
            })
        );
    }
}
