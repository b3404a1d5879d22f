//! Bounded generate-validate-repair loop shared by the generation stages.
//!
//! A stage makes at most `max_repair_attempts + 1` generation calls. Output
//! that fails validation triggers a repair request carrying the schema, the
//! previous output and the validation error; transient provider failures
//! re-send the original request. Every call is recorded in a
//! [`GenerationTrace`] so callers can inspect what happened.

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::ai::openai::truncate_for_message;
use crate::ai::{GenerationError, GenerationRequest, TextGenerator};

use super::budget::PipelineBudget;
use super::cancel::CancellationFlag;
use super::error::{PipelineError, Stage};
use super::prompts;
use super::structured::{SchemaViolation, StructuredOutput};

/// Position of a stage in the repair state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairState {
    /// No attempt made yet.
    Pending,
    /// Output received and being checked.
    Validating,
    /// The given number of attempts failed; another call is allowed.
    Repairing(u32),
    /// An attempt produced valid output.
    Succeeded,
    /// The budget is exhausted.
    Failed,
}

/// Result of one generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The output passed validation.
    Valid,
    /// The output was rejected.
    Invalid(SchemaViolation),
    /// The call did not finish within the deadline.
    TimedOut,
    /// The provider rate limited the call.
    RateLimited(String),
    /// The provider failed for another reason.
    Unavailable(String),
}

/// One generation call and what came of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationAttempt {
    /// One-based call number within the stage.
    pub attempt_number: u32,
    /// Text returned by the provider, when it returned any.
    pub raw_text: Option<String>,
    /// Classification of the call.
    pub outcome: AttemptOutcome,
}

impl GenerationAttempt {
    /// Validation error message, if the output was rejected.
    #[must_use]
    pub fn parse_error(&self) -> Option<String> {
        match &self.outcome {
            AttemptOutcome::Invalid(violation) => Some(violation.to_string()),
            AttemptOutcome::Valid
            | AttemptOutcome::TimedOut
            | AttemptOutcome::RateLimited(_)
            | AttemptOutcome::Unavailable(_) => None,
        }
    }
}

/// Every attempt a stage made, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationTrace {
    stage: Stage,
    attempts: Vec<GenerationAttempt>,
}

impl GenerationTrace {
    /// Stage the attempts belong to.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        self.stage
    }

    /// Attempts in call order.
    #[must_use]
    pub fn attempts(&self) -> &[GenerationAttempt] {
        &self.attempts
    }

    /// Number of the last call made, or zero when none was made.
    #[must_use]
    pub fn final_attempt_number(&self) -> u32 {
        self.attempts
            .last()
            .map_or(0, |attempt| attempt.attempt_number)
    }
}

/// State machine counting attempts against the repair budget.
#[derive(Debug, Clone)]
pub struct RepairLoop {
    stage: Stage,
    max_repair_attempts: u32,
    state: RepairState,
    attempts: Vec<GenerationAttempt>,
}

impl RepairLoop {
    /// Starts a loop in [`RepairState::Pending`].
    #[must_use]
    pub const fn new(stage: Stage, max_repair_attempts: u32) -> Self {
        Self {
            stage,
            max_repair_attempts,
            state: RepairState::Pending,
            attempts: Vec::new(),
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> RepairState {
        self.state
    }

    /// Number for the next call, or `None` once the loop has finished.
    #[must_use]
    pub fn next_attempt_number(&self) -> Option<u32> {
        match self.state {
            RepairState::Pending | RepairState::Repairing(_) => {
                Some(self.final_attempt_number().saturating_add(1))
            }
            RepairState::Validating | RepairState::Succeeded | RepairState::Failed => None,
        }
    }

    /// Marks that output has arrived and is being validated.
    pub const fn start_validation(&mut self) {
        self.state = RepairState::Validating;
    }

    /// Records a finished attempt and moves to the next state.
    pub fn record(&mut self, attempt: GenerationAttempt) -> RepairState {
        let number = attempt.attempt_number;
        self.state = match attempt.outcome {
            AttemptOutcome::Valid => RepairState::Succeeded,
            _ if number <= self.max_repair_attempts => RepairState::Repairing(number),
            _ => RepairState::Failed,
        };
        self.attempts.push(attempt);
        self.state
    }

    /// Most recent attempt.
    #[must_use]
    pub fn last_attempt(&self) -> Option<&GenerationAttempt> {
        self.attempts.last()
    }

    fn final_attempt_number(&self) -> u32 {
        self.attempts
            .last()
            .map_or(0, |attempt| attempt.attempt_number)
    }

    /// Consumes the loop, returning its attempts.
    #[must_use]
    pub fn into_trace(self) -> GenerationTrace {
        GenerationTrace {
            stage: self.stage,
            attempts: self.attempts,
        }
    }
}

/// Builds the terminal error from the last recorded attempt.
fn terminal_error(trace: &GenerationTrace, preview_chars: usize) -> PipelineError {
    let stage = trace.stage();
    let attempts = trace.final_attempt_number();
    let Some(last) = trace.attempts().last() else {
        return PipelineError::GenerationUnavailable {
            stage,
            attempts,
            message: "no generation attempt was made".to_owned(),
        };
    };

    match &last.outcome {
        AttemptOutcome::Invalid(violation) => PipelineError::SchemaValidationFailed {
            stage,
            attempts,
            last_raw_output: truncate_for_message(
                last.raw_text.as_deref().unwrap_or_default(),
                preview_chars,
            ),
            error: violation.to_string(),
        },
        AttemptOutcome::TimedOut => PipelineError::GenerationTimeout { stage, attempts },
        AttemptOutcome::RateLimited(message) => PipelineError::GenerationRateLimited {
            stage,
            attempts,
            message: message.clone(),
        },
        AttemptOutcome::Unavailable(message) => PipelineError::GenerationUnavailable {
            stage,
            attempts,
            message: message.clone(),
        },
        AttemptOutcome::Valid => PipelineError::GenerationUnavailable {
            stage,
            attempts,
            message: "valid output was discarded".to_owned(),
        },
    }
}

/// Request to send after a failed attempt.
fn follow_up_request(
    original: &GenerationRequest,
    schema_hint: &Value,
    failed: &GenerationAttempt,
    budget: &PipelineBudget,
) -> Result<GenerationRequest, PipelineError> {
    match (&failed.outcome, failed.raw_text.as_deref()) {
        (AttemptOutcome::Invalid(violation), Some(raw)) => {
            prompts::repair_request(original, schema_hint, raw, violation, budget)
        }
        _ => Ok(original.clone()),
    }
}

/// Runs `request` through `generator` until `schema` accepts the output or
/// the repair budget runs out.
///
/// # Errors
///
/// Returns [`PipelineError::Cancelled`] when `cancel` is set before a call,
/// [`PipelineError::Configuration`] when the provider is misconfigured, and
/// otherwise the failure of the last attempt: see
/// [`PipelineError::SchemaValidationFailed`],
/// [`PipelineError::GenerationTimeout`],
/// [`PipelineError::GenerationRateLimited`] and
/// [`PipelineError::GenerationUnavailable`].
pub async fn generate_structured<G, S>(
    generator: &G,
    schema: &S,
    request: &GenerationRequest,
    budget: &PipelineBudget,
    cancel: &CancellationFlag,
) -> Result<(S::Output, GenerationTrace), PipelineError>
where
    G: TextGenerator + ?Sized,
    S: StructuredOutput,
{
    let stage = schema.stage();
    let schema_hint = schema.schema_hint();
    let mut repair = RepairLoop::new(stage, budget.max_repair_attempts);
    let mut next_request = request.clone();

    while let Some(attempt_number) = repair.next_attempt_number() {
        cancel.check(stage)?;
        debug!(stage = %stage, attempt = attempt_number, "requesting generation");

        let response =
            tokio::time::timeout(budget.generation_timeout, generator.complete(&next_request))
                .await;

        let mut validated = None;
        let (raw_text, outcome) = match response {
            Err(_) | Ok(Err(GenerationError::Timeout)) => (None, AttemptOutcome::TimedOut),
            Ok(Err(GenerationError::RateLimited { message })) => {
                (None, AttemptOutcome::RateLimited(message))
            }
            Ok(Err(GenerationError::Configuration { message })) => {
                error!(stage = %stage, "generation provider is misconfigured");
                return Err(PipelineError::Configuration { message });
            }
            Ok(Err(other)) => (None, AttemptOutcome::Unavailable(other.to_string())),
            Ok(Ok(raw)) => {
                repair.start_validation();
                match schema.validate(&raw) {
                    Ok(value) => {
                        validated = Some(value);
                        (Some(raw), AttemptOutcome::Valid)
                    }
                    Err(violation) => (Some(raw), AttemptOutcome::Invalid(violation)),
                }
            }
        };

        let state = repair.record(GenerationAttempt {
            attempt_number,
            raw_text,
            outcome,
        });

        if let Some(value) = validated {
            debug!(stage = %stage, attempt = attempt_number, "generated output validated");
            return Ok((value, repair.into_trace()));
        }

        let Some(failed) = repair.last_attempt() else {
            break;
        };
        warn!(
            stage = %stage,
            attempt = attempt_number,
            outcome = ?failed.outcome,
            "generation attempt failed"
        );

        if matches!(state, RepairState::Repairing(_)) {
            if matches!(failed.outcome, AttemptOutcome::RateLimited(_)) {
                tokio::select! {
                    () = tokio::time::sleep(budget.rate_limit_backoff) => {}
                    () = cancel.cancelled() => {
                        info!(stage = %stage, "cancelled during rate-limit backoff");
                        return Err(PipelineError::Cancelled { stage });
                    }
                }
            }
            next_request = follow_up_request(request, &schema_hint, failed, budget)?;
        }
    }

    let trace = repair.into_trace();
    let failure = terminal_error(&trace, budget.diagnostic_preview_chars);
    error!(
        stage = %stage,
        attempts = trace.final_attempt_number(),
        error = %failure,
        "generation stage failed"
    );
    Err(failure)
}

#[cfg(test)]
#[path = "repair_tests.rs"]
mod tests;
