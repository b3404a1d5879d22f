//! Per-invocation limits threaded through every pipeline stage.

use std::time::Duration;

use super::error::PipelineError;

/// Limits for one pipeline run.
///
/// Budgets are plain values passed into each stage so that concurrent runs
/// and tests can use different limits without shared state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineBudget {
    /// Repair attempts after the first generation call, per stage.
    pub max_repair_attempts: u32,
    /// Maximum characters kept from a single file's diff.
    pub hunk_char_ceiling: usize,
    /// Maximum characters of diff content embedded in the blueprint prompt.
    pub prompt_char_budget: usize,
    /// Upper bound on blueprint key changes.
    pub max_key_changes: usize,
    /// Upper bound on bullets per slide.
    pub max_bullets: usize,
    /// Fewest slides a plan may contain.
    pub min_slides: usize,
    /// Most slides a plan may contain.
    pub max_slides: usize,
    /// Longest code excerpt, in lines.
    pub max_code_lines: usize,
    /// Deadline for a single generation call.
    pub generation_timeout: Duration,
    /// Token cap passed to the provider.
    pub max_tokens: Option<u32>,
    /// Pause before retrying after the provider rate limits a call.
    pub rate_limit_backoff: Duration,
    /// Characters of raw output kept in user-facing diagnostics.
    pub diagnostic_preview_chars: usize,
    /// Characters of the previous answer echoed back in a repair prompt.
    pub repair_context_chars: usize,
}

impl Default for PipelineBudget {
    fn default() -> Self {
        Self {
            max_repair_attempts: 2,
            hunk_char_ceiling: 4_000,
            prompt_char_budget: 24_000,
            max_key_changes: 8,
            max_bullets: 6,
            min_slides: 3,
            max_slides: 12,
            max_code_lines: 40,
            generation_timeout: Duration::from_secs(60),
            max_tokens: Some(2_048),
            rate_limit_backoff: Duration::from_secs(2),
            diagnostic_preview_chars: 400,
            repair_context_chars: 32_000,
        }
    }
}

impl PipelineBudget {
    /// Total generation calls a stage may make.
    #[must_use]
    pub const fn max_generation_calls(&self) -> u32 {
        self.max_repair_attempts.saturating_add(1)
    }

    /// Checks that the limits are mutually consistent.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Configuration`] describing the first
    /// inconsistency found.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let problem = if self.min_slides == 0 {
            Some("min_slides must be at least 1".to_owned())
        } else if self.min_slides > self.max_slides {
            Some(format!(
                "min_slides ({}) exceeds max_slides ({})",
                self.min_slides, self.max_slides
            ))
        } else if self.hunk_char_ceiling == 0 || self.prompt_char_budget == 0 {
            Some("character ceilings must be positive".to_owned())
        } else if self.hunk_char_ceiling > self.prompt_char_budget {
            Some(format!(
                "hunk_char_ceiling ({}) exceeds prompt_char_budget ({})",
                self.hunk_char_ceiling, self.prompt_char_budget
            ))
        } else if self.max_key_changes == 0 || self.max_bullets == 0 || self.max_code_lines == 0 {
            Some("max_key_changes, max_bullets and max_code_lines must be positive".to_owned())
        } else if self.generation_timeout.is_zero() {
            Some("generation_timeout must be positive".to_owned())
        } else if self.repair_context_chars == 0 {
            Some("repair_context_chars must be positive".to_owned())
        } else {
            None
        };

        problem.map_or(Ok(()), |message| {
            Err(PipelineError::Configuration { message })
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rstest::rstest;

    use super::PipelineBudget;
    use crate::pipeline::error::PipelineError;

    #[rstest]
    fn default_budget_is_valid() {
        let budget = PipelineBudget::default();
        assert!(budget.validate().is_ok());
        assert_eq!(budget.max_generation_calls(), 3);
    }

    #[rstest]
    #[case::zero_min_slides(PipelineBudget { min_slides: 0, ..PipelineBudget::default() })]
    #[case::inverted_slide_bounds(
        PipelineBudget { min_slides: 9, max_slides: 4, ..PipelineBudget::default() }
    )]
    #[case::zero_ceiling(PipelineBudget { hunk_char_ceiling: 0, ..PipelineBudget::default() })]
    #[case::hunk_over_budget(
        PipelineBudget { hunk_char_ceiling: 500, prompt_char_budget: 100, ..PipelineBudget::default() }
    )]
    #[case::zero_timeout(
        PipelineBudget { generation_timeout: Duration::ZERO, ..PipelineBudget::default() }
    )]
    #[case::zero_repair_context(
        PipelineBudget { repair_context_chars: 0, ..PipelineBudget::default() }
    )]
    fn rejects_inconsistent_budgets(#[case] budget: PipelineBudget) {
        assert!(matches!(
            budget.validate(),
            Err(PipelineError::Configuration { .. })
        ));
    }
}
