//! Choosing which hunks fit the blueprint prompt.

use std::cmp::Reverse;

use super::normalize::{ChangeKind, DiffHunk};

/// Characters charged per hunk for the heading and fence around its text.
const FRAMING_COST: usize = 64;

/// Orders hunks by how much they matter to the summary.
pub trait HunkRanker: Send + Sync {
    /// Returns indices into `hunks`, most important first. Every index
    /// appears exactly once.
    fn rank(&self, hunks: &[DiffHunk]) -> Vec<usize>;
}

/// Ranks by changed line count, putting deleted files after modifications of
/// the same size and keeping file order among ties.
#[derive(Debug, Clone, Copy, Default)]
pub struct LargestChangeFirst;

impl HunkRanker for LargestChangeFirst {
    fn rank(&self, hunks: &[DiffHunk]) -> Vec<usize> {
        let mut order: Vec<usize> = (0..hunks.len()).collect();
        order.sort_by_key(|index| {
            hunks.get(*index).map_or((Reverse(0), true, *index), |hunk| {
                (
                    Reverse(hunk.changed_lines),
                    hunk.change_kind == ChangeKind::Deleted,
                    *index,
                )
            })
        });
        order
    }
}

/// Hunks chosen for the prompt, in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HunkSelection {
    /// Selected hunks in the order the extractor produced them.
    pub hunks: Vec<DiffHunk>,
    /// Hunks left out because they did not fit.
    pub omitted: usize,
}

fn prompt_cost(hunk: &DiffHunk) -> usize {
    hunk.text.chars().count() + hunk.file_path.chars().count() + FRAMING_COST
}

/// Greedily fills `char_budget` in ranked order, skipping hunks that do not
/// fit. When nothing fits, the top-ranked hunk is kept on its own.
#[must_use]
pub fn select_hunks(
    hunks: Vec<DiffHunk>,
    ranker: &dyn HunkRanker,
    char_budget: usize,
) -> HunkSelection {
    let mut keep = vec![false; hunks.len()];
    let mut remaining = char_budget;
    let ranked = ranker.rank(&hunks);

    for index in &ranked {
        let (Some(hunk), Some(slot)) = (hunks.get(*index), keep.get_mut(*index)) else {
            continue;
        };
        let cost = prompt_cost(hunk);
        if cost <= remaining && !*slot {
            remaining -= cost;
            *slot = true;
        }
    }

    if !keep.contains(&true)
        && let Some(slot) = ranked.first().and_then(|top| keep.get_mut(*top))
    {
        *slot = true;
    }

    let total = hunks.len();
    let selected: Vec<DiffHunk> = hunks
        .into_iter()
        .zip(keep)
        .filter_map(|(hunk, kept)| kept.then_some(hunk))
        .collect();

    HunkSelection {
        omitted: total - selected.len(),
        hunks: selected,
    }
}
