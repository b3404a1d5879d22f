//! Resolution of a user-supplied commit range against a pull request's commits.

use crate::github::error::IntakeError;
use crate::github::locator::{CommitRange, CommitSha};
use crate::github::models::ApiCommit;

/// Commits selected by a range plus the endpoints for the compare call.
#[derive(Debug)]
pub(super) struct ResolvedRange<'a> {
    /// Parent of the first selected commit.
    pub(super) base: &'a str,
    /// Last selected commit.
    pub(super) head: &'a str,
    /// Selected commits, oldest first.
    pub(super) commits: &'a [ApiCommit],
}

fn position_of(commits: &[ApiCommit], sha: &CommitSha) -> Result<usize, IntakeError> {
    let mut matches = commits
        .iter()
        .enumerate()
        .filter(|(_, commit)| sha.matches(&commit.sha));

    let Some((index, _)) = matches.next() else {
        return Err(IntakeError::InvalidCommitRange {
            message: format!("commit {} is not part of the pull request", sha.as_str()),
        });
    };

    if matches.next().is_some() {
        return Err(IntakeError::InvalidCommitRange {
            message: format!("commit prefix {} is ambiguous", sha.as_str()),
        });
    }

    Ok(index)
}

/// Resolves `range` against the pull request commits, which GitHub lists
/// oldest first.
///
/// # Errors
///
/// Returns [`IntakeError::InvalidCommitRange`] when either end is unknown or
/// ambiguous, when the start comes after the end, or when the first selected
/// commit has no parent to diff against.
pub(super) fn resolve_range<'a>(
    commits: &'a [ApiCommit],
    range: &CommitRange,
) -> Result<ResolvedRange<'a>, IntakeError> {
    let start = position_of(commits, range.start())?;
    let end = position_of(commits, range.end())?;

    if start > end {
        return Err(IntakeError::InvalidCommitRange {
            message: format!("{range} starts after it ends"),
        });
    }

    let selected = commits
        .get(start..=end)
        .ok_or_else(|| IntakeError::InvalidCommitRange {
            message: format!("{range} is outside the pull request"),
        })?;

    let (Some(first), Some(last)) = (selected.first(), selected.last()) else {
        return Err(IntakeError::InvalidCommitRange {
            message: format!("{range} selects no commits"),
        });
    };

    let base = first
        .parents
        .first()
        .map(|parent| parent.sha.as_str())
        .ok_or_else(|| IntakeError::InvalidCommitRange {
            message: format!("commit {} has no parent to compare against", first.sha),
        })?;

    Ok(ResolvedRange {
        base,
        head: last.sha.as_str(),
        commits: selected,
    })
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};
    use serde_json::json;

    use super::resolve_range;
    use crate::github::error::IntakeError;
    use crate::github::locator::CommitRange;
    use crate::github::models::ApiCommit;

    fn commit(sha: &str, parent: Option<&str>) -> ApiCommit {
        let parents: Vec<_> = parent.map(|p| json!({ "sha": p })).into_iter().collect();
        serde_json::from_value(json!({
            "sha": sha,
            "html_url": null,
            "commit": { "message": format!("commit {sha}"), "author": null },
            "parents": parents
        }))
        .expect("commit fixture should deserialise")
    }

    #[fixture]
    fn commits() -> Vec<ApiCommit> {
        vec![
            commit("aaaa1111", Some("0000ffff")),
            commit("bbbb2222", Some("aaaa1111")),
            commit("cccc3333", Some("bbbb2222")),
        ]
    }

    #[rstest]
    fn resolves_inclusive_range(commits: Vec<ApiCommit>) {
        let range = CommitRange::parse("bbbb..cccc").expect("range should parse");
        let resolved = resolve_range(&commits, &range).expect("range should resolve");

        assert_eq!(resolved.base, "aaaa1111");
        assert_eq!(resolved.head, "cccc3333");
        assert_eq!(resolved.commits.len(), 2);
    }

    #[rstest]
    fn single_commit_compares_against_its_parent(commits: Vec<ApiCommit>) {
        let range = CommitRange::parse("aaaa1111").expect("range should parse");
        let resolved = resolve_range(&commits, &range).expect("range should resolve");

        assert_eq!(resolved.base, "0000ffff");
        assert_eq!(resolved.head, "aaaa1111");
        assert_eq!(resolved.commits.len(), 1);
    }

    #[rstest]
    #[case::unknown_commit("dddd..cccc")]
    #[case::reversed("cccc..aaaa")]
    fn rejects_unresolvable_ranges(commits: Vec<ApiCommit>, #[case] input: &str) {
        let range = CommitRange::parse(input).expect("range should parse");
        let result = resolve_range(&commits, &range);
        assert!(
            matches!(result, Err(IntakeError::InvalidCommitRange { .. })),
            "expected InvalidCommitRange, got {result:?}"
        );
    }

    #[rstest]
    fn rejects_root_commit_without_parent() {
        let commits = vec![commit("aaaa1111", None)];
        let range = CommitRange::parse("aaaa").expect("range should parse");
        let result = resolve_range(&commits, &range);
        assert!(
            matches!(result, Err(IntakeError::InvalidCommitRange { .. })),
            "expected InvalidCommitRange, got {result:?}"
        );
    }

    #[rstest]
    fn rejects_ambiguous_prefix() {
        let commits = vec![
            commit("abcd1111", Some("0000ffff")),
            commit("abcd2222", Some("abcd1111")),
        ];
        let range = CommitRange::parse("abcd").expect("range should parse");
        let result = resolve_range(&commits, &range);
        assert!(
            matches!(result, Err(IntakeError::InvalidCommitRange { .. })),
            "expected InvalidCommitRange, got {result:?}"
        );
    }
}
