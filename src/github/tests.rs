//! Unit tests for pull request and commit range parsing.

use rstest::rstest;

use super::{CommitRange, IntakeError, PersonalAccessToken, PullRequestLocator};

fn sample_locator() -> PullRequestLocator {
    PullRequestLocator::parse("https://github.com/octo/repo/pull/4")
        .expect("sample locator should parse")
}

#[rstest]
fn parses_standard_github_url() {
    let locator = PullRequestLocator::parse("https://github.com/octo/repo/pull/12/files")
        .expect("should parse standard GitHub URL");
    assert_eq!(locator.owner().as_str(), "octo", "owner mismatch");
    assert_eq!(locator.repository().as_str(), "repo", "repository mismatch");
    assert_eq!(locator.number().get(), 12_u64, "number mismatch");
    assert_eq!(
        locator.api_base().as_str(),
        "https://api.github.com/",
        "api base mismatch"
    );
}

#[rstest]
fn parses_enterprise_url() {
    let locator = PullRequestLocator::parse("https://ghe.example.com/foo/bar/pull/7")
        .expect("should parse enterprise URL");
    assert_eq!(
        locator.api_base().as_str(),
        "https://ghe.example.com/api/v3",
        "enterprise api base mismatch"
    );
}

#[rstest]
fn builds_api_paths() {
    let locator = sample_locator();
    assert_eq!(locator.pull_request_path(), "/repos/octo/repo/pulls/4");
    assert_eq!(locator.commits_path(), "/repos/octo/repo/pulls/4/commits");
    assert_eq!(locator.files_path(), "/repos/octo/repo/pulls/4/files");
    assert_eq!(
        locator.compare_path("abc", "def"),
        "/repos/octo/repo/compare/abc...def"
    );
    assert_eq!(locator.to_string(), "octo/repo#4");
}

#[rstest]
#[case::missing_number("https://github.com/octo/repo/pull/")]
#[case::issues_path("https://github.com/octo/repo/issues/4")]
#[case::repository_only("https://github.com/octo/repo")]
fn rejects_non_pull_request_paths(#[case] input: &str) {
    let result = PullRequestLocator::parse(input);
    assert!(
        matches!(result, Err(IntakeError::MissingPathSegments)),
        "expected MissingPathSegments, got {result:?}"
    );
}

#[rstest]
#[case::non_numeric("https://github.com/octo/repo/pull/not-a-number")]
#[case::zero("https://github.com/octo/repo/pull/0")]
fn rejects_bad_numbers(#[case] input: &str) {
    let result = PullRequestLocator::parse(input);
    assert!(
        matches!(result, Err(IntakeError::InvalidPullRequestNumber)),
        "expected InvalidPullRequestNumber, got {result:?}"
    );
}

#[rstest]
fn rejects_invalid_url() {
    let result = PullRequestLocator::parse("octo/repo/pull/4");
    assert!(
        matches!(result, Err(IntakeError::InvalidUrl(_))),
        "expected InvalidUrl for malformed URL, got {result:?}"
    );
}

#[rstest]
fn rejects_empty_token() {
    let result = PersonalAccessToken::new("   ");
    assert!(
        matches!(result, Err(IntakeError::MissingToken)),
        "expected MissingToken, got {result:?}"
    );
}

#[rstest]
#[case::two_dot("abc1234..DEF5678", "abc1234", "def5678")]
#[case::three_dot("abc1234...def5678", "abc1234", "def5678")]
#[case::single("abc1234", "abc1234", "abc1234")]
#[case::padded("  abcd..ef01 ", "abcd", "ef01")]
fn parses_commit_ranges(#[case] input: &str, #[case] start: &str, #[case] end: &str) {
    let range = CommitRange::parse(input).expect("range should parse");
    assert_eq!(range.start().as_str(), start);
    assert_eq!(range.end().as_str(), end);
}

#[rstest]
#[case::empty("")]
#[case::missing_end("abc1234..")]
#[case::missing_start("..abc1234")]
#[case::not_hex("main..feature")]
#[case::too_short("abc")]
#[case::too_long("0123456789abcdef0123456789abcdef012345678")]
fn rejects_malformed_commit_ranges(#[case] input: &str) {
    let result = CommitRange::parse(input);
    assert!(
        matches!(result, Err(IntakeError::InvalidCommitRange { .. })),
        "expected InvalidCommitRange, got {result:?}"
    );
}
