//! URL parsing, commit ranges and identity wrappers for pull request intake.

use std::fmt;

use url::Url;

use super::error::IntakeError;

/// Repository owner wrapper to avoid stringly typed parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryOwner(String);

impl RepositoryOwner {
    pub(crate) fn new(value: &str) -> Result<Self, IntakeError> {
        if value.is_empty() {
            return Err(IntakeError::MissingPathSegments);
        }
        Ok(Self(value.to_owned()))
    }

    /// Borrow the owner value.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Repository name wrapper to prevent parameter mix-ups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryName(String);

impl RepositoryName {
    pub(crate) fn new(value: &str) -> Result<Self, IntakeError> {
        if value.is_empty() {
            return Err(IntakeError::MissingPathSegments);
        }
        Ok(Self(value.to_owned()))
    }

    /// Borrow the repository name.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Pull request number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PullRequestNumber(u64);

impl PullRequestNumber {
    pub(crate) const fn new(value: u64) -> Result<Self, IntakeError> {
        if value == 0 {
            return Err(IntakeError::InvalidPullRequestNumber);
        }
        Ok(Self(value))
    }

    /// Returns the numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Personal access token wrapper enforcing presence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonalAccessToken(String);

impl PersonalAccessToken {
    /// Validates that the token is non-empty and trims whitespace.
    ///
    /// # Errors
    ///
    /// Returns `IntakeError::MissingToken` when the supplied string is blank.
    pub fn new(token: impl AsRef<str>) -> Result<Self, IntakeError> {
        let trimmed = token.as_ref().trim();
        if trimmed.is_empty() {
            return Err(IntakeError::MissingToken);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the token value.
    #[must_use]
    pub const fn value(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for PersonalAccessToken {
    fn as_ref(&self) -> &str {
        self.value()
    }
}

/// Derives the GitHub API base URL from a host string.
fn derive_api_base_from_host(
    scheme: &str,
    host: &str,
    port: Option<u16>,
) -> Result<Url, IntakeError> {
    if host.eq_ignore_ascii_case("github.com") {
        Url::parse("https://api.github.com")
            .map_err(|error| IntakeError::InvalidUrl(error.to_string()))
    } else {
        let authority = if host.contains(':') {
            format!("[{host}]")
        } else {
            host.to_owned()
        };
        let mut api_url = Url::parse(&format!("{scheme}://{authority}"))
            .map_err(|error| IntakeError::InvalidUrl(error.to_string()))?;

        api_url
            .set_port(port)
            .map_err(|()| IntakeError::InvalidUrl("invalid port".to_owned()))?;
        api_url.set_path("api/v3");
        Ok(api_url)
    }
}

/// Derives the GitHub API base URL from a parsed URL.
fn derive_api_base(parsed: &Url) -> Result<Url, IntakeError> {
    let host = parsed
        .host_str()
        .ok_or_else(|| IntakeError::InvalidUrl("URL must include a host".to_owned()))?;

    derive_api_base_from_host(parsed.scheme(), host, parsed.port())
}

/// Parsed pull request URL and derived API base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestLocator {
    api_base: Url,
    owner: RepositoryOwner,
    repository: RepositoryName,
    number: PullRequestNumber,
}

impl PullRequestLocator {
    /// Parses a GitHub pull request URL in the form
    /// `https://github.com/<owner>/<repo>/pull/<number>`.
    ///
    /// Trailing segments such as `/files` or `/commits` are ignored.
    ///
    /// # Errors
    ///
    /// Returns `IntakeError::InvalidUrl` when parsing fails, `MissingPathSegments`
    /// when the URL path is not `/owner/repo/pull/<number>`, and
    /// `InvalidPullRequestNumber` when the final segment is not a positive
    /// integer.
    pub fn parse(input: &str) -> Result<Self, IntakeError> {
        let parsed =
            Url::parse(input.trim()).map_err(|error| IntakeError::InvalidUrl(error.to_string()))?;

        let mut segments = parsed
            .path_segments()
            .ok_or(IntakeError::MissingPathSegments)?;

        let owner_segment = segments.next().ok_or(IntakeError::MissingPathSegments)?;
        let repository_segment = segments.next().ok_or(IntakeError::MissingPathSegments)?;
        let marker = segments.next().ok_or(IntakeError::MissingPathSegments)?;
        let number_segment = segments.next().ok_or(IntakeError::MissingPathSegments)?;

        if marker != "pull" {
            return Err(IntakeError::MissingPathSegments);
        }

        if number_segment.is_empty() {
            return Err(IntakeError::MissingPathSegments);
        }

        let owner = RepositoryOwner::new(owner_segment)?;
        let repository = RepositoryName::new(repository_segment)?;
        let number = number_segment
            .parse::<u64>()
            .map_err(|_| IntakeError::InvalidPullRequestNumber)
            .and_then(PullRequestNumber::new)?;

        let api_base = derive_api_base(&parsed)?;

        Ok(Self {
            api_base,
            owner,
            repository,
            number,
        })
    }

    /// API base URL derived from the pull request host.
    #[must_use]
    pub const fn api_base(&self) -> &Url {
        &self.api_base
    }

    /// Repository owner.
    #[must_use]
    pub const fn owner(&self) -> &RepositoryOwner {
        &self.owner
    }

    /// Repository name.
    #[must_use]
    pub const fn repository(&self) -> &RepositoryName {
        &self.repository
    }

    /// Pull request number.
    #[must_use]
    pub const fn number(&self) -> PullRequestNumber {
        self.number
    }

    fn repository_path(&self) -> String {
        format!(
            "/repos/{}/{}",
            self.owner.as_str(),
            self.repository.as_str()
        )
    }

    pub(crate) fn pull_request_path(&self) -> String {
        format!("{}/pulls/{}", self.repository_path(), self.number.get())
    }

    pub(crate) fn commits_path(&self) -> String {
        format!("{}/commits", self.pull_request_path())
    }

    pub(crate) fn files_path(&self) -> String {
        format!("{}/files", self.pull_request_path())
    }

    pub(crate) fn compare_path(&self, base: &str, head: &str) -> String {
        format!("{}/compare/{base}...{head}", self.repository_path())
    }
}

impl fmt::Display for PullRequestLocator {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "{}/{}#{}",
            self.owner.as_str(),
            self.repository.as_str(),
            self.number.get()
        )
    }
}

const MIN_SHA_PREFIX: usize = 4;
const FULL_SHA_LEN: usize = 40;

/// Abbreviated or full commit SHA.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitSha(String);

impl CommitSha {
    /// Validates a 4–40 character hexadecimal SHA and lowercases it.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::InvalidCommitRange`] for anything else.
    pub fn new(value: &str) -> Result<Self, IntakeError> {
        let trimmed = value.trim();
        let length_ok = (MIN_SHA_PREFIX..=FULL_SHA_LEN).contains(&trimmed.len());
        if !length_ok || !trimmed.chars().all(|ch| ch.is_ascii_hexdigit()) {
            return Err(IntakeError::InvalidCommitRange {
                message: format!("'{trimmed}' is not a commit SHA"),
            });
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    /// Borrow the SHA value.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns true when `full_sha` starts with this (possibly abbreviated) SHA.
    #[must_use]
    pub fn matches(&self, full_sha: &str) -> bool {
        full_sha.to_ascii_lowercase().starts_with(self.0.as_str())
    }
}

/// Inclusive range of pull request commits, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRange {
    start: CommitSha,
    end: CommitSha,
}

impl CommitRange {
    /// Parses `START..END` or a single SHA (equivalent to `SHA..SHA`).
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::InvalidCommitRange`] when either side is missing
    /// or is not a hexadecimal SHA.
    pub fn parse(input: &str) -> Result<Self, IntakeError> {
        let trimmed = input.trim();
        match trimmed.split_once("..") {
            Some((start, end)) => {
                if start.is_empty() || end.is_empty() {
                    return Err(IntakeError::InvalidCommitRange {
                        message: format!("'{trimmed}' must have the form START..END"),
                    });
                }
                // Tolerate git's three-dot spelling.
                let end_sha = end.strip_prefix('.').unwrap_or(end);
                Ok(Self {
                    start: CommitSha::new(start)?,
                    end: CommitSha::new(end_sha)?,
                })
            }
            None => {
                let single = CommitSha::new(trimmed)?;
                Ok(Self {
                    start: single.clone(),
                    end: single,
                })
            }
        }
    }

    /// First commit included in the range.
    #[must_use]
    pub const fn start(&self) -> &CommitSha {
        &self.start
    }

    /// Last commit included in the range.
    #[must_use]
    pub const fn end(&self) -> &CommitSha {
        &self.end
    }
}

impl fmt::Display for CommitRange {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}..{}", self.start.as_str(), self.end.as_str())
    }
}
