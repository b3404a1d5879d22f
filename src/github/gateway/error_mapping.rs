//! Error mapping helpers for the Octocrab diff source.

use http::StatusCode;

use crate::github::error::IntakeError;

/// Checks if a GitHub error status indicates an authentication failure.
pub(super) const fn is_auth_failure(status: StatusCode) -> bool {
    matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
}

/// Checks if an octocrab error represents a network/transport issue.
pub(super) const fn is_network_error(error: &octocrab::Error) -> bool {
    matches!(
        error,
        octocrab::Error::Http { .. }
            | octocrab::Error::Hyper { .. }
            | octocrab::Error::Service { .. }
    )
}

/// Checks whether the GitHub error represents a rate limit error based on the
/// HTTP status and message / documentation URL content.
pub(super) fn is_rate_limit_error(source: &octocrab::GitHubError) -> bool {
    is_rate_limit_response(
        source.status_code,
        &source.message,
        source.documentation_url.as_deref(),
    )
}

fn is_rate_limit_response(
    status: StatusCode,
    message: &str,
    documentation_url: Option<&str>,
) -> bool {
    let is_rate_limit_status = matches!(
        status,
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS
    );

    let message_indicates_rate_limit = message.to_lowercase().contains("rate limit")
        || documentation_url.is_some_and(|url| url.contains("rate-limit"));

    is_rate_limit_status && message_indicates_rate_limit
}

pub(super) fn map_octocrab_error(operation: &str, error: &octocrab::Error) -> IntakeError {
    if let octocrab::Error::GitHub { source, .. } = error {
        return map_status(operation, source.status_code, &source.message, || {
            is_rate_limit_error(source)
        });
    }

    if is_network_error(error) {
        return IntakeError::Network {
            message: format!("{operation} failed: {error}"),
        };
    }

    IntakeError::Api {
        message: format!("{operation} failed: {error}"),
    }
}

fn map_status(
    operation: &str,
    status: StatusCode,
    message: &str,
    rate_limited: impl FnOnce() -> bool,
) -> IntakeError {
    if status == StatusCode::NOT_FOUND {
        return IntakeError::NotFound {
            message: format!("{operation}: {message}"),
        };
    }

    // Rate limiting arrives as 403 too, so it must be checked before auth.
    if rate_limited() {
        return IntakeError::RateLimitExceeded {
            message: format!("{operation}: {message}"),
        };
    }

    if is_auth_failure(status) {
        IntakeError::Authentication {
            message: format!("{operation} failed: GitHub returned {status} {message}"),
        }
    } else {
        IntakeError::Api {
            message: format!("{operation} failed with status {status}: {message}"),
        }
    }
}
