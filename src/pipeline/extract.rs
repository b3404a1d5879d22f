//! Diff extraction: fetch a pull request's changes and drop non-text files.

use camino::Utf8Path;
use tracing::{debug, info};

use crate::github::{
    CommitRange, CommitSummary, DiffSource, PullRequestLocator, PullRequestMetadata, RawFileDiff,
};

use super::error::PipelineError;

/// Extensions treated as binary regardless of patch content.
const BINARY_EXTENSIONS: &[&str] = &[
    // images
    "png", "jpg", "jpeg", "gif", "bmp", "ico", "webp", "tif", "tiff", "heic",
    // documents
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx",
    // archives
    "zip", "tar", "gz", "tgz", "bz2", "xz", "rar", "7z",
    // executables and libraries
    "exe", "dll", "so", "dylib", "a", "jar", "class", "wasm",
    // media
    "mp4", "mov", "avi", "mkv", "mp3", "wav", "flac", "ogg",
    // vector and design files
    "svg", "psd", "ai", "eps", "sketch",
    // fonts
    "ttf", "otf", "woff", "woff2", "eot",
    // opaque data
    "bin", "dat", "db", "sqlite", "pkl", "joblib", "npy",
    // packages and disk images
    "apk", "ipa", "dmg", "iso",
];

/// How much of a patch is inspected when sniffing for binary content.
const SNIFF_WINDOW: usize = 8 * 1024;

/// Percentage of control characters above which a patch counts as binary.
const CONTROL_CHAR_PERCENT_LIMIT: usize = 30;

/// Output of the extraction stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedChanges {
    /// Pull request metadata.
    pub metadata: PullRequestMetadata,
    /// Commits in the requested range, oldest first.
    pub commits: Vec<CommitSummary>,
    /// Text file diffs in the order GitHub returned them.
    pub text_files: Vec<RawFileDiff>,
    /// Skipped files, formatted `Status: path`.
    pub non_text_files: Vec<String>,
}

/// Returns true when the file's extension is on the binary list.
#[must_use]
pub fn has_binary_extension(path: &str) -> bool {
    Utf8Path::new(path).extension().is_some_and(|extension| {
        let lower = extension.to_ascii_lowercase();
        BINARY_EXTENSIONS.contains(&lower.as_str())
    })
}

/// Returns true when patch text looks like binary content.
#[must_use]
pub fn looks_binary(patch: &str) -> bool {
    let window: String = patch.chars().take(SNIFF_WINDOW).collect();
    if window.contains('\0') {
        return true;
    }
    if window
        .lines()
        .any(|line| line.starts_with("Binary files ") && line.ends_with(" differ"))
    {
        return true;
    }

    let total = window.chars().count();
    if total == 0 {
        return false;
    }
    let control = window
        .chars()
        .filter(|ch| ch.is_control() && !matches!(ch, '\n' | '\r' | '\t'))
        .count();
    control * 100 > total * CONTROL_CHAR_PERCENT_LIMIT
}

/// Classifies a raw diff as binary by extension, missing patch or content.
#[must_use]
pub fn is_binary_file(file: &RawFileDiff) -> bool {
    if has_binary_extension(&file.path) {
        return true;
    }
    file.patch.as_deref().is_none_or(looks_binary)
}

/// Splits files into text diffs and `Status: path` labels for skipped ones.
#[must_use]
pub fn partition_files(files: Vec<RawFileDiff>) -> (Vec<RawFileDiff>, Vec<String>) {
    let mut text_files = Vec::with_capacity(files.len());
    let mut non_text_files = Vec::new();

    for file in files {
        if is_binary_file(&file) {
            debug!(path = %file.path, "skipping non-text file");
            non_text_files.push(format!("{}: {}", file.status.label(), file.path));
        } else {
            text_files.push(file);
        }
    }

    (text_files, non_text_files)
}

/// Fetches the change set and filters out non-text files.
///
/// # Errors
///
/// Returns [`PipelineError::SourceUnavailable`] when the collaborator fails
/// and [`PipelineError::EmptyDiffSet`] when no commits or no text files
/// remain.
pub async fn extract_changes<S>(
    source: &S,
    locator: &PullRequestLocator,
    range: Option<&CommitRange>,
) -> Result<ExtractedChanges, PipelineError>
where
    S: DiffSource + ?Sized,
{
    let change_set = source.fetch_change_set(locator, range).await?;
    let total_files = change_set.files.len();
    let (text_files, non_text_files) = partition_files(change_set.files);

    if change_set.commits.is_empty() || text_files.is_empty() {
        return Err(PipelineError::EmptyDiffSet {
            skipped_files: non_text_files,
        });
    }

    info!(
        pull_request = %locator,
        commits = change_set.commits.len(),
        files = total_files,
        text_files = text_files.len(),
        "extracted pull request changes"
    );

    Ok(ExtractedChanges {
        metadata: change_set.metadata,
        commits: change_set.commits,
        text_files,
        non_text_files,
    })
}
