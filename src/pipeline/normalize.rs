//! Diff normalisation: turn raw GitHub patches into bounded, printable hunks.
//!
//! Everything here is pure and deterministic. [`normalize_patch`] is
//! idempotent for a fixed ceiling, so normalised text can be normalised again
//! without change.

use camino::Utf8Path;
use serde::Serialize;

use crate::github::{ChangeStatus, RawFileDiff};

use super::extract::is_binary_file;

const GIT_HEADER_PREFIXES: &[&str] = &[
    "diff --git",
    "index ",
    "--- a/",
    "--- /dev/null",
    "+++ b/",
    "+++ /dev/null",
];

const ESCAPE: char = '\u{1b}';

/// Extension-to-language mapping used for hunk language hints.
const EXTENSION_MAPPINGS: &[(&str, &str)] = &[
    ("rs", "rust"),
    ("py", "python"),
    ("js", "javascript"),
    ("mjs", "javascript"),
    ("ts", "typescript"),
    ("jsx", "jsx"),
    ("tsx", "tsx"),
    ("rb", "ruby"),
    ("go", "go"),
    ("java", "java"),
    ("kt", "kotlin"),
    ("kts", "kotlin"),
    ("swift", "swift"),
    ("c", "c"),
    ("h", "c"),
    ("cpp", "cpp"),
    ("cc", "cpp"),
    ("cxx", "cpp"),
    ("hpp", "cpp"),
    ("cs", "csharp"),
    ("php", "php"),
    ("sh", "bash"),
    ("bash", "bash"),
    ("zsh", "zsh"),
    ("ps1", "powershell"),
    ("sql", "sql"),
    ("md", "markdown"),
    ("json", "json"),
    ("yaml", "yaml"),
    ("yml", "yaml"),
    ("toml", "toml"),
    ("xml", "xml"),
    ("html", "html"),
    ("htm", "html"),
    ("css", "css"),
    ("scss", "scss"),
    ("vue", "vue"),
    ("svelte", "svelte"),
    ("dart", "dart"),
    ("scala", "scala"),
    ("ex", "elixir"),
    ("exs", "elixir"),
    ("hs", "haskell"),
    ("lua", "lua"),
];

/// Normalised change category of a hunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// New file.
    Added,
    /// Edited in place.
    Modified,
    /// Removed file.
    Deleted,
    /// Moved, possibly with edits.
    Renamed,
}

impl ChangeKind {
    /// Lowercase label used in prompts.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Modified => "modified",
            Self::Deleted => "deleted",
            Self::Renamed => "renamed",
        }
    }
}

impl From<ChangeStatus> for ChangeKind {
    fn from(status: ChangeStatus) -> Self {
        match status {
            ChangeStatus::Added | ChangeStatus::Copied => Self::Added,
            ChangeStatus::Removed => Self::Deleted,
            ChangeStatus::Renamed => Self::Renamed,
            ChangeStatus::Modified | ChangeStatus::Changed | ChangeStatus::Unchanged => {
                Self::Modified
            }
        }
    }
}

/// One file's normalised diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffHunk {
    /// Path after the change.
    pub file_path: String,
    /// Path before a rename.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_path: Option<String>,
    /// Change category.
    pub change_kind: ChangeKind,
    /// Language derived from the file extension.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_hint: Option<String>,
    /// Cleaned and bounded diff text.
    pub text: String,
    /// Always false for hunks produced by [`normalize_diffs`].
    #[serde(skip)]
    pub is_binary: bool,
    /// Added plus deleted lines, used to rank hunks.
    pub changed_lines: u64,
}

/// Maps a file path to a fenced-code language, if known.
#[must_use]
pub fn language_for_path(path: &str) -> Option<&'static str> {
    let extension = Utf8Path::new(path).extension()?.to_ascii_lowercase();
    EXTENSION_MAPPINGS
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, language)| *language)
}

fn is_git_header(line: &str) -> bool {
    GIT_HEADER_PREFIXES
        .iter()
        .any(|prefix| line.starts_with(prefix))
}

/// Drops ANSI escape sequences and control characters other than tab and
/// newline.
fn strip_control_sequences(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == ESCAPE {
            if chars.next_if_eq(&'[').is_some() {
                // CSI sequences end with a byte in '@'..='~'.
                for terminator in chars.by_ref() {
                    if ('@'..='~').contains(&terminator) {
                        break;
                    }
                }
            } else {
                chars.next();
            }
            continue;
        }
        if ch.is_control() && ch != '\n' && ch != '\t' {
            continue;
        }
        output.push(ch);
    }

    output
}

fn elision_marker(count: usize, unit: &str) -> String {
    format!("... [{count} {unit} elided] ...")
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn join_parts(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("\n")
}

/// Keeps whole head and tail lines around an elision marker.
fn truncate_lines(lines: &[&str], ceiling: usize) -> Option<String> {
    let marker_reserve = char_len(&elision_marker(lines.len(), "lines"));
    let available = ceiling.checked_sub(marker_reserve)?;

    let mut used = 0;
    let mut head_count = 0;
    for line in lines {
        let cost = char_len(line) + 1;
        if used + cost > available.div_euclid(2) {
            break;
        }
        used += cost;
        head_count += 1;
    }

    let mut tail_count = 0;
    for line in lines.iter().skip(head_count).rev() {
        let cost = char_len(line) + 1;
        if used + cost > available {
            break;
        }
        used += cost;
        tail_count += 1;
    }

    if head_count + tail_count == 0 {
        return None;
    }

    let elided = lines.len() - head_count - tail_count;
    let head = lines.get(..head_count)?.join("\n");
    let tail = lines.get(lines.len() - tail_count..)?.join("\n");
    let marker = elision_marker(elided, "lines");
    Some(join_parts(&[&head, &marker, &tail]))
}

/// Keeps head and tail characters when single lines are too long to split on
/// line boundaries.
fn truncate_chars(text: &str, ceiling: usize) -> String {
    let total = char_len(text);
    let marker_reserve = char_len(&elision_marker(total, "chars")) + 2;
    let Some(available) = ceiling.checked_sub(marker_reserve).filter(|left| *left > 0) else {
        let cut: String = text.chars().take(ceiling).collect();
        return cut.trim_end().to_owned();
    };

    let head_chars = available.div_euclid(2);
    let tail_chars = available - head_chars;
    let head_text: String = text.chars().take(head_chars).collect();
    let tail_text: String = text.chars().skip(total - tail_chars).collect();
    let head = head_text.trim_end();
    let mut tail = tail_text.trim_start();

    // A suffix can start mid-line with text that reads as a git header.
    while tail.lines().next().is_some_and(is_git_header) {
        let mut rest = tail.chars();
        rest.next();
        tail = rest.as_str().trim_start();
    }

    let elided = total - char_len(head) - char_len(tail);
    let marker = elision_marker(elided, "chars");
    join_parts(&[head, &marker, tail])
}

fn truncate_middle(text: &str, ceiling: usize) -> String {
    if char_len(text) <= ceiling {
        return text.to_owned();
    }
    let lines: Vec<&str> = text.split('\n').collect();
    truncate_lines(&lines, ceiling).unwrap_or_else(|| truncate_chars(text, ceiling))
}

/// Cleans a raw patch and bounds it to `ceiling` characters.
///
/// Line endings are unified, escape sequences and non-printable characters
/// removed, git file headers dropped and blank-line runs collapsed. Oversized
/// text keeps its head and tail around a `... [N lines elided] ...` marker.
#[must_use]
pub fn normalize_patch(raw: &str, ceiling: usize) -> String {
    let unified = raw.replace("\r\n", "\n");
    let printable = strip_control_sequences(&unified);

    let mut lines: Vec<&str> = Vec::new();
    let mut previous_blank = true;
    for line in printable.split('\n') {
        if is_git_header(line) {
            continue;
        }
        let blank = line.trim().is_empty();
        if blank && previous_blank {
            continue;
        }
        lines.push(if blank { "" } else { line });
        previous_blank = blank;
    }
    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }

    truncate_middle(&lines.join("\n"), ceiling)
}

fn count_changed_lines(patch: &str) -> u64 {
    let count = patch
        .lines()
        .filter(|line| {
            (line.starts_with('+') && !line.starts_with("+++"))
                || (line.starts_with('-') && !line.starts_with("---"))
        })
        .count();
    u64::try_from(count).unwrap_or(u64::MAX)
}

/// Normalises a single text diff. Returns `None` for binary files and for
/// diffs with no content left after cleaning.
#[must_use]
pub fn normalize_file(file: &RawFileDiff, ceiling: usize) -> Option<DiffHunk> {
    if is_binary_file(file) {
        return None;
    }
    let patch = file.patch.as_deref()?;
    let text = normalize_patch(patch, ceiling);
    if text.is_empty() {
        return None;
    }

    let reported = file.additions.saturating_add(file.deletions);
    let changed_lines = if reported > 0 {
        reported
    } else {
        count_changed_lines(patch)
    };

    Some(DiffHunk {
        file_path: file.path.clone(),
        previous_path: file.previous_path.clone(),
        change_kind: file.status.into(),
        language_hint: language_for_path(&file.path).map(ToOwned::to_owned),
        text,
        is_binary: false,
        changed_lines,
    })
}

/// Normalises text diffs in order, dropping binary and empty ones.
#[must_use]
pub fn normalize_diffs(files: &[RawFileDiff], ceiling: usize) -> Vec<DiffHunk> {
    files
        .iter()
        .filter_map(|file| normalize_file(file, ceiling))
        .collect()
}

#[cfg(test)]
#[path = "normalize_tests.rs"]
mod tests;
