//! Delivery of the rendered markdown to a file or a writer.

use std::io::Write;

use camino::Utf8Path;
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use thiserror::Error;

/// Failure to deliver rendered markdown.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OutputError {
    /// The target could not be created or written.
    #[error("failed to write presentation: {message}")]
    Io {
        /// What failed, including the path.
        message: String,
    },
}

fn io_error(message: String) -> OutputError {
    OutputError::Io { message }
}

/// Opens the directory that will hold `path`, creating it when missing.
fn open_parent_dir(path: &Utf8Path) -> Result<Dir, OutputError> {
    let parent = path.parent().unwrap_or_else(|| Utf8Path::new("."));

    let (base, relative) = if parent.as_str().is_empty() || parent == Utf8Path::new(".") {
        (".", Utf8Path::new("."))
    } else if parent.is_absolute() {
        let relative = parent
            .strip_prefix("/")
            .map_err(|_| io_error(format!("failed to normalise output directory '{parent}'")))?;
        ("/", relative)
    } else {
        (".", parent)
    };

    let dir = Dir::open_ambient_dir(base, ambient_authority())
        .map_err(|error| io_error(format!("failed to open directory '{base}': {error}")))?;

    if relative.as_str().is_empty() || relative == Utf8Path::new(".") {
        return Ok(dir);
    }
    dir.create_dir_all(relative)
        .map_err(|error| io_error(format!("failed to create directory '{parent}': {error}")))?;
    dir.open_dir(relative)
        .map_err(|error| io_error(format!("failed to open directory '{parent}': {error}")))
}

/// Writes `markdown` to `path`, creating parent directories and replacing
/// any existing file.
///
/// # Errors
///
/// Returns [`OutputError::Io`] when a directory or the file cannot be created
/// or written.
pub fn write_markdown(path: &Utf8Path, markdown: &str) -> Result<(), OutputError> {
    let file_name = path
        .file_name()
        .ok_or_else(|| io_error(format!("invalid output path '{path}': no file name")))?;
    let dir = open_parent_dir(path)?;

    dir.write(file_name, markdown)
        .map_err(|error| io_error(format!("failed to write '{path}': {error}")))
}

/// Writes `markdown` to `writer`, ending with a newline.
///
/// # Errors
///
/// Returns [`OutputError::Io`] when writing or flushing fails.
pub fn write_markdown_to<W: Write>(writer: &mut W, markdown: &str) -> Result<(), OutputError> {
    writer
        .write_all(markdown.as_bytes())
        .and_then(|()| {
            if markdown.ends_with('\n') {
                Ok(())
            } else {
                writer.write_all(b"\n")
            }
        })
        .and_then(|()| writer.flush())
        .map_err(|error| io_error(error.to_string()))
}

#[cfg(test)]
mod tests {
    use camino::Utf8PathBuf;
    use cap_std::ambient_authority;
    use cap_std::fs_utf8::Dir;
    use rstest::rstest;
    use tempfile::TempDir;

    use super::{OutputError, write_markdown, write_markdown_to};

    fn utf8_root(temp: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("temp path should be UTF-8")
    }

    #[rstest]
    fn creates_missing_parent_directories() {
        let temp = TempDir::new().expect("temp dir");
        let root = utf8_root(&temp);
        let target = root.join("decks/nested/pr-42.md");

        write_markdown(&target, "---\nlayout: cover\n---\n").expect("write should succeed");

        let dir = Dir::open_ambient_dir(&root, ambient_authority()).expect("open temp dir");
        let written = dir
            .read_to_string("decks/nested/pr-42.md")
            .expect("file should exist");
        assert_eq!(written, "---\nlayout: cover\n---\n");
    }

    #[rstest]
    fn replaces_existing_files() {
        let temp = TempDir::new().expect("temp dir");
        let target = utf8_root(&temp).join("deck.md");

        write_markdown(&target, "old").expect("first write");
        write_markdown(&target, "new").expect("second write");

        let dir = Dir::open_ambient_dir(utf8_root(&temp), ambient_authority()).expect("open");
        assert_eq!(dir.read_to_string("deck.md").expect("read"), "new");
    }

    #[rstest]
    fn rejects_paths_without_a_file_name() {
        assert!(matches!(
            write_markdown(Utf8PathBuf::from("/").as_path(), "x"),
            Err(OutputError::Io { .. })
        ));
    }

    #[rstest]
    #[case::adds_newline("# Deck", "# Deck\n")]
    #[case::keeps_newline("# Deck\n", "# Deck\n")]
    fn writer_output_ends_with_newline(#[case] markdown: &str, #[case] expected: &str) {
        let mut buffer = Vec::new();

        write_markdown_to(&mut buffer, markdown).expect("write should succeed");

        assert_eq!(String::from_utf8(buffer).expect("utf-8"), expected);
    }
}
