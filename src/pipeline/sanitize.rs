//! Removal of wrapping noise that language models add around their answers.

const FENCE: &str = "```";

fn strip_fence(text: &str) -> Option<&str> {
    let body = text.strip_prefix(FENCE)?;
    // Drop the info string (```json, ```markdown, ...) along with the fence.
    let (_, after_info) = body.split_once('\n').unwrap_or(("", body));
    let inner = after_info.trim_end();
    Some(inner.strip_suffix(FENCE).unwrap_or(inner))
}

fn is_tag_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
}

fn strip_tag(text: &str) -> Option<&str> {
    let after_open = text.strip_prefix('<')?;
    let (name, rest) = after_open.split_once('>')?;
    if !is_tag_name(name) {
        return None;
    }
    let closing = format!("</{name}>");
    rest.trim_end().strip_suffix(closing.as_str())
}

/// Strips wrapping code fences and `<tag>…</tag>` wrappers, repeatedly, along
/// with surrounding whitespace.
#[must_use]
pub fn strip_wrapping_artifacts(text: &str) -> String {
    let mut current = text.trim();
    loop {
        let Some(inner) = strip_fence(current).or_else(|| strip_tag(current)) else {
            return current.to_owned();
        };
        current = inner.trim();
    }
}
