//! HTML meta-tag and plain-text renderings of name/value entries.

use crate::element::escape;

/// One `<meta name="..." content="..." />` line per entry.
pub fn to_html(entries: &[(String, String)]) -> String {
    entries
        .iter()
        .map(|(name, value)| {
            format!(
                "<meta name=\"{}\" content=\"{}\" />\n",
                escape(name),
                escape(value)
            )
        })
        .collect()
}

/// One `name: value` line per entry.
pub fn to_text(entries: &[(String, String)]) -> String {
    entries
        .iter()
        .map(|(name, value)| format!("{}: {}\n", name, value))
        .collect()
}
