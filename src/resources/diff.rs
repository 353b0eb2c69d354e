//! Line-oriented diff rendering for deployment previews.

use similar::{ChangeTag, TextDiff};

/// Render a colored line diff between the deployed and desired content.
/// Returns `None` when the two are identical.
#[must_use]
pub fn render(current: &str, desired: &str) -> Option<String> {
    if current == desired {
        return None;
    }
    let diff = TextDiff::from_lines(current, desired);
    let mut out = String::new();
    for change in diff.iter_all_changes() {
        let (sign, color) = match change.tag() {
            ChangeTag::Delete => ("-", "\x1b[31m"),
            ChangeTag::Insert => ("+", "\x1b[32m"),
            ChangeTag::Equal => (" ", ""),
        };
        let reset = if color.is_empty() { "" } else { "\x1b[0m" };
        let line = change.value();
        out.push_str(&format!("{color}{sign} {}{reset}\n", line.trim_end_matches('\n')));
    }
    Some(out)
}

/// Diff against a file that may not exist yet; a missing file diffs as empty.
#[must_use]
pub fn render_new(current: Option<&str>, desired: &str) -> Option<String> {
    render(current.unwrap_or(""), desired)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn identical_content_has_no_diff() {
        assert!(render("a\nb\n", "a\nb\n").is_none());
    }

    #[test]
    fn changed_lines_are_marked() {
        let out = render("a\nb\n", "a\nc\n").unwrap();
        assert!(out.contains("- b"));
        assert!(out.contains("+ c"));
        assert!(out.contains("  a"));
    }

    #[test]
    fn missing_file_diffs_as_all_insertions() {
        let out = render_new(None, "x\ny\n").unwrap();
        assert!(out.contains("+ x"));
        assert!(out.contains("+ y"));
        assert!(!out.contains("- "));
    }
}
