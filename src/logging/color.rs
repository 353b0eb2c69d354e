//! ANSI color formatting.
//!
//! Doubles as the `fmt` binding of the config expression namespace, so a
//! config author can write `(( fmt('ready', 'green', 'bold') ))`.

/// SGR code for a named foreground color, if recognized.
fn color_code(name: &str) -> Option<u8> {
    match name {
        "black" => Some(30),
        "red" => Some(31),
        "green" => Some(32),
        "yellow" => Some(33),
        "blue" => Some(34),
        "magenta" => Some(35),
        "cyan" => Some(36),
        "light_gray" => Some(37),
        "gray" => Some(90),
        "light_red" => Some(91),
        "light_green" => Some(92),
        "light_yellow" => Some(93),
        "light_blue" => Some(94),
        "light_magenta" => Some(95),
        "light_cyan" => Some(96),
        "white" => Some(97),
        _ => None,
    }
}

/// SGR code for a named font attribute, if recognized.
fn font_code(name: &str) -> Option<u8> {
    match name {
        "bold" => Some(1),
        "faint" => Some(2),
        "italic" => Some(3),
        "underline" => Some(4),
        _ => None,
    }
}

/// Wrap `text` in ANSI escape codes for the given foreground color and font
/// attribute. Unrecognized names are ignored rather than producing garbage
/// escape sequences.
#[must_use]
pub fn fmt(text: &str, fg: Option<&str>, font: Option<&str>) -> String {
    let mut out = String::new();
    if let Some(code) = fg.and_then(color_code) {
        out.push_str(&format!("\x1b[{code}m"));
    }
    if let Some(code) = font.and_then(font_code) {
        out.push_str(&format!("\x1b[{code}m"));
    }
    if out.is_empty() {
        return text.to_string();
    }
    out.push_str(text);
    out.push_str("\x1b[0m");
    out
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn fmt_wraps_with_color() {
        assert_eq!(fmt("hi", Some("red"), None), "\x1b[31mhi\x1b[0m");
    }

    #[test]
    fn fmt_combines_color_and_font() {
        assert_eq!(
            fmt("hi", Some("green"), Some("bold")),
            "\x1b[32m\x1b[1mhi\x1b[0m"
        );
    }

    #[test]
    fn fmt_unknown_names_leave_text_bare() {
        assert_eq!(fmt("hi", Some("mauve"), None), "hi");
        assert_eq!(fmt("hi", None, None), "hi");
    }
}
