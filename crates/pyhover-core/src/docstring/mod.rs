//! Docstring parsing: style detection, per-style section parsers, and the
//! interactive-help text parser.

pub mod google;
pub mod help_text;
pub mod links;
pub mod numpy;
pub mod rest;

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::models::ParsedDocstring;

pub use help_text::parse_help_text;
pub use links::rewrite_links;

static NUMPY_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^[ \t]*(?:Parameters|Other Parameters|Returns|Yields|Raises)[ \t]*\r?\n[ \t]*-{3,}[ \t]*$",
    )
    .unwrap()
});

static GOOGLE_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:Args|Arguments|Keyword Args|Returns|Yields|Raises):[ \t]*$").unwrap()
});

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocstringStyle {
    NumPy,
    Google,
    Rest,
}

pub fn detect_style(text: &str) -> DocstringStyle {
    if NUMPY_HEADER_RE.is_match(text) {
        DocstringStyle::NumPy
    } else if GOOGLE_HEADER_RE.is_match(text) {
        DocstringStyle::Google
    } else {
        DocstringStyle::Rest
    }
}

/// Parse a docstring of any supported style.
pub fn parse(text: &str) -> ParsedDocstring {
    let lines = clean_lines(text);
    if lines.is_empty() {
        return ParsedDocstring::default();
    }
    let mut doc = match detect_style(text) {
        DocstringStyle::NumPy => numpy::parse(&lines),
        DocstringStyle::Google => google::parse(&lines),
        DocstringStyle::Rest => rest::parse(&lines),
    };
    rewrite_prose(&mut doc);
    doc
}

fn rewrite_prose(doc: &mut ParsedDocstring) {
    fn rewrite(slot: &mut Option<String>) {
        if let Some(text) = slot.as_mut() {
            *text = rewrite_links(text);
        }
    }
    rewrite(&mut doc.summary);
    rewrite(&mut doc.description);
    for param in &mut doc.parameters {
        rewrite(&mut param.description);
    }
    if let Some(returns) = doc.returns.as_mut() {
        rewrite(&mut returns.description);
    }
    for exc in &mut doc.raises {
        rewrite(&mut exc.description);
    }
    for note in &mut doc.notes {
        *note = rewrite_links(note);
    }
}

// ---------------------------------------------------------------------------
// Helpers shared by the style parsers
// ---------------------------------------------------------------------------

/// Split into lines, expand tabs, drop the common indentation of every line
/// after the first, and trim leading/trailing blank lines.
pub fn clean_lines(text: &str) -> Vec<String> {
    let raw: Vec<String> = text
        .replace("\r\n", "\n")
        .lines()
        .map(|l| l.replace('\t', "    ").trim_end().to_string())
        .collect();
    let margin = raw
        .iter()
        .skip(1)
        .filter(|l| !l.trim().is_empty())
        .map(|l| indent_of(l))
        .min()
        .unwrap_or(0);
    let mut lines: Vec<String> = raw
        .into_iter()
        .enumerate()
        .map(|(i, l)| {
            if i == 0 {
                l.trim_start().to_string()
            } else {
                l.get(margin..).unwrap_or(l.trim_start()).to_string()
            }
        })
        .collect();
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    let leading = lines.iter().take_while(|l| l.is_empty()).count();
    lines.drain(..leading);
    lines
}

pub fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// `line` with at most `width` bytes of leading whitespace removed, cut on a
/// character boundary.
pub fn strip_indent(line: &str, width: usize) -> &str {
    let cut = line
        .char_indices()
        .take_while(|&(i, c)| c.is_whitespace() && i + c.len_utf8() <= width)
        .last()
        .map_or(0, |(i, c)| i + c.len_utf8());
    &line[cut..]
}

pub fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Title-underline lines like `-----` or `=====`.
pub fn is_underline(line: &str) -> bool {
    let t = line.trim();
    t.len() >= 3
        && t.chars()
            .all(|c| matches!(c, '-' | '=' | '~' | '^' | '*' | '#' | '+' | '`'))
}

/// Summary and description preceding the first section header.
///
/// The summary is the first run of non-blank lines (underline-only lines
/// dropped), joined with spaces. Returns the index of the first header line.
pub fn leading_prose(
    lines: &[String],
    is_header: impl Fn(&[String], usize) -> bool,
) -> (Option<String>, Option<String>, usize) {
    let mut i = 0;
    while i < lines.len() && is_blank(&lines[i]) {
        i += 1;
    }
    let mut summary_parts = Vec::new();
    while i < lines.len() && !is_blank(&lines[i]) && !is_header(lines, i) {
        if !is_underline(&lines[i]) {
            summary_parts.push(lines[i].trim().to_string());
        }
        i += 1;
    }
    let mut body: Vec<&str> = Vec::new();
    while i < lines.len() && !is_header(lines, i) {
        body.push(lines[i].as_str());
        i += 1;
    }
    let summary = Some(summary_parts.join(" ")).filter(|s| !s.is_empty());
    (summary, join_paragraphs(&body), i)
}

/// Join lines, keeping single blank lines between paragraphs.
pub fn join_paragraphs(lines: &[&str]) -> Option<String> {
    let mut out = String::new();
    let mut pending_blank = false;
    for line in lines {
        if is_blank(line) {
            pending_blank = !out.is_empty();
            continue;
        }
        if pending_blank {
            out.push_str("\n\n");
            pending_blank = false;
        } else if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(line.trim_end());
    }
    Some(out).filter(|s| !s.trim().is_empty())
}

/// Lines dedented by their smallest indentation, trailing blanks removed.
pub fn dedent_block(lines: &[&str]) -> String {
    let margin = lines
        .iter()
        .filter(|l| !is_blank(l))
        .map(|l| indent_of(l))
        .min()
        .unwrap_or(0);
    let mut out: Vec<&str> = lines
        .iter()
        .map(|l| strip_indent(l, margin))
        .collect();
    while out.last().is_some_and(|l| is_blank(l)) {
        out.pop();
    }
    while out.first().is_some_and(|l| is_blank(l)) {
        out.remove(0);
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_indent_respects_char_boundaries() {
        assert_eq!(strip_indent("    x", 2), "  x");
        assert_eq!(strip_indent("  \u{3000}z", 4), "\u{3000}z");
        assert_eq!(strip_indent("\u{3000}z", 3), "z");
        assert_eq!(strip_indent("abc", 4), "abc");
    }

    #[test]
    fn test_detect_style() {
        assert_eq!(
            detect_style("Sum.\n\nParameters\n----------\nx : int\n"),
            DocstringStyle::NumPy
        );
        assert_eq!(
            detect_style("Sum.\n\n    Args:\n        x (int): value\n"),
            DocstringStyle::Google
        );
        assert_eq!(detect_style("Sum.\n\n:param x: value\n"), DocstringStyle::Rest);
        assert_eq!(detect_style("Just prose."), DocstringStyle::Rest);
    }

    #[test]
    fn test_numpy_parameter_scenario() {
        let doc = parse("Parameters\n----------\nx : int\n    the input value\n");
        assert_eq!(doc.parameters.len(), 1);
        let x = &doc.parameters[0];
        assert_eq!(x.name, "x");
        assert_eq!(x.type_.as_deref(), Some("int"));
        assert!(x.description.as_deref().unwrap().contains("the input value"));
        assert_eq!(doc.summary, None);
    }

    #[test]
    fn test_clean_lines_dedents_body() {
        let lines = clean_lines("First line.\n\n        Indented body\n          deeper\n    ");
        assert_eq!(lines, vec!["First line.", "", "Indented body", "  deeper"]);
        assert!(clean_lines("   \n  ").is_empty());
    }

    #[test]
    fn test_summary_drops_title_underline() {
        let lines = clean_lines("Frobnicate\n==========\n\nLonger text\nover two lines.");
        let (summary, description, next) = leading_prose(&lines, |_, _| false);
        assert_eq!(summary.as_deref(), Some("Frobnicate"));
        assert_eq!(description.as_deref(), Some("Longer text\nover two lines."));
        assert_eq!(next, lines.len());
    }

    #[test]
    fn test_summary_joins_wrapped_first_paragraph() {
        let doc = parse("Return the sum\nof both values.\n\nSee PEP 8.");
        assert_eq!(doc.summary.as_deref(), Some("Return the sum of both values."));
        assert_eq!(
            doc.description.as_deref(),
            Some("See [PEP 8](https://peps.python.org/pep-0008/).")
        );
    }

    #[test]
    fn test_empty_docstring() {
        assert!(parse("").is_empty());
        assert!(parse("\n   \n").is_empty());
    }

    #[test]
    fn test_dedent_block() {
        assert_eq!(
            dedent_block(&["", "    >>> f()", "      1", ""]),
            ">>> f()\n  1"
        );
    }
}
