//! Interactive-help text (`help("for")` style topic pages) to Markdown.
//!
//! Unlike docstrings these pages use underlined titles, grammar productions
//! (`::=`), indented code and REPL transcripts, and end with a
//! "Related help topics" footer.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::links::{rewrite_links, rewrite_pep_mentions};
use super::{dedent_block, indent_of, is_blank, strip_indent};
use crate::models::ParsedDocstring;

/// Extra indentation (past the page baseline) that marks a code line.
const CODE_INDENT: usize = 4;

static ALL_CAPS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z][A-Z0-9_]+\b").unwrap());

static SEPARATOR_RUNS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:\s*,\s*)+").unwrap());

enum Block {
    Heading(String),
    Prose(String),
    Quote(String),
    Code(String),
}

struct CodeSpan {
    indent: usize,
    repl: bool,
    lines: Vec<String>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Span {
    Body,
    Examples,
    SeeAlso,
}

#[derive(Default)]
struct HelpBuilder {
    blocks: Vec<Block>,
    paragraph: Vec<String>,
    paragraph_is_quote: bool,
    code: Option<CodeSpan>,
    example_lines: Vec<String>,
    see_also: Vec<String>,
}

impl HelpBuilder {
    fn flush_paragraph(&mut self) {
        if self.paragraph.is_empty() {
            return;
        }
        let text = rewrite_links(&self.paragraph.join(" "));
        self.paragraph.clear();
        if std::mem::take(&mut self.paragraph_is_quote) {
            self.blocks.push(Block::Quote(format!("> {text}")));
        } else {
            self.blocks.push(Block::Prose(text));
        }
    }

    fn flush_code(&mut self) {
        let Some(span) = self.code.take() else { return };
        let mut lines: Vec<String> = span
            .lines
            .iter()
            .map(|l| strip_indent(l, span.indent).to_string())
            .collect();
        while lines.last().is_some_and(|l| is_blank(l)) {
            lines.pop();
        }
        if lines.is_empty() {
            return;
        }
        let fence = if lines.iter().any(|l| l.contains("::=")) {
            "```"
        } else {
            "```python"
        };
        self.blocks
            .push(Block::Code(format!("{fence}\n{}\n```", lines.join("\n"))));
    }

    fn flush_examples(&mut self) -> Option<String> {
        let lines: Vec<&str> = self.example_lines.iter().map(String::as_str).collect();
        let block = dedent_block(&lines);
        self.example_lines.clear();
        Some(block).filter(|b| !b.trim().is_empty())
    }

    fn flush_all(&mut self) {
        self.flush_paragraph();
        self.flush_code();
    }
}

/// A title line followed by an underline of `-`, `=` or `*` at least as long.
fn is_section_header(lines: &[String], i: usize) -> bool {
    let title = lines[i].trim();
    let Some(next) = lines.get(i + 1) else {
        return false;
    };
    let underline = next.trim();
    !title.is_empty()
        && !underline.is_empty()
        && underline.chars().count() >= title.chars().count()
        && underline.chars().all(|c| matches!(c, '-' | '=' | '*'))
        && !title.chars().all(|c| matches!(c, '-' | '=' | '*'))
}

fn starts_with_ci(text: &str, prefix: &str) -> bool {
    text.len() >= prefix.len()
        && text.is_char_boundary(prefix.len())
        && text[..prefix.len()].eq_ignore_ascii_case(prefix)
}

/// Strip loose ALL-CAPS topic names (keeping `PEP`), tidy separators, and
/// link PEP references.
pub fn clean_see_also(text: &str) -> Option<String> {
    let stripped = ALL_CAPS_RE.replace_all(text, |caps: &Captures| {
        if &caps[0] == "PEP" {
            caps[0].to_string()
        } else {
            String::new()
        }
    });
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    let separated = SEPARATOR_RUNS_RE.replace_all(&collapsed, ", ");
    let trimmed = separated.trim_matches(|c: char| c == ',' || c == '.' || c.is_whitespace());
    if trimmed.is_empty() {
        return None;
    }
    Some(rewrite_pep_mentions(trimmed))
}

/// Split off a trailing "Related help topics:" footer.
fn split_footer(lines: &[String]) -> (&[String], Option<String>) {
    match lines
        .iter()
        .rposition(|l| starts_with_ci(l.trim(), "related help topics:"))
    {
        Some(pos) => {
            let footer: Vec<&str> = lines[pos..].iter().map(|l| l.trim()).collect();
            let text = footer.join(" ");
            let topics = text["related help topics:".len()..].trim().to_string();
            (&lines[..pos], Some(topics))
        }
        None => (lines, None),
    }
}

/// Parse interactive-help text into a docstring record whose description is
/// the Markdown rendering of the page.
pub fn parse_help_text(text: &str) -> ParsedDocstring {
    let all: Vec<String> = text
        .replace("\r\n", "\n")
        .lines()
        .map(|l| l.replace('\t', "    ").trim_end().to_string())
        .collect();
    let (lines, footer) = split_footer(&all);
    let baseline = lines
        .iter()
        .filter(|l| !is_blank(l))
        .map(|l| indent_of(l))
        .min()
        .unwrap_or(0);

    let mut b = HelpBuilder::default();
    let mut examples = Vec::new();
    let mut span = Span::Body;
    let mut i = 0;

    while i < lines.len() {
        let line = &lines[i];
        let trimmed = line.trim();

        if is_section_header(lines, i) {
            b.flush_all();
            if span == Span::Examples {
                examples.extend(b.flush_examples());
            }
            b.blocks.push(Block::Heading(trimmed.to_string()));
            span = Span::Body;
            i += 2;
            continue;
        }

        if starts_with_ci(trimmed, "see also:") {
            b.flush_all();
            if span == Span::Examples {
                examples.extend(b.flush_examples());
            }
            span = Span::SeeAlso;
            b.see_also.push(trimmed["see also:".len()..].trim().to_string());
            i += 1;
            continue;
        }
        if trimmed.eq_ignore_ascii_case("examples:") || trimmed.eq_ignore_ascii_case("example:") {
            b.flush_all();
            if span == Span::Examples {
                examples.extend(b.flush_examples());
            }
            span = Span::Examples;
            i += 1;
            continue;
        }
        match span {
            Span::SeeAlso => {
                b.see_also.push(trimmed.to_string());
                i += 1;
                continue;
            }
            Span::Examples => {
                b.example_lines.push(line.clone());
                i += 1;
                continue;
            }
            Span::Body => {}
        }

        let indent = indent_of(line);
        let relative = indent.saturating_sub(baseline);
        let is_prompt = trimmed.starts_with(">>>");
        let is_grammar = trimmed.contains("::=");

        if let Some(code) = b.code.as_mut() {
            if trimmed.is_empty() {
                if code.repl {
                    b.flush_code();
                } else {
                    code.lines.push(String::new());
                }
                i += 1;
                continue;
            }
            let continues = code.repl
                || is_prompt
                || is_grammar
                || trimmed.starts_with("...")
                || relative >= CODE_INDENT;
            if continues {
                code.repl |= is_prompt;
                code.lines.push(line.clone());
                i += 1;
                continue;
            }
            b.flush_code();
        }

        if trimmed.is_empty() {
            b.flush_paragraph();
            i += 1;
            continue;
        }

        if is_grammar || is_prompt || relative >= CODE_INDENT {
            b.flush_paragraph();
            b.code = Some(CodeSpan {
                indent,
                repl: is_prompt,
                lines: vec![line.clone()],
            });
            i += 1;
            continue;
        }

        if starts_with_ci(trimmed, "note:") {
            b.flush_paragraph();
            b.paragraph_is_quote = true;
        }
        b.paragraph.push(trimmed.to_string());
        i += 1;
    }
    b.flush_all();
    if span == Span::Examples {
        examples.extend(b.flush_examples());
    }

    let mut notes = Vec::new();
    if let Some(note) = clean_see_also(&b.see_also.join(" ")) {
        notes.push(format!("See also: {note}"));
    }
    if let Some(note) = footer.as_deref().and_then(clean_see_also) {
        notes.push(format!("See also: {note}"));
    }

    let summary = b.blocks.iter().find_map(|block| match block {
        Block::Prose(text) => Some(text.clone()),
        _ => None,
    });
    let skip_title = matches!(b.blocks.first(), Some(Block::Heading(_)));
    let rendered: Vec<String> = b
        .blocks
        .iter()
        .skip(usize::from(skip_title))
        .map(|block| match block {
            Block::Heading(title) => format!("### {title}"),
            Block::Prose(text) | Block::Quote(text) | Block::Code(text) => text.clone(),
        })
        .collect();
    let description = Some(rendered.join("\n\n")).filter(|d| !d.is_empty());

    ParsedDocstring {
        summary,
        description,
        examples,
        notes,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FOR_TOPIC: &str = r#"The "for" statement
*******************

The "for" statement is used to iterate over the elements of a sequence
(such as a string, tuple or list) or other iterable object:

   for_stmt ::= "for" target_list "in" starred_list ":" suite
                ["else" ":" suite]

The expression list is evaluated once; it should yield an iterable
object. See PEP 234.

Note: There is a subtlety when the sequence is being modified by the
loop.

   >>> for x in range(2):
   ...     print(x)
   0
   1

Examples:
   for i in range(3):
       pass

See also: LOOPING PEP 234

Related help topics: break, continue, while
"#;

    #[test]
    fn test_keyword_topic() {
        let doc = parse_help_text(FOR_TOPIC);
        assert_eq!(
            doc.summary.as_deref(),
            Some("The \"for\" statement is used to iterate over the elements of a sequence (such as a string, tuple or list) or other iterable object:")
        );
        let body = doc.description.unwrap();
        assert!(!body.contains("*****"));
        assert!(body.starts_with("The \"for\" statement is used"));
        assert!(body.contains(
            "```\nfor_stmt ::= \"for\" target_list \"in\" starred_list \":\" suite\n             [\"else\" \":\" suite]\n```"
        ));
        assert!(body.contains("See [PEP 234](https://peps.python.org/pep-0234/)."));
        assert!(body.contains(
            "> Note: There is a subtlety when the sequence is being modified by the loop."
        ));
        assert!(body.contains("```python\n>>> for x in range(2):\n...     print(x)\n0\n1\n```"));
        assert!(!body.contains("Related help topics"));
        assert!(!body.contains("range(3)"));

        assert_eq!(doc.examples, vec!["for i in range(3):\n    pass"]);
        assert_eq!(
            doc.notes,
            vec![
                "See also: [PEP 234](https://peps.python.org/pep-0234/)",
                "See also: break, continue, while",
            ]
        );
    }

    #[test]
    fn test_subsection_headings() {
        let doc = parse_help_text(
            "Title\n=====\n\nIntro paragraph here.\n\nDetails\n-------\n\nMore words.\n",
        );
        assert_eq!(doc.summary.as_deref(), Some("Intro paragraph here."));
        assert_eq!(
            doc.description.as_deref(),
            Some("Intro paragraph here.\n\n### Details\n\nMore words.")
        );
    }

    #[test]
    fn test_short_underline_is_not_a_header() {
        let doc = parse_help_text("A long title line\n---\n");
        assert_eq!(doc.summary.as_deref(), Some("A long title line ---"));
    }

    #[test]
    fn test_clean_see_also() {
        assert_eq!(clean_see_also("LOOPING, BOOLEAN"), None);
        assert_eq!(
            clean_see_also("TRUTHVALUE, bool, PEP 285."),
            Some("bool, [PEP 285](https://peps.python.org/pep-0285/)".to_string())
        );
    }

    #[test]
    fn test_code_block_with_wide_space_indent() {
        let doc = parse_help_text("Title line\n\n    x ::= y\n  \u{3000}z\n");
        let body = doc.description.unwrap_or_default();
        assert!(body.contains("x ::= y"));
        assert!(body.contains("\u{3000}z"));
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_help_text("").is_empty());
    }
}
