//! Google-style docstrings: `Args:` / `Returns:` / `Raises:` header lines.

use std::sync::LazyLock;

use regex::Regex;

use super::{dedent_block, indent_of, is_blank, join_paragraphs, leading_prose};
use crate::models::{ExceptionInfo, Parameter, ParsedDocstring, ReturnInfo};

static ARG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\*{0,2}[A-Za-z_]\w*)\s*(?:\(([^)]*)\))?\s*:\s*(.*)$").unwrap()
});

static RAISE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z_][\w.]*)\s*:\s*(.*)$").unwrap());

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Section {
    Args,
    Returns,
    Raises,
    Examples,
    Notes,
    Ignored,
}

fn section_for(line: &str) -> Option<Section> {
    let title = line.trim().strip_suffix(':')?;
    let section = match title.to_ascii_lowercase().as_str() {
        "args" | "arguments" | "parameters" | "params" | "keyword args" | "keyword arguments"
        | "other parameters" => Section::Args,
        "returns" | "return" | "yields" | "yield" => Section::Returns,
        "raises" | "raise" | "except" | "exceptions" => Section::Raises,
        "example" | "examples" => Section::Examples,
        "note" | "notes" | "see also" | "warning" | "warnings" => Section::Notes,
        "attributes" | "methods" | "todo" | "references" => Section::Ignored,
        _ => return None,
    };
    Some(section)
}

fn is_header(lines: &[String], i: usize) -> bool {
    section_for(&lines[i]).is_some()
}

pub fn parse(lines: &[String]) -> ParsedDocstring {
    let (summary, description, mut i) = leading_prose(lines, is_header);
    let mut doc = ParsedDocstring {
        summary,
        description,
        ..Default::default()
    };

    while i < lines.len() {
        let Some(section) = section_for(&lines[i]) else {
            i += 1;
            continue;
        };
        let header_indent = indent_of(&lines[i]);
        let title = lines[i].trim().trim_end_matches(':').to_string();
        let start = i + 1;
        let mut end = start;
        // A section ends at the next header at the same or lower indentation.
        while end < lines.len()
            && !(is_header(lines, end) && indent_of(&lines[end]) <= header_indent)
        {
            end += 1;
        }
        let body: Vec<&str> = lines[start..end].iter().map(String::as_str).collect();
        apply_section(&mut doc, section, &title, &body);
        i = end;
    }
    doc
}

fn apply_section(doc: &mut ParsedDocstring, section: Section, title: &str, body: &[&str]) {
    match section {
        Section::Args => parse_args(doc, body),
        Section::Returns => parse_returns(doc, body),
        Section::Raises => parse_raises(doc, body),
        Section::Examples => {
            let block = dedent_block(body);
            if !block.trim().is_empty() {
                doc.examples.push(block);
            }
        }
        Section::Notes => {
            let trimmed: Vec<&str> = body.iter().map(|l| l.trim()).collect();
            if let Some(text) = join_paragraphs(&trimmed) {
                if title.eq_ignore_ascii_case("note") || title.eq_ignore_ascii_case("notes") {
                    doc.notes.push(text);
                } else {
                    doc.notes.push(format!("{title}: {text}"));
                }
            }
        }
        Section::Ignored => {}
    }
}

fn entry_indent(body: &[&str]) -> usize {
    body.iter()
        .filter(|l| !is_blank(l))
        .map(|l| indent_of(l))
        .min()
        .unwrap_or(0)
}

fn parse_args(doc: &mut ParsedDocstring, body: &[&str]) {
    let base = entry_indent(body);
    for line in body {
        if is_blank(line) {
            continue;
        }
        let text = line.trim();
        if indent_of(line) <= base {
            if let Some(caps) = ARG_RE.captures(text) {
                let type_ = caps
                    .get(2)
                    .map(|m| m.as_str().trim().to_string())
                    .filter(|t| !t.is_empty());
                let mut param = Parameter::new(&caps[1], type_);
                param.append_description(&caps[3]);
                doc.parameters.push(param);
                continue;
            }
        }
        if let Some(last) = doc.parameters.last_mut() {
            last.append_description(text);
        }
    }
}

/// `type: description` when the part before the colon looks like a type.
fn split_type_prefix(text: &str) -> Option<(&str, &str)> {
    let (head, tail) = text.split_once(':')?;
    let head = head.trim();
    if head.is_empty() || head.replace(", ", ",").contains(' ') {
        return None;
    }
    Some((head, tail.trim()))
}

fn parse_returns(doc: &mut ParsedDocstring, body: &[&str]) {
    let mut returns = doc.returns.take().unwrap_or_default();
    let mut first = true;
    for line in body {
        if is_blank(line) {
            continue;
        }
        let text = line.trim();
        if first && returns.type_.is_none() {
            if let Some((type_, description)) = split_type_prefix(text) {
                returns.type_ = Some(type_.to_string());
                returns.append_description(description);
                first = false;
                continue;
            }
        }
        first = false;
        returns.append_description(text);
    }
    if returns != ReturnInfo::default() {
        doc.returns = Some(returns);
    }
}

fn parse_raises(doc: &mut ParsedDocstring, body: &[&str]) {
    let base = entry_indent(body);
    for line in body {
        if is_blank(line) {
            continue;
        }
        let text = line.trim();
        if indent_of(line) <= base {
            if let Some(caps) = RAISE_RE.captures(text) {
                let mut exc = ExceptionInfo {
                    type_: caps[1].to_string(),
                    description: None,
                };
                exc.append_description(&caps[2]);
                doc.raises.push(exc);
                continue;
            }
        }
        if let Some(last) = doc.raises.last_mut() {
            last.append_description(text);
        }
    }
}
