//! NumPy-style docstrings: `Header` lines underlined with dashes.

use std::sync::LazyLock;

use regex::Regex;

use super::{dedent_block, indent_of, is_blank, join_paragraphs, leading_prose};
use crate::models::{ExceptionInfo, Parameter, ParsedDocstring, ReturnInfo};

static PARAM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\*{0,2}[A-Za-z_][\w, *]*?)\s*:\s*(.*)$").unwrap());

static BARE_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\*{0,2}[A-Za-z_]\w*$").unwrap());

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Section {
    Parameters,
    Returns,
    Raises,
    Examples,
    Notes,
    SeeAlso,
    Ignored,
}

fn section_for(title: &str) -> Option<Section> {
    let section = match title.trim().to_ascii_lowercase().as_str() {
        "parameters" | "other parameters" | "keyword arguments" => Section::Parameters,
        "returns" | "yields" => Section::Returns,
        "raises" | "warns" => Section::Raises,
        "examples" | "example" => Section::Examples,
        "notes" | "note" => Section::Notes,
        "see also" => Section::SeeAlso,
        "attributes" | "methods" | "references" | "warnings" | "receives" => Section::Ignored,
        _ => return None,
    };
    Some(section)
}

fn is_dash_underline(line: &str) -> bool {
    let t = line.trim();
    t.len() >= 3 && t.chars().all(|c| c == '-')
}

/// A recognised title followed by a dashed underline.
fn header_at(lines: &[String], i: usize) -> Option<Section> {
    let next = lines.get(i + 1)?;
    if !is_dash_underline(next) {
        return None;
    }
    section_for(&lines[i])
}

fn is_header(lines: &[String], i: usize) -> bool {
    header_at(lines, i).is_some()
}

pub fn parse(lines: &[String]) -> ParsedDocstring {
    let (summary, description, mut i) = leading_prose(lines, is_header);
    let mut doc = ParsedDocstring {
        summary,
        description,
        ..Default::default()
    };

    while i < lines.len() {
        let Some(section) = header_at(lines, i) else {
            i += 1;
            continue;
        };
        let start = i + 2;
        let mut end = start;
        while end < lines.len() && !is_header(lines, end) {
            end += 1;
        }
        let body: Vec<&str> = lines[start..end].iter().map(String::as_str).collect();
        apply_section(&mut doc, section, &body);
        i = end;
    }
    doc
}

fn apply_section(doc: &mut ParsedDocstring, section: Section, body: &[&str]) {
    match section {
        Section::Parameters => parse_parameters(doc, body),
        Section::Returns => parse_returns(doc, body),
        Section::Raises => parse_raises(doc, body),
        Section::Examples => {
            let block = dedent_block(body);
            if !block.trim().is_empty() {
                doc.examples.push(block);
            }
        }
        Section::Notes => {
            if let Some(note) = join_paragraphs(body) {
                doc.notes.push(note);
            }
        }
        Section::SeeAlso => {
            let refs: Vec<&str> = body.iter().map(|l| l.trim()).filter(|l| !l.is_empty()).collect();
            if !refs.is_empty() {
                doc.notes.push(format!("See also: {}", refs.join(" ")));
            }
        }
        Section::Ignored => {}
    }
}

/// Indentation of entry lines (the least-indented non-blank line).
fn entry_indent(body: &[&str]) -> usize {
    body.iter()
        .filter(|l| !is_blank(l))
        .map(|l| indent_of(l))
        .min()
        .unwrap_or(0)
}

fn parse_parameters(doc: &mut ParsedDocstring, body: &[&str]) {
    let base = entry_indent(body);
    for line in body {
        if is_blank(line) {
            continue;
        }
        let text = line.trim();
        if indent_of(line) <= base {
            if let Some(caps) = PARAM_RE.captures(text) {
                let type_ = Some(caps[2].trim().to_string()).filter(|t| !t.is_empty());
                doc.parameters.push(Parameter::new(caps[1].trim(), type_));
                continue;
            }
            if BARE_NAME_RE.is_match(text) {
                doc.parameters.push(Parameter::new(text, None));
                continue;
            }
        }
        if let Some(last) = doc.parameters.last_mut() {
            last.append_description(text);
        }
    }
}

fn parse_returns(doc: &mut ParsedDocstring, body: &[&str]) {
    let mut returns = doc.returns.take().unwrap_or_default();
    let mut have_type = returns.type_.is_some();
    for line in body {
        if is_blank(line) {
            continue;
        }
        let text = line.trim();
        if !have_type {
            // `name : type` names the value; only the type is kept.
            let type_ = match PARAM_RE.captures(text) {
                Some(caps) if !caps[2].trim().is_empty() => caps[2].trim().to_string(),
                _ => text.to_string(),
            };
            returns.type_ = Some(type_);
            have_type = true;
            continue;
        }
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
            doc.raises.push(ExceptionInfo {
                type_: text.to_string(),
                description: None,
            });
        } else if let Some(last) = doc.raises.last_mut() {
            last.append_description(text);
        }
    }
}
