//! reStructuredText field lists (`:param x:`, `:type x:`, `:returns:`, ...),
//! the fallback when no other style is detected.

use std::sync::LazyLock;

use regex::Regex;

use super::{dedent_block, indent_of, is_blank, leading_prose};
use crate::models::{ExceptionInfo, Parameter, ParsedDocstring, ReturnInfo};

static FIELD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^:([A-Za-z]+)(?:\s+([^:]+?))?\s*:\s*(.*)$").unwrap());

/// Which record the following continuation lines extend.
enum Target {
    None,
    Param(String),
    Returns,
    Raise,
    Note,
}

fn is_header(lines: &[String], i: usize) -> bool {
    let line = lines[i].trim_start();
    FIELD_RE.is_match(line) || line.starts_with(">>>") || line.starts_with(".. ")
}

fn param_entry<'a>(doc: &'a mut ParsedDocstring, name: &str) -> &'a mut Parameter {
    let index = match doc.parameters.iter().position(|p| p.name == name) {
        Some(index) => index,
        None => {
            doc.parameters.push(Parameter::new(name, None));
            doc.parameters.len() - 1
        }
    };
    &mut doc.parameters[index]
}

pub fn parse(lines: &[String]) -> ParsedDocstring {
    let (summary, description, mut i) = leading_prose(lines, is_header);
    let mut doc = ParsedDocstring {
        summary,
        description,
        ..Default::default()
    };
    let mut target = Target::None;

    while i < lines.len() {
        let line = &lines[i];
        let text = line.trim();

        if text.starts_with(">>>") {
            let start = i;
            while i < lines.len() && !is_blank(&lines[i]) {
                i += 1;
            }
            let block: Vec<&str> = lines[start..i].iter().map(String::as_str).collect();
            doc.examples.push(dedent_block(&block));
            target = Target::None;
            continue;
        }

        if let Some(directive) = text.strip_prefix(".. ") {
            // `.. note:: text` and `.. warning:: text` become notes.
            target = match directive.split_once("::") {
                Some((kind, rest)) if matches!(kind.trim(), "note" | "warning" | "seealso") => {
                    let label = match kind.trim() {
                        "warning" => "Warning: ",
                        "seealso" => "See also: ",
                        _ => "",
                    };
                    doc.notes.push(format!("{label}{}", rest.trim()));
                    Target::Note
                }
                _ => Target::None,
            };
            i += 1;
            continue;
        }

        if let Some(caps) = FIELD_RE.captures(text) {
            let field = caps[1].to_ascii_lowercase();
            let arg = caps.get(2).map(|m| m.as_str().trim());
            let body = caps[3].trim();
            target = apply_field(&mut doc, &field, arg, body);
        } else if !text.is_empty() && indent_of(line) > 0 {
            extend(&mut doc, &target, text);
        } else if text.is_empty() {
            // Blank lines do not end a field; dedented prose does.
        } else {
            target = Target::None;
            let description = doc.description.get_or_insert_with(String::new);
            if !description.is_empty() {
                description.push('\n');
            }
            description.push_str(text);
        }
        i += 1;
    }
    doc
}

fn apply_field(doc: &mut ParsedDocstring, field: &str, arg: Option<&str>, body: &str) -> Target {
    match field {
        "param" | "parameter" | "arg" | "argument" | "key" | "keyword" => {
            let Some(arg) = arg else { return Target::None };
            // `:param int x:` carries the type inline.
            let (type_, name) = match arg.rsplit_once(' ') {
                Some((type_, name)) => (Some(type_.trim().to_string()), name.trim()),
                None => (None, arg),
            };
            let param = param_entry(doc, name);
            if type_.is_some() && param.type_.is_none() {
                param.type_ = type_;
            }
            param.append_description(body);
            Target::Param(name.to_string())
        }
        "type" => {
            if let Some(name) = arg {
                let param = param_entry(doc, name);
                if !body.is_empty() {
                    param.type_ = Some(body.to_string());
                }
            }
            Target::None
        }
        "returns" | "return" | "yields" | "yield" => {
            doc.returns
                .get_or_insert_with(ReturnInfo::default)
                .append_description(body);
            Target::Returns
        }
        "rtype" | "ytype" => {
            if !body.is_empty() {
                doc.returns.get_or_insert_with(ReturnInfo::default).type_ = Some(body.to_string());
            }
            Target::None
        }
        "raises" | "raise" | "except" | "exception" => {
            let mut exc = ExceptionInfo {
                type_: arg.unwrap_or("Exception").to_string(),
                description: None,
            };
            exc.append_description(body);
            doc.raises.push(exc);
            Target::Raise
        }
        _ => Target::None,
    }
}

fn extend(doc: &mut ParsedDocstring, target: &Target, text: &str) {
    match target {
        Target::Param(name) => param_entry(doc, name).append_description(text),
        Target::Returns => {
            if let Some(returns) = doc.returns.as_mut() {
                returns.append_description(text);
            }
        }
        Target::Raise => {
            if let Some(exc) = doc.raises.last_mut() {
                exc.append_description(text);
            }
        }
        Target::Note => {
            if let Some(note) = doc.notes.last_mut() {
                if !note.is_empty() && !note.ends_with(' ') {
                    note.push(' ');
                }
                note.push_str(text);
            }
        }
        Target::None => {}
    }
}
