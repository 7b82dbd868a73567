//! Caller-side enrichment: fold parsed docstrings, stub signatures and live
//! runtime information into a resolved record.
//!
//! Every function returns a new record and only fills what the input record
//! lacks; a field set by a more trusted tier is never overwritten.

use serde::{Deserialize, Serialize};

use crate::docstring::{parse, parse_help_text};
use crate::errors::{HoverError, HoverResult};
use crate::guards::CONFIDENCE_RUNTIME;
use crate::inventory::format::is_placeholder_summary;
use crate::models::{
    Badge, DocSource, DocumentationRecord, ParsedDocstring, RawSymbol, StubSignatureInfo,
};

/// What the runtime introspection helper reports for one symbol.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeInfo {
    #[serde(default)]
    pub docstring: Option<String>,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub qualname: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub is_stdlib: bool,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum HelperReply {
    Failed { error: String },
    Info(RuntimeInfo),
}

impl RuntimeInfo {
    /// Parse the helper's JSON reply; `{"error": ...}` replies become errors.
    pub fn from_json(raw: &str) -> HoverResult<Self> {
        match serde_json::from_str::<HelperReply>(raw)? {
            HelperReply::Failed { error } => Err(HoverError::Parse(format!(
                "runtime helper reported: {error}"
            ))),
            HelperReply::Info(info) => Ok(info),
        }
    }

    pub fn is_keyword(&self) -> bool {
        self.kind.as_deref() == Some("keyword")
    }

    pub fn to_raw_symbol(&self, name: &str) -> RawSymbol {
        RawSymbol {
            name: name.to_string(),
            module: self.module.clone(),
            qualified_name: self.qualname.clone(),
            is_stdlib: self.is_stdlib,
            version: None,
        }
    }

    /// Keyword pages come from the interactive help system, everything else
    /// is a docstring.
    pub fn parsed_docstring(&self) -> Option<ParsedDocstring> {
        let text = self.docstring.as_deref().filter(|t| !t.trim().is_empty())?;
        let parsed = if self.is_keyword() {
            parse_help_text(text)
        } else {
            parse(text)
        };
        Some(parsed).filter(|p| !p.is_empty())
    }

    /// A standalone record built only from runtime information.
    pub fn record(&self, name: &str) -> DocumentationRecord {
        let title = self.qualname.as_deref().unwrap_or(name);
        let base = DocumentationRecord::new(title, DocSource::Runtime, CONFIDENCE_RUNTIME);
        enrich_with_runtime(&base, self)
    }
}

/// Summary, description and notes of a docstring as one Markdown block.
pub fn docstring_markdown(doc: &ParsedDocstring) -> Option<String> {
    let mut blocks: Vec<String> = Vec::new();
    blocks.extend(doc.summary.clone());
    blocks.extend(doc.description.clone());
    for note in &doc.notes {
        blocks.push(format!("> {note}"));
    }
    Some(blocks.join("\n\n")).filter(|b| !b.is_empty())
}

fn lacks_summary(record: &DocumentationRecord) -> bool {
    record
        .summary
        .as_deref()
        .map_or(true, |s| s.trim().is_empty() || is_placeholder_summary(s))
}

pub fn enrich_with_docstring(
    record: &DocumentationRecord,
    doc: &ParsedDocstring,
) -> DocumentationRecord {
    let mut merged = record.clone();
    if lacks_summary(&merged) {
        if let Some(markdown) = docstring_markdown(doc) {
            merged.summary = Some(markdown);
        }
    }
    for param in &doc.parameters {
        match merged.parameters.iter_mut().find(|p| p.name == param.name) {
            Some(existing) => {
                if existing.type_.is_none() {
                    existing.type_ = param.type_.clone();
                }
                if existing.description.is_none() {
                    existing.description = param.description.clone();
                }
            }
            None => merged.parameters.push(param.clone()),
        }
    }
    if merged.returns.is_none() {
        merged.returns = doc.returns.clone();
    }
    if merged.raises.is_empty() {
        merged.raises = doc.raises.clone();
    }
    if merged.examples.is_empty() {
        merged.examples = doc.examples.clone();
    }
    merged
}

pub fn enrich_with_stub(
    record: &DocumentationRecord,
    stub: &StubSignatureInfo,
) -> DocumentationRecord {
    let mut merged = record.clone();
    if merged.signature.is_none() {
        merged.signature = stub.signature.clone();
    }
    for hint in &stub.protocol_hints {
        let badge = match hint.split_once(": ") {
            Some((protocol, text)) => Badge::new(protocol).with_tooltip(text),
            None => Badge::new(hint.as_str()),
        };
        merged = merged.with_badge(badge);
    }
    merged
}

pub fn enrich_with_runtime(record: &DocumentationRecord, info: &RuntimeInfo) -> DocumentationRecord {
    let mut merged = record.clone();
    if merged.signature.is_none() {
        merged.signature = info.signature.clone().filter(|s| !s.trim().is_empty());
    }
    if merged.kind.is_none() {
        merged.kind = info.kind.clone();
    }
    if merged.url.is_none() {
        merged.url = info.url.clone();
    }
    match info.parsed_docstring() {
        Some(doc) => enrich_with_docstring(&merged, &doc),
        None => merged,
    }
}
