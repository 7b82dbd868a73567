//! Shared typed models used across the key normalizer, the fetchers, the
//! parsers and the resolver cascade.

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Module name of the built-in namespace.
pub const BUILTINS_MODULE: &str = "builtins";

/// Synthetic owner some hosts report for dunder methods.
pub const SYNTHETIC_MODULE_OWNER: &str = "module";

/// Canonical owner under which documentation indexes list dunder methods.
pub const DUNDER_OWNER: &str = "object";

/// Symbol-name -> record mapping built from one package inventory.
pub type InventoryMap = HashMap<String, DocumentationRecord>;

// ---------------------------------------------------------------------------
// 1. RawSymbol
// ---------------------------------------------------------------------------

/// A partially-known symbol as reported by the host or the runtime helper.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSymbol {
    pub name: String,
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub qualified_name: Option<String>,
    #[serde(default)]
    pub is_stdlib: bool,
    #[serde(default)]
    pub version: Option<String>,
}

impl RawSymbol {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    pub fn with_qualified_name(mut self, qualified_name: impl Into<String>) -> Self {
        self.qualified_name = Some(qualified_name.into());
        self
    }

    pub fn stdlib(mut self, is_stdlib: bool) -> Self {
        self.is_stdlib = is_stdlib;
        self
    }
}

// ---------------------------------------------------------------------------
// 2. SymbolKey
// ---------------------------------------------------------------------------

/// Canonical lookup key produced by [`crate::resolver::key::normalize`].
///
/// `qualified_name` is never empty and `package` is always the first dotted
/// segment of `module` (or `"builtins"`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SymbolKey {
    pub package: String,
    pub module: String,
    pub name: String,
    pub qualified_name: String,
    pub is_stdlib: bool,
    pub version: Option<String>,
}

impl SymbolKey {
    pub fn is_builtins(&self) -> bool {
        self.module == BUILTINS_MODULE
    }

    /// `module.qualified_name`, without doubling a prefix the qualified name
    /// already carries.
    pub fn full_name(&self) -> String {
        if self.module.is_empty()
            || self.qualified_name == self.module
            || self
                .qualified_name
                .starts_with(&format!("{}.", self.module))
        {
            self.qualified_name.clone()
        } else {
            format!("{}.{}", self.module, self.qualified_name)
        }
    }

    /// Last dotted segment of the qualified name.
    pub fn leaf_name(&self) -> &str {
        self.qualified_name
            .rsplit('.')
            .next()
            .unwrap_or(&self.qualified_name)
    }

    /// Version label used in cache keys.
    pub fn version_label(&self) -> &str {
        self.version.as_deref().unwrap_or("latest")
    }
}

// ---------------------------------------------------------------------------
// 3. DocumentationRecord
// ---------------------------------------------------------------------------

/// Which tier produced a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocSource {
    Static,
    Sphinx,
    #[serde(rename = "pypi")]
    PyPI,
    DevDocs,
    Runtime,
    Local,
    Fallback,
    Unknown,
}

impl DocSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocSource::Static => "static",
            DocSource::Sphinx => "sphinx",
            DocSource::PyPI => "pypi",
            DocSource::DevDocs => "devdocs",
            DocSource::Runtime => "runtime",
            DocSource::Local => "local",
            DocSource::Fallback => "fallback",
            DocSource::Unknown => "unknown",
        }
    }
}

/// A single documented parameter.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, type_: Option<String>) -> Self {
        Self {
            name: name.into(),
            type_,
            ..Default::default()
        }
    }

    /// Append a continuation line to the description, space-joined.
    pub fn append_description(&mut self, text: &str) {
        append_text(&mut self.description, text);
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnInfo {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ReturnInfo {
    pub fn append_description(&mut self, text: &str) {
        append_text(&mut self.description, text);
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionInfo {
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ExceptionInfo {
    pub fn append_description(&mut self, text: &str) {
        append_text(&mut self.description, text);
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
}

impl Badge {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            tooltip: None,
        }
    }

    pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }
}

/// The structured documentation answer for one symbol.
///
/// Records are built once per resolution; combining tiers produces a new
/// record rather than mutating one another tier handed out.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DocumentationRecord {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<ReturnInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub raises: Vec<ExceptionInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub links: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub badges: Vec<Badge>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related: Vec<String>,
    pub source: DocSource,
    pub confidence: f64,
}

impl DocumentationRecord {
    pub fn new(title: impl Into<String>, source: DocSource, confidence: f64) -> Self {
        Self {
            title: title.into(),
            kind: None,
            signature: None,
            summary: None,
            parameters: Vec::new(),
            returns: None,
            raises: Vec::new(),
            examples: Vec::new(),
            url: None,
            links: BTreeMap::new(),
            badges: Vec::new(),
            related: Vec::new(),
            source,
            confidence: crate::guards::clamp_confidence(confidence),
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_link(mut self, label: impl Into<String>, url: impl Into<String>) -> Self {
        self.links.insert(label.into(), url.into());
        self
    }

    pub fn with_badge(mut self, badge: Badge) -> Self {
        if !self.badges.iter().any(|b| b.label == badge.label) {
            self.badges.push(badge);
        }
        self
    }

    /// Fragment of `url` after `#`, if any.
    pub fn anchor(&self) -> Option<&str> {
        let url = self.url.as_deref()?;
        let (_, fragment) = url.split_once('#')?;
        if fragment.is_empty() {
            None
        } else {
            Some(fragment)
        }
    }
}

// ---------------------------------------------------------------------------
// 4. InventoryItem
// ---------------------------------------------------------------------------

/// One line of a decompressed inventory body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub name: String,
    pub domain_role: String,
    pub priority: i32,
    pub uri: String,
    pub display_name: String,
}

impl InventoryItem {
    pub fn domain(&self) -> &str {
        self.domain_role
            .split_once(':')
            .map(|(d, _)| d)
            .unwrap_or(&self.domain_role)
    }

    pub fn role(&self) -> &str {
        self.domain_role
            .split_once(':')
            .map(|(_, r)| r)
            .unwrap_or(&self.domain_role)
    }

    pub fn is_python_domain(&self) -> bool {
        self.domain() == "py"
    }

    /// URI with the trailing `$` shorthand replaced by the entry name.
    pub fn expanded_uri(&self) -> String {
        match self.uri.strip_suffix('$') {
            Some(prefix) => format!("{prefix}{}", self.name),
            None => self.uri.clone(),
        }
    }

    /// Absolute URL of this entry under the inventory's base URL.
    pub fn resolve_url(&self, base_url: &str) -> String {
        join_url(base_url, &self.expanded_uri())
    }

    /// Display name, where `-` means "same as name".
    pub fn title(&self) -> &str {
        if self.display_name.is_empty() || self.display_name == "-" {
            &self.name
        } else {
            &self.display_name
        }
    }

    /// Human-readable kind derived from the role.
    pub fn kind(&self) -> &str {
        match (self.domain(), self.role()) {
            ("py", "classmethod" | "staticmethod" | "method") => "method",
            ("py", "function") => "function",
            ("py", "class") => "class",
            ("py", "module") => "module",
            ("py", "exception") => "exception",
            ("py", "attribute") => "attribute",
            ("py", "property") => "property",
            ("py", "data") => "data",
            ("std", "label") => "section",
            ("std", "doc") => "page",
            ("std", "term") => "term",
            (_, role) => role,
        }
    }
}

/// Simple path join: exactly one `/` between `base` and `path`.
pub fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        format!("{base}/")
    } else {
        format!("{base}/{path}")
    }
}

// ---------------------------------------------------------------------------
// 5. ParsedDocstring / StubSignatureInfo
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedDocstring {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<ReturnInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub raises: Vec<ExceptionInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl ParsedDocstring {
    pub fn is_empty(&self) -> bool {
        self.summary.is_none()
            && self.description.is_none()
            && self.parameters.is_empty()
            && self.returns.is_none()
            && self.raises.is_empty()
            && self.examples.is_empty()
            && self.notes.is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StubSignatureInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overloads: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub protocol_hints: Vec<String>,
}

// ---------------------------------------------------------------------------
// 6. CacheEntry
// ---------------------------------------------------------------------------

/// Envelope stored in the external cache: payload plus write time (epoch ms).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub data: T,
    pub timestamp: u64,
}

impl<T> CacheEntry<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            timestamp: now_ms(),
        }
    }

    /// Expiry is the reader's decision: `now - timestamp <= max_age`.
    pub fn is_fresh(&self, max_age: Duration) -> bool {
        now_ms().saturating_sub(self.timestamp) <= max_age.as_millis() as u64
    }
}

pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn append_text(slot: &mut Option<String>, text: &str) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    match slot {
        Some(existing) if !existing.is_empty() => {
            existing.push(' ');
            existing.push_str(text);
        }
        _ => *slot = Some(text.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, role: &str, uri: &str, display: &str) -> InventoryItem {
        InventoryItem {
            name: name.to_string(),
            domain_role: role.to_string(),
            priority: 1,
            uri: uri.to_string(),
            display_name: display.to_string(),
        }
    }

    #[test]
    fn test_inventory_item_dollar_expansion() {
        let it = item("json.dumps", "py:function", "library/json.html#$", "-");
        assert_eq!(it.expanded_uri(), "library/json.html#json.dumps");
        assert_eq!(it.title(), "json.dumps");
        assert_eq!(it.kind(), "function");
    }

    #[test]
    fn test_inventory_item_resolve_url_joins_once() {
        let it = item(
            "pandas.DataFrame",
            "py:class",
            "api/pandas.DataFrame.html",
            "-",
        );
        assert_eq!(
            it.resolve_url("https://pandas.pydata.org/docs/"),
            "https://pandas.pydata.org/docs/api/pandas.DataFrame.html"
        );
    }

    #[test]
    fn test_inventory_item_domain_split() {
        let it = item("glossary term", "std:term", "glossary.html#term-x", "Glossary term");
        assert_eq!(it.domain(), "std");
        assert_eq!(it.role(), "term");
        assert!(!it.is_python_domain());
        assert_eq!(it.title(), "Glossary term");
    }

    #[test]
    fn test_symbol_key_full_name() {
        let key = SymbolKey {
            package: "os".into(),
            module: "os.path".into(),
            name: "join".into(),
            qualified_name: "join".into(),
            is_stdlib: true,
            version: None,
        };
        assert_eq!(key.full_name(), "os.path.join");
        assert_eq!(key.version_label(), "latest");

        let already = SymbolKey {
            qualified_name: "os.path.join".into(),
            ..key
        };
        assert_eq!(already.full_name(), "os.path.join");
    }

    #[test]
    fn test_record_anchor() {
        let rec = DocumentationRecord::new("x", DocSource::Sphinx, 1.0)
            .with_url("https://docs.python.org/3/library/json.html#json.dumps");
        assert_eq!(rec.anchor(), Some("json.dumps"));
        let bare = DocumentationRecord::new("x", DocSource::Sphinx, 1.0)
            .with_url("https://docs.python.org/3/library/json.html#");
        assert_eq!(bare.anchor(), None);
    }

    #[test]
    fn test_record_serde_uses_lowercase_source() {
        let rec = DocumentationRecord::new("len", DocSource::PyPI, 0.75);
        let json = serde_json::to_string(&rec).unwrap();
        assert!(json.contains("\"source\":\"pypi\""));
        let back: DocumentationRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rec);
    }

    #[test]
    fn test_cache_entry_freshness() {
        let mut entry = CacheEntry::new(1u8);
        assert!(entry.is_fresh(Duration::from_secs(1)));
        entry.timestamp = now_ms().saturating_sub(10_000);
        assert!(!entry.is_fresh(Duration::from_secs(5)));
    }

    #[test]
    fn test_parameter_append_description() {
        let mut p = Parameter::new("x", Some("int".into()));
        p.append_description("the input");
        p.append_description("  value ");
        assert_eq!(p.description.as_deref(), Some("the input value"));
    }
}
