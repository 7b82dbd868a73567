//! Streaming scan of `.pyi` stub files for one symbol's signature(s).
//!
//! The file is read line by line; only a stack of enclosing classes and the
//! lines of the signature being collected are kept in memory.

use std::io::BufRead;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

use crate::docstring::{indent_of, strip_indent};
use crate::errors::HoverResult;
use crate::models::StubSignatureInfo;

/// Lower-case names accepted as owning types in `owner.method` targets.
pub const WELL_KNOWN_TYPES: &[&str] = &[
    "object",
    "type",
    "str",
    "bytes",
    "bytearray",
    "memoryview",
    "int",
    "float",
    "complex",
    "bool",
    "list",
    "tuple",
    "dict",
    "set",
    "frozenset",
    "range",
    "slice",
    "property",
    "enumerate",
    "zip",
    "map",
    "filter",
    "reversed",
    "super",
];

/// Structural protocols and the hint shown when a signature mentions them.
pub const PROTOCOL_HINTS: &[(&str, &str)] = &[
    ("SupportsIndex", "supports indexing (__index__)"),
    ("SupportsInt", "convertible with int()"),
    ("SupportsFloat", "convertible with float()"),
    ("SupportsAbs", "supports abs()"),
    ("SupportsRichComparison", "supports ordering comparisons"),
    ("SupportsKeysAndGetItem", "has keys() and item access"),
    ("SupportsLenAndGetItem", "has len() and item access"),
    ("SupportsRead", "has a read() method"),
    ("SupportsWrite", "has a write() method"),
    ("Iterable", "supports iteration"),
    ("Iterator", "is an iterator"),
    ("Sized", "has a length (len())"),
    ("Container", "supports membership tests (in)"),
    ("Collection", "sized, iterable container"),
    ("Sequence", "supports indexing and slicing"),
    ("Mapping", "read-only mapping"),
    ("Hashable", "is hashable"),
    ("Callable", "is callable"),
    ("Awaitable", "can be awaited"),
];

static PROTOCOL_RE: LazyLock<Regex> = LazyLock::new(|| {
    let names: Vec<&str> = PROTOCOL_HINTS.iter().map(|(name, _)| *name).collect();
    Regex::new(&format!(r"\b(?:{})\b", names.join("|"))).unwrap()
});

/// `pkg.mod.Owner.name` split into the optional owning type and the name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StubTarget {
    pub owner: Option<String>,
    pub name: String,
}

/// Owner segments must look like a type: capitalised, or a built-in type.
pub fn is_owner_type(segment: &str) -> bool {
    segment.chars().next().is_some_and(char::is_uppercase) || WELL_KNOWN_TYPES.contains(&segment)
}

pub fn decompose_target(qualified: &str) -> StubTarget {
    let segments: Vec<&str> = qualified.split('.').filter(|s| !s.is_empty()).collect();
    let name = segments.last().copied().unwrap_or_default().to_string();
    let owner = match segments.len() {
        n if n >= 2 && is_owner_type(segments[n - 2]) => Some(segments[n - 2].to_string()),
        _ => None,
    };
    StubTarget { owner, name }
}

/// Hints for every protocol the signature text mentions, in table order.
pub fn protocol_hints(signature: &str) -> Vec<String> {
    let found: Vec<&str> = PROTOCOL_RE
        .find_iter(signature)
        .map(|m| m.as_str())
        .collect();
    PROTOCOL_HINTS
        .iter()
        .filter(|(name, _)| found.contains(name))
        .map(|(name, hint)| format!("{name}: {hint}"))
        .collect()
}

fn starts_definition(trimmed: &str) -> bool {
    trimmed.starts_with("def ")
        || trimmed.starts_with("async def ")
        || trimmed.starts_with("class ")
        || trimmed.starts_with('@')
}

fn class_name(trimmed: &str) -> Option<&str> {
    let rest = trimmed.strip_prefix("class ")?;
    let end = rest
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    Some(&rest[..end]).filter(|n| !n.is_empty())
}

fn def_name(trimmed: &str) -> Option<&str> {
    let rest = trimmed
        .strip_prefix("async def ")
        .or_else(|| trimmed.strip_prefix("def "))?;
    let end = rest.find(['(', '[', ':', ' ']).unwrap_or(rest.len());
    Some(rest[..end].trim()).filter(|n| !n.is_empty())
}

fn closes_signature(trimmed: &str) -> bool {
    let code = strip_comment(trimmed);
    code.ends_with(':') || code.ends_with("...")
}

/// Net change in bracket nesting over one line, ignoring brackets inside
/// string literals and comments.
fn bracket_delta(line: &str) -> i32 {
    let mut depth = 0;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for c in line.chars() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '#' => break,
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            _ => {}
        }
    }
    depth
}

fn strip_comment(line: &str) -> &str {
    match line.find("  #") {
        Some(pos) => line[..pos].trim_end(),
        None => line.trim_end(),
    }
}

/// Drop a trailing `...` body and the colon before it.
pub fn clean_signature(text: &str) -> String {
    let mut s = strip_comment(text.trim_end());
    if let Some(rest) = s.strip_suffix("...") {
        s = rest.trim_end();
    }
    if let Some(rest) = s.strip_suffix(':') {
        s = rest.trim_end();
    }
    s.to_string()
}

struct Collection {
    indent: usize,
    depth: i32,
    lines: Vec<String>,
}

impl Collection {
    /// Append a line; true once brackets are balanced and the header ends.
    fn push(&mut self, line: &str, trimmed: &str) -> bool {
        self.lines.push(line.to_string());
        self.depth += bracket_delta(trimmed);
        self.depth <= 0 && closes_signature(trimmed)
    }
}

/// Line-fed state machine; see [`parse_stub_source`].
pub struct StubScanner {
    target: StubTarget,
    stack: Vec<(String, usize)>,
    collecting: Option<Collection>,
    overloads: Vec<String>,
}

impl StubScanner {
    pub fn new(qualified_symbol: &str) -> Self {
        Self {
            target: decompose_target(qualified_symbol),
            stack: Vec::new(),
            collecting: None,
            overloads: Vec::new(),
        }
    }

    pub fn feed(&mut self, line: &str) {
        let trimmed = line.trim();
        let indent = indent_of(line);

        if let Some(collection) = self.collecting.as_mut() {
            let terminates = !trimmed.is_empty()
                && indent <= collection.indent
                && starts_definition(trimmed);
            if !terminates {
                if !trimmed.is_empty() && collection.push(line, trimmed) {
                    self.store();
                }
                return;
            }
            // The terminating line is handled below; it may itself match.
            self.store();
        }

        if trimmed.is_empty() || trimmed.starts_with('#') {
            return;
        }
        while self.stack.last().is_some_and(|(_, level)| *level >= indent) {
            self.stack.pop();
        }
        if indent == 0 && def_name(trimmed).is_some() {
            self.stack.clear();
        }

        if self.is_match(trimmed) {
            let mut collection = Collection {
                indent,
                depth: 0,
                lines: Vec::new(),
            };
            let complete = collection.push(line, trimmed);
            self.collecting = Some(collection);
            if complete {
                self.store();
            }
        }

        if let Some(name) = class_name(trimmed) {
            self.stack.push((name.to_string(), indent));
        }
    }

    fn is_match(&self, trimmed: &str) -> bool {
        let name = def_name(trimmed).or_else(|| class_name(trimmed));
        if name != Some(self.target.name.as_str()) {
            return false;
        }
        match (&self.target.owner, self.stack.last()) {
            (Some(owner), Some((top, _))) => owner == top,
            (Some(_), None) => false,
            (None, top) => top.is_none(),
        }
    }

    fn store(&mut self) {
        let Some(collection) = self.collecting.take() else {
            return;
        };
        let text = collection
            .lines
            .iter()
            .map(|l| strip_indent(l, collection.indent).trim_end())
            .collect::<Vec<_>>()
            .join("\n");
        let cleaned = clean_signature(&text);
        if !cleaned.is_empty() {
            self.overloads.push(cleaned);
        }
    }

    pub fn finish(mut self) -> Option<StubSignatureInfo> {
        self.store();
        if self.overloads.is_empty() {
            return None;
        }
        let signature = self.overloads.join("\n");
        Some(StubSignatureInfo {
            protocol_hints: protocol_hints(&signature),
            signature: Some(signature),
            overloads: self.overloads,
        })
    }
}

/// Scan stub source text held in memory.
pub fn parse_stub_source(source: &str, qualified_symbol: &str) -> Option<StubSignatureInfo> {
    let mut scanner = StubScanner::new(qualified_symbol);
    for line in source.lines() {
        scanner.feed(line);
    }
    scanner.finish()
}

/// Blocking variant over any buffered reader, for callers without a runtime.
pub fn parse_stub_reader<R: BufRead>(
    reader: R,
    qualified_symbol: &str,
) -> HoverResult<Option<StubSignatureInfo>> {
    let mut scanner = StubScanner::new(qualified_symbol);
    for line in reader.lines() {
        scanner.feed(&line?);
    }
    Ok(scanner.finish())
}

async fn scan_file(path: &Path, qualified_symbol: &str) -> HoverResult<Option<StubSignatureInfo>> {
    let file = File::open(path).await?;
    let mut lines = BufReader::new(file).lines();
    let mut scanner = StubScanner::new(qualified_symbol);
    while let Some(line) = lines.next_line().await? {
        scanner.feed(&line);
    }
    Ok(scanner.finish())
}

/// Stream a stub file from disk. Unreadable files and misses yield `None`.
pub async fn parse_stub_file(path: &Path, qualified_symbol: &str) -> Option<StubSignatureInfo> {
    match scan_file(path, qualified_symbol).await {
        Ok(Some(info)) => Some(info),
        Ok(None) => {
            debug!("no stub signature for {qualified_symbol} in {}", path.display());
            None
        }
        Err(e) => {
            warn!("failed to read stub file {}: {e}", path.display());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUILTINS: &str = r#"import sys
from typing import overload, SupportsIndex
from _typeshed import SupportsKeysAndGetItem

class object:
    def __init__(self) -> None: ...
    def __eq__(self, value: object, /) -> bool: ...

class str(Sequence[str]):
    @overload
    def __new__(cls, object: object = ...) -> Self: ...
    @overload
    def __new__(cls, object: ReadableBuffer, encoding: str = ..., errors: str = ...) -> Self: ...
    def join(self, iterable: Iterable[str], /) -> str: ...
    def split(
        self,
        sep: str | None = None,
        maxsplit: SupportsIndex = -1,
    ) -> list[str]: ...

    class Inner:
        def join(self) -> None: ...

def len(obj: Sized, /) -> int: ...

class dict(MutableMapping[_KT, _VT]):
    def update(self, m: SupportsKeysAndGetItem[_KT, _VT], /, **kwargs: _VT) -> None: ...

@overload
def foo(x: int) -> int: ...
@overload
def foo(x: str) -> str: ...
def bar() -> None: ...
"#;

    #[test]
    fn test_two_overloads() {
        let info = parse_stub_source(BUILTINS, "mod.foo").unwrap();
        assert_eq!(info.overloads.len(), 2);
        assert_eq!(info.overloads[0], "def foo(x: int) -> int");
        assert_eq!(info.overloads[1], "def foo(x: str) -> str");
        assert_eq!(
            info.signature.as_deref(),
            Some("def foo(x: int) -> int\ndef foo(x: str) -> str")
        );
    }

    #[test]
    fn test_method_on_builtin_type() {
        let info = parse_stub_source(BUILTINS, "builtins.str.join").unwrap();
        assert_eq!(info.overloads, vec!["def join(self, iterable: Iterable[str], /) -> str"]);
        assert_eq!(info.protocol_hints, vec!["Iterable: supports iteration"]);
    }

    #[test]
    fn test_multiline_signature() {
        let info = parse_stub_source(BUILTINS, "str.split").unwrap();
        assert_eq!(
            info.signature.as_deref(),
            Some("def split(\n    self,\n    sep: str | None = None,\n    maxsplit: SupportsIndex = -1,\n) -> list[str]")
        );
        assert_eq!(
            info.protocol_hints,
            vec!["SupportsIndex: supports indexing (__index__)"]
        );
    }

    #[test]
    fn test_multiline_signature_with_ellipsis_default() {
        let src = "def open(\n    file: str, mode: str = ...\n) -> IO[str]: ...\n";
        let info = parse_stub_source(src, "io.open").unwrap();
        assert_eq!(
            info.signature.as_deref(),
            Some("def open(\n    file: str, mode: str = ...\n) -> IO[str]")
        );
        assert_eq!(info.overloads.len(), 1);
    }

    #[test]
    fn test_bracket_delta_skips_strings_and_comments() {
        assert_eq!(bracket_delta("def f("), 1);
        assert_eq!(bracket_delta("sep: str = \"(\","), 0);
        assert_eq!(bracket_delta(") -> dict[str, int]: ...  # (x"), -1);
    }

    #[test]
    fn test_overloaded_method_in_class() {
        let info = parse_stub_source(BUILTINS, "str.__new__").unwrap();
        assert_eq!(info.overloads.len(), 2);
        assert!(info.overloads[1].contains("encoding: str"));
    }

    #[test]
    fn test_free_function_and_module_qualifier() {
        let info = parse_stub_source(BUILTINS, "builtins.len").unwrap();
        assert_eq!(info.signature.as_deref(), Some("def len(obj: Sized, /) -> int"));
        assert_eq!(info.protocol_hints, vec!["Sized: has a length (len())"]);
        // A method name is not matched at module level.
        assert!(parse_stub_source(BUILTINS, "builtins.update").is_none());
    }

    #[test]
    fn test_dunder_on_object() {
        let info = parse_stub_source(BUILTINS, "object.__eq__").unwrap();
        assert_eq!(info.overloads, vec!["def __eq__(self, value: object, /) -> bool"]);
    }

    #[test]
    fn test_class_target() {
        let info = parse_stub_source(BUILTINS, "builtins.dict").unwrap();
        assert_eq!(info.signature.as_deref(), Some("class dict(MutableMapping[_KT, _VT])"));
        let update = parse_stub_source(BUILTINS, "dict.update").unwrap();
        assert_eq!(
            update.protocol_hints,
            vec!["SupportsKeysAndGetItem: has keys() and item access"]
        );
    }

    #[test]
    fn test_nested_class_scoping() {
        let info = parse_stub_source(BUILTINS, "Inner.join").unwrap();
        assert_eq!(info.overloads, vec!["def join(self) -> None"]);
    }

    #[test]
    fn test_missing_symbol() {
        assert!(parse_stub_source(BUILTINS, "nothing_here").is_none());
        assert!(parse_stub_source("", "foo").is_none());
    }

    #[test]
    fn test_decompose_target() {
        assert_eq!(
            decompose_target("os.path.join"),
            StubTarget { owner: None, name: "join".into() }
        );
        assert_eq!(
            decompose_target("collections.OrderedDict.popitem"),
            StubTarget { owner: Some("OrderedDict".into()), name: "popitem".into() }
        );
        assert_eq!(
            decompose_target("list.append"),
            StubTarget { owner: Some("list".into()), name: "append".into() }
        );
    }

    #[test]
    fn test_blocking_reader_matches_source_scan() {
        let from_reader = parse_stub_reader(BUILTINS.as_bytes(), "str.split").unwrap();
        assert_eq!(from_reader, parse_stub_source(BUILTINS, "str.split"));
    }

    #[tokio::test]
    async fn test_parse_stub_file_streams_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("builtins.pyi");
        std::fs::write(&path, BUILTINS).unwrap();
        let info = parse_stub_file(&path, "mod.foo").await.unwrap();
        assert_eq!(info.overloads.len(), 2);
        assert!(parse_stub_file(&dir.path().join("missing.pyi"), "foo").await.is_none());
    }
}
