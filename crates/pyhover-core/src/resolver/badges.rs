//! Badges and the related-special-method table attached to resolved records.

use crate::models::{Badge, DocumentationRecord, SymbolKey};
use crate::registry::RegistryInfo;
use crate::resolver::key::is_dunder;

/// Special methods worth showing next to the one being hovered.
pub const RELATED_DUNDERS: &[(&str, &[&str])] = &[
    ("__init__", &["__new__", "__del__", "__repr__", "__str__"]),
    ("__new__", &["__init__", "__init_subclass__"]),
    ("__del__", &["__init__"]),
    ("__str__", &["__repr__", "__format__", "__bytes__"]),
    ("__repr__", &["__str__", "__format__"]),
    ("__format__", &["__str__", "__repr__"]),
    ("__eq__", &["__ne__", "__lt__", "__le__", "__gt__", "__ge__", "__hash__"]),
    ("__ne__", &["__eq__", "__hash__"]),
    ("__lt__", &["__le__", "__gt__", "__ge__", "__eq__"]),
    ("__le__", &["__lt__", "__gt__", "__ge__", "__eq__"]),
    ("__gt__", &["__ge__", "__lt__", "__le__", "__eq__"]),
    ("__ge__", &["__gt__", "__lt__", "__le__", "__eq__"]),
    ("__hash__", &["__eq__"]),
    ("__add__", &["__radd__", "__iadd__", "__sub__", "__mul__"]),
    ("__sub__", &["__rsub__", "__isub__", "__add__"]),
    ("__mul__", &["__rmul__", "__imul__", "__matmul__"]),
    ("__len__", &["__bool__", "__iter__", "__contains__"]),
    ("__iter__", &["__next__", "__reversed__", "__len__"]),
    ("__next__", &["__iter__"]),
    ("__getitem__", &["__setitem__", "__delitem__", "__missing__", "__len__"]),
    ("__setitem__", &["__getitem__", "__delitem__"]),
    ("__contains__", &["__iter__", "__getitem__"]),
    ("__enter__", &["__exit__"]),
    ("__exit__", &["__enter__"]),
    ("__aenter__", &["__aexit__"]),
    ("__aexit__", &["__aenter__"]),
    ("__call__", &["__init__"]),
    ("__getattr__", &["__getattribute__", "__setattr__", "__delattr__"]),
    ("__bool__", &["__len__"]),
];

pub fn related_dunders(name: &str) -> Vec<String> {
    RELATED_DUNDERS
        .iter()
        .find(|(dunder, _)| *dunder == name)
        .map(|(_, related)| related.iter().map(|r| r.to_string()).collect())
        .unwrap_or_default()
}

/// Badges describing what kind of symbol a key names.
pub fn badges_for(key: &SymbolKey, record: &DocumentationRecord) -> Vec<Badge> {
    let mut badges = Vec::new();
    if matches!(record.kind.as_deref(), Some("keyword" | "soft keyword")) {
        badges.push(Badge::new("keyword").with_tooltip("Python language keyword"));
    }
    if key.is_builtins() {
        badges.push(Badge::new("builtin").with_tooltip("Available without import"));
    }
    if key.is_stdlib {
        badges.push(Badge::new("stdlib").with_tooltip("Python standard library"));
    }
    if is_dunder(key.leaf_name()) {
        badges.push(Badge::new("dunder").with_tooltip("Special method, invoked implicitly"));
    }
    badges
}

pub fn version_badge(info: &RegistryInfo) -> Option<Badge> {
    let version = info.version.as_deref().map(str::trim).filter(|v| !v.is_empty())?;
    Some(Badge::new(format!("v{version}")).with_tooltip("Latest release on PyPI"))
}

/// Copy of `record` with kind badges and related special methods attached.
pub fn decorate(record: DocumentationRecord, key: &SymbolKey) -> DocumentationRecord {
    let badges = badges_for(key, &record);
    let mut decorated = badges.into_iter().fold(record, DocumentationRecord::with_badge);
    if decorated.related.is_empty() && is_dunder(key.leaf_name()) {
        decorated.related = related_dunders(key.leaf_name());
    }
    decorated
}
