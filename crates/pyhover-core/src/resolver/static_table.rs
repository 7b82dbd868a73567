//! Keywords and built-in constants with pre-baked reference URLs.

use crate::config::ResolverConfig;
use crate::guards::CONFIDENCE_STATIC;
use crate::models::{DocSource, DocumentationRecord, SymbolKey, BUILTINS_MODULE};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StaticKind {
    Keyword,
    SoftKeyword,
    Constant,
}

impl StaticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaticKind::Keyword => "keyword",
            StaticKind::SoftKeyword => "soft keyword",
            StaticKind::Constant => "constant",
        }
    }
}

#[derive(Debug)]
pub struct StaticEntry {
    pub name: &'static str,
    pub kind: StaticKind,
    /// Path under the versioned docs root.
    pub path: &'static str,
    pub summary: &'static str,
}

const fn kw(name: &'static str, path: &'static str, summary: &'static str) -> StaticEntry {
    StaticEntry {
        name,
        kind: StaticKind::Keyword,
        path,
        summary,
    }
}

const fn constant(name: &'static str, summary: &'static str) -> StaticEntry {
    StaticEntry {
        name,
        kind: StaticKind::Constant,
        path: "library/constants.html#$",
        summary,
    }
}

pub static STATIC_TABLE: &[StaticEntry] = &[
    kw("if", "reference/compound_stmts.html#the-if-statement", "Conditional execution."),
    kw("elif", "reference/compound_stmts.html#the-if-statement", "Further condition of an `if` statement."),
    kw("else", "reference/compound_stmts.html#the-if-statement", "Branch taken when no preceding condition held."),
    kw("for", "reference/compound_stmts.html#the-for-statement", "Iterate over the elements of an iterable."),
    kw("while", "reference/compound_stmts.html#the-while-statement", "Repeat while an expression is true."),
    kw("try", "reference/compound_stmts.html#the-try-statement", "Exception handlers and cleanup code for a group of statements."),
    kw("except", "reference/compound_stmts.html#except-clause", "Handle exceptions raised in the `try` suite."),
    kw("finally", "reference/compound_stmts.html#finally-clause", "Cleanup code that always runs when leaving the `try` statement."),
    kw("with", "reference/compound_stmts.html#the-with-statement", "Wrap a block with methods defined by a context manager."),
    kw("as", "reference/compound_stmts.html#the-with-statement", "Bind the target of a `with`, `except` or `import` clause."),
    kw("def", "reference/compound_stmts.html#function-definitions", "Define a function."),
    kw("class", "reference/compound_stmts.html#class-definitions", "Define a class."),
    kw("async", "reference/compound_stmts.html#coroutines", "Define a coroutine or an asynchronous `for`/`with`."),
    kw("await", "reference/expressions.html#await-expression", "Suspend a coroutine until an awaitable completes."),
    kw("lambda", "reference/expressions.html#lambda", "Create an anonymous function."),
    kw("and", "reference/expressions.html#boolean-operations", "Boolean conjunction with short-circuit evaluation."),
    kw("or", "reference/expressions.html#boolean-operations", "Boolean disjunction with short-circuit evaluation."),
    kw("not", "reference/expressions.html#boolean-operations", "Boolean negation."),
    kw("in", "reference/expressions.html#membership-test-operations", "Membership test."),
    kw("is", "reference/expressions.html#is-not", "Object identity test."),
    kw("return", "reference/simple_stmts.html#the-return-statement", "Leave the current function call with a value."),
    kw("yield", "reference/simple_stmts.html#the-yield-statement", "Produce a value from a generator."),
    kw("pass", "reference/simple_stmts.html#the-pass-statement", "A null operation."),
    kw("break", "reference/simple_stmts.html#the-break-statement", "Terminate the nearest enclosing loop."),
    kw("continue", "reference/simple_stmts.html#the-continue-statement", "Continue with the next cycle of the nearest enclosing loop."),
    kw("import", "reference/simple_stmts.html#the-import-statement", "Find and load a module."),
    kw("from", "reference/simple_stmts.html#the-import-statement", "Import names from a module."),
    kw("global", "reference/simple_stmts.html#the-global-statement", "Declare names as module globals."),
    kw("nonlocal", "reference/simple_stmts.html#the-nonlocal-statement", "Bind names from the nearest enclosing function scope."),
    kw("del", "reference/simple_stmts.html#the-del-statement", "Delete names, attributes or items."),
    kw("raise", "reference/simple_stmts.html#the-raise-statement", "Raise an exception."),
    kw("assert", "reference/simple_stmts.html#the-assert-statement", "Insert a debugging assertion."),
    StaticEntry {
        name: "match",
        kind: StaticKind::SoftKeyword,
        path: "reference/compound_stmts.html#the-match-statement",
        summary: "Structural pattern matching.",
    },
    StaticEntry {
        name: "case",
        kind: StaticKind::SoftKeyword,
        path: "reference/compound_stmts.html#the-match-statement",
        summary: "A pattern and block inside a `match` statement.",
    },
    constant("None", "The sole value of `NoneType`, used for the absence of a value."),
    constant("True", "The true value of the `bool` type."),
    constant("False", "The false value of the `bool` type."),
    constant("Ellipsis", "The `...` singleton."),
    constant("NotImplemented", "Returned by binary special methods for unsupported operands."),
    constant("__debug__", "True unless Python was started with `-O`."),
];

pub fn lookup(name: &str) -> Option<&'static StaticEntry> {
    STATIC_TABLE.iter().find(|entry| entry.name == name)
}

/// Keywords only match symbols that can actually be a keyword: the
/// built-in namespace or a bare name, never `re.match`.
pub fn static_record(key: &SymbolKey, config: &ResolverConfig) -> Option<DocumentationRecord> {
    let bare = key.module.is_empty() || key.module == BUILTINS_MODULE || key.module == key.qualified_name;
    if !bare {
        return None;
    }
    let entry = lookup(&key.qualified_name).or_else(|| lookup(&key.name))?;
    let path = entry.path.replace('$', entry.name);
    let url = format!("{}{}", config.stdlib_root(), path);
    Some(
        DocumentationRecord::new(entry.name, DocSource::Static, CONFIDENCE_STATIC)
            .with_kind(entry.kind.as_str())
            .with_summary(entry.summary)
            .with_url(url),
    )
}
