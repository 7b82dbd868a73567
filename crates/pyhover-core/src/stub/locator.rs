//! Map dotted module names to `.pyi` files under one or more stub roots.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

use super::parser::parse_stub_file;
use crate::models::StubSignatureInfo;

/// Hidden directories and typeshed's `@python2` style trees are skipped.
fn is_skipped(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.') || name.starts_with('@'))
}

/// `pkg/sub/__init__.pyi` → `pkg.sub`, `pkg/mod.pyi` → `pkg.mod`.
pub fn module_name_for(relative: &Path) -> Option<String> {
    let mut parts: Vec<String> = relative
        .components()
        .map(|c| match c {
            Component::Normal(part) => part.to_str().map(str::to_string),
            _ => None,
        })
        .collect::<Option<_>>()?;
    let file = parts.pop()?;
    let stem = file.strip_suffix(".pyi")?;
    if stem != "__init__" {
        parts.push(stem.to_string());
    }
    if parts.is_empty() || parts.iter().any(|p| p.contains('.') || p.contains('-')) {
        return None;
    }
    Some(parts.join("."))
}

#[derive(Debug, Default)]
pub struct StubLocator {
    index: HashMap<String, PathBuf>,
}

impl StubLocator {
    /// Index every root in order; the first root to provide a module wins.
    pub fn new<P: AsRef<Path>>(roots: &[P]) -> Self {
        let mut locator = Self::default();
        for root in roots {
            locator.add_root(root.as_ref());
        }
        locator
    }

    /// Typeshed checkouts (`stdlib/` plus `stubs/<dist>/`) are indexed tree by
    /// tree; anything else is treated as a plain package tree.
    pub fn add_root(&mut self, root: &Path) {
        let before = self.index.len();
        let stdlib = root.join("stdlib");
        if stdlib.is_dir() {
            self.index_tree(&stdlib);
            if let Ok(dists) = std::fs::read_dir(root.join("stubs")) {
                let mut dirs: Vec<PathBuf> = dists
                    .filter_map(Result::ok)
                    .map(|e| e.path())
                    .filter(|p| p.is_dir())
                    .collect();
                dirs.sort();
                for dist in dirs {
                    self.index_tree(&dist);
                }
            }
        } else {
            self.index_tree(root);
        }
        info!(
            "indexed {} stub modules under {}",
            self.index.len() - before,
            root.display()
        );
    }

    fn index_tree(&mut self, tree: &Path) {
        let walker = WalkDir::new(tree)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_skipped(e));
        for entry in walker.filter_map(Result::ok) {
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(tree) else {
                continue;
            };
            if let Some(module) = module_name_for(relative) {
                self.index
                    .entry(module)
                    .or_insert_with(|| entry.path().to_path_buf());
            }
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// The stub for `module`, or for its nearest indexed parent package
    /// (symbols are often re-exported from a package `__init__`).
    pub fn find(&self, module: &str) -> Option<&Path> {
        let mut candidate = module;
        loop {
            if let Some(path) = self.index.get(candidate) {
                return Some(path.as_path());
            }
            let (parent, _) = candidate.rsplit_once('.')?;
            candidate = parent;
        }
    }

    pub async fn parse_symbol(&self, module: &str, qualified: &str) -> Option<StubSignatureInfo> {
        let Some(path) = self.find(module) else {
            debug!("no stub file for module {module}");
            return None;
        };
        parse_stub_file(path, qualified).await
    }
}
