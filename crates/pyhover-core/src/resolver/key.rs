//! Key normalizer: raw symbol info from the host → canonical [`SymbolKey`].
//!
//! Best-effort heuristics. A bare dotted name is split on its last dot and a
//! bare single word is assumed to be a package; neither is checked against
//! what is actually importable.

use crate::models::{RawSymbol, SymbolKey, BUILTINS_MODULE, DUNDER_OWNER, SYNTHETIC_MODULE_OWNER};

/// Module names hosts use for the global/built-in namespace.
const BUILTIN_NAMESPACES: &[&str] = &[BUILTINS_MODULE, "__builtin__", "__builtins__"];

pub fn is_dunder(name: &str) -> bool {
    name.len() > 4 && name.starts_with("__") && name.ends_with("__")
}

pub fn is_builtin_namespace(module: &str) -> bool {
    BUILTIN_NAMESPACES.contains(&module)
}

fn first_segment(dotted: &str) -> &str {
    dotted.split('.').next().unwrap_or(dotted)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// `module.__x__` (synthetic owner) and a lone `__x__` both document the
/// method on `object`.
fn remap_dunder(qualified: &str) -> String {
    let leaf = qualified.rsplit('.').next().unwrap_or(qualified);
    let owner = qualified.rsplit_once('.').map(|(owner, _)| owner);
    match owner {
        Some(SYNTHETIC_MODULE_OWNER) | None if is_dunder(leaf) => format!("{DUNDER_OWNER}.{leaf}"),
        _ => qualified.to_string(),
    }
}

/// Total: every input yields a key; `qualified_name` is empty only when the
/// name itself is.
pub fn normalize(raw: &RawSymbol) -> SymbolKey {
    let name = raw.name.trim();
    let qualified = non_empty(raw.qualified_name.as_deref()).unwrap_or(name);
    let version = non_empty(raw.version.as_deref()).map(str::to_string);

    let (package, module, name, qualified_name) = match non_empty(raw.module.as_deref()) {
        Some(module) if is_builtin_namespace(module) => (
            BUILTINS_MODULE.to_string(),
            BUILTINS_MODULE.to_string(),
            name.to_string(),
            remap_dunder(qualified),
        ),
        Some(module) => (
            first_segment(module).to_string(),
            module.to_string(),
            name.to_string(),
            qualified.to_string(),
        ),
        None => match name.rsplit_once('.') {
            Some((prefix, leaf)) if !prefix.is_empty() && !leaf.is_empty() => {
                let qualified = if qualified == name { leaf } else { qualified };
                (
                    first_segment(prefix).to_string(),
                    prefix.to_string(),
                    leaf.to_string(),
                    qualified.to_string(),
                )
            }
            _ if is_dunder(name) => (
                BUILTINS_MODULE.to_string(),
                BUILTINS_MODULE.to_string(),
                name.to_string(),
                format!("{DUNDER_OWNER}.{name}"),
            ),
            _ => (
                name.to_string(),
                name.to_string(),
                name.to_string(),
                qualified.to_string(),
            ),
        },
    };

    let is_stdlib = raw.is_stdlib || package == BUILTINS_MODULE;
    SymbolKey {
        package,
        module,
        name,
        qualified_name,
        is_stdlib,
        version,
    }
}
