//! PyHover core library: documentation resolution for Python symbols.
//!
//! Given a (partially known) symbol, the resolver cascade consults a static
//! keyword table, Sphinx object inventories, live documentation pages, and
//! package-registry metadata, and returns one documentation record with a
//! confidence score. The docstring, interactive-help and stub parsers enrich
//! records with signatures and structured sections.
//!
//! With the `python` feature the crate builds as the `_pyhover_core`
//! extension module.

pub mod config;
pub mod content;
pub mod docstring;
pub mod errors;
pub mod guards;
pub mod http;
pub mod inventory;
pub mod models;
pub mod registry;
pub mod resolver;
pub mod store;
pub mod stub;

#[cfg(feature = "python")]
mod python;

#[cfg(test)]
mod testing;

pub use config::ResolverConfig;
pub use errors::{HoverError, HoverResult};
pub use models::{DocSource, DocumentationRecord, RawSymbol, SymbolKey};
pub use resolver::DocResolver;

#[cfg(feature = "python")]
use pyo3::prelude::*;

// ---------------------------------------------------------------------------
// Top-level Python module: _pyhover_core
// ---------------------------------------------------------------------------

#[cfg(feature = "python")]
#[pymodule]
fn _pyhover_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // -- Confidence levels ---------------------------------------------------
    m.add("CONFIDENCE_STATIC", guards::CONFIDENCE_STATIC)?;
    m.add("CONFIDENCE_INVENTORY", guards::CONFIDENCE_INVENTORY)?;
    m.add("CONFIDENCE_LOCAL", guards::CONFIDENCE_LOCAL)?;
    m.add("CONFIDENCE_RUNTIME", guards::CONFIDENCE_RUNTIME)?;
    m.add("CONFIDENCE_REGISTRY", guards::CONFIDENCE_REGISTRY)?;
    m.add("CONFIDENCE_FALLBACK", guards::CONFIDENCE_FALLBACK)?;
    m.add("CONFIDENCE_UNKNOWN", guards::CONFIDENCE_UNKNOWN)?;

    // -- Parsers -------------------------------------------------------------
    m.add_function(wrap_pyfunction!(python::normalize_key, m)?)?;
    m.add_function(wrap_pyfunction!(python::parse_docstring, m)?)?;
    m.add_function(wrap_pyfunction!(python::parse_help_text, m)?)?;
    m.add_function(wrap_pyfunction!(python::parse_stub, m)?)?;

    // -- Resolver ------------------------------------------------------------
    m.add_class::<python::PyResolver>()?;

    Ok(())
}
