//! Python bindings. Records cross the boundary as JSON strings so the
//! extension stays independent of the host's dataclass definitions.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;

use pyo3::prelude::*;
use serde::Serialize;
use tokio::runtime::Runtime;

use crate::config::ResolverConfig;
use crate::docstring;
use crate::errors::HoverResult;
use crate::models::RawSymbol;
use crate::resolver::{enrich_with_runtime, normalize, DocResolver, RuntimeInfo};
use crate::store::{DocCache, MemoryCache, SqliteCache};
use crate::stub::{parse_stub_reader, StubLocator};

fn to_json<T: Serialize>(value: &T) -> PyResult<String> {
    Ok(serde_json::to_string(value).map_err(crate::errors::HoverError::from)?)
}

fn raw_symbol(
    name: &str,
    module: Option<String>,
    qualified_name: Option<String>,
    is_stdlib: bool,
    version: Option<String>,
) -> RawSymbol {
    RawSymbol {
        name: name.to_string(),
        module,
        qualified_name,
        is_stdlib,
        version,
    }
}

#[pyfunction]
#[pyo3(signature = (name, module=None, qualified_name=None, is_stdlib=false, version=None))]
pub fn normalize_key(
    name: &str,
    module: Option<String>,
    qualified_name: Option<String>,
    is_stdlib: bool,
    version: Option<String>,
) -> PyResult<String> {
    to_json(&normalize(&raw_symbol(name, module, qualified_name, is_stdlib, version)))
}

#[pyfunction]
pub fn parse_docstring(text: &str) -> PyResult<String> {
    to_json(&docstring::parse(text))
}

#[pyfunction]
pub fn parse_help_text(text: &str) -> PyResult<String> {
    to_json(&docstring::parse_help_text(text))
}

/// Scan a stub file for `symbol`; `None` when it declares no such symbol.
#[pyfunction]
pub fn parse_stub(py: Python<'_>, path: PathBuf, symbol: &str) -> PyResult<Option<String>> {
    let info = py.allow_threads(|| -> HoverResult<_> {
        let file = File::open(&path)?;
        parse_stub_reader(BufReader::new(file), symbol)
    })?;
    info.as_ref().map(to_json).transpose()
}

/// Resolver instance with its own runtime, caches and HTTP client.
#[pyclass(name = "Resolver")]
pub struct PyResolver {
    runtime: Runtime,
    resolver: DocResolver,
}

#[pymethods]
impl PyResolver {
    #[new]
    #[pyo3(signature = (config_json=None, cache_path=None, stub_roots=None))]
    pub fn new(
        config_json: Option<&str>,
        cache_path: Option<PathBuf>,
        stub_roots: Option<Vec<PathBuf>>,
    ) -> PyResult<Self> {
        let config = match config_json {
            Some(raw) => ResolverConfig::from_json_str(raw)?,
            None => ResolverConfig::default(),
        };
        let cache: Arc<dyn DocCache> = match cache_path {
            Some(path) => Arc::new(SqliteCache::open(path)?),
            None => Arc::new(MemoryCache::default()),
        };
        let http = Arc::new(crate::http::ReqwestClient::new(config.timeout())?);
        let mut resolver = DocResolver::new(config, http, cache);
        if let Some(roots) = stub_roots.filter(|r| !r.is_empty()) {
            resolver = resolver.with_stubs(StubLocator::new(&roots));
        }
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .map_err(crate::errors::HoverError::from)?;
        Ok(Self { runtime, resolver })
    }

    /// Resolve a symbol and return the documentation record as JSON.
    #[pyo3(signature = (name, module=None, qualified_name=None, is_stdlib=false, version=None))]
    pub fn resolve(
        &self,
        py: Python<'_>,
        name: &str,
        module: Option<String>,
        qualified_name: Option<String>,
        is_stdlib: bool,
        version: Option<String>,
    ) -> PyResult<String> {
        let raw = raw_symbol(name, module, qualified_name, is_stdlib, version);
        let record = py.allow_threads(|| self.runtime.block_on(self.resolver.resolve_raw(&raw)));
        to_json(&record)
    }

    /// Resolve using the runtime helper's JSON reply as both the key source
    /// and the enrichment for fields the cascade leaves empty.
    pub fn resolve_runtime(&self, py: Python<'_>, name: &str, runtime_json: &str) -> PyResult<String> {
        let info = RuntimeInfo::from_json(runtime_json)?;
        let raw = info.to_raw_symbol(name);
        let record = py.allow_threads(|| self.runtime.block_on(self.resolver.resolve_raw(&raw)));
        to_json(&enrich_with_runtime(&record, &info))
    }
}
