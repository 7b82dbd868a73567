//! Resolver cascade: one ordered decision procedure over every documentation
//! source, always producing a record.
//!
//! Tiers, most trusted first:
//! 1. static keyword/constant table;
//! 2. package inventory (enriched with the live page section);
//! 3. registry metadata (also merged into an inventory hit as links);
//! 4. aggregator search fallback;
//! 5. "no documentation found" for keys with nothing to search for.

pub mod badges;
pub mod enrich;
pub mod key;
pub mod static_table;

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::ResolverConfig;
use crate::content::ContentFetcher;
use crate::errors::{HoverError, HoverResult};
use crate::guards::{CONFIDENCE_FALLBACK, CONFIDENCE_REGISTRY, CONFIDENCE_UNKNOWN};
use crate::http::{HttpClient, ReqwestClient};
use crate::inventory::format::is_placeholder_summary;
use crate::inventory::InventoryFetcher;
use crate::models::{DocSource, DocumentationRecord, RawSymbol, SymbolKey, BUILTINS_MODULE};
use crate::registry::{RegistryClient, RegistryInfo};
use crate::store::{DocCache, MemoryCache};
use crate::stub::StubLocator;

pub use enrich::{enrich_with_docstring, enrich_with_runtime, enrich_with_stub, RuntimeInfo};
pub use key::normalize;

pub const AGGREGATOR_LINK: &str = "DevDocs";

/// Deep link into the documentation aggregator's search for a bare name.
pub fn aggregator_url(config: &ResolverConfig, name: &str) -> String {
    format!("{}/#q={}", config.aggregator_url.trim_end_matches('/'), name)
}

fn search_name(key: &SymbolKey) -> &str {
    let name = key.name.trim();
    if name.is_empty() {
        key.leaf_name().trim()
    } else {
        name
    }
}

/// Symbols are identifiers joined by dots; anything with whitespace or
/// control characters is not something an index can hold.
fn validate_key(key: &SymbolKey) -> HoverResult<()> {
    let bad = |s: &str| s.chars().any(|c| c.is_whitespace() || c.is_control());
    if bad(&key.qualified_name) || bad(&key.module) {
        return Err(HoverError::Parse(format!(
            "not a symbol name: {:?} in {:?}",
            key.qualified_name, key.module
        )));
    }
    Ok(())
}

pub fn not_found(key: &SymbolKey) -> DocumentationRecord {
    let title = if key.qualified_name.is_empty() {
        "No documentation found".to_string()
    } else {
        format!("No documentation found for {}", key.qualified_name)
    };
    DocumentationRecord::new(title, DocSource::Unknown, CONFIDENCE_UNKNOWN)
}

pub fn lookup_failed(key: &SymbolKey, err: &HoverError) -> DocumentationRecord {
    DocumentationRecord::new(
        format!("Documentation lookup failed for {}", key.full_name()),
        DocSource::Unknown,
        CONFIDENCE_UNKNOWN,
    )
    .with_summary(err.to_string())
}

/// Resolver context: the fetchers, their in-memory maps and the cache
/// collaborator belong to one instance, so independent resolvers never share
/// state.
pub struct DocResolver {
    config: Arc<ResolverConfig>,
    registry: Arc<RegistryClient>,
    inventory: InventoryFetcher,
    content: ContentFetcher,
    stubs: Option<StubLocator>,
}

impl DocResolver {
    pub fn new(config: ResolverConfig, http: Arc<dyn HttpClient>, cache: Arc<dyn DocCache>) -> Self {
        let config = Arc::new(config);
        let registry = Arc::new(RegistryClient::new(
            config.registry_url.clone(),
            config.registry_max_age(),
            http.clone(),
            cache.clone(),
        ));
        let inventory =
            InventoryFetcher::new(config.clone(), http.clone(), cache.clone(), registry.clone());
        let content = ContentFetcher::new(http, cache, config.page_max_age());
        Self {
            config,
            registry,
            inventory,
            content,
            stubs: None,
        }
    }

    /// Real HTTP client and an in-memory cache.
    pub fn with_defaults(config: ResolverConfig) -> HoverResult<Self> {
        let http = Arc::new(ReqwestClient::new(config.timeout())?);
        Ok(Self::new(config, http, Arc::new(MemoryCache::default())))
    }

    /// Fill missing signatures from local stub files.
    pub fn with_stubs(mut self, stubs: StubLocator) -> Self {
        self.stubs = Some(stubs);
        self
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub async fn resolve_raw(&self, raw: &RawSymbol) -> DocumentationRecord {
        self.resolve(&normalize(raw)).await
    }

    /// Never fails: internal errors become a confidence-0.0 record.
    pub async fn resolve(&self, key: &SymbolKey) -> DocumentationRecord {
        if search_name(key).is_empty() {
            return not_found(key);
        }
        match self.try_resolve(key).await {
            Ok(record) => {
                info!(
                    "resolved {} via {} ({:.2})",
                    key.full_name(),
                    record.source.as_str(),
                    record.confidence
                );
                record
            }
            Err(e) => {
                warn!("documentation lookup failed for {}: {e}", key.full_name());
                lookup_failed(key, &e)
            }
        }
    }

    async fn try_resolve(&self, key: &SymbolKey) -> HoverResult<DocumentationRecord> {
        validate_key(key)?;

        let record = match static_table::static_record(key, &self.config) {
            Some(record) => record,
            None => self.cascade(key).await,
        };
        let record = badges::decorate(record, key)
            .with_link(AGGREGATOR_LINK, aggregator_url(&self.config, search_name(key)));
        Ok(self.with_stub_signature(record, key).await)
    }

    async fn cascade(&self, key: &SymbolKey) -> DocumentationRecord {
        let hit = self.inventory.find(key).await;
        if hit.is_none() {
            debug!("no inventory entry for {}", key.full_name());
        }
        let registry = if key.is_stdlib || key.package == BUILTINS_MODULE {
            None
        } else {
            self.registry.metadata(&key.package).await
        };

        match (hit, registry) {
            (Some(record), registry) => {
                let record = self.with_page_content(record).await;
                match registry {
                    Some(info) => merge_registry(record, &info),
                    None => record,
                }
            }
            (None, Some(info)) => registry_record(key, &info),
            (None, None) => fallback_record(&self.config, key),
        }
    }

    /// Replace the inventory placeholder with the live page text when the
    /// page can be fetched and read.
    async fn with_page_content(&self, record: DocumentationRecord) -> DocumentationRecord {
        let Some(url) = record.url.clone() else {
            return record;
        };
        let placeholder = record
            .summary
            .as_deref()
            .map_or(true, is_placeholder_summary);
        if !placeholder {
            return record;
        }
        match self.content.content_for(&url).await {
            Some(markdown) => {
                let mut enriched = record.clone();
                enriched.summary = Some(markdown);
                enriched
            }
            None => record,
        }
    }

    async fn with_stub_signature(
        &self,
        record: DocumentationRecord,
        key: &SymbolKey,
    ) -> DocumentationRecord {
        let Some(stubs) = &self.stubs else {
            return record;
        };
        if record.signature.is_some() || key.module.is_empty() {
            return record;
        }
        match stubs.parse_symbol(&key.module, &key.full_name()).await {
            Some(stub) => enrich_with_stub(&record, &stub),
            None => record,
        }
    }
}

/// Inventory wins on URL and text; the registry contributes links and the
/// release badge.
fn merge_registry(record: DocumentationRecord, info: &RegistryInfo) -> DocumentationRecord {
    let mut merged = record;
    for (label, url) in info.links() {
        merged.links.entry(label).or_insert(url);
    }
    match badges::version_badge(info) {
        Some(badge) => merged.with_badge(badge),
        None => merged,
    }
}

fn registry_record(key: &SymbolKey, info: &RegistryInfo) -> DocumentationRecord {
    let title = key.full_name();
    let mut record = DocumentationRecord::new(title, DocSource::PyPI, CONFIDENCE_REGISTRY);
    if key.qualified_name == key.package {
        record = record.with_kind("package");
    }
    if let Some(summary) = info.summary() {
        record = record.with_summary(summary);
    }
    if let Some(url) = info.best_documentation_url() {
        record = record.with_url(url);
    }
    merge_registry(record, info)
}

fn fallback_record(config: &ResolverConfig, key: &SymbolKey) -> DocumentationRecord {
    let name = search_name(key);
    DocumentationRecord::new(key.full_name(), DocSource::Fallback, CONFIDENCE_FALLBACK)
        .with_summary(format!("No indexed documentation found. Search for `{name}` instead."))
        .with_url(aggregator_url(config, name))
}
