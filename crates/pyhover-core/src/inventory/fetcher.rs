//! Inventory fetcher: finds where a package's documentation lives, downloads
//! its `objects.inv`, and keeps the decoded symbol map in memory and in the
//! cache collaborator.
//!
//! Base-URL discovery order:
//! 1. the standard-library docs root for stdlib symbols;
//! 2. a configured custom library;
//! 3. a base URL discovered earlier in this resolver instance;
//! 4. the registry's documentation URL, probed against well-known layouts;
//! 5. the conventional hosted-docs URL for the package.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::config::ResolverConfig;
use crate::errors::HoverResult;
use crate::http::{fetch_with_redirects, probe_exists, secure_url, HttpClient};
use crate::inventory::format::{decode_symbol_map, header_field};
use crate::models::{join_url, DocumentationRecord, InventoryMap, SymbolKey, BUILTINS_MODULE};
use crate::registry::RegistryClient;
use crate::store::{read_entry, write_entry, DocCache};

/// Inventory-file locations tried, in order, under a documentation home.
pub const CANDIDATE_SUFFIXES: &[&str] = &[
    "",
    "docs/",
    "en/stable/",
    "en/latest/",
    "api/",
    "doc/stable/",
    "doc/",
    "stable/",
];

pub const INVENTORY_FILE: &str = "objects.inv";

/// Inventory name under which all standard-library symbols are stored.
pub const STDLIB_INVENTORY: &str = "python";

type InventorySlot = Arc<OnceCell<Arc<InventoryMap>>>;

pub struct InventoryFetcher {
    config: Arc<ResolverConfig>,
    http: Arc<dyn HttpClient>,
    cache: Arc<dyn DocCache>,
    registry: Arc<RegistryClient>,
    base_urls: Mutex<HashMap<String, String>>,
    inventories: Mutex<HashMap<String, InventorySlot>>,
}

/// Conventional hosted-documentation URL used when nothing else is known.
pub fn hosted_docs_url(package: &str, version: Option<&str>) -> String {
    format!(
        "https://{}.readthedocs.io/en/{}/",
        package.to_ascii_lowercase().replace('_', "-"),
        version.unwrap_or("latest")
    )
}

pub fn inventory_cache_key(package: &str, version: &str) -> String {
    format!("inventory:{package}:{version}")
}

impl InventoryFetcher {
    pub fn new(
        config: Arc<ResolverConfig>,
        http: Arc<dyn HttpClient>,
        cache: Arc<dyn DocCache>,
        registry: Arc<RegistryClient>,
    ) -> Self {
        Self {
            config,
            http,
            cache,
            registry,
            base_urls: Mutex::new(HashMap::new()),
            inventories: Mutex::new(HashMap::new()),
        }
    }

    /// Symbol map for a package. Never fails: any error yields (and caches)
    /// an empty map.
    pub async fn fetch_inventory(
        &self,
        package: &str,
        version: Option<&str>,
        is_stdlib: bool,
    ) -> Arc<InventoryMap> {
        let key = if is_stdlib {
            inventory_cache_key(STDLIB_INVENTORY, &self.config.python_version)
        } else {
            inventory_cache_key(package, version.unwrap_or("latest"))
        };
        let slot = {
            let mut inventories = self.inventories.lock();
            inventories.entry(key.clone()).or_default().clone()
        };
        let map = slot
            .get_or_init(|| self.load(&key, package, version, is_stdlib))
            .await
            .clone();
        map
    }

    /// Look a key up in its package inventory (see [`lookup_symbol`]).
    pub async fn find(&self, key: &SymbolKey) -> Option<DocumentationRecord> {
        let inventory = self
            .fetch_inventory(&key.package, key.version.as_deref(), key.is_stdlib)
            .await;
        lookup_symbol(&inventory, key).cloned()
    }

    async fn load(
        &self,
        cache_key: &str,
        package: &str,
        version: Option<&str>,
        is_stdlib: bool,
    ) -> Arc<InventoryMap> {
        if let Some(map) = read_entry::<InventoryMap>(
            self.cache.as_ref(),
            cache_key,
            self.config.inventory_max_age(),
        )
        .await
        {
            debug!("inventory {cache_key} served from cache ({} symbols)", map.len());
            return Arc::new(map);
        }
        match self.download(package, version, is_stdlib).await {
            Ok(map) => {
                info!("loaded inventory {cache_key} ({} symbols)", map.len());
                write_entry(self.cache.as_ref(), cache_key, &map).await;
                Arc::new(map)
            }
            Err(e) => {
                warn!("inventory fetch failed for package {package}: {e}");
                let empty = InventoryMap::new();
                write_entry(self.cache.as_ref(), cache_key, &empty).await;
                Arc::new(empty)
            }
        }
    }

    async fn download(
        &self,
        package: &str,
        version: Option<&str>,
        is_stdlib: bool,
    ) -> HoverResult<InventoryMap> {
        let base = self.resolve_base_url(package, version, is_stdlib).await;
        let inventory_url = self
            .config
            .custom_library(package)
            .filter(|_| !is_stdlib)
            .and_then(|lib| lib.inventory_url.as_deref())
            .map(secure_url)
            .unwrap_or_else(|| join_url(&base, INVENTORY_FILE));
        debug!("fetching inventory {inventory_url}");
        let bytes = fetch_with_redirects(self.http.as_ref(), &inventory_url).await?;
        if let Some(project) = header_field(&bytes, "Project") {
            debug!("inventory {inventory_url} belongs to project {project}");
        }
        decode_symbol_map(&bytes, &base)
    }

    /// Documentation base URL for a package (always ends in `/`).
    pub async fn resolve_base_url(
        &self,
        package: &str,
        version: Option<&str>,
        is_stdlib: bool,
    ) -> String {
        if is_stdlib {
            return self.config.stdlib_root();
        }
        if let Some(lib) = self.config.custom_library(package) {
            return with_trailing_slash(&secure_url(&lib.docs_url));
        }
        if let Some(known) = self.base_urls.lock().get(package) {
            return known.clone();
        }

        let docs_home = self
            .registry
            .metadata(package)
            .await
            .and_then(|info| info.best_documentation_url().map(secure_url));
        let resolved = match docs_home {
            Some(home) => self.probe(&home).await,
            None => None,
        }
        .unwrap_or_else(|| {
            let fallback = hosted_docs_url(package, version);
            debug!("no inventory found by probing for {package}; using {fallback}");
            fallback
        });

        // Misses are remembered too, so later lookups skip the probe.
        self.base_urls
            .lock()
            .insert(package.to_string(), resolved.clone());
        resolved
    }

    /// First candidate layout under `home` whose inventory answers a HEAD.
    async fn probe(&self, home: &str) -> Option<String> {
        for suffix in CANDIDATE_SUFFIXES {
            let candidate = with_trailing_slash(&join_url(home, suffix));
            let inventory_url = join_url(&candidate, INVENTORY_FILE);
            match self.http.head(&inventory_url).await {
                Ok(status) if probe_exists(status) => {
                    debug!("inventory probe hit: {inventory_url} ({status})");
                    return Some(candidate);
                }
                Ok(status) => debug!("inventory probe miss: {inventory_url} ({status})"),
                Err(e) => debug!("inventory probe error: {inventory_url}: {e}"),
            }
        }
        None
    }
}

fn with_trailing_slash(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    }
}

/// Candidate names for a key, in lookup order: qualified name, module-prefixed
/// qualified name, raw name; for the built-in namespace the same three again
/// with the `builtins.` prefix removed.
pub fn lookup_candidates(key: &SymbolKey) -> Vec<String> {
    let mut candidates: Vec<String> = vec![
        key.qualified_name.clone(),
        format!("{}.{}", key.module, key.qualified_name),
        key.name.clone(),
    ];
    if key.is_builtins() || key.package == BUILTINS_MODULE {
        let prefix = format!("{BUILTINS_MODULE}.");
        let stripped: Vec<String> = candidates
            .iter()
            .map(|c| c.strip_prefix(&prefix).unwrap_or(c).to_string())
            .collect();
        candidates.extend(stripped);
    }
    let mut seen = std::collections::HashSet::new();
    candidates.retain(|c| !c.is_empty() && seen.insert(c.clone()));
    candidates
}

pub fn lookup_symbol<'a>(
    inventory: &'a InventoryMap,
    key: &SymbolKey,
) -> Option<&'a DocumentationRecord> {
    lookup_candidates(key)
        .iter()
        .find_map(|candidate| inventory.get(candidate))
}
