//! Package-registry metadata client (PyPI JSON API).
//!
//! Supplies the documentation home used for inventory discovery and the
//! project links merged into resolved records. Lookups are memoised per
//! package, negative results included.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::errors::{HoverError, HoverResult};
use crate::http::{fetch_with_redirects, HttpClient};
use crate::store::{read_entry, write_entry, DocCache};

#[derive(Deserialize)]
struct RegistryDocument {
    info: RegistryInfo,
}

/// The subset of the registry's `info` object the resolver uses.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub home_page: Option<String>,
    #[serde(default)]
    pub docs_url: Option<String>,
    #[serde(default)]
    pub package_url: Option<String>,
    #[serde(default)]
    pub project_urls: Option<IndexMap<String, String>>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl RegistryInfo {
    /// Explicit "documentation" project URL, then the registry's docs URL,
    /// then the home page, then whichever project URL comes first.
    pub fn best_documentation_url(&self) -> Option<&str> {
        let project_urls = self.project_urls.as_ref();
        if let Some(url) = project_urls.and_then(|urls| {
            urls.iter()
                .find(|(label, url)| {
                    label.trim().eq_ignore_ascii_case("documentation") && !url.trim().is_empty()
                })
                .map(|(_, url)| url.trim())
        }) {
            return Some(url);
        }
        if let Some(url) = non_empty(&self.docs_url) {
            return Some(url);
        }
        if let Some(url) = non_empty(&self.home_page) {
            return Some(url);
        }
        project_urls.and_then(|urls| {
            urls.values()
                .map(|u| u.trim())
                .find(|u| !u.is_empty())
        })
    }

    pub fn summary(&self) -> Option<&str> {
        non_empty(&self.summary)
    }

    /// Links worth showing next to a record: the registry page, the home page
    /// and every declared project URL.
    pub fn links(&self) -> Vec<(String, String)> {
        let mut links = Vec::new();
        if let Some(url) = non_empty(&self.package_url) {
            links.push(("PyPI".to_string(), url.to_string()));
        }
        if let Some(url) = non_empty(&self.home_page) {
            links.push(("Homepage".to_string(), url.to_string()));
        }
        if let Some(urls) = &self.project_urls {
            for (label, url) in urls {
                if !url.trim().is_empty() {
                    links.push((label.trim().to_string(), url.trim().to_string()));
                }
            }
        }
        links
    }
}

/// Parse a registry JSON document.
pub fn parse_registry_document(bytes: &[u8]) -> HoverResult<RegistryInfo> {
    serde_json::from_slice::<RegistryDocument>(bytes)
        .map(|doc| doc.info)
        .map_err(|e| HoverError::Registry(format!("malformed registry metadata: {e}")))
}

type MetadataSlot = Arc<OnceCell<Option<Arc<RegistryInfo>>>>;

pub struct RegistryClient {
    base_url: String,
    max_age: Duration,
    http: Arc<dyn HttpClient>,
    cache: Arc<dyn DocCache>,
    memo: Mutex<HashMap<String, MetadataSlot>>,
}

impl RegistryClient {
    pub fn new(
        base_url: impl Into<String>,
        max_age: Duration,
        http: Arc<dyn HttpClient>,
        cache: Arc<dyn DocCache>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            max_age,
            http,
            cache,
            memo: Mutex::new(HashMap::new()),
        }
    }

    pub fn metadata_url(&self, package: &str) -> String {
        format!("{}/{}/json", self.base_url.trim_end_matches('/'), package)
    }

    /// Metadata for `package`, or `None` when the registry has nothing usable.
    /// Concurrent callers for the same package share one request.
    pub async fn metadata(&self, package: &str) -> Option<Arc<RegistryInfo>> {
        let package = package.trim().to_ascii_lowercase();
        if package.is_empty() {
            return None;
        }
        let slot = {
            let mut memo = self.memo.lock();
            memo.entry(package.clone()).or_default().clone()
        };
        let info = slot.get_or_init(|| self.load(&package)).await.clone();
        info
    }

    async fn load(&self, package: &str) -> Option<Arc<RegistryInfo>> {
        let key = format!("registry:{package}");
        if let Some(cached) =
            read_entry::<Option<RegistryInfo>>(self.cache.as_ref(), &key, self.max_age).await
        {
            debug!("registry metadata for {package} served from cache");
            return cached.map(Arc::new);
        }
        match self.fetch(package).await {
            Ok(info) => {
                write_entry(self.cache.as_ref(), &key, &Some(&info)).await;
                Some(Arc::new(info))
            }
            Err(e) => {
                warn!("registry lookup failed for {package}: {e}");
                write_entry(self.cache.as_ref(), &key, &None::<RegistryInfo>).await;
                None
            }
        }
    }

    async fn fetch(&self, package: &str) -> HoverResult<RegistryInfo> {
        let url = self.metadata_url(package);
        let bytes = fetch_with_redirects(self.http.as_ref(), &url).await?;
        parse_registry_document(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpResponse;
    use crate::store::MemoryCache;
    use crate::testing::MockHttp;

    const REQUESTS_JSON: &str = r#"{
        "info": {
            "name": "requests",
            "summary": "Python HTTP for Humans.",
            "version": "2.32.3",
            "home_page": "https://requests.readthedocs.io",
            "docs_url": null,
            "package_url": "https://pypi.org/project/requests/",
            "project_urls": {
                "Source": "https://github.com/psf/requests",
                "Documentation": "https://requests.readthedocs.io"
            }
        }
    }"#;

    #[test]
    fn test_best_documentation_url_prefers_documentation_key() {
        let info = parse_registry_document(REQUESTS_JSON.as_bytes()).unwrap();
        assert_eq!(
            info.best_documentation_url(),
            Some("https://requests.readthedocs.io")
        );
        assert_eq!(info.summary(), Some("Python HTTP for Humans."));
    }

    #[test]
    fn test_best_documentation_url_case_insensitive_key() {
        let info = RegistryInfo {
            home_page: Some("https://home.dev".into()),
            project_urls: Some(IndexMap::from([
                ("Source".to_string(), "https://src.dev".to_string()),
                ("DOCUMENTATION".to_string(), "https://docs.dev".to_string()),
            ])),
            ..Default::default()
        };
        assert_eq!(info.best_documentation_url(), Some("https://docs.dev"));
    }

    #[test]
    fn test_best_documentation_url_falls_back_in_order() {
        let mut info = RegistryInfo {
            home_page: Some("".into()),
            project_urls: Some(IndexMap::from([
                ("Tracker".to_string(), "https://issues.dev".to_string()),
                ("Source".to_string(), "https://src.dev".to_string()),
            ])),
            ..Default::default()
        };
        assert_eq!(info.best_documentation_url(), Some("https://issues.dev"));
        info.home_page = Some("https://home.dev".into());
        assert_eq!(info.best_documentation_url(), Some("https://home.dev"));
        info.docs_url = Some("https://hosted.dev".into());
        assert_eq!(info.best_documentation_url(), Some("https://hosted.dev"));
        assert_eq!(RegistryInfo::default().best_documentation_url(), None);
    }

    #[test]
    fn test_null_project_urls_parse() {
        let info =
            parse_registry_document(br#"{"info": {"name": "x", "project_urls": null}}"#).unwrap();
        assert!(info.links().is_empty());
        assert!(parse_registry_document(b"{\"nope\": 1}").is_err());
    }

    #[test]
    fn test_links_order() {
        let info = parse_registry_document(REQUESTS_JSON.as_bytes()).unwrap();
        let labels: Vec<String> = info.links().into_iter().map(|(l, _)| l).collect();
        assert_eq!(labels, vec!["PyPI", "Homepage", "Source", "Documentation"]);
    }

    #[tokio::test]
    async fn test_metadata_is_memoised() {
        let http = Arc::new(MockHttp::new().with_get(
            "https://pypi.org/pypi/requests/json",
            HttpResponse::ok(REQUESTS_JSON),
        ));
        let client = RegistryClient::new(
            "https://pypi.org/pypi",
            Duration::from_secs(60),
            http.clone(),
            Arc::new(MemoryCache::default()),
        );
        assert!(client.metadata("requests").await.is_some());
        assert!(client.metadata("Requests").await.is_some());
        assert_eq!(http.total_gets(), 1);
    }

    #[tokio::test]
    async fn test_negative_lookup_is_remembered_in_cache() {
        let cache = Arc::new(MemoryCache::default());
        let http = Arc::new(MockHttp::new());
        let client = RegistryClient::new(
            "https://pypi.org/pypi",
            Duration::from_secs(60),
            http.clone(),
            cache.clone(),
        );
        assert!(client.metadata("nosuchpkg").await.is_none());

        // A second client sharing the cache does not hit the network.
        let second = RegistryClient::new(
            "https://pypi.org/pypi",
            Duration::from_secs(60),
            http.clone(),
            cache,
        );
        assert!(second.metadata("nosuchpkg").await.is_none());
        assert_eq!(http.total_gets(), 1);
    }
}
