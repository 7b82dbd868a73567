//! Page retrieval for the content tier. Raw HTML is cached under the page URL
//! with the fragment removed, so every anchor on a page shares one download.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::content::html::{extract_page_summary, extract_section};
use crate::http::{fetch_with_redirects, secure_url, strip_fragment, HttpClient};
use crate::store::{read_entry, write_entry, DocCache};

type PageSlot = Arc<OnceCell<Option<Arc<String>>>>;

pub struct ContentFetcher {
    http: Arc<dyn HttpClient>,
    cache: Arc<dyn DocCache>,
    max_age: Duration,
    pages: Mutex<HashMap<String, PageSlot>>,
}

/// Fragment of a URL (without `#`), if it has a non-empty one.
pub fn url_fragment(url: &str) -> Option<&str> {
    url.split_once('#')
        .map(|(_, fragment)| fragment)
        .filter(|f| !f.is_empty())
}

impl ContentFetcher {
    pub fn new(http: Arc<dyn HttpClient>, cache: Arc<dyn DocCache>, max_age: Duration) -> Self {
        Self {
            http,
            cache,
            max_age,
            pages: Mutex::new(HashMap::new()),
        }
    }

    /// Raw HTML for the page behind `url`; `None` when it cannot be fetched.
    pub async fn fetch_page(&self, url: &str) -> Option<Arc<String>> {
        let page_url = secure_url(strip_fragment(url));
        if page_url.is_empty() {
            return None;
        }
        let slot = {
            let mut pages = self.pages.lock();
            pages.entry(page_url.clone()).or_default().clone()
        };
        let page = slot.get_or_init(|| self.load(&page_url)).await.clone();
        page
    }

    async fn load(&self, page_url: &str) -> Option<Arc<String>> {
        if let Some(html) = read_entry::<String>(self.cache.as_ref(), page_url, self.max_age).await
        {
            debug!("page {page_url} served from cache");
            return Some(Arc::new(html));
        }
        match fetch_with_redirects(self.http.as_ref(), page_url).await {
            Ok(body) => {
                let html = String::from_utf8_lossy(&body).into_owned();
                write_entry(self.cache.as_ref(), page_url, &html).await;
                Some(Arc::new(html))
            }
            Err(e) => {
                warn!("page fetch failed for {page_url}: {e}");
                None
            }
        }
    }

    /// Markdown for the documentation at `url`: the anchored section when the
    /// URL has a fragment, the page summary otherwise.
    pub async fn content_for(&self, url: &str) -> Option<String> {
        let html = self.fetch_page(url).await?;
        let page_url = strip_fragment(url);
        let content = match url_fragment(url) {
            Some(anchor) => extract_section(&html, anchor, page_url),
            None => extract_page_summary(&html, page_url),
        };
        if content.is_none() {
            debug!("no readable content extracted from {url}");
        }
        content
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpResponse;
    use crate::store::MemoryCache;
    use crate::testing::MockHttp;

    const PAGE: &str = r#"<html><body><dl>
        <dt id="mod.run">run()</dt><dd><p>Run the configured pipeline until every stage has finished.</p></dd>
        <dt id="mod.stop">stop()</dt><dd><p>Stop the pipeline at the next stage boundary, flushing output.</p></dd>
        </dl></body></html>"#;

    fn fetcher(http: Arc<MockHttp>, cache: Arc<MemoryCache>) -> ContentFetcher {
        ContentFetcher::new(http, cache, Duration::from_secs(3600))
    }

    #[test]
    fn test_url_fragment() {
        assert_eq!(url_fragment("https://x.dev/a.html#f"), Some("f"));
        assert_eq!(url_fragment("https://x.dev/a.html#"), None);
        assert_eq!(url_fragment("https://x.dev/a.html"), None);
    }

    #[tokio::test]
    async fn test_anchors_share_one_download() {
        let http = Arc::new(MockHttp::new().with_get("https://x.dev/api.html", HttpResponse::ok(PAGE)));
        let cache = Arc::new(MemoryCache::default());
        let fetcher = fetcher(http.clone(), cache.clone());

        let run = fetcher.content_for("https://x.dev/api.html#mod.run").await.unwrap();
        let stop = fetcher.content_for("http://x.dev/api.html#mod.stop").await.unwrap();
        assert!(run.starts_with("Run the configured pipeline"));
        assert!(stop.starts_with("Stop the pipeline"));
        assert_eq!(http.total_gets(), 1);
        assert!(cache.get("https://x.dev/api.html").await.is_some());
    }

    #[tokio::test]
    async fn test_cached_page_is_reused_across_fetchers() {
        let cache = Arc::new(MemoryCache::default());
        write_entry(cache.as_ref(), "https://x.dev/api.html", &PAGE.to_string()).await;
        let http = Arc::new(MockHttp::new());
        let content = fetcher(http.clone(), cache)
            .content_for("https://x.dev/api.html#mod.stop")
            .await;
        assert!(content.is_some());
        assert_eq!(http.total_gets(), 0);
    }

    #[tokio::test]
    async fn test_failed_page_yields_none() {
        let http = Arc::new(MockHttp::new());
        let fetcher = fetcher(http.clone(), Arc::new(MemoryCache::default()));
        assert!(fetcher.content_for("https://x.dev/gone.html#x").await.is_none());
        assert!(fetcher.content_for("https://x.dev/gone.html#y").await.is_none());
        // The failure is remembered for the lifetime of the fetcher.
        assert_eq!(http.total_gets(), 1);
    }
}
