//! HTTP access for inventory probing, inventory download, page download and
//! registry lookups.
//!
//! Clients never follow redirects on their own; [`fetch_with_redirects`]
//! does it so the hop count can be bounded and every hop upgraded to https.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::errors::{HoverError, HoverResult};
use crate::guards::{MAX_REDIRECTS, USER_AGENT};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub location: Option<String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            location: None,
            body: body.into(),
        }
    }

    pub fn redirect(location: impl Into<String>) -> Self {
        Self {
            status: 302,
            location: Some(location.into()),
            body: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_redirect(&self) -> bool {
        is_redirect_status(self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

pub fn is_redirect_status(status: u16) -> bool {
    (300..400).contains(&status)
}

/// HEAD probes count as "exists" for 200 and any 3xx.
pub fn probe_exists(status: u16) -> bool {
    status == 200 || is_redirect_status(status)
}

#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Issue a HEAD request and return the status code.
    async fn head(&self, url: &str) -> HoverResult<u16>;

    /// Issue a GET request without following redirects.
    async fn get(&self, url: &str) -> HoverResult<HttpResponse>;
}

/// Production client backed by `reqwest`.
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    pub fn new(timeout: Duration) -> HoverResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }
}

fn transport_error(url: &str, err: reqwest::Error) -> HoverError {
    if err.is_timeout() {
        HoverError::Network(format!("timed out fetching {url}"))
    } else if err.is_connect() {
        HoverError::Network(format!("connection failed for {url}: {err}"))
    } else {
        HoverError::Request(err)
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn head(&self, url: &str) -> HoverResult<u16> {
        let response = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;
        Ok(response.status().as_u16())
    }

    async fn get(&self, url: &str) -> HoverResult<HttpResponse> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;
        let status = response.status().as_u16();
        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(url, e))?
            .to_vec();
        Ok(HttpResponse {
            status,
            location,
            body,
        })
    }
}

/// Upgrade a plain-http URL to https; anything else is returned unchanged.
pub fn secure_url(url: &str) -> String {
    let trimmed = url.trim();
    if trimmed.len() >= 7 && trimmed[..7].eq_ignore_ascii_case("http://") {
        format!("https://{}", &trimmed[7..])
    } else {
        trimmed.to_string()
    }
}

/// Resolve a (possibly relative) `Location` header against the current URL.
pub fn resolve_location(current: &str, location: &str) -> String {
    match reqwest::Url::parse(current).and_then(|base| base.join(location)) {
        Ok(url) => url.to_string(),
        Err(_) => location.to_string(),
    }
}

/// URL with any `#fragment` removed.
pub fn strip_fragment(url: &str) -> &str {
    url.split_once('#').map(|(head, _)| head).unwrap_or(url)
}

/// GET `url`, following at most [`MAX_REDIRECTS`] redirects sequentially.
pub async fn fetch_with_redirects(client: &dyn HttpClient, url: &str) -> HoverResult<Vec<u8>> {
    let mut current = secure_url(url);
    let mut followed = 0usize;
    loop {
        let response = client.get(&current).await?;
        if response.is_redirect() {
            let Some(location) = response.location.as_deref() else {
                return Err(HoverError::Http {
                    status: response.status,
                    url: current,
                });
            };
            if followed >= MAX_REDIRECTS {
                return Err(HoverError::TooManyRedirects {
                    url: url.to_string(),
                    max: MAX_REDIRECTS,
                });
            }
            followed += 1;
            let next = secure_url(&resolve_location(&current, location));
            debug!("redirect {followed}: {current} -> {next}");
            current = next;
            continue;
        }
        if !response.is_success() {
            return Err(HoverError::Http {
                status: response.status,
                url: current,
            });
        }
        return Ok(response.body);
    }
}
