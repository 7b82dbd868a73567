//! Test doubles shared by the in-module test suites.

use std::collections::HashMap;
use std::io::Write;

use async_trait::async_trait;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use parking_lot::Mutex;

use crate::errors::{HoverError, HoverResult};
use crate::http::{HttpClient, HttpResponse};

/// Canned-response HTTP client that records every request it sees.
#[derive(Default)]
pub struct MockHttp {
    gets: HashMap<String, HttpResponse>,
    heads: HashMap<String, u16>,
    get_log: Mutex<Vec<String>>,
    head_log: Mutex<Vec<String>>,
}

impl MockHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_get(mut self, url: &str, response: HttpResponse) -> Self {
        self.gets.insert(url.to_string(), response);
        self
    }

    pub fn with_head(mut self, url: &str, status: u16) -> Self {
        self.heads.insert(url.to_string(), status);
        self
    }

    pub fn get_count(&self, url: &str) -> usize {
        self.get_log.lock().iter().filter(|u| *u == url).count()
    }

    pub fn head_count(&self, url: &str) -> usize {
        self.head_log.lock().iter().filter(|u| *u == url).count()
    }

    pub fn total_gets(&self) -> usize {
        self.get_log.lock().len()
    }

    pub fn total_heads(&self) -> usize {
        self.head_log.lock().len()
    }
}

#[async_trait]
impl HttpClient for MockHttp {
    async fn head(&self, url: &str) -> HoverResult<u16> {
        self.head_log.lock().push(url.to_string());
        Ok(self.heads.get(url).copied().unwrap_or(404))
    }

    async fn get(&self, url: &str) -> HoverResult<HttpResponse> {
        self.get_log.lock().push(url.to_string());
        self.gets
            .get(url)
            .cloned()
            .ok_or_else(|| HoverError::Network(format!("connection refused: {url}")))
    }
}

/// Build an inventory buffer the way Sphinx writes one.
pub fn inventory_bytes(project: &str, lines: &[&str]) -> Vec<u8> {
    let mut out = format!(
        "# Sphinx inventory version 2\n# Project: {project}\n# Version: 1.0\n\
         # The remainder of this file is compressed using zlib.\n"
    )
    .into_bytes();
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    for line in lines {
        encoder.write_all(line.as_bytes()).unwrap();
        encoder.write_all(b"\n").unwrap();
    }
    out.extend(encoder.finish().unwrap());
    out
}
