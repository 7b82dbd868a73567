//! Resolver configuration.
//!
//! Configuration arrives as JSON (from the editor settings or a file). Every
//! field has a default, and malformed custom-library entries are rejected at
//! load time instead of leaking half-filled values into the pipeline.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{HoverError, HoverResult};
use crate::guards;

/// A user-declared documentation location for a third-party package.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomLibrary {
    pub package: String,
    pub docs_url: String,
    #[serde(default)]
    pub inventory_url: Option<String>,
}

impl CustomLibrary {
    fn validate(&self) -> HoverResult<()> {
        if self.package.trim().is_empty() {
            return Err(HoverError::Config(
                "custom library entry has an empty package name".into(),
            ));
        }
        if !is_http_url(&self.docs_url) {
            return Err(HoverError::Config(format!(
                "custom library '{}' has a non-http docs_url: {:?}",
                self.package, self.docs_url
            )));
        }
        if let Some(inv) = &self.inventory_url {
            if !is_http_url(inv) {
                return Err(HoverError::Config(format!(
                    "custom library '{}' has a non-http inventory_url: {:?}",
                    self.package, inv
                )));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub python_version: String,
    pub timeout_ms: u64,
    pub inventory_max_age_secs: u64,
    pub page_max_age_secs: u64,
    pub registry_max_age_secs: u64,
    pub registry_url: String,
    pub aggregator_url: String,
    pub stdlib_docs_url: String,
    pub custom_libraries: Vec<CustomLibrary>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            python_version: "3.12".to_string(),
            timeout_ms: guards::DEFAULT_TIMEOUT_MS,
            inventory_max_age_secs: guards::DEFAULT_INVENTORY_MAX_AGE_SECS,
            page_max_age_secs: guards::DEFAULT_PAGE_MAX_AGE_SECS,
            registry_max_age_secs: guards::DEFAULT_REGISTRY_MAX_AGE_SECS,
            registry_url: "https://pypi.org/pypi".to_string(),
            aggregator_url: "https://devdocs.io".to_string(),
            stdlib_docs_url: "https://docs.python.org".to_string(),
            custom_libraries: Vec::new(),
        }
    }
}

impl ResolverConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json_str(raw: &str) -> HoverResult<Self> {
        let config: ResolverConfig = serde_json::from_str(raw)
            .map_err(|e| HoverError::Config(format!("invalid resolver config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> HoverResult<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> HoverResult<()> {
        if self.timeout_ms == 0 {
            return Err(HoverError::Config("timeout_ms must be positive".into()));
        }
        if !is_version_label(&self.python_version) {
            return Err(HoverError::Config(format!(
                "python_version must look like '3.12', got {:?}",
                self.python_version
            )));
        }
        for url in [&self.registry_url, &self.aggregator_url, &self.stdlib_docs_url] {
            if !is_http_url(url) {
                return Err(HoverError::Config(format!("not an http(s) URL: {url:?}")));
            }
        }
        for lib in &self.custom_libraries {
            lib.validate()?;
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn inventory_max_age(&self) -> Duration {
        Duration::from_secs(self.inventory_max_age_secs)
    }

    pub fn page_max_age(&self) -> Duration {
        Duration::from_secs(self.page_max_age_secs)
    }

    pub fn registry_max_age(&self) -> Duration {
        Duration::from_secs(self.registry_max_age_secs)
    }

    /// Root of the standard-library documentation for the configured version.
    pub fn stdlib_root(&self) -> String {
        format!(
            "{}/{}/",
            self.stdlib_docs_url.trim_end_matches('/'),
            self.python_version
        )
    }

    pub fn custom_library(&self, package: &str) -> Option<&CustomLibrary> {
        self.custom_libraries
            .iter()
            .find(|lib| lib.package.eq_ignore_ascii_case(package))
    }
}

fn is_http_url(url: &str) -> bool {
    let lower = url.trim().to_ascii_lowercase();
    (lower.starts_with("http://") || lower.starts_with("https://")) && lower.len() > "https://".len()
}

fn is_version_label(version: &str) -> bool {
    let mut parts = version.split('.');
    let major_ok = parts
        .next()
        .is_some_and(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()));
    let rest_ok = parts.all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()));
    major_ok && rest_ok
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ResolverConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.stdlib_root(), "https://docs.python.org/3.12/");
        assert_eq!(config.timeout(), Duration::from_millis(5000));
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config =
            ResolverConfig::from_json_str(r#"{"python_version": "3.11", "timeout_ms": 2500}"#)
                .unwrap();
        assert_eq!(config.python_version, "3.11");
        assert_eq!(config.timeout_ms, 2500);
        assert_eq!(config.registry_url, "https://pypi.org/pypi");
    }

    #[test]
    fn test_custom_library_lookup_is_case_insensitive() {
        let config = ResolverConfig::from_json_str(
            r#"{"custom_libraries": [{"package": "MyLib", "docs_url": "https://mylib.dev/docs"}]}"#,
        )
        .unwrap();
        assert!(config.custom_library("mylib").is_some());
        assert!(config.custom_library("other").is_none());
    }

    #[test]
    fn test_rejects_empty_package() {
        let err = ResolverConfig::from_json_str(
            r#"{"custom_libraries": [{"package": " ", "docs_url": "https://x.dev"}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, HoverError::Config(_)));
    }

    #[test]
    fn test_rejects_non_http_docs_url() {
        let err = ResolverConfig::from_json_str(
            r#"{"custom_libraries": [{"package": "x", "docs_url": "file:///tmp/docs"}]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("non-http"));
    }

    #[test]
    fn test_rejects_missing_docs_url() {
        let err =
            ResolverConfig::from_json_str(r#"{"custom_libraries": [{"package": "x"}]}"#).unwrap_err();
        assert!(matches!(err, HoverError::Config(_)));
    }

    #[test]
    fn test_rejects_bad_version_and_timeout() {
        assert!(ResolverConfig::from_json_str(r#"{"python_version": "three"}"#).is_err());
        assert!(ResolverConfig::from_json_str(r#"{"timeout_ms": 0}"#).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pyhover.json");
        std::fs::write(&path, r#"{"python_version": "3.13"}"#).unwrap();
        let config = ResolverConfig::load(&path).unwrap();
        assert_eq!(config.python_version, "3.13");
    }
}
