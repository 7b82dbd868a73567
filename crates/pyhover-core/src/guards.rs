//! Shared limits and confidence levels for the resolution pipeline.

// Network guards
pub const MAX_REDIRECTS: usize = 5;
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;
pub const USER_AGENT: &str = concat!("pyhover/", env!("CARGO_PKG_VERSION"));

// HTML extraction guards
pub const SECTION_CHAR_CAP: usize = 2000;
pub const MIN_SECTION_CHARS: usize = 40;
pub const FALLBACK_PARAGRAPHS: usize = 3;
pub const FALLBACK_SCAN_ELEMENTS: usize = 60;
pub const SUMMARY_PARAGRAPH_MIN: usize = 20;
pub const PAGE_PARAGRAPH_MIN: usize = 50;

// Cache guards
pub const MEMORY_CACHE_ENTRIES: usize = 256;
pub const DEFAULT_INVENTORY_MAX_AGE_SECS: u64 = 7 * 24 * 60 * 60;
pub const DEFAULT_PAGE_MAX_AGE_SECS: u64 = 24 * 60 * 60;
pub const DEFAULT_REGISTRY_MAX_AGE_SECS: u64 = 24 * 60 * 60;

// Confidence levels, ordered by source trust
pub const CONFIDENCE_STATIC: f64 = 1.0;
pub const CONFIDENCE_INVENTORY: f64 = 1.0;
pub const CONFIDENCE_LOCAL: f64 = 1.0;
pub const CONFIDENCE_RUNTIME: f64 = 0.9;
pub const CONFIDENCE_REGISTRY: f64 = 0.75;
pub const CONFIDENCE_FALLBACK: f64 = 0.3;
pub const CONFIDENCE_UNKNOWN: f64 = 0.0;

pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        return CONFIDENCE_UNKNOWN;
    }
    value.clamp(0.0, 1.0)
}

/// Truncate `text` to at most `max_chars` characters on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_confidence_bounds() {
        assert_eq!(clamp_confidence(1.7), 1.0);
        assert_eq!(clamp_confidence(-0.2), 0.0);
        assert_eq!(clamp_confidence(f64::NAN), 0.0);
        assert_eq!(clamp_confidence(0.3), 0.3);
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn test_confidence_ordering() {
        assert!(CONFIDENCE_STATIC >= CONFIDENCE_REGISTRY);
        assert!(CONFIDENCE_REGISTRY > CONFIDENCE_FALLBACK);
        assert!(CONFIDENCE_FALLBACK > CONFIDENCE_UNKNOWN);
    }
}
