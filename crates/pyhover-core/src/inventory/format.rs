//! Decoder for the compressed Sphinx object inventory (`objects.inv`).
//!
//! Layout: a plain-text header whose last line announces zlib compression,
//! followed by a deflate stream. Each decompressed line reads
//! `name domain:role priority uri dispname`, where `name` may itself contain
//! spaces (glossary terms, grammar tokens), so the `domain:role` column is
//! located heuristically.

use std::collections::HashMap;

use flate2::{Decompress, FlushDecompress, Status};

use crate::errors::{HoverError, HoverResult};
use crate::guards::CONFIDENCE_INVENTORY;
use crate::models::{DocSource, DocumentationRecord, InventoryItem, InventoryMap};

/// Header line after which the body is deflate-compressed.
pub const COMPRESSION_SENTINEL: &[u8] = b"The remainder of this file is compressed using zlib.\n";

/// Decompress and parse an inventory buffer.
pub fn decode_inventory(bytes: &[u8]) -> HoverResult<Vec<InventoryItem>> {
    let body = decompress_body(bytes)?;
    Ok(parse_body(&body))
}

/// Decode an inventory straight into the symbol map served to the resolver.
pub fn decode_symbol_map(bytes: &[u8], base_url: &str) -> HoverResult<InventoryMap> {
    let items = decode_inventory(bytes)?;
    Ok(build_symbol_map(&items, base_url))
}

/// Locate the sentinel and inflate everything after it. A stream that runs
/// out of input before its end marker is an error, not a short body.
pub fn decompress_body(bytes: &[u8]) -> HoverResult<String> {
    let start = body_offset(bytes)
        .ok_or_else(|| HoverError::Format("missing zlib compression sentinel".into()))?;
    let input = &bytes[start..];
    let mut inflater = Decompress::new(true);
    let mut out: Vec<u8> = Vec::with_capacity(input.len().saturating_mul(4).max(1024));
    loop {
        if out.len() == out.capacity() {
            out.reserve(out.capacity().max(1024));
        }
        let consumed = inflater.total_in() as usize;
        let produced = out.len();
        let status = inflater
            .decompress_vec(&input[consumed..], &mut out, FlushDecompress::Finish)
            .map_err(|e| HoverError::Format(format!("decompression failed: {e}")))?;
        if status == Status::StreamEnd {
            break;
        }
        let input_done = inflater.total_in() as usize >= input.len();
        let stalled = inflater.total_in() as usize == consumed && out.len() == produced;
        if (input_done && out.len() < out.capacity()) || (stalled && out.len() < out.capacity()) {
            return Err(HoverError::Format("truncated zlib stream".into()));
        }
    }
    String::from_utf8(out)
        .map_err(|e| HoverError::Format(format!("inventory body is not UTF-8: {e}")))
}

fn body_offset(bytes: &[u8]) -> Option<usize> {
    bytes
        .windows(COMPRESSION_SENTINEL.len())
        .position(|window| window == COMPRESSION_SENTINEL)
        .map(|pos| pos + COMPRESSION_SENTINEL.len())
}

/// Value of a `# Key: value` header line, e.g. `Project` or `Version`.
pub fn header_field(bytes: &[u8], field: &str) -> Option<String> {
    let header_end = body_offset(bytes).unwrap_or(bytes.len());
    let header = String::from_utf8_lossy(&bytes[..header_end]);
    let prefix = format!("# {field}:");
    header
        .lines()
        .find_map(|line| line.strip_prefix(&prefix))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn parse_body(body: &str) -> Vec<InventoryItem> {
    body.lines().filter_map(parse_line).collect()
}

/// Parse one body line; blank, comment and malformed lines yield `None`.
pub fn parse_line(line: &str) -> Option<InventoryItem> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    let tokens: Vec<&str> = trimmed.split_whitespace().collect();
    if tokens.len() < 4 {
        return None;
    }
    let column = find_domain_role_column(&tokens).unwrap_or(1);
    if column + 2 >= tokens.len() {
        return None;
    }
    let display_name = if column + 3 < tokens.len() {
        tokens[column + 3..].join(" ")
    } else {
        "-".to_string()
    };
    Some(InventoryItem {
        name: tokens[..column].join(" "),
        domain_role: tokens[column].to_string(),
        priority: tokens[column + 1].parse().unwrap_or(0),
        uri: tokens[column + 2].to_string(),
        display_name,
    })
}

/// Index of the first `domain:role` token that is followed by an integer
/// priority. Index 0 is never a candidate: it is always part of the name.
pub fn find_domain_role_column(tokens: &[&str]) -> Option<usize> {
    (1..tokens.len().saturating_sub(1))
        .find(|&i| is_domain_role_token(tokens[i]) && is_priority_token(tokens[i + 1]))
}

pub fn is_domain_role_token(token: &str) -> bool {
    match token.split_once(':') {
        Some((domain, role)) => !domain.is_empty() && !role.is_empty(),
        None => false,
    }
}

pub fn is_priority_token(token: &str) -> bool {
    token.parse::<i32>().is_ok()
}

/// When two lines share a name, a Python-domain entry wins over any other
/// domain; otherwise the first entry is kept.
pub fn prefer_entry(existing: &InventoryItem, candidate: &InventoryItem) -> bool {
    candidate.is_python_domain() && !existing.is_python_domain()
}

const PLACEHOLDER_PREFIX: &str = "Reference documentation for ";

pub fn placeholder_summary(item: &InventoryItem) -> String {
    format!("{PLACEHOLDER_PREFIX}{} `{}`.", item.kind(), item.title())
}

/// True for the stand-in summary given to every inventory record.
pub fn is_placeholder_summary(text: &str) -> bool {
    text.starts_with(PLACEHOLDER_PREFIX)
}

/// Build the `name -> record` map, resolving every URI against `base_url`.
pub fn build_symbol_map(items: &[InventoryItem], base_url: &str) -> InventoryMap {
    let mut chosen: HashMap<&str, &InventoryItem> = HashMap::new();
    for item in items {
        match chosen.get(item.name.as_str()) {
            Some(existing) if !prefer_entry(existing, item) => {}
            _ => {
                chosen.insert(item.name.as_str(), item);
            }
        }
    }
    chosen
        .into_iter()
        .map(|(name, item)| {
            let record = DocumentationRecord::new(
                item.title(),
                DocSource::Sphinx,
                CONFIDENCE_INVENTORY,
            )
            .with_kind(item.kind())
            .with_url(item.resolve_url(base_url))
            .with_summary(placeholder_summary(item));
            (name.to_string(), record)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::inventory_bytes;
    use flate2::read::ZlibDecoder;
    use std::io::Read;

    /// Reference decoder used as an independent oracle: inflate with
    /// `flate2` directly and split columns with the plain 5-field grammar.
    fn reference_urls(bytes: &[u8], base: &str) -> HashMap<String, String> {
        let marker = b"zlib.\n";
        let pos = bytes
            .windows(marker.len())
            .position(|w| w == marker)
            .unwrap()
            + marker.len();
        let mut text = String::new();
        ZlibDecoder::new(&bytes[pos..])
            .read_to_string(&mut text)
            .unwrap();
        text.lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| {
                let cols: Vec<&str> = l.split_whitespace().collect();
                let uri = cols[3].replace('$', cols[0]);
                (
                    cols[0].to_string(),
                    format!("{}/{}", base.trim_end_matches('/'), uri),
                )
            })
            .collect()
    }

    #[test]
    fn test_decode_matches_reference_decoder() {
        let bytes = inventory_bytes(
            "demo",
            &[
                "demo.Widget py:class 1 api.html#$ -",
                "demo.Widget.render py:method 1 api.html#$ -",
                "demo py:module 0 index.html#module-$ -",
                "demo.helpers.parse py:function 1 helpers.html#demo.helpers.parse Parse",
            ],
        );
        let base = "https://demo.dev/en/latest/";
        let decoded = decode_symbol_map(&bytes, base).unwrap();
        let reference = reference_urls(&bytes, base);
        assert_eq!(decoded.len(), reference.len());
        for (name, url) in reference {
            assert_eq!(decoded[&name].url.as_deref(), Some(url.as_str()), "{name}");
        }
    }

    #[test]
    fn test_pandas_dataframe_url() {
        let bytes = inventory_bytes(
            "pandas",
            &["pandas.DataFrame py:class 1 api/pandas.DataFrame.html -"],
        );
        let map = decode_symbol_map(&bytes, "https://pandas.pydata.org/docs").unwrap();
        let record = &map["pandas.DataFrame"];
        assert_eq!(
            record.url.as_deref(),
            Some("https://pandas.pydata.org/docs/api/pandas.DataFrame.html")
        );
        assert_eq!(record.kind.as_deref(), Some("class"));
        assert_eq!(record.source, DocSource::Sphinx);
        assert_eq!(record.confidence, 1.0);
    }

    #[test]
    fn test_names_with_spaces() {
        let item = parse_line("floor division std:term 1 glossary.html#term-floor-division -")
            .unwrap();
        assert_eq!(item.name, "floor division");
        assert_eq!(item.domain_role, "std:term");
        assert_eq!(item.priority, 1);
        assert_eq!(item.uri, "glossary.html#term-floor-division");
    }

    #[test]
    fn test_display_name_with_spaces() {
        let item =
            parse_line("tutorial std:doc -1 tutorial/index.html The Python Tutorial").unwrap();
        assert_eq!(item.priority, -1);
        assert_eq!(item.title(), "The Python Tutorial");
    }

    #[test]
    fn test_name_containing_colon_is_not_the_role() {
        // "a:b" is followed by another name token, not by a priority.
        let item = parse_line("a:b thing std:label 2 x.html#ab Label").unwrap();
        assert_eq!(item.name, "a:b thing");
        assert_eq!(item.domain_role, "std:label");
    }

    #[test]
    fn test_fallback_to_second_column() {
        let item = parse_line("weird py:data notanumber page.html -").unwrap();
        assert_eq!(item.domain_role, "py:data");
        assert_eq!(item.priority, 0);
        assert_eq!(item.uri, "page.html");
    }

    #[test]
    fn test_short_lines_are_skipped() {
        assert!(parse_line("").is_none());
        assert!(parse_line("# comment").is_none());
        assert!(parse_line("only three tokens").is_none());
    }

    #[test]
    fn test_python_domain_wins_name_collision() {
        let bytes = inventory_bytes(
            "demo",
            &[
                "json std:doc -1 library/json.html JSON encoder",
                "json py:module 0 library/json.html#module-$ -",
            ],
        );
        let map = decode_symbol_map(&bytes, "https://docs.python.org/3").unwrap();
        assert_eq!(map["json"].kind.as_deref(), Some("module"));
        assert_eq!(
            map["json"].url.as_deref(),
            Some("https://docs.python.org/3/library/json.html#module-json")
        );
    }

    #[test]
    fn test_missing_sentinel_is_format_error() {
        let err = decode_inventory(b"# Sphinx inventory version 1\nfoo mod foo.html\n").unwrap_err();
        assert!(matches!(err, HoverError::Format(_)));
        assert!(decode_inventory(b"").is_err());
    }

    #[test]
    fn test_corrupt_stream_is_format_error() {
        let mut bytes = b"# The remainder of this file is compressed using zlib.\n".to_vec();
        bytes.extend_from_slice(b"\x00\x01\x02definitely not deflate");
        assert!(matches!(
            decode_inventory(&bytes),
            Err(HoverError::Format(_))
        ));
    }

    #[test]
    fn test_truncated_stream_is_format_error() {
        let mut bytes = inventory_bytes("demo", &["demo.run py:function 1 api.html#$ -"]);
        bytes.truncate(bytes.len() - 6);
        assert!(matches!(
            decode_inventory(&bytes),
            Err(HoverError::Format(_))
        ));
    }

    #[test]
    fn test_header_field() {
        let bytes = inventory_bytes("numpy", &["numpy py:module 0 index.html -"]);
        assert_eq!(header_field(&bytes, "Project").as_deref(), Some("numpy"));
        assert_eq!(header_field(&bytes, "Version").as_deref(), Some("1.0"));
        assert_eq!(header_field(&bytes, "Missing"), None);
    }
}
