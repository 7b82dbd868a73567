//! Cross-reference rewriting applied to every prose field a parser extracts.

use std::sync::LazyLock;

use regex::{Captures, Regex};

pub const PEP_BASE_URL: &str = "https://peps.python.org";

static PEP_ROLE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r":pep:`(\d+)`").unwrap());

static PEP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bPEP\s*(\d{1,4})\b").unwrap());

static EXTERNAL_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`<]+?)\s*<([^>`]+)>`_{1,2}").unwrap());

static REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r":(?:std:)?(?:ref|doc|term):`(?:([^`<]+?)\s*<[^>`]+>|([^`]+))`").unwrap()
});

static XREF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r":(?:py:)?(?:func|class|meth|mod|attr|exc|data|const|obj):`([^`]+)`").unwrap()
});

pub fn pep_url(number: u32) -> String {
    format!("{PEP_BASE_URL}/pep-{number:04}/")
}

/// Rewrite every supported reference form in `text` into Markdown.
pub fn rewrite_links(text: &str) -> String {
    let text = PEP_ROLE_RE.replace_all(text, |caps: &Captures| pep_link(&caps[1]));
    let text = EXTERNAL_LINK_RE.replace_all(&text, "[$1]($2)");
    let text = REF_RE.replace_all(&text, |caps: &Captures| {
        let label = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
        format!("*{}*", label.trim())
    });
    let text = XREF_RE.replace_all(&text, |caps: &Captures| format!("`{}`", xref_label(&caps[1])));
    rewrite_pep_mentions(&text)
}

/// Display text Sphinx would show for a cross-reference target: `~a.b.c`
/// shows `c`, a leading `!` suppresses the link but keeps the text.
pub fn xref_label(target: &str) -> String {
    let target = target.trim().trim_start_matches('!');
    if let Some(rest) = target.strip_prefix('~') {
        rest.rsplit('.').next().unwrap_or(rest).to_string()
    } else if let Some((label, _)) = target.split_once(" <") {
        label.trim().to_string()
    } else {
        target.to_string()
    }
}

fn pep_link(number: &str) -> String {
    match number.parse::<u32>() {
        Ok(n) => format!("[PEP {n}]({})", pep_url(n)),
        Err(_) => format!("PEP {number}"),
    }
}

/// `PEP 8` -> `[PEP 8](https://peps.python.org/pep-0008/)`, leaving mentions
/// that already sit inside link text alone.
pub fn rewrite_pep_mentions(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in PEP_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let already_linked =
            text[..whole.start()].ends_with('[') || text[whole.end()..].starts_with(']');
        out.push_str(&text[last..whole.start()]);
        if already_linked {
            out.push_str(whole.as_str());
        } else {
            out.push_str(&pep_link(&caps[1]));
        }
        last = whole.end();
    }
    out.push_str(&text[last..]);
    out
}
