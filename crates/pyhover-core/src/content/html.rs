//! Section isolation and HTML -> Markdown conversion for documentation pages.
//!
//! The page is parsed once with `scraper`; the anchor element is located by
//! id and the boundary rule is picked from its tag:
//!
//! * `dt`: the definition body up to the next sibling `dt` (or the end of the
//!   enclosing `dl`). The term itself is the signature and is left out.
//! * `section`: the whole section.
//! * anything else: forward in document order until the next heading outside
//!   the anchor, capped at [`SECTION_CHAR_CAP`] characters.
//!
//! Output shorter than [`MIN_SECTION_CHARS`] falls back to the first few
//! paragraphs after the anchor.

use std::sync::LazyLock;

use ego_tree::iter::Edge;
use ego_tree::{NodeId, NodeRef};
use regex::Regex;
use reqwest::Url;
use scraper::node::Element;
use scraper::{ElementRef, Html, Node};

use crate::guards::{
    truncate_chars, FALLBACK_PARAGRAPHS, FALLBACK_SCAN_ELEMENTS, MIN_SECTION_CHARS,
    PAGE_PARAGRAPH_MIN, SECTION_CHAR_CAP, SUMMARY_PARAGRAPH_MIN,
};

static BLANK_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template", "head"];
const BLOCK_TAGS: &[&str] = &[
    "p",
    "div",
    "section",
    "article",
    "dl",
    "dd",
    "dt",
    "ul",
    "ol",
    "blockquote",
    "table",
    "figure",
    "aside",
];

// ---------------------------------------------------------------------------
// Public entry points
// ---------------------------------------------------------------------------

/// Markdown for the part of `html` documented under `anchor`, or `None` when
/// the anchor is absent or nothing readable was found.
pub fn extract_section(html: &str, anchor: &str, page_url: &str) -> Option<String> {
    let anchor = anchor.trim_start_matches('#');
    if anchor.is_empty() {
        return None;
    }
    let document = Html::parse_document(html);
    let target = find_anchor(&document, anchor)?;
    let base = Url::parse(page_url).ok();

    let markdown = match target.value().name() {
        "dt" => render_definition(target, base.as_ref()),
        "section" => render_subtree(*target, base.as_ref()),
        _ => render_until_heading(&document, target.id(), base.as_ref()),
    };
    if markdown.chars().count() >= MIN_SECTION_CHARS {
        return Some(markdown);
    }

    let paragraphs = collect_paragraphs(
        &document,
        Some(target.id()),
        ParagraphScan {
            max: FALLBACK_PARAGRAPHS,
            min_chars: SUMMARY_PARAGRAPH_MIN,
            scan_limit: Some(FALLBACK_SCAN_ELEMENTS),
            stop_at_definition: true,
        },
        base.as_ref(),
    );
    if !paragraphs.is_empty() {
        return Some(paragraphs.join("\n\n"));
    }
    (!markdown.is_empty()).then_some(markdown)
}

/// Summary for a page opened without an anchor: the module section's first
/// paragraphs, else the paragraphs after the first `h1`, else the first long
/// paragraph anywhere on the page.
pub fn extract_page_summary(html: &str, page_url: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let base = Url::parse(page_url).ok();
    let scan = ParagraphScan {
        max: FALLBACK_PARAGRAPHS,
        min_chars: SUMMARY_PARAGRAPH_MIN,
        scan_limit: None,
        stop_at_definition: false,
    };

    let elements = || document.root_element().descendants().filter_map(ElementRef::wrap);

    if let Some(module) = elements().find(|el| {
        el.value()
            .id()
            .is_some_and(|id| id.to_ascii_lowercase().starts_with("module-"))
    }) {
        let paragraphs = collect_paragraphs(&document, Some(module.id()), scan, base.as_ref());
        if !paragraphs.is_empty() {
            return Some(paragraphs.join("\n\n"));
        }
    }

    if let Some(h1) = elements().find(|el| el.value().name() == "h1") {
        let paragraphs = collect_paragraphs(&document, Some(h1.id()), scan, base.as_ref());
        if !paragraphs.is_empty() {
            return Some(paragraphs.join("\n\n"));
        }
    }

    collect_paragraphs(
        &document,
        None,
        ParagraphScan {
            max: 1,
            min_chars: PAGE_PARAGRAPH_MIN,
            ..scan
        },
        base.as_ref(),
    )
    .into_iter()
    .next()
}

/// Convert an HTML fragment to Markdown, resolving links against `page_url`.
pub fn html_to_markdown(fragment: &str, page_url: &str) -> String {
    let document = Html::parse_fragment(fragment);
    let base = Url::parse(page_url).ok();
    render_subtree(document.tree.root(), base.as_ref())
}

// ---------------------------------------------------------------------------
// Anchor isolation
// ---------------------------------------------------------------------------

/// Element carrying `id == anchor`, compared case-insensitively.
pub fn find_anchor<'a>(document: &'a Html, anchor: &str) -> Option<ElementRef<'a>> {
    document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().id().is_some_and(|id| id.eq_ignore_ascii_case(anchor)))
}

pub fn is_heading(name: &str) -> bool {
    matches!(name, "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
}

fn element_name<'a>(node: &NodeRef<'a, Node>) -> Option<&'a str> {
    match node.value() {
        Node::Element(el) => Some(el.name()),
        _ => None,
    }
}

fn render_definition(term: ElementRef<'_>, base: Option<&Url>) -> String {
    let mut writer = MarkdownWriter::new(base);
    for sibling in term.next_siblings() {
        if element_name(&sibling) == Some("dt") {
            break;
        }
        write_subtree(&mut writer, sibling);
    }
    writer.finish()
}

fn render_subtree(node: NodeRef<'_, Node>, base: Option<&Url>) -> String {
    let mut writer = MarkdownWriter::new(base);
    write_subtree(&mut writer, node);
    writer.finish()
}

fn write_subtree(writer: &mut MarkdownWriter<'_>, node: NodeRef<'_, Node>) {
    for edge in node.traverse() {
        match edge {
            Edge::Open(n) => match n.value() {
                Node::Element(el) => writer.open(el),
                Node::Text(text) => writer.text(text),
                _ => {}
            },
            Edge::Close(n) => {
                if let Node::Element(el) = n.value() {
                    writer.close(el);
                }
            }
        }
    }
}

/// Document-order walk from `target` until a heading outside it or the cap.
fn render_until_heading(document: &Html, target: NodeId, base: Option<&Url>) -> String {
    let mut writer = MarkdownWriter::new(base);
    let mut started = false;
    let mut inside_target = false;
    let mut depth = 0usize;

    for edge in document.tree.root().traverse() {
        match edge {
            Edge::Open(node) => {
                if !started {
                    if node.id() != target {
                        continue;
                    }
                    started = true;
                    inside_target = true;
                }
                match node.value() {
                    Node::Element(el) => {
                        if !inside_target && is_heading(el.name()) {
                            break;
                        }
                        depth += 1;
                        writer.open(el);
                    }
                    Node::Text(text) => writer.text(text),
                    _ => {}
                }
            }
            Edge::Close(node) => {
                if !started {
                    continue;
                }
                if let Node::Element(el) = node.value() {
                    // Ancestors of the anchor close without having been opened here.
                    if depth == 0 {
                        continue;
                    }
                    depth -= 1;
                    writer.close(el);
                    if node.id() == target {
                        inside_target = false;
                    }
                }
            }
        }
        if writer.reached(SECTION_CHAR_CAP) {
            break;
        }
    }
    let markdown = writer.finish();
    truncate_chars(&markdown, SECTION_CHAR_CAP).trim_end().to_string()
}

#[derive(Clone, Copy)]
struct ParagraphScan {
    max: usize,
    min_chars: usize,
    scan_limit: Option<usize>,
    stop_at_definition: bool,
}

/// Rendered `<p>` elements (longer than `min_chars`) following `start` in
/// document order, or from the top of the page when `start` is `None`.
fn collect_paragraphs(
    document: &Html,
    start: Option<NodeId>,
    scan: ParagraphScan,
    base: Option<&Url>,
) -> Vec<String> {
    let mut found = Vec::new();
    let mut started = start.is_none();
    let mut scanned = 0usize;

    for node in document.tree.root().descendants() {
        if !started {
            started = Some(node.id()) == start;
            continue;
        }
        let Some(el) = ElementRef::wrap(node) else {
            continue;
        };
        scanned += 1;
        if scan.scan_limit.is_some_and(|limit| scanned > limit) {
            break;
        }
        let name = el.value().name();
        if scan.stop_at_definition && name == "dt" {
            break;
        }
        if name != "p" {
            continue;
        }
        let text = render_subtree(node, base);
        if text.chars().count() > scan.min_chars {
            found.push(text);
            if found.len() >= scan.max {
                break;
            }
        }
    }
    found
}

// ---------------------------------------------------------------------------
// Markdown writer
// ---------------------------------------------------------------------------

/// Streaming converter fed with open/close/text events from a tree walk.
pub struct MarkdownWriter<'a> {
    base: Option<&'a Url>,
    out: String,
    pre_depth: usize,
    skip_depth: usize,
    links: Vec<Option<String>>,
}

impl<'a> MarkdownWriter<'a> {
    pub fn new(base: Option<&'a Url>) -> Self {
        Self {
            base,
            out: String::new(),
            pre_depth: 0,
            skip_depth: 0,
            links: Vec::new(),
        }
    }

    fn is_skipped(el: &Element) -> bool {
        if SKIPPED_TAGS.contains(&el.name()) {
            return true;
        }
        // Sphinx permalinks: <a class="headerlink" href="#x">¶</a>
        el.name() == "a" && el.classes().any(|c| c == "headerlink")
    }

    pub fn open(&mut self, el: &Element) {
        if self.skip_depth > 0 {
            self.skip_depth += 1;
            return;
        }
        if Self::is_skipped(el) {
            self.skip_depth = 1;
            return;
        }
        let name = el.name();
        match name {
            "h1" | "h2" | "h3" => {
                self.block_break();
                let level = name[1..].parse::<usize>().unwrap_or(1);
                self.out.push_str(&"#".repeat(level));
                self.out.push(' ');
            }
            "h4" | "h5" | "h6" => {
                self.block_break();
                self.out.push_str("**");
            }
            "pre" => {
                self.block_break();
                self.out.push_str("```python\n");
                self.pre_depth += 1;
            }
            "code" | "tt" | "kbd" | "samp" if self.pre_depth == 0 => self.out.push('`'),
            "em" | "i" | "var" if self.pre_depth == 0 => self.out.push('*'),
            "strong" | "b" if self.pre_depth == 0 => self.out.push_str("**"),
            "li" => {
                self.line_break();
                self.out.push_str("- ");
            }
            "br" => self.out.push('\n'),
            "tr" => self.line_break(),
            "td" | "th" => self.space(),
            "a" => {
                let href = el.attr("href").and_then(|h| self.absolute(h));
                if href.is_some() {
                    self.out.push('[');
                }
                self.links.push(href);
            }
            _ if BLOCK_TAGS.contains(&name) => self.block_break(),
            _ => {}
        }
    }

    pub fn close(&mut self, el: &Element) {
        if self.skip_depth > 0 {
            self.skip_depth -= 1;
            return;
        }
        let name = el.name();
        match name {
            "h1" | "h2" | "h3" => self.block_break(),
            "h4" | "h5" | "h6" => {
                self.trim_trailing_spaces();
                self.out.push_str("**");
                self.block_break();
            }
            "pre" => {
                self.pre_depth = self.pre_depth.saturating_sub(1);
                if !self.out.ends_with('\n') {
                    self.out.push('\n');
                }
                self.out.push_str("```");
                self.block_break();
            }
            "code" | "tt" | "kbd" | "samp" if self.pre_depth == 0 => self.out.push('`'),
            "em" | "i" | "var" if self.pre_depth == 0 => self.out.push('*'),
            "strong" | "b" if self.pre_depth == 0 => self.out.push_str("**"),
            "li" => self.line_break(),
            "a" => {
                if let Some(Some(href)) = self.links.pop() {
                    if self.out.ends_with('[') {
                        // Nothing was written inside the link.
                        self.out.pop();
                    } else {
                        self.trim_trailing_spaces();
                        self.out.push_str("](");
                        self.out.push_str(&href);
                        self.out.push(')');
                    }
                }
            }
            _ if BLOCK_TAGS.contains(&name) => self.block_break(),
            _ => {}
        }
    }

    pub fn text(&mut self, raw: &str) {
        if self.skip_depth > 0 {
            return;
        }
        if self.pre_depth > 0 {
            self.out.push_str(raw);
            return;
        }
        let cleaned = raw.replace('\u{b6}', "");
        if cleaned.starts_with(char::is_whitespace) {
            self.space();
        }
        for (i, word) in cleaned.split_whitespace().enumerate() {
            if i > 0 {
                self.space();
            }
            self.out.push_str(word);
        }
        if cleaned.ends_with(char::is_whitespace) {
            self.space();
        }
    }

    /// True once at least `cap` characters have been written.
    pub fn reached(&self, cap: usize) -> bool {
        self.out.len() >= cap && self.out.chars().count() >= cap
    }

    pub fn finish(self) -> String {
        let collapsed = BLANK_RUNS.replace_all(&self.out, "\n\n");
        collapsed
            .lines()
            .map(str::trim_end)
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    }

    fn absolute(&self, href: &str) -> Option<String> {
        let href = href.trim();
        if href.is_empty() || href.starts_with("javascript:") {
            return None;
        }
        match self.base {
            Some(base) => base.join(href).ok().map(|u| u.to_string()),
            None => Some(href.to_string()),
        }
    }

    fn space(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with(char::is_whitespace) && !self.out.ends_with('[') {
            self.out.push(' ');
        }
    }

    fn trim_trailing_spaces(&mut self) {
        let kept = self.out.trim_end_matches([' ', '\t']).len();
        self.out.truncate(kept);
    }

    fn line_break(&mut self) {
        self.trim_trailing_spaces();
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
    }

    fn block_break(&mut self) {
        self.trim_trailing_spaces();
        if self.out.is_empty() {
            return;
        }
        while !self.out.ends_with("\n\n") {
            self.out.push('\n');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "https://docs.python.org/3.12/library/json.html";

    const JSON_PAGE: &str = r##"<html><head><title>json</title>
        <script>var x = "<dt id='json.dumps'>";</script><style>p { color: red }</style></head>
        <body>
        <section id="module-json">
          <h1>json — JSON encoder and decoder<a class="headerlink" href="#module-json">¶</a></h1>
          <p><strong>Source code:</strong> <a href="https://github.com/python/cpython/tree/3.12/Lib/json/__init__.py">Lib/json/__init__.py</a></p>
          <p>JSON is a lightweight data interchange format inspired by JavaScript object literal syntax.</p>
          <dl class="py function">
            <dt class="sig sig-object py" id="json.dump">json.dump(obj, fp)<a class="headerlink" href="#json.dump">¶</a></dt>
            <dd><p>Serialize <em>obj</em> as a JSON formatted stream to <em>fp</em> using this
              <a class="reference internal" href="#py-to-json-table">conversion table</a>.</p></dd>
            <dt class="sig sig-object py" id="json.dumps">json.dumps(obj)<a class="headerlink" href="#json.dumps">¶</a></dt>
            <dd><p>Serialize <em>obj</em> to a JSON formatted <a href="../library/stdtypes.html#str"><code>str</code></a>.
              The arguments have the same meaning as in <code>dump()</code>.</p>
              <pre>&gt;&gt;&gt; json.dumps([1, 2])
'[1, 2]'</pre></dd>
          </dl>
        </section>
        </body></html>"##;

    #[test]
    fn test_dt_section_stops_at_next_definition() {
        let md = extract_section(JSON_PAGE, "json.dump", PAGE).unwrap();
        assert!(md.contains("Serialize *obj* as a JSON formatted stream"));
        assert!(md.contains(
            "[conversion table](https://docs.python.org/3.12/library/json.html#py-to-json-table)"
        ));
        assert!(!md.contains("json.dumps"));
        assert!(!md.contains("stdtypes"));
        // The term is the signature and is left out.
        assert!(!md.contains("json.dump(obj, fp)"));
    }

    #[test]
    fn test_adjacent_definitions_do_not_leak() {
        let html = r#"<dl>
            <dt id="a">alpha()</dt><dd><p>Alpha computes the first value of the series from its seed.</p></dd>
            <dt id="b">beta()</dt><dd><p>Beta belongs to another definition entirely.</p></dd>
        </dl>"#;
        let md = extract_section(html, "a", "https://x.dev/api.html").unwrap();
        assert!(md.contains("Alpha computes"));
        assert!(!md.contains("Beta"));
        assert!(!md.contains("beta"));

        let bare = r#"<dl><dt id="a">alpha()</dt><dt id="b">beta()</dt><dd><p>Beta belongs to another definition.</p></dd></dl>"#;
        assert_eq!(extract_section(bare, "a", "https://x.dev/api.html"), None);
    }

    #[test]
    fn test_anchor_is_case_insensitive() {
        let md = extract_section(JSON_PAGE, "JSON.DUMPS", PAGE).unwrap();
        assert!(md.contains("[`str`](https://docs.python.org/3.12/library/stdtypes.html#str)"));
        assert!(md.contains("```python\n>>> json.dumps([1, 2])\n'[1, 2]'\n```"));
        assert!(!md.contains('\u{b6}'));
    }

    #[test]
    fn test_section_rule_covers_whole_section() {
        let md = extract_section(JSON_PAGE, "module-json", PAGE).unwrap();
        assert!(md.starts_with("# json — JSON encoder and decoder"));
        assert!(md.contains("lightweight data interchange format"));
        assert!(md.contains("json.dumps(obj)"));
        assert!(!md.contains("var x"));
        assert!(!md.contains("color: red"));
    }

    #[test]
    fn test_generic_rule_stops_at_next_heading() {
        let html = r#"<div><h2 id="intro">Introduction</h2>
            <p>This package wraps the low level socket API in something friendlier.</p>
            <h2 id="usage">Usage</h2><p>Call connect() first.</p></div>"#;
        let md = extract_section(html, "intro", "https://x.dev/").unwrap();
        assert!(md.starts_with("## Introduction"));
        assert!(md.contains("friendlier"));
        assert!(!md.contains("Usage"));
    }

    #[test]
    fn test_generic_rule_is_capped() {
        let body = "<p>word word word word word word word word word word</p>".repeat(200);
        let html = format!(r#"<div id="top">{body}</div>"#);
        let md = extract_section(&html, "top", "https://x.dev/").unwrap();
        assert!(md.chars().count() <= SECTION_CHAR_CAP);
        assert!(md.chars().count() > SECTION_CHAR_CAP / 2);
    }

    #[test]
    fn test_short_section_falls_back_to_paragraphs() {
        let html = r#"<body><span id="target">x</span><h2>Details</h2>
            <p>tiny</p>
            <p>The first real paragraph explains what this target does.</p>
            <p>The second paragraph adds some more useful detail here.</p></body>"#;
        let md = extract_section(html, "target", "https://x.dev/").unwrap();
        assert!(md.starts_with("The first real paragraph"));
        assert!(md.contains("\n\nThe second paragraph"));
        assert!(!md.contains("tiny"));
    }

    #[test]
    fn test_missing_anchor() {
        assert_eq!(extract_section(JSON_PAGE, "nope", PAGE), None);
        assert_eq!(extract_section(JSON_PAGE, "", PAGE), None);
        assert_eq!(extract_section("", "a", PAGE), None);
    }

    #[test]
    fn test_page_summary_prefers_module_section() {
        let summary = extract_page_summary(JSON_PAGE, PAGE).unwrap();
        assert!(summary.contains("Lib/json/__init__.py"));
        assert!(summary.contains("lightweight data interchange"));
    }

    #[test]
    fn test_page_summary_after_h1_then_any_paragraph() {
        let html = r#"<p>nav</p><h1>Guide</h1><p>This guide walks through the configuration options.</p>"#;
        assert_eq!(
            extract_page_summary(html, "https://x.dev/").as_deref(),
            Some("This guide walks through the configuration options.")
        );

        let plain = r#"<div><p>short one</p><p>A paragraph that is comfortably longer than fifty characters in total.</p></div>"#;
        assert_eq!(
            extract_page_summary(plain, "https://x.dev/").as_deref(),
            Some("A paragraph that is comfortably longer than fifty characters in total.")
        );
        assert_eq!(extract_page_summary("<p>too short</p>", "https://x.dev/"), None);
    }

    #[test]
    fn test_markdown_conversion() {
        let md = html_to_markdown(
            r##"<h3>Notes</h3><ul><li>one &amp; <tt>two</tt></li><li>three<br>four</li></ul>
               <p>See <a href="/x.html">x</a> and <a href="#">   </a>.</p>"##,
            "https://d.dev/a/b.html",
        );
        assert_eq!(
            md,
            "### Notes\n\n- one & `two`\n- three\nfour\n\nSee [x](https://d.dev/x.html) and ."
        );
    }
}
