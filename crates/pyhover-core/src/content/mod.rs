pub mod fetcher;
pub mod html;

pub use fetcher::ContentFetcher;
pub use html::{extract_page_summary, extract_section, html_to_markdown};
