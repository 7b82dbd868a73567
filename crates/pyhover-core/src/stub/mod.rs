pub mod locator;
pub mod parser;

pub use locator::StubLocator;
pub use parser::{parse_stub_file, parse_stub_reader, parse_stub_source};
