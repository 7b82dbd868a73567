pub mod cache;
pub mod schema;
pub mod sqlite;

pub use cache::{read_entry, write_entry, DocCache, MemoryCache};
pub use sqlite::SqliteCache;
