pub mod fetcher;
pub mod format;

pub use fetcher::{lookup_symbol, InventoryFetcher};
pub use format::{decode_inventory, decode_symbol_map};
