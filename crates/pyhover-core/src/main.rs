//! `pyhover`: drive the documentation resolver and parsers from a terminal.
//! Every subcommand prints JSON on stdout; logs go to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use _pyhover_core::docstring::{parse, parse_help_text};
use _pyhover_core::errors::{HoverError, HoverResult};
use _pyhover_core::http::ReqwestClient;
use _pyhover_core::store::{DocCache, MemoryCache, SqliteCache};
use _pyhover_core::stub::{parse_stub_file, StubLocator};
use _pyhover_core::{DocResolver, RawSymbol, ResolverConfig};

#[derive(Parser, Debug)]
#[command(name = "pyhover", about = "Resolve documentation for Python symbols")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the resolver cascade for one symbol.
    Resolve {
        /// Symbol name, optionally dotted (`json.dumps`).
        symbol: String,
        /// Module the symbol was found in.
        #[arg(long)]
        module: Option<String>,
        /// Qualified name inside the module (`Class.method`).
        #[arg(long)]
        qualified_name: Option<String>,
        /// Treat the symbol as part of the standard library.
        #[arg(long)]
        stdlib: bool,
        /// Package version for inventory lookup.
        #[arg(long)]
        version: Option<String>,
        /// JSON resolver configuration.
        #[arg(long)]
        config: Option<PathBuf>,
        /// SQLite cache file; in-memory when omitted.
        #[arg(long)]
        cache: Option<PathBuf>,
        /// Stub roots used to fill in signatures.
        #[arg(long = "stubs")]
        stub_roots: Vec<PathBuf>,
    },
    /// Parse a docstring read from a file.
    Docstring { file: PathBuf },
    /// Parse interactive-help text read from a file.
    HelpText { file: PathBuf },
    /// Extract a symbol's signature from a stub file.
    Stub { file: PathBuf, symbol: String },
}

fn print_json<T: Serialize>(value: &T) -> HoverResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("_pyhover_core=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> HoverResult<()> {
    init_tracing();
    match Cli::parse().command {
        Command::Resolve {
            symbol,
            module,
            qualified_name,
            stdlib,
            version,
            config,
            cache,
            stub_roots,
        } => {
            let config = match config {
                Some(path) => ResolverConfig::load(path)?,
                None => ResolverConfig::default(),
            };
            let cache: Arc<dyn DocCache> = match cache {
                Some(path) => Arc::new(SqliteCache::open(path)?),
                None => Arc::new(MemoryCache::default()),
            };
            let http = Arc::new(ReqwestClient::new(config.timeout())?);
            let mut resolver = DocResolver::new(config, http, cache);
            if !stub_roots.is_empty() {
                resolver = resolver.with_stubs(StubLocator::new(&stub_roots));
            }
            let raw = RawSymbol {
                name: symbol,
                module,
                qualified_name,
                is_stdlib: stdlib,
                version,
            };
            print_json(&resolver.resolve_raw(&raw).await)
        }
        Command::Docstring { file } => {
            let text = tokio::fs::read_to_string(&file).await?;
            print_json(&parse(&text))
        }
        Command::HelpText { file } => {
            let text = tokio::fs::read_to_string(&file).await?;
            print_json(&parse_help_text(&text))
        }
        Command::Stub { file, symbol } => match parse_stub_file(&file, &symbol).await {
            Some(info) => print_json(&info),
            None => Err(HoverError::Parse(format!(
                "no signature for {symbol} in {}",
                file.display()
            ))),
        },
    }
}
