//! Walkthrough of descending token keys and cursor paging.
//!
//! ```text
//! RUST_LOG=debug token-pages --page-size 3 --resume-after token:92
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueHint};
use rowstore_core::{Config, ScanOptions, StoreEngine};
use rowstore_paging::{next_key, sort_raw_keys, CodecConfig, KeyCodec, Paginator, Result};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const TOKENS: [&str; 8] = [
    "token:1", "token:101", "token:2000", "token:5",
    "token:54", "token:92", "token:8", "token:456",
];

#[derive(Parser, Debug)]
#[command(
    name = "token-pages",
    version,
    about = "Write token rows with descending keys and page through them"
)]
struct Cli {
    #[arg(
        long,
        help = "Store directory (default: a fresh temp dir)",
        value_hint = ValueHint::DirPath
    )]
    dir: Option<PathBuf>,
    #[arg(long, default_value_t = 3, help = "Rows per scan")]
    page_size: usize,
    #[arg(long, default_value = "token:", help = "Namespace tag, separator included")]
    tag: String,
    #[arg(long, default_value_t = 10_000, help = "Exclusive upper bound on token ids")]
    max_value: u64,
    #[arg(long, default_value_t = 5, help = "Zero-padded digit count")]
    width: usize,
    #[arg(long, help = "Raw key (e.g. token:92) to resume paging after")]
    resume_after: Option<String>,
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let temp;
    let dir = match &cli.dir {
        Some(dir) => dir.clone(),
        None => match tempfile::TempDir::new() {
            Ok(dir) => {
                temp = dir;
                temp.path().to_path_buf()
            }
            Err(err) => {
                error!(error = %err, "could not create temp dir");
                return ExitCode::FAILURE;
            }
        },
    };

    match run(&cli, dir) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "walkthrough failed");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, dir: PathBuf) -> Result<()> {
    let codec = KeyCodec::new(CodecConfig::new(cli.tag.clone(), cli.max_value, cli.width))?;
    let store = StoreEngine::open(&dir, Config::buffered())?;
    info!(dir = %dir.display(), "opened store");

    let raw: Vec<String> = TOKENS
        .iter()
        .map(|t| format!("{}{}", cli.tag, t.trim_start_matches("token:")))
        .collect();

    // 1. raw keys in store order
    let mut sorted = raw.clone();
    sort_raw_keys(&mut sorted);
    info!(keys = ?sorted, "raw keys in lexicographic order");

    // 2. descending-encoded writes
    for key in &raw {
        let encoded = codec.encode_raw(key)?;
        store.put(encoded.as_bytes(), b"test")?;
    }
    store.sync_wal()?;

    // 3. one scan over the namespace reads ids high to low
    for row in Paginator::new(&store, codec.range(), usize::MAX)? {
        let row = row?;
        info!(
            key = %String::from_utf8_lossy(&row.key),
            unpadded = %codec.decode_to_raw(&row.key)?,
            "reading row"
        );
    }

    // 4. exclusive boundary
    let first = codec.encode_raw(&sorted[0])?;
    info!(key = %first, next = ?next_key(first.as_bytes()), "incremented key");

    // 5. paging, optionally resumed after a raw key
    let mut pager =
        Paginator::with_options(&store, codec.range(), cli.page_size, ScanOptions::default())?;
    if let Some(after) = &cli.resume_after {
        let cursor = codec.encode_raw(after)?;
        info!(after = %after, cursor = %cursor, "resuming");
        pager = pager.resume_after(cursor.as_bytes());
    }
    while let Some(page) = pager.next_page()? {
        let ids = page
            .rows
            .iter()
            .map(|row| codec.decode_to_raw(&row.key))
            .collect::<Result<Vec<_>>>()?;
        info!(
            page = pager.pages_fetched(),
            rows = ?ids,
            cursor = %String::from_utf8_lossy(&page.cursor),
            "page"
        );
    }

    store.shutdown()?;
    Ok(())
}
