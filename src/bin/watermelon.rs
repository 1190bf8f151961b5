//! watermelon CLI
//!
//! Opens a store file and issues put/get calls against it.

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};
use watermelondb::{Config, FreeListPolicy, Store};

/// watermelonDB driver
#[derive(Parser, Debug)]
#[command(name = "watermelon")]
#[command(about = "Single-file page-organized key-value store")]
#[command(version)]
struct Args {
    /// Backing store file
    #[arg(short, long, default_value = "watermelondata")]
    path: String,

    /// Sync page data after every write
    #[arg(long)]
    sync: bool,

    /// Requeue freelist pages that are too full instead of dropping them
    #[arg(long)]
    requeue: bool,

    /// Rebuild the index by scanning existing pages at open
    #[arg(long)]
    rebuild_index: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Put two sample records and read one back (default)
    Demo,

    /// Store a key-value pair
    Put {
        /// The key to store
        key: String,

        /// The value to store
        value: String,
    },

    /// Look up a key (only finds earlier sessions' keys with --rebuild-index)
    Get {
        /// The key to look up
        key: String,
    },
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,watermelondb=debug"));

    fmt().with_env_filter(filter).with_target(true).init();

    let args = Args::parse();

    tracing::info!("starting watermelonDB v{}", watermelondb::VERSION);

    let policy = if args.requeue {
        FreeListPolicy::Requeue
    } else {
        FreeListPolicy::Legacy
    };

    let config = Config::builder()
        .path(&args.path)
        .sync_on_write(args.sync)
        .freelist_policy(policy)
        .rebuild_index_on_open(args.rebuild_index)
        .build();

    if let Err(e) = run(config, args.command.unwrap_or(Commands::Demo)) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(config: Config, command: Commands) -> watermelondb::Result<()> {
    let mut store = Store::open(config)?;

    match command {
        Commands::Demo => {
            store.put(b"name", b"watermelonDB")?;
            println!("File size: {} bytes", store.file_len()?);

            store.put(b"hello", b"namaste")?;
            let value = store.get(b"name")?;
            println!("{}", String::from_utf8_lossy(&value));
        }
        Commands::Put { key, value } => {
            store.put(key.as_bytes(), value.as_bytes())?;
            println!("OK");
        }
        Commands::Get { key } => {
            let value = store.get(key.as_bytes())?;
            println!("{}", String::from_utf8_lossy(&value));
        }
    }

    store.close()
}
