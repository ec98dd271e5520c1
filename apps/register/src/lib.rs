//! # Register Library
//!
//! Headless checkout register. Reads one JSON command per stdin line and
//! writes one JSON response per stdout line; logs go to stderr.
//!
//! ## Module Organization
//! ```text
//! register/
//! ├── lib.rs          ◄─── You are here (startup & command loop)
//! ├── state/
//! │   ├── mod.rs      ◄─── AppState
//! │   ├── session.rs  ◄─── The active sale
//! │   ├── catalog.rs  ◄─── Shared coupon catalog
//! │   ├── held.rs     ◄─── Held cart store
//! │   └── config.rs   ◄─── RegisterConfig (toml + env)
//! ├── commands/
//! │   ├── mod.rs      ◄─── Protocol & dispatch
//! │   ├── cart.rs     ◄─── Cart, discounts, coupons, customer, overrides
//! │   ├── payment.rs  ◄─── Tenders & settlement
//! │   ├── held.rs     ◄─── Hold / recall
//! │   ├── catalog.rs  ◄─── Coupon management
//! │   └── config.rs   ◄─── Config & health
//! ├── handoff.rs      ◄─── Background writes to the database
//! └── error.rs        ◄─── API error type for commands
//! ```

pub mod commands;
pub mod error;
pub mod handoff;
pub mod state;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use checkout_db::migrations::migration_status;
use checkout_db::{Database, DbConfig};

use handoff::HandoffWorker;
use state::{AppState, RegisterConfig};

/// Runs the register until stdin closes.
///
/// ## Startup Sequence
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                       Register Startup                                  │
/// │                                                                         │
/// │  1. Initialize Logging ───────────────────────────────────────────────► │
/// │     • tracing-subscriber with env filter, written to stderr             │
/// │                                                                         │
/// │  2. Load Configuration ───────────────────────────────────────────────► │
/// │     • register.toml, then CHECKOUT_* environment overrides              │
/// │                                                                         │
/// │  3. Connect to Database ──────────────────────────────────────────────► │
/// │     • SQLite with WAL mode, pending migrations applied                  │
/// │     • Empty coupon table seeded with the default coupons                │
/// │                                                                         │
/// │  4. Initialize State ─────────────────────────────────────────────────► │
/// │     • Coupon catalog and held carts loaded into memory                  │
/// │     • Hand-off worker spawned                                           │
/// │                                                                         │
/// │  5. Command Loop ─────────────────────────────────────────────────────► │
/// │     • One request per line until EOF, then drain the worker             │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = RegisterConfig::load()?;
    info!(store = %config.store_name, "Starting register");

    let db_path = config.resolve_database_path()?;
    info!(?db_path, "Database path determined");
    let db = Database::new(DbConfig::new(db_path)).await?;

    let (total, applied) = migration_status(db.pool()).await?;
    info!(total, applied, "Database connected");

    if db.coupons().count().await? == 0 {
        let seeded = db.coupons().reset_to_defaults(chrono::Utc::now()).await?;
        info!(count = seeded.len(), "Seeded default coupons");
    }
    let catalog = db.coupons().load_catalog().await?;
    let stored_entries = db.kv().load_all().await?;

    let (handle, rx) = handoff::channel();
    let worker = tokio::spawn(HandoffWorker::new(db.clone(), rx).run());
    let app = AppState::new(config, db.clone(), catalog, stored_entries, handle);
    info!("State initialized");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = commands::handle_line(&app, &line).await;
        stdout.write_all(response.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    info!("Input closed, shutting down");
    // Dropping the state drops every hand-off sender, which ends the worker.
    drop(app);
    if let Err(e) = worker.await {
        warn!(error = %e, "Hand-off worker ended abnormally");
    }
    db.close().await;

    Ok(())
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=checkout_core=trace` - Show trace for the pricing core only
/// - Default: INFO, DEBUG for the register and checkout crates
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,register=debug,checkout=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
