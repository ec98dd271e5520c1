//! # State Module
//!
//! Application state of the register, split by concern the way commands
//! use it.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                         AppState                                │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │          │                  │                  │              │        │
//! │          ▼                  ▼                  ▼              ▼        │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐  ┌───────────┐  │
//! │  │ SessionState │  │ CatalogState │  │ HeldCartState│  │ Register  │  │
//! │  │              │  │              │  │              │  │ Config    │  │
//! │  │ Arc<Mutex<   │  │ Arc<Mutex<   │  │ Mutex<       │  │           │  │
//! │  │  Checkout    │  │  InMemory    │  │  Mirrored    │  │ read-only │  │
//! │  │  Session>>   │  │  Catalog>>   │  │  Store>      │  │           │  │
//! │  └──────┬───────┘  └──────┬───────┘  └──────────────┘  └───────────┘  │
//! │         │  PersistentCatalog (same Arc)                                │
//! │         └──────────────────┘                                           │
//! │                                                                         │
//! │  Lock order: session, then catalog (through the port) or held store.  │
//! │  Catalog commands take only the catalog lock.                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod catalog;
mod config;
mod held;
mod session;

pub use catalog::{CatalogState, PersistentCatalog};
pub use config::{ConfigError, RegisterConfig};
pub use held::{HeldCartState, MirroredStore};
pub use session::SessionState;

use checkout_core::coupon::InMemoryCouponCatalog;
use checkout_core::CheckoutSession;
use checkout_db::Database;

use crate::handoff::{ChannelSink, HandoffHandle};

/// Everything a command can reach.
pub struct AppState {
    pub config: RegisterConfig,
    pub session: SessionState,
    pub catalog: CatalogState,
    pub held: HeldCartState,
    pub db: Database,
}

impl AppState {
    /// Wires the session to the shared catalog, the held cart store and the
    /// hand-off channel.
    pub fn new(
        config: RegisterConfig,
        db: Database,
        catalog: InMemoryCouponCatalog,
        stored_entries: Vec<(String, String)>,
        handoff: HandoffHandle,
    ) -> Self {
        let catalog = CatalogState::new(catalog, handoff.clone());
        let session = CheckoutSession::new(config.pricing.clone(), catalog.port())
            .with_sink(ChannelSink::new(handoff.clone()));

        AppState {
            session: SessionState::new(session),
            held: HeldCartState::new(MirroredStore::new(stored_entries, handoff)),
            catalog,
            config,
            db,
        }
    }
}
