//! # Register Entry Point
//!
//! ```text
//! ┌──────────────┐  JSON lines   ┌──────────────────────────┐
//! │  front end / │ ────────────► │  register (this binary)  │
//! │  test driver │ ◄──────────── │  stdin ► dispatch ► stdout│
//! └──────────────┘               └────────────┬─────────────┘
//!                                             │ hand-off worker
//!                                             ▼
//!                                      checkout.db (SQLite)
//! ```
//!
//! The actual setup is in lib.rs for better testability.

#[tokio::main]
async fn main() {
    if let Err(e) = register::run().await {
        eprintln!("register: {}", e);
        std::process::exit(1);
    }
}
