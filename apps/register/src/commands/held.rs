//! # Held Cart Commands
//!
//! Park the active sale and pick it up later, possibly after a restart.

use tracing::debug;
use uuid::Uuid;

use checkout_core::held::{self, HeldCartSummary};

use crate::commands::cart::UpdateResponse;
use crate::error::ApiError;
use crate::state::AppState;

/// Parks the active sale. The session starts a new, empty sale.
pub fn hold_cart(app: &AppState, label: Option<String>) -> Result<HeldCartSummary, ApiError> {
    let summary = app
        .session
        .with_session_mut(|s| app.held.with_store_mut(|store| s.hold(store, label)))?;
    Ok(summary)
}

/// Restores a held sale into the (empty) session.
pub fn recall_cart(app: &AppState, id: Uuid) -> Result<UpdateResponse, ApiError> {
    let update = app
        .session
        .with_session_mut(|s| app.held.with_store_mut(|store| s.recall(store, id)))?;
    Ok(UpdateResponse::from(update))
}

/// Held sales, oldest first.
pub fn list_held_carts(app: &AppState) -> Vec<HeldCartSummary> {
    let carts = app.held.with_store(|store| held::list(store));
    debug!(count = carts.len(), "list_held_carts");
    carts
}
