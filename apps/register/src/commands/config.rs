//! # Config Commands
//!
//! Read-only view of the register configuration and a health probe.

use serde::Serialize;
use tracing::debug;

use checkout_core::held;
use checkout_db::migrations::migration_status;

use crate::error::ApiError;
use crate::state::{AppState, RegisterConfig};

/// Gets the configuration the register started with.
pub fn get_config(app: &AppState) -> RegisterConfig {
    debug!("get_config command");
    app.config.clone()
}

/// Answer to `health`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub store_name: String,
    pub database: bool,
    pub migrations_total: usize,
    pub migrations_applied: usize,
    pub coupons: usize,
    pub held_carts: usize,
}

pub async fn health(app: &AppState) -> Result<HealthResponse, ApiError> {
    let database = app.db.health_check().await;
    let (migrations_total, migrations_applied) = migration_status(app.db.pool()).await?;

    Ok(HealthResponse {
        store_name: app.config.store_name.clone(),
        database,
        migrations_total,
        migrations_applied,
        coupons: app.catalog.list().len(),
        held_carts: app.held.with_store(|store| held::list(store).len()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::app;

    #[tokio::test]
    async fn test_health_reports_migrations() {
        let (app, _rx) = app(false).await;
        let health = health(&app).await.unwrap();

        assert!(health.database);
        assert_eq!(health.migrations_total, health.migrations_applied);
        assert!(health.coupons > 0);
        assert_eq!(health.held_carts, 0);
        assert_eq!(get_config(&app).store_name, health.store_name);
    }
}
