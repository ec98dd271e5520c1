//! # Coupon Repository
//!
//! Persistent coupon catalog. The register loads it into an
//! [`InMemoryCouponCatalog`] at startup and writes every catalog change and
//! every redemption back through this repository.
//!
//! ## Row Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  coupons                                                                │
//! │                                                                         │
//! │  code │ kind              │ value │ discount_kind │ buy │ get │ cats    │
//! │  ─────┼───────────────────┼───────┼───────────────┼─────┼─────┼──────── │
//! │  SAVE10  percentage         1000    -               -     -     -       │
//! │  WELCOME5 fixed             500     -               -     -     -       │
//! │  B2G1    buy_x_get_y        -       -               2     1     -       │
//! │  FRESH15 category_discount  1500    percentage      -     -     ["produce"]
//! │                                                                         │
//! │  CouponRow ──TryFrom──► Coupon { kind: CouponKind::..., .. }           │
//! │  Coupon ──KindColumns──► nullable kind columns                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use checkout_core::coupon::{
    default_coupons, Coupon, CouponKind, CouponKindTag, InMemoryCouponCatalog, StackingRules,
};
use checkout_core::validation::validate_coupon;
use checkout_core::{DiscountValue, Money, Percentage};

const SELECT_COLUMNS: &str = r#"
    SELECT code, name, description, kind, value, discount_kind,
           maximum_discount_cents, buy_quantity, get_quantity, categories,
           minimum_purchase_cents, start_date, end_date, usage_limit,
           usage_count, is_active, allow_with_other_coupons,
           allow_with_discounts, max_stacking_bps
    FROM coupons
"#;

// =============================================================================
// Row Mapping
// =============================================================================

/// One row of the `coupons` table.
#[derive(Debug, Clone, sqlx::FromRow)]
struct CouponRow {
    code: String,
    name: String,
    description: String,
    kind: CouponKindTag,
    value: Option<i64>,
    discount_kind: Option<String>,
    maximum_discount_cents: Option<i64>,
    buy_quantity: Option<i64>,
    get_quantity: Option<i64>,
    categories: Option<String>,
    minimum_purchase_cents: Option<i64>,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    usage_limit: Option<i64>,
    usage_count: i64,
    is_active: bool,
    allow_with_other_coupons: bool,
    allow_with_discounts: bool,
    max_stacking_bps: Option<i64>,
}

fn required<T>(value: Option<T>, code: &str, column: &str, kind: CouponKindTag) -> DbResult<T> {
    value.ok_or_else(|| {
        DbError::invalid(format!(
            "coupon {}: {} is required for kind {}",
            code, column, kind
        ))
    })
}

fn to_u32(value: i64, code: &str, column: &str) -> DbResult<u32> {
    u32::try_from(value)
        .map_err(|_| DbError::invalid(format!("coupon {}: {} out of range: {}", code, column, value)))
}

impl TryFrom<CouponRow> for Coupon {
    type Error = DbError;

    fn try_from(row: CouponRow) -> DbResult<Coupon> {
        let code = row.code;
        let categories = row
            .categories
            .as_deref()
            .map(serde_json::from_str::<Vec<String>>)
            .transpose()?;
        let maximum_discount = row.maximum_discount_cents.map(Money::from_cents);

        let kind = match row.kind {
            CouponKindTag::Percentage => {
                let bps = required(row.value, &code, "value", row.kind)?;
                CouponKind::Percentage {
                    percent: Percentage::from_bps(to_u32(bps, &code, "value")?),
                    maximum_discount,
                }
            }
            CouponKindTag::Fixed => CouponKind::Fixed {
                amount: Money::from_cents(required(row.value, &code, "value", row.kind)?),
            },
            CouponKindTag::BuyXGetY => {
                let buy = required(row.buy_quantity, &code, "buy_quantity", row.kind)?;
                let get = required(row.get_quantity, &code, "get_quantity", row.kind)?;
                CouponKind::BuyXGetY {
                    buy_quantity: to_u32(buy, &code, "buy_quantity")?,
                    get_quantity: to_u32(get, &code, "get_quantity")?,
                    categories,
                }
            }
            CouponKindTag::CategoryDiscount => {
                let value = required(row.value, &code, "value", row.kind)?;
                let discount = match required(row.discount_kind, &code, "discount_kind", row.kind)?
                    .as_str()
                {
                    "percentage" => DiscountValue::Percentage {
                        value: Percentage::from_bps(to_u32(value, &code, "value")?),
                    },
                    "fixed" => DiscountValue::Fixed {
                        value: Money::from_cents(value),
                    },
                    other => {
                        return Err(DbError::invalid(format!(
                            "coupon {}: unknown discount_kind {}",
                            code, other
                        )))
                    }
                };
                CouponKind::CategoryDiscount {
                    categories: required(categories, &code, "categories", row.kind)?,
                    discount,
                    maximum_discount,
                }
            }
        };

        Ok(Coupon {
            kind,
            name: row.name,
            description: row.description,
            minimum_purchase: row.minimum_purchase_cents.map(Money::from_cents),
            start_date: row.start_date,
            end_date: row.end_date,
            usage_limit: row
                .usage_limit
                .map(|limit| to_u32(limit, &code, "usage_limit"))
                .transpose()?,
            usage_count: to_u32(row.usage_count, &code, "usage_count")?,
            is_active: row.is_active,
            stacking_rules: StackingRules {
                allow_with_other_coupons: row.allow_with_other_coupons,
                allow_with_discounts: row.allow_with_discounts,
                max_stacking_value: row
                    .max_stacking_bps
                    .map(|bps| to_u32(bps, &code, "max_stacking_bps").map(Percentage::from_bps))
                    .transpose()?,
            },
            code,
        })
    }
}

/// The nullable kind-specific columns of a coupon.
#[derive(Debug, Default)]
struct KindColumns {
    value: Option<i64>,
    discount_kind: Option<&'static str>,
    maximum_discount_cents: Option<i64>,
    buy_quantity: Option<i64>,
    get_quantity: Option<i64>,
    categories: Option<String>,
}

impl KindColumns {
    fn from_kind(kind: &CouponKind) -> DbResult<Self> {
        let columns = match kind {
            CouponKind::Percentage {
                percent,
                maximum_discount,
            } => KindColumns {
                value: Some(i64::from(percent.bps())),
                maximum_discount_cents: maximum_discount.map(|m| m.cents()),
                ..Default::default()
            },
            CouponKind::Fixed { amount } => KindColumns {
                value: Some(amount.cents()),
                ..Default::default()
            },
            CouponKind::BuyXGetY {
                buy_quantity,
                get_quantity,
                categories,
            } => KindColumns {
                buy_quantity: Some(i64::from(*buy_quantity)),
                get_quantity: Some(i64::from(*get_quantity)),
                categories: categories.as_ref().map(serde_json::to_string).transpose()?,
                ..Default::default()
            },
            CouponKind::CategoryDiscount {
                categories,
                discount,
                maximum_discount,
            } => {
                let (discount_kind, value) = match discount {
                    DiscountValue::Percentage { value } => ("percentage", i64::from(value.bps())),
                    DiscountValue::Fixed { value } => ("fixed", value.cents()),
                };
                KindColumns {
                    value: Some(value),
                    discount_kind: Some(discount_kind),
                    maximum_discount_cents: maximum_discount.map(|m| m.cents()),
                    categories: Some(serde_json::to_string(categories)?),
                    ..Default::default()
                }
            }
        };
        Ok(columns)
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for the coupon catalog.
#[derive(Debug, Clone)]
pub struct CouponRepository {
    pool: SqlitePool,
}

impl CouponRepository {
    /// Creates a new CouponRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CouponRepository { pool }
    }

    /// All coupons ordered by code.
    ///
    /// ## Errors
    /// `InvalidRecord` if any row does not describe a valid coupon.
    pub async fn list(&self) -> DbResult<Vec<Coupon>> {
        let rows: Vec<CouponRow> = sqlx::query_as(&format!("{} ORDER BY code", SELECT_COLUMNS))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Coupon::try_from).collect()
    }

    /// Gets a coupon by code (case-insensitive).
    pub async fn get(&self, code: &str) -> DbResult<Option<Coupon>> {
        let code = Coupon::normalize_code(code);

        let row: Option<CouponRow> = sqlx::query_as(&format!("{} WHERE code = ?1", SELECT_COLUMNS))
            .bind(&code)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Coupon::try_from).transpose()
    }

    /// Inserts a new coupon.
    ///
    /// ## Returns
    /// * `Ok(Coupon)` - The stored coupon, code upper-cased
    /// * `Err(DbError::InvalidRecord)` - Definition fails validation
    /// * `Err(DbError::UniqueViolation)` - Code already exists
    pub async fn create(&self, coupon: &Coupon) -> DbResult<Coupon> {
        let mut coupon = coupon.clone();
        coupon.code = Coupon::normalize_code(&coupon.code);
        validate_coupon(&coupon).map_err(|e| DbError::invalid(e.to_string()))?;

        debug!(code = %coupon.code, kind = %coupon.kind.tag(), "Inserting coupon");

        insert(&self.pool, &coupon, Utc::now())
            .await
            .map_err(|e| match e {
                DbError::UniqueViolation { .. } => DbError::duplicate("coupon code", &coupon.code),
                other => other,
            })?;

        Ok(coupon)
    }

    /// Replaces an existing coupon definition. `usage_count` is left as
    /// stored; only [`increment_usage`](Self::increment_usage) moves it.
    ///
    /// ## Returns
    /// * `Ok(Coupon)` - The row as stored after the update
    /// * `Err(DbError::NotFound)` - Code doesn't exist
    pub async fn update(&self, coupon: &Coupon) -> DbResult<Coupon> {
        let mut coupon = coupon.clone();
        coupon.code = Coupon::normalize_code(&coupon.code);
        validate_coupon(&coupon).map_err(|e| DbError::invalid(e.to_string()))?;

        debug!(code = %coupon.code, "Updating coupon");

        let columns = KindColumns::from_kind(&coupon.kind)?;
        let result = sqlx::query(
            r#"
            UPDATE coupons SET
                name = ?2,
                description = ?3,
                kind = ?4,
                value = ?5,
                discount_kind = ?6,
                maximum_discount_cents = ?7,
                buy_quantity = ?8,
                get_quantity = ?9,
                categories = ?10,
                minimum_purchase_cents = ?11,
                start_date = ?12,
                end_date = ?13,
                usage_limit = ?14,
                is_active = ?15,
                allow_with_other_coupons = ?16,
                allow_with_discounts = ?17,
                max_stacking_bps = ?18,
                updated_at = ?19
            WHERE code = ?1
            "#,
        )
        .bind(&coupon.code)
        .bind(&coupon.name)
        .bind(&coupon.description)
        .bind(coupon.kind.tag())
        .bind(columns.value)
        .bind(columns.discount_kind)
        .bind(columns.maximum_discount_cents)
        .bind(columns.buy_quantity)
        .bind(columns.get_quantity)
        .bind(columns.categories)
        .bind(coupon.minimum_purchase.map(|m| m.cents()))
        .bind(coupon.start_date)
        .bind(coupon.end_date)
        .bind(coupon.usage_limit.map(i64::from))
        .bind(coupon.is_active)
        .bind(coupon.stacking_rules.allow_with_other_coupons)
        .bind(coupon.stacking_rules.allow_with_discounts)
        .bind(
            coupon
                .stacking_rules
                .max_stacking_value
                .map(|p| i64::from(p.bps())),
        )
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Coupon", &coupon.code));
        }

        self.get(&coupon.code)
            .await?
            .ok_or_else(|| DbError::not_found("Coupon", &coupon.code))
    }

    /// Deletes a coupon.
    pub async fn delete(&self, code: &str) -> DbResult<()> {
        let code = Coupon::normalize_code(code);
        debug!(code = %code, "Deleting coupon");

        let result = sqlx::query("DELETE FROM coupons WHERE code = ?1")
            .bind(&code)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Coupon", code));
        }

        Ok(())
    }

    /// Counts one redemption by a settled sale.
    pub async fn increment_usage(&self, code: &str) -> DbResult<()> {
        let code = Coupon::normalize_code(code);
        debug!(code = %code, "Recording coupon redemption");

        let result = sqlx::query(
            "UPDATE coupons SET usage_count = usage_count + 1, updated_at = ?2 WHERE code = ?1",
        )
        .bind(&code)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Coupon", code));
        }

        Ok(())
    }

    /// Replaces the whole table with [`default_coupons`] in one transaction.
    pub async fn reset_to_defaults(&self, now: DateTime<Utc>) -> DbResult<Vec<Coupon>> {
        let defaults = default_coupons(now);

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM coupons").execute(&mut *tx).await?;
        for coupon in &defaults {
            insert(&mut *tx, coupon, now).await?;
        }

        tx.commit().await?;

        info!(count = defaults.len(), "Coupon table reset to defaults");
        Ok(defaults)
    }

    /// Loads the table into an in-memory catalog.
    ///
    /// Rows that do not describe a valid coupon are logged and skipped so a
    /// single bad row cannot keep the register from starting.
    pub async fn load_catalog(&self) -> DbResult<InMemoryCouponCatalog> {
        let rows: Vec<CouponRow> = sqlx::query_as(&format!("{} ORDER BY code", SELECT_COLUMNS))
            .fetch_all(&self.pool)
            .await?;

        let total = rows.len();
        let coupons: Vec<Coupon> = rows
            .into_iter()
            .filter_map(|row| match Coupon::try_from(row) {
                Ok(coupon) => Some(coupon),
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable coupon row");
                    None
                }
            })
            .collect();

        info!(loaded = coupons.len(), total, "Coupon catalog loaded");
        Ok(InMemoryCouponCatalog::from_coupons(coupons))
    }

    /// Counts stored coupons.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM coupons")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

async fn insert<'e, E>(executor: E, coupon: &Coupon, now: DateTime<Utc>) -> DbResult<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let columns = KindColumns::from_kind(&coupon.kind)?;

    sqlx::query(
        r#"
        INSERT INTO coupons (
            code, name, description,
            kind, value, discount_kind, maximum_discount_cents,
            buy_quantity, get_quantity, categories,
            minimum_purchase_cents, start_date, end_date,
            usage_limit, usage_count, is_active,
            allow_with_other_coupons, allow_with_discounts, max_stacking_bps,
            created_at, updated_at
        ) VALUES (
            ?1, ?2, ?3,
            ?4, ?5, ?6, ?7,
            ?8, ?9, ?10,
            ?11, ?12, ?13,
            ?14, ?15, ?16,
            ?17, ?18, ?19,
            ?20, ?20
        )
        "#,
    )
    .bind(&coupon.code)
    .bind(&coupon.name)
    .bind(&coupon.description)
    .bind(coupon.kind.tag())
    .bind(columns.value)
    .bind(columns.discount_kind)
    .bind(columns.maximum_discount_cents)
    .bind(columns.buy_quantity)
    .bind(columns.get_quantity)
    .bind(columns.categories)
    .bind(coupon.minimum_purchase.map(|m| m.cents()))
    .bind(coupon.start_date)
    .bind(coupon.end_date)
    .bind(coupon.usage_limit.map(i64::from))
    .bind(i64::from(coupon.usage_count))
    .bind(coupon.is_active)
    .bind(coupon.stacking_rules.allow_with_other_coupons)
    .bind(coupon.stacking_rules.allow_with_discounts)
    .bind(
        coupon
            .stacking_rules
            .max_stacking_value
            .map(|p| i64::from(p.bps())),
    )
    .bind(now)
    .execute(executor)
    .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::{Duration, TimeZone};
    use checkout_core::ports::CouponCatalog;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap()
    }

    async fn repo() -> CouponRepository {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.coupons()
    }

    fn produce_coupon() -> Coupon {
        Coupon {
            code: "greens".to_string(),
            name: "Greens $2 off".to_string(),
            description: String::new(),
            kind: CouponKind::CategoryDiscount {
                categories: vec!["produce".to_string()],
                discount: DiscountValue::fixed_cents(200),
                maximum_discount: None,
            },
            minimum_purchase: Some(Money::from_cents(1000)),
            start_date: now(),
            end_date: now() + Duration::days(30),
            usage_limit: Some(50),
            usage_count: 0,
            is_active: true,
            stacking_rules: StackingRules::default(),
        }
    }

    #[tokio::test]
    async fn test_reset_and_load_catalog() {
        let repo = repo().await;
        let defaults = repo.reset_to_defaults(now()).await.unwrap();

        assert_eq!(repo.count().await.unwrap(), defaults.len() as i64);
        assert_eq!(repo.list().await.unwrap().len(), defaults.len());

        let catalog = repo.load_catalog().await.unwrap();
        let save10 = catalog.find("save10").unwrap();
        let expected = defaults.iter().find(|c| c.code == "SAVE10").unwrap();
        assert_eq!(&save10, expected);
    }

    #[tokio::test]
    async fn test_every_default_kind_survives_storage() {
        let repo = repo().await;
        let defaults = repo.reset_to_defaults(now()).await.unwrap();

        for coupon in defaults {
            let stored = repo.get(&coupon.code).await.unwrap().unwrap();
            assert_eq!(stored, coupon);
        }
    }

    #[tokio::test]
    async fn test_create_normalizes_and_rejects_duplicates() {
        let repo = repo().await;

        let created = repo.create(&produce_coupon()).await.unwrap();
        assert_eq!(created.code, "GREENS");
        assert_eq!(repo.get("Greens").await.unwrap(), Some(created));

        let err = repo.create(&produce_coupon()).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref value, .. } if value == "GREENS"));
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_definition() {
        let repo = repo().await;
        let mut coupon = produce_coupon();
        coupon.end_date = coupon.start_date - Duration::days(1);

        let err = repo.create(&coupon).await.unwrap_err();
        assert!(matches!(err, DbError::InvalidRecord(_)));
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let repo = repo().await;
        repo.create(&produce_coupon()).await.unwrap();

        let mut changed = produce_coupon();
        changed.is_active = false;
        changed.kind = CouponKind::Percentage {
            percent: Percentage::from_percent(25),
            maximum_discount: Some(Money::from_cents(1500)),
        };
        repo.update(&changed).await.unwrap();

        let stored = repo.get("GREENS").await.unwrap().unwrap();
        assert!(!stored.is_active);
        assert_eq!(stored.kind, changed.kind);

        repo.delete("greens").await.unwrap();
        assert!(repo.get("GREENS").await.unwrap().is_none());
        assert!(matches!(
            repo.delete("GREENS").await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_unknown_code() {
        let repo = repo().await;
        let err = repo.update(&produce_coupon()).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_increment_usage() {
        let repo = repo().await;
        repo.create(&produce_coupon()).await.unwrap();

        repo.increment_usage("greens").await.unwrap();
        repo.increment_usage("GREENS").await.unwrap();

        let stored = repo.get("GREENS").await.unwrap().unwrap();
        assert_eq!(stored.usage_count, 2);
        assert!(matches!(
            repo.increment_usage("NOPE").await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_keeps_usage_count() {
        let repo = repo().await;
        repo.create(&produce_coupon()).await.unwrap();
        repo.increment_usage("GREENS").await.unwrap();
        repo.increment_usage("GREENS").await.unwrap();

        let mut edited = produce_coupon();
        edited.usage_count = 0;
        edited.name = "Greens $3 off".to_string();
        let updated = repo.update(&edited).await.unwrap();
        assert_eq!(updated.usage_count, 2);

        let stored = repo.get("GREENS").await.unwrap().unwrap();
        assert_eq!(stored.usage_count, 2);
        assert_eq!(stored.name, "Greens $3 off");
    }

    #[tokio::test]
    async fn test_load_catalog_skips_bad_rows() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.coupons();
        repo.reset_to_defaults(now()).await.unwrap();

        // buy_x_get_y without quantities
        sqlx::query(
            "INSERT INTO coupons (code, name, kind, start_date, end_date, created_at, updated_at)
             VALUES ('BROKEN', 'Broken', 'buy_x_get_y', ?1, ?1, ?1, ?1)",
        )
        .bind(now())
        .execute(db.pool())
        .await
        .unwrap();

        assert!(matches!(repo.list().await, Err(DbError::InvalidRecord(_))));

        let catalog = repo.load_catalog().await.unwrap();
        assert!(catalog.find("BROKEN").is_none());
        assert_eq!(catalog.len(), default_coupons(now()).len());
    }
}
