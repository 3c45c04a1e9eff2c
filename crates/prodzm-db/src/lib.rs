use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use thiserror::Error;

// Path relative to crates/prodzm-db/Cargo.toml; resolves to <workspace-root>/migrations/
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

/// Postgres SQLSTATE for `numeric_value_out_of_range`.
const NUMERIC_OUT_OF_RANGE: &str = "22003";

#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl PoolConfig {
    #[must_use]
    pub fn from_app_config(config: &prodzm_core::AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections,
            acquire_timeout_secs: config.db_acquire_timeout_secs,
        }
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error("order {order_id} is {status}; items can only change while it is pending")]
    OrderNotMutable { order_id: i64, status: String },
    #[error("an order may hold at most {max} items")]
    TooManyItems { max: usize },
    #[error("numeric value out of range: {message}")]
    OutOfRange { message: String },
    #[error("uniqueness constraint violated: {constraint}")]
    UniqueViolation { constraint: String },
    #[error("referenced entity not found or still referenced: {constraint}")]
    ForeignKeyViolation { constraint: String },
    #[error("check constraint violated: {constraint}")]
    CheckViolation { constraint: String },
    #[error(transparent)]
    Sqlx(sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl DbError {
    pub(crate) fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }
}

impl From<sqlx::Error> for DbError {
    /// Constraint violations and numeric overflow get their own variants so
    /// callers can tell bad input apart from an infrastructure failure.
    fn from(error: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &error {
            if db_err.code().as_deref() == Some(NUMERIC_OUT_OF_RANGE) {
                return Self::OutOfRange {
                    message: db_err.message().to_owned(),
                };
            }
            let constraint = db_err.constraint().unwrap_or("unknown").to_owned();
            if db_err.is_unique_violation() {
                return Self::UniqueViolation { constraint };
            }
            if db_err.is_foreign_key_violation() {
                return Self::ForeignKeyViolation { constraint };
            }
            if db_err.is_check_violation() {
                return Self::CheckViolation { constraint };
            }
        }
        Self::Sqlx(error)
    }
}

/// Connect to a Postgres pool using explicit URL and config.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the connection cannot be established.
pub async fn connect_pool(database_url: &str, config: PoolConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(database_url)
        .await
}

/// Run all pending migrations against the pool.
///
/// Returns the number of migrations that were applied.
///
/// # Errors
///
/// Returns [`sqlx::migrate::MigrateError`] if any migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<usize, sqlx::migrate::MigrateError> {
    // The _sqlx_migrations table does not exist on a fresh database; count that as zero.
    let applied_before: i64 =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = true")
            .fetch_one(pool)
            .await
            .unwrap_or(0);

    MIGRATOR.run(pool).await?;

    let applied_after: i64 =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = true")
            .fetch_one(pool)
            .await
            .unwrap_or(0);

    let delta = (applied_after - applied_before).max(0);
    Ok(usize::try_from(delta).unwrap_or(0))
}

/// Send a `SELECT 1` to verify the pool has a live connection.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await?;
    Ok(())
}

/// Run a full health check: ping the pool and return a typed error on failure.
///
/// # Errors
///
/// Returns [`DbError`] if the ping fails.
pub async fn health_check(pool: &PgPool) -> Result<(), DbError> {
    ping(pool).await?;
    Ok(())
}


pub mod categories;
pub mod customers;
pub mod order_items;
pub mod orders;
pub mod product_images;
pub mod products;
pub mod reviews;
pub mod seed;
pub mod shipping;

pub use categories::{
    create_category, delete_category, get_category, list_categories, update_category,
    CategoryRow,
};
pub use customers::{
    create_customer, delete_customer, get_customer, list_customers, update_customer,
    CustomerRow, NewCustomer,
};
pub use order_items::{
    create_order_item, delete_order_item, get_order_item, list_items_for_order, list_order_items,
    update_order_item_quantity, OrderItemChange, OrderItemRow,
};
pub use orders::{
    create_order, delete_order, get_order, list_orders, recompute_all_order_totals,
    recompute_order_total_now, update_order_status, NewOrderItem, OrderRow, MAX_ORDER_ITEMS,
};
pub use product_images::{
    create_product_image, delete_product_image, get_product_image, list_product_images,
    set_main_product_image, update_product_image, NewProductImage, ProductImageRow,
};
pub use products::{
    create_product, delete_product, get_product, list_products, list_related_products,
    search_products, update_product, NewProduct, ProductChanges, ProductRow,
    ProductSearchFilters,
};
pub use reviews::{
    create_review, delete_review, get_review, list_reviews, update_review, ReviewRow,
};
pub use seed::seed_categories;
pub use shipping::{
    create_shipping, delete_shipping, get_shipping, list_shipping, update_shipping, ShippingRow,
};
