//! Database operations for the `shipping` table.
//!
//! `shipped_at` and `delivered_at` are never set by callers. They are stamped
//! the first time a status that implies them is written and then kept.

use chrono::{DateTime, Utc};
use prodzm_core::ShippingStatus;
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::DbError;

/// A shipment joined with a summary of its order.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ShippingRow {
    pub id: i64,
    pub order_id: i64,
    pub tracking_number: String,
    pub status: String,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub order_customer_id: i64,
    pub order_status: String,
    pub order_total_price: Option<Decimal>,
}

macro_rules! shipping_select {
    () => {
        "SELECT s.id, s.order_id, s.tracking_number, s.status, \
                s.shipped_at, s.delivered_at, \
                o.customer_id AS order_customer_id, \
                o.status AS order_status, \
                o.total_price AS order_total_price \
         FROM shipping s \
         JOIN orders o ON o.id = s.order_id "
    };
}

/// Lists shipments, optionally for one order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_shipping(
    pool: &PgPool,
    order_id: Option<i64>,
    limit: i64,
    offset: i64,
) -> Result<Vec<ShippingRow>, DbError> {
    let rows = sqlx::query_as::<_, ShippingRow>(concat!(
        shipping_select!(),
        "WHERE ($1::BIGINT IS NULL OR s.order_id = $1) \
         ORDER BY s.id DESC \
         LIMIT $2 OFFSET $3"
    ))
    .bind(order_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns a single shipment by id, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_shipping(pool: &PgPool, id: i64) -> Result<Option<ShippingRow>, DbError> {
    let row = sqlx::query_as::<_, ShippingRow>(concat!(shipping_select!(), "WHERE s.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Creates the shipment for an order.
///
/// # Errors
///
/// Returns [`DbError::ForeignKeyViolation`] for an unknown order,
/// [`DbError::UniqueViolation`] if the order already has a shipment or the
/// tracking number is taken, or [`DbError::Sqlx`] on any other failure.
pub async fn create_shipping(
    pool: &PgPool,
    order_id: i64,
    tracking_number: &str,
    status: ShippingStatus,
) -> Result<ShippingRow, DbError> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO shipping (order_id, tracking_number, status, shipped_at, delivered_at) \
         VALUES ($1, $2, $3, \
                 CASE WHEN $4::BOOL THEN NOW() END, \
                 CASE WHEN $5::BOOL THEN NOW() END) \
         RETURNING id",
    )
    .bind(order_id)
    .bind(tracking_number)
    .bind(status.as_str())
    .bind(status.has_shipped())
    .bind(status.is_delivered())
    .fetch_one(pool)
    .await?;

    tracing::debug!(order_id, shipping_id = id, status = %status, "shipment created");

    get_shipping(pool, id)
        .await?
        .ok_or_else(|| DbError::not_found("shipping", id))
}

/// Sparse update of tracking number and/or status. Moving to a shipped or
/// delivered status stamps the matching timestamp if it is still empty.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the shipment does not exist, or
/// [`DbError::UniqueViolation`] if the tracking number is taken.
pub async fn update_shipping(
    pool: &PgPool,
    id: i64,
    tracking_number: Option<&str>,
    status: Option<ShippingStatus>,
) -> Result<ShippingRow, DbError> {
    let stamp_shipped = status.is_some_and(ShippingStatus::has_shipped);
    let stamp_delivered = status.is_some_and(ShippingStatus::is_delivered);

    let updated: Option<i64> = sqlx::query_scalar(
        "UPDATE shipping \
         SET tracking_number = COALESCE($2, tracking_number), \
             status          = COALESCE($3, status), \
             shipped_at      = CASE WHEN $4::BOOL THEN COALESCE(shipped_at, NOW()) \
                                    ELSE shipped_at END, \
             delivered_at    = CASE WHEN $5::BOOL THEN COALESCE(delivered_at, NOW()) \
                                    ELSE delivered_at END \
         WHERE id = $1 \
         RETURNING id",
    )
    .bind(id)
    .bind(tracking_number)
    .bind(status.map(ShippingStatus::as_str))
    .bind(stamp_shipped)
    .bind(stamp_delivered)
    .fetch_optional(pool)
    .await?;

    if updated.is_none() {
        return Err(DbError::not_found("shipping", id));
    }

    get_shipping(pool, id)
        .await?
        .ok_or_else(|| DbError::not_found("shipping", id))
}

/// Deletes a shipment.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the shipment does not exist.
pub async fn delete_shipping(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM shipping WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("shipping", id));
    }
    Ok(())
}
