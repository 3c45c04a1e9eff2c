//! Database operations for `orders`, and the order-total maintenance shared
//! with [`crate::order_items`].
//!
//! `orders.total_price` is written only by [`recompute_order_total`], which
//! always runs inside the same transaction as the item write it reacts to,
//! after the order row has been locked.

use chrono::{DateTime, Utc};
use prodzm_core::{compute_total, LineItem, OrderStatus};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use crate::{order_items, DbError};

/// Most items one order may hold; enforced when placing an order and when
/// adding an item to it.
pub const MAX_ORDER_ITEMS: usize = 200;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `orders` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderRow {
    pub id: i64,
    pub customer_id: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
    /// `NULL` until the first item write.
    pub total_price: Option<Decimal>,
}

impl OrderRow {
    /// Stored total with `NULL` read as `0.00`.
    #[must_use]
    pub fn total_or_zero(&self) -> Decimal {
        self.total_price.unwrap_or(Decimal::new(0, 2))
    }
}

/// A line item supplied when placing an order.
#[derive(Debug, Clone, Copy)]
pub struct NewOrderItem {
    pub product_id: i64,
    pub quantity: i32,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Lists orders, newest first, optionally for one customer.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_orders(
    pool: &PgPool,
    customer_id: Option<i64>,
    limit: i64,
    offset: i64,
) -> Result<Vec<OrderRow>, DbError> {
    let rows = sqlx::query_as::<_, OrderRow>(
        "SELECT id, customer_id, status, created_at, total_price \
         FROM orders \
         WHERE ($1::BIGINT IS NULL OR customer_id = $1) \
         ORDER BY created_at DESC, id DESC \
         LIMIT $2 OFFSET $3",
    )
    .bind(customer_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns a single order by id, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_order(pool: &PgPool, id: i64) -> Result<Option<OrderRow>, DbError> {
    let row = sqlx::query_as::<_, OrderRow>(
        "SELECT id, customer_id, status, created_at, total_price \
         FROM orders \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Places a pending order for a customer, with optional initial items.
///
/// Order, items, and total are written in one transaction; an unknown
/// customer or product aborts it with nothing persisted. With no items the
/// total stays `NULL`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] for an unknown customer or product,
/// [`DbError::TooManyItems`] for more than [`MAX_ORDER_ITEMS`] items,
/// [`DbError::OutOfRange`] if the total does not fit the column, or
/// [`DbError::Sqlx`] on any other failure.
pub async fn create_order(
    pool: &PgPool,
    customer_id: i64,
    items: &[NewOrderItem],
) -> Result<OrderRow, DbError> {
    if items.len() > MAX_ORDER_ITEMS {
        return Err(DbError::TooManyItems {
            max: MAX_ORDER_ITEMS,
        });
    }

    let mut tx = pool.begin().await?;

    let customer: Option<i64> = sqlx::query_scalar("SELECT id FROM customers WHERE id = $1")
        .bind(customer_id)
        .fetch_optional(&mut *tx)
        .await?;
    if customer.is_none() {
        return Err(DbError::not_found("customer", customer_id));
    }

    let order_id: i64 = sqlx::query_scalar(
        "INSERT INTO orders (customer_id, status) VALUES ($1, 'pending') RETURNING id",
    )
    .bind(customer_id)
    .fetch_one(&mut *tx)
    .await?;

    for item in items {
        order_items::insert_item(&mut tx, order_id, item.product_id, item.quantity).await?;
    }
    if !items.is_empty() {
        recompute_order_total(&mut tx, order_id).await?;
    }

    let row = fetch_order(&mut tx, order_id)
        .await?
        .ok_or_else(|| DbError::not_found("order", order_id))?;

    tx.commit().await?;

    tracing::info!(order_id, customer_id, items = items.len(), "order placed");
    Ok(row)
}

/// Sets the order status.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the order does not exist.
pub async fn update_order_status(
    pool: &PgPool,
    id: i64,
    status: OrderStatus,
) -> Result<OrderRow, DbError> {
    sqlx::query_as::<_, OrderRow>(
        "UPDATE orders SET status = $2 WHERE id = $1 \
         RETURNING id, customer_id, status, created_at, total_price",
    )
    .bind(id)
    .bind(status.as_str())
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DbError::not_found("order", id))
}

/// Deletes an order with its items and shipping record.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the order does not exist.
pub async fn delete_order(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM orders WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("order", id));
    }
    Ok(())
}

/// Recomputes one order's total from its persisted items in its own
/// transaction. Used to repair totals written outside the item functions.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the order does not exist.
pub async fn recompute_order_total_now(pool: &PgPool, order_id: i64) -> Result<Decimal, DbError> {
    let mut tx = pool.begin().await?;
    lock_order(&mut tx, order_id).await?;
    let total = recompute_order_total(&mut tx, order_id).await?;
    tx.commit().await?;
    Ok(total)
}

/// Recomputes every order's total. Returns the number of orders processed.
///
/// # Errors
///
/// Returns [`DbError`] on the first failing order; earlier orders stay committed.
pub async fn recompute_all_order_totals(pool: &PgPool) -> Result<usize, DbError> {
    let ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM orders ORDER BY id")
        .fetch_all(pool)
        .await?;

    for &order_id in &ids {
        match recompute_order_total_now(pool, order_id).await {
            Ok(_) => {}
            // Deleted since the id scan.
            Err(DbError::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }
    }

    Ok(ids.len())
}

// ---------------------------------------------------------------------------
// Transaction helpers
// ---------------------------------------------------------------------------

/// Locks the order row for the rest of the transaction and returns its status.
pub(crate) async fn lock_order(conn: &mut PgConnection, order_id: i64) -> Result<String, DbError> {
    sqlx::query_scalar::<_, String>("SELECT status FROM orders WHERE id = $1 FOR UPDATE")
        .bind(order_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("order", order_id))
}

/// Locks the order and checks that its items may still change.
pub(crate) async fn lock_mutable_order(
    conn: &mut PgConnection,
    order_id: i64,
) -> Result<(), DbError> {
    let status = lock_order(conn, order_id).await?;
    let mutable = status
        .parse::<OrderStatus>()
        .is_ok_and(OrderStatus::accepts_item_changes);

    if mutable {
        Ok(())
    } else {
        Err(DbError::OrderNotMutable { order_id, status })
    }
}

/// Writes `orders.total_price` from the items currently persisted for the
/// order. The caller must hold the order row lock.
pub(crate) async fn recompute_order_total(
    conn: &mut PgConnection,
    order_id: i64,
) -> Result<Decimal, DbError> {
    let items: Vec<(i32, Decimal)> = sqlx::query_as(
        "SELECT quantity, unit_price FROM order_items WHERE order_id = $1",
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;

    let line_items: Vec<LineItem> = items
        .into_iter()
        .map(|(quantity, unit_price)| LineItem {
            quantity,
            unit_price,
        })
        .collect();
    let total = compute_total(&line_items);

    sqlx::query("UPDATE orders SET total_price = $2 WHERE id = $1")
        .bind(order_id)
        .bind(total)
        .execute(&mut *conn)
        .await?;

    tracing::debug!(order_id, items = line_items.len(), total = %total, "order total recomputed");
    Ok(total)
}

async fn fetch_order(conn: &mut PgConnection, id: i64) -> Result<Option<OrderRow>, DbError> {
    let row = sqlx::query_as::<_, OrderRow>(
        "SELECT id, customer_id, status, created_at, total_price \
         FROM orders \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row)
}
