//! Database operations for `order_items`.
//!
//! Each mutation is one transaction: lock the parent order, check it is
//! still pending, write the item, recompute the order total, commit. A
//! failure anywhere rolls back both the item write and the total.

use prodzm_core::LineItem;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use crate::orders::{lock_mutable_order, recompute_order_total, MAX_ORDER_ITEMS};
use crate::DbError;

/// An order item joined with its product name.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderItemRow {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i32,
    /// Product price when the item was created.
    pub unit_price: Decimal,
}

impl OrderItemRow {
    #[must_use]
    pub fn line_item(&self) -> LineItem {
        LineItem {
            quantity: self.quantity,
            unit_price: self.unit_price,
        }
    }
}

/// Result of an item mutation: the item as stored plus the order total
/// recomputed in the same transaction.
#[derive(Debug, Clone)]
pub struct OrderItemChange {
    pub item: OrderItemRow,
    pub order_total: Decimal,
}

macro_rules! order_item_select {
    () => {
        "SELECT oi.id, oi.order_id, oi.product_id, p.name AS product_name, \
                oi.quantity, oi.unit_price \
         FROM order_items oi \
         JOIN products p ON p.id = oi.product_id "
    };
}

/// Lists items, optionally for one order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_order_items(
    pool: &PgPool,
    order_id: Option<i64>,
    limit: i64,
    offset: i64,
) -> Result<Vec<OrderItemRow>, DbError> {
    let rows = sqlx::query_as::<_, OrderItemRow>(concat!(
        order_item_select!(),
        "WHERE ($1::BIGINT IS NULL OR oi.order_id = $1) \
         ORDER BY oi.order_id, oi.id \
         LIMIT $2 OFFSET $3"
    ))
    .bind(order_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Lists every item of one order. Orders hold at most
/// [`MAX_ORDER_ITEMS`] items, so the result is bounded.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_items_for_order(
    pool: &PgPool,
    order_id: i64,
) -> Result<Vec<OrderItemRow>, DbError> {
    let rows = sqlx::query_as::<_, OrderItemRow>(concat!(
        order_item_select!(),
        "WHERE oi.order_id = $1 ORDER BY oi.id"
    ))
    .bind(order_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns a single item by id, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_order_item(pool: &PgPool, id: i64) -> Result<Option<OrderItemRow>, DbError> {
    let row = sqlx::query_as::<_, OrderItemRow>(concat!(order_item_select!(), "WHERE oi.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Adds a product to a pending order at the product's current price.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] for an unknown order or product,
/// [`DbError::OrderNotMutable`] if the order is no longer pending,
/// [`DbError::TooManyItems`] if it already holds [`MAX_ORDER_ITEMS`] items,
/// [`DbError::CheckViolation`] for a non-positive quantity,
/// [`DbError::OutOfRange`] if the new total does not fit the column, or
/// [`DbError::Sqlx`] on any other failure. Nothing is written on error.
pub async fn create_order_item(
    pool: &PgPool,
    order_id: i64,
    product_id: i64,
    quantity: i32,
) -> Result<OrderItemChange, DbError> {
    let mut tx = pool.begin().await?;

    lock_mutable_order(&mut tx, order_id).await?;
    ensure_item_capacity(&mut tx, order_id).await?;
    let item_id = insert_item(&mut tx, order_id, product_id, quantity).await?;
    let order_total = recompute_order_total(&mut tx, order_id).await?;
    let item = fetch_item(&mut tx, item_id)
        .await?
        .ok_or_else(|| DbError::not_found("order item", item_id))?;

    tx.commit().await?;

    tracing::info!(
        order_id,
        item_id,
        product_id,
        quantity,
        total = %order_total,
        "order item added"
    );
    Ok(OrderItemChange { item, order_total })
}

/// Changes an item's quantity. The unit price is left as captured.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the item does not exist,
/// [`DbError::OrderNotMutable`] if its order is no longer pending,
/// [`DbError::OutOfRange`] if the new total does not fit the column, or
/// [`DbError::Sqlx`] on any other failure. Nothing is written on error.
pub async fn update_order_item_quantity(
    pool: &PgPool,
    id: i64,
    quantity: i32,
) -> Result<OrderItemChange, DbError> {
    let mut tx = pool.begin().await?;

    let order_id = item_order_id(&mut tx, id).await?;
    lock_mutable_order(&mut tx, order_id).await?;

    let updated: Option<i64> = sqlx::query_scalar(
        "UPDATE order_items SET quantity = $3 \
         WHERE id = $1 AND order_id = $2 \
         RETURNING id",
    )
    .bind(id)
    .bind(order_id)
    .bind(quantity)
    .fetch_optional(&mut *tx)
    .await?;
    if updated.is_none() {
        return Err(DbError::not_found("order item", id));
    }

    let order_total = recompute_order_total(&mut tx, order_id).await?;
    let item = fetch_item(&mut tx, id)
        .await?
        .ok_or_else(|| DbError::not_found("order item", id))?;

    tx.commit().await?;

    tracing::info!(order_id, item_id = id, quantity, total = %order_total, "order item updated");
    Ok(OrderItemChange { item, order_total })
}

/// Removes an item and returns the order's new total (zero when it was the
/// last item).
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the item does not exist,
/// [`DbError::OrderNotMutable`] if its order is no longer pending, or
/// [`DbError::Sqlx`] on any other failure. Nothing is written on error.
pub async fn delete_order_item(pool: &PgPool, id: i64) -> Result<Decimal, DbError> {
    let mut tx = pool.begin().await?;

    let order_id = item_order_id(&mut tx, id).await?;
    lock_mutable_order(&mut tx, order_id).await?;

    let result = sqlx::query("DELETE FROM order_items WHERE id = $1 AND order_id = $2")
        .bind(id)
        .bind(order_id)
        .execute(&mut *tx)
        .await?;
    if result.rows_affected() == 0 {
        return Err(DbError::not_found("order item", id));
    }

    let order_total = recompute_order_total(&mut tx, order_id).await?;
    tx.commit().await?;

    tracing::info!(order_id, item_id = id, total = %order_total, "order item removed");
    Ok(order_total)
}

/// Inserts an item priced from the product row. Does not touch the total.
pub(crate) async fn insert_item(
    conn: &mut PgConnection,
    order_id: i64,
    product_id: i64,
    quantity: i32,
) -> Result<i64, DbError> {
    let unit_price: Decimal = sqlx::query_scalar("SELECT price FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("product", product_id))?;

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO order_items (order_id, product_id, quantity, unit_price) \
         VALUES ($1, $2, $3, $4) \
         RETURNING id",
    )
    .bind(order_id)
    .bind(product_id)
    .bind(quantity)
    .bind(unit_price)
    .fetch_one(&mut *conn)
    .await?;

    Ok(id)
}

/// The caller must hold the order row lock, otherwise two writers could both
/// see room for one more item.
async fn ensure_item_capacity(conn: &mut PgConnection, order_id: i64) -> Result<(), DbError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM order_items WHERE order_id = $1")
        .bind(order_id)
        .fetch_one(&mut *conn)
        .await?;

    if usize::try_from(count).unwrap_or(usize::MAX) >= MAX_ORDER_ITEMS {
        return Err(DbError::TooManyItems {
            max: MAX_ORDER_ITEMS,
        });
    }
    Ok(())
}

async fn item_order_id(conn: &mut PgConnection, id: i64) -> Result<i64, DbError> {
    sqlx::query_scalar::<_, i64>("SELECT order_id FROM order_items WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("order item", id))
}

async fn fetch_item(conn: &mut PgConnection, id: i64) -> Result<Option<OrderItemRow>, DbError> {
    let row = sqlx::query_as::<_, OrderItemRow>(concat!(order_item_select!(), "WHERE oi.id = $1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row)
}
