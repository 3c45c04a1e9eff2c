//! Database operations for `products`, including the search and detail read models.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A product joined with its category name and review/image aggregates.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub price: Decimal,
    pub remaining_stock: i32,
    /// Popularity counter; maintained by catalog managers.
    pub orders: i32,
    /// Editorial rating (0–5), independent of customer reviews.
    pub rating: Decimal,
    pub sku: String,
    pub supplier: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Mean review rating, `0` when the product has no reviews.
    pub average_rating: Decimal,
    pub has_images: bool,
}

impl ProductRow {
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.remaining_stock > 0
    }
}

/// Input for [`create_product`]. `sku` defaults to the slugified name.
#[derive(Debug, Clone)]
pub struct NewProduct<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub category_id: Option<i64>,
    pub price: Decimal,
    pub remaining_stock: i32,
    pub orders: i32,
    pub rating: Decimal,
    pub sku: Option<&'a str>,
    pub supplier: Option<&'a str>,
}

/// Sparse update for [`update_product`].
///
/// `None` keeps the current value. For nullable columns the inner `None`
/// clears the column.
#[allow(clippy::option_option)]
#[derive(Debug, Clone, Default)]
pub struct ProductChanges<'a> {
    pub name: Option<&'a str>,
    pub description: Option<&'a str>,
    pub category_id: Option<Option<i64>>,
    pub price: Option<Decimal>,
    pub remaining_stock: Option<i32>,
    pub orders: Option<i32>,
    pub rating: Option<Decimal>,
    pub sku: Option<&'a str>,
    pub supplier: Option<Option<&'a str>>,
}

/// Optional filters for [`search_products`]; all supplied filters must match.
#[derive(Debug, Clone, Default)]
pub struct ProductSearchFilters<'a> {
    /// Exact category name.
    pub category: Option<&'a str>,
    /// Products ordered at least this many times.
    pub min_orders: Option<i32>,
    /// Products created on this calendar day (UTC).
    pub created_on: Option<NaiveDate>,
    /// Products priced at or below this amount.
    pub max_price: Option<Decimal>,
    /// Case-insensitive substring of the name or description.
    pub search: Option<&'a str>,
    pub limit: i64,
    pub offset: i64,
}

macro_rules! product_select {
    () => {
        "SELECT p.id, p.name, p.description, p.category_id, c.name AS category_name, \
                p.price, p.remaining_stock, p.orders, p.rating, p.sku, p.supplier, p.created_at, \
                COALESCE((SELECT AVG(r.rating) FROM reviews r WHERE r.product_id = p.id), 0) \
                    ::NUMERIC(3, 2) AS average_rating, \
                EXISTS (SELECT 1 FROM product_images i WHERE i.product_id = p.id) AS has_images \
         FROM products p \
         LEFT JOIN categories c ON c.id = p.category_id "
    };
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Returns products ordered by popularity, then name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_products(
    pool: &PgPool,
    limit: i64,
    offset: i64,
) -> Result<Vec<ProductRow>, DbError> {
    let rows = sqlx::query_as::<_, ProductRow>(concat!(
        product_select!(),
        "ORDER BY p.orders DESC, p.name, p.id LIMIT $1 OFFSET $2"
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns a single product by id, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_product(pool: &PgPool, id: i64) -> Result<Option<ProductRow>, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(concat!(product_select!(), "WHERE p.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Filters products by category name, order count, creation date, price
/// ceiling, and free-text search.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn search_products(
    pool: &PgPool,
    filters: ProductSearchFilters<'_>,
) -> Result<Vec<ProductRow>, DbError> {
    let pattern = filters.search.map(|s| format!("%{}%", escape_like(s)));

    let rows = sqlx::query_as::<_, ProductRow>(concat!(
        product_select!(),
        "WHERE ($1::TEXT IS NULL OR c.name = $1) \
           AND ($2::INTEGER IS NULL OR p.orders >= $2) \
           AND ($3::DATE IS NULL OR (p.created_at AT TIME ZONE 'UTC')::DATE = $3) \
           AND ($4::NUMERIC IS NULL OR p.price <= $4) \
           AND ($5::TEXT IS NULL OR p.name ILIKE $5 OR p.description ILIKE $5) \
         ORDER BY p.orders DESC, p.name, p.id \
         LIMIT $6 OFFSET $7"
    ))
    .bind(filters.category)
    .bind(filters.min_orders)
    .bind(filters.created_on)
    .bind(filters.max_price)
    .bind(pattern)
    .bind(filters.limit)
    .bind(filters.offset)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Other products in the same category. Empty for uncategorized products.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_related_products(
    pool: &PgPool,
    product: &ProductRow,
    limit: i64,
) -> Result<Vec<ProductRow>, DbError> {
    let Some(category_id) = product.category_id else {
        return Ok(Vec::new());
    };

    let rows = sqlx::query_as::<_, ProductRow>(concat!(
        product_select!(),
        "WHERE p.category_id = $1 AND p.id <> $2 \
         ORDER BY p.orders DESC, p.name, p.id \
         LIMIT $3"
    ))
    .bind(category_id)
    .bind(product.id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Creates a product and returns it with its read-model columns.
///
/// # Errors
///
/// Returns [`DbError::UniqueViolation`] for a duplicate SKU,
/// [`DbError::ForeignKeyViolation`] for an unknown category, or
/// [`DbError::Sqlx`] on any other failure.
pub async fn create_product(
    pool: &PgPool,
    product: &NewProduct<'_>,
) -> Result<ProductRow, DbError> {
    // The id is reserved first so a name-less slug can fall back to it.
    let id: i64 = sqlx::query_scalar("SELECT nextval(pg_get_serial_sequence('products', 'id'))")
        .fetch_one(pool)
        .await?;
    let sku = product
        .sku
        .map_or_else(|| prodzm_core::sku_from_name(product.name, id), str::to_owned);

    sqlx::query(
        "INSERT INTO products \
             (id, name, description, category_id, price, remaining_stock, orders, rating, sku, \
              supplier) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(id)
    .bind(product.name)
    .bind(product.description)
    .bind(product.category_id)
    .bind(product.price)
    .bind(product.remaining_stock)
    .bind(product.orders)
    .bind(product.rating)
    .bind(&sku)
    .bind(product.supplier)
    .execute(pool)
    .await?;

    tracing::debug!(product_id = id, sku = %sku, "product created");

    get_product(pool, id)
        .await?
        .ok_or_else(|| DbError::not_found("product", id))
}

/// Applies a sparse update to a product.
///
/// Changing the price never touches existing order items; their unit price
/// was captured when they were created.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the product does not exist.
pub async fn update_product(
    pool: &PgPool,
    id: i64,
    changes: &ProductChanges<'_>,
) -> Result<ProductRow, DbError> {
    let category_supplied = changes.category_id.is_some();
    let category_val = changes.category_id.flatten();
    let supplier_supplied = changes.supplier.is_some();
    let supplier_val = changes.supplier.flatten();

    let updated: Option<i64> = sqlx::query_scalar(
        "UPDATE products \
         SET name            = COALESCE($2, name), \
             description     = COALESCE($3, description), \
             category_id     = CASE WHEN $4::BOOL THEN $5 ELSE category_id END, \
             price           = COALESCE($6, price), \
             remaining_stock = COALESCE($7, remaining_stock), \
             orders          = COALESCE($8, orders), \
             rating          = COALESCE($9, rating), \
             sku             = COALESCE($10, sku), \
             supplier        = CASE WHEN $11::BOOL THEN $12 ELSE supplier END \
         WHERE id = $1 \
         RETURNING id",
    )
    .bind(id)
    .bind(changes.name)
    .bind(changes.description)
    .bind(category_supplied)
    .bind(category_val)
    .bind(changes.price)
    .bind(changes.remaining_stock)
    .bind(changes.orders)
    .bind(changes.rating)
    .bind(changes.sku)
    .bind(supplier_supplied)
    .bind(supplier_val)
    .fetch_optional(pool)
    .await?;

    if updated.is_none() {
        return Err(DbError::not_found("product", id));
    }

    get_product(pool, id)
        .await?
        .ok_or_else(|| DbError::not_found("product", id))
}

/// Deletes a product with its images and reviews.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the product does not exist, or
/// [`DbError::ForeignKeyViolation`] if order items still reference it.
pub async fn delete_product(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("product", id));
    }
    Ok(())
}

/// Escape `LIKE` metacharacters so user input matches literally.
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_like_escapes_wildcards() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }

    #[test]
    fn escape_like_leaves_plain_text() {
        assert_eq!(escape_like("mouse pad"), "mouse pad");
    }
}
