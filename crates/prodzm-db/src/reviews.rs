//! Database operations for the `reviews` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A review joined with the reviewer's display name.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReviewRow {
    pub id: i64,
    pub product_id: i64,
    pub customer_id: i64,
    pub customer_name: String,
    pub rating: i16,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

macro_rules! review_select {
    () => {
        "SELECT r.id, r.product_id, r.customer_id, \
                c.first_name || ' ' || c.last_name AS customer_name, \
                r.rating, r.comment, r.created_at \
         FROM reviews r \
         JOIN customers c ON c.id = r.customer_id "
    };
}

/// Lists reviews, newest first, optionally for one product.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_reviews(
    pool: &PgPool,
    product_id: Option<i64>,
    limit: i64,
    offset: i64,
) -> Result<Vec<ReviewRow>, DbError> {
    let rows = sqlx::query_as::<_, ReviewRow>(concat!(
        review_select!(),
        "WHERE ($1::BIGINT IS NULL OR r.product_id = $1) \
         ORDER BY r.created_at DESC, r.id DESC \
         LIMIT $2 OFFSET $3"
    ))
    .bind(product_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns a single review by id, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_review(pool: &PgPool, id: i64) -> Result<Option<ReviewRow>, DbError> {
    let row = sqlx::query_as::<_, ReviewRow>(concat!(review_select!(), "WHERE r.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Creates a review. The rating must already be validated (1–5); the
/// table's check constraint rejects anything else.
///
/// # Errors
///
/// Returns [`DbError::ForeignKeyViolation`] for an unknown product or
/// customer, or [`DbError::Sqlx`] on any other failure.
pub async fn create_review(
    pool: &PgPool,
    product_id: i64,
    customer_id: i64,
    rating: i16,
    comment: &str,
) -> Result<ReviewRow, DbError> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO reviews (product_id, customer_id, rating, comment) \
         VALUES ($1, $2, $3, $4) \
         RETURNING id",
    )
    .bind(product_id)
    .bind(customer_id)
    .bind(rating)
    .bind(comment)
    .fetch_one(pool)
    .await?;

    get_review(pool, id)
        .await?
        .ok_or_else(|| DbError::not_found("review", id))
}

/// Sparse update of rating and/or comment.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the review does not exist.
pub async fn update_review(
    pool: &PgPool,
    id: i64,
    rating: Option<i16>,
    comment: Option<&str>,
) -> Result<ReviewRow, DbError> {
    let updated: Option<i64> = sqlx::query_scalar(
        "UPDATE reviews \
         SET rating  = COALESCE($2, rating), \
             comment = COALESCE($3, comment) \
         WHERE id = $1 \
         RETURNING id",
    )
    .bind(id)
    .bind(rating)
    .bind(comment)
    .fetch_optional(pool)
    .await?;

    if updated.is_none() {
        return Err(DbError::not_found("review", id));
    }

    get_review(pool, id)
        .await?
        .ok_or_else(|| DbError::not_found("review", id))
}

/// Deletes a review.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the review does not exist.
pub async fn delete_review(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("review", id));
    }
    Ok(())
}
