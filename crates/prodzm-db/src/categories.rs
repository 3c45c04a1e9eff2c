//! Database operations for the `categories` table.

use sqlx::PgPool;

use crate::DbError;

/// A row from the `categories` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CategoryRow {
    pub id: i64,
    pub name: String,
    pub description: String,
}

/// Returns categories ordered by name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_categories(
    pool: &PgPool,
    limit: i64,
    offset: i64,
) -> Result<Vec<CategoryRow>, DbError> {
    let rows = sqlx::query_as::<_, CategoryRow>(
        "SELECT id, name, description \
         FROM categories \
         ORDER BY name, id \
         LIMIT $1 OFFSET $2",
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns a single category by id, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_category(pool: &PgPool, id: i64) -> Result<Option<CategoryRow>, DbError> {
    let row = sqlx::query_as::<_, CategoryRow>(
        "SELECT id, name, description FROM categories WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Creates a category and returns the inserted row.
///
/// # Errors
///
/// Returns [`DbError::UniqueViolation`] if the name is taken, or
/// [`DbError::Sqlx`] on any other failure.
pub async fn create_category(
    pool: &PgPool,
    name: &str,
    description: &str,
) -> Result<CategoryRow, DbError> {
    let row = sqlx::query_as::<_, CategoryRow>(
        "INSERT INTO categories (name, description) \
         VALUES ($1, $2) \
         RETURNING id, name, description",
    )
    .bind(name)
    .bind(description)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Sparse update: `None` keeps the current value.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the category does not exist.
pub async fn update_category(
    pool: &PgPool,
    id: i64,
    name: Option<&str>,
    description: Option<&str>,
) -> Result<CategoryRow, DbError> {
    sqlx::query_as::<_, CategoryRow>(
        "UPDATE categories \
         SET name        = COALESCE($2, name), \
             description = COALESCE($3, description) \
         WHERE id = $1 \
         RETURNING id, name, description",
    )
    .bind(id)
    .bind(name)
    .bind(description)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DbError::not_found("category", id))
}

/// Deletes a category. Products in it keep existing with no category.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the category does not exist.
pub async fn delete_category(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM categories WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("category", id));
    }
    Ok(())
}
