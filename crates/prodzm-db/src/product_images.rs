//! Database operations for `product_images`.
//!
//! Every write that can set `is_main` runs in one transaction that locks the
//! owning product row, clears the flag on sibling images, and then writes the
//! incoming image. The partial unique index
//! `product_images_one_main_per_product` rejects anything that slips past.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use crate::DbError;

/// A row from the `product_images` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductImageRow {
    pub id: i64,
    pub product_id: i64,
    /// Storage path relative to the media root.
    pub image: String,
    pub is_main: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for [`create_product_image`].
#[derive(Debug, Clone)]
pub struct NewProductImage<'a> {
    pub product_id: i64,
    /// Client-side filename; turned into a storage path.
    pub filename: &'a str,
    pub is_main: bool,
}

/// Lists images, optionally restricted to one product. Main images come first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_product_images(
    pool: &PgPool,
    product_id: Option<i64>,
    limit: i64,
    offset: i64,
) -> Result<Vec<ProductImageRow>, DbError> {
    let rows = sqlx::query_as::<_, ProductImageRow>(
        "SELECT id, product_id, image, is_main, created_at \
         FROM product_images \
         WHERE ($1::BIGINT IS NULL OR product_id = $1) \
         ORDER BY product_id, is_main DESC, id \
         LIMIT $2 OFFSET $3",
    )
    .bind(product_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns a single image by id, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_product_image(pool: &PgPool, id: i64) -> Result<Option<ProductImageRow>, DbError> {
    let row = sqlx::query_as::<_, ProductImageRow>(
        "SELECT id, product_id, image, is_main, created_at \
         FROM product_images \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Stores a new image for a product. When it is marked main, every other
/// image of the product loses the flag in the same transaction.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the product does not exist (nothing is
/// written), [`DbError::UniqueViolation`] if a concurrent writer produced a
/// second main image, or [`DbError::Sqlx`] on any other failure.
pub async fn create_product_image(
    pool: &PgPool,
    image: &NewProductImage<'_>,
) -> Result<ProductImageRow, DbError> {
    let mut tx = pool.begin().await?;

    let product_name = lock_product(&mut tx, image.product_id).await?;
    let path = prodzm_core::product_image_upload_path(
        &product_name,
        image.filename,
        Utc::now().date_naive(),
    );

    if image.is_main {
        clear_main_flags(&mut tx, image.product_id, None).await?;
    }

    let row = sqlx::query_as::<_, ProductImageRow>(
        "INSERT INTO product_images (product_id, image, is_main) \
         VALUES ($1, $2, $3) \
         RETURNING id, product_id, image, is_main, created_at",
    )
    .bind(image.product_id)
    .bind(&path)
    .bind(image.is_main)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::debug!(
        product_id = row.product_id,
        image_id = row.id,
        is_main = row.is_main,
        "product image created"
    );
    Ok(row)
}

/// Updates an image's file and/or main flag.
///
/// `is_main = Some(true)` clears the flag on all sibling images first;
/// `Some(false)` or `None` never touches siblings.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the image does not exist,
/// [`DbError::UniqueViolation`] on a concurrent second main image, or
/// [`DbError::Sqlx`] on any other failure.
pub async fn update_product_image(
    pool: &PgPool,
    id: i64,
    filename: Option<&str>,
    is_main: Option<bool>,
) -> Result<ProductImageRow, DbError> {
    let mut tx = pool.begin().await?;

    let product_id: i64 =
        sqlx::query_scalar("SELECT product_id FROM product_images WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::not_found("product image", id))?;

    let product_name = lock_product(&mut tx, product_id).await?;
    let path = filename.map(|f| {
        prodzm_core::product_image_upload_path(&product_name, f, Utc::now().date_naive())
    });

    if is_main == Some(true) {
        clear_main_flags(&mut tx, product_id, Some(id)).await?;
    }

    let row = sqlx::query_as::<_, ProductImageRow>(
        "UPDATE product_images \
         SET image   = COALESCE($2, image), \
             is_main = COALESCE($3, is_main) \
         WHERE id = $1 \
         RETURNING id, product_id, image, is_main, created_at",
    )
    .bind(id)
    .bind(path)
    .bind(is_main)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| DbError::not_found("product image", id))?;

    tx.commit().await?;

    tracing::debug!(product_id, image_id = id, is_main = row.is_main, "product image updated");
    Ok(row)
}

/// Makes `id` the main image of its product.
///
/// # Errors
///
/// Same as [`update_product_image`].
pub async fn set_main_product_image(pool: &PgPool, id: i64) -> Result<ProductImageRow, DbError> {
    update_product_image(pool, id, None, Some(true)).await
}

/// Deletes an image. Deleting the main image leaves the product without one.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the image does not exist.
pub async fn delete_product_image(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM product_images WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("product image", id));
    }
    Ok(())
}

/// Row-locks the product so concurrent image writes for it run one at a time.
/// Returns the product name.
async fn lock_product(conn: &mut PgConnection, product_id: i64) -> Result<String, DbError> {
    sqlx::query_scalar::<_, String>("SELECT name FROM products WHERE id = $1 FOR UPDATE")
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("product", product_id))
}

/// Clears `is_main` on every image of the product except `keep`.
async fn clear_main_flags(
    conn: &mut PgConnection,
    product_id: i64,
    keep: Option<i64>,
) -> Result<u64, DbError> {
    let result = sqlx::query(
        "UPDATE product_images \
         SET is_main = false \
         WHERE product_id = $1 AND is_main \
           AND ($2::BIGINT IS NULL OR id <> $2)",
    )
    .bind(product_id)
    .bind(keep)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}
