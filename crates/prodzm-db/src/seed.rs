use prodzm_core::CategorySeed;
use sqlx::PgPool;

use crate::DbError;

/// Upsert catalog categories by name.
///
/// Returns the number of categories processed (inserted or updated).
/// All upserts run inside a single transaction; if any fails the whole batch
/// is rolled back.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any database operation fails.
pub async fn seed_categories(pool: &PgPool, categories: &[CategorySeed]) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;
    let mut count = 0usize;

    for category in categories {
        sqlx::query(
            "INSERT INTO categories (name, description) \
             VALUES ($1, $2) \
             ON CONFLICT (name) DO UPDATE SET \
                 description = EXCLUDED.description",
        )
        .bind(category.name.trim())
        .bind(&category.description)
        .execute(&mut *tx)
        .await?;

        count += 1;
    }

    tx.commit().await?;
    tracing::info!(count, "catalog categories seeded");
    Ok(count)
}
