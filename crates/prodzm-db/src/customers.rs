//! Database operations for the `customers` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `customers` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CustomerRow {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CustomerRow {
    /// "First Last", as shown next to reviews.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone)]
pub struct NewCustomer<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: &'a str,
    pub phone_number: Option<&'a str>,
}

/// Returns customers ordered by last name, first name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_customers(
    pool: &PgPool,
    limit: i64,
    offset: i64,
) -> Result<Vec<CustomerRow>, DbError> {
    let rows = sqlx::query_as::<_, CustomerRow>(
        "SELECT id, first_name, last_name, email, phone_number, created_at \
         FROM customers \
         ORDER BY last_name, first_name, id \
         LIMIT $1 OFFSET $2",
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns a single customer by id, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_customer(pool: &PgPool, id: i64) -> Result<Option<CustomerRow>, DbError> {
    let row = sqlx::query_as::<_, CustomerRow>(
        "SELECT id, first_name, last_name, email, phone_number, created_at \
         FROM customers \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Creates a customer.
///
/// # Errors
///
/// Returns [`DbError::UniqueViolation`] if the email is already registered.
pub async fn create_customer(
    pool: &PgPool,
    customer: &NewCustomer<'_>,
) -> Result<CustomerRow, DbError> {
    let row = sqlx::query_as::<_, CustomerRow>(
        "INSERT INTO customers (first_name, last_name, email, phone_number) \
         VALUES ($1, $2, $3, $4) \
         RETURNING id, first_name, last_name, email, phone_number, created_at",
    )
    .bind(customer.first_name)
    .bind(customer.last_name)
    .bind(customer.email)
    .bind(customer.phone_number)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Sparse update; `phone_number = Some(None)` clears the number.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the customer does not exist, or
/// [`DbError::UniqueViolation`] if the new email is taken.
#[allow(clippy::option_option)]
pub async fn update_customer(
    pool: &PgPool,
    id: i64,
    first_name: Option<&str>,
    last_name: Option<&str>,
    email: Option<&str>,
    phone_number: Option<Option<&str>>,
) -> Result<CustomerRow, DbError> {
    let phone_supplied = phone_number.is_some();
    let phone_val = phone_number.flatten();

    sqlx::query_as::<_, CustomerRow>(
        "UPDATE customers \
         SET first_name   = COALESCE($2, first_name), \
             last_name    = COALESCE($3, last_name), \
             email        = COALESCE($4, email), \
             phone_number = CASE WHEN $5::BOOL THEN $6 ELSE phone_number END \
         WHERE id = $1 \
         RETURNING id, first_name, last_name, email, phone_number, created_at",
    )
    .bind(id)
    .bind(first_name)
    .bind(last_name)
    .bind(email)
    .bind(phone_supplied)
    .bind(phone_val)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DbError::not_found("customer", id))
}

/// Deletes a customer together with their orders and reviews.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the customer does not exist.
pub async fn delete_customer(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM customers WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("customer", id));
    }
    Ok(())
}
