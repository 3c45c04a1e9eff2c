//! Request validation helpers shared by the write handlers.

use std::str::FromStr;

use prodzm_core::CoreError;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

use super::ApiError;

/// Largest amount a `NUMERIC(10, 2)` column holds: 99999999.99, i.e.
/// mantissa 9_999_999_999 (`2 << 32 | 1_410_065_407`) at scale 2.
const MAX_PRICE: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

/// For `Option<Option<T>>` PATCH fields: a present key (even `null`) becomes
/// `Some(..)`; pair with `#[serde(default)]` so an absent key stays `None`.
pub(super) fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Trims `value` and checks it is 1..=`max_len` characters.
pub(super) fn required_text(
    req_id: &str,
    field: &str,
    value: &str,
    max_len: usize,
) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.chars().count() > max_len {
        return Err(ApiError::new(
            req_id,
            "validation_error",
            format!("{field} must be 1–{max_len} characters"),
        ));
    }
    Ok(trimmed.to_owned())
}

pub(super) fn optional_text(
    req_id: &str,
    field: &str,
    value: Option<&str>,
    max_len: usize,
) -> Result<Option<String>, ApiError> {
    value
        .map(|v| required_text(req_id, field, v, max_len))
        .transpose()
}

pub(super) fn price(req_id: &str, field: &str, value: Decimal) -> Result<Decimal, ApiError> {
    if value.is_sign_negative() || value > MAX_PRICE || value.scale() > 2 {
        return Err(ApiError::new(
            req_id,
            "validation_error",
            format!("{field} must be a non-negative amount with at most two decimal places"),
        ));
    }
    Ok(value)
}

pub(super) fn non_negative(req_id: &str, field: &str, value: i32) -> Result<i32, ApiError> {
    if value < 0 {
        return Err(ApiError::new(
            req_id,
            "validation_error",
            format!("{field} must not be negative, got {value}"),
        ));
    }
    Ok(value)
}

pub(super) fn quantity(req_id: &str, value: i32) -> Result<i32, ApiError> {
    if value < 1 {
        return Err(ApiError::new(
            req_id,
            "validation_error",
            format!("quantity must be at least 1, got {value}"),
        ));
    }
    Ok(value)
}

/// Editorial product rating, 0 to 5 with two decimal places.
pub(super) fn product_rating(req_id: &str, value: Decimal) -> Result<Decimal, ApiError> {
    if value.is_sign_negative() || value > Decimal::from(5) || value.scale() > 2 {
        return Err(ApiError::new(
            req_id,
            "validation_error",
            format!("rating must be between 0 and 5, got {value}"),
        ));
    }
    Ok(value)
}

pub(super) fn review_rating(req_id: &str, value: i16) -> Result<i16, ApiError> {
    prodzm_core::validate_rating(value)
        .map_err(|e| ApiError::new(req_id, "validation_error", e.to_string()))
}

pub(super) fn email(req_id: &str, value: &str) -> Result<String, ApiError> {
    let value = required_text(req_id, "email", value, 254)?;
    let valid = value.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty()
            && domain.contains('.')
            && !domain.starts_with('.')
            && !domain.ends_with('.')
    });
    if !valid || value.contains(char::is_whitespace) {
        return Err(ApiError::new(
            req_id,
            "validation_error",
            format!("'{value}' is not a valid email address"),
        ));
    }
    Ok(value.to_lowercase())
}

/// Parse one of the core status enums, reporting unknown values as a 400.
pub(super) fn status<T>(req_id: &str, value: &str) -> Result<T, ApiError>
where
    T: FromStr<Err = CoreError>,
{
    value
        .parse::<T>()
        .map_err(|e| ApiError::new(req_id, "validation_error", e.to_string()))
}
