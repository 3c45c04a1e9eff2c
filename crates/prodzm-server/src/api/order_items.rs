//! Order item handlers. Every write goes through the `prodzm_db::order_items`
//! service functions, which keep the order total in step with its items.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use prodzm_db::DbError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{
    map_db_error, normalize_limit, normalize_offset, validation, ApiError, ApiResponse, AppState,
};

#[derive(Debug, Serialize)]
pub(super) struct OrderLineItem {
    id: i64,
    order_id: i64,
    product_id: i64,
    product_name: String,
    quantity: i32,
    unit_price: Decimal,
    line_total: Decimal,
}

impl From<prodzm_db::OrderItemRow> for OrderLineItem {
    fn from(row: prodzm_db::OrderItemRow) -> Self {
        Self {
            line_total: prodzm_core::compute_total(&[row.line_item()]),
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            product_name: row.product_name,
            quantity: row.quantity,
            unit_price: row.unit_price,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct OrderItemChangeResponse {
    item: OrderLineItem,
    order_total: Decimal,
}

impl From<prodzm_db::OrderItemChange> for OrderItemChangeResponse {
    fn from(change: prodzm_db::OrderItemChange) -> Self {
        Self {
            item: change.item.into(),
            order_total: change.order_total,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct OrderItemQuery {
    pub order_id: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateOrderItemRequest {
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdateOrderItemRequest {
    pub quantity: i32,
}

/// Caller-facing errors keep their usual mapping; anything else collapses to
/// a single "order update failed".
fn map_order_item_error(request_id: String, error: &DbError) -> ApiError {
    match error {
        DbError::NotFound { .. }
        | DbError::OrderNotMutable { .. }
        | DbError::TooManyItems { .. }
        | DbError::OutOfRange { .. }
        | DbError::UniqueViolation { .. }
        | DbError::ForeignKeyViolation { .. }
        | DbError::CheckViolation { .. } => map_db_error(request_id, error),
        DbError::Sqlx(_) | DbError::Migration(_) => {
            tracing::error!(error = %error, "order item write rolled back");
            ApiError::new(request_id, "internal_error", "order update failed")
        }
    }
}

pub(super) async fn list_order_items(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<OrderItemQuery>,
) -> Result<Json<ApiResponse<Vec<OrderLineItem>>>, ApiError> {
    let rows = prodzm_db::list_order_items(
        &state.pool,
        query.order_id,
        normalize_limit(query.limit),
        normalize_offset(query.offset),
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows.into_iter().map(OrderLineItem::from).collect();
    Ok(Json(ApiResponse::new(data, req_id.0)))
}

pub(super) async fn get_order_item(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<OrderLineItem>>, ApiError> {
    let row = prodzm_db::get_order_item(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::not_found(&req_id.0, "order item", id))?;

    Ok(Json(ApiResponse::new(row.into(), req_id.0)))
}

/// POST /api/v1/order-items — adds an item and returns the new order total.
pub(super) async fn create_order_item(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateOrderItemRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OrderItemChangeResponse>>), ApiError> {
    let rid = &req_id.0;
    let quantity = validation::quantity(rid, body.quantity)?;

    let change = prodzm_db::create_order_item(&state.pool, body.order_id, body.product_id, quantity)
        .await
        .map_err(|e| map_order_item_error(rid.clone(), &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(change.into(), req_id.0)),
    ))
}

/// PATCH /api/v1/order-items/:id — changes the quantity.
pub(super) async fn update_order_item(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateOrderItemRequest>,
) -> Result<Json<ApiResponse<OrderItemChangeResponse>>, ApiError> {
    let rid = &req_id.0;
    let quantity = validation::quantity(rid, body.quantity)?;

    let change = prodzm_db::update_order_item_quantity(&state.pool, id, quantity)
        .await
        .map_err(|e| map_order_item_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse::new(change.into(), req_id.0)))
}

/// DELETE /api/v1/order-items/:id
pub(super) async fn delete_order_item(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let order_total = prodzm_db::delete_order_item(&state.pool, id)
        .await
        .map_err(|e| map_order_item_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(
        serde_json::json!({ "deleted": true, "order_total": order_total }),
        req_id.0,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_failures_collapse_to_order_update_failed() {
        let err = map_order_item_error(
            "req-1".to_string(),
            &DbError::Sqlx(sqlx::Error::PoolTimedOut),
        );
        assert_eq!(err.error.code, "internal_error");
        assert_eq!(err.error.message, "order update failed");
    }

    #[test]
    fn caller_errors_keep_their_codes() {
        let err = map_order_item_error(
            "req-1".to_string(),
            &DbError::OrderNotMutable {
                order_id: 3,
                status: "delivered".to_string(),
            },
        );
        assert_eq!(err.error.code, "conflict");

        let err = map_order_item_error(
            "req-1".to_string(),
            &DbError::NotFound {
                entity: "product",
                id: 9,
            },
        );
        assert_eq!(err.error.code, "not_found");
        assert_eq!(err.error.message, "product 9 not found");
    }

    #[test]
    fn full_order_is_a_conflict() {
        let err = map_order_item_error(
            "req-1".to_string(),
            &DbError::TooManyItems {
                max: prodzm_db::MAX_ORDER_ITEMS,
            },
        );
        assert_eq!(err.error.code, "conflict");
        assert_eq!(err.error.message, "an order may hold at most 200 items");
    }

    #[test]
    fn oversized_total_is_a_validation_error() {
        let err = map_order_item_error(
            "req-1".to_string(),
            &DbError::OutOfRange {
                message: "numeric field overflow".to_string(),
            },
        );
        assert_eq!(err.error.code, "validation_error");
    }
}
