use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use prodzm_core::ShippingStatus;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{
    map_db_error, normalize_limit, normalize_offset, validation, ApiError, ApiResponse, AppState,
};

#[derive(Debug, Serialize)]
pub(super) struct ShippingOrder {
    id: i64,
    customer_id: i64,
    status: String,
    total_price: Decimal,
}

#[derive(Debug, Serialize)]
pub(super) struct ShippingItem {
    id: i64,
    order_id: i64,
    tracking_number: String,
    status: String,
    shipped_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
    order: ShippingOrder,
}

impl From<prodzm_db::ShippingRow> for ShippingItem {
    fn from(row: prodzm_db::ShippingRow) -> Self {
        Self {
            id: row.id,
            order_id: row.order_id,
            tracking_number: row.tracking_number,
            status: row.status,
            shipped_at: row.shipped_at,
            delivered_at: row.delivered_at,
            order: ShippingOrder {
                id: row.order_id,
                customer_id: row.order_customer_id,
                status: row.order_status,
                total_price: row.order_total_price.unwrap_or(Decimal::new(0, 2)),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct ShippingQuery {
    pub order_id: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateShippingRequest {
    pub order_id: i64,
    pub tracking_number: String,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdateShippingRequest {
    pub tracking_number: Option<String>,
    pub status: Option<String>,
}

pub(super) async fn list_shipping(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ShippingQuery>,
) -> Result<Json<ApiResponse<Vec<ShippingItem>>>, ApiError> {
    let rows = prodzm_db::list_shipping(
        &state.pool,
        query.order_id,
        normalize_limit(query.limit),
        normalize_offset(query.offset),
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows.into_iter().map(ShippingItem::from).collect();
    Ok(Json(ApiResponse::new(data, req_id.0)))
}

pub(super) async fn get_shipping(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<ShippingItem>>, ApiError> {
    let row = prodzm_db::get_shipping(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::not_found(&req_id.0, "shipping", id))?;

    Ok(Json(ApiResponse::new(row.into(), req_id.0)))
}

/// POST /api/v1/shipping — one shipment per order.
pub(super) async fn create_shipping(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateShippingRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ShippingItem>>), ApiError> {
    let rid = &req_id.0;
    let tracking_number =
        validation::required_text(rid, "tracking_number", &body.tracking_number, 100)?;
    let status = match body.status.as_deref() {
        Some(s) => validation::status(rid, s)?,
        None => ShippingStatus::Pending,
    };

    let row = prodzm_db::create_shipping(&state.pool, body.order_id, &tracking_number, status)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(row.into(), req_id.0)),
    ))
}

/// PATCH /api/v1/shipping/:id — status changes stamp `shipped_at`/`delivered_at`.
pub(super) async fn update_shipping(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateShippingRequest>,
) -> Result<Json<ApiResponse<ShippingItem>>, ApiError> {
    let rid = &req_id.0;
    let tracking_number = validation::optional_text(
        rid,
        "tracking_number",
        body.tracking_number.as_deref(),
        100,
    )?;
    let status: Option<ShippingStatus> = body
        .status
        .as_deref()
        .map(|s| validation::status(rid, s))
        .transpose()?;

    let row = prodzm_db::update_shipping(&state.pool, id, tracking_number.as_deref(), status)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse::new(row.into(), req_id.0)))
}

pub(super) async fn delete_shipping(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    prodzm_db::delete_shipping(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(
        serde_json::json!({ "deleted": true }),
        req_id.0,
    )))
}
