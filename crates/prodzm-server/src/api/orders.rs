use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use prodzm_core::OrderStatus;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{
    customers::CustomerItem, map_db_error, normalize_limit, normalize_offset,
    order_items::OrderLineItem, validation, ApiError, ApiResponse, AppState,
};

#[derive(Debug, Serialize)]
pub(super) struct OrderSummary {
    id: i64,
    customer_id: i64,
    status: String,
    created_at: DateTime<Utc>,
    total_price: Decimal,
}

impl From<prodzm_db::OrderRow> for OrderSummary {
    fn from(row: prodzm_db::OrderRow) -> Self {
        Self {
            total_price: row.total_or_zero(),
            id: row.id,
            customer_id: row.customer_id,
            status: row.status,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct OrderDetail {
    #[serde(flatten)]
    order: OrderSummary,
    customer: Option<CustomerItem>,
    items: Vec<OrderLineItem>,
}

#[derive(Debug, Deserialize)]
pub(super) struct OrderQuery {
    pub customer_id: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct NewOrderItemRequest {
    pub product_id: i64,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateOrderRequest {
    pub customer_id: i64,
    #[serde(default)]
    pub items: Vec<NewOrderItemRequest>,
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdateOrderRequest {
    pub status: String,
}

async fn load_order_detail(
    state: &AppState,
    rid: &str,
    row: prodzm_db::OrderRow,
) -> Result<OrderDetail, ApiError> {
    let customer = prodzm_db::get_customer(&state.pool, row.customer_id)
        .await
        .map_err(|e| map_db_error(rid.to_owned(), &e))?;
    let items = prodzm_db::list_items_for_order(&state.pool, row.id)
        .await
        .map_err(|e| map_db_error(rid.to_owned(), &e))?;

    Ok(OrderDetail {
        order: row.into(),
        customer: customer.map(CustomerItem::from),
        items: items.into_iter().map(OrderLineItem::from).collect(),
    })
}

pub(super) async fn list_orders(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<OrderQuery>,
) -> Result<Json<ApiResponse<Vec<OrderSummary>>>, ApiError> {
    let rows = prodzm_db::list_orders(
        &state.pool,
        query.customer_id,
        normalize_limit(query.limit),
        normalize_offset(query.offset),
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows.into_iter().map(OrderSummary::from).collect();
    Ok(Json(ApiResponse::new(data, req_id.0)))
}

/// GET /api/v1/orders/:id — order with customer and items.
pub(super) async fn get_order(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<OrderDetail>>, ApiError> {
    let rid = &req_id.0;
    let row = prodzm_db::get_order(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| ApiError::not_found(rid, "order", id))?;

    let data = load_order_detail(&state, rid, row).await?;
    Ok(Json(ApiResponse::new(data, req_id.0)))
}

/// POST /api/v1/orders — places a pending order, optionally with items.
pub(super) async fn create_order(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OrderDetail>>), ApiError> {
    let rid = &req_id.0;
    if body.items.len() > prodzm_db::MAX_ORDER_ITEMS {
        return Err(ApiError::new(
            rid,
            "validation_error",
            format!(
                "an order may hold at most {} items",
                prodzm_db::MAX_ORDER_ITEMS
            ),
        ));
    }
    let items = body
        .items
        .iter()
        .map(|item| {
            validation::quantity(rid, item.quantity).map(|quantity| prodzm_db::NewOrderItem {
                product_id: item.product_id,
                quantity,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let row = prodzm_db::create_order(&state.pool, body.customer_id, &items)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    let data = load_order_detail(&state, rid, row).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new(data, req_id.0))))
}

/// PATCH /api/v1/orders/:id — status transition.
pub(super) async fn update_order(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateOrderRequest>,
) -> Result<Json<ApiResponse<OrderSummary>>, ApiError> {
    let rid = &req_id.0;
    let status: OrderStatus = validation::status(rid, &body.status)?;

    let row = prodzm_db::update_order_status(&state.pool, id, status)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    tracing::info!(order_id = id, status = %status, "order status changed");
    Ok(Json(ApiResponse::new(row.into(), req_id.0)))
}

pub(super) async fn delete_order(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    prodzm_db::delete_order(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(
        serde_json::json!({ "deleted": true }),
        req_id.0,
    )))
}
