//! Product image handlers. Only the storage path is recorded; image bytes
//! are handled elsewhere.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{
    map_db_error, normalize_limit, normalize_offset, validation, ApiError, ApiResponse, AppState,
};

#[derive(Debug, Serialize)]
pub(super) struct ProductImageItem {
    id: i64,
    product_id: i64,
    image: String,
    is_main: bool,
    created_at: DateTime<Utc>,
}

impl From<prodzm_db::ProductImageRow> for ProductImageItem {
    fn from(row: prodzm_db::ProductImageRow) -> Self {
        Self {
            id: row.id,
            product_id: row.product_id,
            image: row.image,
            is_main: row.is_main,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct ProductImageQuery {
    pub product_id: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateProductImageRequest {
    pub product_id: i64,
    pub filename: String,
    #[serde(default)]
    pub is_main: bool,
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdateProductImageRequest {
    pub filename: Option<String>,
    pub is_main: Option<bool>,
}

pub(super) async fn list_product_images(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ProductImageQuery>,
) -> Result<Json<ApiResponse<Vec<ProductImageItem>>>, ApiError> {
    let rows = prodzm_db::list_product_images(
        &state.pool,
        query.product_id,
        normalize_limit(query.limit),
        normalize_offset(query.offset),
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows.into_iter().map(ProductImageItem::from).collect();
    Ok(Json(ApiResponse::new(data, req_id.0)))
}

pub(super) async fn get_product_image(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<ProductImageItem>>, ApiError> {
    let row = prodzm_db::get_product_image(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::not_found(&req_id.0, "product image", id))?;

    Ok(Json(ApiResponse::new(row.into(), req_id.0)))
}

/// POST /api/v1/product-images — a main image demotes the product's current one.
pub(super) async fn create_product_image(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateProductImageRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ProductImageItem>>), ApiError> {
    let rid = &req_id.0;
    let filename = validation::required_text(rid, "filename", &body.filename, 255)?;

    let row = prodzm_db::create_product_image(
        &state.pool,
        &prodzm_db::NewProductImage {
            product_id: body.product_id,
            filename: &filename,
            is_main: body.is_main,
        },
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(row.into(), req_id.0)),
    ))
}

/// PATCH /api/v1/product-images/:id
pub(super) async fn update_product_image(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateProductImageRequest>,
) -> Result<Json<ApiResponse<ProductImageItem>>, ApiError> {
    let rid = &req_id.0;
    let filename = validation::optional_text(rid, "filename", body.filename.as_deref(), 255)?;

    let row = prodzm_db::update_product_image(&state.pool, id, filename.as_deref(), body.is_main)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse::new(row.into(), req_id.0)))
}

/// POST /api/v1/product-images/:id/set-main
pub(super) async fn set_main_product_image(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<ProductImageItem>>, ApiError> {
    let row = prodzm_db::set_main_product_image(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(row.into(), req_id.0)))
}

pub(super) async fn delete_product_image(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    prodzm_db::delete_product_image(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(
        serde_json::json!({ "deleted": true }),
        req_id.0,
    )))
}
