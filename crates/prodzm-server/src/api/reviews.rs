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
pub(super) struct ReviewItem {
    id: i64,
    product_id: i64,
    customer_id: i64,
    customer_name: String,
    rating: i16,
    comment: String,
    created_at: DateTime<Utc>,
}

impl From<prodzm_db::ReviewRow> for ReviewItem {
    fn from(row: prodzm_db::ReviewRow) -> Self {
        Self {
            id: row.id,
            product_id: row.product_id,
            customer_id: row.customer_id,
            customer_name: row.customer_name,
            rating: row.rating,
            comment: row.comment,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct ReviewQuery {
    pub product_id: Option<i64>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateReviewRequest {
    pub product_id: i64,
    pub customer_id: i64,
    pub rating: i16,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdateReviewRequest {
    pub rating: Option<i16>,
    pub comment: Option<String>,
}

pub(super) async fn list_reviews(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ReviewQuery>,
) -> Result<Json<ApiResponse<Vec<ReviewItem>>>, ApiError> {
    let rows = prodzm_db::list_reviews(
        &state.pool,
        query.product_id,
        normalize_limit(query.limit),
        normalize_offset(query.offset),
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows.into_iter().map(ReviewItem::from).collect();
    Ok(Json(ApiResponse::new(data, req_id.0)))
}

pub(super) async fn get_review(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<ReviewItem>>, ApiError> {
    let row = prodzm_db::get_review(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::not_found(&req_id.0, "review", id))?;

    Ok(Json(ApiResponse::new(row.into(), req_id.0)))
}

pub(super) async fn create_review(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ReviewItem>>), ApiError> {
    let rid = &req_id.0;
    let rating = validation::review_rating(rid, body.rating)?;

    let row = prodzm_db::create_review(
        &state.pool,
        body.product_id,
        body.customer_id,
        rating,
        body.comment.trim(),
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(row.into(), req_id.0)),
    ))
}

pub(super) async fn update_review(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateReviewRequest>,
) -> Result<Json<ApiResponse<ReviewItem>>, ApiError> {
    let rid = &req_id.0;
    let rating = body
        .rating
        .map(|r| validation::review_rating(rid, r))
        .transpose()?;

    let row = prodzm_db::update_review(
        &state.pool,
        id,
        rating,
        body.comment.as_deref().map(str::trim),
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse::new(row.into(), req_id.0)))
}

pub(super) async fn delete_review(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    prodzm_db::delete_review(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(
        serde_json::json!({ "deleted": true }),
        req_id.0,
    )))
}
