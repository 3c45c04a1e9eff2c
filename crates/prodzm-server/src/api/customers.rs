//! Customer handlers. Mounted behind the admin key check.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{
    map_db_error, map_delete_error, normalize_limit, normalize_offset, validation, ApiError,
    ApiResponse, AppState,
};

#[derive(Debug, Serialize)]
pub(super) struct CustomerItem {
    id: i64,
    first_name: String,
    last_name: String,
    email: String,
    phone_number: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<prodzm_db::CustomerRow> for CustomerItem {
    fn from(row: prodzm_db::CustomerRow) -> Self {
        Self {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone_number: row.phone_number,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct CustomerQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateCustomerRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
}

#[allow(clippy::option_option)]
#[derive(Debug, Deserialize)]
pub(super) struct UpdateCustomerRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    #[serde(default, deserialize_with = "validation::deserialize_some")]
    pub phone_number: Option<Option<String>>,
}

pub(super) async fn list_customers(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<CustomerQuery>,
) -> Result<Json<ApiResponse<Vec<CustomerItem>>>, ApiError> {
    let rows = prodzm_db::list_customers(
        &state.pool,
        normalize_limit(query.limit),
        normalize_offset(query.offset),
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows.into_iter().map(CustomerItem::from).collect();
    Ok(Json(ApiResponse::new(data, req_id.0)))
}

pub(super) async fn get_customer(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<CustomerItem>>, ApiError> {
    let row = prodzm_db::get_customer(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::not_found(&req_id.0, "customer", id))?;

    Ok(Json(ApiResponse::new(row.into(), req_id.0)))
}

pub(super) async fn create_customer(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateCustomerRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CustomerItem>>), ApiError> {
    let rid = &req_id.0;
    let first_name = validation::required_text(rid, "first_name", &body.first_name, 100)?;
    let last_name = validation::required_text(rid, "last_name", &body.last_name, 100)?;
    let email = validation::email(rid, &body.email)?;
    let phone_number =
        validation::optional_text(rid, "phone_number", body.phone_number.as_deref(), 32)?;

    let row = prodzm_db::create_customer(
        &state.pool,
        &prodzm_db::NewCustomer {
            first_name: &first_name,
            last_name: &last_name,
            email: &email,
            phone_number: phone_number.as_deref(),
        },
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(row.into(), req_id.0)),
    ))
}

pub(super) async fn update_customer(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateCustomerRequest>,
) -> Result<Json<ApiResponse<CustomerItem>>, ApiError> {
    let rid = &req_id.0;
    let first_name = validation::optional_text(rid, "first_name", body.first_name.as_deref(), 100)?;
    let last_name = validation::optional_text(rid, "last_name", body.last_name.as_deref(), 100)?;
    let email = body
        .email
        .as_deref()
        .map(|e| validation::email(rid, e))
        .transpose()?;
    let phone_number = match &body.phone_number {
        Some(Some(p)) => Some(Some(validation::required_text(rid, "phone_number", p, 32)?)),
        Some(None) => Some(None),
        None => None,
    };

    let row = prodzm_db::update_customer(
        &state.pool,
        id,
        first_name.as_deref(),
        last_name.as_deref(),
        email.as_deref(),
        phone_number.as_ref().map(|opt| opt.as_deref()),
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse::new(row.into(), req_id.0)))
}

/// DELETE /api/v1/customers/:id — also removes their orders and reviews.
pub(super) async fn delete_customer(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    prodzm_db::delete_customer(&state.pool, id)
        .await
        .map_err(|e| map_delete_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(
        serde_json::json!({ "deleted": true }),
        req_id.0,
    )))
}
