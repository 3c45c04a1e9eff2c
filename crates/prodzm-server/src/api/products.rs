use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{
    map_db_error, map_delete_error, normalize_limit, normalize_offset,
    product_images::ProductImageItem, validation, ApiError, ApiResponse, AppState,
};

const RELATED_PRODUCTS_LIMIT: i64 = 5;
const MAX_IMAGES_PER_DETAIL: i64 = 200;

#[derive(Debug, Serialize)]
pub(super) struct ProductItem {
    id: i64,
    name: String,
    description: String,
    category_id: Option<i64>,
    category_name: Option<String>,
    price: Decimal,
    remaining_stock: i32,
    orders: i32,
    rating: Decimal,
    sku: String,
    supplier: Option<String>,
    created_at: DateTime<Utc>,
    is_available: bool,
    has_images: bool,
    average_rating: Decimal,
}

impl From<prodzm_db::ProductRow> for ProductItem {
    fn from(row: prodzm_db::ProductRow) -> Self {
        Self {
            is_available: row.is_available(),
            id: row.id,
            name: row.name,
            description: row.description,
            category_id: row.category_id,
            category_name: row.category_name,
            price: row.price,
            remaining_stock: row.remaining_stock,
            orders: row.orders,
            rating: row.rating,
            sku: row.sku,
            supplier: row.supplier,
            created_at: row.created_at,
            has_images: row.has_images,
            average_rating: row.average_rating,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct ProductDetail {
    #[serde(flatten)]
    product: ProductItem,
    images: Vec<ProductImageItem>,
    related_products: Vec<ProductItem>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ProductQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct SearchQuery {
    /// Exact category name.
    pub category: Option<String>,
    /// Minimum order count.
    pub orders: Option<i32>,
    /// Creation date (UTC), `YYYY-MM-DD`.
    pub date: Option<NaiveDate>,
    /// Maximum price.
    pub price: Option<Decimal>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category_id: Option<i64>,
    pub price: Decimal,
    #[serde(default)]
    pub remaining_stock: i32,
    #[serde(default)]
    pub orders: i32,
    #[serde(default)]
    pub rating: Decimal,
    pub sku: Option<String>,
    pub supplier: Option<String>,
}

// Outer None = key absent (keep current), Some(None) = explicit null (clear).
#[allow(clippy::option_option)]
#[derive(Debug, Deserialize)]
pub(super) struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "validation::deserialize_some")]
    pub category_id: Option<Option<i64>>,
    pub price: Option<Decimal>,
    pub remaining_stock: Option<i32>,
    pub orders: Option<i32>,
    pub rating: Option<Decimal>,
    pub sku: Option<String>,
    #[serde(default, deserialize_with = "validation::deserialize_some")]
    pub supplier: Option<Option<String>>,
}

pub(super) async fn list_products(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<ApiResponse<Vec<ProductItem>>>, ApiError> {
    let rows = prodzm_db::list_products(
        &state.pool,
        normalize_limit(query.limit),
        normalize_offset(query.offset),
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows.into_iter().map(ProductItem::from).collect();
    Ok(Json(ApiResponse::new(data, req_id.0)))
}

/// GET /api/v1/products/search — all supplied filters must match.
pub(super) async fn search_products(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiResponse<Vec<ProductItem>>>, ApiError> {
    let search = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let rows = prodzm_db::search_products(
        &state.pool,
        prodzm_db::ProductSearchFilters {
            category: query.category.as_deref(),
            min_orders: query.orders,
            created_on: query.date,
            max_price: query.price,
            search,
            limit: normalize_limit(query.limit),
            offset: normalize_offset(query.offset),
        },
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows.into_iter().map(ProductItem::from).collect();
    Ok(Json(ApiResponse::new(data, req_id.0)))
}

/// GET /api/v1/products/:id — product with its images and related products.
pub(super) async fn get_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<ProductDetail>>, ApiError> {
    let rid = &req_id.0;
    let row = prodzm_db::get_product(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| ApiError::not_found(rid, "product", id))?;

    let images = prodzm_db::list_product_images(&state.pool, Some(id), MAX_IMAGES_PER_DETAIL, 0)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    let related = prodzm_db::list_related_products(&state.pool, &row, RELATED_PRODUCTS_LIMIT)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    let data = ProductDetail {
        product: row.into(),
        images: images.into_iter().map(ProductImageItem::from).collect(),
        related_products: related.into_iter().map(ProductItem::from).collect(),
    };
    Ok(Json(ApiResponse::new(data, req_id.0)))
}

/// POST /api/v1/products
pub(super) async fn create_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ProductItem>>), ApiError> {
    let rid = &req_id.0;
    let name = validation::required_text(rid, "name", &body.name, 255)?;
    let price = validation::price(rid, "price", body.price)?;
    let remaining_stock = validation::non_negative(rid, "remaining_stock", body.remaining_stock)?;
    let orders = validation::non_negative(rid, "orders", body.orders)?;
    let rating = validation::product_rating(rid, body.rating)?;
    let sku = validation::optional_text(rid, "sku", body.sku.as_deref(), 100)?;
    let supplier = validation::optional_text(rid, "supplier", body.supplier.as_deref(), 255)?;

    let row = prodzm_db::create_product(
        &state.pool,
        &prodzm_db::NewProduct {
            name: &name,
            description: body.description.trim(),
            category_id: body.category_id,
            price,
            remaining_stock,
            orders,
            rating,
            sku: sku.as_deref(),
            supplier: supplier.as_deref(),
        },
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(row.into(), req_id.0)),
    ))
}

/// PATCH /api/v1/products/:id — sparse update.
pub(super) async fn update_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateProductRequest>,
) -> Result<Json<ApiResponse<ProductItem>>, ApiError> {
    let rid = &req_id.0;
    let name = validation::optional_text(rid, "name", body.name.as_deref(), 255)?;
    let price = body
        .price
        .map(|p| validation::price(rid, "price", p))
        .transpose()?;
    let remaining_stock = body
        .remaining_stock
        .map(|v| validation::non_negative(rid, "remaining_stock", v))
        .transpose()?;
    let orders = body
        .orders
        .map(|v| validation::non_negative(rid, "orders", v))
        .transpose()?;
    let rating = body
        .rating
        .map(|r| validation::product_rating(rid, r))
        .transpose()?;
    let sku = validation::optional_text(rid, "sku", body.sku.as_deref(), 100)?;
    let supplier = match &body.supplier {
        Some(Some(s)) => Some(Some(validation::required_text(rid, "supplier", s, 255)?)),
        Some(None) => Some(None),
        None => None,
    };

    let row = prodzm_db::update_product(
        &state.pool,
        id,
        &prodzm_db::ProductChanges {
            name: name.as_deref(),
            description: body.description.as_deref().map(str::trim),
            category_id: body.category_id,
            price,
            remaining_stock,
            orders,
            rating,
            sku: sku.as_deref(),
            supplier: supplier.as_ref().map(|opt| opt.as_deref()),
        },
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse::new(row.into(), req_id.0)))
}

/// DELETE /api/v1/products/:id — refused while order items reference it.
pub(super) async fn delete_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    prodzm_db::delete_product(&state.pool, id)
        .await
        .map_err(|e| map_delete_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(
        serde_json::json!({ "deleted": true }),
        req_id.0,
    )))
}
