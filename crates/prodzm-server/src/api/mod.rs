mod categories;
mod customers;
mod order_items;
mod orders;
mod product_images;
mod products;
mod reviews;
mod shipping;
mod validation;


use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, patch, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use prodzm_db::DbError;
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{
    enforce_rate_limit, request_id, require_admin, require_bearer_auth, AuthState,
    RateLimitState, RequestId,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn new(data: T, request_id: String) -> Self {
        Self {
            data,
            meta: ResponseMeta::new(request_id),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }

    pub(super) fn not_found(request_id: &str, entity: &str, id: i64) -> Self {
        Self::new(request_id, "not_found", format!("{entity} {id} not found"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "forbidden" => StatusCode::FORBIDDEN,
            "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 200)
}

pub(super) fn normalize_offset(offset: Option<i64>) -> i64 {
    offset.unwrap_or(0).max(0)
}

/// Translate a database failure into the API error envelope.
pub(super) fn map_db_error(request_id: String, error: &DbError) -> ApiError {
    match error {
        DbError::NotFound { entity, id } => ApiError::not_found(&request_id, entity, *id),
        DbError::OrderNotMutable { .. } | DbError::TooManyItems { .. } => {
            ApiError::new(request_id, "conflict", error.to_string())
        }
        DbError::OutOfRange { message } => {
            tracing::debug!(message = %message, "numeric value out of range");
            ApiError::new(
                request_id,
                "validation_error",
                "amount exceeds the largest storable value",
            )
        }
        DbError::UniqueViolation { constraint } => {
            ApiError::new(request_id, "conflict", conflict_message(constraint))
        }
        DbError::ForeignKeyViolation { constraint } => {
            tracing::debug!(constraint = %constraint, "write referenced a missing row");
            ApiError::new(request_id, "not_found", "referenced entity not found")
        }
        DbError::CheckViolation { constraint } => ApiError::new(
            request_id,
            "validation_error",
            format!("value rejected by constraint {constraint}"),
        ),
        DbError::Sqlx(_) | DbError::Migration(_) => {
            tracing::error!(error = %error, "database query failed");
            ApiError::new(request_id, "internal_error", "database query failed")
        }
    }
}

/// Like [`map_db_error`], but a foreign-key failure on delete means the row
/// is still referenced elsewhere.
pub(super) fn map_delete_error(request_id: String, error: &DbError) -> ApiError {
    if let DbError::ForeignKeyViolation { .. } = error {
        return ApiError::new(
            request_id,
            "conflict",
            "still referenced by other records",
        );
    }
    map_db_error(request_id, error)
}

fn conflict_message(constraint: &str) -> &'static str {
    match constraint {
        "categories_name_key" => "a category with that name already exists",
        "products_sku_key" => "a product with that sku already exists",
        "customers_email_key" => "a customer with that email already exists",
        "shipping_order_id_key" => "the order already has a shipment",
        "shipping_tracking_number_key" => "that tracking number is already in use",
        "product_images_one_main_per_product" => "the product already has a main image",
        _ => "the resource already exists",
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

/// Catalog reads open to anonymous clients.
fn public_router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/categories", get(categories::list_categories))
        .route("/api/v1/categories/{id}", get(categories::get_category))
        .route("/api/v1/products", get(products::list_products))
        .route("/api/v1/products/search", get(products::search_products))
        .route("/api/v1/products/{id}", get(products::get_product))
        .route(
            "/api/v1/product-images",
            get(product_images::list_product_images),
        )
        .route(
            "/api/v1/product-images/{id}",
            get(product_images::get_product_image),
        )
        .route("/api/v1/reviews", get(reviews::list_reviews))
        .route("/api/v1/reviews/{id}", get(reviews::get_review))
}

/// Catalog writes plus the order side, for any configured key.
fn protected_router(auth: AuthState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/categories", post(categories::create_category))
        .route(
            "/api/v1/categories/{id}",
            patch(categories::update_category)
                .delete(categories::delete_category),
        )
        .route("/api/v1/products", post(products::create_product))
        .route(
            "/api/v1/products/{id}",
            patch(products::update_product).delete(products::delete_product),
        )
        .route(
            "/api/v1/product-images",
            post(product_images::create_product_image),
        )
        .route(
            "/api/v1/product-images/{id}",
            patch(product_images::update_product_image)
                .delete(product_images::delete_product_image),
        )
        .route(
            "/api/v1/product-images/{id}/set-main",
            post(product_images::set_main_product_image),
        )
        .route("/api/v1/reviews", post(reviews::create_review))
        .route(
            "/api/v1/reviews/{id}",
            patch(reviews::update_review).delete(reviews::delete_review),
        )
        .route(
            "/api/v1/orders",
            get(orders::list_orders).post(orders::create_order),
        )
        .route(
            "/api/v1/orders/{id}",
            get(orders::get_order)
                .patch(orders::update_order)
                .delete(orders::delete_order),
        )
        .route(
            "/api/v1/order-items",
            get(order_items::list_order_items).post(order_items::create_order_item),
        )
        .route(
            "/api/v1/order-items/{id}",
            get(order_items::get_order_item)
                .patch(order_items::update_order_item)
                .delete(order_items::delete_order_item),
        )
        .route(
            "/api/v1/shipping",
            get(shipping::list_shipping).post(shipping::create_shipping),
        )
        .route(
            "/api/v1/shipping/{id}",
            get(shipping::get_shipping)
                .patch(shipping::update_shipping)
                .delete(shipping::delete_shipping),
        )
        .layer(axum::middleware::from_fn_with_state(
            auth,
            require_bearer_auth,
        ))
}

/// Customer records, admin keys only.
fn admin_router(auth: AuthState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/customers",
            get(customers::list_customers).post(customers::create_customer),
        )
        .route(
            "/api/v1/customers/{id}",
            get(customers::get_customer)
                .patch(customers::update_customer)
                .delete(customers::delete_customer),
        )
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    auth,
                    require_bearer_auth,
                ))
                .layer(axum::middleware::from_fn(require_admin)),
        )
}

pub fn build_app(state: AppState, auth: AuthState, rate_limit: RateLimitState) -> Router {
    let health_routes = Router::new().route("/api/v1/health", get(health));

    let api_routes = Router::new()
        .merge(public_router())
        .merge(protected_router(auth.clone()))
        .merge(admin_router(auth))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit,
            enforce_rate_limit,
        ));

    Router::new()
        .merge(health_routes)
        .merge(api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match prodzm_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}
