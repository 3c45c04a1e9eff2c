//! Offline unit tests for prodzm-db pool configuration and row types.
//! These tests do not require a live database connection.

use chrono::Utc;
use prodzm_core::{compute_total, AppConfig, Environment};
use prodzm_db::{CustomerRow, DbError, OrderItemRow, OrderRow, PoolConfig, ProductRow};
use rust_decimal::Decimal;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).expect("valid decimal literal")
}

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let app_config = AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
        log_level: "info".to_string(),
        catalog_path: PathBuf::from("./config/catalog.yaml"),
        api_key_hash_salt: "salt".to_string(),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        rate_limit_max_requests: 120,
        rate_limit_window_secs: 60,
    };

    let pool_config = PoolConfig::from_app_config(&app_config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

#[test]
fn order_without_computed_total_reads_as_zero() {
    let mut order = OrderRow {
        id: 1,
        customer_id: 1,
        status: "pending".to_string(),
        created_at: Utc::now(),
        total_price: None,
    };
    assert_eq!(order.total_or_zero(), Decimal::ZERO);

    order.total_price = Some(dec("25.00"));
    assert_eq!(order.total_or_zero(), dec("25.00"));
}

#[test]
fn order_item_rows_feed_compute_total() {
    let items = [
        OrderItemRow {
            id: 1,
            order_id: 1,
            product_id: 1,
            product_name: "Widget".to_string(),
            quantity: 2,
            unit_price: dec("10.00"),
        },
        OrderItemRow {
            id: 2,
            order_id: 1,
            product_id: 2,
            product_name: "Gadget".to_string(),
            quantity: 1,
            unit_price: dec("5.00"),
        },
    ];

    let line_items: Vec<_> = items.iter().map(OrderItemRow::line_item).collect();
    assert_eq!(compute_total(&line_items), dec("25.00"));
}

#[test]
fn product_availability_follows_stock() {
    let mut product = ProductRow {
        id: 1,
        name: "Widget".to_string(),
        description: String::new(),
        category_id: None,
        category_name: None,
        price: dec("10.00"),
        remaining_stock: 0,
        orders: 0,
        rating: Decimal::ZERO,
        sku: "widget".to_string(),
        supplier: None,
        created_at: Utc::now(),
        average_rating: Decimal::ZERO,
        has_images: false,
    };
    assert!(!product.is_available());

    product.remaining_stock = 3;
    assert!(product.is_available());
}

#[test]
fn customer_display_name_joins_first_and_last() {
    let customer = CustomerRow {
        id: 1,
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        email: "ada@example.com".to_string(),
        phone_number: None,
        created_at: Utc::now(),
    };
    assert_eq!(customer.display_name(), "Ada Lovelace");
}

#[test]
fn order_not_mutable_message_names_status() {
    let err = DbError::OrderNotMutable {
        order_id: 4,
        status: "shipped".to_string(),
    };
    assert_eq!(
        err.to_string(),
        "order 4 is shipped; items can only change while it is pending"
    );
}
