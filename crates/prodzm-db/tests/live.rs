//! Live integration tests for prodzm-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. The `migrations` path is relative to the crate root
//! (`crates/prodzm-db/`), so `"../../migrations"` resolves to the workspace
//! migration directory.

use prodzm_core::{compute_total, CategorySeed, LineItem, OrderStatus, ShippingStatus};
use prodzm_db::{
    create_category, create_customer, create_order, create_order_item, create_product,
    create_product_image, create_review, create_shipping, delete_order_item, delete_product,
    get_order, get_product, get_product_image, list_items_for_order, list_order_items,
    list_product_images,
    list_related_products, recompute_all_order_totals, recompute_order_total_now,
    search_products, seed_categories, set_main_product_image, update_order_item_quantity,
    update_order_status, update_product, update_product_image, update_shipping, DbError,
    NewCustomer, NewOrderItem, NewProduct, NewProductImage, ProductChanges, ProductSearchFilters,
    MAX_ORDER_ITEMS,
};
use rust_decimal::Decimal;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).expect("valid decimal literal")
}

async fn insert_test_customer(pool: &sqlx::PgPool, email: &str) -> i64 {
    create_customer(
        pool,
        &NewCustomer {
            first_name: "Test",
            last_name: "Customer",
            email,
            phone_number: None,
        },
    )
    .await
    .unwrap_or_else(|e| panic!("insert_test_customer failed for '{email}': {e}"))
    .id
}

async fn insert_test_product(
    pool: &sqlx::PgPool,
    name: &str,
    price: &str,
    category_id: Option<i64>,
) -> i64 {
    create_product(
        pool,
        &NewProduct {
            name,
            description: "",
            category_id,
            price: dec(price),
            remaining_stock: 10,
            orders: 0,
            rating: Decimal::ZERO,
            sku: None,
            supplier: None,
        },
    )
    .await
    .unwrap_or_else(|e| panic!("insert_test_product failed for '{name}': {e}"))
    .id
}

async fn insert_empty_order(pool: &sqlx::PgPool) -> i64 {
    let customer_id = insert_test_customer(pool, "buyer@example.com").await;
    create_order(pool, customer_id, &[])
        .await
        .expect("create_order failed")
        .id
}

async fn stored_total(pool: &sqlx::PgPool, order_id: i64) -> Option<Decimal> {
    get_order(pool, order_id)
        .await
        .expect("get_order failed")
        .expect("order should exist")
        .total_price
}

async fn total_from_items(pool: &sqlx::PgPool, order_id: i64) -> Decimal {
    let items = list_items_for_order(pool, order_id)
        .await
        .expect("list_items_for_order failed");
    let line_items: Vec<LineItem> = items.iter().map(|i| i.line_item()).collect();
    compute_total(&line_items)
}

async fn main_image_ids(pool: &sqlx::PgPool, product_id: i64) -> Vec<i64> {
    list_product_images(pool, Some(product_id), 200, 0)
        .await
        .expect("list_product_images failed")
        .into_iter()
        .filter(|i| i.is_main)
        .map(|i| i.id)
        .collect()
}

fn image<'a>(product_id: i64, filename: &'a str, is_main: bool) -> NewProductImage<'a> {
    NewProductImage {
        product_id,
        filename,
        is_main,
    }
}

// ---------------------------------------------------------------------------
// Section 1: Order totals
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn order_total_follows_item_additions_and_removals(pool: sqlx::PgPool) {
    let order_id = insert_empty_order(&pool).await;
    let widget = insert_test_product(&pool, "Widget", "10.00", None).await;
    let gadget = insert_test_product(&pool, "Gadget", "5.00", None).await;

    assert_eq!(stored_total(&pool, order_id).await, None);

    let first = create_order_item(&pool, order_id, widget, 2)
        .await
        .expect("add widget");
    assert_eq!(first.order_total, dec("20.00"));

    let second = create_order_item(&pool, order_id, gadget, 1)
        .await
        .expect("add gadget");
    assert_eq!(second.order_total, dec("25.00"));
    assert_eq!(stored_total(&pool, order_id).await, Some(dec("25.00")));

    let after_gadget = delete_order_item(&pool, second.item.id)
        .await
        .expect("remove gadget");
    assert_eq!(after_gadget, dec("20.00"));
    assert_eq!(stored_total(&pool, order_id).await, Some(dec("20.00")));

    let after_widget = delete_order_item(&pool, first.item.id)
        .await
        .expect("remove widget");
    assert_eq!(after_widget, Decimal::ZERO);
    assert_eq!(stored_total(&pool, order_id).await, Some(dec("0.00")));
}

#[sqlx::test(migrations = "../../migrations")]
async fn quantity_change_recomputes_total(pool: sqlx::PgPool) {
    let order_id = insert_empty_order(&pool).await;
    let widget = insert_test_product(&pool, "Widget", "10.00", None).await;

    let added = create_order_item(&pool, order_id, widget, 1)
        .await
        .expect("add widget");
    assert_eq!(added.order_total, dec("10.00"));

    let changed = update_order_item_quantity(&pool, added.item.id, 3)
        .await
        .expect("update quantity");
    assert_eq!(changed.item.quantity, 3);
    assert_eq!(changed.item.product_name, "Widget");
    assert_eq!(changed.order_total, dec("30.00"));
    assert_eq!(stored_total(&pool, order_id).await, Some(dec("30.00")));
}

#[sqlx::test(migrations = "../../migrations")]
async fn stored_total_matches_items_after_every_mutation(pool: sqlx::PgPool) {
    let order_id = insert_empty_order(&pool).await;
    let a = insert_test_product(&pool, "Alpha", "3.33", None).await;
    let b = insert_test_product(&pool, "Beta", "0.99", None).await;
    let c = insert_test_product(&pool, "Gamma", "120.50", None).await;

    let item_a = create_order_item(&pool, order_id, a, 3).await.expect("a");
    assert_eq!(
        stored_total(&pool, order_id).await,
        Some(total_from_items(&pool, order_id).await)
    );

    let item_b = create_order_item(&pool, order_id, b, 7).await.expect("b");
    assert_eq!(
        stored_total(&pool, order_id).await,
        Some(total_from_items(&pool, order_id).await)
    );

    create_order_item(&pool, order_id, c, 1).await.expect("c");
    assert_eq!(
        stored_total(&pool, order_id).await,
        Some(total_from_items(&pool, order_id).await)
    );

    update_order_item_quantity(&pool, item_b.item.id, 2)
        .await
        .expect("update b");
    assert_eq!(
        stored_total(&pool, order_id).await,
        Some(total_from_items(&pool, order_id).await)
    );

    delete_order_item(&pool, item_a.item.id)
        .await
        .expect("delete a");
    assert_eq!(
        stored_total(&pool, order_id).await,
        Some(total_from_items(&pool, order_id).await)
    );
    assert_eq!(stored_total(&pool, order_id).await, Some(dec("122.48")));
}

#[sqlx::test(migrations = "../../migrations")]
async fn create_order_with_items_sets_total(pool: sqlx::PgPool) {
    let customer_id = insert_test_customer(&pool, "bulk@example.com").await;
    let widget = insert_test_product(&pool, "Widget", "10.00", None).await;
    let gadget = insert_test_product(&pool, "Gadget", "5.00", None).await;

    let order = create_order(
        &pool,
        customer_id,
        &[
            NewOrderItem {
                product_id: widget,
                quantity: 2,
            },
            NewOrderItem {
                product_id: gadget,
                quantity: 1,
            },
        ],
    )
    .await
    .expect("create_order failed");

    assert_eq!(order.status, "pending");
    assert_eq!(order.total_price, Some(dec("25.00")));
}

#[sqlx::test(migrations = "../../migrations")]
async fn create_order_with_unknown_product_writes_nothing(pool: sqlx::PgPool) {
    let customer_id = insert_test_customer(&pool, "bulk@example.com").await;
    let widget = insert_test_product(&pool, "Widget", "10.00", None).await;

    let err = create_order(
        &pool,
        customer_id,
        &[
            NewOrderItem {
                product_id: widget,
                quantity: 1,
            },
            NewOrderItem {
                product_id: 999_999,
                quantity: 1,
            },
        ],
    )
    .await
    .expect_err("unknown product should fail");
    assert!(matches!(err, DbError::NotFound { entity: "product", .. }));

    let orders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
        .fetch_one(&pool)
        .await
        .expect("count orders");
    assert_eq!(orders, 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn item_for_unknown_order_is_not_found(pool: sqlx::PgPool) {
    let widget = insert_test_product(&pool, "Widget", "10.00", None).await;

    let err = create_order_item(&pool, 999_999, widget, 1)
        .await
        .expect_err("unknown order should fail");
    assert!(matches!(err, DbError::NotFound { entity: "order", .. }));

    let items: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM order_items")
        .fetch_one(&pool)
        .await
        .expect("count items");
    assert_eq!(items, 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn item_for_unknown_product_leaves_total_untouched(pool: sqlx::PgPool) {
    let order_id = insert_empty_order(&pool).await;
    let widget = insert_test_product(&pool, "Widget", "10.00", None).await;
    create_order_item(&pool, order_id, widget, 1)
        .await
        .expect("add widget");

    let err = create_order_item(&pool, order_id, 999_999, 4)
        .await
        .expect_err("unknown product should fail");
    assert!(matches!(err, DbError::NotFound { entity: "product", .. }));

    assert_eq!(stored_total(&pool, order_id).await, Some(dec("10.00")));
    let items = list_order_items(&pool, Some(order_id), 50, 0)
        .await
        .expect("list items");
    assert_eq!(items.len(), 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn non_positive_quantity_is_rejected_without_writes(pool: sqlx::PgPool) {
    let order_id = insert_empty_order(&pool).await;
    let widget = insert_test_product(&pool, "Widget", "10.00", None).await;

    let err = create_order_item(&pool, order_id, widget, 0)
        .await
        .expect_err("zero quantity should fail");
    assert!(matches!(err, DbError::CheckViolation { .. }));
    assert_eq!(stored_total(&pool, order_id).await, None);
}

#[sqlx::test(migrations = "../../migrations")]
async fn shipped_order_rejects_item_changes(pool: sqlx::PgPool) {
    let order_id = insert_empty_order(&pool).await;
    let widget = insert_test_product(&pool, "Widget", "10.00", None).await;
    let added = create_order_item(&pool, order_id, widget, 2)
        .await
        .expect("add widget");

    update_order_status(&pool, order_id, OrderStatus::Shipped)
        .await
        .expect("ship order");

    let err = create_order_item(&pool, order_id, widget, 1)
        .await
        .expect_err("add on shipped order");
    assert!(matches!(err, DbError::OrderNotMutable { ref status, .. } if status == "shipped"));

    let err = update_order_item_quantity(&pool, added.item.id, 5)
        .await
        .expect_err("update on shipped order");
    assert!(matches!(err, DbError::OrderNotMutable { .. }));

    let err = delete_order_item(&pool, added.item.id)
        .await
        .expect_err("delete on shipped order");
    assert!(matches!(err, DbError::OrderNotMutable { .. }));

    assert_eq!(stored_total(&pool, order_id).await, Some(dec("20.00")));
}

#[sqlx::test(migrations = "../../migrations")]
async fn price_change_does_not_reprice_existing_items(pool: sqlx::PgPool) {
    let order_id = insert_empty_order(&pool).await;
    let widget = insert_test_product(&pool, "Widget", "10.00", None).await;
    create_order_item(&pool, order_id, widget, 2)
        .await
        .expect("add widget");

    update_product(
        &pool,
        widget,
        &ProductChanges {
            price: Some(dec("99.00")),
            ..ProductChanges::default()
        },
    )
    .await
    .expect("reprice widget");

    let total = recompute_order_total_now(&pool, order_id)
        .await
        .expect("recompute");
    assert_eq!(total, dec("20.00"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn recompute_all_repairs_stale_totals(pool: sqlx::PgPool) {
    let order_id = insert_empty_order(&pool).await;
    let widget = insert_test_product(&pool, "Widget", "10.00", None).await;
    create_order_item(&pool, order_id, widget, 2)
        .await
        .expect("add widget");

    sqlx::query("UPDATE orders SET total_price = 1.00 WHERE id = $1")
        .bind(order_id)
        .execute(&pool)
        .await
        .expect("corrupt total");

    let processed = recompute_all_order_totals(&pool).await.expect("recompute all");
    assert_eq!(processed, 1);
    assert_eq!(stored_total(&pool, order_id).await, Some(dec("20.00")));
}

#[sqlx::test(migrations = "../../migrations")]
async fn product_referenced_by_items_cannot_be_deleted(pool: sqlx::PgPool) {
    let order_id = insert_empty_order(&pool).await;
    let widget = insert_test_product(&pool, "Widget", "10.00", None).await;
    create_order_item(&pool, order_id, widget, 1)
        .await
        .expect("add widget");

    let err = delete_product(&pool, widget)
        .await
        .expect_err("referenced product delete");
    assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
}

#[sqlx::test(migrations = "../../migrations")]
async fn total_beyond_column_range_rolls_back_the_item(pool: sqlx::PgPool) {
    let order_id = insert_empty_order(&pool).await;
    let yacht = insert_test_product(&pool, "Yacht", "99999999.00", None).await;
    let dinghy = insert_test_product(&pool, "Dinghy", "10.00", None).await;
    let kept = create_order_item(&pool, order_id, dinghy, 1)
        .await
        .expect("add dinghy");

    let err = create_order_item(&pool, order_id, yacht, 2)
        .await
        .expect_err("total over 99999999.99 should fail");
    assert!(matches!(err, DbError::OutOfRange { .. }), "got {err:?}");

    let err = update_order_item_quantity(&pool, kept.item.id, 10_000_000)
        .await
        .expect_err("quantity pushing the total over range should fail");
    assert!(matches!(err, DbError::OutOfRange { .. }), "got {err:?}");

    assert_eq!(stored_total(&pool, order_id).await, Some(dec("10.00")));
    let items = list_items_for_order(&pool, order_id)
        .await
        .expect("list items");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity, 1);

    let customer_id = insert_test_customer(&pool, "whale@example.com").await;
    let err = create_order(
        &pool,
        customer_id,
        &[NewOrderItem {
            product_id: yacht,
            quantity: 2,
        }],
    )
    .await
    .expect_err("new order over range should fail");
    assert!(matches!(err, DbError::OutOfRange { .. }), "got {err:?}");
}

#[sqlx::test(migrations = "../../migrations")]
async fn order_item_count_is_capped(pool: sqlx::PgPool) {
    let order_id = insert_empty_order(&pool).await;
    let pen = insert_test_product(&pool, "Pen", "1.00", None).await;

    for _ in 0..MAX_ORDER_ITEMS {
        create_order_item(&pool, order_id, pen, 1)
            .await
            .expect("item within the cap");
    }

    let err = create_order_item(&pool, order_id, pen, 1)
        .await
        .expect_err("item beyond the cap should fail");
    assert!(
        matches!(err, DbError::TooManyItems { max } if max == MAX_ORDER_ITEMS),
        "got {err:?}"
    );

    let items = list_items_for_order(&pool, order_id)
        .await
        .expect("list items");
    assert_eq!(items.len(), MAX_ORDER_ITEMS);
    assert_eq!(stored_total(&pool, order_id).await, Some(dec("200.00")));

    let customer_id = insert_test_customer(&pool, "bulk@example.com").await;
    let too_many = vec![
        NewOrderItem {
            product_id: pen,
            quantity: 1,
        };
        MAX_ORDER_ITEMS + 1
    ];
    let err = create_order(&pool, customer_id, &too_many)
        .await
        .expect_err("oversized new order should fail");
    assert!(matches!(err, DbError::TooManyItems { .. }));
}

#[sqlx::test(migrations = "../../migrations")]
async fn concurrent_item_writes_keep_total_consistent(pool: sqlx::PgPool) {
    let order_id = insert_empty_order(&pool).await;
    let widget = insert_test_product(&pool, "Widget", "10.00", None).await;
    let gadget = insert_test_product(&pool, "Gadget", "2.50", None).await;
    let first = create_order_item(&pool, order_id, widget, 1)
        .await
        .expect("first item");

    let mut handles = Vec::new();
    for quantity in 1..=8 {
        let pool = pool.clone();
        let product_id = if quantity % 2 == 0 { widget } else { gadget };
        handles.push(tokio::spawn(async move {
            create_order_item(&pool, order_id, product_id, quantity)
                .await
                .map(|_| ())
        }));
    }
    for quantity in 2..=5 {
        let pool = pool.clone();
        let item_id = first.item.id;
        handles.push(tokio::spawn(async move {
            update_order_item_quantity(&pool, item_id, quantity)
                .await
                .map(|_| ())
        }));
    }
    for handle in handles {
        handle
            .await
            .expect("item task panicked")
            .expect("item write failed");
    }

    let items = list_items_for_order(&pool, order_id)
        .await
        .expect("list items");
    assert_eq!(items.len(), 9);
    assert_eq!(
        stored_total(&pool, order_id).await,
        Some(total_from_items(&pool, order_id).await)
    );
}

// ---------------------------------------------------------------------------
// Section 2: Product images
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn new_main_image_demotes_previous_main(pool: sqlx::PgPool) {
    let product_id = insert_test_product(&pool, "Trail Shoe", "80.00", None).await;

    let a = create_product_image(&pool, &image(product_id, "a.jpg", true))
        .await
        .expect("image a");
    assert!(a.is_main);
    assert!(a.image.starts_with("product_images/trail-shoe/"));
    assert!(a.image.ends_with("/a.jpg"));

    let b = create_product_image(&pool, &image(product_id, "b.jpg", true))
        .await
        .expect("image b");
    assert!(b.is_main);

    let a_after = get_product_image(&pool, a.id)
        .await
        .expect("get a")
        .expect("a exists");
    assert!(!a_after.is_main);
    assert_eq!(main_image_ids(&pool, product_id).await, vec![b.id]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn non_main_image_leaves_siblings_alone(pool: sqlx::PgPool) {
    let product_id = insert_test_product(&pool, "Trail Shoe", "80.00", None).await;

    let main = create_product_image(&pool, &image(product_id, "main.jpg", true))
        .await
        .expect("main image");
    create_product_image(&pool, &image(product_id, "side.jpg", false))
        .await
        .expect("side image");

    assert_eq!(main_image_ids(&pool, product_id).await, vec![main.id]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn main_flag_is_scoped_to_one_product(pool: sqlx::PgPool) {
    let shoe = insert_test_product(&pool, "Trail Shoe", "80.00", None).await;
    let sock = insert_test_product(&pool, "Wool Sock", "12.00", None).await;

    let shoe_main = create_product_image(&pool, &image(shoe, "shoe.jpg", true))
        .await
        .expect("shoe image");
    let sock_main = create_product_image(&pool, &image(sock, "sock.jpg", true))
        .await
        .expect("sock image");

    assert_eq!(main_image_ids(&pool, shoe).await, vec![shoe_main.id]);
    assert_eq!(main_image_ids(&pool, sock).await, vec![sock_main.id]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn set_main_and_update_move_the_flag(pool: sqlx::PgPool) {
    let product_id = insert_test_product(&pool, "Trail Shoe", "80.00", None).await;
    let a = create_product_image(&pool, &image(product_id, "a.jpg", true))
        .await
        .expect("image a");
    let b = create_product_image(&pool, &image(product_id, "b.jpg", false))
        .await
        .expect("image b");

    set_main_product_image(&pool, b.id).await.expect("set main b");
    assert_eq!(main_image_ids(&pool, product_id).await, vec![b.id]);

    update_product_image(&pool, a.id, None, Some(true))
        .await
        .expect("update a to main");
    assert_eq!(main_image_ids(&pool, product_id).await, vec![a.id]);

    update_product_image(&pool, a.id, None, Some(false))
        .await
        .expect("unset main");
    assert!(main_image_ids(&pool, product_id).await.is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn image_for_unknown_product_writes_nothing(pool: sqlx::PgPool) {
    let err = create_product_image(&pool, &image(999_999, "ghost.jpg", true))
        .await
        .expect_err("unknown product should fail");
    assert!(matches!(err, DbError::NotFound { entity: "product", .. }));

    let images: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM product_images")
        .fetch_one(&pool)
        .await
        .expect("count images");
    assert_eq!(images, 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn index_rejects_second_main_written_directly(pool: sqlx::PgPool) {
    let product_id = insert_test_product(&pool, "Trail Shoe", "80.00", None).await;
    create_product_image(&pool, &image(product_id, "a.jpg", true))
        .await
        .expect("image a");

    let err = sqlx::query(
        "INSERT INTO product_images (product_id, image, is_main) VALUES ($1, 'raw.jpg', true)",
    )
    .bind(product_id)
    .execute(&pool)
    .await
    .expect_err("second main should violate the index");

    match DbError::from(err) {
        DbError::UniqueViolation { constraint } => {
            assert_eq!(constraint, "product_images_one_main_per_product");
        }
        other => panic!("expected UniqueViolation, got {other:?}"),
    }
}

#[sqlx::test(migrations = "../../migrations")]
async fn concurrent_main_image_writes_leave_one_main(pool: sqlx::PgPool) {
    let product_id = insert_test_product(&pool, "Desk Lamp", "30.00", None).await;
    let mut existing = Vec::new();
    for n in 0..4 {
        let filename = format!("side-{n}.jpg");
        let row = create_product_image(&pool, &image(product_id, &filename, false))
            .await
            .expect("image");
        existing.push(row.id);
    }

    let mut handles = Vec::new();
    for id in existing {
        let pool = pool.clone();
        handles.push(tokio::spawn(async move {
            set_main_product_image(&pool, id).await.map(|_| ())
        }));
    }
    for n in 0..4 {
        let pool = pool.clone();
        handles.push(tokio::spawn(async move {
            let filename = format!("front-{n}.jpg");
            create_product_image(&pool, &image(product_id, &filename, true))
                .await
                .map(|_| ())
        }));
    }
    for handle in handles {
        handle
            .await
            .expect("image task panicked")
            .expect("image write failed");
    }

    assert_eq!(main_image_ids(&pool, product_id).await.len(), 1);
}

// ---------------------------------------------------------------------------
// Section 3: Catalog reads
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn non_ascii_names_get_distinct_default_skus(pool: sqlx::PgPool) {
    let sencha = insert_test_product(&pool, "日本茶", "12.00", None).await;
    let ryokucha = insert_test_product(&pool, "緑茶", "9.00", None).await;

    let sencha = get_product(&pool, sencha)
        .await
        .expect("get sencha")
        .expect("sencha exists");
    let ryokucha = get_product(&pool, ryokucha)
        .await
        .expect("get ryokucha")
        .expect("ryokucha exists");

    assert_eq!(sencha.sku, format!("product-{}", sencha.id));
    assert_eq!(ryokucha.sku, format!("product-{}", ryokucha.id));
    assert_eq!(sencha.name, "日本茶");

    let matcha = insert_test_product(&pool, "Matcha 抹茶", "15.00", None).await;
    let matcha = get_product(&pool, matcha)
        .await
        .expect("get matcha")
        .expect("matcha exists");
    assert_eq!(matcha.sku, "matcha");
}

#[sqlx::test(migrations = "../../migrations")]
async fn search_combines_filters(pool: sqlx::PgPool) {
    let electronics = create_category(&pool, "Electronics", "")
        .await
        .expect("category");
    let books = create_category(&pool, "Books", "").await.expect("category");

    let mouse = insert_test_product(&pool, "Wireless Mouse", "25.00", Some(electronics.id)).await;
    insert_test_product(&pool, "Gaming Monitor", "300.00", Some(electronics.id)).await;
    insert_test_product(&pool, "Mouse Anatomy", "15.00", Some(books.id)).await;

    update_product(
        &pool,
        mouse,
        &ProductChanges {
            orders: Some(12),
            ..ProductChanges::default()
        },
    )
    .await
    .expect("bump orders");

    let by_category = search_products(
        &pool,
        ProductSearchFilters {
            category: Some("Electronics"),
            limit: 50,
            ..ProductSearchFilters::default()
        },
    )
    .await
    .expect("search by category");
    assert_eq!(by_category.len(), 2);

    let by_text = search_products(
        &pool,
        ProductSearchFilters {
            search: Some("MOUSE"),
            limit: 50,
            ..ProductSearchFilters::default()
        },
    )
    .await
    .expect("search by text");
    assert_eq!(by_text.len(), 2);

    let combined = search_products(
        &pool,
        ProductSearchFilters {
            category: Some("Electronics"),
            search: Some("mouse"),
            max_price: Some(dec("30.00")),
            min_orders: Some(10),
            limit: 50,
            ..ProductSearchFilters::default()
        },
    )
    .await
    .expect("combined search");
    assert_eq!(combined.len(), 1);
    assert_eq!(combined[0].id, mouse);

    let created_on = combined[0].created_at.date_naive();
    let by_date = search_products(
        &pool,
        ProductSearchFilters {
            created_on: Some(created_on),
            limit: 50,
            ..ProductSearchFilters::default()
        },
    )
    .await
    .expect("search by date");
    assert_eq!(by_date.len(), 3);
}

#[sqlx::test(migrations = "../../migrations")]
async fn search_treats_like_wildcards_literally(pool: sqlx::PgPool) {
    insert_test_product(&pool, "100% Cotton Tee", "20.00", None).await;
    insert_test_product(&pool, "Cotton Tee", "18.00", None).await;

    let rows = search_products(
        &pool,
        ProductSearchFilters {
            search: Some("100%"),
            limit: 50,
            ..ProductSearchFilters::default()
        },
    )
    .await
    .expect("search");
    assert_eq!(rows.len(), 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn product_detail_aggregates_reviews_and_images(pool: sqlx::PgPool) {
    let category = create_category(&pool, "Sports", "").await.expect("category");
    let shoe = insert_test_product(&pool, "Trail Shoe", "80.00", Some(category.id)).await;
    let sock = insert_test_product(&pool, "Wool Sock", "12.00", Some(category.id)).await;
    let alice = insert_test_customer(&pool, "alice@example.com").await;
    let bob = insert_test_customer(&pool, "bob@example.com").await;

    let fresh = get_product(&pool, shoe).await.expect("get").expect("exists");
    assert_eq!(fresh.average_rating, Decimal::ZERO);
    assert!(!fresh.has_images);
    assert_eq!(fresh.category_name.as_deref(), Some("Sports"));

    create_review(&pool, shoe, alice, 4, "Comfortable")
        .await
        .expect("review 1");
    let review = create_review(&pool, shoe, bob, 5, "Great grip")
        .await
        .expect("review 2");
    assert_eq!(review.customer_name, "Test Customer");
    create_product_image(&pool, &image(shoe, "shoe.jpg", false))
        .await
        .expect("image");

    let detail = get_product(&pool, shoe).await.expect("get").expect("exists");
    assert_eq!(detail.average_rating, dec("4.50"));
    assert!(detail.has_images);

    let related = list_related_products(&pool, &detail, 10)
        .await
        .expect("related");
    assert_eq!(related.len(), 1);
    assert_eq!(related[0].id, sock);
}

#[sqlx::test(migrations = "../../migrations")]
async fn duplicate_customer_email_is_unique_violation(pool: sqlx::PgPool) {
    insert_test_customer(&pool, "dup@example.com").await;

    let err = create_customer(
        &pool,
        &NewCustomer {
            first_name: "Other",
            last_name: "Person",
            email: "dup@example.com",
            phone_number: None,
        },
    )
    .await
    .expect_err("duplicate email");
    assert!(matches!(
        err,
        DbError::UniqueViolation { ref constraint } if constraint == "customers_email_key"
    ));
}

#[sqlx::test(migrations = "../../migrations")]
async fn review_for_unknown_product_is_foreign_key_violation(pool: sqlx::PgPool) {
    let customer_id = insert_test_customer(&pool, "critic@example.com").await;

    let err = create_review(&pool, 999_999, customer_id, 3, "")
        .await
        .expect_err("unknown product");
    assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
}

// ---------------------------------------------------------------------------
// Section 4: Shipping
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn shipping_status_stamps_timestamps_once(pool: sqlx::PgPool) {
    let order_id = insert_empty_order(&pool).await;

    let pending = create_shipping(&pool, order_id, "TRK-001", ShippingStatus::Pending)
        .await
        .expect("create shipping");
    assert!(pending.shipped_at.is_none());
    assert!(pending.delivered_at.is_none());
    assert_eq!(pending.order_status, "pending");

    let shipped = update_shipping(&pool, pending.id, None, Some(ShippingStatus::Shipped))
        .await
        .expect("ship");
    let shipped_at = shipped.shipped_at.expect("shipped_at stamped");
    assert!(shipped.delivered_at.is_none());

    let delivered = update_shipping(&pool, pending.id, None, Some(ShippingStatus::Delivered))
        .await
        .expect("deliver");
    assert_eq!(delivered.shipped_at, Some(shipped_at));
    assert!(delivered.delivered_at.is_some());

    let err = create_shipping(&pool, order_id, "TRK-002", ShippingStatus::Pending)
        .await
        .expect_err("second shipment for order");
    assert!(matches!(err, DbError::UniqueViolation { .. }));
}

// ---------------------------------------------------------------------------
// Section 5: Seed
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn seed_categories_is_idempotent(pool: sqlx::PgPool) {
    let categories = vec![
        CategorySeed {
            name: "Electronics".to_string(),
            description: "Gadgets".to_string(),
        },
        CategorySeed {
            name: "Books".to_string(),
            description: String::new(),
        },
    ];

    assert_eq!(seed_categories(&pool, &categories).await.expect("seed"), 2);

    let updated = vec![CategorySeed {
        name: "Electronics".to_string(),
        description: "Devices and accessories".to_string(),
    }];
    assert_eq!(seed_categories(&pool, &updated).await.expect("reseed"), 1);

    let rows: Vec<(String, String)> =
        sqlx::query_as("SELECT name, description FROM categories ORDER BY name")
            .fetch_all(&pool)
            .await
            .expect("list categories");
    assert_eq!(
        rows,
        vec![
            ("Books".to_string(), String::new()),
            (
                "Electronics".to_string(),
                "Devices and accessories".to_string()
            ),
        ]
    );
}
