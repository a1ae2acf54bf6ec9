//! Live integration tests for artisan-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. The `migrations` path is relative to the crate root
//! (`crates/artisan-db/`), so `"../../migrations"` resolves to the workspace
//! migration directory.

use artisan_core::{CompositionError, IngredientKind, SaleStatus};
use artisan_db::{
    add_cart_item, cancel_sale, checkout, create_category, create_client, create_custom_product,
    create_notification, delete_category, delete_custom_product, delete_product,
    get_custom_product, get_ingredient, get_or_create_cart, get_product, list_cart_items,
    list_custom_product_ingredients,
    list_notifications_for_client, list_sale_items, mark_notification_read, most_viewed_products,
    record_product_view, recently_viewed_products, seed_catalog, set_cart_item_quantity,
    update_custom_product, update_ingredient, update_sale_status, CartItemTarget, DbError,
    IngredientUpdate,
};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn insert_client(pool: &PgPool, email: &str) -> Uuid {
    create_client(pool, "Test Client", email, "hash", None, Some("1 Main St"))
        .await
        .unwrap_or_else(|e| panic!("create_client failed for '{email}': {e}"))
        .id
}

async fn insert_category(pool: &PgPool, slug: &str) -> Uuid {
    create_category(pool, slug, slug, None)
        .await
        .unwrap_or_else(|e| panic!("create_category failed for '{slug}': {e}"))
        .id
}

async fn insert_ingredient(
    pool: &PgPool,
    category_id: Uuid,
    name: &str,
    kind: IngredientKind,
    cents: i64,
) -> Uuid {
    sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO ingredients (category_id, name, kind, price) \
         VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(category_id)
    .bind(name)
    .bind(kind.as_str())
    .bind(Decimal::new(cents, 2))
    .fetch_one(pool)
    .await
    .unwrap_or_else(|e| panic!("insert_ingredient failed for '{name}': {e}"))
}

/// Mold 10.00, color 2.50, aroma 4.00, essences 3.25 + 1.75 = 21.50.
async fn insert_valid_set(pool: &PgPool, category_id: Uuid) -> Vec<Uuid> {
    vec![
        insert_ingredient(pool, category_id, "Round", IngredientKind::Mold, 1000).await,
        insert_ingredient(pool, category_id, "Purple", IngredientKind::Color, 250).await,
        insert_ingredient(pool, category_id, "Lavender", IngredientKind::Aroma, 400).await,
        insert_ingredient(pool, category_id, "Shea", IngredientKind::Essence, 325).await,
        insert_ingredient(pool, category_id, "Aloe", IngredientKind::Essence, 175).await,
    ]
}

async fn insert_product(pool: &PgPool, category_id: Uuid, name: &str, cents: i64, stock: i32) -> Uuid {
    sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO products (category_id, name, price, stock) \
         VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(category_id)
    .bind(name)
    .bind(Decimal::new(cents, 2))
    .bind(stock)
    .fetch_one(pool)
    .await
    .unwrap_or_else(|e| panic!("insert_product failed for '{name}': {e}"))
}

async fn count(pool: &PgPool, sql: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(sql)
        .fetch_one(pool)
        .await
        .unwrap_or_else(|e| panic!("count query failed: {e}"))
}

// ---------------------------------------------------------------------------
// Section 1: Custom product composition
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn create_custom_product_prices_sum_of_ingredients(pool: PgPool) {
    let client = insert_client(&pool, "ana@example.com").await;
    let category = insert_category(&pool, "soaps").await;
    let ids = insert_valid_set(&pool, category).await;

    let product = create_custom_product(&pool, client, "My Bar", category, &ids)
        .await
        .expect("valid composition should persist");

    assert_eq!(product.price, Decimal::new(2150, 2));
    assert_eq!(product.client_id, client);

    let ingredients = list_custom_product_ingredients(&pool, product.id)
        .await
        .expect("list_custom_product_ingredients failed");
    assert_eq!(ingredients.len(), 5);
}

#[sqlx::test(migrations = "../../migrations")]
async fn create_custom_product_rejects_missing_essence_without_writing(pool: PgPool) {
    let client = insert_client(&pool, "ana@example.com").await;
    let category = insert_category(&pool, "soaps").await;
    let ids = insert_valid_set(&pool, category).await;

    let err = create_custom_product(&pool, client, "Short", category, &ids[..4])
        .await
        .expect_err("four ingredients should be rejected");

    assert!(matches!(
        err,
        DbError::Composition(CompositionError::KindCount {
            kind: IngredientKind::Essence,
            expected: 2,
            actual: 1,
        })
    ));
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM custom_products").await, 0);
    assert_eq!(
        count(&pool, "SELECT COUNT(*) FROM custom_product_ingredients").await,
        0
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn create_custom_product_rejects_ingredient_from_other_category(pool: PgPool) {
    let client = insert_client(&pool, "ana@example.com").await;
    let soaps = insert_category(&pool, "soaps").await;
    let candles = insert_category(&pool, "candles").await;
    let mut ids = insert_valid_set(&pool, soaps).await;
    ids[1] = insert_ingredient(&pool, candles, "Ivory", IngredientKind::Color, 100).await;

    let err = create_custom_product(&pool, client, "Mixed", soaps, &ids)
        .await
        .expect_err("cross-category ingredient should be rejected");

    assert!(matches!(
        err,
        DbError::Composition(CompositionError::WrongCategory { .. })
    ));
}

#[sqlx::test(migrations = "../../migrations")]
async fn create_custom_product_rejects_duplicate_composition_for_same_client(pool: PgPool) {
    let client = insert_client(&pool, "ana@example.com").await;
    let other = insert_client(&pool, "bea@example.com").await;
    let category = insert_category(&pool, "soaps").await;
    let ids = insert_valid_set(&pool, category).await;

    create_custom_product(&pool, client, "First", category, &ids)
        .await
        .expect("first composition should persist");

    let mut reordered = ids.clone();
    reordered.reverse();
    let err = create_custom_product(&pool, client, "Second", category, &reordered)
        .await
        .expect_err("same ingredient set should conflict");
    assert!(matches!(err, DbError::Conflict(_)), "got {err:?}");

    create_custom_product(&pool, other, "Other's", category, &ids)
        .await
        .expect("another client may use the same composition");
}

#[sqlx::test(migrations = "../../migrations")]
async fn update_custom_product_reprices_cart_lines(pool: PgPool) {
    let client = insert_client(&pool, "ana@example.com").await;
    let category = insert_category(&pool, "soaps").await;
    let ids = insert_valid_set(&pool, category).await;
    let product = create_custom_product(&pool, client, "Bar", category, &ids)
        .await
        .expect("create failed");

    add_cart_item(&pool, client, CartItemTarget::CustomProduct(product.id), 2)
        .await
        .expect("add_cart_item failed");

    let pricier_mold =
        insert_ingredient(&pool, category, "Heart", IngredientKind::Mold, 1500).await;
    let mut new_ids = ids.clone();
    new_ids[0] = pricier_mold;

    let updated = update_custom_product(&pool, product.id, client, None, None, &new_ids)
        .await
        .expect("update failed");
    assert_eq!(updated.price, Decimal::new(2650, 2));
    assert_eq!(updated.name, "Bar");

    let cart = get_or_create_cart(&pool, client).await.expect("cart");
    assert_eq!(cart.total, Decimal::new(5300, 2));
}

#[sqlx::test(migrations = "../../migrations")]
async fn update_custom_product_to_existing_composition_conflicts(pool: PgPool) {
    let client = insert_client(&pool, "ana@example.com").await;
    let category = insert_category(&pool, "soaps").await;
    let ids = insert_valid_set(&pool, category).await;
    let heart = insert_ingredient(&pool, category, "Heart", IngredientKind::Mold, 1500).await;
    let mut other_ids = ids.clone();
    other_ids[0] = heart;

    create_custom_product(&pool, client, "First", category, &ids)
        .await
        .expect("first composition should persist");
    let second = create_custom_product(&pool, client, "Second", category, &other_ids)
        .await
        .expect("second composition should persist");

    let err = update_custom_product(&pool, second.id, client, None, None, &ids)
        .await
        .expect_err("switching to an owned composition should conflict");
    let DbError::Conflict(msg) = &err else {
        panic!("expected a conflict, got {err:?}");
    };
    assert_eq!(msg, "you already have a custom product with these ingredients");

    let stored = get_custom_product(&pool, second.id).await.expect("reload");
    assert_eq!(stored.composition_key, second.composition_key);
    assert_eq!(stored.price, Decimal::new(2650, 2));
}

#[sqlx::test(migrations = "../../migrations")]
async fn update_custom_product_with_missing_essence_keeps_stored_composition(pool: PgPool) {
    let client = insert_client(&pool, "ana@example.com").await;
    let category = insert_category(&pool, "soaps").await;
    let ids = insert_valid_set(&pool, category).await;
    let product = create_custom_product(&pool, client, "Bar", category, &ids)
        .await
        .expect("create failed");

    let err = update_custom_product(&pool, product.id, client, Some("Renamed"), None, &ids[..4])
        .await
        .expect_err("four ingredients should be rejected");
    assert!(matches!(
        err,
        DbError::Composition(CompositionError::KindCount {
            kind: IngredientKind::Essence,
            expected: 2,
            actual: 1,
        })
    ));

    let stored = get_custom_product(&pool, product.id).await.expect("reload");
    assert_eq!(stored.name, "Bar");
    assert_eq!(stored.composition_key, product.composition_key);
    assert_eq!(stored.price, Decimal::new(2150, 2));

    let mut stored_ids: Vec<Uuid> = list_custom_product_ingredients(&pool, product.id)
        .await
        .expect("list_custom_product_ingredients failed")
        .into_iter()
        .map(|i| i.id)
        .collect();
    stored_ids.sort();
    let mut expected = ids.clone();
    expected.sort();
    assert_eq!(stored_ids, expected);
}

#[sqlx::test(migrations = "../../migrations")]
async fn custom_product_price_beyond_column_range_is_a_validation_error(pool: PgPool) {
    let client = insert_client(&pool, "ana@example.com").await;
    let category = insert_category(&pool, "soaps").await;
    let mut ids = insert_valid_set(&pool, category).await;
    ids[0] =
        insert_ingredient(&pool, category, "Gilded", IngredientKind::Mold, 9_999_999_000).await;

    let err = create_custom_product(&pool, client, "Gold Bar", category, &ids)
        .await
        .expect_err("price above 99999999.99 cannot be stored");
    assert!(matches!(err, DbError::Validation(_)), "got {err:?}");
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM custom_products").await, 0);
}

// ---------------------------------------------------------------------------
// Section 1b: Ingredient kind is fixed while custom products use it
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn changing_kind_of_an_ingredient_in_use_conflicts(pool: PgPool) {
    let client = insert_client(&pool, "ana@example.com").await;
    let category = insert_category(&pool, "soaps").await;
    let ids = insert_valid_set(&pool, category).await;
    let product = create_custom_product(&pool, client, "Bar", category, &ids)
        .await
        .expect("create failed");

    let err = update_ingredient(
        &pool,
        ids[1],
        &IngredientUpdate {
            kind: Some(IngredientKind::Mold),
            ..IngredientUpdate::default()
        },
    )
    .await
    .expect_err("color used by a custom product cannot become a mold");
    assert!(matches!(err, DbError::Conflict(_)), "got {err:?}");

    let color = get_ingredient(&pool, ids[1]).await.expect("reload ingredient");
    assert_eq!(color.kind, "color");

    let kinds: Vec<String> = list_custom_product_ingredients(&pool, product.id)
        .await
        .expect("list_custom_product_ingredients failed")
        .into_iter()
        .map(|i| i.kind)
        .collect();
    assert_eq!(kinds.iter().filter(|k| *k == "mold").count(), 1);
    assert_eq!(kinds.iter().filter(|k| *k == "color").count(), 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn ingredient_in_use_accepts_other_edits_and_unused_kind_changes(pool: PgPool) {
    let client = insert_client(&pool, "ana@example.com").await;
    let category = insert_category(&pool, "soaps").await;
    let ids = insert_valid_set(&pool, category).await;
    create_custom_product(&pool, client, "Bar", category, &ids)
        .await
        .expect("create failed");

    let repriced = update_ingredient(
        &pool,
        ids[1],
        &IngredientUpdate {
            kind: Some(IngredientKind::Color),
            price: Some(Decimal::new(300, 2)),
            ..IngredientUpdate::default()
        },
    )
    .await
    .expect("same kind with a new price is allowed");
    assert_eq!(repriced.price, Decimal::new(300, 2));

    let spare = insert_ingredient(&pool, category, "Ivory", IngredientKind::Color, 100).await;
    let moved = update_ingredient(
        &pool,
        spare,
        &IngredientUpdate {
            kind: Some(IngredientKind::Aroma),
            ..IngredientUpdate::default()
        },
    )
    .await
    .expect("unused ingredient may change kind");
    assert_eq!(moved.kind, "aroma");
}

// ---------------------------------------------------------------------------
// Section 2: Deleting custom products cascades to carts
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn deleting_custom_product_removes_it_from_carts_and_recomputes(pool: PgPool) {
    let client = insert_client(&pool, "ana@example.com").await;
    let category = insert_category(&pool, "soaps").await;
    let ids = insert_valid_set(&pool, category).await;
    let custom = create_custom_product(&pool, client, "Bar", category, &ids)
        .await
        .expect("create failed");
    let soap = insert_product(&pool, category, "Honey Oat", 790, 10).await;

    add_cart_item(&pool, client, CartItemTarget::CustomProduct(custom.id), 1)
        .await
        .expect("add custom failed");
    let cart = add_cart_item(&pool, client, CartItemTarget::Product(soap), 2)
        .await
        .expect("add product failed");
    assert_eq!(cart.total, Decimal::new(3730, 2));

    let touched = delete_custom_product(&pool, custom.id, client)
        .await
        .expect("delete failed");
    assert_eq!(touched, 1);

    let cart = get_or_create_cart(&pool, client).await.expect("cart");
    let items = list_cart_items(&pool, cart.id).await.expect("items");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].product_id, Some(soap));
    assert_eq!(cart.subtotal, Decimal::new(1580, 2));
    assert_eq!(cart.total, cart.subtotal);
}

#[sqlx::test(migrations = "../../migrations")]
async fn deleting_another_clients_custom_product_is_not_found(pool: PgPool) {
    let owner = insert_client(&pool, "ana@example.com").await;
    let intruder = insert_client(&pool, "eve@example.com").await;
    let category = insert_category(&pool, "soaps").await;
    let ids = insert_valid_set(&pool, category).await;
    let custom = create_custom_product(&pool, owner, "Bar", category, &ids)
        .await
        .expect("create failed");

    let err = delete_custom_product(&pool, custom.id, intruder)
        .await
        .expect_err("only the owner may delete");
    assert!(matches!(err, DbError::NotFound));
}

// ---------------------------------------------------------------------------
// Section 3: Cart
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn adding_same_product_twice_merges_quantity(pool: PgPool) {
    let client = insert_client(&pool, "ana@example.com").await;
    let category = insert_category(&pool, "candles").await;
    let candle = insert_product(&pool, category, "Vanilla", 1800, 5).await;

    add_cart_item(&pool, client, CartItemTarget::Product(candle), 1)
        .await
        .expect("first add failed");
    let cart = add_cart_item(&pool, client, CartItemTarget::Product(candle), 2)
        .await
        .expect("second add failed");

    let items = list_cart_items(&pool, cart.id).await.expect("items");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity, 3);
    assert_eq!(items[0].name, "Vanilla");
    assert_eq!(cart.total, Decimal::new(5400, 2));
}

#[sqlx::test(migrations = "../../migrations")]
async fn adding_more_than_stock_is_rejected(pool: PgPool) {
    let client = insert_client(&pool, "ana@example.com").await;
    let category = insert_category(&pool, "candles").await;
    let candle = insert_product(&pool, category, "Vanilla", 1800, 2).await;

    let err = add_cart_item(&pool, client, CartItemTarget::Product(candle), 3)
        .await
        .expect_err("stock is only 2");
    assert!(matches!(
        err,
        DbError::InsufficientStock {
            available: 2,
            requested: 3,
            ..
        }
    ));
}

#[sqlx::test(migrations = "../../migrations")]
async fn oversized_cart_quantity_is_a_validation_error(pool: PgPool) {
    let client = insert_client(&pool, "ana@example.com").await;
    let category = insert_category(&pool, "soaps").await;
    let ids = insert_valid_set(&pool, category).await;
    let product = create_custom_product(&pool, client, "Bar", category, &ids)
        .await
        .expect("create failed");

    let err = add_cart_item(
        &pool,
        client,
        CartItemTarget::CustomProduct(product.id),
        1_000_000_000,
    )
    .await
    .expect_err("quantity beyond the line limit should be rejected");
    assert!(matches!(err, DbError::Validation(_)), "got {err:?}");
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM cart_items").await, 0);

    let cart = add_cart_item(&pool, client, CartItemTarget::CustomProduct(product.id), 3)
        .await
        .expect("a modest quantity is accepted");
    let items = list_cart_items(&pool, cart.id).await.expect("list_cart_items failed");
    let err = set_cart_item_quantity(&pool, client, items[0].id, 10_001)
        .await
    .expect_err("setting a quantity beyond the line limit should be rejected");
    assert!(matches!(err, DbError::Validation(_)), "got {err:?}");

    let cart = get_or_create_cart(&pool, client).await.expect("cart");
    assert_eq!(cart.total, Decimal::new(6450, 2));
}

#[sqlx::test(migrations = "../../migrations")]
async fn setting_quantity_to_zero_removes_line(pool: PgPool) {
    let client = insert_client(&pool, "ana@example.com").await;
    let category = insert_category(&pool, "candles").await;
    let candle = insert_product(&pool, category, "Vanilla", 1800, 5).await;

    let cart = add_cart_item(&pool, client, CartItemTarget::Product(candle), 2)
        .await
        .expect("add failed");
    let items = list_cart_items(&pool, cart.id).await.expect("items");

    let cart = set_cart_item_quantity(&pool, client, items[0].id, 0)
        .await
        .expect("set quantity failed");
    assert!(list_cart_items(&pool, cart.id).await.expect("items").is_empty());
    assert_eq!(cart.total, Decimal::ZERO);
}

#[sqlx::test(migrations = "../../migrations")]
async fn soft_deleting_product_removes_it_from_carts(pool: PgPool) {
    let client = insert_client(&pool, "ana@example.com").await;
    let category = insert_category(&pool, "candles").await;
    let candle = insert_product(&pool, category, "Vanilla", 1800, 5).await;
    add_cart_item(&pool, client, CartItemTarget::Product(candle), 1)
        .await
        .expect("add failed");

    delete_product(&pool, candle).await.expect("delete failed");

    let product = get_product(&pool, candle).await.expect("row is kept");
    assert!(!product.is_active);
    let cart = get_or_create_cart(&pool, client).await.expect("cart");
    assert_eq!(cart.total, Decimal::ZERO);
}

// ---------------------------------------------------------------------------
// Section 4: Sales
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn checkout_snapshots_lines_decrements_stock_and_clears_cart(pool: PgPool) {
    let client = insert_client(&pool, "ana@example.com").await;
    let category = insert_category(&pool, "candles").await;
    let candle = insert_product(&pool, category, "Vanilla", 1800, 5).await;
    add_cart_item(&pool, client, CartItemTarget::Product(candle), 2)
        .await
        .expect("add failed");

    let sale = checkout(&pool, client, None).await.expect("checkout failed");
    assert_eq!(sale.status, "pending");
    assert_eq!(sale.total, Decimal::new(3600, 2));
    assert_eq!(sale.shipping_address.as_deref(), Some("1 Main St"));

    let items = list_sale_items(&pool, sale.id).await.expect("sale items");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "Vanilla");
    assert_eq!(items[0].quantity, 2);

    assert_eq!(get_product(&pool, candle).await.expect("product").stock, 3);
    let cart = get_or_create_cart(&pool, client).await.expect("cart");
    assert!(list_cart_items(&pool, cart.id).await.expect("items").is_empty());
    assert_eq!(cart.total, Decimal::ZERO);
}

#[sqlx::test(migrations = "../../migrations")]
async fn checkout_with_empty_cart_is_rejected(pool: PgPool) {
    let client = insert_client(&pool, "ana@example.com").await;
    let err = checkout(&pool, client, None)
        .await
        .expect_err("empty cart must not check out");
    assert!(matches!(err, DbError::Validation(_)));
}

#[sqlx::test(migrations = "../../migrations")]
async fn illegal_status_transition_is_rejected(pool: PgPool) {
    let client = insert_client(&pool, "ana@example.com").await;
    let category = insert_category(&pool, "candles").await;
    let candle = insert_product(&pool, category, "Vanilla", 1800, 5).await;
    add_cart_item(&pool, client, CartItemTarget::Product(candle), 1)
        .await
        .expect("add failed");
    let sale = checkout(&pool, client, None).await.expect("checkout failed");

    let err = update_sale_status(&pool, sale.id, SaleStatus::Delivered)
        .await
        .expect_err("pending cannot jump to delivered");
    assert!(matches!(
        err,
        DbError::InvalidSaleTransition {
            from: SaleStatus::Pending,
            to: SaleStatus::Delivered,
            ..
        }
    ));

    let paid = update_sale_status(&pool, sale.id, SaleStatus::Paid)
        .await
        .expect("pending -> paid");
    assert_eq!(paid.status, "paid");
}

#[sqlx::test(migrations = "../../migrations")]
async fn cancelling_pending_sale_restores_stock(pool: PgPool) {
    let client = insert_client(&pool, "ana@example.com").await;
    let category = insert_category(&pool, "candles").await;
    let candle = insert_product(&pool, category, "Vanilla", 1800, 5).await;
    add_cart_item(&pool, client, CartItemTarget::Product(candle), 4)
        .await
        .expect("add failed");
    let sale = checkout(&pool, client, None).await.expect("checkout failed");
    assert_eq!(get_product(&pool, candle).await.expect("product").stock, 1);

    let cancelled = cancel_sale(&pool, sale.id, client).await.expect("cancel");
    assert_eq!(cancelled.status, "cancelled");
    assert_eq!(get_product(&pool, candle).await.expect("product").stock, 5);

    let err = cancel_sale(&pool, sale.id, client)
        .await
        .expect_err("already cancelled");
    assert!(matches!(err, DbError::InvalidSaleTransition { .. }));
}

// ---------------------------------------------------------------------------
// Section 5: Catalog, notifications, views
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn deleting_category_in_use_conflicts(pool: PgPool) {
    let category = insert_category(&pool, "candles").await;
    insert_product(&pool, category, "Vanilla", 1800, 5).await;

    let err = delete_category(&pool, category)
        .await
        .expect_err("category has products");
    assert!(matches!(err, DbError::Conflict(_)));

    let empty = insert_category(&pool, "empty").await;
    delete_category(&pool, empty).await.expect("empty category deletes");
}

#[sqlx::test(migrations = "../../migrations")]
async fn broadcast_read_receipts_are_per_client(pool: PgPool) {
    let ana = insert_client(&pool, "ana@example.com").await;
    let bea = insert_client(&pool, "bea@example.com").await;
    let broadcast = create_notification(&pool, None, "Sale", "20% off candles")
        .await
        .expect("broadcast");
    create_notification(&pool, Some(bea), "Order", "Shipped")
        .await
        .expect("targeted");

    let read = mark_notification_read(&pool, broadcast.id, ana)
        .await
        .expect("mark read");
    assert!(read.read_at.is_some());

    let ana_feed = list_notifications_for_client(&pool, ana, 50, 0)
        .await
        .expect("ana feed");
    assert_eq!(ana_feed.len(), 1);
    assert!(ana_feed[0].read_at.is_some());

    let bea_feed = list_notifications_for_client(&pool, bea, 50, 0)
        .await
        .expect("bea feed");
    assert_eq!(bea_feed.len(), 2);
    assert!(bea_feed.iter().all(|n| n.read_at.is_none()));
}

#[sqlx::test(migrations = "../../migrations")]
async fn marking_another_clients_notification_is_not_found(pool: PgPool) {
    let ana = insert_client(&pool, "ana@example.com").await;
    let bea = insert_client(&pool, "bea@example.com").await;
    let note = create_notification(&pool, Some(bea), "Order", "Shipped")
        .await
        .expect("targeted");

    let err = mark_notification_read(&pool, note.id, ana)
        .await
        .expect_err("not ana's notification");
    assert!(matches!(err, DbError::NotFound));
}

#[sqlx::test(migrations = "../../migrations")]
async fn product_views_rank_and_recent_list(pool: PgPool) {
    let ana = insert_client(&pool, "ana@example.com").await;
    let category = insert_category(&pool, "candles").await;
    let vanilla = insert_product(&pool, category, "Vanilla", 1800, 5).await;
    let linen = insert_product(&pool, category, "Linen", 990, 5).await;

    record_product_view(&pool, vanilla, None).await.expect("view");
    record_product_view(&pool, vanilla, Some(ana)).await.expect("view");
    record_product_view(&pool, linen, Some(ana)).await.expect("view");

    let ranked = most_viewed_products(&pool, 10).await.expect("ranked");
    assert_eq!(ranked[0].product_id, vanilla);
    assert_eq!(ranked[0].view_count, 2);

    let recent = recently_viewed_products(&pool, ana, 10)
        .await
        .expect("recent");
    assert_eq!(recent.len(), 2);
}

#[sqlx::test(migrations = "../../migrations")]
async fn duplicate_client_email_is_a_unique_violation(pool: PgPool) {
    insert_client(&pool, "ana@example.com").await;
    let err = create_client(&pool, "Ana Again", "ANA@example.com", "hash", None, None)
        .await
        .expect_err("emails are unique case-insensitively");
    assert!(err.is_unique_violation());
}

#[sqlx::test(migrations = "../../migrations")]
async fn seeding_catalog_twice_is_idempotent(pool: PgPool) {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("config")
        .join("catalog.yaml");
    let catalog = artisan_core::load_catalog(&path).expect("catalog.yaml should load");

    let first = seed_catalog(&pool, &catalog).await.expect("first seed");
    let second = seed_catalog(&pool, &catalog).await.expect("second seed");
    assert_eq!(first, second);

    let categories = count(&pool, "SELECT COUNT(*) FROM categories").await;
    let ingredients = count(&pool, "SELECT COUNT(*) FROM ingredients").await;
    assert_eq!(usize::try_from(categories).unwrap(), first.categories);
    assert_eq!(usize::try_from(ingredients).unwrap(), first.ingredients);
}
