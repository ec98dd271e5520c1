//! JSON-lines sessions driven through `handle_line`, the way the binary
//! drives them from stdin.

use chrono::Utc;
use serde_json::{json, Value};

use checkout_core::coupon::InMemoryCouponCatalog;
use checkout_db::{Database, DbConfig};
use register::commands::handle_line;
use register::handoff::{self, HandoffWorker};
use register::state::{AppState, RegisterConfig};

async fn register() -> (AppState, Database, tokio::task::JoinHandle<()>) {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let (handle, rx) = handoff::channel();
    let worker = tokio::spawn(HandoffWorker::new(db.clone(), rx).run());
    let app = AppState::new(
        RegisterConfig::default(),
        db.clone(),
        InMemoryCouponCatalog::with_defaults(Utc::now()),
        Vec::new(),
        handle,
    );
    (app, db, worker)
}

async fn send(app: &AppState, request: Value) -> Value {
    let line = handle_line(app, &request.to_string()).await;
    assert!(!line.contains('\n'));
    serde_json::from_str(&line).unwrap()
}

async fn ok(app: &AppState, request: Value) -> Value {
    let response = send(app, request.clone()).await;
    assert_eq!(response["ok"], true, "{} -> {}", request, response);
    response["data"].clone()
}

#[tokio::test]
async fn reference_sale_over_the_wire() {
    let (app, db, worker) = register().await;

    ok(
        &app,
        json!({
            "command": "add_item",
            "item": {
                "id": "jacket",
                "name": "Jacket",
                "unitPrice": 10000,
                "quantity": 1,
                "category": "apparel"
            }
        }),
    )
    .await;
    ok(
        &app,
        json!({
            "command": "apply_cart_discount",
            "discount": { "kind": "fixed", "value": 500 }
        }),
    )
    .await;
    let update = ok(&app, json!({ "command": "apply_coupon", "code": "save10" })).await;
    assert_eq!(update["totals"]["total"], 9180);
    assert_eq!(update["totals"]["tax"], 680);

    let totals = ok(
        &app,
        json!({ "command": "add_tender", "kind": "cash", "amount": 5000 }),
    )
    .await;
    assert_eq!(totals["remaining"], 4180);
    ok(
        &app,
        json!({ "command": "add_tender", "kind": "card", "amount": 4180 }),
    )
    .await;

    let sale = ok(&app, json!({ "id": 9, "command": "settle" })).await;
    assert_eq!(sale["transaction"]["total"], 9180);
    assert_eq!(sale["transaction"]["change"], 0);
    assert!(sale["customer"].is_null());

    drop(app);
    worker.await.unwrap();
    let save10 = db.coupons().get("SAVE10").await.unwrap().unwrap();
    assert_eq!(save10.usage_count, 1);
}

#[tokio::test]
async fn errors_carry_code_and_request_id() {
    let (app, _db, _worker) = register().await;

    let response = send(&app, json!({ "id": "r1", "command": "settle" })).await;
    assert_eq!(response["id"], "r1");
    assert_eq!(response["ok"], false);
    assert_eq!(response["error"]["code"], "CART_ERROR");

    let response = send(&app, json!({ "id": "r2", "command": "apply_coupon", "code": "NOPE" })).await;
    assert_eq!(response["error"]["code"], "COUPON_REJECTED");

    let line = handle_line(&app, "{not json").await;
    let response: Value = serde_json::from_str(&line).unwrap();
    assert_eq!(response["error"]["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn held_cart_is_written_through() {
    let (app, db, worker) = register().await;

    ok(
        &app,
        json!({
            "command": "add_item",
            "item": {
                "id": "tea",
                "name": "Tea",
                "unitPrice": 450,
                "quantity": 2,
                "category": "grocery"
            }
        }),
    )
    .await;
    let held = ok(&app, json!({ "command": "hold_cart", "label": "counter" })).await;
    let listed = ok(&app, json!({ "command": "list_held_carts" })).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["id"], held["id"]);

    let health = ok(&app, json!({ "command": "health" })).await;
    assert_eq!(health["heldCarts"], 1);

    drop(app);
    worker.await.unwrap();
    let stored = db.kv().keys_with_prefix("held_cart:").await.unwrap();
    assert_eq!(stored.len(), 1);
}
