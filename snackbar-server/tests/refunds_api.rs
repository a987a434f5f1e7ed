//! 退款接口集成测试

mod common;

use common::{salad, spawn_app, tea};
use http::StatusCode;
use serde_json::json;
use snackbar_server::ledger::Sheet;

#[tokio::test]
async fn refunds_are_clamped_to_remaining_quantity() {
    let t = spawn_app();
    t.create_order(json!([
        { "name": "Protein-Packed Soya Salad", "category": "Salad Bowls", "qty": 5, "price": 30 }
    ]))
    .await;

    let refund = |qty: i64| {
        json!({
            "orderNumber": 1,
            "refundedItems": [{ "name": "Protein-Packed Soya Salad", "qty": qty }]
        })
    };

    let res = t.post("/api/refunds", refund(2)).await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.text);
    assert_eq!(res.data()[0]["refundAmount"], 60.0);

    // 请求 4，只剩 3
    let res = t.post("/api/refunds", refund(4)).await;
    let created = res.data();
    assert_eq!(created[0]["refundedItems"][0]["qty"], 3);
    assert_eq!(created[0]["refundAmount"], 90.0);

    // 已全部退完
    let res = t.post("/api/refunds", refund(1)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.data().as_array().unwrap().is_empty());

    let res = t.get("/api/orders/number/1/refunds").await;
    let summary = res.data();
    assert_eq!(summary[0]["ordered"], 5);
    assert_eq!(summary[0]["refunded"], 5);
    assert_eq!(summary[0]["remaining"], 0);

    t.state.shutdown().await;
}

#[tokio::test]
async fn refund_validation_and_unknown_order() {
    let t = spawn_app();
    t.create_order(json!([tea(1)])).await;

    let res = t
        .post("/api/refunds", json!({ "orderNumber": 1, "refundedItems": [] }))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = t
        .post(
            "/api/refunds",
            json!({ "orderNumber": 1, "refundedItems": [{ "name": "Tea", "qty": 0 }] }),
        )
        .await;
    // 0 件视为不退，不写记录
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data(), json!([]));

    let res = t
        .post(
            "/api/refunds",
            json!({ "orderNumber": 99, "refundedItems": [{ "name": "Tea", "qty": 1 }] }),
        )
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    t.state.shutdown().await;
}

#[tokio::test]
async fn refunds_list_filters_by_order_number() {
    let t = spawn_app();
    t.create_order(json!([tea(2)])).await;
    t.create_order(json!([salad(2)])).await;

    t.post(
        "/api/refunds",
        json!({ "orderNumber": 1, "refundedItems": [{ "name": "Tea", "qty": 1 }] }),
    )
    .await;
    t.post(
        "/api/refunds",
        json!({
            "orderNumber": 2,
            "refundedItems": [{ "name": "Protein-Packed Soya Salad", "qty": 1 }]
        }),
    )
    .await;

    let res = t.get("/api/refunds").await;
    assert_eq!(res.data().as_array().unwrap().len(), 2);

    let res = t.get("/api/refunds?orderNumber=2").await;
    let filtered = res.data();
    assert_eq!(filtered.as_array().unwrap().len(), 1);
    assert_eq!(filtered[0]["orderNumber"], 2);

    t.wait_for_rows(Sheet::Refunds, 2).await;
    let rows = t.sink.rows(Sheet::Refunds);
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r[5] == "REFUNDED"));

    t.state.shutdown().await;
}
