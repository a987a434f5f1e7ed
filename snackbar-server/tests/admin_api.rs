//! 管理员接口集成测试: 登录、报表、清空订单

mod common;

use common::{ADMIN_PASSWORD, salad, spawn_app, tea};
use http::{Method, StatusCode, header};
use serde_json::json;

#[tokio::test]
async fn admin_routes_require_token() {
    let t = spawn_app();

    let res = t.get("/api/reports/summary").await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let res = t
        .request(Method::DELETE, "/api/orders", None, None)
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let res = t
        .request(Method::GET, "/api/reports/summary", None, Some("not-a-jwt"))
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    // 非管理员角色
    let staff = t
        .state
        .get_jwt_service()
        .generate_token("counter", "staff")
        .unwrap();
    let res = t
        .request(Method::GET, "/api/reports/summary", None, Some(&staff))
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    t.state.shutdown().await;
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let t = spawn_app();
    let res = t
        .post("/api/auth/login", json!({ "password": "guess" }))
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let res = t
        .post("/api/auth/login", json!({ "password": ADMIN_PASSWORD }))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.data()["expiresIn"].as_i64().unwrap() > 0);

    t.state.shutdown().await;
}

#[tokio::test]
async fn reports_aggregate_orders_and_refunds() {
    let t = spawn_app();
    let token = t.login().await;

    t.create_order(json!([tea(2), salad(1)])).await;
    t.create_order(json!([tea(1)])).await;
    t.post(
        "/api/refunds",
        json!({ "orderNumber": 1, "refundedItems": [{ "name": "Tea", "qty": 1 }] }),
    )
    .await;

    let res = t
        .request(Method::GET, "/api/reports/summary", None, Some(&token))
        .await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.text);
    let summary = res.data();
    assert_eq!(summary["totalOrders"], 2);
    assert_eq!(summary["totalSales"], 180.0);
    assert_eq!(summary["totalRefunds"], 30.0);
    assert_eq!(summary["netRevenue"], 150.0);

    let res = t
        .request(Method::GET, "/api/reports/orders?range=today", None, Some(&token))
        .await;
    let report = res.data();
    let hot = report["sections"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["category"] == "Hot Beverages")
        .cloned()
        .unwrap();
    assert_eq!(hot["totalQty"], 3);

    let res = t
        .request(Method::GET, "/api/reports/orders?range=fortnight", None, Some(&token))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = t
        .request(Method::GET, "/api/reports/orders?date=2024-13-01", None, Some(&token))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    t.state.shutdown().await;
}

#[tokio::test]
async fn csv_download_sets_filename() {
    let t = spawn_app();
    let token = t.login().await;
    t.create_order(json!([tea(2)])).await;

    let res = t
        .request(
            Method::GET,
            "/api/reports/orders.csv?date=2024-03-05",
            None,
            Some(&token),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    let disposition = res.headers[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.contains("SnackBar-Orders-05-03-2024.csv"));
    // 2024-03-05 没有订单，只有表头
    assert!(res.text.starts_with("Category,Item,Quantity,Amount"));
    assert_eq!(res.text.lines().count(), 1);

    let res = t
        .request(Method::GET, "/api/reports/orders.csv", None, Some(&token))
        .await;
    assert!(res.text.contains("Hot Beverages,Tea,2,60"));

    t.state.shutdown().await;
}

#[tokio::test]
async fn delete_all_orders_restarts_numbering() {
    let t = spawn_app();
    let token = t.login().await;
    t.create_order(json!([tea(1)])).await;
    t.create_order(json!([tea(1)])).await;

    let res = t
        .request(Method::DELETE, "/api/orders", None, Some(&token))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["deletedCount"], 2);

    let res = t.get("/api/orders").await;
    assert!(res.data().as_array().unwrap().is_empty());

    let order = t.create_order(json!([tea(1)])).await;
    assert_eq!(order["orderNumber"], 1);

    t.state.shutdown().await;
}
