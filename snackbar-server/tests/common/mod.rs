//! 集成测试公共工具
//!
//! 内存存储 + MemorySink 账本，直接对 Router 发请求 (不监听端口)。

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use snackbar_server::auth::{JwtConfig, password};
use snackbar_server::db::Storage;
use snackbar_server::ledger::{LedgerSink, MemorySink};
use snackbar_server::{Config, ServerState, api};

pub const ADMIN_PASSWORD: &str = "counter-admin-pass";

pub struct TestApp {
    pub app: Router,
    pub state: ServerState,
    pub sink: MemorySink,
    _dir: tempfile::TempDir,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: http::HeaderMap,
    pub text: String,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.text).unwrap_or(Value::Null)
    }

    /// 成功响应的 `data` 字段
    pub fn data(&self) -> Value {
        self.json()["data"].clone()
    }
}

/// 需要在 tokio 运行时内调用 (账本 worker 会被 spawn)
pub fn spawn_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::with_overrides(dir.path().to_string_lossy().to_string(), 0);
    config.timezone = chrono_tz::Asia::Kolkata;
    config.brand_name = "SnackBar".into();
    config.admin_password_hash = Some(password::hash_password(ADMIN_PASSWORD).unwrap());
    config.jwt = JwtConfig {
        secret: "integration-test-secret-0123456789abcdef".into(),
        expiration_minutes: 30,
        issuer: "snackbar-server".into(),
        audience: "snackbar-admin".into(),
    };
    config.ledger.timeout_ms = 1000;

    let sink = MemorySink::new();
    let shared_sink: Arc<dyn LedgerSink> = Arc::new(sink.clone());
    let state = ServerState::with_ledger_sink(
        config,
        Storage::open_in_memory().unwrap(),
        Some(shared_sink),
    );
    let app = api::build_app(state.clone());

    TestApp {
        app,
        state,
        sink,
        _dir: dir,
    }
}

impl TestApp {
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        TestResponse {
            status,
            headers,
            text: String::from_utf8_lossy(&bytes).to_string(),
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.request(Method::GET, uri, None, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> TestResponse {
        self.request(Method::POST, uri, Some(body), None).await
    }

    pub async fn patch(&self, uri: &str) -> TestResponse {
        self.request(Method::PATCH, uri, None, None).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> TestResponse {
        self.request(Method::PUT, uri, Some(body), None).await
    }

    /// 创建订单并返回 `data`
    pub async fn create_order(&self, items: Value) -> Value {
        let res = self.post("/api/orders", json!({ "items": items })).await;
        assert_eq!(res.status, StatusCode::OK, "{}", res.text);
        res.data()
    }

    pub async fn login(&self) -> String {
        let res = self
            .post("/api/auth/login", json!({ "password": ADMIN_PASSWORD }))
            .await;
        assert_eq!(res.status, StatusCode::OK, "{}", res.text);
        res.data()["token"].as_str().unwrap().to_string()
    }

    /// 等待账本 worker 处理完 (最多 2 秒)
    pub async fn wait_for_rows(&self, sheet: snackbar_server::ledger::Sheet, count: usize) {
        for _ in 0..100 {
            if self.sink.rows(sheet).len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}

pub fn tea(qty: i64) -> Value {
    json!({ "name": "Tea", "category": "Hot Beverages", "qty": qty, "price": 30 })
}

pub fn salad(qty: i64) -> Value {
    json!({
        "name": "Protein-Packed Soya Salad",
        "category": "Salad Bowls",
        "qty": qty,
        "price": 90,
        "addOns": ["Mint", "Chipotle"]
    })
}
