#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    response::Response,
};
use crm_nexus::config::{Config, ReminderConfig};
use crm_nexus::db::CrmStorage;
use crm_nexus::router::{CrmState, crm_router};
use crm_nexus::service::reminder_actor;
use serde_json::Value;
use std::{
    fs,
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};
use tower::ServiceExt;

pub const API_KEY: &str = "test-key";

/// Router over a throwaway SQLite file with periodic reminders turned off.
pub struct TestApp {
    pub app: Router,
    pub storage: CrmStorage,
    db_path: PathBuf,
}

impl TestApp {
    pub async fn spawn(label: &str) -> Self {
        Self::spawn_with(label, |_| {}).await
    }

    pub async fn spawn_with(label: &str, tweak: impl FnOnce(&mut Config)) -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before UNIX_EPOCH")
            .as_nanos();
        let mut db_path = std::env::temp_dir();
        db_path.push(format!(
            "crm-nexus-{label}-{}-{}.sqlite",
            std::process::id(),
            nanos
        ));

        let mut cfg = Config::default();
        cfg.basic.crm_key = API_KEY.to_string();
        cfg.database.url = format!("sqlite:{}", db_path.display());
        cfg.reminders = ReminderConfig {
            enabled: false,
            scan_interval_secs: 300,
        };
        tweak(&mut cfg);

        let storage = CrmStorage::connect(&cfg.database)
            .await
            .expect("failed to open test database");
        let reminders = reminder_actor::spawn(storage.clone(), cfg.reminders.clone())
            .await
            .expect("failed to spawn reminder actor");
        let state = CrmState::new(storage.clone(), reminders, &cfg);

        Self {
            app: crm_router(state),
            storage,
            db_path,
        }
    }

    pub async fn send(&self, req: Request<Body>) -> Response {
        self.app.clone().oneshot(req).await.expect("request failed")
    }

    /// Authenticated JSON request; returns the status and the parsed body
    /// (`Value::Null` for empty bodies).
    pub async fn call(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {API_KEY}"));
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let resp = self
            .send(builder.body(body).expect("failed to build request"))
            .await;
        let status = resp.status();
        (status, read_json(resp).await)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.call("GET", uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.call("POST", uri, Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.call("PUT", uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> StatusCode {
        self.call("DELETE", uri, None).await.0
    }

    /// Create a client and return its id.
    pub async fn client(&self, name: &str) -> i64 {
        let (status, body) = self
            .post("/clientes", serde_json::json!({ "name": name }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_i64().expect("client id")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.db_path);
    }
}

pub async fn read_body(resp: Response) -> String {
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    String::from_utf8(bytes.to_vec()).expect("response body was not utf-8")
}

pub async fn read_json(resp: Response) -> Value {
    let text = read_body(resp).await;
    if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap_or(Value::String(text))
    }
}
