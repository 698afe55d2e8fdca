mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use common::{API_KEY, TestApp, read_json};

#[tokio::test]
async fn api_routes_require_the_key() {
    let t = TestApp::spawn("auth").await;

    let resp = t
        .send(Request::get("/clientes").body(Body::empty()).unwrap())
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body = read_json(resp).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let resp = t
        .send(
            Request::get("/clientes")
                .header(header::AUTHORIZATION, "Bearer wrong")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = t
        .send(
            Request::get("/dashboard")
                .header("x-api-key", API_KEY)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn health_is_public() {
    let t = TestApp::spawn("health").await;

    let resp = t
        .send(Request::get("/health").body(Body::empty()).unwrap())
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(read_json(resp).await["status"], "ok");
}

#[tokio::test]
async fn oversized_body_is_rejected_with_413() {
    let t = TestApp::spawn_with("body-limit", |cfg| cfg.basic.body_limit_bytes = 1024).await;

    let oversized = format!(r#"{{"client_id":1,"body":"{}"}}"#, "a".repeat(4096));
    let resp = t
        .send(
            Request::post("/notas")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, format!("Bearer {API_KEY}"))
                .body(Body::from(oversized))
                .unwrap(),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body = read_json(resp).await;
    assert_eq!(body["error"]["code"], "PAYLOAD_TOO_LARGE");
    assert_eq!(body["error"]["message"], "request body too large");

    let (status, _) = t.get("/notas/1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn demo_seed_only_fills_an_empty_database() {
    let t = TestApp::spawn("seed").await;

    assert!(t.storage.seed_demo().await.expect("seed failed"));
    assert!(!t.storage.seed_demo().await.expect("second seed failed"));

    let (_, clients) = t.get("/clientes").await;
    assert_eq!(clients.as_array().unwrap().len(), 3);
    let (_, projects) = t.get("/proyectos?status=in_progress").await;
    assert_eq!(projects.as_array().unwrap().len(), 1);
    assert!(projects[0]["proposal_id"].is_i64());
}
