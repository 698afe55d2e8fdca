mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use common::{API_KEY, TestApp, read_body};
use serde_json::json;

async fn proposal(t: &TestApp, client_id: i64, title: &str, amount: f64) -> i64 {
    let (status, body) = t
        .post(
            "/propuestas",
            json!({
                "client_id": client_id,
                "title": title,
                "description": "Diseño, desarrollo y puesta en marcha.",
                "amount": amount,
                "valid_until": "2026-12-31"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["status"], "draft");
    body["id"].as_i64().unwrap()
}

async fn set_status(t: &TestApp, path: &str, status: &str) -> (StatusCode, serde_json::Value) {
    t.post(&format!("{path}/estado"), json!({ "status": status }))
        .await
}

#[tokio::test]
async fn proposal_follows_its_status_workflow() {
    let t = TestApp::spawn("proposal-flow").await;
    let client = t.client("Panadería La Espiga").await;
    let id = proposal(&t, client, "Tienda online", 3200.0).await;
    let path = format!("/propuestas/{id}");

    let (status, body) = set_status(&t, &path, "approved").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "INVALID_TRANSITION");

    let (status, sent) = set_status(&t, &path, "enviada").await;
    assert_eq!(status, StatusCode::OK, "{sent}");
    assert_eq!(sent["status"], "sent");
    assert!(sent["sent_at"].is_string());
    assert!(sent["decided_at"].is_null());

    let (_, negotiating) = set_status(&t, &path, "negotiating").await;
    assert_eq!(negotiating["status"], "negotiating");

    let (_, rejected) = set_status(&t, &path, "rejected").await;
    assert_eq!(rejected["status"], "rejected");
    assert!(rejected["decided_at"].is_string());

    let (_, reopened) = set_status(&t, &path, "negotiating").await;
    assert!(reopened["decided_at"].is_null());

    let (status, approved) = set_status(&t, &path, "approved").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["status"], "approved");

    let (status, body) = t
        .put(
            &path,
            json!({ "client_id": client, "title": "Tienda online v2", "amount": 4000 }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "LOCKED");

    let (status, _) = set_status(&t, &path, "draft").await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn proposals_are_created_as_draft_or_sent_only() {
    let t = TestApp::spawn("proposal-create").await;
    let client = t.client("Estudio Norte").await;

    let (status, body) = t
        .post(
            "/propuestas",
            json!({ "client_id": client, "title": "Logo", "amount": 300, "status": "approved" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"]["fields"]["status"].is_array());

    let (status, body) = t
        .post(
            "/propuestas",
            json!({ "client_id": client, "title": "", "amount": -5 }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"]["fields"]["title"].is_array());
    assert!(body["error"]["fields"]["amount"].is_array());

    let (status, sent) = t
        .post(
            "/propuestas",
            json!({ "client_id": client, "title": "Logo", "amount": 300, "status": "sent" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(sent["sent_at"].is_string());

    let (_, listed) = t.get(&format!("/propuestas?client_id={client}&status=sent")).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn approved_proposal_converts_into_a_project_once() {
    let t = TestApp::spawn("proposal-convert").await;
    let client = t.client("Clínica Dental Sonrisa").await;
    let id = proposal(&t, client, "Reservas online", 2500.0).await;
    let path = format!("/propuestas/{id}");

    let (status, body) = t.post(&format!("{path}/convertir"), json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "INVALID_TRANSITION");

    set_status(&t, &path, "sent").await;
    set_status(&t, &path, "approved").await;

    let (status, conversion) = t.post(&format!("{path}/convertir"), json!({})).await;
    assert_eq!(status, StatusCode::CREATED, "{conversion}");
    let project = &conversion["project"];
    assert_eq!(project["proposal_id"], id);
    assert_eq!(project["client_id"], client);
    assert_eq!(project["name"], "Reservas online");
    assert_eq!(project["budget"], 2500.0);
    assert_eq!(project["status"], "not_started");

    let (status, body) = t.post(&format!("{path}/convertir"), json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "ALREADY_CONVERTED");

    let (_, detail) = t.get(&format!("/clientes/{client}")).await;
    assert_eq!(detail["projects"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn proposal_export_is_a_markdown_attachment() {
    let t = TestApp::spawn("proposal-export").await;
    let client = t.client("Lucía Fernández").await;
    let id = proposal(&t, client, "Tienda online", 3200.0).await;

    let resp = t
        .send(
            Request::builder()
                .uri(format!("/propuestas/{id}/export?key={API_KEY}"))
                .body(Body::empty())
                .expect("failed to build request"),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let headers = resp.headers().clone();
    assert!(
        headers[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/markdown")
    );
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        format!("attachment; filename=\"propuesta-{id}.md\"").as_str()
    );

    let doc = read_body(resp).await;
    assert!(doc.contains("# Mi Empresa"));
    assert!(doc.contains("Tienda online"));
    assert!(doc.contains("Lucía Fernández"));
    assert!(doc.contains("3,200.00 EUR"));
    assert!(doc.contains("31/12/2026"));

    let (status, _) = t.get("/propuestas/4242/export").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn project_tasks_drive_progress() {
    let t = TestApp::spawn("project-tasks").await;
    let client = t.client("Estudio Norte").await;

    let (status, body) = t
        .post(
            "/proyectos",
            json!({
                "client_id": client,
                "name": "Rediseño web",
                "start_date": "2026-10-10",
                "due_date": "2026-10-01"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"]["fields"]["due_date"].is_array());

    let (status, project) = t
        .post(
            "/proyectos",
            json!({ "client_id": client, "name": "Rediseño web", "budget": 1500 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{project}");
    let pid = project["id"].as_i64().unwrap();
    let tasks_path = format!("/proyectos/{pid}/tareas");

    let mut task_ids = Vec::new();
    for title in ["Wireframes", "Maquetación", "Publicación"] {
        let (status, task) = t.post(&tasks_path, json!({ "title": title })).await;
        assert_eq!(status, StatusCode::CREATED, "{task}");
        assert_eq!(task["completed"], false);
        task_ids.push(task["id"].as_i64().unwrap());
    }

    let (_, done) = t
        .post(&format!("/tareas/{}/toggle", task_ids[0]), json!({}))
        .await;
    assert_eq!(done["completed"], true);
    assert!(done["completed_at"].is_string());

    let (_, detail) = t.get(&format!("/proyectos/{pid}")).await;
    assert_eq!(detail["tasks"].as_array().unwrap().len(), 3);
    assert_eq!(detail["progress"], json!({ "completed": 1, "total": 3, "percent": 33 }));

    let (_, reopened) = t
        .post(&format!("/tareas/{}/toggle", task_ids[0]), json!({}))
        .await;
    assert_eq!(reopened["completed"], false);
    assert!(reopened["completed_at"].is_null());

    let (status, renamed) = t
        .put(
            &format!("/tareas/{}", task_ids[1]),
            json!({ "title": "Maquetación responsive", "completed": true }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["completed"], true);

    assert_eq!(
        t.delete(&format!("/tareas/{}", task_ids[2])).await,
        StatusCode::NO_CONTENT
    );
    let (_, tasks) = t.get(&tasks_path).await;
    assert_eq!(tasks.as_array().unwrap().len(), 2);

    let (status, _) = t.post("/proyectos/999/tareas", json!({ "title": "x" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, body) = t.get("/proyectos/999/tareas").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn project_status_transitions_are_enforced() {
    let t = TestApp::spawn("project-status").await;
    let client = t.client("Estudio Norte").await;
    let (_, project) = t
        .post("/proyectos", json!({ "client_id": client, "name": "App" }))
        .await;
    let path = format!("/proyectos/{}", project["id"]);

    let (status, body) = set_status(&t, &path, "completed").await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");

    let (_, started) = set_status(&t, &path, "en_progreso").await;
    assert_eq!(started["status"], "in_progress");
    let (_, paused) = set_status(&t, &path, "paused").await;
    assert_eq!(paused["status"], "paused");
    let (_, completed) = set_status(&t, &path, "completed").await;
    assert_eq!(completed["status"], "completed");
    assert!(completed["completed_at"].is_string());

    let (_, resumed) = set_status(&t, &path, "in_progress").await;
    assert!(resumed["completed_at"].is_null());

    let (_, listed) = t.get("/proyectos?status=in_progress").await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn full_edit_can_carry_a_status_through_the_same_rules() {
    let t = TestApp::spawn("proposal-put-status").await;
    let client = t.client("Estudio Norte").await;
    let id = proposal(&t, client, "Identidad visual", 900.0).await;
    let path = format!("/propuestas/{id}");

    let (status, body) = t
        .put(
            &path,
            json!({ "client_id": client, "title": "Identidad visual", "amount": 900, "status": "rejected" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "INVALID_TRANSITION");
    let (_, unchanged) = t.get(&path).await;
    assert_eq!(unchanged["status"], "draft");

    let (status, sent) = t
        .put(
            &path,
            json!({ "client_id": client, "title": "Identidad visual completa", "amount": 1100, "status": "sent" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{sent}");
    assert_eq!(sent["status"], "sent");
    assert_eq!(sent["title"], "Identidad visual completa");
    assert!(sent["sent_at"].is_string());

    let (_, edited) = t
        .put(
            &path,
            json!({ "client_id": client, "title": "Identidad visual completa", "amount": 1200 }),
        )
        .await;
    assert_eq!(edited["status"], "sent");
    assert_eq!(edited["sent_at"], sent["sent_at"]);
}

#[tokio::test]
async fn monthly_kpis_only_count_rows_inside_the_month() {
    use chrono::{TimeZone, Utc};

    let t = TestApp::spawn("dashboard-window").await;
    let at = |y, m, d, h, min, s| Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap();
    let rows = [
        ("Enero tarde", at(2026, 1, 31, 23, 59, 59)),
        ("Febrero primero", at(2026, 2, 1, 0, 0, 0)),
        ("Febrero último", at(2026, 2, 28, 23, 59, 59)),
        ("Marzo primero", at(2026, 3, 1, 0, 0, 0)),
    ];
    for (name, created_at) in rows {
        sqlx::query(
            r#"INSERT INTO clients (name, status, search_text, created_at, updated_at)
               VALUES (?, 'active', ?, ?, ?)"#,
        )
        .bind(name)
        .bind(name.to_lowercase())
        .bind(created_at)
        .bind(created_at)
        .execute(t.storage.pool())
        .await
        .expect("insert client");
    }
    let (_, first) = t.get("/clientes?search=febrero%20primero").await;
    let client_id = first[0]["id"].as_i64().unwrap();
    for (title, decided_at) in [
        ("Dentro", at(2026, 2, 14, 12, 0, 0)),
        ("Fuera", at(2026, 3, 1, 0, 0, 0)),
    ] {
        sqlx::query(
            r#"INSERT INTO proposals (client_id, title, amount, status, sent_at, decided_at, created_at, updated_at)
               VALUES (?, ?, 1000, 'approved', ?, ?, ?, ?)"#,
        )
        .bind(client_id)
        .bind(title)
        .bind(decided_at)
        .bind(decided_at)
        .bind(decided_at)
        .bind(decided_at)
        .execute(t.storage.pool())
        .await
        .expect("insert proposal");
    }

    let (status, feb) = t.get("/dashboard?month=2026-02").await;
    assert_eq!(status, StatusCode::OK, "{feb}");
    assert_eq!(feb["kpis"]["new_clients"], 2);
    assert_eq!(feb["kpis"]["proposals_created"], 1);
    assert_eq!(feb["kpis"]["proposals_approved"], 1);
    assert_eq!(feb["kpis"]["approved_amount"], 1000.0);

    let (_, jan) = t.get("/dashboard?month=2026-01").await;
    assert_eq!(jan["kpis"]["new_clients"], 1);
    assert_eq!(jan["kpis"]["proposals_approved"], 0);

    let (_, mar) = t.get("/dashboard?month=2026-03").await;
    assert_eq!(mar["kpis"]["new_clients"], 1);
    assert_eq!(mar["kpis"]["proposals_approved"], 1);
}
