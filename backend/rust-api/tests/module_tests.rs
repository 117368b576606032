use axum::http::StatusCode;
use serde_json::json;

mod common;
use common::{admin_token, create_module, create_test_app, register, send};

#[tokio::test]
async fn test_catalog_is_public_and_ordered() {
    let app = create_test_app().await;
    let admin = admin_token(&app.router).await;
    let first = create_module(&app.router, &admin, "Online Safety", "20 minutes").await;
    let second = create_module(&app.router, &admin, "Spreadsheets", "45 minutes").await;

    let (status, body) = send(&app.router, "GET", "/api/modules", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![first.as_str(), second.as_str()]);

    let (status, body) = send(
        &app.router,
        "GET",
        &format!("/api/modules/{}", second),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Spreadsheets");

    let (status, body) = send(&app.router, "GET", "/api/modules/missing", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Module not found");
}

#[tokio::test]
async fn test_module_management_requires_admin() {
    let app = create_test_app().await;
    let (mentor, _) = register(&app.router, "Mentor", "mentor@example.com", "mentor").await;

    let (status, _) = send(
        &app.router,
        "POST",
        "/api/modules",
        Some(&mentor),
        Some(json!({ "title": "Sneaky module" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app.router,
        "POST",
        "/api/modules",
        None,
        Some(json!({ "title": "Anonymous module" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_update_keeps_identity() {
    let app = create_test_app().await;
    let admin = admin_token(&app.router).await;
    let id = create_module(&app.router, &admin, "Email Basics", "30 minutes").await;

    let (status, body) = send(
        &app.router,
        "PUT",
        &format!("/api/modules/{}", id),
        Some(&admin),
        Some(json!({ "title": "Email Essentials", "difficulty": "Intermediate" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id.as_str());
    assert_eq!(body["title"], "Email Essentials");
    assert_eq!(body["duration"], "30 minutes");
    assert_eq!(body["difficulty"], "Intermediate");
}

#[tokio::test]
async fn test_delete_cascades_to_progress() {
    let app = create_test_app().await;
    let admin = admin_token(&app.router).await;
    let keep = create_module(&app.router, &admin, "Keep", "10 minutes").await;
    let doomed = create_module(&app.router, &admin, "Doomed", "10 minutes").await;
    let (learner, learner_id) =
        register(&app.router, "Learner", "learner@example.com", "learner").await;

    for id in [&keep, &doomed] {
        let (status, _) = send(
            &app.router,
            "POST",
            &format!("/api/modules/{}/complete", id),
            Some(&learner),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, _) = send(
        &app.router,
        "DELETE",
        &format!("/api/modules/{}", doomed),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, profile) = send(
        &app.router,
        "GET",
        &format!("/api/users/{}", learner_id),
        Some(&learner),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["completedModules"], json!([keep]));
    assert_eq!(profile["progress"], 100);

    let (status, _) = send(
        &app.router,
        "DELETE",
        &format!("/api/modules/{}", doomed),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_prefixed_module_routes() {
    let app = create_test_app().await;
    let admin = admin_token(&app.router).await;
    let (mentor, _) = register(&app.router, "Mentor", "mentor@example.com", "mentor").await;

    let (status, _) = send(
        &app.router,
        "POST",
        "/api/admin/modules",
        Some(&mentor),
        Some(json!({ "title": "Sneaky module" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, created) = send(
        &app.router,
        "POST",
        "/api/admin/modules",
        Some(&admin),
        Some(json!({ "title": "Typing Skills", "duration": "15 minutes" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app.router,
        "DELETE",
        &format!("/api/admin/modules/{}", id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app.router, "GET", &format!("/api/modules/{}", id), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
