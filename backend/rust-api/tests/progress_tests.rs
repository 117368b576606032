use axum::http::StatusCode;

mod common;
use common::{admin_token, create_module, create_test_app, register, send};

#[tokio::test]
async fn test_complete_module_is_idempotent() {
    let app = create_test_app().await;
    let admin = admin_token(&app.router).await;
    let first = create_module(&app.router, &admin, "One", "10 minutes").await;
    for title in ["Two", "Three", "Four"] {
        create_module(&app.router, &admin, title, "10 minutes").await;
    }
    let (learner, _) = register(&app.router, "Learner", "learner@example.com", "learner").await;
    let uri = format!("/api/modules/{}/complete", first);

    let (status, body) = send(&app.router, "POST", &uri, Some(&learner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Module marked as complete");
    assert_eq!(body["progress"], 25);
    assert_eq!(body["totalModules"], 4);

    let (status, body) = send(&app.router, "POST", &uri, Some(&learner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Module already completed");
    assert_eq!(body["completedModules"].as_array().unwrap().len(), 1);
    assert_eq!(body["progress"], 25);
}

#[tokio::test]
async fn test_complete_unknown_module() {
    let app = create_test_app().await;
    let (learner, _) = register(&app.router, "Learner", "learner@example.com", "learner").await;

    let (status, _) = send(
        &app.router,
        "POST",
        "/api/modules/ghost/complete",
        Some(&learner),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_profile_and_reset_permissions() {
    let app = create_test_app().await;
    let admin = admin_token(&app.router).await;
    let module = create_module(&app.router, &admin, "Only", "10 minutes").await;
    let (alice, alice_id) = register(&app.router, "Alice", "alice@example.com", "learner").await;
    let (bob, _) = register(&app.router, "Bob", "bob@example.com", "learner").await;

    send(
        &app.router,
        "POST",
        &format!("/api/modules/{}/complete", module),
        Some(&alice),
        None,
    )
    .await;

    let profile_uri = format!("/api/users/{}", alice_id);
    let reset_uri = format!("/api/users/{}/reset-progress", alice_id);

    let (status, _) = send(&app.router, "GET", &profile_uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app.router, "POST", &reset_uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, profile) = send(&app.router, "GET", &profile_uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["progress"], 100);
    assert_eq!(profile["completedCount"], 1);

    let (status, _) = send(&app.router, "POST", &reset_uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, profile) = send(&app.router, "GET", &profile_uri, Some(&admin), None).await;
    assert_eq!(profile["progress"], 0);
    assert!(profile["completedModules"].as_array().unwrap().is_empty());

    let (status, _) = send(
        &app.router,
        "POST",
        "/api/users/ghost/reset-progress",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_user_listing_with_progress() {
    let app = create_test_app().await;
    let admin = admin_token(&app.router).await;
    let module = create_module(&app.router, &admin, "Only", "10 minutes").await;
    let (learner, learner_id) =
        register(&app.router, "Learner", "learner@example.com", "learner").await;
    register(&app.router, "Mentor", "mentor@example.com", "mentor").await;
    send(
        &app.router,
        "POST",
        &format!("/api/modules/{}/complete", module),
        Some(&learner),
        None,
    )
    .await;

    let (status, users) = send(&app.router, "GET", "/api/admin/users", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users.as_array().unwrap().len(), 3);

    let (status, learners) = send(
        &app.router,
        "GET",
        "/api/admin/users?role=learner",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let learners = learners.as_array().unwrap();
    assert_eq!(learners.len(), 1);
    assert_eq!(learners[0]["id"], learner_id.as_str());
    assert_eq!(learners[0]["progress"], 100);

    let (status, _) = send(&app.router, "GET", "/api/admin/users", Some(&learner), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
