use axum::http::StatusCode;
use serde_json::json;

mod common;
use common::{create_test_app, register, send};

async fn post_opportunity(
    app: &axum::Router,
    mentor: &str,
    learner_id: Option<&str>,
) -> (StatusCode, serde_json::Value) {
    send(
        app,
        "POST",
        "/api/opportunities",
        Some(mentor),
        Some(json!({
            "title": "Mock interview",
            "description": "Thirty minutes of interview practice",
            "learnerId": learner_id,
        })),
    )
    .await
}

async fn respond(
    app: &axum::Router,
    token: &str,
    opportunity_id: &str,
    status: &str,
) -> (StatusCode, serde_json::Value) {
    send(
        app,
        "POST",
        &format!("/api/opportunities/{}/respond", opportunity_id),
        Some(token),
        Some(json!({ "status": status })),
    )
    .await
}

#[tokio::test]
async fn test_accept_creates_single_match() {
    let app = create_test_app().await;
    let (mentor, mentor_id) = register(&app.router, "Mentor", "mentor@example.com", "mentor").await;
    let (learner, learner_id) =
        register(&app.router, "Learner", "learner@example.com", "learner").await;

    let (status, created) = post_opportunity(&app.router, &mentor, None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["opportunity"]["status"], "open");
    let opportunity_id = created["opportunity"]["id"].as_str().unwrap().to_string();

    let (status, body) = respond(&app.router, &learner, &opportunity_id, "accepted").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["opportunity"]["status"], "accepted");

    let (status, body) = respond(&app.router, &learner, &opportunity_id, "declined").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], 409);

    for token in [&learner, &mentor] {
        let (status, matches) = send(&app.router, "GET", "/api/matches", Some(token), None).await;
        assert_eq!(status, StatusCode::OK);
        let matches = matches.as_array().unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0]["mentorId"], mentor_id.as_str());
        assert_eq!(matches[0]["learnerId"], learner_id.as_str());
        assert_eq!(matches[0]["opportunityId"], opportunity_id.as_str());
    }
}

#[tokio::test]
async fn test_decline_creates_no_match() {
    let app = create_test_app().await;
    let (mentor, _) = register(&app.router, "Mentor", "mentor@example.com", "mentor").await;
    let (learner, _) = register(&app.router, "Learner", "learner@example.com", "learner").await;

    let (_, created) = post_opportunity(&app.router, &mentor, None).await;
    let opportunity_id = created["opportunity"]["id"].as_str().unwrap();

    let (status, body) = respond(&app.router, &learner, opportunity_id, "declined").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["opportunity"]["status"], "declined");

    let (_, matches) = send(&app.router, "GET", "/api/matches", Some(&learner), None).await;
    assert!(matches.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_respond_status() {
    let app = create_test_app().await;
    let (mentor, _) = register(&app.router, "Mentor", "mentor@example.com", "mentor").await;
    let (learner, _) = register(&app.router, "Learner", "learner@example.com", "learner").await;
    let (_, created) = post_opportunity(&app.router, &mentor, None).await;
    let opportunity_id = created["opportunity"]["id"].as_str().unwrap();

    let (status, _) = respond(&app.router, &learner, opportunity_id, "open").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = respond(&app.router, &mentor, opportunity_id, "accepted").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = respond(&app.router, &learner, "missing", "accepted").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Role is checked before the status value.
    let (status, _) = respond(&app.router, &mentor, opportunity_id, "maybe").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_targeted_opportunity_visibility() {
    let app = create_test_app().await;
    let (mentor, _) = register(&app.router, "Mentor", "mentor@example.com", "mentor").await;
    let (alice, alice_id) = register(&app.router, "Alice", "alice@example.com", "learner").await;
    let (bob, _) = register(&app.router, "Bob", "bob@example.com", "learner").await;

    let (status, created) = post_opportunity(&app.router, &mentor, Some(&alice_id)).await;
    assert_eq!(status, StatusCode::CREATED);
    let opportunity_id = created["opportunity"]["id"].as_str().unwrap().to_string();

    let (_, bob_view) = send(&app.router, "GET", "/api/opportunities", Some(&bob), None).await;
    assert!(bob_view.as_array().unwrap().is_empty());
    let (_, alice_view) = send(&app.router, "GET", "/api/opportunities", Some(&alice), None).await;
    assert_eq!(alice_view.as_array().unwrap().len(), 1);

    let (status, _) = respond(&app.router, &bob, &opportunity_id, "accepted").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = respond(&app.router, &alice, &opportunity_id, "accepted").await;
    assert_eq!(status, StatusCode::OK);

    // Once closed, everyone gets a conflict, targeted or not.
    let (status, _) = respond(&app.router, &bob, &opportunity_id, "declined").await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_create_opportunity_rules() {
    let app = create_test_app().await;
    let (mentor, mentor_id) = register(&app.router, "Mentor", "mentor@example.com", "mentor").await;
    let (learner, _) = register(&app.router, "Learner", "learner@example.com", "learner").await;

    let (status, _) = post_opportunity(&app.router, &learner, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = post_opportunity(&app.router, &mentor, Some(&mentor_id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app.router,
        "POST",
        "/api/opportunities",
        Some(&mentor),
        Some(json!({ "title": "", "description": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_accepts_produce_one_match() {
    let app = create_test_app().await;
    let (mentor, _) = register(&app.router, "Mentor", "mentor@example.com", "mentor").await;
    let mut learners = Vec::new();
    for i in 0..6 {
        let (token, _) = register(
            &app.router,
            &format!("Learner {i}"),
            &format!("learner{i}@example.com"),
            "learner",
        )
        .await;
        learners.push(token);
    }

    let (_, created) = post_opportunity(&app.router, &mentor, None).await;
    let opportunity_id = created["opportunity"]["id"].as_str().unwrap().to_string();

    let handles: Vec<_> = learners
        .into_iter()
        .map(|token| {
            let router = app.router.clone();
            let opportunity_id = opportunity_id.clone();
            tokio::spawn(async move {
                respond(&router, &token, &opportunity_id, "accepted").await.0
            })
        })
        .collect();

    let mut statuses = Vec::new();
    for handle in handles {
        statuses.push(handle.await.unwrap());
    }

    let winners = statuses.iter().filter(|s| **s == StatusCode::OK).count();
    let losers = statuses
        .iter()
        .filter(|s| **s == StatusCode::CONFLICT)
        .count();
    assert_eq!(winners, 1);
    assert_eq!(losers, 5);

    let (_, matches) = send(&app.router, "GET", "/api/matches", Some(&mentor), None).await;
    assert_eq!(matches.as_array().unwrap().len(), 1);
}
