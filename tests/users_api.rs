//! User CRUD over a real socket.

use reqwest::StatusCode;
use serde_json::{json, Value};

mod common;

async fn create(server: &common::TestServer, email: &str, name: &str) -> reqwest::Response {
    server
        .client
        .post(server.url("/api/v1/users"))
        .json(&json!({"email": email, "name": name}))
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn crud_round_trip() {
    let server = common::start().await;

    let res = create(&server, "ada@example.com", "Ada Lovelace").await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "User created successfully");
    assert!(body.get("error").is_none());
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let res = server
        .client
        .get(server.url(&format!("/api/v1/users/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["email"], "ada@example.com");

    let res = server
        .client
        .put(server.url(&format!("/api/v1/users/{id}")))
        .json(&json!({"name": "Countess of Lovelace", "email": ""}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "User updated successfully");
    assert_eq!(body["data"]["name"], "Countess of Lovelace");
    assert_eq!(body["data"]["email"], "ada@example.com");

    let res = server
        .client
        .delete(server.url(&format!("/api/v1/users/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(
        body,
        json!({"success": true, "message": "User deleted successfully"})
    );

    let res = server
        .client
        .get(server.url(&format!("/api/v1/users/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(
        body,
        json!({"success": false, "message": "User not found", "error": "Resource not found"})
    );

    server.shutdown().await;
}

#[tokio::test]
async fn duplicate_email_is_rejected_without_a_second_row() {
    let server = common::start().await;

    assert_eq!(
        create(&server, "grace@example.com", "Grace").await.status(),
        StatusCode::CREATED
    );

    let res = create(&server, "grace@example.com", "Grace Again").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Failed to create user");
    assert!(body["error"].as_str().unwrap().contains("already exists"));

    let body: Value = server
        .client
        .get(server.url("/api/v1/users"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["count"], 1);

    server.shutdown().await;
}

#[tokio::test]
async fn bad_input_is_a_400() {
    let server = common::start().await;

    let res = create(&server, "not-an-email", "A").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Validation failed");
    let fields: Vec<&str> = body["error"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["email", "name"]);

    let res = server
        .client
        .post(server.url("/api/v1/users"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Invalid request body");

    let res = server
        .client
        .get(server.url("/api/v1/users/12345"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Invalid user ID");

    server.shutdown().await;
}

#[tokio::test]
async fn pagination_defaults_and_clamps() {
    let server = common::start().await;
    for i in 0..12 {
        create(&server, &format!("user{i}@example.com"), &format!("User {i}")).await;
    }

    for query in ["", "?limit=0&offset=-3", "?limit=abc"] {
        let body: Value = server
            .client
            .get(server.url(&format!("/api/v1/users{query}")))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["message"], "Users retrieved successfully");
        assert_eq!(body["data"]["limit"], 10, "query {query:?}");
        assert_eq!(body["data"]["offset"], 0, "query {query:?}");
        assert_eq!(body["data"]["count"], 10, "query {query:?}");
    }

    let body: Value = server
        .client
        .get(server.url("/api/v1/users?limit=5&offset=10"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["count"], 2);
    assert_eq!(body["data"]["users"][0]["email"], "user10@example.com");

    server.shutdown().await;
}

#[tokio::test]
async fn store_outage_is_a_500() {
    let server = common::start().await;
    server.store.set_available(false);

    let res = server
        .client
        .get(server.url("/api/v1/users"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = res.json().await.unwrap();
    assert_eq!(
        body,
        json!({"success": false, "message": "Failed to list users", "error": "Internal server error"})
    );

    server.store.set_available(true);
    server.shutdown().await;
}
