//! API integration tests against a running server

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:9090";
const USER_HEADER: &str = "X-Sharer-User-Id";

/// Register a user with an email unique to this run
async fn register(client: &Client, name: &str) -> i64 {
    let email = format!(
        "{}-{}@example.org",
        name.to_lowercase(),
        chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
    );
    let response = client
        .post(format!("{}/users", BASE_URL))
        .json(&json!({ "name": name, "email": email }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.expect("Failed to parse response");
    body["id"].as_i64().expect("No id in response")
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_missing_identity_header() {
    let client = Client::new();

    let response = client
        .get(format!("{}/items", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore]
async fn test_booking_flow() {
    let client = Client::new();
    let owner = register(&client, "Anna").await;
    let booker = register(&client, "Bob").await;

    let item: Value = client
        .post(format!("{}/items", BASE_URL))
        .header(USER_HEADER, owner)
        .json(&json!({ "name": "Drill", "description": "Cordless drill", "available": true }))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    let item_id = item["id"].as_i64().expect("No id in response");

    let start = chrono::Utc::now() + chrono::Duration::days(1);
    let end = start + chrono::Duration::days(1);
    let response = client
        .post(format!("{}/bookings", BASE_URL))
        .header(USER_HEADER, booker)
        .json(&json!({ "itemId": item_id, "start": start, "end": end }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);
    let booking: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(booking["status"], "WAITING");

    let response = client
        .patch(format!("{}/bookings/{}?approved=true", BASE_URL, booking["id"]))
        .header(USER_HEADER, owner)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let booking: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(booking["status"], "APPROVED");

    let response = client
        .get(format!("{}/bookings?state=FUTURE", BASE_URL))
        .header(USER_HEADER, booker)
        .send()
        .await
        .expect("Failed to send request");
    let listed: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(listed[0]["id"], booking["id"]);
}

#[tokio::test]
#[ignore]
async fn test_request_board() {
    let client = Client::new();
    let requestor = register(&client, "Carl").await;

    let response = client
        .post(format!("{}/requests", BASE_URL))
        .header(USER_HEADER, requestor)
        .json(&json!({ "description": "Need a ladder" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);

    let own: Value = client
        .get(format!("{}/requests", BASE_URL))
        .header(USER_HEADER, requestor)
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse response");
    assert_eq!(own.as_array().map(Vec::len), Some(1));
}
