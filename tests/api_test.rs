// HTTP API through the router, no network

mod common;

use axum::http::StatusCode;
use common::{detector_with, offline_detector, StubCertificates, StubDomainAge, StubFetcher, TestApp};
use serde_json::{json, Value};

#[tokio::test]
async fn test_analyze_returns_prediction() {
    let app = TestApp::new(offline_detector());

    let response = app
        .post("/api/v1/analyze")
        .json(&json!({ "url": "paypa1-secure.tk/login" }))
        .send()
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await;
    assert_eq!(body["is_phishing"], json!(false));
    assert_eq!(body["risk_level"], json!("Medium"));
    assert_eq!(body["scored_by"], json!("heuristic"));
    assert!(body["negative_indicators"].as_array().unwrap().len() <= 5);
}

#[tokio::test]
async fn test_analyze_rejects_bad_input() {
    let app = TestApp::new(offline_detector());

    let response = app
        .post("/api/v1/analyze")
        .json(&json!({ "url": "" }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .post("/api/v1/analyze")
        .json(&json!({ "link": "example.com" }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await;
    assert_eq!(body["code"], json!("BAD_REQUEST"));

    let response = app
        .post("/api/v1/analyze")
        .json(&json!({ "url": "ftp://example.com/file" }))
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await;
    assert_eq!(body["code"], json!("INVALID_URL"));
}

#[tokio::test]
async fn test_bulk_analysis() {
    let app = TestApp::new(offline_detector());
    let csv = "id,url\n1,https://www.example.com\n2,192.168.1.1/login\n3,ftp://files.example.com\n";

    let response = app.post("/api/v1/analyze/bulk").csv(csv).send().await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await;
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["url"], json!("https://www.example.com"));
    assert_eq!(results[1]["url"], json!("http://192.168.1.1/login"));
    for result in results {
        let confidence = result["confidence"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&confidence));
        assert!(result["risk_level"].is_string());
    }
    assert_eq!(body["skipped"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_bulk_requires_url_column() {
    let app = TestApp::new(offline_detector());

    let response = app
        .post("/api/v1/analyze/bulk")
        .csv("address\nexample.com\n")
        .send()
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_features_endpoint() {
    let url = "http://shop.example.com/";
    let app = TestApp::new(detector_with(
        StubFetcher::new().with_page(url, "<form action=\"/buy\"></form>"),
        StubCertificates::none(),
        StubDomainAge::new().registered_days_ago("example.com", 100),
    ));

    let response = app
        .post("/api/v1/features")
        .json(&json!({ "url": "shop.example.com/" }))
        .send()
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await;
    assert_eq!(body["url"], json!(url));
    assert_eq!(body["schema_version"], json!(1));
    let features = body["features"].as_object().unwrap();
    assert_eq!(features.len(), 30);
    assert_eq!(features["has_form"], json!(1.0));
    assert_eq!(features["form_external_action"], json!(0.0));
    assert_eq!(features["uses_https"], json!(0.0));
}

#[tokio::test]
async fn test_feedback_is_acknowledged() {
    let app = TestApp::new(offline_detector());

    let response = app
        .post("/api/v1/feedback")
        .json(&json!({ "url": "http://example.com", "is_phishing": true }))
        .send()
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await;
    assert_eq!(body, json!({ "success": true }));
}

#[tokio::test]
async fn test_health_reports_model_state() {
    let app = TestApp::new(offline_detector());

    let response = app.get("/api/v1/health").send().await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await;
    assert_eq!(body["status"], json!("healthy"));
    assert_eq!(body["scoring"], json!("heuristic"));
    assert_eq!(body["feature_schema_version"], json!(1));
    assert_eq!(body["model"]["ready"], json!(false));
}
