// Common test utilities and helper structs
// Shared across all test files to avoid duplication

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, Response, StatusCode},
    Router,
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use phishing_detector::{
    app::AppState,
    app_config::{AppConfig, Environment, ModelConfig, NetworkConfig, ServerConfig},
    config::Watchlists,
    services::{DetectorSettings, PhishingDetector, Primitives},
    utils::{
        domain_age::DomainAgeLookup,
        http_fetch::{FetchedPage, PageFetcher},
        tls_probe::{CertificateSource, PeerCertificate},
    },
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt;

// =============================================================================
// STUB PRIMITIVES
// =============================================================================

/// Serves canned pages by URL; unknown URLs fail like an unreachable host
#[derive(Default)]
pub struct StubFetcher {
    pages: HashMap<String, FetchedPage>,
    delay: Option<Duration>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(
            url.to_string(),
            FetchedPage {
                status: 200,
                final_url: url.to_string(),
                body: body.to_string(),
                redirect_count: 0,
            },
        );
        self
    }

    /// Every fetch sleeps this long first
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl PageFetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> Option<FetchedPage> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.pages.get(url).cloned()
    }
}

/// Hands out the same certificate for every host
#[derive(Default)]
pub struct StubCertificates {
    certificate: Option<PeerCertificate>,
}

impl StubCertificates {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn serving(certificate: PeerCertificate) -> Self {
        Self {
            certificate: Some(certificate),
        }
    }
}

#[async_trait]
impl CertificateSource for StubCertificates {
    async fn peer_certificate(
        &self,
        _host: &str,
        _port: u16,
        _timeout: Duration,
    ) -> Option<PeerCertificate> {
        self.certificate.clone()
    }
}

/// Registration dates by registrable domain
#[derive(Default)]
pub struct StubDomainAge {
    created: HashMap<String, DateTime<Utc>>,
    delay: Option<Duration>,
}

impl StubDomainAge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registered_days_ago(mut self, domain: &str, days: i64) -> Self {
        self.created
            .insert(domain.to_string(), Utc::now() - ChronoDuration::days(days));
        self
    }

    /// Every lookup sleeps this long first
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl DomainAgeLookup for StubDomainAge {
    async fn creation_date(&self, domain: &str, _timeout: Duration) -> Option<DateTime<Utc>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.created.get(domain).copied()
    }
}

/// Certificate a well-configured site would present
pub fn trusted_certificate(sans: &[&str]) -> PeerCertificate {
    PeerCertificate {
        issuer_org: Some("Let's Encrypt".to_string()),
        subject_org: Some("Example Org".to_string()),
        not_after: Some(Utc::now() + ChronoDuration::days(60)),
        subject_alt_names: sans.iter().map(|s| s.to_string()).collect(),
    }
}

// =============================================================================
// DETECTOR SETUP
// =============================================================================

pub fn test_settings() -> DetectorSettings {
    let mut settings = DetectorSettings::default();
    settings.forest.n_trees = 15;
    settings.deadline = Duration::from_secs(5);
    settings.training_concurrency = 4;
    settings.bulk_concurrency = 4;
    settings
}

pub fn detector_with(
    fetcher: StubFetcher,
    certificates: StubCertificates,
    domain_age: StubDomainAge,
) -> PhishingDetector {
    let primitives = Primitives {
        fetcher: Arc::new(fetcher),
        certificates: Arc::new(certificates),
        domain_age: Arc::new(domain_age),
    };
    PhishingDetector::with_primitives(primitives, Watchlists::built_in(), test_settings())
}

/// Detector whose every data source is unavailable
pub fn offline_detector() -> PhishingDetector {
    detector_with(
        StubFetcher::new(),
        StubCertificates::none(),
        StubDomainAge::new(),
    )
}

pub fn test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig {
            bind_address: "127.0.0.1:0".to_string(),
            environment: Environment::Test,
        },
        network: NetworkConfig::default(),
        model: ModelConfig::default(),
        watchlists_path: "data/watchlists.json".to_string(),
    }
}

// =============================================================================
// HTTP TEST CLIENT
// =============================================================================

/// Test application wrapper
pub struct TestApp {
    pub app: Router,
    pub state: AppState,
}

impl TestApp {
    pub fn new(detector: PhishingDetector) -> Self {
        let state = AppState::new(detector, test_config());
        let app = phishing_detector::app_router(state.clone());
        Self { app, state }
    }

    /// Send a POST request
    pub fn post(&self, uri: &str) -> TestRequest<'_> {
        TestRequest::new(self, "POST", uri)
    }

    /// Send a GET request
    pub fn get(&self, uri: &str) -> TestRequest<'_> {
        TestRequest::new(self, "GET", uri)
    }
}

/// Test request builder
pub struct TestRequest<'a> {
    app: &'a TestApp,
    request: Request<Body>,
}

impl<'a> TestRequest<'a> {
    fn new(app: &'a TestApp, method: &str, uri: &str) -> Self {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();

        Self { app, request }
    }

    fn with_body(mut self, content_type: &str, body: Body) -> Self {
        self.request = Request::builder()
            .method(self.request.method().clone())
            .uri(self.request.uri().clone())
            .header("content-type", content_type)
            .body(body)
            .unwrap();
        self
    }

    /// Add JSON body to request
    pub fn json<T: Serialize>(self, body: &T) -> Self {
        let body_bytes = serde_json::to_vec(body).unwrap();
        self.with_body("application/json", Body::from(body_bytes))
    }

    /// Add CSV body to request
    pub fn csv(self, body: &str) -> Self {
        self.with_body("text/csv", Body::from(body.to_string()))
    }

    /// Send the request
    pub async fn send(self) -> TestResponse {
        let response = self.app.app.clone().oneshot(self.request).await.unwrap();
        TestResponse { response }
    }
}

/// Test response wrapper
pub struct TestResponse {
    response: Response<Body>,
}

impl TestResponse {
    /// Get status code
    pub fn status(&self) -> StatusCode {
        self.response.status()
    }

    /// Parse JSON response
    pub async fn json<T: serde::de::DeserializeOwned>(self) -> T {
        let body = axum::body::to_bytes(self.response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }
}
