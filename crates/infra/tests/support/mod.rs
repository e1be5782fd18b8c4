//! Shared helpers for `carindex-infra` integration tests.
//!
//! A wiremock-backed catalog API and a temporary SQLite database.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use carindex_common::{Clock, MockClock, RateLimiter, Unthrottled};
use carindex_domain::CatalogApiConfig;
use carindex_infra::catalog::{
    CatalogClient, CredentialManager, HttpAuthTransport, PaginatedFetcher, PaginationSettings,
    TokenLifetimes,
};
use carindex_infra::database::DbManager;
use carindex_infra::http::HttpClient;
use carindex_infra::observability::CatalogMetrics;
use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Temporary database that lives as long as the test.
pub struct TestDatabase {
    pub manager: Arc<DbManager>,
    _temp_dir: TempDir,
}

impl TestDatabase {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir should be created");
        let manager =
            DbManager::new(temp_dir.path().join("catalog.db"), 4).expect("db manager should be created");
        manager.run_migrations().expect("migrations should run");
        Self { manager: Arc::new(manager), _temp_dir: temp_dir }
    }
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::new()
    }
}

pub fn api_config(server: &MockServer) -> CatalogApiConfig {
    CatalogApiConfig {
        base_url: server.uri(),
        auth_base_url: format!("{}/auth", server.uri()),
        username: "dealer".into(),
        password: "secret".into(),
        request_interval_ms: 0,
        ..CatalogApiConfig::default()
    }
}

/// Client with an injectable clock and limiter.
pub struct TestClient {
    pub client: Arc<CatalogClient>,
    pub clock: Arc<MockClock>,
    pub metrics: Arc<CatalogMetrics>,
}

pub fn test_client(server: &MockServer) -> TestClient {
    test_client_with_limiter(server, Arc::new(Unthrottled))
}

pub fn test_client_with_limiter(server: &MockServer, limiter: Arc<dyn RateLimiter>) -> TestClient {
    let config = api_config(server);
    let clock = Arc::new(MockClock::new());
    let metrics = Arc::new(CatalogMetrics::new());

    let transport = Arc::new(HttpAuthTransport::from_config(HttpClient::new().expect("http client"), &config));
    let credentials = CredentialManager::with_clock(
        transport,
        TokenLifetimes::from_config(&config),
        clock.clone() as Arc<dyn Clock>,
        metrics.clone(),
    );
    let fetcher = PaginatedFetcher::new(
        HttpClient::new().expect("http client"),
        limiter,
        metrics.clone(),
        PaginationSettings::from_config(&config),
    );

    TestClient {
        client: Arc::new(CatalogClient::new(&config.base_url, credentials, fetcher, metrics.clone())),
        clock,
        metrics,
    }
}

pub async fn mount_login(server: &MockServer, access: &str, delay: Duration) {
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "access_token": access, "refresh_token": "refresh-token" }))
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

pub async fn mount_refresh(server: &MockServer, access: &str, delay: Duration) {
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "access_token": access }))
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

pub fn pagination_header(total: u64, total_pages: u32) -> String {
    json!({ "total": total, "total_pages": total_pages, "page_size": 100 }).to_string()
}

/// Serve `body` as page `page` of `total_pages` at `route`.
pub async fn mount_page(server: &MockServer, route: &str, page: u32, total_pages: u32, body: Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .and(query_param("page", page.to_string()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(body)
                .insert_header("x-pagination", pagination_header(0, total_pages).as_str()),
        )
        .expect(1)
        .mount(server)
        .await;
}

/// Serve `body` as the single page of `route`.
pub async fn mount_list(server: &MockServer, route: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// A small two-brand catalog priced 2020..=2021.
///
/// - brand 1 (Fiat): group 11 "Uno" with two versions (2020, 2021); group 12 "Toro" only 2021
/// - brand 2 (Ford): group 21 "Ka" with one version (2020, 2021)
pub async fn mount_sample_catalog(server: &MockServer) {
    mount_list(
        server,
        "/brands/",
        json!([
            { "id": 1, "name": "Fiat", "prices_from": 2020, "prices_to": 2021 },
            { "id": 2, "name": "Ford", "prices_from": 2020, "prices_to": 2021 }
        ]),
    )
    .await;
    mount_list(
        server,
        "/brands/1/models/",
        json!([
            { "codia": 101, "description": "Uno Way", "years": [2020, 2021], "group": { "id": 11, "name": "Uno" } },
            { "codia": 102, "description": "Uno Attractive", "prices_from": 2020, "prices_to": 2021, "group": { "id": 11, "name": "Uno" } },
            { "codia": 103, "description": "Toro Freedom", "years": [2021], "group": { "id": 12, "name": "Toro" } }
        ]),
    )
    .await;
    mount_list(
        server,
        "/brands/2/models/",
        json!([
            { "codia": 201, "description": "Ka SE", "production_years": [2020, 2021], "group": { "id": 21, "name": "Ka" } }
        ]),
    )
    .await;
    mount_list(
        server,
        "/brands/1/groups/11/models/",
        json!([
            { "codia": "0101", "description": "UNO 1.3 Way", "list_price": 90000.0, "prices": true },
            { "codia": "0102", "description": "UNO 1.3 Attractive", "list_price": 95000.0, "prices": true }
        ]),
    )
    .await;
    mount_list(
        server,
        "/brands/1/groups/12/models/",
        json!([{ "codia": "0103", "description": "Toro 2.0 Freedom", "prices": true }]),
    )
    .await;
    mount_list(
        server,
        "/brands/2/groups/21/models/",
        json!([{ "codia": "0201", "description": "Ka 1.5 SE", "prices": true }]),
    )
    .await;
}
