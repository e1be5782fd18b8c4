//! Shared helpers for app-level integration tests.

#![allow(dead_code)]

use carindex_domain::{CatalogApiConfig, Config, DatabaseConfig, SyncConfig};
use carindex_lib::AppContext;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Context over a mock catalog and a throwaway database.
pub struct TestApp {
    pub ctx: AppContext,
    pub server: MockServer,
    _temp_dir: TempDir,
}

pub fn test_config(server: &MockServer, temp_dir: &TempDir, sync_enabled: bool) -> Config {
    Config {
        catalog: CatalogApiConfig {
            base_url: server.uri(),
            auth_base_url: format!("{}/auth", server.uri()),
            username: "dealer".into(),
            password: "secret".into(),
            request_interval_ms: 0,
            ..CatalogApiConfig::default()
        },
        sync: SyncConfig {
            enabled: sync_enabled,
            // Once a year, so no tick fires during a test
            cron_expression: "0 0 0 1 1 *".into(),
            ..SyncConfig::default()
        },
        database: DatabaseConfig {
            path: temp_dir.path().join("carindex.db").to_string_lossy().into_owned(),
            pool_size: 4,
        },
        ..Config::default()
    }
}

pub async fn setup_app(sync_enabled: bool) -> TestApp {
    let server = MockServer::start().await;
    mount_catalog(&server).await;

    let temp_dir = TempDir::new().expect("temp dir should be created");
    let ctx = AppContext::new_with_config(test_config(&server, &temp_dir, sync_enabled))
        .await
        .expect("context should initialize");

    TestApp { ctx, server, _temp_dir: temp_dir }
}

/// One brand (Honda, 2022) with one group (Civic) holding two versions.
pub async fn mount_catalog(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "access_token": "access-1", "refresh_token": "refresh-1" })),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/brands/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 9, "name": "Honda", "prices_from": 2022, "prices_to": 2022 }
        ])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/brands/9/models/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "codia": 901, "description": "Civic EXL", "years": [2022], "group": { "id": 90, "name": "Civic" } }
        ])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/brands/9/groups/90/models/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "codia": "0901", "description": "Civic 2.0 EXL", "prices": true },
            { "codia": "0902", "description": "Civic 1.5 Touring", "prices": true }
        ])))
        .mount(server)
        .await;
}
