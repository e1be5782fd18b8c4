//! Catalog API credential manager
//!
//! Owns the access/refresh token pair and guarantees a usable access token
//! before every catalog call.
//!
//! - Access tokens are treated as expired `access_token_margin_secs` before
//!   their nominal lifetime; refresh tokens likewise with their own margin.
//! - At most one refresh and at most one login are outstanding at any time.
//!   Concurrent callers join the in-flight operation through a shared future
//!   and all observe its single outcome.
//! - A failed refresh or login leaves the stored tokens untouched.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use carindex_common::{Clock, SystemClock};
use carindex_domain::CatalogApiConfig;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use reqwest::Method;
use tracing::{debug, info, warn};

use super::errors::AuthError;
use super::types::{LoginResponse, RefreshRequest, RefreshResponse};
use crate::http::HttpClient;
use crate::observability::{log_metric, CatalogMetrics};

/// Tokens returned by a full login.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: String,
}

impl fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenGrant").finish_non_exhaustive()
    }
}

/// HTTP exchange behind the credential manager.
#[async_trait]
pub trait AuthTransport: Send + Sync {
    /// Exchange the long-lived credentials for a fresh token pair.
    async fn login(&self) -> Result<TokenGrant, AuthError>;

    /// Exchange a refresh token for a new access token.
    async fn refresh(&self, refresh_token: &str) -> Result<String, AuthError>;
}

/// Credential endpoints over the shared [`HttpClient`].
pub struct HttpAuthTransport {
    http: HttpClient,
    auth_base_url: String,
    username: String,
    password: String,
}

impl HttpAuthTransport {
    pub fn new(
        http: HttpClient,
        auth_base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            http,
            auth_base_url: auth_base_url.into().trim_end_matches('/').to_string(),
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn from_config(http: HttpClient, config: &CatalogApiConfig) -> Self {
        Self::new(http, &config.auth_base_url, &config.username, &config.password)
    }

    async fn post(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, AuthError> {
        let response =
            self.http.send(builder).await.map_err(|err| AuthError::Transport(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(AuthError::Rejected { status: status.as_u16(), body })
    }
}

#[async_trait]
impl AuthTransport for HttpAuthTransport {
    async fn login(&self) -> Result<TokenGrant, AuthError> {
        if self.username.is_empty() || self.password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        let request = self
            .http
            .request(Method::POST, format!("{}/login", self.auth_base_url))
            .basic_auth(&self.username, Some(&self.password));

        let body: LoginResponse = self
            .post(request)
            .await?
            .json()
            .await
            .map_err(|err| AuthError::InvalidResponse(err.to_string()))?;

        Ok(TokenGrant { access_token: body.access_token, refresh_token: body.refresh_token })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<String, AuthError> {
        let request = self
            .http
            .request(Method::POST, format!("{}/refresh", self.auth_base_url))
            .json(&RefreshRequest { refresh_token });

        let body: RefreshResponse = self
            .post(request)
            .await?
            .json()
            .await
            .map_err(|err| AuthError::InvalidResponse(err.to_string()))?;

        Ok(body.access_token)
    }
}

/// Effective token lifetimes (nominal lifetime minus safety margin).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenLifetimes {
    pub access: Duration,
    pub refresh: Duration,
}

impl TokenLifetimes {
    pub fn from_config(config: &CatalogApiConfig) -> Self {
        Self { access: config.effective_access_ttl(), refresh: config.effective_refresh_ttl() }
    }
}

impl Default for TokenLifetimes {
    fn default() -> Self {
        Self::from_config(&CatalogApiConfig::default())
    }
}

#[derive(Default)]
struct CredentialState {
    access_token: Option<String>,
    refresh_token: Option<String>,
    access_expires_at: Option<Instant>,
    refresh_expires_at: Option<Instant>,
}

impl CredentialState {
    fn valid_access_token(&self, now: Instant) -> Option<String> {
        match (&self.access_token, self.access_expires_at) {
            (Some(token), Some(expires_at)) if now < expires_at => Some(token.clone()),
            _ => None,
        }
    }

    fn valid_refresh_token(&self, now: Instant) -> Option<String> {
        match (&self.refresh_token, self.refresh_expires_at) {
            (Some(token), Some(expires_at)) if now < expires_at => Some(token.clone()),
            _ => None,
        }
    }
}

type Flight = Shared<BoxFuture<'static, Result<String, AuthError>>>;

enum Pending {
    Ready(String),
    Flight(Flight),
}

struct Inner {
    transport: Arc<dyn AuthTransport>,
    clock: Arc<dyn Clock>,
    lifetimes: TokenLifetimes,
    metrics: Arc<CatalogMetrics>,
    state: Mutex<CredentialState>,
    refresh_flight: Mutex<Option<Flight>>,
    login_flight: Mutex<Option<Flight>>,
}

impl Inner {
    fn valid_access_token(&self) -> Option<String> {
        self.state.lock().valid_access_token(self.clock.now())
    }

    /// Join the in-flight refresh or start one. With `recheck`, a token that
    /// became valid while waiting for the slot is returned instead.
    fn refresh_flight(self: &Arc<Self>, recheck: bool) -> Pending {
        let mut slot = self.refresh_flight.lock();
        if let Some(flight) = slot.as_ref() {
            return Pending::Flight(flight.clone());
        }
        if recheck {
            if let Some(token) = self.valid_access_token() {
                return Pending::Ready(token);
            }
        }

        let inner = Arc::clone(self);
        let flight = async move {
            let result = inner.run_refresh().await;
            *inner.refresh_flight.lock() = None;
            result
        }
        .boxed()
        .shared();

        *slot = Some(flight.clone());
        Pending::Flight(flight)
    }

    fn login_flight(self: &Arc<Self>) -> Flight {
        let mut slot = self.login_flight.lock();
        if let Some(flight) = slot.as_ref() {
            return flight.clone();
        }

        let inner = Arc::clone(self);
        let flight = async move {
            let result = inner.run_login().await;
            *inner.login_flight.lock() = None;
            result
        }
        .boxed()
        .shared();

        *slot = Some(flight.clone());
        flight
    }

    async fn run_refresh(self: &Arc<Self>) -> Result<String, AuthError> {
        let refresh_token = self.state.lock().valid_refresh_token(self.clock.now());
        let Some(refresh_token) = refresh_token else {
            debug!("refresh token missing or expired; logging in");
            return self.login_flight().await;
        };

        match self.transport.refresh(&refresh_token).await {
            Ok(access_token) => {
                let now = self.clock.now();
                let mut state = self.state.lock();
                state.access_token = Some(access_token.clone());
                state.access_expires_at = Some(now + self.lifetimes.access);
                drop(state);

                log_metric(self.metrics.record_token_refresh(), "catalog.auth.refreshes");
                debug!("catalog access token refreshed");
                Ok(access_token)
            }
            Err(err) if err.is_invalid_grant() => {
                warn!(error = %err, "refresh token rejected; falling back to login");
                self.login_flight().await
            }
            Err(err) => {
                warn!(error = %err, "catalog token refresh failed");
                log_metric(self.metrics.record_auth_failure(), "catalog.auth.failures");
                Err(err)
            }
        }
    }

    async fn run_login(self: &Arc<Self>) -> Result<String, AuthError> {
        match self.transport.login().await {
            Ok(grant) => {
                let now = self.clock.now();
                let mut state = self.state.lock();
                state.access_token = Some(grant.access_token.clone());
                state.refresh_token = Some(grant.refresh_token);
                state.access_expires_at = Some(now + self.lifetimes.access);
                state.refresh_expires_at = Some(now + self.lifetimes.refresh);
                drop(state);

                log_metric(self.metrics.record_token_login(), "catalog.auth.logins");
                info!("logged in to catalog API");
                Ok(grant.access_token)
            }
            Err(err) => {
                warn!(error = %err, "catalog login failed");
                log_metric(self.metrics.record_auth_failure(), "catalog.auth.failures");
                Err(err)
            }
        }
    }
}

/// Shared handle to the catalog credentials. Cheap to clone.
#[derive(Clone)]
pub struct CredentialManager {
    inner: Arc<Inner>,
}

impl CredentialManager {
    pub fn new(transport: Arc<dyn AuthTransport>, lifetimes: TokenLifetimes) -> Self {
        Self::with_clock(transport, lifetimes, Arc::new(SystemClock), Arc::new(CatalogMetrics::new()))
    }

    pub fn with_clock(
        transport: Arc<dyn AuthTransport>,
        lifetimes: TokenLifetimes,
        clock: Arc<dyn Clock>,
        metrics: Arc<CatalogMetrics>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                clock,
                lifetimes,
                metrics,
                state: Mutex::new(CredentialState::default()),
                refresh_flight: Mutex::new(None),
                login_flight: Mutex::new(None),
            }),
        }
    }

    /// Return a usable access token, refreshing or logging in when needed.
    pub async fn ensure_valid(&self) -> Result<String, AuthError> {
        if let Some(token) = self.inner.valid_access_token() {
            return Ok(token);
        }

        let login = self.inner.login_flight.lock().clone();
        if let Some(flight) = login {
            return flight.await;
        }

        match self.inner.refresh_flight(true) {
            Pending::Flight(flight) => flight.await,
            Pending::Ready(token) => Ok(token),
        }
    }

    /// Refresh now, whatever the local expiry clock says. Joins a refresh
    /// that is already running.
    pub async fn force_refresh(&self) -> Result<String, AuthError> {
        match self.inner.refresh_flight(false) {
            Pending::Flight(flight) => flight.await,
            Pending::Ready(token) => Ok(token),
        }
    }

    /// Full login, joining one that is already running.
    pub async fn login(&self) -> Result<String, AuthError> {
        self.inner.login_flight().await
    }

    /// Drop both tokens; the next call logs in again.
    pub fn invalidate(&self) {
        *self.inner.state.lock() = CredentialState::default();
        info!("catalog credentials invalidated");
    }

    pub fn has_valid_token(&self) -> bool {
        self.inner.valid_access_token().is_some()
    }
}

impl fmt::Debug for CredentialManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialManager")
            .field("lifetimes", &self.inner.lifetimes)
            .field("has_valid_token", &self.has_valid_token())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use carindex_common::MockClock;

    use super::*;

    /// Counts calls and hands out numbered tokens.
    #[derive(Default)]
    struct ScriptedTransport {
        logins: AtomicUsize,
        refreshes: AtomicUsize,
        refresh_error: Mutex<Option<AuthError>>,
        login_error: Mutex<Option<AuthError>>,
    }

    #[async_trait]
    impl AuthTransport for ScriptedTransport {
        async fn login(&self) -> Result<TokenGrant, AuthError> {
            let n = self.logins.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(Duration::from_millis(20)).await;
            if let Some(err) = self.login_error.lock().clone() {
                return Err(err);
            }
            Ok(TokenGrant { access_token: format!("access-{n}"), refresh_token: format!("refresh-{n}") })
        }

        async fn refresh(&self, refresh_token: &str) -> Result<String, AuthError> {
            let n = self.refreshes.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(Duration::from_millis(20)).await;
            if let Some(err) = self.refresh_error.lock().clone() {
                return Err(err);
            }
            Ok(format!("{refresh_token}-access-{n}"))
        }
    }

    fn manager(transport: Arc<ScriptedTransport>, clock: MockClock) -> CredentialManager {
        CredentialManager::with_clock(
            transport,
            TokenLifetimes::default(),
            Arc::new(clock),
            Arc::new(CatalogMetrics::new()),
        )
    }

    #[tokio::test]
    async fn first_call_logs_in_then_reuses_token() {
        let transport = Arc::new(ScriptedTransport::default());
        let creds = manager(transport.clone(), MockClock::new());

        assert_eq!(creds.ensure_valid().await.unwrap(), "access-1");
        assert_eq!(creds.ensure_valid().await.unwrap(), "access-1");
        assert_eq!(transport.logins.load(Ordering::SeqCst), 1);
        assert_eq!(transport.refreshes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn expired_access_token_is_refreshed_once() {
        let transport = Arc::new(ScriptedTransport::default());
        let clock = MockClock::new();
        let creds = manager(transport.clone(), clock.clone());

        creds.ensure_valid().await.unwrap();
        clock.advance(Duration::from_secs(56 * 60));

        assert_eq!(creds.ensure_valid().await.unwrap(), "refresh-1-access-1");
        assert_eq!(transport.refreshes.load(Ordering::SeqCst), 1);
        assert_eq!(transport.logins.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_refresh_token_logs_in_instead() {
        let transport = Arc::new(ScriptedTransport::default());
        let clock = MockClock::new();
        let creds = manager(transport.clone(), clock.clone());

        creds.ensure_valid().await.unwrap();
        clock.advance(Duration::from_secs(23 * 60 * 60 + 1));

        assert_eq!(creds.ensure_valid().await.unwrap(), "access-2");
        assert_eq!(transport.refreshes.load(Ordering::SeqCst), 0);
        assert_eq!(transport.logins.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalid_grant_falls_back_to_login() {
        let transport = Arc::new(ScriptedTransport::default());
        let clock = MockClock::new();
        let creds = manager(transport.clone(), clock.clone());

        creds.ensure_valid().await.unwrap();
        *transport.refresh_error.lock() =
            Some(AuthError::Rejected { status: 400, body: r#"{"error":"invalid_grant"}"#.into() });
        clock.advance(Duration::from_secs(60 * 60));

        assert_eq!(creds.ensure_valid().await.unwrap(), "access-2");
        assert_eq!(transport.refreshes.load(Ordering::SeqCst), 1);
        assert_eq!(transport.logins.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failure_leaves_tokens_untouched() {
        let transport = Arc::new(ScriptedTransport::default());
        let clock = MockClock::new();
        let creds = manager(transport.clone(), clock.clone());

        creds.ensure_valid().await.unwrap();
        *transport.refresh_error.lock() = Some(AuthError::Transport("refused".into()));

        let err = creds.force_refresh().await.unwrap_err();
        assert_eq!(err, AuthError::Transport("refused".into()));
        assert_eq!(creds.ensure_valid().await.unwrap(), "access-1");
    }

    #[tokio::test]
    async fn rejected_refresh_and_failed_login_keep_previous_tokens() {
        let transport = Arc::new(ScriptedTransport::default());
        let clock = MockClock::new();
        let creds = manager(transport.clone(), clock.clone());

        creds.ensure_valid().await.unwrap();
        *transport.refresh_error.lock() = Some(AuthError::Rejected { status: 401, body: String::new() });
        *transport.login_error.lock() = Some(AuthError::Rejected { status: 403, body: "locked".into() });
        clock.advance(Duration::from_secs(56 * 60));

        let err = creds.ensure_valid().await.unwrap_err();
        assert!(matches!(err, AuthError::Rejected { status: 403, .. }));
        assert_eq!(transport.refreshes.load(Ordering::SeqCst), 1);
        assert_eq!(transport.logins.load(Ordering::SeqCst), 2);

        // The stored refresh token survives and is used on the next attempt
        *transport.refresh_error.lock() = None;
        *transport.login_error.lock() = None;
        assert_eq!(creds.ensure_valid().await.unwrap(), "refresh-1-access-2");
        assert_eq!(transport.logins.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_callers_share_one_refresh() {
        let transport = Arc::new(ScriptedTransport::default());
        let clock = MockClock::new();
        let creds = manager(transport.clone(), clock.clone());

        creds.ensure_valid().await.unwrap();
        clock.advance(Duration::from_secs(60 * 60));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let creds = creds.clone();
                tokio::spawn(async move { creds.ensure_valid().await })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "refresh-1-access-1");
        }
        assert_eq!(transport.refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_failure_is_seen_by_every_waiter() {
        let transport = Arc::new(ScriptedTransport::default());
        *transport.login_error.lock() = Some(AuthError::Rejected { status: 403, body: "nope".into() });
        let creds = manager(transport.clone(), MockClock::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let creds = creds.clone();
                tokio::spawn(async move { creds.ensure_valid().await })
            })
            .collect();

        for handle in handles {
            assert!(matches!(handle.await.unwrap(), Err(AuthError::Rejected { status: 403, .. })));
        }
        assert_eq!(transport.logins.load(Ordering::SeqCst), 1);
        assert!(!creds.has_valid_token());
    }

    #[tokio::test]
    async fn invalidate_forces_a_new_login() {
        let transport = Arc::new(ScriptedTransport::default());
        let creds = manager(transport.clone(), MockClock::new());

        creds.ensure_valid().await.unwrap();
        creds.invalidate();

        assert_eq!(creds.ensure_valid().await.unwrap(), "access-2");
        assert_eq!(transport.logins.load(Ordering::SeqCst), 2);
    }
}
