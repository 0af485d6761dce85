//! Authenticated request dispatch with a single-flight refresh-and-retry
//! cycle on authorization failure.

use std::sync::Arc;

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde::Serialize;
use serde_json::json;
use tokio::sync::Mutex;

use crate::config::PortalConfig;
use crate::error::AuthError;
use crate::http::{build_client, status_to_error};
use crate::session::SessionStore;

/// Wraps the refresh-token exchange.
pub struct TokenRefresher {
    client: reqwest::Client,
    base_url: String,
}

impl TokenRefresher {
    pub fn new(config: &PortalConfig) -> Self {
        Self {
            client: build_client(config),
            base_url: config.base_url.clone(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Exchange the refresh token for a new access token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, AuthError> {
        let resp = self
            .client
            .post(format!("{}/token/refresh/", self.base_url))
            .json(&json!({ "refresh": refresh_token }))
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(status_to_error(status.as_u16(), &body));
        }
        let payload: RefreshResponse = serde_json::from_str(&body)?;
        Ok(payload.access)
    }
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: String,
}

/// Issues API calls with the current bearer token attached.
///
/// On a 401 the dispatcher performs at most one refresh-and-retry cycle per
/// original request. The refresh itself is single-flight: concurrent 401s
/// queue on one guard, and whoever acquires it after a completed exchange
/// reuses the replaced token instead of refreshing again. A failed exchange
/// clears the session and surfaces [`AuthError::SessionExpired`], which the
/// caller must treat as "force re-login".
#[derive(Clone)]
pub struct Dispatcher {
    client: reqwest::Client,
    base_url: String,
    store: SessionStore,
    refresher: Arc<TokenRefresher>,
    refresh_gate: Arc<Mutex<()>>,
}

impl Dispatcher {
    pub fn new(config: &PortalConfig, store: SessionStore) -> Self {
        Self {
            client: build_client(config),
            base_url: config.base_url.clone(),
            store,
            refresher: Arc::new(TokenRefresher::new(config)),
            refresh_gate: Arc::new(Mutex::new(())),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.refresher = Arc::new(TokenRefresher {
            client: self.client.clone(),
            base_url: url.clone(),
        });
        self.base_url = url;
        self
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, AuthError> {
        let resp = self.send(Method::GET, path, None).await?;
        into_result(resp).await
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, AuthError> {
        let body = serde_json::to_value(body)?;
        let resp = self.send(Method::POST, path, Some(body)).await?;
        into_result(resp).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), AuthError> {
        let resp = self.send(Method::DELETE, path, None).await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().await?;
        Err(status_to_error(status.as_u16(), &body))
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<reqwest::Response, AuthError> {
        let observed = self.store.access_token();
        let resp = self
            .send_once(method.clone(), path, &body, observed.as_deref())
            .await?;
        if resp.status() != StatusCode::UNAUTHORIZED || observed.is_none() {
            return Ok(resp);
        }
        // One refresh-and-retry cycle per original request; a 401 on the
        // retried request propagates to the caller.
        let renewed = self.refresh_access(observed.as_deref()).await?;
        self.send_once(method, path, &body, Some(&renewed)).await
    }

    async fn send_once(
        &self,
        method: Method,
        path: &str,
        body: &Option<serde_json::Value>,
        bearer: Option<&str>,
    ) -> Result<reqwest::Response, AuthError> {
        let mut req = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = bearer {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(body);
        }
        Ok(req.send().await?)
    }

    /// Single-flight refresh. `observed` is the access token the caller saw
    /// fail; if the stored token has already moved past it, another caller
    /// completed the exchange and we reuse its result.
    async fn refresh_access(&self, observed: Option<&str>) -> Result<String, AuthError> {
        let _gate = self.refresh_gate.lock().await;
        if let Some(current) = self.store.access_token() {
            if Some(current.as_str()) != observed {
                return Ok(current);
            }
        }
        let Some(refresh_token) = self.store.refresh_token() else {
            return Err(AuthError::SessionExpired);
        };
        match self.refresher.refresh(&refresh_token).await {
            Ok(access) => {
                self.store.replace_access_token(access.clone());
                Ok(access)
            }
            Err(err) => {
                tracing::warn!(error = %err, "token refresh failed; clearing session");
                self.store.clear();
                Err(AuthError::SessionExpired)
            }
        }
    }
}

async fn into_result<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, AuthError> {
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        return Err(status_to_error(status.as_u16(), &body));
    }
    serde_json::from_str(&body).map_err(Into::into)
}
