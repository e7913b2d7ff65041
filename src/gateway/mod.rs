//! Client for the hosted data gateway: session issuance, table reads and
//! writes, and per-table change-notification feeds. The wire protocol is
//! owned by the service; this module only speaks its HTTP conventions.

pub mod auth;
pub mod query;
pub mod realtime;

pub use auth::AuthEvent;
pub use query::TableQuery;
pub use realtime::{ChangeEvent, ChangeKind, Subscription};

use reqwest::Response;
use serde::de::DeserializeOwned;
use tokio::sync::{broadcast, RwLock};

use crate::config::GatewayConfig;
use crate::error::{Error, Result};
use crate::models::Session;

pub struct Gateway {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    session: RwLock<Option<Session>>,
    auth_events: broadcast::Sender<AuthEvent>,
}

impl Gateway {
    pub fn new(config: &GatewayConfig) -> Self {
        let (auth_events, _) = broadcast::channel(16);
        Self {
            http: reqwest::Client::new(),
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            session: RwLock::new(None),
            auth_events,
        }
    }

    /// Starts a read or write against a named table, scoped to the current
    /// session's credentials.
    pub fn table<'g>(&'g self, name: &str) -> TableQuery<'g> {
        TableQuery::new(self, name)
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn api_key(&self) -> &str {
        &self.api_key
    }

    pub(crate) async fn bearer(&self) -> Option<String> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|s| s.access_token.clone())
    }

    pub(crate) async fn store_session(&self, session: Option<Session>) {
        *self.session.write().await = session;
    }

    /// Current session, if any. `None` is the valid "signed out" state.
    pub async fn current_session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    /// Registers for sign-in, sign-out and token-refresh events. Dropping
    /// the receiver unsubscribes.
    pub fn on_auth_state_change(&self) -> broadcast::Receiver<AuthEvent> {
        self.auth_events.subscribe()
    }

    pub(crate) fn emit(&self, event: AuthEvent) {
        let _ = self.auth_events.send(event);
    }
}

/// Decodes a JSON response body, mapping non-2xx statuses onto
/// [`Error::Rejected`] with whatever message the service provided.
pub(crate) async fn expect_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let response = check_status(response).await?;
    Ok(response.json().await?)
}

pub(crate) async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(Error::Rejected {
        status: status.as_u16(),
        message: extract_message(&body),
    })
}

/// The service reports errors under a few different keys depending on the
/// endpoint; fall back to the raw body when none match.
fn extract_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["msg", "message", "error_description", "error"] {
            if let Some(message) = value.get(key).and_then(|v| v.as_str()) {
                return message.to_string();
            }
        }
    }
    if body.is_empty() {
        "no error detail provided".to_string()
    } else {
        body.to_string()
    }
}
