//! Credential-based session issuance against the hosted auth service.

use serde_json::json;
use tracing::{debug, info};

use super::{expect_json, Gateway};
use crate::error::{Error, Result};
use crate::models::Session;

/// Auth-state transitions broadcast to interested listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

impl Gateway {
    /// Registers a new identity. On success the returned session becomes the
    /// gateway's current session and a [`AuthEvent::SignedIn`] is broadcast.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: serde_json::Value,
    ) -> Result<Session> {
        let response = self
            .http()
            .post(self.endpoint("/auth/v1/signup"))
            .header("apikey", self.api_key())
            .json(&json!({
                "email": email,
                "password": password,
                "data": metadata,
            }))
            .send()
            .await?;

        let session: Session = expect_json(response).await?;
        info!(user_id = %session.user.id, "Registered new identity");

        self.store_session(Some(session.clone())).await;
        self.emit(AuthEvent::SignedIn);
        Ok(session)
    }

    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        let response = self
            .http()
            .post(self.endpoint("/auth/v1/token?grant_type=password"))
            .header("apikey", self.api_key())
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        let session: Session = expect_json(response).await?;
        debug!(user_id = %session.user.id, "Signed in");

        self.store_session(Some(session.clone())).await;
        self.emit(AuthEvent::SignedIn);
        Ok(session)
    }

    /// Exchanges the stored refresh token for a fresh session.
    pub async fn refresh_session(&self) -> Result<Session> {
        let refresh_token = self
            .current_session()
            .await
            .map(|s| s.refresh_token)
            .ok_or(Error::NoSession)?;

        let response = self
            .http()
            .post(self.endpoint("/auth/v1/token?grant_type=refresh_token"))
            .header("apikey", self.api_key())
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;

        let session: Session = expect_json(response).await?;
        debug!(user_id = %session.user.id, "Refreshed session token");

        self.store_session(Some(session.clone())).await;
        self.emit(AuthEvent::TokenRefreshed);
        Ok(session)
    }

    /// Revokes the current session. The local session is only cleared when
    /// the service accepts the revocation.
    pub async fn sign_out(&self) -> Result<()> {
        let token = self.bearer().await.ok_or(Error::NoSession)?;

        let response = self
            .http()
            .post(self.endpoint("/auth/v1/logout"))
            .header("apikey", self.api_key())
            .bearer_auth(token)
            .send()
            .await?;

        super::check_status(response).await?;
        info!("Signed out");

        self.store_session(None).await;
        self.emit(AuthEvent::SignedOut);
        Ok(())
    }
}
