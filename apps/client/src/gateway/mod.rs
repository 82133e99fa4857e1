//! HTTP gateway — the single outbound pipeline for every data call.
//!
//! Each request is intercepted twice: before send the current bearer token is
//! attached, and on response a first 401 triggers one token refresh followed by
//! one resend. Callers never touch the token directly.
//!
//! Concurrent 401s share one in-flight refresh: whoever takes `refresh_guard`
//! first refreshes, the rest see the rotated token generation and just resend.

use std::sync::Arc;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::auth_api::{ME_PATH, REFRESH_PATH};
use crate::errors::ClientError;
use crate::models::auth::UserPayload;
use crate::models::user::User;
use crate::session::SessionStore;
use crate::wire::{api_error, endpoint, read_payload};

pub mod request;

pub use request::OutboundRequest;

pub struct Gateway {
    client: Client,
    base_url: String,
    session: Arc<SessionStore>,
    refresh_guard: Mutex<()>,
}

impl Gateway {
    pub fn new(client: Client, base_url: impl Into<String>, session: Arc<SessionStore>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            session,
            refresh_guard: Mutex::new(()),
        }
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Sends `request` through the retry protocol.
    ///
    /// Any response other than a first 401 is returned unmodified, whatever its
    /// status. After a successful refresh the resend's response is returned
    /// as-is, even if it is another 401.
    pub async fn send(&self, mut request: OutboundRequest) -> Result<Response, ClientError> {
        let (token, generation) = self.session.token_with_generation();
        request.authorize(token.as_deref())?;

        let response = self.dispatch(&request).await?;
        if response.status() != StatusCode::UNAUTHORIZED || request.is_retry() {
            return Ok(response);
        }

        if is_refresh_path(&request.path) {
            warn!(request_id = %request.id, "Refresh endpoint rejected the session");
            if let Err(e) = self.session.logout() {
                warn!("Failed to erase session snapshot: {e}");
            }
            // The session is already gone; an unreadable body only loses the detail.
            let body = response.bytes().await.unwrap_or_default();
            return Err(ClientError::RefreshFailed(Box::new(api_error(
                StatusCode::UNAUTHORIZED,
                &body,
            ))));
        }

        request.mark_retried();
        debug!(
            request_id = %request.id,
            path = %request.path,
            "Received 401, refreshing token before a single resend"
        );
        self.refresh_once(generation).await?;

        // Re-read after the refresh so the resend never carries a stale token.
        let token = self.session.token();
        if token.is_none() {
            warn!(request_id = %request.id, "Session cleared during refresh; resending unauthenticated");
        }
        request.authorize(token.as_deref())?;
        self.dispatch(&request).await
    }

    /// Runs at most one refresh per token generation.
    async fn refresh_once(&self, seen_generation: u64) -> Result<(), ClientError> {
        let _guard = self.refresh_guard.lock().await;

        let (token, generation) = self.session.token_with_generation();
        if generation != seen_generation {
            if token.is_none() {
                return Err(ClientError::RefreshFailed(Box::new(
                    ClientError::Unauthenticated,
                )));
            }
            debug!("Token already rotated by a concurrent request, skipping refresh");
            return Ok(());
        }

        self.session.refresh_token().await
    }

    async fn dispatch(&self, request: &OutboundRequest) -> Result<Response, ClientError> {
        let mut builder = self
            .client
            .request(request.method.clone(), endpoint(&self.base_url, &request.path))
            .headers(request.headers.clone())
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;
        debug!(
            request_id = %request.id,
            method = %request.method,
            path = %request.path,
            attempt = request.attempt(),
            authenticated = request.bearer().is_some(),
            status = response.status().as_u16(),
            "Request completed"
        );
        Ok(response)
    }

    /// Sends `request` and decodes a 2xx body into `T`.
    /// Non-2xx responses become `ClientError::Api`.
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        request: OutboundRequest,
    ) -> Result<T, ClientError> {
        let response = self.send(request).await?;
        read_payload(response).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.send_json(OutboundRequest::get(path)).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(OutboundRequest::post(path).json(body)?).await
    }

    /// Fetches `/auth/me` and replaces the stored user with the answer.
    pub async fn fetch_current_user(&self) -> Result<User, ClientError> {
        let payload: UserPayload = self.get_json(ME_PATH).await?;
        let user = payload.into_user();
        self.session.set_user(user.clone())?;
        Ok(user)
    }
}

fn is_refresh_path(path: &str) -> bool {
    path.split('?').next().map(|p| p.trim_end_matches('/')) == Some(REFRESH_PATH)
}
