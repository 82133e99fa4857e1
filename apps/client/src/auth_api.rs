//! Authentication service — the endpoints the session store talks to.
//!
//! These calls never go through the gateway's retry protocol: a 401 from
//! `/auth/refresh` is terminal, and login/register have no token to refresh.
//! Login and register go out without `Authorization` even when a session is
//! held; refresh and logout carry the current bearer token.
//!
//! `SessionStore` holds an `Arc<dyn AuthApi>`; tests swap in scripted backends.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use tracing::debug;

use crate::errors::ClientError;
use crate::models::auth::{AuthPayload, LoginRequest, RegisterRequest, TokenPayload};
use crate::wire::{endpoint, expect_success, read_payload};

pub const LOGIN_PATH: &str = "/auth/login";
pub const REGISTER_PATH: &str = "/auth/register";
pub const REFRESH_PATH: &str = "/auth/refresh";
pub const ME_PATH: &str = "/auth/me";
pub const LOGOUT_PATH: &str = "/auth/logout";

#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<AuthPayload, ClientError>;

    async fn register(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<AuthPayload, ClientError>;

    /// Exchanges the current bearer token for a fresh one.
    async fn refresh(&self, token: &str) -> Result<TokenPayload, ClientError>;

    async fn logout(&self, token: &str) -> Result<(), ClientError>;
}

/// `AuthApi` over the backend's REST endpoints.
#[derive(Clone)]
pub struct HttpAuthApi {
    client: Client,
    base_url: String,
}

impl HttpAuthApi {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .post(endpoint(&self.base_url, path))
            .header(CONTENT_TYPE, "application/json")
    }
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    async fn login(&self, email: &str, password: &str) -> Result<AuthPayload, ClientError> {
        debug!("POST {LOGIN_PATH}");
        let response = self
            .post(LOGIN_PATH)
            .json(&LoginRequest { email, password })
            .send()
            .await?;
        read_payload(response).await
    }

    async fn register(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<AuthPayload, ClientError> {
        debug!("POST {REGISTER_PATH}");
        let response = self
            .post(REGISTER_PATH)
            .json(&RegisterRequest {
                email,
                password,
                name,
            })
            .send()
            .await?;
        read_payload(response).await
    }

    async fn refresh(&self, token: &str) -> Result<TokenPayload, ClientError> {
        debug!("POST {REFRESH_PATH}");
        let response = self
            .post(REFRESH_PATH)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .send()
            .await?;
        read_payload(response).await
    }

    async fn logout(&self, token: &str) -> Result<(), ClientError> {
        debug!("POST {LOGOUT_PATH}");
        let response = self
            .post(LOGOUT_PATH)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .send()
            .await?;
        expect_success(response).await
    }
}
