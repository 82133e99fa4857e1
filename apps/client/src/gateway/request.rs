use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde::Serialize;
use uuid::Uuid;

use crate::errors::ClientError;

/// Resends allowed after the first attempt.
pub const MAX_RESENDS: u8 = 1;

/// A request travelling through the gateway.
///
/// `attempt` counts sends already retried: 0 for the original send, 1 once the
/// single post-refresh resend has been scheduled. The body is kept as `Bytes`
/// so the resend reuses it without re-serializing.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub id: Uuid,
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    attempt: u8,
}

impl OutboundRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: None,
            attempt: 0,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ClientError> {
        self.body = Some(Bytes::from(serde_json::to_vec(body)?));
        Ok(self)
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn attempt(&self) -> u8 {
        self.attempt
    }

    /// True once the request has used its single resend.
    pub fn is_retry(&self) -> bool {
        self.attempt >= MAX_RESENDS
    }

    pub(crate) fn mark_retried(&mut self) {
        self.attempt = self.attempt.saturating_add(1);
    }

    /// Sets or clears the bearer header for the given token.
    pub(crate) fn authorize(&mut self, token: Option<&str>) -> Result<(), ClientError> {
        match token {
            Some(token) => {
                let mut value = HeaderValue::from_str(&format!("Bearer {token}"))?;
                value.set_sensitive(true);
                self.headers.insert(AUTHORIZATION, value);
            }
            None => {
                self.headers.remove(AUTHORIZATION);
            }
        }
        Ok(())
    }

    pub(crate) fn bearer(&self) -> Option<&str> {
        self.headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
    }
}
