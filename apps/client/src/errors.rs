use serde_json::{json, Value};
use thiserror::Error;

/// Client-level error type.
/// Session operations and the gateway return `Result<T, ClientError>`; they
/// clean up local state first and never swallow the failure.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Login or registration rejected. Holds the service detail or a generic fallback.
    #[error("{0}")]
    Credential(String),

    /// The refresh endpoint rejected the token or was unreachable.
    /// The session has already been logged out when this is returned.
    #[error("Token refresh failed: {0}")]
    RefreshFailed(#[source] Box<ClientError>),

    #[error("Not authenticated")]
    Unauthenticated,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Session storage error: {0}")]
    Storage(String),

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
}

impl ClientError {
    /// Stable machine-readable code, for logs and CLI output.
    pub fn code(&self) -> &'static str {
        match self {
            ClientError::Credential(_) => "CREDENTIAL_ERROR",
            ClientError::RefreshFailed(_) => "REFRESH_FAILED",
            ClientError::Unauthenticated => "UNAUTHENTICATED",
            ClientError::Http(_) => "NETWORK_ERROR",
            ClientError::Api { .. } => "API_ERROR",
            ClientError::Parse(_) => "PARSE_ERROR",
            ClientError::Storage(_) => "STORAGE_ERROR",
            ClientError::InvalidHeader(_) => "INVALID_HEADER",
        }
    }

    /// True for errors that leave the caller without a usable session.
    pub fn is_unauthorized(&self) -> bool {
        match self {
            ClientError::RefreshFailed(_) | ClientError::Unauthenticated => true,
            ClientError::Api { status, .. } => *status == 401,
            _ => false,
        }
    }

    /// `{"error": {"code", "message"}}` body printed by the CLI. Session-ending
    /// failures also carry a hint to sign in again.
    pub fn report(&self) -> Value {
        let mut error = json!({
            "code": self.code(),
            "message": self.to_string(),
        });
        if self.is_unauthorized() {
            error["hint"] = json!("run `jobseek login` to start a new session");
        }
        json!({ "error": error })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_failure_is_unauthorized() {
        let err = ClientError::RefreshFailed(Box::new(ClientError::Api {
            status: 401,
            message: "Could not validate credentials".to_string(),
        }));
        assert!(err.is_unauthorized());
        assert_eq!(err.code(), "REFRESH_FAILED");
        assert!(err.to_string().contains("Could not validate credentials"));
    }

    #[test]
    fn test_server_error_is_not_unauthorized() {
        let err = ClientError::Api {
            status: 500,
            message: String::new(),
        };
        assert!(!err.is_unauthorized());
        assert_eq!(err.code(), "API_ERROR");
    }

    #[test]
    fn test_credential_message_displays_verbatim() {
        let err = ClientError::Credential("Incorrect email or password".to_string());
        assert_eq!(err.to_string(), "Incorrect email or password");
    }

    #[test]
    fn test_report_carries_code_and_login_hint() {
        let report = ClientError::RefreshFailed(Box::new(ClientError::Unauthenticated)).report();
        assert_eq!(report["error"]["code"], "REFRESH_FAILED");
        assert!(report["error"]["hint"].as_str().unwrap().contains("jobseek login"));

        let report = ClientError::Credential("Incorrect email or password".to_string()).report();
        assert_eq!(report["error"]["code"], "CREDENTIAL_ERROR");
        assert_eq!(report["error"]["message"], "Incorrect email or password");
        assert!(report["error"].get("hint").is_none());
    }
}
