//! Wire helpers shared by the auth service and the gateway.
//!
//! The backend wraps every payload in `{success, message, data}`; older routes
//! and test fixtures send the bare payload. Error bodies come as FastAPI
//! `{"detail": ...}`, as an envelope `message`, or as `{"error": {"message"}}`.

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::ClientError;

/// Joins a path onto the configured base URL without doubling slashes.
pub fn endpoint(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Decodes a success body, unwrapping the `{success, message, data}` envelope if present.
pub fn decode_payload<T: DeserializeOwned>(body: &[u8]) -> Result<T, serde_json::Error> {
    let value: Value = serde_json::from_slice(body)?;
    let inner = match value {
        Value::Object(mut map) if map.contains_key("success") && map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    };
    serde_json::from_value(inner)
}

/// Extracts the first human-readable message from an error body.
pub fn extract_error_message(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;

    let message = match value.get("detail") {
        Some(Value::String(detail)) => Some(detail.clone()),
        // FastAPI validation errors: [{"loc": [...], "msg": "...", "type": "..."}]
        Some(Value::Array(items)) => items
            .iter()
            .find_map(|item| item.get("msg").and_then(Value::as_str))
            .map(str::to_string),
        _ => None,
    }
    .or_else(|| match value.get("error") {
        Some(Value::String(error)) => Some(error.clone()),
        Some(error) => error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        None => None,
    })
    .or_else(|| {
        value
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
    });

    message.filter(|m| !m.trim().is_empty())
}

/// Builds an `Api` error from a non-success status and its body.
/// `message` is empty when the body carries no readable detail.
pub fn api_error(status: StatusCode, body: &[u8]) -> ClientError {
    ClientError::Api {
        status: status.as_u16(),
        message: extract_error_message(body).unwrap_or_default(),
    }
}

/// Reads a response into `T`, mapping non-2xx statuses to `ClientError::Api`.
pub async fn read_payload<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    let body = response.bytes().await?;
    if !status.is_success() {
        return Err(api_error(status, &body));
    }
    Ok(decode_payload(&body)?)
}

/// Drains a response, failing on non-2xx. For endpoints whose body is ignored.
pub async fn expect_success(response: Response) -> Result<(), ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.bytes().await?;
    Err(api_error(status, &body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Token {
        access_token: String,
    }

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        assert_eq!(
            endpoint("http://api.local/api/v1/", "/auth/login"),
            "http://api.local/api/v1/auth/login"
        );
        assert_eq!(endpoint("http://api.local", "jobs"), "http://api.local/jobs");
    }

    #[test]
    fn test_decode_enveloped_payload() {
        let body = br#"{"success": true, "message": "Token refreshed successfully", "data": {"access_token": "T2"}}"#;
        let token: Token = decode_payload(body).unwrap();
        assert_eq!(token.access_token, "T2");
    }

    #[test]
    fn test_decode_bare_payload() {
        let token: Token = decode_payload(br#"{"access_token": "T2"}"#).unwrap();
        assert_eq!(token.access_token, "T2");
    }

    #[test]
    fn test_object_with_data_field_but_no_success_is_not_unwrapped() {
        #[derive(Debug, Deserialize)]
        struct Page {
            data: Vec<u32>,
        }
        let page: Page = decode_payload(br#"{"data": [1, 2, 3]}"#).unwrap();
        assert_eq!(page.data, vec![1, 2, 3]);
    }

    #[test]
    fn test_extract_fastapi_detail() {
        assert_eq!(
            extract_error_message(br#"{"detail": "Incorrect email or password"}"#).as_deref(),
            Some("Incorrect email or password")
        );
    }

    #[test]
    fn test_extract_validation_detail() {
        let body = br#"{"detail": [{"loc": ["body", "password"], "msg": "ensure this value has at least 8 characters", "type": "value_error"}]}"#;
        assert_eq!(
            extract_error_message(body).as_deref(),
            Some("ensure this value has at least 8 characters")
        );
    }

    #[test]
    fn test_extract_nested_error_and_envelope_message() {
        assert_eq!(
            extract_error_message(br#"{"error": {"code": "UNAUTHORIZED", "message": "Authentication required"}}"#)
                .as_deref(),
            Some("Authentication required")
        );
        assert_eq!(
            extract_error_message(br#"{"success": false, "message": "Email already registered"}"#)
                .as_deref(),
            Some("Email already registered")
        );
    }

    #[test]
    fn test_extract_nothing_from_unreadable_bodies() {
        assert_eq!(extract_error_message(b"<html>Bad Gateway</html>"), None);
        assert_eq!(extract_error_message(br#"{"detail": ""}"#), None);
        assert_eq!(extract_error_message(br#"{}"#), None);
    }
}
