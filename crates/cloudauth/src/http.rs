//! Shared HTTP plumbing

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use std::time::Duration;
use ureq::Body;
use ureq::http::Response;

/// An agent that hands non-2xx responses back instead of failing, so their
/// bodies can be surfaced
pub(crate) fn agent(timeout: Duration) -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .http_status_as_error(false)
        .timeout_global(Some(timeout))
        .user_agent(concat!("mzform/", env!("CARGO_PKG_VERSION")))
        .build();
    ureq::Agent::new_with_config(config)
}

/// Body of a 2xx response; anything else becomes `Error::Api` with the body
/// kept verbatim
pub(crate) fn status_result(status: u16, body: String) -> Result<String> {
    if (200..300).contains(&status) {
        Ok(body)
    } else {
        log::debug!("HTTP {status} body: {body}");
        Err(Error::api(status, body))
    }
}

fn read_body(response: &mut Response<Body>) -> Result<String> {
    let status = response.status().as_u16();
    let body = response.body_mut().read_to_string()?;
    status_result(status, body)
}

pub(crate) fn read_json<T: DeserializeOwned>(mut response: Response<Body>) -> Result<T> {
    let body = read_body(&mut response)?;
    Ok(serde_json::from_str(&body)?)
}

pub(crate) fn check(mut response: Response<Body>) -> Result<()> {
    read_body(&mut response).map(drop)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    #[test]
    fn test_success_passes_body_through() {
        assert_eq!(status_result(200, "{}".into()).unwrap(), "{}");
        assert_eq!(status_result(204, String::new()).unwrap(), "");
    }

    #[test]
    fn test_error_body_is_kept_verbatim() {
        let body = r#"{"errors":["Region \"aws/us-east-1\" is already enabled"]}"#;
        match status_result(409, body.to_string()) {
            Err(Error::Api { status, body: kept }) => {
                assert_eq!(status, 409);
                assert_eq!(kept, body);
            }
            other => panic!("expected an API error, got {other:?}"),
        }
    }

    #[test]
    fn test_server_errors_are_retryable() {
        for status in [500, 502, 503, 504] {
            let err = status_result(status, "upstream unavailable".into()).unwrap_err();
            assert_eq!(err.category(), ErrorCategory::Network);
            assert!(err.is_retryable());
        }
    }

    #[test]
    fn test_client_errors_are_not_retryable() {
        for status in [400, 404, 409, 422] {
            let err = status_result(status, String::new()).unwrap_err();
            assert_eq!(err.category(), ErrorCategory::Api);
            assert!(!err.is_retryable());
        }
    }

    #[test]
    fn test_token_endpoint_rejection_is_auth() {
        for status in [400, 401, 403] {
            let err = status_result(status, "bad secret".into())
                .map_err(crate::token::rejected_credentials)
                .unwrap_err();
            assert_eq!(err.category(), ErrorCategory::Auth);
            assert!(err.to_string().contains("bad secret"));
        }
    }
}
