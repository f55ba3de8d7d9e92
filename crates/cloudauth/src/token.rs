//! Bearer tokens and their refresh threshold

use crate::app_password::AppPassword;
use crate::error::{Error, Result};
use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Share of a token's lifetime after which it is refreshed
pub const REFRESH_FRACTION: f64 = 0.5;

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A bearer credential with absolute validity bounds
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken {
    pub access_token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// `email` claim of the JWT, when present
    pub email: Option<String>,
}

impl AuthToken {
    /// Build a token from an identity provider response received at `issued_at`
    ///
    /// A lifetime that is not positive, or that does not fit a timestamp, is
    /// an invalid response.
    pub fn from_response(response: TokenResponse, issued_at: DateTime<Utc>) -> Result<Self> {
        if response.expires_in <= 0 {
            return Err(Error::InvalidResponse(format!(
                "token lifetime must be positive, got expiresIn {}",
                response.expires_in
            )));
        }
        let expires_at = TimeDelta::try_seconds(response.expires_in)
            .and_then(|lifetime| issued_at.checked_add_signed(lifetime))
            .ok_or_else(|| {
                Error::InvalidResponse(format!(
                    "token lifetime out of range: expiresIn {}",
                    response.expires_in
                ))
            })?;
        let email = decode_email(&response.access_token);
        Ok(Self {
            access_token: response.access_token,
            issued_at,
            expires_at,
            email,
        })
    }

    pub fn lifetime(&self) -> TimeDelta {
        self.expires_at - self.issued_at
    }

    /// Instant from which the token counts as stale
    pub fn refresh_at(&self) -> DateTime<Utc> {
        let millis = self.lifetime().num_milliseconds() as f64 * REFRESH_FRACTION;
        self.issued_at + TimeDelta::milliseconds(millis as i64)
    }

    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        now >= self.refresh_at()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthToken")
            .field("access_token", &"****")
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .field("email", &self.email)
            .finish()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenRequest {
    client_id: String,
    secret: String,
}

/// Body of a successful api-token exchange
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    /// Lifetime in seconds
    pub expires_in: i64,
}

/// Something that can mint a fresh token
pub trait TokenSource: Send + Sync {
    fn fetch(&self) -> Result<TokenResponse>;
}

/// Exchanges an app password at the identity provider
pub struct HttpTokenSource {
    agent: ureq::Agent,
    url: String,
    password: AppPassword,
}

impl HttpTokenSource {
    pub fn new(admin_endpoint: &str, password: AppPassword, timeout: Duration) -> Self {
        Self {
            agent: crate::http::agent(timeout),
            url: format!(
                "{}/identity/resources/auth/v1/api-token",
                admin_endpoint.trim_end_matches('/')
            ),
            password,
        }
    }
}

impl TokenSource for HttpTokenSource {
    fn fetch(&self) -> Result<TokenResponse> {
        log::debug!("Requesting API token from {}", self.url);
        let request = TokenRequest {
            client_id: self.password.client_id.to_string(),
            secret: self.password.secret_key.to_string(),
        };
        let response = self
            .agent
            .post(&self.url)
            .header("Content-Type", "application/json")
            .send_json(&request)?;
        crate::http::read_json(response).map_err(rejected_credentials)
    }
}

/// The identity provider answers bad credentials with 400, 401 or 403
pub(crate) fn rejected_credentials(error: Error) -> Error {
    match error {
        Error::Api { status, body } if matches!(status, 400 | 401 | 403) => Error::auth(body),
        other => other,
    }
}

#[derive(Debug, Deserialize)]
struct Claims {
    email: Option<String>,
}

/// Read the `email` claim without verifying the signature
pub fn decode_email(token: &str) -> Option<String> {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();
    match jsonwebtoken::decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation) {
        Ok(data) => data.claims.email,
        Err(e) => {
            log::debug!("Could not decode token claims: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};
    use jsonwebtoken::{EncodingKey, Header};

    fn response(expires_in: i64) -> TokenResponse {
        TokenResponse {
            access_token: "opaque".into(),
            expires_in,
        }
    }

    fn token(issued_at: DateTime<Utc>, lifetime_secs: i64) -> AuthToken {
        AuthToken::from_response(response(lifetime_secs), issued_at).unwrap()
    }

    #[test]
    fn test_refresh_threshold_is_half_life() {
        let issued = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let token = token(issued, 3600);
        assert_eq!(token.expires_at, issued + TimeDelta::hours(1));
        assert_eq!(token.refresh_at(), issued + TimeDelta::minutes(30));

        assert!(!token.needs_refresh(issued));
        assert!(!token.needs_refresh(issued + TimeDelta::minutes(29)));
        assert!(token.needs_refresh(issued + TimeDelta::minutes(30)));
        assert!(token.needs_refresh(issued + TimeDelta::hours(2)));
        assert!(!token.is_expired(issued + TimeDelta::minutes(59)));
        assert!(token.is_expired(issued + TimeDelta::hours(1)));
    }

    #[test]
    fn test_refresh_threshold_ignores_timezone() {
        let issued = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let token = token(issued, 600);

        // 17:04 at +05:00 is 12:04 UTC, before the 12:05 threshold
        let east = FixedOffset::east_opt(5 * 3600).unwrap();
        let local = east.with_ymd_and_hms(2026, 3, 1, 17, 4, 0).unwrap();
        assert!(!token.needs_refresh(local.with_timezone(&Utc)));

        // 07:05 at -05:00 is 12:05 UTC
        let west = FixedOffset::west_opt(5 * 3600).unwrap();
        let local = west.with_ymd_and_hms(2026, 3, 1, 7, 5, 0).unwrap();
        assert!(token.needs_refresh(local.with_timezone(&Utc)));
    }

    #[test]
    fn test_one_second_lifetime_is_stale_at_half() {
        let issued = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let token = token(issued, 1);
        assert!(!token.needs_refresh(issued));
        assert!(token.needs_refresh(issued + TimeDelta::milliseconds(500)));
    }

    #[test]
    fn test_non_positive_lifetime_is_rejected() {
        let issued = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        for expires_in in [0, -1, i64::MIN] {
            let err = AuthToken::from_response(response(expires_in), issued).unwrap_err();
            assert!(matches!(err, Error::InvalidResponse(_)), "{expires_in}: {err}");
        }
    }

    #[test]
    fn test_overflowing_lifetime_is_rejected() {
        let issued = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        for expires_in in [10_000_000_000_000, i64::MAX] {
            let err = AuthToken::from_response(response(expires_in), issued).unwrap_err();
            assert!(matches!(err, Error::InvalidResponse(_)), "{expires_in}: {err}");
            assert!(!err.is_retryable());
        }
    }

    #[test]
    fn test_rejected_credentials_become_auth_errors() {
        for status in [400, 401, 403] {
            let err = rejected_credentials(Error::api(status, "invalid client credentials"));
            match err {
                Error::Auth { message } => assert_eq!(message, "invalid client credentials"),
                other => panic!("{status}: {other:?}"),
            }
        }
        assert!(matches!(
            rejected_credentials(Error::api(500, "oops")),
            Error::Api { status: 500, .. }
        ));
        assert!(matches!(
            rejected_credentials(Error::api(404, "")),
            Error::Api { status: 404, .. }
        ));
        assert!(matches!(
            rejected_credentials(Error::Http("reset".into())),
            Error::Http(_)
        ));
    }

    #[test]
    fn test_decode_email_claim() {
        #[derive(Serialize)]
        struct TestClaims<'a> {
            email: &'a str,
            sub: &'a str,
            exp: i64,
        }
        let jwt = jsonwebtoken::encode(
            &Header::default(),
            &TestClaims {
                email: "ops@example.com",
                sub: "7ce3c1e8-ea85-4594-ad5d-785f17d1736f",
                exp: 1,
            },
            &EncodingKey::from_secret(b"not-the-real-key"),
        )
        .unwrap();
        assert_eq!(decode_email(&jwt).as_deref(), Some("ops@example.com"));

        let issued = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let token = AuthToken::from_response(
            TokenResponse {
                access_token: jwt,
                expires_in: 60,
            },
            issued,
        )
        .unwrap();
        assert_eq!(token.email.as_deref(), Some("ops@example.com"));
    }

    #[test]
    fn test_decode_email_of_garbage_is_none() {
        assert_eq!(decode_email("not-a-jwt"), None);
    }

    #[test]
    fn test_token_response_shape() {
        let response: TokenResponse =
            serde_json::from_str(r#"{"accessToken":"abc","expiresIn":86400,"refreshToken":"x"}"#)
                .unwrap();
        assert_eq!(response.access_token, "abc");
        assert_eq!(response.expires_in, 86400);
    }

    #[test]
    fn test_debug_hides_access_token() {
        let issued = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let debug = format!("{:?}", token(issued, 60));
        assert!(!debug.contains("opaque"));
    }
}
