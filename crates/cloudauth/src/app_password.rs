//! App passwords: `mzp_` followed by a client id and a secret key

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

const PREFIX: &str = "mzp_";

/// Credentials for the api-token exchange
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct AppPassword {
    pub client_id: Uuid,
    pub secret_key: Uuid,
}

impl AppPassword {
    /// Parse the textual form
    ///
    /// Both halves are 32 hex digits; dashed UUIDs are accepted as well.
    pub fn parse(password: &str) -> Result<Self> {
        let body = password
            .trim()
            .strip_prefix(PREFIX)
            .ok_or_else(|| Error::InvalidAppPassword(format!("missing `{PREFIX}` prefix")))?;
        let body: String = body.chars().filter(|c| *c != '-').collect();
        if body.len() != 64 || !body.is_ascii() {
            return Err(Error::InvalidAppPassword(format!(
                "expected 64 hex digits after the prefix, found {}",
                body.len()
            )));
        }
        let (client, secret) = body.split_at(32);
        let client_id = Uuid::try_parse(client)
            .map_err(|e| Error::InvalidAppPassword(format!("client id: {e}")))?;
        let secret_key = Uuid::try_parse(secret)
            .map_err(|e| Error::InvalidAppPassword(format!("secret key: {e}")))?;
        Ok(Self {
            client_id,
            secret_key,
        })
    }
}

impl FromStr for AppPassword {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for AppPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{PREFIX}{}{}",
            self.client_id.simple(),
            self.secret_key.simple()
        )
    }
}

impl fmt::Debug for AppPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppPassword")
            .field("client_id", &self.client_id)
            .field("secret_key", &"****")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLIENT: &str = "7ce3c1e8ea854594ad5d785f17d1736f";
    const SECRET: &str = "ad2b0e5be2124d1a8b8e0fd4ea6a7b1c";

    #[test]
    fn test_parse_simple_form() {
        let password = AppPassword::parse(&format!("mzp_{CLIENT}{SECRET}")).unwrap();
        assert_eq!(password.client_id.simple().to_string(), CLIENT);
        assert_eq!(password.secret_key.simple().to_string(), SECRET);
        assert_eq!(password.to_string(), format!("mzp_{CLIENT}{SECRET}"));
    }

    #[test]
    fn test_parse_dashed_form() {
        let dashed = "mzp_7ce3c1e8-ea85-4594-ad5d-785f17d1736fad2b0e5b-e212-4d1a-8b8e-0fd4ea6a7b1c";
        let password: AppPassword = dashed.parse().unwrap();
        assert_eq!(password.client_id.simple().to_string(), CLIENT);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(AppPassword::parse(&format!("{CLIENT}{SECRET}")).is_err());
        assert!(AppPassword::parse("mzp_abc").is_err());
        let not_hex = format!("mzp_{}{SECRET}", "z".repeat(32));
        assert!(matches!(
            AppPassword::parse(&not_hex),
            Err(Error::InvalidAppPassword(_))
        ));
    }

    #[test]
    fn test_debug_hides_secret() {
        let password = AppPassword::parse(&format!("mzp_{CLIENT}{SECRET}")).unwrap();
        let debug = format!("{password:?}");
        assert!(!debug.contains("ad2b0e5b"));
        assert!(debug.contains("****"));
    }
}
