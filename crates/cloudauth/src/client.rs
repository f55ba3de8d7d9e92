//! Token cache with proactive, single-flight refresh

use crate::error::{Error, Result};
use crate::token::{AuthToken, Clock, SystemClock, TokenSource};
use std::sync::{Mutex, PoisonError};

/// Hands out a valid bearer token to any number of threads
///
/// The slot lock is held across the staleness check and the refresh, so
/// concurrent callers wait for the one refresh in flight and then share its
/// result.
pub struct AuthClient<S, C = SystemClock> {
    source: S,
    clock: C,
    slot: Mutex<Option<AuthToken>>,
}

impl<S: TokenSource> AuthClient<S> {
    pub fn new(source: S) -> Self {
        Self::with_clock(source, SystemClock)
    }
}

impl<S: TokenSource, C: Clock> AuthClient<S, C> {
    pub fn with_clock(source: S, clock: C) -> Self {
        Self {
            source,
            clock,
            slot: Mutex::new(None),
        }
    }

    /// Current token, acquiring or refreshing it first when stale
    pub fn token(&self) -> Result<AuthToken> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        let now = self.clock.now();
        if let Some(token) = slot.as_ref().filter(|t| !t.needs_refresh(now)) {
            return Ok(token.clone());
        }

        match self.acquire() {
            Ok(token) => {
                *slot = Some(token.clone());
                Ok(token)
            }
            // A failed early refresh may still fall back on an unexpired token
            Err(e) if !e.is_retryable() => Err(e),
            Err(e) => match slot.as_ref().filter(|t| !t.is_expired(self.clock.now())) {
                Some(token) => {
                    log::warn!("Token refresh failed, reusing current token: {e}");
                    Ok(token.clone())
                }
                None => Err(e),
            },
        }
    }

    /// Value for the `Authorization` header
    pub fn bearer(&self) -> Result<String> {
        Ok(format!("Bearer {}", self.token()?.access_token))
    }

    /// Email of the authenticated user
    pub fn email(&self) -> Result<Option<String>> {
        Ok(self.token()?.email)
    }

    /// Drop the cached token; the next call acquires a new one
    pub fn invalidate(&self) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn acquire(&self) -> Result<AuthToken> {
        let issued_at = self.clock.now();
        let response = self.source.fetch()?;
        let token = AuthToken::from_response(response, issued_at)?;
        if token.is_expired(self.clock.now()) {
            return Err(Error::InvalidResponse(format!(
                "token expired at {} before it could be used",
                token.expires_at
            )));
        }
        log::debug!(
            "Acquired API token valid until {}, refresh after {}",
            token.expires_at,
            token.refresh_at()
        );
        Ok(token)
    }
}
