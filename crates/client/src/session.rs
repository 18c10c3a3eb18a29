//! Authenticated session state.
//!
//! A [`Session`] is created by signing in (or from a pre-issued token),
//! passed by reference to every authenticated call, replaced by
//! refreshing, and destroyed by [`Session::sign_out`]. There is no global
//! session; callers own it.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use scribe_core::types::{DbId, Timestamp};

/// The signed-in user as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: DbId,
    pub full_name: String,
    pub email: String,
}

/// Body of a successful login, register or refresh response.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    #[serde(alias = "token")]
    pub access_token: String,
    pub user: UserProfile,
    /// Token lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// A bearer token plus what is known about its owner.
#[derive(Clone)]
pub struct Session {
    token: String,
    user: Option<UserProfile>,
    expires_at: Option<Timestamp>,
}

impl Session {
    /// Wrap a token obtained out of band. The owner is unknown until
    /// validated.
    pub fn from_token(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            user: None,
            expires_at: None,
        }
    }

    /// Build a session from an auth response received at `issued_at`.
    pub fn from_auth_response(response: AuthResponse, issued_at: Timestamp) -> Self {
        let expires_at = response
            .expires_in
            .map(|secs| issued_at + chrono::Duration::seconds(secs));
        Self {
            token: response.access_token,
            user: Some(response.user),
            expires_at,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    pub fn expires_at(&self) -> Option<Timestamp> {
        self.expires_at
    }

    /// Record the owner after a successful token validation.
    pub fn with_user(mut self, user: UserProfile) -> Self {
        self.user = Some(user);
        self
    }

    /// Whether the token's advertised lifetime has run out. A session
    /// without a known expiry is never considered expired here; the
    /// backend's 401 is authoritative.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Utc::now())
    }

    /// End the session. The token is dropped with it.
    pub fn sign_out(self) {
        tracing::info!(
            user_id = self.user.as_ref().map(|u| u.id),
            "Signed out",
        );
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("user", &self.user)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
