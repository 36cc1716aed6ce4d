use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tierguard_core::{Entity, EntityId, IsolationContext};

/// Kind of credential; decides which shape constraints apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialType {
    Password,
    Token,
    ApiKey,
}

impl core::fmt::Display for CredentialType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            CredentialType::Password => "password",
            CredentialType::Token => "token",
            CredentialType::ApiKey => "api_key",
        })
    }
}

/// Credential record (transport-agnostic).
///
/// Secrets are never held in clear: passwords and API keys carry a hash,
/// tokens carry a reference to the issued token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credential {
    pub id: EntityId,
    pub credential_type: CredentialType,

    /// USER-level context of the owning user.
    pub owner: IsolationContext,

    #[serde(skip)]
    pub secret_hash: Option<String>,

    #[serde(skip)]
    pub token_reference: Option<String>,

    pub issued_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    pub fn password(id: EntityId, owner: IsolationContext, secret_hash: impl Into<String>) -> Self {
        Self {
            id,
            credential_type: CredentialType::Password,
            owner,
            secret_hash: Some(secret_hash.into()),
            token_reference: None,
            issued_at: None,
            expires_at: None,
        }
    }

    pub fn token(
        id: EntityId,
        owner: IsolationContext,
        token_reference: impl Into<String>,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            credential_type: CredentialType::Token,
            owner,
            secret_hash: None,
            token_reference: Some(token_reference.into()),
            issued_at: Some(issued_at),
            expires_at: Some(expires_at),
        }
    }

    pub fn api_key(id: EntityId, owner: IsolationContext, secret_hash: impl Into<String>) -> Self {
        Self {
            id,
            credential_type: CredentialType::ApiKey,
            owner,
            secret_hash: Some(secret_hash.into()),
            token_reference: None,
            issued_at: None,
            expires_at: None,
        }
    }

    pub fn expiring_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn has_secret_hash(&self) -> bool {
        self.secret_hash.as_deref().is_some_and(|h| !h.trim().is_empty())
    }

    pub fn has_token_reference(&self) -> bool {
        self.token_reference
            .as_deref()
            .is_some_and(|r| !r.trim().is_empty())
    }
}

impl Entity for Credential {
    type Id = EntityId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,
}

/// Deterministically validate a token's time window at `now`.
///
/// `leeway` widens both ends of the window to absorb clock skew. A missing
/// `issued_at` skips the not-yet-valid check.
pub fn validate_token_window(
    issued_at: Option<DateTime<Utc>>,
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
    leeway: Duration,
) -> Result<(), TokenValidationError> {
    if let Some(issued_at) = issued_at {
        if expires_at <= issued_at {
            return Err(TokenValidationError::InvalidTimeWindow);
        }
        // Overflow past the representable range cannot be before `issued_at`.
        let latest = now.checked_add_signed(leeway);
        if latest.is_some_and(|latest| latest < issued_at) {
            return Err(TokenValidationError::NotYetValid);
        }
    }
    let earliest = now.checked_sub_signed(leeway);
    if earliest.is_some_and(|earliest| earliest >= expires_at) {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}
