//! Structural error model.

use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::id::IdentityKind;
use crate::isolation::IsolationLevel;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Tag of a [`DomainError`], for callers that dispatch on the category only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidIdentifier,
    MalformedIsolationContext,
    MalformedDataAccessContext,
    MissingField,
}

/// Caller-supplied data that violates a structural invariant.
///
/// These are never business outcomes: a policy decision that hits one of
/// these is reported as indeterminate, not denied. Business-rule failures are
/// ordinary verdict values and do not go through this type.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// An identifier was empty or malformed.
    #[error("invalid {kind} identifier '{value}': {reason}")]
    InvalidIdentifier {
        kind: IdentityKind,
        value: String,
        reason: String,
    },

    /// An isolation context does not carry exactly the identifiers its level requires.
    #[error("malformed {level} isolation context: {reason}")]
    MalformedIsolationContext {
        level: IsolationLevel,
        reason: String,
    },

    /// A data access context has inconsistent sharing settings.
    #[error("malformed data access context: {reason}")]
    MalformedDataAccessContext { reason: String },

    /// A required field of a rule context was not supplied.
    #[error("{context} is missing required field '{field}'")]
    MissingField {
        context: &'static str,
        field: &'static str,
    },
}

impl DomainError {
    pub fn invalid_identifier(
        kind: IdentityKind,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidIdentifier {
            kind,
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn malformed_context(level: IsolationLevel, reason: impl Into<String>) -> Self {
        Self::MalformedIsolationContext {
            level,
            reason: reason.into(),
        }
    }

    pub fn malformed_access(reason: impl Into<String>) -> Self {
        Self::MalformedDataAccessContext {
            reason: reason.into(),
        }
    }

    pub fn missing_field(context: &'static str, field: &'static str) -> Self {
        Self::MissingField { context, field }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidIdentifier { .. } => ErrorKind::InvalidIdentifier,
            Self::MalformedIsolationContext { .. } => ErrorKind::MalformedIsolationContext,
            Self::MalformedDataAccessContext { .. } => ErrorKind::MalformedDataAccessContext,
            Self::MissingField { .. } => ErrorKind::MissingField,
        }
    }

    /// Structured payload of the error, suitable for audit traces.
    pub fn details(&self) -> serde_json::Value {
        match self {
            Self::InvalidIdentifier {
                kind,
                value,
                reason,
            } => json!({ "kind": self.kind(), "identity": kind, "value": value, "reason": reason }),
            Self::MalformedIsolationContext { level, reason } => {
                json!({ "kind": self.kind(), "level": level, "reason": reason })
            }
            Self::MalformedDataAccessContext { reason } => {
                json!({ "kind": self.kind(), "reason": reason })
            }
            Self::MissingField { context, field } => {
                json!({ "kind": self.kind(), "context": context, "field": field })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_tags_follow_variants() {
        let err = DomainError::missing_field("credential", "secret_hash");
        assert_eq!(err.kind(), ErrorKind::MissingField);
        assert_eq!(err.to_string(), "credential is missing required field 'secret_hash'");

        let err =
            DomainError::malformed_context(IsolationLevel::Department, "missing organization_id");
        assert_eq!(err.kind(), ErrorKind::MalformedIsolationContext);
    }

    #[test]
    fn details_carry_structured_payload() {
        let err = DomainError::invalid_identifier(IdentityKind::Tenant, "", "empty value");
        let details = err.details();
        assert_eq!(details["kind"], "invalid_identifier");
        assert_eq!(details["identity"], "tenant");
        assert_eq!(details["reason"], "empty value");
    }
}
