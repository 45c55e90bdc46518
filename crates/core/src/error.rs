//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// What caused a [`DomainError::Conflict`].
///
/// Callers branch on this, never on the conflict message. The ledger swallows
/// `DuplicateKey` on sale re-posts; role writers surface `StaleVersion` to the
/// client for a retry.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConflictKind {
    /// A unique constraint rejected the write.
    DuplicateKey,
    /// An optimistic-concurrency version check failed.
    StaleVersion,
}

impl core::fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::DuplicateKey => f.write_str("duplicate key"),
            Self::StaleVersion => f.write_str("stale version"),
        }
    }
}

/// Domain-level error.
///
/// Deterministic business failures (validation, scope denials, conflicts)
/// plus one catch-all for persistence faults the caller cannot act on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input, wrong-kind reference).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// No credential, or the credential resolves to no usable actor.
    #[error("unauthorized")]
    Unauthorized,

    /// The actor is known but not allowed to do this.
    #[error("{0}")]
    Forbidden(String),

    /// A requested resource was not found, or sits outside the caller's
    /// visibility. The two are conflated on purpose: existence is never
    /// leaked across store boundaries.
    #[error("not found")]
    NotFound,

    /// A conflicting write (unique rejection or stale version).
    #[error("conflict ({kind}): {message}")]
    Conflict { kind: ConflictKind, message: String },

    /// The persistence layer failed in a way no caller can act on
    /// (connection loss, malformed stored row). Surfaces as HTTP 500.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    /// The denial message the scope checks answer with.
    pub fn access_denied() -> Self {
        Self::Forbidden("Access denied".into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    pub fn duplicate_key(msg: impl Into<String>) -> Self {
        Self::Conflict {
            kind: ConflictKind::DuplicateKey,
            message: msg.into(),
        }
    }

    pub fn stale_version(msg: impl Into<String>) -> Self {
        Self::Conflict {
            kind: ConflictKind::StaleVersion,
            message: msg.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// True for conflicts caused by a unique-key rejection.
    pub fn is_duplicate_key(&self) -> bool {
        matches!(
            self,
            Self::Conflict {
                kind: ConflictKind::DuplicateKey,
                ..
            }
        )
    }
}
