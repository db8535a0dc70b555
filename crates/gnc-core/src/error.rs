use thiserror::Error;

pub type GncResult<T> = Result<T, GncError>;

/// Boxed lower-level cause carried by the wrapping variants.
pub type BoxedCause = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum GncError {
    /// Malformed dataset or claim shape (caller bug, not retryable)
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Bad tunable or primitive argument (zero-length salt, wrong key size, ...)
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("invalid access level: {0} (expected 1, 2 or 3)")]
    InvalidAccessLevel(u8),

    #[error("access level {0} not available in this package")]
    AccessLevelUnavailable(u8),

    /// AEAD tag verification failed. Deliberately carries no detail: a
    /// wrong password and a tampered ciphertext must be indistinguishable.
    #[error("authentication failed: wrong password or corrupted data")]
    Authentication,

    /// A generator found no evidence for the claim and refuses to prove it.
    #[error("claim not satisfied: {0}")]
    ClaimNotSatisfied(String),

    #[error("parameter block overflow: {size} bytes exceeds the {max}-byte limit")]
    ParameterOverflow { size: usize, max: usize },

    /// Proof record or parameter block is structurally unusable
    #[error("malformed proof: {0}")]
    MalformedProof(String),

    #[error("access token expired at {valid_until} (now {now})")]
    TokenExpired { valid_until: u64, now: u64 },

    #[error("encryption failed: {source}")]
    Encryption {
        #[source]
        source: BoxedCause,
    },

    #[error("decryption failed: {source}")]
    Decryption {
        #[source]
        source: BoxedCause,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GncError {
    /// Wrap an unexpected failure raised while building a package.
    pub fn encryption(source: impl Into<BoxedCause>) -> Self {
        GncError::Encryption {
            source: source.into(),
        }
    }

    /// Wrap an unexpected failure raised while opening a package.
    pub fn decryption(source: impl Into<BoxedCause>) -> Self {
        GncError::Decryption {
            source: source.into(),
        }
    }

    /// Short stable identifier, used for error histograms in batch reports.
    pub fn code(&self) -> &'static str {
        match self {
            GncError::InvalidData(_) => "invalid_data",
            GncError::InvalidParameter(_) => "invalid_parameter",
            GncError::InvalidAccessLevel(_) => "invalid_access_level",
            GncError::AccessLevelUnavailable(_) => "access_level_unavailable",
            GncError::Authentication => "authentication",
            GncError::ClaimNotSatisfied(_) => "claim_not_satisfied",
            GncError::ParameterOverflow { .. } => "parameter_overflow",
            GncError::MalformedProof(_) => "malformed",
            GncError::TokenExpired { .. } => "token_expired",
            GncError::Encryption { .. } => "encryption",
            GncError::Decryption { .. } => "decryption",
            GncError::Config(_) => "config",
            GncError::Serialization(_) => "serialization",
            GncError::Io(_) => "io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authentication_message_has_no_detail() {
        let msg = GncError::Authentication.to_string();
        assert_eq!(msg, "authentication failed: wrong password or corrupted data");
    }

    #[test]
    fn test_wrapped_cause_is_exposed_as_source() {
        use std::error::Error;

        let inner = GncError::InvalidParameter("salt must not be empty".into());
        let err = GncError::encryption(inner);

        assert!(err.to_string().starts_with("encryption failed: invalid parameter"));
        assert!(err.source().is_some());
        assert_eq!(err.code(), "encryption");
    }
}
