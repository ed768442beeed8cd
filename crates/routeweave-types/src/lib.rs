//! Shared types, errors, step kinds, and identities for the Routeweave tree engine.
//!
//! This crate provides the foundational types used across all other Routeweave crates:
//! - `RouteweaveError`: unified error taxonomy
//! - `StepKind`: the closed set of step node variants
//! - `ExpressionLanguage`: the closed set of expression variants
//! - identity minting for freshly created or regenerated nodes

mod kind;

pub use kind::{ExpressionLanguage, StepCategory, StepKind};

/// Unified error type for all Routeweave subsystems.
#[derive(Debug, thiserror::Error)]
pub enum RouteweaveError {
    // === Factory Errors ===
    #[error("Unknown step kind '{kind}'")]
    UnknownKind { kind: String },

    #[error("Invalid shape for '{kind}': {message}")]
    InvalidShape { kind: String, message: String },

    // === Validation Errors ===
    #[error("Document validation failed: {0}")]
    ValidationError(String),

    // === Serialization Errors ===
    #[error("{format} parse error: {message}")]
    ParseError { format: String, message: String },

    // === Generic ===
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0}")]
    Other(String),
}

impl RouteweaveError {
    /// Returns `true` if a caller can substitute a fallback and keep going.
    ///
    /// An unknown kind only affects the single node being built; the rest of
    /// the document can still load around an opaque placeholder.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, RouteweaveError::UnknownKind { .. })
    }

    /// Returns `true` if the error came from reading or decoding input data.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            RouteweaveError::ParseError { .. }
                | RouteweaveError::Json(_)
                | RouteweaveError::Yaml(_)
                | RouteweaveError::InvalidShape { .. }
        )
    }
}

/// A convenience alias for `Result<T, RouteweaveError>`.
pub type Result<T> = std::result::Result<T, RouteweaveError>;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Mint a fresh identity for a node of the given kind name.
///
/// Identities look like `to-5f0c3e1a9b7d4c2e8f6a1b3c5d7e9f01`.
pub fn mint_identity(kind_name: &str) -> String {
    format!("{kind_name}-{}", uuid::Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_unknown_kind() {
        let err = RouteweaveError::UnknownKind {
            kind: "teleport".into(),
        };
        assert_eq!(err.to_string(), "Unknown step kind 'teleport'");
    }

    #[test]
    fn error_display_invalid_shape() {
        let err = RouteweaveError::InvalidShape {
            kind: "choice".into(),
            message: "expected a map, found a number".into(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid shape for 'choice': expected a map, found a number"
        );
    }

    #[test]
    fn error_display_validation() {
        let err = RouteweaveError::ValidationError("route has no from".into());
        assert_eq!(
            err.to_string(),
            "Document validation failed: route has no from"
        );
    }

    #[test]
    fn error_display_parse_error() {
        let err = RouteweaveError::ParseError {
            format: "YAML".into(),
            message: "unexpected end of stream".into(),
        };
        assert_eq!(err.to_string(), "YAML parse error: unexpected end of stream");
    }

    #[test]
    fn error_display_other() {
        let err = RouteweaveError::Other("something went wrong".into());
        assert_eq!(err.to_string(), "something went wrong");
    }

    // --- classification ---

    #[test]
    fn unknown_kind_is_recoverable() {
        let err = RouteweaveError::UnknownKind { kind: "x".into() };
        assert!(err.is_recoverable());
        assert!(!err.is_input_error());
    }

    #[test]
    fn validation_error_is_not_recoverable() {
        let err = RouteweaveError::ValidationError("bad".into());
        assert!(!err.is_recoverable());
    }

    #[test]
    fn parse_errors_are_input_errors() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        assert!(RouteweaveError::from(json_err).is_input_error());
        let shape = RouteweaveError::InvalidShape {
            kind: "to".into(),
            message: "nope".into(),
        };
        assert!(shape.is_input_error());
    }

    // --- From impls ---

    #[test]
    fn from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: RouteweaveError = io_err.into();
        assert!(matches!(err, RouteweaveError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn from_serde_yaml_error() {
        let yaml_err = serde_yaml::from_str::<serde_yaml::Value>("key: [unclosed").unwrap_err();
        let err: RouteweaveError = yaml_err.into();
        assert!(matches!(err, RouteweaveError::Yaml(_)));
    }

    // --- identity ---

    #[test]
    fn minted_identities_carry_kind_prefix() {
        let id = mint_identity("log");
        assert!(id.starts_with("log-"), "unexpected identity {id}");
        assert_eq!(id.len(), "log-".len() + 32);
    }

    #[test]
    fn minted_identities_are_unique() {
        let ids: std::collections::HashSet<_> = (0..256).map(|_| mint_identity("to")).collect();
        assert_eq!(ids.len(), 256);
    }
}
