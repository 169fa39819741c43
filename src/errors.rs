//! Error types for topology composition

use thiserror::Error;

/// Errors raised while composing a deployment topology.
///
/// Every variant is fatal: composition is all-or-nothing and no template is
/// serialized once an error has been raised.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ComposeError {
    /// Invalid or inconsistent configuration detected before emission
    #[error("invalid configuration for tier '{tier}', field '{field}': {message}")]
    Configuration {
        /// Tier (or component) the offending value belongs to
        tier: String,
        /// Configuration field that failed validation
        field: String,
        /// Human-readable description of the violation
        message: String,
    },

    /// A named output or resource was used before it was registered
    #[error("cannot resolve reference to '{name}': {context}")]
    ReferenceResolution {
        /// Name that failed to resolve
        name: String,
        /// Where the reference was made from
        context: String,
    },

    /// A registry name was declared twice
    #[error("duplicate {kind} '{name}' in topology")]
    DuplicateName {
        /// Registry kind: "parameter", "resource", "output" or "mapping"
        kind: &'static str,
        /// The conflicting logical name
        name: String,
    },

    /// Get-or-create found an existing declaration that does not match
    #[error("'{name}' already declared with a different {kind} definition")]
    DeclarationMismatch {
        /// Registry kind of the conflicting entry
        kind: &'static str,
        /// The logical name being redeclared
        name: String,
    },

    /// Serialization of a resource or template failed
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type for composition operations
pub type ComposeResult<T> = Result<T, ComposeError>;

impl ComposeError {
    /// Shorthand for a [`ComposeError::Configuration`] error.
    pub fn configuration(
        tier: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ComposeError::Configuration {
            tier: tier.into(),
            field: field.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a [`ComposeError::ReferenceResolution`] error.
    pub fn unresolved(name: impl Into<String>, context: impl Into<String>) -> Self {
        ComposeError::ReferenceResolution {
            name: name.into(),
            context: context.into(),
        }
    }
}

impl From<serde_json::Error> for ComposeError {
    fn from(err: serde_json::Error) -> Self {
        ComposeError::Serialization(err.to_string())
    }
}
