// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Error taxonomy of a processing pass.
//!
//! | Error | Raised by | Effect on the pass |
//! |-------|-----------|--------------------|
//! | [`ModelError::MalformedDeclaration`] | model extractor | pass fails, nothing is emitted |
//! | [`UnresolvedReference`] | declaration source | declaration deferred to the next pass |
//! | [`EmissionError`] | emitters | the (target, dialect, DAO) triple fails, siblings proceed |
//! | [`ConfigError`] | option parsing | processor cannot be constructed |
//! | [`SourceError`] | syn declaration source | source file rejected |

use thiserror::Error;

use crate::{
    declaration::{QualifiedName, SourceLocation},
    target::{Dialect, Target}
};

/// A declaration that could not be turned into a model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// The declaration violates a modeling invariant.
    #[error("malformed declaration `{declaration}`: {reason}")]
    MalformedDeclaration {
        /// Offending declaration.
        declaration: QualifiedName,
        /// Missing or invalid annotation, in plain words.
        reason:      String,
        /// Where the declaration lives, when the source knows.
        location:    Option<SourceLocation>
    },

    /// A dependency of the declaration is not resolvable yet.
    #[error(transparent)]
    Unresolved(#[from] UnresolvedReference)
}

impl ModelError {
    /// Shorthand for [`ModelError::MalformedDeclaration`].
    pub fn malformed(
        declaration: &QualifiedName,
        location: Option<&SourceLocation>,
        reason: impl Into<String>
    ) -> Self {
        Self::MalformedDeclaration {
            declaration: declaration.clone(),
            reason:      reason.into(),
            location:    location.cloned()
        }
    }

    /// Source location attached to the error, if any.
    #[must_use]
    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            Self::MalformedDeclaration {
                location, ..
            } => location.as_ref(),
            Self::Unresolved(_) => None
        }
    }

    /// Check whether the error only defers the declaration.
    #[must_use]
    pub fn is_deferral(&self) -> bool {
        matches!(self, Self::Unresolved(_))
    }
}

/// A declaration whose types are not resolvable in the current pass.
///
/// Not an error: the declaration is handed back to the caller for retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("`{declaration}` references `{reference}`, which is not resolvable yet")]
pub struct UnresolvedReference {
    /// Declaration that could not be modeled.
    pub declaration: QualifiedName,
    /// The reference that failed to resolve.
    pub reference:   String
}

/// One failed (target, dialect, subject) generation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "{emitter} emitter failed for `{subject}` on {}: {cause}",
    scope_label(.target, .dialect)
)]
pub struct EmissionError {
    /// Emitter that failed (`implementation`, `replication`, `http`).
    pub emitter: &'static str,
    /// DAO (or database/schema) the unit was generated for.
    pub subject: String,
    /// Target of the attempt.
    pub target:  Target,
    /// Dialect of the attempt, absent for per-target units.
    pub dialect: Option<Dialect>,
    /// Underlying cause.
    #[source]
    pub cause:   EmitCause
}

fn scope_label(target: &Target, dialect: &Option<Dialect>) -> String {
    match dialect {
        Some(dialect) => format!("{}/{}", target.name(), dialect.name()),
        None => target.name().to_string()
    }
}

/// Why an emitter could not produce a unit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmitCause {
    /// A declared name cannot be used as a Rust identifier.
    #[error("`{0}` is not a valid Rust identifier")]
    InvalidIdentifier(String),

    /// A declared type cannot be rendered back into Rust.
    #[error("`{0}` is not a valid Rust type")]
    InvalidType(String),

    /// A passthrough attribute could not be tokenized.
    #[error("attribute `{0}` could not be tokenized")]
    InvalidAttribute(String),

    /// A query names a parameter the operation does not declare.
    #[error("query of `{operation}` references unknown parameter `:{parameter}`")]
    UnknownQueryParameter {
        /// Operation owning the query.
        operation: String,
        /// Unknown parameter name.
        parameter: String
    },

    /// A field type has no column mapping in the dialect.
    #[error("field `{entity}.{field}` of type `{ty}` has no {dialect} column type")]
    UnsupportedColumn {
        /// Entity owning the field.
        entity:  String,
        /// Field name.
        field:   String,
        /// Rendered field type.
        ty:      String,
        /// Dialect name.
        dialect: &'static str
    },

    /// The operation shape cannot be generated.
    #[error("`{operation}`: {reason}")]
    UnsupportedOperation {
        /// Operation name.
        operation: String,
        /// Reason in plain words.
        reason:    String
    }
}

/// Invalid processor options.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The target name is not part of the fixed target table.
    #[error("unsupported target `{0}` (expected one of: jvm, mobile, browser)")]
    UnsupportedTarget(String),

    /// An option value could not be parsed.
    #[error("invalid value `{value}` for option `{key}`")]
    InvalidValue {
        /// Option key.
        key:   String,
        /// Rejected value.
        value: String
    }
}

/// A source file the syn declaration source could not parse.
#[derive(Debug, Error)]
#[error("failed to parse `{path}`: {source}")]
pub struct SourceError {
    /// File path as given to the source.
    pub path:   String,
    /// Underlying syn error.
    #[source]
    pub source: syn::Error
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emission_error_names_subject_and_scope() {
        let err = EmissionError {
            emitter: "implementation",
            subject: "PersonDao".to_string(),
            target:  Target::Jvm,
            dialect: Some(Dialect::Postgres),
            cause:   EmitCause::InvalidIdentifier("Person Dao".to_string())
        };
        let message = err.to_string();
        assert!(message.contains("PersonDao"));
        assert!(message.contains("jvm/postgres"));
        assert!(message.contains("not a valid Rust identifier"));
    }

    #[test]
    fn per_target_scope_omits_dialect() {
        let err = EmissionError {
            emitter: "replication",
            subject: "TagDao".to_string(),
            target:  Target::Browser,
            dialect: None,
            cause:   EmitCause::UnsupportedOperation {
                operation: "purge".to_string(),
                reason:    "no table".to_string()
            }
        };
        assert!(err.to_string().contains("on browser:"));
    }

    #[test]
    fn unresolved_is_deferral() {
        let err: ModelError = UnresolvedReference {
            declaration: QualifiedName::new("PersonDao"),
            reference:   "_".to_string()
        }
        .into();
        assert!(err.is_deferral());
        assert!(err.location().is_none());
    }

    #[test]
    fn malformed_keeps_location() {
        let location = SourceLocation::new("lib.rs", Some(4));
        let err = ModelError::malformed(
            &QualifiedName::new("Person"),
            Some(&location),
            "missing size attachment field"
        );
        assert!(!err.is_deferral());
        assert_eq!(err.location(), Some(&location));
        assert!(err.to_string().contains("missing size attachment field"));
    }
}
