// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Predicates over declarations and models.
//!
//! Every "has this annotation" or "is this suspended" check lives here and
//! takes the value it inspects as an explicit argument.

use crate::{
    declaration::{AnnotationTag, TypeRef},
    model::{OperationDescriptor, OperationKind, SuspendStyle},
    utils::sql
};

/// Check for a continuation carrier: `Continuation<T>` with one type argument.
#[must_use]
pub fn is_continuation(ty: &TypeRef) -> bool {
    ty.simple_name() == "Continuation" && ty.args.len() == 1 && ty.first_arg().is_some()
}

/// Attributes copied verbatim into generated code.
///
/// Persistence annotations are never among them.
pub fn passthrough(tags: &[AnnotationTag]) -> impl Iterator<Item = &str> {
    tags.iter().filter_map(|tag| match tag {
        AnnotationTag::Passthrough(text) => Some(text.as_str()),
        _ => None
    })
}

/// First invalid annotation, as `(attribute, reason)`.
#[must_use]
pub fn first_invalid(tags: &[AnnotationTag]) -> Option<(&str, &str)> {
    tags.iter().find_map(|tag| match tag {
        AnnotationTag::Invalid {
            attribute,
            reason
        } => Some((attribute.as_str(), reason.as_str())),
        _ => None
    })
}

/// Check for the database-type discriminator tag.
#[must_use]
pub fn has_db_type(tags: &[AnnotationTag]) -> bool {
    tags.iter().any(|tag| matches!(tag, AnnotationTag::DbType))
}

/// Check whether an operation writes rows.
#[must_use]
pub fn is_mutating(op: &OperationDescriptor) -> bool {
    match &op.kind {
        OperationKind::Write(_) => true,
        OperationKind::Query(query) => sql::classify(&query.sql).is_mutation(),
        OperationKind::Custom => false
    }
}

/// Check whether the operation is generated (abstract with a persistence
/// annotation) rather than inherited from a default body.
#[must_use]
pub fn is_generated(op: &OperationDescriptor) -> bool {
    !matches!(op.kind, OperationKind::Custom)
}

/// Check whether the operation completes through a continuation.
#[must_use]
pub fn is_continuation_style(op: &OperationDescriptor) -> bool {
    matches!(op.modifiers.suspend, SuspendStyle::Continuation { .. })
}

/// Type with the outer reference removed.
#[must_use]
pub fn owned(ty: &TypeRef) -> TypeRef {
    TypeRef {
        reference: false,
        ..ty.clone()
    }
}
