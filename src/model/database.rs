// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Database models.
//!
//! ```rust,ignore
//! #[database(version = 3, entities(Person, Photo), daos(PersonDao))]
//! pub struct AppDatabase;
//! ```

use crate::{
    declaration::{AnnotationTag, Declaration, QualifiedName, SourceLocation},
    error::{ModelError, UnresolvedReference},
    model::{Lookup, Resolved, predicates}
};

/// A database grouping entities and DAOs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseModel {
    /// Crate-relative path of the declaring struct.
    pub name:     QualifiedName,
    /// Schema version.
    pub version:  u32,
    /// Entities in declaration order.
    pub entities: Vec<QualifiedName>,
    /// DAOs in declaration order.
    pub daos:     Vec<QualifiedName>,
    /// Where the database is declared.
    pub location: Option<SourceLocation>
}

/// Build the model of a database declaration.
///
/// # Errors
///
/// - [`ModelError::Unresolved`] when it lists a deferred entity or DAO
/// - [`ModelError::MalformedDeclaration`] when it lists an unknown,
///   ambiguous or repeated entity or DAO, or declares no entity
pub fn extract_database(
    declaration: &Declaration,
    lookup: &Lookup<'_>
) -> Result<DatabaseModel, ModelError> {
    let name = &declaration.name;
    let location = declaration.location.as_ref();
    let malformed = |reason: String| ModelError::malformed(name, location, reason);

    if let Some((attribute, reason)) = predicates::first_invalid(&declaration.annotations) {
        return Err(malformed(format!("invalid `{attribute}` attribute: {reason}")));
    }

    let Some(spec) = declaration.annotations.iter().find_map(|tag| match tag {
        AnnotationTag::Database(spec) => Some(spec),
        _ => None
    }) else {
        return Err(malformed("missing `#[database(...)]` attribute".to_string()));
    };

    if spec.entities.is_empty() {
        return Err(malformed("a database lists at least one entity".to_string()));
    }

    let entities = resolve_all(name, location, &spec.entities, "entity", |w| lookup.entity(w))?;
    let daos = resolve_all(name, location, &spec.daos, "DAO", |w| lookup.dao(w))?;

    tracing::trace!(database = %name, version = spec.version, "database modeled");

    Ok(DatabaseModel {
        name: name.clone(),
        version: spec.version,
        entities,
        daos,
        location: declaration.location.clone()
    })
}

fn resolve_all<'a>(
    database: &QualifiedName,
    location: Option<&SourceLocation>,
    written: &[String],
    kind: &str,
    resolve: impl Fn(&str) -> Resolved<'a>
) -> Result<Vec<QualifiedName>, ModelError> {
    let malformed = |reason: String| ModelError::malformed(database, location, reason);
    let mut resolved: Vec<QualifiedName> = Vec::with_capacity(written.len());

    for item in written {
        let found = match resolve(item) {
            Resolved::Found(found) => found.clone(),
            Resolved::Deferred => {
                return Err(UnresolvedReference {
                    declaration: database.clone(),
                    reference:   item.clone()
                }
                .into());
            }
            Resolved::Unknown => return Err(malformed(format!("unknown {kind} `{item}`"))),
            Resolved::Ambiguous => {
                return Err(malformed(format!("{kind} name `{item}` is ambiguous")));
            }
        };
        if resolved.contains(&found) {
            return Err(malformed(format!("{kind} `{item}` is listed twice")));
        }
        resolved.push(found);
    }

    Ok(resolved)
}
