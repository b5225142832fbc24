// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Index descriptors parsed from `#[entity(index(...))]`.
//!
//! ```rust,ignore
//! #[entity(
//!     table = "people",
//!     index(columns(last_name, first_name)),                 // index_people_last_name_first_name
//!     index(columns(email), unique, name = "people_email")   // named unique index
//! )]
//! pub struct Person { ... }
//! ```
//!
//! Column order is kept exactly as written.

use std::collections::HashSet;

use crate::{
    declaration::{IndexSpec, QualifiedName, SourceLocation},
    error::ModelError,
    model::FieldModel
};

/// One index of an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDescriptor {
    /// Index name, generated when none was declared.
    pub name:    String,
    /// Column names in declaration order.
    pub columns: Vec<String>,
    /// Unique index.
    pub unique:  bool
}

impl IndexDescriptor {
    /// Generated index name.
    ///
    /// Format: `index_{table}_{col1}_{col2}_...`
    #[must_use]
    pub fn default_name(table: &str, columns: &[String]) -> String {
        format!("index_{}_{}", table, columns.join("_"))
    }
}

/// Build index descriptors in declaration order.
///
/// # Errors
///
/// Returns [`ModelError::MalformedDeclaration`] for an index without
/// columns, an index naming a column the entity does not have, a column
/// listed twice or two indices sharing a name.
pub fn extract(
    entity: &QualifiedName,
    location: Option<&SourceLocation>,
    table: &str,
    specs: &[&IndexSpec],
    fields: &[FieldModel]
) -> Result<Vec<IndexDescriptor>, ModelError> {
    let malformed = |reason: String| ModelError::malformed(entity, location, reason);
    let mut names = HashSet::new();
    let mut indices = Vec::with_capacity(specs.len());

    for spec in specs {
        if spec.columns.is_empty() {
            return Err(malformed("index declares no columns".to_string()));
        }

        let mut seen = HashSet::new();
        for column in &spec.columns {
            if !fields.iter().any(|f| f.name == *column || f.column() == column) {
                return Err(malformed(format!("index references unknown column `{column}`")));
            }
            if !seen.insert(column.as_str()) {
                return Err(malformed(format!("index lists column `{column}` twice")));
            }
        }

        let name = if spec.name.is_empty() {
            IndexDescriptor::default_name(table, &spec.columns)
        } else {
            spec.name.clone()
        };
        if !names.insert(name.clone()) {
            return Err(malformed(format!("index name `{name}` is used twice")));
        }

        indices.push(IndexDescriptor {
            name,
            columns: spec.columns.clone(),
            unique: spec.unique
        });
    }

    Ok(indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::TypeRef;

    fn fields(names: &[&str]) -> Vec<FieldModel> {
        names
            .iter()
            .map(|name| FieldModel {
                name:          (*name).to_string(),
                ty:            TypeRef::named("String"),
                nullable:      false,
                primary_key:   false,
                auto_generate: false
            })
            .collect()
    }

    fn spec(name: &str, columns: &[&str], unique: bool) -> IndexSpec {
        IndexSpec {
            name: name.to_string(),
            columns: columns.iter().map(|c| (*c).to_string()).collect(),
            unique
        }
    }

    fn run(specs: &[IndexSpec], fields: &[FieldModel]) -> Result<Vec<IndexDescriptor>, ModelError> {
        let refs: Vec<&IndexSpec> = specs.iter().collect();
        extract(&QualifiedName::new("Person"), None, "people", &refs, fields)
    }

    #[test]
    fn keeps_order_and_uniqueness() {
        let indices = run(
            &[spec("", &["last", "first"], true)],
            &fields(&["id", "first", "last"])
        )
        .unwrap();
        assert_eq!(indices.len(), 1);
        assert_eq!(indices[0].columns, vec!["last", "first"]);
        assert!(indices[0].unique);
        assert_eq!(indices[0].name, "index_people_last_first");
    }

    #[test]
    fn explicit_name_wins() {
        let indices = run(&[spec("by_email", &["email"], false)], &fields(&["email"])).unwrap();
        assert_eq!(indices[0].name, "by_email");
        assert!(!indices[0].unique);
    }

    #[test]
    fn declaration_order_is_preserved() {
        let indices = run(
            &[spec("", &["b"], false), spec("", &["a"], false)],
            &fields(&["a", "b"])
        )
        .unwrap();
        let names: Vec<&str> = indices.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["index_people_b", "index_people_a"]);
    }

    #[test]
    fn unknown_column_is_malformed() {
        let err = run(&[spec("", &["missing"], false)], &fields(&["id"])).unwrap_err();
        assert!(err.to_string().contains("unknown column `missing`"));
    }

    #[test]
    fn empty_columns_are_malformed() {
        assert!(run(&[spec("", &[], false)], &fields(&["id"])).is_err());
    }

    #[test]
    fn duplicate_names_are_malformed() {
        let err = run(
            &[spec("same", &["a"], false), spec("same", &["b"], false)],
            &fields(&["a", "b"])
        )
        .unwrap_err();
        assert!(err.to_string().contains("used twice"));
    }

    #[test]
    fn repeated_column_is_malformed() {
        assert!(run(&[spec("", &["a", "a"], false)], &fields(&["a"])).is_err());
    }
}
