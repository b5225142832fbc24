// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Target-independent model of one compilation pass.
//!
//! Built once from the declarations a [`DeclarationSource`] hands out, then
//! read (never mutated) by every emitter.
//!
//! # Extraction Order
//!
//! ```text
//! declarations ──► entities ──► DAOs ──► databases
//!                     │           │          │
//!                     └── deferred names ────┘
//! ```
//!
//! DAOs need the entities their write operations touch, databases need both.
//! A declaration that references a deferred one is deferred as well.
//!
//! Simple names are unique per kind: they name generated modules and files.
//! A later declaration reusing one is malformed.
//!
//! # Submodules
//!
//! - [`entity`] - Entity models and field classification
//! - [`index`] - Index descriptors
//! - [`attachment`] - Attachment triplets
//! - [`dao`] - DAO models and operation descriptors
//! - [`database`] - Database models
//! - [`returns`] - Suspend and return-type normalization
//! - [`predicates`] - Annotation and operation predicates

pub mod attachment;
pub mod dao;
pub mod database;
pub mod entity;
pub mod index;
pub mod predicates;
pub mod returns;

use std::collections::HashSet;

pub use self::{
    attachment::AttachmentDescriptor,
    dao::{
        DaoModel, Modifiers, OperationDescriptor, OperationKind, ParamModel, QuerySpec,
        SuspendStyle, WriteOp, WriteSpec
    },
    database::DatabaseModel,
    entity::{EntityModel, FieldModel},
    index::IndexDescriptor
};
use crate::{
    declaration::{
        Declaration, DeclarationKind, DeclarationSource, QualifiedName, SourceLocation
    },
    diagnostics::DiagnosticSink,
    error::ModelError
};

/// Every model of one pass.
#[derive(Debug, Clone, Default)]
pub struct Model {
    /// Entities in declaration order.
    pub entities:  Vec<EntityModel>,
    /// DAOs in declaration order.
    pub daos:      Vec<DaoModel>,
    /// Databases in declaration order.
    pub databases: Vec<DatabaseModel>
}

impl Model {
    /// Entity by qualified name.
    #[must_use]
    pub fn entity(&self, name: &QualifiedName) -> Option<&EntityModel> {
        self.entities.iter().find(|e| &e.name == name)
    }

    /// DAO by qualified name.
    #[must_use]
    pub fn dao(&self, name: &QualifiedName) -> Option<&DaoModel> {
        self.daos.iter().find(|d| &d.name == name)
    }
}

/// Result of modeling one pass.
#[derive(Debug, Default)]
pub struct Extraction {
    /// Successfully built models.
    pub model:    Model,
    /// Declarations to retry in the next pass.
    pub deferred: Vec<Declaration>,
    /// Malformed declarations, already reported.
    pub errors:   Vec<ModelError>
}

impl Extraction {
    /// Check whether the model can be emitted.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn settle<T>(
        &mut self,
        declaration: &Declaration,
        result: Result<T, ModelError>,
        sink: &dyn DiagnosticSink
    ) -> Option<T> {
        match result {
            Ok(model) => Some(model),
            Err(ModelError::Unresolved(reference)) => {
                tracing::debug!(%reference, "deferring declaration");
                self.deferred.push(declaration.clone());
                None
            }
            Err(err) => {
                sink.error(&err.to_string(), err.location());
                self.errors.push(err);
                None
            }
        }
    }
}

/// Build the model of every declaration the source supplies.
///
/// Malformed declarations are reported to `sink` at error severity;
/// unresolved ones are deferred without a diagnostic.
pub fn extract_all(source: &dyn DeclarationSource, sink: &dyn DiagnosticSink) -> Extraction {
    let declarations = source.declarations();
    let mut extraction = Extraction::default();

    let of_kind = |kind: DeclarationKind| declarations.iter().filter(move |d| d.kind == kind);

    for declaration in of_kind(DeclarationKind::Entity) {
        let result = entity::extract_entity(source, declaration, sink).and_then(|model| {
            let taken = extraction.model.entities.iter().map(|e| &e.name);
            claim_simple_name("entity", &model.name, model.location.as_ref(), taken)?;
            Ok(model)
        });
        if let Some(model) = extraction.settle(declaration, result, sink) {
            extraction.model.entities.push(model);
        }
    }

    for declaration in of_kind(DeclarationKind::Dao) {
        let lookup = Lookup::new(&extraction.model, &extraction.deferred);
        let result = dao::extract_dao(source, declaration, &lookup).and_then(|model| {
            let taken = extraction.model.daos.iter().map(|d| &d.name);
            claim_simple_name("DAO", &model.name, model.location.as_ref(), taken)?;
            Ok(model)
        });
        if let Some(model) = extraction.settle(declaration, result, sink) {
            extraction.model.daos.push(model);
        }
    }

    for declaration in of_kind(DeclarationKind::Database) {
        let lookup = Lookup::new(&extraction.model, &extraction.deferred);
        let result = database::extract_database(declaration, &lookup).and_then(|model| {
            let taken = extraction.model.databases.iter().map(|d| &d.name);
            claim_simple_name("database", &model.name, model.location.as_ref(), taken)?;
            Ok(model)
        });
        if let Some(model) = extraction.settle(declaration, result, sink) {
            extraction.model.databases.push(model);
        }
    }

    tracing::trace!(
        entities = extraction.model.entities.len(),
        daos = extraction.model.daos.len(),
        databases = extraction.model.databases.len(),
        deferred = extraction.deferred.len(),
        errors = extraction.errors.len(),
        "model extracted"
    );

    extraction
}

fn claim_simple_name<'a>(
    kind: &str,
    name: &QualifiedName,
    location: Option<&SourceLocation>,
    mut taken: impl Iterator<Item = &'a QualifiedName>
) -> Result<(), ModelError> {
    match taken.find(|other| other.simple() == name.simple()) {
        Some(other) => Err(ModelError::malformed(
            name,
            location,
            format!(
                "{kind} name `{}` is already used by `{other}`; simple names must be unique",
                name.simple()
            )
        )),
        None => Ok(())
    }
}

/// Outcome of resolving a name written in a declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved<'a> {
    /// Names exactly one modeled declaration.
    Found(&'a QualifiedName),
    /// Names a declaration deferred in this pass.
    Deferred,
    /// Names nothing known.
    Unknown,
    /// Simple name shared by several declarations.
    Ambiguous
}

/// Name resolution over already modeled and deferred declarations.
pub struct Lookup<'a> {
    model:    &'a Model,
    deferred: HashSet<&'a QualifiedName>
}

impl<'a> Lookup<'a> {
    /// Create a lookup.
    pub fn new(model: &'a Model, deferred: &'a [Declaration]) -> Self {
        Self {
            model,
            deferred: deferred.iter().map(|d| &d.name).collect()
        }
    }

    /// Resolve a written entity name (`Person`, `models::Person`,
    /// `crate::models::Person`).
    #[must_use]
    pub fn entity(&self, written: &str) -> Resolved<'a> {
        self.resolve(written, self.model.entities.iter().map(|e| &e.name))
    }

    /// Entity model by resolved name.
    #[must_use]
    pub fn entity_model(&self, name: &QualifiedName) -> Option<&'a EntityModel> {
        self.model.entity(name)
    }

    /// Resolve a written DAO name.
    #[must_use]
    pub fn dao(&self, written: &str) -> Resolved<'a> {
        self.resolve(written, self.model.daos.iter().map(|d| &d.name))
    }

    fn resolve(
        &self,
        written: &str,
        modeled: impl Iterator<Item = &'a QualifiedName>
    ) -> Resolved<'a> {
        let path = written
            .trim_start_matches("::")
            .trim_start_matches("crate::")
            .trim_start_matches("self::");
        let qualified = path.contains("::");
        let matches = |name: &QualifiedName| {
            if qualified {
                name.as_str() == path
            } else {
                name.simple() == path
            }
        };

        let found: Vec<&'a QualifiedName> = modeled.filter(|name| matches(name)).collect();
        match found.as_slice() {
            [single] => Resolved::Found(single),
            [] if self.deferred.iter().any(|name| matches(name)) => Resolved::Deferred,
            [] => Resolved::Unknown,
            _ => Resolved::Ambiguous
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::{DeclarationId, TypeRef};

    fn entity(name: &str) -> EntityModel {
        EntityModel {
            name:       QualifiedName::new(name),
            table:      "t".to_string(),
            fields:     vec![FieldModel {
                name:          "id".to_string(),
                ty:            TypeRef::named("i64"),
                nullable:      false,
                primary_key:   true,
                auto_generate: false
            }],
            indices:    Vec::new(),
            attachment: None,
            location:   None
        }
    }

    #[test]
    fn resolves_simple_and_qualified_names() {
        let model = Model {
            entities: vec![entity("models::Person"), entity("models::Tag")],
            ..Model::default()
        };
        let lookup = Lookup::new(&model, &[]);

        let person = QualifiedName::new("models::Person");
        assert_eq!(lookup.entity("Person"), Resolved::Found(&person));
        assert_eq!(lookup.entity("crate::models::Person"), Resolved::Found(&person));
        assert_eq!(lookup.entity("other::Person"), Resolved::Unknown);
        assert_eq!(lookup.entity("Missing"), Resolved::Unknown);
    }

    #[test]
    fn ambiguous_simple_names() {
        let model = Model {
            entities: vec![entity("a::Person"), entity("b::Person")],
            ..Model::default()
        };
        let lookup = Lookup::new(&model, &[]);
        assert_eq!(lookup.entity("Person"), Resolved::Ambiguous);
        assert!(matches!(lookup.entity("a::Person"), Resolved::Found(_)));
    }

    #[test]
    fn simple_names_are_claimed_once() {
        let taken = [QualifiedName::new("a::Person")];
        let err = claim_simple_name("entity", &QualifiedName::new("b::Person"), None, taken.iter())
            .unwrap_err();
        let ModelError::MalformedDeclaration {
            declaration, ..
        } = &err
        else {
            panic!("expected a malformed declaration, got {err:?}");
        };
        assert_eq!(declaration.as_str(), "b::Person");
        assert!(err.to_string().contains("`a::Person`"));

        let tag = QualifiedName::new("b::Tag");
        assert!(claim_simple_name("entity", &tag, None, taken.iter()).is_ok());
    }

    #[test]
    fn deferred_names_resolve_as_deferred() {
        let model = Model::default();
        let deferred = vec![Declaration {
            id:          DeclarationId(0),
            kind:        DeclarationKind::Entity,
            name:        QualifiedName::new("models::Person"),
            annotations: Vec::new(),
            location:    None
        }];
        let lookup = Lookup::new(&model, &deferred);
        assert_eq!(lookup.entity("Person"), Resolved::Deferred);
    }
}
