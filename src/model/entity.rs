// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Entity models.
//!
//! # Field Classification
//!
//! | Annotation | Effect |
//! |------------|--------|
//! | `primary_key` | Marks the single primary key column |
//! | `primary_key(auto_generate)` | Key assigned by the database |
//! | `attachment_uri` / `_md5` / `_size` | One slot of the attachment triplet |
//! | anything else | Ignored |

use crate::{
    declaration::{
        AnnotationTag, AttachmentRole, Declaration, DeclarationSource, IndexSpec, MemberKind,
        QualifiedName, SourceLocation, TypeRef
    },
    diagnostics::DiagnosticSink,
    error::ModelError,
    model::{
        AttachmentDescriptor, IndexDescriptor, attachment, index, predicates,
        returns::{is_integer, normalize}
    },
    utils::naming
};

/// One persisted record type.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityModel {
    /// Crate-relative path.
    pub name:       QualifiedName,
    /// Table name.
    pub table:      String,
    /// Fields in declaration order.
    pub fields:     Vec<FieldModel>,
    /// Indices in declaration order.
    pub indices:    Vec<IndexDescriptor>,
    /// Attachment triplet, for entities declared with one.
    pub attachment: Option<AttachmentDescriptor>,
    /// Where the entity is declared.
    pub location:   Option<SourceLocation>
}

/// One entity field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldModel {
    /// Field name as declared.
    pub name:          String,
    /// Declared type.
    pub ty:            TypeRef,
    /// Whether the column accepts `NULL`.
    pub nullable:      bool,
    /// Primary key column.
    pub primary_key:   bool,
    /// Key assigned by the database.
    pub auto_generate: bool
}

impl FieldModel {
    /// Column name.
    #[must_use]
    pub fn column(&self) -> &str {
        naming::column(&self.name)
    }

    /// Normalized field type.
    #[must_use]
    pub fn canonical_type(&self) -> TypeRef {
        normalize(&self.ty)
    }
}

impl EntityModel {
    /// Primary key field.
    ///
    /// Extraction guarantees exactly one.
    #[must_use]
    pub fn primary_key(&self) -> Option<&FieldModel> {
        self.fields.iter().find(|f| f.primary_key)
    }

    /// Field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldModel> {
        self.fields.iter().find(|f| f.name == name || f.column() == name)
    }

    /// Fields written by a plain insert (auto-generated key excluded).
    pub fn insert_fields(&self) -> impl Iterator<Item = &FieldModel> {
        self.fields.iter().filter(|f| !f.auto_generate)
    }

    /// Fields written by an update (primary key excluded).
    pub fn update_fields(&self) -> impl Iterator<Item = &FieldModel> {
        self.fields.iter().filter(|f| !f.primary_key)
    }
}

/// Build the model of an entity declaration.
///
/// # Errors
///
/// - [`ModelError::Unresolved`] when a field type is not resolvable yet
/// - [`ModelError::MalformedDeclaration`] for an invalid annotation, a
///   missing or repeated primary key, an incomplete attachment triplet or an
///   index naming unknown columns
pub fn extract_entity(
    source: &dyn DeclarationSource,
    declaration: &Declaration,
    sink: &dyn DiagnosticSink
) -> Result<EntityModel, ModelError> {
    let name = &declaration.name;
    let location = declaration.location.as_ref();
    let malformed = |reason: String| ModelError::malformed(name, location, reason);

    if let Some((attribute, reason)) = predicates::first_invalid(&declaration.annotations) {
        return Err(malformed(format!("invalid `{attribute}` attribute: {reason}")));
    }

    let mut table = None;
    let mut with_attachment = false;
    let mut index_specs: Vec<&IndexSpec> = Vec::new();
    for tag in &declaration.annotations {
        match tag {
            AnnotationTag::Entity {
                table: explicit
            } => table = explicit.clone(),
            AnnotationTag::WithAttachment => with_attachment = true,
            AnnotationTag::Index(spec) => index_specs.push(spec),
            _ => {}
        }
    }
    let table = table.unwrap_or_else(|| name.simple().to_string());

    let members = source.members(declaration)?;
    let mut fields = Vec::with_capacity(members.len());
    let mut roles: Vec<(AttachmentRole, usize)> = Vec::new();

    for member in &members {
        let MemberKind::Field {
            ty
        } = &member.kind
        else {
            return Err(malformed(format!("`{}` is not a field", member.name)));
        };

        let tags = source.annotations_of(member);
        if let Some((attribute, reason)) = predicates::first_invalid(&tags) {
            return Err(malformed(format!(
                "invalid `{attribute}` attribute on `{}`: {reason}",
                member.name
            )));
        }

        let mut field = FieldModel {
            name:          member.name.clone(),
            ty:            ty.clone(),
            nullable:      normalize(ty).nullable,
            primary_key:   false,
            auto_generate: false
        };

        for tag in &tags {
            match tag {
                AnnotationTag::PrimaryKey {
                    auto_generate
                } => {
                    field.primary_key = true;
                    field.auto_generate = *auto_generate;
                }
                AnnotationTag::Attachment(role) => roles.push((*role, fields.len())),
                _ => {}
            }
        }

        fields.push(field);
    }

    let keys: Vec<&FieldModel> = fields.iter().filter(|f| f.primary_key).collect();
    match keys.as_slice() {
        [] => return Err(malformed("no field is marked `primary_key`".to_string())),
        [key] if key.nullable => {
            return Err(malformed(format!("primary key `{}` cannot be nullable", key.name)));
        }
        [key] if key.auto_generate && !is_integer(&key.canonical_type()) => {
            return Err(malformed(format!(
                "auto-generated primary key `{}` must be an integer",
                key.name
            )));
        }
        [_] => {}
        _ => return Err(malformed("more than one field is marked `primary_key`".to_string()))
    }

    let attachment =
        attachment::extract(name, location, with_attachment, &fields, &roles, sink)?;
    let indices = index::extract(name, location, &table, &index_specs, &fields)?;

    tracing::trace!(entity = %name, table, fields = fields.len(), "entity modeled");

    Ok(EntityModel {
        name: name.clone(),
        table,
        fields,
        indices,
        attachment,
        location: declaration.location.clone()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        diagnostics::CollectingSink, error::UnresolvedReference, source::SynSource
    };

    fn extract(code: &str) -> (Result<EntityModel, ModelError>, CollectingSink) {
        let source = SynSource::parse("models.rs", "models", code).unwrap();
        let sink = CollectingSink::new();
        let declaration = source.declarations().remove(0);
        (extract_entity(&source, &declaration, &sink), sink)
    }

    #[test]
    fn plain_entity() {
        let (entity, sink) = extract(
            r#"
            #[entity(table = "people")]
            pub struct Person {
                #[primary_key(auto_generate)]
                pub id: i64,
                pub name: String,
                pub email: Option<String>,
            }
            "#
        );
        let entity = entity.unwrap();
        assert_eq!(entity.name.as_str(), "models::Person");
        assert_eq!(entity.table, "people");
        assert_eq!(entity.fields.len(), 3);
        assert!(entity.fields[2].nullable);
        assert_eq!(entity.primary_key().map(|f| f.name.as_str()), Some("id"));
        assert_eq!(entity.insert_fields().count(), 2);
        assert_eq!(entity.update_fields().count(), 2);
        assert!(entity.attachment.is_none());
        assert!(sink.diagnostics().is_empty());
    }

    #[test]
    fn table_defaults_to_simple_name() {
        let (entity, _) = extract(
            r#"
            #[entity]
            pub struct Tag {
                #[primary_key]
                pub id: String,
            }
            "#
        );
        assert_eq!(entity.unwrap().table, "Tag");
    }

    #[test]
    fn missing_primary_key() {
        let (entity, _) = extract(
            r#"
            #[entity]
            pub struct Tag {
                pub label: String,
            }
            "#
        );
        let err = entity.unwrap_err();
        assert!(err.to_string().contains("primary_key"));
    }

    #[test]
    fn two_primary_keys() {
        let (entity, _) = extract(
            r#"
            #[entity]
            pub struct Tag {
                #[primary_key]
                pub a: i64,
                #[primary_key]
                pub b: i64,
            }
            "#
        );
        assert!(entity.unwrap_err().to_string().contains("more than one"));
    }

    #[test]
    fn auto_generated_text_key_is_rejected() {
        let (entity, _) = extract(
            r#"
            #[entity]
            pub struct Tag {
                #[primary_key(auto_generate)]
                pub id: String,
            }
            "#
        );
        assert!(entity.unwrap_err().to_string().contains("must be an integer"));
    }

    #[test]
    fn unresolved_field_type_defers() {
        let (entity, _) = extract(
            r#"
            #[entity]
            pub struct Tag {
                #[primary_key]
                pub id: i64,
                pub payload: generated_type!(),
            }
            "#
        );
        assert!(matches!(
            entity,
            Err(ModelError::Unresolved(UnresolvedReference { .. }))
        ));
    }

    #[test]
    fn invalid_attribute_is_malformed() {
        let (entity, _) = extract(
            r#"
            #[entity(table = 5)]
            pub struct Tag {
                #[primary_key]
                pub id: i64,
            }
            "#
        );
        let err = entity.unwrap_err();
        assert!(!err.is_deferral());
        assert!(err.location().is_some());
    }
}
