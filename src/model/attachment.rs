// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Attachment triplets.
//!
//! An entity declared with `#[entity(attachment)]` carries a file-like
//! payload described by three fields:
//!
//! ```rust,ignore
//! #[entity(attachment)]
//! pub struct Photo {
//!     #[primary_key]
//!     pub id: i64,
//!     #[attachment_uri]
//!     pub uri: String,
//!     #[attachment_md5]
//!     pub md5: String,
//!     #[attachment_size]
//!     pub size: i64,
//! }
//! ```
//!
//! | Situation | Outcome |
//! |-----------|---------|
//! | all three roles present once | descriptor built |
//! | a role missing | `MalformedDeclaration` |
//! | a role repeated | warning, first field in declaration order wins |
//! | roles on an entity without `attachment` | warning, roles ignored |

use crate::{
    declaration::{AttachmentRole, QualifiedName, SourceLocation},
    diagnostics::DiagnosticSink,
    error::ModelError,
    model::{FieldModel, returns::is_integer}
};

/// The three fields describing an entity's attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentDescriptor {
    /// Field holding the payload location.
    pub uri:  String,
    /// Field holding the content hash.
    pub md5:  String,
    /// Field holding the payload size.
    pub size: String
}

impl AttachmentDescriptor {
    /// Field name for a role.
    #[must_use]
    pub fn field(&self, role: AttachmentRole) -> &str {
        match role {
            AttachmentRole::Uri => &self.uri,
            AttachmentRole::Md5 => &self.md5,
            AttachmentRole::Size => &self.size
        }
    }
}

/// Build the attachment descriptor of an entity.
///
/// `roles` pairs each role annotation with the index of its field, in
/// declaration order.
///
/// # Errors
///
/// Returns [`ModelError::MalformedDeclaration`] when the entity is declared
/// with an attachment but a role is missing, or the size field is not an
/// integer.
pub fn extract(
    entity: &QualifiedName,
    location: Option<&SourceLocation>,
    declared: bool,
    fields: &[FieldModel],
    roles: &[(AttachmentRole, usize)],
    sink: &dyn DiagnosticSink
) -> Result<Option<AttachmentDescriptor>, ModelError> {
    if !declared {
        if !roles.is_empty() {
            sink.warn(
                &format!(
                    "`{entity}` has attachment fields but is not declared with \
                     `#[entity(attachment)]`; they are ignored"
                ),
                location
            );
        }
        return Ok(None);
    }

    let mut slots: [Option<&FieldModel>; 3] = [None, None, None];
    for &(role, field) in roles {
        let Some(field) = fields.get(field) else {
            continue;
        };
        let slot = slot_of(role);
        if let Some(first) = slots[slot] {
            sink.warn(
                &format!(
                    "`{entity}` declares the {} attachment role on both `{}` and `{}`; \
                     using `{}`",
                    role.label(),
                    first.name,
                    field.name,
                    first.name
                ),
                location
            );
        } else {
            slots[slot] = Some(field);
        }
    }

    let [uri, md5, size] = slots;
    let require = |slot: Option<&FieldModel>, role: AttachmentRole| {
        slot.map(|f| f.name.clone()).ok_or_else(|| {
            ModelError::malformed(
                entity,
                location,
                format!("attachment entity is missing its {} field", role.label())
            )
        })
    };

    let descriptor = AttachmentDescriptor {
        uri:  require(uri, AttachmentRole::Uri)?,
        md5:  require(md5, AttachmentRole::Md5)?,
        size: require(size, AttachmentRole::Size)?
    };

    if descriptor.uri == descriptor.md5
        || descriptor.uri == descriptor.size
        || descriptor.md5 == descriptor.size
    {
        return Err(ModelError::malformed(
            entity,
            location,
            "one field cannot hold two attachment roles"
        ));
    }

    if let Some(size) = size
        && !is_integer(&size.canonical_type())
    {
        return Err(ModelError::malformed(
            entity,
            location,
            format!("attachment size field `{}` must be an integer", size.name)
        ));
    }

    Ok(Some(descriptor))
}

fn slot_of(role: AttachmentRole) -> usize {
    match role {
        AttachmentRole::Uri => 0,
        AttachmentRole::Md5 => 1,
        AttachmentRole::Size => 2
    }
}
