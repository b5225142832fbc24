// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Declaration vocabulary shared by every declaration source.
//!
//! The processor never looks at a compiler's symbol table directly. A
//! [`DeclarationSource`] hands out [`Declaration`]s, their ordered
//! [`Member`]s and the [`AnnotationTag`]s attached to each member. The
//! syn-based [`SynSource`](crate::source::SynSource) is one such source;
//! build integrations may provide their own.
//!
//! ```text
//! Declaration (entity | dao | database)
//! ├── annotations: Vec<AnnotationTag>
//! └── members (via DeclarationSource::members)
//!     ├── Member::Field  { ty: TypeRef }
//!     └── Member::Method { MethodSignature }
//!         └── params: Vec<Param { name, ty, annotations }>
//! ```

use std::fmt;

use crate::{error::UnresolvedReference, target::Dialect};

/// Capability that supplies declaration metadata to the processor.
pub trait DeclarationSource {
    /// All annotated declarations of the compilation pass, in source order.
    fn declarations(&self) -> Vec<Declaration>;

    /// Ordered members of a declaration.
    ///
    /// # Errors
    ///
    /// Returns [`UnresolvedReference`] when a member type cannot be resolved
    /// in this pass; the declaration is then deferred.
    fn members(&self, declaration: &Declaration) -> Result<Vec<Member>, UnresolvedReference>;

    /// Annotations attached to a member, in declaration order.
    fn annotations_of(&self, member: &Member) -> Vec<AnnotationTag>;
}

/// Opaque handle a source uses to find a declaration again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeclarationId(pub usize);

/// Crate-relative path of a declaration (e.g. `models::Person`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualifiedName(String);

impl QualifiedName {
    /// Create a qualified name from a `::`-separated path.
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Last path segment.
    #[must_use]
    pub fn simple(&self) -> &str {
        self.0.rsplit("::").next().unwrap_or(&self.0)
    }

    /// Full path.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// File and line of a declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    /// File path as known to the source.
    pub file: String,
    /// 1-based line, when available.
    pub line: Option<usize>
}

impl SourceLocation {
    /// Create a location.
    pub fn new(file: impl Into<String>, line: Option<usize>) -> Self {
        Self {
            file: file.into(),
            line
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}", self.file, line),
            None => f.write_str(&self.file)
        }
    }
}

/// What a declaration declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclarationKind {
    /// A persisted record type.
    Entity,
    /// A data-access-object trait.
    Dao,
    /// A database grouping entities and DAOs.
    Database
}

/// One annotated declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    /// Source-specific handle.
    pub id:          DeclarationId,
    /// Declaration kind.
    pub kind:        DeclarationKind,
    /// Crate-relative path.
    pub name:        QualifiedName,
    /// Declaration-level annotations.
    pub annotations: Vec<AnnotationTag>,
    /// Where the declaration lives.
    pub location:    Option<SourceLocation>
}

/// One member of a declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    /// Declaration owning the member.
    pub owner:    DeclarationId,
    /// Position among the owner's members.
    pub index:    usize,
    /// Member name.
    pub name:     String,
    /// Field or method.
    pub kind:     MemberKind,
    /// Where the member lives.
    pub location: Option<SourceLocation>
}

/// Field or method payload of a [`Member`].
#[derive(Debug, Clone, PartialEq)]
pub enum MemberKind {
    /// A struct field.
    Field {
        /// Declared field type.
        ty: TypeRef
    },
    /// A trait method.
    Method(MethodSignature)
}

/// Signature of a declared method.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodSignature {
    /// Whether the method takes `&self`.
    pub receiver: bool,
    /// Typed parameters, receiver excluded.
    pub params:   Vec<Param>,
    /// Declared return type, `None` for `()`.
    pub returns:  Option<TypeRef>,
    /// Declared `async`.
    pub is_async: bool,
    /// Whether the method carries a default body.
    pub has_body: bool
}

/// One method parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// Binding name.
    pub name:        String,
    /// Declared type.
    pub ty:          TypeRef,
    /// Parameter-level annotations.
    pub annotations: Vec<AnnotationTag>
}

/// Structural description of a type.
///
/// `name` is the path as written (`Vec`, `std::vec::Vec`, `crate::Person`).
/// Slices use the name `[]` with one argument, the unit type is `()`, and
/// shapes without a structured form keep their rendered text as `name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeRef {
    /// Path or rendered text.
    pub name:      String,
    /// Generic arguments.
    pub args:      Vec<TypeArg>,
    /// Whether values may be absent (set by normalization).
    pub nullable:  bool,
    /// Shared reference (`&T`).
    pub reference: bool
}

/// Use-site projection of a generic argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeArg {
    /// Plain argument.
    Invariant(TypeRef),
    /// Covariant use-site projection (producer only).
    Covariant(TypeRef),
    /// Contravariant use-site projection (consumer only).
    Contravariant(TypeRef),
    /// Unknown argument.
    Star
}

impl TypeArg {
    /// Projected type, `None` for [`TypeArg::Star`].
    #[must_use]
    pub fn ty(&self) -> Option<&TypeRef> {
        match self {
            Self::Invariant(ty) | Self::Covariant(ty) | Self::Contravariant(ty) => Some(ty),
            Self::Star => None
        }
    }
}

impl TypeRef {
    /// Type with the given path and no arguments.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name:      name.into(),
            args:      Vec::new(),
            nullable:  false,
            reference: false
        }
    }

    /// The unit type.
    #[must_use]
    pub fn unit() -> Self {
        Self::named("()")
    }

    /// Generic type with invariant arguments.
    pub fn generic(name: impl Into<String>, args: impl IntoIterator<Item = TypeRef>) -> Self {
        Self {
            args: args.into_iter().map(TypeArg::Invariant).collect(),
            ..Self::named(name)
        }
    }

    /// Slice `[T]`.
    #[must_use]
    pub fn slice(element: TypeRef) -> Self {
        Self::generic("[]", [element])
    }

    /// Same type behind a shared reference.
    #[must_use]
    pub fn by_ref(mut self) -> Self {
        self.reference = true;
        self
    }

    /// Same type marked nullable.
    #[must_use]
    pub fn or_null(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Last path segment of the name.
    #[must_use]
    pub fn simple_name(&self) -> &str {
        self.name.rsplit("::").next().unwrap_or(&self.name)
    }

    /// Check for `()`.
    #[must_use]
    pub fn is_unit(&self) -> bool {
        self.name == "()" && !self.nullable
    }

    /// Check for `[T]`.
    #[must_use]
    pub fn is_slice(&self) -> bool {
        self.name == "[]"
    }

    /// First argument's type, if any.
    #[must_use]
    pub fn first_arg(&self) -> Option<&TypeRef> {
        self.args.first().and_then(TypeArg::ty)
    }

    /// Element type of `Vec<T>` or `[T]`.
    #[must_use]
    pub fn element(&self) -> Option<&TypeRef> {
        if (self.is_slice() || self.simple_name() == "Vec") && self.args.len() == 1 {
            self.first_arg()
        } else {
            None
        }
    }

    /// Render as Rust source text.
    #[must_use]
    pub fn render(&self) -> String {
        let args: Vec<String> = self
            .args
            .iter()
            .map(|arg| arg.ty().map_or_else(|| "_".to_string(), TypeRef::render))
            .collect();

        let base = if self.is_slice() {
            format!("[{}]", args.join(", "))
        } else if args.is_empty() {
            self.name.clone()
        } else {
            format!("{}<{}>", self.name, args.join(", "))
        };

        let base = if self.reference {
            format!("&{base}")
        } else {
            base
        };

        if self.nullable {
            format!("Option<{base}>")
        } else {
            base
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Role of a field inside an attachment triplet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentRole {
    /// Location of the payload.
    Uri,
    /// Content hash of the payload.
    Md5,
    /// Payload size in bytes.
    Size
}

impl AttachmentRole {
    /// All roles in descriptor order.
    pub const ALL: [Self; 3] = [Self::Uri, Self::Md5, Self::Size];

    /// Human readable role name.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Uri => "uri",
            Self::Md5 => "content-hash",
            Self::Size => "size"
        }
    }
}

/// Index declared on an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    /// Explicit name, empty for a generated one.
    pub name:    String,
    /// Column names in declaration order.
    pub columns: Vec<String>,
    /// Unique index.
    pub unique:  bool
}

/// Database grouping declared on a struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSpec {
    /// Schema version.
    pub version:  u32,
    /// Entity names, in declaration order.
    pub entities: Vec<String>,
    /// DAO names, in declaration order.
    pub daos:     Vec<String>
}

/// Recognized annotation, already lifted out of the host syntax.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationTag {
    /// Marks a persisted entity.
    Entity {
        /// Explicit table name.
        table: Option<String>
    },
    /// Marks an entity carrying an attachment triplet.
    WithAttachment,
    /// Declares an index on the entity.
    Index(IndexSpec),
    /// Marks the primary key field.
    PrimaryKey {
        /// Key is generated by the database.
        auto_generate: bool
    },
    /// Marks a field as one slot of the attachment triplet.
    Attachment(AttachmentRole),
    /// Marks a data-access-object trait.
    Dao,
    /// Declares a database.
    Database(DatabaseSpec),
    /// Dialect-neutral query.
    Query(String),
    /// Query replacing the neutral one for a single dialect.
    DialectQuery {
        /// Dialect the query applies to.
        dialect: Dialect,
        /// SQL text.
        sql:     String
    },
    /// Insert operation.
    Insert {
        /// Replace rows with the same primary key.
        replace: bool
    },
    /// Update operation.
    Update,
    /// Delete operation.
    Delete,
    /// Parameter receives the database-type discriminator.
    DbType,
    /// Attribute copied verbatim into generated code.
    Passthrough(String),
    /// Recognized attribute with invalid arguments.
    Invalid {
        /// Attribute name.
        attribute: String,
        /// Parser message.
        reason:    String
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualified_name_simple_segment() {
        assert_eq!(QualifiedName::new("models::Person").simple(), "Person");
        assert_eq!(QualifiedName::new("Person").simple(), "Person");
    }

    #[test]
    fn render_nested_generics() {
        let ty = TypeRef::generic("Vec", [TypeRef::named("Person")]);
        assert_eq!(ty.render(), "Vec<Person>");
        assert_eq!(ty.element(), Some(&TypeRef::named("Person")));
    }

    #[test]
    fn render_reference_slice_and_nullable() {
        let slice = TypeRef::slice(TypeRef::named("Person")).by_ref();
        assert_eq!(slice.render(), "&[Person]");
        assert!(slice.element().is_some());

        let nullable = TypeRef::named("str").by_ref().or_null();
        assert_eq!(nullable.render(), "Option<&str>");
    }

    #[test]
    fn render_star_argument() {
        let ty = TypeRef {
            args: vec![TypeArg::Star],
            ..TypeRef::named("Continuation")
        };
        assert_eq!(ty.render(), "Continuation<_>");
    }

    #[test]
    fn location_display() {
        assert_eq!(SourceLocation::new("lib.rs", Some(3)).to_string(), "lib.rs:3");
        assert_eq!(SourceLocation::new("lib.rs", None).to_string(), "lib.rs");
    }

    #[test]
    fn unit_type() {
        assert!(TypeRef::unit().is_unit());
        assert!(!TypeRef::unit().or_null().is_unit());
    }
}
