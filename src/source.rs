// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Declaration source backed by parsed Rust files.
//!
//! [`SynSource`] walks parsed files (inline `mod` blocks included) and
//! exposes every `#[entity]` / `#[database]` struct and `#[dao]` trait as a
//! [`Declaration`].
//!
//! ```rust,ignore
//! let mut source = SynSource::new();
//! source.add("src/models.rs", "models", &std::fs::read_to_string("src/models.rs")?)?;
//! let outcome = Processor::new(options, TracingSink).process(&source);
//! ```
//!
//! # Types
//!
//! Member types are converted structurally. A type containing `_` or a macro
//! invocation cannot be known before expansion, so the owning declaration
//! reports an [`UnresolvedReference`] and is deferred.

mod attrs;
pub(crate) mod types;

use proc_macro2::Span;
use syn::{FnArg, Pat, ReturnType, TraitItem};

use crate::{
    declaration::{
        AnnotationTag, Declaration, DeclarationId, DeclarationKind, DeclarationSource, Member,
        MemberKind, MethodSignature, Param, QualifiedName, SourceLocation
    },
    error::{SourceError, UnresolvedReference}
};

/// Declarations collected from parsed Rust source.
#[derive(Default)]
pub struct SynSource {
    entries: Vec<Entry>
}

struct Entry {
    declaration: Declaration,
    item:        Item
}

enum Item {
    Struct(syn::ItemStruct),
    Trait(syn::ItemTrait)
}

impl SynSource {
    /// Empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Source holding a single file.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when `code` is not valid Rust.
    pub fn parse(file: &str, module: &str, code: &str) -> Result<Self, SourceError> {
        let mut source = Self::new();
        source.add(file, module, code)?;
        Ok(source)
    }

    /// Parse a file and collect its declarations.
    ///
    /// `module` is the crate-relative module path of the file (`""` for the
    /// crate root).
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when `code` is not valid Rust.
    pub fn add(&mut self, file: &str, module: &str, code: &str) -> Result<(), SourceError> {
        let parsed = syn::parse_file(code).map_err(|source| SourceError {
            path: file.to_string(),
            source
        })?;
        let before = self.entries.len();
        self.collect(file, module, parsed.items);
        tracing::debug!(file, declarations = self.entries.len() - before, "source file collected");
        Ok(())
    }

    /// Number of collected declarations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether nothing was collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn collect(&mut self, file: &str, module: &str, items: Vec<syn::Item>) {
        for item in items {
            match item {
                syn::Item::Struct(item) => {
                    let Some((kind, attribute)) = attrs::declaration_kind(&item.attrs) else {
                        continue;
                    };
                    let mut annotations = attrs::declaration_tags(&item.attrs);
                    if kind == DeclarationKind::Dao {
                        annotations.push(misplaced(attribute, "traits"));
                    }
                    if kind == DeclarationKind::Entity
                        && !matches!(item.fields, syn::Fields::Named(_))
                    {
                        annotations.push(AnnotationTag::Invalid {
                            attribute: attribute.to_string(),
                            reason:    "entities need named fields".to_string()
                        });
                    }
                    if !item.generics.params.is_empty() {
                        annotations.push(generic(attribute));
                    }
                    let name = qualify(module, &item.ident);
                    let location = location(file, item.ident.span());
                    self.push(kind, name, annotations, location, Item::Struct(item));
                }
                syn::Item::Trait(item) => {
                    let Some((kind, attribute)) = attrs::declaration_kind(&item.attrs) else {
                        continue;
                    };
                    let mut annotations = attrs::declaration_tags(&item.attrs);
                    if kind != DeclarationKind::Dao {
                        annotations.push(misplaced(attribute, "structs"));
                    }
                    if !item.generics.params.is_empty() {
                        annotations.push(generic(attribute));
                    }
                    let name = qualify(module, &item.ident);
                    let location = location(file, item.ident.span());
                    self.push(kind, name, annotations, location, Item::Trait(item));
                }
                syn::Item::Mod(item) => {
                    if let Some((_, content)) = item.content {
                        let nested = qualify(module, &item.ident);
                        self.collect(file, nested.as_str(), content);
                    }
                }
                _ => {}
            }
        }
    }

    fn push(
        &mut self,
        kind: DeclarationKind,
        name: QualifiedName,
        annotations: Vec<AnnotationTag>,
        location: SourceLocation,
        item: Item
    ) {
        let declaration = Declaration {
            id: DeclarationId(self.entries.len()),
            kind,
            name,
            annotations,
            location: Some(location)
        };
        self.entries.push(Entry {
            declaration,
            item
        });
    }

    fn entry(&self, id: DeclarationId) -> Option<&Entry> {
        self.entries.get(id.0)
    }
}

impl DeclarationSource for SynSource {
    fn declarations(&self) -> Vec<Declaration> {
        self.entries.iter().map(|entry| entry.declaration.clone()).collect()
    }

    fn members(&self, declaration: &Declaration) -> Result<Vec<Member>, UnresolvedReference> {
        let Some(entry) = self.entry(declaration.id) else {
            return Ok(Vec::new());
        };
        let file = declaration.location.as_ref().map_or("", |l| l.file.as_str());
        let unresolved = |reference: String| UnresolvedReference {
            declaration: declaration.name.clone(),
            reference
        };

        match &entry.item {
            Item::Struct(item) => {
                let syn::Fields::Named(fields) = &item.fields else {
                    return Ok(Vec::new());
                };
                fields
                    .named
                    .iter()
                    .enumerate()
                    .filter_map(|(index, field)| {
                        field.ident.as_ref().map(|ident| (index, ident, field))
                    })
                    .map(|(index, ident, field)| {
                        Ok(Member {
                            owner: declaration.id,
                            index,
                            name: ident.to_string(),
                            kind: MemberKind::Field {
                                ty: types::type_ref(&field.ty).map_err(unresolved)?
                            },
                            location: Some(location(file, ident.span()))
                        })
                    })
                    .collect()
            }
            Item::Trait(item) => methods(item)
                .enumerate()
                .map(|(index, method)| {
                    Ok(Member {
                        owner: declaration.id,
                        index,
                        name: method.sig.ident.to_string(),
                        kind: MemberKind::Method(signature(method).map_err(unresolved)?),
                        location: Some(location(file, method.sig.ident.span()))
                    })
                })
                .collect()
        }
    }

    fn annotations_of(&self, member: &Member) -> Vec<AnnotationTag> {
        let Some(entry) = self.entry(member.owner) else {
            return Vec::new();
        };
        match &entry.item {
            Item::Struct(item) => item
                .fields
                .iter()
                .nth(member.index)
                .map(|field| attrs::member_tags(&field.attrs))
                .unwrap_or_default(),
            Item::Trait(item) => methods(item)
                .nth(member.index)
                .map(|method| {
                    let mut tags = attrs::member_tags(&method.attrs);
                    if !method.sig.generics.params.is_empty() {
                        tags.push(AnnotationTag::Invalid {
                            attribute: "dao".to_string(),
                            reason:    format!(
                                "generic method `{}` is not supported",
                                method.sig.ident
                            )
                        });
                    }
                    tags
                })
                .unwrap_or_default()
        }
    }
}

fn methods(item: &syn::ItemTrait) -> impl Iterator<Item = &syn::TraitItemFn> {
    item.items.iter().filter_map(|item| match item {
        TraitItem::Fn(method) => Some(method),
        _ => None
    })
}

fn signature(method: &syn::TraitItemFn) -> Result<MethodSignature, String> {
    let sig = &method.sig;
    let receiver = sig.receiver().is_some_and(|r| {
        r.reference.is_some() && r.mutability.is_none() && r.colon_token.is_none()
    });

    let mut params = Vec::with_capacity(sig.inputs.len());
    for (position, input) in sig.inputs.iter().enumerate() {
        let FnArg::Typed(typed) = input else {
            continue;
        };
        let name = match typed.pat.as_ref() {
            Pat::Ident(pat) => pat.ident.to_string(),
            _ => format!("arg{position}")
        };
        params.push(Param {
            name,
            ty: types::type_ref(&typed.ty)?,
            annotations: attrs::param_tags(&typed.attrs)
        });
    }

    let returns = match &sig.output {
        ReturnType::Default => None,
        ReturnType::Type(_, ty) => Some(types::type_ref(ty)?).filter(|ty| !ty.is_unit())
    };

    Ok(MethodSignature {
        receiver,
        params,
        returns,
        is_async: sig.asyncness.is_some(),
        has_body: method.default.is_some()
    })
}

fn qualify(module: &str, ident: &syn::Ident) -> QualifiedName {
    if module.is_empty() {
        QualifiedName::new(ident.to_string())
    } else {
        QualifiedName::new(format!("{module}::{ident}"))
    }
}

fn location(file: &str, span: Span) -> SourceLocation {
    let line = span.start().line;
    SourceLocation::new(file, (line > 0).then_some(line))
}

fn misplaced(attribute: &str, expected: &str) -> AnnotationTag {
    AnnotationTag::Invalid {
        attribute: attribute.to_string(),
        reason:    format!("`#[{attribute}]` applies to {expected}")
    }
}

fn generic(attribute: &str) -> AnnotationTag {
    AnnotationTag::Invalid {
        attribute: attribute.to_string(),
        reason:    "generic declarations are not supported".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::TypeRef;

    const CODE: &str = r#"
        use replikit::Continuation;

        #[entity]
        pub struct Person {
            #[primary_key]
            pub id: i64,
            pub name: Option<String>,
        }

        pub mod nested {
            #[dao]
            pub trait PersonDao {
                #[query("SELECT * FROM Person WHERE id = :id")]
                async fn by_id(&self, id: i64) -> Option<Person>;

                fn helper(&self) {}

                const LIMIT: usize = 3;
            }
        }

        #[database(version = 1, entities(Person), daos(nested::PersonDao))]
        pub struct AppDatabase;

        pub struct Plain;
    "#;

    #[test]
    fn collects_annotated_items() {
        let source = SynSource::parse("lib.rs", "", CODE).unwrap();
        let names: Vec<String> = source
            .declarations()
            .iter()
            .map(|d| d.name.to_string())
            .collect();
        assert_eq!(names, vec!["Person", "nested::PersonDao", "AppDatabase"]);
        assert_eq!(source.len(), 3);
    }

    #[test]
    fn prefixes_module_path() {
        let source = SynSource::parse("db.rs", "db", CODE).unwrap();
        assert_eq!(source.declarations()[1].name.as_str(), "db::nested::PersonDao");
    }

    #[test]
    fn locations_carry_lines() {
        let source = SynSource::parse("lib.rs", "", CODE).unwrap();
        let person = &source.declarations()[0];
        let location = person.location.as_ref().unwrap();
        assert_eq!(location.file, "lib.rs");
        assert_eq!(location.line, Some(5));
    }

    #[test]
    fn struct_members() {
        let source = SynSource::parse("lib.rs", "", CODE).unwrap();
        let person = source.declarations().remove(0);
        let members = source.members(&person).unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(members[1].kind, MemberKind::Field {
            ty: TypeRef::generic("Option", [TypeRef::named("String")])
        });
        assert_eq!(source.annotations_of(&members[0]), vec![AnnotationTag::PrimaryKey {
            auto_generate: false
        }]);
        assert!(source.annotations_of(&members[1]).is_empty());
    }

    #[test]
    fn trait_members() {
        let source = SynSource::parse("lib.rs", "", CODE).unwrap();
        let dao = source.declarations().remove(1);
        let members = source.members(&dao).unwrap();
        assert_eq!(members.len(), 2);

        let MemberKind::Method(by_id) = &members[0].kind else {
            panic!("expected a method");
        };
        assert!(by_id.receiver);
        assert!(by_id.is_async);
        assert!(!by_id.has_body);
        assert_eq!(by_id.params[0].name, "id");
        assert_eq!(by_id.returns.as_ref().unwrap().name, "Option");

        let MemberKind::Method(helper) = &members[1].kind else {
            panic!("expected a method");
        };
        assert!(helper.has_body);
        assert!(helper.returns.is_none());
        assert!(matches!(
            source.annotations_of(&members[0]).as_slice(),
            [AnnotationTag::Query(sql)] if sql.contains(":id")
        ));
    }

    #[test]
    fn macro_typed_field_is_unresolved() {
        let source = SynSource::parse(
            "lib.rs",
            "",
            "#[entity] pub struct Blob { #[primary_key] id: i64, data: bytes!() }"
        )
        .unwrap();
        let blob = source.declarations().remove(0);
        let err = source.members(&blob).unwrap_err();
        assert_eq!(err.declaration.as_str(), "Blob");
        assert!(err.reference.contains("bytes"));
    }

    #[test]
    fn misplaced_markers_are_invalid() {
        let source = SynSource::parse(
            "lib.rs",
            "",
            "#[dao] pub struct NotATrait; #[entity] pub struct Pair(i64, i64); \
             #[dao] pub trait Generic<T> { fn get(&self) -> T; }"
        )
        .unwrap();
        for declaration in source.declarations() {
            assert!(
                declaration
                    .annotations
                    .iter()
                    .any(|tag| matches!(tag, AnnotationTag::Invalid { .. })),
                "{} should carry an invalid tag",
                declaration.name
            );
        }
    }

    #[test]
    fn generic_method_is_invalid() {
        let source = SynSource::parse(
            "lib.rs",
            "",
            "#[dao] pub trait D { #[query(\"SELECT 1\")] fn one<T>(&self) -> i64; }"
        )
        .unwrap();
        let dao = source.declarations().remove(0);
        let members = source.members(&dao).unwrap();
        assert!(
            source
                .annotations_of(&members[0])
                .iter()
                .any(|tag| matches!(tag, AnnotationTag::Invalid { .. }))
        );
    }

    #[test]
    fn parse_failure_names_file() {
        let Err(err) = SynSource::parse("broken.rs", "", "pub struct {") else {
            panic!("expected a parse error");
        };
        assert!(err.to_string().contains("broken.rs"));
    }

    #[test]
    fn files_accumulate() {
        let mut source = SynSource::new();
        assert!(source.is_empty());
        source.add("a.rs", "a", "#[dao] pub trait A {}").unwrap();
        source.add("b.rs", "b", "#[dao] pub trait B {}").unwrap();
        let declarations = source.declarations();
        assert_eq!(declarations[1].id, DeclarationId(1));
        assert_eq!(declarations[1].name.as_str(), "b::B");
    }
}
