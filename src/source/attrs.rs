// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Attribute lifting.
//!
//! Recognized attributes may be written bare (`#[entity]`) or through the
//! runtime crate (`#[replikit::entity]`). Structured arguments are parsed
//! with darling; a parse failure becomes [`AnnotationTag::Invalid`] so the
//! model extractor can report it against the declaration. Attributes this
//! module does not recognize are kept as [`AnnotationTag::Passthrough`].
//!
//! # Declaration Attributes
//!
//! | Attribute | Arguments |
//! |-----------|-----------|
//! | `entity` | `table = "..."`, `attachment`, `index(columns(a, b), unique, name = "...")` |
//! | `dao` | none |
//! | `database` | `version = N`, `entities(A, B)`, `daos(C)` |
//!
//! # Member Attributes
//!
//! | Attribute | Arguments |
//! |-----------|-----------|
//! | `primary_key` | `auto_generate` |
//! | `attachment_uri`, `attachment_md5`, `attachment_size` | none |
//! | `query` | SQL string |
//! | `sqlite_query`, `postgres_query` | SQL string |
//! | `dialect_query` | `dialect = "...", sql = "..."` |
//! | `insert` | `replace` |
//! | `update`, `delete` | none |
//!
//! Parameters recognize `#[db_type]`.

use darling::{FromMeta, util::PathList};
use quote::ToTokens;
use syn::{Attribute, LitStr, Meta};

use crate::{
    declaration::{AnnotationTag, AttachmentRole, DatabaseSpec, DeclarationKind, IndexSpec},
    target::Dialect
};

/// Crate path accepted as attribute prefix.
const RUNTIME_PREFIX: &str = "replikit";

#[derive(Debug, FromMeta)]
struct EntityArgs {
    #[darling(default)]
    table:      Option<String>,
    #[darling(default)]
    attachment: bool,
    #[darling(multiple, rename = "index")]
    indices:    Vec<IndexArgs>
}

#[derive(Debug, FromMeta)]
struct IndexArgs {
    columns: PathList,
    #[darling(default)]
    unique:  bool,
    #[darling(default)]
    name:    Option<String>
}

#[derive(Debug, FromMeta)]
struct DatabaseArgs {
    version:  u32,
    entities: PathList,
    #[darling(default)]
    daos:     PathList
}

#[derive(Debug, Default, FromMeta)]
struct PrimaryKeyArgs {
    #[darling(default)]
    auto_generate: bool
}

#[derive(Debug, Default, FromMeta)]
struct InsertArgs {
    #[darling(default)]
    replace: bool
}

#[derive(Debug, FromMeta)]
struct DialectQueryArgs {
    dialect: Dialect,
    sql:     String
}

/// Recognized attribute name, with the optional runtime prefix removed.
pub fn marker(attr: &Attribute) -> Option<String> {
    let segments = &attr.path().segments;
    match segments.len() {
        1 => Some(segments[0].ident.to_string()),
        2 if segments[0].ident == RUNTIME_PREFIX => Some(segments[1].ident.to_string()),
        _ => None
    }
}

/// Kind declared by the first declaration-level marker.
pub fn declaration_kind(attrs: &[Attribute]) -> Option<(DeclarationKind, &'static str)> {
    attrs
        .iter()
        .filter_map(marker)
        .find_map(|name| match name.as_str() {
            "entity" => Some((DeclarationKind::Entity, "entity")),
            "dao" => Some((DeclarationKind::Dao, "dao")),
            "database" => Some((DeclarationKind::Database, "database")),
            _ => None
        })
}

/// Tags of a struct or trait.
pub fn declaration_tags(attrs: &[Attribute]) -> Vec<AnnotationTag> {
    let mut tags = Vec::with_capacity(attrs.len());
    for attr in attrs {
        match marker(attr).as_deref() {
            Some("entity") => entity(attr, &mut tags),
            Some("dao") => tags.push(word(attr, "dao", AnnotationTag::Dao)),
            Some("database") => tags.push(database(attr)),
            _ => tags.push(passthrough(attr))
        }
    }
    tags
}

/// Tags of a field or method.
pub fn member_tags(attrs: &[Attribute]) -> Vec<AnnotationTag> {
    attrs
        .iter()
        .map(|attr| {
            let Some(name) = marker(attr) else {
                return passthrough(attr);
            };
            match name.as_str() {
                "primary_key" => primary_key(attr),
                "attachment_uri" => {
                    word(attr, &name, AnnotationTag::Attachment(AttachmentRole::Uri))
                }
                "attachment_md5" => {
                    word(attr, &name, AnnotationTag::Attachment(AttachmentRole::Md5))
                }
                "attachment_size" => {
                    word(attr, &name, AnnotationTag::Attachment(AttachmentRole::Size))
                }
                "query" => sql(attr, &name).map_or_else(|tag| tag, AnnotationTag::Query),
                "dialect_query" => dialect_query(attr),
                "insert" => insert(attr),
                "update" => word(attr, &name, AnnotationTag::Update),
                "delete" => word(attr, &name, AnnotationTag::Delete),
                other => match other.strip_suffix("_query").map(Dialect::from_string) {
                    Some(Ok(dialect)) => sql(attr, &name).map_or_else(
                        |tag| tag,
                        |sql| AnnotationTag::DialectQuery {
                            dialect,
                            sql
                        }
                    ),
                    _ => passthrough(attr)
                }
            }
        })
        .collect()
}

/// Tags of a method parameter.
pub fn param_tags(attrs: &[Attribute]) -> Vec<AnnotationTag> {
    attrs
        .iter()
        .map(|attr| match marker(attr).as_deref() {
            Some("db_type") => word(attr, "db_type", AnnotationTag::DbType),
            _ => passthrough(attr)
        })
        .collect()
}

fn entity(attr: &Attribute, tags: &mut Vec<AnnotationTag>) {
    if let Meta::Path(_) = attr.meta {
        tags.push(AnnotationTag::Entity {
            table: None
        });
        return;
    }

    match EntityArgs::from_meta(&attr.meta) {
        Ok(args) => {
            tags.push(AnnotationTag::Entity {
                table: args.table
            });
            if args.attachment {
                tags.push(AnnotationTag::WithAttachment);
            }
            tags.extend(args.indices.into_iter().map(|index| {
                AnnotationTag::Index(IndexSpec {
                    name:    index.name.unwrap_or_default(),
                    columns: index.columns.iter().map(path_text).collect(),
                    unique:  index.unique
                })
            }));
        }
        Err(err) => tags.push(invalid("entity", &err))
    }
}

fn database(attr: &Attribute) -> AnnotationTag {
    match DatabaseArgs::from_meta(&attr.meta) {
        Ok(args) => AnnotationTag::Database(DatabaseSpec {
            version:  args.version,
            entities: args.entities.iter().map(path_text).collect(),
            daos:     args.daos.iter().map(path_text).collect()
        }),
        Err(err) => invalid("database", &err)
    }
}

fn primary_key(attr: &Attribute) -> AnnotationTag {
    let args = match &attr.meta {
        Meta::Path(_) => Ok(PrimaryKeyArgs::default()),
        meta => PrimaryKeyArgs::from_meta(meta)
    };
    match args {
        Ok(args) => AnnotationTag::PrimaryKey {
            auto_generate: args.auto_generate
        },
        Err(err) => invalid("primary_key", &err)
    }
}

fn insert(attr: &Attribute) -> AnnotationTag {
    let args = match &attr.meta {
        Meta::Path(_) => Ok(InsertArgs::default()),
        meta => InsertArgs::from_meta(meta)
    };
    match args {
        Ok(args) => AnnotationTag::Insert {
            replace: args.replace
        },
        Err(err) => invalid("insert", &err)
    }
}

fn dialect_query(attr: &Attribute) -> AnnotationTag {
    match DialectQueryArgs::from_meta(&attr.meta) {
        Ok(args) => AnnotationTag::DialectQuery {
            dialect: args.dialect,
            sql:     args.sql
        },
        Err(err) => invalid("dialect_query", &err)
    }
}

/// SQL text of `#[name("...")]`.
fn sql(attr: &Attribute, name: &str) -> Result<String, AnnotationTag> {
    attr.parse_args::<LitStr>()
        .map(|lit| lit.value())
        .map_err(|err| AnnotationTag::Invalid {
            attribute: name.to_string(),
            reason:    err.to_string()
        })
}

/// Attribute that takes no arguments.
fn word(attr: &Attribute, name: &str, tag: AnnotationTag) -> AnnotationTag {
    match attr.meta {
        Meta::Path(_) => tag,
        _ => AnnotationTag::Invalid {
            attribute: name.to_string(),
            reason:    "takes no arguments".to_string()
        }
    }
}

fn invalid(attribute: &str, err: &darling::Error) -> AnnotationTag {
    AnnotationTag::Invalid {
        attribute: attribute.to_string(),
        reason:    err.to_string()
    }
}

fn passthrough(attr: &Attribute) -> AnnotationTag {
    AnnotationTag::Passthrough(attr.to_token_stream().to_string())
}

fn path_text(path: &syn::Path) -> String {
    let joined = path
        .segments
        .iter()
        .map(|segment| segment.ident.to_string())
        .collect::<Vec<_>>()
        .join("::");
    if path.leading_colon.is_some() {
        format!("::{joined}")
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_attrs(code: &str) -> Vec<Attribute> {
        let item: syn::ItemStruct = syn::parse_str(&format!("{code} struct Annotated;")).unwrap();
        item.attrs
    }

    #[test]
    fn entity_with_indices() {
        let tags = declaration_tags(&parse_attrs(
            r#"#[entity(table = "people", attachment,
                index(columns(last, first), unique),
                index(columns(email), name = "by_email"))]"#
        ));
        assert_eq!(tags[0], AnnotationTag::Entity {
            table: Some("people".to_string())
        });
        assert_eq!(tags[1], AnnotationTag::WithAttachment);
        assert_eq!(
            tags[2],
            AnnotationTag::Index(IndexSpec {
                name:    String::new(),
                columns: vec!["last".to_string(), "first".to_string()],
                unique:  true
            })
        );
        assert!(matches!(&tags[3], AnnotationTag::Index(spec) if spec.name == "by_email"));
    }

    #[test]
    fn prefixed_markers() {
        let attrs = parse_attrs("#[replikit::entity] #[derive(Debug)]");
        assert_eq!(
            declaration_kind(&attrs),
            Some((DeclarationKind::Entity, "entity"))
        );
        let tags = declaration_tags(&attrs);
        assert_eq!(tags[0], AnnotationTag::Entity {
            table: None
        });
        assert!(matches!(&tags[1], AnnotationTag::Passthrough(text) if text.contains("derive")));
    }

    #[test]
    fn database_lists() {
        let tags = declaration_tags(&parse_attrs(
            "#[database(version = 2, entities(Person, models::Tag), daos(PersonDao))]"
        ));
        assert_eq!(
            tags[0],
            AnnotationTag::Database(DatabaseSpec {
                version:  2,
                entities: vec!["Person".to_string(), "models::Tag".to_string()],
                daos:     vec!["PersonDao".to_string()]
            })
        );
    }

    #[test]
    fn invalid_arguments_are_kept() {
        let tags = declaration_tags(&parse_attrs("#[entity(table = 5)]"));
        assert!(matches!(&tags[0], AnnotationTag::Invalid { attribute, .. } if attribute == "entity"));

        let tags = declaration_tags(&parse_attrs("#[database(entities(Person))]"));
        assert!(matches!(&tags[0], AnnotationTag::Invalid { .. }));
    }

    #[test]
    fn member_markers() {
        let tags = member_tags(&parse_attrs(
            r#"#[primary_key(auto_generate)]
               #[attachment_size]
               #[query("SELECT 1")]
               #[postgres_query("SELECT 2")]
               #[dialect_query(dialect = "sqlite", sql = "SELECT 3")]
               #[insert(replace)]
               #[delete]
               #[doc = "kept"]"#
        ));
        assert_eq!(&tags[..7], &[
            AnnotationTag::PrimaryKey {
                auto_generate: true
            },
            AnnotationTag::Attachment(AttachmentRole::Size),
            AnnotationTag::Query("SELECT 1".to_string()),
            AnnotationTag::DialectQuery {
                dialect: Dialect::Postgres,
                sql:     "SELECT 2".to_string()
            },
            AnnotationTag::DialectQuery {
                dialect: Dialect::Sqlite,
                sql:     "SELECT 3".to_string()
            },
            AnnotationTag::Insert {
                replace: true
            },
            AnnotationTag::Delete
        ]);
        assert!(matches!(&tags[7], AnnotationTag::Passthrough(text) if text.contains("kept")));
    }

    #[test]
    fn unknown_dialect_prefix_passes_through() {
        let tags = member_tags(&parse_attrs(r#"#[mysql_query("SELECT 1")]"#));
        assert!(matches!(&tags[0], AnnotationTag::Passthrough(_)));
    }

    #[test]
    fn words_reject_arguments() {
        let tags = member_tags(&parse_attrs("#[update(all)] #[query]"));
        assert!(matches!(&tags[0], AnnotationTag::Invalid { attribute, .. } if attribute == "update"));
        assert!(matches!(&tags[1], AnnotationTag::Invalid { attribute, .. } if attribute == "query"));
    }

    #[test]
    fn db_type_parameter() {
        let tags = param_tags(&parse_attrs("#[db_type] #[allow(unused)]"));
        assert_eq!(tags[0], AnnotationTag::DbType);
        assert!(matches!(&tags[1], AnnotationTag::Passthrough(_)));
    }
}
