// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Table DDL and index metadata.
//!
//! One `schema` unit per (target, dialect) holds a module per entity:
//!
//! ```rust,ignore
//! pub mod person {
//!     pub const TABLE: &str = "people";
//!     pub const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS people (...)";
//!     pub const INDICES: &[::replikit::schema::IndexMeta] = &[...];
//!     pub const CREATE_INDICES: &[&str] = &["CREATE UNIQUE INDEX ..."];
//! }
//!
//! pub const CREATE_TABLES: &[&str] = &[person::CREATE_TABLE];
//! ```
//!
//! # Column Types
//!
//! | Rust | SQLite | PostgreSQL |
//! |------|--------|------------|
//! | `bool` | `INTEGER` | `BOOLEAN` |
//! | `i8`, `i16`, `u8` | `INTEGER` | `SMALLINT` |
//! | `i32`, `u16` | `INTEGER` | `INTEGER` |
//! | `i64`, `u32`, `u64`, `isize`, `usize` | `INTEGER` | `BIGINT` |
//! | `f32` | `REAL` | `REAL` |
//! | `f64` | `REAL` | `DOUBLE PRECISION` |
//! | `String`, `char` | `TEXT` | `TEXT` |
//! | `Vec<u8>` | `BLOB` | `BYTEA` |
//!
//! Columns are `NOT NULL` unless the field is optional.

use convert_case::{Case, Casing};
use quote::quote;

use super::NAME;
use crate::{
    declaration::TypeRef,
    emit::{EmitContext, SourceUnit, UnitId, UnitKind},
    error::{EmissionError, EmitCause},
    model::{EntityModel, FieldModel, IndexDescriptor},
    target::Dialect,
    utils::{marker, naming}
};

/// Subject of the schema unit.
pub const SUBJECT: &str = "schema";

/// Generate the schema unit of a (target, dialect) pair.
///
/// # Errors
///
/// Returns an [`EmissionError`] naming the first entity with a field the
/// dialect has no column type for.
pub fn unit(ctx: &EmitContext<'_>) -> Result<SourceUnit, EmissionError> {
    let rt = ctx.runtime;
    let marker = marker::generated();
    let mut modules = Vec::with_capacity(ctx.model.entities.len());
    let mut tables = Vec::with_capacity(ctx.model.entities.len());

    for entity in &ctx.model.entities {
        let fail = |cause: EmitCause| ctx.error(NAME, entity.name.as_str(), cause);
        let module = module_ident(entity).map_err(fail)?;
        let create_table = create_table(entity, ctx.dialect).map_err(fail)?;
        let table = &entity.table;
        let indices = entity.indices.iter().map(|index| {
            let name = &index.name;
            let columns = index.columns.iter().map(|c| naming::column(c));
            let unique = index.unique;
            quote! {
                #rt::schema::IndexMeta {
                    name: #name,
                    columns: &[#(#columns),*],
                    unique: #unique
                }
            }
        });
        let create_indices = entity.indices.iter().map(|index| create_index(table, index));
        let doc = format!(" Schema of `{}`.", entity.name.simple());

        modules.push(quote! {
            #[doc = #doc]
            #marker
            pub mod #module {
                pub const TABLE: &str = #table;
                pub const CREATE_TABLE: &str = #create_table;
                pub const INDICES: &[#rt::schema::IndexMeta] = &[#(#indices),*];
                pub const CREATE_INDICES: &[&str] = &[#(#create_indices),*];
            }
        });
        tables.push(quote! { #module::CREATE_TABLE });
    }

    let tokens = quote! {
        #(#modules)*

        /// `CREATE TABLE` statements in declaration order.
        pub const CREATE_TABLES: &[&str] = &[#(#tables),*];
    };

    Ok(SourceUnit {
        id:      UnitId {
            target:  ctx.target,
            dialect: Some(ctx.dialect),
            subject: SUBJECT.to_string(),
            kind:    UnitKind::Schema
        },
        content: marker::with_header(&tokens)
    })
}

/// Module holding an entity's schema constants (`person`).
pub fn module_ident(entity: &EntityModel) -> Result<syn::Ident, EmitCause> {
    naming::ident(&entity.name.simple().to_case(Case::Snake))
}

/// `CREATE TABLE IF NOT EXISTS` statement of an entity.
///
/// # Errors
///
/// Returns [`EmitCause::UnsupportedColumn`] for a field without a column type.
pub fn create_table(entity: &EntityModel, dialect: Dialect) -> Result<String, EmitCause> {
    let columns = entity
        .fields
        .iter()
        .map(|field| column_definition(entity, field, dialect))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(format!("CREATE TABLE IF NOT EXISTS {} ({})", entity.table, columns.join(", ")))
}

/// `CREATE [UNIQUE] INDEX IF NOT EXISTS` statement, columns in order.
#[must_use]
pub fn create_index(table: &str, index: &IndexDescriptor) -> String {
    let columns: Vec<&str> = index.columns.iter().map(|c| naming::column(c)).collect();
    format!(
        "CREATE {}INDEX IF NOT EXISTS {} ON {} ({})",
        if index.unique { "UNIQUE " } else { "" },
        index.name,
        table,
        columns.join(", ")
    )
}

fn column_definition(
    entity: &EntityModel,
    field: &FieldModel,
    dialect: Dialect
) -> Result<String, EmitCause> {
    let canonical = field.canonical_type();
    let sql_type = column_type(&canonical, dialect).ok_or_else(|| EmitCause::UnsupportedColumn {
        entity:  entity.name.to_string(),
        field:   field.name.clone(),
        ty:      field.ty.render(),
        dialect: dialect.name()
    })?;
    let column = field.column();

    if field.primary_key && field.auto_generate {
        return Ok(match dialect {
            Dialect::Sqlite => format!("{column} INTEGER PRIMARY KEY AUTOINCREMENT"),
            Dialect::Postgres => {
                let serial = if sql_type == "BIGINT" { "BIGSERIAL" } else { "SERIAL" };
                format!("{column} {serial} PRIMARY KEY")
            }
        });
    }

    let mut definition = format!("{column} {sql_type}");
    if field.primary_key {
        definition.push_str(" PRIMARY KEY");
    }
    if !field.nullable {
        definition.push_str(" NOT NULL");
    }
    Ok(definition)
}

/// Column type of a canonical field type, nullability ignored.
#[must_use]
pub fn column_type(ty: &TypeRef, dialect: Dialect) -> Option<&'static str> {
    if ty.reference {
        return None;
    }

    let bytes = ty.simple_name() == "Vec"
        && ty
            .first_arg()
            .is_some_and(|arg| arg.name == "u8" && !arg.nullable && arg.args.is_empty());
    if bytes {
        return Some(match dialect {
            Dialect::Sqlite => "BLOB",
            Dialect::Postgres => "BYTEA"
        });
    }
    if !ty.args.is_empty() {
        return None;
    }

    let found = match dialect {
        Dialect::Sqlite => match ty.simple_name() {
            "bool" | "i8" | "i16" | "i32" | "i64" | "isize" | "u8" | "u16" | "u32" | "u64"
            | "usize" => "INTEGER",
            "f32" | "f64" => "REAL",
            "String" | "str" | "char" => "TEXT",
            _ => return None
        },
        Dialect::Postgres => match ty.simple_name() {
            "bool" => "BOOLEAN",
            "i8" | "i16" | "u8" => "SMALLINT",
            "i32" | "u16" => "INTEGER",
            "i64" | "u32" | "u64" | "isize" | "usize" => "BIGINT",
            "f32" => "REAL",
            "f64" => "DOUBLE PRECISION",
            "String" | "str" | "char" => "TEXT",
            _ => return None
        }
    };
    Some(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        emit::tests::{MODELS, extraction, runtime},
        target::Target
    };

    fn schema(dialect: Dialect) -> Result<SourceUnit, EmissionError> {
        let extraction = extraction(MODELS);
        let runtime = runtime();
        unit(&EmitContext {
            model: &extraction.model,
            target: Target::Jvm,
            dialect,
            runtime: &runtime
        })
    }

    #[test]
    fn sqlite_tables() {
        let extraction = extraction(MODELS);
        let person = create_table(&extraction.model.entities[0], Dialect::Sqlite).unwrap();
        assert_eq!(
            person,
            "CREATE TABLE IF NOT EXISTS people (id INTEGER PRIMARY KEY AUTOINCREMENT, first_name \
             TEXT NOT NULL, last_name TEXT NOT NULL, nickname TEXT)"
        );
        let photo = create_table(&extraction.model.entities[1], Dialect::Sqlite).unwrap();
        assert!(photo.starts_with("CREATE TABLE IF NOT EXISTS Photo (id TEXT PRIMARY KEY NOT NULL"));
    }

    #[test]
    fn postgres_serial_keys() {
        let extraction = extraction(MODELS);
        let person = create_table(&extraction.model.entities[0], Dialect::Postgres).unwrap();
        assert!(person.contains("id BIGSERIAL PRIMARY KEY"));
        assert!(!person.contains("AUTOINCREMENT"));
    }

    #[test]
    fn index_order_and_uniqueness_survive() {
        let content = schema(Dialect::Sqlite).unwrap().content;
        assert!(content.contains(
            "CREATE UNIQUE INDEX IF NOT EXISTS index_people_last_name_first_name ON people \
             (last_name, first_name)"
        ));
        assert!(content.contains("columns : & [\"last_name\" , \"first_name\"]"));
        assert!(content.contains("unique : true"));
        assert!(content.contains("pub mod person"));
        assert!(content.contains("pub mod photo"));
        assert!(syn::parse_file(&content).is_ok());
    }

    #[test]
    fn unmapped_field_fails_the_entity() {
        let extraction = extraction(
            r#"
            #[entity]
            pub struct Event {
                #[primary_key]
                pub id: i64,
                pub at: chrono::DateTime<chrono::Utc>,
            }
            "#
        );
        let runtime = runtime();
        let err = unit(&EmitContext {
            model:   &extraction.model,
            target:  Target::Mobile,
            dialect: Dialect::Sqlite,
            runtime: &runtime
        })
        .unwrap_err();
        assert_eq!(err.subject, "db::Event");
        assert!(matches!(err.cause, EmitCause::UnsupportedColumn { ref field, .. } if field == "at"));
    }

    #[test]
    fn column_types() {
        let bytes = TypeRef::generic("Vec", [TypeRef::named("u8")]);
        assert_eq!(column_type(&bytes, Dialect::Postgres), Some("BYTEA"));
        assert_eq!(column_type(&TypeRef::named("bool"), Dialect::Postgres), Some("BOOLEAN"));
        assert_eq!(column_type(&TypeRef::named("f64"), Dialect::Postgres), Some("DOUBLE PRECISION"));
        assert_eq!(column_type(&TypeRef::named("i128"), Dialect::Sqlite), None);
        let strings = TypeRef::generic("Vec", [TypeRef::named("String")]);
        assert_eq!(column_type(&strings, Dialect::Sqlite), None);
    }
}
