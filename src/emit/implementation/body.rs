// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Operation bodies.
//!
//! A body computes the canonical result with the dialect driver, then
//! converts it into the declared shape. Driver calls by result:
//!
//! | Canonical result | Call |
//! |------------------|------|
//! | `()` | `execute`, result discarded |
//! | integer, mutating query | `execute` (affected rows) |
//! | `Option<T>` | `query_optional::<T>` |
//! | `Vec<T>` | `query_list::<T>` |
//! | anything else | `query_one::<T>` |
//! | insert | `insert` (row id) |
//! | update, delete | `execute` (affected rows) |

use proc_macro2::{Literal, TokenStream};
use quote::quote;

use crate::{
    declaration::TypeRef,
    emit::{EmitContext, convert, signature::signature},
    error::EmitCause,
    model::{
        EntityModel, FieldModel, OperationDescriptor, OperationKind, QuerySpec, SuspendStyle,
        WriteOp, WriteSpec, returns::is_integer
    },
    target::Dialect,
    utils::{naming, sql}
};

/// Generate the trait method implementing one operation.
///
/// Custom operations yield an empty stream; their default body stays.
///
/// # Errors
///
/// - [`EmitCause::UnknownQueryParameter`] for a `:name` with no parameter
/// - [`EmitCause::UnsupportedOperation`] for results the driver cannot
///   produce or the declared type cannot be built from
pub fn method(ctx: &EmitContext<'_>, op: &OperationDescriptor) -> Result<TokenStream, EmitCause> {
    let compute = match &op.kind {
        OperationKind::Query(query) => query_body(ctx, op, query)?,
        OperationKind::Write(write) => write_body(ctx, op, write)?,
        OperationKind::Custom => return Ok(TokenStream::new())
    };

    let sig = signature(op, ctx.runtime)?;
    let header = &sig.header;

    let value = convert::to_declared(quote! { value }, &convert::declared_result(op))
        .map_err(|ty| unsupported(op, format!("cannot build a `{ty}` result")))?;

    let rt = ctx.runtime;
    let body = match (&op.modifiers.suspend, &sig.cont) {
        (SuspendStyle::Async, _) => quote! {
            let value = { #compute };
            #value
        },
        _ if !ctx.target.supports_blocking() => {
            let message = format!(
                "`{}` blocks the calling thread, which the {} target cannot do; declare it `async`",
                op.name, ctx.target
            );
            quote! { unimplemented!(#message) }
        }
        (SuspendStyle::Continuation {
            ..
        }, Some(cont)) => quote! {
            let value = #rt::block_on(async { #compute });
            #cont.resume(#value);
        },
        _ => quote! {
            let value = #rt::block_on(async { #compute });
            #value
        }
    };

    Ok(quote! {
        #header {
            #body
        }
    })
}

fn query_body(
    ctx: &EmitContext<'_>,
    op: &OperationDescriptor,
    query: &QuerySpec
) -> Result<TokenStream, EmitCause> {
    let text = query.sql_for(ctx.dialect);
    let bound = sql::bind_named(text, ctx.dialect);

    let values = bound
        .params
        .iter()
        .map(|name| {
            let param = op
                .params
                .iter()
                .find(|p| naming::column(&p.name) == name)
                .ok_or_else(|| EmitCause::UnknownQueryParameter {
                    operation: op.name.clone(),
                    parameter: name.clone()
                })?;
            let ident = naming::ident(&param.name)?;
            Ok(quote! { &#ident })
        })
        .collect::<Result<Vec<_>, EmitCause>>()?;
    let params = bind(ctx.runtime, &values);

    let statement = bound.sql;
    let ret = &op.return_type;

    let call = if ret.is_unit() {
        quote! { self.conn.execute(#statement, &params).await; }
    } else if sql::classify(text).is_mutation() && !returns_rows(text) {
        if !is_integer(ret) {
            return Err(unsupported(
                op,
                format!("a mutating query yields `()` or an affected-row count, not `{ret}`")
            ));
        }
        let ty = naming::ty(ret)?;
        quote! { self.conn.execute(#statement, &params).await as #ty }
    } else if ret.nullable {
        let ty = naming::ty(&TypeRef {
            nullable: false,
            ..ret.clone()
        })?;
        quote! { self.conn.query_optional::<#ty>(#statement, &params).await }
    } else if let Some(element) = ret.element() {
        let ty = naming::ty(element)?;
        quote! { self.conn.query_list::<#ty>(#statement, &params).await }
    } else {
        let ty = naming::ty(ret)?;
        quote! { self.conn.query_one::<#ty>(#statement, &params).await }
    };

    Ok(quote! {
        #params
        #call
    })
}

/// What a write operation hands back.
enum Outcome {
    Nothing,
    /// Row id (single insert) or affected rows.
    Count(syn::Type),
    /// Row ids of a batch insert.
    Ids(syn::Type)
}

fn write_body(
    ctx: &EmitContext<'_>,
    op: &OperationDescriptor,
    write: &WriteSpec
) -> Result<TokenStream, EmitCause> {
    let entity = ctx
        .model
        .entity(&write.entity)
        .ok_or_else(|| unsupported(op, format!("entity `{}` is not modeled", write.entity)))?;
    let statement = WriteStatement::new(entity, write.op, ctx.dialect)
        .map_err(|reason| unsupported(op, reason))?;

    let ret = &op.return_type;
    let inserts_batch = write.batch && matches!(write.op, WriteOp::Insert { .. });
    let outcome = if ret.is_unit() {
        Outcome::Nothing
    } else if is_integer(ret) && !inserts_batch {
        Outcome::Count(naming::ty(ret)?)
    } else if let Some(element) = ret.element().filter(|e| inserts_batch && is_integer(e)) {
        Outcome::Ids(naming::ty(element)?)
    } else {
        return Err(unsupported(op, format!("`{}` cannot return `{ret}`", write.op.label())));
    };

    let param = naming::ident(&write.param)?;
    if !write.batch {
        let one = statement.call(ctx.runtime, &quote! { #param })?;
        return Ok(match outcome {
            Outcome::Count(ty) | Outcome::Ids(ty) => quote! { (#one) as #ty },
            Outcome::Nothing => quote! { #one; }
        });
    }

    let one = statement.call(ctx.runtime, &quote! { item })?;
    Ok(match outcome {
        Outcome::Nothing => quote! {
            for item in #param.iter() {
                #one;
            }
        },
        Outcome::Ids(ty) => quote! {
            let mut ids = ::std::vec::Vec::with_capacity(#param.len());
            for item in #param.iter() {
                ids.push((#one) as #ty);
            }
            ids
        },
        Outcome::Count(ty) => quote! {
            let mut affected: u64 = 0;
            for item in #param.iter() {
                affected += #one;
            }
            affected as #ty
        }
    })
}

/// SQL and bound fields of a generated write.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteStatement<'a> {
    /// Statement in the dialect's placeholder syntax.
    pub sql:    String,
    /// Fields bound to the placeholders, in order.
    pub fields: Vec<&'a FieldModel>,
    /// `insert` (row id) instead of `execute` (affected rows).
    pub insert: bool
}

impl<'a> WriteStatement<'a> {
    /// Build the statement writing one entity value.
    ///
    /// # Errors
    ///
    /// Returns the reason when the entity has no primary key, or nothing to
    /// update.
    pub fn new(entity: &'a EntityModel, op: WriteOp, dialect: Dialect) -> Result<Self, String> {
        let pk = entity
            .primary_key()
            .ok_or_else(|| format!("entity `{}` has no primary key", entity.name))?;
        let table = &entity.table;

        let statement = match op {
            WriteOp::Insert {
                replace
            } => {
                let fields: Vec<&FieldModel> = if replace {
                    entity.fields.iter().collect()
                } else {
                    entity.insert_fields().collect()
                };
                Self {
                    sql: insert_sql(table, pk, &fields, replace, dialect),
                    fields,
                    insert: true
                }
            }
            WriteOp::Update => {
                let mut fields: Vec<&FieldModel> = entity.update_fields().collect();
                if fields.is_empty() {
                    return Err(format!("entity `{}` has no field to update", entity.name));
                }
                let columns: Vec<&str> = fields.iter().map(|f| f.column()).collect();
                let sql = format!(
                    "UPDATE {} SET {} WHERE {} = {}",
                    table,
                    dialect.set_clause(&columns),
                    pk.column(),
                    dialect.placeholder(columns.len() + 1)
                );
                fields.push(pk);
                Self {
                    sql,
                    fields,
                    insert: false
                }
            }
            WriteOp::Delete => Self {
                sql:    format!(
                    "DELETE FROM {} WHERE {} = {}",
                    table,
                    pk.column(),
                    dialect.placeholder(1)
                ),
                fields: vec![pk],
                insert: false
            }
        };

        Ok(statement)
    }

    /// Driver call writing `item`, evaluating to the row id or affected rows.
    fn call(&self, runtime: &syn::Path, item: &TokenStream) -> Result<TokenStream, EmitCause> {
        let values = self
            .fields
            .iter()
            .map(|f| {
                let field = naming::ident(&f.name)?;
                Ok(quote! { &#item.#field })
            })
            .collect::<Result<Vec<_>, EmitCause>>()?;
        let params = bind(runtime, &values);
        let sql = &self.sql;
        let call = if self.insert {
            quote! { self.conn.insert(#sql, &params).await }
        } else {
            quote! { self.conn.execute(#sql, &params).await }
        };
        Ok(quote! {
            {
                #params
                #call
            }
        })
    }
}

fn insert_sql(
    table: &str,
    pk: &FieldModel,
    fields: &[&FieldModel],
    replace: bool,
    dialect: Dialect
) -> String {
    let columns: Vec<&str> = fields.iter().map(|f| f.column()).collect();
    let values = if columns.is_empty() {
        "DEFAULT VALUES".to_string()
    } else {
        format!("({}) VALUES ({})", columns.join(", "), dialect.placeholders(columns.len()))
    };

    match dialect {
        Dialect::Sqlite => {
            let verb = if replace { "INSERT OR REPLACE" } else { "INSERT" };
            format!("{verb} INTO {table} {values}")
        }
        Dialect::Postgres => {
            let mut sql = format!("INSERT INTO {table} {values}");
            if replace {
                let updates: Vec<String> = columns
                    .iter()
                    .filter(|c| **c != pk.column())
                    .map(|c| format!("{c} = EXCLUDED.{c}"))
                    .collect();
                if updates.is_empty() {
                    sql.push_str(&format!(" ON CONFLICT ({}) DO NOTHING", pk.column()));
                } else {
                    sql.push_str(&format!(
                        " ON CONFLICT ({}) DO UPDATE SET {}",
                        pk.column(),
                        updates.join(", ")
                    ));
                }
            }
            if is_integer(&pk.canonical_type()) {
                sql.push_str(&format!(" RETURNING {}", pk.column()));
            }
            sql
        }
    }
}

/// `let params: [&dyn ToSql; N] = [..];`
fn bind(runtime: &syn::Path, values: &[TokenStream]) -> TokenStream {
    let count = Literal::usize_unsuffixed(values.len());
    quote! {
        let params: [&dyn #runtime::driver::ToSql; #count] = [#(#values),*];
    }
}

fn returns_rows(sql: &str) -> bool {
    sql.split_whitespace().any(|w| w.eq_ignore_ascii_case("RETURNING"))
}

fn unsupported(op: &OperationDescriptor, reason: String) -> EmitCause {
    EmitCause::UnsupportedOperation {
        operation: op.name.clone(),
        reason
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        emit::tests::{MODELS, extraction, runtime},
        model::Extraction,
        target::Target
    };

    fn render(extraction: &Extraction, target: Target, dialect: Dialect, op: &str) -> String {
        let runtime = runtime();
        let ctx = EmitContext {
            model: &extraction.model,
            target,
            dialect,
            runtime: &runtime
        };
        let op = extraction
            .model
            .daos
            .iter()
            .find_map(|dao| dao.operation(op))
            .unwrap();
        method(&ctx, op).unwrap().to_string()
    }

    fn mobile(op: &str) -> String {
        render(&extraction(MODELS), Target::Mobile, Dialect::Sqlite, op)
    }

    #[test]
    fn list_query_is_awaited_inline() {
        let body = mobile("by_name");
        assert!(body.contains("let params : [& dyn :: replikit :: driver :: ToSql ; 1] = [& name]"));
        assert!(body.contains("query_list :: < Person >"));
        assert!(!body.contains("block_on"));
    }

    #[test]
    fn optional_box_is_rebuilt() {
        let body = mobile("by_id");
        assert!(body.contains(":: replikit :: block_on (async"));
        assert!(body.contains("query_optional :: < Person >"));
        assert!(body.contains("value . map (| v | :: std :: boxed :: Box :: new (v))"));
    }

    #[test]
    fn continuation_resumes() {
        let body = mobile("all");
        assert!(body.contains("cont . resume (:: std :: boxed :: Box :: new (value))"));
    }

    #[test]
    fn mutating_query_counts_rows() {
        let body = mobile("purge");
        assert!(body.contains("execute (\"DELETE FROM people WHERE last_name = ?\" , & params) . await as usize"));
    }

    #[test]
    fn db_type_binds_like_any_parameter() {
        let body = mobile("count");
        assert!(body.contains("[& db]"));
        assert!(body.contains("query_one :: < i64 >"));
    }

    #[test]
    fn insert_skips_generated_key() {
        let body = mobile("add");
        assert!(body.contains(
            "INSERT INTO people (first_name, last_name, nickname) VALUES (?, ?, ?)"
        ));
        assert!(body.contains("& person . first_name"));
        assert!(body.contains("insert ("));
    }

    #[test]
    fn batch_update_sums_affected_rows() {
        let body = render(&extraction(MODELS), Target::Jvm, Dialect::Postgres, "save_all");
        assert!(body.contains(
            "UPDATE people SET first_name = $1, last_name = $2, nickname = $3 WHERE id = $4"
        ));
        assert!(body.contains("for item in people . iter ()"));
        assert!(body.contains("affected as u64"));
    }

    #[test]
    fn unknown_parameter_is_reported() {
        let extraction = extraction(
            r#"
            #[entity]
            pub struct Tag {
                #[primary_key]
                pub id: i64,
            }

            #[dao]
            pub trait TagDao {
                #[query("SELECT * FROM Tag WHERE id = :missing")]
                fn find(&self, id: i64) -> Option<Tag>;
            }
            "#
        );
        let runtime = runtime();
        let ctx = EmitContext {
            model:   &extraction.model,
            target:  Target::Jvm,
            dialect: Dialect::Sqlite,
            runtime: &runtime
        };
        let err = method(&ctx, &extraction.model.daos[0].operations[0]).unwrap_err();
        assert_eq!(
            err,
            EmitCause::UnknownQueryParameter {
                operation: "find".to_string(),
                parameter: "missing".to_string()
            }
        );
    }

    #[test]
    fn browser_cannot_block() {
        let body = render(&extraction(MODELS), Target::Browser, Dialect::Sqlite, "by_id");
        assert!(body.contains("unimplemented !"));
        assert!(!body.contains("block_on"));
    }

    #[test]
    fn replace_statements() {
        let extraction = extraction(MODELS);
        let photo = &extraction.model.entities[1];
        let replace = WriteOp::Insert {
            replace: true
        };

        let sqlite = WriteStatement::new(photo, replace, Dialect::Sqlite).unwrap();
        assert_eq!(
            sqlite.sql,
            "INSERT OR REPLACE INTO Photo (id, uri, md5, size) VALUES (?, ?, ?, ?)"
        );
        assert_eq!(sqlite.fields.len(), 4);

        let postgres = WriteStatement::new(photo, replace, Dialect::Postgres).unwrap();
        assert_eq!(
            postgres.sql,
            "INSERT INTO Photo (id, uri, md5, size) VALUES ($1, $2, $3, $4) ON CONFLICT (id) DO \
             UPDATE SET uri = EXCLUDED.uri, md5 = EXCLUDED.md5, size = EXCLUDED.size"
        );
    }

    #[test]
    fn integer_keys_are_returned_on_postgres() {
        let extraction = extraction(MODELS);
        let person = &extraction.model.entities[0];
        let insert = WriteStatement::new(
            person,
            WriteOp::Insert {
                replace: false
            },
            Dialect::Postgres
        )
        .unwrap();
        assert!(insert.sql.ends_with("RETURNING id"));

        let delete = WriteStatement::new(person, WriteOp::Delete, Dialect::Postgres).unwrap();
        assert_eq!(delete.sql, "DELETE FROM people WHERE id = $1");
        assert!(!delete.insert);
    }
}
