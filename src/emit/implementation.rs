// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Concrete DAO implementations, schema and database structs.
//!
//! For every (target, dialect) pair this emitter produces one implementation
//! per DAO plus the shared schema and database units.
//!
//! # Generated Implementation
//!
//! ```rust,ignore
//! #[allow(unused_imports)]
//! use crate::db::*;
//!
//! pub struct PersonDaoJvmSqliteImpl<'a> {
//!     conn: &'a ::replikit::driver::jvm::SqliteConnection
//! }
//!
//! impl crate::db::PersonDao for PersonDaoJvmSqliteImpl<'_> {
//!     async fn by_name(&self, name: &str) -> Vec<Person> {
//!         let value = {
//!             let params: [&dyn ::replikit::driver::ToSql; 1] = [&name];
//!             self.conn.query_list::<Person>("SELECT ... WHERE last_name = ?", &params).await
//!         };
//!         value
//!     }
//! }
//! ```
//!
//! # Call Styles
//!
//! | Style | Body |
//! |-------|------|
//! | `async fn` | statements inline, awaited |
//! | blocking | `rt::block_on(async { .. })` |
//! | continuation | `rt::block_on`, then `cont.resume(value)` |
//!
//! The browser target cannot block; blocking and continuation operations are
//! emitted as `unimplemented!` stubs naming the operation.
//!
//! # Submodules
//!
//! - [`body`] - Operation bodies and write statements
//! - [`schema`] - Table DDL and index metadata
//! - [`database`] - Database structs

pub mod body;
pub mod database;
pub mod schema;

use proc_macro2::TokenStream;
use quote::quote;

use super::{
    EmitContext, EmitScope, Emitter, SourceUnit, UnitId, UnitKind, joined_ident, module_glob
};
use crate::{
    declaration::QualifiedName,
    error::{EmissionError, EmitCause},
    model::{DaoModel, predicates},
    target::{Dialect, GenerationPass, Target},
    utils::{marker, naming}
};

/// Emitter name used in diagnostics.
pub const NAME: &str = "implementation";

/// Generates DAO implementations, the schema and database structs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImplementationEmitter;

impl Emitter for ImplementationEmitter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn pass(&self) -> GenerationPass {
        GenerationPass::Implementation
    }

    fn scope(&self) -> EmitScope {
        EmitScope::PerDialect
    }

    fn emit_dao(&self, ctx: &EmitContext<'_>, dao: &DaoModel) -> Result<SourceUnit, EmitCause> {
        let tokens = dao_impl(ctx, dao)?;
        Ok(SourceUnit {
            id:      UnitId {
                target:  ctx.target,
                dialect: Some(ctx.dialect),
                subject: dao.name.to_string(),
                kind:    UnitKind::DaoImpl
            },
            content: marker::with_header(&tokens)
        })
    }

    fn emit_shared(&self, ctx: &EmitContext<'_>) -> Vec<Result<SourceUnit, EmissionError>> {
        let mut units = Vec::with_capacity(ctx.model.databases.len() + 1);
        if !ctx.model.entities.is_empty() {
            units.push(schema::unit(ctx));
        }
        for db in &ctx.model.databases {
            units.push(
                database::generate(ctx, db)
                    .map(|tokens| SourceUnit {
                        id:      UnitId {
                            target:  ctx.target,
                            dialect: Some(ctx.dialect),
                            subject: db.name.to_string(),
                            kind:    UnitKind::Database
                        },
                        content: marker::with_header(&tokens)
                    })
                    .map_err(|cause| ctx.error(NAME, db.name.as_str(), cause))
            );
        }
        units
    }
}

/// Name of the implementation struct (`PersonDaoJvmSqliteImpl`).
pub fn impl_ident(
    dao: &QualifiedName,
    target: Target,
    dialect: Dialect
) -> Result<syn::Ident, EmitCause> {
    joined_ident(dao, &[target.type_suffix(), dialect.type_suffix(), "Impl"])
}

fn dao_impl(ctx: &EmitContext<'_>, dao: &DaoModel) -> Result<TokenStream, EmitCause> {
    let ident = impl_ident(&dao.name, ctx.target, ctx.dialect)?;
    let dao_path = naming::crate_path(&dao.name)?;
    let glob = module_glob(&dao.name)?;
    let connection = ctx.connection();
    let marker = marker::generated();

    let methods = dao
        .operations
        .iter()
        .filter(|op| predicates::is_generated(op))
        .map(|op| body::method(ctx, op))
        .collect::<Result<Vec<_>, _>>()?;

    let doc = format!(
        " `{}` over the {} driver of the {} target.",
        dao.name.simple(),
        ctx.dialect.name(),
        ctx.target.name()
    );

    Ok(quote! {
        #glob

        #marker
        #[doc = #doc]
        pub struct #ident<'a> {
            conn: &'a #connection
        }

        #marker
        impl<'a> #ident<'a> {
            /// Wrap a borrowed connection.
            pub fn new(conn: &'a #connection) -> Self {
                Self { conn }
            }
        }

        #marker
        impl #dao_path for #ident<'_> {
            #(#methods)*
        }
    })
}
