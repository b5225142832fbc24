// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Database structs.
//!
//! ```rust,ignore
//! pub struct AppDatabaseJvmSqlite {
//!     conn: ::replikit::driver::jvm::SqliteConnection
//! }
//!
//! impl AppDatabaseJvmSqlite {
//!     pub const VERSION: u32 = 3;
//!     pub const DB_TYPE: i32 = 1;
//!
//!     pub async fn create_all_tables(&self) { ... }
//!     pub fn person_dao(&self) -> super::person_dao_impl::PersonDaoJvmSqliteImpl<'_> { ... }
//! }
//! ```

use convert_case::{Case, Casing};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};

use super::{impl_ident, schema};
use crate::{
    emit::{EmitContext, UnitKind, joined_ident, module_glob, module_name},
    error::EmitCause,
    model::DatabaseModel,
    utils::{marker, naming}
};

/// Generate the database struct for the context's target and dialect.
///
/// # Errors
///
/// Returns [`EmitCause::InvalidIdentifier`] when a listed entity or DAO
/// cannot be named in Rust.
pub fn generate(ctx: &EmitContext<'_>, db: &DatabaseModel) -> Result<TokenStream, EmitCause> {
    let ident = joined_ident(&db.name, &[ctx.target.type_suffix(), ctx.dialect.type_suffix()])?;
    let glob = module_glob(&db.name)?;
    let connection = ctx.connection();
    let marker = marker::generated();
    let version = db.version;
    let db_type = ctx.dialect.discriminator();
    let schema_module = format_ident!("{}", schema::SUBJECT);

    let tables = db
        .entities
        .iter()
        .map(|name| {
            let entity = ctx
                .model
                .entity(name)
                .ok_or_else(|| EmitCause::InvalidIdentifier(name.to_string()))?;
            let module = schema::module_ident(entity)?;
            Ok(quote! {
                self.conn.execute(super::#schema_module::#module::CREATE_TABLE, &[]).await;
                for statement in super::#schema_module::#module::CREATE_INDICES {
                    self.conn.execute(statement, &[]).await;
                }
            })
        })
        .collect::<Result<Vec<_>, EmitCause>>()?;

    let accessors = db
        .daos
        .iter()
        .map(|dao| {
            let accessor = naming::ident(&dao.simple().to_case(Case::Snake))?;
            let module = naming::ident(&module_name(UnitKind::DaoImpl, dao.as_str()))?;
            let implementation = impl_ident(dao, ctx.target, ctx.dialect)?;
            let doc = format!(" `{}` bound to this database.", dao.simple());
            Ok(quote! {
                #[doc = #doc]
                pub fn #accessor(&self) -> super::#module::#implementation<'_> {
                    super::#module::#implementation::new(&self.conn)
                }
            })
        })
        .collect::<Result<Vec<_>, EmitCause>>()?;

    let doc = format!(
        " `{}` (version {}) on the {} driver of the {} target.",
        db.name.simple(),
        version,
        ctx.dialect.name(),
        ctx.target.name()
    );

    Ok(quote! {
        #glob

        #marker
        #[doc = #doc]
        pub struct #ident {
            conn: #connection
        }

        #marker
        impl #ident {
            /// Schema version.
            pub const VERSION: u32 = #version;
            /// Value handed to `db_type` parameters.
            pub const DB_TYPE: i32 = #db_type;

            /// Take ownership of an open connection.
            pub fn new(conn: #connection) -> Self {
                Self { conn }
            }

            /// The underlying connection.
            pub fn connection(&self) -> &#connection {
                &self.conn
            }

            /// Create every table and index, skipping existing ones.
            pub async fn create_all_tables(&self) {
                #(#tables)*
            }

            #(#accessors)*
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        emit::tests::{MODELS, extraction, runtime},
        target::{Dialect, Target}
    };

    #[test]
    fn database_struct() {
        let extraction = extraction(MODELS);
        let runtime = runtime();
        let ctx = EmitContext {
            model:   &extraction.model,
            target:  Target::Jvm,
            dialect: Dialect::Postgres,
            runtime: &runtime
        };
        let tokens = generate(&ctx, &extraction.model.databases[0]).unwrap().to_string();
        assert!(tokens.contains("pub struct AppDatabaseJvmPostgres"));
        assert!(tokens.contains("pub const VERSION : u32 = 3u32"));
        assert!(tokens.contains("pub const DB_TYPE : i32 = 2i32"));
        assert!(tokens.contains("super :: schema :: person :: CREATE_TABLE"));
        assert!(tokens.contains("super :: schema :: photo :: CREATE_INDICES"));
        assert!(tokens.contains(
            "pub fn person_dao (& self) -> super :: person_dao_impl :: PersonDaoJvmPostgresImpl < '_ >"
        ));
        assert!(tokens.contains("pub fn photo_dao"));
        assert!(syn::parse_file(&tokens).is_ok());
    }
}
