// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Replication wrappers.
//!
//! One wrapper per (target, DAO), shared by every dialect of the target. It
//! implements the DAO trait over any inner implementation and records each
//! mutation in a replication queue.
//!
//! # Generated Wrapper
//!
//! ```rust,ignore
//! pub struct PhotoDaoReplicate<D, Q> {
//!     inner: D,
//!     queue: Q
//! }
//!
//! impl<D, Q> crate::db::PhotoDao for PhotoDaoReplicate<D, Q>
//! where
//!     D: crate::db::PhotoDao,
//!     Q: ::replikit::replication::ReplicationQueue + Clone + Send + 'static
//! {
//!     fn put(&self, photo: Photo) {
//!         let records = vec![
//!             ReplicationRecord::new("Photo", Operation::Upsert)
//!                 .with_attachment(AttachmentRef::new(photo.uri.clone(), photo.md5.clone(), photo.size as i64))
//!         ];
//!         let value = self.inner.put(photo);
//!         for record in records {
//!             self.queue.enqueue(record);
//!         }
//!         value
//!     }
//! }
//! ```
//!
//! # Record Operations
//!
//! | Operation | Record |
//! |-----------|--------|
//! | `#[insert]`, `INSERT` query | `Insert` |
//! | `#[insert(replace)]`, replacing or upserting `INSERT` query | `Upsert` |
//! | `#[update]`, `UPDATE` query | `Update` |
//! | `#[delete]`, `DELETE` query | `Delete` |
//!
//! Records are built before the inner call, since it may consume the
//! arguments. Continuation operations enqueue right before the continuation
//! resumes.

use proc_macro2::TokenStream;
use quote::{format_ident, quote};

use super::{
    EmitContext, EmitScope, Emitter, SourceUnit, UnitId, UnitKind, joined_ident, module_glob,
    signature::{Signature, signature}
};
use crate::{
    error::EmitCause,
    model::{
        DaoModel, OperationDescriptor, OperationKind, SuspendStyle, WriteOp, WriteSpec, predicates
    },
    target::GenerationPass,
    utils::{
        marker, naming,
        sql::{self, StatementKind}
    }
};

/// Emitter name used in diagnostics.
pub const NAME: &str = "replication";

/// Generates replication wrappers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplicationEmitter;

impl Emitter for ReplicationEmitter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn pass(&self) -> GenerationPass {
        GenerationPass::Replication
    }

    fn scope(&self) -> EmitScope {
        EmitScope::PerTarget
    }

    fn emit_dao(&self, ctx: &EmitContext<'_>, dao: &DaoModel) -> Result<SourceUnit, EmitCause> {
        let tokens = wrapper(ctx, dao)?;
        Ok(SourceUnit {
            id:      UnitId {
                target:  ctx.target,
                dialect: None,
                subject: dao.name.to_string(),
                kind:    UnitKind::Replication
            },
            content: marker::with_header(&tokens)
        })
    }
}

fn wrapper(ctx: &EmitContext<'_>, dao: &DaoModel) -> Result<TokenStream, EmitCause> {
    let ident = joined_ident(&dao.name, &["Replicate"])?;
    let dao_path = naming::crate_path(&dao.name)?;
    let glob = module_glob(&dao.name)?;
    let rt = ctx.runtime;
    let marker = marker::generated();

    let methods = dao
        .operations
        .iter()
        .filter(|op| predicates::is_generated(op))
        .map(|op| method(ctx, op))
        .collect::<Result<Vec<_>, _>>()?;

    let doc = format!(" `{}` recording its mutations for replication.", dao.name.simple());

    Ok(quote! {
        #glob

        #marker
        #[doc = #doc]
        pub struct #ident<D, Q> {
            inner: D,
            queue: Q
        }

        #marker
        impl<D, Q> #ident<D, Q> {
            /// Wrap an implementation and the queue receiving its records.
            pub fn new(inner: D, queue: Q) -> Self {
                Self { inner, queue }
            }

            /// The wrapped implementation.
            pub fn inner(&self) -> &D {
                &self.inner
            }

            /// The replication queue.
            pub fn queue(&self) -> &Q {
                &self.queue
            }
        }

        #marker
        impl<D, Q> #dao_path for #ident<D, Q>
        where
            D: #dao_path,
            Q: #rt::replication::ReplicationQueue + ::core::clone::Clone + ::core::marker::Send + 'static
        {
            #(#methods)*
        }
    })
}

fn method(ctx: &EmitContext<'_>, op: &OperationDescriptor) -> Result<TokenStream, EmitCause> {
    let sig = signature(op, ctx.runtime)?;
    let header = &sig.header;

    let body = match records(ctx, op)? {
        Some(records) => recording(ctx, op, &sig, &records)?,
        None => delegate(op, &sig)?
    };

    Ok(quote! {
        #header {
            #body
        }
    })
}

/// Plain call to the inner implementation.
fn delegate(op: &OperationDescriptor, sig: &Signature) -> Result<TokenStream, EmitCause> {
    let name = naming::ident(&op.name)?;
    let args = sig.forward();
    let awaited = matches!(op.modifiers.suspend, SuspendStyle::Async).then(|| quote! { .await });
    Ok(quote! { self.inner.#name(#args) #awaited })
}

fn recording(
    ctx: &EmitContext<'_>,
    op: &OperationDescriptor,
    sig: &Signature,
    records: &TokenStream
) -> Result<TokenStream, EmitCause> {
    let rt = ctx.runtime;
    let name = naming::ident(&op.name)?;
    let args = sig.forward();

    let body = match &sig.cont {
        Some(cont) if predicates::is_continuation_style(op) => quote! {
            let records: ::std::vec::Vec<#rt::replication::ReplicationRecord> = #records;
            let queue = ::core::clone::Clone::clone(&self.queue);
            let #cont = #cont.before_resume(move || {
                for record in records {
                    #rt::replication::ReplicationQueue::enqueue(&queue, record);
                }
            });
            self.inner.#name(#args)
        },
        _ => {
            let awaited =
                matches!(op.modifiers.suspend, SuspendStyle::Async).then(|| quote! { .await });
            quote! {
                let records: ::std::vec::Vec<#rt::replication::ReplicationRecord> = #records;
                let value = self.inner.#name(#args) #awaited;
                for record in records {
                    #rt::replication::ReplicationQueue::enqueue(&self.queue, record);
                }
                value
            }
        }
    };
    Ok(body)
}

/// Expression building the records of a mutating operation, `None` for
/// read-only ones.
fn records(
    ctx: &EmitContext<'_>,
    op: &OperationDescriptor
) -> Result<Option<TokenStream>, EmitCause> {
    if !predicates::is_mutating(op) {
        return Ok(None);
    }
    let unreadable = |what: &str| EmitCause::UnsupportedOperation {
        operation: op.name.clone(),
        reason:    format!("the {what} cannot be read from the query")
    };

    match &op.kind {
        OperationKind::Write(write) => write_records(ctx, op, write).map(Some),
        OperationKind::Query(query) => {
            let operation =
                query_operation(&query.sql).ok_or_else(|| unreadable("record operation"))?;
            let table =
                sql::mutated_table(&query.sql).ok_or_else(|| unreadable("mutated table"))?;
            let rt = ctx.runtime;
            Ok(Some(quote! {
                ::std::vec![#rt::replication::ReplicationRecord::new(
                    #table,
                    #rt::replication::Operation::#operation
                )]
            }))
        }
        OperationKind::Custom => Ok(None)
    }
}

fn write_records(
    ctx: &EmitContext<'_>,
    op: &OperationDescriptor,
    write: &WriteSpec
) -> Result<TokenStream, EmitCause> {
    let rt = ctx.runtime;
    let entity = ctx.model.entity(&write.entity).ok_or_else(|| EmitCause::UnsupportedOperation {
        operation: op.name.clone(),
        reason:    format!("entity `{}` is not modeled", write.entity)
    })?;
    let table = &entity.table;
    let operation = write_operation(write.op);
    let param = naming::ident(&write.param)?;

    let item = if write.batch {
        quote! { item }
    } else {
        quote! { #param }
    };
    let attachment = entity
        .attachment
        .as_ref()
        .map(|a| -> Result<TokenStream, EmitCause> {
            let uri = naming::ident(&a.uri)?;
            let md5 = naming::ident(&a.md5)?;
            let size = naming::ident(&a.size)?;
            Ok(quote! {
                .with_attachment(#rt::replication::AttachmentRef::new(
                    ::core::clone::Clone::clone(&#item.#uri),
                    ::core::clone::Clone::clone(&#item.#md5),
                    #item.#size as i64
                ))
            })
        })
        .transpose()?;

    let record = quote! {
        #rt::replication::ReplicationRecord::new(#table, #rt::replication::Operation::#operation)
            #attachment
    };

    Ok(if write.batch {
        quote! {
            #param.iter().map(|item| #record).collect::<::std::vec::Vec<_>>()
        }
    } else {
        quote! { ::std::vec![#record] }
    })
}

fn write_operation(op: WriteOp) -> syn::Ident {
    let name = match op {
        WriteOp::Insert {
            replace: false
        } => "Insert",
        WriteOp::Insert {
            replace: true
        } => "Upsert",
        WriteOp::Update => "Update",
        WriteOp::Delete => "Delete"
    };
    format_ident!("{}", name)
}

/// Record operation of a query, `None` when it writes no rows.
fn query_operation(query: &str) -> Option<syn::Ident> {
    let name = match sql::classify(query) {
        StatementKind::Replace => "Upsert",
        StatementKind::Insert if sql::replaces_rows(query) => "Upsert",
        StatementKind::Insert => "Insert",
        StatementKind::Update => "Update",
        StatementKind::Delete => "Delete",
        StatementKind::Select | StatementKind::Other => return None
    };
    Some(format_ident!("{}", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        emit::tests::{MODELS, extraction, runtime},
        target::{Dialect, Target}
    };

    fn render(dao: usize) -> String {
        let extraction = extraction(MODELS);
        let runtime = runtime();
        let ctx = EmitContext {
            model:   &extraction.model,
            target:  Target::Mobile,
            dialect: Dialect::Sqlite,
            runtime: &runtime
        };
        let unit = ReplicationEmitter.emit_dao(&ctx, &extraction.model.daos[dao]).unwrap();
        assert_eq!(unit.path(), if dao == 0 {
            "mobile/person_dao_replicate.rs"
        } else {
            "mobile/photo_dao_replicate.rs"
        });
        assert!(syn::parse_file(&unit.content).is_ok(), "{}", unit.content);
        unit.content
    }

    #[test]
    fn reads_pass_through() {
        let content = render(0);
        assert!(content.contains("pub struct PersonDaoReplicate < D , Q >"));
        assert!(content.contains("self . inner . by_name (name) . await"));
        assert!(content.contains("self . inner . by_id (id)"));
        assert!(!content.contains("fn twice"));
    }

    #[test]
    fn query_mutations_are_recorded() {
        let content = render(0);
        assert!(content.contains(
            "ReplicationRecord :: new (\"people\" , :: replikit :: replication :: Operation :: Delete)"
        ));
    }

    #[test]
    fn batch_writes_record_each_item() {
        let content = render(0);
        assert!(content.contains("people . iter () . map (| item |"));
        assert!(content.contains("Operation :: Update"));
    }

    #[test]
    fn attachments_are_referenced() {
        let content = render(1);
        assert!(content.contains("Operation :: Upsert"));
        assert!(content.contains("with_attachment"));
        assert!(content.contains(":: core :: clone :: Clone :: clone (& photo . uri)"));
        assert!(content.contains("item . size as i64"));
        assert!(content.contains("Operation :: Delete"));
    }

    #[test]
    fn continuation_enqueues_before_resume() {
        let extraction = extraction(
            r#"
            #[entity]
            pub struct Tag {
                #[primary_key]
                pub id: i64,
            }

            #[dao]
            pub trait TagDao {
                #[query("INSERT OR REPLACE INTO Tag (id) VALUES (:id)")]
                fn put(&self, id: i64, done: Continuation<()>);
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
        let content = ReplicationEmitter
            .emit_dao(&ctx, &extraction.model.daos[0])
            .unwrap()
            .content;
        assert!(content.contains("let done = done . before_resume (move ||"));
        assert!(content.contains("Operation :: Upsert"));
        assert!(content.contains("self . inner . put (id , done)"));
    }

    #[test]
    fn query_operations() {
        let name = |query: &str| query_operation(query).map(|ident| ident.to_string());
        assert_eq!(name("replace into t values (1)").as_deref(), Some("Upsert"));
        assert_eq!(name("INSERT OR REPLACE INTO t(id) VALUES (1)").as_deref(), Some("Upsert"));
        assert_eq!(
            name("INSERT INTO t (id) VALUES ($1) ON CONFLICT (id) DO UPDATE SET id = $1")
                .as_deref(),
            Some("Upsert")
        );
        assert_eq!(name("INSERT INTO t VALUES (1)").as_deref(), Some("Insert"));
        assert_eq!(name("UPDATE t SET a = 1").as_deref(), Some("Update"));
        assert_eq!(name("DELETE FROM t").as_deref(), Some("Delete"));
        assert_eq!(name("SELECT * FROM t"), None);
        assert_eq!(name("PRAGMA user_version = 2"), None);
    }
}
