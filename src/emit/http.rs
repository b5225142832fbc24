// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! HTTP endpoints for remote DAO access.
//!
//! Generates, per (target, dialect, DAO), one axum handler per operation and
//! a router mounting them. Only targets running the HTTP pass get them.
//!
//! # Generated Endpoint
//!
//! ```rust,ignore
//! #[derive(::serde::Deserialize)]
//! pub struct PersonDaoByNameRequest {
//!     pub name: String
//! }
//!
//! pub async fn person_dao_by_name<D>(
//!     State(dao): State<Arc<D>>,
//!     Json(request): Json<PersonDaoByNameRequest>
//! ) -> Json<Vec<Person>>
//! where
//!     D: crate::db::PersonDao + Send + Sync + 'static
//! {
//!     let value = ::replikit::spawn_blocking(move || {
//!         let PersonDaoByNameRequest { name } = request;
//!         let value = ::replikit::block_on(dao.by_name(&name));
//!         value
//!     })
//!     .await;
//!     Json(value)
//! }
//!
//! pub fn person_dao_router<D>() -> Router<Arc<D>> { ... }
//! ```
//!
//! # Wire Types
//!
//! Request fields are owned: `&str` becomes `String`, `&[T]` becomes
//! `Vec<T>`, `&T` becomes `T`. Responses carry the canonical result, so an
//! operation answers with the same body whatever its call style. `db_type`
//! parameters are not on the wire; the handler passes the dialect
//! discriminator.
//!
//! # Routes
//!
//! | Operation | Route |
//! |-----------|-------|
//! | `PersonDao::by_name` | `POST /PersonDao/byName` |

use convert_case::{Case, Casing};
use proc_macro2::{Literal, TokenStream};
use quote::quote;

use super::{
    EmitContext, EmitScope, Emitter, SourceUnit, UnitId, UnitKind, convert, joined_ident,
    module_glob
};
use crate::{
    declaration::{TypeArg, TypeRef},
    error::EmitCause,
    model::{DaoModel, OperationDescriptor, ParamModel, SuspendStyle},
    target::GenerationPass,
    utils::{marker, naming}
};

/// Emitter name used in diagnostics.
pub const NAME: &str = "http";

/// Generates axum handlers and routers.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpEmitter;

impl Emitter for HttpEmitter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn pass(&self) -> GenerationPass {
        GenerationPass::HttpEndpoint
    }

    fn scope(&self) -> EmitScope {
        EmitScope::PerDialect
    }

    fn emit_dao(&self, ctx: &EmitContext<'_>, dao: &DaoModel) -> Result<SourceUnit, EmitCause> {
        let tokens = endpoint(ctx, dao)?;
        Ok(SourceUnit {
            id:      UnitId {
                target:  ctx.target,
                dialect: Some(ctx.dialect),
                subject: dao.name.to_string(),
                kind:    UnitKind::HttpEndpoint
            },
            content: marker::with_header(&tokens)
        })
    }
}

/// Everything one operation's handler needs.
struct Operation<'a> {
    ctx:     &'a EmitContext<'a>,
    dao:     &'a DaoModel,
    op:      &'a OperationDescriptor,
    request: syn::Ident,
    handler: syn::Ident
}

fn endpoint(ctx: &EmitContext<'_>, dao: &DaoModel) -> Result<TokenStream, EmitCause> {
    let glob = module_glob(&dao.name)?;
    let dao_path = naming::crate_path(&dao.name)?;
    let dao_snake = dao.name.simple().to_case(Case::Snake);
    let router = naming::ident(&format!("{dao_snake}_router"))?;
    let marker = marker::generated();

    let mut items = Vec::with_capacity(dao.operations.len());
    let mut routes = Vec::with_capacity(dao.operations.len());

    for op in &dao.operations {
        let name = naming::column(&op.name);
        let pascal = name.to_case(Case::Pascal);
        let operation = Operation {
            ctx,
            dao,
            op,
            request: joined_ident(&dao.name, &[pascal.as_str(), "Request"])?,
            handler: naming::ident(&format!("{dao_snake}_{}", name.to_case(Case::Snake)))?
        };
        let request = operation.request_struct()?;
        let handler = operation.handler(&dao_path)?;
        items.push(quote! {
            #marker
            #request

            #marker
            #handler
        });

        let path = route_path(dao, op);
        let handler = &operation.handler;
        routes.push(quote! {
            .route(#path, ::axum::routing::post(#handler::<D>))
        });
    }

    let doc = format!(
        " Router serving every `{}` operation as `POST /{}/{{operation}}`.",
        dao.name.simple(),
        dao.name.simple()
    );

    Ok(quote! {
        #glob

        #(#items)*

        #marker
        #[doc = #doc]
        pub fn #router<D>() -> ::axum::Router<::std::sync::Arc<D>>
        where
            D: #dao_path + ::core::marker::Send + ::core::marker::Sync + 'static
        {
            ::axum::Router::new()
                #(#routes)*
        }
    })
}

/// Route of an operation: `/{DaoName}/{operationName}`.
#[must_use]
pub fn route_path(dao: &DaoModel, op: &OperationDescriptor) -> String {
    format!("/{}/{}", dao.name.simple(), naming::column(&op.name).to_case(Case::Camel))
}

impl Operation<'_> {
    fn wire_params(&self) -> impl Iterator<Item = &ParamModel> {
        self.op.params.iter().filter(|p| !p.db_type)
    }

    fn request_struct(&self) -> Result<TokenStream, EmitCause> {
        let request = &self.request;
        let fields = self
            .wire_params()
            .map(|p| {
                let name = naming::ident(&p.name)?;
                let ty = naming::ty(&wire_type(&p.ty))?;
                Ok(quote! { pub #name: #ty })
            })
            .collect::<Result<Vec<_>, EmitCause>>()?;
        let doc = format!(" Request body of `{}::{}`.", self.dao.name.simple(), self.op.name);

        Ok(quote! {
            #[doc = #doc]
            #[derive(::serde::Deserialize)]
            pub struct #request {
                #(#fields),*
            }
        })
    }

    fn handler(&self, dao_path: &syn::Path) -> Result<TokenStream, EmitCause> {
        let rt = self.ctx.runtime;
        let Self {
            request,
            handler,
            op,
            ..
        } = self;
        let method = naming::ident(&op.name)?;

        let fields = self
            .wire_params()
            .map(|p| naming::ident(&p.name))
            .collect::<Result<Vec<_>, _>>()?;
        let args = op
            .params
            .iter()
            .map(|p| self.argument(p))
            .collect::<Result<Vec<_>, _>>()?;

        let call = match &op.modifiers.suspend {
            SuspendStyle::Blocking => quote! { dao.#method(#(#args),*) },
            SuspendStyle::Async => quote! { #rt::block_on(dao.#method(#(#args),*)) },
            SuspendStyle::Continuation {
                ..
            } => quote! {
                {
                    let (cont, pending) = #rt::Continuation::channel();
                    dao.#method(#(#args,)* cont);
                    #rt::block_on(pending)
                }
            }
        };

        let declared = convert::declared_result(op);
        let value = convert::to_canonical(quote! { value }, &declared).map_err(|ty| {
            EmitCause::UnsupportedOperation {
                operation: op.name.clone(),
                reason:    format!("`{ty}` cannot be sent over HTTP")
            }
        })?;
        let response = naming::ty(&op.return_type)?;
        let doc = format!(" `POST {}`", route_path(self.dao, op));

        Ok(quote! {
            #[doc = #doc]
            pub async fn #handler<D>(
                ::axum::extract::State(dao): ::axum::extract::State<::std::sync::Arc<D>>,
                ::axum::Json(request): ::axum::Json<#request>
            ) -> ::axum::Json<#response>
            where
                D: #dao_path + ::core::marker::Send + ::core::marker::Sync + 'static
            {
                let value = #rt::spawn_blocking(move || {
                    let #request { #(#fields),* } = request;
                    let value = #call;
                    #value
                })
                .await;
                ::axum::Json(value)
            }
        })
    }

    /// Native argument built from a wire field.
    fn argument(&self, param: &ParamModel) -> Result<TokenStream, EmitCause> {
        if param.db_type {
            let discriminator = Literal::i32_unsuffixed(self.ctx.dialect.discriminator());
            return Ok(quote! { #discriminator });
        }

        let name = naming::ident(&param.name)?;
        let ty = &param.ty;
        let borrowed_option = ty.simple_name() == "Option"
            && ty.first_arg().is_some_and(|inner| inner.reference);

        Ok(if ty.reference {
            quote! { &#name }
        } else if borrowed_option {
            let inner = ty.first_arg().map(|inner| inner.name.as_str());
            if matches!(inner, Some("str" | "[]")) {
                quote! { #name.as_deref() }
            } else {
                quote! { #name.as_ref() }
            }
        } else {
            quote! { #name }
        })
    }
}

/// Owned counterpart of a parameter type.
#[must_use]
pub fn wire_type(ty: &TypeRef) -> TypeRef {
    let args: Vec<TypeArg> = ty
        .args
        .iter()
        .map(|arg| match arg.ty() {
            Some(inner) => TypeArg::Invariant(wire_type(inner)),
            None => arg.clone()
        })
        .collect();

    let owned = if ty.is_slice() {
        TypeRef {
            args,
            ..TypeRef::named("Vec")
        }
    } else if ty.name == "str" {
        TypeRef::named("String")
    } else {
        TypeRef {
            args,
            reference: false,
            ..ty.clone()
        }
    };

    TypeRef {
        nullable: ty.nullable,
        ..owned
    }
}
