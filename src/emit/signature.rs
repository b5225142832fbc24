// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Trait method signatures reproduced in generated impls.
//!
//! Persistence markers are dropped, passthrough attributes are kept, and the
//! continuation parameter is spelled through the runtime crate so the impl
//! does not depend on the DAO module's private imports.

use proc_macro2::TokenStream;
use quote::quote;

use crate::{
    error::EmitCause,
    model::{OperationDescriptor, SuspendStyle, predicates},
    utils::naming
};

/// Parsed pieces of an operation signature.
pub struct Signature {
    /// Attributes and `fn` header, without body.
    pub header: TokenStream,
    /// Logical parameter bindings, in order.
    pub args:   Vec<syn::Ident>,
    /// Continuation binding, for continuation-style operations.
    pub cont:   Option<syn::Ident>
}

impl Signature {
    /// Arguments to forward the call unchanged, continuation included.
    pub fn forward(&self) -> TokenStream {
        let args = &self.args;
        match &self.cont {
            Some(cont) => quote! { #(#args,)* #cont },
            None => quote! { #(#args),* }
        }
    }
}

/// Build the signature of an operation.
pub fn signature(op: &OperationDescriptor, runtime: &syn::Path) -> Result<Signature, EmitCause> {
    let name = naming::ident(&op.name)?;
    let attrs = predicates::passthrough(&op.annotations)
        .map(naming::attribute)
        .collect::<Result<Vec<_>, _>>()?;

    let args = op
        .params
        .iter()
        .map(|p| naming::ident(&p.name))
        .collect::<Result<Vec<_>, _>>()?;
    let types = op
        .params
        .iter()
        .map(|p| naming::ty(&p.ty))
        .collect::<Result<Vec<_>, _>>()?;

    let (cont, cont_param) = match &op.modifiers.suspend {
        SuspendStyle::Continuation {
            param, ..
        } => {
            let ident = naming::ident(param)?;
            let carried = op
                .modifiers
                .suspend
                .carried()
                .map(naming::ty)
                .transpose()?
                .ok_or_else(|| EmitCause::InvalidType(param.clone()))?;
            let tokens = quote! { , #ident: #runtime::Continuation<#carried> };
            (Some(ident), tokens)
        }
        SuspendStyle::Blocking | SuspendStyle::Async => (None, TokenStream::new())
    };

    let asyncness = matches!(op.modifiers.suspend, SuspendStyle::Async).then(|| quote! { async });
    let output = op
        .declared_return
        .as_ref()
        .map(naming::ty)
        .transpose()?
        .map(|ty| quote! { -> #ty });

    let header = quote! {
        #(#attrs)*
        #asyncness fn #name(&self #(, #args: #types)* #cont_param) #output
    };

    Ok(Signature {
        header,
        args,
        cont
    })
}
