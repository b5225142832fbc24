// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Conversions between declared and canonical values.
//!
//! Generated code computes values in their canonical shape (what
//! [`normalize`](crate::model::returns::normalize) describes) and converts at
//! the edges:
//!
//! | Declared | Canonical to declared | Declared to canonical |
//! |----------|-----------------------|-----------------------|
//! | `Box<T>` | `Box::new(v)` | `*v` |
//! | `Rc<T>` / `Arc<T>` | `Rc::new(v)` | `Rc::unwrap_or_clone(v)` |
//! | `Option<T>` | `v.map(..)` | `v.map(..)` |
//! | `Vec<T>` | `v.into_iter().map(..).collect()` | same |
//! | nominal alias (`js_sys::JsString`) | `Into::into(v)` | `Into::into(v)` |
//!
//! Conversions nest; a layer needing no conversion is emitted as-is.

use proc_macro2::TokenStream;
use quote::quote;

use crate::{
    declaration::TypeRef,
    model::{OperationDescriptor, SuspendStyle, returns::alias}
};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Direction {
    ToDeclared,
    ToCanonical
}

/// Convert a canonical value into the declared type.
///
/// # Errors
///
/// Returns the rendered type when it has no conversion (references, or
/// generic containers other than `Vec`/`Option` whose arguments change).
pub fn to_declared(value: TokenStream, declared: &TypeRef) -> Result<TokenStream, String> {
    Ok(walk(value.clone(), declared, Direction::ToDeclared)?.unwrap_or(value))
}

/// Convert a declared value into its canonical type.
///
/// # Errors
///
/// Same as [`to_declared`].
pub fn to_canonical(value: TokenStream, declared: &TypeRef) -> Result<TokenStream, String> {
    Ok(walk(value.clone(), declared, Direction::ToCanonical)?.unwrap_or(value))
}

/// Declared type of an operation's logical result: the continuation's
/// argument, else the return type, else `()`.
#[must_use]
pub fn declared_result(op: &OperationDescriptor) -> TypeRef {
    match &op.modifiers.suspend {
        SuspendStyle::Continuation {
            ..
        } => op.modifiers.suspend.carried().cloned(),
        SuspendStyle::Blocking | SuspendStyle::Async => op.declared_return.clone()
    }
    .unwrap_or_else(TypeRef::unit)
}

/// `None` when the value already has the target shape.
fn walk(
    value: TokenStream,
    declared: &TypeRef,
    direction: Direction
) -> Result<Option<TokenStream>, String> {
    if declared.reference {
        return Err(declared.render());
    }

    let found = alias(&declared.name);
    let name = found.map_or(declared.name.as_str(), |a| a.canonical);
    let inner = match declared.args.as_slice() {
        [arg] => arg.ty(),
        _ => None
    };

    let converted = match (name, inner) {
        ("Box" | "Rc" | "Arc", Some(inner)) => {
            let carrier = carrier(name);
            let converted = match direction {
                Direction::ToDeclared => {
                    let value = to_shape(value, inner, direction)?;
                    quote! { #carrier::new(#value) }
                }
                Direction::ToCanonical => {
                    let unwrapped = if name == "Box" {
                        quote! { (*#value) }
                    } else {
                        quote! { #carrier::unwrap_or_clone(#value) }
                    };
                    to_shape(unwrapped, inner, direction)?
                }
            };
            Some(converted)
        }
        ("Option", Some(inner)) => walk(quote! { v }, inner, direction)?
            .map(|body| quote! { #value.map(|v| #body) }),
        ("Vec", Some(inner)) => walk(quote! { v }, inner, direction)?.map(|body| {
            quote! { #value.into_iter().map(|v| #body).collect::<::std::vec::Vec<_>>() }
        }),
        _ if found.is_some_and(|a| a.nominal) => {
            Some(quote! { ::core::convert::Into::into(#value) })
        }
        _ => {
            for arg in declared.args.iter().filter_map(|arg| arg.ty()) {
                if walk(TokenStream::new(), arg, direction)?.is_some() {
                    return Err(declared.render());
                }
            }
            None
        }
    };

    Ok(converted)
}

fn to_shape(
    value: TokenStream,
    declared: &TypeRef,
    direction: Direction
) -> Result<TokenStream, String> {
    Ok(walk(value.clone(), declared, direction)?.unwrap_or(value))
}

fn carrier(name: &str) -> TokenStream {
    match name {
        "Rc" => quote! { ::std::rc::Rc },
        "Arc" => quote! { ::std::sync::Arc },
        _ => quote! { ::std::boxed::Box }
    }
}
