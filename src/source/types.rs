// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! `syn::Type` to [`TypeRef`] conversion.
//!
//! | Rust type | Model |
//! |-----------|-------|
//! | `a::B<C, D>` | `name = "a::B"`, two invariant arguments |
//! | `&T` | `T` with `reference` set |
//! | `&'a T`, `a::B<'a, C>` | rendered text as `name` |
//! | `[T]` | `name = "[]"`, one argument |
//! | `()` | `name = "()"` |
//! | `_`, `mac!()` | not resolvable in this pass |
//! | anything else | rendered text as `name` |

use proc_macro2::{TokenStream, TokenTree};
use quote::ToTokens;
use syn::{GenericArgument, PathArguments, Type};

use crate::declaration::{TypeArg, TypeRef};

/// Convert a parsed type.
///
/// # Errors
///
/// Returns the rendered text of a type that cannot be resolved
/// without expanding macros or running inference.
pub fn type_ref(ty: &Type) -> Result<TypeRef, String> {
    match ty {
        Type::Path(path) if path.qself.is_none() => path_type(&path.path, ty),
        Type::Reference(reference) => {
            if reference.lifetime.is_some() || reference.mutability.is_some() {
                check_resolvable(&reference.elem)?;
                return Ok(rendered(ty));
            }
            Ok(type_ref(&reference.elem)?.by_ref())
        }
        Type::Slice(slice) => Ok(TypeRef::slice(type_ref(&slice.elem)?)),
        Type::Tuple(tuple) if tuple.elems.is_empty() => Ok(TypeRef::unit()),
        Type::Paren(inner) => type_ref(&inner.elem),
        Type::Group(inner) => type_ref(&inner.elem),
        Type::Infer(_) | Type::Macro(_) => Err(text(ty)),
        other => {
            check_resolvable(other)?;
            Ok(rendered(other))
        }
    }
}

fn path_type(path: &syn::Path, ty: &Type) -> Result<TypeRef, String> {
    let Some(last) = path.segments.last() else {
        return Ok(rendered(ty));
    };
    let leading_args = path
        .segments
        .iter()
        .rev()
        .skip(1)
        .any(|segment| !segment.arguments.is_none());
    if leading_args {
        check_resolvable(ty)?;
        return Ok(rendered(ty));
    }

    let name = path
        .segments
        .iter()
        .map(|segment| segment.ident.to_string())
        .collect::<Vec<_>>()
        .join("::");
    let name = if path.leading_colon.is_some() {
        format!("::{name}")
    } else {
        name
    };

    let args = match &last.arguments {
        PathArguments::None => Vec::new(),
        PathArguments::AngleBracketed(generics)
            if generics
                .args
                .iter()
                .any(|arg| matches!(arg, GenericArgument::Lifetime(_))) =>
        {
            check_resolvable(ty)?;
            return Ok(rendered(ty));
        }
        PathArguments::AngleBracketed(generics) => generics
            .args
            .iter()
            .map(|arg| match arg {
                GenericArgument::Type(inner) => type_ref(inner).map(TypeArg::Invariant),
                other => Ok(TypeArg::Invariant(TypeRef::named(text(other))))
            })
            .collect::<Result<Vec<_>, _>>()?,
        PathArguments::Parenthesized(_) => {
            check_resolvable(ty)?;
            return Ok(rendered(ty));
        }
    };

    Ok(TypeRef {
        args,
        ..TypeRef::named(name)
    })
}

/// Reject shapes containing `_` or a macro anywhere inside.
fn check_resolvable(ty: &Type) -> Result<(), String> {
    fn unresolvable(tokens: TokenStream) -> bool {
        tokens.into_iter().any(|token| match token {
            TokenTree::Ident(ident) => ident == "_",
            TokenTree::Punct(punct) => punct.as_char() == '!',
            TokenTree::Group(group) => unresolvable(group.stream()),
            TokenTree::Literal(_) => false
        })
    }

    if unresolvable(ty.to_token_stream()) {
        Err(text(ty))
    } else {
        Ok(())
    }
}

fn rendered(ty: &Type) -> TypeRef {
    TypeRef::named(text(ty))
}

fn text(tokens: &impl ToTokens) -> String {
    tokens.to_token_stream().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert(code: &str) -> Result<TypeRef, String> {
        type_ref(&syn::parse_str(code).unwrap())
    }

    #[test]
    fn generic_paths() {
        let ty = convert("std::vec::Vec<crate::models::Person>").unwrap();
        assert_eq!(ty.name, "std::vec::Vec");
        assert_eq!(ty.first_arg().unwrap().name, "crate::models::Person");
    }

    #[test]
    fn references_and_slices() {
        let ty = convert("&[Person]").unwrap();
        assert!(ty.reference);
        assert!(ty.is_slice());
        assert_eq!(ty.render(), "&[Person]");

        assert_eq!(convert("&str").unwrap(), TypeRef::named("str").by_ref());
    }

    #[test]
    fn lifetime_arguments_keep_text() {
        let ty = convert("Cow<'static, str>").unwrap();
        assert!(ty.args.is_empty());
        assert!(ty.render().contains("'static"));
        assert!(syn::parse_str::<Type>(&ty.render()).is_ok());

        let nested = convert("Vec<Cow<'static, str>>").unwrap();
        assert!(nested.first_arg().unwrap().render().contains("'static"));

        assert!(convert("Cow<'static, _>").is_err());
    }

    #[test]
    fn explicit_lifetime_reference_keeps_text() {
        let ty = convert("&'static str").unwrap();
        assert!(ty.args.is_empty());
        assert!(!ty.reference);
        assert!(syn::parse_str::<Type>(&ty.render()).is_ok());
    }

    #[test]
    fn unit_and_tuples() {
        assert!(convert("()").unwrap().is_unit());
        let tuple = convert("(i64, String)").unwrap();
        assert!(syn::parse_str::<Type>(&tuple.render()).is_ok());
    }

    #[test]
    fn leading_colon() {
        assert_eq!(convert("::std::string::String").unwrap().name, "::std::string::String");
    }

    #[test]
    fn unresolvable_shapes() {
        assert!(convert("_").is_err());
        assert!(convert("Vec<_>").is_err());
        assert!(convert("generated!()").is_err());
        assert!(convert("[generated!(); 4]").is_err());
    }
}
