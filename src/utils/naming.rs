// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Turning model names back into Rust syntax.
//!
//! Models keep names and types as text; emitters re-parse them here so an
//! unusable name surfaces as an [`EmitCause`] for one unit instead of a panic.

use proc_macro2::TokenStream;

use crate::{
    declaration::{QualifiedName, TypeRef},
    error::EmitCause
};

/// Parse an identifier, raw identifiers included.
pub fn ident(name: &str) -> Result<syn::Ident, EmitCause> {
    syn::parse_str(name).map_err(|_| EmitCause::InvalidIdentifier(name.to_string()))
}

/// Parse a type from its model description.
pub fn ty(ty: &TypeRef) -> Result<syn::Type, EmitCause> {
    let rendered = ty.render();
    syn::parse_str(&rendered).map_err(|_| EmitCause::InvalidType(rendered))
}

/// Crate-relative path of a declaration (`crate::models::Person`).
pub fn crate_path(name: &QualifiedName) -> Result<syn::Path, EmitCause> {
    let text = format!("crate::{}", name.as_str());
    syn::parse_str(&text).map_err(|_| EmitCause::InvalidIdentifier(name.to_string()))
}

/// Tokenize a passthrough attribute (`#[...]` text).
pub fn attribute(text: &str) -> Result<TokenStream, EmitCause> {
    text.parse::<TokenStream>()
        .map_err(|_| EmitCause::InvalidAttribute(text.to_string()))
}

/// Column name of a field, without the raw identifier prefix.
pub fn column(field: &str) -> &str {
    field.strip_prefix("r#").unwrap_or(field)
}

#[cfg(test)]
mod tests {
    use quote::quote;

    use super::*;

    #[test]
    fn raw_identifiers_parse() {
        let parsed = ident("r#type").unwrap();
        assert_eq!(parsed.to_string(), "r#type");
        assert_eq!(column("r#type"), "type");
        assert_eq!(column("email"), "email");
    }

    #[test]
    fn invalid_identifier_is_an_emit_cause() {
        assert_eq!(
            ident("Person Dao"),
            Err(EmitCause::InvalidIdentifier("Person Dao".to_string()))
        );
    }

    #[test]
    fn types_round_trip_through_syn() {
        let model = TypeRef::slice(TypeRef::named("Person")).by_ref();
        let parsed = ty(&model).unwrap();
        assert_eq!(quote!(#parsed).to_string(), "& [Person]");
    }

    #[test]
    fn crate_paths() {
        let path = crate_path(&QualifiedName::new("models::Person")).unwrap();
        assert_eq!(quote!(#path).to_string(), "crate :: models :: Person");
    }
}
