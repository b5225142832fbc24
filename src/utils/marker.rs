// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Generated code markers.
//!
//! Every source unit starts with [`HEADER`], and every generated item carries
//! [`generated`] so lints aimed at hand-written code stay quiet.

use proc_macro2::TokenStream;
use quote::quote;

/// First line of every generated source unit.
pub const HEADER: &str = "// @generated by replikit-codegen. Do not edit.";

/// Attribute placed on generated items.
pub fn generated() -> TokenStream {
    quote! {
        #[allow(clippy::all, unused_qualifications, unused_mut, unused_variables)]
    }
}

/// Prefix rendered tokens with the generated-file header.
pub fn with_header(tokens: &TokenStream) -> String {
    format!("{HEADER}\n{tokens}\n")
}
