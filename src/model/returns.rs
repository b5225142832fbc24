// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Suspend and return-type normalization.
//!
//! An operation can produce its result three ways:
//!
//! | Style | Declared as | Logical result |
//! |-------|-------------|----------------|
//! | Blocking | `fn find(&self) -> Vec<Person>` | `Vec<Person>` |
//! | Async | `async fn find(&self) -> Vec<Person>` | `Vec<Person>` |
//! | Continuation | `fn find(&self, cont: Continuation<Vec<Person>>)` | `Vec<Person>` |
//!
//! [`canonical_return_type`] recovers the logical result, and [`normalize`]
//! brings it into one canonical shape so emitters never care how it was
//! spelled:
//!
//! - covariant projections become invariant
//! - `Box<T>`, `Rc<T>` and `Arc<T>` become `T`
//! - `Option<T>` becomes `T` marked nullable
//! - platform aliases (`std::vec::Vec`, `c_int`, `jni::sys::jlong`,
//!   `js_sys::JsString`) become their cross-platform names

use crate::{
    declaration::{MethodSignature, Param, TypeArg, TypeRef},
    model::predicates
};

/// Pointer-like carriers dropped by normalization.
const BOXES: &[&str] = &["Box", "Rc", "Arc"];

/// Canonical name of a platform alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alias {
    /// Cross-platform name.
    pub canonical: &'static str,
    /// The alias is a distinct type, converted with `Into`.
    pub nominal:   bool
}

const fn same(canonical: &'static str) -> Option<Alias> {
    Some(Alias {
        canonical,
        nominal: false
    })
}

const fn wrapper(canonical: &'static str) -> Option<Alias> {
    Some(Alias {
        canonical,
        nominal: true
    })
}

/// Look up a platform alias.
#[must_use]
pub fn alias(name: &str) -> Option<Alias> {
    let name = name.strip_prefix("::").unwrap_or(name);

    if let Some(found) = jvm_alias(name) {
        return found;
    }
    if let Some(rest) = name.strip_prefix("js_sys::") {
        return match rest {
            "JsString" => wrapper("String"),
            "Number" => wrapper("f64"),
            "Boolean" => wrapper("bool"),
            "BigInt" => wrapper("i64"),
            _ => None
        };
    }

    let rest = ["std::", "core::", "alloc::"]
        .iter()
        .find_map(|root| name.strip_prefix(root))?;

    if let Some(primitive) = rest.strip_prefix("primitive::") {
        return PRIMITIVES.iter().copied().find(|p| *p == primitive).and_then(same);
    }
    if let Some(c) = rest
        .strip_prefix("os::raw::")
        .or_else(|| rest.strip_prefix("ffi::"))
    {
        return c_alias(c);
    }

    match rest {
        "vec::Vec" => same("Vec"),
        "string::String" => same("String"),
        "boxed::Box" => same("Box"),
        "rc::Rc" => same("Rc"),
        "sync::Arc" => same("Arc"),
        "option::Option" => same("Option"),
        "collections::HashMap" => same("HashMap"),
        "collections::HashSet" => same("HashSet"),
        "collections::BTreeMap" => same("BTreeMap"),
        "collections::BTreeSet" => same("BTreeSet"),
        _ => None
    }
}

fn jvm_alias(name: &str) -> Option<Option<Alias>> {
    let short = name.strip_prefix("jni::sys::").unwrap_or(name);
    let canonical = match short {
        "jboolean" => "bool",
        "jbyte" => "i8",
        "jchar" => "u16",
        "jshort" => "i16",
        "jint" => "i32",
        "jlong" => "i64",
        "jfloat" => "f32",
        "jdouble" => "f64",
        "jsize" => "i32",
        _ => return None
    };
    Some(same(canonical))
}

fn c_alias(name: &str) -> Option<Alias> {
    match name {
        "c_char" | "c_schar" => same("i8"),
        "c_uchar" => same("u8"),
        "c_short" => same("i16"),
        "c_ushort" => same("u16"),
        "c_int" => same("i32"),
        "c_uint" => same("u32"),
        "c_long" | "c_longlong" => same("i64"),
        "c_ulong" | "c_ulonglong" => same("u64"),
        "c_float" => same("f32"),
        "c_double" => same("f64"),
        _ => None
    }
}

const PRIMITIVES: &[&str] = &[
    "bool", "char", "str", "i8", "i16", "i32", "i64", "i128", "isize", "u8", "u16", "u32",
    "u64", "u128", "usize", "f32", "f64"
];

const INTEGERS: &[&str] = &[
    "i8", "i16", "i32", "i64", "i128", "isize", "u8", "u16", "u32", "u64", "u128", "usize"
];

/// Check for a non-nullable integer primitive.
#[must_use]
pub fn is_integer(ty: &TypeRef) -> bool {
    !ty.nullable && !ty.reference && ty.args.is_empty() && INTEGERS.contains(&ty.name.as_str())
}

/// Bring a type into canonical shape. Idempotent.
#[must_use]
pub fn normalize(ty: &TypeRef) -> TypeRef {
    let name = alias(&ty.name).map_or_else(|| ty.name.clone(), |a| a.canonical.to_string());
    let args: Vec<TypeArg> = ty.args.iter().map(normalize_arg).collect();

    let single = match args.as_slice() {
        [TypeArg::Invariant(inner)] => Some(inner),
        _ => None
    };

    if let Some(inner) = single {
        if BOXES.contains(&name.as_str()) {
            let mut unboxed = inner.clone();
            unboxed.reference |= ty.reference;
            unboxed.nullable |= ty.nullable;
            return unboxed;
        }
        if name == "Option" {
            let mut unwrapped = inner.clone();
            unwrapped.reference |= ty.reference;
            unwrapped.nullable = true;
            return unwrapped;
        }
    }

    TypeRef {
        name,
        args,
        nullable: ty.nullable,
        reference: ty.reference
    }
}

fn normalize_arg(arg: &TypeArg) -> TypeArg {
    match arg {
        TypeArg::Invariant(ty) | TypeArg::Covariant(ty) => TypeArg::Invariant(normalize(ty)),
        TypeArg::Contravariant(ty) => TypeArg::Contravariant(normalize(ty)),
        TypeArg::Star => TypeArg::Star
    }
}

/// The continuation parameter of a signature, if it has one.
#[must_use]
pub fn continuation_param(signature: &MethodSignature) -> Option<&Param> {
    signature
        .params
        .last()
        .filter(|param| predicates::is_continuation(&param.ty))
}

/// Parameters the caller supplies, continuation excluded.
#[must_use]
pub fn logical_params(signature: &MethodSignature) -> &[Param] {
    match continuation_param(signature) {
        Some(_) => &signature.params[..signature.params.len() - 1],
        None => &signature.params
    }
}

/// Logical result of a signature, normalized.
///
/// Exactly one branch applies: the continuation's type argument when the
/// last parameter is a continuation carrier, the declared return otherwise.
#[must_use]
pub fn canonical_return_type(signature: &MethodSignature) -> TypeRef {
    let logical = match continuation_param(signature).and_then(|p| p.ty.first_arg()) {
        Some(carried) => carried.clone(),
        None => signature.returns.clone().unwrap_or_else(TypeRef::unit)
    };
    normalize(&logical)
}
