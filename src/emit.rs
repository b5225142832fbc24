// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Code emitters and the units they produce.
//!
//! Every emitter turns the immutable [`Model`] into [`SourceUnit`]s for one
//! target at a time. Units are addressed by a [`UnitId`], which also decides
//! the relative output path:
//!
//! ```text
//! {target}/{dialect}/schema.rs                    implementation, shared
//! {target}/{dialect}/{database}.rs                implementation, shared
//! {target}/{dialect}/{dao}_impl.rs                implementation, per DAO
//! {target}/{dao}_replicate.rs                     replication, per DAO
//! {target}/{dialect}/{dao}_endpoint.rs            HTTP endpoint, per DAO
//! ```
//!
//! Units of one target and dialect are meant to be included as sibling
//! modules; they refer to each other through `super::`.
//!
//! # Emitters
//!
//! | Emitter | Pass | Scope |
//! |---------|------|-------|
//! | [`ImplementationEmitter`] | implementation | per dialect |
//! | [`ReplicationEmitter`] | replication | per target |
//! | [`HttpEmitter`] | HTTP endpoint | per dialect |
//!
//! A failing DAO yields one [`EmissionError`]; its siblings are unaffected.

mod convert;
pub mod http;
pub mod implementation;
pub mod replication;
mod signature;

use std::fmt;

use convert_case::{Case, Casing};
use proc_macro2::TokenStream;
use quote::{format_ident, quote};

pub use self::{
    http::HttpEmitter, implementation::ImplementationEmitter, replication::ReplicationEmitter
};
use crate::{
    declaration::{QualifiedName, SourceLocation},
    diagnostics::DiagnosticSink,
    error::{EmissionError, EmitCause},
    model::{DaoModel, Model},
    target::{Dialect, GenerationPass, Target, pairs},
    utils::naming
};

/// Code generator for one generation pass.
pub trait Emitter: Send + Sync {
    /// Short name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Pass the emitter belongs to.
    fn pass(&self) -> GenerationPass;

    /// Whether units differ per dialect.
    fn scope(&self) -> EmitScope;

    /// Generate the unit of one DAO.
    ///
    /// # Errors
    ///
    /// Returns the [`EmitCause`] when the DAO cannot be generated; the
    /// caller wraps it into an [`EmissionError`].
    fn emit_dao(&self, ctx: &EmitContext<'_>, dao: &DaoModel) -> Result<SourceUnit, EmitCause>;

    /// Units shared by every DAO of a (target, dialect) pair.
    fn emit_shared(&self, _ctx: &EmitContext<'_>) -> Vec<Result<SourceUnit, EmissionError>> {
        Vec::new()
    }
}

/// Granularity of an emitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitScope {
    /// One unit per (target, dialect, DAO).
    PerDialect,
    /// One unit per (target, DAO), generated with the primary dialect.
    PerTarget
}

/// Everything an emitter may read.
#[derive(Clone, Copy)]
pub struct EmitContext<'a> {
    /// Model of the pass.
    pub model:   &'a Model,
    /// Target being generated.
    pub target:  Target,
    /// Dialect being generated.
    pub dialect: Dialect,
    /// Path of the runtime crate (`::replikit`).
    pub runtime: &'a syn::Path
}

impl EmitContext<'_> {
    /// Connection type of the dialect driver for the target.
    pub fn connection(&self) -> TokenStream {
        let rt = self.runtime;
        let target = format_ident!("{}", self.target.name());
        let connection = format_ident!("{}", self.dialect.connection_type());
        quote! { #rt::driver::#target::#connection }
    }

    /// Wrap a cause into an error for a shared unit of this context.
    pub fn error(&self, emitter: &'static str, subject: &str, cause: EmitCause) -> EmissionError {
        EmissionError {
            emitter,
            subject: subject.to_string(),
            target: self.target,
            dialect: Some(self.dialect),
            cause
        }
    }
}

/// What a unit contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitKind {
    /// Concrete DAO implementation.
    DaoImpl,
    /// Table DDL and index metadata.
    Schema,
    /// Database struct.
    Database,
    /// Replication wrapper.
    Replication,
    /// HTTP handlers and router.
    HttpEndpoint
}

/// Identity of a generated unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnitId {
    /// Target the unit is compiled for.
    pub target:  Target,
    /// Dialect, absent for per-target units.
    pub dialect: Option<Dialect>,
    /// DAO or database path, or `schema`.
    pub subject: String,
    /// Unit content kind.
    pub kind:    UnitKind
}

impl UnitId {
    /// Module name of the unit.
    #[must_use]
    pub fn module(&self) -> String {
        module_name(self.kind, &self.subject)
    }

    /// Relative output path.
    #[must_use]
    pub fn path(&self) -> String {
        match self.dialect {
            Some(dialect) => {
                format!("{}/{}/{}.rs", self.target.name(), dialect.name(), self.module())
            }
            None => format!("{}/{}.rs", self.target.name(), self.module())
        }
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Module name for a unit kind and subject.
#[must_use]
pub fn module_name(kind: UnitKind, subject: &str) -> String {
    let snake = QualifiedName::new(subject).simple().to_case(Case::Snake);
    match kind {
        UnitKind::DaoImpl => format!("{snake}_impl"),
        UnitKind::Schema => "schema".to_string(),
        UnitKind::Database => snake,
        UnitKind::Replication => format!("{snake}_replicate"),
        UnitKind::HttpEndpoint => format!("{snake}_endpoint")
    }
}

/// One generated source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    /// Unit identity.
    pub id:      UnitId,
    /// Rendered Rust source, header included.
    pub content: String
}

impl SourceUnit {
    /// Relative output path.
    #[must_use]
    pub fn path(&self) -> String {
        self.id.path()
    }
}

/// Emitters run by default, in pass order.
#[must_use]
pub fn default_emitters() -> Vec<Box<dyn Emitter>> {
    vec![
        Box::new(ImplementationEmitter),
        Box::new(ReplicationEmitter),
        Box::new(HttpEmitter),
    ]
}

/// Units and failures of one target.
#[derive(Debug, Default)]
pub struct Emission {
    /// Units in emitter, dialect and DAO order.
    pub units:  Vec<SourceUnit>,
    /// Failed (target, dialect, subject) attempts.
    pub errors: Vec<EmissionError>
}

/// Run every emitter whose pass runs for `target`.
///
/// Failures are reported to `sink` with the location of the failing
/// declaration and collected; emission always continues with the next
/// subject.
pub fn emit_target(
    emitters: &[Box<dyn Emitter>],
    model: &Model,
    target: Target,
    runtime: &syn::Path,
    sink: &dyn DiagnosticSink
) -> Emission {
    let mut emission = Emission::default();

    for emitter in emitters.iter().filter(|e| target.runs(e.pass())) {
        let scope = emitter.scope();
        let runs = match scope {
            EmitScope::PerDialect => pairs(&[target]),
            EmitScope::PerTarget => vec![(target, target.primary_dialect())]
        };

        for (target, dialect) in runs {
            let ctx = EmitContext {
                model,
                target,
                dialect,
                runtime
            };

            for result in emitter.emit_shared(&ctx) {
                match result {
                    Ok(unit) => emission.push(unit),
                    Err(err) => {
                        let location = subject_location(model, &err.subject);
                        emission.fail(err, location, sink);
                    }
                }
            }

            for dao in &model.daos {
                match emitter.emit_dao(&ctx, dao) {
                    Ok(unit) => emission.push(unit),
                    Err(cause) => {
                        let err = EmissionError {
                            emitter: emitter.name(),
                            subject: dao.name.to_string(),
                            target,
                            dialect: (scope == EmitScope::PerDialect).then_some(dialect),
                            cause
                        };
                        emission.fail(err, dao.location.clone(), sink);
                    }
                }
            }
        }
    }

    emission
}

impl Emission {
    fn push(&mut self, unit: SourceUnit) {
        tracing::debug!(unit = %unit.id, "unit emitted");
        self.units.push(unit);
    }

    fn fail(
        &mut self,
        err: EmissionError,
        location: Option<SourceLocation>,
        sink: &dyn DiagnosticSink
    ) {
        sink.error(&err.to_string(), location.as_ref());
        self.errors.push(err);
    }
}

/// Location of the declaration a shared-unit error names.
fn subject_location(model: &Model, subject: &str) -> Option<SourceLocation> {
    let name = QualifiedName::new(subject);
    model
        .entity(&name)
        .and_then(|e| e.location.clone())
        .or_else(|| model.dao(&name).and_then(|d| d.location.clone()))
        .or_else(|| {
            model
                .databases
                .iter()
                .find(|db| db.name == name)
                .and_then(|db| db.location.clone())
        })
}

/// `use crate::module::*;` for the module declaring `name`.
///
/// Generated units live outside the user's modules; the glob brings the
/// types named in declared signatures into scope.
pub(crate) fn module_glob(name: &QualifiedName) -> Result<TokenStream, EmitCause> {
    let module = name
        .as_str()
        .rsplit_once("::")
        .map_or("crate".to_string(), |(module, _)| format!("crate::{module}"));
    let path: syn::Path =
        syn::parse_str(&module).map_err(|_| EmitCause::InvalidIdentifier(name.to_string()))?;
    Ok(quote! {
        #[allow(unused_imports)]
        use #path::*;
    })
}

/// Identifier made of a declaration's simple name and suffixes.
pub(crate) fn joined_ident(
    name: &QualifiedName,
    suffixes: &[&str]
) -> Result<syn::Ident, EmitCause> {
    naming::ident(&format!("{}{}", name.simple(), suffixes.concat()))
}
