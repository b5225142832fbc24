// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! # replikit-codegen
//!
//! Compile-time code generation for portable, replicated persistence layers.
//!
//! Annotated entities, DAO traits and database declarations are turned into
//! concrete implementations for three runtime targets and two SQL dialects,
//! plus replication wrappers and HTTP endpoints.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use replikit_codegen::{ProcessorOptions, SynSource, process};
//!
//! let source = SynSource::parse("src/db.rs", "db", r#"
//!     #[entity(table = "people")]
//!     pub struct Person {
//!         #[primary_key(auto_generate)]
//!         pub id: i64,
//!         pub name: String,
//!     }
//!
//!     #[dao]
//!     pub trait PersonDao {
//!         #[query("SELECT * FROM people WHERE name = :name")]
//!         async fn by_name(&self, name: &str) -> Vec<Person>;
//!
//!         #[insert]
//!         fn add(&self, person: &Person) -> i64;
//!     }
//! "#)?;
//!
//! let outcome = process(&source, ProcessorOptions::default());
//! for unit in &outcome.units {
//!     std::fs::write(out_dir.join(unit.path()), &unit.content)?;
//! }
//! ```
//!
//! ## Targets
//!
//! | Target | Dialects | Passes |
//! |--------|----------|--------|
//! | `jvm` | SQLite, PostgreSQL | implementation, replication, HTTP endpoint |
//! | `mobile` | SQLite | implementation, replication |
//! | `browser` | SQLite | implementation, replication |
//!
//! ## Modules
//!
//! - [`declaration`] - What a declaration source hands out
//! - [`source`] - Declarations read from Rust source with `syn`
//! - [`model`] - Entity, DAO and database models
//! - [`target`] - Targets, dialects and passes
//! - [`emit`] - Emitters and generated units
//! - [`processor`] - Pass orchestration
//! - [`diagnostics`] - Diagnostic sinks and the error tracker
//! - [`options`] - Processor options

pub mod declaration;
pub mod diagnostics;
pub mod emit;
pub mod error;
pub mod model;
pub mod options;
pub mod processor;
pub mod source;
pub mod target;
mod utils;

pub use self::{
    declaration::{DeclarationSource, QualifiedName, SourceLocation, TypeRef},
    diagnostics::{CollectingSink, DiagnosticSink, DiagnosticTracker, Severity, TracingSink},
    emit::{Emitter, SourceUnit, UnitId, UnitKind},
    error::{ConfigError, EmissionError, EmitCause, ModelError, SourceError},
    options::ProcessorOptions,
    processor::{PassOutcome, PassState, Processor},
    source::SynSource,
    target::{Dialect, GenerationPass, Target}
};

/// Run one pass with the default emitters, reporting through `tracing`.
pub fn process(source: &dyn DeclarationSource, options: ProcessorOptions) -> PassOutcome {
    Processor::new(options, TracingSink).process(source)
}
