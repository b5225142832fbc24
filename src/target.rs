// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Compilation targets, database dialects and the fixed table binding them.
//!
//! # Target Table
//!
//! | Target | Dialects | Passes |
//! |--------|----------|--------|
//! | `Jvm` | Sqlite, Postgres | implementation, replication, HTTP endpoint |
//! | `Mobile` | Sqlite | implementation, replication |
//! | `Browser` | Sqlite | implementation, replication |
//!
//! The table is closed: adding a target means adding an enum variant and a
//! row here, never inferring support at runtime.

use std::{fmt, str::FromStr};

use darling::FromMeta;

use crate::error::ConfigError;

/// Runtime environment generated code is compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Target {
    /// JVM-like server/desktop runtime.
    Jvm,
    /// Mobile runtime.
    Mobile,
    /// Browser-like runtime (WebAssembly).
    Browser
}

/// Backing database engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dialect {
    /// Embedded SQL engine.
    ///
    /// - Placeholders: `?`
    /// - Upsert: `INSERT OR REPLACE`
    Sqlite,

    /// Server-grade relational engine.
    ///
    /// - Placeholders: `$1, $2, $3, ...`
    /// - Upsert: `INSERT ... ON CONFLICT DO UPDATE`
    Postgres
}

/// Generation pass an emitter belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenerationPass {
    /// Concrete DAO, schema and database implementations.
    Implementation,
    /// Replication wrappers around DAOs.
    Replication,
    /// HTTP endpoints exposing DAO operations.
    HttpEndpoint
}

const JVM_DIALECTS: &[Dialect] = &[Dialect::Sqlite, Dialect::Postgres];
const EMBEDDED_DIALECTS: &[Dialect] = &[Dialect::Sqlite];

const SERVER_PASSES: &[GenerationPass] = &[
    GenerationPass::Implementation,
    GenerationPass::Replication,
    GenerationPass::HttpEndpoint
];
const CLIENT_PASSES: &[GenerationPass] =
    &[GenerationPass::Implementation, GenerationPass::Replication];

impl Target {
    /// Every target, in table order.
    pub const ALL: [Self; 3] = [Self::Jvm, Self::Mobile, Self::Browser];

    /// Supported dialects, in table order. Never empty.
    #[must_use]
    pub fn dialects(self) -> &'static [Dialect] {
        match self {
            Self::Jvm => JVM_DIALECTS,
            Self::Mobile | Self::Browser => EMBEDDED_DIALECTS
        }
    }

    /// Generation passes that run for this target.
    #[must_use]
    pub fn passes(self) -> &'static [GenerationPass] {
        match self {
            Self::Jvm => SERVER_PASSES,
            Self::Mobile | Self::Browser => CLIENT_PASSES
        }
    }

    /// Check whether a pass runs for this target.
    #[must_use]
    pub fn runs(self, pass: GenerationPass) -> bool {
        self.passes().contains(&pass)
    }

    /// Primary dialect, used by per-target emitters.
    #[must_use]
    pub fn primary_dialect(self) -> Dialect {
        self.dialects()[0]
    }

    /// Whether generated code may block the calling thread.
    #[must_use]
    pub fn supports_blocking(self) -> bool {
        !matches!(self, Self::Browser)
    }

    /// Lowercase name, also the driver module and output directory.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Jvm => "jvm",
            Self::Mobile => "mobile",
            Self::Browser => "browser"
        }
    }

    /// Suffix used in generated type names.
    #[must_use]
    pub fn type_suffix(self) -> &'static str {
        match self {
            Self::Jvm => "Jvm",
            Self::Mobile => "Mobile",
            Self::Browser => "Browser"
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Target {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "jvm" => Ok(Self::Jvm),
            "mobile" | "android" => Ok(Self::Mobile),
            "browser" | "js" | "wasm" => Ok(Self::Browser),
            _ => Err(ConfigError::UnsupportedTarget(value.to_string()))
        }
    }
}

impl Dialect {
    /// Lowercase name, also the output directory.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Postgres => "postgres"
        }
    }

    /// Suffix used in generated type names.
    #[must_use]
    pub fn type_suffix(self) -> &'static str {
        match self {
            Self::Sqlite => "Sqlite",
            Self::Postgres => "Postgres"
        }
    }

    /// Connection type exported by each target driver module.
    #[must_use]
    pub fn connection_type(self) -> &'static str {
        match self {
            Self::Sqlite => "SqliteConnection",
            Self::Postgres => "PostgresConnection"
        }
    }

    /// Value passed to `db_type` parameters.
    #[must_use]
    pub fn discriminator(self) -> i32 {
        match self {
            Self::Sqlite => 1,
            Self::Postgres => 2
        }
    }

    /// Placeholder for the parameter at the given index (1-based).
    #[must_use]
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Self::Sqlite => "?".to_string(),
            Self::Postgres => format!("${index}")
        }
    }

    /// Comma-separated placeholders for `count` parameters.
    #[must_use]
    pub fn placeholders(self, count: usize) -> String {
        (1..=count)
            .map(|i| self.placeholder(i))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `SET` clause for an UPDATE, numbering placeholders from 1.
    #[must_use]
    pub fn set_clause(self, columns: &[&str]) -> String {
        columns
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{} = {}", c, self.placeholder(i + 1)))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromMeta for Dialect {
    fn from_string(value: &str) -> darling::Result<Self> {
        match value.to_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            _ => Err(darling::Error::unknown_value(value))
        }
    }
}

/// All (target, dialect) pairs for the given targets, in table order.
#[must_use]
pub fn pairs(targets: &[Target]) -> Vec<(Target, Dialect)> {
    targets
        .iter()
        .flat_map(|&target| target.dialects().iter().map(move |&d| (target, d)))
        .collect()
}
