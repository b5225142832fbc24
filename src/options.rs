// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Processor options.
//!
//! Build tools pass options as `key=value` strings:
//!
//! | Key | Value | Default |
//! |-----|-------|---------|
//! | `replikit.targets` | comma list of `jvm`, `mobile`, `browser` | all targets |
//! | `replikit.parallel` | `true` / `false` | `false` |
//! | `replikit.runtime_crate` | crate name used in generated paths | `replikit` |
//!
//! Unknown keys belong to other processors and are ignored.

use crate::{error::ConfigError, target::Target};

const KEY_TARGETS: &str = "replikit.targets";
const KEY_PARALLEL: &str = "replikit.parallel";
const KEY_RUNTIME: &str = "replikit.runtime_crate";

/// Configuration of one processor instance.
#[derive(Debug, Clone)]
pub struct ProcessorOptions {
    /// Targets to generate for, in table order, without duplicates.
    pub targets:  Vec<Target>,
    /// Emit targets on scoped worker threads.
    pub parallel: bool,
    /// Name of the runtime crate referenced by generated code.
    pub runtime:  String
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self {
            targets:  Target::ALL.to_vec(),
            parallel: false,
            runtime:  "replikit".to_string()
        }
    }
}

impl ProcessorOptions {
    /// Parse options from `key=value` arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a recognized key carries a value that
    /// cannot be parsed.
    pub fn from_args<I, S>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>
    {
        let mut options = Self::default();

        for arg in args {
            let arg = arg.as_ref();
            let Some((key, value)) = arg.split_once('=') else {
                continue;
            };
            let (key, value) = (key.trim(), value.trim());

            match key {
                KEY_TARGETS => options.targets = parse_targets(value)?,
                KEY_PARALLEL => options.parallel = parse_bool(key, value)?,
                KEY_RUNTIME => options.runtime = parse_runtime(key, value)?,
                _ => tracing::trace!(key, "ignoring foreign processor option")
            }
        }

        Ok(options)
    }

    /// Restrict generation to the given targets.
    #[must_use]
    pub fn with_targets(mut self, targets: impl IntoIterator<Item = Target>) -> Self {
        self.targets = normalize_targets(targets);
        self
    }

    /// Absolute path of the runtime crate (`::replikit`).
    ///
    /// Built on demand: token types are not `Send`, so every emitting thread
    /// creates its own.
    #[must_use]
    pub fn runtime_path(&self) -> syn::Path {
        let ident = syn::Ident::new(&self.runtime, proc_macro2::Span::call_site());
        syn::parse_quote!(::#ident)
    }

    /// Enable or disable parallel emission.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

fn parse_targets(value: &str) -> Result<Vec<Target>, ConfigError> {
    let targets = value
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(str::parse)
        .collect::<Result<Vec<Target>, _>>()?;

    if targets.is_empty() {
        return Err(ConfigError::InvalidValue {
            key:   KEY_TARGETS.to_string(),
            value: value.to_string()
        });
    }

    Ok(normalize_targets(targets))
}

fn normalize_targets(targets: impl IntoIterator<Item = Target>) -> Vec<Target> {
    let mut targets: Vec<Target> = targets.into_iter().collect();
    targets.sort();
    targets.dedup();
    targets
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key:   key.to_string(),
            value: value.to_string()
        })
    }
}

fn parse_runtime(key: &str, value: &str) -> Result<String, ConfigError> {
    let invalid = || ConfigError::InvalidValue {
        key:   key.to_string(),
        value: value.to_string()
    };

    let name = value.trim_start_matches("::");
    if name.starts_with("r#") {
        return Err(invalid());
    }
    let ident: syn::Ident = syn::parse_str(name).map_err(|_| invalid())?;
    Ok(ident.to_string())
}
