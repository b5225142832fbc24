// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Processor orchestration.
//!
//! One [`Processor::process`] call handles one compilation pass:
//!
//! ```text
//! Collecting ──► Modeling ──► Emitting ──► Done(success)
//!                   │             │
//!                   └─────────────┴──────► Done(failure)
//! ```
//!
//! - Modeling errors end the pass without emitting anything.
//! - Emission errors fail the pass, but every unit that could be generated
//!   is still returned.
//! - Deferred declarations are handed back for the next pass; they never
//!   fail the current one.

use std::{collections::HashSet, fmt, panic, thread};

use crate::{
    declaration::{Declaration, DeclarationSource},
    diagnostics::{DiagnosticSink, DiagnosticTracker},
    emit::{self, Emission, Emitter, SourceUnit},
    error::{EmissionError, ModelError},
    model,
    options::ProcessorOptions,
    target::Target
};

/// Where a pass stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassState {
    /// Reading declarations from the source.
    Collecting,
    /// Building models.
    Modeling,
    /// Running emitters.
    Emitting,
    /// Finished.
    Done {
        /// No error diagnostic was reported.
        success: bool
    }
}

impl fmt::Display for PassState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Collecting => f.write_str("collecting"),
            Self::Modeling => f.write_str("modeling"),
            Self::Emitting => f.write_str("emitting"),
            Self::Done {
                success: true
            } => f.write_str("done"),
            Self::Done {
                success: false
            } => f.write_str("failed")
        }
    }
}

/// Everything one pass produced.
#[derive(Debug)]
pub struct PassOutcome {
    /// Final state, always [`PassState::Done`].
    pub state:           PassState,
    /// Generated units, deduplicated, in first-seen order.
    pub units:           Vec<SourceUnit>,
    /// Declarations to hand to the next pass.
    pub deferred:        Vec<Declaration>,
    /// Malformed declarations.
    pub model_errors:    Vec<ModelError>,
    /// Failed emission subjects.
    pub emission_errors: Vec<EmissionError>
}

impl PassOutcome {
    /// Check whether the pass succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.state, PassState::Done {
            success: true
        })
    }

    /// Unit by path, e.g. `jvm/sqlite/person_dao_impl.rs`.
    #[must_use]
    pub fn unit(&self, path: &str) -> Option<&SourceUnit> {
        self.units.iter().find(|u| u.path() == path)
    }
}

/// Runs modeling and emission for every configured target.
pub struct Processor<S> {
    options:  ProcessorOptions,
    sink:     S,
    emitters: Vec<Box<dyn Emitter>>
}

impl<S: DiagnosticSink> Processor<S> {
    /// Processor with the default emitters.
    pub fn new(options: ProcessorOptions, sink: S) -> Self {
        Self::with_emitters(options, sink, emit::default_emitters())
    }

    /// Processor with a custom, ordered emitter list.
    pub fn with_emitters(
        options: ProcessorOptions,
        sink: S,
        emitters: Vec<Box<dyn Emitter>>
    ) -> Self {
        Self {
            options,
            sink,
            emitters
        }
    }

    /// Options in effect.
    pub fn options(&self) -> &ProcessorOptions {
        &self.options
    }

    /// Sink receiving diagnostics.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Run one pass over the declarations of `source`.
    pub fn process(&self, source: &dyn DeclarationSource) -> PassOutcome {
        let tracker = DiagnosticTracker::new(&self.sink);
        let mut state = PassState::Collecting;
        tracing::debug!(%state, targets = self.options.targets.len(), "pass started");

        advance(&mut state, PassState::Modeling);
        let extraction = model::extract_all(source, &tracker);
        tracing::debug!(
            entities = extraction.model.entities.len(),
            daos = extraction.model.daos.len(),
            databases = extraction.model.databases.len(),
            deferred = extraction.deferred.len(),
            errors = extraction.errors.len(),
            "models built"
        );

        if !extraction.is_valid() || tracker.has_errors() {
            advance(&mut state, PassState::Done {
                success: false
            });
            return PassOutcome {
                state,
                units: Vec::new(),
                deferred: extraction.deferred,
                model_errors: extraction.errors,
                emission_errors: Vec::new()
            };
        }

        advance(&mut state, PassState::Emitting);
        let emissions = if self.options.parallel {
            self.emit_parallel(&extraction.model, &tracker)
        } else {
            let runtime = self.options.runtime_path();
            self.options
                .targets
                .iter()
                .map(|&target| {
                    emit::emit_target(&self.emitters, &extraction.model, target, &runtime, &tracker)
                })
                .collect()
        };

        let mut seen = HashSet::new();
        let mut units = Vec::new();
        let mut emission_errors = Vec::new();
        for emission in emissions {
            for unit in emission.units {
                if seen.insert(unit.id.clone()) {
                    units.push(unit);
                } else {
                    tracing::debug!(unit = %unit.id, "dropping duplicate unit");
                }
            }
            emission_errors.extend(emission.errors);
        }

        let success = emission_errors.is_empty() && !tracker.has_errors();
        advance(&mut state, PassState::Done {
            success
        });
        tracing::debug!(units = units.len(), failures = emission_errors.len(), "pass finished");

        PassOutcome {
            state,
            units,
            deferred: extraction.deferred,
            model_errors: Vec::new(),
            emission_errors
        }
    }

    /// One scoped thread per target, joined in target order.
    fn emit_parallel(
        &self,
        model: &model::Model,
        sink: &(dyn DiagnosticSink + '_)
    ) -> Vec<Emission> {
        let emitters = &self.emitters;
        let options = &self.options;

        thread::scope(|scope| {
            let handles: Vec<_> = options
                .targets
                .iter()
                .map(|&target: &Target| {
                    scope.spawn(move || {
                        let runtime = options.runtime_path();
                        emit::emit_target(emitters, model, target, &runtime, sink)
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|handle| handle.join().unwrap_or_else(|payload| panic::resume_unwind(payload)))
                .collect()
        })
    }
}

impl<S: fmt::Debug> fmt::Debug for Processor<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Processor")
            .field("options", &self.options)
            .field("sink", &self.sink)
            .field("emitters", &self.emitters.iter().map(|e| e.name()).collect::<Vec<_>>())
            .finish()
    }
}

fn advance(state: &mut PassState, next: PassState) {
    tracing::debug!(from = %state, to = %next, "pass state");
    *state = next;
}
