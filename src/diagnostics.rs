// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Diagnostic channel and the per-pass error tracker.
//!
//! A [`DiagnosticSink`] accepts `(severity, message, location)` triples. How
//! it prints or aggregates them is up to the implementation:
//!
//! | Sink | Behavior |
//! |------|----------|
//! | [`TracingSink`] | Forwards to `tracing` events |
//! | [`CollectingSink`] | Keeps every diagnostic in memory |
//! | [`DiagnosticTracker`] | Wraps another sink and latches an error flag |

use std::{
    fmt,
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicBool, Ordering}
    }
};

use crate::declaration::SourceLocation;

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Informational note.
    Info,
    /// Suspicious but accepted input.
    Warning,
    /// The pass cannot succeed.
    Error
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error"
        })
    }
}

/// One recorded diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Severity.
    pub severity: Severity,
    /// Message text.
    pub message:  String,
    /// Optional source location.
    pub location: Option<SourceLocation>
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{}: {} ({location})", self.severity, self.message),
            None => write!(f, "{}: {}", self.severity, self.message)
        }
    }
}

/// External diagnostic channel.
pub trait DiagnosticSink: Send + Sync {
    /// Report one diagnostic.
    fn report(&self, severity: Severity, message: &str, location: Option<&SourceLocation>);

    /// Report an informational note.
    fn info(&self, message: &str, location: Option<&SourceLocation>) {
        self.report(Severity::Info, message, location);
    }

    /// Report a warning.
    fn warn(&self, message: &str, location: Option<&SourceLocation>) {
        self.report(Severity::Warning, message, location);
    }

    /// Report an error.
    fn error(&self, message: &str, location: Option<&SourceLocation>) {
        self.report(Severity::Error, message, location);
    }
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for &S {
    fn report(&self, severity: Severity, message: &str, location: Option<&SourceLocation>) {
        (**self).report(severity, message, location);
    }

    fn info(&self, message: &str, location: Option<&SourceLocation>) {
        (**self).info(message, location);
    }

    fn warn(&self, message: &str, location: Option<&SourceLocation>) {
        (**self).warn(message, location);
    }

    fn error(&self, message: &str, location: Option<&SourceLocation>) {
        (**self).error(message, location);
    }
}

/// Sink that turns diagnostics into `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, severity: Severity, message: &str, location: Option<&SourceLocation>) {
        let location = location.map(ToString::to_string).unwrap_or_default();
        match severity {
            Severity::Info => tracing::info!(%location, "{message}"),
            Severity::Warning => tracing::warn!(%location, "{message}"),
            Severity::Error => tracing::error!(%location, "{message}")
        }
    }
}

/// Sink that stores every diagnostic.
#[derive(Debug, Default)]
pub struct CollectingSink {
    entries: Mutex<Vec<Diagnostic>>
}

impl CollectingSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all diagnostics in report order.
    #[must_use]
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Snapshot of error diagnostics.
    #[must_use]
    pub fn errors(&self) -> Vec<Diagnostic> {
        self.with_severity(Severity::Error)
    }

    /// Snapshot of warning diagnostics.
    #[must_use]
    pub fn warnings(&self) -> Vec<Diagnostic> {
        self.with_severity(Severity::Warning)
    }

    fn with_severity(&self, severity: Severity) -> Vec<Diagnostic> {
        self.diagnostics()
            .into_iter()
            .filter(|d| d.severity == severity)
            .collect()
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&self, severity: Severity, message: &str, location: Option<&SourceLocation>) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Diagnostic {
                severity,
                message: message.to_string(),
                location: location.cloned()
            });
    }
}

/// Decorator latching whether an error passed through during a pass.
///
/// Every call is forwarded to the wrapped sink unchanged. The flag starts
/// `false`, flips on the first error and is never reset; create one tracker
/// per pass.
#[derive(Debug)]
pub struct DiagnosticTracker<S> {
    inner:   S,
    errored: AtomicBool
}

impl<S: DiagnosticSink> DiagnosticTracker<S> {
    /// Wrap a sink.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            errored: AtomicBool::new(false)
        }
    }

    /// Whether any error-severity diagnostic was reported.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.errored.load(Ordering::Acquire)
    }

    /// Wrapped sink.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Unwrap the sink, dropping the flag.
    pub fn into_inner(self) -> S {
        self.inner
    }

    fn latch(&self, severity: Severity) {
        if severity == Severity::Error {
            self.errored.store(true, Ordering::Release);
        }
    }
}

impl<S: DiagnosticSink> DiagnosticSink for DiagnosticTracker<S> {
    fn report(&self, severity: Severity, message: &str, location: Option<&SourceLocation>) {
        self.latch(severity);
        self.inner.report(severity, message, location);
    }

    fn info(&self, message: &str, location: Option<&SourceLocation>) {
        self.inner.info(message, location);
    }

    fn warn(&self, message: &str, location: Option<&SourceLocation>) {
        self.inner.warn(message, location);
    }

    fn error(&self, message: &str, location: Option<&SourceLocation>) {
        self.latch(Severity::Error);
        self.inner.error(message, location);
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn tracker_starts_clean() {
        let tracker = DiagnosticTracker::new(CollectingSink::new());
        assert!(!tracker.has_errors());
    }

    #[test]
    fn tracker_ignores_warnings() {
        let tracker = DiagnosticTracker::new(CollectingSink::new());
        tracker.warn("duplicate role", None);
        tracker.info("note", None);
        assert!(!tracker.has_errors());
        assert_eq!(tracker.inner().diagnostics().len(), 2);
    }

    #[test]
    fn tracker_latches_first_error() {
        let tracker = DiagnosticTracker::new(CollectingSink::new());
        tracker.error("boom", Some(&SourceLocation::new("lib.rs", Some(1))));
        tracker.info("later", None);
        assert!(tracker.has_errors());

        let errors = tracker.inner().errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "boom");
        assert_eq!(errors[0].location, Some(SourceLocation::new("lib.rs", Some(1))));
    }

    #[test]
    fn tracker_latches_through_report() {
        let tracker = DiagnosticTracker::new(CollectingSink::new());
        tracker.report(Severity::Error, "direct", None);
        assert!(tracker.has_errors());
    }

    #[test]
    fn tracker_forwards_overridden_methods() {
        #[derive(Default)]
        struct Counting {
            errors: Mutex<usize>
        }

        impl DiagnosticSink for Counting {
            fn report(&self, _: Severity, _: &str, _: Option<&SourceLocation>) {}

            fn error(&self, _: &str, _: Option<&SourceLocation>) {
                *self.errors.lock().unwrap() += 1;
            }
        }

        let tracker = DiagnosticTracker::new(Counting::default());
        tracker.error("one", None);
        tracker.error("two", None);
        assert!(tracker.has_errors());
        assert_eq!(*tracker.inner().errors.lock().unwrap(), 2);
    }

    #[test]
    fn tracker_is_shared_across_threads() {
        let tracker = DiagnosticTracker::new(CollectingSink::new());
        thread::scope(|scope| {
            for i in 0..4 {
                let tracker = &tracker;
                scope.spawn(move || {
                    if i == 3 {
                        tracker.error("worker failed", None);
                    } else {
                        tracker.info("worker ok", None);
                    }
                });
            }
        });
        assert!(tracker.has_errors());
        assert_eq!(tracker.inner().diagnostics().len(), 4);
    }

    #[test]
    fn diagnostic_display() {
        let diagnostic = Diagnostic {
            severity: Severity::Warning,
            message:  "first match wins".to_string(),
            location: Some(SourceLocation::new("model.rs", Some(12)))
        };
        assert_eq!(diagnostic.to_string(), "warning: first match wins (model.rs:12)");
    }
}
