//! Diagnostic queue and error accounting.
//!
//! Diagnostics are kept in report order: lowering walks declarations in
//! source order, so report order is already the order users expect. The
//! error count is the single source of truth for "did this compilation
//! fail", and is what gates emission of the lowered module.

use crate::{Diagnostic, ErrorCode, ErrorGuaranteed};

#[derive(Clone, Debug, Default)]
pub struct DiagnosticQueue {
    diagnostics: Vec<Diagnostic>,
    error_count: usize,
}

impl DiagnosticQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic. Errors increment the error count.
    pub fn add(&mut self, diag: Diagnostic) {
        if diag.is_error() {
            self.error_count += 1;
        }
        self.diagnostics.push(diag);
    }

    /// Record an error and get proof it was emitted.
    ///
    /// Warnings passed here are promoted to errors so the proof holds.
    pub fn emit_error(&mut self, mut diag: Diagnostic) -> ErrorGuaranteed {
        diag.severity = crate::Severity::Error;
        self.add(diag);
        ErrorGuaranteed::new()
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn has_errors(&self) -> Option<ErrorGuaranteed> {
        (self.error_count > 0).then(ErrorGuaranteed::new)
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    /// Number of recorded diagnostics carrying `code`.
    pub fn count_code(&self, code: ErrorCode) -> usize {
        self.diagnostics.iter().filter(|d| d.code == code).count()
    }

    /// Take all diagnostics, leaving the error count in place.
    pub fn take(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }
}
