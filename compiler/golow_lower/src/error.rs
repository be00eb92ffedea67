//! Result of a lowering run.

use golow_diagnostic::Diagnostic;
use golow_tree::TreeModule;

/// Why a lowered module cannot be handed to the backend.
#[derive(Debug, thiserror::Error, Clone, Eq, PartialEq)]
pub enum EmitError {
    #[error("emission suppressed after {errors} lowering error(s)")]
    Suppressed { errors: usize },
}

/// Everything a lowering run produced.
///
/// The module is always returned, even when errors were reported, so
/// tools can inspect partial output; [`into_module`](Self::into_module)
/// is the gate the backend goes through.
pub struct LowerOutput {
    pub module: TreeModule,
    pub diagnostics: Vec<Diagnostic>,
    pub error_count: usize,
}

impl LowerOutput {
    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    /// Hand the module to the backend unless errors were reported.
    pub fn into_module(self) -> Result<TreeModule, EmitError> {
        if self.error_count > 0 {
            return Err(EmitError::Suppressed {
                errors: self.error_count,
            });
        }
        Ok(self.module)
    }
}
