//! Diagnostics for the lowering stage.
//!
//! Lowering never aborts on a bad declaration: it reports a [`Diagnostic`]
//! into a [`DiagnosticQueue`], substitutes an error sentinel, and moves on
//! to the next symbol. The queue's error count doubles as the compilation's
//! error counter; once non-zero, final emission is suppressed.
//!
//! # Error Guarantees
//!
//! [`ErrorGuaranteed`] can only be obtained from
//! [`DiagnosticQueue::emit_error`], so a function returning it proves an
//! error reached the user.

mod diagnostic;
mod error_code;
mod guarantee;
pub mod queue;

pub use diagnostic::{Diagnostic, Label, Severity};
pub use error_code::ErrorCode;
pub use guarantee::ErrorGuaranteed;
pub use queue::DiagnosticQueue;
