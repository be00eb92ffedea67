//! Error codes for lowering diagnostics.

use std::fmt;

/// Error codes for all lowering diagnostics.
///
/// Format: E#### where the first digit indicates the phase:
/// - E3xxx: lowering errors
/// - E9xxx: internal compiler errors
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ErrorCode {
    /// Reference to a type that was declared but never defined
    E3001,
    /// Global initializers depend on each other
    E3002,
    /// Global initializer reads the variable it initializes
    E3003,
    /// Method excluded from a method table by a promotion conflict
    E3004,
    /// Subtree could not be lowered
    E3005,
    /// Concrete type lacks a method its interface table needs
    E3006,
    /// Internal lowering invariant violated
    E9001,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::E3001 => "E3001",
            ErrorCode::E3002 => "E3002",
            ErrorCode::E3003 => "E3003",
            ErrorCode::E3004 => "E3004",
            ErrorCode::E3005 => "E3005",
            ErrorCode::E3006 => "E3006",
            ErrorCode::E9001 => "E9001",
        }
    }

    /// One-line summary used when a diagnostic carries no message.
    pub fn summary(self) -> &'static str {
        match self {
            ErrorCode::E3001 => "reference to undefined type",
            ErrorCode::E3002 => "initialization loop",
            ErrorCode::E3003 => "variable initializer depends upon itself",
            ErrorCode::E3004 => "ambiguous method excluded from method table",
            ErrorCode::E3005 => "cannot lower expression",
            ErrorCode::E3006 => "missing method for interface table",
            ErrorCode::E9001 => "internal lowering error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
