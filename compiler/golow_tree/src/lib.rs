//! Generic tree IR produced by lowering.
//!
//! The output of the lowering stage is a [`TreeModule`]: a [`TypeTable`]
//! of backend types with storage layout, a [`TreeArena`] of expression and
//! statement nodes, and a [`SymbolTable`] of declarations carrying linkage
//! markers, initial values and function bodies.
//!
//! # Node sharing
//!
//! The backend mutates trees in place, so a node may have only one parent.
//! Symbol references ([`Tree::Decl`]) and the error sentinel are the
//! exceptions. [`TreeModule::check_unshared`] verifies this.

mod module;
mod symbol;
mod tree;
mod types;

pub use module::{SharedNode, TreeModule};
pub use symbol::{Linkage, Symbol, SymbolId, SymbolKind, SymbolTable, Visibility};
pub use tree::{Tree, TreeArena, TreeBinOp, TreeId, TreeUnOp};
pub use types::{Layout, Record, RecordField, Target, TreeType, TreeTypeId, TypeTable};
