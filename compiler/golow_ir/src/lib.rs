//! Checked program model for the golow lowering stage.
//!
//! The front end (parsing, name resolution, type checking) hands lowering a
//! fully resolved [`Program`]: packages, declarations, typed expressions
//! and statements. Everything here is plain data indexed by small `Copy`
//! ids ([`DeclId`], [`ExprId`], [`TypeId`], ...) so that lowering can hold
//! on to stable handles while it builds output.
//!
//! # Layout
//!
//! - [`Name`]/[`StringInterner`]: interned strings; [`Ident`] adds the
//!   exported/hidden distinction.
//! - [`TypePool`]: all types, with named types in a side table.
//! - [`Expr`]/[`Stmt`]/[`Decl`]: the program body.
//! - [`ProgramBuilder`]: allocation helpers used by front ends and tests.

mod decl;
mod expr;
mod interner;
mod name;
mod program;
mod span;
mod stmt;
mod types;

pub use decl::{
    Decl, DeclId, DeclKind, Function, FunctionDecl, ImportInit, Package, PackageId,
    RefcountEntry, RefcountKind, VarFlags, Variable,
};
pub use expr::{BinaryOp, Expr, ExprId, ExprKind, ExprList, UnaryOp};
pub use interner::StringInterner;
pub use name::{Ident, Name};
pub use program::{Label, Program, ProgramBuilder};
pub use span::Span;
pub use stmt::{Block, LabelId, SelectCase, SelectOp, Stmt};
pub use types::{
    ChanDir, Field, FuncType, InterfaceMethod, Method, NamedType, NamedTypeId, TypeId, TypeKind,
    TypePool,
};
