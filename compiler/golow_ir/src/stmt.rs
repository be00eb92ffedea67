//! Statements and blocks.

use crate::{DeclId, ExprId, Span};

/// Index into [`Program::labels`](crate::Program).
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, Debug)]
#[repr(transparent)]
pub struct LabelId(u32);

impl LabelId {
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        LabelId(raw)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, PartialEq, Debug, Default)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

impl Block {
    pub fn new(stmts: Vec<Stmt>) -> Self {
        Block {
            stmts,
            span: Span::DUMMY,
        }
    }
}

#[derive(Clone, PartialEq, Debug)]
pub enum SelectOp {
    Send { chan: ExprId, value: ExprId },
    /// Receive, optionally assigning the value to `into`.
    Receive { chan: ExprId, into: Option<ExprId> },
}

#[derive(Clone, PartialEq, Debug)]
pub struct SelectCase {
    pub op: SelectOp,
    pub body: Block,
}

#[derive(Clone, PartialEq, Debug)]
pub enum Stmt {
    Expr(ExprId),
    /// Declaration of a local variable; runs its initializer.
    VarDecl(DeclId),
    Assign { lhs: ExprId, rhs: ExprId },
    Return(Vec<ExprId>),
    If {
        cond: ExprId,
        then_block: Block,
        else_block: Option<Block>,
    },
    Block(Block),
    /// Blocking send.
    Send { chan: ExprId, value: ExprId },
    Select {
        cases: Vec<SelectCase>,
        default: Option<Block>,
    },
    Label(LabelId),
    Goto(LabelId),
}
