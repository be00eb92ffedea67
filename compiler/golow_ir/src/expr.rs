//! Typed expressions of the checked program model.

use smallvec::SmallVec;

use crate::{DeclId, Name, Span, TypeId};

/// Index into [`Program::exprs`](crate::Program).
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, Debug)]
#[repr(transparent)]
pub struct ExprId(u32);

impl ExprId {
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        ExprId(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Expression argument list; most calls pass few arguments.
pub type ExprList = SmallVec<[ExprId; 4]>;

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    LogicalAnd,
    LogicalOr,
}

impl BinaryOp {
    /// Comparison operators produce `bool` regardless of operand type.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum UnaryOp {
    Neg,
    Not,
    BitNot,
}

#[derive(Clone, PartialEq, Debug)]
pub enum ExprKind {
    Int(i64),
    /// IEEE-754 bit pattern.
    Float(u64),
    Bool(bool),
    Str(Name),
    Nil,
    /// Read of a variable, result variable or constant.
    Var(DeclId),
    /// A function used as a value.
    Func(DeclId),
    /// A function literal bound to captured state. `captures` are the
    /// addresses of the captured variables, in closure-record order.
    Closure {
        func: DeclId,
        captures: ExprList,
    },
    /// Captured variable inside a closure body, by closure-record index.
    ClosureField(u32),
    Call {
        callee: ExprId,
        args: ExprList,
    },
    Binary {
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
    },
    Unary {
        op: UnaryOp,
        operand: ExprId,
    },
    AddrOf(ExprId),
    Deref(ExprId),
    Field {
        base: ExprId,
        index: u32,
    },
    Index {
        base: ExprId,
        index: ExprId,
    },
    /// Struct or array literal of the expression's type.
    Composite(Vec<ExprId>),
    /// Conversion to the expression's type.
    Convert(ExprId),
    /// Blocking receive.
    Receive {
        chan: ExprId,
    },
    /// Non-blocking receive; the success flag is stored into `ok`.
    TryReceive {
        chan: ExprId,
        ok: ExprId,
    },
    /// Non-blocking send yielding whether the value was sent.
    TrySend {
        chan: ExprId,
        value: ExprId,
    },
    /// Conversion of a concrete value to the expression's interface type.
    MakeInterface(ExprId),
    /// Allocate a map of the expression's type.
    MakeMap {
        size: Option<ExprId>,
    },
    /// Evaluate `value` and record it in refcount queue slot `entry` of
    /// the enclosing function.
    Refcounted {
        value: ExprId,
        entry: u32,
    },
}

#[derive(Clone, PartialEq, Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: TypeId,
    pub span: Span,
}
