//! Tree nodes.
//!
//! Every node is owned by exactly one parent, with two exceptions: a
//! [`Tree::Decl`] leaf (one per symbol, shared by every use) and the
//! [`TreeId::ERROR`] sentinel. Lowering must synthesize fresh nodes for
//! every other use site, including dereferences of heap-allocated
//! variables.

use golow_ir::Span;
use rustc_hash::FxHashMap;

use crate::{SymbolId, TreeTypeId};

#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, Debug)]
#[repr(transparent)]
pub struct TreeId(u32);

impl TreeId {
    /// Error sentinel substituted for anything that failed to lower.
    pub const ERROR: TreeId = TreeId(0);

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn is_error(self) -> bool {
        self.0 == 0
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum TreeBinOp {
    Plus,
    Minus,
    Mult,
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    AndIf,
    OrIf,
}

impl TreeBinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            TreeBinOp::Plus => "+",
            TreeBinOp::Minus => "-",
            TreeBinOp::Mult => "*",
            TreeBinOp::Div => "/",
            TreeBinOp::Rem => "%",
            TreeBinOp::BitAnd => "&",
            TreeBinOp::BitOr => "|",
            TreeBinOp::BitXor => "^",
            TreeBinOp::Shl => "<<",
            TreeBinOp::Shr => ">>",
            TreeBinOp::Eq => "==",
            TreeBinOp::Ne => "!=",
            TreeBinOp::Lt => "<",
            TreeBinOp::Le => "<=",
            TreeBinOp::Gt => ">",
            TreeBinOp::Ge => ">=",
            TreeBinOp::AndIf => "&&",
            TreeBinOp::OrIf => "||",
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum TreeUnOp {
    Negate,
    Not,
    BitNot,
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum Tree {
    Error,
    /// Reference to a symbol.
    Decl(SymbolId),
    Int {
        value: i128,
        ty: TreeTypeId,
    },
    Float {
        bits: u64,
        ty: TreeTypeId,
    },
    Bool(bool),
    Null(TreeTypeId),
    /// String constant of the language's string type.
    Str {
        value: String,
        ty: TreeTypeId,
    },
    /// Aggregate value; elements in field or index order.
    Constructor {
        ty: TreeTypeId,
        elems: Vec<TreeId>,
    },
    AddrOf {
        expr: TreeId,
        ty: TreeTypeId,
    },
    Indirect {
        expr: TreeId,
        ty: TreeTypeId,
    },
    Field {
        base: TreeId,
        index: u32,
        ty: TreeTypeId,
    },
    Index {
        base: TreeId,
        index: TreeId,
        ty: TreeTypeId,
    },
    Call {
        func: TreeId,
        args: Vec<TreeId>,
        ty: TreeTypeId,
    },
    Convert {
        expr: TreeId,
        ty: TreeTypeId,
    },
    /// Reinterpret the bits of `expr` as `ty`; both have the same size.
    BitCast {
        expr: TreeId,
        ty: TreeTypeId,
    },
    Binary {
        op: TreeBinOp,
        lhs: TreeId,
        rhs: TreeId,
        ty: TreeTypeId,
    },
    Unary {
        op: TreeUnOp,
        expr: TreeId,
        ty: TreeTypeId,
    },
    Assign {
        lhs: TreeId,
        rhs: TreeId,
    },
    /// Statements in order, optionally yielding a final value.
    Compound {
        stmts: Vec<TreeId>,
        value: Option<TreeId>,
    },
    Cond {
        cond: TreeId,
        then_: TreeId,
        else_: Option<TreeId>,
        ty: TreeTypeId,
    },
    /// Declaration point of a local; its initializer is the symbol's
    /// `initial`.
    DeclExpr(SymbolId),
    Return(Option<TreeId>),
    /// `finally` runs on every exit from `body`, normal or unwinding.
    TryFinally {
        body: TreeId,
        finally: TreeId,
    },
    Label(SymbolId),
    Goto(SymbolId),
}

impl Tree {
    /// Child nodes in evaluation order.
    pub fn children(&self) -> Vec<TreeId> {
        match self {
            Tree::Error
            | Tree::Decl(_)
            | Tree::Int { .. }
            | Tree::Float { .. }
            | Tree::Bool(_)
            | Tree::Null(_)
            | Tree::Str { .. }
            | Tree::DeclExpr(_)
            | Tree::Label(_)
            | Tree::Goto(_)
            | Tree::Return(None) => Vec::new(),
            Tree::Constructor { elems, .. } => elems.clone(),
            Tree::AddrOf { expr, .. }
            | Tree::Indirect { expr, .. }
            | Tree::Convert { expr, .. }
            | Tree::BitCast { expr, .. }
            | Tree::Unary { expr, .. }
            | Tree::Return(Some(expr)) => vec![*expr],
            Tree::Field { base, .. } => vec![*base],
            Tree::Index { base, index, .. } => vec![*base, *index],
            Tree::Call { func, args, .. } => {
                let mut out = Vec::with_capacity(args.len() + 1);
                out.push(*func);
                out.extend(args.iter().copied());
                out
            }
            Tree::Binary { lhs, rhs, .. } | Tree::Assign { lhs, rhs } => vec![*lhs, *rhs],
            Tree::Compound { stmts, value } => {
                let mut out = stmts.clone();
                out.extend(value.iter().copied());
                out
            }
            Tree::Cond {
                cond, then_, else_, ..
            } => {
                let mut out = vec![*cond, *then_];
                out.extend(else_.iter().copied());
                out
            }
            Tree::TryFinally { body, finally } => vec![*body, *finally],
        }
    }

    /// Nodes that may legally appear under more than one parent.
    pub fn is_shareable(&self) -> bool {
        matches!(self, Tree::Error | Tree::Decl(_))
    }
}

/// Arena owning every tree node of a module.
pub struct TreeArena {
    nodes: Vec<Tree>,
    spans: Vec<Span>,
    decls: FxHashMap<SymbolId, TreeId>,
}

impl Default for TreeArena {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeArena {
    pub fn new() -> Self {
        TreeArena {
            nodes: vec![Tree::Error],
            spans: vec![Span::DUMMY],
            decls: FxHashMap::default(),
        }
    }

    /// Add a node with no source location.
    pub fn push(&mut self, tree: Tree) -> TreeId {
        self.push_at(tree, Span::DUMMY)
    }

    /// Add a node carrying source location `span`.
    ///
    /// # Panics
    /// Panics if the arena exceeds `u32::MAX` nodes.
    pub fn push_at(&mut self, tree: Tree, span: Span) -> TreeId {
        if let Tree::Decl(sym) = tree {
            return self.decl(sym);
        }
        let Ok(raw) = u32::try_from(self.nodes.len()) else {
            panic!("tree arena exceeded {} nodes", u32::MAX);
        };
        self.nodes.push(tree);
        self.spans.push(span);
        TreeId(raw)
    }

    /// The shared reference leaf for `sym`.
    pub fn decl(&mut self, sym: SymbolId) -> TreeId {
        if let Some(&id) = self.decls.get(&sym) {
            return id;
        }
        let Ok(raw) = u32::try_from(self.nodes.len()) else {
            panic!("tree arena exceeded {} nodes", u32::MAX);
        };
        let id = TreeId(raw);
        self.nodes.push(Tree::Decl(sym));
        self.spans.push(Span::DUMMY);
        self.decls.insert(sym, id);
        id
    }

    /// Out-of-range ids read as [`Tree::Error`].
    pub fn get(&self, id: TreeId) -> &Tree {
        self.nodes.get(id.index()).unwrap_or(&Tree::Error)
    }

    pub fn span(&self, id: TreeId) -> Span {
        self.spans.get(id.index()).copied().unwrap_or(Span::DUMMY)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TreeId, &Tree)> {
        self.nodes.iter().enumerate().map(|(i, t)| {
            #[expect(
                clippy::cast_possible_truncation,
                reason = "push_at bounds the arena to u32::MAX nodes"
            )]
            let id = TreeId(i as u32);
            (id, t)
        })
    }
}
