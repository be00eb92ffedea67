//! Constant expressions.
//!
//! A constant expression lowers to a tree the backend can evaluate at
//! compile time: literals, composites of constants, conversions and
//! arithmetic over constants, and references to named constants (folded
//! by value, never by symbol). Package-level initializers of this shape
//! become static initial values instead of init-function statements.

use golow_ir::{BinaryOp, DeclKind, ExprId, ExprKind, UnaryOp};
use golow_tree::{Tree, TreeBinOp, TreeId, TreeType, TreeUnOp};

use crate::session::Session;
use crate::stack::ensure_sufficient_stack;

pub(crate) fn binary_op(op: BinaryOp) -> TreeBinOp {
    match op {
        BinaryOp::Add => TreeBinOp::Plus,
        BinaryOp::Sub => TreeBinOp::Minus,
        BinaryOp::Mul => TreeBinOp::Mult,
        BinaryOp::Div => TreeBinOp::Div,
        BinaryOp::Rem => TreeBinOp::Rem,
        BinaryOp::And => TreeBinOp::BitAnd,
        BinaryOp::Or => TreeBinOp::BitOr,
        BinaryOp::Xor => TreeBinOp::BitXor,
        BinaryOp::Shl => TreeBinOp::Shl,
        BinaryOp::Shr => TreeBinOp::Shr,
        BinaryOp::Eq => TreeBinOp::Eq,
        BinaryOp::Ne => TreeBinOp::Ne,
        BinaryOp::Lt => TreeBinOp::Lt,
        BinaryOp::Le => TreeBinOp::Le,
        BinaryOp::Gt => TreeBinOp::Gt,
        BinaryOp::Ge => TreeBinOp::Ge,
        BinaryOp::LogicalAnd => TreeBinOp::AndIf,
        BinaryOp::LogicalOr => TreeBinOp::OrIf,
    }
}

pub(crate) fn unary_op(op: UnaryOp) -> TreeUnOp {
    match op {
        UnaryOp::Neg => TreeUnOp::Negate,
        UnaryOp::Not => TreeUnOp::Not,
        UnaryOp::BitNot => TreeUnOp::BitNot,
    }
}

#[expect(
    clippy::cast_precision_loss,
    reason = "an integer constant used as a float rounds to nearest"
)]
fn int_to_float_bits(value: i64) -> u64 {
    (value as f64).to_bits()
}

impl Session<'_> {
    /// Lower `expr` if it is a constant expression; `None` otherwise.
    pub(crate) fn constant_value(&mut self, expr: ExprId) -> Option<TreeId> {
        if !self.is_constant(expr) {
            return None;
        }
        Some(ensure_sufficient_stack(|| self.lower_constant(expr)))
    }

    /// Whether `expr` can be evaluated at compile time.
    pub(crate) fn is_constant(&self, expr: ExprId) -> bool {
        let program = self.program;
        ensure_sufficient_stack(|| match &program.expr(expr).kind {
            ExprKind::Int(_)
            | ExprKind::Float(_)
            | ExprKind::Bool(_)
            | ExprKind::Str(_)
            | ExprKind::Nil => true,
            ExprKind::Var(decl) => matches!(program.decl(*decl).kind, DeclKind::Const { .. }),
            ExprKind::Composite(elems) => elems.iter().all(|&e| self.is_constant(e)),
            ExprKind::Convert(inner) => self.is_constant(*inner),
            ExprKind::Unary { operand, .. } => self.is_constant(*operand),
            ExprKind::Binary { lhs, rhs, .. } => self.is_constant(*lhs) && self.is_constant(*rhs),
            _ => false,
        })
    }

    fn lower_constant(&mut self, expr: ExprId) -> TreeId {
        let program = self.program;
        let e = program.expr(expr);
        let ty = self.lower_type(e.ty);
        if ty.is_error() {
            return TreeId::ERROR;
        }
        match &e.kind {
            ExprKind::Int(value) => match self.module.types.get(ty) {
                TreeType::Float { .. } => self.node_at(
                    Tree::Float {
                        bits: int_to_float_bits(*value),
                        ty,
                    },
                    e.span,
                ),
                _ => self.node_at(
                    Tree::Int {
                        value: i128::from(*value),
                        ty,
                    },
                    e.span,
                ),
            },
            ExprKind::Float(bits) => {
                let float = self.module.types.float(64);
                let value = self.node_at(Tree::Float { bits: *bits, ty: float }, e.span);
                self.convert(value, ty)
            }
            ExprKind::Bool(value) => self.bool_const(*value),
            ExprKind::Str(name) => {
                let text = self.str(*name);
                self.string_value(text)
            }
            ExprKind::Nil => self.null(ty),
            ExprKind::Var(decl) => match &program.decl(*decl).kind {
                DeclKind::Const { value, .. } => {
                    let value = self.lower_constant(*value);
                    self.convert(value, ty)
                }
                _ => TreeId::ERROR,
            },
            ExprKind::Composite(elems) => {
                let elems = elems.iter().map(|&elem| self.lower_constant(elem)).collect();
                self.constructor(ty, elems)
            }
            ExprKind::Convert(inner) => {
                let inner = self.lower_constant(*inner);
                self.convert(inner, ty)
            }
            ExprKind::Unary { op, operand } => {
                let operand = self.lower_constant(*operand);
                if operand.is_error() {
                    return TreeId::ERROR;
                }
                let operand = self.convert(operand, ty);
                self.node_at(
                    Tree::Unary {
                        op: unary_op(*op),
                        expr: operand,
                        ty,
                    },
                    e.span,
                )
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let operand_ty = self.lower_type(program.expr(*lhs).ty);
                let lhs = self.lower_constant(*lhs);
                let rhs = self.lower_constant(*rhs);
                let rhs = self.convert(rhs, operand_ty);
                self.binary(binary_op(*op), lhs, rhs, ty)
            }
            _ => TreeId::ERROR,
        }
    }
}
