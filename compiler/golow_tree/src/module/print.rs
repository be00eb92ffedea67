//! S-expression rendering of trees, for logs and tests.

use std::fmt::Write;

use crate::{Tree, TreeId, TreeModule, TreeUnOp};

impl TreeModule {
    /// Render `id` as a compact S-expression. Symbols print by link name.
    pub fn render(&self, id: TreeId) -> String {
        let mut out = String::new();
        self.render_into(id, &mut out);
        out
    }

    fn render_list(&self, head: &str, items: &[TreeId], out: &mut String) {
        out.push('(');
        out.push_str(head);
        for &item in items {
            out.push(' ');
            self.render_into(item, out);
        }
        out.push(')');
    }

    fn render_into(&self, id: TreeId, out: &mut String) {
        match self.nodes.get(id) {
            Tree::Error => out.push_str("error"),
            Tree::Decl(sym) => out.push_str(self.symbols.get(*sym).link_name()),
            Tree::Int { value, .. } => {
                let _ = write!(out, "{value}");
            }
            Tree::Float { bits, .. } => {
                let _ = write!(out, "{}", f64::from_bits(*bits));
            }
            Tree::Bool(b) => {
                let _ = write!(out, "{b}");
            }
            Tree::Null(_) => out.push_str("null"),
            Tree::Str { value, .. } => {
                let _ = write!(out, "{value:?}");
            }
            Tree::Constructor { elems, .. } => {
                out.push('{');
                for (i, &elem) in elems.iter().enumerate() {
                    if i > 0 {
                        out.push(' ');
                    }
                    self.render_into(elem, out);
                }
                out.push('}');
            }
            Tree::AddrOf { expr, .. } => {
                out.push('&');
                self.render_into(*expr, out);
            }
            Tree::Indirect { expr, .. } => {
                out.push('*');
                self.render_into(*expr, out);
            }
            Tree::Field { base, index, .. } => {
                self.render_into(*base, out);
                let record = self.type_of(*base);
                match self.types.record_fields(record).get(*index as usize) {
                    Some(field) => {
                        let _ = write!(out, ".{}", field.name);
                    }
                    None => {
                        let _ = write!(out, ".{index}");
                    }
                }
            }
            Tree::Index { base, index, .. } => {
                self.render_into(*base, out);
                out.push('[');
                self.render_into(*index, out);
                out.push(']');
            }
            Tree::Call { func, args, .. } => {
                out.push_str("(call ");
                self.render_into(*func, out);
                for &arg in args {
                    out.push(' ');
                    self.render_into(arg, out);
                }
                out.push(')');
            }
            Tree::Convert { expr, ty } => {
                let _ = write!(out, "(convert {} ", self.types.display(*ty));
                self.render_into(*expr, out);
                out.push(')');
            }
            Tree::BitCast { expr, ty } => {
                let _ = write!(out, "(bitcast {} ", self.types.display(*ty));
                self.render_into(*expr, out);
                out.push(')');
            }
            Tree::Binary { op, lhs, rhs, .. } => {
                self.render_list(op.symbol(), &[*lhs, *rhs], out);
            }
            Tree::Unary { op, expr, .. } => {
                let head = match op {
                    TreeUnOp::Negate => "neg",
                    TreeUnOp::Not => "not",
                    TreeUnOp::BitNot => "bitnot",
                };
                self.render_list(head, &[*expr], out);
            }
            Tree::Assign { lhs, rhs } => self.render_list("=", &[*lhs, *rhs], out),
            Tree::Compound { stmts, value } => {
                out.push_str("(seq");
                for &stmt in stmts {
                    out.push(' ');
                    self.render_into(stmt, out);
                }
                if let Some(value) = value {
                    out.push_str(" => ");
                    self.render_into(*value, out);
                }
                out.push(')');
            }
            Tree::Cond {
                cond, then_, else_, ..
            } => {
                let mut items = vec![*cond, *then_];
                items.extend(else_.iter().copied());
                self.render_list("if", &items, out);
            }
            Tree::DeclExpr(sym) => {
                let symbol = self.symbols.get(*sym);
                let _ = write!(out, "(decl {}", symbol.link_name());
                if let Some(init) = symbol.initial {
                    out.push(' ');
                    self.render_into(init, out);
                }
                out.push(')');
            }
            Tree::Return(value) => {
                let items: Vec<TreeId> = value.iter().copied().collect();
                self.render_list("return", &items, out);
            }
            Tree::TryFinally { body, finally } => {
                self.render_list("try", &[*body, *finally], out);
            }
            Tree::Label(sym) => {
                let _ = write!(out, "(label {})", self.symbols.get(*sym).link_name());
            }
            Tree::Goto(sym) => {
                let _ = write!(out, "(goto {})", self.symbols.get(*sym).link_name());
            }
        }
    }
}
