//! Reflection strings: the source spelling of a type.

use std::fmt::Write;

use golow_ir::{ChanDir, TypeId, TypeKind};

use crate::session::Session;
use crate::stack::ensure_sufficient_stack;

impl Session<'_> {
    /// Source spelling of `ty` as shown by reflection, e.g.
    /// `map[string]*pkg.T`.
    pub(crate) fn reflection(&self, ty: TypeId) -> String {
        let mut out = String::new();
        self.reflect_into(ty, &mut out);
        out
    }

    fn reflect_into(&self, ty: TypeId, out: &mut String) {
        ensure_sufficient_stack(|| match self.types.kind(ty) {
            TypeKind::Error => out.push_str("<error>"),
            TypeKind::Void => {}
            TypeKind::Nil => out.push_str("nil"),
            TypeKind::Bool => out.push_str("bool"),
            TypeKind::Int { bits, signed } => {
                let _ = write!(out, "{}{bits}", if *signed { "int" } else { "uint" });
            }
            TypeKind::Float { bits } => {
                let _ = write!(out, "float{bits}");
            }
            TypeKind::String => out.push_str("string"),
            TypeKind::Pointer(to) => {
                out.push('*');
                self.reflect_into(*to, out);
            }
            TypeKind::Function(sig) => {
                out.push_str("func");
                self.reflect_signature(&sig.params, &sig.results, out);
            }
            TypeKind::Struct(fields) => {
                if fields.is_empty() {
                    out.push_str("struct {}");
                    return;
                }
                out.push_str("struct { ");
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        out.push_str("; ");
                    }
                    if let Some(ident) = field.name {
                        out.push_str(self.str(ident.name));
                        out.push(' ');
                    }
                    self.reflect_into(field.ty, out);
                    if let Some(tag) = field.tag {
                        let _ = write!(out, " {:?}", self.str(tag));
                    }
                }
                out.push_str(" }");
            }
            TypeKind::Array { elem, len } => {
                let _ = write!(out, "[{len}]");
                self.reflect_into(*elem, out);
            }
            TypeKind::Slice(elem) => {
                out.push_str("[]");
                self.reflect_into(*elem, out);
            }
            TypeKind::Map { key, value } => {
                out.push_str("map[");
                self.reflect_into(*key, out);
                out.push(']');
                self.reflect_into(*value, out);
            }
            TypeKind::Channel { elem, dir } => {
                out.push_str(if *dir == ChanDir::RECV {
                    "<-chan "
                } else if *dir == ChanDir::SEND {
                    "chan<- "
                } else {
                    "chan "
                });
                self.reflect_into(*elem, out);
            }
            TypeKind::Interface(methods) => {
                if methods.is_empty() {
                    out.push_str("interface {}");
                    return;
                }
                out.push_str("interface { ");
                for method in methods {
                    out.push_str(self.str(method.name.name));
                    if let Some(sig) = self.types.func_type(method.ty) {
                        self.reflect_signature(&sig.params, &sig.results, out);
                    }
                    out.push_str("; ");
                }
                out.push('}');
            }
            TypeKind::Varargs(elem) => {
                out.push_str("...");
                if let Some(elem) = elem {
                    self.reflect_into(*elem, out);
                }
            }
            TypeKind::Named(id) => {
                let named = self.types.named_type(*id);
                if !named.is_builtin {
                    let (_, package) = self.package_strings(named.package);
                    out.push_str(&package);
                    out.push('.');
                }
                out.push_str(self.str(named.ident.name));
            }
            TypeKind::Forward(name) => out.push_str(self.str(*name)),
        });
    }

    /// `(A, B) R` or `(A) (R1, R2)`.
    fn reflect_signature(&self, params: &[TypeId], results: &[TypeId], out: &mut String) {
        out.push('(');
        self.reflect_list(params, out);
        out.push(')');
        match results {
            [] => {}
            [one] => {
                out.push(' ');
                self.reflect_into(*one, out);
            }
            many => {
                out.push_str(" (");
                self.reflect_list(many, out);
                out.push(')');
            }
        }
    }

    fn reflect_list(&self, types: &[TypeId], out: &mut String) {
        for (i, &ty) in types.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            self.reflect_into(ty, out);
        }
    }
}
