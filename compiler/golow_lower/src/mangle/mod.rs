//! Structural type mangling.
//!
//! A mangled name identifies a type by shape, so structurally identical
//! unnamed types in separate compilations produce the same string and the
//! same descriptor symbol. Named types mangle by their qualified name and
//! never by structure.
//!
//! # Scheme
//!
//! | Type | Mangled |
//! |------|---------|
//! | `bool` | `b` |
//! | `int64`, `uint8` | `i64`, `u8` |
//! | `float64` | `f64` |
//! | `string` | `s` |
//! | `*T` | `p` T |
//! | `func(P...) (R...)` | `F` [`m` recv] P... [`R` R...] `e` |
//! | `struct { f T "tag" }` | `S` (`<len>_<name>` T [`T<len>_<tag>`])... `e` |
//! | `[N]T` | `A<N>_` T |
//! | `[]T` | `Z` T |
//! | `map[K]V` | `M` K `__` V |
//! | `chan T` | `C<dir>` T |
//! | `interface { m() }` | `I` (`<len>_<name>` sig)... `e` |
//! | `...T` | `V` T, or `Vx` untyped |
//! | named | `N<len>_<qualified name>` |
//!
//! Hidden field and method names mangle with their package prefix, so two
//! packages' unexported `x` fields do not collide.

use std::fmt::Write;

use golow_ir::{Ident, NamedTypeId, TypeId, TypeKind};

use crate::session::Session;
use crate::stack::ensure_sufficient_stack;

/// Separator between a map's key and value.
const MAP_SEP: &str = "__";

impl Session<'_> {
    pub(crate) fn mangled_name(&self, ty: TypeId) -> String {
        let mut out = String::with_capacity(16);
        self.mangle_into(ty, &mut out);
        out
    }

    fn mangle_into(&self, ty: TypeId, out: &mut String) {
        ensure_sufficient_stack(|| match self.types.kind(ty) {
            TypeKind::Error => out.push('E'),
            TypeKind::Void => out.push('v'),
            TypeKind::Nil => out.push('n'),
            TypeKind::Bool => out.push('b'),
            TypeKind::Int { bits, signed } => {
                let _ = write!(out, "{}{bits}", if *signed { 'i' } else { 'u' });
            }
            TypeKind::Float { bits } => {
                let _ = write!(out, "f{bits}");
            }
            TypeKind::String => out.push('s'),
            TypeKind::Pointer(to) => {
                out.push('p');
                self.mangle_into(*to, out);
            }
            TypeKind::Function(sig) => {
                out.push('F');
                if let Some(recv) = sig.receiver {
                    out.push('m');
                    self.mangle_into(recv, out);
                }
                for &param in &sig.params {
                    self.mangle_into(param, out);
                }
                if !sig.results.is_empty() {
                    out.push('R');
                    for &result in &sig.results {
                        self.mangle_into(result, out);
                    }
                }
                out.push('e');
            }
            TypeKind::Struct(fields) => {
                out.push('S');
                for field in fields {
                    match field.name {
                        Some(ident) => self.mangle_ident(ident, out),
                        None => out.push_str("0_"),
                    }
                    self.mangle_into(field.ty, out);
                    if let Some(tag) = field.tag {
                        let tag = self.str(tag);
                        let _ = write!(out, "T{}_{tag}", tag.len());
                    }
                }
                out.push('e');
            }
            TypeKind::Array { elem, len } => {
                let _ = write!(out, "A{len}_");
                self.mangle_into(*elem, out);
            }
            TypeKind::Slice(elem) => {
                out.push('Z');
                self.mangle_into(*elem, out);
            }
            TypeKind::Map { key, value } => {
                out.push('M');
                self.mangle_into(*key, out);
                out.push_str(MAP_SEP);
                self.mangle_into(*value, out);
            }
            TypeKind::Channel { elem, dir } => {
                let _ = write!(out, "C{}", dir.bits());
                self.mangle_into(*elem, out);
            }
            TypeKind::Interface(methods) => {
                out.push('I');
                for method in methods {
                    self.mangle_ident(method.name, out);
                    self.mangle_into(method.ty, out);
                }
                out.push('e');
            }
            TypeKind::Varargs(elem) => {
                out.push('V');
                match elem {
                    Some(elem) => self.mangle_into(*elem, out),
                    None => out.push('x'),
                }
            }
            TypeKind::Named(id) => {
                let name = self.qualified_type_name(*id);
                let _ = write!(out, "N{}_{name}", name.len());
            }
            TypeKind::Forward(name) => {
                let name = self.str(*name);
                let _ = write!(out, "X{}_{name}", name.len());
            }
        });
    }

    fn mangle_ident(&self, ident: Ident, out: &mut String) {
        let key = self.program.interner.sort_key(ident);
        let _ = write!(out, "{}_{key}", key.len());
    }

    /// `<unique_prefix>.<package>.[<function>.]<name>`; builtin types use
    /// the bare name.
    pub(crate) fn qualified_type_name(&self, id: NamedTypeId) -> String {
        let named = self.types.named_type(id);
        let name = self.str(named.ident.name);
        if named.is_builtin {
            return name.to_owned();
        }
        let (prefix, package) = self.package_strings(named.package);
        let mut out = String::with_capacity(prefix.len() + package.len() + name.len() + 2);
        out.push_str(&prefix);
        out.push('.');
        out.push_str(&package);
        out.push('.');
        if let Some(function) = named.in_function {
            out.push_str(self.str(function));
            out.push('.');
        }
        out.push_str(name);
        out
    }
}
