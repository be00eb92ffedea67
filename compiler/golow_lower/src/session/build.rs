//! Node construction helpers.
//!
//! Every helper returns a freshly pushed node, except [`Session::decl_ref`]
//! which returns the symbol's shared reference leaf.

use golow_tree::{
    RecordField, SymbolId, Tree, TreeBinOp, TreeId, TreeType, TreeTypeId,
};
use golow_ir::Span;

use super::Session;
use crate::stack::ensure_sufficient_stack;

impl Session<'_> {
    #[inline]
    pub(crate) fn node(&mut self, tree: Tree) -> TreeId {
        self.module.nodes.push(tree)
    }

    #[inline]
    pub(crate) fn node_at(&mut self, tree: Tree, span: Span) -> TreeId {
        self.module.nodes.push_at(tree, span)
    }

    #[inline]
    pub(crate) fn decl_ref(&mut self, sym: SymbolId) -> TreeId {
        self.module.nodes.decl(sym)
    }

    #[inline]
    pub(crate) fn type_of(&self, id: TreeId) -> TreeTypeId {
        self.module.type_of(id)
    }

    pub(crate) fn int_const(&mut self, value: i128, ty: TreeTypeId) -> TreeId {
        self.node(Tree::Int { value, ty })
    }

    pub(crate) fn uintptr_const(&mut self, value: u64) -> TreeId {
        let ty = self.uintptr();
        self.int_const(i128::from(value), ty)
    }

    pub(crate) fn bool_const(&mut self, value: bool) -> TreeId {
        self.node(Tree::Bool(value))
    }

    pub(crate) fn null(&mut self, ty: TreeTypeId) -> TreeId {
        self.node(Tree::Null(ty))
    }

    /// Address of `expr`. Taking the address of a symbol marks it
    /// addressable.
    pub(crate) fn addr_of(&mut self, expr: TreeId) -> TreeId {
        if expr.is_error() {
            return TreeId::ERROR;
        }
        if let Tree::Decl(sym) = self.module.nodes.get(expr) {
            let sym = *sym;
            self.symbol_mut(sym).addressable = true;
        }
        let pointee = self.type_of(expr);
        let ty = self.module.types.pointer(pointee);
        self.node(Tree::AddrOf { expr, ty })
    }

    /// Address of `value`, copying it into a `hint` temporary of
    /// `function` unless it already names storage.
    pub(crate) fn address_of_value(
        &mut self,
        function: SymbolId,
        value: TreeId,
        hint: &str,
    ) -> TreeId {
        if value.is_error() {
            return TreeId::ERROR;
        }
        match self.module.nodes.get(value) {
            Tree::Decl(_) | Tree::Indirect { .. } | Tree::Field { .. } | Tree::Index { .. } => {
                self.addr_of(value)
            }
            _ => {
                let ty = self.type_of(value);
                let copy = self.temp(Some(function), hint, ty, Some(value));
                let declare = self.decl_expr(copy);
                let copy = self.decl_ref(copy);
                let addr = self.addr_of(copy);
                self.seq(vec![declare], Some(addr))
            }
        }
    }

    pub(crate) fn indirect(&mut self, ptr: TreeId) -> TreeId {
        if ptr.is_error() {
            return TreeId::ERROR;
        }
        let ty = self.module.types.pointee(self.type_of(ptr));
        self.node(Tree::Indirect { expr: ptr, ty })
    }

    pub(crate) fn field_at(&mut self, base: TreeId, index: u32) -> TreeId {
        if base.is_error() {
            return TreeId::ERROR;
        }
        let ty = self.module.types.field_type(self.type_of(base), index);
        self.node(Tree::Field { base, index, ty })
    }

    /// Field access by name on a record-typed `base`.
    pub(crate) fn field(&mut self, base: TreeId, name: &str) -> TreeId {
        let record = self.type_of(base);
        match self.module.types.field_index(record, name) {
            Some(index) => self.field_at(base, index),
            None => self.error(
                golow_diagnostic::ErrorCode::E9001,
                Span::DUMMY,
                format!("record has no field `{name}`"),
            ),
        }
    }

    pub(crate) fn index(&mut self, base: TreeId, index: TreeId) -> TreeId {
        if base.is_error() || index.is_error() {
            return TreeId::ERROR;
        }
        let ty = self.module.types.element(self.type_of(base));
        self.node(Tree::Index { base, index, ty })
    }

    /// Convert `expr` to `ty`; no node when it already has that type.
    pub(crate) fn convert(&mut self, expr: TreeId, ty: TreeTypeId) -> TreeId {
        if expr.is_error() || ty.is_error() {
            return TreeId::ERROR;
        }
        if self.type_of(expr) == ty {
            return expr;
        }
        self.node(Tree::Convert { expr, ty })
    }

    pub(crate) fn bitcast(&mut self, expr: TreeId, ty: TreeTypeId) -> TreeId {
        if expr.is_error() {
            return TreeId::ERROR;
        }
        self.node(Tree::BitCast { expr, ty })
    }

    pub(crate) fn assign(&mut self, lhs: TreeId, rhs: TreeId) -> TreeId {
        if lhs.is_error() || rhs.is_error() {
            return TreeId::ERROR;
        }
        let ty = self.type_of(lhs);
        let rhs = self.convert(rhs, ty);
        self.node(Tree::Assign { lhs, rhs })
    }

    pub(crate) fn seq(&mut self, stmts: Vec<TreeId>, value: Option<TreeId>) -> TreeId {
        if stmts.is_empty() {
            if let Some(value) = value {
                return value;
            }
        }
        self.node(Tree::Compound { stmts, value })
    }

    pub(crate) fn binary(
        &mut self,
        op: TreeBinOp,
        lhs: TreeId,
        rhs: TreeId,
        ty: TreeTypeId,
    ) -> TreeId {
        if lhs.is_error() || rhs.is_error() {
            return TreeId::ERROR;
        }
        self.node(Tree::Binary { op, lhs, rhs, ty })
    }

    pub(crate) fn cond(
        &mut self,
        cond: TreeId,
        then_: TreeId,
        else_: Option<TreeId>,
        ty: TreeTypeId,
    ) -> TreeId {
        self.node(Tree::Cond {
            cond,
            then_,
            else_,
            ty,
        })
    }

    /// Declaration point of a local symbol.
    pub(crate) fn decl_expr(&mut self, sym: SymbolId) -> TreeId {
        self.node(Tree::DeclExpr(sym))
    }

    /// Direct call of a function symbol.
    pub(crate) fn call(&mut self, func: SymbolId, args: Vec<TreeId>, ty: TreeTypeId) -> TreeId {
        let func = self.decl_ref(func);
        self.node(Tree::Call { func, args, ty })
    }

    /// Aggregate constructor; each element is converted to its field or
    /// element type.
    pub(crate) fn constructor(&mut self, ty: TreeTypeId, elems: Vec<TreeId>) -> TreeId {
        let elems = elems
            .into_iter()
            .enumerate()
            .map(|(i, elem)| {
                let target = match self.module.types.get(ty) {
                    TreeType::Record(record) => record.fields.get(i).map(|f| f.ty),
                    TreeType::Array { elem, .. } => Some(*elem),
                    _ => None,
                };
                match target {
                    Some(target) => self.convert(elem, target),
                    None => elem,
                }
            })
            .collect();
        self.node(Tree::Constructor { ty, elems })
    }

    /// Zero value of a lowered type.
    pub(crate) fn zero_value(&mut self, ty: TreeTypeId) -> TreeId {
        ensure_sufficient_stack(|| match self.module.types.get(ty).clone() {
            TreeType::Error | TreeType::Void | TreeType::Function { .. } => TreeId::ERROR,
            TreeType::Bool => self.bool_const(false),
            TreeType::Int { .. } => self.int_const(0, ty),
            TreeType::Float { .. } => self.node(Tree::Float { bits: 0, ty }),
            TreeType::Pointer(_) => self.null(ty),
            TreeType::Record(_) | TreeType::Array { .. } => self.node(Tree::Constructor {
                ty,
                elems: Vec::new(),
            }),
        })
    }

    /// Size in bytes of a lowered type.
    pub(crate) fn size_of(&self, ty: TreeTypeId) -> u64 {
        self.module.types.layout(ty, self.target()).size
    }

    // ── Builtin records and strings ─────────────────────────────

    /// Runtime-defined record type, built once per session.
    pub(crate) fn builtin_record(
        &mut self,
        name: &'static str,
        fields: impl FnOnce(&mut Self) -> Vec<RecordField>,
    ) -> TreeTypeId {
        if let Some(&ty) = self.caches.builtin_records.get(name) {
            return ty;
        }
        let ty = self.module.types.declare_record(name);
        self.caches.builtin_records.insert(name, ty);
        let fields = fields(self);
        self.module.types.complete_record(ty, fields);
        ty
    }

    /// Lowered string type: pointer to `{__length, __data[]}`.
    pub(crate) fn string_type(&mut self) -> TreeTypeId {
        let record = self.builtin_record("__go_string", |s| {
            let uintptr = s.uintptr();
            let data = s.module.types.array(TreeTypeId::U8, None);
            vec![
                RecordField::new("__length", uintptr),
                RecordField::new("__data", data),
            ]
        });
        self.module.types.pointer(record)
    }

    /// A string literal of the lowered string type.
    pub(crate) fn string_value(&mut self, value: &str) -> TreeId {
        let ty = self.string_type();
        self.node(Tree::Str {
            value: value.to_owned(),
            ty,
        })
    }

    /// Address of a static `string` variable holding `value`, shared by
    /// every use of the same text.
    pub(crate) fn ptr_string_constant(&mut self, value: &str) -> TreeId {
        let sym = match self.caches.strings.get(value) {
            Some(&sym) => sym,
            None => {
                let ty = self.string_type();
                let init = self.string_value(value);
                let sym = self.static_constant("go.string", ty, init);
                self.caches.strings.insert(value.to_owned(), sym);
                sym
            }
        };
        let decl = self.decl_ref(sym);
        self.addr_of(decl)
    }

    /// Null `*string`.
    pub(crate) fn null_string_ptr(&mut self) -> TreeId {
        let string = self.string_type();
        let ty = self.module.types.pointer(string);
        self.null(ty)
    }

    /// Slice record `{__values, __count, __capacity}` over `elem`.
    pub(crate) fn slice_record(&mut self, elem: TreeTypeId) -> TreeTypeId {
        if let Some(&ty) = self.caches.slice_records.get(&elem) {
            return ty;
        }
        let values = self.module.types.pointer(elem);
        let count = self.uintptr();
        let ty = self.module.types.record(
            None,
            vec![
                RecordField::new("__values", values),
                RecordField::new("__count", count),
                RecordField::new("__capacity", count),
            ],
        );
        self.caches.slice_records.insert(elem, ty);
        ty
    }

    /// Constant slice over `elems`: the elements go into a static array
    /// and the slice points at it.
    pub(crate) fn static_slice(&mut self, slice_ty: TreeTypeId, elems: Vec<TreeId>) -> TreeId {
        if elems.is_empty() {
            let values_ty = self.module.types.field_type(slice_ty, 0);
            let values = self.null(values_ty);
            let zero_count = self.uintptr_const(0);
            let zero_cap = self.uintptr_const(0);
            return self.constructor(slice_ty, vec![values, zero_count, zero_cap]);
        }
        let values_ty = self.module.types.field_type(slice_ty, 0);
        let elem_ty = self.module.types.pointee(values_ty);
        let count = elems.len() as u64;
        let array_ty = self.module.types.array(elem_ty, Some(count));
        let init = self.constructor(array_ty, elems);
        let array = self.static_constant("C", array_ty, init);
        let decl = self.decl_ref(array);
        let addr = self.addr_of(decl);
        let values = self.convert(addr, values_ty);
        let len = self.uintptr_const(count);
        let cap = self.uintptr_const(count);
        self.constructor(slice_ty, vec![values, len, cap])
    }
}
