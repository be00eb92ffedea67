//! Closures, receivers and escaping parameters.
//!
//! # Closure records
//!
//! A function literal reaches its captured variables through a record of
//! pointers, one per captured variable, passed as the static chain. Inside
//! the literal, captured variable `i` is `*(T*) chain[i]`.
//!
//! A closure used as a value must look like a plain code pointer, so it is
//! lowered to a trampoline: a runtime-allocated stub that loads the record
//! into the static chain register and jumps to the literal's code.
//!
//! # Parameters
//!
//! Methods always receive their receiver by pointer. A value receiver is
//! copied into a local on entry; a null pointer yields the zero value.
//! A parameter whose address escapes is copied into a fresh heap cell on
//! entry and every use goes through that cell.

use golow_diagnostic::ErrorCode;
use golow_ir::{DeclId, ExprId, Function, Span, TypeId, Variable};
use golow_tree::{Symbol, SymbolId, SymbolKind, TreeBinOp, TreeId, TreeTypeId};

use crate::lower::FnCtx;
use crate::runtime::RuntimeFn;
use crate::session::{Materialized, Session};


impl Session<'_> {
    /// Declare the static chain parameter of the function literal
    /// `function`, bound to its closure variable `closure`.
    pub(crate) fn bind_static_chain(&mut self, function: SymbolId, closure: DeclId) {
        let d = self.program.decl(closure);
        let mut symbol = Symbol::new(
            SymbolKind::Parameter,
            self.str(d.ident.name),
            TreeTypeId::VOID_PTR,
        );
        symbol.context = Some(function);
        symbol.span = d.span;
        symbol.linkage.artificial = true;
        symbol.linkage.readonly = true;
        let chain = self.add_symbol(symbol);
        self.caches.decls.insert(closure, Materialized::Symbol(chain));
        self.symbol_mut(function).static_chain = Some(chain);
    }

    /// Captured variable `index` of the function literal `function`, as
    /// an lvalue of type `ty`.
    pub(crate) fn closure_field(
        &mut self,
        function: SymbolId,
        index: u32,
        ty: TypeId,
        span: Span,
    ) -> TreeId {
        let Some(chain) = self.symbol(function).static_chain else {
            return self.error(
                ErrorCode::E9001,
                span,
                "captured variable used outside a function literal",
            );
        };
        let value_ty = self.lower_type(ty);
        if value_ty.is_error() {
            return TreeId::ERROR;
        }
        let slots = self.module.types.array(TreeTypeId::VOID_PTR, None);
        let slots_ptr = self.module.types.pointer(slots);
        let chain = self.decl_ref(chain);
        let record = self.convert(chain, slots_ptr);
        let record = self.indirect(record);
        let i = self.uintptr_const(u64::from(index));
        let slot = self.index(record, i);
        let ptr_ty = self.module.types.pointer(value_ty);
        let ptr = self.convert(slot, ptr_ty);
        self.indirect(ptr)
    }

    /// A function literal bound to `captures`, as a code pointer of the
    /// closure's function type `ty`.
    pub(crate) fn lower_closure(
        &mut self,
        ctx: &mut FnCtx,
        func: DeclId,
        captures: &[ExprId],
        ty: TypeId,
    ) -> TreeId {
        let fn_ty = self.lower_type(ty);
        let code = match self.materialize(func, Some(ctx.function)) {
            Materialized::Symbol(sym) => {
                let decl = self.decl_ref(sym);
                self.addr_of(decl)
            }
            _ => return TreeId::ERROR,
        };
        if captures.is_empty() {
            return self.convert(code, fn_ty);
        }

        let count = captures.len() as u64;
        let record_ty = self.module.types.array(TreeTypeId::VOID_PTR, Some(count));
        let record_ptr = self.module.types.pointer(record_ty);
        let size = self.uintptr_const(count * self.config.target.pointer_size);
        let alloc = self.call_runtime(RuntimeFn::New, vec![size]);
        let alloc = self.convert(alloc, record_ptr);
        let record = self.temp(Some(ctx.function), "closure", record_ptr, Some(alloc));

        let mut stmts = vec![self.decl_expr(record)];
        for (i, &capture) in (0u64..).zip(captures) {
            let value = self.lower_expr(ctx, capture);
            let base = self.decl_ref(record);
            let base = self.indirect(base);
            let i = self.uintptr_const(i);
            let slot = self.index(base, i);
            stmts.push(self.assign(slot, value));
        }
        let chain = self.decl_ref(record);
        let value = self.trampoline(ctx.function, code, chain, fn_ty, &mut stmts);
        self.seq(stmts, Some(value))
    }

    /// Allocate and initialize a trampoline calling `code` with `chain`.
    /// The set-up statements go to `stmts`; returns the code pointer.
    fn trampoline(
        &mut self,
        function: SymbolId,
        code: TreeId,
        chain: TreeId,
        fn_ty: TreeTypeId,
        stmts: &mut Vec<TreeId>,
    ) -> TreeId {
        let target = self.config.target;
        let size = self.uintptr_const(target.trampoline_alloc_size());
        let alloc = self.call_runtime(RuntimeFn::AllocateTrampoline, vec![size]);
        let tramp = self.temp(Some(function), "trampoline", TreeTypeId::VOID_PTR, Some(alloc));
        stmts.push(self.decl_expr(tramp));

        let tramp_ref = self.decl_ref(tramp);
        stmts.push(self.call_runtime(RuntimeFn::InitTrampoline, vec![tramp_ref, code, chain]));

        let tramp_ref = self.decl_ref(tramp);
        let value = if target.trampoline_tag == 0 {
            tramp_ref
        } else {
            let uintptr = self.uintptr();
            let bits = self.convert(tramp_ref, uintptr);
            let tag = self.uintptr_const(target.trampoline_tag);
            self.binary(TreeBinOp::BitOr, bits, tag, uintptr)
        };
        tracing::trace!(
            size = target.trampoline_alloc_size(),
            tag = target.trampoline_tag,
            "built trampoline"
        );
        self.convert(value, fn_ty)
    }

    // ── Parameters ──────────────────────────────────────────────

    /// Parameter symbols of `func`, receiver first, plus the entry
    /// statements that bind receivers and escaping parameters.
    pub(crate) fn lower_params(
        &mut self,
        func: &Function,
        function: SymbolId,
    ) -> (Vec<SymbolId>, Vec<TreeId>) {
        let program = self.program;
        let mut params = Vec::with_capacity(func.params.len() + 1);
        let mut prologue = Vec::new();
        for &decl in func.receiver.iter().chain(&func.params) {
            let Some(var) = program.decl(decl).as_var() else {
                continue;
            };
            let by_pointer = var.is_receiver() && self.types.points_to(var.ty).is_none();
            let param = if by_pointer {
                self.value_receiver(decl, var, function, &mut prologue)
            } else if var.is_in_heap() {
                self.heap_param(decl, var, function, &mut prologue)
            } else {
                match self.materialize(decl, Some(function)) {
                    Materialized::Symbol(sym) => Some(sym),
                    _ => None,
                }
            };
            params.extend(param);
        }
        (params, prologue)
    }

    /// `<name>.pointer`, copied into the receiver variable on entry.
    fn value_receiver(
        &mut self,
        decl: DeclId,
        var: &Variable,
        function: SymbolId,
        prologue: &mut Vec<TreeId>,
    ) -> Option<SymbolId> {
        let value_ty = self.lower_type(var.ty);
        if value_ty.is_error() {
            return None;
        }
        let ptr_ty = self.module.types.pointer(value_ty);
        let param = self.hidden_param(decl, "pointer", ptr_ty, function);

        let ptr = self.decl_ref(param);
        let null = self.null(ptr_ty);
        let present = self.binary(TreeBinOp::Ne, ptr, null, TreeTypeId::BOOL);
        let ptr = self.decl_ref(param);
        let load = self.indirect(ptr);
        let zero = self.zero_value(value_ty);
        let value = self.cond(present, load, Some(zero), value_ty);
        self.bind_local(decl, function, value, prologue);
        Some(param)
    }

    /// `<name>.param`, copied into a heap cell on entry.
    fn heap_param(
        &mut self,
        decl: DeclId,
        var: &Variable,
        function: SymbolId,
        prologue: &mut Vec<TreeId>,
    ) -> Option<SymbolId> {
        let value_ty = self.lower_type(var.ty);
        if value_ty.is_error() {
            return None;
        }
        let param = self.hidden_param(decl, "param", value_ty, function);
        let value = self.decl_ref(param);
        self.bind_local(decl, function, value, prologue);
        Some(param)
    }

    fn hidden_param(
        &mut self,
        decl: DeclId,
        suffix: &str,
        ty: TreeTypeId,
        function: SymbolId,
    ) -> SymbolId {
        let d = self.program.decl(decl);
        let name = format!("{}.{suffix}", self.str(d.ident.name));
        let mut symbol = Symbol::new(SymbolKind::Parameter, name, ty);
        symbol.context = Some(function);
        symbol.span = d.span;
        symbol.linkage.readonly = true;
        self.add_symbol(symbol)
    }

    /// Declare the local of `decl` and initialize it with `value`.
    fn bind_local(
        &mut self,
        decl: DeclId,
        function: SymbolId,
        value: TreeId,
        prologue: &mut Vec<TreeId>,
    ) {
        match self.materialize(decl, Some(function)) {
            Materialized::Symbol(local) => {
                let ty = self.symbol(local).ty;
                let value = self.convert(value, ty);
                self.symbol_mut(local).initial = Some(value);
                prologue.push(self.decl_expr(local));
            }
            Materialized::Heap(cell) => self.bind_heap_cell(cell, value, prologue),
            Materialized::Error => {}
        }
    }

    /// Allocate the heap cell `cell` points to and store `value` in it.
    pub(crate) fn bind_heap_cell(
        &mut self,
        cell: SymbolId,
        value: TreeId,
        prologue: &mut Vec<TreeId>,
    ) {
        let ptr_ty = self.symbol(cell).ty;
        let value_ty = self.module.types.pointee(ptr_ty);
        let alloc = self.heap_alloc(value_ty);
        self.symbol_mut(cell).initial = Some(alloc);
        prologue.push(self.decl_expr(cell));
        let ptr = self.decl_ref(cell);
        let target = self.indirect(ptr);
        prologue.push(self.assign(target, value));
    }

    /// `(T*) __go_new(sizeof(T))`.
    pub(crate) fn heap_alloc(&mut self, ty: TreeTypeId) -> TreeId {
        let size = self.size_of(ty);
        let size = self.uintptr_const(size);
        let alloc = self.call_runtime(RuntimeFn::New, vec![size]);
        let ptr_ty = self.module.types.pointer(ty);
        self.convert(alloc, ptr_ty)
    }
}
