//! Expression lowering.

use golow_diagnostic::ErrorCode;
use golow_ir::{ExprId, ExprKind, Span, TypeId, TypeKind};
use golow_tree::{Tree, TreeId, TreeType, TreeTypeId};

use super::FnCtx;
use crate::channel::SendMode;
use crate::constant::{binary_op, unary_op};
use crate::runtime::RuntimeFn;
use crate::session::{Materialized, Session};
use crate::stack::ensure_sufficient_stack;

impl Session<'_> {
    pub(crate) fn lower_expr(&mut self, ctx: &mut FnCtx, expr: ExprId) -> TreeId {
        ensure_sufficient_stack(|| self.lower_expr_inner(ctx, expr))
    }

    fn lower_expr_inner(&mut self, ctx: &mut FnCtx, expr: ExprId) -> TreeId {
        let program = self.program;
        let e = program.expr(expr);
        match &e.kind {
            ExprKind::Int(_)
            | ExprKind::Float(_)
            | ExprKind::Bool(_)
            | ExprKind::Str(_)
            | ExprKind::Nil => self.constant_value(expr).unwrap_or(TreeId::ERROR),
            ExprKind::Var(decl) => self.symbol_for(*decl, Some(ctx.function)),
            ExprKind::Func(decl) => match self.materialize(*decl, Some(ctx.function)) {
                Materialized::Symbol(sym) => {
                    let decl = self.decl_ref(sym);
                    self.addr_of(decl)
                }
                _ => TreeId::ERROR,
            },
            ExprKind::Closure { func, captures } => self.lower_closure(ctx, *func, captures, e.ty),
            ExprKind::ClosureField(index) => {
                self.closure_field(ctx.function, *index, e.ty, e.span)
            }
            ExprKind::Call { callee, args } => self.lower_call(ctx, *callee, args, e.span),
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs = self.lower_expr(ctx, *lhs);
                let rhs = self.lower_expr(ctx, *rhs);
                if lhs.is_error() || rhs.is_error() {
                    return TreeId::ERROR;
                }
                let operand = self.type_of(lhs);
                let rhs = self.convert(rhs, operand);
                let ty = self.lower_type(e.ty);
                self.binary(binary_op(*op), lhs, rhs, ty)
            }
            ExprKind::Unary { op, operand } => {
                let operand = self.lower_expr(ctx, *operand);
                if operand.is_error() {
                    return TreeId::ERROR;
                }
                let ty = self.lower_type(e.ty);
                self.node(Tree::Unary {
                    op: unary_op(*op),
                    expr: operand,
                    ty,
                })
            }
            ExprKind::AddrOf(inner) => {
                let inner = self.lower_expr(ctx, *inner);
                self.addr_of(inner)
            }
            ExprKind::Deref(inner) => {
                let inner = self.lower_expr(ctx, *inner);
                self.indirect(inner)
            }
            ExprKind::Field { base, index } => {
                let base = self.lower_expr(ctx, *base);
                self.field_at(base, *index)
            }
            ExprKind::Index { base, index } => self.lower_index(ctx, *base, *index, e.span),
            ExprKind::Composite(elems) => {
                let ty = self.lower_type(e.ty);
                let elems = elems.iter().map(|&elem| self.lower_expr(ctx, elem)).collect();
                self.constructor(ty, elems)
            }
            ExprKind::Convert(inner) => {
                let inner = self.lower_expr(ctx, *inner);
                let ty = self.lower_type(e.ty);
                self.convert(inner, ty)
            }
            ExprKind::Receive { chan } => {
                let Some(elem) = self.chan_elem(*chan) else {
                    return self.not_a_channel(e.span);
                };
                let chan = self.lower_expr(ctx, *chan);
                self.lower_receive(ctx.function, chan, elem, false)
            }
            ExprKind::TryReceive { chan, ok } => {
                let Some(elem) = self.chan_elem(*chan) else {
                    return self.not_a_channel(e.span);
                };
                let chan = self.lower_expr(ctx, *chan);
                let ok = self.lower_expr(ctx, *ok);
                self.lower_try_receive(ctx.function, chan, elem, ok)
            }
            ExprKind::TrySend { chan, value } => {
                let Some(elem) = self.chan_elem(*chan) else {
                    return self.not_a_channel(e.span);
                };
                let chan = self.lower_expr(ctx, *chan);
                let value = self.lower_expr(ctx, *value);
                let mode = SendMode::Nonblocking { for_select: false };
                self.lower_send(ctx.function, chan, value, elem, mode, e.span)
            }
            ExprKind::MakeInterface(inner) => {
                self.lower_make_interface(ctx, *inner, e.ty, e.span)
            }
            ExprKind::MakeMap { size } => {
                let descriptor = self.map_descriptor(e.ty);
                let size = match size {
                    Some(size) => self.lower_expr(ctx, *size),
                    None => self.uintptr_const(0),
                };
                let map = self.call_runtime(RuntimeFn::NewMap, vec![descriptor, size]);
                let ty = self.lower_type(e.ty);
                self.convert(map, ty)
            }
            ExprKind::Refcounted { value, entry } => {
                let value = self.lower_expr(ctx, *value);
                let Some(queue) = &ctx.queue else {
                    return value;
                };
                let recorded = self.refcount_record(queue, ctx.function, *entry, value, e.span);
                ctx.pending_flush = true;
                recorded
            }
        }
    }

    pub(super) fn chan_elem(&self, chan: ExprId) -> Option<TypeId> {
        self.types.channel_elem(self.program.expr(chan).ty)
    }

    pub(super) fn not_a_channel(&mut self, span: Span) -> TreeId {
        self.error(ErrorCode::E9001, span, "channel operation on a non-channel value")
    }

    /// A call. For a method the receiver is the first argument; one
    /// declared by value is passed by address.
    fn lower_call(
        &mut self,
        ctx: &mut FnCtx,
        callee: ExprId,
        args: &[ExprId],
        span: Span,
    ) -> TreeId {
        let program = self.program;
        let callee_expr = program.expr(callee);
        let Some(sig) = self.types.func_type(callee_expr.ty).cloned() else {
            return self.error(ErrorCode::E9001, span, "call of a non-function value");
        };
        let receiver_by_address = sig
            .receiver
            .is_some_and(|receiver| self.types.points_to(receiver).is_none());

        let func = match &callee_expr.kind {
            ExprKind::Func(decl) => match self.materialize(*decl, Some(ctx.function)) {
                Materialized::Symbol(sym) => self.decl_ref(sym),
                _ => TreeId::ERROR,
            },
            _ => self.lower_expr(ctx, callee),
        };
        let params = self.param_types(func);
        let mut lowered = Vec::with_capacity(args.len());
        for (i, &arg) in args.iter().enumerate() {
            let mut value = self.lower_expr(ctx, arg);
            if i == 0 && receiver_by_address {
                value = self.address_of_value(ctx.function, value, "receiver");
            }
            if let Some(&param) = params.get(i) {
                value = self.convert(value, param);
            }
            lowered.push(value);
        }
        if func.is_error() || lowered.iter().copied().any(TreeId::is_error) {
            return TreeId::ERROR;
        }
        let ty = self.lower_results(&sig.results);
        self.node_at(
            Tree::Call {
                func,
                args: lowered,
                ty,
            },
            span,
        )
    }

    /// Parameter types of a function symbol reference or code pointer.
    fn param_types(&self, func: TreeId) -> Vec<TreeTypeId> {
        let types = &self.module.types;
        let mut ty = self.type_of(func);
        if let TreeType::Pointer(to) = types.get(ty) {
            ty = *to;
        }
        match types.get(ty) {
            TreeType::Function { params, .. } => params.clone(),
            _ => Vec::new(),
        }
    }

    fn lower_index(&mut self, ctx: &mut FnCtx, base: ExprId, index: ExprId, span: Span) -> TreeId {
        let base_ty = self.program.expr(base).ty;
        let kind = self.types.underlying_kind(base_ty).clone();
        let base = self.lower_expr(ctx, base);
        let index = self.lower_expr(ctx, index);
        match kind {
            TypeKind::Array { .. } => self.index(base, index),
            TypeKind::Pointer(to)
                if matches!(self.types.underlying_kind(to), TypeKind::Array { .. }) =>
            {
                let array = self.indirect(base);
                self.index(array, index)
            }
            TypeKind::Slice(elem) => {
                let elem = self.lower_type(elem);
                let values = self.field(base, "__values");
                let unbounded = self.module.types.array(elem, None);
                let unbounded = self.module.types.pointer(unbounded);
                let values = self.convert(values, unbounded);
                let values = self.indirect(values);
                self.index(values, index)
            }
            TypeKind::String => {
                let string = self.indirect(base);
                let data = self.field(string, "__data");
                self.index(data, index)
            }
            _ => self.error(ErrorCode::E9001, span, "index of a non-indexable value"),
        }
    }

    /// Box `inner` into a value of interface type `iface`.
    ///
    /// A pointer is stored directly; any other value is copied to the heap
    /// by the runtime. Converting between interface types keeps the value.
    fn lower_make_interface(
        &mut self,
        ctx: &mut FnCtx,
        inner: ExprId,
        iface: TypeId,
        span: Span,
    ) -> TreeId {
        let source = self.program.expr(inner).ty;
        let value = self.lower_expr(ctx, inner);
        let target = self.interface_type();
        if matches!(self.types.underlying_kind(source), TypeKind::Interface(_)) {
            return self.convert(value, target);
        }
        if value.is_error() {
            return TreeId::ERROR;
        }
        let descriptor = self.type_descriptor(source);
        let methods = self.itable(iface, source, span);
        let boxed = if self.types.points_to(source).is_some() {
            self.call_runtime(RuntimeFn::NewInterfacePointer, vec![descriptor, methods, value])
        } else {
            let ty = self.type_of(value);
            let copy = self.temp(Some(ctx.function), "object", ty, Some(value));
            let declare = self.decl_expr(copy);
            let size = self.size_of(ty);
            let size = self.uintptr_const(size);
            let object = self.decl_ref(copy);
            let object = self.addr_of(object);
            let call = self.call_runtime(
                RuntimeFn::NewInterfaceObject,
                vec![descriptor, methods, size, object],
            );
            self.seq(vec![declare], Some(call))
        };
        self.convert(boxed, target)
    }
}
