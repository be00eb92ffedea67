//! Statement lowering.

use golow_diagnostic::ErrorCode;
use golow_ir::{Block, DeclId, ExprId, SelectCase, SelectOp, Stmt};
use golow_tree::{RecordField, SymbolId, Tree, TreeBinOp, TreeId, TreeTypeId};

use super::FnCtx;
use crate::channel::SendMode;
use crate::runtime::RuntimeFn;
use crate::session::{Materialized, Session};

impl Session<'_> {
    pub(crate) fn lower_block(&mut self, ctx: &mut FnCtx, block: &Block) -> TreeId {
        let stmts = self.lower_stmts(ctx, &block.stmts);
        self.seq(stmts, None)
    }

    /// Lower `stmts` in order, flushing the refcount queue after every
    /// statement that filled a slot.
    pub(crate) fn lower_stmts(&mut self, ctx: &mut FnCtx, stmts: &[Stmt]) -> Vec<TreeId> {
        let mut out = Vec::with_capacity(stmts.len());
        for stmt in stmts {
            out.push(self.lower_stmt(ctx, stmt));
            if ctx.pending_flush {
                ctx.pending_flush = false;
                if let Some(queue) = &ctx.queue {
                    out.push(self.refcount_flush(queue));
                }
            }
        }
        out
    }

    fn lower_stmt(&mut self, ctx: &mut FnCtx, stmt: &Stmt) -> TreeId {
        match stmt {
            Stmt::Expr(expr) => self.lower_expr(ctx, *expr),
            Stmt::VarDecl(decl) => self.lower_var_decl(ctx, *decl),
            Stmt::Assign { lhs, rhs } => {
                let lhs = self.lower_expr(ctx, *lhs);
                let rhs = self.lower_expr(ctx, *rhs);
                self.assign(lhs, rhs)
            }
            Stmt::Return(values) => self.lower_return(ctx, values),
            Stmt::If {
                cond,
                then_block,
                else_block,
            } => {
                let cond = self.lower_expr(ctx, *cond);
                let then_ = self.lower_block(ctx, then_block);
                let else_ = else_block.as_ref().map(|block| self.lower_block(ctx, block));
                self.cond(cond, then_, else_, TreeTypeId::VOID)
            }
            Stmt::Block(block) => self.lower_block(ctx, block),
            Stmt::Send { chan, value } => {
                let span = self.program.expr(*chan).span;
                let Some(elem) = self.chan_elem(*chan) else {
                    return self.not_a_channel(span);
                };
                let chan = self.lower_expr(ctx, *chan);
                let value = self.lower_expr(ctx, *value);
                let mode = SendMode::Blocking { for_select: false };
                self.lower_send(ctx.function, chan, value, elem, mode, span)
            }
            Stmt::Select { cases, default } => self.lower_select(ctx, cases, default.as_ref()),
            Stmt::Label(label) => {
                let sym = self.label_for(*label, ctx.function);
                self.node(Tree::Label(sym))
            }
            Stmt::Goto(label) => {
                let sym = self.label_for(*label, ctx.function);
                self.node(Tree::Goto(sym))
            }
        }
    }

    /// Declaration of a local. With a pre-init block the variable starts
    /// zeroed, the block runs, then the initializer is assigned.
    fn lower_var_decl(&mut self, ctx: &mut FnCtx, decl: DeclId) -> TreeId {
        let program = self.program;
        let d = program.decl(decl);
        let Some(var) = d.as_var() else {
            return self.error(
                ErrorCode::E9001,
                d.span,
                "declaration statement of a non-variable",
            );
        };
        let materialized = self.materialize(decl, Some(ctx.function));
        let value_ty = match materialized {
            Materialized::Symbol(sym) => self.symbol(sym).ty,
            Materialized::Heap(cell) => {
                let ptr = self.symbol(cell).ty;
                self.module.types.pointee(ptr)
            }
            Materialized::Error => return TreeId::ERROR,
        };

        let preinit = var.preinit.as_ref().map(|block| self.lower_block(ctx, block));
        let init = var.init.map(|init| self.lower_expr(ctx, init));
        let (first, later) = match preinit {
            None => (init, None),
            Some(_) => (None, init),
        };
        let first = match first {
            Some(value) => self.convert(value, value_ty),
            None => self.zero_value(value_ty),
        };

        let mut stmts = Vec::new();
        match materialized {
            Materialized::Symbol(sym) => {
                self.symbol_mut(sym).initial = Some(first);
                stmts.push(self.decl_expr(sym));
            }
            Materialized::Heap(cell) => self.bind_heap_cell(cell, first, &mut stmts),
            Materialized::Error => {}
        }
        stmts.extend(preinit);
        if let Some(later) = later {
            let target = self.symbol_for(decl, Some(ctx.function));
            stmts.push(self.assign(target, later));
        }
        self.seq(stmts, None)
    }

    /// `return`. Results go through the function's result slot; several
    /// results are stored as one record so they may read the named results
    /// they replace.
    fn lower_return(&mut self, ctx: &mut FnCtx, values: &[ExprId]) -> TreeId {
        let slot = self.symbol(ctx.function).result;
        let value = match (values, slot) {
            ([], None) => None,
            ([], Some(slot)) => Some(self.decl_ref(slot)),
            ([one], Some(slot)) => {
                let value = self.lower_expr(ctx, *one);
                let slot = self.decl_ref(slot);
                Some(self.assign(slot, value))
            }
            (many, Some(slot)) => {
                let ty = self.symbol(slot).ty;
                let elems = many.iter().map(|&value| self.lower_expr(ctx, value)).collect();
                let record = self.constructor(ty, elems);
                let slot = self.decl_ref(slot);
                Some(self.assign(slot, record))
            }
            (_, None) => {
                let span = self.program.expr(values[0]).span;
                return self.error(
                    ErrorCode::E9001,
                    span,
                    "return with values from a void function",
                );
            }
        };
        self.node(Tree::Return(value))
    }

    /// `select`: the runtime picks a ready case from a table of
    /// `{channel, is_send}` entries and returns its index, or the case
    /// count when the default case runs.
    ///
    /// Channels and sent values are evaluated once, before the runtime
    /// call; the chosen operation then runs with the select flag set.
    fn lower_select(
        &mut self,
        ctx: &mut FnCtx,
        cases: &[SelectCase],
        default: Option<&Block>,
    ) -> TreeId {
        let case_record = self.builtin_record("__go_select_case", |_| {
            vec![
                RecordField::new("__channel", TreeTypeId::VOID_PTR),
                RecordField::new("__is_send", TreeTypeId::BOOL),
            ]
        });
        let count = cases.len() as u64;
        let table_ty = self.module.types.array(case_record, Some(count));

        let mut stmts = Vec::new();
        let mut entries = Vec::with_capacity(cases.len());
        let mut sent = Vec::with_capacity(cases.len());
        for case in cases {
            let (chan, is_send) = match &case.op {
                SelectOp::Send { chan, value } => {
                    let value = self.lower_expr(ctx, *value);
                    if value.is_error() {
                        sent.push(None);
                    } else {
                        let ty = self.type_of(value);
                        let held = self.temp(Some(ctx.function), "select_value", ty, Some(value));
                        stmts.push(self.decl_expr(held));
                        sent.push(Some(held));
                    }
                    (*chan, true)
                }
                SelectOp::Receive { chan, .. } => {
                    sent.push(None);
                    (*chan, false)
                }
            };
            let chan = self.lower_expr(ctx, chan);
            let is_send = self.bool_const(is_send);
            entries.push(self.constructor(case_record, vec![chan, is_send]));
        }
        let table_init = self.constructor(table_ty, entries);
        let table = self.temp(Some(ctx.function), "select_cases", table_ty, Some(table_init));
        stmts.push(self.decl_expr(table));

        let table_addr = self.decl_ref(table);
        let table_addr = self.addr_of(table_addr);
        let count_arg = self.uintptr_const(count);
        let has_default = self.bool_const(default.is_some());
        let chosen =
            self.call_runtime(RuntimeFn::Select, vec![table_addr, count_arg, has_default]);
        let uintptr = self.uintptr();
        let index = self.temp(Some(ctx.function), "select_index", uintptr, Some(chosen));
        stmts.push(self.decl_expr(index));

        let mut dispatch = default.map(|block| self.lower_block(ctx, block));
        for (i, case) in cases.iter().enumerate().rev() {
            let body = self.lower_select_case(ctx, table, i, case, sent[i]);
            let chosen = self.decl_ref(index);
            let position = self.uintptr_const(i as u64);
            let test = self.binary(TreeBinOp::Eq, chosen, position, TreeTypeId::BOOL);
            dispatch = Some(self.cond(test, body, dispatch, TreeTypeId::VOID));
        }
        stmts.extend(dispatch);
        tracing::trace!(cases = cases.len(), default = default.is_some(), "lowered select");
        self.seq(stmts, None)
    }

    fn lower_select_case(
        &mut self,
        ctx: &mut FnCtx,
        table: SymbolId,
        position: usize,
        case: &SelectCase,
        sent: Option<SymbolId>,
    ) -> TreeId {
        let (chan_expr, span) = match &case.op {
            SelectOp::Send { chan, .. } | SelectOp::Receive { chan, .. } => {
                (*chan, self.program.expr(*chan).span)
            }
        };
        let Some(elem) = self.chan_elem(chan_expr) else {
            return self.not_a_channel(span);
        };
        let table = self.decl_ref(table);
        let position = self.uintptr_const(position as u64);
        let entry = self.index(table, position);
        let chan = self.field(entry, "__channel");
        let op = match (&case.op, sent) {
            (SelectOp::Send { .. }, Some(held)) => {
                let value = self.decl_ref(held);
                let mode = SendMode::Blocking { for_select: true };
                self.lower_send(ctx.function, chan, value, elem, mode, span)
            }
            (SelectOp::Send { .. }, None) => TreeId::ERROR,
            (SelectOp::Receive { into, .. }, _) => {
                let value = self.lower_receive(ctx.function, chan, elem, true);
                match into {
                    Some(into) => {
                        let target = self.lower_expr(ctx, *into);
                        self.assign(target, value)
                    }
                    None => value,
                }
            }
        };
        let body = self.lower_block(ctx, &case.body);
        self.seq(vec![op, body], None)
    }
}
