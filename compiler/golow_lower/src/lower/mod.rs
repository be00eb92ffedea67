//! Function bodies.
//!
//! A body is lowered once, when its function is first materialized. The
//! per-body state lives in a [`FnCtx`] passed down the statement and
//! expression lowering; everything shared across bodies stays in the
//! session.
//!
//! # Entry and exit
//!
//! The lowered body runs, in order:
//!
//! 1. parameter bindings (receiver copies, heap cells for escaping
//!    parameters)
//! 2. zeroing of the result slot when results are named
//! 3. the statements
//!
//! With a refcount queue, the whole body is wrapped so the queue is
//! flushed and unlinked on every exit.

mod expr;
mod stmt;

use golow_ir::DeclId;
use golow_tree::SymbolId;

use crate::refcount::RefcountQueue;
use crate::session::Session;

/// State of the body being lowered.
pub(crate) struct FnCtx {
    /// Function whose body this is; the context of its locals.
    pub function: SymbolId,
    pub queue: Option<RefcountQueue>,
    /// Refcount slots were filled by the statement being lowered.
    pub pending_flush: bool,
}

impl FnCtx {
    pub(crate) fn new(function: SymbolId) -> Self {
        FnCtx {
            function,
            queue: None,
            pending_flush: false,
        }
    }
}

impl Session<'_> {
    /// Lower the body of function `decl` into `function`'s symbol.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(function = %self.symbol(function).name)
    )]
    pub(crate) fn lower_function(&mut self, decl: DeclId, function: SymbolId) {
        let program = self.program;
        let d = program.decl(decl);
        let Some(func) = d.as_function() else {
            return;
        };
        let Some(body) = &func.body else {
            return;
        };

        let mut ctx = FnCtx::new(function);
        ctx.queue = self.refcount_queue(function, &func.refcounts, d.span);

        let (params, mut stmts) = self.lower_params(func, function);
        self.symbol_mut(function).params = params;
        if !func.results.is_empty() {
            if let Some(slot) = self.symbol(function).result {
                let ty = self.symbol(slot).ty;
                let zero = self.zero_value(ty);
                let slot = self.decl_ref(slot);
                stmts.push(self.assign(slot, zero));
            }
        }
        stmts.extend(self.lower_stmts(&mut ctx, &body.stmts));

        let mut lowered = self.seq(stmts, None);
        if let Some(queue) = ctx.queue.take() {
            lowered = self.refcount_wrap(&queue, lowered);
        }
        self.symbol_mut(function).body = Some(lowered);
        tracing::debug!(nodes = self.module.nodes.len(), "lowered function body");
    }
}
