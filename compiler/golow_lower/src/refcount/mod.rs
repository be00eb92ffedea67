//! Refcount queues.
//!
//! A function that records refcount adjustments gets a queue of slots,
//! one per recorded entry. Filling a slot stores the value; flushing hands
//! the filled slots to the runtime and clears them.
//!
//! # Shapes
//!
//! | Entries | Shape |
//! |---------|-------|
//! | one, not a new-value decrement | a single pointer slot adjusted inline |
//! | anything else | a `__go_refcount` record linked into the thread's queue chain |
//!
//! The full record starts with the caller's queue, so the runtime can walk
//! the chain from `__go_refcount_head`. Entries are grouped by kind in the
//! order the record's four counts describe.

use golow_diagnostic::ErrorCode;
use golow_ir::{RefcountEntry, RefcountKind, Span};
use golow_tree::{
    Linkage, RecordField, Symbol, SymbolId, SymbolKind, Tree, TreeBinOp, TreeId, TreeTypeId,
};

use crate::runtime::RuntimeFn;
use crate::session::Session;

#[cfg(test)]
mod tests;

/// Most entries of one kind a queue can describe.
const MAX_PER_KIND: u32 = 0xffff;

const HEAD: &str = "__go_refcount_head";

/// Queue order of the entry kinds.
fn kind_rank(kind: RefcountKind) -> usize {
    match kind {
        RefcountKind::DecrementNew => 0,
        RefcountKind::DecrementComputed => 1,
        RefcountKind::DecrementOld => 2,
        RefcountKind::IncrementCopied => 3,
    }
}

/// Whether `entries` fit the single-slot shape.
pub(crate) fn is_simple(entries: &[RefcountEntry]) -> bool {
    entries.len() <= 1 && entries.iter().all(|e| e.kind != RefcountKind::DecrementNew)
}

/// Refcount queue of one function body.
#[derive(Clone, Debug)]
pub(crate) enum RefcountQueue {
    Simple {
        slot: SymbolId,
        entry: RefcountEntry,
    },
    Full {
        queue: SymbolId,
        /// Set when a slot was filled since the last flush.
        flag: SymbolId,
        /// Position in `__entries` of each recorded entry.
        slots: Vec<u32>,
    },
}

impl RefcountQueue {
    fn slot_count(&self) -> usize {
        match self {
            RefcountQueue::Simple { .. } => 1,
            RefcountQueue::Full { slots, .. } => slots.len(),
        }
    }
}

impl Session<'_> {
    /// Queue for `entries` in `function`, or `None` when there is nothing
    /// to queue, queues are disabled, or a kind overflows its count.
    pub(crate) fn refcount_queue(
        &mut self,
        function: SymbolId,
        entries: &[RefcountEntry],
        span: Span,
    ) -> Option<RefcountQueue> {
        if !self.config.refcounts || entries.is_empty() {
            return None;
        }
        let mut counts = [0u32; 4];
        for entry in entries {
            counts[kind_rank(entry.kind)] += 1;
        }
        if let Some(&count) = counts.iter().find(|&&count| count > MAX_PER_KIND) {
            self.error(
                ErrorCode::E3005,
                span,
                format!(
                    "{count} refcount entries of one kind exceed the queue limit of {MAX_PER_KIND}"
                ),
            );
            return None;
        }

        if is_simple(entries) {
            let null = self.null(TreeTypeId::VOID_PTR);
            let slot = self.temp(Some(function), "refcount", TreeTypeId::VOID_PTR, Some(null));
            tracing::trace!(kind = ?entries[0].kind, "simple refcount queue");
            return Some(RefcountQueue::Simple {
                slot,
                entry: entries[0],
            });
        }

        let mut order: Vec<usize> = (0..entries.len()).collect();
        order.sort_by_key(|&i| kind_rank(entries[i].kind));
        let mut slots = vec![0u32; entries.len()];
        for (position, &i) in (0u32..).zip(&order) {
            slots[i] = position;
        }

        let record = self.queue_record(entries.len() as u64);
        let entry_record = self.entry_record();
        let head = self.refcount_head();
        let caller = self.decl_ref(head);
        let scanned = self.bool_const(false);
        let not_scanned = self.bool_const(false);
        let u16_ty = self.module.types.int(16, false);
        let mut elems = vec![caller, scanned, not_scanned];
        for count in counts {
            elems.push(self.int_const(i128::from(count), u16_ty));
        }
        let array_ty = self.module.types.field_type(record, 7);
        let mut initial = Vec::with_capacity(entries.len());
        for &i in &order {
            let td = self.type_descriptor(entries[i].ty);
            let value = self.null(TreeTypeId::VOID_PTR);
            initial.push(self.constructor(entry_record, vec![td, value]));
        }
        elems.push(self.constructor(array_ty, initial));
        let init = self.constructor(record, elems);

        let queue = self.temp(Some(function), "refcount", record, Some(init));
        let clear = self.bool_const(false);
        let flag = self.temp(Some(function), "refcount_flag", TreeTypeId::BOOL, Some(clear));
        tracing::trace!(entries = entries.len(), ?counts, "full refcount queue");
        Some(RefcountQueue::Full { queue, flag, slots })
    }

    fn entry_record(&mut self) -> TreeTypeId {
        self.builtin_record("__go_refcount_entry", |s| {
            let td = s.descriptor_ptr_type();
            vec![
                RecordField::new("__descriptor", td),
                RecordField::new("__value", TreeTypeId::VOID_PTR),
            ]
        })
    }

    fn queue_record(&mut self, entries: u64) -> TreeTypeId {
        let entry = self.entry_record();
        let u16_ty = self.module.types.int(16, false);
        let array = self.module.types.array(entry, Some(entries));
        self.module.types.record(
            Some("__go_refcount"),
            vec![
                RecordField::new("__caller", TreeTypeId::VOID_PTR),
                RecordField::new("__callers_were_scanned", TreeTypeId::BOOL),
                RecordField::new("__did_not_scan_decrements", TreeTypeId::BOOL),
                RecordField::new("__decrement_new_count", u16_ty),
                RecordField::new("__decrement_computed_count", u16_ty),
                RecordField::new("__decrement_old_count", u16_ty),
                RecordField::new("__increment_copy_count", u16_ty),
                RecordField::new("__entries", array),
            ],
        )
    }

    /// The runtime's thread-local head of the queue chain.
    fn refcount_head(&mut self) -> SymbolId {
        if let Some(sym) = self.module.symbols.lookup(HEAD) {
            return sym;
        }
        let mut symbol = Symbol::new(SymbolKind::Variable, HEAD, TreeTypeId::VOID_PTR);
        symbol.linkage = Linkage {
            thread_local: true,
            ..Linkage::EXTERNAL
        };
        self.add_symbol(symbol)
    }

    /// Statements run on function entry.
    fn refcount_enter(&mut self, queue: &RefcountQueue) -> Vec<TreeId> {
        match queue {
            RefcountQueue::Simple { slot, .. } => vec![self.decl_expr(*slot)],
            RefcountQueue::Full { queue, flag, .. } => {
                let declare_queue = self.decl_expr(*queue);
                let declare_flag = self.decl_expr(*flag);
                let head = self.refcount_head();
                let head = self.decl_ref(head);
                let this = self.decl_ref(*queue);
                let this = self.addr_of(this);
                let link = self.assign(head, this);
                vec![declare_queue, declare_flag, link]
            }
        }
    }

    /// Evaluate `value`, store it in the slot of `entry` and yield it.
    pub(crate) fn refcount_record(
        &mut self,
        queue: &RefcountQueue,
        function: SymbolId,
        entry: u32,
        value: TreeId,
        span: Span,
    ) -> TreeId {
        if entry as usize >= queue.slot_count() {
            return self.error(
                ErrorCode::E9001,
                span,
                format!("refcount entry {entry} is not in the function's queue"),
            );
        }
        if value.is_error() {
            return TreeId::ERROR;
        }
        let ty = self.type_of(value);
        let held = self.temp(Some(function), "rc", ty, Some(value));
        let mut stmts = vec![self.decl_expr(held)];
        match queue {
            RefcountQueue::Simple { slot, .. } => {
                let slot = self.decl_ref(*slot);
                let stored = self.decl_ref(held);
                stmts.push(self.assign(slot, stored));
            }
            RefcountQueue::Full { queue, flag, slots } => {
                let position = slots[entry as usize];
                let record = self.decl_ref(*queue);
                let entries = self.field(record, "__entries");
                let position = self.uintptr_const(u64::from(position));
                let element = self.index(entries, position);
                let target = self.field(element, "__value");
                let stored = self.decl_ref(held);
                stmts.push(self.assign(target, stored));
                let flag = self.decl_ref(*flag);
                let set = self.bool_const(true);
                stmts.push(self.assign(flag, set));
            }
        }
        let result = self.decl_ref(held);
        self.seq(stmts, Some(result))
    }

    /// Hand the filled slots to the runtime.
    pub(crate) fn refcount_flush(&mut self, queue: &RefcountQueue) -> TreeId {
        match queue {
            RefcountQueue::Simple { slot, entry } => {
                let f = if entry.kind == RefcountKind::IncrementCopied {
                    RuntimeFn::IncrementRefcount
                } else {
                    RuntimeFn::DecrementRefcount
                };
                let value = self.decl_ref(*slot);
                let null = self.null(TreeTypeId::VOID_PTR);
                let filled = self.binary(TreeBinOp::Ne, value, null, TreeTypeId::BOOL);
                let value = self.decl_ref(*slot);
                let td = self.type_descriptor(entry.ty);
                let adjust = self.call_runtime(f, vec![value, td]);
                let slot_ref = self.decl_ref(*slot);
                let null = self.null(TreeTypeId::VOID_PTR);
                let clear = self.assign(slot_ref, null);
                let body = self.seq(vec![adjust, clear], None);
                self.cond(filled, body, None, TreeTypeId::VOID)
            }
            RefcountQueue::Full { queue, flag, .. } => {
                let filled = self.decl_ref(*flag);
                let record = self.decl_ref(*queue);
                let record = self.addr_of(record);
                let flush = self.call_runtime(RuntimeFn::RefcountFlushQueue, vec![record]);
                let flag_ref = self.decl_ref(*flag);
                let unset = self.bool_const(false);
                let clear = self.assign(flag_ref, unset);
                let body = self.seq(vec![flush, clear], None);
                self.cond(filled, body, None, TreeTypeId::VOID)
            }
        }
    }

    /// Run `body` with the queue live; every exit flushes it and unlinks
    /// it from the chain.
    pub(crate) fn refcount_wrap(&mut self, queue: &RefcountQueue, body: TreeId) -> TreeId {
        let mut stmts = self.refcount_enter(queue);
        let mut exit = vec![self.refcount_flush(queue)];
        if let RefcountQueue::Full { queue, .. } = queue {
            let head = self.refcount_head();
            let head = self.decl_ref(head);
            let record = self.decl_ref(*queue);
            let caller = self.field(record, "__caller");
            exit.push(self.assign(head, caller));
        }
        let finally = self.seq(exit, None);
        stmts.push(self.node(Tree::TryFinally { body, finally }));
        self.seq(stmts, None)
    }
}
