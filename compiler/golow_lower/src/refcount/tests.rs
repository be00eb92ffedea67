use golow_diagnostic::ErrorCode;
use golow_ir::{
    Block, DeclId, ExprKind, Function, Program, ProgramBuilder, RefcountEntry, RefcountKind, Span,
    Stmt, TypeId, VarFlags,
};
use golow_tree::{SymbolId, TreeId};
use pretty_assertions::assert_eq;

use super::{is_simple, RefcountQueue};
use crate::config::LowerConfig;
use crate::session::{Materialized, Session};

fn entry(kind: RefcountKind) -> RefcountEntry {
    RefcountEntry {
        kind,
        ty: TypeId::STRING,
    }
}

/// `func f(p *int) { p }` where the use of `p` fills slot 0 of a queue
/// with `entries`.
fn refcounted_program(entries: Vec<RefcountEntry>) -> (Program, DeclId) {
    let mut b = ProgramBuilder::new("p", "go");
    let ptr = b.types().pointer(TypeId::INT);
    let sig = b.types().function(vec![ptr], vec![]);
    let p = b.local_var("p", ptr, VarFlags::PARAMETER);
    let read = b.var(p);
    let recorded = b.expr(ExprKind::Refcounted { value: read, entry: 0 }, ptr);
    let mut func = Function::new(sig);
    func.params = vec![p];
    func.refcounts = entries;
    func.body = Some(Block::new(vec![Stmt::Expr(recorded)]));
    let f = b.function("f", func);
    (b.finish(), f)
}

fn lowered_body(program: &Program, f: DeclId, config: LowerConfig) -> (String, usize) {
    let mut s = Session::new(program, config);
    let Materialized::Symbol(sym) = s.materialize(f, None) else {
        panic!("function did not materialize");
    };
    let body = s.module().symbols.get(sym).body.unwrap();
    (s.module().render(body), s.error_count())
}

/// A session with an external function to own queue temporaries.
fn with_function(program: &Program) -> (Session<'_>, SymbolId) {
    let mut s = Session::new(program, LowerConfig::default());
    let f = program.top_level[0];
    let Materialized::Symbol(sym) = s.materialize(f, None) else {
        panic!("function did not materialize");
    };
    (s, sym)
}

fn bodiless() -> Program {
    let mut b = ProgramBuilder::new("p", "go");
    let sig = b.types().function(vec![], vec![]);
    b.function("f", Function::new(sig));
    b.finish()
}

// ── Shape selection ─────────────────────────────────────────────

#[test]
fn single_entry_is_simple_unless_it_is_new() {
    assert!(is_simple(&[]));
    assert!(is_simple(&[entry(RefcountKind::DecrementOld)]));
    assert!(is_simple(&[entry(RefcountKind::IncrementCopied)]));
    assert!(!is_simple(&[entry(RefcountKind::DecrementNew)]));
    assert!(!is_simple(&[
        entry(RefcountKind::DecrementOld),
        entry(RefcountKind::DecrementOld),
    ]));
}

#[test]
fn no_entries_no_queue() {
    let program = bodiless();
    let (mut s, f) = with_function(&program);
    assert!(s.refcount_queue(f, &[], Span::DUMMY).is_none());
}

#[test]
fn disabled_queues_are_never_built() {
    let (program, f) = refcounted_program(vec![entry(RefcountKind::DecrementComputed)]);
    let (body, errors) = lowered_body(&program, f, LowerConfig::default().with_refcounts(false));
    assert_eq!(errors, 0);
    assert_eq!(body, "(seq p)");
}

#[test]
fn overflowing_kind_is_reported() {
    let program = bodiless();
    let (mut s, f) = with_function(&program);
    let entries = vec![entry(RefcountKind::DecrementOld); 0x1_0000];
    assert!(s.refcount_queue(f, &entries, Span::new(1, 2)).is_none());
    assert_eq!(s.diagnostics().count_code(ErrorCode::E3005), 1);
}

#[test]
fn full_queue_groups_entries_by_kind() {
    let program = bodiless();
    let (mut s, f) = with_function(&program);
    let entries = [
        entry(RefcountKind::IncrementCopied),
        entry(RefcountKind::DecrementNew),
        entry(RefcountKind::DecrementOld),
    ];
    let Some(RefcountQueue::Full { queue, slots, .. }) =
        s.refcount_queue(f, &entries, Span::DUMMY)
    else {
        panic!("expected a full queue");
    };
    assert_eq!(slots, vec![2, 0, 1]);

    let module = s.module();
    let record = module.symbols.get(queue);
    assert_eq!(module.types.display(record.ty), "__go_refcount");
    let initial = module.render(record.initial.unwrap());
    assert!(
        initial.starts_with("{__go_refcount_head false false 1 0 1 1 {{"),
        "{initial}"
    );

    let head = module.symbols.lookup("__go_refcount_head").unwrap();
    let head = module.symbols.get(head);
    assert!(head.linkage.external);
    assert!(head.linkage.thread_local);
}

#[test]
fn record_outside_the_queue_is_an_error() {
    let program = bodiless();
    let (mut s, f) = with_function(&program);
    let queue = s
        .refcount_queue(f, &[entry(RefcountKind::DecrementOld)], Span::DUMMY)
        .unwrap();
    let value = s.uintptr_const(0);
    let recorded = s.refcount_record(&queue, f, 3, value, Span::DUMMY);
    assert_eq!(recorded, TreeId::ERROR);
    assert_eq!(s.diagnostics().count_code(ErrorCode::E9001), 1);
}

// ── Lowered bodies ──────────────────────────────────────────────

#[test]
fn simple_queue_adjusts_inline() {
    let (program, f) = refcounted_program(vec![entry(RefcountKind::DecrementComputed)]);
    let (body, errors) = lowered_body(&program, f, LowerConfig::default());
    assert_eq!(errors, 0);
    let prefix = concat!(
        "(seq (decl refcount.1 null) (try (seq",
        " (seq (decl rc.2 p) (= refcount.1 (convert *void rc.2)) => rc.2)",
        " (if (!= refcount.1 null) (seq (call __go_decrement_refcount refcount.1 "
    );
    assert!(body.starts_with(prefix), "{body}");
    // Once after the statement, once on exit.
    assert_eq!(body.matches("__go_decrement_refcount").count(), 2);
    assert!(!body.contains("__go_refcount_head"), "{body}");
}

#[test]
fn copied_value_is_incremented() {
    let (program, f) = refcounted_program(vec![entry(RefcountKind::IncrementCopied)]);
    let (body, _) = lowered_body(&program, f, LowerConfig::default());
    assert_eq!(body.matches("__go_increment_refcount").count(), 2);
}

#[test]
fn full_queue_is_linked_and_unlinked() {
    let (program, f) = refcounted_program(vec![
        entry(RefcountKind::DecrementOld),
        entry(RefcountKind::DecrementNew),
    ]);
    let (body, errors) = lowered_body(&program, f, LowerConfig::default());
    assert_eq!(errors, 0);
    assert!(body.contains("(= __go_refcount_head (convert *void &refcount."), "{body}");
    assert!(body.contains(".__entries[1].__value (convert *void rc."), "{body}");
    assert!(body.contains("(= refcount_flag."), "{body}");
    let flush = "(call __go_refcount_flush_queue (convert *void &refcount.";
    assert_eq!(body.matches(flush).count(), 2);
    assert!(body.ends_with(".__caller))))"), "{body}");
}
