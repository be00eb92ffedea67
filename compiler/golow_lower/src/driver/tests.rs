use golow_diagnostic::ErrorCode;
use golow_ir::{BinaryOp, Block, Function, ProgramBuilder, Span, Stmt, TypeId};
use pretty_assertions::assert_eq;

use crate::config::LowerConfig;
use crate::session::Session;

/// Rendered body of the package init function, if one was built.
fn init_body(s: &Session<'_>) -> Option<String> {
    let init = s.module().init_function?;
    let body = s.module().symbols.get(init).body?;
    Some(s.module().render(body))
}

fn init_name(s: &Session<'_>) -> Option<String> {
    let init = s.module().init_function?;
    Some(s.module().symbols.get(init).name.clone())
}

/// `func name() int { return value }`
fn returning(b: &mut ProgramBuilder, name: &str, value: i64) -> golow_ir::DeclId {
    let sig = b.types().function(vec![], vec![TypeId::INT]);
    let f = b.function(name, Function::new(sig));
    let value = b.int(value);
    b.set_body(f, Block::new(vec![Stmt::Return(vec![value])]));
    f
}

// ── Scheduling ──────────────────────────────────────────────────

#[test]
fn reader_is_initialized_after_its_source() {
    // var a = b + 1; var b = g()
    let mut b = ProgramBuilder::new("p", "go");
    let g = returning(&mut b, "g", 7);
    let va = b.global_var("a", TypeId::INT, None);
    let callee = b.func_ref(g);
    let call = b.call(callee, &[]);
    let vb = b.global_var("b", TypeId::INT, Some(call));
    let read_b = b.var(vb);
    let one = b.int(1);
    let sum = b.binary(BinaryOp::Add, read_b, one);
    b.set_init(va, sum);
    let program = b.finish();

    let mut s = Session::new(&program, LowerConfig::default());
    s.lower_package();
    assert_eq!(s.error_count(), 0);
    assert_eq!(init_name(&s).as_deref(), Some("go.p..import"));
    assert_eq!(
        init_body(&s).as_deref(),
        Some("(seq (= p.b (call p.g)) (= p.a (+ p.b 1)))")
    );
}

#[test]
fn constant_initializer_needs_no_init_function() {
    let mut b = ProgramBuilder::new("p", "go");
    let three = b.int(3);
    b.global_var("c", TypeId::INT, Some(three));
    let program = b.finish();

    let mut s = Session::new(&program, LowerConfig::default());
    s.lower_package();
    assert_eq!(s.module().init_function, None);
    let sym = s.module().symbols.lookup("p.c").unwrap();
    let initial = s.module().symbols.get(sym).initial.unwrap();
    assert_eq!(s.module().render(initial), "3");
    assert!(s.module().globals.contains(&sym));
}

#[test]
fn preinit_block_runs_before_the_initializer() {
    let mut b = ProgramBuilder::new("p", "go");
    let v = b.global_var("v", TypeId::INT, None);
    let lhs = b.var(v);
    let one = b.int(1);
    b.set_preinit(v, Block::new(vec![Stmt::Assign { lhs, rhs: one }]));
    let read = b.var(v);
    let two = b.int(2);
    let sum = b.binary(BinaryOp::Add, read, two);
    b.global_var("w", TypeId::INT, Some(sum));
    let program = b.finish();

    let mut s = Session::new(&program, LowerConfig::default());
    s.lower_package();
    assert_eq!(s.error_count(), 0);
    assert_eq!(
        init_body(&s).as_deref(),
        Some("(seq (seq (= p.v 1)) (= p.w (+ p.v 2)))")
    );
}

#[test]
fn sink_initializer_is_evaluated_for_effect() {
    let mut b = ProgramBuilder::new("p", "go");
    let f = returning(&mut b, "f", 1);
    let callee = b.func_ref(f);
    let call = b.call(callee, &[]);
    b.sink(Some(call));
    let program = b.finish();

    let mut s = Session::new(&program, LowerConfig::default());
    s.lower_package();
    assert_eq!(init_body(&s).as_deref(), Some("(seq (call p.f))"));
}

// ── Cycles ──────────────────────────────────────────────────────

#[test]
fn mutual_initializers_report_one_cycle() {
    let mut b = ProgramBuilder::new("p", "go");
    let va = b.global_var("a", TypeId::INT, None);
    let vb = b.global_var("b", TypeId::INT, None);
    b.set_span(va, Span::new(10, 11));
    b.set_span(vb, Span::new(20, 21));
    let read_b = b.var(vb);
    b.set_init(va, read_b);
    let read_a = b.var(va);
    b.set_init(vb, read_a);
    let program = b.finish();

    let mut s = Session::new(&program, LowerConfig::default());
    s.lower_package();
    assert_eq!(s.diagnostics().count_code(ErrorCode::E3002), 1);
    assert_eq!(s.error_count(), 1);
    let diag = s.diagnostics().iter().next().unwrap();
    assert_eq!(diag.primary_span(), Some(Span::new(10, 11)));
    assert_eq!(diag.labels.len(), 2);
    assert!(!diag.labels[1].is_primary);
    assert_eq!(s.module().init_function, None);
}

#[test]
fn three_way_loop_reports_one_cycle_and_no_self_reference() {
    let mut b = ProgramBuilder::new("p", "go");
    let va = b.global_var("a", TypeId::INT, None);
    let vb = b.global_var("b", TypeId::INT, None);
    let vc = b.global_var("c", TypeId::INT, None);
    let read_b = b.var(vb);
    b.set_init(va, read_b);
    let read_c = b.var(vc);
    b.set_init(vb, read_c);
    let read_a = b.var(va);
    b.set_init(vc, read_a);
    let program = b.finish();

    let mut s = Session::new(&program, LowerConfig::default());
    s.lower_package();
    assert_eq!(s.diagnostics().count_code(ErrorCode::E3002), 1);
    assert_eq!(s.diagnostics().count_code(ErrorCode::E3003), 0);
    assert_eq!(s.error_count(), 1);
    assert_eq!(s.module().init_function, None);
}

#[test]
fn self_reference_skips_the_initializer() {
    let mut b = ProgramBuilder::new("p", "go");
    let x = b.global_var("x", TypeId::INT, None);
    let read = b.var(x);
    let one = b.int(1);
    let sum = b.binary(BinaryOp::Add, read, one);
    b.set_init(x, sum);
    let program = b.finish();

    let mut s = Session::new(&program, LowerConfig::default());
    s.lower_package();
    assert_eq!(s.diagnostics().count_code(ErrorCode::E3003), 1);
    assert_eq!(s.module().init_function, None);
}

// ── Init function ───────────────────────────────────────────────

#[test]
fn entry_package_calls_imports_by_priority_first() {
    let mut b = ProgramBuilder::new("main", "go");
    b.import_init("q..import", 2);
    b.import_init("r..import", 1);
    b.import_init("s..import", 2);
    let f = returning(&mut b, "f", 5);
    let callee = b.func_ref(f);
    let call = b.call(callee, &[]);
    b.global_var("v", TypeId::INT, Some(call));
    let program = b.finish();

    let mut s = Session::new(&program, LowerConfig::default());
    s.lower_package();
    assert_eq!(init_name(&s).as_deref(), Some("__go_init_main"));
    let expected = concat!(
        "(seq (call r..import) (call q..import) (call s..import)",
        " (= main.v (call main.f)))"
    );
    assert_eq!(init_body(&s).as_deref(), Some(expected));
    let init = s.module().init_function.unwrap();
    assert!(s.module().symbols.get(init).linkage.public);
    let import = s.module().symbols.lookup("r..import").unwrap();
    assert!(s.module().symbols.get(import).linkage.external);
}

#[test]
fn entry_package_always_gets_an_init_function() {
    let b = ProgramBuilder::new("main", "go");
    let program = b.finish();
    let mut s = Session::new(&program, LowerConfig::default());
    s.lower_package();
    assert_eq!(init_body(&s).as_deref(), Some("(seq)"));
    let init = s.module().init_function.unwrap();
    assert!(s.module().globals.contains(&init));
}

#[test]
fn other_packages_do_not_call_imports() {
    let mut b = ProgramBuilder::new("p", "go");
    b.import_init("q..import", 1);
    let program = b.finish();
    let mut s = Session::new(&program, LowerConfig::default());
    s.lower_package();
    assert_eq!(s.module().init_function, None);
}

#[test]
fn init_functions_are_numbered_and_called_last() {
    let mut b = ProgramBuilder::new("p", "go");
    let sig = b.types().function(vec![], vec![]);
    let first = b.function("init", Function::new(sig));
    b.set_body(first, Block::new(vec![]));
    let g = returning(&mut b, "g", 1);
    let second = b.function("init", Function::new(sig));
    b.set_body(second, Block::new(vec![]));
    let callee = b.func_ref(g);
    let call = b.call(callee, &[]);
    b.global_var("v", TypeId::INT, Some(call));
    let program = b.finish();

    let mut s = Session::new(&program, LowerConfig::default());
    s.lower_package();
    assert_eq!(
        init_body(&s).as_deref(),
        Some("(seq (= p.v (call p.g)) (call p.init.1) (call p.init.2))")
    );
    let one = s.module().symbols.lookup("p.init.1").unwrap();
    assert!(!s.module().symbols.get(one).linkage.public);
}

#[test]
fn custom_entry_package_name() {
    let b = ProgramBuilder::new("app", "go");
    let program = b.finish();
    let config = LowerConfig {
        entry_package: "app".to_owned(),
        ..LowerConfig::default()
    };
    let mut s = Session::new(&program, config);
    s.lower_package();
    assert_eq!(init_name(&s).as_deref(), Some("__go_init_main"));
}

#[test]
fn lowered_package_has_no_shared_nodes() {
    let mut b = ProgramBuilder::new("main", "go");
    b.import_init("q..import", 1);
    let g = returning(&mut b, "g", 2);
    let callee = b.func_ref(g);
    let call = b.call(callee, &[]);
    let vb = b.global_var("b", TypeId::INT, Some(call));
    let read = b.var(vb);
    let again = b.var(vb);
    let sum = b.binary(BinaryOp::Mul, read, again);
    b.global_var("a", TypeId::INT, Some(sum));
    let program = b.finish();

    let mut s = Session::new(&program, LowerConfig::default());
    s.lower_package();
    assert_eq!(s.module().check_unshared(), Ok(()));
}
