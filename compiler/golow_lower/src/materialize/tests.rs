use golow_diagnostic::ErrorCode;
use golow_ir::{
    Block, Decl, DeclKind, Function, Program, ProgramBuilder, Span, Stmt, TypeId, VarFlags,
};
use golow_tree::{SymbolId, SymbolKind, TreeId};
use pretty_assertions::assert_eq;

use crate::config::LowerConfig;
use crate::session::{Materialized, Session};

fn symbol(s: &mut Session<'_>, decl: golow_ir::DeclId) -> SymbolId {
    match s.materialize(decl, None) {
        Materialized::Symbol(sym) => sym,
        other => panic!("expected a symbol, got {other:?}"),
    }
}

/// A session over `program` together with an external function symbol
/// to serve as the context of locals.
fn with_enclosing(program: &Program) -> (Session<'_>, SymbolId) {
    let mut s = Session::new(program, LowerConfig::default());
    let host = program
        .top_level
        .iter()
        .copied()
        .find(|&d| matches!(program.decl(d).kind, DeclKind::Function(_)))
        .unwrap();
    let host = symbol(&mut s, host);
    (s, host)
}

fn host(b: &mut ProgramBuilder) {
    let sig = b.types().function(vec![], vec![]);
    b.function("host", Function::new(sig));
}

// ── Variables ───────────────────────────────────────────────────

#[test]
fn hidden_global_is_static_and_private() {
    let mut b = ProgramBuilder::new("p", "go");
    let x = b.global_var("x", TypeId::INT, None);
    let program = b.finish();
    let mut s = Session::new(&program, LowerConfig::default());
    let sym = symbol(&mut s, x);
    let sym = s.module().symbols.get(sym);
    assert_eq!(sym.name, "p.x");
    assert_eq!(sym.asm_name, None);
    assert_eq!(sym.kind, SymbolKind::Variable);
    assert!(sym.linkage.is_static);
    assert!(!sym.linkage.public);
    assert!(!sym.linkage.external);
}

#[test]
fn exported_global_gets_an_assembler_name() {
    let mut b = ProgramBuilder::new("p", "go");
    let x = b.global_var("Total", TypeId::INT, None);
    let program = b.finish();
    let mut s = Session::new(&program, LowerConfig::default());
    let sym = symbol(&mut s, x);
    let sym = s.module().symbols.get(sym);
    assert_eq!(sym.link_name(), "go.p.Total");
    assert!(sym.linkage.public);
    assert!(sym.linkage.is_static);
}

#[test]
fn imported_variable_is_external() {
    let mut b = ProgramBuilder::new("p", "go");
    let q = b.import_package("q", "gq");
    let hidden = b.imported_var(q, "v", TypeId::INT);
    let exported = b.imported_var(q, "V", TypeId::INT);
    let program = b.finish();
    let mut s = Session::new(&program, LowerConfig::default());

    let hidden = symbol(&mut s, hidden);
    let exported = symbol(&mut s, exported);
    let symbols = &s.module().symbols;
    assert_eq!(symbols.get(hidden).link_name(), "q.v");
    assert!(symbols.get(hidden).linkage.external);
    assert_eq!(symbols.get(exported).link_name(), "gq.q.V");
    assert!(symbols.get(exported).linkage.external);
}

#[test]
fn materialization_is_cached() {
    let mut b = ProgramBuilder::new("p", "go");
    let x = b.global_var("x", TypeId::INT, None);
    let program = b.finish();
    let mut s = Session::new(&program, LowerConfig::default());
    let first = s.materialize(x, None);
    let count = s.module().symbols.len();
    assert_eq!(s.materialize(x, None), first);
    assert_eq!(s.module().symbols.len(), count);
}

#[test]
fn heap_variable_is_reached_through_a_pointer() {
    let mut b = ProgramBuilder::new("p", "go");
    host(&mut b);
    let y = b.local_var("y", TypeId::INT, VarFlags::IN_HEAP);
    let program = b.finish();
    let (mut s, host) = with_enclosing(&program);

    let Materialized::Heap(ptr) = s.materialize(y, Some(host)) else {
        panic!("expected a heap variable");
    };
    let sym = s.module().symbols.get(ptr);
    assert_eq!(s.module().types.display(sym.ty), "*i64");
    assert_eq!(sym.context, Some(host));

    // Each use is a fresh dereference.
    let first = s.symbol_for(y, Some(host));
    let second = s.symbol_for(y, Some(host));
    assert_ne!(first, second);
    assert_eq!(s.module().render(first), "*y");
}

#[test]
fn local_outside_a_function_is_reported() {
    let mut b = ProgramBuilder::new("p", "go");
    let y = b.local_var("y", TypeId::INT, VarFlags::empty());
    let program = b.finish();
    let mut s = Session::new(&program, LowerConfig::default());
    assert_eq!(s.symbol_for(y, None), TreeId::ERROR);
    assert_eq!(s.diagnostics().count_code(ErrorCode::E9001), 1);
}

#[test]
fn erroneous_variable_type_is_reported_once() {
    let mut b = ProgramBuilder::new("p", "go");
    let x = b.global_var("x", TypeId::ERROR, None);
    let program = b.finish();
    let mut s = Session::new(&program, LowerConfig::default());
    assert_eq!(s.symbol_for(x, None), TreeId::ERROR);
    assert_eq!(s.symbol_for(x, None), TreeId::ERROR);
    assert_eq!(s.diagnostics().count_code(ErrorCode::E3005), 1);
}

#[test]
fn value_receiver_is_a_local_copy() {
    let mut b = ProgramBuilder::new("p", "go");
    host(&mut b);
    let (_, t) = b.named_type("T", TypeId::INT);
    let recv = b.local_var("t", t, VarFlags::PARAMETER | VarFlags::RECEIVER);
    let ptr = b.types().pointer(t);
    let by_ptr = b.local_var("u", ptr, VarFlags::PARAMETER | VarFlags::RECEIVER);
    let program = b.finish();
    let (mut s, host) = with_enclosing(&program);

    let Materialized::Symbol(recv) = s.materialize(recv, Some(host)) else {
        panic!("expected a symbol");
    };
    let Materialized::Symbol(by_ptr) = s.materialize(by_ptr, Some(host)) else {
        panic!("expected a symbol");
    };
    assert_eq!(s.module().symbols.get(recv).kind, SymbolKind::Variable);
    assert_eq!(s.module().symbols.get(by_ptr).kind, SymbolKind::Parameter);
}

// ── Constants and types ─────────────────────────────────────────

#[test]
fn abstract_constant_folds_at_each_use() {
    let mut b = ProgramBuilder::new("p", "go");
    let seven = b.int(7);
    let k = b.constant("k", seven, true);
    let program = b.finish();
    let mut s = Session::new(&program, LowerConfig::default());
    let count = s.module().symbols.len();
    let value = s.symbol_for(k, None);
    assert_eq!(s.module().render(value), "7");
    assert_eq!(s.module().symbols.len(), count);
}

#[test]
fn typed_constant_is_a_readonly_definition() {
    let mut b = ProgramBuilder::new("p", "go");
    let seven = b.int(7);
    let k = b.constant("k", seven, false);
    let program = b.finish();
    let mut s = Session::new(&program, LowerConfig::default());
    let sym = symbol(&mut s, k);
    let module = s.module();
    let constant = module.symbols.get(sym);
    assert_eq!(constant.kind, SymbolKind::Constant);
    assert!(constant.linkage.readonly);
    assert_eq!(module.render(constant.initial.unwrap()), "7");
    assert!(module.globals.contains(&sym));
}

#[test]
fn named_type_declares_its_descriptors() {
    let mut b = ProgramBuilder::new("p", "go");
    b.named_type("T", TypeId::INT);
    let program = b.finish();
    let decl = program.top_level[0];
    let mut s = Session::new(&program, LowerConfig::default());
    let sym = symbol(&mut s, decl);
    let module = s.module();
    assert_eq!(module.symbols.get(sym).kind, SymbolKind::Type);
    assert_eq!(module.symbols.get(sym).name, "p.T");
    assert!(module.symbols.lookup("__go_tdn_go.p.T").is_some());
}

#[test]
fn undefined_type_is_reported() {
    let mut b = ProgramBuilder::new("p", "go");
    let ident = b.ident("U");
    let u = b.decl(Decl {
        ident,
        package: None,
        span: Span::new(4, 5),
        kind: DeclKind::TypeDeclaration,
    });
    let program = b.finish();
    let mut s = Session::new(&program, LowerConfig::default());
    assert_eq!(s.materialize(u, None), Materialized::Error);
    assert_eq!(s.diagnostics().count_code(ErrorCode::E3001), 1);
    let diag = s.diagnostics().iter().next().unwrap();
    assert_eq!(diag.primary_span(), Some(Span::new(4, 5)));
}

#[test]
fn sink_is_not_a_value() {
    let mut b = ProgramBuilder::new("p", "go");
    let sink = b.sink(None);
    let program = b.finish();
    let mut s = Session::new(&program, LowerConfig::default());
    assert_eq!(s.materialize(sink, None), Materialized::Error);
    assert_eq!(s.diagnostics().count_code(ErrorCode::E3005), 1);
}

// ── Functions ───────────────────────────────────────────────────

#[test]
fn main_function_keeps_its_plain_name() {
    let mut b = ProgramBuilder::new("main", "go");
    let sig = b.types().function(vec![], vec![]);
    let mut func = Function::new(sig);
    func.body = Some(Block::new(vec![]));
    let main = b.function("main", func);
    let program = b.finish();
    let mut s = Session::new(&program, LowerConfig::default());
    let sym = symbol(&mut s, main);
    let sym = s.module().symbols.get(sym);
    assert_eq!(sym.link_name(), "main.main");
    assert!(sym.linkage.public);
    assert!(!sym.linkage.external);
}

#[test]
fn init_functions_are_numbered_and_internal() {
    let mut b = ProgramBuilder::new("p", "go");
    let sig = b.types().function(vec![], vec![]);
    let inits: Vec<_> = (0..2)
        .map(|_| {
            let mut func = Function::new(sig);
            func.body = Some(Block::new(vec![]));
            b.function("init", func)
        })
        .collect();
    let program = b.finish();
    let mut s = Session::new(&program, LowerConfig::default());
    let names: Vec<_> = inits
        .into_iter()
        .map(|init| {
            let sym = symbol(&mut s, init);
            let sym = s.module().symbols.get(sym);
            assert!(!sym.linkage.public);
            sym.link_name().to_owned()
        })
        .collect();
    assert_eq!(names, ["p.init.1", "p.init.2"]);
}

#[test]
fn method_name_carries_the_receiver() {
    let mut b = ProgramBuilder::new("p", "go");
    let (id, t) = b.named_type("T", TypeId::INT);
    let sig = b.types().method_signature(t, vec![], vec![]);
    let recv = b.local_var("t", t, VarFlags::PARAMETER | VarFlags::RECEIVER);
    let mut func = Function::new(sig);
    func.receiver = Some(recv);
    let method = b.method(id, "size", func, true);
    let program = b.finish();
    let mut s = Session::new(&program, LowerConfig::default());
    let sym = symbol(&mut s, method);
    let sym = s.module().symbols.get(sym);
    assert_eq!(sym.name, "p.size.N6_go.p.T");
    // Hidden methods stay public.
    assert_eq!(sym.link_name(), "go.p.size.N6_go.p.T");
    assert!(sym.linkage.external);
}

#[test]
fn recursive_function_terminates() {
    let mut b = ProgramBuilder::new("p", "go");
    let sig = b.types().function(vec![], vec![]);
    let f = b.function("f", Function::new(sig));
    let callee = b.func_ref(f);
    let call = b.call(callee, &[]);
    b.set_body(f, Block::new(vec![Stmt::Expr(call)]));
    let program = b.finish();
    let mut s = Session::new(&program, LowerConfig::default());
    let sym = symbol(&mut s, f);
    let body = s.module().symbols.get(sym).body.unwrap();
    assert!(s.module().render(body).contains("p.f"));
    assert_eq!(s.error_count(), 0);
    assert!(s.module().globals.contains(&sym));
}

#[test]
fn function_declaration_links_by_assembler_name() {
    let mut b = ProgramBuilder::new("p", "go");
    let q = b.import_package("q", "gq");
    let sig = b.types().function(vec![], vec![]);
    let renamed = b.function_declaration(None, "Now", sig, Some("runtime_now"));
    let imported = b.function_declaration(Some(q), "Sum", sig, None);
    let program = b.finish();
    let mut s = Session::new(&program, LowerConfig::default());

    let renamed = symbol(&mut s, renamed);
    let imported = symbol(&mut s, imported);
    let symbols = &s.module().symbols;
    assert_eq!(symbols.get(renamed).link_name(), "runtime_now");
    assert_eq!(symbols.get(imported).name, "q.Sum");
    assert_eq!(symbols.get(imported).link_name(), "gq.q.Sum");
    assert!(symbols.get(imported).linkage.external);
}

#[test]
fn result_variable_is_the_return_slot() {
    let mut b = ProgramBuilder::new("p", "go");
    let sig = b.types().function(vec![], vec![TypeId::INT]);
    let mut func = Function::new(sig);
    func.body = Some(Block::new(vec![]));
    let f = b.function("f", func);
    let ident = b.ident("n");
    let n = b.decl(Decl {
        ident,
        package: None,
        span: Span::DUMMY,
        kind: DeclKind::ResultVar {
            function: f,
            index: 0,
            ty: TypeId::INT,
        },
    });
    let program = b.finish();
    let mut s = Session::new(&program, LowerConfig::default());
    let slot = s.symbol_for(n, None);
    assert_eq!(s.module().render(slot), "RETURN");
}

// ── Labels ──────────────────────────────────────────────────────

#[test]
fn labels_are_cached_per_declaration() {
    let mut b = ProgramBuilder::new("p", "go");
    host(&mut b);
    let top = b.label("top");
    let program = b.finish();
    let (mut s, host) = with_enclosing(&program);
    let first = s.label_for(top, host);
    assert_eq!(s.label_for(top, host), first);
    let label = s.module().symbols.get(first);
    assert_eq!(label.name, "top");
    assert_eq!(label.kind, SymbolKind::Label);
    assert_eq!(label.context, Some(host));
}
