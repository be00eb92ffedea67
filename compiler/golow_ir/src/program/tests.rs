use pretty_assertions::assert_eq;

use super::*;
use crate::BinaryOp;

#[test]
fn export_rule_decides_hidden_prefix() {
    let b = ProgramBuilder::new("geom", "example");
    let exported = b.ident("Point");
    let hidden = b.ident("point");
    let program = b.finish();
    assert!(!exported.is_hidden());
    assert_eq!(hidden.hidden_prefix.map(|p| program.str(p)), Some("example.geom"));
}

#[test]
fn foreign_hidden_prefix_uses_owner_package() {
    let mut b = ProgramBuilder::new("main", "go");
    let pkg = b.import_package("fmt", "libgo");
    let ident = b.foreign_ident(pkg, "buffer");
    let program = b.finish();
    assert_eq!(ident.hidden_prefix.map(|p| program.str(p)), Some("libgo.fmt"));
}

#[test]
fn globals_are_recorded_in_order() {
    let mut b = ProgramBuilder::new("p", "go");
    let two = b.int(2);
    let first = b.global_var("b", TypeId::INT, Some(two));
    let read = b.var(first);
    let one = b.int(1);
    let sum = b.binary(BinaryOp::Add, read, one);
    let second = b.global_var("a", TypeId::INT, Some(sum));
    let program = b.finish();
    assert_eq!(program.top_level, vec![first, second]);
    assert_eq!(program.expr(sum).ty, TypeId::INT);
    assert_eq!(program.decl_type(second), TypeId::INT);
}

#[test]
fn method_registers_on_named_type() {
    let mut b = ProgramBuilder::new("p", "go");
    let (id, t) = b.named_type("T", TypeId::INT);
    let sig = b.types().method_signature(t, vec![], vec![TypeId::INT]);
    let m = b.method(id, "Get", Function::new(sig), true);
    let program = b.finish();
    let named = program.types.named_type(id);
    assert_eq!(named.methods.len(), 1);
    assert_eq!(named.methods[0].func, m);
    let sig = program.types.func_type(named.methods[0].ty);
    assert_eq!(sig.map(|s| s.receiver), Some(None));
}

#[test]
fn call_result_type_comes_from_signature() {
    let mut b = ProgramBuilder::new("p", "go");
    let sig = b.types().function(vec![], vec![TypeId::STRING]);
    let f = b.function_declaration(None, "f", sig, None);
    let callee = b.func_ref(f);
    let call = b.call(callee, &[]);
    assert_eq!(b.expr_ty(call), TypeId::STRING);
}
