use pretty_assertions::assert_eq;

use super::*;
use crate::{RecordField, Symbol, SymbolKind, TreeBinOp};

fn module_with_var(name: &str) -> (TreeModule, SymbolId) {
    let mut module = TreeModule::new();
    let sym = module
        .symbols
        .add(Symbol::new(SymbolKind::Variable, name, TreeTypeId::I64));
    (module, sym)
}

#[test]
fn decl_leaves_are_shared() {
    let (mut module, x) = module_with_var("x");
    let a = module.nodes.decl(x);
    let b = module.nodes.push(Tree::Decl(x));
    assert_eq!(a, b);
    let sum = module.nodes.push(Tree::Binary {
        op: TreeBinOp::Plus,
        lhs: a,
        rhs: b,
        ty: TreeTypeId::I64,
    });
    assert_eq!(module.render(sum), "(+ x x)");
    assert_eq!(module.check_unshared(), Ok(()));
}

#[test]
fn shared_indirect_is_rejected() {
    let (mut module, p) = module_with_var("p");
    let ptr = module.nodes.decl(p);
    let deref = module.nodes.push(Tree::Indirect {
        expr: ptr,
        ty: TreeTypeId::I64,
    });
    let sum = module.nodes.push(Tree::Binary {
        op: TreeBinOp::Plus,
        lhs: deref,
        rhs: deref,
        ty: TreeTypeId::I64,
    });
    let _ = sum;
    assert_eq!(
        module.check_unshared(),
        Err(SharedNode {
            node: deref,
            parents: 2
        })
    );
}

#[test]
fn symbol_initializers_count_as_parents() {
    let (mut module, x) = module_with_var("x");
    let one = module.nodes.push(Tree::Int {
        value: 1,
        ty: TreeTypeId::I64,
    });
    module.symbols.get_mut(x).initial = Some(one);
    let _use = module.nodes.push(Tree::Return(Some(one)));
    assert!(module.check_unshared().is_err());
}

#[test]
fn type_of_follows_symbols_and_compounds() {
    let (mut module, x) = module_with_var("x");
    let read = module.nodes.decl(x);
    let seq = module.nodes.push(Tree::Compound {
        stmts: Vec::new(),
        value: Some(read),
    });
    assert_eq!(module.type_of(seq), TreeTypeId::I64);
    let ret = module.nodes.push(Tree::Return(None));
    assert_eq!(module.type_of(ret), TreeTypeId::VOID);
}

#[test]
fn field_access_renders_field_name() {
    let (mut module, _) = module_with_var("unused");
    let rec = module.types.record(
        Some("pair"),
        vec![
            RecordField::new("__a", TreeTypeId::I64),
            RecordField::new("__b", TreeTypeId::I64),
        ],
    );
    let sym = module
        .symbols
        .add(Symbol::new(SymbolKind::Variable, "p", rec));
    let base = module.nodes.decl(sym);
    let field = module.nodes.push(Tree::Field {
        base,
        index: 1,
        ty: TreeTypeId::I64,
    });
    assert_eq!(module.render(field), "p.__b");
    assert_eq!(module.symbols.lookup("p"), Some(sym));
}
