use pretty_assertions::assert_eq;

use crate::{ProgramBuilder, Span, StringInterner};

use super::*;

fn named(interner: &StringInterner, name: &str, underlying: TypeId) -> NamedType {
    NamedType {
        ident: Ident::exported(interner.intern(name)),
        package: None,
        in_function: None,
        is_builtin: false,
        underlying,
        methods: Vec::new(),
        span: Span::DUMMY,
    }
}

// ── Primitives ──────────────────────────────────────────────────

#[test]
fn primitives_are_preregistered() {
    let pool = TypePool::new();
    assert_eq!(pool.kind(TypeId::BOOL), &TypeKind::Bool);
    assert_eq!(
        pool.kind(TypeId::INT),
        &TypeKind::Int {
            bits: 64,
            signed: true
        }
    );
    assert_eq!(pool.kind(TypeId::STRING), &TypeKind::String);
    assert_eq!(pool.len(), 10);
}

#[test]
fn out_of_range_reads_as_error() {
    let pool = TypePool::new();
    assert_eq!(pool.kind(TypeId::from_raw(999)), &TypeKind::Error);
}

// ── Named types ─────────────────────────────────────────────────

#[test]
fn underlying_follows_names() {
    let interner = StringInterner::new();
    let mut pool = TypePool::new();
    let (_, a) = pool.named(named(&interner, "A", TypeId::INT));
    let (_, b) = pool.named(named(&interner, "B", a));
    assert_eq!(pool.underlying(b), TypeId::INT);
}

#[test]
fn recursive_named_type_via_pointer() {
    let interner = StringInterner::new();
    let mut pool = TypePool::new();
    let (id, list) = pool.named(named(&interner, "List", TypeId::ERROR));
    let ptr = pool.pointer(list);
    let body = pool.structure(vec![Field {
        name: Some(Ident::exported(interner.intern("Next"))),
        ty: ptr,
        tag: None,
    }]);
    pool.set_underlying(id, body);
    assert_eq!(pool.underlying(list), body);
    assert_eq!(pool.pointee_named(ptr), Some(id));
    assert!(!pool.is_undefined(list));
}

#[test]
fn looping_names_resolve_to_error() {
    let interner = StringInterner::new();
    let mut pool = TypePool::new();
    let (a_id, a) = pool.named(named(&interner, "A", TypeId::ERROR));
    let (_, b) = pool.named(named(&interner, "B", a));
    pool.set_underlying(a_id, b);
    assert_eq!(pool.underlying(a), TypeId::ERROR);
}

#[test]
fn forward_types_are_undefined() {
    let interner = StringInterner::new();
    let mut pool = TypePool::new();
    let fwd = pool.forward(interner.intern("Missing"));
    assert!(pool.is_undefined(fwd));
    let ptr = pool.pointer(fwd);
    assert!(!pool.is_undefined(ptr));
}

#[test]
fn method_lookup_skips_ambiguous() {
    let mut b = ProgramBuilder::new("p", "go");
    let (id, _) = b.named_type("T", TypeId::INT);
    let name = b.ident("M");
    let sig = b.types().function(vec![], vec![]);
    let func = b.function_declaration(None, "M", sig, None);
    b.types().add_method(
        id,
        Method {
            name,
            func,
            ty: sig,
            value_receiver: true,
            ambiguous: true,
        },
    );
    let program = b.finish();
    assert!(program.types.named_type(id).method(name).is_none());
}
