use golow_ir::{
    ChanDir, Field, Function, Ident, InterfaceMethod, Method, NamedType, ProgramBuilder, Span,
    TypeId,
};
use golow_tree::{Tree, TreeId};
use pretty_assertions::assert_eq;

use super::common::name_hash;
use super::*;
use crate::config::LowerConfig;

// ── Tree inspection helpers ─────────────────────────────────────

fn elems(s: &Session<'_>, id: TreeId) -> Vec<TreeId> {
    match s.module().nodes.get(id) {
        Tree::Constructor { elems, .. } => elems.clone(),
        other => panic!("expected a constructor, got {other:?}"),
    }
}

/// Symbol an address expression points at, through conversions.
fn target_symbol(s: &Session<'_>, mut id: TreeId) -> Option<SymbolId> {
    loop {
        match s.module().nodes.get(id) {
            Tree::Convert { expr, .. } | Tree::AddrOf { expr, .. } => id = *expr,
            Tree::Decl(sym) => return Some(*sym),
            _ => return None,
        }
    }
}

fn initial(s: &Session<'_>, sym: SymbolId) -> TreeId {
    s.module().symbols.get(sym).initial.unwrap()
}

/// Elements behind a static slice constructor.
fn slice_elems(s: &Session<'_>, slice: TreeId) -> Vec<TreeId> {
    let values = elems(s, slice)[0];
    match target_symbol(s, values) {
        Some(array) => elems(s, initial(s, array)),
        None => Vec::new(),
    }
}

/// Text of a `*string` constant; `None` for null.
fn string_at(s: &Session<'_>, id: TreeId) -> Option<String> {
    let sym = target_symbol(s, id)?;
    match s.module().nodes.get(initial(s, sym)) {
        Tree::Str { value, .. } => Some(value.clone()),
        other => panic!("expected a string, got {other:?}"),
    }
}

fn name_of(s: &Session<'_>, sym: SymbolId) -> String {
    s.module().symbols.get(sym).name.clone()
}

/// Method names listed in the uncommon block of `ty`'s descriptor.
fn method_names(s: &mut Session<'_>, ty: TypeId) -> Vec<String> {
    let sym = s.descriptor_symbol(ty).unwrap();
    let s: &Session<'_> = s;
    let init = initial(s, sym);
    let common = match s.module().nodes.get(init) {
        Tree::Constructor { elems, .. } if elems.len() == 8 => init,
        _ => elems(s, init)[0],
    };
    let uncommon = elems(s, common)[7];
    let uncommon = initial(s, target_symbol(s, uncommon).unwrap());
    let methods = elems(s, uncommon)[2];
    slice_elems(s, methods)
        .into_iter()
        .map(|entry| string_at(s, elems(s, entry)[1]).unwrap())
        .collect()
}

fn empty_struct(b: &mut ProgramBuilder) -> TypeId {
    b.types().structure(Vec::new())
}

// ── Sharing and placement ───────────────────────────────────────

#[test]
fn identical_unnamed_types_share_one_descriptor() {
    let mut b = ProgramBuilder::new("p", "go");
    let first = b.types().slice(TypeId::INT);
    let second = b.types().slice(TypeId::INT);
    let program = b.finish();
    let mut s = Session::new(&program, LowerConfig::default());

    let a = s.descriptor_symbol(first).unwrap();
    let b = s.descriptor_symbol(second).unwrap();
    assert_eq!(a, b);
    assert_eq!(name_of(&s, a), "__go_td_Zi64");
    let linkage = s.module().symbols.get(a).linkage;
    assert!(linkage.one_only && linkage.readonly && !linkage.external);
}

#[test]
fn distinct_named_types_never_share() {
    let mut b = ProgramBuilder::new("p", "go");
    let (_, a) = b.named_type("A", TypeId::INT);
    let (_, c) = b.named_type("B", TypeId::INT);
    let program = b.finish();
    let mut s = Session::new(&program, LowerConfig::default());

    let a = s.descriptor_symbol(a).unwrap();
    let c = s.descriptor_symbol(c).unwrap();
    assert_ne!(a, c);
    assert_eq!(name_of(&s, a), "__go_tdn_go.p.A");
    assert_eq!(name_of(&s, c), "__go_tdn_go.p.B");
    let linkage = s.module().symbols.get(a).linkage;
    assert!(!linkage.one_only);
    assert_eq!(linkage.visibility, Visibility::Protected);
}

#[test]
fn foreign_named_type_is_only_referenced() {
    let mut b = ProgramBuilder::new("p", "go");
    let pkg = b.import_package("q", "libgo");
    let (_, t) = b.foreign_named_type(pkg, "T", TypeId::INT);
    let program = b.finish();
    let mut s = Session::new(&program, LowerConfig::default());

    let sym = s.descriptor_symbol(t).unwrap();
    let symbol = s.module().symbols.get(sym);
    assert_eq!(symbol.name, "__go_tdn_libgo.q.T");
    assert!(symbol.linkage.external);
    assert_eq!(symbol.initial, None);
    assert!(!s.module().globals.contains(&sym));
}

#[test]
fn pointer_to_foreign_named_type_is_common() {
    let mut b = ProgramBuilder::new("p", "go");
    let pkg = b.import_package("q", "libgo");
    let (_, t) = b.foreign_named_type(pkg, "T", TypeId::INT);
    let ptr = b.types().pointer(t);
    let program = b.finish();
    let mut s = Session::new(&program, LowerConfig::default());

    let sym = s.descriptor_symbol(ptr).unwrap();
    let symbol = s.module().symbols.get(sym);
    assert_eq!(symbol.name, "__go_td_pN9_libgo.q.T");
    assert!(symbol.linkage.one_only);
    assert!(symbol.initial.is_some());
}

#[test]
fn builtin_named_type_is_common_under_bare_name() {
    let mut b = ProgramBuilder::new("p", "go");
    let ident = Ident::exported(b.name("error"));
    let iface = b.types().interface(Vec::new());
    let (_, error) = b.types().named(NamedType {
        ident,
        package: None,
        in_function: None,
        is_builtin: true,
        underlying: iface,
        methods: Vec::new(),
        span: Span::DUMMY,
    });
    let program = b.finish();
    let mut s = Session::new(&program, LowerConfig::default());

    let sym = s.descriptor_symbol(error).unwrap();
    assert_eq!(name_of(&s, sym), "__go_tdn_error");
    assert!(s.module().symbols.get(sym).linkage.one_only);
}

#[test]
fn recursive_named_type_terminates() {
    let mut b = ProgramBuilder::new("p", "go");
    let (id, list) = b.named_type("List", TypeId::ERROR);
    let next = b.types().pointer(list);
    let ident = b.ident("next");
    let body = b.types().structure(vec![Field {
        name: Some(ident),
        ty: next,
        tag: None,
    }]);
    b.types().set_underlying(id, body);
    let program = b.finish();
    let mut s = Session::new(&program, LowerConfig::default());

    assert!(s.descriptor_symbol(list).is_some());
    assert_eq!(s.error_count(), 0);
    assert_eq!(s.module().check_unshared(), Ok(()));
}

#[test]
fn erroneous_type_is_reported() {
    let b = ProgramBuilder::new("p", "go");
    let program = b.finish();
    let mut s = Session::new(&program, LowerConfig::default());
    assert_eq!(s.descriptor_symbol(TypeId::ERROR), None);
    assert_eq!(s.diagnostics().count_code(ErrorCode::E9001), 1);
    assert_eq!(s.type_descriptor(TypeId::ERROR), TreeId::ERROR);
}

// ── Method tables ───────────────────────────────────────────────

#[test]
fn method_table_is_sorted_by_name() {
    let mut b = ProgramBuilder::new("p", "go");
    let body = empty_struct(&mut b);
    let (id, t) = b.named_type("T", body);
    for name in ["Zeta", "beta", "Alpha"] {
        let sig = b.types().method_signature(t, Vec::new(), Vec::new());
        b.method(id, name, Function::new(sig), true);
    }
    let program = b.finish();
    let mut s = Session::new(&program, LowerConfig::default());

    // Hidden names sort ahead of exported ones.
    assert_eq!(method_names(&mut s, t), vec!["beta", "Alpha", "Zeta"]);
}

#[test]
fn value_type_lists_only_value_methods() {
    let mut b = ProgramBuilder::new("p", "go");
    let body = empty_struct(&mut b);
    let (id, t) = b.named_type("T", body);
    let sig = b.types().method_signature(t, Vec::new(), Vec::new());
    b.method(id, "Get", Function::new(sig), true);
    let ptr = b.types().pointer(t);
    let sig = b.types().method_signature(ptr, Vec::new(), Vec::new());
    b.method(id, "Set", Function::new(sig), false);
    let program = b.finish();
    let mut s = Session::new(&program, LowerConfig::default());

    assert_eq!(method_names(&mut s, t), vec!["Get"]);
    assert_eq!(method_names(&mut s, ptr), vec!["Get", "Set"]);
}

#[test]
fn ambiguous_methods_are_left_out_and_reported_once_each() {
    let mut b = ProgramBuilder::new("p", "go");
    let body = empty_struct(&mut b);
    let (id, t) = b.named_type("T", body);
    let sig = b.types().method_signature(t, Vec::new(), Vec::new());
    let func = b.method(id, "Keep", Function::new(sig), true);
    let plain = b.types().function(Vec::new(), Vec::new());
    for name in ["Clash", "Other"] {
        let ident = b.ident(name);
        b.types().add_method(
            id,
            Method {
                name: ident,
                func,
                ty: plain,
                value_receiver: true,
                ambiguous: true,
            },
        );
    }
    let ptr = b.types().pointer(t);
    let program = b.finish();
    let mut s = Session::new(&program, LowerConfig::default());

    assert_eq!(method_names(&mut s, t), vec!["Keep"]);
    assert_eq!(method_names(&mut s, ptr), vec!["Keep"]);
    // One warning per method, however many tables leave it out.
    assert_eq!(s.diagnostics().count_code(ErrorCode::E3004), 2);
    let messages: Vec<_> = s
        .diagnostics()
        .iter()
        .filter(|d| d.code == ErrorCode::E3004)
        .map(|d| d.message.clone())
        .collect();
    assert!(messages[0].contains("`Clash`"), "{messages:?}");
    assert!(messages[1].contains("`Other`"), "{messages:?}");
    assert_eq!(s.error_count(), 0);
}

#[test]
fn pointer_without_methods_has_no_uncommon_block() {
    let mut b = ProgramBuilder::new("p", "go");
    let (_, t) = b.named_type("T", TypeId::INT);
    let ptr = b.types().pointer(t);
    let program = b.finish();
    let mut s = Session::new(&program, LowerConfig::default());

    let sym = s.descriptor_symbol(ptr).unwrap();
    let common = elems(&s, initial(&s, sym))[0];
    let uncommon = elems(&s, common)[7];
    assert_eq!(s.module().render(uncommon), "null");
}

#[test]
fn name_hash_is_fnv1a() {
    assert_eq!(name_hash(""), 0x811c_9dc5);
    assert_eq!(name_hash("a"), 0xe40c_292c);
    assert_ne!(name_hash("Read"), name_hash("Write"));
}

// ── Shapes ──────────────────────────────────────────────────────

#[test]
fn struct_fields_record_package_path_of_hidden_names() {
    let mut b = ProgramBuilder::new("p", "go");
    let x = b.ident("X");
    let y = b.ident("y");
    let tag = b.name("json:\"y\"");
    let st = b.types().structure(vec![
        Field {
            name: Some(x),
            ty: TypeId::INT,
            tag: None,
        },
        Field {
            name: Some(y),
            ty: TypeId::STRING,
            tag: Some(tag),
        },
    ]);
    let program = b.finish();
    let mut s = Session::new(&program, LowerConfig::default());

    let sym = s.descriptor_symbol(st).unwrap();
    let fields = slice_elems(&s, elems(&s, initial(&s, sym))[1]);
    assert_eq!(fields.len(), 2);

    let x = elems(&s, fields[0]);
    assert_eq!(string_at(&s, x[0]), Some("X".to_owned()));
    assert_eq!(string_at(&s, x[1]), None);
    assert_eq!(string_at(&s, x[3]), None);
    assert_eq!(s.module().render(x[4]), "0");

    let y = elems(&s, fields[1]);
    assert_eq!(string_at(&s, y[1]), Some("go.p".to_owned()));
    assert_eq!(string_at(&s, y[3]), Some("json:\"y\"".to_owned()));
    assert_eq!(s.module().render(y[4]), "8");
}

#[test]
fn channel_descriptor_records_direction() {
    let mut b = ProgramBuilder::new("p", "go");
    let chan = b.types().channel(TypeId::INT, ChanDir::SEND);
    let program = b.finish();
    let mut s = Session::new(&program, LowerConfig::default());

    let sym = s.descriptor_symbol(chan).unwrap();
    let fields = elems(&s, initial(&s, sym));
    assert_eq!(s.module().render(fields[2]), "2");
    let common = elems(&s, fields[0]);
    assert_eq!(s.module().render(common[0]), "18");
}

#[test]
fn method_signature_receiver_is_pointerized() {
    let mut b = ProgramBuilder::new("p", "go");
    let (_, t) = b.named_type("T", TypeId::INT);
    let sig = b.types().method_signature(t, vec![TypeId::BOOL], Vec::new());
    let program = b.finish();
    let mut s = Session::new(&program, LowerConfig::default());

    let sym = s.descriptor_symbol(sig).unwrap();
    let params = slice_elems(&s, elems(&s, initial(&s, sym))[1]);
    assert_eq!(params.len(), 2);
    let receiver = target_symbol(&s, params[0]).unwrap();
    assert_eq!(name_of(&s, receiver), "__go_td_pN6_go.p.T");
}

#[test]
fn untyped_varargs_have_null_element() {
    let mut b = ProgramBuilder::new("p", "go");
    let varargs = b.types().varargs(None);
    let program = b.finish();
    let mut s = Session::new(&program, LowerConfig::default());

    let sym = s.descriptor_symbol(varargs).unwrap();
    let fields = elems(&s, initial(&s, sym));
    assert_eq!(s.module().render(fields[1]), "null");
}

#[test]
fn hash_class_follows_structure() {
    let mut b = ProgramBuilder::new("p", "go");
    let iface = b.types().interface(Vec::new());
    let st = empty_struct(&mut b);
    let (_, named_string) = b.named_type("S", TypeId::STRING);
    let program = b.finish();
    let s = Session::new(&program, LowerConfig::default());

    assert_eq!(s.hash_class(TypeId::INT), HashClass::Identity);
    assert_eq!(s.hash_class(TypeId::STRING), HashClass::String);
    assert_eq!(s.hash_class(named_string), HashClass::String);
    assert_eq!(s.hash_class(iface), HashClass::Interface);
    assert_eq!(s.hash_class(st), HashClass::Error);
}

#[test]
fn kind_codes_count_up_by_width() {
    let int = |bits, signed| kind_code(&TypeKind::Int { bits, signed });
    assert_eq!([int(8, true), int(16, true), int(32, true), int(64, true)], [3, 4, 5, 6]);
    assert_eq!([int(8, false), int(64, false)], [8, 11]);
    assert_eq!(kind_code(&TypeKind::Float { bits: 32 }), 13);
    assert_eq!(kind_code(&TypeKind::String), 24);
}

// ── Reflection strings ──────────────────────────────────────────

#[test]
fn reflection_spells_types_as_source() {
    let mut b = ProgramBuilder::new("p", "go");
    let (_, t) = b.named_type("T", TypeId::INT);
    let ptr = b.types().pointer(t);
    let map = b.types().map(TypeId::STRING, ptr);
    let func = b
        .types()
        .function(vec![TypeId::INT, TypeId::STRING], vec![TypeId::BOOL, TypeId::INT]);
    let send = b.types().channel(TypeId::INT, ChanDir::SEND);
    let recv = b.types().channel(TypeId::INT, ChanDir::RECV);
    let x = b.ident("X");
    let tag = b.name("json");
    let st = b.types().structure(vec![Field {
        name: Some(x),
        ty: TypeId::INT,
        tag: Some(tag),
    }]);
    let m = b.ident("M");
    let m_ty = b.types().function(vec![TypeId::INT], vec![TypeId::BOOL]);
    let iface = b.types().interface(vec![InterfaceMethod { name: m, ty: m_ty }]);
    let empty = b.types().interface(Vec::new());
    let program = b.finish();
    let s = Session::new(&program, LowerConfig::default());

    assert_eq!(s.reflection(map), "map[string]*p.T");
    assert_eq!(s.reflection(func), "func(int64, string) (bool, int64)");
    assert_eq!(s.reflection(send), "chan<- int64");
    assert_eq!(s.reflection(recv), "<-chan int64");
    assert_eq!(s.reflection(st), "struct { X int64 \"json\" }");
    assert_eq!(s.reflection(iface), "interface { M(int64) bool; }");
    assert_eq!(s.reflection(empty), "interface {}");
}

// ── Map descriptors ─────────────────────────────────────────────

#[test]
fn map_descriptor_records_entry_layout() {
    let mut b = ProgramBuilder::new("p", "go");
    let map = b.types().map(TypeId::STRING, TypeId::INT);
    let program = b.finish();
    let mut s = Session::new(&program, LowerConfig::default());

    let first = s.map_descriptor(map);
    let second = s.map_descriptor(map);
    let sym = target_symbol(&s, first).unwrap();
    assert_eq!(target_symbol(&s, second), Some(sym));
    assert_eq!(name_of(&s, sym), "__go_map_Ms__i64");

    let fields = elems(&s, initial(&s, sym));
    let rendered: Vec<String> = fields[1..].iter().map(|&f| s.module().render(f)).collect();
    assert_eq!(rendered, vec!["24", "8", "16"]);
    assert!(s.module().symbols.get(sym).linkage.one_only);
}

#[test]
fn map_descriptor_of_non_map_is_an_error() {
    let b = ProgramBuilder::new("p", "go");
    let program = b.finish();
    let mut s = Session::new(&program, LowerConfig::default());
    assert_eq!(s.map_descriptor(TypeId::INT), TreeId::ERROR);
    assert_eq!(s.error_count(), 1);
}

// ── Interface tables ────────────────────────────────────────────

#[test]
fn empty_interface_needs_no_table() {
    let mut b = ProgramBuilder::new("p", "go");
    let iface = b.types().interface(Vec::new());
    let program = b.finish();
    let mut s = Session::new(&program, LowerConfig::default());
    let table = s.itable(iface, TypeId::INT, Span::DUMMY);
    assert_eq!(s.module().render(table), "null");
}

#[test]
fn table_follows_interface_method_order() {
    let mut b = ProgramBuilder::new("p", "go");
    let body = empty_struct(&mut b);
    let (id, t) = b.named_type("T", body);
    for name in ["A", "B"] {
        let sig = b.types().method_signature(t, Vec::new(), Vec::new());
        b.method(id, name, Function::new(sig), true);
    }
    let plain = b.types().function(Vec::new(), Vec::new());
    let (a, bm) = (b.ident("A"), b.ident("B"));
    let iface = b.types().interface(vec![
        InterfaceMethod { name: bm, ty: plain },
        InterfaceMethod { name: a, ty: plain },
    ]);
    let program = b.finish();
    let mut s = Session::new(&program, LowerConfig::default());

    let table = s.itable(iface, t, Span::DUMMY);
    let sym = target_symbol(&s, table).unwrap();
    assert_eq!(name_of(&s, sym), "__go_imt_I1_BFe1_AFee__N6_go.p.T");
    assert!(s.module().symbols.get(sym).linkage.one_only);
    let slots: Vec<String> = elems(&s, initial(&s, sym))
        .into_iter()
        .map(|slot| name_of(&s, target_symbol(&s, slot).unwrap()))
        .collect();
    assert_eq!(slots, vec!["p.B.N6_go.p.T", "p.A.N6_go.p.T"]);

    // Cached per pair.
    let again = s.itable(iface, t, Span::DUMMY);
    assert_eq!(target_symbol(&s, again), Some(sym));
}

#[test]
fn missing_method_is_reported() {
    let mut b = ProgramBuilder::new("p", "go");
    let body = empty_struct(&mut b);
    let (id, t) = b.named_type("T", body);
    let ptr = b.types().pointer(t);
    let sig = b.types().method_signature(ptr, Vec::new(), Vec::new());
    b.method(id, "Set", Function::new(sig), false);
    let plain = b.types().function(Vec::new(), Vec::new());
    let set = b.ident("Set");
    let iface = b.types().interface(vec![InterfaceMethod { name: set, ty: plain }]);
    let program = b.finish();
    let mut s = Session::new(&program, LowerConfig::default());

    // `Set` needs a pointer receiver, so `T` itself falls short.
    assert_eq!(s.itable(iface, t, Span::DUMMY), TreeId::ERROR);
    assert_eq!(s.diagnostics().count_code(ErrorCode::E3006), 1);
    assert_ne!(s.itable(iface, ptr, Span::DUMMY), TreeId::ERROR);
}

#[test]
fn hidden_methods_of_foreign_type_are_referenced() {
    let mut b = ProgramBuilder::new("p", "go");
    let pkg = b.import_package("q", "libgo");
    let (_, t) = b.foreign_named_type(pkg, "T", TypeId::INT);
    let plain = b.types().function(Vec::new(), Vec::new());
    let hidden = b.ident("m");
    let iface = b.types().interface(vec![InterfaceMethod {
        name: hidden,
        ty: plain,
    }]);
    let program = b.finish();
    let mut s = Session::new(&program, LowerConfig::default());

    let table = s.itable(iface, t, Span::DUMMY);
    let sym = target_symbol(&s, table).unwrap();
    let symbol = s.module().symbols.get(sym);
    assert!(symbol.linkage.external);
    assert_eq!(symbol.initial, None);
    assert_eq!(s.error_count(), 0);
}

#[test]
fn descriptors_never_share_nodes() {
    let mut b = ProgramBuilder::new("p", "go");
    let body = empty_struct(&mut b);
    let (id, t) = b.named_type("T", body);
    let sig = b.types().method_signature(t, vec![TypeId::STRING], Vec::new());
    b.method(id, "Put", Function::new(sig), true);
    let ptr = b.types().pointer(t);
    let slice = b.types().slice(ptr);
    let map = b.types().map(TypeId::STRING, slice);
    let program = b.finish();
    let mut s = Session::new(&program, LowerConfig::default());

    s.type_descriptor(map);
    s.map_descriptor(map);
    s.type_descriptor(ptr);
    assert_eq!(s.error_count(), 0);
    assert_eq!(s.module().check_unshared(), Ok(()));
}
