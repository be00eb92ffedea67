use pretty_assertions::assert_eq;

use super::*;

#[test]
fn scalars_are_interned() {
    let mut table = TypeTable::new();
    assert_eq!(table.int(64, false), TreeTypeId::U64);
    let p1 = table.pointer(TreeTypeId::I64);
    let p2 = table.pointer(TreeTypeId::I64);
    assert_eq!(p1, p2);
    assert_eq!(table.pointer(TreeTypeId::VOID), TreeTypeId::VOID_PTR);
}

#[test]
fn records_are_nominal() {
    let mut table = TypeTable::new();
    let a = table.record(None, vec![RecordField::new("x", TreeTypeId::I64)]);
    let b = table.record(None, vec![RecordField::new("x", TreeTypeId::I64)]);
    assert_ne!(a, b);
}

// ── Layout ──────────────────────────────────────────────────────

#[test]
fn record_layout_pads_fields() {
    let mut table = TypeTable::new();
    let rec = table.record(
        Some("r"),
        vec![
            RecordField::new("a", TreeTypeId::U8),
            RecordField::new("b", TreeTypeId::U64),
            RecordField::new("c", TreeTypeId::U8),
        ],
    );
    assert_eq!(table.layout(rec, Target::LP64), Layout { size: 24, align: 8 });
    assert_eq!(table.field_offset(rec, 0, Target::LP64), 0);
    assert_eq!(table.field_offset(rec, 1, Target::LP64), 8);
    assert_eq!(table.field_offset(rec, 2, Target::LP64), 16);
}

#[test]
fn pointer_size_follows_target() {
    let mut table = TypeTable::new();
    let p = table.pointer(TreeTypeId::U8);
    assert_eq!(table.layout(p, Target::LP64).size, 8);
    assert_eq!(table.layout(p, Target::ILP32).size, 4);
    assert_eq!(Target::ILP32.uintptr(), TreeTypeId::U32);
}

#[test]
fn field_align_is_capped() {
    let table = TypeTable::new();
    assert_eq!(table.field_align(TreeTypeId::U64, Target::ILP32), 4);
    assert_eq!(table.field_align(TreeTypeId::U64, Target::LP64), 8);
}

#[test]
fn record_fields_use_the_capped_alignment() {
    let mut table = TypeTable::new();
    let rec = table.record(
        Some("r"),
        vec![
            RecordField::new("a", TreeTypeId::U32),
            RecordField::new("b", TreeTypeId::U64),
        ],
    );
    assert_eq!(table.field_offset(rec, 1, Target::ILP32), 4);
    assert_eq!(table.layout(rec, Target::ILP32), Layout { size: 12, align: 4 });
    assert_eq!(table.field_offset(rec, 1, Target::LP64), 8);
    assert_eq!(table.layout(rec, Target::LP64), Layout { size: 16, align: 8 });
}

#[test]
fn recursive_record_through_pointer() {
    let mut table = TypeTable::new();
    let node = table.declare_record("node");
    let next = table.pointer(node);
    table.complete_record(
        node,
        vec![
            RecordField::new("next", next),
            RecordField::new("value", TreeTypeId::I64),
        ],
    );
    assert_eq!(table.layout(node, Target::LP64).size, 16);
    assert_eq!(table.field_index(node, "value"), Some(1));
    assert_eq!(table.display(next), "*node");
}

#[test]
fn arrays_multiply_element_size() {
    let mut table = TypeTable::new();
    let arr = table.array(TreeTypeId::U32, Some(5));
    assert_eq!(table.layout(arr, Target::LP64), Layout { size: 20, align: 4 });
    assert!(table.is_aggregate(arr));
    assert!(!table.is_aggregate(TreeTypeId::U64));
}
