//! Shape-specific descriptor records.
//!
//! Each shape record starts with the common block as `__common`, so a
//! pointer to any descriptor is also a pointer to its common block.

use golow_ir::{Field, FuncType, InterfaceMethod, NamedTypeId, TypeId, TypeKind};
use golow_tree::{RecordField, TreeId, TreeTypeId};

use super::common::{name_hash, Uncommon};
use super::kind_code;
use crate::session::Session;

impl Session<'_> {
    /// Record type of a descriptor for a type of shape `kind`.
    pub(super) fn shape_record(&mut self, kind: &TypeKind) -> TreeTypeId {
        match kind {
            TypeKind::Pointer(_) => self.element_record("__go_ptr_type"),
            TypeKind::Slice(_) => self.element_record("__go_slice_type"),
            TypeKind::Function(_) => self.builtin_record("__go_func_type", |s| {
                let common = s.common_record();
                let list = s.descriptor_list_type();
                vec![
                    RecordField::new("__common", common),
                    RecordField::new("__in", list),
                    RecordField::new("__out", list),
                ]
            }),
            TypeKind::Struct(_) => self.builtin_record("__go_struct_type", |s| {
                let common = s.common_record();
                let field = s.struct_field_record();
                let fields = s.slice_record(field);
                vec![
                    RecordField::new("__common", common),
                    RecordField::new("__fields", fields),
                ]
            }),
            TypeKind::Array { .. } => self.builtin_record("__go_array_type", |s| {
                let common = s.common_record();
                let td = s.descriptor_ptr_type();
                let uintptr = s.uintptr();
                vec![
                    RecordField::new("__common", common),
                    RecordField::new("__element_type", td),
                    RecordField::new("__len", uintptr),
                ]
            }),
            TypeKind::Map { .. } => self.builtin_record("__go_map_type", |s| {
                let common = s.common_record();
                let td = s.descriptor_ptr_type();
                vec![
                    RecordField::new("__common", common),
                    RecordField::new("__key_type", td),
                    RecordField::new("__val_type", td),
                ]
            }),
            TypeKind::Channel { .. } => self.builtin_record("__go_channel_type", |s| {
                let common = s.common_record();
                let td = s.descriptor_ptr_type();
                let dir = s.module.types.int(32, true);
                vec![
                    RecordField::new("__common", common),
                    RecordField::new("__element_type", td),
                    RecordField::new("__dir", dir),
                ]
            }),
            TypeKind::Interface(_) => self.builtin_record("__go_interface_type", |s| {
                let common = s.common_record();
                let method = s.interface_method_record();
                let methods = s.slice_record(method);
                vec![
                    RecordField::new("__common", common),
                    RecordField::new("__methods", methods),
                ]
            }),
            TypeKind::Varargs(_) => self.builtin_record("__go_dotdotdot_type", |s| {
                let common = s.common_record();
                let td = s.descriptor_ptr_type();
                vec![
                    RecordField::new("__common", common),
                    RecordField::new("__argument_type", td),
                ]
            }),
            _ => self.common_record(),
        }
    }

    fn element_record(&mut self, name: &'static str) -> TreeTypeId {
        self.builtin_record(name, |s| {
            let common = s.common_record();
            let td = s.descriptor_ptr_type();
            vec![
                RecordField::new("__common", common),
                RecordField::new("__element_type", td),
            ]
        })
    }

    /// Slice of descriptor pointers.
    fn descriptor_list_type(&mut self) -> TreeTypeId {
        let td = self.descriptor_ptr_type();
        self.slice_record(td)
    }

    fn struct_field_record(&mut self) -> TreeTypeId {
        self.builtin_record("__go_struct_field", |s| {
            let string_ptr = s.string_ptr_type();
            let td = s.descriptor_ptr_type();
            let uintptr = s.uintptr();
            vec![
                RecordField::new("__name", string_ptr),
                RecordField::new("__pkg_path", string_ptr),
                RecordField::new("__type", td),
                RecordField::new("__tag", string_ptr),
                RecordField::new("__offset", uintptr),
            ]
        })
    }

    fn interface_method_record(&mut self) -> TreeTypeId {
        self.builtin_record("__go_interface_method", |s| {
            let string_ptr = s.string_ptr_type();
            let td = s.descriptor_ptr_type();
            vec![
                RecordField::new("__hash", TreeTypeId::U32),
                RecordField::new("__name", string_ptr),
                RecordField::new("__pkg_path", string_ptr),
                RecordField::new("__type", td),
            ]
        })
    }

    // ── Initializers ────────────────────────────────────────────

    /// Initializer of `ty`'s descriptor; `kind` is its underlying shape.
    pub(super) fn descriptor_init(
        &mut self,
        ty: TypeId,
        named: Option<NamedTypeId>,
        kind: &TypeKind,
        record: TreeTypeId,
    ) -> TreeId {
        let uncommon = match named {
            Some(id) => Uncommon::Named(id),
            None => match self.types.pointee_named(ty) {
                Some(id) => Uncommon::PointerTo(id),
                None => Uncommon::None,
            },
        };
        let common = self.common_init(ty, kind_code(kind), uncommon);
        let elems = match kind {
            TypeKind::Pointer(elem) | TypeKind::Slice(elem) => {
                vec![common, self.type_descriptor(*elem)]
            }
            TypeKind::Function(sig) => {
                let (params, results) = self.function_lists(sig);
                vec![common, params, results]
            }
            TypeKind::Struct(fields) => {
                let fields = self.struct_fields(ty, fields);
                vec![common, fields]
            }
            TypeKind::Array { elem, len } => {
                let elem = self.type_descriptor(*elem);
                let len = self.uintptr_const(*len);
                vec![common, elem, len]
            }
            TypeKind::Map { key, value } => {
                let key = self.type_descriptor(*key);
                let value = self.type_descriptor(*value);
                vec![common, key, value]
            }
            TypeKind::Channel { elem, dir } => {
                let elem = self.type_descriptor(*elem);
                let dir_ty = self.module.types.int(32, true);
                let dir = self.int_const(i128::from(dir.bits()), dir_ty);
                vec![common, elem, dir]
            }
            TypeKind::Interface(methods) => {
                let methods = self.interface_methods(methods);
                vec![common, methods]
            }
            TypeKind::Varargs(elem) => {
                let arg = match elem {
                    Some(elem) => self.type_descriptor(*elem),
                    None => {
                        let td = self.descriptor_ptr_type();
                        self.null(td)
                    }
                };
                vec![common, arg]
            }
            _ => return common,
        };
        self.constructor(record, elems)
    }

    /// `__in` and `__out` of a function descriptor. A receiver comes
    /// first and is always described as a pointer.
    fn function_lists(&mut self, sig: &FuncType) -> (TreeId, TreeId) {
        let mut params = Vec::with_capacity(sig.params.len() + 1);
        if let Some(receiver) = sig.receiver {
            let receiver = if self.types.points_to(receiver).is_some() {
                receiver
            } else if let Some(id) = self.types.named_id(receiver) {
                self.pointer_to_named(id, receiver)
            } else {
                self.types.pointer(receiver)
            };
            params.push(receiver);
        }
        params.extend_from_slice(&sig.params);
        let params = self.descriptor_slice(&params);
        let results = self.descriptor_slice(&sig.results);
        (params, results)
    }

    fn descriptor_slice(&mut self, types: &[TypeId]) -> TreeId {
        let slice = self.descriptor_list_type();
        let elems = types.iter().map(|&ty| self.type_descriptor(ty)).collect();
        self.static_slice(slice, elems)
    }

    fn struct_fields(&mut self, ty: TypeId, fields: &[Field]) -> TreeId {
        let record = self.struct_field_record();
        let slice = self.slice_record(record);
        let lowered = self.lower_type(ty);
        let target = self.target();
        let mut elems = Vec::with_capacity(fields.len());
        for (i, field) in (0u32..).zip(fields) {
            let (name, pkg_path) = match field.name {
                Some(ident) => {
                    let name = self.str(ident.name);
                    (self.ptr_string_constant(name), self.pkg_path(ident))
                }
                None => (self.null_string_ptr(), self.null_string_ptr()),
            };
            let field_ty = self.type_descriptor(field.ty);
            let tag = match field.tag {
                Some(tag) => {
                    let tag = self.str(tag);
                    self.ptr_string_constant(tag)
                }
                None => self.null_string_ptr(),
            };
            let offset = self.module.types.field_offset(lowered, i, target);
            let offset = self.uintptr_const(offset);
            elems.push(self.constructor(record, vec![name, pkg_path, field_ty, tag, offset]));
        }
        self.static_slice(slice, elems)
    }

    /// Interface methods in declaration order.
    fn interface_methods(&mut self, methods: &[InterfaceMethod]) -> TreeId {
        let record = self.interface_method_record();
        let slice = self.slice_record(record);
        let mut elems = Vec::with_capacity(methods.len());
        for method in methods {
            let name = self.str(method.name.name);
            let hash = self.int_const(i128::from(name_hash(name)), TreeTypeId::U32);
            let name = self.ptr_string_constant(name);
            let pkg_path = self.pkg_path(method.name);
            let mtype = self.type_descriptor(method.ty);
            elems.push(self.constructor(record, vec![hash, name, pkg_path, mtype]));
        }
        self.static_slice(slice, elems)
    }
}
