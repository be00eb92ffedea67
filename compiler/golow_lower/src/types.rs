//! Lowering of program types to backend types.
//!
//! | Program type | Lowered |
//! |--------------|---------|
//! | `string` | pointer to `__go_string { __length, __data[] }` |
//! | function value | pointer to function |
//! | struct | record, named after the type when it has a name |
//! | slice, `...T` | `{ __values, __count, __capacity }` |
//! | map, channel | pointer to opaque runtime record |
//! | interface | pointer to `__go_interface` |
//!
//! Named struct types are declared before their fields are lowered so a
//! field pointing back at the type terminates.

use golow_ir::{FuncType, TypeId, TypeKind};
use golow_tree::{RecordField, TreeTypeId};

use crate::session::Session;
use crate::stack::ensure_sufficient_stack;

impl Session<'_> {
    pub(crate) fn lower_type(&mut self, ty: TypeId) -> TreeTypeId {
        if let Some(&lowered) = self.caches.types.get(&ty) {
            return lowered;
        }
        // `type L []L` recurses through a pointer-sized slot whose pointee
        // does not affect layout.
        if let Some(id) = self.types.named_id(ty) {
            if self.caches.lowering_named.contains(&id) {
                return TreeTypeId::VOID_PTR;
            }
        }
        let lowered = ensure_sufficient_stack(|| self.lower_type_uncached(ty));
        self.caches.types.insert(ty, lowered);
        lowered
    }

    fn lower_type_uncached(&mut self, ty: TypeId) -> TreeTypeId {
        match self.types.kind(ty).clone() {
            TypeKind::Error | TypeKind::Forward(_) => TreeTypeId::ERROR,
            TypeKind::Void => TreeTypeId::VOID,
            TypeKind::Nil => TreeTypeId::VOID_PTR,
            TypeKind::Bool => TreeTypeId::BOOL,
            TypeKind::Int { bits, signed } => self.module.types.int(bits, signed),
            TypeKind::Float { bits } => self.module.types.float(bits),
            TypeKind::String => self.string_type(),
            TypeKind::Pointer(to) => {
                let to = self.lower_type(to);
                if to.is_error() {
                    return TreeTypeId::ERROR;
                }
                self.module.types.pointer(to)
            }
            TypeKind::Function(sig) => {
                let fn_ty = self.lower_signature(&sig);
                self.module.types.pointer(fn_ty)
            }
            TypeKind::Struct(fields) => {
                let fields = self.lower_fields(&fields);
                self.module.types.record(None, fields)
            }
            TypeKind::Array { elem, len } => {
                let elem = self.lower_type(elem);
                self.module.types.array(elem, Some(len))
            }
            TypeKind::Slice(elem) | TypeKind::Varargs(Some(elem)) => {
                let elem = self.lower_type(elem);
                self.slice_record(elem)
            }
            TypeKind::Map { .. } => {
                let record = self.builtin_record("__go_map", |_| Vec::new());
                self.module.types.pointer(record)
            }
            TypeKind::Channel { .. } => {
                let record = self.builtin_record("__go_channel", |_| Vec::new());
                self.module.types.pointer(record)
            }
            TypeKind::Interface(_) | TypeKind::Varargs(None) => self.interface_type(),
            TypeKind::Named(id) => {
                if let Some(&record) = self.caches.named_records.get(&id) {
                    return record;
                }
                let named = self.types.named_type(id).clone();
                match self.types.underlying_kind(ty).clone() {
                    TypeKind::Struct(fields) => {
                        let name = self.str(named.ident.name);
                        let record = self.module.types.declare_record(name);
                        self.caches.named_records.insert(id, record);
                        self.caches.types.insert(ty, record);
                        let fields = self.lower_fields(&fields);
                        self.module.types.complete_record(record, fields);
                        record
                    }
                    _ => {
                        self.caches.lowering_named.insert(id);
                        let lowered = self.lower_type(named.underlying);
                        self.caches.lowering_named.remove(&id);
                        lowered
                    }
                }
            }
        }
    }

    fn lower_fields(&mut self, fields: &[golow_ir::Field]) -> Vec<RecordField> {
        fields
            .iter()
            .enumerate()
            .map(|(i, field)| {
                let name = match field.name {
                    Some(ident) => self.str(ident.name).to_owned(),
                    None => self.embedded_field_name(field.ty, i),
                };
                let ty = self.lower_type(field.ty);
                RecordField::new(name, ty)
            })
            .collect()
    }

    /// Name of an embedded field: the embedded type's name.
    fn embedded_field_name(&self, ty: TypeId, index: usize) -> String {
        let named = self
            .types
            .named_id(ty)
            .or_else(|| self.types.pointee_named(ty));
        match named {
            Some(id) => self.str(self.types.named_type(id).ident.name).to_owned(),
            None => format!("__anon{index}"),
        }
    }

    /// Backend function type of a signature. A non-pointer receiver is
    /// passed by pointer.
    pub(crate) fn lower_signature(&mut self, sig: &FuncType) -> TreeTypeId {
        let mut params = Vec::with_capacity(sig.params.len() + 1);
        if let Some(receiver) = sig.receiver {
            let lowered = self.lower_type(receiver);
            if self.types.points_to(receiver).is_some() {
                params.push(lowered);
            } else {
                params.push(self.module.types.pointer(lowered));
            }
        }
        for &param in &sig.params {
            params.push(self.lower_type(param));
        }
        let result = self.lower_results(&sig.results);
        self.module.types.function(params, result)
    }

    /// Result type: void, the single result, or a record of all results.
    pub(crate) fn lower_results(&mut self, results: &[TypeId]) -> TreeTypeId {
        match results {
            [] => TreeTypeId::VOID,
            [one] => self.lower_type(*one),
            many => {
                let fields = many
                    .iter()
                    .enumerate()
                    .map(|(i, &ty)| RecordField::new(format!("r{i}"), self.lower_type(ty)))
                    .collect();
                self.module.types.record(None, fields)
            }
        }
    }

    /// Function type of a function declaration's symbol.
    pub(crate) fn lower_function_type(&mut self, ty: TypeId) -> TreeTypeId {
        match self.types.func_type(ty).cloned() {
            Some(sig) => self.lower_signature(&sig),
            None => TreeTypeId::ERROR,
        }
    }

    /// Lowered interface value type: pointer to
    /// `__go_interface { __type_descriptor, __methods, __object }`.
    pub(crate) fn interface_type(&mut self) -> TreeTypeId {
        let record = self.builtin_record("__go_interface", |s| {
            let td = s.descriptor_ptr_type();
            vec![
                RecordField::new("__type_descriptor", td),
                RecordField::new("__methods", TreeTypeId::VOID_PTR),
                RecordField::new("__object", TreeTypeId::VOID_PTR),
            ]
        });
        self.module.types.pointer(record)
    }

    /// `*T` for a named `T`, created once per session.
    pub(crate) fn pointer_to_named(
        &mut self,
        id: golow_ir::NamedTypeId,
        named_ty: TypeId,
    ) -> TypeId {
        if let Some(&ptr) = self.caches.pointers_to_named.get(&id) {
            return ptr;
        }
        let ptr = self.types.pointer(named_ty);
        self.caches.pointers_to_named.insert(id, ptr);
        ptr
    }
}
