//! Map descriptors: what the runtime needs to allocate and walk a map.

use golow_diagnostic::ErrorCode;
use golow_ir::{Span, TypeId, TypeKind};
use golow_tree::{Linkage, RecordField, Symbol, SymbolKind, TreeId};

use crate::session::Session;

impl Session<'_> {
    /// Address of the descriptor `__go_map_<mangled>` of `map_ty`.
    ///
    /// The descriptor records the map type's descriptor plus the size of
    /// an entry `{next, key, value}` and the offsets of key and value in
    /// it. It is one-only: every unit that allocates this map type
    /// defines it.
    pub(crate) fn map_descriptor(&mut self, map_ty: TypeId) -> TreeId {
        let TypeKind::Map { key, value } = self.types.underlying_kind(map_ty).clone() else {
            return self.error(
                ErrorCode::E9001,
                Span::DUMMY,
                "map descriptor requested for a non-map type",
            );
        };
        let name = format!("__go_map_{}", self.mangled_name(map_ty));
        let sym = match self.caches.map_descriptors.get(&name) {
            Some(&sym) => sym,
            None => {
                let record = self.builtin_record("__go_map_descriptor", |s| {
                    let td = s.descriptor_ptr_type();
                    let uintptr = s.uintptr();
                    vec![
                        RecordField::new("__map_descriptor", td),
                        RecordField::new("__entry_size", uintptr),
                        RecordField::new("__key_offset", uintptr),
                        RecordField::new("__val_offset", uintptr),
                    ]
                });
                let key = self.lower_type(key);
                let value = self.lower_type(value);
                let entry = self.module.types.declare_record("__map");
                let next = self.module.types.pointer(entry);
                self.module.types.complete_record(
                    entry,
                    vec![
                        RecordField::new("__next", next),
                        RecordField::new("__key", key),
                        RecordField::new("__val", value),
                    ],
                );
                let target = self.target();
                let entry_size = self.module.types.layout(entry, target).size;
                let key_offset = self.module.types.field_offset(entry, 1, target);
                let val_offset = self.module.types.field_offset(entry, 2, target);

                let td = self.type_descriptor(map_ty);
                let entry_size = self.uintptr_const(entry_size);
                let key_offset = self.uintptr_const(key_offset);
                let val_offset = self.uintptr_const(val_offset);
                let init = self.constructor(record, vec![td, entry_size, key_offset, val_offset]);

                let mut symbol = Symbol::new(SymbolKind::Variable, name.clone(), record);
                symbol.initial = Some(init);
                symbol.linkage = Linkage {
                    public: true,
                    is_static: true,
                    one_only: true,
                    readonly: true,
                    ..Linkage::default()
                };
                let sym = self.add_symbol(symbol);
                self.emit(sym);
                self.caches.map_descriptors.insert(name, sym);
                tracing::debug!(name = %self.symbol(sym).name, "built map descriptor");
                sym
            }
        };
        let decl = self.decl_ref(sym);
        self.addr_of(decl)
    }
}
