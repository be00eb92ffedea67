//! The common descriptor block and its uncommon extension.

use golow_diagnostic::{Diagnostic, ErrorCode};
use golow_ir::{DeclId, Ident, Method, NamedTypeId, TypeId};
use golow_tree::{RecordField, TreeId, TreeTypeId};

use crate::runtime::RuntimeFn;
use crate::session::{Materialized, Session};

/// Source of a descriptor's uncommon block.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub(super) enum Uncommon {
    None,
    /// A named type: its name and its value methods.
    Named(NamedTypeId),
    /// An unnamed pointer to a named type: every method of the pointee.
    PointerTo(NamedTypeId),
}

/// 32-bit FNV-1a hash of a method name.
pub(super) fn name_hash(name: &str) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in name.bytes() {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}

impl Session<'_> {
    // ── Record types ────────────────────────────────────────────

    /// `__go_type_descriptor`.
    pub(super) fn common_record(&mut self) -> TreeTypeId {
        self.builtin_record("__go_type_descriptor", |s| {
            let uintptr = s.uintptr();
            let string_ptr = s.string_ptr_type();
            let hash_fn = s
                .module
                .types
                .function(vec![TreeTypeId::VOID_PTR, uintptr], uintptr);
            let equal_fn = s.module.types.function(
                vec![TreeTypeId::VOID_PTR, uintptr, TreeTypeId::VOID_PTR, uintptr],
                TreeTypeId::BOOL,
            );
            let uncommon = s.uncommon_record();
            vec![
                RecordField::new("__code", TreeTypeId::U8),
                RecordField::new("__align", TreeTypeId::U8),
                RecordField::new("__field_align", TreeTypeId::U8),
                RecordField::new("__size", uintptr),
                RecordField::new("__hash", s.module.types.pointer(hash_fn)),
                RecordField::new("__equal", s.module.types.pointer(equal_fn)),
                RecordField::new("__reflection", string_ptr),
                RecordField::new("__uncommon", s.module.types.pointer(uncommon)),
            ]
        })
    }

    /// `__go_uncommon_type`: name, package path and method table.
    fn uncommon_record(&mut self) -> TreeTypeId {
        self.builtin_record("__go_uncommon_type", |s| {
            let string_ptr = s.string_ptr_type();
            let method = s.method_record();
            let methods = s.slice_record(method);
            vec![
                RecordField::new("__name", string_ptr),
                RecordField::new("__pkg_path", string_ptr),
                RecordField::new("__methods", methods),
            ]
        })
    }

    /// `__go_method`: one method table entry.
    fn method_record(&mut self) -> TreeTypeId {
        self.builtin_record("__go_method", |s| {
            let string_ptr = s.string_ptr_type();
            let td = s.descriptor_ptr_type();
            vec![
                RecordField::new("__hash", TreeTypeId::U32),
                RecordField::new("__name", string_ptr),
                RecordField::new("__pkg_path", string_ptr),
                RecordField::new("__type", td),
                RecordField::new("__function", TreeTypeId::VOID_PTR),
            ]
        })
    }

    pub(super) fn string_ptr_type(&mut self) -> TreeTypeId {
        let string = self.string_type();
        self.module.types.pointer(string)
    }

    // ── Values ──────────────────────────────────────────────────

    /// The common block of `ty`'s descriptor.
    pub(super) fn common_init(&mut self, ty: TypeId, code: u8, uncommon: Uncommon) -> TreeId {
        let record = self.common_record();
        let lowered = self.lower_type(ty);
        let target = self.target();
        let layout = self.module.types.layout(lowered, target);
        let field_align = self.module.types.field_align(lowered, target);
        let class = self.hash_class(ty);

        let code = self.int_const(i128::from(code), TreeTypeId::U8);
        let align = self.int_const(i128::from(layout.align), TreeTypeId::U8);
        let field_align = self.int_const(i128::from(field_align), TreeTypeId::U8);
        let size = self.uintptr_const(layout.size);
        let hash = self.runtime_fn_ptr(RuntimeFn::TypeHash(class));
        let equal = self.runtime_fn_ptr(RuntimeFn::TypeEqual(class));
        let reflection = self.reflection(ty);
        let reflection = self.ptr_string_constant(&reflection);
        let uncommon = self.uncommon_info(uncommon);
        self.constructor(
            record,
            vec![code, align, field_align, size, hash, equal, reflection, uncommon],
        )
    }

    fn runtime_fn_ptr(&mut self, f: RuntimeFn) -> TreeId {
        let sym = self.runtime_fn(f);
        let decl = self.decl_ref(sym);
        self.addr_of(decl)
    }

    /// Address of a static uncommon block, or null when the type has
    /// neither a name nor methods.
    fn uncommon_info(&mut self, uncommon: Uncommon) -> TreeId {
        let (name, methods_of, value_only) = match uncommon {
            Uncommon::None => return self.null_uncommon(),
            Uncommon::Named(id) => (Some(id), id, true),
            Uncommon::PointerTo(id) => {
                if self.types.named_type(id).methods.is_empty() {
                    return self.null_uncommon();
                }
                (None, id, false)
            }
        };
        let record = self.uncommon_record();
        let (name_value, pkg_path) = match name {
            None => (self.null_string_ptr(), self.null_string_ptr()),
            Some(id) => {
                let named = self.types.named_type(id);
                let (type_name, builtin, package, in_function) = (
                    self.str(named.ident.name),
                    named.is_builtin,
                    named.package,
                    named.in_function,
                );
                let name_value = self.ptr_string_constant(type_name);
                let pkg_path = if builtin {
                    self.null_string_ptr()
                } else {
                    let (prefix, package) = self.package_strings(package);
                    let mut path = format!("{prefix}.{package}");
                    if let Some(function) = in_function {
                        path.push('.');
                        path.push_str(self.str(function));
                    }
                    self.ptr_string_constant(&path)
                };
                (name_value, pkg_path)
            }
        };
        let methods = self.method_table(methods_of, value_only);
        let init = self.constructor(record, vec![name_value, pkg_path, methods]);
        let sym = self.static_constant("U", record, init);
        let decl = self.decl_ref(sym);
        self.addr_of(decl)
    }

    fn null_uncommon(&mut self) -> TreeId {
        let record = self.uncommon_record();
        let ptr = self.module.types.pointer(record);
        self.null(ptr)
    }

    /// Method table slice of `id`, sorted by name. Ambiguous promotions
    /// are left out and reported once per type.
    fn method_table(&mut self, id: NamedTypeId, value_only: bool) -> TreeId {
        let named = self.types.named_type(id).clone();
        let mut methods: Vec<(String, &Method)> = Vec::with_capacity(named.methods.len());
        for method in &named.methods {
            if method.ambiguous {
                self.report_ambiguous(id, method);
                continue;
            }
            if value_only && !method.value_receiver {
                continue;
            }
            methods.push((self.program.interner.sort_key(method.name), method));
        }
        methods.sort_by(|a, b| a.0.cmp(&b.0));

        let entry = self.method_record();
        let slice = self.slice_record(entry);
        let elems = methods
            .iter()
            .map(|(_, method)| self.method_entry(entry, method))
            .collect();
        self.static_slice(slice, elems)
    }

    fn report_ambiguous(&mut self, id: NamedTypeId, method: &Method) {
        if !self.caches.ambiguous_reported.insert((id, method.name)) {
            return;
        }
        let named = self.types.named_type(id);
        let (type_name, span) = (self.str(named.ident.name), named.span);
        let method_name = self.str(method.name.name);
        tracing::warn!(
            type_name,
            method = method_name,
            "ambiguous method left out of method table"
        );
        self.report(
            Diagnostic::warning(ErrorCode::E3004)
                .with_message(format!(
                    "method `{method_name}` of `{type_name}` is ambiguous \
                     and is left out of its method table"
                ))
                .with_label(span, "type declared here")
                .with_note("interface tables built from this type may be incomplete"),
        );
    }

    fn method_entry(&mut self, record: TreeTypeId, method: &Method) -> TreeId {
        let name = self.str(method.name.name);
        let hash = self.int_const(i128::from(name_hash(name)), TreeTypeId::U32);
        let name_value = self.ptr_string_constant(name);
        let pkg_path = self.pkg_path(method.name);
        let mtype = self.type_descriptor(method.ty);
        let function = self.function_address(method.func);
        self.constructor(record, vec![hash, name_value, pkg_path, mtype, function])
    }

    /// Null for an exported name, the hidden-name prefix otherwise.
    pub(super) fn pkg_path(&mut self, ident: Ident) -> TreeId {
        match ident.hidden_prefix {
            None => self.null_string_ptr(),
            Some(prefix) => {
                let prefix = self.str(prefix);
                self.ptr_string_constant(prefix)
            }
        }
    }

    /// Address of a function declaration as an untyped code pointer.
    pub(crate) fn function_address(&mut self, func: DeclId) -> TreeId {
        match self.materialize(func, None) {
            Materialized::Symbol(sym) => {
                let decl = self.decl_ref(sym);
                let addr = self.addr_of(decl);
                self.convert(addr, TreeTypeId::VOID_PTR)
            }
            Materialized::Heap(_) | Materialized::Error => TreeId::ERROR,
        }
    }
}
