//! Interface method tables.
//!
//! An itable lists, in the interface's method order, the code address of
//! the concrete type's implementation of each method. A named `T`
//! supplies its value-receiver methods; `*T` supplies all of them.
//!
//! When the interface has hidden methods and `T` belongs to another
//! package, only that package can name the implementations, so its table
//! is referenced here and never defined.

use golow_diagnostic::ErrorCode;
use golow_ir::{InterfaceMethod, NamedTypeId, Span, TypeId};
use golow_tree::{Linkage, Symbol, SymbolId, SymbolKind, TreeId, TreeTypeId, Visibility};

use crate::session::Session;

impl Session<'_> {
    /// Address of the table of `concrete`'s methods for `iface`, as an
    /// untyped pointer. Null for an interface without methods.
    pub(crate) fn itable(&mut self, iface: TypeId, concrete: TypeId, span: Span) -> TreeId {
        let Some(methods) = self.types.interface_methods(iface).map(<[_]>::to_vec) else {
            return self.error(
                ErrorCode::E9001,
                span,
                "method table requested for a non-interface type",
            );
        };
        if methods.is_empty() {
            return self.null(TreeTypeId::VOID_PTR);
        }
        let named = self.types.named_id(concrete);
        let (id, value_only) = match (named, self.types.pointee_named(concrete)) {
            (Some(id), _) => (id, true),
            (None, Some(id)) => (id, false),
            (None, None) => {
                let (concrete, iface) = (self.reflection(concrete), self.reflection(iface));
                return self.error(
                    ErrorCode::E3006,
                    span,
                    format!("`{concrete}` has no methods and cannot implement `{iface}`"),
                );
            }
        };

        let name = format!(
            "__go_imt_{}__{}",
            self.mangled_name(iface),
            self.mangled_name(concrete)
        );
        let sym = match self.caches.itables.get(&name) {
            Some(&sym) => sym,
            None => match self.build_itable(name, &methods, id, value_only, span) {
                Some(sym) => sym,
                None => return TreeId::ERROR,
            },
        };
        let decl = self.decl_ref(sym);
        let addr = self.addr_of(decl);
        self.convert(addr, TreeTypeId::VOID_PTR)
    }

    fn build_itable(
        &mut self,
        name: String,
        methods: &[InterfaceMethod],
        id: NamedTypeId,
        value_only: bool,
        span: Span,
    ) -> Option<SymbolId> {
        let named = self.types.named_type(id).clone();
        let has_hidden = methods.iter().any(|m| m.name.is_hidden());

        let symbol = if has_hidden && !named.is_local() {
            let ty = self.module.types.array(TreeTypeId::VOID_PTR, None);
            let mut symbol = Symbol::new(SymbolKind::Variable, name.clone(), ty);
            symbol.linkage = Linkage {
                readonly: true,
                ..Linkage::EXTERNAL
            };
            symbol
        } else {
            let mut slots = Vec::with_capacity(methods.len());
            for method in methods {
                match named.method(method.name) {
                    Some(found) if !value_only || found.value_receiver => {
                        slots.push(self.function_address(found.func));
                    }
                    _ => {
                        let type_name = self.str(named.ident.name);
                        let method_name = self.str(method.name.name);
                        self.error(
                            ErrorCode::E3006,
                            span,
                            format!(
                                "`{type_name}` has no method `{method_name}` \
                                 for its interface table"
                            ),
                        );
                        return None;
                    }
                }
            }
            let count = methods.len() as u64;
            let ty = self.module.types.array(TreeTypeId::VOID_PTR, Some(count));
            let init = self.constructor(ty, slots);
            let mut symbol = Symbol::new(SymbolKind::Variable, name.clone(), ty);
            symbol.initial = Some(init);
            symbol.linkage = if has_hidden {
                // Only this package can build it.
                Linkage {
                    public: true,
                    is_static: true,
                    readonly: true,
                    visibility: Visibility::Protected,
                    ..Linkage::default()
                }
            } else {
                Linkage {
                    public: true,
                    is_static: true,
                    readonly: true,
                    one_only: true,
                    ..Linkage::default()
                }
            };
            symbol
        };

        let external = symbol.linkage.external;
        let sym = self.add_symbol(symbol);
        if !external {
            self.emit(sym);
        }
        self.caches.itables.insert(name, sym);
        tracing::debug!(name = %self.symbol(sym).name, external, "built interface method table");
        Some(sym)
    }
}
