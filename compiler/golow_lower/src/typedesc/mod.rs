//! Type descriptor synthesis.
//!
//! Every type the generated program inspects at run time (the dynamic
//! type of an interface value, a map's key and value, a method signature)
//! has a descriptor: a read-only record whose first member is the common
//! `__go_type_descriptor` block, followed by fields specific to the type's
//! shape.
//!
//! # Placement
//!
//! | Type | Symbol | Definition |
//! |------|--------|------------|
//! | named, other package | `__go_tdn_<qualified>` | external reference |
//! | named builtin | `__go_tdn_<name>` | one-only |
//! | named, this package | `__go_tdn_<qualified>` | public, protected |
//! | unnamed | `__go_td_<mangled>` | one-only |
//!
//! Unnamed descriptors are keyed by mangled name, so structurally identical
//! types share one symbol and independent objects merge at link time.
//! Named descriptors are keyed by type identity and never merged.
//!
//! The symbol is cached before its initializer is built, so a type that
//! reaches itself through a pointer or a method signature terminates.

mod common;
mod itable;
mod map;
mod reflection;
mod shapes;

use golow_diagnostic::ErrorCode;
use golow_ir::{NamedTypeId, Span, TypeId, TypeKind};
use golow_tree::{Linkage, Symbol, SymbolId, SymbolKind, TreeId, TreeTypeId, Visibility};

use crate::runtime::HashClass;
use crate::session::Session;

/// Where a descriptor's definition lives.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum Placement {
    /// Defined by the package owning the type; referenced only.
    External,
    /// Defined by every object that needs it; the linker keeps one.
    Common,
    /// Defined here, once.
    Defined,
}

enum DescriptorKey {
    Named(NamedTypeId),
    Unnamed(String),
}

// Runtime kind codes stored in `__code`.
const KIND_BOOL: u8 = 1;
const KIND_INT8: u8 = 3;
const KIND_UINT8: u8 = 8;
const KIND_FLOAT32: u8 = 13;
const KIND_FLOAT64: u8 = 14;
const KIND_ARRAY: u8 = 17;
const KIND_CHAN: u8 = 18;
const KIND_FUNC: u8 = 19;
const KIND_INTERFACE: u8 = 20;
const KIND_MAP: u8 = 21;
const KIND_PTR: u8 = 22;
const KIND_SLICE: u8 = 23;
const KIND_STRING: u8 = 24;
const KIND_STRUCT: u8 = 25;
const KIND_DOTDOTDOT: u8 = 27;

/// Runtime kind code of a structural type. Sized integers count up from
/// the 8-bit code of their signedness.
pub(crate) fn kind_code(kind: &TypeKind) -> u8 {
    match kind {
        TypeKind::Bool => KIND_BOOL,
        TypeKind::Int { bits, signed } => {
            let base = if *signed { KIND_INT8 } else { KIND_UINT8 };
            let step = match bits {
                0..=8 => 0,
                9..=16 => 1,
                17..=32 => 2,
                _ => 3,
            };
            base + step
        }
        TypeKind::Float { bits: 32 } => KIND_FLOAT32,
        TypeKind::Float { .. } => KIND_FLOAT64,
        TypeKind::String => KIND_STRING,
        TypeKind::Pointer(_) => KIND_PTR,
        TypeKind::Function(_) => KIND_FUNC,
        TypeKind::Struct(_) => KIND_STRUCT,
        TypeKind::Array { .. } => KIND_ARRAY,
        TypeKind::Slice(_) => KIND_SLICE,
        TypeKind::Map { .. } => KIND_MAP,
        TypeKind::Channel { .. } => KIND_CHAN,
        TypeKind::Interface(_) => KIND_INTERFACE,
        TypeKind::Varargs(_) => KIND_DOTDOTDOT,
        TypeKind::Error
        | TypeKind::Void
        | TypeKind::Nil
        | TypeKind::Named(_)
        | TypeKind::Forward(_) => 0,
    }
}

impl Session<'_> {
    /// Pointer to the common descriptor block; the type of every
    /// descriptor reference.
    pub(crate) fn descriptor_ptr_type(&mut self) -> TreeTypeId {
        let record = self.common_record();
        self.module.types.pointer(record)
    }

    /// Hash/equality family of `ty`, by structural class.
    pub(crate) fn hash_class(&self, ty: TypeId) -> HashClass {
        match self.types.underlying_kind(ty) {
            TypeKind::Bool
            | TypeKind::Int { .. }
            | TypeKind::Float { .. }
            | TypeKind::Pointer(_)
            | TypeKind::Function(_)
            | TypeKind::Channel { .. } => HashClass::Identity,
            TypeKind::String => HashClass::String,
            TypeKind::Interface(_) => HashClass::Interface,
            _ => HashClass::Error,
        }
    }

    /// Address of `ty`'s descriptor, as a pointer to the common block.
    pub(crate) fn type_descriptor(&mut self, ty: TypeId) -> TreeId {
        let Some(sym) = self.descriptor_symbol(ty) else {
            return TreeId::ERROR;
        };
        let decl = self.decl_ref(sym);
        let addr = self.addr_of(decl);
        let ptr = self.descriptor_ptr_type();
        self.convert(addr, ptr)
    }

    /// The descriptor symbol of `ty`, created on first request.
    ///
    /// Returns `None`, after reporting, for the error type.
    pub(crate) fn descriptor_symbol(&mut self, ty: TypeId) -> Option<SymbolId> {
        let named = self.types.named_id(ty);
        let key = match named {
            Some(id) => {
                if let Some(&sym) = self.caches.named_descriptors.get(&id) {
                    return Some(sym);
                }
                DescriptorKey::Named(id)
            }
            None => {
                let mangled = self.mangled_name(ty);
                if let Some(&sym) = self.caches.descriptors.get(&mangled) {
                    return Some(sym);
                }
                DescriptorKey::Unnamed(mangled)
            }
        };

        let kind = self.types.underlying_kind(ty).clone();
        let span = named.map_or(Span::DUMMY, |id| self.types.named_type(id).span);
        if matches!(kind, TypeKind::Error) && !self.types.is_undefined(ty) {
            self.error(
                ErrorCode::E9001,
                span,
                "type descriptor requested for an erroneous type",
            );
            return None;
        }
        let undefined = matches!(kind, TypeKind::Forward(_)) || self.types.is_undefined(ty);
        let link_name = match (&key, &kind) {
            (DescriptorKey::Named(id), _) => format!("__go_tdn_{}", self.qualified_type_name(*id)),
            (DescriptorKey::Unnamed(_), TypeKind::Forward(name)) => format!(
                "__go_tdn_{}.{}.{}",
                self.unique_prefix(),
                self.package_name(),
                self.str(*name)
            ),
            (DescriptorKey::Unnamed(mangled), _) => format!("__go_td_{mangled}"),
        };
        let placement = if undefined {
            Placement::External
        } else {
            self.placement(named)
        };
        let record = if undefined {
            self.common_record()
        } else {
            self.shape_record(&kind)
        };

        let mut symbol = Symbol::new(SymbolKind::Variable, link_name, record);
        symbol.span = span;
        symbol.linkage = Linkage {
            readonly: true,
            ..Linkage::EXTERNAL
        };
        let sym = self.add_symbol(symbol);
        match key {
            DescriptorKey::Named(id) => {
                self.caches.named_descriptors.insert(id, sym);
            }
            DescriptorKey::Unnamed(mangled) => {
                self.caches.descriptors.insert(mangled, sym);
            }
        }
        if placement == Placement::External {
            tracing::trace!(name = %self.symbol(sym).name, "referenced external type descriptor");
            return Some(sym);
        }

        let init = self.descriptor_init(ty, named, &kind, record);
        let symbol = self.symbol_mut(sym);
        symbol.initial = Some(init);
        symbol.linkage = match placement {
            Placement::Common => Linkage {
                public: true,
                is_static: true,
                one_only: true,
                readonly: true,
                ..Linkage::default()
            },
            Placement::Defined | Placement::External => Linkage {
                public: true,
                is_static: true,
                readonly: true,
                visibility: Visibility::Protected,
                ..Linkage::default()
            },
        };
        self.emit(sym);
        tracing::debug!(
            name = %self.symbol(sym).name,
            ?placement,
            "built type descriptor"
        );
        Some(sym)
    }

    fn placement(&self, named: Option<NamedTypeId>) -> Placement {
        match named.map(|id| self.types.named_type(id)) {
            None => Placement::Common,
            Some(named) if !named.is_local() => Placement::External,
            Some(named) if named.is_builtin => Placement::Common,
            Some(_) => Placement::Defined,
        }
    }
}

#[cfg(test)]
mod tests;
