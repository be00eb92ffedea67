//! Type pool for the checked program model.
//!
//! Types are stored in a flat [`TypePool`] and referenced by [`TypeId`].
//! The pool does not hash-cons: two structurally identical unnamed types
//! may have different ids, exactly as they would after type checking.
//! Structural identity is recovered by the lowering stage through mangled
//! names.
//!
//! Named types live in a side table ([`NamedType`]) so their underlying
//! type can be filled in after creation, which is how recursive types such
//! as `type List struct { next *List }` are built.

use bitflags::bitflags;

use crate::{DeclId, Ident, Name, PackageId, Span};

/// Index into the [`TypePool`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, Debug)]
#[repr(transparent)]
pub struct TypeId(u32);

impl TypeId {
    pub const ERROR: TypeId = TypeId(0);
    pub const VOID: TypeId = TypeId(1);
    pub const NIL: TypeId = TypeId(2);
    pub const BOOL: TypeId = TypeId(3);
    /// `int`: 64-bit signed.
    pub const INT: TypeId = TypeId(4);
    pub const INT32: TypeId = TypeId(5);
    pub const UINT8: TypeId = TypeId(6);
    pub const UINT64: TypeId = TypeId(7);
    pub const FLOAT64: TypeId = TypeId(8);
    pub const STRING: TypeId = TypeId(9);

    const PRIMITIVE_COUNT: u32 = 10;

    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        TypeId(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn is_error(self) -> bool {
        self.0 == Self::ERROR.0
    }
}

/// Index into the pool's named-type table.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, Debug)]
#[repr(transparent)]
pub struct NamedTypeId(u32);

impl NamedTypeId {
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

bitflags! {
    /// Channel direction. Bit values are part of the descriptor ABI.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
    pub struct ChanDir: u8 {
        const RECV = 1;
        const SEND = 2;
        const BOTH = Self::RECV.bits() | Self::SEND.bits();
    }
}

/// Signature of a function or method type.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct FuncType {
    /// Declared receiver type for method signatures.
    pub receiver: Option<TypeId>,
    pub params: Vec<TypeId>,
    pub results: Vec<TypeId>,
}

/// A struct field. `name` is `None` for embedded (anonymous) fields.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Field {
    pub name: Option<Ident>,
    pub ty: TypeId,
    pub tag: Option<Name>,
}

/// A method named in an interface type, in declaration order.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct InterfaceMethod {
    pub name: Ident,
    /// Function type without receiver.
    pub ty: TypeId,
}

/// A method attached to a named type.
///
/// Promoted methods reached through embedded fields are listed here as
/// well; a promotion conflict marks the entry `ambiguous`.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Method {
    pub name: Ident,
    /// The implementing `Function` or `FunctionDeclaration`.
    pub func: DeclId,
    /// Function type without receiver.
    pub ty: TypeId,
    /// Callable on a value of the named type (not only through a pointer).
    pub value_receiver: bool,
    pub ambiguous: bool,
}

/// Structural shape of a type.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum TypeKind {
    Error,
    Void,
    Nil,
    Bool,
    Int { bits: u8, signed: bool },
    Float { bits: u8 },
    String,
    Pointer(TypeId),
    Function(FuncType),
    Struct(Vec<Field>),
    Array { elem: TypeId, len: u64 },
    Slice(TypeId),
    Map { key: TypeId, value: TypeId },
    Channel { elem: TypeId, dir: ChanDir },
    Interface(Vec<InterfaceMethod>),
    /// Trailing `...` parameter; `None` for an untyped variadic.
    Varargs(Option<TypeId>),
    Named(NamedTypeId),
    /// A type that was declared but never defined.
    Forward(Name),
}

/// A declared type name and the methods attached to it.
#[derive(Clone, Debug)]
pub struct NamedType {
    pub ident: Ident,
    /// Owning package; `None` for the package being compiled.
    pub package: Option<PackageId>,
    /// Function the type is declared in, for function-local types.
    pub in_function: Option<Name>,
    /// Predeclared type such as `int` or `error`.
    pub is_builtin: bool,
    pub underlying: TypeId,
    pub methods: Vec<Method>,
    pub span: Span,
}

impl NamedType {
    /// Look up a method by name, skipping ambiguous promotions.
    pub fn method(&self, name: Ident) -> Option<&Method> {
        self.methods
            .iter()
            .find(|m| m.name == name && !m.ambiguous)
    }

    pub fn is_local(&self) -> bool {
        self.package.is_none()
    }
}

/// Arena of all types in a program.
#[derive(Clone, Debug)]
pub struct TypePool {
    kinds: Vec<TypeKind>,
    named: Vec<NamedType>,
}

impl Default for TypePool {
    fn default() -> Self {
        Self::new()
    }
}

impl TypePool {
    /// Create a pool with the primitive types pre-registered at their
    /// [`TypeId`] constants.
    pub fn new() -> Self {
        let kinds = vec![
            TypeKind::Error,
            TypeKind::Void,
            TypeKind::Nil,
            TypeKind::Bool,
            TypeKind::Int {
                bits: 64,
                signed: true,
            },
            TypeKind::Int {
                bits: 32,
                signed: true,
            },
            TypeKind::Int {
                bits: 8,
                signed: false,
            },
            TypeKind::Int {
                bits: 64,
                signed: false,
            },
            TypeKind::Float { bits: 64 },
            TypeKind::String,
        ];
        debug_assert_eq!(kinds.len(), TypeId::PRIMITIVE_COUNT as usize);
        TypePool {
            kinds,
            named: Vec::new(),
        }
    }

    /// Add a type. Every call creates a distinct id.
    ///
    /// # Panics
    /// Panics if the pool exceeds `u32::MAX` types.
    pub fn add(&mut self, kind: TypeKind) -> TypeId {
        let Ok(raw) = u32::try_from(self.kinds.len()) else {
            panic!("type pool exceeded {} entries", u32::MAX);
        };
        self.kinds.push(kind);
        TypeId(raw)
    }

    pub fn int(&mut self, bits: u8, signed: bool) -> TypeId {
        self.add(TypeKind::Int { bits, signed })
    }

    pub fn float(&mut self, bits: u8) -> TypeId {
        self.add(TypeKind::Float { bits })
    }

    pub fn pointer(&mut self, to: TypeId) -> TypeId {
        self.add(TypeKind::Pointer(to))
    }

    pub fn slice(&mut self, elem: TypeId) -> TypeId {
        self.add(TypeKind::Slice(elem))
    }

    pub fn array(&mut self, elem: TypeId, len: u64) -> TypeId {
        self.add(TypeKind::Array { elem, len })
    }

    pub fn map(&mut self, key: TypeId, value: TypeId) -> TypeId {
        self.add(TypeKind::Map { key, value })
    }

    pub fn channel(&mut self, elem: TypeId, dir: ChanDir) -> TypeId {
        self.add(TypeKind::Channel { elem, dir })
    }

    pub fn function(&mut self, params: Vec<TypeId>, results: Vec<TypeId>) -> TypeId {
        self.add(TypeKind::Function(FuncType {
            receiver: None,
            params,
            results,
        }))
    }

    pub fn method_signature(
        &mut self,
        receiver: TypeId,
        params: Vec<TypeId>,
        results: Vec<TypeId>,
    ) -> TypeId {
        self.add(TypeKind::Function(FuncType {
            receiver: Some(receiver),
            params,
            results,
        }))
    }

    pub fn structure(&mut self, fields: Vec<Field>) -> TypeId {
        self.add(TypeKind::Struct(fields))
    }

    pub fn interface(&mut self, methods: Vec<InterfaceMethod>) -> TypeId {
        self.add(TypeKind::Interface(methods))
    }

    pub fn varargs(&mut self, elem: Option<TypeId>) -> TypeId {
        self.add(TypeKind::Varargs(elem))
    }

    pub fn forward(&mut self, name: Name) -> TypeId {
        self.add(TypeKind::Forward(name))
    }

    /// Declare a named type. The underlying type may be set later with
    /// [`set_underlying`](Self::set_underlying).
    pub fn named(&mut self, named: NamedType) -> (NamedTypeId, TypeId) {
        let Ok(raw) = u32::try_from(self.named.len()) else {
            panic!("named type table exceeded {} entries", u32::MAX);
        };
        let id = NamedTypeId(raw);
        self.named.push(named);
        (id, self.add(TypeKind::Named(id)))
    }

    pub fn set_underlying(&mut self, id: NamedTypeId, underlying: TypeId) {
        if let Some(named) = self.named.get_mut(id.index()) {
            named.underlying = underlying;
        }
    }

    pub fn add_method(&mut self, id: NamedTypeId, method: Method) {
        if let Some(named) = self.named.get_mut(id.index()) {
            named.methods.push(method);
        }
    }

    /// Shape of `ty`. Out-of-range ids read as [`TypeKind::Error`].
    pub fn kind(&self, ty: TypeId) -> &TypeKind {
        self.kinds.get(ty.index()).unwrap_or(&TypeKind::Error)
    }

    /// # Panics
    /// Panics on an id not produced by this pool.
    pub fn named_type(&self, id: NamedTypeId) -> &NamedType {
        &self.named[id.index()]
    }

    pub fn named_id(&self, ty: TypeId) -> Option<NamedTypeId> {
        match self.kind(ty) {
            TypeKind::Named(id) => Some(*id),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Follow named types to their structural definition.
    ///
    /// A chain of names that loops back on itself resolves to
    /// [`TypeId::ERROR`].
    pub fn underlying(&self, ty: TypeId) -> TypeId {
        let mut current = ty;
        for _ in 0..=self.named.len() {
            match self.kind(current) {
                TypeKind::Named(id) => current = self.named_type(*id).underlying,
                _ => return current,
            }
        }
        TypeId::ERROR
    }

    pub fn underlying_kind(&self, ty: TypeId) -> &TypeKind {
        self.kind(self.underlying(ty))
    }

    /// Pointee of a pointer type, looking through names.
    pub fn points_to(&self, ty: TypeId) -> Option<TypeId> {
        match self.underlying_kind(ty) {
            TypeKind::Pointer(to) => Some(*to),
            _ => None,
        }
    }

    /// Named type a pointer type points at, for `*T` with `T` named.
    pub fn pointee_named(&self, ty: TypeId) -> Option<NamedTypeId> {
        match self.kind(ty) {
            TypeKind::Pointer(to) => self.named_id(*to),
            _ => None,
        }
    }

    pub fn func_type(&self, ty: TypeId) -> Option<&FuncType> {
        match self.underlying_kind(ty) {
            TypeKind::Function(sig) => Some(sig),
            _ => None,
        }
    }

    pub fn interface_methods(&self, ty: TypeId) -> Option<&[InterfaceMethod]> {
        match self.underlying_kind(ty) {
            TypeKind::Interface(methods) => Some(methods),
            _ => None,
        }
    }

    /// Element type of a channel.
    pub fn channel_elem(&self, ty: TypeId) -> Option<TypeId> {
        match self.underlying_kind(ty) {
            TypeKind::Channel { elem, .. } => Some(*elem),
            _ => None,
        }
    }

    /// Whether the type or anything it names is a [`TypeKind::Forward`]
    /// reference that was never defined. Pointers are not followed: a
    /// pointer to an undefined type is itself well formed.
    pub fn is_undefined(&self, ty: TypeId) -> bool {
        matches!(self.underlying_kind(ty), TypeKind::Forward(_))
            || (self.named_id(ty).is_some() && self.underlying(ty).is_error())
    }
}

#[cfg(test)]
mod tests;
