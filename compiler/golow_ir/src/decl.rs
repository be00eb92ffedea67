//! Named declarations and packages.

use bitflags::bitflags;

use crate::{Block, ExprId, Ident, Name, Span, TypeId};

/// Index into [`Program::decls`](crate::Program).
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, Debug)]
#[repr(transparent)]
pub struct DeclId(u32);

impl DeclId {
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        DeclId(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index into [`Program::packages`](crate::Program).
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, Debug)]
#[repr(transparent)]
pub struct PackageId(u32);

impl PackageId {
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        PackageId(raw)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// An imported package.
#[derive(Clone, Debug)]
pub struct Package {
    pub name: Name,
    pub unique_prefix: Name,
}

/// Initialization entry point of an imported package. The entry package
/// runs these in ascending priority before its own initializers.
#[derive(Clone, Copy, Debug)]
pub struct ImportInit {
    pub init_name: Name,
    pub priority: u32,
}

bitflags! {
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct VarFlags: u8 {
        const GLOBAL = 1 << 0;
        const PARAMETER = 1 << 1;
        const RECEIVER = 1 << 2;
        /// Address escapes; storage lives on the heap.
        const IN_HEAP = 1 << 3;
        /// Closure context parameter of a function literal.
        const CLOSURE = 1 << 4;
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct Variable {
    pub ty: TypeId,
    pub flags: VarFlags,
    pub init: Option<ExprId>,
    /// Statements run before `init` is evaluated.
    pub preinit: Option<Block>,
}

impl Variable {
    pub fn new(ty: TypeId, flags: VarFlags) -> Self {
        Variable {
            ty,
            flags,
            init: None,
            preinit: None,
        }
    }

    #[inline]
    pub fn is_global(&self) -> bool {
        self.flags.contains(VarFlags::GLOBAL)
    }

    #[inline]
    pub fn is_parameter(&self) -> bool {
        self.flags.contains(VarFlags::PARAMETER)
    }

    #[inline]
    pub fn is_receiver(&self) -> bool {
        self.flags.contains(VarFlags::RECEIVER)
    }

    #[inline]
    pub fn is_in_heap(&self) -> bool {
        self.flags.contains(VarFlags::IN_HEAP)
    }

    #[inline]
    pub fn is_closure(&self) -> bool {
        self.flags.contains(VarFlags::CLOSURE)
    }
}

/// Classification of a refcount queue slot.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum RefcountKind {
    /// Decrement a freshly allocated value.
    DecrementNew,
    /// Decrement a computed temporary.
    DecrementComputed,
    /// Decrement an overwritten value.
    DecrementOld,
    /// Increment a copied value.
    IncrementCopied,
}

/// One refcount queue slot recorded for a function body.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct RefcountEntry {
    pub kind: RefcountKind,
    pub ty: TypeId,
}

/// A function with a body in this package.
#[derive(Clone, PartialEq, Debug)]
pub struct Function {
    /// Signature, including the receiver type for methods.
    pub ty: TypeId,
    pub receiver: Option<DeclId>,
    pub params: Vec<DeclId>,
    /// Named result variables, one per result.
    pub results: Vec<DeclId>,
    /// Closure context variable of a function literal.
    pub closure: Option<DeclId>,
    /// Function this one is nested in.
    pub enclosing: Option<DeclId>,
    pub body: Option<Block>,
    pub refcounts: Vec<RefcountEntry>,
}

impl Function {
    pub fn new(ty: TypeId) -> Self {
        Function {
            ty,
            receiver: None,
            params: Vec::new(),
            results: Vec::new(),
            closure: None,
            enclosing: None,
            body: None,
            refcounts: Vec::new(),
        }
    }

    pub fn is_method(&self) -> bool {
        self.receiver.is_some()
    }
}

/// A function defined elsewhere (imported, or a body-less declaration).
#[derive(Clone, PartialEq, Debug)]
pub struct FunctionDecl {
    pub ty: TypeId,
    /// Explicit assembler name overriding the derived one.
    pub asm_name: Option<Name>,
}

#[derive(Clone, PartialEq, Debug)]
pub enum DeclKind {
    Const {
        value: ExprId,
        /// Untyped constant; folded at use sites and never materialized.
        is_abstract: bool,
    },
    /// A defined named type.
    Type(TypeId),
    /// A type that was declared but never defined.
    TypeDeclaration,
    Var(Variable),
    /// A named result of `function`, at position `index`.
    ResultVar {
        function: DeclId,
        index: u32,
        ty: TypeId,
    },
    Function(Function),
    FunctionDeclaration(FunctionDecl),
    /// The blank identifier; package-level `var _ = init` carries the
    /// initializer, evaluated only for its side effects.
    Sink {
        init: Option<ExprId>,
    },
    Package(PackageId),
}

#[derive(Clone, PartialEq, Debug)]
pub struct Decl {
    pub ident: Ident,
    /// Owning package; `None` for the package being compiled.
    pub package: Option<PackageId>,
    pub span: Span,
    pub kind: DeclKind,
}

impl Decl {
    pub fn is_local_package(&self) -> bool {
        self.package.is_none()
    }

    pub fn as_var(&self) -> Option<&Variable> {
        match &self.kind {
            DeclKind::Var(var) => Some(var),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Function> {
        match &self.kind {
            DeclKind::Function(func) => Some(func),
            _ => None,
        }
    }
}
