//! Symbol table: the backend-visible declarations of a module.

use golow_ir::Span;
use rustc_hash::FxHashMap;

use crate::{TreeId, TreeTypeId};

#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, Debug)]
#[repr(transparent)]
pub struct SymbolId(u32);

impl SymbolId {
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum SymbolKind {
    Function,
    Variable,
    Parameter,
    /// Function return slot.
    Result,
    Constant,
    Type,
    Label,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum Visibility {
    #[default]
    Default,
    Protected,
    Hidden,
}

/// Linkage markers understood by the object emitter.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct Linkage {
    /// Visible to other object files.
    pub public: bool,
    /// Defined elsewhere; this module only references it.
    pub external: bool,
    /// Has static storage duration.
    pub is_static: bool,
    /// Link-once (comdat) definition merged across object files.
    pub one_only: bool,
    pub readonly: bool,
    /// Compiler-generated.
    pub artificial: bool,
    /// One instance per thread.
    pub thread_local: bool,
    pub visibility: Visibility,
}

impl Linkage {
    /// Reference to a definition in another object file.
    pub const EXTERNAL: Linkage = Linkage {
        public: true,
        external: true,
        is_static: false,
        one_only: false,
        readonly: false,
        artificial: false,
        thread_local: false,
        visibility: Visibility::Default,
    };
}

#[derive(Clone, Debug)]
pub struct Symbol {
    pub name: String,
    pub asm_name: Option<String>,
    pub kind: SymbolKind,
    pub ty: TreeTypeId,
    pub linkage: Linkage,
    /// Enclosing function for locals, parameters and labels.
    pub context: Option<SymbolId>,
    /// Initial value (variables, constants) or declaration initializer
    /// (locals).
    pub initial: Option<TreeId>,
    /// Function body.
    pub body: Option<TreeId>,
    pub params: Vec<SymbolId>,
    /// Parameter receiving the closure context, for function literals.
    pub static_chain: Option<SymbolId>,
    /// Return slot of a function.
    pub result: Option<SymbolId>,
    /// Address is taken somewhere.
    pub addressable: bool,
    pub span: Span,
}

impl Symbol {
    pub fn new(kind: SymbolKind, name: impl Into<String>, ty: TreeTypeId) -> Self {
        Symbol {
            name: name.into(),
            asm_name: None,
            kind,
            ty,
            linkage: Linkage::default(),
            context: None,
            initial: None,
            body: None,
            params: Vec::new(),
            static_chain: None,
            result: None,
            addressable: false,
            span: Span::DUMMY,
        }
    }

    /// Name the linker sees.
    pub fn link_name(&self) -> &str {
        self.asm_name.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    by_link_name: FxHashMap<String, SymbolId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Panics
    /// Panics if the table exceeds `u32::MAX` symbols.
    pub fn add(&mut self, symbol: Symbol) -> SymbolId {
        let Ok(raw) = u32::try_from(self.symbols.len()) else {
            panic!("symbol table exceeded {} entries", u32::MAX);
        };
        let id = SymbolId(raw);
        if symbol.context.is_none() {
            self.by_link_name
                .entry(symbol.link_name().to_owned())
                .or_insert(id);
        }
        self.symbols.push(symbol);
        id
    }

    /// # Panics
    /// Panics on an id not produced by this table.
    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    /// # Panics
    /// Panics on an id not produced by this table.
    pub fn get_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.index()]
    }

    /// Look up a top-level symbol by link name.
    pub fn lookup(&self, link_name: &str) -> Option<SymbolId> {
        self.by_link_name.get(link_name).copied()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> {
        self.symbols.iter().enumerate().map(|(i, s)| {
            #[expect(
                clippy::cast_possible_truncation,
                reason = "add bounds the table to u32::MAX symbols"
            )]
            let id = SymbolId(i as u32);
            (id, s)
        })
    }
}
