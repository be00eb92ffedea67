//! Compilation session: the state shared by every lowering component.
//!
//! # Design
//!
//! All memoization lives in [`Caches`], owned by one [`Session`] per
//! compilation unit and passed explicitly to every component. Caches hold
//! only stable handles ([`SymbolId`], [`TreeTypeId`]); derived access
//! expressions are rebuilt at every use because the output tree forbids
//! node sharing.
//!
//! The session keeps its own copy of the input type pool so lowering can
//! create the few types the front end never spelled out, such as the
//! pointer-to-named type whose descriptor a named type forces.

mod build;

use golow_diagnostic::{Diagnostic, DiagnosticQueue, ErrorCode};
use golow_ir::{DeclId, Ident, LabelId, NamedTypeId, Program, Span, TypeId, TypePool};
use golow_tree::{Linkage, Symbol, SymbolId, SymbolKind, Target, TreeId, TreeModule, TreeTypeId};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::config::LowerConfig;
use crate::runtime::RuntimeFn;

/// What a declaration materialized to.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub(crate) enum Materialized {
    /// Direct storage or a function/constant symbol.
    Symbol(SymbolId),
    /// Heap-relocated variable; the symbol holds the heap pointer and
    /// every use builds a fresh dereference.
    Heap(SymbolId),
    /// Lowering failed and was reported once.
    Error,
}

/// Memoization tables of a session.
#[derive(Default)]
pub(crate) struct Caches {
    pub decls: FxHashMap<DeclId, Materialized>,
    pub labels: FxHashMap<LabelId, SymbolId>,
    pub types: FxHashMap<TypeId, TreeTypeId>,
    pub named_records: FxHashMap<NamedTypeId, TreeTypeId>,
    /// Named non-struct types currently being lowered.
    pub lowering_named: FxHashSet<NamedTypeId>,
    pub builtin_records: FxHashMap<&'static str, TreeTypeId>,
    pub slice_records: FxHashMap<TreeTypeId, TreeTypeId>,
    /// Unnamed type descriptors, keyed by mangled name.
    pub descriptors: FxHashMap<String, SymbolId>,
    pub named_descriptors: FxHashMap<NamedTypeId, SymbolId>,
    /// Ambiguous methods already reported, by type and method name.
    pub ambiguous_reported: FxHashSet<(NamedTypeId, Ident)>,
    /// Pointer-to-named types created by the session.
    pub pointers_to_named: FxHashMap<NamedTypeId, TypeId>,
    /// Interface method tables, keyed by symbol name.
    pub itables: FxHashMap<String, SymbolId>,
    pub map_descriptors: FxHashMap<String, SymbolId>,
    pub runtime: FxHashMap<RuntimeFn, SymbolId>,
    /// Static `string` variables holding literal text, for `*string`
    /// descriptor fields.
    pub strings: FxHashMap<String, SymbolId>,
}

/// One compilation unit's lowering state.
pub struct Session<'p> {
    pub(crate) program: &'p Program,
    pub(crate) config: LowerConfig,
    /// Program types plus the ones lowering synthesized.
    pub(crate) types: TypePool,
    pub(crate) module: TreeModule,
    pub(crate) diagnostics: DiagnosticQueue,
    pub(crate) caches: Caches,
    package_name: String,
    unique_prefix: String,
    init_counter: u32,
    temp_counter: u32,
}

impl<'p> Session<'p> {
    pub fn new(program: &'p Program, config: LowerConfig) -> Self {
        let package_name = config
            .package_name
            .clone()
            .unwrap_or_else(|| program.str(program.package_name).to_owned());
        let unique_prefix = config
            .unique_prefix
            .clone()
            .unwrap_or_else(|| program.str(program.unique_prefix).to_owned());
        let unique_prefix = if unique_prefix.is_empty() {
            "go".to_owned()
        } else {
            unique_prefix
        };
        Session {
            program,
            config,
            types: program.types.clone(),
            module: TreeModule::new(),
            diagnostics: DiagnosticQueue::new(),
            caches: Caches::default(),
            package_name,
            unique_prefix,
            init_counter: 0,
            temp_counter: 0,
        }
    }

    pub fn module(&self) -> &TreeModule {
        &self.module
    }

    pub fn diagnostics(&self) -> &DiagnosticQueue {
        &self.diagnostics
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.error_count()
    }

    pub(crate) fn into_parts(self) -> (TreeModule, DiagnosticQueue) {
        (self.module, self.diagnostics)
    }

    #[inline]
    pub(crate) fn target(&self) -> Target {
        self.config.target.layout_target()
    }

    #[inline]
    pub(crate) fn uintptr(&self) -> TreeTypeId {
        self.target().uintptr()
    }

    #[inline]
    pub(crate) fn str(&self, name: golow_ir::Name) -> &'static str {
        self.program.str(name)
    }

    pub(crate) fn package_name(&self) -> &str {
        &self.package_name
    }

    pub(crate) fn unique_prefix(&self) -> &str {
        &self.unique_prefix
    }

    /// `(unique_prefix, package)` of a declaration's owning package.
    pub(crate) fn package_strings(&self, package: Option<golow_ir::PackageId>) -> (String, String) {
        match package {
            None => (self.unique_prefix.clone(), self.package_name.clone()),
            Some(id) => {
                let pkg = self.program.package(id);
                (
                    self.str(pkg.unique_prefix).to_owned(),
                    self.str(pkg.name).to_owned(),
                )
            }
        }
    }

    pub(crate) fn is_entry_package(&self) -> bool {
        self.package_name == self.config.entry_package
    }

    /// Next suffix for a same-package `init` function, starting at 1.
    pub(crate) fn next_init_index(&mut self) -> u32 {
        self.init_counter += 1;
        self.init_counter
    }

    // ── Diagnostics ─────────────────────────────────────────────

    /// Report an error and return the error sentinel.
    pub(crate) fn error(
        &mut self,
        code: ErrorCode,
        span: Span,
        message: impl Into<String>,
    ) -> TreeId {
        let message = message.into();
        tracing::debug!(code = %code, %message, "lowering error");
        self.diagnostics.emit_error(
            Diagnostic::error(code)
                .with_message(message)
                .with_label(span, code.summary()),
        );
        TreeId::ERROR
    }

    pub(crate) fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.add(diagnostic);
    }

    // ── Symbols ─────────────────────────────────────────────────

    pub(crate) fn add_symbol(&mut self, symbol: Symbol) -> SymbolId {
        self.module.symbols.add(symbol)
    }

    #[inline]
    pub(crate) fn symbol(&self, sym: SymbolId) -> &Symbol {
        self.module.symbols.get(sym)
    }

    #[inline]
    pub(crate) fn symbol_mut(&mut self, sym: SymbolId) -> &mut Symbol {
        self.module.symbols.get_mut(sym)
    }

    /// Queue a definition for emission.
    pub(crate) fn emit(&mut self, sym: SymbolId) {
        self.module.globals.push(sym);
    }

    /// A compiler temporary local to `context`, optionally initialized
    /// at its declaration point.
    pub(crate) fn temp(
        &mut self,
        context: Option<SymbolId>,
        hint: &str,
        ty: TreeTypeId,
        init: Option<TreeId>,
    ) -> SymbolId {
        self.temp_counter += 1;
        let mut symbol = Symbol::new(
            SymbolKind::Variable,
            format!("{hint}.{}", self.temp_counter),
            ty,
        );
        symbol.context = context;
        symbol.initial = init;
        symbol.linkage.artificial = true;
        self.add_symbol(symbol)
    }

    /// Static, internal, read-only artificial variable holding `init`.
    /// Used for constant arrays and records referenced from descriptors.
    pub(crate) fn static_constant(&mut self, hint: &str, ty: TreeTypeId, init: TreeId) -> SymbolId {
        self.temp_counter += 1;
        let mut symbol = Symbol::new(
            SymbolKind::Variable,
            format!("{hint}.{}", self.temp_counter),
            ty,
        );
        symbol.initial = Some(init);
        symbol.linkage = Linkage {
            is_static: true,
            readonly: true,
            artificial: true,
            ..Linkage::default()
        };
        let sym = self.add_symbol(symbol);
        self.emit(sym);
        sym
    }
}
