//! Declaration materializer: one backend symbol per declaration.
//!
//! [`Session::symbol_for`] is the single entry point every component uses
//! to turn a [`DeclId`] into a tree. The first request builds the symbol and
//! caches it; later requests return the cached symbol's shared reference
//! leaf.
//!
//! # Heap variables
//!
//! A variable whose address escapes lives on the heap. The cache holds the
//! symbol of the heap *pointer*; every use builds a fresh dereference of
//! it, because the tree forbids sharing the `Indirect` node.
//!
//! # Functions
//!
//! Materializing a function with a body lowers the body right away. The
//! symbol is cached before the body is lowered, so recursive and mutually
//! recursive functions terminate.

use golow_diagnostic::ErrorCode;
use golow_ir::{DeclId, DeclKind, Function, FunctionDecl, LabelId, TypeKind, Variable};
use golow_tree::{Linkage, Symbol, SymbolId, SymbolKind, TreeId, TreeTypeId};

use crate::session::{Materialized, Session};

impl Session<'_> {
    /// Tree referring to `decl`, as seen from inside `enclosing`.
    ///
    /// `enclosing` is the function symbol whose body is being lowered; it
    /// becomes the context of local variables. Returns the error sentinel
    /// when the declaration cannot be materialized; the failure is
    /// reported once.
    pub fn symbol_for(&mut self, decl: DeclId, enclosing: Option<SymbolId>) -> TreeId {
        let program = self.program;
        let d = program.decl(decl);
        match &d.kind {
            DeclKind::Const {
                value,
                is_abstract: true,
            } => {
                return match self.constant_value(*value) {
                    Some(tree) => tree,
                    None => self.error(
                        ErrorCode::E3005,
                        d.span,
                        format!(
                            "constant `{}` is not a constant expression",
                            self.str(d.ident.name)
                        ),
                    ),
                };
            }
            DeclKind::ResultVar {
                function, index, ..
            } => return self.result_var(*function, *index, d.span),
            _ => {}
        }
        match self.materialize(decl, enclosing) {
            Materialized::Symbol(sym) => self.decl_ref(sym),
            Materialized::Heap(ptr) => {
                let ptr = self.decl_ref(ptr);
                self.indirect(ptr)
            }
            Materialized::Error => TreeId::ERROR,
        }
    }

    /// Cached materialization of `decl`.
    pub(crate) fn materialize(
        &mut self,
        decl: DeclId,
        enclosing: Option<SymbolId>,
    ) -> Materialized {
        if let Some(&done) = self.caches.decls.get(&decl) {
            return done;
        }
        let program = self.program;
        let d = program.decl(decl);
        let result = match &d.kind {
            DeclKind::Const { value, .. } => self.materialize_const(decl, *value),
            DeclKind::Type(ty) => self.materialize_type(decl, *ty),
            DeclKind::TypeDeclaration => {
                let name = self.decl_name(decl);
                self.error(
                    ErrorCode::E3001,
                    d.span,
                    format!("reference to undefined type `{name}`"),
                );
                Materialized::Error
            }
            DeclKind::Var(var) => self.materialize_var(decl, var, enclosing),
            DeclKind::ResultVar { function, .. } => match self.materialize(*function, None) {
                Materialized::Symbol(func) => match self.symbol(func).result {
                    Some(slot) => Materialized::Symbol(slot),
                    None => {
                        self.error(ErrorCode::E9001, d.span, "result variable of a void function");
                        Materialized::Error
                    }
                },
                _ => Materialized::Error,
            },
            // Functions cache themselves before lowering their bodies.
            DeclKind::Function(func) => return self.materialize_function(decl, func),
            DeclKind::FunctionDeclaration(fd) => self.materialize_function_decl(decl, fd),
            DeclKind::Sink { .. } | DeclKind::Package(_) => {
                self.error(
                    ErrorCode::E3005,
                    d.span,
                    format!("`{}` is not a value", self.str(d.ident.name)),
                );
                Materialized::Error
            }
        };
        self.caches.decls.insert(decl, result);
        result
    }

    /// Unmangled declaration name.
    ///
    /// Locals and builtin types use the bare identifier; package-level
    /// declarations are `package.name`, with `.` and the receiver's mangled
    /// name appended for methods. Function-local types get `$function`.
    pub(crate) fn decl_name(&self, decl: DeclId) -> String {
        let d = self.program.decl(decl);
        let name = self.str(d.ident.name);
        match &d.kind {
            DeclKind::FunctionDeclaration(FunctionDecl {
                asm_name: Some(asm),
                ..
            }) => return self.str(*asm).to_owned(),
            DeclKind::Var(var) if !var.is_global() => return name.to_owned(),
            DeclKind::Type(ty) => {
                if let Some(id) = self.types.named_id(*ty) {
                    let named = self.types.named_type(id);
                    if named.is_builtin {
                        return name.to_owned();
                    }
                    let mut out = self.qualify(d.package, name);
                    if let Some(function) = named.in_function {
                        out.push('$');
                        out.push_str(self.str(function));
                    }
                    return out;
                }
            }
            _ => {}
        }
        let mut out = self.qualify(d.package, name);
        let fn_ty = match &d.kind {
            DeclKind::Function(func) => Some(func.ty),
            DeclKind::FunctionDeclaration(fd) => Some(fd.ty),
            _ => None,
        };
        if let Some(receiver) = fn_ty
            .and_then(|ty| self.types.func_type(ty))
            .and_then(|sig| sig.receiver)
        {
            out.push('.');
            out.push_str(&self.mangled_name(receiver));
        }
        out
    }

    fn qualify(&self, package: Option<golow_ir::PackageId>, name: &str) -> String {
        let package = match package {
            None => self.package_name(),
            Some(id) => self.str(self.program.package(id).name),
        };
        format!("{package}.{name}")
    }

    /// `<unique_prefix>.<id>` for a declaration owned by `package`.
    fn asm_name(&self, package: Option<golow_ir::PackageId>, id: &str) -> String {
        let (prefix, _) = self.package_strings(package);
        format!("{prefix}.{id}")
    }

    // ── Constants and types ─────────────────────────────────────

    fn materialize_const(&mut self, decl: DeclId, value: golow_ir::ExprId) -> Materialized {
        let d = self.program.decl(decl);
        let Some(init) = self.constant_value(value) else {
            self.error(
                ErrorCode::E3005,
                d.span,
                format!("constant `{}` is not a constant expression", self.str(d.ident.name)),
            );
            return Materialized::Error;
        };
        let ty = self.lower_type(self.program.expr(value).ty);
        if ty.is_error() {
            return Materialized::Error;
        }
        let init = self.convert(init, ty);
        let name = self.decl_name(decl);
        let mut symbol = Symbol::new(SymbolKind::Constant, name, ty);
        symbol.initial = Some(init);
        symbol.span = d.span;
        symbol.linkage = if d.is_local_package() {
            Linkage {
                is_static: true,
                readonly: true,
                ..Linkage::default()
            }
        } else {
            Linkage {
                readonly: true,
                ..Linkage::EXTERNAL
            }
        };
        let sym = self.add_symbol(symbol);
        if d.is_local_package() {
            self.emit(sym);
        }
        tracing::trace!(name = %self.symbol(sym).name, "materialized constant");
        Materialized::Symbol(sym)
    }

    fn materialize_type(&mut self, decl: DeclId, ty: golow_ir::TypeId) -> Materialized {
        let d = self.program.decl(decl);
        if self.types.is_undefined(ty) {
            let name = self.decl_name(decl);
            self.error(
                ErrorCode::E3001,
                d.span,
                format!("reference to undefined type `{name}`"),
            );
            return Materialized::Error;
        }
        let lowered = self.lower_type(ty);
        if lowered.is_error() {
            return Materialized::Error;
        }
        let mut symbol = Symbol::new(SymbolKind::Type, self.decl_name(decl), lowered);
        symbol.span = d.span;
        let sym = self.add_symbol(symbol);
        if d.is_local_package() {
            self.emit(sym);
            // Other packages may ask for `T` or `*T` at run time, even
            // when `T` is hidden.
            if let Some(id) = self.types.named_id(ty) {
                self.descriptor_symbol(ty);
                let ptr = self.pointer_to_named(id, ty);
                self.descriptor_symbol(ptr);
            }
        }
        Materialized::Symbol(sym)
    }

    // ── Variables ───────────────────────────────────────────────

    fn materialize_var(
        &mut self,
        decl: DeclId,
        var: &Variable,
        enclosing: Option<SymbolId>,
    ) -> Materialized {
        let d = self.program.decl(decl);
        let name = self.decl_name(decl);
        if matches!(self.types.kind(var.ty), TypeKind::Error) {
            self.error(
                ErrorCode::E3005,
                d.span,
                format!("variable `{name}` has an erroneous type"),
            );
            return Materialized::Error;
        }
        if self.types.is_undefined(var.ty) && (!var.is_global() || d.is_local_package()) {
            self.error(
                ErrorCode::E3001,
                d.span,
                format!("variable `{name}` has undefined type"),
            );
            return Materialized::Error;
        }
        let mut ty = self.lower_type(var.ty);
        if ty.is_error() {
            return Materialized::Error;
        }
        // A value receiver arrives as a pointer parameter and is copied
        // into a local, so the declared variable itself is not the
        // parameter.
        let mut kind = if var.is_parameter()
            && !(var.is_receiver() && self.types.points_to(var.ty).is_none())
        {
            SymbolKind::Parameter
        } else {
            SymbolKind::Variable
        };
        if var.is_in_heap() {
            kind = SymbolKind::Variable;
            ty = self.module.types.pointer(ty);
        }

        let mut symbol = Symbol::new(kind, name, ty);
        symbol.span = d.span;
        if var.is_global() {
            let exported = !d.ident.is_hidden();
            symbol.linkage = if d.is_local_package() {
                Linkage {
                    is_static: true,
                    public: exported,
                    ..Linkage::default()
                }
            } else {
                Linkage::EXTERNAL
            };
            if exported {
                symbol.asm_name = Some(self.asm_name(d.package, &symbol.name));
            }
        } else {
            let Some(function) = enclosing else {
                self.error(
                    ErrorCode::E9001,
                    d.span,
                    format!("local variable `{}` outside a function", symbol.name),
                );
                return Materialized::Error;
            };
            symbol.context = Some(function);
        }
        let sym = self.add_symbol(symbol);
        tracing::trace!(
            name = %self.symbol(sym).name,
            heap = var.is_in_heap(),
            global = var.is_global(),
            "materialized variable"
        );
        if var.is_in_heap() {
            Materialized::Heap(sym)
        } else {
            Materialized::Symbol(sym)
        }
    }

    /// A named result: the return slot itself for a single result, a
    /// fresh field of the result record otherwise.
    fn result_var(&mut self, function: DeclId, index: u32, span: golow_ir::Span) -> TreeId {
        let slot = match self.materialize(function, None) {
            Materialized::Symbol(func) => self.symbol(func).result,
            _ => return TreeId::ERROR,
        };
        let Some(slot) = slot else {
            return self.error(ErrorCode::E9001, span, "result variable of a void function");
        };
        let results = self
            .program
            .decl(function)
            .as_function()
            .and_then(|f| self.types.func_type(f.ty))
            .map_or(0, |sig| sig.results.len());
        let slot = self.decl_ref(slot);
        if results == 1 {
            slot
        } else {
            self.field_at(slot, index)
        }
    }

    // ── Functions ───────────────────────────────────────────────

    fn materialize_function(&mut self, decl: DeclId, func: &Function) -> Materialized {
        let d = self.program.decl(decl);
        let raw_name = self.str(d.ident.name);
        let is_init = !func.is_method() && d.is_local_package() && raw_name == "init";
        let name = if is_init {
            let package = self.package_name().to_owned();
            format!("{}.init.{}", package, self.next_init_index())
        } else {
            self.decl_name(decl)
        };
        let ty = self.lower_function_type(func.ty);
        if ty.is_error() {
            self.caches.decls.insert(decl, Materialized::Error);
            return Materialized::Error;
        }

        let mut symbol = Symbol::new(SymbolKind::Function, name, ty);
        symbol.span = d.span;
        // Nested and init functions stay internal.
        if func.enclosing.is_none() && !is_init {
            if raw_name == "main" && self.package_name() == "main" {
                symbol.linkage.public = true;
            } else if !d.ident.is_hidden() || func.is_method() {
                // Hidden methods stay public: promotion through an
                // embedded field can pull them into another package's
                // descriptors.
                symbol.linkage.public = true;
                symbol.asm_name = Some(self.asm_name(None, &symbol.name));
            }
        }
        if func.body.is_none() {
            symbol.linkage.external = true;
        }
        let sym = self.add_symbol(symbol);
        self.caches.decls.insert(decl, Materialized::Symbol(sym));

        let result_ty = match self.module.types.get(ty) {
            golow_tree::TreeType::Function { result, .. } => *result,
            _ => TreeTypeId::VOID,
        };
        if result_ty != TreeTypeId::VOID {
            let mut slot = Symbol::new(SymbolKind::Result, "RETURN", result_ty);
            slot.context = Some(sym);
            slot.linkage.artificial = true;
            let slot = self.add_symbol(slot);
            self.symbol_mut(sym).result = Some(slot);
        }
        if let Some(closure) = func.closure {
            self.bind_static_chain(sym, closure);
        }
        tracing::debug!(
            name = %self.symbol(sym).link_name(),
            public = self.symbol(sym).linkage.public,
            "materialized function"
        );

        if func.body.is_some() {
            self.lower_function(decl, sym);
            self.emit(sym);
        }
        Materialized::Symbol(sym)
    }

    fn materialize_function_decl(&mut self, decl: DeclId, fd: &FunctionDecl) -> Materialized {
        let d = self.program.decl(decl);
        let ty = self.lower_function_type(fd.ty);
        if ty.is_error() {
            return Materialized::Error;
        }
        let name = self.decl_name(decl);
        let mut symbol = Symbol::new(SymbolKind::Function, name, ty);
        symbol.span = d.span;
        symbol.linkage = Linkage::EXTERNAL;
        if fd.asm_name.is_none() {
            symbol.asm_name = Some(self.asm_name(d.package, &symbol.name));
        }
        let sym = self.add_symbol(symbol);
        tracing::trace!(name = %self.symbol(sym).link_name(), "declared external function");
        Materialized::Symbol(sym)
    }

    // ── Labels ──────────────────────────────────────────────────

    /// Label symbol of `label` inside `function`.
    pub(crate) fn label_for(&mut self, label: LabelId, function: SymbolId) -> SymbolId {
        if let Some(&sym) = self.caches.labels.get(&label) {
            return sym;
        }
        let l = self.program.label(label);
        let mut symbol = Symbol::new(SymbolKind::Label, self.str(l.name), TreeTypeId::VOID);
        symbol.context = Some(function);
        symbol.span = l.span;
        let sym = self.add_symbol(symbol);
        self.caches.labels.insert(label, sym);
        sym
    }
}

#[cfg(test)]
mod tests;
