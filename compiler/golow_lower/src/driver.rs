//! Package driver: materializes every top-level declaration and builds the
//! package initialization function.
//!
//! # Init function
//!
//! | Package | Name | Emitted |
//! |---------|------|---------|
//! | entry | `__go_init_main` | always |
//! | other | `<unique_prefix>.<package>..import` | when it has work |
//!
//! The body runs, in order: the imported packages' init functions (entry
//! package only, ascending priority), the scheduled global initializers,
//! then the package's own `init` functions in declaration order.

use golow_diagnostic::{Diagnostic, ErrorCode};
use golow_ir::{DeclId, DeclKind};
use golow_tree::{Linkage, Symbol, SymbolId, SymbolKind, TreeId, TreeTypeId};

use crate::init_order::{sort_inits, InitDeps};
use crate::lower::FnCtx;
use crate::session::{Materialized, Session};

const ENTRY_INIT: &str = "__go_init_main";

impl Session<'_> {
    /// Lower the whole package into the session's module.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(package = %self.package_name(), decls = self.program.top_level.len())
    )]
    pub(crate) fn lower_package(&mut self) {
        let program = self.program;
        let mut pending = Vec::new();
        let mut init_functions = Vec::new();

        for &decl in &program.top_level {
            let d = program.decl(decl);
            match &d.kind {
                DeclKind::Var(var) => {
                    let materialized = self.materialize(decl, None);
                    if !d.is_local_package() {
                        continue;
                    }
                    let Materialized::Symbol(sym) = materialized else {
                        continue;
                    };
                    self.emit(sym);
                    match var.init {
                        Some(init) if var.preinit.is_none() && self.is_constant(init) => {
                            let value = self.constant_value(init).unwrap_or(TreeId::ERROR);
                            let ty = self.symbol(sym).ty;
                            let value = self.convert(value, ty);
                            self.symbol_mut(sym).initial = Some(value);
                        }
                        None if var.preinit.is_none() => {}
                        _ => pending.push(decl),
                    }
                }
                DeclKind::Sink { init: Some(_) } => pending.push(decl),
                DeclKind::Const {
                    is_abstract: true, ..
                }
                | DeclKind::Sink { init: None }
                | DeclKind::Package(_)
                | DeclKind::ResultVar { .. } => {}
                DeclKind::Function(func) => {
                    let materialized = self.materialize(decl, None);
                    let is_init = d.is_local_package()
                        && !func.is_method()
                        && self.str(d.ident.name) == "init";
                    if let (true, Materialized::Symbol(sym)) = (is_init, materialized) {
                        init_functions.push(sym);
                    }
                }
                DeclKind::Const { .. }
                | DeclKind::Type(_)
                | DeclKind::TypeDeclaration
                | DeclKind::FunctionDeclaration(_) => {
                    self.materialize(decl, None);
                }
            }
        }

        let mut deps = InitDeps::new(program);
        let schedule = sort_inits(
            pending,
            |v| match &program.decl(v).kind {
                DeclKind::Var(var) => var.init.is_some(),
                DeclKind::Sink { init } => init.is_some(),
                _ => false,
            },
            |v, w| deps.requires(v, w),
        );
        for &(v, w) in &schedule.cyclic {
            self.report_cycle(v, w);
        }
        for &v in &schedule.self_referential {
            let d = program.decl(v);
            let name = self.str(d.ident.name);
            self.error(
                ErrorCode::E3003,
                d.span,
                format!("initialization of `{name}` refers to itself"),
            );
        }
        tracing::debug!(
            scheduled = schedule.order.len(),
            cycles = schedule.cyclic.len(),
            "scheduled global initializers"
        );

        self.build_init_function(&schedule.order, &init_functions);
    }

    fn report_cycle(&mut self, v: DeclId, w: DeclId) {
        let program = self.program;
        let (dv, dw) = (program.decl(v), program.decl(w));
        let (nv, nw) = (self.str(dv.ident.name), self.str(dw.ident.name));
        tracing::debug!(first = nv, second = nw, "initialization cycle");
        self.report(
            Diagnostic::error(ErrorCode::E3002)
                .with_message(format!("initialization of `{nv}` and `{nw}` depend on each other"))
                .with_label(dv.span, format!("`{nv}` requires `{nw}`"))
                .with_secondary_label(dw.span, format!("`{nw}` requires `{nv}`")),
        );
    }

    fn build_init_function(&mut self, order: &[DeclId], init_functions: &[SymbolId]) {
        let entry = self.is_entry_package();
        let name = if entry {
            ENTRY_INIT.to_owned()
        } else {
            format!("{}.{}..import", self.unique_prefix(), self.package_name())
        };
        let void_fn = self.module.types.function(Vec::new(), TreeTypeId::VOID);
        let mut symbol = Symbol::new(SymbolKind::Function, name, void_fn);
        symbol.linkage.public = true;
        let init = self.add_symbol(symbol);
        let mut ctx = FnCtx::new(init);

        let program = self.program;
        let mut stmts = Vec::new();
        if entry {
            let mut imports: Vec<_> = program.imports.iter().collect();
            imports.sort_by_key(|import| import.priority);
            for import in imports {
                let mut callee =
                    Symbol::new(SymbolKind::Function, self.str(import.init_name), void_fn);
                callee.linkage = Linkage::EXTERNAL;
                let callee = self.add_symbol(callee);
                stmts.push(self.call(callee, Vec::new(), TreeTypeId::VOID));
            }
        }
        for &decl in order {
            stmts.extend(self.lower_global_init(&mut ctx, decl));
        }
        for &function in init_functions {
            stmts.push(self.call(function, Vec::new(), TreeTypeId::VOID));
        }

        if stmts.is_empty() && !entry {
            tracing::debug!("package needs no init function");
            return;
        }
        let body = self.seq(stmts, None);
        self.symbol_mut(init).body = Some(body);
        self.module.init_function = Some(init);
        self.emit(init);
        tracing::debug!(name = %self.symbol(init).name, "built init function");
    }

    /// Runtime initialization of one scheduled global or sink.
    fn lower_global_init(&mut self, ctx: &mut FnCtx, decl: DeclId) -> Vec<TreeId> {
        let program = self.program;
        let mut stmts = Vec::new();
        match &program.decl(decl).kind {
            DeclKind::Var(var) => {
                if let Some(preinit) = &var.preinit {
                    stmts.push(self.lower_block(ctx, preinit));
                }
                if let Some(init) = var.init {
                    let value = self.lower_expr(ctx, init);
                    let target = self.symbol_for(decl, Some(ctx.function));
                    stmts.push(self.assign(target, value));
                }
            }
            DeclKind::Sink { init: Some(init) } => stmts.push(self.lower_expr(ctx, *init)),
            _ => {}
        }
        stmts
    }
}

#[cfg(test)]
mod tests;
