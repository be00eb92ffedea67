//! The checked program model handed to lowering, and a builder for it.

use crate::{
    Block, Decl, DeclId, DeclKind, Expr, ExprId, ExprKind, ExprList, Function, FunctionDecl,
    Ident, ImportInit, LabelId, Method, Name, NamedType, NamedTypeId, Package, PackageId, Span,
    StringInterner, TypeId, TypePool, VarFlags, Variable,
};

/// A label declared in a function body.
#[derive(Clone, Copy, Debug)]
pub struct Label {
    pub name: Name,
    pub span: Span,
}

/// One compilation unit: the package being compiled plus everything it
/// references from its imports.
pub struct Program {
    pub interner: StringInterner,
    pub package_name: Name,
    /// Prefix making this package's symbols globally unique.
    pub unique_prefix: Name,
    pub packages: Vec<Package>,
    pub imports: Vec<ImportInit>,
    pub types: TypePool,
    pub exprs: Vec<Expr>,
    pub decls: Vec<Decl>,
    pub labels: Vec<Label>,
    /// Package-level declarations in source order.
    pub top_level: Vec<DeclId>,
}

impl Program {
    /// # Panics
    /// Panics on an id not produced for this program.
    #[inline]
    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.index()]
    }

    /// # Panics
    /// Panics on an id not produced for this program.
    #[inline]
    pub fn decl(&self, id: DeclId) -> &Decl {
        &self.decls[id.index()]
    }

    /// # Panics
    /// Panics on an id not produced for this program.
    #[inline]
    pub fn label(&self, id: LabelId) -> &Label {
        &self.labels[id.index()]
    }

    #[inline]
    pub fn package(&self, id: PackageId) -> &Package {
        &self.packages[id.index()]
    }

    #[inline]
    pub fn str(&self, name: Name) -> &'static str {
        self.interner.lookup(name)
    }

    /// Name and unique prefix of the package owning a declaration.
    pub fn package_names(&self, package: Option<PackageId>) -> (Name, Name) {
        match package {
            None => (self.package_name, self.unique_prefix),
            Some(id) => {
                let pkg = self.package(id);
                (pkg.name, pkg.unique_prefix)
            }
        }
    }

    /// Hidden-name prefix of this package: `<unique_prefix>.<package>`.
    pub fn hidden_prefix(&self) -> String {
        format!(
            "{}.{}",
            self.str(self.unique_prefix),
            self.str(self.package_name)
        )
    }

    /// Declared type of a value-bearing declaration.
    pub fn decl_type(&self, id: DeclId) -> TypeId {
        match &self.decl(id).kind {
            DeclKind::Var(var) => var.ty,
            DeclKind::ResultVar { ty, .. } | DeclKind::Type(ty) => *ty,
            DeclKind::Const { value, .. } => self.expr(*value).ty,
            DeclKind::Function(func) => func.ty,
            DeclKind::FunctionDeclaration(decl) => decl.ty,
            DeclKind::TypeDeclaration | DeclKind::Sink { .. } | DeclKind::Package(_) => {
                TypeId::ERROR
            }
        }
    }
}

/// Incremental construction of a [`Program`].
///
/// Front ends and tests use the builder so that ids are allocated
/// consistently; identifiers follow the usual export rule (an upper-case
/// first letter exports the name).
pub struct ProgramBuilder {
    program: Program,
}

impl ProgramBuilder {
    pub fn new(package: &str, unique_prefix: &str) -> Self {
        let interner = StringInterner::new();
        let package_name = interner.intern(package);
        let unique_prefix = interner.intern(unique_prefix);
        ProgramBuilder {
            program: Program {
                interner,
                package_name,
                unique_prefix,
                packages: Vec::new(),
                imports: Vec::new(),
                types: TypePool::new(),
                exprs: Vec::new(),
                decls: Vec::new(),
                labels: Vec::new(),
                top_level: Vec::new(),
            },
        }
    }

    pub fn finish(self) -> Program {
        self.program
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn types(&mut self) -> &mut TypePool {
        &mut self.program.types
    }

    pub fn name(&self, s: &str) -> Name {
        self.program.interner.intern(s)
    }

    /// Identifier declared in this package.
    pub fn ident(&self, s: &str) -> Ident {
        let name = self.name(s);
        if s.chars().next().is_some_and(char::is_uppercase) {
            Ident::exported(name)
        } else {
            Ident::hidden(name, self.name(&self.program.hidden_prefix()))
        }
    }

    /// Identifier declared in an imported package.
    pub fn foreign_ident(&self, package: PackageId, s: &str) -> Ident {
        let name = self.name(s);
        if s.chars().next().is_some_and(char::is_uppercase) {
            Ident::exported(name)
        } else {
            let pkg = self.program.package(package);
            let prefix = format!(
                "{}.{}",
                self.program.str(pkg.unique_prefix),
                self.program.str(pkg.name)
            );
            Ident::hidden(name, self.name(&prefix))
        }
    }

    pub fn import_package(&mut self, name: &str, unique_prefix: &str) -> PackageId {
        let package = Package {
            name: self.name(name),
            unique_prefix: self.name(unique_prefix),
        };
        let id = PackageId::from_raw(index_u32(self.program.packages.len()));
        self.program.packages.push(package);
        id
    }

    pub fn import_init(&mut self, init_name: &str, priority: u32) {
        let init_name = self.name(init_name);
        self.program.imports.push(ImportInit {
            init_name,
            priority,
        });
    }

    // ── Expressions ─────────────────────────────────────────────

    pub fn expr(&mut self, kind: ExprKind, ty: TypeId) -> ExprId {
        let id = ExprId::from_raw(index_u32(self.program.exprs.len()));
        self.program.exprs.push(Expr {
            kind,
            ty,
            span: Span::DUMMY,
        });
        id
    }

    pub fn expr_ty(&self, id: ExprId) -> TypeId {
        self.program.expr(id).ty
    }

    pub fn int(&mut self, value: i64) -> ExprId {
        self.expr(ExprKind::Int(value), TypeId::INT)
    }

    pub fn string(&mut self, value: &str) -> ExprId {
        let name = self.name(value);
        self.expr(ExprKind::Str(name), TypeId::STRING)
    }

    pub fn var(&mut self, decl: DeclId) -> ExprId {
        let ty = self.program.decl_type(decl);
        self.expr(ExprKind::Var(decl), ty)
    }

    pub fn func_ref(&mut self, decl: DeclId) -> ExprId {
        let ty = self.program.decl_type(decl);
        self.expr(ExprKind::Func(decl), ty)
    }

    pub fn binary(&mut self, op: crate::BinaryOp, lhs: ExprId, rhs: ExprId) -> ExprId {
        let ty = if op.is_comparison() {
            TypeId::BOOL
        } else {
            self.expr_ty(lhs)
        };
        self.expr(ExprKind::Binary { op, lhs, rhs }, ty)
    }

    pub fn addr_of(&mut self, operand: ExprId) -> ExprId {
        let ty = self.expr_ty(operand);
        let ptr = self.program.types.pointer(ty);
        self.expr(ExprKind::AddrOf(operand), ptr)
    }

    /// Call with the result type taken from the callee's signature.
    pub fn call(&mut self, callee: ExprId, args: &[ExprId]) -> ExprId {
        let callee_ty = self.expr_ty(callee);
        let ty = match self.program.types.func_type(callee_ty) {
            Some(sig) if sig.results.len() == 1 => sig.results[0],
            _ => TypeId::VOID,
        };
        self.expr(
            ExprKind::Call {
                callee,
                args: args.iter().copied().collect::<ExprList>(),
            },
            ty,
        )
    }

    // ── Declarations ────────────────────────────────────────────

    pub fn decl(&mut self, decl: Decl) -> DeclId {
        let id = DeclId::from_raw(index_u32(self.program.decls.len()));
        self.program.decls.push(decl);
        id
    }

    fn local_decl(&mut self, name: &str, kind: DeclKind) -> DeclId {
        let ident = self.ident(name);
        self.decl(Decl {
            ident,
            package: None,
            span: Span::DUMMY,
            kind,
        })
    }

    fn top_level(&mut self, id: DeclId) -> DeclId {
        self.program.top_level.push(id);
        id
    }

    pub fn global_var(&mut self, name: &str, ty: TypeId, init: Option<ExprId>) -> DeclId {
        let mut var = Variable::new(ty, VarFlags::GLOBAL);
        var.init = init;
        let id = self.local_decl(name, DeclKind::Var(var));
        self.top_level(id)
    }

    /// A variable owned by a function: a local, parameter or receiver.
    pub fn local_var(&mut self, name: &str, ty: TypeId, flags: VarFlags) -> DeclId {
        self.local_decl(name, DeclKind::Var(Variable::new(ty, flags)))
    }

    pub fn imported_var(&mut self, package: PackageId, name: &str, ty: TypeId) -> DeclId {
        let ident = self.foreign_ident(package, name);
        self.decl(Decl {
            ident,
            package: Some(package),
            span: Span::DUMMY,
            kind: DeclKind::Var(Variable::new(ty, VarFlags::GLOBAL)),
        })
    }

    pub fn set_init(&mut self, var: DeclId, init: ExprId) {
        if let DeclKind::Var(v) = &mut self.program.decls[var.index()].kind {
            v.init = Some(init);
        }
    }

    pub fn set_preinit(&mut self, var: DeclId, preinit: Block) {
        if let DeclKind::Var(v) = &mut self.program.decls[var.index()].kind {
            v.preinit = Some(preinit);
        }
    }

    pub fn set_span(&mut self, decl: DeclId, span: Span) {
        self.program.decls[decl.index()].span = span;
    }

    pub fn constant(&mut self, name: &str, value: ExprId, is_abstract: bool) -> DeclId {
        let id = self.local_decl(name, DeclKind::Const { value, is_abstract });
        self.top_level(id)
    }

    pub fn sink(&mut self, init: Option<ExprId>) -> DeclId {
        let id = self.decl(Decl {
            ident: Ident::exported(self.name("_")),
            package: None,
            span: Span::DUMMY,
            kind: DeclKind::Sink { init },
        });
        self.top_level(id)
    }

    /// Package-level function.
    pub fn function(&mut self, name: &str, func: Function) -> DeclId {
        let id = self.local_decl(name, DeclKind::Function(func));
        self.top_level(id)
    }

    /// Function literal or other function nested in `enclosing`.
    pub fn nested_function(&mut self, name: &str, enclosing: DeclId, mut func: Function) -> DeclId {
        func.enclosing = Some(enclosing);
        self.local_decl(name, DeclKind::Function(func))
    }

    /// Method `name` on `named`, attached to the named type's method set.
    pub fn method(
        &mut self,
        named: NamedTypeId,
        name: &str,
        func: Function,
        value_receiver: bool,
    ) -> DeclId {
        let ident = self.ident(name);
        let ty = method_type(&mut self.program.types, func.ty);
        let id = self.local_decl(name, DeclKind::Function(func));
        self.program.top_level.push(id);
        self.program.types.add_method(
            named,
            Method {
                name: ident,
                func: id,
                ty,
                value_receiver,
                ambiguous: false,
            },
        );
        id
    }

    pub fn function_declaration(
        &mut self,
        package: Option<PackageId>,
        name: &str,
        ty: TypeId,
        asm_name: Option<&str>,
    ) -> DeclId {
        let ident = match package {
            Some(pkg) => self.foreign_ident(pkg, name),
            None => self.ident(name),
        };
        let asm_name = asm_name.map(|s| self.name(s));
        self.decl(Decl {
            ident,
            package,
            span: Span::DUMMY,
            kind: DeclKind::FunctionDeclaration(FunctionDecl { ty, asm_name }),
        })
    }

    /// Declare a named type in this package. The underlying type may be
    /// replaced later for recursive definitions.
    pub fn named_type(&mut self, name: &str, underlying: TypeId) -> (NamedTypeId, TypeId) {
        let ident = self.ident(name);
        let (id, ty) = self.program.types.named(NamedType {
            ident,
            package: None,
            in_function: None,
            is_builtin: false,
            underlying,
            methods: Vec::new(),
            span: Span::DUMMY,
        });
        let decl = self.local_decl(name, DeclKind::Type(ty));
        self.top_level(decl);
        (id, ty)
    }

    /// Named type owned by an imported package.
    pub fn foreign_named_type(
        &mut self,
        package: PackageId,
        name: &str,
        underlying: TypeId,
    ) -> (NamedTypeId, TypeId) {
        let ident = self.foreign_ident(package, name);
        self.program.types.named(NamedType {
            ident,
            package: Some(package),
            in_function: None,
            is_builtin: false,
            underlying,
            methods: Vec::new(),
            span: Span::DUMMY,
        })
    }

    pub fn label(&mut self, name: &str) -> LabelId {
        let name = self.name(name);
        let id = LabelId::from_raw(index_u32(self.program.labels.len()));
        self.program.labels.push(Label {
            name,
            span: Span::DUMMY,
        });
        id
    }

    pub fn set_body(&mut self, func: DeclId, body: Block) {
        if let DeclKind::Function(f) = &mut self.program.decls[func.index()].kind {
            f.body = Some(body);
        }
    }

    pub fn function_mut(&mut self, func: DeclId) -> Option<&mut Function> {
        match &mut self.program.decls[func.index()].kind {
            DeclKind::Function(f) => Some(f),
            _ => None,
        }
    }
}

/// Signature of a method without its receiver.
fn method_type(types: &mut TypePool, ty: TypeId) -> TypeId {
    match types.func_type(ty) {
        Some(sig) if sig.receiver.is_some() => {
            let (params, results) = (sig.params.clone(), sig.results.clone());
            types.function(params, results)
        }
        _ => ty,
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "program arenas are bounded well below u32::MAX entries"
)]
fn index_u32(len: usize) -> u32 {
    len as u32
}

#[cfg(test)]
mod tests;
