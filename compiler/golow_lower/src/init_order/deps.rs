//! Dependency discovery between package-level initializers.
//!
//! `v` requires `w` when evaluating `v`'s initializer (or pre-init block)
//! may read `w`: directly, through the initializer of another variable of
//! this package it reads, or through the body of any function of this
//! package it mentions. A function is followed whether it is called or
//! only has its address taken.

use golow_ir::{Block, DeclId, DeclKind, ExprId, ExprKind, Program, SelectOp, Stmt};
use rustc_hash::{FxHashMap, FxHashSet};

/// Memoized `requires` relation over one program.
pub(crate) struct InitDeps<'p> {
    program: &'p Program,
    memo: FxHashMap<(DeclId, DeclId), bool>,
}

impl<'p> InitDeps<'p> {
    pub(crate) fn new(program: &'p Program) -> Self {
        InitDeps {
            program,
            memo: FxHashMap::default(),
        }
    }

    /// Whether `var`'s initializer may read `target`.
    pub(crate) fn requires(&mut self, var: DeclId, target: DeclId) -> bool {
        if let Some(&known) = self.memo.get(&(var, target)) {
            return known;
        }
        let mut finder = Finder {
            program: self.program,
            target,
            seen: FxHashSet::default(),
            work: Vec::new(),
        };
        finder.push_initializer(var);
        let found = finder.run();
        tracing::trace!(?var, ?target, found, "initializer dependency");
        self.memo.insert((var, target), found);
        found
    }
}

enum Work<'p> {
    Expr(ExprId),
    Block(&'p Block),
}

/// Worklist search for a read of `target`.
struct Finder<'p> {
    program: &'p Program,
    target: DeclId,
    /// Variables and functions whose code is already queued.
    seen: FxHashSet<DeclId>,
    work: Vec<Work<'p>>,
}

impl<'p> Finder<'p> {
    fn push_initializer(&mut self, decl: DeclId) {
        let program = self.program;
        match &program.decl(decl).kind {
            DeclKind::Var(var) => {
                if let Some(preinit) = &var.preinit {
                    self.work.push(Work::Block(preinit));
                }
                if let Some(init) = var.init {
                    self.work.push(Work::Expr(init));
                }
            }
            DeclKind::Sink { init: Some(init) } => self.work.push(Work::Expr(*init)),
            _ => {}
        }
    }

    fn run(&mut self) -> bool {
        while let Some(work) = self.work.pop() {
            let found = match work {
                Work::Expr(expr) => self.visit_expr(expr),
                Work::Block(block) => {
                    self.visit_block(block);
                    false
                }
            };
            if found {
                return true;
            }
        }
        false
    }

    /// Follow a same-package global's initializer once.
    fn follow_var(&mut self, decl: DeclId) {
        let d = self.program.decl(decl);
        let is_local_global = d.is_local_package() && d.as_var().is_some_and(|v| v.is_global());
        if is_local_global && self.seen.insert(decl) {
            self.push_initializer(decl);
        }
    }

    /// Follow a same-package function's body once.
    fn follow_function(&mut self, decl: DeclId) {
        let program = self.program;
        if let Some(body) = program.decl(decl).as_function().and_then(|f| f.body.as_ref()) {
            if self.seen.insert(decl) {
                self.work.push(Work::Block(body));
            }
        }
    }

    fn visit_expr(&mut self, expr: ExprId) -> bool {
        let program = self.program;
        match &program.expr(expr).kind {
            ExprKind::Var(decl) => {
                if *decl == self.target {
                    return true;
                }
                self.follow_var(*decl);
            }
            ExprKind::Func(decl) => self.follow_function(*decl),
            ExprKind::Closure { func, captures } => {
                self.follow_function(*func);
                self.exprs(captures);
            }
            ExprKind::Call { callee, args } => {
                self.work.push(Work::Expr(*callee));
                self.exprs(args);
            }
            ExprKind::Binary { lhs, rhs, .. } => self.exprs(&[*lhs, *rhs]),
            ExprKind::Index { base: a, index: b }
            | ExprKind::TryReceive { chan: a, ok: b }
            | ExprKind::TrySend { chan: a, value: b } => self.exprs(&[*a, *b]),
            ExprKind::Unary { operand: inner, .. }
            | ExprKind::AddrOf(inner)
            | ExprKind::Deref(inner)
            | ExprKind::Field { base: inner, .. }
            | ExprKind::Convert(inner)
            | ExprKind::Receive { chan: inner }
            | ExprKind::MakeInterface(inner)
            | ExprKind::Refcounted { value: inner, .. } => self.work.push(Work::Expr(*inner)),
            ExprKind::Composite(elems) => self.exprs(elems),
            ExprKind::MakeMap { size } => self.exprs(size.as_slice()),
            ExprKind::Int(_)
            | ExprKind::Float(_)
            | ExprKind::Bool(_)
            | ExprKind::Str(_)
            | ExprKind::Nil
            | ExprKind::ClosureField(_) => {}
        }
        false
    }

    fn exprs(&mut self, exprs: &[ExprId]) {
        self.work.extend(exprs.iter().map(|&e| Work::Expr(e)));
    }

    fn visit_block(&mut self, block: &'p Block) {
        for stmt in &block.stmts {
            match stmt {
                Stmt::Expr(expr) => self.exprs(&[*expr]),
                Stmt::VarDecl(decl) => self.push_initializer(*decl),
                Stmt::Assign { lhs, rhs } => self.exprs(&[*lhs, *rhs]),
                Stmt::Return(values) => self.exprs(values),
                Stmt::If {
                    cond,
                    then_block,
                    else_block,
                } => {
                    self.exprs(&[*cond]);
                    self.work.push(Work::Block(then_block));
                    if let Some(else_block) = else_block {
                        self.work.push(Work::Block(else_block));
                    }
                }
                Stmt::Block(inner) => self.work.push(Work::Block(inner)),
                Stmt::Send { chan, value } => self.exprs(&[*chan, *value]),
                Stmt::Select { cases, default } => {
                    for case in cases {
                        match &case.op {
                            SelectOp::Send { chan, value } => self.exprs(&[*chan, *value]),
                            SelectOp::Receive { chan, into } => {
                                self.exprs(&[*chan]);
                                self.exprs(into.as_slice());
                            }
                        }
                        self.work.push(Work::Block(&case.body));
                    }
                    if let Some(default) = default {
                        self.work.push(Work::Block(default));
                    }
                }
                Stmt::Label(_) | Stmt::Goto(_) => {}
            }
        }
    }
}
