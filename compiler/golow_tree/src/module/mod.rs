//! The lowered module handed to the backend.

mod print;

use crate::{SymbolId, SymbolTable, Tree, TreeArena, TreeId, TreeTypeId, TypeTable};

/// Lowered output of one compilation unit.
pub struct TreeModule {
    pub types: TypeTable,
    pub nodes: TreeArena,
    pub symbols: SymbolTable,
    /// Definitions to emit, in emission order.
    pub globals: Vec<SymbolId>,
    /// Package initialization function, when the package needs one.
    pub init_function: Option<SymbolId>,
}

/// A non-shareable node reachable from more than one parent.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct SharedNode {
    pub node: TreeId,
    pub parents: usize,
}

impl Default for TreeModule {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeModule {
    pub fn new() -> Self {
        TreeModule {
            types: TypeTable::new(),
            nodes: TreeArena::new(),
            symbols: SymbolTable::new(),
            globals: Vec::new(),
            init_function: None,
        }
    }

    /// Value type of a node; statements have type void.
    pub fn type_of(&self, id: TreeId) -> TreeTypeId {
        match self.nodes.get(id) {
            Tree::Error => TreeTypeId::ERROR,
            Tree::Decl(sym) => self.symbols.get(*sym).ty,
            Tree::Bool(_) => TreeTypeId::BOOL,
            Tree::Null(ty)
            | Tree::Int { ty, .. }
            | Tree::Float { ty, .. }
            | Tree::Str { ty, .. }
            | Tree::Constructor { ty, .. }
            | Tree::AddrOf { ty, .. }
            | Tree::Indirect { ty, .. }
            | Tree::Field { ty, .. }
            | Tree::Index { ty, .. }
            | Tree::Call { ty, .. }
            | Tree::Convert { ty, .. }
            | Tree::BitCast { ty, .. }
            | Tree::Binary { ty, .. }
            | Tree::Unary { ty, .. }
            | Tree::Cond { ty, .. } => *ty,
            Tree::Compound { value, .. } => value.map_or(TreeTypeId::VOID, |v| self.type_of(v)),
            Tree::Assign { .. }
            | Tree::DeclExpr(_)
            | Tree::Return(_)
            | Tree::TryFinally { .. }
            | Tree::Label(_)
            | Tree::Goto(_) => TreeTypeId::VOID,
        }
    }

    /// Verify that no node other than a symbol reference or the error
    /// sentinel has more than one parent. Symbol initializers and bodies
    /// count as parents.
    pub fn check_unshared(&self) -> Result<(), SharedNode> {
        let mut parents = vec![0usize; self.nodes.len()];
        let mut note = |id: TreeId| {
            if let Some(count) = parents.get_mut(id.index()) {
                *count += 1;
            }
        };
        for (_, node) in self.nodes.iter() {
            for child in node.children() {
                note(child);
            }
        }
        for (_, symbol) in self.symbols.iter() {
            symbol.initial.into_iter().chain(symbol.body).for_each(&mut note);
        }
        for (id, node) in self.nodes.iter() {
            let count = parents[id.index()];
            if count > 1 && !node.is_shareable() {
                return Err(SharedNode {
                    node: id,
                    parents: count,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
