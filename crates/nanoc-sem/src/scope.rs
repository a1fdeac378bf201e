//! Scope tables: one per scope-defining AST node, chained to a parent.

use nanoc_util::{define_idx, FxHashMap, Idx, Symbol};

define_idx!(ScopeId);

/// A declared variable's bookkeeping. `is_read_from`/`is_written_to` never
/// reset once set — they describe whether the declaration was ever used,
/// not its state at any one point in the program.
#[derive(Debug, Clone)]
pub struct SymbolTableEntry {
    pub data_type: Symbol,
    pub is_read_from: bool,
    pub is_written_to: bool,
}

/// One lexical scope: its own declarations plus a link to the enclosing
/// scope for lookups that fall through.
#[derive(Debug)]
pub struct SymbolTable {
    pub parent: Option<ScopeId>,
    entries: FxHashMap<Symbol, SymbolTableEntry>,
}

impl SymbolTable {
    fn new(parent: Option<ScopeId>) -> Self {
        Self {
            parent,
            entries: FxHashMap::default(),
        }
    }

    pub fn get(&self, name: Symbol) -> Option<&SymbolTableEntry> {
        self.entries.get(&name)
    }

    pub fn declared_here(&self, name: Symbol) -> bool {
        self.entries.contains_key(&name)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&Symbol, &SymbolTableEntry)> {
        self.entries.iter()
    }
}

/// All scopes created while annotating one program, indexed by [`ScopeId`].
#[derive(Debug, Default)]
pub struct ScopeForest {
    tables: Vec<SymbolTable>,
}

impl ScopeForest {
    pub fn new() -> Self {
        Self { tables: Vec::new() }
    }

    pub fn new_scope(&mut self, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId::from_usize(self.tables.len());
        self.tables.push(SymbolTable::new(parent));
        id
    }

    pub fn table(&self, id: ScopeId) -> &SymbolTable {
        &self.tables[id.index()]
    }

    pub fn table_mut(&mut self, id: ScopeId) -> &mut SymbolTable {
        &mut self.tables[id.index()]
    }

    pub fn declare(&mut self, scope: ScopeId, name: Symbol, data_type: Symbol) -> Result<(), ()> {
        if self.table(scope).declared_here(name) {
            return Err(());
        }
        self.table_mut(scope).entries.insert(
            name,
            SymbolTableEntry {
                data_type,
                is_read_from: false,
                is_written_to: false,
            },
        );
        Ok(())
    }

    /// Walks `scope`'s parent chain looking for `name`, returning the scope
    /// it was actually declared in.
    pub fn resolve(&self, scope: ScopeId, name: Symbol) -> Option<ScopeId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if self.table(id).declared_here(name) {
                return Some(id);
            }
            current = self.table(id).parent;
        }
        None
    }

    pub fn mark_read(&mut self, scope: ScopeId, name: Symbol) {
        if let Some(owner) = self.resolve(scope, name) {
            self.table_mut(owner).entries.get_mut(&name).unwrap().is_read_from = true;
        }
    }

    pub fn mark_written(&mut self, scope: ScopeId, name: Symbol) {
        if let Some(owner) = self.resolve(scope, name) {
            self.table_mut(owner).entries.get_mut(&name).unwrap().is_written_to = true;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ScopeId, &SymbolTable)> {
        self.tables
            .iter()
            .enumerate()
            .map(|(i, t)| (ScopeId::from_usize(i), t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nanoc_util::Interner;

    #[test]
    fn child_scope_resolves_through_parent() {
        let mut interner = Interner::new();
        let x = interner.intern("x");
        let byte = interner.intern("byte");
        let mut forest = ScopeForest::new();
        let root = forest.new_scope(None);
        forest.declare(root, x, byte).unwrap();
        let child = forest.new_scope(Some(root));
        assert_eq!(forest.resolve(child, x), Some(root));
    }

    #[test]
    fn duplicate_declaration_in_same_scope_errs() {
        let mut interner = Interner::new();
        let x = interner.intern("x");
        let byte = interner.intern("byte");
        let mut forest = ScopeForest::new();
        let root = forest.new_scope(None);
        forest.declare(root, x, byte).unwrap();
        assert!(forest.declare(root, x, byte).is_err());
    }

    #[test]
    fn shadowing_in_child_scope_is_allowed() {
        let mut interner = Interner::new();
        let x = interner.intern("x");
        let byte = interner.intern("byte");
        let mut forest = ScopeForest::new();
        let root = forest.new_scope(None);
        forest.declare(root, x, byte).unwrap();
        let child = forest.new_scope(Some(root));
        assert!(forest.declare(child, x, byte).is_ok());
    }

    #[test]
    fn mark_read_and_written_flags_propagate_to_owner() {
        let mut interner = Interner::new();
        let x = interner.intern("x");
        let byte = interner.intern("byte");
        let mut forest = ScopeForest::new();
        let root = forest.new_scope(None);
        forest.declare(root, x, byte).unwrap();
        forest.mark_read(root, x);
        forest.mark_written(root, x);
        let entry = forest.table(root).get(x).unwrap();
        assert!(entry.is_read_from);
        assert!(entry.is_written_to);
    }
}
