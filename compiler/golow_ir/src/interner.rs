//! String interner for identifiers, package names and literal strings.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::{Ident, Name};

#[derive(Default)]
struct Table {
    map: FxHashMap<&'static str, Name>,
    strings: Vec<&'static str>,
}

/// Interner mapping strings to [`Name`] handles.
///
/// Strings are leaked so lookups can hand out `&'static str` without
/// holding the lock; a compilation interns a bounded set of identifiers.
pub struct StringInterner {
    table: RwLock<Table>,
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl StringInterner {
    pub fn new() -> Self {
        let mut table = Table::default();
        table.map.insert("", Name::EMPTY);
        table.strings.push("");
        StringInterner {
            table: RwLock::new(table),
        }
    }

    /// Intern `s`, returning the existing handle when already present.
    ///
    /// # Panics
    /// Panics if more than `u32::MAX` distinct strings are interned.
    pub fn intern(&self, s: &str) -> Name {
        if let Some(&name) = self.table.read().map.get(s) {
            return name;
        }

        let mut table = self.table.write();
        if let Some(&name) = table.map.get(s) {
            return name;
        }
        let Ok(raw) = u32::try_from(table.strings.len()) else {
            panic!("string interner exceeded {} entries", u32::MAX);
        };
        let leaked: &'static str = Box::leak(s.to_owned().into_boxed_str());
        let name = Name::from_raw(raw);
        table.strings.push(leaked);
        table.map.insert(leaked, name);
        name
    }

    /// Resolve a handle. Unknown handles resolve to the empty string.
    pub fn lookup(&self, name: Name) -> &'static str {
        self.table
            .read()
            .strings
            .get(name.index())
            .copied()
            .unwrap_or("")
    }

    /// Number of interned strings, including the empty string.
    pub fn len(&self) -> usize {
        self.table.read().strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Identifier name with any hidden-name prefix stripped.
    pub fn ident_name(&self, ident: Ident) -> &'static str {
        self.lookup(ident.name)
    }

    /// Sort key for an identifier.
    ///
    /// Hidden names sort as `.<prefix>.<name>`, ahead of exported names, so
    /// that method tables built in separate compilations agree on order.
    pub fn sort_key(&self, ident: Ident) -> String {
        match ident.hidden_prefix {
            None => self.lookup(ident.name).to_owned(),
            Some(prefix) => format!(".{}.{}", self.lookup(prefix), self.lookup(ident.name)),
        }
    }
}
