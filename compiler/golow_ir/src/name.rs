//! Interned names and package-qualified identifiers.

use std::fmt;

/// Interned string handle. Compare by value, resolve through
/// [`StringInterner::lookup`](crate::StringInterner::lookup).
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct Name(u32);

impl Name {
    /// Pre-interned empty string.
    pub const EMPTY: Name = Name(0);

    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Name(raw)
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

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({})", self.0)
    }
}

/// A declared identifier.
///
/// Exported identifiers are visible outside their package. Hidden
/// (unexported) identifiers remember the hidden-name prefix of the package
/// that declared them, `<unique_prefix>.<package>`, so that two packages
/// can declare the same unexported name without colliding.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Ident {
    pub name: Name,
    pub hidden_prefix: Option<Name>,
}

impl Ident {
    #[inline]
    pub const fn exported(name: Name) -> Self {
        Ident {
            name,
            hidden_prefix: None,
        }
    }

    #[inline]
    pub const fn hidden(name: Name, prefix: Name) -> Self {
        Ident {
            name,
            hidden_prefix: Some(prefix),
        }
    }

    #[inline]
    pub const fn is_hidden(self) -> bool {
        self.hidden_prefix.is_some()
    }
}
