//! String interner for identifiers and import paths.
//!
//! Interned names are 4-byte handles with O(1) equality and hashing,
//! resolvable back to `&str` for every external interface (mangling,
//! diagnostics, LLVM symbol names).

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::fmt;

/// An interned string handle.
///
/// Ordered and hashable so it can key registries and memoization tables.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Name(u32);

impl Name {
    /// The empty string, pre-interned at index 0.
    pub const EMPTY: Name = Name(0);

    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({})", self.0)
    }
}

struct Inner {
    map: FxHashMap<&'static str, u32>,
    strings: Vec<&'static str>,
}

/// Interner storage.
///
/// Interned strings are leaked; the interner lives for the whole
/// compiler invocation, so the leak is bounded by the source text.
pub struct StringInterner {
    inner: RwLock<Inner>,
}

impl StringInterner {
    pub fn new() -> Self {
        let mut inner = Inner {
            map: FxHashMap::default(),
            strings: Vec::with_capacity(256),
        };
        let empty: &'static str = "";
        inner.map.insert(empty, 0);
        inner.strings.push(empty);
        StringInterner {
            inner: RwLock::new(inner),
        }
    }

    /// Intern a string, returning its `Name`.
    pub fn intern(&self, s: &str) -> Name {
        {
            let guard = self.inner.read();
            if let Some(&idx) = guard.map.get(s) {
                return Name(idx);
            }
        }

        let mut guard = self.inner.write();
        // Re-check: another caller may have inserted between the locks.
        if let Some(&idx) = guard.map.get(s) {
            return Name(idx);
        }

        let leaked: &'static str = Box::leak(s.to_owned().into_boxed_str());
        let idx = u32::try_from(guard.strings.len())
            .unwrap_or_else(|_| panic!("interner capacity exceeded"));
        guard.strings.push(leaked);
        guard.map.insert(leaked, idx);
        Name(idx)
    }

    /// Resolve a `Name` back to its string.
    pub fn lookup(&self, name: Name) -> &'static str {
        self.inner.read().strings[name.0 as usize]
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_dedup() {
        let interner = StringInterner::new();
        let a = interner.intern("main");
        let b = interner.intern("main");
        let c = interner.intern("other");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(interner.lookup(a), "main");
        assert_eq!(interner.lookup(c), "other");
    }

    #[test]
    fn empty_is_preinterned() {
        let interner = StringInterner::new();
        assert_eq!(interner.intern(""), Name::EMPTY);
    }

    #[test]
    fn unicode_identifiers() {
        let interner = StringInterner::new();
        let n = interner.intern("変数");
        assert_eq!(interner.lookup(n), "変数");
    }
}
