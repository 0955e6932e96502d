//! Error recovery token sets.
//!
//! Bitset-based O(1) membership testing over token discriminant tags.

use lumen_ir::TokenKind;

/// A set of token kinds as a 128-bit bitset indexed by `TokenKind::tag`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokenSet(u128);

impl TokenSet {
    #[inline]
    pub const fn new() -> Self {
        Self(0)
    }

    /// Add a token tag to this set (builder for const contexts).
    #[inline]
    #[must_use]
    pub const fn with_tag(self, tag: u8) -> Self {
        Self(self.0 | (1u128 << tag))
    }

    #[inline]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[inline]
    pub const fn contains(&self, kind: &TokenKind) -> bool {
        (self.0 & (1u128 << kind.tag())) != 0
    }
}

impl Default for TokenSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Tokens that can begin a top-level item. Recovery after a bad item
/// skips to one of these.
pub const ITEM_START: TokenSet = TokenSet::new()
    .with_tag(TokenKind::Func.tag())
    .with_tag(TokenKind::Class.tag())
    .with_tag(TokenKind::Union.tag())
    .with_tag(TokenKind::Typedef.tag())
    .with_tag(TokenKind::Import.tag())
    .with_tag(TokenKind::Namespace.tag())
    .with_tag(TokenKind::Extern.tag())
    .with_tag(TokenKind::Public.tag())
    .with_tag(TokenKind::Private.tag())
    .with_tag(TokenKind::LBracket.tag())
    .with_tag(TokenKind::Eof.tag());

/// Statement boundaries: recovery inside a block skips past the next
/// `;` or stops before a closing brace.
pub const STMT_BOUNDARY: TokenSet = TokenSet::new()
    .with_tag(TokenKind::Semi.tag())
    .with_tag(TokenKind::RBrace.tag())
    .with_tag(TokenKind::Eof.tag());

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership() {
        assert!(ITEM_START.contains(&TokenKind::Func));
        assert!(ITEM_START.contains(&TokenKind::Eof));
        assert!(!ITEM_START.contains(&TokenKind::Semi));
        assert!(STMT_BOUNDARY.contains(&TokenKind::Semi));
    }

    #[test]
    fn union_combines() {
        let set = ITEM_START.union(STMT_BOUNDARY);
        assert!(set.contains(&TokenKind::Func));
        assert!(set.contains(&TokenKind::Semi));
    }
}
