//! Derivation of a movie's [`Key`] from its semantic fields.
//!
//! Clients never choose keys. Re-submitting the same title, genre, director and year always
//! produces the same key, which is how duplicate creates are detected, even across server
//! restarts. The scheme is not collision resistant: two different movies may share a key,
//! in which case the second one is reported as a duplicate rather than overwriting the first.
use crate::movie::Key;

/// A deterministic mapping from a movie's fields to its [`Key`].
///
/// Implementations must not depend on process state (no random seeds), otherwise keys
/// stored by a previous run would no longer match.
pub trait KeyScheme: Clone + Send + Sync + 'static {
    /// derives the key for the given fields
    fn derive_key(&self, title: &str, genre: &str, director: &str, year: &str) -> Key;
}

/// modulus applied to every character before it is weighted
pub const PRIME_MODULUS: u32 = 1783;

/// weight applied to every reduced character
pub const CHAR_WEIGHT: i64 = 256;

/// The catalog's key scheme: the sum, over every character `c` of
/// `title ++ genre ++ director ++ year`, of `(c mod 1783) * 256`.
///
/// Characters are Unicode scalar values; for ASCII this is the same as summing bytes.
/// Existing catalogs depend on these exact constants.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrimeSum;

impl KeyScheme for PrimeSum {
    fn derive_key(&self, title: &str, genre: &str, director: &str, year: &str) -> Key {
        [title, genre, director, year]
            .iter()
            .flat_map(|field| field.chars())
            .map(|c| i64::from(u32::from(c) % PRIME_MODULUS) * CHAR_WEIGHT)
            .sum()
    }
}

/// derives a key with the default [`PrimeSum`] scheme
pub fn derive_key(title: &str, genre: &str, director: &str, year: &str) -> Key {
    PrimeSum.derive_key(title, genre, director, year)
}
