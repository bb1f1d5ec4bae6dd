//! Shader Macro Definitions
//!
//! Define sets handed to the platform compiler. Keys and values are interned
//! [`Symbol`]s kept in symbol order, so two sets with the same contents
//! compare equal regardless of insertion order.
//!
//! ```rust,ignore
//! use shadegraph::resources::ShaderDefines;
//!
//! let mut defines = ShaderDefines::new();
//! defines.set_flag("SHADER_TWOSIDED", true);
//! defines.set("NUM_SAMPLE_CHUNKS", "4");
//! ```

use std::collections::BTreeMap;

use crate::utils::interner::{self, Symbol};

/// An ordered collection of shader macro definitions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderDefines {
    defines: Vec<(Symbol, Symbol)>,
}

impl ShaderDefines {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            defines: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            defines: Vec::with_capacity(capacity),
        }
    }

    /// Sets a define, replacing any previous value for the same key.
    pub fn set(&mut self, key: &str, value: &str) {
        self.set_symbol(interner::intern(key), interner::intern(value));
    }

    /// Sets a boolean define as `"1"` or `"0"`.
    pub fn set_flag(&mut self, key: &str, enabled: bool) {
        self.set(key, if enabled { "1" } else { "0" });
    }

    fn set_symbol(&mut self, key: Symbol, value: Symbol) {
        match self.defines.binary_search_by_key(&key, |&(k, _)| k) {
            Ok(idx) => self.defines[idx].1 = value,
            Err(idx) => self.defines.insert(idx, (key, value)),
        }
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        interner::get(key).is_some_and(|key_sym| {
            self.defines
                .binary_search_by_key(&key_sym, |&(k, _)| k)
                .is_ok()
        })
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&'static str> {
        let key_sym = interner::get(key)?;
        self.defines
            .binary_search_by_key(&key_sym, |&(k, _)| k)
            .ok()
            .map(|idx| interner::resolve(self.defines[idx].1))
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.defines.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.defines.is_empty()
    }

    /// Iterates `(name, value)` pairs as strings.
    pub fn iter_strings(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.defines
            .iter()
            .map(|&(k, v)| (interner::resolve(k), interner::resolve(v)))
    }

    /// Name-sorted view, used when the define list is printed or hashed into
    /// a persistent key. Symbol order depends on intern order and is not
    /// stable across processes.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<&'static str, &'static str> {
        self.iter_strings().collect()
    }

    /// Merges `other` into `self`; values from `other` win on conflict.
    pub fn merge(&mut self, other: &ShaderDefines) {
        for &(key, value) in &other.defines {
            self.set_symbol(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let mut defines = ShaderDefines::new();
        defines.set("SHADER_UNLIT", "1");
        defines.set_flag("SHADER_TWOSIDED", false);

        assert!(defines.contains("SHADER_UNLIT"));
        assert!(defines.contains("SHADER_TWOSIDED"));
        assert!(!defines.contains("SHADER_SHM"));

        assert_eq!(defines.get("SHADER_UNLIT"), Some("1"));
        assert_eq!(defines.get("SHADER_TWOSIDED"), Some("0"));
    }

    #[test]
    fn test_set_overwrites_existing_value() {
        let mut defines = ShaderDefines::new();
        defines.set_flag("OPAQUELAYER", false);
        defines.set_flag("OPAQUELAYER", true);

        assert_eq!(defines.len(), 1);
        assert_eq!(defines.get("OPAQUELAYER"), Some("1"));
    }

    #[test]
    fn test_merge() {
        let mut d1 = ShaderDefines::new();
        d1.set("A", "1");
        d1.set("B", "2");

        let mut d2 = ShaderDefines::new();
        d2.set("B", "3");
        d2.set("C", "4");

        d1.merge(&d2);

        assert_eq!(d1.get("A"), Some("1"));
        assert_eq!(d1.get("B"), Some("3"));
        assert_eq!(d1.get("C"), Some("4"));
    }

    #[test]
    fn test_equality_independent_of_insertion_order() {
        let mut d1 = ShaderDefines::new();
        d1.set("A", "1");
        d1.set("B", "2");

        let mut d2 = ShaderDefines::new();
        d2.set("B", "2");
        d2.set("A", "1");

        assert_eq!(d1, d2);
        assert_eq!(d1.to_map(), d2.to_map());
    }

    #[test]
    fn test_to_map_is_name_sorted() {
        let mut defines = ShaderDefines::new();
        defines.set("ZETA_DEFINE", "1");
        defines.set("ALPHA_DEFINE", "1");

        let names: Vec<_> = defines.to_map().into_keys().collect();
        assert_eq!(names, vec!["ALPHA_DEFINE", "ZETA_DEFINE"]);
    }
}
