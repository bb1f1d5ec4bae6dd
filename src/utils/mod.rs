//! Utility Module
//!
//! - [`interner`]: string interning for define names and values
//!
//! Interned strings ([`Symbol`]s) compare in O(1):
//!
//! ```rust,ignore
//! use shadegraph::utils::interner;
//!
//! let sym1 = interner::intern("SHADER_TWOSIDED");
//! let sym2 = interner::intern("SHADER_TWOSIDED");
//! assert_eq!(sym1, sym2);
//! ```

pub mod interner;

pub use interner::Symbol;
