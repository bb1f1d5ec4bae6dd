//! Global String Interner
//!
//! Converts define names and values into compact integer [`Symbol`]s so that
//! define sets compare as integer slices.

use std::sync::LazyLock;

use lasso::{Spur, ThreadedRodeo};

static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::new);

/// Compact integer identifier for an interned string.
pub type Symbol = Spur;

/// Interns a string, returning the existing symbol if it was seen before.
#[inline]
pub fn intern(s: &str) -> Symbol {
    INTERNER.get_or_intern(s)
}

/// Looks up a string without interning it.
#[inline]
pub fn get(s: &str) -> Option<Symbol> {
    INTERNER.get(s)
}

/// Resolves a symbol back to its string.
#[inline]
pub fn resolve(sym: Symbol) -> &'static str {
    INTERNER.resolve(&sym)
}

/// Pre-interns the define names every material shader sets, so the first
/// compile does not pay for them.
pub fn preload_common_defines() {
    let common = [
        "SHADERBLENDING_SOLID",
        "SHADERBLENDING_MASKED",
        "SHADERBLENDING_TRANSLUCENT",
        "SHADERBLENDING_ADDITIVE",
        "SHADER_TWOSIDED",
        "SHADER_UNLIT",
        "SHADER_NONDIRECTIONALLIGHTING",
        "SHADER_SHM",
        "USE_FP_BLENDING",
        "OPAQUELAYER",
        "SUPPORTS_FP_FILTERING",
        "SUPPORTS_HW_SHADOWMAP",
        "0",
        "1",
    ];

    for name in common {
        intern(name);
    }
}
