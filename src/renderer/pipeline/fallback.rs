//! Fallback Compile Driver
//!
//! A shader is attempted for an ordered list of candidate materials: the
//! requested one, then the engine default. The first candidate that makes
//! it through code generation and the platform compiler wins; the errors of
//! the ones before it travel with the result. A candidate is only prepared
//! once the one before it has failed.

use crate::resources::{BlendMode, Material, ShaderDefines};

/// Appends `errors` to `merged`, skipping exact duplicates.
pub fn merge_errors(merged: &mut Vec<String>, errors: impl IntoIterator<Item = String>) {
    for error in errors {
        if !merged.iter().any(|existing| *existing == error) {
            merged.push(error);
        }
    }
}

/// Defines describing how a material is blended and lit.
#[must_use]
pub fn material_defines(material: &Material) -> ShaderDefines {
    let mut defines = ShaderDefines::with_capacity(8);
    defines.set_flag("SHADERBLENDING_SOLID", material.blend_mode == BlendMode::Opaque);
    defines.set_flag("SHADERBLENDING_MASKED", material.blend_mode == BlendMode::Masked);
    defines.set_flag(
        "SHADERBLENDING_TRANSLUCENT",
        material.blend_mode == BlendMode::Translucent,
    );
    defines.set_flag("SHADERBLENDING_ADDITIVE", material.blend_mode == BlendMode::Additive);
    defines.set_flag("SHADER_TWOSIDED", material.two_sided);
    defines.set_flag("SHADER_UNLIT", material.unlit);
    defines.set_flag(
        "SHADER_NONDIRECTIONALLIGHTING",
        material.non_directional_lighting,
    );
    defines.set_flag("SHADER_SHM", material.shm.is_some());
    defines
}

/// The winning attempt of a fallback run.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackSuccess<T> {
    /// Position of the winning candidate.
    pub index: usize,
    pub output: T,
    /// Errors of the candidates that failed before it, deduplicated.
    pub errors: Vec<String>,
}

/// Walks an ordered candidate list one attempt at a time.
///
/// Candidates are handed out lazily: the next one is only produced after
/// the current one has been reported as failed. Errors accumulate across
/// attempts and stay available once a candidate succeeds.
#[derive(Debug, Clone)]
pub struct FallbackCompileDriver<H> {
    candidates: Vec<H>,
    next: usize,
    errors: Vec<String>,
}

impl<H: Copy> FallbackCompileDriver<H> {
    #[must_use]
    pub fn new(candidates: Vec<H>) -> Self {
        Self {
            candidates,
            next: 0,
            errors: Vec::new(),
        }
    }

    /// The next candidate to attempt, or `None` once every one has failed.
    pub fn next_candidate(&mut self) -> Option<(usize, H)> {
        let index = self.next;
        let candidate = *self.candidates.get(index)?;
        self.next += 1;
        Some((index, candidate))
    }

    /// Records the failure of the candidate last handed out.
    pub fn fail(&mut self, name: &str, errors: Vec<String>) {
        if self.next < self.candidates.len() {
            log::warn!(
                "Material '{name}' failed to compile, falling back:\n{}",
                errors.join("\n")
            );
        }
        merge_errors(&mut self.errors, errors);
    }

    #[must_use]
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    #[must_use]
    pub fn into_errors(self) -> Vec<String> {
        self.errors
    }

    /// Attempts each candidate in order until one succeeds.
    ///
    /// `attempt` receives a candidate and returns its name with the outcome.
    /// Candidates after the winner are never touched.
    pub fn run<T>(
        mut self,
        mut attempt: impl FnMut(H) -> (String, Result<T, Vec<String>>),
    ) -> Result<FallbackSuccess<T>, Vec<String>> {
        while let Some((index, candidate)) = self.next_candidate() {
            match attempt(candidate) {
                (_, Ok(output)) => {
                    return Ok(FallbackSuccess {
                        index,
                        output,
                        errors: self.errors,
                    });
                }
                (name, Err(errors)) => self.fail(&name, errors),
            }
        }
        Err(self.errors)
    }
}
