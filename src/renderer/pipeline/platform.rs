//! Platform Compiler Interface
//!
//! The boundary to the native shader compiler. A program is two stages,
//! compiled vertex first; each stage is retried once without optimization
//! before its error is surfaced.

use crate::renderer::core::binding::UnresolvedBinding;
use crate::resources::ShaderDefines;

/// One stage to compile.
#[derive(Debug, Clone, Copy)]
pub struct StageRequest<'a> {
    pub source: &'a str,
    pub entry_point: &'a str,
    pub profile: &'a str,
    pub defines: &'a ShaderDefines,
    pub optimize: bool,
}

/// A compiled stage and its constant table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageOutput {
    pub code: Vec<u8>,
    pub instruction_count: u32,
    pub parameters: Vec<UnresolvedBinding>,
}

/// A native shader compiler.
///
/// Errors are the compiler's diagnostic text; multi-line diagnostics are
/// split into one error per line by the caller.
pub trait PlatformCompiler: Send + Sync {
    fn compile_stage(&self, request: &StageRequest<'_>) -> Result<StageOutput, String>;
}

/// Both stages of a freshly compiled program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramOutput {
    pub vertex: StageOutput,
    pub pixel: StageOutput,
}

pub const VERTEX_ENTRY_POINT: &str = "vertexShader";
pub const PIXEL_ENTRY_POINT: &str = "pixelShader";

/// Target profiles of the two stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageProfiles {
    pub vertex: String,
    pub pixel: String,
}

fn compile_stage_with_retry(
    compiler: &dyn PlatformCompiler,
    request: StageRequest<'_>,
) -> Result<StageOutput, String> {
    match compiler.compile_stage(&request) {
        Ok(output) => Ok(output),
        Err(first) => {
            log::debug!(
                "{} failed with optimization, retrying without: {first}",
                request.entry_point
            );
            compiler.compile_stage(&StageRequest {
                optimize: false,
                ..request
            })
        }
    }
}

fn split_errors(text: &str) -> Vec<String> {
    let lines: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    if lines.is_empty() {
        vec!["Unknown platform compiler error".to_string()]
    } else {
        lines
    }
}

/// Compiles the vertex and then the pixel stage of `source`.
pub fn compile_program(
    compiler: &dyn PlatformCompiler,
    source: &str,
    defines: &ShaderDefines,
    profiles: &StageProfiles,
) -> Result<ProgramOutput, Vec<String>> {
    let vertex = compile_stage_with_retry(
        compiler,
        StageRequest {
            source,
            entry_point: VERTEX_ENTRY_POINT,
            profile: &profiles.vertex,
            defines,
            optimize: true,
        },
    )
    .map_err(|e| split_errors(&e))?;

    let pixel = compile_stage_with_retry(
        compiler,
        StageRequest {
            source,
            entry_point: PIXEL_ENTRY_POINT,
            profile: &profiles.pixel,
            defines,
            optimize: true,
        },
    )
    .map_err(|e| split_errors(&e))?;

    Ok(ProgramOutput { vertex, pixel })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Fails optimized pixel compiles, records every request.
    #[derive(Default)]
    struct FlakyCompiler {
        calls: Mutex<Vec<(String, bool)>>,
    }

    impl PlatformCompiler for FlakyCompiler {
        fn compile_stage(&self, request: &StageRequest<'_>) -> Result<StageOutput, String> {
            self.calls
                .lock()
                .unwrap()
                .push((request.entry_point.to_string(), request.optimize));
            if request.entry_point == PIXEL_ENTRY_POINT && request.optimize {
                return Err("error X5608: too many instructions".to_string());
            }
            Ok(StageOutput {
                code: request.entry_point.as_bytes().to_vec(),
                instruction_count: 10,
                parameters: Vec::new(),
            })
        }
    }

    fn profiles() -> StageProfiles {
        StageProfiles {
            vertex: "vs_3_0".to_string(),
            pixel: "ps_3_0".to_string(),
        }
    }

    #[test]
    fn pixel_stage_is_retried_without_optimization() {
        let compiler = FlakyCompiler::default();
        let output =
            compile_program(&compiler, "src", &ShaderDefines::new(), &profiles()).unwrap();

        assert_eq!(output.pixel.code, b"pixelShader".to_vec());
        let calls = compiler.calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec![
                ("vertexShader".to_string(), true),
                ("pixelShader".to_string(), true),
                ("pixelShader".to_string(), false),
            ]
        );
    }

    struct BrokenCompiler;

    impl PlatformCompiler for BrokenCompiler {
        fn compile_stage(&self, _request: &StageRequest<'_>) -> Result<StageOutput, String> {
            Err("line 3: undeclared identifier\n\nline 9: syntax error\n".to_string())
        }
    }

    #[test]
    fn diagnostics_split_into_lines() {
        let errors =
            compile_program(&BrokenCompiler, "src", &ShaderDefines::new(), &profiles()).unwrap_err();
        assert_eq!(
            errors,
            vec![
                "line 3: undeclared identifier".to_string(),
                "line 9: syntax error".to_string()
            ]
        );
    }
}
