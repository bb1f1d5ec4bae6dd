//! Renderer Settings
//!
//! Device capabilities and compile options consumed by the shader
//! compilation context.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use shadegraph::renderer::{CompileMode, RendererConfig};
//!
//! // Defaults: shader model 3 profiles, inline compilation
//! let config = RendererConfig::default();
//!
//! // Background compilation on a device with FP filtering
//! let config = RendererConfig::default()
//!     .with_compile_mode(CompileMode::Background)
//!     .with_fp_filtering(true);
//!
//! // Or from a JSON file
//! let config = RendererConfig::from_json(r#"{ "compile_mode": "Background" }"#)?;
//! ```

use serde::Deserialize;

use crate::errors::Result;
use crate::resources::ShaderDefines;

// ---------------------------------------------------------------------------
// CompileMode
// ---------------------------------------------------------------------------

/// Where platform compiles run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum CompileMode {
    /// Compiles run on the owning thread, deferred to the first poll.
    #[default]
    Inline,
    /// Compiles run on a dedicated worker thread.
    Background,
}

// ---------------------------------------------------------------------------
// RendererConfig
// ---------------------------------------------------------------------------

/// Configuration of the shader compilation context.
///
/// # Fields
///
/// | Field                     | Description                                  | Default  |
/// |---------------------------|----------------------------------------------|----------|
/// | `supports_fp_filtering`   | Device filters floating-point textures       | `false`  |
/// | `supports_hw_shadow_maps` | Device has hardware shadow-map comparison    | `false`  |
/// | `vertex_profile`          | Target profile of vertex stages              | `vs_3_0` |
/// | `pixel_profile`           | Target profile of pixel stages               | `ps_3_0` |
/// | `compile_mode`            | Inline or background platform compiles       | `Inline` |
/// | `dump_generated_source`   | Log every generated source at debug level    | `false`  |
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    // === Device Capabilities ===
    pub supports_fp_filtering: bool,
    pub supports_hw_shadow_maps: bool,

    // === Compilation ===
    pub vertex_profile: String,
    pub pixel_profile: String,
    pub compile_mode: CompileMode,

    // === Diagnostics ===
    pub dump_generated_source: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            supports_fp_filtering: false,
            supports_hw_shadow_maps: false,
            vertex_profile: "vs_3_0".to_string(),
            pixel_profile: "ps_3_0".to_string(),
            compile_mode: CompileMode::Inline,
            dump_generated_source: false,
        }
    }
}

impl RendererConfig {
    /// Parses a configuration; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    #[must_use]
    pub fn with_fp_filtering(mut self, supported: bool) -> Self {
        self.supports_fp_filtering = supported;
        self
    }

    #[must_use]
    pub fn with_hw_shadow_maps(mut self, supported: bool) -> Self {
        self.supports_hw_shadow_maps = supported;
        self
    }

    #[must_use]
    pub fn with_compile_mode(mut self, mode: CompileMode) -> Self {
        self.compile_mode = mode;
        self
    }

    #[must_use]
    pub fn with_dump_generated_source(mut self, dump: bool) -> Self {
        self.dump_generated_source = dump;
        self
    }

    /// Capability defines every compile receives.
    #[must_use]
    pub fn base_defines(&self) -> ShaderDefines {
        let mut defines = ShaderDefines::with_capacity(2);
        defines.set_flag("SUPPORTS_FP_FILTERING", self.supports_fp_filtering);
        defines.set_flag("SUPPORTS_HW_SHADOWMAP", self.supports_hw_shadow_maps);
        defines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_overrides_only_given_fields() {
        let config = RendererConfig::from_json(
            r#"{ "supports_hw_shadow_maps": true, "compile_mode": "Background" }"#,
        )
        .unwrap();

        assert!(config.supports_hw_shadow_maps);
        assert!(!config.supports_fp_filtering);
        assert_eq!(config.compile_mode, CompileMode::Background);
        assert_eq!(config.pixel_profile, "ps_3_0");
    }

    #[test]
    fn base_defines_reflect_capabilities() {
        let defines = RendererConfig::default().with_fp_filtering(true).base_defines();
        assert_eq!(defines.get("SUPPORTS_FP_FILTERING"), Some("1"));
        assert_eq!(defines.get("SUPPORTS_HW_SHADOWMAP"), Some("0"));
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(RendererConfig::from_json("{ not json").is_err());
    }
}
