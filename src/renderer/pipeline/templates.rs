//! Shader Template Environment
//!
//! HLSL templates are embedded with `rust-embed` and rendered with
//! `minijinja` using a custom delimiter set that stays out of HLSL's way:
//!
//! | Construct | Syntax |
//! |-----------|--------|
//! | Block     | `{$ include "file.hlsl" $}` |
//! | Variable  | `{{ name }}` |
//! | Line statement | `$$ if cond` |
//!
//! Undefined variables are a hard error, so a template and the generator can
//! never silently disagree about a placeholder.

use std::borrow::Cow;
use std::sync::OnceLock;

use minijinja::{Environment, Error, ErrorKind, UndefinedBehavior, syntax::SyntaxConfig};
use rust_embed::RustEmbed;

use crate::errors::Result;

static SHADER_ENV: OnceLock<Environment<'static>> = OnceLock::new();

#[derive(RustEmbed)]
#[folder = "src/renderer/pipeline/shaders"]
struct ShaderAssets;

fn build_env() -> Result<Environment<'static>> {
    let mut env = Environment::new();

    let syntax = SyntaxConfig::builder()
        .block_delimiters("{$", "$}")
        .variable_delimiters("{{", "}}")
        .line_statement_prefix("$$")
        .build()?;

    env.set_syntax(syntax);
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_loader(shader_loader);

    Ok(env)
}

/// The shared template environment, built on first use.
pub fn get_env() -> Result<&'static Environment<'static>> {
    if let Some(env) = SHADER_ENV.get() {
        return Ok(env);
    }
    let env = build_env()?;
    Ok(SHADER_ENV.get_or_init(|| env))
}

fn shader_loader(name: &str) -> std::result::Result<Option<String>, Error> {
    let filename = if std::path::Path::new(name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("hlsl"))
    {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("{name}.hlsl"))
    };

    // Debug builds read straight from disk so template edits apply without
    // a rebuild.
    #[cfg(debug_assertions)]
    {
        let path = std::path::Path::new("src/renderer/pipeline/shaders").join(filename.as_ref());
        if path.exists() {
            return match std::fs::read_to_string(&path) {
                Ok(source) => Ok(Some(source)),
                Err(e) => Err(Error::new(
                    ErrorKind::TemplateNotFound,
                    format!("Failed to read file: {e}"),
                )),
            };
        }
    }

    if let Some(file) = ShaderAssets::get(&filename)
        && let Ok(source) = std::str::from_utf8(file.data.as_ref())
    {
        return Ok(Some(source.to_string()));
    }

    Ok(None)
}
