//! Linear colour helpers.
//!
//! CPU-side material values are linear RGBA stored in a [`Vec4`].

use glam::Vec4;

/// Exponent used to convert authored 8-bit colours into linear space.
pub const SRGB_GAMMA: f32 = 2.2;

pub const BLACK: Vec4 = Vec4::ZERO;
pub const WHITE: Vec4 = Vec4::ONE;

/// Converts an 8-bit authored colour to linear space.
///
/// RGB go through the 2.2 power curve; alpha is scaled linearly.
#[must_use]
pub fn linear_from_srgb8(rgba: [u8; 4]) -> Vec4 {
    let channel = |c: u8| (f32::from(c) / 255.0).powf(SRGB_GAMMA);
    Vec4::new(
        channel(rgba[0]),
        channel(rgba[1]),
        channel(rgba[2]),
        f32::from(rgba[3]) / 255.0,
    )
}

/// The mid grey used as the default diffuse and specular colour.
#[must_use]
pub fn default_grey() -> Vec4 {
    linear_from_srgb8([128, 128, 128, 255])
}
