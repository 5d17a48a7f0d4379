//! Colors used by materials and lights.
//!
//! Components are RGBA floats in [0.0, 1.0], sRGB encoded like the hex codes
//! they usually come from. Materials convert them to linear with
//! [`to_linear`] before lighting. Scene descriptions often come as `0xRRGGBB`
//! integers or `#rrggbb` strings, so both forms convert here.

pub use rgb::Rgba;

/// The color type used throughout the crate.
pub type Color = Rgba<f32>;

pub const BLACK: Color = Color::new(0.0, 0.0, 0.0, 1.0);
pub const WHITE: Color = Color::new(1.0, 1.0, 1.0, 1.0);
pub const RED: Color = Color::new(1.0, 0.0, 0.0, 1.0);
pub const GREEN: Color = Color::new(0.0, 1.0, 0.0, 1.0);
pub const BLUE: Color = Color::new(0.0, 0.0, 1.0, 1.0);

/// Builds an opaque color from a `0xRRGGBB` integer.
pub const fn from_hex(hex: u32) -> Color {
    Color::new(
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
        1.0,
    )
}

/// Parses `#rrggbb`, `rrggbb` or `#rgb`.
///
/// Returns `None` for anything else.
pub fn parse_hex(s: &str) -> Option<Color> {
    let digits = s.strip_prefix('#').unwrap_or(s);
    match digits.len() {
        6 => u32::from_str_radix(digits, 16).ok().map(from_hex),
        3 => {
            let short = u32::from_str_radix(digits, 16).ok()?;
            let (r, g, b) = ((short >> 8) & 0xf, (short >> 4) & 0xf, short & 0xf);
            Some(from_hex((r * 17) << 16 | (g * 17) << 8 | (b * 17)))
        }
        _ => None,
    }
}

/// The RGB part of a color, as passed to shaders.
#[inline]
pub fn rgb_array(c: Color) -> [f32; 3] {
    [c.r, c.g, c.b]
}

/// Decodes one sRGB channel.
#[inline]
pub fn srgb_channel_to_linear(c: f32) -> f32 {
    if c < 0.04045 {
        c * 0.0773993808
    } else {
        (c * 0.9478672986 + 0.0521327014).powf(2.4)
    }
}

/// Decodes the RGB channels of an sRGB color. Alpha is kept.
#[inline]
pub fn to_linear(c: Color) -> Color {
    Color::new(
        srgb_channel_to_linear(c.r),
        srgb_channel_to_linear(c.g),
        srgb_channel_to_linear(c.b),
        c.a,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_integer_and_string_agree() {
        let yellow = parse_hex("#fff44f").unwrap();
        assert_eq!(yellow, from_hex(0xfff44f));
        assert_eq!(yellow.r, 1.0);
        assert!((yellow.g - 244.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn short_form_expands() {
        assert_eq!(parse_hex("#fff").unwrap(), WHITE);
        assert_eq!(parse_hex("08f").unwrap(), from_hex(0x0088ff));
    }

    #[test]
    fn linear_decoding_keeps_the_extremes() {
        assert_eq!(to_linear(BLACK), BLACK);
        let white = to_linear(WHITE);
        assert!((white.r - 1.0).abs() < 1e-6 && white.a == 1.0);

        let mid = srgb_channel_to_linear(0.5);
        assert!((mid - 0.214).abs() < 1e-3);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_hex("#12345").is_none());
        assert!(parse_hex("zzzzzz").is_none());
    }
}
