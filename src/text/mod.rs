//! Fonts and extruded 3D text.

pub use self::extrude::{extrude_contours, extrude_text, glyph_contours, TextGeometry};
pub use self::font::Font;

mod extrude;
mod font;
