//! TrueType and OpenType fonts.

use crate::error::{Error, Result};
use std::sync::Arc;

/// A font, parsed once and shared.
pub struct Font {
    font: rusttype::Font<'static>,
}

impl Font {
    /// Parses a TrueType or OpenType font.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Arc<Font>> {
        let len = bytes.len();
        let font = rusttype::Font::try_from_vec(bytes)
            .ok_or_else(|| Error::FontParse(format!("{len} bytes are not a TrueType or OpenType font")))?;

        log::debug!("parsed font with {} glyphs", font.glyph_count());
        Ok(Arc::new(Font { font }))
    }

    /// The underlying rusttype font.
    #[inline]
    pub fn font(&self) -> &rusttype::Font<'static> {
        &self.font
    }

    /// Design units per em. Outlines are expressed in these units.
    #[inline]
    pub fn units_per_em(&self) -> f32 {
        self.font.units_per_em() as f32
    }

    /// The `rusttype` scale giving one em a height of `size`.
    pub fn scale_for_em(&self, size: f32) -> rusttype::Scale {
        let v = self.font.v_metrics_unscaled();
        let units = (v.ascent - v.descent).max(f32::EPSILON);
        rusttype::Scale::uniform(size * units / self.units_per_em())
    }

    /// Distance between two baselines for an em of `size`.
    pub fn line_height(&self, size: f32) -> f32 {
        let v = self.font.v_metrics(self.scale_for_em(size));
        v.ascent - v.descent + v.line_gap
    }

    /// Unique identifier of the font behind `font`.
    pub fn uid(font: &Arc<Font>) -> usize {
        Arc::as_ptr(font) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_is_not_a_font() {
        let err = Font::from_bytes(b"{\"glyphs\": {}}".to_vec()).err();
        assert!(matches!(err, Some(Error::FontParse(_))));
        assert!(matches!(Font::from_bytes(Vec::new()), Err(Error::FontParse(_))));
    }
}
