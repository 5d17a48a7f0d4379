//! Errors raised while loading assets and building scenes.

use std::path::PathBuf;
use thiserror::Error;

/// Everything that can go wrong outside of the GPU itself.
///
/// None of these are fatal to the render loop: asset failures are logged and
/// the affected layer keeps its placeholder.
#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("failed to decode image {path}: {source}")]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("invalid font data: {0}")]
    FontParse(String),

    #[error("glyph tessellation failed: {0}")]
    Tessellation(String),

    #[error("text produced no geometry")]
    EmptyText,

    #[error("invalid options: {0}")]
    OptionsParse(String),

    #[error("surface error: {0}")]
    Surface(String),
}

/// Result type used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_asset() {
        let err = Error::Io {
            path: PathBuf::from("assets/earth.jpg"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert_eq!(err.to_string(), "failed to read assets/earth.jpg: missing");
        assert_eq!(Error::EmptyText.to_string(), "text produced no geometry");
    }
}
