//! Procedural mesh generation.

pub use self::icosphere::icosphere;
pub use self::render_mesh::RenderMesh;
pub use self::starfield::{starfield, STARFIELD_MAX_RADIUS, STARFIELD_MIN_RADIUS};

mod icosphere;
pub mod render_mesh;
mod starfield;
pub mod utils;
