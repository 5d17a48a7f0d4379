//! Camera trait and the orbiting camera.

pub use self::camera3d::Camera3d;
pub use self::orbit3d::{OrbitCamera3d, OrbitControls};

mod camera3d;
mod orbit3d;
