//! Everything related to the scene graph.

pub use self::object3d::{Object3d, ObjectData3d};
pub use self::scene_node3d::{RenderPhase, SceneNode3d, SceneNodeData3d};

mod object3d;
mod scene_node3d;
