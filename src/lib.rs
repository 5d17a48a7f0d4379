/*!
# globe3d

Small retained-mode 3D scenes on wgpu.

A scene is a tree of [`SceneNode3d`](scene::SceneNode3d)s carrying meshes,
lights and transforms. Every mesh is drawn by one of three built-in materials:

* `surface`: unlit, Phong or physically based shading, with color, specular,
  bump and alpha maps, wireframes and additive blending.
* `fresnel`: a view-dependent rim glow, for atmospheres.
* `points`: round point sprites, for starfields.

The [`app`] module ties a [`Window`](window::Window), a scene and an
[`OrbitCamera3d`](camera::OrbitCamera3d) into a render loop that applies
asynchronously loaded assets between frames and spins nodes at a constant
rate per tick.

```no_run
use globe3d::prelude::*;

async fn run() -> globe3d::error::Result<()> {
    let window = Window::new("globe3d: icosphere").await?;
    let mut app = App::new(window, OrbitCamera3d::default(), "assets");

    let _ = app.scene.add_light(Light::hemisphere(color::from_hex(0x0099ff), color::from_hex(0xaa5500)));
    let ball = app.scene.add_mesh(
        procedural::icosphere(1.0, 5),
        SurfaceParams::standard(color::WHITE).with_flat_shading(true),
    );
    app.render_loop.spin_y(&ball, 0.001);

    app.run().await;
    Ok(())
}

fn main() {
    #[cfg(not(target_arch = "wasm32"))]
    if let Err(e) = globe3d::pollster::block_on(run()) {
        log::error!("{e}");
    }
    #[cfg(target_arch = "wasm32")]
    globe3d::wasm_bindgen_futures::spawn_local(async {
        if let Err(e) = run().await {
            log::error!("{e}");
        }
    });
}
```

The same code runs natively and on the web:

* **On native**: the async entry point is driven with `pollster::block_on`
* **On WASM**: it is spawned on the browser's event loop, and every frame
  waits for `requestAnimationFrame`

Default controls:

* `left click + drag`: orbit around the target.
* `right click + drag`: move the target.
* `scroll` or `pinch`: zoom in / zoom out, within the distance bounds.
*/
#![allow(non_upper_case_globals)]
#![allow(missing_copy_implementations)]
#![allow(clippy::module_inception)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]

#[macro_use]
extern crate bitflags;

pub use glamx;

#[cfg(not(target_arch = "wasm32"))]
#[doc(hidden)]
pub use pollster;

#[cfg(target_arch = "wasm32")]
#[doc(hidden)]
pub use wasm_bindgen_futures;

pub mod app;
pub mod builtin;
pub mod camera;
pub mod color;
pub mod context;
pub mod error;
pub mod event;
pub mod light;
pub mod procedural;
pub mod resource;
pub mod scene;
pub mod text;
pub mod window;

pub mod prelude {
    pub use crate::app::*;
    pub use crate::builtin::*;
    pub use crate::camera::*;
    pub use crate::color::{self, Color};
    pub use crate::context::*;
    pub use crate::error::{Error, Result};
    pub use crate::event::*;
    pub use crate::light::*;
    pub use crate::procedural::{self, RenderMesh};
    pub use crate::resource::*;
    pub use crate::scene::*;
    pub use crate::text::*;
    pub use crate::window::*;
    pub use glamx::{Mat3, Mat4, Pose3, Quat, Vec2, Vec3};
    pub use std::cell::RefCell;
    pub use std::rc::Rc;
}
