//! The application context: window, scene, camera and the loop animating them.
//!
//! ```no_run
//! # use globe3d::prelude::*;
//! # async fn run() -> globe3d::error::Result<()> {
//! let window = Window::new("globe3d").await?;
//! let mut app = App::new(window, OrbitCamera3d::default(), "assets");
//!
//! let ball = app.scene.add_mesh(procedural::icosphere(1.0, 3), SurfaceParams::standard(color::WHITE));
//! app.render_loop.spin_y(&ball, 0.01);
//! app.run().await;
//! # Ok(()) }
//! ```

pub use self::loader::{AssetLoader, BytesHandler};
pub use self::options::{
    AssetRoot, CameraOptions, EarthOptions, IcosahedronOptions, SceneOptions,
};
pub use self::pending::{PendingChange, PendingQueue};
pub use self::render_loop::RenderLoop;
pub use self::resize::{resize, ResizableSurface};
pub use self::spin::Spin;

mod loader;
mod options;
mod pending;
mod render_loop;
mod resize;
mod spin;

use crate::camera::OrbitCamera3d;
use crate::scene::SceneNode3d;
use crate::window::Window;
use std::path::PathBuf;

/// Everything a running scene needs, owned by the entry point.
pub struct App {
    pub window: Window,
    pub scene: SceneNode3d,
    pub camera: OrbitCamera3d,
    pub render_loop: RenderLoop,
}

impl App {
    /// An empty scene drawn into `window`, loading assets relative to
    /// `asset_root`.
    pub fn new(window: Window, camera: OrbitCamera3d, asset_root: impl Into<PathBuf>) -> App {
        let mut camera = camera;
        let (width, height) = window.size();
        crate::camera::Camera3d::resize(&mut camera, width, height);

        App {
            window,
            scene: SceneNode3d::empty(),
            camera,
            render_loop: RenderLoop::new(asset_root),
        }
    }

    /// Runs one tick: input and resizes, queued changes, animations, the
    /// camera controller, then one draw.
    ///
    /// Returns `false` once the window is closed.
    pub async fn frame(&mut self) -> bool {
        self.window.handle_events(&mut self.camera);
        self.render_loop.advance(&mut self.camera);
        self.window.draw_3d(&mut self.scene, &self.camera).await
    }

    /// Drives [`App::frame`] until the window closes.
    pub async fn run(mut self) {
        while self.frame().await {}
        log::info!("window closed after {} ticks", self.render_loop.ticks());
    }
}
