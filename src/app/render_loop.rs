use crate::app::loader::AssetLoader;
use crate::app::pending::PendingQueue;
use crate::app::spin::Spin;
use crate::camera::Camera3d;
use crate::scene::SceneNode3d;
use std::path::PathBuf;

/// Everything that changes between two frames: asynchronous completions,
/// animations and the camera controller.
pub struct RenderLoop {
    spins: Vec<Spin>,
    pending: PendingQueue,
    loader: AssetLoader,
    ticks: u64,
}

impl RenderLoop {
    /// A loop loading assets relative to `asset_root`.
    pub fn new(asset_root: impl Into<PathBuf>) -> RenderLoop {
        let pending = PendingQueue::new();
        RenderLoop {
            spins: Vec::new(),
            loader: AssetLoader::new(asset_root, pending.clone()),
            pending,
            ticks: 0,
        }
    }

    pub fn add_spin(&mut self, spin: Spin) {
        self.spins.push(spin);
    }

    /// Spins `node` around its vertical axis by `increment` radians per tick.
    pub fn spin_y(&mut self, node: &SceneNode3d, increment: f32) {
        self.add_spin(Spin::around_y(node, increment))
    }

    pub fn spins(&self) -> &[Spin] {
        &self.spins
    }

    /// The queue of changes applied at the start of the next tick.
    pub fn pending(&self) -> &PendingQueue {
        &self.pending
    }

    pub fn loader(&mut self) -> &mut AssetLoader {
        &mut self.loader
    }

    /// Number of ticks run so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Runs one tick: applies the queued changes in arrival order, advances
    /// every spin, then steps the camera controller once.
    pub fn advance(&mut self, camera: &mut dyn Camera3d) {
        let _ = self.loader.poll();
        let applied = self.pending.apply_all();
        if applied > 0 {
            log::debug!("applied {applied} pending change(s) at tick {}", self.ticks);
        }

        for spin in &mut self.spins {
            spin.tick();
        }

        camera.update();
        self.ticks += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{OrbitCamera3d, OrbitControls};
    use crate::event::{Action, Modifiers, MouseButton, WindowEvent};
    use glamx::Quat;

    #[test]
    fn insertions_queued_during_a_tick_show_up_at_the_next() {
        let root = SceneNode3d::empty();
        let mut render_loop = RenderLoop::new("assets");
        let mut camera = OrbitCamera3d::default();

        render_loop.advance(&mut camera);
        render_loop.pending().insert(&root, SceneNode3d::empty());
        assert_eq!(root.data().children().len(), 0);

        render_loop.advance(&mut camera);
        assert_eq!(root.data().children().len(), 1);
        assert_eq!(render_loop.ticks(), 2);
    }

    #[test]
    fn spins_advance_once_per_tick() {
        let (parent, child) = (SceneNode3d::empty(), SceneNode3d::empty());
        let mut render_loop = RenderLoop::new("assets");
        render_loop.spin_y(&parent, 0.002);
        render_loop.spin_y(&child, 0.0023);

        let mut camera = OrbitCamera3d::default();
        for _ in 0..10 {
            render_loop.advance(&mut camera);
        }

        assert!(parent.rotation().angle_between(Quat::from_rotation_y(0.02)) < 1e-5);
        assert!(child.rotation().angle_between(Quat::from_rotation_y(0.023)) < 1e-5);
    }

    #[test]
    fn the_controller_steps_once_per_tick() {
        let mut camera = OrbitCamera3d::default()
            .with_controls(OrbitControls::with_distance_bounds(1.4, 5.0).with_damping(0.05));
        camera.handle_event(&WindowEvent::CursorPos(100.0, 100.0, Modifiers::empty()));
        camera.handle_event(&WindowEvent::MouseButton(
            MouseButton::Button1,
            Action::Press,
            Modifiers::empty(),
        ));
        camera.handle_event(&WindowEvent::CursorPos(140.0, 100.0, Modifiers::empty()));

        let yaw = camera.yaw();
        let mut render_loop = RenderLoop::new("assets");
        render_loop.advance(&mut camera);
        assert_ne!(camera.yaw(), yaw);
    }
}
