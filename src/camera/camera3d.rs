use crate::event::WindowEvent;
use glamx::{Mat4, Pose3, Vec3};

/// Trait that all camera implementations must implement.
///
/// Cameras control the viewpoint from which the scene is rendered. They react
/// to window events, advance their own state once per frame, and expose the
/// matrices materials need.
pub trait Camera3d {
    /// Handles a window event.
    ///
    /// Pointer events drive the camera; `FramebufferSize` updates the
    /// projection through [`Camera3d::resize`].
    fn handle_event(&mut self, event: &WindowEvent);

    /// The camera position in world space.
    fn eye(&self) -> Vec3;

    /// The view transformation (world space to camera space).
    fn view_transform(&self) -> Pose3;

    /// The projection matrix alone.
    fn projection(&self) -> Mat4;

    /// Projection times view.
    fn transformation(&self) -> Mat4;

    /// Inverse of [`Camera3d::transformation`].
    fn inverse_transformation(&self) -> Mat4;

    /// `(znear, zfar)`.
    fn clip_planes(&self) -> (f32, f32);

    /// Width over height of the viewport the projection was built for.
    fn aspect(&self) -> f32;

    /// Rebuilds the projection for a viewport of `width` × `height` pixels.
    ///
    /// Zero-sized viewports are ignored.
    fn resize(&mut self, width: u32, height: u32);

    /// Advances the camera by one frame.
    ///
    /// Cameras with inertia integrate one step of motion here, so this must be
    /// called exactly once per rendered frame.
    fn update(&mut self);
}
