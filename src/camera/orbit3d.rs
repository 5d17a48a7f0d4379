use crate::camera::Camera3d;
use crate::event::{Action, Modifiers, MouseButton, TouchAction, WindowEvent};
use glamx::{Mat4, Pose3, Vec2, Vec3};
use std::f32;

/// Keeps the camera from flipping over the poles.
const PITCH_EPSILON: f32 = 1.0e-4;
/// Residual motion below this is considered settled.
const SETTLE_EPSILON: f32 = 1.0e-9;

/// Configuration of the orbit controller.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct OrbitControls {
    /// Closest allowed distance to the target.
    pub min_distance: f32,
    /// Farthest allowed distance to the target.
    pub max_distance: f32,
    /// Damping factor in (0, 1), or `None` to stop as soon as the input stops.
    pub damping: Option<f32>,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    /// Button that rotates around the target. `None` disables rotation.
    pub rotate_button: Option<MouseButton>,
    /// Button that pans the target. `None` disables panning.
    pub pan_button: Option<MouseButton>,
}

impl Default for OrbitControls {
    fn default() -> Self {
        OrbitControls {
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            damping: None,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
            rotate_button: Some(MouseButton::Button1),
            pan_button: Some(MouseButton::Button2),
        }
    }
}

impl OrbitControls {
    /// Controls that keep the camera between `min_distance` and `max_distance`.
    pub fn with_distance_bounds(min_distance: f32, max_distance: f32) -> Self {
        OrbitControls {
            min_distance,
            max_distance,
            ..Default::default()
        }
    }

    /// Enables inertia with the given damping factor.
    pub fn with_damping(mut self, factor: f32) -> Self {
        self.damping = Some(factor.clamp(f32::EPSILON, 1.0));
        self
    }
}

/// Camera orbiting a target point, driven by pointer drag and wheel or pinch.
///
/// # Default Controls
/// - **Left mouse + drag**: rotate around the target
/// - **Right mouse + drag** (or **Ctrl + left drag**): pan the target
/// - **Mouse wheel** or **pinch**: move closer or farther, within the distance bounds
/// - **One finger drag**: rotate
///
/// With damping enabled, releasing the pointer leaves a residual velocity that
/// decays each time [`Camera3d::update`] runs. Call it once per frame or the
/// motion never settles.
#[derive(Clone, Debug, PartialEq)]
pub struct OrbitCamera3d {
    target: Vec3,
    /// Angle around the up axis, 0 looking from +Z.
    yaw: f32,
    /// Angle from the up axis.
    pitch: f32,
    dist: f32,
    controls: OrbitControls,

    delta_yaw: f32,
    delta_pitch: f32,
    pan_offset: Vec3,
    zoom_scale: f32,

    fov: f32,
    znear: f32,
    zfar: f32,
    viewport: Vec2,

    pressed: [bool; MouseButton::Button5 as usize + 1],
    modifiers: Modifiers,
    last_cursor_pos: Option<Vec2>,
    touches: Vec<(u64, Vec2)>,

    proj: Mat4,
    view: Mat4,
    proj_view: Mat4,
    inverse_proj_view: Mat4,
}

impl Default for OrbitCamera3d {
    fn default() -> Self {
        OrbitCamera3d::new(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO)
    }
}

impl OrbitCamera3d {
    /// A camera at `eye` looking at `at`, with a 45° field of view.
    pub fn new(eye: Vec3, at: Vec3) -> OrbitCamera3d {
        OrbitCamera3d::new_with_frustum(f32::consts::FRAC_PI_4, 0.1, 1024.0, eye, at)
    }

    /// A camera at `eye` looking at `at`.
    ///
    /// # Arguments
    /// * `fov` - vertical field of view, in radians
    /// * `znear` - near clipping plane distance
    /// * `zfar` - far clipping plane distance
    pub fn new_with_frustum(fov: f32, znear: f32, zfar: f32, eye: Vec3, at: Vec3) -> OrbitCamera3d {
        let mut res = OrbitCamera3d {
            target: at,
            yaw: 0.0,
            pitch: f32::consts::FRAC_PI_2,
            dist: 1.0,
            controls: OrbitControls::default(),
            delta_yaw: 0.0,
            delta_pitch: 0.0,
            pan_offset: Vec3::ZERO,
            zoom_scale: 1.0,
            fov,
            znear,
            zfar,
            viewport: Vec2::new(800.0, 600.0),
            pressed: [false; MouseButton::Button5 as usize + 1],
            modifiers: Modifiers::empty(),
            last_cursor_pos: None,
            touches: Vec::new(),
            proj: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            proj_view: Mat4::IDENTITY,
            inverse_proj_view: Mat4::IDENTITY,
        };

        res.look_at(eye, at);
        res
    }

    /// Replaces the controller configuration, clamping the current distance to the new bounds.
    pub fn set_controls(&mut self, controls: OrbitControls) {
        self.controls = controls;
        self.dist = self.clamp_distance(self.dist);
        self.update_projviews();
    }

    /// Builder form of [`OrbitCamera3d::set_controls`].
    pub fn with_controls(mut self, controls: OrbitControls) -> Self {
        self.set_controls(controls);
        self
    }

    pub fn controls(&self) -> &OrbitControls {
        &self.controls
    }

    /// Moves the camera to `eye` and makes it look at `at`.
    pub fn look_at(&mut self, eye: Vec3, at: Vec3) {
        let offset = eye - at;
        let dist = offset.length();

        self.target = at;
        self.dist = self.clamp_distance(dist);
        if dist > 0.0 {
            self.yaw = offset.x.atan2(offset.z);
            self.pitch = (offset.y / dist).clamp(-1.0, 1.0).acos();
        }
        self.update_restrictions();
        self.update_projviews();
    }

    /// The point the camera orbits around.
    pub fn at(&self) -> Vec3 {
        self.target
    }

    /// Current distance between the eye and the target.
    pub fn dist(&self) -> f32 {
        self.dist
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn fov(&self) -> f32 {
        self.fov
    }

    /// Size of the viewport the projection was last built for.
    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }

    /// Magnitude of the rotation the next [`Camera3d::update`] applies, in radians.
    pub fn angular_velocity(&self) -> f32 {
        let factor = self.controls.damping.unwrap_or(1.0);
        Vec2::new(self.delta_yaw, self.delta_pitch).length() * factor
    }

    /// Whether some input is still waiting to be integrated.
    pub fn is_moving(&self) -> bool {
        self.delta_yaw != 0.0
            || self.delta_pitch != 0.0
            || self.pan_offset != Vec3::ZERO
            || self.zoom_scale != 1.0
    }

    /// Rotates by the angle a drag of `dpos` pixels maps to.
    ///
    /// A drag across the full viewport height is one full turn.
    pub fn handle_rotate_displacement(&mut self, dpos: Vec2) {
        let height = self.viewport.y.max(1.0);
        let full_turn = f32::consts::TAU * self.controls.rotate_speed / height;
        self.delta_yaw -= dpos.x * full_turn;
        self.delta_pitch -= dpos.y * full_turn;
    }

    /// Moves the target by the world distance a drag of `dpos` pixels covers at the target depth.
    pub fn handle_pan_displacement(&mut self, dpos: Vec2) {
        let height = self.viewport.y.max(1.0);
        let visible_height = 2.0 * self.dist * (self.fov / 2.0).tan();
        let world_per_pixel = visible_height / height * self.controls.pan_speed;

        let view_to_world = self.view_transform().inverse();
        let left = view_to_world.rotation * -Vec3::X;
        let up = view_to_world.rotation * Vec3::Y;

        self.pan_offset += left * (dpos.x * world_per_pixel) + up * (dpos.y * world_per_pixel);
    }

    /// Handles one wheel step. Positive values move the camera closer.
    pub fn handle_scroll(&mut self, yoff: f32) {
        let step = 0.95f32.powf(self.controls.zoom_speed);
        if yoff > 0.0 {
            self.zoom_scale *= step;
        } else if yoff < 0.0 {
            self.zoom_scale /= step;
        }
    }

    /// Requests the distance to be multiplied by `scale` on the next update.
    ///
    /// The result is clamped to the controller bounds.
    pub fn zoom_by(&mut self, scale: f32) {
        if scale > 0.0 && scale.is_finite() {
            self.zoom_scale *= scale;
        }
    }

    fn clamp_distance(&self, dist: f32) -> f32 {
        dist.max(self.controls.min_distance)
            .min(self.controls.max_distance)
    }

    fn update_restrictions(&mut self) {
        self.pitch = self
            .pitch
            .clamp(PITCH_EPSILON, f32::consts::PI - PITCH_EPSILON);
        self.dist = self.clamp_distance(self.dist);
    }

    fn update_projviews(&mut self) {
        let aspect = self.aspect();
        self.view = self.view_transform().to_mat4();
        self.proj = Mat4::perspective_rh(self.fov, aspect, self.znear, self.zfar);
        self.proj_view = self.proj * self.view;
        self.inverse_proj_view = self.proj_view.inverse();
    }

    fn handle_cursor(&mut self, curr_pos: Vec2) {
        if let Some(last) = self.last_cursor_pos {
            let dpos = curr_pos - last;
            let ctrl = self.modifiers.contains(Modifiers::Control);

            let rotating = self.is_pressed(self.controls.rotate_button);
            let panning = self.is_pressed(self.controls.pan_button);

            if panning || (rotating && ctrl) {
                self.handle_pan_displacement(dpos);
            } else if rotating {
                self.handle_rotate_displacement(dpos);
            }
        }

        self.last_cursor_pos = Some(curr_pos);
    }

    fn is_pressed(&self, button: Option<MouseButton>) -> bool {
        button.is_some_and(|b| self.pressed[b as usize])
    }

    fn handle_touch(&mut self, id: u64, pos: Vec2, action: TouchAction) {
        match action {
            TouchAction::Start => {
                self.touches.retain(|(tid, _)| *tid != id);
                self.touches.push((id, pos));
            }
            TouchAction::Move => {
                let Some(index) = self.touches.iter().position(|(tid, _)| *tid == id) else {
                    return;
                };

                match self.touches.len() {
                    1 => {
                        let dpos = pos - self.touches[0].1;
                        self.handle_rotate_displacement(dpos);
                    }
                    2 => {
                        let other = self.touches[1 - index].1;
                        let before = (self.touches[index].1 - other).length();
                        let after = (pos - other).length();
                        if before > 0.0 && after > 0.0 {
                            self.zoom_by(before / after);
                        }
                    }
                    _ => {}
                }

                self.touches[index].1 = pos;
            }
            TouchAction::End | TouchAction::Cancel => {
                self.touches.retain(|(tid, _)| *tid != id);
            }
        }
    }
}

impl Camera3d for OrbitCamera3d {
    fn handle_event(&mut self, event: &WindowEvent) {
        match *event {
            WindowEvent::CursorPos(x, y, modifiers) => {
                self.modifiers = modifiers;
                self.handle_cursor(Vec2::new(x as f32, y as f32));
            }
            WindowEvent::MouseButton(button, action, modifiers) => {
                self.modifiers = modifiers;
                self.pressed[button as usize] = action == Action::Press;
            }
            WindowEvent::Scroll(_, off, _) => self.handle_scroll(off as f32),
            WindowEvent::Touch(id, x, y, action, _) => {
                self.handle_touch(id, Vec2::new(x as f32, y as f32), action)
            }
            WindowEvent::FramebufferSize(w, h) => self.resize(w, h),
            WindowEvent::Close => {}
        }
    }

    fn eye(&self) -> Vec3 {
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        self.target
            + Vec3::new(sin_pitch * sin_yaw, cos_pitch, sin_pitch * cos_yaw) * self.dist
    }

    fn view_transform(&self) -> Pose3 {
        Pose3::look_at_rh(self.eye(), self.target, Vec3::Y)
    }

    fn projection(&self) -> Mat4 {
        self.proj
    }

    fn transformation(&self) -> Mat4 {
        self.proj_view
    }

    fn inverse_transformation(&self) -> Mat4 {
        self.inverse_proj_view
    }

    fn clip_planes(&self) -> (f32, f32) {
        (self.znear, self.zfar)
    }

    fn aspect(&self) -> f32 {
        self.viewport.x / self.viewport.y
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }

        self.viewport = Vec2::new(width as f32, height as f32);
        self.update_projviews();
    }

    fn update(&mut self) {
        let factor = self.controls.damping.unwrap_or(1.0);

        self.yaw += self.delta_yaw * factor;
        self.pitch += self.delta_pitch * factor;
        self.target += self.pan_offset * factor;
        self.dist *= self.zoom_scale;
        self.zoom_scale = 1.0;
        self.update_restrictions();

        if self.controls.damping.is_some() {
            let decay = 1.0 - factor;
            self.delta_yaw *= decay;
            self.delta_pitch *= decay;
            self.pan_offset *= decay;

            if self.delta_yaw.abs() < SETTLE_EPSILON {
                self.delta_yaw = 0.0;
            }
            if self.delta_pitch.abs() < SETTLE_EPSILON {
                self.delta_pitch = 0.0;
            }
            if self.pan_offset.length_squared() < SETTLE_EPSILON * SETTLE_EPSILON {
                self.pan_offset = Vec3::ZERO;
            }
        } else {
            self.delta_yaw = 0.0;
            self.delta_pitch = 0.0;
            self.pan_offset = Vec3::ZERO;
        }

        self.update_projviews();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn earth_camera() -> OrbitCamera3d {
        OrbitCamera3d::new_with_frustum(
            75f32.to_radians(),
            0.1,
            1000.0,
            Vec3::new(0.0, 0.0, 5.0),
            Vec3::ZERO,
        )
        .with_controls(OrbitControls::with_distance_bounds(1.4, 5.0).with_damping(0.05))
    }

    fn drag(camera: &mut OrbitCamera3d, from: Vec2, to: Vec2) {
        let none = Modifiers::empty();
        camera.handle_event(&WindowEvent::CursorPos(from.x as f64, from.y as f64, none));
        camera.handle_event(&WindowEvent::MouseButton(MouseButton::Button1, Action::Press, none));
        camera.handle_event(&WindowEvent::CursorPos(to.x as f64, to.y as f64, none));
        camera.handle_event(&WindowEvent::MouseButton(MouseButton::Button1, Action::Release, none));
    }

    #[test]
    fn starts_on_the_z_axis() {
        let camera = earth_camera();
        assert!((camera.dist() - 5.0).abs() < 1e-6);
        assert!((camera.eye() - Vec3::new(0.0, 0.0, 5.0)).length() < 1e-5);
    }

    #[test]
    fn zoom_request_beyond_max_is_clamped() {
        let mut camera = earth_camera();
        camera.zoom_by(10.0 / camera.dist());
        camera.update();
        assert_eq!(camera.dist(), 5.0);
    }

    #[test]
    fn distance_stays_in_bounds_under_any_wheel_input() {
        let mut camera = earth_camera();

        for _ in 0..500 {
            camera.handle_event(&WindowEvent::Scroll(0.0, 10.0, Modifiers::empty()));
            camera.update();
            assert!(camera.dist() >= 1.4 && camera.dist() <= 5.0);
        }
        assert!((camera.dist() - 1.4).abs() < 1e-5);

        for _ in 0..500 {
            camera.handle_event(&WindowEvent::Scroll(0.0, -10.0, Modifiers::empty()));
            camera.update();
            assert!(camera.dist() >= 1.4 && camera.dist() <= 5.0);
        }
        assert_eq!(camera.dist(), 5.0);
    }

    #[test]
    fn huge_zoom_in_hits_min_distance() {
        let mut camera = earth_camera();
        camera.zoom_by(1.0e-6);
        camera.update();
        assert!((camera.dist() - 1.4).abs() < 1e-6);
    }

    #[test]
    fn damped_velocity_decreases_and_settles() {
        let mut camera = earth_camera();
        camera.resize(800, 800);
        drag(&mut camera, Vec2::new(400.0, 400.0), Vec2::new(404.0, 400.0));

        let mut previous = camera.angular_velocity();
        assert!(previous > 0.0);

        for _ in 0..60 {
            camera.update();
            let current = camera.angular_velocity();
            assert!(current < previous);
            previous = current;
        }

        assert!(previous < 1.0e-4);
    }

    #[test]
    fn undamped_motion_stops_after_one_update() {
        let mut camera = OrbitCamera3d::default()
            .with_controls(OrbitControls::with_distance_bounds(1.2, 5.0));
        drag(&mut camera, Vec2::new(0.0, 0.0), Vec2::new(30.0, 0.0));
        let yaw = camera.yaw();

        camera.update();
        assert!(camera.yaw() < yaw);
        assert!(!camera.is_moving());

        let settled = camera.yaw();
        camera.update();
        assert_eq!(camera.yaw(), settled);
    }

    #[test]
    fn drag_without_button_does_nothing() {
        let mut camera = earth_camera();
        let none = Modifiers::empty();
        camera.handle_event(&WindowEvent::CursorPos(0.0, 0.0, none));
        camera.handle_event(&WindowEvent::CursorPos(100.0, 50.0, none));
        assert!(!camera.is_moving());
    }

    #[test]
    fn pitch_never_flips_over_the_pole() {
        let mut camera = earth_camera();
        camera.handle_rotate_displacement(Vec2::new(0.0, 1.0e5));
        for _ in 0..200 {
            camera.update();
        }
        assert!(camera.pitch() > 0.0 && camera.pitch() < f32::consts::PI);
    }

    #[test]
    fn pinch_zooms_in() {
        let mut camera = earth_camera();
        let none = Modifiers::empty();
        camera.handle_event(&WindowEvent::Touch(1, 100.0, 100.0, TouchAction::Start, none));
        camera.handle_event(&WindowEvent::Touch(2, 200.0, 100.0, TouchAction::Start, none));
        camera.handle_event(&WindowEvent::Touch(2, 300.0, 100.0, TouchAction::Move, none));
        camera.update();
        assert!((camera.dist() - 2.5).abs() < 1e-5);
    }

    #[test]
    fn framebuffer_size_updates_aspect() {
        let mut camera = earth_camera();
        camera.handle_event(&WindowEvent::FramebufferSize(1920, 1080));
        assert_eq!(camera.aspect(), 1920.0 / 1080.0);
        camera.handle_event(&WindowEvent::FramebufferSize(0, 1080));
        assert_eq!(camera.aspect(), 1920.0 / 1080.0);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn controls_read_from_toml() {
        let controls: OrbitControls = toml::from_str(
            r#"
            min_distance = 1.4
            max_distance = 5.0
            damping = 0.05
            rotate_button = "Button3"
            "#,
        )
        .unwrap();

        assert_eq!(controls.rotate_button, Some(MouseButton::Button3));
        assert_eq!(controls.pan_button, Some(MouseButton::Button2));
        assert_eq!(controls.damping, Some(0.05));
        assert_eq!(controls.max_distance, 5.0);
    }
}
