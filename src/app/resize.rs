use crate::camera::Camera3d;

/// A drawable surface whose backing size can change.
pub trait ResizableSurface {
    /// Current size, in physical pixels.
    fn surface_size(&self) -> (u32, u32);

    /// Resizes the surface and its attachments.
    fn resize_surface(&mut self, width: u32, height: u32);
}

/// Brings the camera projection and the surface to a new viewport size.
///
/// Zero-sized requests (a minimized window) are ignored, and repeating a
/// request changes nothing.
pub fn resize<S: ResizableSurface + ?Sized>(
    camera: &mut dyn Camera3d,
    surface: &mut S,
    width: u32,
    height: u32,
) {
    if width == 0 || height == 0 {
        log::debug!("ignoring resize to {width}x{height}");
        return;
    }

    camera.resize(width, height);
    if surface.surface_size() != (width, height) {
        surface.resize_surface(width, height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::OrbitCamera3d;

    struct FakeSurface {
        size: (u32, u32),
        resizes: usize,
    }

    impl ResizableSurface for FakeSurface {
        fn surface_size(&self) -> (u32, u32) {
            self.size
        }

        fn resize_surface(&mut self, width: u32, height: u32) {
            self.size = (width, height);
            self.resizes += 1;
        }
    }

    fn surface() -> FakeSurface {
        FakeSurface {
            size: (800, 600),
            resizes: 0,
        }
    }

    #[test]
    fn aspect_and_surface_follow_the_new_size() {
        let mut camera = OrbitCamera3d::default();
        let mut surface = surface();
        resize(&mut camera, &mut surface, 1920, 1080);

        assert_eq!(camera.aspect(), 1920.0 / 1080.0);
        assert_eq!(surface.size, (1920, 1080));
    }

    #[test]
    fn repeated_resizes_are_idempotent() {
        let mut camera = OrbitCamera3d::default();
        let mut surface = surface();
        resize(&mut camera, &mut surface, 1024, 768);
        let projection = camera.projection();

        resize(&mut camera, &mut surface, 1024, 768);
        assert_eq!(surface.resizes, 1);
        assert_eq!(camera.projection(), projection);
    }

    #[test]
    fn zero_sizes_are_ignored() {
        let mut camera = OrbitCamera3d::default();
        let mut surface = surface();
        let aspect = camera.aspect();

        resize(&mut camera, &mut surface, 0, 600);
        resize(&mut camera, &mut surface, 800, 0);
        assert_eq!(surface.resizes, 0);
        assert_eq!(camera.aspect(), aspect);
    }
}
