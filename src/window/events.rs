//! Event handling.

use crate::app;
use crate::camera::Camera3d;
use crate::event::{Action, MouseButton, WindowEvent};

use super::Window;

impl Window {
    /// The state of a mouse button.
    pub fn get_mouse_button(&self, button: MouseButton) -> Action {
        self.canvas.get_mouse_button(button)
    }

    /// The current cursor position, or `None` if it is unknown.
    pub fn cursor_pos(&self) -> Option<(f64, f64)> {
        self.canvas.cursor_pos()
    }

    /// Delivers every event received since the last call.
    ///
    /// Size changes go through [`app::resize`] so the camera and the surface
    /// agree before the next draw. Everything else is given to the camera.
    pub fn handle_events(&mut self, camera: &mut dyn Camera3d) {
        self.canvas.poll_events();

        while let Ok(event) = self.events.try_recv() {
            self.handle_event(camera, &event);
        }
    }

    pub(crate) fn handle_event(&mut self, camera: &mut dyn Camera3d, event: &WindowEvent) {
        match *event {
            WindowEvent::Close => self.close(),
            WindowEvent::FramebufferSize(w, h) => app::resize(camera, &mut self.canvas, w, h),
            _ => camera.handle_event(event),
        }
    }
}
