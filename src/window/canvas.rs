use std::sync::mpsc::Sender;

use crate::app::ResizableSurface;
use crate::error::Result;
use crate::event::{Action, MouseButton, WindowEvent};
use crate::window::WgpuCanvas;

/// The possible number of samples for multisample anti-aliasing.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NumSamples {
    /// Multisampling disabled.
    One = 1,
    Two = 2,
    #[default]
    Four = 4,
    Eight = 8,
}

impl NumSamples {
    /// Create a `NumSamples` from a number.
    /// Returns `None` if `i` is invalid.
    pub fn from_u32(i: u32) -> Option<NumSamples> {
        match i {
            0 | 1 => Some(NumSamples::One),
            2 => Some(NumSamples::Two),
            4 => Some(NumSamples::Four),
            8 => Some(NumSamples::Eight),
            _ => None,
        }
    }
}

/// Canvas options.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CanvasSetup {
    /// Is vsync enabled?
    pub vsync: bool,
    /// Number of AA samples.
    pub samples: NumSamples,
}

impl Default for CanvasSetup {
    fn default() -> Self {
        CanvasSetup {
            vsync: true,
            samples: NumSamples::default(),
        }
    }
}

/// A window on native platforms, a page canvas on the web.
pub struct Canvas {
    canvas: WgpuCanvas,
}

impl Canvas {
    /// Open a new window, and initialize the wgpu context.
    pub async fn open(
        title: &str,
        width: u32,
        height: u32,
        canvas_setup: Option<CanvasSetup>,
        out_events: Sender<WindowEvent>,
    ) -> Result<Self> {
        Ok(Canvas {
            canvas: WgpuCanvas::open(title, width, height, canvas_setup, out_events).await?,
        })
    }

    /// Poll all events that occurred since the last call to this method.
    pub fn poll_events(&mut self) {
        self.canvas.poll_events()
    }

    /// Gets the current surface texture for rendering.
    pub fn get_current_texture(
        &self,
    ) -> std::result::Result<wgpu::SurfaceTexture, wgpu::SurfaceError> {
        self.canvas.get_current_texture()
    }

    /// Reconfigures a lost or outdated surface.
    pub fn reconfigure(&self) {
        self.canvas.reconfigure()
    }

    /// Presents the current frame.
    pub fn present(&self, frame: wgpu::SurfaceTexture) {
        self.canvas.present(frame)
    }

    /// Gets the depth texture view for rendering.
    pub fn depth_view(&self) -> &wgpu::TextureView {
        self.canvas.depth_view()
    }

    /// Gets the MSAA texture view if MSAA is enabled.
    pub fn msaa_view(&self) -> Option<&wgpu::TextureView> {
        self.canvas.msaa_view()
    }

    /// Gets the sample count for MSAA.
    pub fn sample_count(&self) -> u32 {
        self.canvas.sample_count()
    }

    /// Gets the surface format.
    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.canvas.surface_format()
    }

    /// The size of the drawable surface, in physical pixels.
    pub fn size(&self) -> (u32, u32) {
        self.canvas.size()
    }

    /// The current position of the cursor, if known.
    ///
    /// This position may not be known if, e.g., the cursor has not been moved since the
    /// window was open.
    pub fn cursor_pos(&self) -> Option<(f64, f64)> {
        self.canvas.cursor_pos()
    }

    /// The scale factor.
    pub fn scale_factor(&self) -> f64 {
        self.canvas.scale_factor()
    }

    /// Set the window title.
    pub fn set_title(&mut self, title: &str) {
        self.canvas.set_title(title)
    }

    /// The state of a mouse button.
    pub fn get_mouse_button(&self, button: MouseButton) -> Action {
        self.canvas.get_mouse_button(button)
    }
}

impl ResizableSurface for Canvas {
    fn surface_size(&self) -> (u32, u32) {
        self.canvas.size()
    }

    fn resize_surface(&mut self, width: u32, height: u32) {
        self.canvas.resize(width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_counts_round_trip_through_u32() {
        assert_eq!(NumSamples::from_u32(0), Some(NumSamples::One));
        assert_eq!(NumSamples::from_u32(4).map(|n| n as u32), Some(4));
        assert_eq!(NumSamples::from_u32(3), None);
    }

    #[test]
    fn default_setup_is_vsynced_and_antialiased() {
        let setup = CanvasSetup::default();
        assert!(setup.vsync);
        assert_eq!(setup.samples, NumSamples::Four);
    }
}
