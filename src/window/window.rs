//! The window to which the scene is drawn.

use std::sync::mpsc::{self, Receiver};

use crate::color::{self, Color};
use crate::context::Context;
use crate::error::Result;
use crate::event::WindowEvent;
use crate::resource::{OutputColorSpace, ToneMapping};
use crate::window::canvas::{Canvas, CanvasSetup};
use crate::window::window_cache::WindowCache;

static DEFAULT_WIDTH: u32 = 800u32;
static DEFAULT_HEIGHT: u32 = 600u32;

/// A window (or page canvas) with a GPU surface, its input events and the
/// settings every frame is drawn with.
pub struct Window {
    pub(crate) events: Receiver<WindowEvent>,
    pub(crate) canvas: Canvas,
    pub(crate) background: Color,
    pub(crate) tone_mapping: ToneMapping,
    pub(crate) output_color_space: OutputColorSpace,
    pub(crate) should_close: bool,
}

impl Drop for Window {
    fn drop(&mut self) {
        WindowCache::reset();
        Context::reset();
    }
}

impl Window {
    /// Creates a new window of 800x600 pixels. On the web the page canvas
    /// fills the viewport instead.
    ///
    /// # Example
    /// ```no_run
    /// # use globe3d::window::Window;
    /// # async fn run() -> globe3d::error::Result<()> {
    /// let mut window = Window::new("globe3d").await?;
    /// # Ok(()) }
    /// ```
    pub async fn new(title: &str) -> Result<Window> {
        Window::new_with_setup(title, DEFAULT_WIDTH, DEFAULT_HEIGHT, CanvasSetup::default()).await
    }

    /// Creates a new window with custom dimensions.
    pub async fn new_with_size(title: &str, width: u32, height: u32) -> Result<Window> {
        Window::new_with_setup(title, width, height, CanvasSetup::default()).await
    }

    /// Creates a new window with custom setup options (VSync and anti-aliasing).
    pub async fn new_with_setup(
        title: &str,
        width: u32,
        height: u32,
        setup: CanvasSetup,
    ) -> Result<Window> {
        let (event_send, event_receive) = mpsc::channel();
        let canvas = Canvas::open(title, width, height, Some(setup), event_send).await?;

        WindowCache::populate();

        Ok(Window {
            events: event_receive,
            canvas,
            background: color::BLACK,
            tone_mapping: ToneMapping::default(),
            output_color_space: OutputColorSpace::default(),
            should_close: false,
        })
    }

    /// Indicates whether this window should be closed.
    #[inline]
    pub fn should_close(&self) -> bool {
        self.should_close
    }

    /// Ends the render loop at the end of the current frame.
    #[inline]
    pub fn close(&mut self) {
        self.should_close = true;
    }

    /// The window width, in physical pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.canvas.size().0
    }

    /// The window height, in physical pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.canvas.size().1
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        self.canvas.size()
    }

    /// The canvas drawn to.
    #[inline]
    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn set_title(&mut self, title: &str) {
        self.canvas.set_title(title)
    }

    /// Sets the color the surface is cleared with.
    pub fn set_background_color(&mut self, background: Color) {
        self.background = background;
    }

    /// Sets the curve applied to lit colors.
    pub fn set_tone_mapping(&mut self, tone_mapping: ToneMapping) {
        self.tone_mapping = tone_mapping;
    }

    /// Sets how colors are encoded when written to the surface.
    pub fn set_output_color_space(&mut self, output_color_space: OutputColorSpace) {
        self.output_color_space = output_color_space;
    }

    #[inline]
    pub fn tone_mapping(&self) -> ToneMapping {
        self.tone_mapping
    }

    #[inline]
    pub fn output_color_space(&self) -> OutputColorSpace {
        self.output_color_space
    }

    /// The scale factor.
    pub fn scale_factor(&self) -> f64 {
        self.canvas.scale_factor()
    }
}
