//! wgpu surface bound to a winit window (native) or a page canvas (web).

use std::cell::RefCell;
use std::sync::mpsc::Sender;
use std::sync::Arc;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::event::{Action, Modifiers, MouseButton, TouchAction, WindowEvent};
use crate::window::canvas::CanvasSetup;
#[cfg(not(target_arch = "wasm32"))]
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
#[cfg(not(target_arch = "wasm32"))]
use winit::event::{ElementState, MouseScrollDelta, TouchPhase, WindowEvent as WinitWindowEvent};
#[cfg(not(target_arch = "wasm32"))]
use winit::event_loop::ActiveEventLoop;
use winit::event_loop::EventLoop;
use winit::keyboard::ModifiersState;
use winit::window::{Window, WindowAttributes};

#[cfg(target_arch = "wasm32")]
use std::rc::Rc;
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::JsCast;

// winit allows a single event loop per program and it is neither Send nor Sync.
#[cfg(not(target_arch = "wasm32"))]
thread_local! {
    static EVENT_LOOP: RefCell<Option<EventLoop<()>>> = const { RefCell::new(None) };
    static PENDING_EVENTS: RefCell<Vec<WindowEvent>> = const { RefCell::new(Vec::new()) };
    static MODIFIERS: RefCell<ModifiersState> = RefCell::new(ModifiersState::default());
}

/// The drawable surface of the window, with its depth and multisample targets.
pub struct WgpuCanvas {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    cursor_pos: Option<(f64, f64)>,
    button_states: [Action; MouseButton::Button5 as usize + 1],
    out_events: Sender<WindowEvent>,
    depth_texture: wgpu::Texture,
    depth_view: wgpu::TextureView,
    msaa_texture: Option<wgpu::Texture>,
    msaa_view: Option<wgpu::TextureView>,
    sample_count: u32,
    /// Events pushed by the DOM listeners, drained on poll.
    #[cfg(target_arch = "wasm32")]
    pending_events: Rc<RefCell<Vec<WindowEvent>>>,
    #[cfg(target_arch = "wasm32")]
    _event_closures: Vec<wasm_bindgen::JsValue>,
}

impl WgpuCanvas {
    /// Opens the window and, on first use, initializes the GPU context.
    pub async fn open(
        title: &str,
        width: u32,
        height: u32,
        canvas_setup: Option<CanvasSetup>,
        out_events: Sender<WindowEvent>,
    ) -> Result<Self> {
        let window_attrs = WindowAttributes::default()
            .with_title(title)
            .with_inner_size(LogicalSize::new(width as f64, height as f64));
        let canvas_setup = canvas_setup.unwrap_or_default();

        #[cfg(not(target_arch = "wasm32"))]
        let window = EVENT_LOOP.with(|cell| -> Result<Window> {
            let mut event_loop = cell.borrow_mut();
            if event_loop.is_none() {
                *event_loop = Some(EventLoop::new().map_err(|e| Error::Surface(e.to_string()))?);
            }
            let event_loop = event_loop
                .as_ref()
                .ok_or_else(|| Error::Surface("no event loop".to_string()))?;
            #[allow(deprecated)]
            event_loop
                .create_window(window_attrs)
                .map_err(|e| Error::Surface(e.to_string()))
        })?;

        #[cfg(target_arch = "wasm32")]
        let window = {
            use winit::platform::web::{WindowAttributesExtWebSys, WindowExtWebSys};

            let events = EventLoop::new().map_err(|e| Error::Surface(e.to_string()))?;
            let canvas = page_canvas()?;
            #[allow(deprecated)]
            let window = events
                .create_window(window_attrs.with_canvas(Some(canvas)))
                .map_err(|e| Error::Surface(e.to_string()))?;

            // winit rewrites the canvas style on creation.
            if let Some(canvas) = window.canvas() {
                let style = canvas.style();
                let _ = style.set_property("display", "block");
                let _ = style.set_property("width", "100%");
                let _ = style.set_property("height", "100%");
            }

            window
        };

        let window = Arc::new(window);

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window.clone())
            .map_err(|e| Error::Surface(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| Error::Surface(e.to_string()))?;
        log::info!("using adapter {:?}", adapter.get_info().name);

        #[cfg(target_arch = "wasm32")]
        let limits = wgpu::Limits::downlevel_webgl2_defaults();
        #[cfg(not(target_arch = "wasm32"))]
        let limits = wgpu::Limits::default();

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("globe3d device"),
                required_features: wgpu::Features::empty(),
                required_limits: limits,
                memory_hints: wgpu::MemoryHints::default(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|e| Error::Surface(e.to_string()))?;

        // Shaders encode their own output: WebGL2 rarely offers sRGB swapchains.
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or_else(|| Error::Surface("surface supports no format".to_string()))?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        Context::init(instance, device, queue, adapter, surface_format);
        let ctxt = Context::get();

        let size = window.inner_size();
        let width = size.width.max(1);
        let height = size.height.max(1);

        let present_mode = if canvas_setup.vsync {
            wgpu::PresentMode::AutoVsync
        } else {
            wgpu::PresentMode::AutoNoVsync
        };

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&ctxt.device, &surface_config);

        let sample_count = (canvas_setup.samples as u32).max(1);
        let (depth_texture, depth_view) =
            Self::create_depth_texture(&ctxt.device, width, height, sample_count);
        let (msaa_texture, msaa_view) = if sample_count > 1 {
            let (tex, view) =
                Self::create_msaa_texture(&ctxt.device, width, height, surface_format, sample_count);
            (Some(tex), Some(view))
        } else {
            (None, None)
        };

        #[cfg(target_arch = "wasm32")]
        let (pending_events, _event_closures) = {
            use winit::platform::web::WindowExtWebSys;

            let pending_events = Rc::new(RefCell::new(Vec::new()));
            let closures = match window.canvas() {
                Some(canvas) => register_listeners(&canvas, &pending_events),
                None => Vec::new(),
            };
            (pending_events, closures)
        };

        log::debug!(
            "canvas opened at {width}x{height}, {sample_count} sample(s), {surface_format:?}"
        );

        Ok(WgpuCanvas {
            window,
            surface,
            surface_config,
            cursor_pos: None,
            button_states: [Action::Release; MouseButton::Button5 as usize + 1],
            out_events,
            depth_texture,
            depth_view,
            msaa_texture,
            msaa_view,
            sample_count,
            #[cfg(target_arch = "wasm32")]
            pending_events,
            #[cfg(target_arch = "wasm32")]
            _event_closures,
        })
    }

    fn create_depth_texture(
        device: &wgpu::Device,
        width: u32,
        height: u32,
        sample_count: u32,
    ) -> (wgpu::Texture, wgpu::TextureView) {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth_texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: sample_count.max(1),
            dimension: wgpu::TextureDimension::D2,
            format: Context::depth_format(),
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        (texture, view)
    }

    fn create_msaa_texture(
        device: &wgpu::Device,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        sample_count: u32,
    ) -> (wgpu::Texture, wgpu::TextureView) {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("msaa_texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        (texture, view)
    }

    /// Resizes the surface and every attachment. Zero sizes and unchanged
    /// sizes are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 || (width, height) == self.size() {
            return;
        }

        let ctxt = Context::get();
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.surface.configure(&ctxt.device, &self.surface_config);

        let (depth_texture, depth_view) =
            Self::create_depth_texture(&ctxt.device, width, height, self.sample_count);
        self.depth_texture = depth_texture;
        self.depth_view = depth_view;

        if self.sample_count > 1 {
            let (msaa_texture, msaa_view) = Self::create_msaa_texture(
                &ctxt.device,
                width,
                height,
                self.surface_config.format,
                self.sample_count,
            );
            self.msaa_texture = Some(msaa_texture);
            self.msaa_view = Some(msaa_view);
        }

        log::debug!("surface resized to {width}x{height}");
    }

    /// Reconfigures the surface with its current settings, after it was lost
    /// or became outdated.
    pub fn reconfigure(&self) {
        self.surface
            .configure(&Context::get().device, &self.surface_config);
    }

    /// Translates the pending window-system events and forwards them.
    pub fn poll_events(&mut self) {
        #[cfg(not(target_arch = "wasm32"))]
        {
            use winit::platform::pump_events::EventLoopExtPumpEvents;

            struct EventCollector;

            impl ApplicationHandler for EventCollector {
                fn resumed(&mut self, _event_loop: &ActiveEventLoop) {}

                fn window_event(
                    &mut self,
                    _event_loop: &ActiveEventLoop,
                    _window_id: winit::window::WindowId,
                    event: WinitWindowEvent,
                ) {
                    if let WinitWindowEvent::ModifiersChanged(new_modifiers) = &event {
                        MODIFIERS.with(|m| *m.borrow_mut() = new_modifiers.state());
                        return;
                    }

                    let modifiers = MODIFIERS.with(|m| translate_modifiers(*m.borrow()));
                    if let Some(event) = translate_event(event, modifiers) {
                        PENDING_EVENTS.with(|pending| pending.borrow_mut().push(event));
                    }
                }
            }

            EVENT_LOOP.with(|cell| {
                if let Some(event_loop) = cell.borrow_mut().as_mut() {
                    let _ = event_loop
                        .pump_app_events(Some(std::time::Duration::ZERO), &mut EventCollector);
                }
            });

            let events = PENDING_EVENTS.with(|pending| std::mem::take(&mut *pending.borrow_mut()));
            for event in events {
                self.forward(event);
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            // The page resizes the canvas: report it like a native resize.
            let size = self.window.inner_size();
            if size.width > 0 && size.height > 0 && (size.width, size.height) != self.size() {
                self.forward(WindowEvent::FramebufferSize(size.width, size.height));
            }

            let events: Vec<WindowEvent> = self.pending_events.borrow_mut().drain(..).collect();
            for event in events {
                self.forward(event);
            }
        }
    }

    fn forward(&mut self, event: WindowEvent) {
        match event {
            WindowEvent::CursorPos(x, y, _) => self.cursor_pos = Some((x, y)),
            WindowEvent::MouseButton(button, action, _) => {
                self.button_states[button as usize] = action
            }
            _ => {}
        }
        let _ = self.out_events.send(event);
    }

    /// Gets the current surface texture for rendering.
    pub fn get_current_texture(&self) -> std::result::Result<wgpu::SurfaceTexture, wgpu::SurfaceError> {
        self.surface.get_current_texture()
    }

    /// Presents the current frame.
    pub fn present(&self, frame: wgpu::SurfaceTexture) {
        self.window.pre_present_notify();
        frame.present();
    }

    /// Gets the depth texture view for rendering.
    pub fn depth_view(&self) -> &wgpu::TextureView {
        &self.depth_view
    }

    /// Gets the MSAA texture view if MSAA is enabled.
    pub fn msaa_view(&self) -> Option<&wgpu::TextureView> {
        self.msaa_view.as_ref()
    }

    /// Gets the sample count for MSAA.
    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    /// Gets the surface format.
    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_config.format
    }

    /// The configured surface size, matching every attachment.
    pub fn size(&self) -> (u32, u32) {
        (self.surface_config.width, self.surface_config.height)
    }

    /// The current position of the cursor, if known.
    pub fn cursor_pos(&self) -> Option<(f64, f64)> {
        self.cursor_pos
    }

    /// The scale factor.
    pub fn scale_factor(&self) -> f64 {
        self.window.scale_factor()
    }

    /// Set the window title.
    pub fn set_title(&mut self, title: &str) {
        self.window.set_title(title)
    }

    /// The state of a mouse button.
    pub fn get_mouse_button(&self, button: MouseButton) -> Action {
        self.button_states[button as usize]
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn translate_event(event: WinitWindowEvent, modifiers: Modifiers) -> Option<WindowEvent> {
    match event {
        WinitWindowEvent::CloseRequested => Some(WindowEvent::Close),
        WinitWindowEvent::Resized(size) if size.width > 0 && size.height > 0 => {
            Some(WindowEvent::FramebufferSize(size.width, size.height))
        }
        WinitWindowEvent::CursorMoved { position, .. } => {
            Some(WindowEvent::CursorPos(position.x, position.y, modifiers))
        }
        WinitWindowEvent::MouseInput { state, button, .. } => Some(WindowEvent::MouseButton(
            translate_mouse_button(button)?,
            translate_action(state),
            modifiers,
        )),
        WinitWindowEvent::Touch(touch) => {
            let action = match touch.phase {
                TouchPhase::Started => TouchAction::Start,
                TouchPhase::Ended => TouchAction::End,
                TouchPhase::Moved => TouchAction::Move,
                TouchPhase::Cancelled => TouchAction::Cancel,
            };
            Some(WindowEvent::Touch(
                touch.id,
                touch.location.x,
                touch.location.y,
                action,
                modifiers,
            ))
        }
        WinitWindowEvent::MouseWheel { delta, .. } => {
            let (x, y) = match delta {
                MouseScrollDelta::LineDelta(dx, dy) => (dx as f64 * 10.0, dy as f64 * 10.0),
                MouseScrollDelta::PixelDelta(delta) => (delta.x, delta.y),
            };
            Some(WindowEvent::Scroll(x, y, modifiers))
        }
        _ => None,
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn translate_action(state: ElementState) -> Action {
    match state {
        ElementState::Pressed => Action::Press,
        ElementState::Released => Action::Release,
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn translate_mouse_button(button: winit::event::MouseButton) -> Option<MouseButton> {
    match button {
        winit::event::MouseButton::Left => Some(MouseButton::Button1),
        winit::event::MouseButton::Right => Some(MouseButton::Button2),
        winit::event::MouseButton::Middle => Some(MouseButton::Button3),
        winit::event::MouseButton::Back => Some(MouseButton::Button4),
        winit::event::MouseButton::Forward => Some(MouseButton::Button5),
        winit::event::MouseButton::Other(_) => None,
    }
}

fn translate_modifiers(state: ModifiersState) -> Modifiers {
    let mut modifiers = Modifiers::empty();
    modifiers.set(Modifiers::Shift, state.shift_key());
    modifiers.set(Modifiers::Control, state.control_key());
    modifiers.set(Modifiers::Alt, state.alt_key());
    modifiers.set(Modifiers::Super, state.super_key());
    modifiers
}

/// The `#canvas` element of the page, created if missing, with the page
/// styled so it fills the viewport.
#[cfg(target_arch = "wasm32")]
fn page_canvas() -> Result<web_sys::HtmlCanvasElement> {
    let no_dom = |what: &str| Error::Surface(format!("no {what} in this page"));
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| no_dom("document"))?;

    let canvas = match document
        .get_element_by_id("canvas")
        .and_then(|elem| elem.dyn_into::<web_sys::HtmlCanvasElement>().ok())
    {
        Some(canvas) => canvas,
        None => {
            let canvas = document
                .create_element("canvas")
                .ok()
                .and_then(|elem| elem.dyn_into::<web_sys::HtmlCanvasElement>().ok())
                .ok_or_else(|| no_dom("canvas"))?;
            canvas.set_id("canvas");
            let body = document.body().ok_or_else(|| no_dom("body"))?;
            body.append_child(&canvas).map_err(|_| no_dom("canvas"))?;
            canvas
        }
    };

    let fill = |style: web_sys::CssStyleDeclaration| {
        let _ = style.set_property("margin", "0");
        let _ = style.set_property("padding", "0");
        let _ = style.set_property("width", "100%");
        let _ = style.set_property("height", "100%");
        let _ = style.set_property("overflow", "hidden");
    };
    if let Some(html) = document
        .document_element()
        .and_then(|e| e.dyn_into::<web_sys::HtmlElement>().ok())
    {
        fill(html.style());
    }
    if let Some(body) = document.body() {
        fill(body.style());
    }

    Ok(canvas)
}

#[cfg(target_arch = "wasm32")]
fn register_listeners(
    canvas: &web_sys::HtmlCanvasElement,
    pending_events: &Rc<RefCell<Vec<WindowEvent>>>,
) -> Vec<wasm_bindgen::JsValue> {
    let mut closures: Vec<wasm_bindgen::JsValue> = Vec::new();

    {
        let pending = pending_events.clone();
        let target = canvas.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::PointerEvent| {
            // CSS pixels to canvas pixels.
            let rect = target.get_bounding_client_rect();
            let x = (event.client_x() as f64 - rect.left()) * target.width() as f64 / rect.width();
            let y = (event.client_y() as f64 - rect.top()) * target.height() as f64 / rect.height();
            pending
                .borrow_mut()
                .push(WindowEvent::CursorPos(x, y, web_modifiers(&event)));
        });
        let _ = canvas
            .add_event_listener_with_callback("pointermove", closure.as_ref().unchecked_ref());
        closures.push(closure.into_js_value());
    }

    for (name, action) in [("pointerdown", Action::Press), ("pointerup", Action::Release)] {
        let pending = pending_events.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::PointerEvent| {
            // Touch pointers are reported through the touch listeners.
            if event.pointer_type() == "mouse" {
                pending.borrow_mut().push(WindowEvent::MouseButton(
                    translate_web_mouse_button(event.button()),
                    action,
                    web_modifiers(&event),
                ));
            }
        });
        let _ = canvas.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref());
        closures.push(closure.into_js_value());
    }

    {
        let pending = pending_events.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::WheelEvent| {
            event.prevent_default();
            // Browsers report about 100 pixels per notch.
            let scale = match event.delta_mode() {
                0 => 0.1,
                1 => 1.0,
                _ => 10.0,
            };
            pending.borrow_mut().push(WindowEvent::Scroll(
                event.delta_x() * scale,
                -event.delta_y() * scale,
                web_modifiers(&event),
            ));
        });
        let _ = canvas.add_event_listener_with_callback("wheel", closure.as_ref().unchecked_ref());
        closures.push(closure.into_js_value());
    }

    {
        let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::MouseEvent| {
            event.prevent_default();
        });
        let _ = canvas
            .add_event_listener_with_callback("contextmenu", closure.as_ref().unchecked_ref());
        closures.push(closure.into_js_value());
    }

    for (name, action) in [
        ("touchstart", TouchAction::Start),
        ("touchmove", TouchAction::Move),
        ("touchend", TouchAction::End),
        ("touchcancel", TouchAction::Cancel),
    ] {
        let pending = pending_events.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::TouchEvent| {
            event.prevent_default();
            let touches = event.changed_touches();
            for i in 0..touches.length() {
                if let Some(touch) = touches.get(i) {
                    pending.borrow_mut().push(WindowEvent::Touch(
                        touch.identifier() as u64,
                        touch.client_x() as f64,
                        touch.client_y() as f64,
                        action,
                        Modifiers::empty(),
                    ));
                }
            }
        });
        let _ = canvas.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref());
        closures.push(closure.into_js_value());
    }

    closures
}

#[cfg(target_arch = "wasm32")]
fn web_modifiers(event: &web_sys::MouseEvent) -> Modifiers {
    let mut state = ModifiersState::empty();
    state.set(ModifiersState::SHIFT, event.shift_key());
    state.set(ModifiersState::CONTROL, event.ctrl_key());
    state.set(ModifiersState::ALT, event.alt_key());
    state.set(ModifiersState::SUPER, event.meta_key());
    translate_modifiers(state)
}

#[cfg(target_arch = "wasm32")]
fn translate_web_mouse_button(button: i16) -> MouseButton {
    match button {
        1 => MouseButton::Button3,
        2 => MouseButton::Button2,
        3 => MouseButton::Button4,
        4 => MouseButton::Button5,
        _ => MouseButton::Button1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifiers_map_one_to_one() {
        let state = ModifiersState::SHIFT | ModifiersState::SUPER;
        assert_eq!(
            translate_modifiers(state),
            Modifiers::Shift | Modifiers::Super
        );
        assert!(translate_modifiers(ModifiersState::empty()).is_empty());
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn zero_sized_resizes_are_dropped() {
        let event = WinitWindowEvent::Resized(winit::dpi::PhysicalSize::new(0, 600));
        assert_eq!(translate_event(event, Modifiers::empty()), None);

        let event = WinitWindowEvent::Resized(winit::dpi::PhysicalSize::new(800, 600));
        assert_eq!(
            translate_event(event, Modifiers::empty()),
            Some(WindowEvent::FramebufferSize(800, 600))
        );
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn close_requests_close_the_window() {
        assert_eq!(
            translate_event(WinitWindowEvent::CloseRequested, Modifiers::empty()),
            Some(WindowEvent::Close)
        );
        assert_eq!(translate_event(WinitWindowEvent::Focused(true), Modifiers::empty()), None);
    }
}
