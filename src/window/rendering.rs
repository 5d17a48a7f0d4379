//! Rendering functionality.

use crate::camera::Camera3d;
use crate::context::Context;
use crate::light::LightCollection;
use crate::resource::{MaterialManager3d, RenderContext};
use crate::scene::{RenderPhase, SceneNode3d};

use super::Window;

impl Window {
    /// Renders one frame of a 3D scene.
    ///
    /// Handles pending events, steps the camera once and draws. This is the
    /// whole render loop for scenes without animations or asynchronous
    /// content; see [`crate::app::App`] otherwise.
    ///
    /// # Returns
    /// `true` if rendering should continue, `false` if the window should close
    ///
    /// # Platform-specific
    /// - **Native**: Returns immediately after rendering one frame
    /// - **WASM**: Yields to the browser's event loop and returns when the next frame is ready
    pub async fn render_3d(&mut self, scene: &mut SceneNode3d, camera: &mut dyn Camera3d) -> bool {
        self.handle_events(camera);
        camera.update();
        self.draw_3d(scene, camera).await
    }

    /// Draws one frame of `scene` as seen from `camera`, without touching
    /// events or camera state, then waits for the next frame slot.
    pub async fn draw_3d(&mut self, scene: &mut SceneNode3d, camera: &dyn Camera3d) -> bool {
        if !self.draw_frame(scene, camera) {
            return false;
        }

        #[cfg(target_arch = "wasm32")]
        next_animation_frame().await;

        !self.should_close()
    }

    /// Returns `false` when drawing can never succeed again.
    fn draw_frame(&mut self, scene: &mut SceneNode3d, camera: &dyn Camera3d) -> bool {
        let frame = match self.canvas.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("surface lost or outdated, reconfiguring and skipping this frame");
                self.canvas.reconfigure();
                return true;
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("out of memory while acquiring the surface texture");
                self.close();
                return false;
            }
            Err(e) => {
                log::warn!("failed to acquire the surface texture: {e}");
                return true;
            }
        };
        let frame_view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let (w, h) = self.canvas.size();
        let render_context = RenderContext {
            surface_format: self.canvas.surface_format(),
            sample_count: self.canvas.sample_count(),
            viewport_width: w,
            viewport_height: h,
            tone_mapping: self.tone_mapping,
            output_color_space: self.output_color_space,
        };

        // Prepare: propagate transforms, gather lights, record uniforms.
        MaterialManager3d::get_global_manager(|mm| mm.begin_frame());
        let mut lights = LightCollection::new();
        scene.prepare(camera, &mut lights, &render_context);
        MaterialManager3d::get_global_manager(|mm| mm.flush());

        let ctxt = Context::get();
        let mut encoder = ctxt.create_command_encoder(Some("globe3d_frame_encoder"));

        // Multisampled frames resolve into the surface texture.
        let (color_view, resolve_target) = match self.canvas.msaa_view() {
            Some(msaa_view) => (msaa_view, Some(&frame_view)),
            None => (&frame_view, None),
        };

        {
            let bg = self.background;
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene_render_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: color_view,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: bg.r as f64,
                            g: bg.g as f64,
                            b: bg.b as f64,
                            a: bg.a as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: self.canvas.depth_view(),
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            scene.render(RenderPhase::Opaque, &mut pass, &render_context);
            scene.render(RenderPhase::Transparent, &mut pass, &render_context);
        }

        ctxt.submit(std::iter::once(encoder.finish()));
        self.canvas.present(frame);

        true
    }
}

#[cfg(target_arch = "wasm32")]
async fn next_animation_frame() {
    use wasm_bindgen::JsCast;
    use web_sys::wasm_bindgen::closure::Closure;

    let Some(window) = web_sys::window() else {
        return;
    };

    let (s, r) = oneshot::channel();
    let closure = Closure::once(move || {
        let _ = s.send(());
    });

    if window
        .request_animation_frame(closure.as_ref().unchecked_ref())
        .is_ok()
    {
        let _ = r.await;
    }
}
