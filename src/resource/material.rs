//! Trait implemented by materials.

use crate::camera::Camera3d;
use crate::light::LightCollection;
use crate::resource::GpuMesh3d;
use crate::scene::ObjectData3d;
use glamx::{Pose3, Vec3};
use std::any::Any;

/// Curve applied to lit colors before they are written out.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ToneMapping {
    /// Colors are clamped.
    #[default]
    None,
    /// The ACES filmic curve, compressing highlights.
    AcesFilmic,
}

/// Encoding of the colors written to the surface.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OutputColorSpace {
    /// Linear lighting results are sRGB-encoded.
    #[default]
    Srgb,
    /// Lighting results are written as-is.
    Linear,
}

/// Frame-wide settings passed to materials.
#[derive(Copy, Clone, Debug)]
pub struct RenderContext {
    pub surface_format: wgpu::TextureFormat,
    /// Sample count of the color and depth attachments.
    pub sample_count: u32,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub tone_mapping: ToneMapping,
    pub output_color_space: OutputColorSpace,
}

/// Per-object GPU data for a material.
///
/// Implemented by material-specific structs holding the per-object resources
/// (dynamic offsets, texture bind groups). Each object owns one instance.
pub trait GpuData: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Trait implemented by materials.
///
/// A material holds the resources shared by every object drawn with it
/// (pipelines, layouts, uniform buffers). Drawing a frame goes through three
/// steps:
/// 1. [`Material3d::prepare`] runs for every visible object and records its
///    uniforms.
/// 2. [`Material3d::flush`] uploads the recorded uniforms.
/// 3. [`Material3d::render`] records the draw calls in the render pass.
pub trait Material3d {
    /// Creates the per-object GPU data. Called once per object, lazily.
    fn create_gpu_data(&self) -> Box<dyn GpuData>;

    /// Resets per-frame state.
    fn begin_frame(&mut self) {}

    /// Records the uniforms of one object for this frame.
    #[allow(clippy::too_many_arguments)]
    fn prepare(
        &mut self,
        transform: &Pose3,
        scale: Vec3,
        camera: &dyn Camera3d,
        lights: &LightCollection,
        data: &ObjectData3d,
        mesh: &mut GpuMesh3d,
        gpu_data: &mut dyn GpuData,
        context: &RenderContext,
    );

    /// Uploads every uniform recorded since [`Material3d::begin_frame`].
    fn flush(&mut self) {}

    /// Draws one prepared object.
    fn render(
        &mut self,
        data: &ObjectData3d,
        mesh: &GpuMesh3d,
        gpu_data: &mut dyn GpuData,
        pass: &mut wgpu::RenderPass<'_>,
        context: &RenderContext,
    );
}
