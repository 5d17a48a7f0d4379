//! Built-in materials and the parameters objects are drawn with.

pub use self::fresnel_material::{FresnelMaterial, FresnelParams};
pub use self::points_material::{PointsMaterial, PointsParams};
pub use self::surface_material::{Blending, Shading, SurfaceMaterial, SurfaceParams};

use crate::camera::Camera3d;
use crate::color::{self, Color};
use crate::light::{LightCollection, LightType, MAX_LIGHTS};
use crate::resource::{OutputColorSpace, RenderContext, ToneMapping};
use bytemuck::{Pod, Zeroable};
use glamx::{Mat3, Mat4, Pose3, Vec3};

mod fresnel_material;
mod points_material;
mod surface_material;

/// How an object is drawn.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MaterialParams {
    Surface(SurfaceParams),
    Fresnel(FresnelParams),
    Points(PointsParams),
}

impl Default for MaterialParams {
    fn default() -> Self {
        MaterialParams::Surface(SurfaceParams::default())
    }
}

impl MaterialParams {
    /// Name of the material drawing these parameters in the material manager.
    pub fn material_name(&self) -> &'static str {
        match self {
            MaterialParams::Surface(_) => SurfaceMaterial::NAME,
            MaterialParams::Fresnel(_) => FresnelMaterial::NAME,
            MaterialParams::Points(_) => PointsMaterial::NAME,
        }
    }

    /// Transparent objects are drawn after every opaque one, without
    /// writing depth unless asked to.
    pub fn is_transparent(&self) -> bool {
        match self {
            MaterialParams::Surface(params) => params.transparent,
            MaterialParams::Fresnel(_) => true,
            MaterialParams::Points(params) => params.transparent,
        }
    }

    /// Names of the textures these parameters sample.
    pub fn texture_names(&self) -> Vec<&str> {
        match self {
            MaterialParams::Surface(params) => params.texture_slots().into_iter().flatten().collect(),
            _ => Vec::new(),
        }
    }
}

impl From<SurfaceParams> for MaterialParams {
    fn from(params: SurfaceParams) -> Self {
        MaterialParams::Surface(params)
    }
}

impl From<FresnelParams> for MaterialParams {
    fn from(params: FresnelParams) -> Self {
        MaterialParams::Fresnel(params)
    }
}

impl From<PointsParams> for MaterialParams {
    fn from(params: PointsParams) -> Self {
        MaterialParams::Points(params)
    }
}

const LIGHT_KIND_DIRECTIONAL: u32 = 0;
const LIGHT_KIND_HEMISPHERE: u32 = 1;

/// One light, as laid out in the shaders.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Pod, Zeroable)]
pub(crate) struct LightUniform {
    position: [f32; 3],
    kind: u32,
    direction: [f32; 3],
    intensity: f32,
    color: [f32; 3],
    _pad0: f32,
    ground: [f32; 3],
    _pad1: f32,
}

/// Uniforms shared by every object of a frame (bind group 0 of every material).
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub(crate) struct FrameUniforms {
    view: [[f32; 4]; 4],
    proj: [[f32; 4]; 4],
    eye: [f32; 3],
    num_lights: u32,
    ambient: [f32; 3],
    tone_mapping: u32,
    viewport: [f32; 2],
    output_srgb: u32,
    _pad: u32,
    lights: [LightUniform; MAX_LIGHTS],
}

impl FrameUniforms {
    pub(crate) fn new(
        camera: &dyn Camera3d,
        lights: &LightCollection,
        context: &RenderContext,
    ) -> Self {
        let mut packed = [LightUniform::default(); MAX_LIGHTS];
        let mut num_lights = 0;

        for light in lights.lights.iter().take(MAX_LIGHTS) {
            let kind = match light.light_type {
                LightType::Directional { .. } => LIGHT_KIND_DIRECTIONAL,
                LightType::Hemisphere { .. } => LIGHT_KIND_HEMISPHERE,
                LightType::Ambient => continue,
            };

            packed[num_lights] = LightUniform {
                position: light.world_position.to_array(),
                kind,
                direction: light.world_direction.to_array(),
                intensity: light.intensity,
                color: light.color.to_array(),
                _pad0: 0.0,
                ground: light.ground.to_array(),
                _pad1: 0.0,
            };
            num_lights += 1;
        }

        FrameUniforms {
            view: camera.view_transform().to_mat4().to_cols_array_2d(),
            proj: camera.projection().to_cols_array_2d(),
            eye: camera.eye().to_array(),
            num_lights: num_lights as u32,
            ambient: lights.ambient.to_array(),
            tone_mapping: (context.tone_mapping == ToneMapping::AcesFilmic) as u32,
            viewport: [
                context.viewport_width.max(1) as f32,
                context.viewport_height.max(1) as f32,
            ],
            output_srgb: (context.output_color_space == OutputColorSpace::Srgb) as u32,
            _pad: 0,
            lights: packed,
        }
    }
}

/// Model matrix and the matrix transforming normals, padded for WGSL's `mat3x3`.
pub(crate) fn model_matrices(transform: &Pose3, scale: Vec3) -> ([[f32; 4]; 4], [[f32; 4]; 3]) {
    let model = Mat4::from_scale_rotation_translation(scale, transform.rotation, transform.translation);
    let inv_scale = Vec3::new(1.0 / scale.x, 1.0 / scale.y, 1.0 / scale.z);
    let normal = Mat3::from_quat(transform.rotation) * Mat3::from_diagonal(inv_scale);
    let cols = normal.to_cols_array_2d();
    (
        model.to_cols_array_2d(),
        [
            [cols[0][0], cols[0][1], cols[0][2], 0.0],
            [cols[1][0], cols[1][1], cols[1][2], 0.0],
            [cols[2][0], cols[2][1], cols[2][2], 0.0],
        ],
    )
}

/// Linear RGB of `c` with `alpha` in the last component.
pub(crate) fn linear_rgba(c: Color, alpha: f32) -> [f32; 4] {
    let c = color::to_linear(c);
    [c.r, c.g, c.b, alpha]
}

/// Blend state reproducing `blending` on a transparent or opaque object.
pub(crate) fn blend_state(blending: Blending, transparent: bool) -> Option<wgpu::BlendState> {
    match (blending, transparent) {
        (Blending::Normal, false) => None,
        (Blending::Normal, true) => Some(wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::SrcAlpha,
                dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
                operation: wgpu::BlendOperation::Add,
            },
        }),
        (Blending::Additive, _) => {
            let additive = wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::SrcAlpha,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            };
            Some(wgpu::BlendState {
                color: additive,
                alpha: additive,
            })
        }
    }
}

/// Layout of bind group 0, the frame uniforms.
pub(crate) fn frame_bind_group_layout(label: &str) -> wgpu::BindGroupLayout {
    crate::context::Context::get().create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<FrameUniforms>() as u64),
            },
            count: None,
        }],
    })
}

/// Layout of bind group 1, one dynamic-offset entry of `size` bytes per object.
pub(crate) fn object_bind_group_layout(label: &str, size: Option<wgpu::BufferSize>) -> wgpu::BindGroupLayout {
    crate::context::Context::get().create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: true,
                min_binding_size: size,
            },
            count: None,
        }],
    })
}

/// Bind group exposing one entry of `buffer` at a time through a dynamic offset.
pub(crate) fn object_bind_group(
    label: &str,
    layout: &wgpu::BindGroupLayout,
    buffer: &wgpu::Buffer,
    size: Option<wgpu::BufferSize>,
) -> wgpu::BindGroup {
    crate::context::Context::get().create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer,
                offset: 0,
                size,
            }),
        }],
    })
}

/// Depth state shared by every material: closer-or-equal fragments pass so
/// coplanar layers drawn later are not rejected.
pub(crate) fn depth_stencil(depth_write_enabled: bool) -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format: crate::context::Context::depth_format(),
        depth_write_enabled,
        depth_compare: wgpu::CompareFunction::LessEqual,
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem;

    #[test]
    fn uniform_layouts_match_the_shaders() {
        assert_eq!(mem::size_of::<LightUniform>(), 64);
        assert_eq!(mem::size_of::<FrameUniforms>(), 64 + 64 + 16 + 16 + 16 + 64 * MAX_LIGHTS);
    }

    #[test]
    fn normal_matrix_undoes_non_uniform_scale() {
        let (_, normal) = model_matrices(&Pose3::IDENTITY, Vec3::new(2.0, 1.0, 4.0));
        assert_eq!(normal[0][0], 0.5);
        assert_eq!(normal[1][1], 1.0);
        assert_eq!(normal[2][2], 0.25);
    }

    #[test]
    fn opaque_normal_blending_writes_straight_through() {
        assert!(blend_state(Blending::Normal, false).is_none());
        let additive = blend_state(Blending::Additive, false).unwrap();
        assert_eq!(additive.color.dst_factor, wgpu::BlendFactor::One);
    }

    #[test]
    fn texture_names_skip_missing_maps() {
        let params: MaterialParams = SurfaceParams::phong(color::WHITE)
            .with_map("earth")
            .with_bump_map("bump", 0.04)
            .into();
        assert_eq!(params.texture_names(), vec!["earth", "bump"]);
        assert!(!params.is_transparent());
        assert!(MaterialParams::from(FresnelParams::default()).is_transparent());
    }
}
