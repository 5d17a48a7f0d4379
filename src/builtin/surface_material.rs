use super::{
    blend_state, depth_stencil, frame_bind_group_layout, linear_rgba, model_matrices,
    object_bind_group, object_bind_group_layout, FrameUniforms, MaterialParams,
};
use crate::camera::Camera3d;
use crate::color::{self, Color};
use crate::context::Context;
use crate::light::LightCollection;
use crate::resource::{
    DynamicUniformBuffer, GpuData, GpuMesh3d, Material3d, RenderContext, Texture, TextureManager,
};
use crate::scene::ObjectData3d;
use bytemuck::{Pod, Zeroable};
use glamx::{Pose3, Vec3};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// Lighting model of a surface.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Shading {
    /// Unlit: the color times the color map.
    Basic,
    /// Lambert diffuse with a Blinn-Phong highlight.
    Phong,
    /// Metallic-roughness.
    #[default]
    Standard,
}

/// How fragments combine with what is already drawn.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Blending {
    /// Replace, or alpha-blend when transparent.
    #[default]
    Normal,
    /// Add the color weighted by alpha.
    Additive,
}

/// Parameters of an object drawn by the [`SurfaceMaterial`].
///
/// Texture maps are referenced by their name in the [`TextureManager`]; a
/// name that is not registered yet samples as white.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SurfaceParams {
    pub shading: Shading,
    pub color: Color,
    /// Multiplies `color`.
    pub map: Option<String>,
    /// Red channel scales the Phong highlight.
    pub specular_map: Option<String>,
    /// Red channel is a height field perturbing the normal.
    pub bump_map: Option<String>,
    pub bump_scale: f32,
    /// Green channel multiplies the opacity.
    pub alpha_map: Option<String>,
    /// Phong highlight color.
    pub specular: Color,
    pub shininess: f32,
    pub roughness: f32,
    pub metalness: f32,
    pub opacity: f32,
    pub transparent: bool,
    pub blending: Blending,
    /// Draw the edges of the mesh instead of its faces.
    pub wireframe: bool,
    /// Light each triangle with its geometric normal.
    pub flat_shading: bool,
    pub depth_write: bool,
}

impl Default for SurfaceParams {
    fn default() -> Self {
        SurfaceParams {
            shading: Shading::Standard,
            color: color::WHITE,
            map: None,
            specular_map: None,
            bump_map: None,
            bump_scale: 1.0,
            alpha_map: None,
            specular: color::from_hex(0x111111),
            shininess: 30.0,
            roughness: 1.0,
            metalness: 0.0,
            opacity: 1.0,
            transparent: false,
            blending: Blending::Normal,
            wireframe: false,
            flat_shading: false,
            depth_write: true,
        }
    }
}

impl SurfaceParams {
    /// Unlit surface.
    pub fn basic(color: Color) -> Self {
        SurfaceParams {
            shading: Shading::Basic,
            color,
            ..Default::default()
        }
    }

    pub fn phong(color: Color) -> Self {
        SurfaceParams {
            shading: Shading::Phong,
            color,
            ..Default::default()
        }
    }

    pub fn standard(color: Color) -> Self {
        SurfaceParams {
            shading: Shading::Standard,
            color,
            ..Default::default()
        }
    }

    pub fn with_map(mut self, name: &str) -> Self {
        self.map = Some(name.to_string());
        self
    }

    pub fn with_specular_map(mut self, name: &str) -> Self {
        self.specular_map = Some(name.to_string());
        self
    }

    pub fn with_bump_map(mut self, name: &str, scale: f32) -> Self {
        self.bump_map = Some(name.to_string());
        self.bump_scale = scale;
        self
    }

    pub fn with_alpha_map(mut self, name: &str) -> Self {
        self.alpha_map = Some(name.to_string());
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_transparent(mut self, transparent: bool) -> Self {
        self.transparent = transparent;
        self
    }

    pub fn with_blending(mut self, blending: Blending) -> Self {
        self.blending = blending;
        self
    }

    pub fn with_wireframe(mut self, wireframe: bool) -> Self {
        self.wireframe = wireframe;
        self
    }

    pub fn with_flat_shading(mut self, flat_shading: bool) -> Self {
        self.flat_shading = flat_shading;
        self
    }

    /// Texture names bound to the color, specular, bump and alpha slots.
    pub fn texture_slots(&self) -> [Option<&str>; 4] {
        [
            self.map.as_deref(),
            self.specular_map.as_deref(),
            self.bump_map.as_deref(),
            self.alpha_map.as_deref(),
        ]
    }

    fn uniforms(&self, transform: &Pose3, scale: Vec3) -> ObjectUniforms {
        let (model, normal_matrix) = model_matrices(transform, scale);
        let shading = match self.shading {
            Shading::Basic => 0,
            Shading::Phong => 1,
            Shading::Standard => 2,
        };
        let opaque = !self.transparent && self.blending == Blending::Normal;
        // Without a bump map the white default texture is sampled: zero gradient.
        let bump_scale = if self.bump_map.is_some() {
            self.bump_scale
        } else {
            0.0
        };

        ObjectUniforms {
            model,
            normal_matrix,
            color: linear_rgba(self.color, self.opacity),
            specular: linear_rgba(self.specular, self.shininess.max(1.0e-4)),
            params: [bump_scale, self.roughness, self.metalness, 0.0],
            flags: [shading, self.flat_shading as u32, opaque as u32, 0],
        }
    }

    fn pipeline_key(&self) -> PipelineKey {
        PipelineKey {
            blending: self.blending,
            transparent: self.transparent,
            wireframe: self.wireframe,
            depth_write: self.depth_write,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct ObjectUniforms {
    model: [[f32; 4]; 4],
    normal_matrix: [[f32; 4]; 3],
    color: [f32; 4],
    specular: [f32; 4],
    params: [f32; 4],
    flags: [u32; 4],
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
struct PipelineKey {
    blending: Blending,
    transparent: bool,
    wireframe: bool,
    depth_write: bool,
}

/// Per-object data of the [`SurfaceMaterial`].
pub struct SurfaceGpuData {
    offset: u32,
    textures: Option<([Arc<Texture>; 4], wgpu::BindGroup)>,
}

impl GpuData for SurfaceGpuData {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Material drawing triangle meshes, or their edges, with one of the
/// [`Shading`] models and up to four texture maps.
pub struct SurfaceMaterial {
    shader: wgpu::ShaderModule,
    pipeline_layout: wgpu::PipelineLayout,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    texture_bind_group_layout: wgpu::BindGroupLayout,
    object_bind_group_layout: wgpu::BindGroupLayout,
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    frame_written: bool,
    object_uniforms: DynamicUniformBuffer<ObjectUniforms>,
    object_bind_group: wgpu::BindGroup,
}

impl SurfaceMaterial {
    /// Name under which the material manager registers this material.
    pub const NAME: &'static str = "surface";

    pub fn new() -> SurfaceMaterial {
        let ctxt = Context::get();
        let shader = ctxt.create_shader_module(Some("surface_shader"), include_str!("surface.wgsl"));

        let frame_layout = frame_bind_group_layout("surface_frame_bind_group_layout");
        let object_bind_group_layout = object_bind_group_layout(
            "surface_object_bind_group_layout",
            DynamicUniformBuffer::<ObjectUniforms>::binding_size(),
        );

        let mut texture_entries = Vec::with_capacity(8);
        for slot in 0..4 {
            texture_entries.push(wgpu::BindGroupLayoutEntry {
                binding: slot * 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            });
            texture_entries.push(wgpu::BindGroupLayoutEntry {
                binding: slot * 2 + 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            });
        }
        let texture_bind_group_layout =
            ctxt.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("surface_texture_bind_group_layout"),
                entries: &texture_entries,
            });

        let pipeline_layout = ctxt.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("surface_pipeline_layout"),
            bind_group_layouts: &[
                &frame_layout,
                &object_bind_group_layout,
                &texture_bind_group_layout,
            ],
            push_constant_ranges: &[],
        });

        let frame_buffer = ctxt.create_buffer(&wgpu::BufferDescriptor {
            label: Some("surface_frame_uniforms"),
            size: std::mem::size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let frame_bind_group = ctxt.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("surface_frame_bind_group"),
            layout: &frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
        });

        let object_uniforms = DynamicUniformBuffer::new("surface_object_uniforms");
        let object_bind_group = object_bind_group(
            "surface_object_bind_group",
            &object_bind_group_layout,
            object_uniforms.buffer(),
            DynamicUniformBuffer::<ObjectUniforms>::binding_size(),
        );

        SurfaceMaterial {
            shader,
            pipeline_layout,
            pipelines: HashMap::new(),
            texture_bind_group_layout,
            object_bind_group_layout,
            frame_buffer,
            frame_bind_group,
            frame_written: false,
            object_uniforms,
            object_bind_group,
        }
    }

    fn create_pipeline(&self, key: PipelineKey, context: &RenderContext) -> wgpu::RenderPipeline {
        let ctxt = Context::get();
        let vertex_layouts = GpuMesh3d::vertex_layouts();
        let (topology, cull_mode) = if key.wireframe {
            (wgpu::PrimitiveTopology::LineList, None)
        } else {
            (wgpu::PrimitiveTopology::TriangleList, Some(wgpu::Face::Back))
        };

        log::debug!("creating surface pipeline {key:?}");

        ctxt.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("surface_pipeline"),
            layout: Some(&self.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &self.shader,
                entry_point: Some("vs_main"),
                buffers: &vertex_layouts,
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &self.shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: context.surface_format,
                    blend: blend_state(key.blending, key.transparent),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(depth_stencil(key.depth_write)),
            multisample: wgpu::MultisampleState {
                count: context.sample_count,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        })
    }

    fn texture_bind_group(&self, textures: &[Arc<Texture>; 4]) -> wgpu::BindGroup {
        let mut entries = Vec::with_capacity(8);
        for (slot, texture) in textures.iter().enumerate() {
            entries.push(wgpu::BindGroupEntry {
                binding: slot as u32 * 2,
                resource: wgpu::BindingResource::TextureView(&texture.view),
            });
            entries.push(wgpu::BindGroupEntry {
                binding: slot as u32 * 2 + 1,
                resource: wgpu::BindingResource::Sampler(&texture.sampler),
            });
        }

        Context::get().create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("surface_texture_bind_group"),
            layout: &self.texture_bind_group_layout,
            entries: &entries,
        })
    }
}

impl Material3d for SurfaceMaterial {
    fn create_gpu_data(&self) -> Box<dyn GpuData> {
        Box::new(SurfaceGpuData {
            offset: 0,
            textures: None,
        })
    }

    fn begin_frame(&mut self) {
        self.frame_written = false;
        self.object_uniforms.clear();
    }

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
    ) {
        let MaterialParams::Surface(params) = data.params() else {
            return;
        };
        let Some(gpu_data) = gpu_data.as_any_mut().downcast_mut::<SurfaceGpuData>() else {
            return;
        };

        mesh.upload();

        if !self.frame_written {
            let frame = FrameUniforms::new(camera, lights, context);
            Context::get().write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(&frame));
            self.frame_written = true;
        }

        gpu_data.offset = self.object_uniforms.push(&params.uniforms(transform, scale));

        let textures = TextureManager::get_global_manager(|tm| {
            params.texture_slots().map(|name| tm.get_or_fallback(name))
        });
        let unchanged = gpu_data.textures.as_ref().is_some_and(|(bound, _)| {
            bound.iter().zip(&textures).all(|(a, b)| Arc::ptr_eq(a, b))
        });
        if !unchanged {
            let bind_group = self.texture_bind_group(&textures);
            gpu_data.textures = Some((textures, bind_group));
        }

        let key = params.pipeline_key();
        if !self.pipelines.contains_key(&key) {
            let pipeline = self.create_pipeline(key, context);
            let _ = self.pipelines.insert(key, pipeline);
        }
    }

    fn flush(&mut self) {
        if self.object_uniforms.flush() {
            self.object_bind_group = object_bind_group(
                "surface_object_bind_group",
                &self.object_bind_group_layout,
                self.object_uniforms.buffer(),
                DynamicUniformBuffer::<ObjectUniforms>::binding_size(),
            );
        }
    }

    fn render(
        &mut self,
        data: &ObjectData3d,
        mesh: &GpuMesh3d,
        gpu_data: &mut dyn GpuData,
        pass: &mut wgpu::RenderPass<'_>,
        _context: &RenderContext,
    ) {
        let MaterialParams::Surface(params) = data.params() else {
            return;
        };
        let Some(gpu_data) = gpu_data.as_any_mut().downcast_mut::<SurfaceGpuData>() else {
            return;
        };
        let (Some(pipeline), Some((_, texture_bind_group))) =
            (self.pipelines.get(&params.pipeline_key()), &gpu_data.textures)
        else {
            return;
        };

        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &self.frame_bind_group, &[]);
        pass.set_bind_group(1, &self.object_bind_group, &[gpu_data.offset]);
        pass.set_bind_group(2, texture_bind_group, &[]);

        let index_count = if params.wireframe {
            mesh.bind_edges(pass)
        } else {
            mesh.bind_triangles(pass)
        };

        if index_count > 0 {
            pass.draw_indexed(0..index_count, 0, 0..1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::TextureFallback;

    #[test]
    fn object_uniforms_fit_the_shader_struct() {
        assert_eq!(std::mem::size_of::<ObjectUniforms>(), 176);
    }

    #[test]
    fn opacity_only_shows_when_transparent() {
        let opaque = SurfaceParams::basic(color::WHITE).uniforms(&Pose3::IDENTITY, Vec3::ONE);
        assert_eq!(opaque.flags[2], 1);

        let clouds = SurfaceParams::standard(color::WHITE)
            .with_opacity(0.8)
            .with_transparent(true)
            .with_blending(Blending::Additive)
            .uniforms(&Pose3::IDENTITY, Vec3::splat(1.003));
        assert_eq!(clouds.flags[2], 0);
        assert_eq!(clouds.color[3], 0.8);
    }

    #[test]
    fn unloaded_additive_layers_add_nothing() {
        let night = SurfaceParams::basic(color::WHITE)
            .with_map("earth-at-night.jpg")
            .with_blending(Blending::Additive);
        let fallbacks = night.texture_slots().map(TextureFallback::for_slot);
        assert_eq!(
            fallbacks,
            [
                TextureFallback::Empty,
                TextureFallback::White,
                TextureFallback::White,
                TextureFallback::White,
            ]
        );

        let clouds = SurfaceParams::standard(color::WHITE)
            .with_map("earthcloudmap.jpg")
            .with_alpha_map("earthcloudmaptrans.jpg");
        let [map, _, _, alpha] = clouds.texture_slots().map(TextureFallback::for_slot);
        assert_eq!(map.texel()[..3], [0, 0, 0]);
        assert_eq!(alpha.texel()[1], 0);
    }

    #[test]
    fn bump_is_disabled_without_a_map() {
        let plain = SurfaceParams::phong(color::WHITE).uniforms(&Pose3::IDENTITY, Vec3::ONE);
        assert_eq!(plain.params[0], 0.0);

        let bumped = SurfaceParams::phong(color::WHITE)
            .with_bump_map("bump", 0.04)
            .uniforms(&Pose3::IDENTITY, Vec3::ONE);
        assert_eq!(bumped.params[0], 0.04);
    }

    #[test]
    fn wireframes_get_their_own_pipeline() {
        let solid = SurfaceParams::standard(color::WHITE);
        let wire = solid.clone().with_wireframe(true);
        assert_ne!(solid.pipeline_key(), wire.pipeline_key());
    }
}
