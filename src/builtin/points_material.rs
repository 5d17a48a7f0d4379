use super::{
    blend_state, depth_stencil, frame_bind_group_layout, linear_rgba, model_matrices,
    object_bind_group, object_bind_group_layout, Blending, FrameUniforms, MaterialParams,
};
use crate::camera::Camera3d;
use crate::color::{self, Color};
use crate::context::Context;
use crate::light::LightCollection;
use crate::resource::{DynamicUniformBuffer, GpuData, GpuMesh3d, Material3d, RenderContext};
use crate::scene::ObjectData3d;
use bytemuck::{Pod, Zeroable};
use glamx::{Pose3, Vec3};
use std::any::Any;

/// Parameters of a point cloud drawn by the [`PointsMaterial`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PointsParams {
    /// Diameter in world units when `size_attenuation` is set, in pixels otherwise.
    pub size: f32,
    pub size_attenuation: bool,
    pub color: Color,
    /// Multiply `color` by the per-point colors of the mesh.
    pub vertex_colors: bool,
    pub opacity: f32,
    pub transparent: bool,
}

impl Default for PointsParams {
    fn default() -> Self {
        PointsParams {
            size: 0.2,
            size_attenuation: true,
            color: color::WHITE,
            vertex_colors: true,
            opacity: 1.0,
            transparent: false,
        }
    }
}

impl PointsParams {
    pub fn new(size: f32) -> Self {
        PointsParams {
            size,
            ..Default::default()
        }
    }

    pub fn with_size_attenuation(mut self, size_attenuation: bool) -> Self {
        self.size_attenuation = size_attenuation;
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_vertex_colors(mut self, vertex_colors: bool) -> Self {
        self.vertex_colors = vertex_colors;
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self.transparent = opacity < 1.0;
        self
    }

    fn uniforms(&self, transform: &Pose3, scale: Vec3) -> ObjectUniforms {
        let (model, _) = model_matrices(transform, scale);
        let flag = |b: bool| if b { 1.0 } else { 0.0 };
        ObjectUniforms {
            model,
            color: linear_rgba(self.color, self.opacity),
            params: [
                self.size,
                flag(self.size_attenuation),
                flag(self.vertex_colors),
                flag(!self.transparent),
            ],
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct ObjectUniforms {
    model: [[f32; 4]; 4],
    color: [f32; 4],
    params: [f32; 4],
}

struct PointsGpuData {
    offset: u32,
}

impl GpuData for PointsGpuData {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Draws every vertex of a mesh as a round sprite facing the camera.
///
/// The mesh must carry per-vertex colors (see `RenderMesh::point_cloud`).
pub struct PointsMaterial {
    shader: wgpu::ShaderModule,
    pipeline_layout: wgpu::PipelineLayout,
    opaque_pipeline: Option<wgpu::RenderPipeline>,
    transparent_pipeline: Option<wgpu::RenderPipeline>,
    object_bind_group_layout: wgpu::BindGroupLayout,
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    frame_written: bool,
    object_uniforms: DynamicUniformBuffer<ObjectUniforms>,
    object_bind_group: wgpu::BindGroup,
}

impl PointsMaterial {
    /// Name under which the material manager registers this material.
    pub const NAME: &'static str = "points";

    pub fn new() -> PointsMaterial {
        let ctxt = Context::get();
        let shader = ctxt.create_shader_module(Some("points_shader"), include_str!("points.wgsl"));

        let frame_layout = frame_bind_group_layout("points_frame_bind_group_layout");
        let object_bind_group_layout = object_bind_group_layout(
            "points_object_bind_group_layout",
            DynamicUniformBuffer::<ObjectUniforms>::binding_size(),
        );
        let pipeline_layout = ctxt.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("points_pipeline_layout"),
            bind_group_layouts: &[&frame_layout, &object_bind_group_layout],
            push_constant_ranges: &[],
        });

        let frame_buffer = ctxt.create_buffer(&wgpu::BufferDescriptor {
            label: Some("points_frame_uniforms"),
            size: std::mem::size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let frame_bind_group = ctxt.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("points_frame_bind_group"),
            layout: &frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
        });

        let object_uniforms = DynamicUniformBuffer::new("points_object_uniforms");
        let object_bind_group = object_bind_group(
            "points_object_bind_group",
            &object_bind_group_layout,
            object_uniforms.buffer(),
            DynamicUniformBuffer::<ObjectUniforms>::binding_size(),
        );

        PointsMaterial {
            shader,
            pipeline_layout,
            opaque_pipeline: None,
            transparent_pipeline: None,
            object_bind_group_layout,
            frame_buffer,
            frame_bind_group,
            frame_written: false,
            object_uniforms,
            object_bind_group,
        }
    }

    fn create_pipeline(&self, transparent: bool, context: &RenderContext) -> wgpu::RenderPipeline {
        let instance_layouts = GpuMesh3d::point_layouts();

        Context::get().create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("points_pipeline"),
            layout: Some(&self.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &self.shader,
                entry_point: Some("vs_main"),
                buffers: &instance_layouts,
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &self.shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: context.surface_format,
                    blend: blend_state(Blending::Normal, transparent),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(depth_stencil(true)),
            multisample: wgpu::MultisampleState {
                count: context.sample_count,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        })
    }
}

impl Material3d for PointsMaterial {
    fn create_gpu_data(&self) -> Box<dyn GpuData> {
        Box::new(PointsGpuData { offset: 0 })
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
        let MaterialParams::Points(params) = data.params() else {
            return;
        };
        let Some(gpu_data) = gpu_data.as_any_mut().downcast_mut::<PointsGpuData>() else {
            return;
        };

        mesh.upload();

        if !self.frame_written {
            let frame = FrameUniforms::new(camera, lights, context);
            Context::get().write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(&frame));
            self.frame_written = true;
        }

        gpu_data.offset = self.object_uniforms.push(&params.uniforms(transform, scale));

        if params.transparent && self.transparent_pipeline.is_none() {
            self.transparent_pipeline = Some(self.create_pipeline(true, context));
        } else if !params.transparent && self.opaque_pipeline.is_none() {
            self.opaque_pipeline = Some(self.create_pipeline(false, context));
        }
    }

    fn flush(&mut self) {
        if self.object_uniforms.flush() {
            self.object_bind_group = object_bind_group(
                "points_object_bind_group",
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
        let MaterialParams::Points(params) = data.params() else {
            return;
        };
        let Some(gpu_data) = gpu_data.as_any_mut().downcast_mut::<PointsGpuData>() else {
            return;
        };
        let pipeline = if params.transparent {
            &self.transparent_pipeline
        } else {
            &self.opaque_pipeline
        };
        let Some(pipeline) = pipeline else {
            return;
        };

        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &self.frame_bind_group, &[]);
        pass.set_bind_group(1, &self.object_bind_group, &[gpu_data.offset]);

        let instances = mesh.bind_points(pass);
        if instances > 0 {
            pass.draw(0..6, 0..instances);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_defaults() {
        let params = PointsParams::default();
        assert_eq!(params.size, 0.2);
        assert!(params.size_attenuation);
        assert!(params.vertex_colors);
        assert!(!params.transparent);
    }

    #[test]
    fn translucent_points_are_blended() {
        let params = PointsParams::new(2.0).with_opacity(0.5);
        assert!(params.transparent);

        let uniforms = params.uniforms(&Pose3::IDENTITY, Vec3::ONE);
        assert_eq!(uniforms.color[3], 0.5);
        assert_eq!(uniforms.params[3], 0.0);
    }
}
