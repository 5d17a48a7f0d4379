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

/// Parameters of the view-dependent glow drawn by the [`FresnelMaterial`].
///
/// The glow factor is `bias + scale * (1 + dot(view, normal))^power`,
/// clamped to `[0, 1]`. It is both the blend weight between `facing` and
/// `rim` and the output alpha, so the shell fades where it faces the camera.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FresnelParams {
    /// Color at grazing angles.
    pub rim: Color,
    /// Color where the surface faces the viewer.
    pub facing: Color,
    pub bias: f32,
    pub scale: f32,
    pub power: f32,
}

impl Default for FresnelParams {
    fn default() -> Self {
        FresnelParams {
            rim: color::from_hex(0x0088ff),
            facing: color::BLACK,
            bias: 0.1,
            scale: 1.0,
            power: 4.0,
        }
    }
}

impl FresnelParams {
    pub fn new(rim: Color, facing: Color) -> Self {
        FresnelParams {
            rim,
            facing,
            ..Default::default()
        }
    }

    pub fn with_bias(mut self, bias: f32) -> Self {
        self.bias = bias;
        self
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_power(mut self, power: f32) -> Self {
        self.power = power;
        self
    }

    fn uniforms(&self, transform: &Pose3, scale: Vec3) -> ObjectUniforms {
        let (model, normal_matrix) = model_matrices(transform, scale);
        ObjectUniforms {
            model,
            normal_matrix,
            rim: linear_rgba(self.rim, 1.0),
            facing: linear_rgba(self.facing, 1.0),
            params: [self.bias, self.scale, self.power, 0.0],
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct ObjectUniforms {
    model: [[f32; 4]; 4],
    normal_matrix: [[f32; 4]; 3],
    rim: [f32; 4],
    facing: [f32; 4],
    params: [f32; 4],
}

struct FresnelGpuData {
    offset: u32,
}

impl GpuData for FresnelGpuData {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Additive rim glow, used for atmospheres.
pub struct FresnelMaterial {
    shader: wgpu::ShaderModule,
    pipeline_layout: wgpu::PipelineLayout,
    pipeline: Option<wgpu::RenderPipeline>,
    object_bind_group_layout: wgpu::BindGroupLayout,
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    frame_written: bool,
    object_uniforms: DynamicUniformBuffer<ObjectUniforms>,
    object_bind_group: wgpu::BindGroup,
}

impl FresnelMaterial {
    /// Name under which the material manager registers this material.
    pub const NAME: &'static str = "fresnel";

    pub fn new() -> FresnelMaterial {
        let ctxt = Context::get();
        let shader = ctxt.create_shader_module(Some("fresnel_shader"), include_str!("fresnel.wgsl"));

        let frame_layout = frame_bind_group_layout("fresnel_frame_bind_group_layout");
        let object_bind_group_layout = object_bind_group_layout(
            "fresnel_object_bind_group_layout",
            DynamicUniformBuffer::<ObjectUniforms>::binding_size(),
        );
        let pipeline_layout = ctxt.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("fresnel_pipeline_layout"),
            bind_group_layouts: &[&frame_layout, &object_bind_group_layout],
            push_constant_ranges: &[],
        });

        let frame_buffer = ctxt.create_buffer(&wgpu::BufferDescriptor {
            label: Some("fresnel_frame_uniforms"),
            size: std::mem::size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let frame_bind_group = ctxt.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("fresnel_frame_bind_group"),
            layout: &frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
        });

        let object_uniforms = DynamicUniformBuffer::new("fresnel_object_uniforms");
        let object_bind_group = object_bind_group(
            "fresnel_object_bind_group",
            &object_bind_group_layout,
            object_uniforms.buffer(),
            DynamicUniformBuffer::<ObjectUniforms>::binding_size(),
        );

        FresnelMaterial {
            shader,
            pipeline_layout,
            pipeline: None,
            object_bind_group_layout,
            frame_buffer,
            frame_bind_group,
            frame_written: false,
            object_uniforms,
            object_bind_group,
        }
    }

    fn create_pipeline(&self, context: &RenderContext) -> wgpu::RenderPipeline {
        let vertex_layouts = GpuMesh3d::vertex_layouts();

        Context::get().create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("fresnel_pipeline"),
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
                    blend: blend_state(Blending::Additive, true),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
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

impl Material3d for FresnelMaterial {
    fn create_gpu_data(&self) -> Box<dyn GpuData> {
        Box::new(FresnelGpuData { offset: 0 })
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
        let MaterialParams::Fresnel(params) = data.params() else {
            return;
        };
        let Some(gpu_data) = gpu_data.as_any_mut().downcast_mut::<FresnelGpuData>() else {
            return;
        };

        mesh.upload();

        if !self.frame_written {
            let frame = FrameUniforms::new(camera, lights, context);
            Context::get().write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(&frame));
            self.frame_written = true;
        }

        gpu_data.offset = self.object_uniforms.push(&params.uniforms(transform, scale));

        if self.pipeline.is_none() {
            self.pipeline = Some(self.create_pipeline(context));
        }
    }

    fn flush(&mut self) {
        if self.object_uniforms.flush() {
            self.object_bind_group = object_bind_group(
                "fresnel_object_bind_group",
                &self.object_bind_group_layout,
                self.object_uniforms.buffer(),
                DynamicUniformBuffer::<ObjectUniforms>::binding_size(),
            );
        }
    }

    fn render(
        &mut self,
        _data: &ObjectData3d,
        mesh: &GpuMesh3d,
        gpu_data: &mut dyn GpuData,
        pass: &mut wgpu::RenderPass<'_>,
        _context: &RenderContext,
    ) {
        let Some(gpu_data) = gpu_data.as_any_mut().downcast_mut::<FresnelGpuData>() else {
            return;
        };
        let Some(pipeline) = &self.pipeline else {
            return;
        };

        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &self.frame_bind_group, &[]);
        pass.set_bind_group(1, &self.object_bind_group, &[gpu_data.offset]);

        let index_count = mesh.bind_triangles(pass);
        if index_count > 0 {
            pass.draw_indexed(0..index_count, 0, 0..1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_uniforms_fit_the_shader_struct() {
        assert_eq!(std::mem::size_of::<ObjectUniforms>(), 160);
    }

    #[test]
    fn defaults_give_a_blue_rim_on_black() {
        let params = FresnelParams::default();
        assert_eq!(params.rim, color::from_hex(0x0088ff));
        assert_eq!(params.facing, color::BLACK);
        assert_eq!((params.bias, params.scale, params.power), (0.1, 1.0, 4.0));

        let uniforms = params.uniforms(&Pose3::IDENTITY, Vec3::splat(1.01));
        assert_eq!(uniforms.params, [0.1, 1.0, 4.0, 0.0]);
        assert_eq!(uniforms.rim[0], 0.0);
        assert_eq!(uniforms.rim[2], 1.0);
    }
}
