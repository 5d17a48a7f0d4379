//! The GPU context shared by every resource of a window.
//!
//! A single window owns the surface, but buffers, textures and pipelines are
//! created all over the crate. They reach the device through this thread-local
//! handle instead of threading it through every constructor.

use std::cell::RefCell;
use std::sync::Arc;

thread_local! {
    static CONTEXT_SINGLETON: RefCell<Option<Context>> = const { RefCell::new(None) };
}

/// Device, queue and surface format of the open window.
///
/// Cloning is cheap: every field is reference counted.
#[derive(Clone)]
pub struct Context {
    /// The instance the surface was created from.
    pub instance: Arc<wgpu::Instance>,
    /// The device every GPU resource is allocated on.
    pub device: Arc<wgpu::Device>,
    /// The queue used for uploads and submissions.
    pub queue: Arc<wgpu::Queue>,
    /// The adapter backing `device`.
    pub adapter: Arc<wgpu::Adapter>,
    /// Color format of the presentation surface.
    pub surface_format: wgpu::TextureFormat,
}

impl Context {
    /// Installs the context for the current thread, replacing any previous one.
    pub fn init(
        instance: wgpu::Instance,
        device: wgpu::Device,
        queue: wgpu::Queue,
        adapter: wgpu::Adapter,
        surface_format: wgpu::TextureFormat,
    ) {
        log::debug!("GPU context initialized with surface format {surface_format:?}");
        CONTEXT_SINGLETON.with(|cell| {
            *cell.borrow_mut() = Some(Context {
                instance: Arc::new(instance),
                device: Arc::new(device),
                queue: Arc::new(queue),
                adapter: Arc::new(adapter),
                surface_format,
            });
        });
    }

    /// A handle to the current context.
    ///
    /// # Panics
    /// Panics if no window has been opened on this thread.
    pub fn get() -> Context {
        Self::try_get().expect("GPU context not initialized: open a window first.")
    }

    /// A handle to the current context, or `None` before a window exists.
    ///
    /// Lazily-created GPU resources use this so scene graphs can be built and
    /// tested without a device.
    pub fn try_get() -> Option<Context> {
        CONTEXT_SINGLETON.with(|cell| cell.borrow().clone())
    }

    /// Whether a window has installed a context on this thread.
    pub fn is_initialized() -> bool {
        CONTEXT_SINGLETON.with(|cell| cell.borrow().is_some())
    }

    /// Destroys the device and forgets the context.
    ///
    /// Must run before thread-local destruction starts, otherwise wgpu may
    /// observe its own TLS already torn down.
    pub fn reset() {
        CONTEXT_SINGLETON.with(|cell| {
            if let Some(ctx) = cell.borrow_mut().take() {
                ctx.device.destroy();
                log::debug!("GPU context destroyed");
            }
        });
    }

    pub fn create_buffer(&self, desc: &wgpu::BufferDescriptor) -> wgpu::Buffer {
        self.device.create_buffer(desc)
    }

    pub fn create_buffer_init(
        &self,
        label: Option<&str>,
        contents: &[u8],
        usage: wgpu::BufferUsages,
    ) -> wgpu::Buffer {
        use wgpu::util::DeviceExt;
        self.device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label,
                contents,
                usage,
            })
    }

    pub fn write_buffer(&self, buffer: &wgpu::Buffer, offset: u64, data: &[u8]) {
        self.queue.write_buffer(buffer, offset, data);
    }

    pub fn create_texture(&self, desc: &wgpu::TextureDescriptor) -> wgpu::Texture {
        self.device.create_texture(desc)
    }

    pub fn create_sampler(&self, desc: &wgpu::SamplerDescriptor) -> wgpu::Sampler {
        self.device.create_sampler(desc)
    }

    pub fn create_bind_group_layout(
        &self,
        desc: &wgpu::BindGroupLayoutDescriptor,
    ) -> wgpu::BindGroupLayout {
        self.device.create_bind_group_layout(desc)
    }

    pub fn create_bind_group(&self, desc: &wgpu::BindGroupDescriptor) -> wgpu::BindGroup {
        self.device.create_bind_group(desc)
    }

    pub fn create_pipeline_layout(
        &self,
        desc: &wgpu::PipelineLayoutDescriptor,
    ) -> wgpu::PipelineLayout {
        self.device.create_pipeline_layout(desc)
    }

    pub fn create_render_pipeline(
        &self,
        desc: &wgpu::RenderPipelineDescriptor,
    ) -> wgpu::RenderPipeline {
        self.device.create_render_pipeline(desc)
    }

    /// Compiles a WGSL module.
    pub fn create_shader_module(&self, label: Option<&str>, source: &str) -> wgpu::ShaderModule {
        self.device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label,
                source: wgpu::ShaderSource::Wgsl(source.into()),
            })
    }

    pub fn create_command_encoder(&self, label: Option<&str>) -> wgpu::CommandEncoder {
        self.device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label })
    }

    pub fn submit<I: IntoIterator<Item = wgpu::CommandBuffer>>(&self, command_buffers: I) {
        self.queue.submit(command_buffers);
    }

    pub fn write_texture(
        &self,
        texture: wgpu::TexelCopyTextureInfo,
        data: &[u8],
        data_layout: wgpu::TexelCopyBufferLayout,
        size: wgpu::Extent3d,
    ) {
        self.queue.write_texture(texture, data, data_layout, size);
    }

    /// Format of every depth attachment.
    pub fn depth_format() -> wgpu::TextureFormat {
        wgpu::TextureFormat::Depth32Float
    }
}
