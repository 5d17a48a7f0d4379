//! GPU resource managers

pub use crate::resource::dynamic_buffer::DynamicUniformBuffer;
pub use crate::resource::gpu_vector::{BufferType, GpuVec};
pub use crate::resource::material::{
    GpuData, Material3d, OutputColorSpace, RenderContext, ToneMapping,
};
pub use crate::resource::material_manager3d::{MaterialManager3d, SharedMaterial};
pub use crate::resource::mesh3d::GpuMesh3d;
pub use crate::resource::texture_manager::{
    decode_image, Texture, TextureColorSpace, TextureFallback, TextureManager, TextureWrapping,
};

pub mod dynamic_buffer;
mod gpu_vector;
pub mod material;
mod material_manager3d;
pub mod mesh3d;
mod texture_manager;
