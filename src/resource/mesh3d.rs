//! Data structure of a scene node geometry.

use crate::procedural::{utils, RenderMesh};
use crate::resource::gpu_vector::{BufferType, GpuVec};
use glamx::{Vec2, Vec3};
use std::collections::HashSet;

/// A mesh whose attributes are mirrored to the GPU on first draw.
///
/// Positions, normals and texture coordinates live in separate vertex
/// buffers. Triangles and the deduplicated edge list used for wireframe
/// rendering live in two index buffers. Meshes without faces are point clouds
/// and carry one color per vertex instead.
///
/// A mesh can be shared by several objects, each drawn with its own material.
pub struct GpuMesh3d {
    coords: GpuVec<Vec3>,
    normals: GpuVec<Vec3>,
    uvs: GpuVec<Vec2>,
    colors: Option<GpuVec<[f32; 4]>>,
    faces: GpuVec<[u32; 3]>,
    edges: GpuVec<[u32; 2]>,
}

/// Each undirected edge of `faces` once, smaller index first.
pub fn unique_edges(faces: &[[u32; 3]]) -> Vec<[u32; 2]> {
    let mut seen = HashSet::with_capacity(faces.len() * 3 / 2);
    let mut edges = Vec::with_capacity(faces.len() * 3 / 2);

    for f in faces {
        for (a, b) in [(f[0], f[1]), (f[1], f[2]), (f[2], f[0])] {
            let edge = [a.min(b), a.max(b)];
            if seen.insert(edge) {
                edges.push(edge);
            }
        }
    }

    edges
}

impl GpuMesh3d {
    /// Creates a mesh from its CPU description.
    ///
    /// Missing normals are computed from the faces, missing texture
    /// coordinates are set to the origin. Nothing is uploaded yet.
    pub fn from_render_mesh(mesh: RenderMesh) -> GpuMesh3d {
        let RenderMesh {
            coords,
            normals,
            uvs,
            colors,
            faces,
        } = mesh;

        let normals = normals.unwrap_or_else(|| {
            let mut normals = Vec::new();
            utils::compute_normals(&coords, &faces, &mut normals);
            normals
        });
        let uvs = uvs.unwrap_or_else(|| vec![Vec2::ZERO; coords.len()]);
        let edges = unique_edges(&faces);

        GpuMesh3d {
            coords: GpuVec::new(coords, BufferType::Vertex, "mesh_positions"),
            normals: GpuVec::new(normals, BufferType::Vertex, "mesh_normals"),
            uvs: GpuVec::new(uvs, BufferType::Vertex, "mesh_uvs"),
            colors: colors.map(|c| GpuVec::new(c, BufferType::Vertex, "mesh_colors")),
            faces: GpuVec::new(faces, BufferType::Index, "mesh_faces"),
            edges: GpuVec::new(edges, BufferType::Index, "mesh_edges"),
        }
    }

    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.coords.len()
    }

    #[inline]
    pub fn num_triangles(&self) -> usize {
        self.faces.len()
    }

    #[inline]
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    #[inline]
    pub fn has_colors(&self) -> bool {
        self.colors.is_some()
    }

    #[inline]
    pub fn coords(&self) -> &[Vec3] {
        self.coords.data()
    }

    #[inline]
    pub fn faces(&self) -> &[[u32; 3]] {
        self.faces.data()
    }

    /// Uploads every attribute that changed since the last call.
    pub fn upload(&mut self) {
        let _ = self.coords.ensure_on_gpu();
        let _ = self.normals.ensure_on_gpu();
        let _ = self.uvs.ensure_on_gpu();
        let _ = self.faces.ensure_on_gpu();
        let _ = self.edges.ensure_on_gpu();
        if let Some(colors) = &mut self.colors {
            let _ = colors.ensure_on_gpu();
        }
    }

    /// Binds positions, normals and texture coordinates to slots 0, 1 and 2
    /// and the triangle index buffer. Returns the index count, zero when the
    /// mesh was not uploaded.
    pub fn bind_triangles(&self, pass: &mut wgpu::RenderPass<'_>) -> u32 {
        let (Some(coords), Some(normals), Some(uvs), Some(faces)) = (
            self.coords.buffer(),
            self.normals.buffer(),
            self.uvs.buffer(),
            self.faces.buffer(),
        ) else {
            return 0;
        };

        pass.set_vertex_buffer(0, coords.slice(..));
        pass.set_vertex_buffer(1, normals.slice(..));
        pass.set_vertex_buffer(2, uvs.slice(..));
        pass.set_index_buffer(faces.slice(..), wgpu::IndexFormat::Uint32);
        self.faces.len() as u32 * 3
    }

    /// Same as [`GpuMesh3d::bind_triangles`] with the edge list as index buffer.
    pub fn bind_edges(&self, pass: &mut wgpu::RenderPass<'_>) -> u32 {
        let (Some(coords), Some(normals), Some(uvs), Some(edges)) = (
            self.coords.buffer(),
            self.normals.buffer(),
            self.uvs.buffer(),
            self.edges.buffer(),
        ) else {
            return 0;
        };

        pass.set_vertex_buffer(0, coords.slice(..));
        pass.set_vertex_buffer(1, normals.slice(..));
        pass.set_vertex_buffer(2, uvs.slice(..));
        pass.set_index_buffer(edges.slice(..), wgpu::IndexFormat::Uint32);
        self.edges.len() as u32 * 2
    }

    /// Binds positions and colors to slots 0 and 1, one instance per vertex.
    ///
    /// Returns the instance count.
    pub fn bind_points(&self, pass: &mut wgpu::RenderPass<'_>) -> u32 {
        let (Some(coords), Some(colors)) = (
            self.coords.buffer(),
            self.colors.as_ref().and_then(|c| c.buffer()),
        ) else {
            return 0;
        };

        pass.set_vertex_buffer(0, coords.slice(..));
        pass.set_vertex_buffer(1, colors.slice(..));
        self.coords.len() as u32
    }

    /// Layouts of the three vertex buffers bound by [`GpuMesh3d::bind_triangles`].
    pub fn vertex_layouts() -> [wgpu::VertexBufferLayout<'static>; 3] {
        [
            wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<Vec3>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &[wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Float32x3,
                    offset: 0,
                    shader_location: 0,
                }],
            },
            wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<Vec3>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &[wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Float32x3,
                    offset: 0,
                    shader_location: 1,
                }],
            },
            wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<Vec2>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &[wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Float32x2,
                    offset: 0,
                    shader_location: 2,
                }],
            },
        ]
    }

    /// Layouts of the two per-instance buffers bound by [`GpuMesh3d::bind_points`].
    pub fn point_layouts() -> [wgpu::VertexBufferLayout<'static>; 2] {
        [
            wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<Vec3>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Instance,
                attributes: &[wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Float32x3,
                    offset: 0,
                    shader_location: 0,
                }],
            },
            wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<[f32; 4]>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Instance,
                attributes: &[wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Float32x4,
                    offset: 0,
                    shader_location: 1,
                }],
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::procedural;

    #[test]
    fn closed_mesh_has_three_halves_edges_per_face() {
        let sphere = procedural::icosphere(1.0, 5);
        let faces = sphere.faces.len();
        let mesh = GpuMesh3d::from_render_mesh(sphere);
        assert!(mesh.num_edges() >= faces * 3 / 2);
    }

    #[test]
    fn shared_edges_are_listed_once() {
        let edges = unique_edges(&[[0, 1, 2], [2, 1, 3]]);
        assert_eq!(edges, vec![[0, 1], [1, 2], [0, 2], [1, 3], [2, 3]]);
    }

    #[test]
    fn point_clouds_keep_their_colors() {
        let stars = procedural::starfield(10, 0);
        let mesh = GpuMesh3d::from_render_mesh(stars);
        assert!(mesh.has_colors());
        assert_eq!(mesh.num_vertices(), 10);
        assert_eq!(mesh.num_triangles(), 0);
        assert_eq!(mesh.num_edges(), 0);
    }
}
