use super::utils;
use glamx::{Pose3, Vec2, Vec3};

/// Geometric description of a mesh, before it is uploaded to the GPU.
///
/// Vertices, normals, texture coordinates and colors share the index buffer.
/// A mesh without faces is a point cloud.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RenderMesh {
    /// Coordinates of the mesh vertices.
    pub coords: Vec<Vec3>,
    /// Vertex normals. Computed from the faces when missing.
    pub normals: Option<Vec<Vec3>>,
    /// Texture coordinates.
    pub uvs: Option<Vec<Vec2>>,
    /// Per-vertex colors, linear RGBA.
    pub colors: Option<Vec<[f32; 4]>>,
    /// Counter-clockwise triangles.
    pub faces: Vec<[u32; 3]>,
}

impl RenderMesh {
    /// Creates a new mesh.
    ///
    /// If no `faces` are provided, every three consecutive vertices form a triangle.
    pub fn new(
        coords: Vec<Vec3>,
        normals: Option<Vec<Vec3>>,
        uvs: Option<Vec<Vec2>>,
        faces: Option<Vec<[u32; 3]>>,
    ) -> RenderMesh {
        let faces = faces.unwrap_or_else(|| {
            (0..coords.len() as u32 / 3)
                .map(|i| [i * 3, i * 3 + 1, i * 3 + 2])
                .collect()
        });

        RenderMesh {
            coords,
            normals,
            uvs,
            colors: None,
            faces,
        }
    }

    /// A face-less mesh drawn as points, one color per point.
    pub fn point_cloud(coords: Vec<Vec3>, colors: Vec<[f32; 4]>) -> RenderMesh {
        assert_eq!(coords.len(), colors.len());
        RenderMesh {
            coords,
            normals: None,
            uvs: None,
            colors: Some(colors),
            faces: Vec::new(),
        }
    }

    #[inline]
    pub fn has_normals(&self) -> bool {
        self.normals.is_some()
    }

    #[inline]
    pub fn has_uvs(&self) -> bool {
        self.uvs.is_some()
    }

    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.coords.len()
    }

    #[inline]
    pub fn num_triangles(&self) -> usize {
        self.faces.len()
    }

    /// Translates each vertex of this mesh.
    pub fn translate_by(&mut self, t: Vec3) {
        for c in self.coords.iter_mut() {
            *c += t;
        }
    }

    /// Transforms each vertex and rotates each normal of this mesh.
    pub fn transform_by(&mut self, t: Pose3) {
        for c in self.coords.iter_mut() {
            *c = t * *c;
        }

        for n in self.normals.iter_mut().flatten() {
            *n = t.rotation * *n;
        }
    }

    /// Recomputes smooth normals from the faces.
    pub fn recompute_normals(&mut self) {
        let mut new_normals = Vec::new();
        utils::compute_normals(&self.coords, &self.faces, &mut new_normals);
        self.normals = Some(new_normals);
    }

    /// Appends `other`, shifting its indices.
    ///
    /// Attributes missing on either side are dropped from the result.
    pub fn append(&mut self, other: RenderMesh) {
        let base = self.coords.len() as u32;

        fn merge<T>(a: &mut Option<Vec<T>>, b: Option<Vec<T>>, a_empty: bool) {
            match (a.as_mut(), b) {
                (Some(a), Some(b)) => a.extend(b),
                (None, Some(b)) if a_empty => *a = Some(b),
                _ => *a = None,
            }
        }

        let empty = self.coords.is_empty();
        merge(&mut self.normals, other.normals, empty);
        merge(&mut self.uvs, other.uvs, empty);
        merge(&mut self.colors, other.colors, empty);
        self.coords.extend(other.coords);
        self.faces
            .extend(other.faces.iter().map(|f| [f[0] + base, f[1] + base, f[2] + base]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle(z: f32) -> RenderMesh {
        RenderMesh::new(
            vec![Vec3::new(0.0, 0.0, z), Vec3::X, Vec3::Y],
            None,
            Some(vec![Vec2::ZERO, Vec2::X, Vec2::Y]),
            None,
        )
    }

    #[test]
    fn sequential_faces_by_default() {
        let mesh = triangle(0.0);
        assert_eq!(mesh.faces, vec![[0, 1, 2]]);
    }

    #[test]
    fn append_offsets_indices_and_keeps_shared_attributes() {
        let mut a = triangle(0.0);
        a.append(triangle(1.0));
        assert_eq!(a.faces, vec![[0, 1, 2], [3, 4, 5]]);
        assert_eq!(a.uvs.as_ref().map(Vec::len), Some(6));
        assert!(a.normals.is_none());
    }

    #[test]
    fn recomputed_normals_face_the_winding() {
        let mut mesh = triangle(0.0);
        mesh.recompute_normals();
        for n in mesh.normals.unwrap() {
            assert!((n - Vec3::Z).length() < 1e-6);
        }
    }
}
