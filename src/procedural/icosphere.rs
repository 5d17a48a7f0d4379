//! Subdivided icosahedron projected onto a sphere.

use super::RenderMesh;
use glamx::{Vec2, Vec3};
use std::collections::HashMap;
use std::f32::consts::{PI, TAU};

const ICOSAHEDRON_FACES: [[u32; 3]; 20] = [
    [0, 11, 5],
    [0, 5, 1],
    [0, 1, 7],
    [0, 7, 10],
    [0, 10, 11],
    [1, 5, 9],
    [5, 11, 4],
    [11, 10, 2],
    [10, 7, 6],
    [7, 1, 8],
    [3, 9, 4],
    [3, 4, 2],
    [3, 2, 6],
    [3, 6, 8],
    [3, 8, 9],
    [4, 9, 5],
    [2, 4, 11],
    [6, 2, 10],
    [8, 6, 7],
    [9, 8, 1],
];

fn icosahedron_vertices() -> [Vec3; 12] {
    let t = (1.0 + 5.0f32.sqrt()) / 2.0;
    [
        Vec3::new(-1.0, t, 0.0),
        Vec3::new(1.0, t, 0.0),
        Vec3::new(-1.0, -t, 0.0),
        Vec3::new(1.0, -t, 0.0),
        Vec3::new(0.0, -1.0, t),
        Vec3::new(0.0, 1.0, t),
        Vec3::new(0.0, -1.0, -t),
        Vec3::new(0.0, 1.0, -t),
        Vec3::new(t, 0.0, -1.0),
        Vec3::new(t, 0.0, 1.0),
        Vec3::new(-t, 0.0, -1.0),
        Vec3::new(-t, 0.0, 1.0),
    ]
}

/// A point of a subdivided face, as integer barycentric weights over icosahedron vertices.
///
/// Sorted by vertex index with zero weights removed, so faces sharing an edge
/// produce the same key for the points on that edge.
type LatticeKey = [(u32, u32); 3];

fn lattice_key(corners: [u32; 3], weights: [u32; 3]) -> LatticeKey {
    let mut key = [(u32::MAX, 0); 3];
    for (slot, (v, w)) in corners.into_iter().zip(weights).enumerate() {
        if w != 0 {
            key[slot] = (v, w);
        }
    }
    key.sort_unstable();
    key
}

/// Longitude in radians, 0 towards -X.
fn azimuth(v: Vec3) -> f32 {
    v.z.atan2(-v.x)
}

fn inclination(v: Vec3) -> f32 {
    (-v.y).atan2((v.x * v.x + v.z * v.z).sqrt())
}

/// Builds a sphere of the given `radius` from an icosahedron whose faces are
/// each split into `(detail + 1)²` triangles.
///
/// Texture coordinates are equirectangular with `v = 0` at the north pole,
/// the top row of an image texture. Vertices on the texture seam and
/// at the poles are duplicated so no triangle interpolates across the wrap.
/// Normals point outward from the center.
pub fn icosphere(radius: f32, detail: u32) -> RenderMesh {
    let base = icosahedron_vertices();
    let cols = detail + 1;

    let mut lattice: HashMap<LatticeKey, Vec3> = HashMap::new();
    let mut corners: Vec<[(LatticeKey, Vec3); 3]> =
        Vec::with_capacity(ICOSAHEDRON_FACES.len() * (cols * cols) as usize);

    for face in ICOSAHEDRON_FACES {
        let [a, b, c] = face.map(|i| base[i as usize]);

        let mut point = |i: u32, j: u32| {
            let rows = cols - i;
            let weights = [rows - j, j, i];
            let key = lattice_key(face, weights);
            let pos = *lattice.entry(key).or_insert_with(|| {
                let [wa, wb, wc] = weights.map(|w| w as f32);
                ((a * wa + b * wb + c * wc) / cols as f32).normalize() * radius
            });
            (key, pos)
        };

        for i in 0..cols {
            for j in 0..2 * (cols - i) - 1 {
                let k = j / 2;
                if j % 2 == 0 {
                    corners.push([point(i, k + 1), point(i + 1, k), point(i, k)]);
                } else {
                    corners.push([point(i, k + 1), point(i + 1, k + 1), point(i + 1, k)]);
                }
            }
        }
    }

    let mut coords = Vec::new();
    let mut normals = Vec::new();
    let mut uvs = Vec::new();
    let mut faces = Vec::with_capacity(corners.len());
    let mut vertex_ids: HashMap<(LatticeKey, u32), u32> = HashMap::new();

    for triangle in &corners {
        let centroid = (triangle[0].1 + triangle[1].1 + triangle[2].1) / 3.0;
        let centroid_azimuth = azimuth(centroid);

        let mut tri_uvs = triangle.map(|(_, p)| {
            let mut uv = Vec2::new(
                azimuth(p) / TAU + 0.5,
                inclination(p) / PI + 0.5,
            );
            if centroid_azimuth < 0.0 && uv.x == 1.0 {
                uv.x -= 1.0;
            }
            if p.x == 0.0 && p.z == 0.0 {
                uv.x = centroid_azimuth / TAU + 0.5;
            }
            uv
        });

        let max_u = tri_uvs.iter().fold(f32::MIN, |m, uv| m.max(uv.x));
        let min_u = tri_uvs.iter().fold(f32::MAX, |m, uv| m.min(uv.x));
        if max_u > 0.9 && min_u < 0.1 {
            for uv in tri_uvs.iter_mut().filter(|uv| uv.x < 0.2) {
                uv.x += 1.0;
            }
        }

        let mut face = [0; 3];
        for (slot, ((key, pos), uv)) in triangle.iter().zip(tri_uvs).enumerate() {
            let id = *vertex_ids.entry((*key, uv.x.to_bits())).or_insert_with(|| {
                coords.push(*pos);
                normals.push(pos.normalize());
                uvs.push(uv);
                coords.len() as u32 - 1
            });
            face[slot] = id;
        }
        faces.push(face);
    }

    RenderMesh::new(coords, Some(normals), Some(uvs), Some(faces))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn distinct_positions(mesh: &RenderMesh) -> usize {
        mesh.coords
            .iter()
            .map(|p| [p.x.to_bits(), p.y.to_bits(), p.z.to_bits()])
            .collect::<HashSet<_>>()
            .len()
    }

    #[test]
    fn counts_match_the_subdivision_level() {
        for detail in [0, 1, 5, 12] {
            let mesh = icosphere(1.0, detail);
            let n = (detail + 1) as usize;
            assert_eq!(mesh.num_triangles(), 20 * n * n, "detail {detail}");
            assert_eq!(distinct_positions(&mesh), 10 * n * n + 2, "detail {detail}");
        }
    }

    #[test]
    fn every_vertex_lies_on_the_sphere() {
        let mesh = icosphere(2.5, 3);
        for (p, n) in mesh.coords.iter().zip(mesh.normals.as_ref().unwrap()) {
            assert!((p.length() - 2.5).abs() < 1e-4);
            assert!((*p / 2.5 - *n).length() < 1e-4);
        }
    }

    #[test]
    fn triangles_wind_outward() {
        let mesh = icosphere(1.0, 2);
        for f in &mesh.faces {
            let [a, b, c] = f.map(|i| mesh.coords[i as usize]);
            let normal = (b - a).cross(c - a);
            assert!(normal.dot(a + b + c) > 0.0);
        }
    }

    #[test]
    fn no_triangle_wraps_around_the_texture() {
        let mesh = icosphere(1.0, 12);
        let uvs = mesh.uvs.as_ref().unwrap();
        for f in &mesh.faces {
            let us = f.map(|i| uvs[i as usize].x);
            let span = us.iter().cloned().fold(f32::MIN, f32::max)
                - us.iter().cloned().fold(f32::MAX, f32::min);
            assert!(span < 0.75, "triangle {f:?} spans {span}");
        }
    }
}
