//! Extruded, bevelled 3D text.
//!
//! Glyph outlines are flattened into polygons, offset outward along per-vertex
//! bevel vectors to build a stack of layers, and closed with two tessellated
//! caps. Every triangle gets its own vertices so the normals are flat.

use super::Font;
use crate::error::{Error, Result};
use crate::procedural::{utils, RenderMesh};
use glamx::{Vec2, Vec3};
use lyon_geom::{point, CubicBezierSegment, QuadraticBezierSegment};
use lyon_path::Path;
use lyon_tessellation::{
    BuffersBuilder, FillOptions, FillRule, FillTessellator, FillVertex, VertexBuffers,
};
use std::f32::consts::FRAC_PI_2;

/// Shape of extruded text.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TextGeometry {
    /// Height of one em.
    pub size: f32,
    /// Extrusion length along +Z, bevels excluded.
    pub depth: f32,
    /// Points per quadratic or cubic outline segment.
    pub curve_segments: u32,
    pub bevel_enabled: bool,
    /// How far the bevel extends beyond each face along Z.
    pub bevel_thickness: f32,
    /// How far the bevel extends outward from the outline.
    pub bevel_size: f32,
    /// Outward offset of the outline where the bevel starts.
    pub bevel_offset: f32,
    pub bevel_segments: u32,
}

impl Default for TextGeometry {
    fn default() -> Self {
        TextGeometry {
            size: 0.5,
            depth: 0.3,
            curve_segments: 12,
            bevel_enabled: true,
            bevel_thickness: 0.03,
            bevel_size: 0.05,
            bevel_offset: 0.0,
            bevel_segments: 3,
        }
    }
}

impl TextGeometry {
    /// `(z, outward offset)` of every layer, from the front cap to the back cap.
    fn layers(&self) -> Vec<(f32, f32)> {
        if !self.bevel_enabled || self.bevel_segments == 0 {
            return vec![(0.0, 0.0), (self.depth, 0.0)];
        }

        let segments = self.bevel_segments;
        let bevel = |b: u32| {
            let t = b as f32 / segments as f32;
            (
                self.bevel_thickness * (t * FRAC_PI_2).cos(),
                self.bevel_size * (t * FRAC_PI_2).sin() + self.bevel_offset,
            )
        };

        let mut layers = Vec::with_capacity(segments as usize * 2 + 2);
        for b in 0..segments {
            let (z, offset) = bevel(b);
            layers.push((-z, offset));
        }
        let full = self.bevel_size + self.bevel_offset;
        layers.push((0.0, full));
        layers.push((self.depth, full));
        for b in (0..segments).rev() {
            let (z, offset) = bevel(b);
            layers.push((self.depth + z, offset));
        }
        layers
    }
}

/// Flattens glyph outlines into closed polygons, y up.
struct OutlineCollector {
    offset: Vec2,
    segments: u32,
    current: Vec<Vec2>,
    contours: Vec<Vec<Vec2>>,
}

impl OutlineCollector {
    fn new(offset: Vec2, segments: u32) -> Self {
        OutlineCollector {
            offset,
            segments: segments.max(1),
            current: Vec::new(),
            contours: Vec::new(),
        }
    }

    // rusttype outlines are y-down.
    fn map(&self, x: f32, y: f32) -> Vec2 {
        Vec2::new(self.offset.x + x, self.offset.y - y)
    }

    fn last(&self) -> Vec2 {
        self.current.last().copied().unwrap_or(self.offset)
    }

    fn sample(&mut self, f: impl Fn(f32) -> Vec2) {
        for i in 1..=self.segments {
            self.current.push(f(i as f32 / self.segments as f32));
        }
    }

    fn finish(&mut self) {
        let mut contour = std::mem::take(&mut self.current);
        contour.dedup_by(|a, b| a.distance_squared(*b) < 1.0e-12);
        while contour.len() > 1
            && contour[0].distance_squared(contour[contour.len() - 1]) < 1.0e-12
        {
            let _ = contour.pop();
        }
        if contour.len() >= 3 {
            self.contours.push(contour);
        }
    }
}

impl rusttype::OutlineBuilder for OutlineCollector {
    fn move_to(&mut self, x: f32, y: f32) {
        self.finish();
        let p = self.map(x, y);
        self.current.push(p);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let p = self.map(x, y);
        self.current.push(p);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (from, ctrl, to) = (self.last(), self.map(x1, y1), self.map(x, y));
        let curve = QuadraticBezierSegment {
            from: point(from.x, from.y),
            ctrl: point(ctrl.x, ctrl.y),
            to: point(to.x, to.y),
        };
        self.sample(|t| {
            let p = curve.sample(t);
            Vec2::new(p.x, p.y)
        });
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (from, ctrl1, ctrl2, to) = (
            self.last(),
            self.map(x1, y1),
            self.map(x2, y2),
            self.map(x, y),
        );
        let curve = CubicBezierSegment {
            from: point(from.x, from.y),
            ctrl1: point(ctrl1.x, ctrl1.y),
            ctrl2: point(ctrl2.x, ctrl2.y),
            to: point(to.x, to.y),
        };
        self.sample(|t| {
            let p = curve.sample(t);
            Vec2::new(p.x, p.y)
        });
    }

    fn close(&mut self) {
        self.finish();
    }
}

/// Lays `text` out on the XY plane and returns the polygons of each glyph.
///
/// The first line's baseline is `y = 0` and starts at `x = 0`; `\n` starts a
/// new line below. Pairs are kerned.
pub fn glyph_contours(font: &Font, text: &str, params: &TextGeometry) -> Vec<Vec<Vec<Vec2>>> {
    let scale = font.scale_for_em(params.size);
    let line_height = font.line_height(params.size);
    let mut glyphs = Vec::new();
    let mut caret = Vec2::ZERO;
    let mut previous = None;

    for ch in text.chars() {
        if ch == '\n' {
            caret = Vec2::new(0.0, caret.y - line_height);
            previous = None;
            continue;
        }

        let glyph = font.font().glyph(ch);
        let id = glyph.id();
        if let Some(previous) = previous {
            caret.x += font.font().pair_kerning(scale, previous, id);
        }

        let glyph = glyph.scaled(scale);
        // Whitespace and `.notdef` (id 0) only move the caret.
        let drawn = !ch.is_whitespace() && id.0 != 0;
        let mut collector = OutlineCollector::new(caret, params.curve_segments);
        if drawn && glyph.build_outline(&mut collector) {
            collector.finish();
            if !collector.contours.is_empty() {
                glyphs.push(collector.contours);
            }
        }

        caret.x += glyph.h_metrics().advance_width;
        previous = Some(id);
    }

    glyphs
}

/// Builds the extruded mesh of `text`.
///
/// Fails with [`Error::EmptyText`] when no glyph has an outline (empty or
/// whitespace-only text, or characters missing from the font).
pub fn extrude_text(font: &Font, text: &str, params: &TextGeometry) -> Result<RenderMesh> {
    extrude_contours(glyph_contours(font, text, params), params)
}

/// Extrudes polygons grouped per glyph. Outer contours and holes are told
/// apart by the non-zero rule, whatever their orientation.
pub fn extrude_contours(glyphs: Vec<Vec<Vec<Vec2>>>, params: &TextGeometry) -> Result<RenderMesh> {
    let layers = params.layers();
    let mut builder = TriangleSoup::default();

    for mut contours in glyphs {
        // Material on the right of every contour: outer contours clockwise.
        let area: f32 = contours.iter().map(|c| utils::signed_area(c)).sum();
        if area > 0.0 {
            contours.iter_mut().for_each(|c| c.reverse());
        }

        let bevels: Vec<Vec<Vec2>> = contours.iter().map(|c| bevel_vectors(c)).collect();
        let layer_points = |layer: usize, contour: usize| -> Vec<Vec3> {
            let (z, offset) = layers[layer];
            contours[contour]
                .iter()
                .zip(&bevels[contour])
                .map(|(p, v)| (*p + *v * offset).extend(z))
                .collect()
        };

        let first = 0;
        let last = layers.len() - 1;
        let cap: Vec<Vec<Vec3>> = (0..contours.len()).map(|c| layer_points(first, c)).collect();
        let cap_triangles = tessellate(&cap)?;
        let (front_z, back_z) = (layers[first].0, layers[last].0);

        for [a, b, c] in cap_triangles {
            // The back cap faces +Z (counter-clockwise seen from +Z).
            let ccw = [a, b, c];
            let cw = [a, c, b];
            let (back, front) = if utils::signed_area(&ccw) >= 0.0 {
                (ccw, cw)
            } else {
                (cw, ccw)
            };
            builder.push_cap(front.map(|p| p.extend(front_z)));
            builder.push_cap(back.map(|p| p.extend(back_z)));
        }

        for contour in 0..contours.len() {
            for layer in 0..last {
                let lower = layer_points(layer, contour);
                let upper = layer_points(layer + 1, contour);
                for i in 0..lower.len() {
                    let j = (i + 1) % lower.len();
                    builder.push_wall(lower[i], lower[j], upper[j], upper[i]);
                }
            }
        }
    }

    builder.into_mesh()
}

/// Per-vertex vectors moving each edge of `contour` outward by one unit.
///
/// Outward is the left of the travel direction. Miters are capped at a
/// length of √2 so sharp corners do not spike.
fn bevel_vectors(contour: &[Vec2]) -> Vec<Vec2> {
    let n = contour.len();
    let outward = |from: Vec2, to: Vec2| (to - from).perp().normalize_or_zero();

    (0..n)
        .map(|i| {
            let prev = contour[(i + n - 1) % n];
            let curr = contour[i];
            let next = contour[(i + 1) % n];
            let n1 = outward(prev, curr);
            let n2 = outward(curr, next);
            let denom = 1.0 + n1.dot(n2);
            if denom < 1.0e-4 {
                return n1;
            }

            let miter = (n1 + n2) / denom;
            let len_sq = miter.length_squared();
            if len_sq > 2.0 {
                miter * (2.0 / len_sq).sqrt()
            } else {
                miter
            }
        })
        .collect()
}

/// Triangulates the region enclosed by `contours` (non-zero rule).
fn tessellate(contours: &[Vec<Vec3>]) -> Result<Vec<[Vec2; 3]>> {
    let mut path = Path::builder();
    for contour in contours {
        let mut points = contour.iter().map(|p| point(p.x, p.y));
        if let Some(start) = points.next() {
            let _ = path.begin(start);
            for p in points {
                let _ = path.line_to(p);
            }
            path.end(true);
        }
    }
    let path = path.build();

    let mut buffers: VertexBuffers<[f32; 2], u32> = VertexBuffers::new();
    FillTessellator::new()
        .tessellate_path(
            &path,
            &FillOptions::default().with_fill_rule(FillRule::NonZero),
            &mut BuffersBuilder::new(&mut buffers, |v: FillVertex| v.position().to_array()),
        )
        .map_err(|e| Error::Tessellation(format!("{e:?}")))?;

    let vertex = |i: u32| Vec2::from(buffers.vertices[i as usize]);
    Ok(buffers
        .indices
        .chunks_exact(3)
        .map(|t| [vertex(t[0]), vertex(t[1]), vertex(t[2])])
        .collect())
}

#[derive(Default)]
struct TriangleSoup {
    coords: Vec<Vec3>,
    uvs: Vec<Vec2>,
}

impl TriangleSoup {
    fn push_cap(&mut self, triangle: [Vec3; 3]) {
        for p in triangle {
            self.coords.push(p);
            self.uvs.push(p.truncate());
        }
    }

    /// Quad between two consecutive outline points (`a`, `b`) of a layer
    /// and the same points (`c` above `b`, `d` above `a`) of the next.
    fn push_wall(&mut self, a: Vec3, b: Vec3, c: Vec3, d: Vec3) {
        let uv = |p: Vec3| {
            if (a.y - b.y).abs() < (a.x - b.x).abs() {
                Vec2::new(p.x, 1.0 - p.z)
            } else {
                Vec2::new(p.y, 1.0 - p.z)
            }
        };

        for p in [a, c, b, a, d, c] {
            self.coords.push(p);
            self.uvs.push(uv(p));
        }
    }

    fn into_mesh(self) -> Result<RenderMesh> {
        if self.coords.is_empty() {
            return Err(Error::EmptyText);
        }

        let mut mesh = RenderMesh::new(self.coords, None, Some(self.uvs), None);
        mesh.recompute_normals();
        Ok(mesh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: f32, y: f32, side: f32) -> Vec<Vec2> {
        vec![
            Vec2::new(x, y),
            Vec2::new(x + side, y),
            Vec2::new(x + side, y + side),
            Vec2::new(x, y + side),
        ]
    }

    fn flat() -> TextGeometry {
        TextGeometry {
            bevel_enabled: false,
            depth: 1.0,
            ..Default::default()
        }
    }

    fn dejavu() -> std::sync::Arc<Font> {
        Font::from_bytes(include_bytes!("../../assets/DejaVuSans.ttf").to_vec()).unwrap()
    }

    #[test]
    fn bevelled_layers_run_from_front_to_back() {
        let params = TextGeometry::default();
        let layers = params.layers();
        assert_eq!(layers.len(), 8);
        assert_eq!(layers[0], (-0.03, 0.0));
        assert_eq!(layers[3], (0.0, 0.05));
        assert_eq!(layers[4], (0.3, 0.05));
        assert!((layers[7].0 - 0.33).abs() < 1.0e-6);
        assert_eq!(layers[7].1, 0.0);
    }

    #[test]
    fn square_prism_without_bevel() {
        let mesh = extrude_contours(vec![vec![square(0.0, 0.0, 1.0)]], &flat()).unwrap();
        // Two caps of two triangles, four walls of two triangles.
        assert_eq!(mesh.num_triangles(), 12);

        let normals = mesh.normals.as_ref().unwrap();
        for (face, tri) in mesh.faces.iter().enumerate() {
            let center = tri
                .iter()
                .map(|&i| mesh.coords[i as usize])
                .fold(Vec3::ZERO, |acc, p| acc + p / 3.0);
            let n = normals[tri[0] as usize];
            let outward = center - Vec3::new(0.5, 0.5, 0.5);
            assert!(n.dot(outward) > 0.0, "face {face} points inward");
        }
    }

    #[test]
    fn winding_of_the_input_does_not_matter() {
        let mut reversed = square(0.0, 0.0, 1.0);
        reversed.reverse();
        let a = extrude_contours(vec![vec![square(0.0, 0.0, 1.0)]], &flat()).unwrap();
        let b = extrude_contours(vec![vec![reversed]], &flat()).unwrap();
        let z_normals = |m: &RenderMesh| {
            m.normals
                .as_ref()
                .unwrap()
                .iter()
                .filter(|n| n.z > 0.9)
                .count()
        };
        assert_eq!(z_normals(&a), z_normals(&b));
    }

    #[test]
    fn holes_are_left_open() {
        let mut hole = square(0.25, 0.25, 0.5);
        hole.reverse();
        let mesh = extrude_contours(vec![vec![square(0.0, 0.0, 1.0), hole]], &flat()).unwrap();
        // Ring caps and eight walls.
        assert_eq!(mesh.num_triangles(), 2 * 8 + 8 * 2);
    }

    #[test]
    fn bevels_grow_the_outline() {
        let params = TextGeometry::default();
        let mesh = extrude_contours(vec![vec![square(0.0, 0.0, 1.0)]], &params).unwrap();
        let min = mesh.coords.iter().fold(Vec3::splat(f32::MAX), |a, p| a.min(*p));
        let max = mesh.coords.iter().fold(Vec3::splat(f32::MIN), |a, p| a.max(*p));
        assert!((min.x + 0.05).abs() < 1.0e-4);
        assert!((max.x - 1.05).abs() < 1.0e-4);
        assert!((min.z + 0.03).abs() < 1.0e-6);
        assert!((max.z - 0.33).abs() < 1.0e-6);
    }

    #[test]
    fn nothing_to_extrude() {
        assert!(matches!(
            extrude_contours(Vec::new(), &TextGeometry::default()),
            Err(Error::EmptyText)
        ));

        let font = dejavu();
        assert!(matches!(
            extrude_text(&font, " \n\t ", &TextGeometry::default()),
            Err(Error::EmptyText)
        ));
    }

    #[test]
    fn unmapped_characters_are_skipped() {
        let font = dejavu();
        assert!(matches!(
            extrude_text(&font, "\u{10FFFD}", &TextGeometry::default()),
            Err(Error::EmptyText)
        ));

        let plain = extrude_text(&font, "ab", &TextGeometry::default()).unwrap();
        let mixed = extrude_text(&font, "a\u{10FFFD}\tb", &TextGeometry::default()).unwrap();
        assert_eq!(plain.coords.len(), mixed.coords.len());
    }

    #[test]
    fn text_sits_on_the_baseline() {
        let font = dejavu();
        let params = TextGeometry::default();
        let glyphs = glyph_contours(&font, "hello world!", &params);
        // The space has no outline.
        assert_eq!(glyphs.len(), 11);

        let mesh = extrude_text(&font, "hello world!", &params).unwrap();
        let max = mesh.coords.iter().fold(Vec3::splat(f32::MIN), |a, p| a.max(*p));
        let min = mesh.coords.iter().fold(Vec3::splat(f32::MAX), |a, p| a.min(*p));
        assert!(max.y > 0.3 && max.y < 0.6);
        assert!(min.y > -0.1);
        assert!(max.x > 2.0);
    }

    #[test]
    fn lines_stack_downward() {
        let font = dejavu();
        let params = TextGeometry::default();
        let glyphs = glyph_contours(&font, "l\nl", &params);
        assert_eq!(glyphs.len(), 2);
        let top = glyphs[0][0].iter().map(|p| p.y).fold(f32::MIN, f32::max);
        let bottom = glyphs[1][0].iter().map(|p| p.y).fold(f32::MIN, f32::max);
        assert!((top - bottom - font.line_height(0.5)).abs() < 1.0e-4);
    }
}
