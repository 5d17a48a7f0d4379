//! Utilities shared by the mesh generators.

use glamx::{Vec2, Vec3};

/// Computes smooth normals by averaging the unit normals of adjacent faces.
pub fn compute_normals(coordinates: &[Vec3], faces: &[[u32; 3]], normals: &mut Vec<Vec3>) {
    normals.clear();
    normals.resize(coordinates.len(), Vec3::ZERO);

    for f in faces {
        let edge1 = coordinates[f[1] as usize] - coordinates[f[0] as usize];
        let edge2 = coordinates[f[2] as usize] - coordinates[f[0] as usize];
        let normal = edge1.cross(edge2).normalize_or_zero();

        for &i in f {
            normals[i as usize] += normal;
        }
    }

    for n in normals.iter_mut() {
        *n = n.normalize_or_zero();
    }
}

/// Signed area of a closed 2D polygon. Positive when counter-clockwise.
pub fn signed_area(polygon: &[Vec2]) -> f32 {
    let n = polygon.len();
    let mut area = 0.0;
    for i in 0..n {
        let a = polygon[i];
        let b = polygon[(i + 1) % n];
        area += a.x * b.y - b.x * a.y;
    }
    area * 0.5
}

/// Converts hue, saturation and lightness in [0, 1] to RGB.
pub fn hsl_to_rgb(h: f32, s: f32, l: f32) -> [f32; 3] {
    fn hue_to_rgb(p: f32, q: f32, t: f32) -> f32 {
        let t = t.rem_euclid(1.0);
        if t < 1.0 / 6.0 {
            p + (q - p) * 6.0 * t
        } else if t < 0.5 {
            q
        } else if t < 2.0 / 3.0 {
            p + (q - p) * 6.0 * (2.0 / 3.0 - t)
        } else {
            p
        }
    }

    let h = h.rem_euclid(1.0);
    let s = s.clamp(0.0, 1.0);
    let l = l.clamp(0.0, 1.0);

    if s == 0.0 {
        return [l, l, l];
    }

    let q = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    [
        hue_to_rgb(p, q, h + 1.0 / 3.0),
        hue_to_rgb(p, q, h),
        hue_to_rgb(p, q, h - 1.0 / 3.0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_area_sign_follows_winding() {
        let square = [
            Vec2::new(0.0, 0.0),
            Vec2::new(2.0, 0.0),
            Vec2::new(2.0, 2.0),
            Vec2::new(0.0, 2.0),
        ];
        assert_eq!(signed_area(&square), 4.0);

        let mut reversed = square;
        reversed.reverse();
        assert_eq!(signed_area(&reversed), -4.0);
    }

    #[test]
    fn hsl_extremes() {
        assert_eq!(hsl_to_rgb(0.6, 0.2, 0.0), [0.0, 0.0, 0.0]);
        assert_eq!(hsl_to_rgb(0.6, 0.2, 1.0), [1.0, 1.0, 1.0]);

        let red = hsl_to_rgb(0.0, 1.0, 0.5);
        assert!((red[0] - 1.0).abs() < 1e-5 && red[1].abs() < 1e-5 && red[2].abs() < 1e-5);
    }

    #[test]
    fn bluish_hue_leans_blue() {
        let [r, g, b] = hsl_to_rgb(0.6, 0.2, 0.5);
        assert!(b > g && g > r);
    }
}
