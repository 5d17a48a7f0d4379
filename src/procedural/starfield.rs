//! Random shell of colored points around the origin.

use super::{utils, RenderMesh};
use crate::color::srgb_channel_to_linear;
use glamx::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;

/// Inner radius of the star shell.
pub const STARFIELD_MIN_RADIUS: f32 = 25.0;
/// Outer radius of the star shell.
pub const STARFIELD_MAX_RADIUS: f32 = 50.0;
/// Hue shared by every star, a pale blue.
const STAR_HUE: f32 = 0.6;
const STAR_SATURATION: f32 = 0.2;

/// Scatters `count` points uniformly in direction at distances in
/// `[STARFIELD_MIN_RADIUS, STARFIELD_MAX_RADIUS)`.
///
/// Each point gets the same bluish hue with a random lightness, stored as a
/// linear color. The same `seed` always produces the same field.
pub fn starfield(count: usize, seed: u64) -> RenderMesh {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut coords = Vec::with_capacity(count);
    let mut colors = Vec::with_capacity(count);

    for _ in 0..count {
        let radius = STARFIELD_MIN_RADIUS
            + rng.random::<f32>() * (STARFIELD_MAX_RADIUS - STARFIELD_MIN_RADIUS);
        let theta = TAU * rng.random::<f32>();
        let phi = (2.0 * rng.random::<f32>() - 1.0).clamp(-1.0, 1.0).acos();
        let (sin_phi, cos_phi) = phi.sin_cos();
        let (sin_theta, cos_theta) = theta.sin_cos();
        coords.push(Vec3::new(sin_phi * cos_theta, sin_phi * sin_theta, cos_phi) * radius);

        let [r, g, b] = utils::hsl_to_rgb(STAR_HUE, STAR_SATURATION, rng.random::<f32>())
            .map(srgb_channel_to_linear);
        colors.push([r, g, b, 1.0]);
    }

    RenderMesh::point_cloud(coords, colors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produces_the_requested_count() {
        assert_eq!(starfield(2000, 7).num_vertices(), 2000);
        assert_eq!(starfield(0, 7).num_vertices(), 0);
    }

    #[test]
    fn stars_stay_inside_the_shell() {
        let field = starfield(2000, 42);
        for p in &field.coords {
            let r = p.length();
            assert!((STARFIELD_MIN_RADIUS - 1e-3..=STARFIELD_MAX_RADIUS + 1e-3).contains(&r));
        }
        assert!(field.faces.is_empty());
    }

    #[test]
    fn same_seed_same_sky() {
        assert_eq!(starfield(100, 3), starfield(100, 3));
        assert_ne!(starfield(100, 3).coords, starfield(100, 4).coords);
    }

    #[test]
    fn every_star_is_opaque() {
        let field = starfield(50, 1);
        assert!(field.colors.unwrap().iter().all(|c| c[3] == 1.0));
    }
}
