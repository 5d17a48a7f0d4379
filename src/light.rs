//! Lights attached to scene nodes.
//!
//! A light takes its position and orientation from the world transform of the
//! node carrying it. Lights are gathered from the whole tree once per frame,
//! before any object is prepared.

use crate::color::{self, Color};
use glamx::{Pose3, Vec3};

/// Maximum number of directional and hemisphere lights lit per frame.
pub const MAX_LIGHTS: usize = 8;

/// The kind of light source.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LightType {
    /// Parallel rays (a sun), shining from the node position towards `target`.
    ///
    /// `target` is in world space.
    Directional { target: Vec3 },

    /// Sky light: surfaces facing the node's up axis receive the light color,
    /// surfaces facing away receive `ground`, blended in between.
    Hemisphere { ground: Color },

    /// Uniform light added to every lit surface.
    Ambient,
}

impl Default for LightType {
    fn default() -> Self {
        LightType::Directional { target: Vec3::ZERO }
    }
}

/// A light source that can be attached to a scene node.
///
/// ```no_run
/// # use globe3d::prelude::*;
/// let sun = Light::directional().with_intensity(2.0);
/// let sky = Light::hemisphere(color::from_hex(0x0099ff), color::from_hex(0xaa5500));
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Light {
    pub light_type: LightType,
    /// Sky color for hemisphere lights.
    pub color: Color,
    pub intensity: f32,
    pub enabled: bool,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            light_type: LightType::default(),
            color: color::WHITE,
            intensity: 1.0,
            enabled: true,
        }
    }
}

impl Light {
    /// A white directional light aimed at the world origin.
    pub fn directional() -> Self {
        Self::default()
    }

    /// A hemisphere light blending `sky` (from above) and `ground` (from below).
    pub fn hemisphere(sky: Color, ground: Color) -> Self {
        Self {
            light_type: LightType::Hemisphere { ground },
            color: sky,
            ..Default::default()
        }
    }

    pub fn ambient(color: Color) -> Self {
        Self {
            light_type: LightType::Ambient,
            color,
            ..Default::default()
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_intensity(mut self, intensity: f32) -> Self {
        self.intensity = intensity;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Aims a directional light at `target`. No effect on other kinds.
    pub fn with_target(mut self, target: Vec3) -> Self {
        if let LightType::Directional { target: t } = &mut self.light_type {
            *t = target;
        }
        self
    }

    /// Resolves this light against the world transform of its node.
    pub fn collect(&self, world: &Pose3) -> CollectedLight {
        let world_position = world.translation;
        let (world_direction, ground) = match &self.light_type {
            LightType::Directional { target } => (
                (*target - world_position).try_normalize().unwrap_or(-Vec3::Y),
                Vec3::ZERO,
            ),
            LightType::Hemisphere { ground } => (
                world.rotation * Vec3::Y,
                linear_rgb(*ground),
            ),
            LightType::Ambient => (Vec3::ZERO, Vec3::ZERO),
        };

        CollectedLight {
            light_type: self.light_type.clone(),
            color: linear_rgb(self.color),
            ground,
            intensity: self.intensity,
            world_position,
            world_direction,
        }
    }
}

fn linear_rgb(c: Color) -> Vec3 {
    Vec3::from(color::rgb_array(color::to_linear(c)))
}

/// A light resolved to world space. Colors are linear.
#[derive(Clone, Debug)]
pub struct CollectedLight {
    pub light_type: LightType,
    pub color: Vec3,
    /// Ground color of hemisphere lights, zero otherwise.
    pub ground: Vec3,
    pub intensity: f32,
    pub world_position: Vec3,
    /// Direction the light travels for directional lights, the up axis for
    /// hemisphere lights.
    pub world_direction: Vec3,
}

/// Lights gathered from the scene tree during the prepare phase.
#[derive(Clone, Debug)]
pub struct LightCollection {
    pub lights: Vec<CollectedLight>,
    /// Sum of the ambient lights, already scaled by their intensity.
    pub ambient: Vec3,
}

impl Default for LightCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl LightCollection {
    /// An empty collection with no ambient light.
    pub fn new() -> Self {
        Self::with_ambient(Vec3::ZERO)
    }

    pub fn with_ambient(ambient: Vec3) -> Self {
        Self {
            lights: Vec::with_capacity(MAX_LIGHTS),
            ambient,
        }
    }

    /// Adds a light. Ambient lights accumulate into [`LightCollection::ambient`].
    ///
    /// Returns `false` if the light was dropped because the collection is full.
    pub fn add(&mut self, light: CollectedLight) -> bool {
        if light.light_type == LightType::Ambient {
            self.ambient += light.color * light.intensity;
            return true;
        }

        if self.is_full() {
            return false;
        }

        self.lights.push(light);
        true
    }

    pub fn is_full(&self) -> bool {
        self.lights.len() >= MAX_LIGHTS
    }

    pub fn len(&self) -> usize {
        self.lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    pub fn clear(&mut self) {
        self.lights.clear();
        self.ambient = Vec3::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glamx::Quat;

    #[test]
    fn sun_shines_toward_its_target() {
        let sun = Light::directional().with_intensity(2.0);
        let mut world = Pose3::IDENTITY;
        world.translation = Vec3::new(-2.0, 0.5, 1.5);
        let collected = sun.collect(&world);

        let expected = Vec3::new(2.0, -0.5, -1.5).normalize();
        assert!((collected.world_direction - expected).length() < 1e-6);
        assert_eq!(collected.intensity, 2.0);
    }

    #[test]
    fn hemisphere_up_follows_the_node_rotation() {
        let sky = Light::hemisphere(color::from_hex(0x0099ff), color::from_hex(0xaa5500));
        let world = Pose3::from(Quat::from_rotation_z(std::f32::consts::PI));
        let collected = sky.collect(&world);

        assert!((collected.world_direction + Vec3::Y).length() < 1e-6);
        let ground = color::to_linear(color::from_hex(0xaa5500));
        assert!((collected.ground.x - ground.r).abs() < 1e-6);
    }

    #[test]
    fn collection_caps_at_max_lights() {
        let mut lights = LightCollection::new();
        let sun = Light::directional().collect(&Pose3::IDENTITY);
        for _ in 0..MAX_LIGHTS {
            assert!(lights.add(sun.clone()));
        }
        assert!(lights.is_full());
        assert!(!lights.add(sun));
        assert_eq!(lights.len(), MAX_LIGHTS);
    }

    #[test]
    fn ambient_lights_do_not_take_a_slot() {
        let mut lights = LightCollection::new();
        let ambient = Light::ambient(color::WHITE)
            .with_intensity(0.5)
            .collect(&Pose3::IDENTITY);
        assert!(lights.add(ambient));
        assert!(lights.is_empty());
        assert_eq!(lights.ambient, Vec3::splat(0.5));
    }
}
