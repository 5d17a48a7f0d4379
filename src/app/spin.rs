use crate::scene::SceneNode3d;
use glamx::{Quat, Vec3};
use std::f32::consts::TAU;

/// A constant rotation applied to a node once per tick.
///
/// The increment is per tick, not per second: the apparent speed follows
/// the display refresh rate.
#[derive(Clone)]
pub struct Spin {
    node: SceneNode3d,
    axis: Vec3,
    increment: f32,
    angle: f32,
    base: Quat,
}

impl Spin {
    /// Spins `node` around `axis` (in its parent frame), starting from its
    /// current rotation.
    pub fn new(node: &SceneNode3d, axis: Vec3, increment: f32) -> Spin {
        Spin {
            node: node.clone(),
            axis: axis.try_normalize().unwrap_or(Vec3::Y),
            increment,
            angle: 0.0,
            base: node.rotation(),
        }
    }

    /// Spins `node` around its vertical axis.
    pub fn around_y(node: &SceneNode3d, increment: f32) -> Spin {
        Spin::new(node, Vec3::Y, increment)
    }

    /// Advances the angle by one increment and updates the node.
    pub fn tick(&mut self) {
        self.angle = (self.angle + self.increment).rem_euclid(TAU);
        let _ = self
            .node
            .set_rotation(self.base * Quat::from_axis_angle(self.axis, self.angle));
    }

    /// Accumulated angle, in `[0, 2π)`.
    #[inline]
    pub fn angle(&self) -> f32 {
        self.angle
    }

    #[inline]
    pub fn increment(&self) -> f32 {
        self.increment
    }

    #[inline]
    pub fn node(&self) -> &SceneNode3d {
        &self.node
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn angle_accumulates_per_tick() {
        let node = SceneNode3d::empty();
        let mut spin = Spin::around_y(&node, 0.002);
        for _ in 0..1000 {
            spin.tick();
        }
        assert!((spin.angle() - 2.0).abs() < 1e-3);

        let expected = Quat::from_rotation_y(spin.angle());
        assert!(node.rotation().angle_between(expected) < 1e-4);
    }

    #[test]
    fn angle_wraps_around_a_full_turn() {
        let mut spin = Spin::around_y(&SceneNode3d::empty(), 0.002);
        for _ in 0..4000 {
            spin.tick();
        }
        assert!((spin.angle() - (8.0 - TAU)).abs() < 2e-3);
    }

    #[test]
    fn negative_increments_stay_in_range() {
        let mut spin = Spin::around_y(&SceneNode3d::empty(), -0.0002);
        spin.tick();
        assert!(spin.angle() > 0.0 && spin.angle() < TAU);
        assert!((spin.angle() - (TAU - 0.0002)).abs() < 1e-5);
    }

    #[test]
    fn spins_compose_with_the_initial_rotation() {
        let mut node = SceneNode3d::empty();
        let tilt = Quat::from_rotation_z(-0.4);
        let _ = node.set_rotation(tilt);

        let mut spin = Spin::around_y(&node, 0.5);
        spin.tick();

        let expected = tilt * Quat::from_rotation_y(0.5);
        assert!(node.rotation().angle_between(expected) < 1e-5);
    }
}
