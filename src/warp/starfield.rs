//! Starfield generator
//!
//! Stars live in polar form around the view axis and fly toward the viewer.

use std::ops::Range;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use crate::rasterizer::Color;

/// Radial distance from the view axis
pub const DISTANCE_RANGE: Range<f32> = 10.0..500.0;

/// Initial depth
pub const DEPTH_RANGE: Range<f32> = 100.0..1100.0;

/// Depth a star is sent back to after passing the viewer
pub const RESPAWN_DEPTH: f32 = 1000.0;

/// Star sizes during the loading warp
pub const LOADING_SIZES: Range<f32> = 2.0..5.0;

/// Star sizes during the portal warp
pub const TRANSITION_SIZES: Range<f32> = 1.0..4.0;

/// One star
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Star {
    pub angle: f32,
    pub distance: f32,
    /// Depth; decreases toward the viewer
    pub z: f32,
    pub size: f32,
    pub color: Color,
}

impl Star {
    pub fn x(&self) -> f32 {
        self.angle.cos() * self.distance
    }

    pub fn y(&self) -> f32 {
        self.angle.sin() * self.distance
    }
}

/// Field of stars with its own random source
pub struct Starfield<R: Rng = StdRng> {
    pub stars: Vec<Star>,
    rng: R,
}

impl Starfield<StdRng> {
    /// Entropy-seeded field for live rendering
    pub fn new(count: usize, sizes: Range<f32>) -> Self {
        Self::initialize(count, sizes, StdRng::from_entropy())
    }
}

impl<R: Rng> Starfield<R> {
    /// Populate `count` stars drawn from `rng`
    pub fn initialize(count: usize, sizes: Range<f32>, mut rng: R) -> Self {
        let stars = (0..count)
            .map(|_| {
                let angle = rng.gen_range(0.0..std::f32::consts::TAU);
                let distance = rng.gen_range(DISTANCE_RANGE);
                let z = rng.gen_range(DEPTH_RANGE);
                let size = rng.gen_range(sizes.clone());
                let color = Color::new(
                    rng.gen_range(155.0..255.0f32) as u8,
                    rng.gen_range(155.0..255.0f32) as u8,
                    255,
                );
                Star { angle, distance, z, size, color }
            })
            .collect();
        Self { stars, rng }
    }

    /// Move every star `speed` units closer; stars reaching the viewer respawn far away
    pub fn advance(&mut self, speed: f32) {
        for star in &mut self.stars {
            star.z -= speed;
            if star.z <= 0.0 {
                star.z = RESPAWN_DEPTH;
                star.angle = self.rng.gen_range(0.0..std::f32::consts::TAU);
                star.distance = self.rng.gen_range(DISTANCE_RANGE);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(count: usize, sizes: Range<f32>, seed: u64) -> Starfield {
        Starfield::initialize(count, sizes, StdRng::seed_from_u64(seed))
    }

    #[test]
    fn test_initialize_ranges() {
        let field = seeded(1000, LOADING_SIZES, 7);
        assert_eq!(field.stars.len(), 1000);
        for s in &field.stars {
            assert!(s.angle >= 0.0 && s.angle < std::f32::consts::TAU);
            assert!(DISTANCE_RANGE.contains(&s.distance));
            assert!(DEPTH_RANGE.contains(&s.z));
            assert!(LOADING_SIZES.contains(&s.size));
            assert!(s.color.r >= 155 && s.color.g >= 155);
            assert_eq!(s.color.b, 255);
        }
    }

    #[test]
    fn test_transition_sizes() {
        let field = seeded(200, TRANSITION_SIZES, 3);
        assert!(field.stars.iter().all(|s| s.size >= 1.0 && s.size < 4.0));
    }

    #[test]
    fn test_advance_moves_closer() {
        let mut field = seeded(10, LOADING_SIZES, 1);
        let before: Vec<f32> = field.stars.iter().map(|s| s.z).collect();
        field.advance(5.0);
        for (s, z) in field.stars.iter().zip(before) {
            assert!((s.z - (z - 5.0)).abs() < 0.001);
        }
    }

    #[test]
    fn test_respawn_depth_and_ranges() {
        let mut field = seeded(500, LOADING_SIZES, 42);
        // Large enough that every star crosses the viewer at least once
        for _ in 0..30 {
            field.advance(50.0);
            for s in &field.stars {
                assert!(s.z > 0.0);
                assert!(s.z <= 1100.0);
                assert!(DISTANCE_RANGE.contains(&s.distance));
            }
        }
    }

    #[test]
    fn test_respawned_star_resets_to_far_depth() {
        let mut field = seeded(1, LOADING_SIZES, 9);
        field.stars[0].z = 3.0;
        field.advance(5.0);
        let s = field.stars[0];
        assert!(s.z > 900.0 && s.z <= 1100.0);
        assert!((s.z - RESPAWN_DEPTH).abs() < 0.001);
    }
}
