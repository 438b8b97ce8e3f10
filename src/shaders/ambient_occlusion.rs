/// Voxel ambient occlusion
///
/// Each fragment casts rays from its world position into the octree. A ray
/// that hits an alive voxel within `max_distance` counts as occluded; the
/// lit color is scaled by the unoccluded fraction.
use crate::error::Result;
use crate::octree::Octree;
use crate::rendering::{Fragment, FragmentShader, ShaderContext};
use glam::{Vec3, Vec4};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

#[derive(Debug, Clone, Copy)]
pub struct AoConfig {
    /// Rays per fragment; the first always follows the normal.
    pub rays: usize,
    /// Hits farther than this do not occlude.
    pub max_distance: f32,
    pub seed: u64,
    /// Direction the light travels in.
    pub light_dir: Vec3,
    pub ambient_color: Vec3,
    pub ambient_strength: f32,
    pub diffuse_color: Vec3,
}

impl Default for AoConfig {
    fn default() -> Self {
        Self {
            rays: 8,
            max_distance: 0.1,
            seed: 0x5EED,
            light_dir: Vec3::new(-1.0, -1.0, 0.0),
            ambient_color: Vec3::new(0.1, 0.4, 0.3),
            ambient_strength: 0.5,
            diffuse_color: Vec3::ONE,
        }
    }
}

/// Varyings: `pos` (world), `normal` (world).
pub struct AmbientOcclusionShader<'t> {
    tree: &'t Octree,
    pub config: AoConfig,
    pub rays_cast: u64,
}

impl<'t> AmbientOcclusionShader<'t> {
    pub fn new(tree: &'t Octree, config: AoConfig) -> Self {
        Self {
            tree,
            config,
            rays_cast: 0,
        }
    }

    /// Fraction of rays from `p` that hit a voxel within range.
    pub fn occlusion(&mut self, p: Vec3, n: Vec3, rng: &mut ChaCha8Rng) -> f32 {
        let rays = self.config.rays.max(1);
        let mut occluded = 0;
        for i in 0..rays {
            let dir = if i == 0 { n } else { hemisphere_sample(n, rng) };
            self.rays_cast += 1;
            let hit = self.tree.closest_leaf(p, dir);
            if hit.is_some_and(|h| h.distance <= self.config.max_distance) {
                occluded += 1;
            }
        }
        occluded as f32 / rays as f32
    }
}

/// Uniform direction in the hemisphere around `n`.
fn hemisphere_sample(n: Vec3, rng: &mut ChaCha8Rng) -> Vec3 {
    loop {
        let v = Vec3::new(
            rng.gen_range(-1.0..=1.0),
            rng.gen_range(-1.0..=1.0),
            rng.gen_range(-1.0..=1.0),
        );
        let len2 = v.length_squared();
        if len2 > 1e-6 && len2 <= 1.0 {
            let d = v / len2.sqrt();
            return if d.dot(n) < 0.0 { -d } else { d };
        }
    }
}

impl FragmentShader for AmbientOcclusionShader<'_> {
    fn launch(&mut self, ctx: &ShaderContext, fragment: &Fragment) -> Result<Vec4> {
        let varyings = fragment.varyings();
        let p = ctx.attribute_vec3("pos", varyings)?;
        let n = ctx.attribute_vec3("normal", varyings)?.normalize_or_zero();

        // Per-pixel stream so the noise pattern does not depend on draw order.
        let pixel = ((fragment.y as u64) << 32) | fragment.x as u64;
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed ^ pixel);
        let occlusion = if n == Vec3::ZERO {
            0.0
        } else {
            self.occlusion(p, n, &mut rng)
        };

        let c = &self.config;
        let k_diff = n.dot(-c.light_dir.normalize_or_zero()).max(0.0);
        let lit = c.ambient_color * c.ambient_strength + c.diffuse_color * k_diff;
        Ok((lit * (1.0 - occlusion)).extend(1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hemisphere_samples_face_normal() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..100 {
            let d = hemisphere_sample(Vec3::Y, &mut rng);
            assert!(d.y >= 0.0);
            assert!((d.length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn wall_in_front_of_normal_occludes() {
        let mut tree = Octree::default();
        tree.set_aabb(Vec3::ZERO, Vec3::ONE).unwrap();
        // Voxel just above the sample point along +y.
        tree.add_point(Vec3::new(0.5, 0.52, 0.5)).unwrap();

        let mut shader = AmbientOcclusionShader::new(
            &tree,
            AoConfig {
                rays: 1,
                ..Default::default()
            },
        );
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let occ = shader.occlusion(Vec3::new(0.5, 0.49, 0.5), Vec3::Y, &mut rng);
        assert_eq!(occ, 1.0);
        let occ = shader.occlusion(Vec3::new(0.5, 0.49, 0.5), Vec3::NEG_Y, &mut rng);
        assert_eq!(occ, 0.0);
        assert_eq!(shader.rays_cast, 2);
    }
}
