//! Random sample generators.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rlt_math::Vec2;

/// Source of uniform variates in `[0, 1)`.
pub trait Sampler: Send {
    fn next_1d(&mut self) -> f32;

    fn next_2d(&mut self) -> Vec2 {
        let x = self.next_1d();
        let y = self.next_1d();
        Vec2::new(x, y)
    }

    /// An independent generator for another thread or image region.
    fn clone_seeded(&self, seed: u64) -> Box<dyn Sampler>;
}

/// Uncorrelated uniform samples from a seeded `StdRng`.
#[derive(Debug, Clone)]
pub struct IndependentSampler {
    rng: StdRng,
}

impl IndependentSampler {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Sampler for IndependentSampler {
    fn next_1d(&mut self) -> f32 {
        self.rng.gen::<f32>()
    }

    fn clone_seeded(&self, seed: u64) -> Box<dyn Sampler> {
        Box::new(IndependentSampler::new(seed))
    }
}
