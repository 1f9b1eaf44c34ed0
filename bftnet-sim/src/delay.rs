use std::sync::Arc;
use std::time::Duration;

use bftnet_core::Delay;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};

/// Random source shared by every generator that should draw from one stream.
pub type SharedRng = Arc<Mutex<StdRng>>;

/// Builds a shared random source, seeded when a seed is given.
pub fn shared_rng(seed: Option<u64>) -> SharedRng {
    let rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    Arc::new(Mutex::new(rng))
}

/// Samples per-message delays as `mean + ratio * mean * Z`, `Z ~ N(0, 1)`.
///
/// No clamping happens here; callers decide what a negative sample means.
#[derive(Debug, Clone)]
pub struct DelayGenerator {
    mean: Duration,
    jitter_ratio: f64,
    rng: SharedRng,
}

impl DelayGenerator {
    pub fn new(mean: Duration, jitter_ratio: f64, rng: SharedRng) -> Self {
        Self {
            mean,
            jitter_ratio,
            rng,
        }
    }

    pub fn mean(&self) -> Duration {
        self.mean
    }

    pub fn jitter_ratio(&self) -> f64 {
        self.jitter_ratio
    }

    pub fn sample(&self) -> Delay {
        let z: f64 = StandardNormal.sample(&mut *self.rng.lock());
        let mean = self.mean.as_nanos() as f64;
        Delay::from_nanos_f64(mean + self.jitter_ratio * mean * z)
    }
}
