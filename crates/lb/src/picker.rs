//! Weighted index selection shared by the round-robin and
//! least-connections policies.

use parking_lot::Mutex;
use rand::{Rng, SeedableRng, rngs::StdRng};

/// Golden-ratio conjugate. Irrational, so the cursor never falls into a
/// short cycle and every weight interval is visited in proportion to its size.
const ROTATION_STRIDE: f64 = 0.618_033_988_749_894_9;

/// Index whose cumulative-weight interval contains `r`.
///
/// `r` is expected in `[0, total)`. Zero-weight entries own an empty
/// interval and are never returned; an `r` at or past the total (float
/// overshoot) lands on the last positive entry. The caller guarantees the
/// total is positive.
pub fn pick_index_by_weight(weights: &[f64], r: f64) -> usize {
    debug_assert!(!weights.is_empty());

    let mut last_positive = 0;
    let mut cumulative = 0.0;
    for (index, &weight) in weights.iter().enumerate() {
        debug_assert!(weight >= 0.0, "negative pick weight {weight}");
        if weight <= 0.0 {
            continue;
        }
        cumulative += weight;
        last_positive = index;
        if r < cumulative {
            return index;
        }
    }
    last_positive
}

/// Uniform draws in `[0, 1)`.
pub trait RandomSource: Send + Sync {
    fn next_unit(&self) -> f64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_unit(&self) -> f64 {
        rand::thread_rng().gen_range(0.0..1.0)
    }
}

/// Reproducible draws for simulations.
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_unit(&self) -> f64 {
        self.rng.lock().gen_range(0.0..1.0)
    }
}

/// Fractional rotation cursor.
///
/// Each turn maps the cursor onto `[0, total)` and steps it by a fixed
/// irrational stride. Nothing depends on the number of candidates, so the
/// healthy set may change between turns without resetting the rotation.
#[derive(Debug, Default, Clone)]
pub struct RotationCursor {
    w: f64,
}

impl RotationCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> f64 {
        self.w
    }

    /// Draw for this turn, scaled to `total`, then advance.
    pub fn next_draw(&mut self, total: f64) -> f64 {
        let w = self.w.fract();
        self.w = (w + ROTATION_STRIDE).fract();
        w * total
    }
}
