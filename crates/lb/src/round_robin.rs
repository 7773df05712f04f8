//! Weighted, healthy-only rotation.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::{Backend, BackendSet, Context, ResolveError, RotationCursor, pick_index_by_weight};

#[derive(Debug, Default)]
pub struct RoundRobin {
    // never held together with the set lock
    cursor: Mutex<RotationCursor>,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(
        &self,
        set: &BackendSet,
        ctx: &Context,
    ) -> Result<Arc<dyn Backend>, ResolveError> {
        // Health is sampled fresh on every call.
        let (candidates, weights) = set.with_read(|members| {
            let mut scratch = ctx.reserve_all();
            let mut candidates: Vec<Arc<dyn Backend>> = scratch.take(members.len())?;
            let mut weights: Vec<f64> = scratch.take(members.len())?;
            for (backend, weight) in members.iter() {
                if backend.healthy(ctx) {
                    candidates.push(Arc::clone(backend));
                    weights.push(weight);
                }
            }
            Ok::<_, ResolveError>((candidates, weights))
        })?;

        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return Err(ResolveError::NoBackend);
        }

        let draw = self.cursor.lock().next_draw(total);
        let index = pick_index_by_weight(&weights, draw);
        debug_assert!(index < candidates.len());
        candidates.get(index).cloned().ok_or(ResolveError::NoBackend)
    }
}
