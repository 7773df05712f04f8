//! Weighted-random selection biased toward spare capacity.

use std::sync::Arc;

use crate::{Backend, BackendSet, Context, RandomSource, ResolveError, pick_index_by_weight};

pub struct LeastConnections {
    max_connections: u32,
    random: Arc<dyn RandomSource>,
}

impl LeastConnections {
    pub fn new(max_connections: u32, random: Arc<dyn RandomSource>) -> Self {
        Self {
            max_connections,
            random,
        }
    }

    pub fn resolve(
        &self,
        set: &BackendSet,
        ctx: &Context,
    ) -> Result<Arc<dyn Backend>, ResolveError> {
        set.with_read(|members| {
            let mut pick_weights: Vec<f64> = ctx.reserve_all().take(members.len())?;
            let mut total = 0.0;
            for (backend, base_weight) in members.iter() {
                let weight = if backend.healthy(ctx) {
                    let free = backend.free_connections(ctx, self.max_connections);
                    base_weight * f64::from(free)
                } else {
                    0.0
                };
                pick_weights.push(weight);
                total += weight;
            }

            if total <= 0.0 {
                return Err(ResolveError::NoBackend);
            }

            let r = self.random.next_unit();
            debug_assert!((0.0..1.0).contains(&r), "draw {r} outside [0, 1)");
            let index = pick_index_by_weight(&pick_weights, r.clamp(0.0, 1.0) * total);
            debug_assert!(index < members.len());
            members.get(index).cloned().ok_or(ResolveError::NoBackend)
        })
    }
}
