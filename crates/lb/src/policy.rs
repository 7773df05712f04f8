use std::sync::Arc;

use switchyard_config::validator::canonical_policy;

use crate::{
    Backend, BackendSet, ConfigureError, Context, Fallback, LeastConnections, RandomSource,
    ResolveError, RoundRobin, ThreadRandom, Uptime,
};

/// Policy choice plus its parameters, as bound to a director.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyConfig {
    RoundRobin,
    /// `max_connections == 0` leaves the cap to each backend.
    LeastConnections { max_connections: u32 },
    Fallback { sticky: bool },
}

impl PolicyConfig {
    pub fn from_config(
        director: &switchyard_config::config::Director,
    ) -> Result<Self, ConfigureError> {
        match canonical_policy(&director.policy) {
            Some("round-robin") => Ok(Self::RoundRobin),
            Some("least-connections") => Ok(Self::LeastConnections {
                max_connections: director.max_connections,
            }),
            Some("fallback") => Ok(Self::Fallback {
                sticky: director.sticky,
            }),
            _ => Err(ConfigureError::UnknownPolicy(director.policy.clone())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PolicyConfig::RoundRobin => "round-robin",
            PolicyConfig::LeastConnections { .. } => "least-connections",
            PolicyConfig::Fallback { .. } => "fallback",
        }
    }

    pub fn build(self) -> Policy {
        self.build_with_random(Arc::new(ThreadRandom))
    }

    /// `random` only feeds least-connections draws.
    pub fn build_with_random(self, random: Arc<dyn RandomSource>) -> Policy {
        match self {
            PolicyConfig::RoundRobin => Policy::RoundRobin(RoundRobin::new()),
            PolicyConfig::LeastConnections { max_connections } => {
                Policy::LeastConnections(LeastConnections::new(max_connections, random))
            }
            PolicyConfig::Fallback { sticky } => Policy::Fallback(Fallback::new(sticky)),
        }
    }
}

pub enum Policy {
    RoundRobin(RoundRobin),
    LeastConnections(LeastConnections),
    Fallback(Fallback),
}

impl Policy {
    pub fn name(&self) -> &'static str {
        match self {
            Policy::RoundRobin(_) => "round-robin",
            Policy::LeastConnections(_) => "least-connections",
            Policy::Fallback(_) => "fallback",
        }
    }

    pub fn resolve(
        &self,
        set: &BackendSet,
        ctx: &Context,
    ) -> Result<Arc<dyn Backend>, ResolveError> {
        match self {
            Policy::RoundRobin(rr) => rr.resolve(set, ctx),
            Policy::LeastConnections(lc) => lc.resolve(set, ctx),
            Policy::Fallback(fb) => fb.resolve(set, ctx),
        }
    }

    pub fn uptime(&self, set: &BackendSet, ctx: &Context) -> Option<Uptime> {
        match self {
            Policy::Fallback(fb) => fb.uptime(set, ctx),
            Policy::RoundRobin(_) | Policy::LeastConnections(_) => first_healthy_uptime(set, ctx),
        }
    }
}

fn first_healthy_uptime(set: &BackendSet, ctx: &Context) -> Option<Uptime> {
    set.with_read(|members| {
        members
            .backends()
            .iter()
            .filter(|backend| backend.healthy(ctx))
            .find_map(|backend| backend.uptime(ctx))
    })
}
