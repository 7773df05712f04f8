//! The per-pool façade the proxy pipeline resolves against.

use std::sync::{Arc, OnceLock};

use log::{debug, info, warn};

use crate::{
    Backend, BackendSet, BackendStatus, ConfigureError, Context, Policy, PolicyConfig,
    RandomSource, ResolveError, SetError, ThreadRandom, Uptime,
};

/// Binds one selection policy to a backend set.
///
/// The policy is bound exactly once; a second `configure` is an error
/// rather than a silent replacement.
pub struct Director {
    name: String,
    set: Arc<BackendSet>,
    policy: OnceLock<Policy>,
}

impl Director {
    pub fn new(name: impl Into<String>, set: Arc<BackendSet>) -> Self {
        Self {
            name: name.into(),
            set,
            policy: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn backends(&self) -> &Arc<BackendSet> {
        &self.set
    }

    pub fn configure(&self, config: PolicyConfig) -> Result<(), ConfigureError> {
        self.configure_with_random(config, Arc::new(ThreadRandom))
    }

    pub fn configure_with_random(
        &self,
        config: PolicyConfig,
        random: Arc<dyn RandomSource>,
    ) -> Result<(), ConfigureError> {
        if let Some(existing) = self.policy.get() {
            return Err(self.already_configured(existing));
        }

        self.policy
            .set(config.build_with_random(random))
            .map_err(|_| match self.policy.get() {
                Some(existing) => self.already_configured(existing),
                None => ConfigureError::AlreadyConfigured {
                    director: self.name.clone(),
                    policy: config.name(),
                },
            })?;

        info!("{}: load balancing policy set to {:?}", self.name, config);
        Ok(())
    }

    fn already_configured(&self, existing: &Policy) -> ConfigureError {
        ConfigureError::AlreadyConfigured {
            director: self.name.clone(),
            policy: existing.name(),
        }
    }

    pub fn policy_name(&self) -> Option<&'static str> {
        self.policy.get().map(Policy::name)
    }

    pub fn resolve(&self, ctx: &Context) -> Result<Arc<dyn Backend>, ResolveError> {
        let policy = self.policy.get().ok_or(ResolveError::NotConfigured)?;

        match policy.resolve(&self.set, ctx) {
            Ok(backend) => {
                debug!(
                    "{}: {} selected backend '{}'",
                    self.name,
                    policy.name(),
                    backend.name()
                );
                Ok(backend)
            }
            Err(err) => {
                warn!("{}: {} resolve failed: {}", self.name, policy.name(), err);
                Err(err)
            }
        }
    }

    pub fn uptime(&self, ctx: &Context) -> Option<Uptime> {
        self.policy.get()?.uptime(&self.set, ctx)
    }

    /// True when at least one member is healthy.
    pub fn healthy(&self, ctx: &Context) -> bool {
        self.set
            .with_read(|members| members.backends().iter().any(|b| b.healthy(ctx)))
    }

    pub fn list(&self, ctx: &Context) -> Vec<BackendStatus> {
        self.set.list(ctx)
    }

    pub fn add_backend(&self, backend: Arc<dyn Backend>, weight: f64) -> Result<(), SetError> {
        self.set.add(backend, weight)
    }

    pub fn remove_backend(&self, name: &str) -> Result<Arc<dyn Backend>, SetError> {
        self.set.remove(name)
    }

    /// Drops the policy state and this director's share of the backend set.
    pub fn teardown(self) {
        info!(
            "{}: torn down ({})",
            self.name,
            self.policy_name().unwrap_or("unconfigured")
        );
    }
}
