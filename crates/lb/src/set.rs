//! The shared backend registry every policy reads from.
//!
//! Selection runs under the read lock; dynamic add/remove runs under the
//! write lock. `parking_lot::RwLock` parks new readers once a writer is
//! queued, so a steady stream of resolves cannot starve registration.

use std::sync::Arc;

use log::info;
use parking_lot::RwLock;

use crate::{Backend, Context, SetError};

/// Ordered backends with their configured base weights.
///
/// Order is both the rotation order and the fallback preference order. The
/// two sequences always have the same length.
#[derive(Default)]
pub struct Members {
    backends: Vec<Arc<dyn Backend>>,
    weights: Vec<f64>,
}

impl Members {
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    pub fn backends(&self) -> &[Arc<dyn Backend>] {
        &self.backends
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn get(&self, index: usize) -> Option<&Arc<dyn Backend>> {
        self.backends.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Arc<dyn Backend>, f64)> {
        self.backends.iter().zip(self.weights.iter().copied())
    }

    pub fn position(&self, backend: &Arc<dyn Backend>) -> Option<usize> {
        self.backends.iter().position(|b| same_backend(b, backend))
    }

    pub fn contains(&self, backend: &Arc<dyn Backend>) -> bool {
        self.position(backend).is_some()
    }

    pub fn position_by_name(&self, name: &str) -> Option<usize> {
        self.backends.iter().position(|b| b.name() == name)
    }

    pub fn insert(&mut self, backend: Arc<dyn Backend>, weight: f64) -> Result<(), SetError> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(SetError::InvalidWeight {
                name: backend.name().to_string(),
                weight,
            });
        }
        if self.contains(&backend) || self.position_by_name(backend.name()).is_some() {
            return Err(SetError::Duplicate(backend.name().to_string()));
        }

        self.backends.push(backend);
        self.weights.push(weight);
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Result<Arc<dyn Backend>, SetError> {
        let index = self
            .position_by_name(name)
            .ok_or_else(|| SetError::Unknown(name.to_string()))?;

        self.weights.remove(index);
        Ok(self.backends.remove(index))
    }
}

/// Pointer identity; two handles are the same backend when they share an allocation.
pub fn same_backend(a: &Arc<dyn Backend>, b: &Arc<dyn Backend>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackendStatus {
    pub name: String,
    pub weight: f64,
    pub healthy: bool,
}

#[derive(Default)]
pub struct BackendSet {
    members: RwLock<Members>,
}

impl BackendSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_read<R>(&self, f: impl FnOnce(&Members) -> R) -> R {
        let members = self.members.read();
        f(&members)
    }

    pub fn with_write<R>(&self, f: impl FnOnce(&mut Members) -> R) -> R {
        let mut members = self.members.write();
        f(&mut members)
    }

    pub fn add(&self, backend: Arc<dyn Backend>, weight: f64) -> Result<(), SetError> {
        let name = backend.name().to_string();
        self.with_write(|members| members.insert(backend, weight))?;
        info!("Added backend '{}' with weight {}", name, weight);
        Ok(())
    }

    pub fn add_default(&self, backend: Arc<dyn Backend>) -> Result<(), SetError> {
        self.add(backend, 1.0)
    }

    pub fn remove(&self, name: &str) -> Result<Arc<dyn Backend>, SetError> {
        let backend = self.with_write(|members| members.remove(name))?;
        info!("Removed backend '{}'", name);
        Ok(backend)
    }

    pub fn len(&self) -> usize {
        self.with_read(Members::len)
    }

    pub fn is_empty(&self) -> bool {
        self.with_read(Members::is_empty)
    }

    pub fn contains(&self, backend: &Arc<dyn Backend>) -> bool {
        self.with_read(|members| members.contains(backend))
    }

    pub fn list(&self, ctx: &Context) -> Vec<BackendStatus> {
        self.with_read(|members| {
            members
                .iter()
                .map(|(backend, weight)| BackendStatus {
                    name: backend.name().to_string(),
                    weight,
                    healthy: backend.healthy(ctx),
                })
                .collect()
        })
    }
}
