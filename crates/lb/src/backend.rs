//! The backend capability consumed by the selection core.
//!
//! Backends are owned by the surrounding proxy: health probing, connection
//! accounting and uptime tracking all happen elsewhere. The core only reads
//! the values through [`Backend`].

use std::{
    mem,
    sync::atomic::{AtomicBool, AtomicU32, Ordering},
    time::SystemTime,
};

use parking_lot::Mutex;

use crate::ResolveError;

/// Per-request state handed to a director.
///
/// `workspace` is the number of bytes this request may spend on scratch
/// buffers during a single resolve.
#[derive(Debug, Clone)]
pub struct Context {
    workspace: usize,
}

impl Context {
    pub fn new() -> Self {
        Self {
            workspace: usize::MAX,
        }
    }

    pub fn with_workspace(bytes: usize) -> Self {
        Self { workspace: bytes }
    }

    pub fn workspace(&self) -> usize {
        self.workspace
    }

    /// Open the scratch budget for one resolve. Buffers taken from the
    /// returned [`Scratch`] draw down the same budget; it is released when the
    /// `Scratch` goes out of scope.
    pub(crate) fn reserve_all(&self) -> Scratch {
        Scratch {
            remaining: self.workspace,
        }
    }
}

/// Remaining scratch bytes of a single resolve.
#[derive(Debug)]
pub(crate) struct Scratch {
    remaining: usize,
}

impl Scratch {
    #[cfg(test)]
    pub(crate) fn remaining(&self) -> usize {
        self.remaining
    }

    /// Empty buffer able to hold `slots` values without growing.
    pub(crate) fn take<T>(&mut self, slots: usize) -> Result<Vec<T>, ResolveError> {
        let available = self.remaining;
        let overflow = || ResolveError::WorkspaceOverflow {
            needed: slots.saturating_mul(mem::size_of::<T>()),
            available,
        };

        let needed = slots.checked_mul(mem::size_of::<T>()).ok_or_else(overflow)?;
        if needed > self.remaining {
            return Err(overflow());
        }

        let mut buf = Vec::new();
        buf.try_reserve_exact(slots).map_err(|_| overflow())?;
        self.remaining -= needed;
        Ok(buf)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

/// Uptime report of a backend, used for observability only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Uptime {
    pub changed_at: SystemTime,
    pub load: f64,
}

pub trait Backend: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;

    fn healthy(&self, ctx: &Context) -> bool;

    /// Spare connection slots. `max_connections == 0` means the caller puts
    /// no cap of its own on the backend.
    fn free_connections(&self, ctx: &Context, max_connections: u32) -> u32;

    /// `None` when the backend does not track uptime.
    fn uptime(&self, _ctx: &Context) -> Option<Uptime> {
        None
    }
}

/// In-memory backend whose state is set by its owner.
#[derive(Debug)]
pub struct StaticBackend {
    name: String,
    address: String,
    healthy: AtomicBool,
    // 0 = unlimited
    max_conns: AtomicU32,
    active: AtomicU32,
    uptime: Mutex<Option<Uptime>>,
}

impl StaticBackend {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: String::new(),
            healthy: AtomicBool::new(true),
            max_conns: AtomicU32::new(0),
            active: AtomicU32::new(0),
            uptime: Mutex::new(None),
        }
    }

    pub fn from_config(backend: &switchyard_config::config::Backend) -> Self {
        Self {
            name: backend.name.clone(),
            address: backend.address.clone(),
            healthy: AtomicBool::new(backend.healthy),
            max_conns: AtomicU32::new(backend.max_conns),
            active: AtomicU32::new(backend.active),
            uptime: Mutex::new(Some(Uptime {
                changed_at: SystemTime::now(),
                load: 0.0,
            })),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Acquire)
    }

    /// Flip the health flag. A tracked uptime restarts on every transition.
    pub fn set_healthy(&self, healthy: bool) {
        let previous = self.healthy.swap(healthy, Ordering::AcqRel);
        if previous != healthy {
            if let Some(uptime) = self.uptime.lock().as_mut() {
                uptime.changed_at = SystemTime::now();
            }
        }
    }

    pub fn set_max_conns(&self, max_conns: u32) {
        self.max_conns.store(max_conns, Ordering::Release);
    }

    pub fn active(&self) -> u32 {
        self.active.load(Ordering::Acquire)
    }

    pub fn set_active(&self, active: u32) {
        self.active.store(active, Ordering::Release);
    }

    pub fn set_uptime(&self, uptime: Option<Uptime>) {
        *self.uptime.lock() = uptime;
    }
}

impl Backend for StaticBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn healthy(&self, _ctx: &Context) -> bool {
        self.is_healthy()
    }

    fn free_connections(&self, _ctx: &Context, max_connections: u32) -> u32 {
        let cap = match (self.max_conns.load(Ordering::Acquire), max_connections) {
            (0, 0) => u32::MAX,
            (0, cap) | (cap, 0) => cap,
            (own, cap) => own.min(cap),
        };
        cap.saturating_sub(self.active())
    }

    fn uptime(&self, _ctx: &Context) -> Option<Uptime> {
        *self.uptime.lock()
    }
}
