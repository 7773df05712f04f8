//! Backend selection for the switchyard load balancer.
//!
//! A [`Director`] binds one selection policy to a shared [`BackendSet`] and
//! picks a backend per request:
//!
//! - [`RoundRobin`]: weighted rotation over the currently healthy backends,
//! - [`LeastConnections`]: weighted-random draw biased toward spare capacity,
//! - [`Fallback`]: first healthy backend in configured order, optionally sticky.

mod backend;
mod director;
mod error;
mod fallback;
mod least_conn;
mod picker;
mod policy;
mod round_robin;
mod set;

pub use backend::{Backend, Context, StaticBackend, Uptime};
pub use director::Director;
pub use error::{ConfigureError, ResolveError, SetError};
pub use fallback::Fallback;
pub use least_conn::LeastConnections;
pub use picker::{RandomSource, RotationCursor, SeededRandom, ThreadRandom, pick_index_by_weight};
pub use policy::{Policy, PolicyConfig};
pub use round_robin::RoundRobin;
pub use set::{BackendSet, BackendStatus, Members, same_backend};
