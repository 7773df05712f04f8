//! Ordered failover with optional stickiness.
//!
//! Without stickiness the first healthy backend in configured order wins.
//! With stickiness the backend picked last time keeps winning while it stays
//! healthy and remains a member, even once an earlier backend recovers.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::{Backend, BackendSet, Context, ResolveError, Uptime};

#[derive(Debug)]
pub struct Fallback {
    sticky: bool,
    // Weak: a removed backend must not be kept alive by the director.
    last_good: Mutex<Option<Weak<dyn Backend>>>,
}

impl Fallback {
    pub fn new(sticky: bool) -> Self {
        Self {
            sticky,
            last_good: Mutex::new(None),
        }
    }

    fn last_good(&self) -> Option<Arc<dyn Backend>> {
        if !self.sticky {
            return None;
        }
        self.last_good.lock().as_ref().and_then(Weak::upgrade)
    }

    pub fn resolve(
        &self,
        set: &BackendSet,
        ctx: &Context,
    ) -> Result<Arc<dyn Backend>, ResolveError> {
        let last_good = self.last_good();

        let chosen = set.with_read(|members| {
            if let Some(last) = &last_good {
                if let Some(index) = members.position(last) {
                    let backend = &members.backends()[index];
                    if backend.healthy(ctx) {
                        return Some((Arc::clone(backend), true));
                    }
                }
            }

            members
                .backends()
                .iter()
                .find(|backend| backend.healthy(ctx))
                .map(|backend| (Arc::clone(backend), false))
        });

        let (backend, was_sticky) = chosen.ok_or(ResolveError::NoBackend)?;
        if self.sticky && !was_sticky {
            *self.last_good.lock() = Some(Arc::downgrade(&backend));
        }
        Ok(backend)
    }

    /// Uptime of the sticky backend, else of the first backend in order that
    /// reports one. Health is not consulted.
    pub fn uptime(&self, set: &BackendSet, ctx: &Context) -> Option<Uptime> {
        let last_good = self.last_good();

        set.with_read(|members| {
            if let Some(last) = &last_good {
                if members.contains(last) {
                    if let Some(uptime) = last.uptime(ctx) {
                        return Some(uptime);
                    }
                }
            }

            members.backends().iter().find_map(|backend| backend.uptime(ctx))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use super::*;
    use crate::StaticBackend;

    fn pool(names: &[&str]) -> (BackendSet, Vec<Arc<StaticBackend>>) {
        let set = BackendSet::new();
        let handles: Vec<Arc<StaticBackend>> = names
            .iter()
            .map(|name| Arc::new(StaticBackend::new(*name)))
            .collect();
        for handle in &handles {
            set.add_default(handle.clone()).unwrap();
        }
        (set, handles)
    }

    fn pick(fallback: &Fallback, set: &BackendSet) -> String {
        fallback
            .resolve(set, &Context::new())
            .unwrap()
            .name()
            .to_string()
    }

    #[test]
    fn prefers_first_healthy_in_order() {
        let (set, handles) = pool(&["a", "b", "c"]);
        let fallback = Fallback::new(false);
        assert_eq!(pick(&fallback, &set), "a");

        handles[0].set_healthy(false);
        handles[1].set_healthy(false);
        assert_eq!(pick(&fallback, &set), "c");

        handles[0].set_healthy(true);
        assert_eq!(pick(&fallback, &set), "a");
    }

    #[test]
    fn sticky_holds_after_earlier_backend_recovers() {
        let (set, handles) = pool(&["a", "b", "c"]);
        let fallback = Fallback::new(true);

        handles[0].set_healthy(false);
        handles[1].set_healthy(false);
        assert_eq!(pick(&fallback, &set), "c");

        handles[0].set_healthy(true);
        handles[1].set_healthy(true);
        for _ in 0..10 {
            assert_eq!(pick(&fallback, &set), "c");
        }
    }

    #[test]
    fn sticky_moves_on_when_last_good_fails() {
        let (set, handles) = pool(&["a", "b", "c"]);
        let fallback = Fallback::new(true);

        handles[0].set_healthy(false);
        assert_eq!(pick(&fallback, &set), "b");

        handles[1].set_healthy(false);
        handles[0].set_healthy(true);
        assert_eq!(pick(&fallback, &set), "a");

        // b is healthy again, but a is now the sticky choice
        handles[1].set_healthy(true);
        assert_eq!(pick(&fallback, &set), "a");
    }

    #[test]
    fn sticky_backend_removed_from_set_is_skipped() {
        let (set, handles) = pool(&["a", "b", "c"]);
        let fallback = Fallback::new(true);

        handles[0].set_healthy(false);
        assert_eq!(pick(&fallback, &set), "b");

        handles[0].set_healthy(true);
        set.remove("b").unwrap();
        assert_eq!(pick(&fallback, &set), "a");
    }

    #[test]
    fn sticky_reference_does_not_keep_backend_alive() {
        let set = BackendSet::new();
        let fallback = Fallback::new(true);
        let only: Arc<dyn Backend> = Arc::new(StaticBackend::new("only"));
        let weak = Arc::downgrade(&only);
        set.add_default(only).unwrap();

        assert_eq!(pick(&fallback, &set), "only");
        set.remove("only").unwrap();
        assert!(weak.upgrade().is_none());
        assert_eq!(
            fallback.resolve(&set, &Context::new()).unwrap_err(),
            ResolveError::NoBackend
        );
    }

    #[test]
    fn exhaustion_returns_no_backend() {
        let (set, handles) = pool(&["a", "b"]);
        let fallback = Fallback::new(true);
        assert_eq!(pick(&fallback, &set), "a");

        for handle in &handles {
            handle.set_healthy(false);
        }
        assert_eq!(
            fallback.resolve(&set, &Context::new()).unwrap_err(),
            ResolveError::NoBackend
        );
    }

    #[test]
    fn uptime_stops_at_first_supporting_backend_regardless_of_health() {
        let (set, handles) = pool(&["a", "b", "c"]);
        let fallback = Fallback::new(false);
        let ctx = Context::new();
        assert!(fallback.uptime(&set, &ctx).is_none());

        let at = SystemTime::UNIX_EPOCH + Duration::from_secs(100);
        handles[1].set_uptime(Some(Uptime {
            changed_at: at,
            load: 0.25,
        }));
        handles[1].set_healthy(false);
        handles[2].set_uptime(Some(Uptime {
            changed_at: SystemTime::UNIX_EPOCH,
            load: 0.75,
        }));

        let uptime = fallback.uptime(&set, &ctx).unwrap();
        assert_eq!(uptime.load, 0.25);
    }

    #[test]
    fn uptime_scans_on_when_sticky_backend_reports_none() {
        let (set, handles) = pool(&["a", "b", "c"]);
        let fallback = Fallback::new(true);
        handles[0].set_uptime(Some(Uptime {
            changed_at: SystemTime::UNIX_EPOCH,
            load: 0.4,
        }));

        handles[0].set_healthy(false);
        assert_eq!(pick(&fallback, &set), "b");
        handles[0].set_healthy(true);

        // b is sticky and still a member, but tracks no uptime
        let uptime = fallback.uptime(&set, &Context::new()).unwrap();
        assert_eq!(uptime.load, 0.4);
        assert_eq!(pick(&fallback, &set), "b");
    }

    #[test]
    fn uptime_prefers_sticky_backend() {
        let (set, handles) = pool(&["a", "b"]);
        let fallback = Fallback::new(true);
        for (handle, load) in handles.iter().zip([0.1, 0.9]) {
            handle.set_uptime(Some(Uptime {
                changed_at: SystemTime::UNIX_EPOCH,
                load,
            }));
        }

        handles[0].set_healthy(false);
        assert_eq!(pick(&fallback, &set), "b");
        handles[0].set_healthy(true);

        let uptime = fallback.uptime(&set, &Context::new()).unwrap();
        assert_eq!(uptime.load, 0.9);
    }
}
