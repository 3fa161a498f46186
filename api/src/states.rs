use crate::{backend::Backend, config::Config};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::{num::NonZeroU32, sync::Arc};
use uuid::Uuid;

// ============================================================================
// APPLICATION STATE - Shared data across all requests
// ============================================================================
/// Everything a handler needs, injected through axum's `State` instead of globals.
///
/// `backend` is the single source of truth; nothing here caches records.
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn Backend>,
    pub config: Arc<Config>,
    write_limiter: Arc<DefaultKeyedRateLimiter<Uuid>>,
}

impl AppState {
    pub fn new(backend: Arc<dyn Backend>, config: Config) -> Self {
        let per_second = NonZeroU32::new(config.write_rate_per_second).unwrap_or(NonZeroU32::MIN);

        Self {
            backend,
            config: Arc::new(config),
            write_limiter: Arc::new(RateLimiter::keyed(Quota::per_second(per_second))),
        }
    }

    /// Whether `user_id` may issue another write right now.
    pub fn allow_write(&self, user_id: Uuid) -> bool {
        self.write_limiter.check_key(&user_id).is_ok()
    }

    /// Forget users whose write quota has fully refilled.
    pub fn prune_write_limiter(&self) {
        self.write_limiter.retain_recent();
        self.write_limiter.shrink_to_fit();
    }

    /// Number of users the write limiter currently tracks.
    pub fn tracked_writers(&self) -> usize {
        self.write_limiter.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;

    #[test]
    fn write_quota_is_per_user() {
        let mut config = Config::local("secret");
        config.write_rate_per_second = 2;
        let state = AppState::new(Arc::new(MemoryBackend::new("http://localhost")), config);

        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
        assert!(state.allow_write(alice));
        assert!(state.allow_write(alice));
        assert!(!state.allow_write(alice));
        assert!(state.allow_write(bob));
    }

    #[test]
    fn idle_writers_are_pruned() {
        let mut config = Config::local("secret");
        config.write_rate_per_second = 1000;
        let state = AppState::new(Arc::new(MemoryBackend::new("http://localhost")), config);

        for _ in 0..500 {
            assert!(state.allow_write(Uuid::new_v4()));
        }
        assert_eq!(state.tracked_writers(), 500);

        // One spent cell refills in a millisecond at this rate.
        std::thread::sleep(std::time::Duration::from_millis(50));
        state.prune_write_limiter();
        assert_eq!(state.tracked_writers(), 0);
    }
}
