//! Rate limiting utilities

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Rate limiter type alias
pub type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Create a rate limiter with the specified requests per second
pub fn create_limiter(requests_per_second: u32) -> Arc<Limiter> {
    let quota = Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::direct(quota))
}

/// Per-session limiter for inbound player actions
#[derive(Clone)]
pub struct SessionRateLimiter {
    action_limiter: Arc<Limiter>,
}

impl SessionRateLimiter {
    pub fn new(actions_per_second: u32) -> Self {
        Self {
            action_limiter: create_limiter(actions_per_second),
        }
    }

    /// Check if an action message is allowed (returns true if allowed)
    pub fn check_action(&self) -> bool {
        self.action_limiter.check().is_ok()
    }
}
