//! Shared handler state.

use std::sync::Arc;
use std::time::Instant;

use stackpro_resolve::Resolvers;

#[derive(Clone)]
pub struct AppState {
    pub resolvers: Arc<Resolvers>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(resolvers: Arc<Resolvers>) -> Self {
        Self {
            resolvers,
            start_time: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
