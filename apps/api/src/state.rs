use crate::config::Config;
use crate::tracker::Tracker;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub tracker: Tracker,
    pub config: Config,
}
