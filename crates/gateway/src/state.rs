use agentdesk_bootstrap::Bootstrapper;

/// Shared state handed to every route.
#[derive(Clone)]
pub struct AppState {
    pub bootstrapper: Bootstrapper,
    pub version: String,
}

impl AppState {
    pub fn new(bootstrapper: Bootstrapper) -> Self {
        Self {
            bootstrapper,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
