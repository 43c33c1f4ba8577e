use std::sync::Arc;

use podling_runtime::Agent;

/// Shared application state handed to every handler: the single agent
/// instance owning the registries, runtime adapter, and outbound client.
#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<Agent>,
}

impl AppState {
    pub fn new(agent: Arc<Agent>) -> Self {
        Self { agent }
    }
}
