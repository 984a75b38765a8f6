//! `spawner-hook status`: read-only view of the session in progress.

use spawner_core::{now_millis, HookConfig};

pub fn run(config: &HookConfig) {
    let store = config.store();
    let state = store.load();
    tracing::debug!(path = %store.path().display(), agents = state.active_agents.len(), "Rendering status");
    eprintln!("{}", config.renderer().session_status(&state, now_millis()));
}
