//! `spawner-hook reset`: discards the session, e.g. after an agent stayed
//! blocked and the session can never complete on its own.

use spawner_core::HookConfig;

pub fn run(config: &HookConfig) -> Result<(), String> {
    let store = config.store();
    let _lock = store.lock()?;
    store.clear()?;
    eprintln!("spawner: session state cleared ({})", store.path().display());
    Ok(())
}
