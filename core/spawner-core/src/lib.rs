//! # spawner-core
//!
//! Event model, session state and terminal rendering for the spawner
//! notification hook.
//!
//! ## Design Principles
//!
//! - **Synchronous**: each hook invocation is a short-lived process; no async runtime.
//! - **Graceful degradation**: bad input, unknown agents and corrupt state are
//!   no-ops or fresh starts, never errors surfaced to the host.
//! - **Pure rendering**: renderers return strings; callers choose the stream.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use spawner_core::{apply_event, extract_markers, now_millis, HookConfig};
//!
//! let config = HookConfig::load();
//! let store = config.store();
//! let _lock = store.lock()?;
//! let mut state = store.load();
//! for event in extract_markers(prompt) {
//!     let applied = apply_event(&mut state, &event, now_millis());
//!     if let Some(text) = config.renderer().applied(&applied) {
//!         eprintln!("{}", text);
//!     }
//! }
//! store.save(&state)?;
//! ```

pub mod catalog;
pub mod config;
pub mod emit;
pub mod error;
pub mod events;
pub mod format;
pub mod handlers;
pub mod render;
pub mod state;

pub use catalog::{get_agent_icon, AgentCatalog, AgentProfile};
pub use config::{ColorMode, HookConfig};
pub use error::{Result, SpawnerError};
pub use events::{
    extract_markers, now_millis, CompleteData, ErrorData, EventKind, EventPayload, HandoffData,
    ProgressData, Severity, SpawnData, SpawnerEvent, WaitingData,
};
pub use handlers::{all_agents_complete, apply_event, Applied, HandoffOutcome};
pub use render::Renderer;
pub use state::{AgentState, AgentStatus, NotificationState, StateLock, StateStore};
