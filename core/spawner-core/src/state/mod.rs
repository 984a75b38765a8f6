//! Session state carried across hook invocations.
//!
//! ```text
//! host CLI → spawner-hook → lock + load → handlers → render → save/clear
//!  (Task)     (one process)   (store)      (mutate)    (stderr)  (store)
//! ```
//!
//! - [`types`]: agent records and the whole-session snapshot
//! - [`store`]: reads/writes the JSON snapshot in the temp directory

mod store;
pub(crate) mod types;

pub use store::{StateLock, StateStore};
pub use types::{AgentState, AgentStatus, NotificationState, STATE_VERSION};
