//! File-backed session snapshot.
//!
//! Every hook invocation is a fresh process, so this file is the only thing
//! that carries a session from one invocation to the next.
//!
//! # File Format
//!
//! ```json
//! {
//!   "version": 1,
//!   "activeAgents": [["toolu_01", { ... AgentState ... }]],
//!   "completedAgents": [],
//!   "handoffs": [],
//!   "startTime": 1712000000000,
//!   "totalTasks": 1
//! }
//! ```
//!
//! # Defensive Design
//!
//! A corrupt snapshot must never break the host's tool call:
//! - Missing or empty files load as a fresh session
//! - Corrupt JSON loads as a fresh session (logged)
//! - Unsupported versions load as a fresh session
//!
//! # Concurrency
//!
//! Writes go through temp file + rename. Invocations that overlap serialize
//! on an advisory lock held from load to save (see [`StateStore::lock`]).

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;
use fs_err as fs;
use tempfile::NamedTempFile;

use crate::error::{Result, SpawnerError};
use crate::events::now_millis;

use super::types::{NotificationState, STATE_VERSION};

/// Upper bound on how long an invocation waits for another one to finish.
const LOCK_TIMEOUT: Duration = Duration::from_millis(100);
const LOCK_RETRY: Duration = Duration::from_millis(5);

/// Holds the advisory lock until dropped.
#[derive(Debug)]
pub struct StateLock {
    _file: File,
}

pub struct StateStore {
    file_path: PathBuf,
}

impl StateStore {
    pub fn new(file_path: &Path) -> Self {
        StateStore {
            file_path: file_path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self
            .file_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        self.file_path.with_file_name(name)
    }

    /// Takes the exclusive lock, waiting at most [`LOCK_TIMEOUT`].
    pub fn lock(&self) -> Result<StateLock> {
        let lock_path = self.lock_path();
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| SpawnerError::io("create state directory", e))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|source| SpawnerError::Lock {
                path: lock_path.clone(),
                source,
            })?;

        let deadline = Instant::now() + LOCK_TIMEOUT;
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => {
                    tracing::trace!(path = %lock_path.display(), "Acquired state lock");
                    return Ok(StateLock { _file: file });
                }
                Err(err) if Instant::now() >= deadline => {
                    return Err(SpawnerError::Lock {
                        path: lock_path,
                        source: err,
                    });
                }
                Err(_) => thread::sleep(LOCK_RETRY),
            }
        }
    }

    /// Loads the snapshot, falling back to a fresh session on any problem.
    pub fn load(&self) -> NotificationState {
        match self.try_load() {
            Ok(Some(state)) => state,
            Ok(None) => NotificationState::new(now_millis()),
            Err(err) => {
                tracing::warn!(error = %err, path = %self.file_path.display(), "Starting fresh session state");
                NotificationState::new(now_millis())
            }
        }
    }

    fn try_load(&self) -> Result<Option<NotificationState>> {
        if !self.file_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.file_path)
            .map_err(|e| SpawnerError::io("read state file", e))?;

        if content.trim().is_empty() {
            tracing::debug!("Empty state file, starting fresh");
            return Ok(None);
        }

        let mut state: NotificationState = serde_json::from_str(&content)
            .map_err(|e| SpawnerError::json("parse state file", e))?;

        if state.version != STATE_VERSION {
            tracing::warn!(
                version = state.version,
                expected = STATE_VERSION,
                "Unsupported state file version, starting fresh"
            );
            return Ok(None);
        }

        state.rebuild_name_index();
        Ok(Some(state))
    }

    /// Overwrites the snapshot atomically.
    pub fn save(&self, state: &NotificationState) -> Result<()> {
        let content = serde_json::to_string(state)
            .map_err(|e| SpawnerError::json("serialize state", e))?;

        let parent_dir = match self.file_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent_dir).map_err(|e| SpawnerError::io("create state directory", e))?;

        let mut temp_file = NamedTempFile::new_in(parent_dir)
            .map_err(|e| SpawnerError::io("create temp state file", e))?;
        temp_file
            .write_all(content.as_bytes())
            .map_err(|e| SpawnerError::io("write temp state file", e))?;
        temp_file
            .flush()
            .map_err(|e| SpawnerError::io("flush temp state file", e))?;
        temp_file
            .persist(&self.file_path)
            .map_err(|e| SpawnerError::io("replace state file", e.error))?;

        tracing::trace!(path = %self.file_path.display(), "Saved session state");
        Ok(())
    }

    /// Removes the snapshot. A missing file is not an error.
    pub fn clear(&self) -> Result<()> {
        if self.file_path.exists() {
            fs::remove_file(&self.file_path).map_err(|e| SpawnerError::io("remove state file", e))?;
            tracing::debug!(path = %self.file_path.display(), "Cleared session state");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::HandoffData;
    use crate::state::types::{AgentState, AgentStatus};
    use tempfile::tempdir;

    fn sample_state() -> NotificationState {
        let mut state = NotificationState::new(1_000);
        state.active_agents.insert(
            "a1".into(),
            AgentState {
                id: "a1".into(),
                name: "Frontend".into(),
                icon: "🎨".into(),
                skills: vec!["react".into()],
                task: "Build login page".into(),
                status: AgentStatus::Waiting,
                progress: 40,
                completed: vec!["layout".into()],
                current: "Waiting for Backend".into(),
                start_time: 1_000,
                waiting_for: Some("Backend".into()),
                waiting_reason: Some("needs API".into()),
                ..Default::default()
            },
        );
        state.completed_agents.insert(
            "a2".into(),
            AgentState {
                id: "a2".into(),
                name: "Backend".into(),
                icon: "🔧".into(),
                status: AgentStatus::Complete,
                progress: 100,
                duration: 5_000,
                handoffs_out: vec!["Frontend".into()],
                ..Default::default()
            },
        );
        state.handoffs.push(HandoffData {
            from: "Backend".into(),
            to: "Frontend".into(),
            payload: serde_json::json!({"endpoint": "/login"}),
            description: "API ready".into(),
        });
        state.total_tasks = 2;
        state
    }

    #[test]
    fn test_load_nonexistent_file_returns_fresh_state() {
        let temp = tempdir().unwrap();
        let store = StateStore::new(&temp.path().join("missing.json"));
        let state = store.load();
        assert!(state.active_agents.is_empty());
        assert!(state.completed_agents.is_empty());
        assert!(state.handoffs.is_empty());
        assert_eq!(state.total_tasks, 0);
    }

    #[test]
    fn test_load_empty_file_returns_fresh_state() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("empty.json");
        std::fs::write(&file, "  \n").unwrap();
        assert!(StateStore::new(&file).load().is_empty());
    }

    #[test]
    fn test_load_corrupt_json_returns_fresh_state() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("corrupt.json");
        std::fs::write(&file, "{invalid json}").unwrap();

        let state = StateStore::new(&file).load();
        assert!(state.is_empty());
        assert_eq!(state.total_tasks, 0);
    }

    #[test]
    fn test_load_unsupported_version_returns_fresh_state() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("v9.json");
        std::fs::write(
            &file,
            r#"{"version":9,"activeAgents":[],"completedAgents":[],"handoffs":[],"startTime":1,"totalTasks":4}"#,
        )
        .unwrap();

        assert_eq!(StateStore::new(&file).load().total_tasks, 0);
    }

    #[test]
    fn test_persistence_round_trip() {
        let temp = tempdir().unwrap();
        let store = StateStore::new(&temp.path().join("state.json"));
        let state = sample_state();

        store.save(&state).unwrap();
        let loaded = store.load();

        assert_eq!(loaded, state);
        assert_eq!(loaded.active_id_for_name("Frontend"), Some("a1"));
    }

    #[test]
    fn test_save_creates_missing_directory() {
        let temp = tempdir().unwrap();
        let store = StateStore::new(&temp.path().join("nested/dir/state.json"));
        store.save(&sample_state()).unwrap();
        assert!(store.path().exists());
    }

    #[test]
    fn test_clear_removes_file_and_tolerates_missing() {
        let temp = tempdir().unwrap();
        let store = StateStore::new(&temp.path().join("state.json"));
        store.save(&sample_state()).unwrap();

        store.clear().unwrap();
        assert!(!store.path().exists());
        store.clear().unwrap();
    }

    #[test]
    fn test_lock_is_exclusive_until_dropped() {
        let temp = tempdir().unwrap();
        let store = StateStore::new(&temp.path().join("state.json"));

        let held = store.lock().unwrap();
        assert!(matches!(store.lock(), Err(SpawnerError::Lock { .. })));
        drop(held);
        assert!(store.lock().is_ok());
    }
}
