//! Hook configuration and path management.
//!
//! Resolution order, later wins:
//!
//! 1. built-in defaults
//! 2. `$SPAWNER_HOME/notify.json` (default home: `~/.spawner`)
//! 3. environment: `SPAWNER_STATE_FILE`, `SPAWNER_COLOR`, `NO_COLOR`
//!
//! A missing or unreadable config file is not an error; the hook runs on
//! defaults.

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use fs_err as fs;
use serde::{Deserialize, Serialize};

use crate::catalog::{AgentCatalog, AgentProfile};
use crate::render::{Renderer, DEFAULT_LANE_WIDTH, MIN_LANE_WIDTH};
use crate::state::StateStore;

pub const CONFIG_FILE_NAME: &str = "notify.json";
pub const STATE_FILE_NAME: &str = "spawner-notifications.json";
pub const LOG_FILE_NAME: &str = "spawner-hook.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(ColorMode::Auto),
            "always" | "on" | "1" => Some(ColorMode::Always),
            "never" | "off" | "0" => Some(ColorMode::Never),
            _ => None,
        }
    }
}

/// On-disk shape of `notify.json`. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub agents: HashMap<String, AgentProfile>,
    pub lane_width: Option<usize>,
    pub color: Option<ColorMode>,
    pub state_file: Option<PathBuf>,
}

impl ConfigFile {
    fn read(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(_) => return Self::default(),
        };
        match serde_json::from_str(&content) {
            Ok(file) => file,
            Err(err) => {
                tracing::warn!(error = %err, path = %path.display(), "Ignoring unreadable config file");
                Self::default()
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct HookConfig {
    home: PathBuf,
    pub state_file: PathBuf,
    pub color: ColorMode,
    pub lane_width: usize,
    pub agents: HashMap<String, AgentProfile>,
}

fn default_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(env::temp_dir)
        .join(".spawner")
}

impl HookConfig {
    /// Defaults rooted at `home`, without reading anything.
    pub fn with_home(home: PathBuf) -> Self {
        HookConfig {
            home,
            state_file: env::temp_dir().join(STATE_FILE_NAME),
            color: ColorMode::Auto,
            lane_width: DEFAULT_LANE_WIDTH,
            agents: HashMap::new(),
        }
    }

    /// Resolves configuration from the process environment.
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Resolves configuration with `lookup` standing in for the environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let home = var("SPAWNER_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(default_home);
        let mut config = Self::with_home(home);
        let file = ConfigFile::read(&config.config_file());

        if let Some(path) = var("SPAWNER_STATE_FILE")
            .map(PathBuf::from)
            .or(file.state_file)
        {
            config.state_file = path;
        }

        config.color = if var("NO_COLOR").is_some() {
            ColorMode::Never
        } else {
            var("SPAWNER_COLOR")
                .and_then(|raw| ColorMode::parse(&raw))
                .or(file.color)
                .unwrap_or_default()
        };

        config.lane_width = file
            .lane_width
            .unwrap_or(DEFAULT_LANE_WIDTH)
            .max(MIN_LANE_WIDTH);
        config.agents = file.agents;
        config
    }

    pub fn config_file(&self) -> PathBuf {
        self.home.join(CONFIG_FILE_NAME)
    }

    pub fn log_file(&self) -> PathBuf {
        self.home.join("logs").join(LOG_FILE_NAME)
    }

    pub fn catalog(&self) -> AgentCatalog {
        AgentCatalog::with_custom(&self.agents)
    }

    pub fn renderer(&self) -> Renderer {
        Renderer::new(self.lane_width)
    }

    pub fn store(&self) -> StateStore {
        StateStore::new(&self.state_file)
    }

    /// Forces stderr styling on or off; `Auto` leaves tty detection alone.
    pub fn apply_color(&self) {
        match self.color {
            ColorMode::Auto => {}
            ColorMode::Always => console::set_colors_enabled_stderr(true),
            ColorMode::Never => console::set_colors_enabled_stderr(false),
        }
    }
}
