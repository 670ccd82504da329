//! Host configuration — reads `fresco.toml` and controls the isolation
//! features and transport limits.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

/// Configuration for one [`AppHost`](crate::AppHost).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// Rewrite sub-application stylesheets so selectors stay confined to
    /// the mount point.
    #[serde(default = "default_true")]
    pub scoped_css: bool,
    /// Run sub-application scripts inside the execution sandbox. When off,
    /// scripts see the real host global with no interception.
    #[serde(default = "default_true")]
    pub sandbox: bool,
    /// Per-request timeout for markup and resource fetches.
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
}

fn default_true() -> bool {
    true
}

fn default_fetch_timeout_ms() -> u64 {
    30_000
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            scoped_css: true,
            sandbox: true,
            fetch_timeout_ms: default_fetch_timeout_ms(),
        }
    }
}

impl HostConfig {
    /// Loads configuration from an explicit path. A missing file yields the
    /// defaults; an unparsable file also falls back to the defaults with a
    /// warning rather than failing host startup.
    pub fn load_from(path: PathBuf) -> Self {
        if !path.exists() {
            info!("No host config found at {:?}, using defaults", path);
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str::<Self>(&contents) {
                Ok(config) => {
                    info!("Loaded host config from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!(
                        "Failed to parse host config {:?}: {}. Using defaults.",
                        path, e
                    );
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read host config {:?}: {}", path, e);
                Self::default()
            }
        }
    }
}
