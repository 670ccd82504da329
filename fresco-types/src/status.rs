//! Application lifecycle status.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of one sub-application.
///
/// Transitions are driven exclusively by the lifecycle controller:
/// `Created → Loading → Mounted → Unmounted`, with `Unmounted → Loading`
/// possible only through a fresh registry lookup of a cached record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppStatus {
    /// Record exists but loading has not started.
    #[default]
    Created,
    /// Markup fetched or in flight; resource classes not yet both resolved.
    Loading,
    /// Subtree inserted, sandbox active, scripts executed.
    Mounted,
    /// Removed from the surface; record may remain cached for remount.
    Unmounted,
}

impl AppStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Loading => "loading",
            Self::Mounted => "mounted",
            Self::Unmounted => "unmounted",
        }
    }
}

impl fmt::Display for AppStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_created() {
        assert_eq!(AppStatus::default(), AppStatus::Created);
    }

    #[test]
    fn display_matches_as_str() {
        for status in [
            AppStatus::Created,
            AppStatus::Loading,
            AppStatus::Mounted,
            AppStatus::Unmounted,
        ] {
            assert_eq!(status.to_string(), status.as_str());
        }
    }

    #[test]
    fn serde_lowercase() {
        let json = serde_json::to_string(&AppStatus::Mounted).unwrap();
        assert_eq!(json, r#""mounted""#);
        let back: AppStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, AppStatus::Mounted);
    }
}
