//! Per-application state record.
//!
//! One [`App`] per registered sub-application, owned by the host's
//! process-wide registry and mutated only by the lifecycle controller.

use crate::sandbox::Sandbox;
use fresco_platform::NodeId;
use fresco_types::{AppConfig, AppStatus, LinkMap, ScriptMap};

/// Cached resources extracted from the application's markup.
///
/// `html` is the detached source tree; the catalogs preserve document
/// order. All three survive unmount so a remount can skip the network.
#[derive(Debug, Default)]
pub struct SourceSet {
    pub html: Option<NodeId>,
    pub links: LinkMap,
    pub scripts: ScriptMap,
}

/// One sub-application's record: identity, lifecycle state, the
/// dual-completion counter, cached source and the execution sandbox.
pub struct App {
    pub(crate) name: String,
    pub(crate) url: String,
    pub(crate) status: AppStatus,
    /// Dual-completion counter: 0..2, one increment per resolved resource
    /// class.
    pub(crate) load_count: u8,
    pub(crate) container: Option<NodeId>,
    pub(crate) source: SourceSet,
    pub(crate) sandbox: Sandbox,
}

impl App {
    pub(crate) fn new(config: AppConfig, sandbox: Sandbox, container: NodeId) -> Self {
        Self {
            name: config.name,
            url: config.url,
            status: AppStatus::Created,
            load_count: 0,
            container: Some(container),
            source: SourceSet::default(),
            sandbox,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn status(&self) -> AppStatus {
        self.status
    }

    pub fn container(&self) -> Option<NodeId> {
        self.container
    }

    pub fn source(&self) -> &SourceSet {
        &self.source
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    /// Records one resource-class completion. Returns whether mount should
    /// proceed: both classes resolved and no unmount arrived mid-flight.
    /// A late completion that finds the application unmounted is a no-op.
    pub(crate) fn note_class_loaded(&mut self) -> bool {
        self.load_count += 1;
        self.load_count == 2 && self.status != AppStatus::Unmounted
    }
}
