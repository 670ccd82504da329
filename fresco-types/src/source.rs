//! Resource catalogs for extracted stylesheet links and scripts.
//!
//! Both catalogs preserve insertion order, which is the document order of
//! the original tags. The lifecycle controller relies on that order for
//! script execution, so these are index-ordered maps rather than hash maps.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One `link rel=stylesheet` reference, keyed by its href in a [`LinkMap`].
/// `code` is empty until the remote fetch round resolves it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEntry {
    pub code: String,
}

/// One script reference, keyed in a [`ScriptMap`] by its src (external) or
/// by a random token (inline).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptEntry {
    pub code: String,
    pub is_external: bool,
}

impl ScriptEntry {
    /// An external script pending fetch.
    pub fn external() -> Self {
        Self {
            code: String::new(),
            is_external: true,
        }
    }

    /// An inline script, already resolved.
    pub fn inline(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            is_external: false,
        }
    }
}

/// Ordered catalog of stylesheet link references: href → entry.
pub type LinkMap = IndexMap<String, LinkEntry>;

/// Ordered catalog of script references: src or random token → entry.
pub type ScriptMap = IndexMap<String, ScriptEntry>;

/// Generates a fresh catalog key for an inline script.
pub fn inline_script_key() -> String {
    Uuid::new_v4().simple().to_string()
}
