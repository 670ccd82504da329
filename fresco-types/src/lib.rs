//! Core type definitions for fresco.
//!
//! This crate defines the fundamental, component-agnostic types used
//! throughout the host:
//! - Application lifecycle status
//! - Application configuration (name + markup origin)
//! - Resource catalogs for extracted stylesheet links and scripts
//!
//! Everything that touches the markup tree, the sandbox, or the network
//! belongs in `fresco-platform` / `fresco-host`, not here.

mod config;
mod source;
mod status;

pub use config::AppConfig;
pub use source::{LinkEntry, LinkMap, ScriptEntry, ScriptMap, inline_script_key};
pub use status::AppStatus;
