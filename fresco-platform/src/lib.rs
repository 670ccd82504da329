//! Host-page platform services for fresco.
//!
//! The lifecycle controller, sandbox and scoping engine in `fresco-host`
//! treat the browser environment as a set of collaborators. This crate is
//! that boundary:
//! - [`markup`] — the rendering-surface tree: a detached node arena with a
//!   permissive markup parser, subtree cloning, batched fragment insertion
//!   and one-shot text-mutation observers.
//! - [`cssom`] — the style rule tree: parsed rule objects plus the reusable
//!   scratch materializer for not-yet-attached stylesheet text.
//! - [`global`] — the host global object: property and listener primitives
//!   the sandbox wraps, with an in-memory implementation.
//! - [`fetch`] — the "fetch text by URL" transport.
//! - [`runtime`] — the executed-script boundary.

pub mod cssom;
pub mod fetch;
pub mod global;
pub mod markup;
pub mod runtime;

pub use cssom::{CssRule, StyleTemplate};
pub use fetch::{FetchError, HttpFetcher, TextFetcher};
pub use global::{
    DirectScope, FunctionKind, FunctionValue, GlobalScope, GlobalValue, HostGlobal, ListenerId,
    MemoryGlobal, Receiver,
};
pub use markup::{Document, NodeId};
pub use runtime::{RuntimeError, ScriptRuntime};
