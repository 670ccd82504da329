//! The host global object boundary.
//!
//! The sandbox in `fresco-host` is a delegating accessor layer over two
//! backing stores: its own isolated scope map and the real host global
//! behind this trait. The value model distinguishes plain data from
//! callable values so the sandbox can apply its receiver-rebinding rule,
//! and the listener primitives are what the sandbox wraps to guarantee
//! rollback on stop.

use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use uuid::Uuid;

/// Identifies one registered global event listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(Uuid);

impl ListenerId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether a callable value is a plain function or a class constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Plain,
    Class,
}

/// What receiver a callable value is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Receiver {
    /// Invocation uses whatever receiver the call site supplies.
    Unbound,
    /// Invocation always uses the host global as receiver.
    Host,
}

/// A callable global value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionValue {
    pub name: String,
    pub kind: FunctionKind,
    pub receiver: Receiver,
}

impl FunctionValue {
    /// A plain, unbound host function.
    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FunctionKind::Plain,
            receiver: Receiver::Unbound,
        }
    }

    /// A class constructor.
    pub fn class(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FunctionKind::Class,
            receiver: Receiver::Unbound,
        }
    }

    /// The same callable rebound to the host global receiver.
    #[must_use]
    pub fn bound_to_host(mut self) -> Self {
        self.receiver = Receiver::Host;
        self
    }
}

/// A property value on a global scope.
#[derive(Debug, Clone, PartialEq)]
pub enum GlobalValue {
    Data(Value),
    Function(FunctionValue),
}

impl GlobalValue {
    pub fn data(value: impl Into<Value>) -> Self {
        Self::Data(value.into())
    }
}

/// The real host global: property fallback plus the listener mechanism
/// the sandbox forwards to.
pub trait HostGlobal: Send + Sync {
    fn get(&self, key: &str) -> Option<GlobalValue>;
    fn set(&self, key: &str, value: GlobalValue);
    fn remove(&self, key: &str);

    fn add_listener(&self, event: &str, listener: ListenerId);
    fn remove_listener(&self, event: &str, listener: ListenerId);
    /// Number of live listeners for one event type.
    fn listener_count(&self, event: &str) -> usize;
}

/// The property/listener surface a running script sees. The sandbox
/// implements this with its interception rules; [`DirectScope`] implements
/// it as a pass-through for sandbox-disabled execution.
pub trait GlobalScope {
    fn get(&self, key: &str) -> Option<GlobalValue>;
    fn set(&mut self, key: &str, value: GlobalValue);
    fn remove(&mut self, key: &str);
    fn add_listener(&mut self, event: &str, listener: ListenerId);
    fn remove_listener(&mut self, event: &str, listener: ListenerId);
}

/// In-memory host global.
#[derive(Default)]
pub struct MemoryGlobal {
    props: Mutex<HashMap<String, GlobalValue>>,
    listeners: Mutex<HashMap<String, HashSet<ListenerId>>>,
}

impl MemoryGlobal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total listener count across all event types.
    pub fn total_listeners(&self) -> usize {
        self.listeners.lock().unwrap().values().map(HashSet::len).sum()
    }
}

impl HostGlobal for MemoryGlobal {
    fn get(&self, key: &str) -> Option<GlobalValue> {
        self.props.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: GlobalValue) {
        self.props.lock().unwrap().insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        self.props.lock().unwrap().remove(key);
    }

    fn add_listener(&self, event: &str, listener: ListenerId) {
        self.listeners
            .lock()
            .unwrap()
            .entry(event.to_string())
            .or_default()
            .insert(listener);
    }

    fn remove_listener(&self, event: &str, listener: ListenerId) {
        let mut listeners = self.listeners.lock().unwrap();
        if let Some(set) = listeners.get_mut(event) {
            set.remove(&listener);
            if set.is_empty() {
                listeners.remove(event);
            }
        }
    }

    fn listener_count(&self, event: &str) -> usize {
        self.listeners
            .lock()
            .unwrap()
            .get(event)
            .map_or(0, HashSet::len)
    }
}

/// Pass-through scope used when sandboxing is disabled: every access goes
/// straight to the host global with no interception bookkeeping.
pub struct DirectScope<'a> {
    host: &'a dyn HostGlobal,
}

impl<'a> DirectScope<'a> {
    pub fn new(host: &'a dyn HostGlobal) -> Self {
        Self { host }
    }
}

impl GlobalScope for DirectScope<'_> {
    fn get(&self, key: &str) -> Option<GlobalValue> {
        self.host.get(key)
    }

    fn set(&mut self, key: &str, value: GlobalValue) {
        self.host.set(key, value);
    }

    fn remove(&mut self, key: &str) {
        self.host.remove(key);
    }

    fn add_listener(&mut self, event: &str, listener: ListenerId) {
        self.host.add_listener(event, listener);
    }

    fn remove_listener(&mut self, event: &str, listener: ListenerId) {
        self.host.remove_listener(event, listener);
    }
}
