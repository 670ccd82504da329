//! Execution sandbox — one isolated global scope per application.
//!
//! The sandbox is a delegating accessor layer over two backing stores: its
//! own isolated scope map and the real host global. Reads fall back to the
//! host, writes land only in the isolated scope while the sandbox is
//! active, and stopping rolls back every injected key and every global
//! listener the sub-application left behind.
//!
//! Construction happens once per application record; the same sandbox is
//! reused across stop/start cycles until the record is destroyed.

use fresco_platform::{
    FunctionKind, GlobalScope, GlobalValue, HostGlobal, ListenerId,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

pub struct Sandbox {
    app_name: String,
    active: bool,
    /// The isolated scope. Empty at creation; only ever mutated through the
    /// intercepted write/delete paths.
    micro_global: HashMap<String, GlobalValue>,
    /// Keys written in the current active session, for exact rollback.
    injected_keys: HashSet<String>,
    /// Every global subscription routed through this sandbox and not yet
    /// explicitly unsubscribed.
    listeners: HashMap<String, HashSet<ListenerId>>,
    host: Arc<dyn HostGlobal>,
}

impl Sandbox {
    pub fn new(app_name: impl Into<String>, host: Arc<dyn HostGlobal>) -> Self {
        Self {
            app_name: app_name.into(),
            active: false,
            micro_global: HashMap::new(),
            injected_keys: HashSet::new(),
            listeners: HashMap::new(),
            host,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Starts interception. No-op if already active.
    pub fn start(&mut self) {
        if !self.active {
            debug!(app = %self.app_name, "Sandbox started");
            self.active = true;
        }
    }

    /// Stops interception and rolls back. No-op if already inactive.
    ///
    /// Every key injected during the session is deleted from the isolated
    /// scope, and every listener still recorded is forcibly unsubscribed
    /// from the host — no dangling subscription survives its own sandbox.
    pub fn stop(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;

        for key in self.injected_keys.drain() {
            self.micro_global.remove(&key);
        }

        let leaked: usize = self.listeners.values().map(HashSet::len).sum();
        if leaked > 0 {
            debug!(app = %self.app_name, leaked, "Releasing residual global listeners");
        }
        for (event, ids) in self.listeners.drain() {
            for id in ids {
                self.host.remove_listener(&event, id);
            }
        }
    }

    // ================================================================
    // Property interception
    // ================================================================

    /// Intercepted read: the isolated scope wins; otherwise the host value
    /// is returned, with plain host functions rebound to the host receiver
    /// (host built-ins misbehave under a foreign receiver). Constructors
    /// and classes come back unbound.
    pub fn get(&self, key: &str) -> Option<GlobalValue> {
        if let Some(value) = self.micro_global.get(key) {
            return Some(value.clone());
        }

        let raw = self.host.get(key)?;
        Some(match raw {
            GlobalValue::Function(f)
                if f.kind == FunctionKind::Plain && !starts_uppercase(&f.name) =>
            {
                GlobalValue::Function(f.bound_to_host())
            }
            other => other,
        })
    }

    /// Intercepted write: lands in the isolated scope only while active.
    /// While inactive the write is silently discarded — call sites do not
    /// have to check activation state.
    pub fn set(&mut self, key: &str, value: GlobalValue) {
        if !self.active {
            return;
        }
        if !self.micro_global.contains_key(key) {
            self.injected_keys.insert(key.to_string());
        }
        self.micro_global.insert(key.to_string(), value);
    }

    /// Intercepted delete: only keys present directly on the isolated scope
    /// are deletable; deleting a fallback value is a no-op.
    pub fn remove(&mut self, key: &str) {
        self.micro_global.remove(key);
    }

    /// Own keys of the isolated scope.
    pub fn own_keys(&self) -> Vec<String> {
        self.micro_global.keys().cloned().collect()
    }

    // ================================================================
    // Global listener interception
    // ================================================================

    /// Records the subscription and forwards it to the host mechanism.
    /// Recording happens whenever the sandbox exists, active or not.
    pub fn add_event_listener(&mut self, event: &str, listener: ListenerId) {
        self.listeners
            .entry(event.to_string())
            .or_default()
            .insert(listener);
        self.host.add_listener(event, listener);
    }

    /// Drops the recording, then forwards the unsubscribe unchanged.
    pub fn remove_event_listener(&mut self, event: &str, listener: ListenerId) {
        if let Some(ids) = self.listeners.get_mut(event) {
            ids.remove(&listener);
            if ids.is_empty() {
                self.listeners.remove(event);
            }
        }
        self.host.remove_listener(event, listener);
    }

    // ================================================================
    // Scope binding
    // ================================================================

    /// Wraps sub-application source so that, executed with the isolated
    /// scope supplied as both the receiver and the `self` binding,
    /// unqualified global references resolve through the interception
    /// rules. Pure string transform; safe for arbitrary statement lists.
    pub fn bind_scope(&self, code: &str) -> String {
        format!(
            ";(function(window, self){{with(window){{;\n{code}\n}}}}).call(window.__frescoScope, window.__frescoScope, window.__frescoScope);"
        )
    }
}

fn starts_uppercase(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_ascii_uppercase())
}

/// The scope a running script sees: every access routed through the
/// interception rules above.
impl GlobalScope for Sandbox {
    fn get(&self, key: &str) -> Option<GlobalValue> {
        Sandbox::get(self, key)
    }

    fn set(&mut self, key: &str, value: GlobalValue) {
        Sandbox::set(self, key, value);
    }

    fn remove(&mut self, key: &str) {
        Sandbox::remove(self, key);
    }

    fn add_listener(&mut self, event: &str, listener: ListenerId) {
        self.add_event_listener(event, listener);
    }

    fn remove_listener(&mut self, event: &str, listener: ListenerId) {
        self.remove_event_listener(event, listener);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fresco_platform::{FunctionValue, MemoryGlobal, Receiver};
    use serde_json::json;

    fn sandbox_with_host() -> (Sandbox, Arc<MemoryGlobal>) {
        let host = Arc::new(MemoryGlobal::new());
        let sandbox = Sandbox::new("test-app", host.clone() as Arc<dyn HostGlobal>);
        (sandbox, host)
    }

    // ================================================================
    // start / stop
    // ================================================================

    #[test]
    fn start_and_stop_are_idempotent() {
        let (mut sandbox, _host) = sandbox_with_host();
        assert!(!sandbox.is_active());

        sandbox.start();
        sandbox.start();
        assert!(sandbox.is_active());

        sandbox.stop();
        sandbox.stop();
        assert!(!sandbox.is_active());
    }

    #[test]
    fn stop_on_never_started_sandbox_is_noop() {
        let (mut sandbox, _host) = sandbox_with_host();
        sandbox.stop();
        assert!(!sandbox.is_active());
    }

    // ================================================================
    // Write interception and rollback
    // ================================================================

    #[test]
    fn writes_while_inactive_are_discarded() {
        let (mut sandbox, host) = sandbox_with_host();
        sandbox.set("x", GlobalValue::data(json!(1)));
        assert!(sandbox.get("x").is_none());
        assert!(host.get("x").is_none());
    }

    #[test]
    fn writes_while_active_stay_in_isolated_scope() {
        let (mut sandbox, host) = sandbox_with_host();
        sandbox.start();
        sandbox.set("x", GlobalValue::data(json!(1)));

        assert_eq!(sandbox.get("x"), Some(GlobalValue::Data(json!(1))));
        assert!(host.get("x").is_none());
    }

    #[test]
    fn stop_rolls_back_to_pre_session_key_set() {
        let (mut sandbox, _host) = sandbox_with_host();
        sandbox.start();
        sandbox.set("a", GlobalValue::data(json!(1)));
        sandbox.set("b", GlobalValue::data(json!(2)));
        sandbox.set("a", GlobalValue::data(json!(3))); // overwrite, same key
        assert_eq!(sandbox.own_keys().len(), 2);

        sandbox.stop();
        assert!(sandbox.own_keys().is_empty());
        assert!(sandbox.get("a").is_none());
    }

    #[test]
    fn scope_is_reusable_across_sessions() {
        let (mut sandbox, _host) = sandbox_with_host();
        sandbox.start();
        sandbox.set("x", GlobalValue::data(json!(1)));
        sandbox.stop();

        sandbox.start();
        assert!(sandbox.get("x").is_none());
        sandbox.set("y", GlobalValue::data(json!(2)));
        sandbox.stop();
        assert!(sandbox.own_keys().is_empty());
    }

    // ================================================================
    // Read interception
    // ================================================================

    #[test]
    fn isolated_scope_shadows_host() {
        let (mut sandbox, host) = sandbox_with_host();
        host.set("x", GlobalValue::data(json!("host")));
        sandbox.start();
        sandbox.set("x", GlobalValue::data(json!("micro")));

        assert_eq!(sandbox.get("x"), Some(GlobalValue::Data(json!("micro"))));
    }

    #[test]
    fn read_falls_back_to_host() {
        let (sandbox, host) = sandbox_with_host();
        host.set("version", GlobalValue::data(json!("1.0")));
        assert_eq!(
            sandbox.get("version"),
            Some(GlobalValue::Data(json!("1.0")))
        );
    }

    #[test]
    fn plain_host_functions_are_rebound() {
        let (sandbox, host) = sandbox_with_host();
        host.set(
            "alert",
            GlobalValue::Function(FunctionValue::plain("alert")),
        );

        match sandbox.get("alert") {
            Some(GlobalValue::Function(f)) => assert_eq!(f.receiver, Receiver::Host),
            other => panic!("expected function, got {other:?}"),
        }
    }

    #[test]
    fn constructors_and_classes_come_back_unbound() {
        let (sandbox, host) = sandbox_with_host();
        host.set(
            "Date",
            GlobalValue::Function(FunctionValue::plain("Date")),
        );
        host.set(
            "URLSearchParams",
            GlobalValue::Function(FunctionValue::class("URLSearchParams")),
        );

        for key in ["Date", "URLSearchParams"] {
            match sandbox.get(key) {
                Some(GlobalValue::Function(f)) => assert_eq!(f.receiver, Receiver::Unbound),
                other => panic!("expected function, got {other:?}"),
            }
        }
    }

    // ================================================================
    // Delete interception
    // ================================================================

    #[test]
    fn delete_only_touches_own_keys() {
        let (mut sandbox, host) = sandbox_with_host();
        host.set("shared", GlobalValue::data(json!(1)));
        sandbox.start();
        sandbox.set("mine", GlobalValue::data(json!(2)));

        sandbox.remove("mine");
        sandbox.remove("shared");

        assert!(sandbox.own_keys().is_empty());
        assert_eq!(host.get("shared"), Some(GlobalValue::Data(json!(1))));
    }

    // ================================================================
    // Listener interception
    // ================================================================

    #[test]
    fn listeners_are_forwarded_and_released_on_stop() {
        let (mut sandbox, host) = sandbox_with_host();
        let a = ListenerId::new();
        let b = ListenerId::new();

        sandbox.start();
        sandbox.add_event_listener("resize", a);
        sandbox.add_event_listener("scroll", b);
        assert_eq!(host.total_listeners(), 2);

        sandbox.stop();
        assert_eq!(host.total_listeners(), 0);
    }

    #[test]
    fn explicitly_removed_listeners_are_not_double_released() {
        let (mut sandbox, host) = sandbox_with_host();
        let a = ListenerId::new();
        let b = ListenerId::new();

        sandbox.start();
        sandbox.add_event_listener("resize", a);
        sandbox.add_event_listener("resize", b);
        sandbox.remove_event_listener("resize", a);
        assert_eq!(host.listener_count("resize"), 1);

        sandbox.stop();
        assert_eq!(host.listener_count("resize"), 0);
    }

    #[test]
    fn listeners_recorded_while_inactive_are_still_released() {
        let (mut sandbox, host) = sandbox_with_host();
        let a = ListenerId::new();
        sandbox.add_event_listener("message", a);
        assert_eq!(host.listener_count("message"), 1);

        sandbox.start();
        sandbox.stop();
        assert_eq!(host.listener_count("message"), 0);
    }

    // ================================================================
    // bind_scope
    // ================================================================

    #[test]
    fn bind_scope_wraps_arbitrary_statement_lists() {
        let (sandbox, _host) = sandbox_with_host();
        let wrapped = sandbox.bind_scope("const a = 1;\nwindow.x = a");

        assert!(wrapped.starts_with(";(function(window, self){with(window){;"));
        assert!(wrapped.contains("const a = 1;\nwindow.x = a"));
        assert!(wrapped.ends_with(
            "}}).call(window.__frescoScope, window.__frescoScope, window.__frescoScope);"
        ));
    }
}
