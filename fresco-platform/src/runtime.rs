//! The executed-script boundary.
//!
//! Sub-application code is a boundary artifact: the host hands a wrapped
//! source string and a scope to the embedding runtime and never parses the
//! code itself. The mock runtime below understands just enough assignment
//! syntax to drive the lifecycle tests.

use crate::global::GlobalScope;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("script evaluation failed: {0}")]
    Evaluation(String),
}

/// Evaluates a wrapped script against a global scope. Implementations own
/// the actual language runtime; the host only guarantees that unqualified
/// global access inside `code` is routed through `scope`.
pub trait ScriptRuntime: Send + Sync {
    fn evaluate(&self, code: &str, scope: &mut dyn GlobalScope) -> Result<(), RuntimeError>;
}

/// A mock runtime for testing.
pub mod mock {
    use super::*;
    use crate::global::GlobalValue;
    use serde_json::Value;

    /// Interprets statements of the form `window.<key> = <json>;`, writing
    /// each through the scope. Every other line is ignored, and a line of
    /// the form `window.__fail__` makes evaluation error, for exercising
    /// contained script failures.
    #[derive(Default)]
    pub struct AssignmentRuntime;

    impl AssignmentRuntime {
        pub fn new() -> Self {
            Self
        }
    }

    impl ScriptRuntime for AssignmentRuntime {
        fn evaluate(&self, code: &str, scope: &mut dyn GlobalScope) -> Result<(), RuntimeError> {
            for line in code.lines() {
                let line = line.trim().trim_start_matches(';').trim();
                let Some(assignment) = line.strip_prefix("window.") else {
                    continue;
                };
                if assignment.starts_with("__fail__") {
                    return Err(RuntimeError::Evaluation("window.__fail__".to_string()));
                }
                let Some((key, value)) = assignment.split_once('=') else {
                    continue;
                };
                let key = key.trim();
                let value = value.trim().trim_end_matches(';').trim();
                let parsed = serde_json::from_str::<Value>(value)
                    .unwrap_or_else(|_| Value::String(value.to_string()));
                scope.set(key, GlobalValue::Data(parsed));
            }
            Ok(())
        }
    }
}
