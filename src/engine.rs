//! The evaluation-engine capability interface.
//!
//! The proxy core does not fetch flag definitions or compute rollout math itself; it calls into
//! an [`EvaluationEngine`] that owns the definition cache and the strategy evaluation. The
//! production implementation wraps the upstream SDK; tests substitute a fake satisfying the same
//! contract.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A named payload/treatment selected when a toggle is enabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub name: String,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<VariantPayload>,
}

/// The payload attached to a variant definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantPayload {
    #[serde(rename = "type")]
    pub payload_type: String,
    pub value: String,
}

impl Variant {
    /// The canonical variant reported for a disabled toggle: `{name: "disabled", enabled: false}`
    /// with no payload.
    pub fn disabled() -> Variant {
        Variant {
            name: "disabled".to_owned(),
            enabled: false,
            payload: None,
        }
    }
}

/// A rollout strategy attached to a toggle definition. Opaque to the proxy core; strategy math is
/// the engine's business.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Strategy {
    pub name: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub parameters: HashMap<String, String>,
}

/// A toggle definition as served by the evaluation engine. Owned and supplied entirely by the
/// engine; read-only to the proxy core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleDefinition {
    pub name: String,
    pub enabled: bool,
    pub stale: bool,
    pub impression_data: bool,
    pub project: String,
    #[serde(rename = "type")]
    pub toggle_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub strategies: Vec<Strategy>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<Variant>,
}

/// Lifecycle events emitted by the evaluation engine's definition transport.
///
/// The transport wiring forwards these to
/// [`Client::handle_engine_event`](crate::Client::handle_engine_event).
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// The engine has fetched its first definition set and can evaluate.
    Ready,
    /// A poll found updated definitions.
    Changed,
    /// A poll completed without changes.
    Unchanged,
    /// A non-fatal transport or engine fault. The engine may keep serving stale definitions.
    Error(String),
}

/// The flag-evaluation capability consumed by the proxy core.
///
/// Evaluation is synchronous and non-suspending: the engine answers from its in-memory definition
/// cache. Definition fetching happens on the engine's own transport, outside these calls.
pub trait EvaluationEngine {
    /// Whether the named toggle evaluates enabled for the given context.
    ///
    /// Unknown toggle names evaluate disabled; they are not an error.
    fn is_enabled(&self, name: &str, context: &crate::Context) -> bool;

    /// Resolve the variant assigned to the given context for the named toggle.
    fn get_variant(&self, name: &str, context: &crate::Context) -> Variant;

    /// All currently known toggle definitions, in the engine's definition order.
    fn get_toggle_definitions(&self) -> Vec<ToggleDefinition>;

    /// Look up a single definition by name.
    fn get_toggle_definition(&self, name: &str) -> Option<ToggleDefinition>;

    /// Release the engine's resources (stops its definition transport). At most once.
    fn destroy(&self);
}

impl<T: EvaluationEngine + ?Sized> EvaluationEngine for std::sync::Arc<T> {
    fn is_enabled(&self, name: &str, context: &crate::Context) -> bool {
        (**self).is_enabled(name, context)
    }

    fn get_variant(&self, name: &str, context: &crate::Context) -> Variant {
        (**self).get_variant(name, context)
    }

    fn get_toggle_definitions(&self) -> Vec<ToggleDefinition> {
        (**self).get_toggle_definitions()
    }

    fn get_toggle_definition(&self, name: &str) -> Option<ToggleDefinition> {
        (**self).get_toggle_definition(name)
    }

    fn destroy(&self) {
        (**self).destroy()
    }
}
