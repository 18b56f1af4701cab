//! The toggle-evaluation client.
//!
//! [`Client`] is the proxy's view of the evaluation engine: it resolves the final environment for
//! each request, asks the engine for toggle state and variant assignment, and feeds impression
//! counts into the metrics sink. It never fetches definitions itself; the engine's transport
//! forwards its lifecycle events to [`Client::handle_engine_event`].

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, RwLock,
};

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    engine::{EngineEvent, EvaluationEngine, ToggleDefinition, Variant},
    metrics::{ClientMetrics, MetricsRegistry, MetricsSink},
    Context, ProxyConfig,
};

/// The evaluation result for a single toggle, serialized directly into the response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureToggleStatus {
    pub name: String,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<Variant>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impression_data: Option<bool>,
}

/// A client orchestrating toggle evaluation against an [`EvaluationEngine`].
///
/// The client is `Sync` when its engine and sink are; evaluation itself is synchronous and
/// non-suspending. Construct one per process and share it across requests.
pub struct Client<E, M> {
    engine: E,
    metrics: M,
    registry: Arc<MetricsRegistry>,
    environment: Option<String>,
    instance_id: String,
    api_token: RwLock<String>,
    ready: AtomicBool,
}

impl<E, M> Client<E, M>
where
    E: EvaluationEngine,
    M: MetricsSink,
{
    /// Create a new `Client` around the given engine and metrics sink.
    pub fn new(
        config: ProxyConfig,
        engine: E,
        metrics: M,
        registry: Arc<MetricsRegistry>,
    ) -> Client<E, M> {
        Client {
            engine,
            metrics,
            registry,
            environment: config.environment,
            instance_id: config.instance_id,
            api_token: RwLock::new(config.api_token),
            ready: AtomicBool::new(false),
        }
    }

    /// Apply the environment precedence: a non-empty context environment always wins; only a
    /// context without one falls back to the proxy-wide default. When neither is present the
    /// environment stays unset.
    fn fix_context(&self, mut context: Context) -> Context {
        let has_environment = context
            .environment
            .as_deref()
            .is_some_and(|e| !e.is_empty());
        if !has_environment {
            context.environment = self.environment.clone();
        }
        context
    }

    /// Evaluate every known toggle for the given context, enabled or not.
    ///
    /// Returns one status per known definition, in the engine's definition order. Disabled
    /// toggles carry the canonical disabled variant.
    pub fn get_all_toggles(&self, context: Context) -> Vec<FeatureToggleStatus> {
        log::debug!(target: "togglet", "get all feature toggles for provided context: {context:?}");

        let context = ensure_session_id(self.fix_context(context));
        self.engine
            .get_toggle_definitions()
            .into_iter()
            .map(|definition| {
                let enabled = self.engine.is_enabled(&definition.name, &context);
                let variant = if enabled {
                    self.engine.get_variant(&definition.name, &context)
                } else {
                    Variant::disabled()
                };
                FeatureToggleStatus {
                    name: definition.name,
                    enabled,
                    variant: Some(variant),
                    impression_data: Some(definition.impression_data),
                }
            })
            .collect()
    }

    /// Evaluate every known toggle and return only those that evaluate enabled, each with its
    /// resolved variant.
    pub fn get_enabled_toggles(&self, context: Context) -> Vec<FeatureToggleStatus> {
        log::debug!(target: "togglet", "get enabled feature toggles for provided context: {context:?}");

        let context = ensure_session_id(self.fix_context(context));
        self.engine
            .get_toggle_definitions()
            .into_iter()
            .filter(|definition| self.engine.is_enabled(&definition.name, &context))
            .map(|definition| FeatureToggleStatus {
                enabled: true,
                variant: Some(self.engine.get_variant(&definition.name, &context)),
                impression_data: Some(definition.impression_data),
                name: definition.name,
            })
            .collect()
    }

    /// Evaluate exactly the named toggles, whether or not they exist.
    ///
    /// Named-toggle queries represent direct client-side impressions, so each evaluation also
    /// records one count into the metrics sink. An unknown name is not an error: it evaluates
    /// disabled with `impressionData: false`.
    pub fn get_defined_toggles(
        &self,
        toggle_names: &[String],
        context: Context,
    ) -> Vec<FeatureToggleStatus> {
        let context = self.fix_context(context);
        toggle_names
            .iter()
            .map(|name| {
                let definition = self.engine.get_toggle_definition(name);
                let enabled = self.engine.is_enabled(name, &context);
                self.metrics.count(name, enabled);
                FeatureToggleStatus {
                    name: name.clone(),
                    enabled,
                    variant: Some(self.engine.get_variant(name, &context)),
                    impression_data: Some(
                        definition.map(|d| d.impression_data).unwrap_or(false),
                    ),
                }
            })
            .collect()
    }

    /// Unfiltered passthrough to the engine's known definitions.
    pub fn get_toggle_definitions(&self) -> Vec<ToggleDefinition> {
        self.engine.get_toggle_definitions()
    }

    /// Replay a received usage bucket into discrete count events against the metrics sink.
    ///
    /// A very simplistic expansion which supports counts only. In the future we must consider
    /// looking at the bucket's start/stop times and adjust counting thereafter.
    pub fn register_metrics(&self, metrics: ClientMetrics) {
        for (toggle_name, counts) in &metrics.bucket.toggles {
            for _ in 0..counts.yes {
                self.metrics.count(toggle_name, true);
            }
            for _ in 0..counts.no {
                self.metrics.count(toggle_name, false);
            }
            for (variant_name, variant_count) in &counts.variants {
                for _ in 0..*variant_count {
                    self.metrics.count_variant(toggle_name, variant_name);
                }
            }
        }
    }

    /// React to an engine lifecycle event forwarded by the transport wiring.
    pub fn handle_engine_event(&self, event: EngineEvent) {
        match event {
            EngineEvent::Ready => {
                if !self.ready.swap(true, Ordering::SeqCst) {
                    self.metrics.start();
                }
            }
            EngineEvent::Unchanged => {
                self.registry.last_metrics_fetch.set(Utc::now().timestamp_millis());
            }
            EngineEvent::Changed => {
                // Changed implies fetched, so both gauges move to the same instant.
                let updated_at = Utc::now().timestamp_millis();
                self.registry.last_metrics_fetch.set(updated_at);
                self.registry.last_metrics_update.set(updated_at);
            }
            EngineEvent::Error(message) => {
                log::error!(target: "togglet", "{message}");
            }
        }
    }

    /// Log a metrics-sink error. Non-fatal; counting continues.
    pub fn handle_metrics_error(&self, message: &str) {
        log::error!(target: "togglet", "metrics: {message}");
    }

    /// Whether the engine has fetched its first definition set. False until the engine's ready
    /// event, true forever after.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Replace the stored upstream API token. In-flight evaluations are unaffected.
    pub fn set_api_token(&self, api_token: impl Into<String>) {
        let mut token = self
            .api_token
            .write()
            .expect("thread holding api token lock should not panic");
        *token = api_token.into();
    }

    /// The instance identifier the transport wiring reports to the upstream server.
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// The current upstream API token.
    pub fn api_token(&self) -> String {
        self.api_token
            .read()
            .expect("thread holding api token lock should not panic")
            .clone()
    }

    /// Release the underlying engine's resources. Consumes the client, so a second destroy
    /// cannot be expressed.
    pub fn destroy(self) {
        self.engine.destroy();
    }
}

/// The engine requires a non-empty session id for sticky variant assignment; generate a random
/// fallback when the caller supplied none.
fn ensure_session_id(mut context: Context) -> Context {
    let missing = context.session_id.as_deref().map_or(true, str::is_empty);
    if missing {
        context.session_id = Some(rand::thread_rng().gen::<u64>().to_string());
    }
    context
}
