//! The context-enrichment and toggle-evaluation core of the Togglet proxy.
//!
//! # Overview
//!
//! The proxy sits in front of a flag-evaluation engine and answers toggle queries on behalf of
//! frontend clients. This crate implements the core of that proxy, organized as a set of building
//! blocks the HTTP layer composes:
//!
//! [`Context`] is the canonical evaluation context. It is built once per request with
//! [`Context::from_request`], which derives `remoteAddress` and `currentTime` from the request
//! itself (caller-supplied values for those fields cannot be trusted and are ignored).
//!
//! [`enrich_context`] applies an ordered list of [`ContextEnricher`] plugins to the context as a
//! sequential asynchronous fold. Later enrichers may depend on fields derived by earlier ones, so
//! ordering is a correctness requirement; the first failure aborts the whole pipeline.
//!
//! [`Client`] orchestrates evaluation: it resolves the final `environment` (a non-empty context
//! environment always wins over the proxy-wide default), asks the [`EvaluationEngine`] for toggle
//! state and variant assignment, and reports impression counts to the [`MetricsSink`]. Engine
//! lifecycle events are forwarded to [`Client::handle_engine_event`], which drives the readiness
//! flag and the last-fetch/last-update gauges in [`MetricsRegistry`].
//!
//! The evaluation engine and the metrics sink are capability traits: the production
//! implementations wrap the upstream SDK's definition cache and metrics reporter, and tests
//! substitute deterministic doubles satisfying the same contracts.
//!
//! # Error Handling
//!
//! Errors are represented by the [`Error`] enum. The only failure the core propagates is an
//! enrichment failure; unknown toggle names evaluate disabled and engine lifecycle errors are
//! logged and non-fatal.
//!
//! # Logging
//!
//! The crate uses the [`log`](https://docs.rs/log/latest/log/) crate for logging messages.
//! Consider integrating a `log`-compatible logger implementation for better visibility into proxy
//! operations.

#![warn(rustdoc::missing_crate_level_docs)]

mod client;
mod config;
mod context;
mod engine;
mod enrich;
mod error;
mod metrics;

pub use client::{Client, FeatureToggleStatus};
pub use config::ProxyConfig;
pub use context::{Context, RequestInfo};
pub use engine::{EngineEvent, EvaluationEngine, Strategy, ToggleDefinition, Variant, VariantPayload};
pub use enrich::{enrich_context, ContextEnricher};
pub use error::{Error, Result};
pub use metrics::{Bucket, ClientMetrics, Counter, Gauge, MetricsRegistry, MetricsSink, ToggleCounts};
