//! The context enrichment pipeline.
//!
//! Enrichers are pluggable transformations (network lookups, policy checks) applied to the
//! canonical context before evaluation. The pipeline is a sequential fold: each enricher receives
//! the output of the previous one, so later stages may depend on earlier derived fields. The
//! first failure aborts the whole chain.

use async_trait::async_trait;

use crate::{Context, Result};

/// A pluggable transformation adding or correcting context fields.
///
/// Enrichers run strictly in the order they were registered. The pipeline makes no assumption
/// about idempotence or purity; only sequencing is guaranteed.
#[async_trait]
pub trait ContextEnricher: Send + Sync {
    /// Produce an updated context from the given one.
    ///
    /// # Errors
    ///
    /// Returning an error aborts the pipeline; no subsequent enricher runs and the failure
    /// propagates to the caller as [`Error::Enrichment`](crate::Error::Enrichment).
    async fn enrich(&self, context: Context) -> Result<Context>;
}

/// Apply `enrichers` to `context`, strictly in list order.
pub async fn enrich_context(
    enrichers: &[Box<dyn ContextEnricher>],
    context: Context,
) -> Result<Context> {
    let mut context = context;
    for enricher in enrichers {
        context = enricher.enrich(context).await?;
    }
    Ok(context)
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use super::*;
    use crate::Error;

    /// Appends its tag to the `trail` property, recording the order it ran in.
    struct TagEnricher {
        tag: &'static str,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ContextEnricher for TagEnricher {
        async fn enrich(&self, mut context: Context) -> Result<Context> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let trail = context.properties.entry("trail".to_owned()).or_default();
            trail.push_str(self.tag);
            Ok(context)
        }
    }

    struct FailingEnricher;

    #[async_trait]
    impl ContextEnricher for FailingEnricher {
        async fn enrich(&self, _context: Context) -> Result<Context> {
            Err(Error::enrichment(std::io::Error::new(
                std::io::ErrorKind::Other,
                "lookup failed",
            )))
        }
    }

    #[tokio::test]
    async fn applies_enrichers_in_registration_order() {
        let calls = Arc::new(AtomicUsize::new(0));
        let enrichers: Vec<Box<dyn ContextEnricher>> = vec![
            Box::new(TagEnricher {
                tag: "a",
                calls: calls.clone(),
            }),
            Box::new(TagEnricher {
                tag: "b",
                calls: calls.clone(),
            }),
            Box::new(TagEnricher {
                tag: "c",
                calls: calls.clone(),
            }),
        ];

        let context = enrich_context(&enrichers, Context::default())
            .await
            .unwrap();

        assert_eq!(
            context.properties.get("trail").map(String::as_str),
            Some("abc")
        );
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn first_failure_short_circuits_the_pipeline() {
        let calls = Arc::new(AtomicUsize::new(0));
        let enrichers: Vec<Box<dyn ContextEnricher>> = vec![
            Box::new(TagEnricher {
                tag: "a",
                calls: calls.clone(),
            }),
            Box::new(FailingEnricher),
            Box::new(TagEnricher {
                tag: "c",
                calls: calls.clone(),
            }),
        ];

        let result = enrich_context(&enrichers, Context::default()).await;

        assert!(matches!(result, Err(Error::Enrichment(_))));
        // Only the enricher ahead of the failure ran.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_pipeline_returns_the_context_unchanged() {
        let context = Context {
            user_id: Some("user-1".to_owned()),
            ..Context::default()
        };

        let enriched = enrich_context(&[], context.clone()).await.unwrap();

        assert_eq!(enriched, context);
    }
}
