//! Oracle adapter: retry, backoff, admission control, and response
//! validation.
//!
//! The adapter is the only component that suspends on I/O. It owns the
//! failure policy: transport failures and malformed payloads are retried
//! with exponential backoff; exhausted retries and taxonomy violations
//! degrade the single atom to `Error` and never fail the chapter.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::config::PipelineConfig;
use crate::context::ContextWindow;
use crate::types::{AtomId, Classification};
use crate::validator::{RejectReason, RejectedRelationship};

use super::{
    ClassificationOracle, OracleComponent, OracleError, OracleRequest, OracleResponse,
};

/// A relationship proposal with its target resolved to a context atom.
/// Type and direction stay raw until ontology validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    /// The resolved context atom the edge points at.
    pub target: AtomId,
    /// Raw relationship type label.
    pub rel_type: String,
    /// Raw direction label.
    pub direction: String,
    /// Oracle rationale for the edge.
    pub justification: String,
}

/// Terminal failure of one classification call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OracleFailure {
    /// The oracle returned a label outside the taxonomy. Not retried:
    /// the payload was well-formed, the oracle simply disagreed with the
    /// taxonomy, and asking again will not change that.
    #[error("taxonomy violation: unrecognized label `{label}`")]
    TaxonomyViolation {
        /// The unrecognized label.
        label: String,
    },
    /// Transport or format failure after exhausting retries.
    #[error("oracle transport failure after {attempts} attempts: {last}")]
    Transport {
        /// Attempts made.
        attempts: u32,
        /// Last error observed.
        last: String,
    },
}

/// Result of adapting one oracle call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifyOutcome {
    /// Well-formed response with a recognized label.
    Classified {
        /// The taxonomy label.
        classification: Classification,
        /// Oracle rationale for the classification.
        justification: String,
        /// Proposals whose targets resolved to context atoms.
        proposals: Vec<Proposal>,
        /// Proposals rejected for referencing atoms outside the context.
        rejected: Vec<RejectedRelationship>,
    },
    /// The atom must be committed as `Error` with zero relationships.
    Failed(OracleFailure),
}

/// Wraps the external classification capability with the kernel's
/// failure policy and the shared admission gate.
pub struct OracleAdapter<O> {
    oracle: Arc<O>,
    gate: Arc<Semaphore>,
    max_attempts: u32,
    backoff_base: Duration,
    request_timeout: Duration,
}

impl<O: ClassificationOracle> OracleAdapter<O> {
    /// Create an adapter over an oracle, sized from the config.
    pub fn new(oracle: O, config: &PipelineConfig) -> Self {
        Self {
            oracle: Arc::new(oracle),
            gate: Arc::new(Semaphore::new(config.max_concurrent_requests.max(1))),
            max_attempts: config.max_attempts.max(1),
            backoff_base: config.backoff_base(),
            request_timeout: config.request_timeout(),
        }
    }

    /// The underlying oracle.
    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Classify one atom against its context window.
    ///
    /// Never returns an error to the caller: every failure mode collapses
    /// into [`ClassifyOutcome::Failed`] so the chapter pipeline can commit
    /// the atom as `Error` and continue.
    pub async fn classify(
        &self,
        window: &ContextWindow,
        target_id: AtomId,
        target_text: &str,
    ) -> ClassifyOutcome {
        let request = OracleRequest {
            context: window
                .entries()
                .map(|e| OracleComponent {
                    id: e.id.to_string(),
                    text: e.text.clone(),
                })
                .collect(),
            target: OracleComponent {
                id: target_id.to_string(),
                text: target_text.to_string(),
            },
        };

        let mut last_error = String::new();
        for attempt in 1..=self.max_attempts {
            if attempt > 1 {
                let backoff = self.backoff_base * 2u32.pow(attempt - 2);
                tokio::time::sleep(backoff).await;
            }

            let payload = {
                let _permit = match self.gate.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return ClassifyOutcome::Failed(OracleFailure::Transport {
                            attempts: attempt,
                            last: "admission gate closed".to_string(),
                        });
                    }
                };
                match tokio::time::timeout(self.request_timeout, self.oracle.complete(&request))
                    .await
                {
                    Err(_) => {
                        last_error = format!("timed out after {:?}", self.request_timeout);
                        tracing::warn!(atom = %target_id, attempt, "Oracle call timed out");
                        continue;
                    }
                    Ok(Err(OracleError::Transport(msg))) => {
                        last_error = msg;
                        tracing::warn!(
                            atom = %target_id,
                            attempt,
                            error = %last_error,
                            "Oracle transport failure"
                        );
                        continue;
                    }
                    Ok(Ok(payload)) => payload,
                }
            };

            match serde_json::from_str::<OracleResponse>(&payload) {
                Err(e) => {
                    last_error = format!("malformed response: {e}");
                    tracing::warn!(atom = %target_id, attempt, error = %e, "Malformed oracle response");
                    continue;
                }
                Ok(response) => return self.accept(window, target_id, response),
            }
        }

        ClassifyOutcome::Failed(OracleFailure::Transport {
            attempts: self.max_attempts,
            last: last_error,
        })
    }

    /// Validate a parsed response: taxonomy membership and context
    /// membership of every proposed target.
    fn accept(
        &self,
        window: &ContextWindow,
        target_id: AtomId,
        response: OracleResponse,
    ) -> ClassifyOutcome {
        let Some(classification) = Classification::from_label(&response.classification) else {
            tracing::warn!(
                atom = %target_id,
                label = %response.classification,
                "Unrecognized classification label"
            );
            return ClassifyOutcome::Failed(OracleFailure::TaxonomyViolation {
                label: response.classification,
            });
        };

        // An oracle-asserted Error is terminal: edges from this call are
        // discarded along with it.
        if classification.is_error() {
            return ClassifyOutcome::Classified {
                classification,
                justification: response.justification,
                proposals: Vec::new(),
                rejected: Vec::new(),
            };
        }

        let by_id: HashMap<String, AtomId> = window
            .entries()
            .map(|e| (e.id.to_string(), e.id))
            .collect();

        let mut proposals = Vec::new();
        let mut rejected = Vec::new();
        for rel in response.relationships {
            match by_id.get(&rel.target_id) {
                Some(&target) => proposals.push(Proposal {
                    target,
                    rel_type: rel.rel_type,
                    direction: rel.direction,
                    justification: rel.justification,
                }),
                None => rejected.push(RejectedRelationship {
                    origin: target_id,
                    target_id: rel.target_id.clone(),
                    rel_type: rel.rel_type,
                    direction: rel.direction,
                    reason: RejectReason::TargetNotInContext {
                        target_id: rel.target_id,
                    },
                }),
            }
        }

        ClassifyOutcome::Classified {
            classification,
            justification: response.justification,
            proposals,
            rejected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextBound;
    use crate::oracle::ScriptedOracle;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails with a transport error until `failures` calls have been
    /// made, then returns `payload`.
    struct FlakyOracle {
        failures: usize,
        payload: String,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ClassificationOracle for FlakyOracle {
        async fn complete(&self, _request: &OracleRequest) -> Result<String, OracleError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(OracleError::Transport("connection reset".to_string()))
            } else {
                Ok(self.payload.clone())
            }
        }
    }

    fn window_with(ids: &[AtomId]) -> ContextWindow {
        let mut window = ContextWindow::new(ContextBound::Unbounded);
        for id in ids {
            window.push(*id, "context text");
        }
        window
    }

    fn target() -> AtomId {
        AtomId::new(0, 0, 3)
    }

    #[tokio::test]
    async fn test_classifies_well_formed_response() {
        let ctx = AtomId::new(0, 0, 1);
        let payload = format!(
            r#"{{"classification":"Premise","justification":"jr","relationships":[
                {{"target_id":"{ctx}","type":"Supports","direction":"outgoing","justification":"je"}}
            ]}}"#
        );
        let oracle = ScriptedOracle::with_default(&payload);
        let adapter = OracleAdapter::new(oracle, &PipelineConfig::fast());

        let outcome = adapter.classify(&window_with(&[ctx]), target(), "text").await;
        match outcome {
            ClassifyOutcome::Classified {
                classification,
                proposals,
                rejected,
                ..
            } => {
                assert_eq!(classification, Classification::Premise);
                assert_eq!(proposals.len(), 1);
                assert_eq!(proposals[0].target, ctx);
                assert!(rejected.is_empty());
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_retries_transport_failures_then_succeeds() {
        let oracle = FlakyOracle {
            failures: 2,
            payload: r#"{"classification":"Claim","relationships":[]}"#.to_string(),
            calls: AtomicUsize::new(0),
        };
        let adapter = OracleAdapter::new(oracle, &PipelineConfig::fast());

        let outcome = adapter
            .classify(&window_with(&[]), target(), "text")
            .await;
        assert!(matches!(outcome, ClassifyOutcome::Classified { .. }));
        assert_eq!(adapter.oracle().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausted_retries_fail_with_transport() {
        let oracle = FlakyOracle {
            failures: usize::MAX,
            payload: String::new(),
            calls: AtomicUsize::new(0),
        };
        let config = PipelineConfig::fast();
        let adapter = OracleAdapter::new(oracle, &config);

        let outcome = adapter.classify(&window_with(&[]), target(), "text").await;
        match outcome {
            ClassifyOutcome::Failed(OracleFailure::Transport { attempts, .. }) => {
                assert_eq!(attempts, config.max_attempts);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    /// Never responds within any reasonable deadline.
    struct StalledOracle;

    #[async_trait]
    impl ClassificationOracle for StalledOracle {
        async fn complete(&self, _request: &OracleRequest) -> Result<String, OracleError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(String::new())
        }
    }

    #[tokio::test]
    async fn test_request_timeout_counts_as_transport_failure() {
        let config = PipelineConfig {
            request_timeout_ms: 10,
            backoff_base_ms: 1,
            ..PipelineConfig::default()
        };
        let adapter = OracleAdapter::new(StalledOracle, &config);

        let outcome = adapter.classify(&window_with(&[]), target(), "text").await;
        match outcome {
            ClassifyOutcome::Failed(OracleFailure::Transport { attempts, last }) => {
                assert_eq!(attempts, config.max_attempts);
                assert!(last.contains("timed out"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_payload_is_retried() {
        let oracle = ScriptedOracle::with_default("this is not json");
        let adapter = OracleAdapter::new(oracle, &PipelineConfig::fast());

        let outcome = adapter.classify(&window_with(&[]), target(), "text").await;
        assert!(matches!(
            outcome,
            ClassifyOutcome::Failed(OracleFailure::Transport { .. })
        ));
        assert_eq!(adapter.oracle().calls(), 3);
    }

    #[tokio::test]
    async fn test_taxonomy_violation_is_not_retried() {
        let oracle =
            ScriptedOracle::with_default(r#"{"classification":"FooBar","relationships":[]}"#);
        let adapter = OracleAdapter::new(oracle, &PipelineConfig::fast());

        let outcome = adapter.classify(&window_with(&[]), target(), "text").await;
        assert_eq!(
            outcome,
            ClassifyOutcome::Failed(OracleFailure::TaxonomyViolation {
                label: "FooBar".to_string()
            })
        );
        assert_eq!(adapter.oracle().calls(), 1);
    }

    #[tokio::test]
    async fn test_unknown_target_rejected_before_validation() {
        let ctx = AtomId::new(0, 0, 1);
        let payload = r#"{"classification":"Premise","relationships":[
            {"target_id":"ch9.p9.a9","type":"Supports","direction":"outgoing","justification":""}
        ]}"#;
        let oracle = ScriptedOracle::with_default(payload);
        let adapter = OracleAdapter::new(oracle, &PipelineConfig::fast());

        let outcome = adapter.classify(&window_with(&[ctx]), target(), "text").await;
        match outcome {
            ClassifyOutcome::Classified {
                proposals, rejected, ..
            } => {
                assert!(proposals.is_empty());
                assert_eq!(rejected.len(), 1);
                assert!(matches!(
                    rejected[0].reason,
                    RejectReason::TargetNotInContext { .. }
                ));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_oracle_asserted_error_discards_proposals() {
        let ctx = AtomId::new(0, 0, 1);
        let payload = format!(
            r#"{{"classification":"Error","relationships":[
                {{"target_id":"{ctx}","type":"Continues","direction":"outgoing","justification":""}}
            ]}}"#
        );
        let oracle = ScriptedOracle::with_default(&payload);
        let adapter = OracleAdapter::new(oracle, &PipelineConfig::fast());

        let outcome = adapter.classify(&window_with(&[ctx]), target(), "text").await;
        match outcome {
            ClassifyOutcome::Classified {
                classification,
                proposals,
                ..
            } => {
                assert!(classification.is_error());
                assert!(proposals.is_empty());
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
