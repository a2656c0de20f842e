//! Deterministic scripted oracle for tests and replay.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{ClassificationOracle, OracleError, OracleRequest};

/// A deterministic oracle driven by a script of canned payloads.
///
/// Responses are keyed by target atom id (display form). Targets without
/// a script entry receive the default payload. Call counts are recorded
/// so tests can assert on retry behavior.
#[derive(Debug)]
pub struct ScriptedOracle {
    responses: HashMap<String, String>,
    default_response: String,
    calls: AtomicUsize,
}

impl ScriptedOracle {
    /// Create a scripted oracle whose default payload classifies every
    /// atom as `Claim` with no relationships.
    pub fn new() -> Self {
        Self::with_default(r#"{"classification":"Claim","justification":"","relationships":[]}"#)
    }

    /// Create a scripted oracle with a custom default payload.
    pub fn with_default(payload: &str) -> Self {
        Self {
            responses: HashMap::new(),
            default_response: payload.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Script the payload returned for one target atom id.
    pub fn script(mut self, target_id: &str, payload: &str) -> Self {
        self.responses.insert(target_id.to_string(), payload.to_string());
        self
    }

    /// Number of completed calls.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ClassificationOracle for ScriptedOracle {
    async fn complete(&self, request: &OracleRequest) -> Result<String, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .responses
            .get(&request.target.id)
            .unwrap_or(&self.default_response)
            .clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::OracleComponent;

    fn request(target_id: &str) -> OracleRequest {
        OracleRequest {
            context: vec![],
            target: OracleComponent {
                id: target_id.to_string(),
                text: "text".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_scripted_response_for_known_target() {
        let oracle = ScriptedOracle::new().script("ch0.p0.a1", r#"{"classification":"Thesis"}"#);
        let payload = oracle.complete(&request("ch0.p0.a1")).await.unwrap();
        assert!(payload.contains("Thesis"));
    }

    #[tokio::test]
    async fn test_default_response_for_unknown_target() {
        let oracle = ScriptedOracle::new();
        let payload = oracle.complete(&request("ch9.p9.a9")).await.unwrap();
        assert!(payload.contains("Claim"));
        assert_eq!(oracle.calls(), 1);
    }
}
