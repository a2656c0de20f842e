//! Classification oracle capability interface and wire types.
//!
//! The external classification capability is modeled as a single-method
//! trait rather than a concrete client, so the network-backed
//! implementation can be swapped for a deterministic [`ScriptedOracle`]
//! in tests. The kernel knows nothing about the oracle beyond the
//! request/response contract below.

pub mod adapter;
pub mod scripted;

pub use adapter::{ClassifyOutcome, OracleAdapter, OracleFailure, Proposal};
pub use scripted::ScriptedOracle;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One atom on the wire: id rendered as a string plus its text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleComponent {
    /// Atom id in display form.
    pub id: String,
    /// Atom text.
    pub text: String,
}

/// Request payload: the ordered context plus the target atom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleRequest {
    /// Already-committed atoms visible as context, oldest first.
    pub context: Vec<OracleComponent>,
    /// The atom to classify.
    pub target: OracleComponent,
}

/// One relationship proposal in an oracle response.
///
/// `rel_type` and `direction` stay open-world strings here; the validator
/// maps them into the closed enums and rejects anything it cannot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleRelationship {
    /// Id of the context atom the edge points at.
    pub target_id: String,
    /// Relationship type label.
    #[serde(rename = "type")]
    pub rel_type: String,
    /// `outgoing` or `incoming` from the target atom's point of view.
    pub direction: String,
    /// Oracle rationale for the edge.
    #[serde(default)]
    pub justification: String,
}

/// Response payload.
///
/// `classification` is open-world; the adapter maps it into the taxonomy
/// and forces `Error` when it cannot. A payload that fails to parse into
/// this shape at all is a format failure and is retried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleResponse {
    /// Proposed classification label.
    pub classification: String,
    /// Rationale for the classification.
    #[serde(default)]
    pub justification: String,
    /// Proposed relationships to context atoms.
    #[serde(default)]
    pub relationships: Vec<OracleRelationship>,
}

/// Transport-level failure reported by an oracle implementation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OracleError {
    /// Network or service failure; retryable.
    #[error("oracle transport failure: {0}")]
    Transport(String),
}

/// The external classification capability.
///
/// Implementations submit one request and return the raw response
/// payload. They should not retry, parse, or validate; the
/// [`OracleAdapter`] owns all of that.
#[async_trait]
pub trait ClassificationOracle: Send + Sync {
    /// Submit one classification request; returns the raw payload.
    async fn complete(&self, request: &OracleRequest) -> Result<String, OracleError>;
}
