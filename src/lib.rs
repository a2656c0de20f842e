//! # atom-graph-kernel
//!
//! Concurrent construction of atomic proposition graphs from
//! hierarchically structured documents.
//!
//! The kernel answers one question:
//!
//! > Given a document tree of chapters and paragraphs, which atomic
//! > propositions does it contain and how do they **argue with each
//! > other**?
//!
//! ## Core Contract
//!
//! 1. Split each paragraph into ordered, offset-preserving atoms
//! 2. Classify each atom against the fixed taxonomy, feeding the oracle
//!    the chapter's accumulated context
//! 3. Validate every proposed relationship against the static ontology
//! 4. Merge per-chapter subgraphs into one deterministic document graph
//!
//! ## Architecture
//!
//! ```text
//! Paragraph → Segmenter → ContextWindow → OracleAdapter → OntologyValidator
//!                                                              ↓
//!                         DocumentGraph ← merge ← ChapterAssembler
//! ```
//!
//! Chapters run as independent tasks; atoms within a chapter are strictly
//! sequential. A shared admission gate caps concurrent oracle calls.
//!
//! ## Determinism Guarantees
//!
//! - Same document + same oracle responses → byte-identical atom and
//!   relationship sets, with a stable graph fingerprint
//! - Merge order is chapter index, never task completion order
//! - Atom ordering is canonical (by AtomId); edge ordering is canonical
//!   (source, target, type)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod assembler;
pub mod canonical;
pub mod config;
pub mod context;
pub mod ontology;
pub mod oracle;
pub mod pipeline;
pub mod segmenter;
pub mod types;
pub mod validator;

// Re-exports
pub use types::{Atom, AtomId, Classification};
pub use types::{ChapterNode, DocumentTree, ParagraphNode, SectionNode};
pub use types::{AbortReason, ChapterReport, ChapterStatus, ChapterSubgraph, DocumentGraph};
pub use types::{Direction, RelationType, Relationship};

pub use assembler::ChapterAssembler;
pub use canonical::{canonical_hash, canonical_hash_hex, to_canonical_bytes};
pub use config::PipelineConfig;
pub use context::{ContextBound, ContextEntry, ContextWindow};
pub use ontology::{Ontology, OntologyError, OntologyRule, ONTOLOGY_VERSION};
pub use oracle::{
    ClassificationOracle, ClassifyOutcome, OracleAdapter, OracleComponent, OracleError,
    OracleFailure, OracleRelationship, OracleRequest, OracleResponse, Proposal, ScriptedOracle,
};
pub use pipeline::{
    CancellationFlag, GraphBuilder, PipelineProgress, PipelineStatus, ProgressSnapshot,
};
pub use segmenter::{segment, AtomSpan};
pub use validator::{OntologyValidator, RejectReason, RejectedRelationship};

/// Schema version for all graph kernel types.
/// Increment on breaking changes to any schema type.
pub const GRAPH_KERNEL_SCHEMA_VERSION: &str = "1.0.0";
