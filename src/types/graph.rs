//! Chapter subgraph and document graph output types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::canonical::canonical_hash_hex;
use crate::validator::RejectedRelationship;

use super::atom::Atom;
use super::relationship::Relationship;

/// Why a chapter pipeline stopped before exhausting its atom sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortReason {
    /// Document-level cancellation was requested.
    Cancelled,
    /// The chapter exceeded its configured deadline.
    DeadlineExceeded,
    /// The chapter task failed (panicked) and produced no subgraph.
    TaskFailed,
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cancelled => write!(f, "cancelled"),
            Self::DeadlineExceeded => write!(f, "deadline exceeded"),
            Self::TaskFailed => write!(f, "task failed"),
        }
    }
}

/// Completion state of a chapter subgraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChapterStatus {
    /// Every atom in the chapter was processed.
    Complete,
    /// The pipeline stopped early; committed atoms remain valid.
    Partial {
        /// Why processing stopped.
        reason: AbortReason,
    },
}

impl ChapterStatus {
    /// Whether the chapter processed its full atom sequence.
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

/// The frozen output of one chapter pipeline.
///
/// A subgraph is self-contained: every relationship endpoint is an atom of
/// the same chapter, so subgraphs are addressable units that can be
/// overlaid or reprocessed independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterSubgraph {
    /// Stable upstream chapter id.
    pub chapter_id: String,
    /// Zero-based chapter index; the merge key.
    pub chapter_index: u32,
    /// Chapter title.
    pub title: String,
    /// Completion state.
    pub status: ChapterStatus,
    /// Committed atoms in sequence order.
    pub atoms: Vec<Atom>,
    /// Validated relationships in canonical (source, target, type) order.
    pub relationships: Vec<Relationship>,
    /// Audit log of rejected relationship proposals.
    pub rejected: Vec<RejectedRelationship>,
}

impl ChapterSubgraph {
    /// Number of atoms committed with the `Error` sentinel.
    pub fn error_atom_count(&self) -> usize {
        self.atoms.iter().filter(|a| a.is_error()).count()
    }

    /// Quality/completeness report for this chapter.
    pub fn report(&self) -> ChapterReport {
        ChapterReport {
            chapter_id: self.chapter_id.clone(),
            chapter_index: self.chapter_index,
            title: self.title.clone(),
            status: self.status,
            atom_count: self.atoms.len(),
            relationship_count: self.relationships.len(),
            error_atom_count: self.error_atom_count(),
            rejected_relationship_count: self.rejected.len(),
        }
    }
}

/// Per-chapter summary exposed to callers so they can assess result
/// quality without the pipeline making a pass/fail judgment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterReport {
    /// Stable upstream chapter id.
    pub chapter_id: String,
    /// Zero-based chapter index.
    pub chapter_index: u32,
    /// Chapter title.
    pub title: String,
    /// Completion state.
    pub status: ChapterStatus,
    /// Atoms committed.
    pub atom_count: usize,
    /// Relationships committed.
    pub relationship_count: usize,
    /// Atoms committed as `Error`.
    pub error_atom_count: usize,
    /// Relationship proposals rejected.
    pub rejected_relationship_count: usize,
}

/// View of the graph content that participates in the fingerprint.
/// Timestamps are excluded so re-runs of the same document compare equal.
#[derive(Serialize)]
struct FingerprintView<'a> {
    atoms: Vec<&'a Atom>,
    relationships: Vec<&'a Relationship>,
}

/// The merged document graph: the union of all frozen chapter subgraphs,
/// ordered by chapter index regardless of task completion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentGraph {
    /// Stable upstream document id.
    pub document_id: String,
    /// Document title.
    pub document_title: String,
    /// When the merge completed.
    pub built_at: DateTime<Utc>,
    /// Canonical hash of the ordered atoms and relationships.
    pub fingerprint: String,
    /// Chapter subgraphs in chapter-index order.
    pub chapters: Vec<ChapterSubgraph>,
}

impl DocumentGraph {
    /// Merge frozen chapter subgraphs into a document graph.
    ///
    /// Subgraphs are ordered by chapter index, never by completion order,
    /// so the result is independent of scheduling nondeterminism.
    pub fn merge(
        document_id: String,
        document_title: String,
        mut chapters: Vec<ChapterSubgraph>,
    ) -> Self {
        chapters.sort_by_key(|c| c.chapter_index);

        let view = FingerprintView {
            atoms: chapters.iter().flat_map(|c| c.atoms.iter()).collect(),
            relationships: chapters
                .iter()
                .flat_map(|c| c.relationships.iter())
                .collect(),
        };
        let fingerprint = canonical_hash_hex(&view);

        Self {
            document_id,
            document_title,
            built_at: Utc::now(),
            fingerprint,
            chapters,
        }
    }

    /// All committed atoms in chapter-index then sequence order.
    pub fn atoms(&self) -> impl Iterator<Item = &Atom> {
        self.chapters.iter().flat_map(|c| c.atoms.iter())
    }

    /// All committed relationships in chapter-index then canonical order.
    pub fn relationships(&self) -> impl Iterator<Item = &Relationship> {
        self.chapters.iter().flat_map(|c| c.relationships.iter())
    }

    /// Per-chapter completeness and quality reports.
    pub fn reports(&self) -> Vec<ChapterReport> {
        self.chapters.iter().map(|c| c.report()).collect()
    }

    /// Whether every chapter completed its full atom sequence.
    pub fn is_complete(&self) -> bool {
        self.chapters.iter().all(|c| c.status.is_complete())
    }
}
