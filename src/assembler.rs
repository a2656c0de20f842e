//! Chapter-scoped graph assembly.
//!
//! The assembler is the single writer for one chapter's subgraph. Atoms
//! arrive in sequence order, relationships arrive validated, and the
//! subgraph is frozen exactly once when the chapter's atom sequence is
//! exhausted (or the chapter aborts). Duplicate edges proposed from both
//! ends collapse to one.

use std::collections::{BTreeMap, BTreeSet};

use crate::types::{Atom, AtomId, ChapterStatus, ChapterSubgraph, RelationType, Relationship};
use crate::validator::RejectedRelationship;

/// Accumulates one chapter's atoms and relationships, then freezes them
/// into a [`ChapterSubgraph`].
#[derive(Debug)]
pub struct ChapterAssembler {
    chapter_id: String,
    chapter_index: u32,
    title: String,
    atoms: BTreeMap<AtomId, Atom>,
    relationships: Vec<Relationship>,
    seen: BTreeSet<(AtomId, AtomId, RelationType)>,
    rejected: Vec<RejectedRelationship>,
}

impl ChapterAssembler {
    /// Create an empty assembler for one chapter.
    pub fn new(chapter_id: String, chapter_index: u32, title: String) -> Self {
        Self {
            chapter_id,
            chapter_index,
            title,
            atoms: BTreeMap::new(),
            relationships: Vec::new(),
            seen: BTreeSet::new(),
            rejected: Vec::new(),
        }
    }

    /// Commit an atom. Atoms are immutable once committed; committing the
    /// same id twice is a caller bug and the first commit wins.
    pub fn commit_atom(&mut self, atom: Atom) {
        self.atoms.entry(atom.id).or_insert(atom);
    }

    /// Committed atoms keyed by id; iteration order is document order.
    pub fn atoms(&self) -> &BTreeMap<AtomId, Atom> {
        &self.atoms
    }

    /// Commit a validated relationship. Returns `false` when an edge with
    /// the same (source, target, type) was already committed.
    pub fn commit_relationship(&mut self, relationship: Relationship) -> bool {
        if self.seen.insert(relationship.dedup_key()) {
            self.relationships.push(relationship);
            true
        } else {
            false
        }
    }

    /// Record a rejected proposal for audit.
    pub fn record_rejection(&mut self, rejection: RejectedRelationship) {
        self.rejected.push(rejection);
    }

    /// Number of committed atoms.
    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    /// Freeze the subgraph. Atoms come out in sequence order and
    /// relationships in canonical (source, target, type) order, so the
    /// frozen form is independent of proposal order.
    pub fn freeze(self, status: ChapterStatus) -> ChapterSubgraph {
        let mut relationships = self.relationships;
        relationships.sort();

        ChapterSubgraph {
            chapter_id: self.chapter_id,
            chapter_index: self.chapter_index,
            title: self.title,
            status,
            atoms: self.atoms.into_values().collect(),
            relationships,
            rejected: self.rejected,
        }
    }
}
