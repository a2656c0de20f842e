//! Ontology validation of proposed relationships.
//!
//! Every candidate edge is checked against the static ontology table and
//! the causal-ordering rules before it may be committed. Rejections are
//! never fatal: they are recorded for audit and dropped, leaving the
//! owning atom's classification and its other edges untouched.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use crate::ontology::Ontology;
use crate::oracle::Proposal;
use crate::types::{Atom, AtomId, Classification, Direction, RelationType, Relationship};

/// Why a proposed relationship was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
    /// The proposed target is not among the atoms supplied as context.
    #[error("target `{target_id}` is not in the supplied context")]
    TargetNotInContext {
        /// The raw proposed target id.
        target_id: String,
    },
    /// The type label is not a key in the ontology table.
    #[error("unknown relationship type `{rel_type}`")]
    UnknownRelationType {
        /// The raw proposed type label.
        rel_type: String,
    },
    /// The direction label is neither `outgoing` nor `incoming`.
    #[error("invalid direction `{direction}`")]
    InvalidDirection {
        /// The raw proposed direction label.
        direction: String,
    },
    /// An atom may not relate to itself.
    #[error("self reference")]
    SelfReference,
    /// The referenced atom does not precede the proposing atom.
    #[error("forward reference: target sequence {target_seq} >= source sequence {source_seq}")]
    ForwardReference {
        /// Sequence index of the proposing atom.
        source_seq: u32,
        /// Sequence index of the referenced atom.
        target_seq: u32,
    },
    /// The endpoints belong to different chapters.
    #[error("endpoints are in different chapters")]
    CrossChapter,
    /// The semantic source classification is outside the type's valid set.
    #[error("`{found}` is not a valid source for `{rel_type}`")]
    InvalidSource {
        /// The relationship type whose rule failed.
        rel_type: RelationType,
        /// The offending classification.
        found: Classification,
    },
    /// The semantic target classification is outside the type's valid set.
    #[error("`{found}` is not a valid target for `{rel_type}`")]
    InvalidTarget {
        /// The relationship type whose rule failed.
        rel_type: RelationType,
        /// The offending classification.
        found: Classification,
    },
}

/// Audit record of a rejected relationship proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedRelationship {
    /// The atom whose oracle call proposed the edge.
    pub origin: AtomId,
    /// The raw proposed target id.
    pub target_id: String,
    /// The raw proposed type label.
    pub rel_type: String,
    /// The raw proposed direction label.
    pub direction: String,
    /// Why the proposal was rejected.
    pub reason: RejectReason,
}

/// Validates candidate relationships against the ontology ruleset.
///
/// The validator is synchronous and side-effect free; it shares the
/// immutable ontology table across chapter tasks without locking.
#[derive(Debug, Clone)]
pub struct OntologyValidator {
    ontology: Arc<Ontology>,
}

impl OntologyValidator {
    /// Create a validator over a shared ontology table.
    pub fn new(ontology: Arc<Ontology>) -> Self {
        Self { ontology }
    }

    /// Validate one proposal from `origin`'s oracle call.
    ///
    /// `committed` is the chapter's committed atoms; every context atom is
    /// in it by construction. On success the returned relationship is
    /// stored in processing orientation (origin as source) with the
    /// oracle's direction preserved; see [`Relationship`].
    pub fn validate(
        &self,
        origin: &Atom,
        proposal: &Proposal,
        committed: &BTreeMap<AtomId, Atom>,
    ) -> Result<Relationship, RejectedRelationship> {
        let reject = |reason| RejectedRelationship {
            origin: origin.id,
            target_id: proposal.target.to_string(),
            rel_type: proposal.rel_type.clone(),
            direction: proposal.direction.clone(),
            reason,
        };

        let rel_type = RelationType::from_label(&proposal.rel_type)
            .filter(|t| self.ontology.contains(*t))
            .ok_or_else(|| {
                reject(RejectReason::UnknownRelationType {
                    rel_type: proposal.rel_type.clone(),
                })
            })?;

        let direction = Direction::from_label(&proposal.direction).ok_or_else(|| {
            reject(RejectReason::InvalidDirection {
                direction: proposal.direction.clone(),
            })
        })?;

        let referenced = committed.get(&proposal.target).ok_or_else(|| {
            reject(RejectReason::TargetNotInContext {
                target_id: proposal.target.to_string(),
            })
        })?;

        if referenced.id == origin.id {
            return Err(reject(RejectReason::SelfReference));
        }
        if referenced.sequence_index >= origin.sequence_index {
            return Err(reject(RejectReason::ForwardReference {
                source_seq: origin.sequence_index,
                target_seq: referenced.sequence_index,
            }));
        }
        if referenced.id.chapter != origin.id.chapter {
            return Err(reject(RejectReason::CrossChapter));
        }

        if !rel_type.is_universal() {
            let (source_class, target_class) = match direction {
                Direction::Outgoing => (origin.classification, referenced.classification),
                Direction::Incoming => (referenced.classification, origin.classification),
            };
            // contains() above guarantees the rule exists.
            if let Some(rule) = self.ontology.rule(rel_type) {
                if !rule.valid_sources.contains(&source_class) {
                    return Err(reject(RejectReason::InvalidSource {
                        rel_type,
                        found: source_class,
                    }));
                }
                if !rule.valid_targets.contains(&target_class) {
                    return Err(reject(RejectReason::InvalidTarget {
                        rel_type,
                        found: target_class,
                    }));
                }
            }
        }

        Ok(Relationship::new(
            origin.document_id.clone(),
            origin.id,
            referenced.id,
            rel_type,
            direction,
            proposal.justification.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_atom(seq: u32, classification: Classification) -> Atom {
        Atom {
            id: AtomId::new(0, 0, seq + 1),
            document_id: "doc-1".to_string(),
            chapter_id: "ch-1".to_string(),
            paragraph_id: "p-1".to_string(),
            sequence_index: seq,
            text: format!("atom {seq}"),
            start_offset: u64::from(seq) * 10,
            end_offset: u64::from(seq) * 10 + 6,
            classification,
            justification: String::new(),
        }
    }

    fn committed(atoms: &[Atom]) -> BTreeMap<AtomId, Atom> {
        atoms.iter().map(|a| (a.id, a.clone())).collect()
    }

    fn proposal(target: AtomId, rel_type: &str, direction: &str) -> Proposal {
        Proposal {
            target,
            rel_type: rel_type.to_string(),
            direction: direction.to_string(),
            justification: "why".to_string(),
        }
    }

    fn validator() -> OntologyValidator {
        OntologyValidator::new(Arc::new(Ontology::builtin()))
    }

    #[test]
    fn test_accepts_premise_supporting_conclusion() {
        let conclusion = make_atom(0, Classification::Conclusion);
        let premise = make_atom(1, Classification::Premise);
        let map = committed(&[conclusion.clone()]);

        let rel = validator()
            .validate(&premise, &proposal(conclusion.id, "Supports", "outgoing"), &map)
            .unwrap();
        assert_eq!(rel.source_atom_id, premise.id);
        assert_eq!(rel.target_atom_id, conclusion.id);
        assert_eq!(rel.rel_type, RelationType::Supports);
    }

    #[test]
    fn test_incoming_direction_flips_semantic_endpoints() {
        // The earlier premise supports the later conclusion; the oracle
        // asserts it from the conclusion's side as incoming.
        let premise = make_atom(0, Classification::Premise);
        let conclusion = make_atom(1, Classification::Conclusion);
        let map = committed(&[premise.clone()]);

        let rel = validator()
            .validate(&conclusion, &proposal(premise.id, "Supports", "incoming"), &map)
            .unwrap();
        // Stored in processing orientation, semantic orientation recoverable.
        assert_eq!(rel.source_atom_id, conclusion.id);
        assert_eq!(rel.semantic_endpoints(), (premise.id, conclusion.id));
    }

    #[test]
    fn test_rejects_invalid_source_set() {
        // Rebuts requires source in {Rebuttal, Conclusion}.
        let claim = make_atom(0, Classification::Claim);
        let premise = make_atom(1, Classification::Premise);
        let map = committed(&[claim.clone()]);

        let err = validator()
            .validate(&premise, &proposal(claim.id, "Rebuts", "outgoing"), &map)
            .unwrap_err();
        assert_eq!(
            err.reason,
            RejectReason::InvalidSource {
                rel_type: RelationType::Rebuts,
                found: Classification::Premise,
            }
        );
    }

    #[test]
    fn test_rejects_unknown_type() {
        let first = make_atom(0, Classification::Claim);
        let second = make_atom(1, Classification::Premise);
        let map = committed(&[first.clone()]);

        let err = validator()
            .validate(&second, &proposal(first.id, "Summarizes", "outgoing"), &map)
            .unwrap_err();
        assert!(matches!(err.reason, RejectReason::UnknownRelationType { .. }));
    }

    #[test]
    fn test_rejects_invalid_direction() {
        let first = make_atom(0, Classification::Claim);
        let second = make_atom(1, Classification::Premise);
        let map = committed(&[first.clone()]);

        let err = validator()
            .validate(&second, &proposal(first.id, "Supports", "sideways"), &map)
            .unwrap_err();
        assert!(matches!(err.reason, RejectReason::InvalidDirection { .. }));
    }

    #[test]
    fn test_rejects_forward_reference_regardless_of_type_validity() {
        let premise = make_atom(5, Classification::Premise);
        let conclusion = make_atom(1, Classification::Conclusion);
        let map = committed(&[premise.clone()]);

        // Type and sets are valid; ordering still rejects.
        let err = validator()
            .validate(&conclusion, &proposal(premise.id, "Supports", "incoming"), &map)
            .unwrap_err();
        assert_eq!(
            err.reason,
            RejectReason::ForwardReference {
                source_seq: 1,
                target_seq: 5,
            }
        );
    }

    #[test]
    fn test_rejects_cross_chapter_reference() {
        let mut other = make_atom(0, Classification::Claim);
        other.id = AtomId::new(1, 0, 1);
        let origin = make_atom(1, Classification::Premise);
        let map = committed(&[other.clone()]);

        let err = validator()
            .validate(&origin, &proposal(other.id, "Supports", "outgoing"), &map)
            .unwrap_err();
        assert_eq!(err.reason, RejectReason::CrossChapter);
    }

    #[test]
    fn test_continues_accepts_error_endpoints() {
        let error_atom = make_atom(0, Classification::Error);
        let origin = make_atom(1, Classification::Claim);
        let map = committed(&[error_atom.clone()]);

        let rel = validator()
            .validate(&origin, &proposal(error_atom.id, "Continues", "outgoing"), &map)
            .unwrap();
        assert_eq!(rel.rel_type, RelationType::Continues);
    }

    #[test]
    fn test_non_universal_type_rejects_error_endpoint() {
        let error_atom = make_atom(0, Classification::Error);
        let origin = make_atom(1, Classification::Premise);
        let map = committed(&[error_atom.clone()]);

        let err = validator()
            .validate(&origin, &proposal(error_atom.id, "Supports", "outgoing"), &map)
            .unwrap_err();
        assert_eq!(
            err.reason,
            RejectReason::InvalidTarget {
                rel_type: RelationType::Supports,
                found: Classification::Error,
            }
        );
    }

    #[test]
    fn test_rejects_target_missing_from_committed_set() {
        let origin = make_atom(1, Classification::Premise);
        let ghost = AtomId::new(0, 0, 9);

        let err = validator()
            .validate(&origin, &proposal(ghost, "Supports", "outgoing"), &BTreeMap::new())
            .unwrap_err();
        assert!(matches!(err.reason, RejectReason::TargetNotInContext { .. }));
    }
}
