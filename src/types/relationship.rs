//! Relationship types for the graph kernel.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::atom::AtomId;

/// Type of argumentative relationship between two atoms.
///
/// The ontology is a fixed, closed set; `Continues` is universal and
/// accepts any source/target classification, including `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RelationType {
    /// Source provides evidential or argumentative support for the target.
    Supports,
    /// Source attacks or undermines the target.
    Rebuts,
    /// Source unpacks or develops the target in more detail.
    Elaborates,
    /// Source illustrates the target with a concrete instance.
    Exemplifies,
    /// Source fixes the meaning of a term the target relies on.
    Defines,
    /// Source grants part of the target while maintaining a position.
    Concedes,
    /// Source responds to a question or problem posed by the target.
    Answers,
    /// Source attributes the target to an external work.
    Cites,
    /// Source carries on the same discourse unit as the target.
    Continues,
}

impl RelationType {
    /// All relationship types, in declaration order.
    pub const ALL: [RelationType; 9] = [
        Self::Supports,
        Self::Rebuts,
        Self::Elaborates,
        Self::Exemplifies,
        Self::Defines,
        Self::Concedes,
        Self::Answers,
        Self::Cites,
        Self::Continues,
    ];

    /// Parse a relationship type from its canonical label.
    pub fn from_label(s: &str) -> Option<Self> {
        match s.trim() {
            "Supports" => Some(Self::Supports),
            "Rebuts" => Some(Self::Rebuts),
            "Elaborates" => Some(Self::Elaborates),
            "Exemplifies" => Some(Self::Exemplifies),
            "Defines" => Some(Self::Defines),
            "Concedes" => Some(Self::Concedes),
            "Answers" => Some(Self::Answers),
            "Cites" => Some(Self::Cites),
            "Continues" => Some(Self::Continues),
            _ => None,
        }
    }

    /// Canonical label string.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Supports => "Supports",
            Self::Rebuts => "Rebuts",
            Self::Elaborates => "Elaborates",
            Self::Exemplifies => "Exemplifies",
            Self::Defines => "Defines",
            Self::Concedes => "Concedes",
            Self::Answers => "Answers",
            Self::Cites => "Cites",
            Self::Continues => "Continues",
        }
    }

    /// Whether this type accepts any source/target classification.
    pub fn is_universal(&self) -> bool {
        matches!(self, Self::Continues)
    }
}

impl std::fmt::Display for RelationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Direction the oracle asserted for a proposed relationship, from the
/// point of view of the atom being classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// The classified atom is the semantic source of the edge.
    Outgoing,
    /// The referenced context atom is the semantic source of the edge.
    Incoming,
}

impl Direction {
    /// Parse a direction from the oracle's wire label.
    pub fn from_label(s: &str) -> Option<Self> {
        match s.trim() {
            "outgoing" => Some(Self::Outgoing),
            "incoming" => Some(Self::Incoming),
            _ => None,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Outgoing => write!(f, "outgoing"),
            Self::Incoming => write!(f, "incoming"),
        }
    }
}

/// A committed, validated relationship between two atoms.
///
/// Stored in processing orientation: `source_atom_id` is always the atom
/// whose oracle call proposed the edge (the later atom in sequence) and
/// `target_atom_id` the earlier context atom, so
/// `target.sequence_index < source.sequence_index` holds for every
/// committed edge. `direction_origin` preserves the oracle's asserted
/// direction so the semantic orientation per the ontology can be
/// reconstructed independent of processing order; see
/// [`Relationship::semantic_endpoints`].
///
/// Implements `Ord` for canonical ordering: (source, target, type).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relationship {
    /// Deterministic identifier derived from (document, source, target, type).
    pub id: Uuid,
    /// Stable id of the owning document (upstream).
    pub document_id: String,
    /// The atom that proposed the edge; the later of the two endpoints.
    pub source_atom_id: AtomId,
    /// The referenced context atom; the earlier of the two endpoints.
    pub target_atom_id: AtomId,
    /// Relationship type.
    pub rel_type: RelationType,
    /// Direction asserted by the oracle from `source_atom_id`.
    pub direction_origin: Direction,
    /// Oracle rationale for proposing the edge.
    pub justification: String,
}

impl Relationship {
    /// Create a relationship with a deterministic id.
    ///
    /// The id is a UUIDv5 over (document, source, target, type) so that
    /// repeated runs over the same document yield byte-identical edges.
    pub fn new(
        document_id: String,
        source_atom_id: AtomId,
        target_atom_id: AtomId,
        rel_type: RelationType,
        direction_origin: Direction,
        justification: String,
    ) -> Self {
        let name = format!(
            "{document_id}:{source_atom_id}:{target_atom_id}:{}",
            rel_type.label()
        );
        let id = Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes());
        Self {
            id,
            document_id,
            source_atom_id,
            target_atom_id,
            rel_type,
            direction_origin,
            justification,
        }
    }

    /// Semantic (source, target) endpoints per the ontology.
    ///
    /// `Outgoing` means the proposing atom is the semantic source;
    /// `Incoming` means the referenced context atom is.
    pub fn semantic_endpoints(&self) -> (AtomId, AtomId) {
        match self.direction_origin {
            Direction::Outgoing => (self.source_atom_id, self.target_atom_id),
            Direction::Incoming => (self.target_atom_id, self.source_atom_id),
        }
    }

    /// Key identifying this edge for deduplication.
    pub fn dedup_key(&self) -> (AtomId, AtomId, RelationType) {
        (self.source_atom_id, self.target_atom_id, self.rel_type)
    }
}

// Canonical ordering: source, then target, then type
impl PartialOrd for Relationship {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Relationship {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.dedup_key().cmp(&other.dedup_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relation_type_round_trip() {
        for rel in RelationType::ALL {
            assert_eq!(RelationType::from_label(rel.label()), Some(rel));
        }
    }

    #[test]
    fn test_only_continues_is_universal() {
        for rel in RelationType::ALL {
            assert_eq!(rel.is_universal(), rel == RelationType::Continues);
        }
    }

    #[test]
    fn test_direction_parsing() {
        assert_eq!(Direction::from_label("outgoing"), Some(Direction::Outgoing));
        assert_eq!(Direction::from_label("incoming"), Some(Direction::Incoming));
        assert_eq!(Direction::from_label("sideways"), None);
    }

    #[test]
    fn test_relationship_id_is_deterministic() {
        let make = || {
            Relationship::new(
                "doc-1".to_string(),
                AtomId::new(0, 0, 2),
                AtomId::new(0, 0, 1),
                RelationType::Supports,
                Direction::Outgoing,
                "because".to_string(),
            )
        };
        assert_eq!(make().id, make().id);
    }

    #[test]
    fn test_relationship_id_differs_by_type() {
        let source = AtomId::new(0, 0, 2);
        let target = AtomId::new(0, 0, 1);
        let a = Relationship::new(
            "doc-1".to_string(),
            source,
            target,
            RelationType::Supports,
            Direction::Outgoing,
            String::new(),
        );
        let b = Relationship::new(
            "doc-1".to_string(),
            source,
            target,
            RelationType::Rebuts,
            Direction::Outgoing,
            String::new(),
        );
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_semantic_endpoints_follow_direction() {
        let source = AtomId::new(0, 1, 1);
        let target = AtomId::new(0, 0, 1);

        let outgoing = Relationship::new(
            "doc-1".to_string(),
            source,
            target,
            RelationType::Supports,
            Direction::Outgoing,
            String::new(),
        );
        assert_eq!(outgoing.semantic_endpoints(), (source, target));

        let incoming = Relationship::new(
            "doc-1".to_string(),
            source,
            target,
            RelationType::Supports,
            Direction::Incoming,
            String::new(),
        );
        assert_eq!(incoming.semantic_endpoints(), (target, source));
    }

    #[test]
    fn test_relationship_ordering() {
        let r1 = Relationship::new(
            "doc-1".to_string(),
            AtomId::new(0, 0, 2),
            AtomId::new(0, 0, 1),
            RelationType::Supports,
            Direction::Outgoing,
            String::new(),
        );
        let r2 = Relationship::new(
            "doc-1".to_string(),
            AtomId::new(0, 0, 3),
            AtomId::new(0, 0, 1),
            RelationType::Supports,
            Direction::Outgoing,
            String::new(),
        );
        assert!(r1 < r2);
    }
}
