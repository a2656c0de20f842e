//! Atom types for the graph kernel.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Namespaced identifier for an atom.
///
/// Composed of the chapter index, the chapter-wide paragraph ordinal, and
/// the 1-based position of the atom within its paragraph. The composition
/// guarantees global uniqueness without a central counter, and the derived
/// `Ord` matches document order within a chapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AtomId {
    /// Zero-based chapter index within the document.
    pub chapter: u32,
    /// Zero-based paragraph ordinal within the chapter (sections included).
    pub paragraph: u32,
    /// One-based atom position within the paragraph.
    pub atom: u32,
}

impl AtomId {
    /// Create a new AtomId.
    pub fn new(chapter: u32, paragraph: u32, atom: u32) -> Self {
        Self {
            chapter,
            paragraph,
            atom,
        }
    }
}

impl fmt::Display for AtomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ch{}.p{}.a{}", self.chapter, self.paragraph, self.atom)
    }
}

/// Classification label assigned to an atom.
///
/// The taxonomy is a fixed, closed set of 18 labels (17 argumentative
/// roles plus the `Error` sentinel). Oracle output is open-world; use
/// [`Classification::from_label`] to map it into the taxonomy and fall
/// back to `Error` when the label is not recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Classification {
    /// Assertion advanced as true and open to challenge.
    Claim,
    /// Statement offered in support of another statement.
    Premise,
    /// Statement derived from premises.
    Conclusion,
    /// Statement opposing a previously advanced statement.
    Rebuttal,
    /// Acknowledgement of an opposing point without abandoning a position.
    Concession,
    /// Statement presented as following from another statement.
    Implication,
    /// Statement fixing the meaning of a term.
    Definition,
    /// Definition introduced by fiat for the scope of the work.
    Stipulation,
    /// Concrete instance illustrating a general statement.
    Example,
    /// Statement separating two notions previously run together.
    Distinction,
    /// Declaration of the stance the author will defend.
    #[serde(rename = "Position Statement")]
    PositionStatement,
    /// Verbatim reproduction of another text.
    Quotation,
    /// Reference to another work.
    Citation,
    /// Central claim of the whole document.
    Thesis,
    /// Announcement of the structure of the argument to come.
    Roadmap,
    /// Statement of the difficulty the work addresses.
    #[serde(rename = "Problem Statement")]
    ProblemStatement,
    /// Question raised for investigation.
    Inquiry,
    /// Sentinel for atoms whose classification failed.
    Error,
}

impl Classification {
    /// All taxonomy labels, in declaration order.
    pub const ALL: [Classification; 18] = [
        Self::Claim,
        Self::Premise,
        Self::Conclusion,
        Self::Rebuttal,
        Self::Concession,
        Self::Implication,
        Self::Definition,
        Self::Stipulation,
        Self::Example,
        Self::Distinction,
        Self::PositionStatement,
        Self::Quotation,
        Self::Citation,
        Self::Thesis,
        Self::Roadmap,
        Self::ProblemStatement,
        Self::Inquiry,
        Self::Error,
    ];

    /// Parse a classification from its canonical label.
    ///
    /// Leading/trailing whitespace is ignored; anything else must match
    /// exactly. Returns `None` for labels outside the taxonomy.
    pub fn from_label(s: &str) -> Option<Self> {
        match s.trim() {
            "Claim" => Some(Self::Claim),
            "Premise" => Some(Self::Premise),
            "Conclusion" => Some(Self::Conclusion),
            "Rebuttal" => Some(Self::Rebuttal),
            "Concession" => Some(Self::Concession),
            "Implication" => Some(Self::Implication),
            "Definition" => Some(Self::Definition),
            "Stipulation" => Some(Self::Stipulation),
            "Example" => Some(Self::Example),
            "Distinction" => Some(Self::Distinction),
            "Position Statement" => Some(Self::PositionStatement),
            "Quotation" => Some(Self::Quotation),
            "Citation" => Some(Self::Citation),
            "Thesis" => Some(Self::Thesis),
            "Roadmap" => Some(Self::Roadmap),
            "Problem Statement" => Some(Self::ProblemStatement),
            "Inquiry" => Some(Self::Inquiry),
            "Error" => Some(Self::Error),
            _ => None,
        }
    }

    /// Canonical label string.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Claim => "Claim",
            Self::Premise => "Premise",
            Self::Conclusion => "Conclusion",
            Self::Rebuttal => "Rebuttal",
            Self::Concession => "Concession",
            Self::Implication => "Implication",
            Self::Definition => "Definition",
            Self::Stipulation => "Stipulation",
            Self::Example => "Example",
            Self::Distinction => "Distinction",
            Self::PositionStatement => "Position Statement",
            Self::Quotation => "Quotation",
            Self::Citation => "Citation",
            Self::Thesis => "Thesis",
            Self::Roadmap => "Roadmap",
            Self::ProblemStatement => "Problem Statement",
            Self::Inquiry => "Inquiry",
            Self::Error => "Error",
        }
    }

    /// Whether this is the `Error` sentinel.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A committed atom: the smallest classified unit of text.
///
/// Text and offsets are fixed at segmentation time; `classification` and
/// `justification` are set exactly once when the atom is committed. Atoms
/// are never mutated after commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Atom {
    /// Namespaced identifier.
    pub id: AtomId,
    /// Stable id of the owning document (upstream).
    pub document_id: String,
    /// Stable id of the owning chapter (upstream).
    pub chapter_id: String,
    /// Stable id of the owning paragraph (upstream).
    pub paragraph_id: String,
    /// Chapter-wide ordinal; commit order equals segmentation order.
    pub sequence_index: u32,
    /// Atom text, whitespace-trimmed slice of the paragraph.
    pub text: String,
    /// Absolute byte offset of the span start in the document text.
    pub start_offset: u64,
    /// Absolute byte offset one past the span end.
    pub end_offset: u64,
    /// Taxonomy label, `Error` when classification failed.
    pub classification: Classification,
    /// Oracle rationale for the classification; empty for `Error` atoms
    /// committed after transport failures.
    pub justification: String,
}

impl Atom {
    /// Whether this atom carries the `Error` sentinel.
    pub fn is_error(&self) -> bool {
        self.classification.is_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atom_id_ordering_matches_document_order() {
        let a = AtomId::new(0, 0, 1);
        let b = AtomId::new(0, 0, 2);
        let c = AtomId::new(0, 1, 1);
        let d = AtomId::new(1, 0, 1);

        assert!(a < b);
        assert!(b < c);
        assert!(c < d);
    }

    #[test]
    fn test_atom_id_display() {
        assert_eq!(AtomId::new(2, 5, 3).to_string(), "ch2.p5.a3");
    }

    #[test]
    fn test_classification_labels_round_trip() {
        for class in Classification::ALL {
            assert_eq!(Classification::from_label(class.label()), Some(class));
        }
    }

    #[test]
    fn test_classification_rejects_unknown_label() {
        assert_eq!(Classification::from_label("FooBar"), None);
        assert_eq!(Classification::from_label(""), None);
    }

    #[test]
    fn test_classification_trims_whitespace() {
        assert_eq!(
            Classification::from_label("  Premise "),
            Some(Classification::Premise)
        );
    }

    #[test]
    fn test_multi_word_labels_serialize_with_spaces() {
        let json = serde_json::to_string(&Classification::PositionStatement).unwrap();
        assert_eq!(json, "\"Position Statement\"");
        let json = serde_json::to_string(&Classification::ProblemStatement).unwrap();
        assert_eq!(json, "\"Problem Statement\"");
    }

    #[test]
    fn test_taxonomy_has_eighteen_labels() {
        assert_eq!(Classification::ALL.len(), 18);
    }
}
