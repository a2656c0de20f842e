//! Upstream document hierarchy types.
//!
//! The document-structure collaborator produces a tree of chapters,
//! sections, and paragraphs with absolute byte offsets and stable ids.
//! The kernel consumes this tree read-only; paragraphs are the leaves the
//! segmenter operates on.

use serde::{Deserialize, Serialize};

/// A paragraph leaf: the unit of segmentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParagraphNode {
    /// Stable upstream id.
    pub id: String,
    /// Paragraph text.
    pub text: String,
    /// Absolute byte offset of the paragraph start in the document.
    pub start_offset: u64,
    /// Absolute byte offset one past the paragraph end.
    pub end_offset: u64,
}

/// A section within a chapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionNode {
    /// Stable upstream id.
    pub id: String,
    /// Section title.
    pub title: String,
    /// Paragraphs in document order.
    #[serde(default)]
    pub paragraphs: Vec<ParagraphNode>,
}

impl SectionNode {
    /// Whether this is an endnotes section, which carries reference
    /// apparatus rather than argumentative content and is skipped during
    /// graph construction.
    pub fn is_notes(&self) -> bool {
        self.title.trim().eq_ignore_ascii_case("notes")
    }
}

/// A chapter: the unit of concurrent scheduling and the scope of every
/// context window and relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterNode {
    /// Stable upstream id.
    pub id: String,
    /// Chapter title.
    pub title: String,
    /// Chapter-level paragraphs, preceding any section.
    #[serde(default)]
    pub paragraphs: Vec<ParagraphNode>,
    /// Sections in document order.
    #[serde(default)]
    pub sections: Vec<SectionNode>,
}

impl ChapterNode {
    /// Paragraphs to process, in document order: chapter-level paragraphs
    /// first, then each non-notes section's paragraphs.
    pub fn body_paragraphs(&self) -> impl Iterator<Item = &ParagraphNode> {
        self.paragraphs.iter().chain(
            self.sections
                .iter()
                .filter(|s| !s.is_notes())
                .flat_map(|s| s.paragraphs.iter()),
        )
    }
}

/// The full document tree handed to the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentTree {
    /// Stable upstream id.
    pub id: String,
    /// Document title.
    pub title: String,
    /// Chapters in document order; the index in this vector is the
    /// chapter index used for merge ordering.
    #[serde(default)]
    pub chapters: Vec<ChapterNode>,
}
