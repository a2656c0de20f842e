//! Core types for the graph kernel.

pub mod atom;
pub mod document;
pub mod graph;
pub mod relationship;

pub use atom::{Atom, AtomId, Classification};
pub use document::{ChapterNode, DocumentTree, ParagraphNode, SectionNode};
pub use graph::{AbortReason, ChapterReport, ChapterStatus, ChapterSubgraph, DocumentGraph};
pub use relationship::{Direction, RelationType, Relationship};
