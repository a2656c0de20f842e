//! Chapter-scoped context window.
//!
//! For each atom about to be classified, the window supplies the ordered
//! list of already-committed atoms visible as context. The scope is the
//! chapter: context accumulates across paragraphs in document order and
//! never crosses a chapter boundary. Each chapter pipeline owns a fresh
//! window, which is what makes chapters independently schedulable.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::types::AtomId;

/// Upper bound on context growth within a chapter.
///
/// The bound is an explicit configuration decision; whichever variant is
/// chosen, it is enforced in [`ContextWindow::push`] and nowhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextBound {
    /// Window grows across the entire chapter-so-far.
    Unbounded,
    /// Window keeps only the most recent `n` committed atoms.
    LastN(usize),
}

/// One atom visible as context, in the shape the oracle consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextEntry {
    /// Committed atom id.
    pub id: AtomId,
    /// Committed atom text.
    pub text: String,
}

/// Ordered window of committed atoms for one chapter.
#[derive(Debug, Clone)]
pub struct ContextWindow {
    bound: ContextBound,
    entries: VecDeque<ContextEntry>,
}

impl ContextWindow {
    /// Create an empty window with the given bound.
    pub fn new(bound: ContextBound) -> Self {
        Self {
            bound,
            entries: VecDeque::new(),
        }
    }

    /// Record a committed atom, evicting the oldest entry if the bound
    /// is exceeded. Growth is monotonic otherwise.
    pub fn push(&mut self, id: AtomId, text: &str) {
        if let ContextBound::LastN(n) = self.bound {
            if n == 0 {
                return;
            }
            while self.entries.len() >= n {
                self.entries.pop_front();
            }
        }
        self.entries.push_back(ContextEntry {
            id,
            text: text.to_string(),
        });
    }

    /// Entries in commit order, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &ContextEntry> {
        self.entries.iter()
    }

    /// Number of atoms currently visible.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the window is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The configured bound.
    pub fn bound(&self) -> ContextBound {
        self.bound
    }
}
