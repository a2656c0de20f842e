//! Document pipeline: one task per chapter, strictly sequential atoms.
//!
//! ## Scheduling model
//!
//! Chapters are independent: each gets its own tokio task, its own
//! context window, and its own assembler. Within a chapter, atom
//! processing is strictly sequential because every classification call
//! depends on the accumulated context of all prior atoms; no two calls
//! for the same chapter are ever in flight together. Across chapters the
//! only shared resources are the read-only taxonomy/ontology tables and
//! the adapter's admission gate on outbound oracle calls.
//!
//! ## Cancellation
//!
//! The cancellation flag is checked between atoms, so the current atom's
//! oracle call either completes or hits its own timeout; no partially
//! classified atom is ever committed. A cancelled or timed-out chapter
//! freezes whatever it has committed as a `Partial` subgraph. Other
//! chapters are unaffected, and the merged graph reports completeness
//! per chapter.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::assembler::ChapterAssembler;
use crate::config::PipelineConfig;
use crate::context::{ContextBound, ContextWindow};
use crate::ontology::Ontology;
use crate::oracle::{ClassificationOracle, ClassifyOutcome, OracleAdapter};
use crate::segmenter::{self, AtomSpan};
use crate::types::{
    AbortReason, Atom, AtomId, ChapterNode, ChapterStatus, ChapterSubgraph, Classification,
    DocumentGraph, DocumentTree,
};
use crate::validator::OntologyValidator;

/// Cooperative cancellation flag shared between the caller and all
/// chapter tasks of one build.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    /// Create an unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Chapter tasks stop before their next atom.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Lifecycle status of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    /// No build started yet.
    Idle,
    /// Chapter tasks are running.
    Building,
    /// Chapter subgraphs are being merged.
    Merging,
    /// The document graph is ready.
    Complete,
    /// The build was cancelled; the graph is partial.
    Cancelled,
}

/// Shared progress counters, readable while a build is running.
#[derive(Debug)]
pub struct PipelineProgress {
    total_atoms: AtomicUsize,
    processed_atoms: AtomicUsize,
    status: RwLock<PipelineStatus>,
}

impl PipelineProgress {
    fn new() -> Self {
        Self {
            total_atoms: AtomicUsize::new(0),
            processed_atoms: AtomicUsize::new(0),
            status: RwLock::new(PipelineStatus::Idle),
        }
    }

    fn begin(&self, total: usize) {
        self.total_atoms.store(total, Ordering::SeqCst);
        self.processed_atoms.store(0, Ordering::SeqCst);
        *self.status.write() = PipelineStatus::Building;
    }

    fn incr(&self) {
        self.processed_atoms.fetch_add(1, Ordering::SeqCst);
    }

    fn set_status(&self, status: PipelineStatus) {
        *self.status.write() = status;
    }

    /// A point-in-time view of the counters.
    pub fn snapshot(&self) -> ProgressSnapshot {
        let total = self.total_atoms.load(Ordering::SeqCst);
        let processed = self.processed_atoms.load(Ordering::SeqCst);
        let percent = if total == 0 {
            0
        } else {
            ((processed * 100) / total) as u8
        };
        ProgressSnapshot {
            status: *self.status.read(),
            total_atoms: total,
            processed_atoms: processed,
            progress_percent: percent,
        }
    }
}

/// Point-in-time progress view for callers polling a running build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    /// Current lifecycle status.
    pub status: PipelineStatus,
    /// Atoms the build will process in total.
    pub total_atoms: usize,
    /// Atoms committed so far.
    pub processed_atoms: usize,
    /// Whole-number completion percentage.
    pub progress_percent: u8,
}

/// Pre-segmented paragraph, ready for sequential classification.
struct ParagraphPlan {
    paragraph_id: String,
    ordinal: u32,
    spans: Vec<AtomSpan>,
}

/// Pre-segmented chapter: everything a chapter task needs, owned.
struct ChapterPlan {
    chapter_id: String,
    chapter_index: u32,
    title: String,
    paragraphs: Vec<ParagraphPlan>,
}

impl ChapterPlan {
    fn atom_count(&self) -> usize {
        self.paragraphs.iter().map(|p| p.spans.len()).sum()
    }
}

/// Segment every body paragraph of a chapter up front.
///
/// Segmentation is pure and synchronous, so doing it before spawning
/// gives an exact total for progress tracking and leaves the chapter
/// task with oracle calls as its only suspension points.
fn plan_chapter(chapter_index: u32, chapter: &ChapterNode) -> ChapterPlan {
    let paragraphs = chapter
        .body_paragraphs()
        .enumerate()
        .map(|(ordinal, para)| ParagraphPlan {
            paragraph_id: para.id.clone(),
            ordinal: ordinal as u32,
            spans: segmenter::segment(&para.text, para.start_offset),
        })
        .collect();

    ChapterPlan {
        chapter_id: chapter.id.clone(),
        chapter_index,
        title: chapter.title.clone(),
        paragraphs,
    }
}

/// Builds document graphs: the top-level entry point of the kernel.
pub struct GraphBuilder<O> {
    adapter: Arc<OracleAdapter<O>>,
    ontology: Arc<Ontology>,
    config: PipelineConfig,
    progress: Arc<PipelineProgress>,
}

impl<O: ClassificationOracle + 'static> GraphBuilder<O> {
    /// Create a builder. The ontology is loaded once here and shared
    /// read-only across all chapter tasks.
    pub fn new(oracle: O, ontology: Ontology, config: PipelineConfig) -> Self {
        Self {
            adapter: Arc::new(OracleAdapter::new(oracle, &config)),
            ontology: Arc::new(ontology),
            config,
            progress: Arc::new(PipelineProgress::new()),
        }
    }

    /// Current progress counters.
    pub fn progress(&self) -> ProgressSnapshot {
        self.progress.snapshot()
    }

    /// Handle for polling progress from another task while a build runs.
    pub fn progress_handle(&self) -> Arc<PipelineProgress> {
        Arc::clone(&self.progress)
    }

    /// The active configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Build the document graph.
    pub async fn build(&self, document: &DocumentTree) -> DocumentGraph {
        self.build_with_cancel(document, CancellationFlag::new())
            .await
    }

    /// Build the document graph with an external cancellation flag.
    ///
    /// On cancellation, chapters freeze their committed atoms into
    /// partial subgraphs and the merged graph is returned with per-chapter
    /// completeness flags; nothing already committed is discarded.
    pub async fn build_with_cancel(
        &self,
        document: &DocumentTree,
        cancel: CancellationFlag,
    ) -> DocumentGraph {
        let plans: Vec<ChapterPlan> = document
            .chapters
            .iter()
            .enumerate()
            .map(|(index, chapter)| plan_chapter(index as u32, chapter))
            .collect();
        let total: usize = plans.iter().map(ChapterPlan::atom_count).sum();
        self.progress.begin(total);

        tracing::info!(
            document = %document.id,
            chapters = plans.len(),
            atoms = total,
            "Graph construction started"
        );

        let mut handles: Vec<(u32, String, String, JoinHandle<ChapterSubgraph>)> =
            Vec::with_capacity(plans.len());
        for plan in plans {
            let adapter = Arc::clone(&self.adapter);
            let validator = OntologyValidator::new(Arc::clone(&self.ontology));
            let document_id = document.id.clone();
            let context_bound = self.config.context_bound;
            let deadline = self.config.chapter_deadline();
            let cancel = cancel.clone();
            let progress = Arc::clone(&self.progress);

            let chapter_index = plan.chapter_index;
            let chapter_id = plan.chapter_id.clone();
            let title = plan.title.clone();

            let handle = tokio::spawn(async move {
                process_chapter(
                    plan,
                    document_id,
                    adapter,
                    validator,
                    context_bound,
                    deadline,
                    cancel,
                    progress,
                )
                .await
            });
            handles.push((chapter_index, chapter_id, title, handle));
        }

        let mut subgraphs = Vec::with_capacity(handles.len());
        for (chapter_index, chapter_id, title, handle) in handles {
            match handle.await {
                Ok(subgraph) => subgraphs.push(subgraph),
                Err(e) => {
                    tracing::error!(chapter = chapter_index, error = %e, "Chapter task failed");
                    subgraphs.push(ChapterSubgraph {
                        chapter_id,
                        chapter_index,
                        title,
                        status: ChapterStatus::Partial {
                            reason: AbortReason::TaskFailed,
                        },
                        atoms: Vec::new(),
                        relationships: Vec::new(),
                        rejected: Vec::new(),
                    });
                }
            }
        }

        self.progress.set_status(PipelineStatus::Merging);
        let graph = DocumentGraph::merge(document.id.clone(), document.title.clone(), subgraphs);
        self.progress.set_status(if cancel.is_cancelled() {
            PipelineStatus::Cancelled
        } else {
            PipelineStatus::Complete
        });

        tracing::info!(
            document = %graph.document_id,
            fingerprint = %graph.fingerprint,
            complete = graph.is_complete(),
            "Graph construction finished"
        );
        graph
    }
}

/// Run one chapter pipeline to completion (or abort).
#[allow(clippy::too_many_arguments)]
async fn process_chapter<O: ClassificationOracle + 'static>(
    plan: ChapterPlan,
    document_id: String,
    adapter: Arc<OracleAdapter<O>>,
    validator: OntologyValidator,
    context_bound: ContextBound,
    deadline: Option<Duration>,
    cancel: CancellationFlag,
    progress: Arc<PipelineProgress>,
) -> ChapterSubgraph {
    let started = Instant::now();
    let mut assembler = ChapterAssembler::new(
        plan.chapter_id.clone(),
        plan.chapter_index,
        plan.title.clone(),
    );
    let mut window = ContextWindow::new(context_bound);
    let mut sequence: u32 = 0;

    for paragraph in &plan.paragraphs {
        for (position, span) in paragraph.spans.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::warn!(chapter = plan.chapter_index, "Chapter cancelled");
                return assembler.freeze(ChapterStatus::Partial {
                    reason: AbortReason::Cancelled,
                });
            }
            if let Some(limit) = deadline {
                if started.elapsed() >= limit {
                    tracing::warn!(chapter = plan.chapter_index, "Chapter deadline exceeded");
                    return assembler.freeze(ChapterStatus::Partial {
                        reason: AbortReason::DeadlineExceeded,
                    });
                }
            }

            let atom_id = AtomId::new(plan.chapter_index, paragraph.ordinal, position as u32 + 1);
            let outcome = adapter.classify(&window, atom_id, &span.text).await;

            let atom = match outcome {
                ClassifyOutcome::Classified {
                    classification,
                    justification,
                    proposals,
                    rejected,
                } => {
                    let atom = Atom {
                        id: atom_id,
                        document_id: document_id.clone(),
                        chapter_id: plan.chapter_id.clone(),
                        paragraph_id: paragraph.paragraph_id.clone(),
                        sequence_index: sequence,
                        text: span.text.clone(),
                        start_offset: span.start_offset,
                        end_offset: span.end_offset,
                        classification,
                        justification,
                    };
                    for rejection in rejected {
                        tracing::debug!(
                            atom = %atom_id,
                            reason = %rejection.reason,
                            "Relationship rejected"
                        );
                        assembler.record_rejection(rejection);
                    }
                    for proposal in proposals {
                        match validator.validate(&atom, &proposal, assembler.atoms()) {
                            Ok(relationship) => {
                                assembler.commit_relationship(relationship);
                            }
                            Err(rejection) => {
                                tracing::debug!(
                                    atom = %atom_id,
                                    reason = %rejection.reason,
                                    "Relationship rejected"
                                );
                                assembler.record_rejection(rejection);
                            }
                        }
                    }
                    atom
                }
                ClassifyOutcome::Failed(failure) => {
                    tracing::warn!(atom = %atom_id, error = %failure, "Atom committed as Error");
                    Atom {
                        id: atom_id,
                        document_id: document_id.clone(),
                        chapter_id: plan.chapter_id.clone(),
                        paragraph_id: paragraph.paragraph_id.clone(),
                        sequence_index: sequence,
                        text: span.text.clone(),
                        start_offset: span.start_offset,
                        end_offset: span.end_offset,
                        classification: Classification::Error,
                        justification: String::new(),
                    }
                }
            };

            window.push(atom_id, &atom.text);
            assembler.commit_atom(atom);
            progress.incr();
            sequence += 1;
        }
    }

    tracing::debug!(
        chapter = plan.chapter_index,
        atoms = assembler.atom_count(),
        "Chapter complete"
    );
    assembler.freeze(ChapterStatus::Complete)
}
