//! Taxonomy and ontology configuration.
//!
//! Both tables are static, versioned configuration: loaded once at process
//! start, shared read-only across all chapter tasks, never mutated. The
//! taxonomy is the closed [`Classification`] enum; the ontology maps each
//! [`RelationType`] to the classification sets allowed at its semantic
//! source and target.
//!
//! Invalid labels are a constructor-time concern: [`Ontology::from_json`]
//! rejects any table entry outside the closed enums, so runtime validation
//! only ever compares enum values. Open-world oracle output is handled
//! separately by the adapter's `Error` fallback.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::types::{Classification, RelationType};

/// Version of the builtin ontology ruleset.
/// Increment on changes to the relationship types or their valid sets.
pub const ONTOLOGY_VERSION: &str = "1.0.0";

/// Error loading an ontology table.
#[derive(Debug, Error)]
pub enum OntologyError {
    /// The table is not well-formed JSON.
    #[error("Ontology table is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    /// A relationship key is outside the closed type set.
    #[error("Unknown relationship type in ontology table: `{0}`")]
    UnknownRelationType(String),
    /// A source/target label is outside the taxonomy.
    #[error("Unknown classification label `{label}` in rule for `{rel_type}`")]
    UnknownLabel {
        /// The rule the label appeared in.
        rel_type: RelationType,
        /// The offending label.
        label: String,
    },
    /// `Error` listed in a non-universal rule's valid sets.
    #[error("`Error` is only admissible for the universal `Continues` type, found in `{0}`")]
    ErrorLabelNotUniversal(RelationType),
    /// The table has no rules.
    #[error("Ontology table is empty")]
    Empty,
}

/// Validation rule for one relationship type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OntologyRule {
    /// Human-readable description of the relationship.
    pub description: String,
    /// Classifications admissible at the semantic source.
    /// Empty for the universal `Continues` type.
    pub valid_sources: BTreeSet<Classification>,
    /// Classifications admissible at the semantic target.
    /// Empty for the universal `Continues` type.
    pub valid_targets: BTreeSet<Classification>,
}

/// The immutable ontology table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ontology {
    version: String,
    rules: BTreeMap<RelationType, OntologyRule>,
}

/// Raw wire form of an ontology table, before label validation.
#[derive(Deserialize)]
struct RawOntology {
    version: String,
    relationships: BTreeMap<String, RawRule>,
}

#[derive(Deserialize)]
struct RawRule {
    #[serde(default)]
    description: String,
    #[serde(default)]
    valid_sources: Vec<String>,
    #[serde(default)]
    valid_targets: Vec<String>,
}

impl Ontology {
    /// The builtin versioned ruleset.
    pub fn builtin() -> Self {
        use Classification::*;

        let mut rules = BTreeMap::new();

        rules.insert(
            RelationType::Supports,
            rule(
                "Source provides evidential or argumentative support for the target",
                &[Premise, Example, Citation, Quotation, Implication],
                &[Claim, Conclusion, Thesis, PositionStatement],
            ),
        );
        rules.insert(
            RelationType::Rebuts,
            rule(
                "Source attacks or undermines the target",
                &[Rebuttal, Conclusion],
                &[Claim, Premise, Thesis, PositionStatement],
            ),
        );
        rules.insert(
            RelationType::Elaborates,
            rule(
                "Source unpacks or develops the target",
                &[Premise, Definition, Distinction, Example, Implication],
                &[Claim, Premise, Definition, ProblemStatement, Thesis],
            ),
        );
        rules.insert(
            RelationType::Exemplifies,
            rule(
                "Source illustrates the target with a concrete instance",
                &[Example, Quotation, Citation],
                &[Claim, Premise, Definition, Distinction, Stipulation],
            ),
        );
        rules.insert(
            RelationType::Defines,
            rule(
                "Source fixes the meaning of a term the target relies on",
                &[Definition, Stipulation, Distinction],
                &[Claim, Premise, Inquiry, ProblemStatement, Thesis],
            ),
        );
        rules.insert(
            RelationType::Concedes,
            rule(
                "Source grants part of the target while maintaining a position",
                &[Concession],
                &[Claim, Premise, Rebuttal, PositionStatement],
            ),
        );
        rules.insert(
            RelationType::Answers,
            rule(
                "Source responds to a question or problem posed by the target",
                &[Claim, Conclusion, PositionStatement, Thesis],
                &[Inquiry, ProblemStatement],
            ),
        );
        rules.insert(
            RelationType::Cites,
            rule(
                "Source attributes the target to an external work",
                &[Citation, Quotation],
                &[Claim, Premise, Conclusion, PositionStatement, Thesis],
            ),
        );
        rules.insert(
            RelationType::Continues,
            rule(
                "Source carries on the same discourse unit as the target; \
                 any classification is admissible at either end",
                &[],
                &[],
            ),
        );

        Self {
            version: ONTOLOGY_VERSION.to_string(),
            rules,
        }
    }

    /// Load a versioned ontology table from JSON.
    ///
    /// The wire shape mirrors the configuration file:
    /// `{"version": "...", "relationships": {"Supports": {"description":
    /// "...", "valid_sources": [...], "valid_targets": [...]}, ...}}`.
    /// Every relationship key and every label must be a member of the
    /// closed enums; violations fail the load rather than surfacing later
    /// as runtime rejections.
    pub fn from_json(json: &str) -> Result<Self, OntologyError> {
        let raw: RawOntology = serde_json::from_str(json)?;
        if raw.relationships.is_empty() {
            return Err(OntologyError::Empty);
        }

        let mut rules = BTreeMap::new();
        for (key, raw_rule) in raw.relationships {
            let rel_type = RelationType::from_label(&key)
                .ok_or(OntologyError::UnknownRelationType(key))?;

            let valid_sources = parse_labels(rel_type, &raw_rule.valid_sources)?;
            let valid_targets = parse_labels(rel_type, &raw_rule.valid_targets)?;

            rules.insert(
                rel_type,
                OntologyRule {
                    description: raw_rule.description,
                    valid_sources,
                    valid_targets,
                },
            );
        }

        Ok(Self {
            version: raw.version,
            rules,
        })
    }

    /// Version string of this ruleset.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Look up the rule for a relationship type.
    ///
    /// Returns `None` when the type is not a key in the table (possible
    /// for custom tables loaded via [`Ontology::from_json`]).
    pub fn rule(&self, rel_type: RelationType) -> Option<&OntologyRule> {
        self.rules.get(&rel_type)
    }

    /// Whether the table has a rule for this type.
    pub fn contains(&self, rel_type: RelationType) -> bool {
        self.rules.contains_key(&rel_type)
    }

    /// Relationship types present in the table, in canonical order.
    pub fn relation_types(&self) -> impl Iterator<Item = RelationType> + '_ {
        self.rules.keys().copied()
    }
}

fn rule(
    description: &str,
    sources: &[Classification],
    targets: &[Classification],
) -> OntologyRule {
    OntologyRule {
        description: description.to_string(),
        valid_sources: sources.iter().copied().collect(),
        valid_targets: targets.iter().copied().collect(),
    }
}

fn parse_labels(
    rel_type: RelationType,
    labels: &[String],
) -> Result<BTreeSet<Classification>, OntologyError> {
    let mut set = BTreeSet::new();
    for label in labels {
        let class = Classification::from_label(label).ok_or_else(|| OntologyError::UnknownLabel {
            rel_type,
            label: label.clone(),
        })?;
        if class.is_error() && !rel_type.is_universal() {
            return Err(OntologyError::ErrorLabelNotUniversal(rel_type));
        }
        set.insert(class);
    }
    Ok(set)
}
