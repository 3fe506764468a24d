use serde::{Deserialize, Serialize};

use super::enums::{Partition, RecommendationAction};
use super::profile::MedicationMention;

/// A preferred agent with its dosing guidance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDosing {
    pub name: String,
    pub starting_dose: String,
    pub target_dose: String,
    pub titration_note: String,
    /// Per-administration target used to tell "at target" from "titrate".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_single_dose_mg: Option<f64>,
}

/// One medication-class recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationItem {
    pub rule_id: String,
    pub medication_class: String,
    pub priority_rank: u32,
    pub action: RecommendationAction,
    /// Chosen agent first, alternatives after.
    pub agents: Vec<AgentDosing>,
    pub instruction: String,
    pub rationale: String,
    /// The current medication this item continues, if any.
    pub current_medication: Option<MedicationMention>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// External extraction collaborator failed; local result used.
    ExtractionDegraded,
    /// Partition chosen from LVEF because no HF type was stated.
    PartitionInferred,
    /// Neither HF type nor LVEF known.
    UnclassifiedPatient,
    /// Stated HF type disagrees with the reported LVEF.
    ClassificationConflict,
    /// A contraindication removed a medication class.
    ContraindicationSuppressed,
    /// A rule or contraindication could not be evaluated.
    MissingData,
    /// No medication recommendation survived.
    NoSafeRecommendation,
    /// Current therapy the guideline advises against.
    SafetyCaution,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineWarning {
    pub kind: WarningKind,
    pub message: String,
}

impl EngineWarning {
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// How the guideline partition was chosen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "basis", rename_all = "snake_case")]
pub enum PartitionBasis {
    Stated,
    InferredFromLvef { lvef_percent: u8 },
    Unclassified,
}

/// Output of the rule evaluation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationSet {
    pub partition: Partition,
    pub partition_basis: PartitionBasis,
    pub guideline_source: String,
    pub guideline_version: String,
    /// Sorted by ascending priority rank, declaration order on ties.
    pub medication_recommendations: Vec<RecommendationItem>,
    pub monitoring_items: Vec<String>,
    pub lifestyle_items: Vec<String>,
    pub warnings: Vec<EngineWarning>,
}

impl RecommendationSet {
    pub fn has_warning(&self, kind: WarningKind) -> bool {
        self.warnings.iter().any(|w| w.kind == kind)
    }

    pub fn recommendation_for(&self, rule_id: &str) -> Option<&RecommendationItem> {
        self.medication_recommendations
            .iter()
            .find(|r| r.rule_id == rule_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warning_kind_serializes_snake_case() {
        let json = serde_json::to_string(&WarningKind::NoSafeRecommendation).unwrap();
        assert_eq!(json, "\"no_safe_recommendation\"");
    }

    #[test]
    fn partition_basis_is_tagged() {
        let json =
            serde_json::to_string(&PartitionBasis::InferredFromLvef { lvef_percent: 35 }).unwrap();
        assert!(json.contains("\"basis\":\"inferred_from_lvef\""));
        assert!(json.contains("\"lvef_percent\":35"));
    }
}
