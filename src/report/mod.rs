//! Final report handed to front ends. Presentation-independent; the
//! Markdown renderer is one optional view of it.

pub mod assemble;
pub mod render;

pub use assemble::assemble;
pub use render::to_markdown;

use serde::{Deserialize, Serialize};

use crate::models::{
    DrugClass, EngineWarning, ExtractionProvenance, Partition, PartitionBasis,
    RecommendationItem, Sex,
};

/// Section names in output order. Serialization follows the struct field
/// order, which matches this list.
pub const SECTIONS: [&str; 6] = [
    "summary",
    "medication_analysis",
    "recommendations",
    "monitoring",
    "lifestyle",
    "warnings",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub summary: PatientSummary,
    pub medication_analysis: Vec<MedicationAnalysis>,
    pub recommendations: Vec<RecommendationItem>,
    pub monitoring: Vec<String>,
    pub lifestyle: Vec<String>,
    pub warnings: Vec<EngineWarning>,
    pub guideline: GuidelineCitation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientSummary {
    pub age: Option<u32>,
    pub sex: Sex,
    /// Stated type, or "not stated".
    pub hf_type: String,
    pub partition: Partition,
    pub partition_basis: PartitionBasis,
    pub lvef_percent: Option<u8>,
    pub nyha_class: Option<String>,
    pub comorbidities: Vec<String>,
    pub labs: Vec<LabReading>,
    pub blood_pressure: Option<String>,
    pub heart_rate: Option<u32>,
    pub extraction: ExtractionProvenance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabReading {
    pub name: String,
    pub value: f64,
    pub unit: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MedicationStatus {
    /// Addressed by a recommendation (continue or titrate).
    GuidelineDirected,
    /// Known agent outside the recommended classes.
    Other,
    /// Not in the medication catalogue.
    Unrecognized,
}

impl MedicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GuidelineDirected => "guideline-directed",
            Self::Other => "other",
            Self::Unrecognized => "unrecognized",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationAnalysis {
    pub name: String,
    pub mentioned_as: String,
    pub dose: Option<String>,
    pub frequency: Option<String>,
    pub drug_class: Option<DrugClass>,
    pub status: MedicationStatus,
    /// Rule whose recommendation covers this medication.
    pub rule_id: Option<String>,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuidelineCitation {
    pub source: String,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn medication_status_serializes_snake_case() {
        let json = serde_json::to_string(&MedicationStatus::GuidelineDirected).unwrap();
        assert_eq!(json, "\"guideline_directed\"");
    }
}
