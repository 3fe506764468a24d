use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{AgentDosing, DrugClass, Partition};

use super::predicate::{CmpOp, Predicate};

// ---------------------------------------------------------------------------
// Raw table (as read from JSON, before validation)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct RawGuidelineTable {
    pub version: Option<String>,
    pub source: Option<String>,
    pub published: Option<NaiveDate>,
    pub lvef_cutoffs: Option<LvefCutoffs>,
    #[serde(default)]
    pub baseline_monitoring: Vec<String>,
    #[serde(default)]
    pub baseline_lifestyle: Vec<String>,
    #[serde(default)]
    pub advisories: Vec<RawAdvisory>,
    #[serde(default)]
    pub partitions: BTreeMap<String, Vec<RawRule>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawRule {
    pub id: Option<String>,
    pub medication_class: Option<String>,
    pub priority_rank: Option<u32>,
    #[serde(default)]
    pub drug_classes: Vec<String>,
    pub applies_when: Option<RawPredicate>,
    #[serde(default)]
    pub preferred_agents: Vec<RawAgent>,
    #[serde(default)]
    pub contraindications: Vec<RawContraindication>,
    #[serde(default)]
    pub monitoring_actions: Vec<String>,
    #[serde(default)]
    pub lifestyle_advice: Vec<String>,
    pub rationale: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawAgent {
    pub name: Option<String>,
    pub starting_dose: Option<String>,
    pub target_dose: Option<String>,
    #[serde(default)]
    pub titration_note: String,
    pub target_single_dose_mg: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawContraindication {
    pub reason: Option<String>,
    pub when: Option<RawPredicate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawAdvisory {
    pub id: Option<String>,
    pub section: AdvisorySection,
    #[serde(default)]
    pub partitions: Vec<String>,
    pub when: Option<RawPredicate>,
    pub text: Option<String>,
}

/// Predicate as written in the table. Field, tag and agent names are
/// checked and resolved during validation.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub(crate) enum RawPredicate {
    Always,
    Compare {
        field: String,
        cmp: CmpOp,
        value: f64,
    },
    Known {
        field: String,
    },
    HasComorbidity {
        tag: String,
    },
    OnClass {
        class: String,
    },
    OnAgent {
        agent: String,
    },
    All {
        of: Vec<RawPredicate>,
    },
    Any {
        of: Vec<RawPredicate>,
    },
    Not {
        of: Box<RawPredicate>,
    },
}

// ---------------------------------------------------------------------------
// Validated knowledge base
// ---------------------------------------------------------------------------

/// LVEF thresholds used to infer a partition when no HF type is stated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LvefCutoffs {
    /// Highest LVEF still classed as reduced.
    pub reduced_max: u8,
    /// Lowest LVEF classed as preserved.
    pub preserved_min: u8,
}

impl LvefCutoffs {
    pub fn classify(&self, lvef_percent: u8) -> Partition {
        if lvef_percent <= self.reduced_max {
            Partition::Reduced
        } else if lvef_percent >= self.preserved_min {
            Partition::Preserved
        } else {
            Partition::MildlyReduced
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisorySection {
    Monitoring,
    Lifestyle,
    Warning,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Contraindication {
    pub reason: String,
    pub when: Predicate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GuidelineRule {
    pub id: String,
    pub medication_class: String,
    /// Classes that count as "already on this therapy".
    pub drug_classes: Vec<DrugClass>,
    pub applies_when: Predicate,
    pub preferred_agents: Vec<AgentDosing>,
    pub contraindications: Vec<Contraindication>,
    pub monitoring_actions: Vec<String>,
    pub lifestyle_advice: Vec<String>,
    pub rationale: String,
    pub priority_rank: u32,
}

/// Conditional item outside any medication rule (device evaluation,
/// class-specific monitoring, safety cautions).
#[derive(Debug, Clone, PartialEq)]
pub struct Advisory {
    pub id: String,
    pub section: AdvisorySection,
    /// Empty means every partition.
    pub partitions: Vec<Partition>,
    pub when: Predicate,
    pub text: String,
}

impl Advisory {
    pub fn applies_to(&self, partition: Partition) -> bool {
        self.partitions.is_empty() || self.partitions.contains(&partition)
    }
}

/// Read-only guideline table. Built once by [`super::load_from_str`] and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeBase {
    pub version: String,
    pub source: String,
    pub published: Option<NaiveDate>,
    pub cutoffs: LvefCutoffs,
    pub baseline_monitoring: Vec<String>,
    pub baseline_lifestyle: Vec<String>,
    pub advisories: Vec<Advisory>,
    pub(crate) partitions: BTreeMap<Partition, Vec<GuidelineRule>>,
}

impl KnowledgeBase {
    /// Rules of a partition in declaration order.
    pub fn rules(&self, partition: Partition) -> &[GuidelineRule] {
        self.partitions
            .get(&partition)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn rule(&self, id: &str) -> Option<&GuidelineRule> {
        self.partitions.values().flatten().find(|r| r.id == id)
    }

    pub fn rule_count(&self) -> usize {
        self.partitions.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cutoffs_classify_guideline_bands() {
        let cutoffs = LvefCutoffs {
            reduced_max: 40,
            preserved_min: 50,
        };
        assert_eq!(cutoffs.classify(35), Partition::Reduced);
        assert_eq!(cutoffs.classify(40), Partition::Reduced);
        assert_eq!(cutoffs.classify(41), Partition::MildlyReduced);
        assert_eq!(cutoffs.classify(49), Partition::MildlyReduced);
        assert_eq!(cutoffs.classify(50), Partition::Preserved);
        assert_eq!(cutoffs.classify(60), Partition::Preserved);
    }

    #[test]
    fn advisory_without_partitions_applies_everywhere() {
        let advisory = Advisory {
            id: "x".into(),
            section: AdvisorySection::Lifestyle,
            partitions: vec![],
            when: Predicate::Always,
            text: "x".into(),
        };
        assert!(advisory.applies_to(Partition::Unclassified));
        let scoped = Advisory {
            partitions: vec![Partition::Reduced],
            ..advisory
        };
        assert!(scoped.applies_to(Partition::Reduced));
        assert!(!scoped.applies_to(Partition::Preserved));
    }

    #[test]
    fn raw_predicate_parses_tagged_json() {
        let json = r#"{"op":"all","of":[
            {"op":"compare","field":"lvef_percent","cmp":"<=","value":35},
            {"op":"not","of":{"op":"on_class","class":"arni"}}
        ]}"#;
        let parsed: RawPredicate = serde_json::from_str(json).unwrap();
        match parsed {
            RawPredicate::All { of } => assert_eq!(of.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
    }
}
