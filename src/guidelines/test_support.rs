//! Guideline tables for unit tests.

/// Minimal valid table; tests splice HFrEF rules into it.
pub fn table_with(hfref_rules: &str) -> String {
    format!(
        r#"{{
  "version": "test-1",
  "source": "Test table",
  "lvef_cutoffs": {{ "reduced_max": 40, "preserved_min": 50 }},
  "partitions": {{
    "HFrEF": [{hfref_rules}],
    "HFmrEF": [{{
      "id": "mr-sglt2", "medication_class": "SGLT2 inhibitor", "priority_rank": 1,
      "drug_classes": ["sglt2_inhibitor"], "applies_when": {{"op": "always"}},
      "preferred_agents": [{{"name": "dapagliflozin", "starting_dose": "10 mg daily", "target_dose": "10 mg daily"}}],
      "rationale": "r"
    }}],
    "HFpEF": [{{
      "id": "p-sglt2", "medication_class": "SGLT2 inhibitor", "priority_rank": 1,
      "drug_classes": ["sglt2_inhibitor"], "applies_when": {{"op": "always"}},
      "preferred_agents": [{{"name": "empagliflozin", "starting_dose": "10 mg daily", "target_dose": "10 mg daily"}}],
      "rationale": "r"
    }}],
    "unclassified": [{{
      "id": "u-acei", "medication_class": "ACE inhibitor", "priority_rank": 1,
      "drug_classes": ["ace_inhibitor"], "applies_when": {{"op": "always"}},
      "preferred_agents": [{{"name": "lisinopril", "starting_dose": "2.5 mg daily", "target_dose": "20 mg daily"}}],
      "rationale": "r"
    }}]
  }}
}}"#
    )
}

pub const ACEI_RULE: &str = r#"{
  "id": "r-acei", "medication_class": "ACE inhibitor", "priority_rank": 10,
  "drug_classes": ["ace_inhibitor", "arb", "arni"], "applies_when": {"op": "always"},
  "preferred_agents": [{"name": "lisinopril", "starting_dose": "2.5 mg daily", "target_dose": "20 mg daily"}],
  "rationale": "r"
}"#;
