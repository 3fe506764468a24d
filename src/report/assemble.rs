use crate::models::{MedicationMention, PatientProfile, RecommendationSet};

use super::{
    GuidelineCitation, LabReading, MedicationAnalysis, MedicationStatus, PatientSummary, Report,
};

/// Merge the profile and the engine output into a report.
///
/// No clinical logic lives here. Inputs that break the engine's ordering
/// contract are a programming error.
pub fn assemble(profile: &PatientProfile, recs: &RecommendationSet) -> Report {
    debug_assert!(
        recs.medication_recommendations
            .windows(2)
            .all(|w| w[0].priority_rank <= w[1].priority_rank),
        "recommendations must be sorted by priority rank"
    );

    Report {
        summary: summarize(profile, recs),
        medication_analysis: profile
            .current_medications
            .iter()
            .map(|m| analyze(m, recs))
            .collect(),
        recommendations: recs.medication_recommendations.clone(),
        monitoring: recs.monitoring_items.clone(),
        lifestyle: recs.lifestyle_items.clone(),
        warnings: recs.warnings.clone(),
        guideline: GuidelineCitation {
            source: recs.guideline_source.clone(),
            version: recs.guideline_version.clone(),
        },
    }
}

fn summarize(profile: &PatientProfile, recs: &RecommendationSet) -> PatientSummary {
    let blood_pressure = match (profile.vitals.systolic_bp, profile.vitals.diastolic_bp) {
        (Some(sys), Some(dia)) => Some(format!("{sys}/{dia} mmHg")),
        (Some(sys), None) => Some(format!("{sys} mmHg systolic")),
        _ => None,
    };

    PatientSummary {
        age: profile.age,
        sex: profile.sex,
        hf_type: profile
            .hf_type
            .map(|t| t.as_str().to_string())
            .unwrap_or_else(|| "not stated".to_string()),
        partition: recs.partition,
        partition_basis: recs.partition_basis.clone(),
        lvef_percent: profile.lvef_percent,
        nyha_class: profile.nyha_class.map(|n| n.as_str().to_string()),
        comorbidities: profile.comorbidities.iter().cloned().collect(),
        labs: profile
            .labs
            .readings()
            .into_iter()
            .map(|(name, value, unit)| LabReading {
                name: name.to_string(),
                value,
                unit: unit.to_string(),
            })
            .collect(),
        blood_pressure,
        heart_rate: profile.vitals.heart_rate,
        extraction: profile.provenance.clone(),
    }
}

fn analyze(med: &MedicationMention, recs: &RecommendationSet) -> MedicationAnalysis {
    let covering = recs.medication_recommendations.iter().find(|r| {
        r.current_medication
            .as_ref()
            .is_some_and(|c| c.name == med.name)
    });

    let (status, rule_id, note) = match (covering, med.drug_class) {
        (Some(item), _) => (
            MedicationStatus::GuidelineDirected,
            Some(item.rule_id.clone()),
            format!("{}: {}", item.medication_class, item.action),
        ),
        (None, Some(class)) => (
            MedicationStatus::Other,
            None,
            format!("{} (not part of the recommended regimen)", class.label()),
        ),
        (None, None) => (
            MedicationStatus::Unrecognized,
            None,
            "Not in the medication catalogue; review manually".to_string(),
        ),
    };

    MedicationAnalysis {
        name: med.name.clone(),
        mentioned_as: med.mentioned_as.clone(),
        dose: med.dose.clone(),
        frequency: med.frequency.clone(),
        drug_class: med.drug_class,
        status,
        rule_id,
        note,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guidelines::bundled;
    use crate::intelligence::evaluate;
    use crate::models::{DrugClass, Partition};
    use crate::pipeline::extraction::extract;
    use crate::report::SECTIONS;

    fn report_for(note: &str) -> Report {
        let profile = extract(note).unwrap();
        let recs = evaluate(&profile, bundled().unwrap());
        assemble(&profile, &recs)
    }

    #[test]
    fn sections_serialize_in_fixed_order() {
        let report = report_for("65-year-old male with heart failure, LVEF 35%");
        let json = serde_json::to_string(&report).unwrap();
        let positions: Vec<usize> = SECTIONS
            .iter()
            .map(|s| json.find(&format!("\"{s}\":")).unwrap())
            .collect();
        let mut sorted = positions.clone();
        sorted.sort();
        assert_eq!(positions, sorted);
    }

    #[test]
    fn summary_reflects_profile_and_partition() {
        let report = report_for("65-year-old male with HFrEF, LVEF 30%, NYHA II. BP 110/70.");
        assert_eq!(report.summary.age, Some(65));
        assert_eq!(report.summary.hf_type, "HFrEF");
        assert_eq!(report.summary.partition, Partition::Reduced);
        assert_eq!(report.summary.nyha_class.as_deref(), Some("II"));
        assert_eq!(report.summary.blood_pressure.as_deref(), Some("110/70 mmHg"));
    }

    #[test]
    fn medications_are_classified() {
        let report = report_for("HFrEF, EF 30%. On carvedilol 6.25 mg BID and ibuprofen 400 mg TID.");
        let carvedilol = &report.medication_analysis[0];
        assert_eq!(carvedilol.name, "carvedilol");
        assert_eq!(carvedilol.status, MedicationStatus::GuidelineDirected);
        assert_eq!(carvedilol.rule_id.as_deref(), Some("hfref-beta-blocker"));

        let ibuprofen = &report.medication_analysis[1];
        assert_eq!(ibuprofen.drug_class, Some(DrugClass::Nsaid));
        assert_eq!(ibuprofen.status, MedicationStatus::Other);
    }

    #[test]
    fn assemble_is_deterministic() {
        let profile = extract("HFpEF, EF 58%, on furosemide 20 mg daily").unwrap();
        let recs = evaluate(&profile, bundled().unwrap());
        assert_eq!(assemble(&profile, &recs), assemble(&profile, &recs));
    }

    #[test]
    fn citation_carries_table_version() {
        let report = report_for("heart failure, LVEF 45%");
        assert_eq!(report.guideline.version, bundled().unwrap().version);
    }
}
