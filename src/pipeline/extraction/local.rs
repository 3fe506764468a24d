//! Local pattern-matching pass.
//!
//! An ordered list of matchers, one per attribute family. Each fills only
//! its own field and never overwrites a value an earlier matcher set.

use crate::models::{HfType, PatientProfile, Sex};

use super::comorbidities::find_tags;
use super::medications;
use super::patterns;

type Matcher = fn(&str, &mut PatientProfile);

/// Order matters where two matchers share a field: explicit HF type
/// keywords run before the generic heart-failure mention.
const MATCHERS: &[(&str, Matcher)] = &[
    ("age", match_age),
    ("sex", match_sex),
    ("hf_type_explicit", match_explicit_hf_type),
    ("hf_type_generic", match_generic_hf),
    ("lvef", match_lvef),
    ("nyha", match_nyha),
    ("medications", match_medications),
    ("comorbidities", match_comorbidities),
    ("labs", match_labs),
    ("vitals", match_vitals),
];

/// Run every matcher over already-sanitized text.
pub fn extract_local(text: &str) -> PatientProfile {
    let mut profile = PatientProfile::default();
    for (name, matcher) in MATCHERS {
        matcher(text, &mut profile);
        tracing::trace!(matcher = name, "Matcher applied");
    }
    profile
}

fn match_age(text: &str, profile: &mut PatientProfile) {
    if profile.age.is_none() {
        profile.age = patterns::find_age(text);
    }
}

fn match_sex(text: &str, profile: &mut PatientProfile) {
    if profile.sex == Sex::Unknown {
        profile.sex = patterns::find_sex(text).unwrap_or_default();
    }
}

fn match_explicit_hf_type(text: &str, profile: &mut PatientProfile) {
    if profile.hf_type.is_none() {
        profile.hf_type = patterns::find_explicit_hf_type(text);
    }
}

fn match_generic_hf(text: &str, profile: &mut PatientProfile) {
    if profile.hf_type.is_none() && patterns::mentions_heart_failure(text) {
        profile.hf_type = Some(HfType::Unspecified);
    }
}

fn match_lvef(text: &str, profile: &mut PatientProfile) {
    if profile.lvef_percent.is_none() {
        profile.lvef_percent = patterns::find_lvef(text);
    }
}

fn match_nyha(text: &str, profile: &mut PatientProfile) {
    if profile.nyha_class.is_none() {
        profile.nyha_class = patterns::find_nyha(text);
    }
}

fn match_medications(text: &str, profile: &mut PatientProfile) {
    let scan = medications::scan(text);
    for mention in scan.current {
        profile.add_medication(mention);
    }
    for class in scan.intolerances {
        profile.comorbidities.insert(class.intolerance_tag());
    }
}

fn match_comorbidities(text: &str, profile: &mut PatientProfile) {
    profile.comorbidities.extend(find_tags(text));
}

fn match_labs(text: &str, profile: &mut PatientProfile) {
    for (kind, value) in patterns::find_labs(text) {
        let slot = kind.slot(&mut profile.labs);
        if slot.is_none() {
            *slot = Some(value);
        }
    }
}

fn match_vitals(text: &str, profile: &mut PatientProfile) {
    if profile.vitals.systolic_bp.is_none() {
        if let Some((sys, dia)) = patterns::find_blood_pressure(text) {
            profile.vitals.systolic_bp = Some(sys);
            profile.vitals.diastolic_bp = Some(dia);
        }
    }
    if profile.vitals.heart_rate.is_none() {
        profile.vitals.heart_rate = patterns::find_heart_rate(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DrugClass, NyhaClass};

    #[test]
    fn scenario_age_sex_lvef() {
        let profile = extract_local("65-year-old male with heart failure, LVEF 35%");
        assert_eq!(profile.age, Some(65));
        assert_eq!(profile.sex, Sex::Male);
        assert_eq!(profile.lvef_percent, Some(35));
        assert_eq!(profile.hf_type, Some(HfType::Unspecified));
    }

    #[test]
    fn explicit_type_outranks_generic_mention() {
        let profile = extract_local("Heart failure follow-up. Known HFpEF, EF 55%.");
        assert_eq!(profile.hf_type, Some(HfType::Preserved));
    }

    #[test]
    fn medications_and_intolerance() {
        let profile = extract_local(
            "HFrEF, NYHA class III. On carvedilol 12.5 mg BID and furosemide 40 mg daily. \
             Intolerant to lisinopril (angioedema).",
        );
        assert_eq!(profile.nyha_class, Some(NyhaClass::ClassIII));
        let names: Vec<&str> = profile
            .current_medications
            .iter()
            .map(|m| m.name.as_str())
            .collect();
        assert_eq!(names, vec!["carvedilol", "furosemide"]);
        assert!(profile.has_comorbidity("angioedema"));
        assert!(profile.has_comorbidity(&DrugClass::AceInhibitor.intolerance_tag()));
    }

    #[test]
    fn labs_and_vitals() {
        let profile = extract_local("BP 104/62, HR 58. K 5.3, creatinine 1.9, eGFR 34.");
        assert_eq!(profile.vitals.systolic_bp, Some(104));
        assert_eq!(profile.vitals.diastolic_bp, Some(62));
        assert_eq!(profile.vitals.heart_rate, Some(58));
        assert_eq!(profile.labs.potassium, Some(5.3));
        assert_eq!(profile.labs.creatinine, Some(1.9));
        assert_eq!(profile.labs.egfr, Some(34.0));
    }

    #[test]
    fn nothing_recognized_stays_unknown() {
        let profile = extract_local("Routine visit.");
        assert!(profile.is_empty());
        assert_eq!(profile.lvef_percent, None);
    }
}
