//! Field-precedence merge of collaborator output into the local profile.
//!
//! External values only fill what the local pass left unknown. A generic
//! `Unspecified` HF type counts as unknown for a specific external type.
//! Set-valued fields are unioned.

use crate::models::{HfType, PatientProfile, ProfileField, Sex};

/// Merge `external` into `local`; returns the names of the fields filled.
pub fn merge_profiles(local: &mut PatientProfile, external: PatientProfile) -> Vec<String> {
    let mut filled = Vec::new();

    fill(&mut local.age, external.age, "age", &mut filled);
    if local.sex == Sex::Unknown && external.sex != Sex::Unknown {
        local.sex = external.sex;
        filled.push("sex".to_string());
    }
    match (local.hf_type, external.hf_type) {
        (None, Some(t)) => {
            local.hf_type = Some(t);
            filled.push("hf_type".to_string());
        }
        (Some(HfType::Unspecified), Some(t)) if t.is_specific() => {
            local.hf_type = Some(t);
            filled.push("hf_type".to_string());
        }
        _ => {}
    }
    fill(
        &mut local.lvef_percent,
        external.lvef_percent,
        ProfileField::LvefPercent.as_str(),
        &mut filled,
    );
    fill(
        &mut local.nyha_class,
        external.nyha_class,
        ProfileField::NyhaClass.as_str(),
        &mut filled,
    );

    let labs = [
        (ProfileField::Potassium, &mut local.labs.potassium, external.labs.potassium),
        (ProfileField::Sodium, &mut local.labs.sodium, external.labs.sodium),
        (ProfileField::Creatinine, &mut local.labs.creatinine, external.labs.creatinine),
        (ProfileField::Egfr, &mut local.labs.egfr, external.labs.egfr),
        (ProfileField::Bun, &mut local.labs.bun, external.labs.bun),
        (ProfileField::Bnp, &mut local.labs.bnp, external.labs.bnp),
        (ProfileField::NtProbnp, &mut local.labs.nt_probnp, external.labs.nt_probnp),
        (ProfileField::Hemoglobin, &mut local.labs.hemoglobin, external.labs.hemoglobin),
    ];
    for (field, slot, value) in labs {
        fill(slot, value, field.as_str(), &mut filled);
    }

    let vitals = [
        (ProfileField::SystolicBp, &mut local.vitals.systolic_bp, external.vitals.systolic_bp),
        (ProfileField::DiastolicBp, &mut local.vitals.diastolic_bp, external.vitals.diastolic_bp),
        (ProfileField::HeartRate, &mut local.vitals.heart_rate, external.vitals.heart_rate),
    ];
    for (field, slot, value) in vitals {
        fill(slot, value, field.as_str(), &mut filled);
    }

    let before = local.current_medications.clone();
    for mention in external.current_medications {
        local.add_medication(mention);
    }
    if local.current_medications != before {
        filled.push("current_medications".to_string());
    }

    let known = local.comorbidities.len();
    local.comorbidities.extend(external.comorbidities);
    if local.comorbidities.len() > known {
        filled.push("comorbidities".to_string());
    }

    filled
}

fn fill<T>(slot: &mut Option<T>, value: Option<T>, name: &str, filled: &mut Vec<String>) {
    if slot.is_none() && value.is_some() {
        *slot = value;
        filled.push(name.to_string());
    }
}
