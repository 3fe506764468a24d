use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::enums::{DrugClass, HfType, NyhaClass, ProfileField, Sex};

/// Attributes extracted from one clinical note.
///
/// Every field starts out unknown. A missing value is never a clinical
/// negative: an absent LVEF is `None`, not `Some(0)`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PatientProfile {
    pub age: Option<u32>,
    pub sex: Sex,
    pub hf_type: Option<HfType>,
    pub lvef_percent: Option<u8>,
    pub nyha_class: Option<NyhaClass>,
    /// One entry per distinct agent, in order of first mention.
    pub current_medications: Vec<MedicationMention>,
    pub comorbidities: BTreeSet<String>,
    pub labs: LabValues,
    pub vitals: Vitals,
    pub provenance: ExtractionProvenance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationMention {
    /// Canonical generic name, lowercase.
    pub name: String,
    /// The name as written in the note (brand or generic).
    pub mentioned_as: String,
    pub drug_class: Option<DrugClass>,
    pub dose: Option<String>,
    pub dose_mg: Option<f64>,
    pub frequency: Option<String>,
    /// Text span the mention was read from.
    pub span: String,
}

impl MedicationMention {
    /// "carvedilol 6.25 mg twice daily"
    pub fn describe(&self) -> String {
        let mut out = self.name.clone();
        if let Some(dose) = &self.dose {
            out.push(' ');
            out.push_str(dose);
        }
        if let Some(freq) = &self.frequency {
            out.push(' ');
            out.push_str(freq);
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LabValues {
    /// mEq/L
    pub potassium: Option<f64>,
    /// mEq/L
    pub sodium: Option<f64>,
    /// mg/dL
    pub creatinine: Option<f64>,
    /// mL/min/1.73m²
    pub egfr: Option<f64>,
    /// mg/dL
    pub bun: Option<f64>,
    /// pg/mL
    pub bnp: Option<f64>,
    /// pg/mL
    pub nt_probnp: Option<f64>,
    /// g/dL
    pub hemoglobin: Option<f64>,
}

impl LabValues {
    pub fn is_empty(&self) -> bool {
        self.readings().is_empty()
    }

    /// Known values with display name and unit, in a fixed order.
    pub fn readings(&self) -> Vec<(&'static str, f64, &'static str)> {
        [
            ("Potassium", self.potassium, "mEq/L"),
            ("Sodium", self.sodium, "mEq/L"),
            ("Creatinine", self.creatinine, "mg/dL"),
            ("eGFR", self.egfr, "mL/min/1.73m²"),
            ("BUN", self.bun, "mg/dL"),
            ("BNP", self.bnp, "pg/mL"),
            ("NT-proBNP", self.nt_probnp, "pg/mL"),
            ("Hemoglobin", self.hemoglobin, "g/dL"),
        ]
        .into_iter()
        .filter_map(|(name, value, unit)| value.map(|v| (name, v, unit)))
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Vitals {
    pub systolic_bp: Option<u32>,
    pub diastolic_bp: Option<u32>,
    pub heart_rate: Option<u32>,
}

/// How the profile was produced.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ExtractionProvenance {
    /// Local pattern matching only; no collaborator configured.
    #[default]
    LocalOnly,
    /// Local pass merged with the external collaborator's output.
    Merged { filled_fields: Vec<String> },
    /// A collaborator was configured but failed; local result used.
    Degraded { reason: String },
}

impl PatientProfile {
    /// Numeric view of a profile field, `None` when unknown.
    pub fn value_of(&self, field: ProfileField) -> Option<f64> {
        match field {
            ProfileField::Age => self.age.map(f64::from),
            ProfileField::LvefPercent => self.lvef_percent.map(f64::from),
            ProfileField::NyhaClass => self.nyha_class.map(|n| f64::from(n.as_number())),
            ProfileField::Potassium => self.labs.potassium,
            ProfileField::Sodium => self.labs.sodium,
            ProfileField::Creatinine => self.labs.creatinine,
            ProfileField::Egfr => self.labs.egfr,
            ProfileField::Bun => self.labs.bun,
            ProfileField::Bnp => self.labs.bnp,
            ProfileField::NtProbnp => self.labs.nt_probnp,
            ProfileField::Hemoglobin => self.labs.hemoglobin,
            ProfileField::SystolicBp => self.vitals.systolic_bp.map(f64::from),
            ProfileField::DiastolicBp => self.vitals.diastolic_bp.map(f64::from),
            ProfileField::HeartRate => self.vitals.heart_rate.map(f64::from),
        }
    }

    /// First current medication belonging to `class`.
    pub fn medication_in_class(&self, class: DrugClass) -> Option<&MedicationMention> {
        self.current_medications
            .iter()
            .find(|m| m.drug_class == Some(class))
    }

    pub fn is_on_agent(&self, name: &str) -> bool {
        self.current_medications
            .iter()
            .any(|m| m.name.eq_ignore_ascii_case(name))
    }

    pub fn has_comorbidity(&self, tag: &str) -> bool {
        self.comorbidities.contains(tag)
    }

    /// Adds a medication unless the same agent is already recorded.
    /// A later mention only fills dose/frequency the first one lacked.
    pub fn add_medication(&mut self, mention: MedicationMention) {
        if let Some(existing) = self
            .current_medications
            .iter_mut()
            .find(|m| m.name == mention.name)
        {
            if existing.dose.is_none() {
                existing.dose = mention.dose;
                existing.dose_mg = mention.dose_mg;
            }
            if existing.frequency.is_none() {
                existing.frequency = mention.frequency;
            }
            return;
        }
        self.current_medications.push(mention);
    }

    /// True when nothing at all was extracted.
    pub fn is_empty(&self) -> bool {
        self.age.is_none()
            && self.sex == Sex::Unknown
            && self.hf_type.is_none()
            && self.lvef_percent.is_none()
            && self.nyha_class.is_none()
            && self.current_medications.is_empty()
            && self.comorbidities.is_empty()
            && self.labs.is_empty()
            && self.vitals == Vitals::default()
    }
}
