use serde::{Deserialize, Serialize};

use crate::models::{DrugClass, PatientProfile, ProfileField};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmpOp {
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "==")]
    Eq,
}

impl CmpOp {
    pub fn apply(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            Self::Lt => lhs < rhs,
            Self::Le => lhs <= rhs,
            Self::Gt => lhs > rhs,
            Self::Ge => lhs >= rhs,
            Self::Eq => (lhs - rhs).abs() < f64::EPSILON,
        }
    }
}

/// Three-valued result: a comparison over an absent field is `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Truth {
    True,
    False,
    Unknown,
}

impl Truth {
    fn not(self) -> Self {
        match self {
            Self::True => Self::False,
            Self::False => Self::True,
            Self::Unknown => Self::Unknown,
        }
    }
}

impl From<bool> for Truth {
    fn from(b: bool) -> Self {
        if b {
            Self::True
        } else {
            Self::False
        }
    }
}

/// Closed set of rule conditions over named profile fields.
/// Built only through load-time validation, so every field, tag and agent is known.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Always,
    Compare {
        field: ProfileField,
        op: CmpOp,
        value: f64,
    },
    Known(ProfileField),
    HasComorbidity(String),
    OnClass(DrugClass),
    OnAgent(String),
    All(Vec<Predicate>),
    Any(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn evaluate(&self, profile: &PatientProfile) -> Truth {
        match self {
            Self::Always => Truth::True,
            Self::Compare { field, op, value } => match profile.value_of(*field) {
                Some(actual) => op.apply(actual, *value).into(),
                None => Truth::Unknown,
            },
            Self::Known(field) => profile.value_of(*field).is_some().into(),
            Self::HasComorbidity(tag) => profile.has_comorbidity(tag).into(),
            Self::OnClass(class) => profile.medication_in_class(*class).is_some().into(),
            Self::OnAgent(name) => profile.is_on_agent(name).into(),
            Self::All(preds) => {
                let mut unknown = false;
                for p in preds {
                    match p.evaluate(profile) {
                        Truth::False => return Truth::False,
                        Truth::Unknown => unknown = true,
                        Truth::True => {}
                    }
                }
                if unknown {
                    Truth::Unknown
                } else {
                    Truth::True
                }
            }
            Self::Any(preds) => {
                let mut unknown = false;
                for p in preds {
                    match p.evaluate(profile) {
                        Truth::True => return Truth::True,
                        Truth::Unknown => unknown = true,
                        Truth::False => {}
                    }
                }
                if unknown {
                    Truth::Unknown
                } else {
                    Truth::False
                }
            }
            Self::Not(inner) => inner.evaluate(profile).not(),
        }
    }

    /// Fields this predicate compares that the profile does not have.
    pub fn missing_fields(&self, profile: &PatientProfile) -> Vec<ProfileField> {
        let mut out = Vec::new();
        self.collect_missing(profile, &mut out);
        out
    }

    fn collect_missing(&self, profile: &PatientProfile, out: &mut Vec<ProfileField>) {
        match self {
            Self::Compare { field, .. } => {
                if profile.value_of(*field).is_none() && !out.contains(field) {
                    out.push(*field);
                }
            }
            Self::All(preds) | Self::Any(preds) => {
                for p in preds {
                    p.collect_missing(profile, out);
                }
            }
            Self::Not(inner) => inner.collect_missing(profile, out),
            _ => {}
        }
    }
}
