use serde::{Deserialize, Serialize};

use super::ModelError;

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// The string form is also the serde form.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }

            pub fn all() -> &'static [$name] {
                &[$(Self::$variant),+]
            }
        }

        impl std::str::FromStr for $name {
            type Err = ModelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(ModelError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(Sex {
    Male => "male",
    Female => "female",
    Unknown => "unknown",
});

impl Default for Sex {
    fn default() -> Self {
        Self::Unknown
    }
}

str_enum!(HfType {
    Reduced => "HFrEF",
    MildlyReduced => "HFmrEF",
    Preserved => "HFpEF",
    Unspecified => "unspecified",
});

impl HfType {
    /// Guideline partition for an explicitly typed patient.
    /// `Unspecified` carries no partition; the engine falls back to LVEF.
    pub fn partition(&self) -> Option<Partition> {
        match self {
            Self::Reduced => Some(Partition::Reduced),
            Self::MildlyReduced => Some(Partition::MildlyReduced),
            Self::Preserved => Some(Partition::Preserved),
            Self::Unspecified => None,
        }
    }

    /// Whether this value is specific enough to outrank a weaker mention.
    pub fn is_specific(&self) -> bool {
        !matches!(self, Self::Unspecified)
    }
}

str_enum!(NyhaClass {
    ClassI => "I",
    ClassII => "II",
    ClassIII => "III",
    ClassIV => "IV",
});

impl NyhaClass {
    pub fn as_number(&self) -> u8 {
        match self {
            Self::ClassI => 1,
            Self::ClassII => 2,
            Self::ClassIII => 3,
            Self::ClassIV => 4,
        }
    }

    /// Accepts roman (`III`) or arabic (`3`) numerals, any case.
    pub fn from_numeral(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "I" | "1" => Some(Self::ClassI),
            "II" | "2" => Some(Self::ClassII),
            "III" | "3" => Some(Self::ClassIII),
            "IV" | "4" => Some(Self::ClassIV),
            _ => None,
        }
    }
}

str_enum!(Partition {
    Reduced => "HFrEF",
    MildlyReduced => "HFmrEF",
    Preserved => "HFpEF",
    Unclassified => "unclassified",
});

str_enum!(DrugClass {
    AceInhibitor => "ace_inhibitor",
    Arb => "arb",
    Arni => "arni",
    BetaBlocker => "beta_blocker",
    Mra => "mra",
    Sglt2Inhibitor => "sglt2_inhibitor",
    LoopDiuretic => "loop_diuretic",
    ThiazideDiuretic => "thiazide_diuretic",
    Digoxin => "digoxin",
    Ivabradine => "ivabradine",
    HydralazineNitrate => "hydralazine_nitrate",
    SgcStimulator => "sgc_stimulator",
    Nsaid => "nsaid",
    NonDhpCcb => "non_dhp_ccb",
    Thiazolidinedione => "thiazolidinedione",
    PotassiumSupplement => "potassium_supplement",
});

impl DrugClass {
    pub fn label(&self) -> &'static str {
        match self {
            Self::AceInhibitor => "ACE inhibitor",
            Self::Arb => "ARB",
            Self::Arni => "ARNI",
            Self::BetaBlocker => "Beta-blocker",
            Self::Mra => "MRA",
            Self::Sglt2Inhibitor => "SGLT2 inhibitor",
            Self::LoopDiuretic => "Loop diuretic",
            Self::ThiazideDiuretic => "Thiazide diuretic",
            Self::Digoxin => "Digoxin",
            Self::Ivabradine => "Ivabradine",
            Self::HydralazineNitrate => "Hydralazine/nitrate",
            Self::SgcStimulator => "sGC stimulator",
            Self::Nsaid => "NSAID",
            Self::NonDhpCcb => "Non-dihydropyridine CCB",
            Self::Thiazolidinedione => "Thiazolidinedione",
            Self::PotassiumSupplement => "Potassium supplement",
        }
    }

    /// Comorbidity tag recorded when the note reports intolerance to the class.
    pub fn intolerance_tag(&self) -> String {
        format!("{}_intolerance", self.as_str())
    }
}

str_enum!(ProfileField {
    Age => "age",
    LvefPercent => "lvef_percent",
    NyhaClass => "nyha_class",
    Potassium => "potassium",
    Sodium => "sodium",
    Creatinine => "creatinine",
    Egfr => "egfr",
    Bun => "bun",
    Bnp => "bnp",
    NtProbnp => "nt_probnp",
    Hemoglobin => "hemoglobin",
    SystolicBp => "systolic_bp",
    DiastolicBp => "diastolic_bp",
    HeartRate => "heart_rate",
});

impl ProfileField {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Age => "age",
            Self::LvefPercent => "LVEF",
            Self::NyhaClass => "NYHA class",
            Self::Potassium => "potassium",
            Self::Sodium => "sodium",
            Self::Creatinine => "creatinine",
            Self::Egfr => "eGFR",
            Self::Bun => "BUN",
            Self::Bnp => "BNP",
            Self::NtProbnp => "NT-proBNP",
            Self::Hemoglobin => "hemoglobin",
            Self::SystolicBp => "systolic blood pressure",
            Self::DiastolicBp => "diastolic blood pressure",
            Self::HeartRate => "heart rate",
        }
    }
}

str_enum!(RecommendationAction {
    Initiate => "initiate",
    Titrate => "titrate",
    Continue => "continue",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hf_type_round_trips_through_str() {
        for t in HfType::all() {
            assert_eq!(t.as_str().parse::<HfType>().unwrap(), *t);
        }
    }

    #[test]
    fn hf_type_serializes_as_guideline_abbreviation() {
        let json = serde_json::to_string(&HfType::Reduced).unwrap();
        assert_eq!(json, "\"HFrEF\"");
    }

    #[test]
    fn unknown_partition_rejected() {
        let err = "HFxEF".parse::<Partition>().unwrap_err();
        assert!(err.to_string().contains("HFxEF"));
    }

    #[test]
    fn nyha_numerals_accept_roman_and_arabic() {
        assert_eq!(NyhaClass::from_numeral("iii"), Some(NyhaClass::ClassIII));
        assert_eq!(NyhaClass::from_numeral("2"), Some(NyhaClass::ClassII));
        assert_eq!(NyhaClass::from_numeral("V"), None);
        assert_eq!(NyhaClass::ClassIV.as_number(), 4);
    }

    #[test]
    fn unspecified_hf_type_has_no_partition() {
        assert_eq!(HfType::Unspecified.partition(), None);
        assert!(!HfType::Unspecified.is_specific());
        assert_eq!(HfType::Preserved.partition(), Some(Partition::Preserved));
    }

    #[test]
    fn sex_defaults_to_unknown() {
        assert_eq!(Sex::default(), Sex::Unknown);
    }

    #[test]
    fn intolerance_tag_uses_class_key() {
        assert_eq!(
            DrugClass::AceInhibitor.intolerance_tag(),
            "ace_inhibitor_intolerance"
        );
    }
}
