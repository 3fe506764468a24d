//! Regex matchers for the scalar profile fields.
//!
//! Each function scans the whole note and returns the earliest plausible
//! value for one attribute. Callers decide whether to keep it.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{HfType, LabValues, NyhaClass, Sex};

/// Plausible adult age range.
pub const AGE_RANGE: std::ops::RangeInclusive<u32> = 18..=120;

/// How many words before a mention a negation cue may sit.
pub const NEGATION_WINDOW_WORDS: usize = 4;

// ---------------------------------------------------------------------------
// Clause helpers
// ---------------------------------------------------------------------------

static RE_NEGATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:no|not|denies|denied|without|negative\s+for|stopped|discontinued|off|never|held)\b",
    )
    .unwrap()
});

static RE_INTOLERANCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:intoleran(?:t|ce)|allerg(?:ic|y|ies))\b").unwrap()
});

/// Up to `max_words` words immediately before `start`, cut at the
/// enclosing clause boundary.
pub fn words_before(text: &str, start: usize, max_words: usize) -> String {
    let prefix = &text[..start];
    let clause = &prefix[clause_start(prefix)..];
    let words: Vec<&str> = clause.split_whitespace().collect();
    let skip = words.len().saturating_sub(max_words);
    words[skip..].join(" ")
}

fn clause_start(prefix: &str) -> usize {
    let mut cursor = prefix.len();
    while let Some(i) = prefix[..cursor].rfind(|c: char| matches!(c, ',' | ';' | '\n' | '.')) {
        // "2.5 mg" does not end a clause
        if prefix.as_bytes()[i] == b'.' && is_decimal_point(prefix, i) {
            cursor = i;
            continue;
        }
        return i + 1;
    }
    0
}

fn is_decimal_point(text: &str, index: usize) -> bool {
    let bytes = text.as_bytes();
    index > 0
        && index + 1 < bytes.len()
        && bytes[index - 1].is_ascii_digit()
        && bytes[index + 1].is_ascii_digit()
}

/// True when a negation cue precedes `start` in the same clause.
pub fn is_negated(text: &str, start: usize) -> bool {
    RE_NEGATION.is_match(&words_before(text, start, NEGATION_WINDOW_WORDS))
}

/// Longest list item an intolerance cue carries across: "sulfa",
/// "ACE inhibitors", "penicillin 500 mg".
const LIST_ITEM_MAX_WORDS: usize = 3;

static RE_LIST_JOINER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(?:(?:and|or)\s*)?$").unwrap());

/// True when the words before `start` in its clause only join list items.
pub fn starts_list_item(text: &str, start: usize) -> bool {
    let prefix = &text[..start];
    let clause_begin = clause_start(prefix);
    clause_begin > 0
        && prefix.as_bytes()[clause_begin - 1] == b','
        && RE_LIST_JOINER.is_match(&prefix[clause_begin..])
}

/// True when an intolerance or allergy cue precedes `start` in the same
/// clause, or heads the comma-separated list `start` belongs to
/// ("Allergies: penicillin, sulfa, lisinopril").
pub fn follows_intolerance_cue(text: &str, start: usize) -> bool {
    if RE_INTOLERANCE.is_match(&words_before(text, start, NEGATION_WINDOW_WORDS)) {
        return true;
    }

    let mut item_start = start;
    while starts_list_item(text, item_start) {
        let comma = clause_start(&text[..item_start]) - 1;
        let prefix = &text[..comma];
        let begin = clause_start(prefix);
        let previous = &prefix[begin..];
        if RE_INTOLERANCE.is_match(previous) {
            // "no known allergies, lisinopril"
            return !RE_NEGATION.is_match(previous);
        }
        if previous.split_whitespace().count() > LIST_ITEM_MAX_WORDS {
            return false;
        }
        item_start = begin + (previous.len() - previous.trim_start().len());
    }
    false
}

// ---------------------------------------------------------------------------
// Age and sex
// ---------------------------------------------------------------------------

static AGE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\b(\d{1,3})[\s-]*(?:years?|yrs?)[\s-]*old\b",
        r"(?i)\b(\d{1,3})\s*(?:yo|y/o|y\.o)\b",
        r"(?i)\bage(?:d)?\s*[:=]?\s*(\d{1,3})\b",
        r"(?i)\b(\d{1,3})\s+years?\s+of\s+age\b",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Earliest age mention within [`AGE_RANGE`].
pub fn find_age(text: &str) -> Option<u32> {
    AGE_PATTERNS
        .iter()
        .flat_map(|re| re.captures_iter(text))
        .filter_map(|caps| {
            let m = caps.get(1)?;
            let age: u32 = m.as_str().parse().ok()?;
            AGE_RANGE.contains(&age).then_some((m.start(), age))
        })
        .min_by_key(|(pos, _)| *pos)
        .map(|(_, age)| age)
}

static RE_MALE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:male|man|gentleman|boy)\b").unwrap()
});
static RE_FEMALE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:female|woman|lady|girl)\b").unwrap()
});
/// Honorifics are case-sensitive so "MR" (mitral regurgitation) is not read as "Mr".
static RE_HONORIFIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(Mr|Mrs|Ms)\.?\s+[A-Z]").unwrap());
/// "65 yo M", "72-year-old F"
static RE_SEX_SHORTHAND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b\d{1,3}\s*(?:yo|y/o|y\.o\.?|-?years?-?old)\s+([mf])\b").unwrap()
});
static RE_PRONOUN_MALE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:he|him|his)\b").unwrap());
static RE_PRONOUN_FEMALE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:she|her|hers)\b").unwrap());

/// Earliest explicit sex mention; pronouns only when nothing explicit exists.
pub fn find_sex(text: &str) -> Option<Sex> {
    let mut hits: Vec<(usize, Sex)> = Vec::new();
    hits.extend(RE_MALE.find_iter(text).map(|m| (m.start(), Sex::Male)));
    hits.extend(RE_FEMALE.find_iter(text).map(|m| (m.start(), Sex::Female)));
    hits.extend(RE_HONORIFIC.captures_iter(text).filter_map(|c| {
        let m = c.get(1)?;
        let sex = if m.as_str() == "Mr" {
            Sex::Male
        } else {
            Sex::Female
        };
        Some((m.start(), sex))
    }));
    hits.extend(RE_SEX_SHORTHAND.captures_iter(text).filter_map(|c| {
        let m = c.get(1)?;
        let sex = if m.as_str().eq_ignore_ascii_case("m") {
            Sex::Male
        } else {
            Sex::Female
        };
        Some((m.start(), sex))
    }));

    if let Some((_, sex)) = hits.into_iter().min_by_key(|(pos, _)| *pos) {
        return Some(sex);
    }

    let male = RE_PRONOUN_MALE.find(text).map(|m| m.start());
    let female = RE_PRONOUN_FEMALE.find(text).map(|m| m.start());
    match (male, female) {
        (Some(m), Some(f)) if m < f => Some(Sex::Male),
        (Some(_), Some(_)) => Some(Sex::Female),
        (Some(_), None) => Some(Sex::Male),
        (None, Some(_)) => Some(Sex::Female),
        (None, None) => None,
    }
}

// ---------------------------------------------------------------------------
// Heart-failure classification
// ---------------------------------------------------------------------------

static HF_TYPE_PATTERNS: LazyLock<Vec<(HfType, Regex)>> = LazyLock::new(|| {
    [
        (
            HfType::Reduced,
            r"(?i)\b(?:hfref|hf\s*r\s*ef|hf\s+with\s+reduced\s+ef|(?:heart\s+failure\s+with\s+)?reduced\s+(?:ejection\s+fraction|ef)|systolic\s+(?:heart\s+failure|hf|dysfunction))\b",
        ),
        (
            HfType::MildlyReduced,
            r"(?i)\b(?:hfmref|hf\s*mr\s*ef|(?:heart\s+failure\s+with\s+)?mildly\s+reduced\s+(?:ejection\s+fraction|ef)|mid-?range\s+(?:ejection\s+fraction|ef))\b",
        ),
        (
            HfType::Preserved,
            r"(?i)\b(?:hfpef|hf\s*p\s*ef|(?:heart\s+failure\s+with\s+)?preserved\s+(?:ejection\s+fraction|ef)|diastolic\s+(?:heart\s+failure|hf|dysfunction))\b",
        ),
    ]
    .into_iter()
    .map(|(t, p)| (t, Regex::new(p).unwrap()))
    .collect()
});

static RE_HF_GENERIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:heart\s+failure|congestive\s+heart\s+failure|chf|hf|cardiomyopathy)\b")
        .unwrap()
});

/// Earliest non-negated explicit HF type keyword.
pub fn find_explicit_hf_type(text: &str) -> Option<HfType> {
    HF_TYPE_PATTERNS
        .iter()
        .flat_map(|(hf_type, re)| re.find_iter(text).map(move |m| (m.start(), *hf_type)))
        .filter(|(pos, _)| !is_negated(text, *pos))
        .min_by_key(|(pos, _)| *pos)
        .map(|(_, t)| t)
}

/// A non-negated generic heart-failure mention.
pub fn mentions_heart_failure(text: &str) -> bool {
    RE_HF_GENERIC
        .find_iter(text)
        .any(|m| !is_negated(text, m.start()))
}

// ---------------------------------------------------------------------------
// LVEF and NYHA
// ---------------------------------------------------------------------------

static RE_LVEF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:lvef|l\.v\.e\.f\.?|ef|ejection\s+fraction)(?:\s*(?:of|is|was|at|now|estimated|measured|approximately|approx\.?|about|around|~|:|=))*\s*(\d{1,3})(?:\s*(?:-|–|to)\s*(\d{1,3}))?\s*%?",
    )
    .unwrap()
});

/// Earliest LVEF reading. Ranges resolve to their midpoint, rounded down.
pub fn find_lvef(text: &str) -> Option<u8> {
    RE_LVEF.captures_iter(text).find_map(|caps| {
        let low: u32 = caps.get(1)?.as_str().parse().ok()?;
        let value = match caps.get(2).and_then(|m| m.as_str().parse::<u32>().ok()) {
            Some(high) if high >= low => (low + high) / 2,
            Some(_) => return None,
            None => low,
        };
        if value > 100 {
            return None;
        }
        u8::try_from(value).ok()
    })
}

static NYHA_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\b(?:nyha|new\s+york\s+heart\s+association)(?:\s+functional)?(?:\s+class)?\s*[:\-]?\s*(iv|iii|ii|i|[1-4])\b",
        r"(?i)\b(?:functional\s+class|fc)\s*[:\-]?\s*(iv|iii|ii|i|[1-4])\b",
        r"(?i)\bclass\s+(iv|iii|ii|i|[1-4])\s+(?:heart\s+failure|hf|chf|symptoms)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

pub fn find_nyha(text: &str) -> Option<NyhaClass> {
    NYHA_PATTERNS
        .iter()
        .flat_map(|re| re.captures_iter(text))
        .filter_map(|caps| {
            let m = caps.get(1)?;
            Some((m.start(), NyhaClass::from_numeral(m.as_str())?))
        })
        .min_by_key(|(pos, _)| *pos)
        .map(|(_, class)| class)
}

// ---------------------------------------------------------------------------
// Labs and vitals
// ---------------------------------------------------------------------------

/// Which lab a pattern reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabKind {
    Potassium,
    Sodium,
    Creatinine,
    Egfr,
    Bun,
    Bnp,
    NtProbnp,
    Hemoglobin,
}

impl LabKind {
    /// The profile field this lab fills.
    pub fn slot<'a>(&self, labs: &'a mut LabValues) -> &'a mut Option<f64> {
        match self {
            Self::Potassium => &mut labs.potassium,
            Self::Sodium => &mut labs.sodium,
            Self::Creatinine => &mut labs.creatinine,
            Self::Egfr => &mut labs.egfr,
            Self::Bun => &mut labs.bun,
            Self::Bnp => &mut labs.bnp,
            Self::NtProbnp => &mut labs.nt_probnp,
            Self::Hemoglobin => &mut labs.hemoglobin,
        }
    }
}

const VALUE: &str = r"(?:\s*(?:levels?|value))?(?:\s*(?:of|is|was|at|now|=|:))*\s*(\d{1,3}(?:,\d{3})+|\d+(?:\.\d+)?)";

static LAB_PATTERNS: LazyLock<Vec<(LabKind, Regex, std::ops::RangeInclusive<f64>)>> =
    LazyLock::new(|| {
        [
            (LabKind::Potassium, r"(?:potassium|k)\+?", 1.5..=10.0),
            (LabKind::Sodium, r"(?:sodium|na)\+?", 100.0..=180.0),
            (LabKind::Creatinine, r"(?:creatinine|creat|s?cr)", 0.1..=20.0),
            (LabKind::Egfr, r"e?gfr", 1.0..=200.0),
            (LabKind::Bun, r"(?:bun|blood\s+urea\s+nitrogen)", 1.0..=300.0),
            (
                LabKind::NtProbnp,
                r"(?:nt[\s-]*pro[\s-]*bnp|ntprobnp)",
                1.0..=100_000.0,
            ),
            (
                LabKind::Bnp,
                r"(?:bnp|b-type\s+natriuretic\s+peptide)",
                1.0..=100_000.0,
            ),
            (LabKind::Hemoglobin, r"(?:hemoglobin|haemoglobin|hgb|hb)", 3.0..=25.0),
        ]
        .into_iter()
        .map(|(kind, name, range)| {
            let re = Regex::new(&format!(r"(?i)\b{name}{VALUE}")).unwrap();
            (kind, re, range)
        })
        .collect()
    });

/// Earliest in-range value for every lab found in the note.
pub fn find_labs(text: &str) -> Vec<(LabKind, f64)> {
    LAB_PATTERNS
        .iter()
        .filter_map(|(kind, re, range)| {
            re.captures_iter(text).find_map(|caps| {
                let raw = caps.get(1)?.as_str().replace(',', "");
                let value: f64 = raw.parse().ok()?;
                range.contains(&value).then_some((*kind, value))
            })
        })
        .collect()
}

static RE_BP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:bp|blood\s+pressure)(?:\s*(?:of|is|was|:|=))*\s*(\d{2,3})\s*/\s*(\d{2,3})")
        .unwrap()
});
static RE_HR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:hr|heart\s+rate|pulse)(?:\s*(?:of|is|was|:|=))*\s*(\d{2,3})\b").unwrap()
});

/// Systolic and diastolic pressure, mmHg.
pub fn find_blood_pressure(text: &str) -> Option<(u32, u32)> {
    RE_BP.captures_iter(text).find_map(|caps| {
        let sys: u32 = caps.get(1)?.as_str().parse().ok()?;
        let dia: u32 = caps.get(2)?.as_str().parse().ok()?;
        ((50..=300).contains(&sys) && (20..=200).contains(&dia) && sys > dia)
            .then_some((sys, dia))
    })
}

pub fn find_heart_rate(text: &str) -> Option<u32> {
    RE_HR.captures_iter(text).find_map(|caps| {
        let hr: u32 = caps.get(1)?.as_str().parse().ok()?;
        (20..=250).contains(&hr).then_some(hr)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn age_variants() {
        assert_eq!(find_age("65-year-old male"), Some(65));
        assert_eq!(find_age("72 yo F with CHF"), Some(72));
        assert_eq!(find_age("pt is 58 y/o"), Some(58));
        assert_eq!(find_age("Age: 81. HFrEF"), Some(81));
        assert_eq!(find_age("a man 70 years of age"), Some(70));
    }

    #[test]
    fn age_out_of_range_ignored() {
        assert_eq!(find_age("5 year old history of HF"), None);
        assert_eq!(find_age("150 years old"), None);
    }

    #[test]
    fn sex_earliest_mention_wins() {
        assert_eq!(find_sex("65-year-old male"), Some(Sex::Male));
        assert_eq!(find_sex("a woman whose husband is a man"), Some(Sex::Female));
        assert_eq!(find_sex("72 yo F"), Some(Sex::Female));
        assert_eq!(find_sex("Mrs. Smith presents"), Some(Sex::Female));
        assert_eq!(find_sex("severe MR noted"), None);
        assert_eq!(find_sex("She reports dyspnea"), Some(Sex::Female));
        assert_eq!(find_sex("LVEF 35%"), None);
    }

    #[test]
    fn explicit_hf_type_keywords() {
        assert_eq!(find_explicit_hf_type("known HFrEF"), Some(HfType::Reduced));
        assert_eq!(
            find_explicit_hf_type("heart failure with preserved ejection fraction"),
            Some(HfType::Preserved)
        );
        assert_eq!(
            find_explicit_hf_type("HFmrEF on dapagliflozin"),
            Some(HfType::MildlyReduced)
        );
        assert_eq!(
            find_explicit_hf_type("systolic heart failure"),
            Some(HfType::Reduced)
        );
        assert_eq!(find_explicit_hf_type("heart failure, LVEF 35%"), None);
    }

    #[test]
    fn negated_hf_type_ignored() {
        assert_eq!(find_explicit_hf_type("no diastolic dysfunction"), None);
        assert!(!mentions_heart_failure("denies heart failure"));
        assert!(mentions_heart_failure("history of CHF"));
    }

    #[test]
    fn lvef_variants() {
        assert_eq!(find_lvef("LVEF 35%"), Some(35));
        assert_eq!(find_lvef("EF of 25 %"), Some(25));
        assert_eq!(find_lvef("ejection fraction is 55"), Some(55));
        assert_eq!(find_lvef("LVEF: 30-35%"), Some(32));
        assert_eq!(find_lvef("EF was 40 to 45%"), Some(42));
    }

    #[test]
    fn lvef_ignores_implausible_values_and_type_keywords() {
        assert_eq!(find_lvef("EF 350%"), None);
        assert_eq!(find_lvef("HFrEF on lisinopril 10 mg"), None);
        assert_eq!(find_lvef("reduced ejection fraction, on lisinopril"), None);
    }

    #[test]
    fn nyha_variants() {
        assert_eq!(find_nyha("NYHA class III"), Some(NyhaClass::ClassIII));
        assert_eq!(find_nyha("NYHA 2 symptoms"), Some(NyhaClass::ClassII));
        assert_eq!(find_nyha("functional class IV"), Some(NyhaClass::ClassIV));
        assert_eq!(find_nyha("class II heart failure"), Some(NyhaClass::ClassII));
        assert_eq!(find_nyha("NYHA II-III"), Some(NyhaClass::ClassII));
        assert_eq!(find_nyha("no class given"), None);
    }

    #[test]
    fn labs_read_with_units_and_separators() {
        let labs = find_labs("K 5.4, Cr 1.8 mg/dL, eGFR 38, BNP 1,250 pg/mL, NT-proBNP 3400");
        assert!(labs.contains(&(LabKind::Potassium, 5.4)));
        assert!(labs.contains(&(LabKind::Creatinine, 1.8)));
        assert!(labs.contains(&(LabKind::Egfr, 38.0)));
        assert!(labs.contains(&(LabKind::Bnp, 1250.0)));
        assert!(labs.contains(&(LabKind::NtProbnp, 3400.0)));
    }

    #[test]
    fn labs_out_of_range_ignored() {
        let labs = find_labs("potassium chloride 20 mEq, K 45");
        assert!(!labs.iter().any(|(k, _)| *k == LabKind::Potassium));
    }

    #[test]
    fn vitals() {
        assert_eq!(find_blood_pressure("BP 118/72, HR 58"), Some((118, 72)));
        assert_eq!(find_heart_rate("BP 118/72, HR 58 bpm"), Some(58));
        assert_eq!(find_heart_rate("heart rate of 110"), Some(110));
    }

    #[test]
    fn negation_window_stops_at_clause() {
        let text = "no edema, on lisinopril";
        let pos = text.find("lisinopril").unwrap();
        assert!(!is_negated(text, pos));

        let text = "stopped lisinopril";
        assert!(is_negated(text, text.find("lisinopril").unwrap()));

        let text = "no history of significant diabetes";
        assert!(is_negated(text, text.find("diabetes").unwrap()));

        let text = "not previously documented to have long standing diabetes";
        assert!(!is_negated(text, text.find("diabetes").unwrap()));
    }

    #[test]
    fn decimal_point_is_not_a_clause_boundary() {
        let text = "stopped carvedilol 3.125 mg and lisinopril";
        let words = words_before(text, text.find("lisinopril").unwrap(), 10);
        assert!(words.starts_with("stopped"));
    }

    #[test]
    fn intolerance_cue_heads_comma_list() {
        let text = "HFrEF. Allergies: penicillin, lisinopril. On carvedilol.";
        assert!(follows_intolerance_cue(text, text.find("lisinopril").unwrap()));
        assert!(!follows_intolerance_cue(text, text.find("carvedilol").unwrap()));

        let text = "allergic to sulfa, lisinopril";
        assert!(follows_intolerance_cue(text, text.find("lisinopril").unwrap()));

        let text = "Allergies: penicillin, sulfa, and lisinopril";
        assert!(follows_intolerance_cue(text, text.find("lisinopril").unwrap()));
    }

    #[test]
    fn intolerance_cue_stops_at_non_list_clause() {
        let text = "allergic to sulfa, on lisinopril";
        assert!(!follows_intolerance_cue(text, text.find("lisinopril").unwrap()));

        let text = "no known allergies, lisinopril 10 mg daily";
        assert!(!follows_intolerance_cue(text, text.find("lisinopril").unwrap()));

        let text = "allergic to sulfa, edema improved after diuresis, lisinopril";
        assert!(!follows_intolerance_cue(text, text.find("lisinopril").unwrap()));
    }

    #[test]
    fn list_item_detection() {
        let text = "stopped lisinopril, spironolactone and carvedilol";
        assert!(starts_list_item(text, text.find("spironolactone").unwrap()));
        assert!(!starts_list_item(text, text.find("lisinopril").unwrap()));
        let text = "no edema, on lisinopril";
        assert!(!starts_list_item(text, text.find("lisinopril").unwrap()));
    }

    #[test]
    fn intolerance_cue() {
        let text = "intolerant to lisinopril due to cough";
        assert!(follows_intolerance_cue(text, text.find("lisinopril").unwrap()));
        let text = "on lisinopril";
        assert!(!follows_intolerance_cue(text, text.find("lisinopril").unwrap()));
    }
}
