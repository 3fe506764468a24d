//! Comorbidity keyword vocabulary.
//!
//! Tags are the closed set guideline predicates may reference. Besides the
//! keyword tags, every drug class has an `<class>_intolerance` tag.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::DrugClass;

use super::medications::class_intolerances;
use super::patterns::is_negated;

/// Tag and the keywords that set it.
static VOCABULARY: &[(&str, &str)] = &[
    (
        "diabetes",
        r"diabet(?:es|ic)(?:\s+mellitus)?|t2dm|dm2|dm\s+type\s+2|niddm",
    ),
    (
        "type1_diabetes",
        r"type\s*(?:1|i)\s+diabet(?:es|ic)|t1dm|dm1|dm\s+type\s+1|iddm",
    ),
    ("hypertension", r"hypertension|htn|high\s+blood\s+pressure"),
    (
        "ckd",
        r"ckd(?:\s+stage\s+\w+)?|chronic\s+kidney\s+disease|chronic\s+renal\s+(?:disease|insufficiency|failure)|renal\s+insufficiency",
    ),
    (
        "dialysis",
        r"dialysis|hemodialysis|haemodialysis|esrd|end[\s-]+stage\s+renal\s+disease",
    ),
    (
        "atrial_fibrillation",
        r"atrial\s+fibrillation|a[\s-]?fib|paroxysmal\s+af",
    ),
    (
        "coronary_artery_disease",
        r"coronary\s+artery\s+disease|cad|ischemic\s+heart\s+disease|ischemic\s+cardiomyopathy|prior\s+mi|myocardial\s+infarction|nstemi|stemi|cabg",
    ),
    ("copd", r"copd|chronic\s+obstructive\s+pulmonary\s+disease|emphysema"),
    ("asthma", r"asthma(?:tic)?"),
    ("sleep_apnea", r"(?:obstructive\s+)?sleep\s+apnea|osa"),
    ("depression", r"depression|depressive\s+disorder|mdd"),
    (
        "hyperkalemia",
        r"hyperkalemia|hyperkalaemia|(?:high|elevated)\s+potassium",
    ),
    ("angioedema", r"angioedema|angio-edema"),
    ("bradycardia", r"bradycardia|bradycardic|sick\s+sinus"),
    (
        "heart_block",
        r"heart\s+block|av\s+block|atrioventricular\s+block|(?:second|third)[\s-]+degree\s+block|mobitz",
    ),
    ("hypotension", r"hypotension|hypotensive|low\s+blood\s+pressure"),
    ("pregnancy", r"pregnan(?:t|cy)"),
    ("anuria", r"anuri[ac]"),
];

static PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    VOCABULARY
        .iter()
        .map(|(tag, keywords)| {
            let re = Regex::new(&format!(r"(?i)\b(?:{keywords})\b")).unwrap();
            (*tag, re)
        })
        .collect()
});

/// Whether a comorbidity tag exists: a keyword tag or a drug-class
/// intolerance tag.
pub fn is_known_tag(tag: &str) -> bool {
    if VOCABULARY.iter().any(|(t, _)| *t == tag) {
        return true;
    }
    tag.strip_suffix("_intolerance")
        .and_then(|class| class.parse::<DrugClass>().ok())
        .is_some()
}

/// Keyword tags whose mention is not negated.
pub fn find_tags(text: &str) -> BTreeSet<String> {
    let mut tags = BTreeSet::new();
    for (tag, re) in PATTERNS.iter() {
        if re.find_iter(text).any(|m| !is_negated(text, m.start())) {
            tags.insert((*tag).to_string());
        }
    }
    for class in class_intolerances(text) {
        tags.insert(class.intolerance_tag());
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_tags() {
        let tags = find_tags("PMH: T2DM, HTN, CKD stage 3, paroxysmal AF, OSA on CPAP");
        for tag in ["diabetes", "hypertension", "ckd", "atrial_fibrillation", "sleep_apnea"] {
            assert!(tags.contains(tag), "missing {tag}");
        }
    }

    #[test]
    fn type1_diabetes_tagged_separately() {
        let tags = find_tags("type 1 diabetes on insulin pump");
        assert!(tags.contains("type1_diabetes"));
        assert!(tags.contains("diabetes"));
        let tags = find_tags("type 2 diabetes");
        assert!(!tags.contains("type1_diabetes"));
    }

    #[test]
    fn negated_tags_skipped() {
        let tags = find_tags("denies diabetes. History of hypertension.");
        assert!(!tags.contains("diabetes"));
        assert!(tags.contains("hypertension"));
    }

    #[test]
    fn hypertension_and_hypotension_are_distinct() {
        let tags = find_tags("hypotension after diuresis");
        assert!(tags.contains("hypotension"));
        assert!(!tags.contains("hypertension"));
    }

    #[test]
    fn class_intolerance_becomes_tag() {
        let tags = find_tags("ACE inhibitor intolerance (cough)");
        assert!(tags.contains("ace_inhibitor_intolerance"));
    }

    #[test]
    fn known_tags() {
        assert!(is_known_tag("hyperkalemia"));
        assert!(is_known_tag("mra_intolerance"));
        assert!(is_known_tag("ace_inhibitor_intolerance"));
        assert!(!is_known_tag("gout"));
        assert!(!is_known_tag("statin_intolerance"));
    }
}
