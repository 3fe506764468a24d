//! Medication catalogue and mention parsing.
//!
//! The catalogue maps generic and brand names to one canonical generic and
//! a drug class. Matching is case-insensitive and tolerant of "/", "-" and
//! spacing differences ("Toprol-XL", "toprol xl", "sacubitril/valsartan").

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::{DrugClass, MedicationMention};

use super::patterns::{follows_intolerance_cue, is_negated};

pub struct CatalogEntry {
    pub generic: &'static str,
    pub class: DrugClass,
    /// Brand names and alternate spellings, generic excluded.
    pub aliases: &'static [&'static str],
}

const fn entry(
    generic: &'static str,
    class: DrugClass,
    aliases: &'static [&'static str],
) -> CatalogEntry {
    CatalogEntry {
        generic,
        class,
        aliases,
    }
}

use DrugClass::*;

pub static CATALOG: &[CatalogEntry] = &[
    // ACE inhibitors
    entry("lisinopril", AceInhibitor, &["zestril", "prinivil"]),
    entry("enalapril", AceInhibitor, &["vasotec"]),
    entry("ramipril", AceInhibitor, &["altace"]),
    entry("captopril", AceInhibitor, &["capoten"]),
    entry("benazepril", AceInhibitor, &["lotensin"]),
    entry("quinapril", AceInhibitor, &["accupril"]),
    entry("perindopril", AceInhibitor, &["aceon"]),
    entry("fosinopril", AceInhibitor, &[]),
    entry("trandolapril", AceInhibitor, &["mavik"]),
    // ARBs
    entry("losartan", Arb, &["cozaar"]),
    entry("valsartan", Arb, &["diovan"]),
    entry("candesartan", Arb, &["atacand"]),
    entry("irbesartan", Arb, &["avapro"]),
    entry("olmesartan", Arb, &["benicar"]),
    entry("telmisartan", Arb, &["micardis"]),
    // ARNI
    entry(
        "sacubitril/valsartan",
        Arni,
        &["entresto", "sacubitril-valsartan", "sacubitril valsartan"],
    ),
    // Beta-blockers
    entry("carvedilol", BetaBlocker, &["coreg"]),
    entry(
        "metoprolol succinate",
        BetaBlocker,
        &["toprol xl", "toprol-xl", "toprol", "metoprolol xl", "metoprolol er"],
    ),
    entry("metoprolol tartrate", BetaBlocker, &["lopressor"]),
    entry("metoprolol", BetaBlocker, &[]),
    entry("bisoprolol", BetaBlocker, &["zebeta"]),
    entry("nebivolol", BetaBlocker, &["bystolic"]),
    entry("atenolol", BetaBlocker, &["tenormin"]),
    entry("propranolol", BetaBlocker, &["inderal"]),
    // MRAs
    entry("spironolactone", Mra, &["aldactone"]),
    entry("eplerenone", Mra, &["inspra"]),
    entry("finerenone", Mra, &["kerendia"]),
    // SGLT2 inhibitors
    entry("dapagliflozin", Sglt2Inhibitor, &["farxiga", "forxiga"]),
    entry("empagliflozin", Sglt2Inhibitor, &["jardiance"]),
    entry("canagliflozin", Sglt2Inhibitor, &["invokana"]),
    entry("sotagliflozin", Sglt2Inhibitor, &["inpefa"]),
    // Diuretics
    entry("furosemide", LoopDiuretic, &["lasix", "frusemide"]),
    entry("torsemide", LoopDiuretic, &["demadex", "torasemide"]),
    entry("bumetanide", LoopDiuretic, &["bumex"]),
    entry("hydrochlorothiazide", ThiazideDiuretic, &["hctz", "microzide"]),
    entry("chlorthalidone", ThiazideDiuretic, &[]),
    entry("metolazone", ThiazideDiuretic, &["zaroxolyn"]),
    // Other HF therapy
    entry("digoxin", Digoxin, &["lanoxin"]),
    entry("ivabradine", Ivabradine, &["corlanor"]),
    entry(
        "hydralazine/isosorbide dinitrate",
        HydralazineNitrate,
        &["bidil", "hydralazine-isosorbide dinitrate"],
    ),
    entry("hydralazine", HydralazineNitrate, &["apresoline"]),
    entry("isosorbide dinitrate", HydralazineNitrate, &["isordil"]),
    entry("vericiguat", SgcStimulator, &["verquvo"]),
    // Safety-relevant
    entry("ibuprofen", Nsaid, &["advil", "motrin"]),
    entry("naproxen", Nsaid, &["aleve", "naprosyn"]),
    entry("diclofenac", Nsaid, &["voltaren"]),
    entry("celecoxib", Nsaid, &["celebrex"]),
    entry("meloxicam", Nsaid, &["mobic"]),
    entry("indomethacin", Nsaid, &["indocin"]),
    entry("ketorolac", Nsaid, &["toradol"]),
    entry("diltiazem", NonDhpCcb, &["cardizem"]),
    entry("verapamil", NonDhpCcb, &["calan"]),
    entry("pioglitazone", Thiazolidinedione, &["actos"]),
    entry("rosiglitazone", Thiazolidinedione, &["avandia"]),
    entry("potassium chloride", PotassiumSupplement, &["klor-con", "k-dur", "kcl"]),
];

/// Collapse case and separator variants: "Toprol-XL" -> "toprol xl".
fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '/' || c == '-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

static LOOKUP: LazyLock<HashMap<String, &'static CatalogEntry>> = LazyLock::new(|| {
    let mut map = HashMap::new();
    for e in CATALOG {
        map.insert(normalize_name(e.generic), e);
        for alias in e.aliases {
            map.insert(normalize_name(alias), e);
        }
    }
    map
});

/// One alternation of every name, longest first so "metoprolol succinate"
/// wins over "metoprolol" and "sacubitril/valsartan" over "valsartan".
static RE_MEDICATION: LazyLock<Regex> = LazyLock::new(|| {
    let mut names: Vec<String> = LOOKUP.keys().cloned().collect();
    names.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    let alternation = names
        .iter()
        .map(|n| {
            n.split(' ')
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(r"[\s/-]+")
        })
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{alternation})\b")).unwrap()
});

/// Dose and frequency directly after the name: "10 mg daily", "(25mg BID)",
/// "24/26 mg twice daily", "at 40 mg".
static RE_DOSING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:\(\s*)?(?:at\s+)?(?P<amount>\d+(?:\.\d+)?(?:\s*/\s*\d+(?:\.\d+)?)?)\s*(?P<unit>mg|mcg|µg|g)\b(?:\s*(?:po|orally|by\s+mouth|oral)\b)?\s*(?P<freq>once\s+(?:daily|a\s+day)|twice\s+(?:daily|a\s+day)|three\s+times\s+(?:daily|a\s+day)|four\s+times\s+(?:daily|a\s+day)|every\s+(?:morning|evening|day)|at\s+bedtime|nightly|daily|b\.?i\.?d\.?|t\.?i\.?d\.?|q\.?i\.?d\.?|q\.?d\.?|qhs|qam|q12h|q8h|q24h)?",
    )
    .unwrap()
});

/// Frequency alone when no dose is given: "carvedilol twice daily".
static RE_FREQUENCY_ONLY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?P<freq>once\s+daily|twice\s+daily|daily|bid|tid|qid|nightly)\b").unwrap()
});

pub fn lookup(name: &str) -> Option<&'static CatalogEntry> {
    LOOKUP.get(&normalize_name(name)).copied()
}

/// Whether `name` is a canonical generic in the catalogue.
pub fn is_known_generic(name: &str) -> bool {
    let key = normalize_name(name);
    CATALOG.iter().any(|e| normalize_name(e.generic) == key)
}

/// Convert an amount to milligrams. For combination products ("24/26")
/// the first component is used.
pub fn dose_to_mg(amount: &str, unit: &str) -> Option<f64> {
    let first = amount.split('/').next()?.trim();
    let value: f64 = first.parse().ok()?;
    match unit.to_lowercase().as_str() {
        "mg" => Some(value),
        "g" => Some(value * 1000.0),
        "mcg" | "µg" => Some(value / 1000.0),
        _ => None,
    }
}

/// Map abbreviations to one spelling: "BID" -> "twice daily".
pub fn normalize_frequency(freq: &str) -> String {
    let key: String = freq
        .to_lowercase()
        .chars()
        .filter(|c| *c != '.')
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    match key.as_str() {
        "daily" | "once daily" | "once a day" | "qd" | "every day" | "q24h" => "daily",
        "bid" | "twice daily" | "twice a day" | "q12h" => "twice daily",
        "tid" | "three times daily" | "three times a day" | "q8h" => "three times daily",
        "qid" | "four times daily" | "four times a day" => "four times daily",
        "qhs" | "nightly" | "at bedtime" | "every evening" => "nightly",
        "qam" | "every morning" => "every morning",
        other => return other.to_string(),
    }
    .to_string()
}

/// Medications found in a note.
#[derive(Debug, Default)]
pub struct MedicationScan {
    /// Current medications, deduplicated by canonical name.
    pub current: Vec<MedicationMention>,
    /// Classes the note reports intolerance or allergy to.
    pub intolerances: Vec<DrugClass>,
}

/// Text between two catalogue names that keeps them in one list:
/// ", ", " and ", ", or ".
static RE_LIST_GAP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:,\s*(?:(?:and|or)\s+)?|(?:and|or)\s+)$").unwrap()
});

#[derive(Clone, Copy, PartialEq, Eq)]
enum MentionStatus {
    Current,
    Negated,
    Intolerant,
}

/// Scan the note for catalogue names.
///
/// A negated mention ("stopped lisinopril") is skipped. A mention after an
/// intolerance cue ("allergic to lisinopril") records the class intolerance
/// instead of a current medication. A name listed right after another
/// ("stopped lisinopril, spironolactone") shares its status.
pub fn scan(text: &str) -> MedicationScan {
    let mut scan = MedicationScan::default();
    let mut previous: Option<(usize, MentionStatus)> = None;

    for m in RE_MEDICATION.find_iter(text) {
        let Some(entry) = lookup(m.as_str()) else {
            continue;
        };

        let rest = &text[m.end()..];
        let (dose, dose_mg, mut frequency, mut consumed) = match RE_DOSING.captures(rest) {
            Some(caps) => {
                let amount = caps.name("amount").map(|a| a.as_str()).unwrap_or_default();
                let unit = caps.name("unit").map(|u| u.as_str()).unwrap_or_default();
                let amount_clean: String = amount.split_whitespace().collect();
                (
                    Some(format!("{amount_clean} {}", unit.to_lowercase())),
                    dose_to_mg(&amount_clean, unit),
                    caps.name("freq").map(|f| normalize_frequency(f.as_str())),
                    caps.get(0).map(|c| c.end()).unwrap_or(0),
                )
            }
            None => (None, None, None, 0),
        };
        if frequency.is_none() {
            if let Some(caps) = RE_FREQUENCY_ONLY.captures(&rest[consumed..]) {
                frequency = caps.name("freq").map(|f| normalize_frequency(f.as_str()));
                consumed += caps.get(0).map(|c| c.end()).unwrap_or(0);
            }
        }
        let end = m.end() + consumed;

        let listed_after = previous
            .filter(|(prev_end, _)| {
                *prev_end <= m.start() && RE_LIST_GAP.is_match(&text[*prev_end..m.start()])
            })
            .map(|(_, status)| status);
        let status = if follows_intolerance_cue(text, m.start()) {
            MentionStatus::Intolerant
        } else if is_negated(text, m.start()) {
            MentionStatus::Negated
        } else {
            listed_after.unwrap_or(MentionStatus::Current)
        };
        previous = Some((end, status));

        match status {
            MentionStatus::Intolerant => {
                if !scan.intolerances.contains(&entry.class) {
                    scan.intolerances.push(entry.class);
                }
            }
            MentionStatus::Negated => {}
            MentionStatus::Current => {
                let span = text[m.start()..end].trim_end().to_string();
                scan.add_current(MedicationMention {
                    name: entry.generic.to_string(),
                    mentioned_as: m.as_str().to_string(),
                    drug_class: Some(entry.class),
                    dose,
                    dose_mg,
                    frequency,
                    span,
                });
            }
        }
    }

    tracing::debug!(
        medications = scan.current.len(),
        intolerances = scan.intolerances.len(),
        "Medication scan complete"
    );

    scan
}

impl MedicationScan {
    fn add_current(&mut self, mention: MedicationMention) {
        if let Some(existing) = self.current.iter_mut().find(|m| m.name == mention.name) {
            if existing.dose.is_none() {
                existing.dose = mention.dose;
                existing.dose_mg = mention.dose_mg;
            }
            if existing.frequency.is_none() {
                existing.frequency = mention.frequency;
            }
            return;
        }
        self.current.push(mention);
    }
}

// ---------------------------------------------------------------------------
// Class-level terms ("ACE inhibitor intolerance")
// ---------------------------------------------------------------------------

static CLASS_TERMS: &[(DrugClass, &str)] = &[
    (AceInhibitor, r"ace[\s-]*inhibitors?|ace[\s-]*is?"),
    (Arb, r"arbs?|angiotensin[\s-]+receptor[\s-]+blockers?"),
    (Arni, r"arnis?"),
    (BetaBlocker, r"beta[\s-]*blockers?|b-?blockers?"),
    (Mra, r"mras?|mineralocorticoid[\s-]+receptor[\s-]+antagonists?"),
    (Sglt2Inhibitor, r"sglt-?2[\s-]*inhibitors?|sglt-?2is?"),
    (Nsaid, r"nsaids?"),
];

static CLASS_INTOLERANCE: LazyLock<Vec<(DrugClass, Regex)>> = LazyLock::new(|| {
    CLASS_TERMS
        .iter()
        .map(|(class, term)| {
            let re = Regex::new(&format!(
                r"(?i)\b(?:(?:{term})\s+(?:intoleran(?:t|ce)|allerg(?:y|ic))|(?:intolerant|allergic)\s+(?:to|of)\s+(?:{term}))\b"
            ))
            .unwrap();
            (*class, re)
        })
        .collect()
});

/// Classes named (not by agent) as not tolerated.
pub fn class_intolerances(text: &str) -> Vec<DrugClass> {
    CLASS_INTOLERANCE
        .iter()
        .filter(|(_, re)| re.is_match(text))
        .map(|(class, _)| *class)
        .collect()
}
