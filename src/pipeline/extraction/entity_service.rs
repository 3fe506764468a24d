//! Optional external medical entity extraction collaborator.
//!
//! The remote service detects medications, conditions, test results and
//! age in free text. Its entities are mapped onto a partial
//! [`PatientProfile`] using the same vocabularies as the local pass.

use serde::{Deserialize, Serialize};

use crate::config::EntityServiceConfig;
use crate::models::{HfType, MedicationMention, PatientProfile};

use super::comorbidities::find_tags;
use super::medications::{dose_to_mg, lookup, normalize_frequency};
use super::patterns::{self, AGE_RANGE};
use super::EntityServiceError;

/// Entities and attributes scoring below this are discarded.
pub const MIN_ENTITY_SCORE: f64 = 0.5;

/// Entity extraction collaborator abstraction (allows mocking)
pub trait EntityExtractor {
    /// Partial profile for the note, or why none could be produced.
    fn attempt_extract(&self, text: &str) -> Result<PatientProfile, EntityServiceError>;

    /// Whether a collaborator is configured at all. When false the caller
    /// proceeds local-only without recording a degradation.
    fn is_configured(&self) -> bool;
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct DetectEntitiesRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DetectEntitiesResponse {
    #[serde(default)]
    pub entities: Vec<Entity>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Entity {
    pub category: String,
    #[serde(rename = "Type", default)]
    pub entity_type: String,
    pub text: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub attributes: Vec<EntityAttribute>,
    #[serde(default)]
    pub traits: Vec<EntityTrait>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EntityAttribute {
    #[serde(rename = "Type")]
    pub attribute_type: String,
    pub text: String,
    #[serde(default)]
    pub score: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EntityTrait {
    pub name: String,
    #[serde(default)]
    pub score: f64,
}

impl Entity {
    fn attribute(&self, attribute_type: &str) -> Option<&str> {
        self.attributes
            .iter()
            .filter(|a| a.score >= MIN_ENTITY_SCORE)
            .find(|a| a.attribute_type == attribute_type)
            .map(|a| a.text.as_str())
    }

    fn is_negated(&self) -> bool {
        self.traits
            .iter()
            .any(|t| t.name == "NEGATION" && t.score >= MIN_ENTITY_SCORE)
    }
}

// ---------------------------------------------------------------------------
// Remote client
// ---------------------------------------------------------------------------

/// HTTP client for the remote entity service.
pub struct RemoteEntityExtractor {
    url: String,
    token: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl RemoteEntityExtractor {
    pub fn new(url: &str, token: &str, timeout_secs: u64) -> Result<Self, EntityServiceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| EntityServiceError::HttpClient(e.to_string()))?;

        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            client,
            timeout_secs,
        })
    }

    fn detect_entities(&self, text: &str) -> Result<DetectEntitiesResponse, EntityServiceError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&DetectEntitiesRequest { text })
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    EntityServiceError::Timeout(self.timeout_secs)
                } else if e.is_connect() {
                    EntityServiceError::Connection(self.url.clone())
                } else {
                    EntityServiceError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(EntityServiceError::Http {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .map_err(|e| EntityServiceError::ResponseParsing(e.to_string()))
    }
}

impl EntityExtractor for RemoteEntityExtractor {
    fn attempt_extract(&self, text: &str) -> Result<PatientProfile, EntityServiceError> {
        let response = self.detect_entities(text)?;
        tracing::debug!(entities = response.entities.len(), "Entity service responded");
        Ok(profile_from_entities(&response.entities))
    }

    fn is_configured(&self) -> bool {
        true
    }
}

/// Stand-in when no collaborator is configured.
pub struct NullEntityExtractor;

impl EntityExtractor for NullEntityExtractor {
    fn attempt_extract(&self, _text: &str) -> Result<PatientProfile, EntityServiceError> {
        Err(EntityServiceError::NotConfigured)
    }

    fn is_configured(&self) -> bool {
        false
    }
}

/// Select the collaborator for a configuration: remote when both endpoint
/// and credential are present, null otherwise.
pub fn entity_extractor_from_config(
    config: &EntityServiceConfig,
) -> Box<dyn EntityExtractor + Send + Sync> {
    if !config.is_complete() {
        return Box::new(NullEntityExtractor);
    }
    let url = config.url.as_deref().unwrap_or_default();
    let token = config.token.as_deref().unwrap_or_default();
    match RemoteEntityExtractor::new(url, token, config.timeout_secs) {
        Ok(remote) => Box::new(remote),
        Err(e) => {
            tracing::warn!(error = %e, "Entity service client unavailable, using local extraction");
            Box::new(NullEntityExtractor)
        }
    }
}

/// Canned collaborator for tests and offline runs.
pub struct MockEntityExtractor {
    response: Result<DetectEntitiesResponse, String>,
}

impl MockEntityExtractor {
    pub fn new(entities: Vec<Entity>) -> Self {
        Self {
            response: Ok(DetectEntitiesResponse { entities }),
        }
    }

    /// Parse a wire-format response body.
    pub fn from_json(json: &str) -> Result<Self, EntityServiceError> {
        let response: DetectEntitiesResponse = serde_json::from_str(json)
            .map_err(|e| EntityServiceError::ResponseParsing(e.to_string()))?;
        Ok(Self {
            response: Ok(response),
        })
    }

    /// A configured collaborator whose every call fails.
    pub fn failing(reason: &str) -> Self {
        Self {
            response: Err(reason.to_string()),
        }
    }
}

impl EntityExtractor for MockEntityExtractor {
    fn attempt_extract(&self, _text: &str) -> Result<PatientProfile, EntityServiceError> {
        match &self.response {
            Ok(response) => Ok(profile_from_entities(&response.entities)),
            Err(reason) => Err(EntityServiceError::Connection(reason.clone())),
        }
    }

    fn is_configured(&self) -> bool {
        true
    }
}

// ---------------------------------------------------------------------------
// Entity mapping
// ---------------------------------------------------------------------------

/// Map service entities onto a partial profile.
pub fn profile_from_entities(entities: &[Entity]) -> PatientProfile {
    let mut profile = PatientProfile::default();

    for entity in entities
        .iter()
        .filter(|e| e.score >= MIN_ENTITY_SCORE && !e.is_negated())
    {
        match entity.category.as_str() {
            "MEDICATION" => map_medication(entity, &mut profile),
            "MEDICAL_CONDITION" => map_condition(entity, &mut profile),
            "TEST_TREATMENT_PROCEDURE" => map_test(entity, &mut profile),
            "PROTECTED_HEALTH_INFORMATION" if entity.entity_type == "AGE" => {
                if profile.age.is_none() {
                    profile.age = entity
                        .text
                        .chars()
                        .filter(char::is_ascii_digit)
                        .collect::<String>()
                        .parse::<u32>()
                        .ok()
                        .filter(|age| AGE_RANGE.contains(age));
                }
            }
            _ => {}
        }
    }

    profile
}

fn map_medication(entity: &Entity, profile: &mut PatientProfile) {
    let catalog = lookup(&entity.text);
    let (dose, dose_mg) = match entity.attribute("DOSAGE").and_then(split_dosage) {
        Some((amount, unit)) => {
            let mg = dose_to_mg(&amount, &unit);
            (Some(format!("{amount} {unit}")), mg)
        }
        None => (None, None),
    };

    profile.add_medication(MedicationMention {
        name: catalog
            .map(|c| c.generic.to_string())
            .unwrap_or_else(|| entity.text.trim().to_lowercase()),
        mentioned_as: entity.text.clone(),
        drug_class: catalog.map(|c| c.class),
        dose,
        dose_mg,
        frequency: entity.attribute("FREQUENCY").map(normalize_frequency),
        span: entity.text.clone(),
    });
}

/// "12.5 mg" -> ("12.5", "mg")
fn split_dosage(raw: &str) -> Option<(String, String)> {
    let lower = raw.trim().to_lowercase();
    let split = lower.find(|c: char| c.is_alphabetic() || c == 'µ')?;
    let amount: String = lower[..split].split_whitespace().collect();
    let unit = lower[split..].trim().to_string();
    if amount.is_empty() || !matches!(unit.as_str(), "mg" | "mcg" | "µg" | "g") {
        return None;
    }
    Some((amount, unit))
}

fn map_condition(entity: &Entity, profile: &mut PatientProfile) {
    let text = entity.text.as_str();
    let hf_type = patterns::find_explicit_hf_type(text)
        .or_else(|| patterns::mentions_heart_failure(text).then_some(HfType::Unspecified));
    match (profile.hf_type, hf_type) {
        (None, Some(t)) => profile.hf_type = Some(t),
        (Some(HfType::Unspecified), Some(t)) if t.is_specific() => profile.hf_type = Some(t),
        _ => {}
    }
    profile.comorbidities.extend(find_tags(text));
}

fn map_test(entity: &Entity, profile: &mut PatientProfile) {
    let Some(value) = entity.attribute("TEST_VALUE") else {
        return;
    };
    let reading = format!("{} {}", entity.text, value);

    if profile.lvef_percent.is_none() {
        profile.lvef_percent = patterns::find_lvef(&reading);
    }
    for (kind, v) in patterns::find_labs(&reading) {
        let slot = kind.slot(&mut profile.labs);
        if slot.is_none() {
            *slot = Some(v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DrugClass;

    const RESPONSE: &str = r#"{
        "Entities": [
            {"Category": "MEDICATION", "Type": "BRAND_NAME", "Text": "Entresto", "Score": 0.98,
             "Attributes": [
                {"Type": "DOSAGE", "Text": "49/51 mg", "Score": 0.91},
                {"Type": "FREQUENCY", "Text": "BID", "Score": 0.88}
             ]},
            {"Category": "MEDICATION", "Type": "GENERIC_NAME", "Text": "aspirin", "Score": 0.95},
            {"Category": "MEDICATION", "Type": "GENERIC_NAME", "Text": "digoxin", "Score": 0.30},
            {"Category": "MEDICAL_CONDITION", "Type": "DX_NAME", "Text": "HFrEF", "Score": 0.97},
            {"Category": "MEDICAL_CONDITION", "Type": "DX_NAME", "Text": "diabetes", "Score": 0.90,
             "Traits": [{"Name": "NEGATION", "Score": 0.93}]},
            {"Category": "MEDICAL_CONDITION", "Type": "DX_NAME", "Text": "atrial fibrillation", "Score": 0.92},
            {"Category": "TEST_TREATMENT_PROCEDURE", "Type": "TEST_NAME", "Text": "ejection fraction", "Score": 0.96,
             "Attributes": [{"Type": "TEST_VALUE", "Text": "30%", "Score": 0.9}]},
            {"Category": "TEST_TREATMENT_PROCEDURE", "Type": "TEST_NAME", "Text": "potassium", "Score": 0.96,
             "Attributes": [{"Type": "TEST_VALUE", "Text": "4.8", "Score": 0.9}]},
            {"Category": "PROTECTED_HEALTH_INFORMATION", "Type": "AGE", "Text": "71", "Score": 0.99}
        ]
    }"#;

    fn mapped() -> PatientProfile {
        let response: DetectEntitiesResponse = serde_json::from_str(RESPONSE).unwrap();
        profile_from_entities(&response.entities)
    }

    #[test]
    fn medication_entities_map_to_catalog() {
        let profile = mapped();
        let entresto = &profile.current_medications[0];
        assert_eq!(entresto.name, "sacubitril/valsartan");
        assert_eq!(entresto.drug_class, Some(DrugClass::Arni));
        assert_eq!(entresto.dose.as_deref(), Some("49/51 mg"));
        assert_eq!(entresto.dose_mg, Some(49.0));
        assert_eq!(entresto.frequency.as_deref(), Some("twice daily"));
    }

    #[test]
    fn unknown_medication_kept_without_class() {
        let profile = mapped();
        let aspirin = profile
            .current_medications
            .iter()
            .find(|m| m.name == "aspirin")
            .unwrap();
        assert_eq!(aspirin.drug_class, None);
    }

    #[test]
    fn low_score_entities_discarded() {
        assert!(!mapped().is_on_agent("digoxin"));
    }

    #[test]
    fn negated_conditions_discarded() {
        let profile = mapped();
        assert!(!profile.has_comorbidity("diabetes"));
        assert!(profile.has_comorbidity("atrial_fibrillation"));
    }

    #[test]
    fn conditions_tests_and_age() {
        let profile = mapped();
        assert_eq!(profile.hf_type, Some(HfType::Reduced));
        assert_eq!(profile.lvef_percent, Some(30));
        assert_eq!(profile.labs.potassium, Some(4.8));
        assert_eq!(profile.age, Some(71));
    }

    #[test]
    fn null_extractor_is_unconfigured() {
        let null = NullEntityExtractor;
        assert!(!null.is_configured());
        assert!(matches!(
            null.attempt_extract("x"),
            Err(EntityServiceError::NotConfigured)
        ));
    }

    #[test]
    fn incomplete_config_selects_null() {
        let config = EntityServiceConfig {
            url: Some("http://localhost:9".into()),
            token: None,
            timeout_secs: 1,
        };
        assert!(!entity_extractor_from_config(&config).is_configured());
    }

    #[test]
    fn complete_config_selects_remote() {
        let config = EntityServiceConfig {
            url: Some("http://localhost:9/detect".into()),
            token: Some("t".into()),
            timeout_secs: 1,
        };
        assert!(entity_extractor_from_config(&config).is_configured());
    }

    #[test]
    fn unreachable_remote_fails_without_panicking() {
        let remote = RemoteEntityExtractor::new("http://127.0.0.1:9", "t", 1).unwrap();
        assert!(remote.attempt_extract("HFrEF").is_err());
    }

    #[test]
    fn request_body_uses_pascal_case() {
        let json = serde_json::to_string(&DetectEntitiesRequest { text: "note" }).unwrap();
        assert_eq!(json, r#"{"Text":"note"}"#);
    }

    #[test]
    fn dosage_split() {
        assert_eq!(
            split_dosage("12.5 mg"),
            Some(("12.5".to_string(), "mg".to_string()))
        );
        assert_eq!(split_dosage("two tablets"), None);
    }

    #[test]
    fn mock_failure_surfaces_as_error() {
        let mock = MockEntityExtractor::failing("down");
        assert!(mock.is_configured());
        assert!(mock.attempt_extract("x").is_err());
    }
}
