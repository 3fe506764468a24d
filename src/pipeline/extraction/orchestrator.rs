use crate::config::EntityServiceConfig;
use crate::models::{ExtractionProvenance, PatientProfile};

use super::entity_service::{entity_extractor_from_config, EntityExtractor, NullEntityExtractor};
use super::local::extract_local;
use super::merge::merge_profiles;
use super::{validate_input, InputError};

/// Attribute extractor: local pattern pass, optionally enriched by an
/// external collaborator.
/// The collaborator is injected as a trait object so tests can mock it.
pub struct ProfileExtractor {
    service: Box<dyn EntityExtractor + Send + Sync>,
}

impl ProfileExtractor {
    pub fn new(service: Box<dyn EntityExtractor + Send + Sync>) -> Self {
        Self { service }
    }

    pub fn local_only() -> Self {
        Self::new(Box::new(NullEntityExtractor))
    }

    pub fn from_config(config: &EntityServiceConfig) -> Self {
        Self::new(entity_extractor_from_config(config))
    }

    /// Parse a clinical note into a profile.
    ///
    /// Only invalid input fails. Collaborator errors are recorded in the
    /// profile's provenance and the local result is returned.
    pub fn extract(&self, raw_text: &str) -> Result<PatientProfile, InputError> {
        let text = validate_input(raw_text)?;
        let mut profile = extract_local(&text);

        tracing::info!(
            medications = profile.current_medications.len(),
            comorbidities = profile.comorbidities.len(),
            lvef_known = profile.lvef_percent.is_some(),
            hf_type = profile.hf_type.map(|t| t.as_str()).unwrap_or("unknown"),
            "Local extraction complete"
        );

        if !self.service.is_configured() {
            return Ok(profile);
        }

        match self.service.attempt_extract(&text) {
            Ok(external) => {
                let filled_fields = merge_profiles(&mut profile, external);
                tracing::info!(filled = filled_fields.len(), "Merged entity service output");
                profile.provenance = ExtractionProvenance::Merged { filled_fields };
            }
            Err(e) => {
                tracing::warn!(error = %e, "Entity service failed, using local extraction");
                profile.provenance = ExtractionProvenance::Degraded {
                    reason: e.to_string(),
                };
            }
        }

        Ok(profile)
    }
}
