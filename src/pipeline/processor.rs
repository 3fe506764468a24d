//! Note processing orchestrator: extract → evaluate → assemble.
//!
//! Holds the read-only knowledge base and the extractor; each call builds
//! fresh values and shares nothing mutable, so one service can be used from
//! many threads at once.

use std::borrow::Cow;
use std::path::Path;

use uuid::Uuid;

use crate::guidelines::{self, KnowledgeBase, SchemaError};
use crate::intelligence::evaluate;
use crate::pipeline::extraction::{InputError, ProfileExtractor};
use crate::report::{assemble, Report};

/// Errors raised to the caller. Everything else ends up as a report warning.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Invalid input: {0}")]
    Input(#[from] InputError),

    #[error("Guideline table error: {0}")]
    Schema(#[from] SchemaError),
}

/// The table at `path`, or the bundled table when no path is given.
pub fn load_guidelines(path: Option<&Path>) -> Result<Cow<'static, KnowledgeBase>, SchemaError> {
    match path {
        Some(path) => guidelines::load_from_path(path).map(Cow::Owned),
        None => guidelines::bundled().map(Cow::Borrowed),
    }
}

pub struct GuidanceService {
    extractor: ProfileExtractor,
    kb: Cow<'static, KnowledgeBase>,
}

impl GuidanceService {
    pub fn new(extractor: ProfileExtractor, kb: Cow<'static, KnowledgeBase>) -> Self {
        Self { extractor, kb }
    }

    pub fn knowledge_base(&self) -> &KnowledgeBase {
        &self.kb
    }

    /// Full pipeline for one note. Only invalid input fails.
    pub fn process(&self, raw_text: &str) -> Result<Report, PipelineError> {
        let request_id = Uuid::new_v4();
        let _span = tracing::info_span!("process_note", request_id = %request_id).entered();

        let profile = {
            let _stage = tracing::info_span!("extract").entered();
            self.extractor.extract(raw_text)?
        };
        let recs = {
            let _stage = tracing::info_span!("evaluate").entered();
            evaluate(&profile, &self.kb)
        };
        let report = assemble(&profile, &recs);

        tracing::info!(
            partition = %recs.partition,
            recommendations = report.recommendations.len(),
            warnings = report.warnings.len(),
            "Note processed"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::guidelines::test_support::{table_with, ACEI_RULE};
    use crate::models::{Partition, RecommendationAction, Sex, WarningKind};
    use crate::pipeline::extraction::MockEntityExtractor;

    fn service() -> GuidanceService {
        GuidanceService::new(
            ProfileExtractor::local_only(),
            load_guidelines(None).unwrap(),
        )
    }

    fn has_warning(report: &Report, kind: WarningKind) -> bool {
        report.warnings.iter().any(|w| w.kind == kind)
    }

    fn classes(report: &Report) -> Vec<&str> {
        report
            .recommendations
            .iter()
            .map(|r| r.medication_class.as_str())
            .collect()
    }

    #[test]
    fn scenario_inferred_hfref_profile_and_core_classes() {
        let report = service()
            .process("65-year-old male with heart failure, LVEF 35%")
            .unwrap();

        assert_eq!(report.summary.age, Some(65));
        assert_eq!(report.summary.sex, Sex::Male);
        assert_eq!(report.summary.lvef_percent, Some(35));
        assert_eq!(report.summary.partition, Partition::Reduced);
        assert!(has_warning(&report, WarningKind::PartitionInferred));

        let classes = classes(&report);
        for class in ["ACE inhibitor", "Beta-blocker", "MRA", "SGLT2 inhibitor"] {
            assert!(classes.contains(&class), "missing {class}");
        }
        for item in &report.recommendations {
            assert!(!item.agents[0].starting_dose.is_empty());
        }
    }

    #[test]
    fn scenario_current_medications_become_continuation() {
        let report = service()
            .process("Heart failure patient on carvedilol and lisinopril")
            .unwrap();

        let names: Vec<&str> = report
            .medication_analysis
            .iter()
            .map(|m| m.name.as_str())
            .collect();
        assert_eq!(names, vec!["carvedilol", "lisinopril"]);

        for class in ["ACE inhibitor", "Beta-blocker"] {
            let item = report
                .recommendations
                .iter()
                .find(|r| r.medication_class == class)
                .unwrap();
            assert_ne!(item.action, RecommendationAction::Initiate, "{class}");
        }
    }

    #[test]
    fn scenario_empty_input_is_input_error() {
        let err = service().process("").unwrap_err();
        assert!(matches!(err, PipelineError::Input(InputError::Empty)));
    }

    #[test]
    fn scenario_preserved_lvef_inferred() {
        let report = service().process("Dyspnea on exertion. LVEF 60%.").unwrap();
        assert_eq!(report.summary.partition, Partition::Preserved);
        assert!(has_warning(&report, WarningKind::PartitionInferred));
    }

    #[test]
    fn scenario_all_contraindicated_returns_empty_recommendations() {
        let report = service()
            .process(
                "72 yo M with HFrEF, EF 25%. PMH: angioedema; hyperkalemia; bradycardia; \
                 dialysis; hypotension.",
            )
            .unwrap();
        assert!(report.recommendations.is_empty());
        assert!(has_warning(&report, WarningKind::NoSafeRecommendation));
    }

    #[test]
    fn listed_allergen_is_never_titrated() {
        let report = service()
            .process("HFrEF, EF 30%. Allergies: penicillin, lisinopril. On carvedilol 6.25 mg BID.")
            .unwrap();
        let names: Vec<&str> = report
            .medication_analysis
            .iter()
            .map(|m| m.name.as_str())
            .collect();
        assert_eq!(names, vec!["carvedilol"]);
        assert!(report
            .summary
            .comorbidities
            .iter()
            .any(|c| c == "ace_inhibitor_intolerance"));
        assert!(report
            .recommendations
            .iter()
            .all(|r| !r.instruction.contains("Already on lisinopril")));
    }

    #[test]
    fn collaborator_failure_surfaces_as_warning() {
        let service = GuidanceService::new(
            ProfileExtractor::new(Box::new(MockEntityExtractor::failing("connection refused"))),
            load_guidelines(None).unwrap(),
        );
        let report = service.process("HFrEF, EF 30%").unwrap();
        assert!(has_warning(&report, WarningKind::ExtractionDegraded));
        assert!(!report.recommendations.is_empty());
    }

    #[test]
    fn guideline_file_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(table_with(ACEI_RULE).as_bytes()).unwrap();
        let kb = load_guidelines(Some(file.path())).unwrap();
        assert_eq!(kb.version, "test-1");

        let service = GuidanceService::new(ProfileExtractor::local_only(), kb);
        assert_eq!(service.knowledge_base().rule_count(), 4);
        let report = service.process("HFrEF, EF 30%").unwrap();
        assert_eq!(report.recommendations.len(), 1);
        assert_eq!(report.guideline.version, "test-1");
    }

    #[test]
    fn malformed_guideline_file_is_schema_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();
        let err = load_guidelines(Some(file.path())).unwrap_err();
        assert!(matches!(err, SchemaError::Parse(_)));
    }

    #[test]
    fn concurrent_requests_agree() {
        let service = service();
        let note = "68 yo woman, HFrEF, EF 30%, NYHA II, on carvedilol 12.5 mg BID. K 4.6, eGFR 52.";
        let expected = service.process(note).unwrap();

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| service.process(note).unwrap()))
                .collect();
            for handle in handles {
                assert_eq!(handle.join().unwrap(), expected);
            }
        });
    }
}
