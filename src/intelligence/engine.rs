use std::time::Instant;

use crate::guidelines::{AdvisorySection, GuidelineRule, KnowledgeBase, Truth};
use crate::models::{
    AgentDosing, EngineWarning, ExtractionProvenance, MedicationMention, Partition,
    PartitionBasis, PatientProfile, RecommendationAction, RecommendationItem, RecommendationSet,
    WarningKind,
};

use super::messages::MessageTemplates;

/// Map a profile onto the guideline table.
///
/// Pure and deterministic: the same profile and table always give the same
/// set. Conditions that need attention are reported as warnings, never
/// as errors.
pub fn evaluate(profile: &PatientProfile, kb: &KnowledgeBase) -> RecommendationSet {
    let start = Instant::now();
    let mut warnings = Vec::new();

    if let ExtractionProvenance::Degraded { reason } = &profile.provenance {
        warnings.push(EngineWarning::new(
            WarningKind::ExtractionDegraded,
            MessageTemplates::extraction_degraded(reason),
        ));
    }

    let (partition, partition_basis) = select_partition(profile, kb, &mut warnings);

    let mut surviving: Vec<&GuidelineRule> = Vec::new();
    for rule in kb.rules(partition) {
        match rule.applies_when.evaluate(profile) {
            Truth::True => {}
            Truth::False => continue,
            Truth::Unknown => {
                let missing = rule.applies_when.missing_fields(profile);
                warnings.push(EngineWarning::new(
                    WarningKind::MissingData,
                    MessageTemplates::unevaluated_rule(&rule.medication_class, &missing),
                ));
                continue;
            }
        }

        if let Some(reason) = check_contraindications(rule, profile, &mut warnings) {
            tracing::debug!(rule = %rule.id, "Rule suppressed by contraindication");
            warnings.push(EngineWarning::new(
                WarningKind::ContraindicationSuppressed,
                MessageTemplates::suppressed(&rule.medication_class, reason),
            ));
            continue;
        }

        surviving.push(rule);
    }

    // Stable: equal ranks keep declaration order.
    surviving.sort_by_key(|r| r.priority_rank);

    let medication_recommendations: Vec<RecommendationItem> =
        surviving.iter().map(|r| build_item(r, profile)).collect();

    if medication_recommendations.is_empty() {
        warnings.push(EngineWarning::new(
            WarningKind::NoSafeRecommendation,
            MessageTemplates::no_safe_recommendation(),
        ));
    }

    let mut monitoring_items = Vec::new();
    let mut lifestyle_items = Vec::new();
    for item in &kb.baseline_monitoring {
        push_unique(&mut monitoring_items, item);
    }
    for item in &kb.baseline_lifestyle {
        push_unique(&mut lifestyle_items, item);
    }
    for rule in &surviving {
        for item in &rule.monitoring_actions {
            push_unique(&mut monitoring_items, item);
        }
        for item in &rule.lifestyle_advice {
            push_unique(&mut lifestyle_items, item);
        }
    }

    for advisory in kb.advisories.iter().filter(|a| a.applies_to(partition)) {
        if advisory.when.evaluate(profile) != Truth::True {
            continue;
        }
        match advisory.section {
            AdvisorySection::Monitoring => push_unique(&mut monitoring_items, &advisory.text),
            AdvisorySection::Lifestyle => push_unique(&mut lifestyle_items, &advisory.text),
            AdvisorySection::Warning => warnings.push(EngineWarning::new(
                WarningKind::SafetyCaution,
                advisory.text.clone(),
            )),
        }
    }

    tracing::info!(
        partition = %partition,
        recommendations = medication_recommendations.len(),
        warnings = warnings.len(),
        processing_us = start.elapsed().as_micros() as u64,
        "Guideline evaluation complete"
    );

    RecommendationSet {
        partition,
        partition_basis,
        guideline_source: kb.source.clone(),
        guideline_version: kb.version.clone(),
        medication_recommendations,
        monitoring_items,
        lifestyle_items,
        warnings,
    }
}

/// Stated type wins; LVEF is the fallback; neither gives the generic partition.
fn select_partition(
    profile: &PatientProfile,
    kb: &KnowledgeBase,
    warnings: &mut Vec<EngineWarning>,
) -> (Partition, PartitionBasis) {
    let stated = profile.hf_type.and_then(|t| t.partition());

    match (stated, profile.lvef_percent) {
        (Some(partition), lvef) => {
            if let Some(lvef) = lvef {
                let implied = kb.cutoffs.classify(lvef);
                if implied != partition {
                    warnings.push(EngineWarning::new(
                        WarningKind::ClassificationConflict,
                        MessageTemplates::classification_conflict(partition, lvef, implied),
                    ));
                }
            }
            (partition, PartitionBasis::Stated)
        }
        (None, Some(lvef)) => {
            let partition = kb.cutoffs.classify(lvef);
            warnings.push(EngineWarning::new(
                WarningKind::PartitionInferred,
                MessageTemplates::partition_inferred(partition, lvef),
            ));
            (
                partition,
                PartitionBasis::InferredFromLvef { lvef_percent: lvef },
            )
        }
        (None, None) => {
            warnings.push(EngineWarning::new(
                WarningKind::UnclassifiedPatient,
                MessageTemplates::unclassified(),
            ));
            (Partition::Unclassified, PartitionBasis::Unclassified)
        }
    }
}

/// Reason of the first satisfied contraindication, if any. Unknown ones
/// only produce a warning when nothing suppressed the rule.
fn check_contraindications<'r>(
    rule: &'r GuidelineRule,
    profile: &PatientProfile,
    warnings: &mut Vec<EngineWarning>,
) -> Option<&'r str> {
    let mut unconfirmed = Vec::new();
    for contraindication in &rule.contraindications {
        match contraindication.when.evaluate(profile) {
            Truth::True => return Some(contraindication.reason.as_str()),
            Truth::False => {}
            Truth::Unknown => unconfirmed.push(contraindication),
        }
    }
    for contraindication in unconfirmed {
        let missing = contraindication.when.missing_fields(profile);
        warnings.push(EngineWarning::new(
            WarningKind::MissingData,
            MessageTemplates::unconfirmed_contraindication(
                &rule.medication_class,
                &contraindication.reason,
                &missing,
            ),
        ));
    }
    None
}

fn build_item(rule: &GuidelineRule, profile: &PatientProfile) -> RecommendationItem {
    let current = rule
        .drug_classes
        .iter()
        .find_map(|class| profile.medication_in_class(*class));

    let (action, agents, instruction) = match current {
        None => initiate(rule),
        Some(current) => on_class(rule, current),
    };

    RecommendationItem {
        rule_id: rule.id.clone(),
        medication_class: rule.medication_class.clone(),
        priority_rank: rule.priority_rank,
        action,
        agents,
        instruction,
        rationale: rule.rationale.clone(),
        current_medication: current.cloned(),
    }
}

fn initiate(rule: &GuidelineRule) -> (RecommendationAction, Vec<AgentDosing>, String) {
    // Validation guarantees at least one preferred agent.
    let instruction = rule
        .preferred_agents
        .first()
        .map(MessageTemplates::initiate)
        .unwrap_or_default();
    (
        RecommendationAction::Initiate,
        rule.preferred_agents.clone(),
        instruction,
    )
}

fn on_class(
    rule: &GuidelineRule,
    current: &MedicationMention,
) -> (RecommendationAction, Vec<AgentDosing>, String) {
    let Some(index) = rule
        .preferred_agents
        .iter()
        .position(|a| a.name.eq_ignore_ascii_case(&current.name))
    else {
        return (
            RecommendationAction::Titrate,
            rule.preferred_agents.clone(),
            MessageTemplates::switch_within_class(
                current,
                &rule.medication_class,
                &rule.preferred_agents,
            ),
        );
    };

    // Current agent first, the rest in table order.
    let mut agents = rule.preferred_agents.clone();
    let agent = agents.remove(index);
    agents.insert(0, agent.clone());

    let (action, instruction) = match (agent.target_single_dose_mg, current.dose_mg) {
        (None, _) => (
            RecommendationAction::Continue,
            MessageTemplates::continue_current(current, &agent),
        ),
        (Some(target), Some(dose)) if dose >= target => (
            RecommendationAction::Continue,
            MessageTemplates::at_target(current, &agent),
        ),
        _ => (
            RecommendationAction::Titrate,
            MessageTemplates::titrate(current, &agent),
        ),
    };

    (action, agents, instruction)
}

fn push_unique(items: &mut Vec<String>, item: &str) {
    if !items.iter().any(|existing| existing == item) {
        items.push(item.to_string());
    }
}
