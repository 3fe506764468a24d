use crate::models::{AgentDosing, MedicationMention, Partition, ProfileField};

/// Message template builder for engine instructions and warnings.
/// Wording is clinician-facing: state the finding, then the action.
pub struct MessageTemplates;

impl MessageTemplates {
    /// New start with the first preferred agent.
    pub fn initiate(agent: &AgentDosing) -> String {
        let mut out = format!(
            "Start {} {}; target {}.",
            agent.name, agent.starting_dose, agent.target_dose
        );
        append_note(&mut out, &agent.titration_note);
        out
    }

    /// On a preferred agent below its target dose, or dose not documented.
    pub fn titrate(current: &MedicationMention, agent: &AgentDosing) -> String {
        let mut out = format!(
            "Already on {}. Titrate toward {}.",
            current.describe(),
            agent.target_dose
        );
        append_note(&mut out, &agent.titration_note);
        out
    }

    /// On a preferred agent at or above its target dose.
    pub fn at_target(current: &MedicationMention, agent: &AgentDosing) -> String {
        format!(
            "Continue {} (at target dose, {}).",
            current.describe(),
            agent.target_dose
        )
    }

    /// On a preferred agent that has no numeric target.
    pub fn continue_current(current: &MedicationMention, agent: &AgentDosing) -> String {
        let mut out = format!("Continue {}.", current.describe());
        append_note(&mut out, &agent.titration_note);
        out
    }

    /// On the class, but not on one of the preferred agents.
    pub fn switch_within_class(
        current: &MedicationMention,
        medication_class: &str,
        agents: &[AgentDosing],
    ) -> String {
        format!(
            "Already on {}. Optimize {} therapy; preferred agents: {}.",
            current.describe(),
            medication_class,
            agent_names(agents),
        )
    }

    pub fn suppressed(medication_class: &str, reason: &str) -> String {
        format!("{medication_class} not recommended: {reason}.")
    }

    pub fn unevaluated_rule(medication_class: &str, missing: &[ProfileField]) -> String {
        format!(
            "{medication_class} could not be evaluated: {} not reported.",
            field_labels(missing)
        )
    }

    pub fn unconfirmed_contraindication(
        medication_class: &str,
        reason: &str,
        missing: &[ProfileField],
    ) -> String {
        format!(
            "{medication_class}: confirm no {reason} ({} not reported).",
            field_labels(missing)
        )
    }

    pub fn partition_inferred(partition: Partition, lvef_percent: u8) -> String {
        format!(
            "Heart failure type not stated; {partition} inferred from LVEF {lvef_percent}%."
        )
    }

    pub fn classification_conflict(stated: Partition, lvef_percent: u8, implied: Partition) -> String {
        format!(
            "Stated {stated} but LVEF {lvef_percent}% falls in the {implied} range; \
             using the stated type. Please verify."
        )
    }

    pub fn unclassified() -> String {
        "Heart failure type and LVEF not found; recommendations are generic and low-confidence. \
         An echocardiogram is needed to classify."
            .to_string()
    }

    pub fn no_safe_recommendation() -> String {
        "No safe automated medication recommendation; clinician review required.".to_string()
    }

    pub fn extraction_degraded(reason: &str) -> String {
        format!("External entity extraction unavailable ({reason}); local extraction used.")
    }
}

fn append_note(out: &mut String, note: &str) {
    if !note.is_empty() {
        out.push(' ');
        out.push_str(note);
        if !note.ends_with('.') {
            out.push('.');
        }
    }
}

fn agent_names(agents: &[AgentDosing]) -> String {
    agents
        .iter()
        .map(|a| a.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn field_labels(fields: &[ProfileField]) -> String {
    fields
        .iter()
        .map(|f| f.label())
        .collect::<Vec<_>>()
        .join(", ")
}
