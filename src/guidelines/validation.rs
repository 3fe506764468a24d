//! Load-time validation: turns the raw JSON table into a [`KnowledgeBase`].
//!
//! Every check runs once here so that evaluation can assume a well-formed
//! table: required fields present, priority ranks unique per partition,
//! predicates naming only known fields, comorbidity tags, drug classes and
//! agents.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::models::{AgentDosing, DrugClass, Partition, ProfileField};
use crate::pipeline::extraction::comorbidities::is_known_tag;
use crate::pipeline::extraction::medications::is_known_generic;

use super::predicate::Predicate;
use super::types::{
    Advisory, Contraindication, GuidelineRule, KnowledgeBase, LvefCutoffs, RawAdvisory, RawAgent,
    RawGuidelineTable, RawPredicate, RawRule,
};
use super::SchemaError;

pub(crate) fn build_knowledge_base(raw: RawGuidelineTable) -> Result<KnowledgeBase, SchemaError> {
    let version = require(raw.version, "guideline table", "version")?;
    let source = require(raw.source, "guideline table", "source")?;
    let cutoffs = require(raw.lvef_cutoffs, "guideline table", "lvef_cutoffs")?;
    validate_cutoffs(&cutoffs)?;

    let mut partitions: BTreeMap<Partition, Vec<GuidelineRule>> = BTreeMap::new();
    let mut seen_ids: HashSet<String> = HashSet::new();

    for (key, raw_rules) in raw.partitions {
        let partition: Partition = key
            .parse()
            .map_err(|_| SchemaError::UnknownPartition(key.clone()))?;

        let mut ranks: HashMap<u32, String> = HashMap::new();
        let mut rules = Vec::with_capacity(raw_rules.len());

        for (index, raw_rule) in raw_rules.into_iter().enumerate() {
            let rule = build_rule(raw_rule, partition, index)?;

            if !seen_ids.insert(rule.id.clone()) {
                return Err(SchemaError::DuplicateRuleId(rule.id));
            }
            if let Some(first) = ranks.insert(rule.priority_rank, rule.id.clone()) {
                return Err(SchemaError::DuplicatePriority {
                    partition: partition.to_string(),
                    rank: rule.priority_rank,
                    first,
                    second: rule.id,
                });
            }
            rules.push(rule);
        }

        if rules.is_empty() {
            return Err(SchemaError::EmptyPartition(partition.to_string()));
        }
        partitions.insert(partition, rules);
    }

    for partition in Partition::all() {
        if !partitions.contains_key(partition) {
            return Err(SchemaError::MissingPartition(partition.to_string()));
        }
    }

    let advisories = raw
        .advisories
        .into_iter()
        .enumerate()
        .map(|(index, a)| build_advisory(a, index))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(KnowledgeBase {
        version,
        source,
        published: raw.published,
        cutoffs,
        baseline_monitoring: raw.baseline_monitoring,
        baseline_lifestyle: raw.baseline_lifestyle,
        advisories,
        partitions,
    })
}

fn validate_cutoffs(cutoffs: &LvefCutoffs) -> Result<(), SchemaError> {
    if cutoffs.reduced_max >= cutoffs.preserved_min {
        return Err(SchemaError::InvalidCutoffs(format!(
            "reduced_max ({}) must be below preserved_min ({})",
            cutoffs.reduced_max, cutoffs.preserved_min
        )));
    }
    if cutoffs.preserved_min > 100 {
        return Err(SchemaError::InvalidCutoffs(format!(
            "preserved_min ({}) exceeds 100",
            cutoffs.preserved_min
        )));
    }
    Ok(())
}

fn build_rule(raw: RawRule, partition: Partition, index: usize) -> Result<GuidelineRule, SchemaError> {
    let context = match &raw.id {
        Some(id) => format!("rule {id}"),
        None => format!("{partition} rule #{}", index + 1),
    };

    let id = require(raw.id, &context, "id")?;
    let medication_class = require(raw.medication_class, &context, "medication_class")?;
    let priority_rank = require(raw.priority_rank, &context, "priority_rank")?;
    let rationale = require(raw.rationale, &context, "rationale")?;
    let applies_when = compile(require(raw.applies_when, &context, "applies_when")?, &context)?;

    if raw.drug_classes.is_empty() {
        return Err(SchemaError::MissingField {
            context,
            field: "drug_classes".into(),
        });
    }
    let drug_classes = raw
        .drug_classes
        .iter()
        .map(|c| parse_class(c, &context))
        .collect::<Result<Vec<_>, _>>()?;

    if raw.preferred_agents.is_empty() {
        return Err(SchemaError::NoAgents(context));
    }
    let preferred_agents = raw
        .preferred_agents
        .into_iter()
        .map(|a| build_agent(a, &context))
        .collect::<Result<Vec<_>, _>>()?;

    let contraindications = raw
        .contraindications
        .into_iter()
        .map(|c| {
            let reason = require(c.reason, &context, "contraindications.reason")?;
            let when = compile(require(c.when, &context, "contraindications.when")?, &context)?;
            Ok(Contraindication { reason, when })
        })
        .collect::<Result<Vec<_>, SchemaError>>()?;

    Ok(GuidelineRule {
        id,
        medication_class,
        drug_classes,
        applies_when,
        preferred_agents,
        contraindications,
        monitoring_actions: raw.monitoring_actions,
        lifestyle_advice: raw.lifestyle_advice,
        rationale,
        priority_rank,
    })
}

fn build_agent(raw: RawAgent, context: &str) -> Result<AgentDosing, SchemaError> {
    let name = require(raw.name, context, "preferred_agents.name")?;
    if !is_known_generic(&name) {
        return Err(SchemaError::UnknownAgent {
            context: context.to_string(),
            agent: name,
        });
    }
    Ok(AgentDosing {
        name,
        starting_dose: require(raw.starting_dose, context, "preferred_agents.starting_dose")?,
        target_dose: require(raw.target_dose, context, "preferred_agents.target_dose")?,
        titration_note: raw.titration_note,
        target_single_dose_mg: raw.target_single_dose_mg,
    })
}

fn build_advisory(raw: RawAdvisory, index: usize) -> Result<Advisory, SchemaError> {
    let context = match &raw.id {
        Some(id) => format!("advisory {id}"),
        None => format!("advisory #{}", index + 1),
    };
    let id = require(raw.id, &context, "id")?;
    let text = require(raw.text, &context, "text")?;
    let when = compile(require(raw.when, &context, "when")?, &context)?;
    let partitions = raw
        .partitions
        .iter()
        .map(|p| p.parse().map_err(|_| SchemaError::UnknownPartition(p.clone())))
        .collect::<Result<Vec<Partition>, _>>()?;

    Ok(Advisory {
        id,
        section: raw.section,
        partitions,
        when,
        text,
    })
}

/// Resolve a raw predicate against the profile schema and vocabularies.
pub(crate) fn compile(raw: RawPredicate, context: &str) -> Result<Predicate, SchemaError> {
    Ok(match raw {
        RawPredicate::Always => Predicate::Always,
        RawPredicate::Compare { field, cmp, value } => Predicate::Compare {
            field: parse_field(&field, context)?,
            op: cmp,
            value,
        },
        RawPredicate::Known { field } => Predicate::Known(parse_field(&field, context)?),
        RawPredicate::HasComorbidity { tag } => {
            if !is_known_tag(&tag) {
                return Err(SchemaError::UnknownComorbidity {
                    context: context.to_string(),
                    tag,
                });
            }
            Predicate::HasComorbidity(tag)
        }
        RawPredicate::OnClass { class } => Predicate::OnClass(parse_class(&class, context)?),
        RawPredicate::OnAgent { agent } => {
            if !is_known_generic(&agent) {
                return Err(SchemaError::UnknownAgent {
                    context: context.to_string(),
                    agent,
                });
            }
            Predicate::OnAgent(agent.to_lowercase())
        }
        RawPredicate::All { of } => Predicate::All(compile_all(of, context)?),
        RawPredicate::Any { of } => Predicate::Any(compile_all(of, context)?),
        RawPredicate::Not { of } => Predicate::Not(Box::new(compile(*of, context)?)),
    })
}

fn compile_all(raw: Vec<RawPredicate>, context: &str) -> Result<Vec<Predicate>, SchemaError> {
    raw.into_iter().map(|p| compile(p, context)).collect()
}

fn parse_field(name: &str, context: &str) -> Result<ProfileField, SchemaError> {
    name.parse().map_err(|_| SchemaError::UnknownField {
        context: context.to_string(),
        field: name.to_string(),
    })
}

fn parse_class(name: &str, context: &str) -> Result<DrugClass, SchemaError> {
    name.parse().map_err(|_| SchemaError::UnknownDrugClass {
        context: context.to_string(),
        class: name.to_string(),
    })
}

fn require<T>(value: Option<T>, context: &str, field: &str) -> Result<T, SchemaError> {
    value.ok_or_else(|| SchemaError::MissingField {
        context: context.to_string(),
        field: field.to_string(),
    })
}
