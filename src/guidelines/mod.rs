pub mod predicate;
pub mod types;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_support;

pub use predicate::*;
pub use types::{
    Advisory, AdvisorySection, Contraindication, GuidelineRule, KnowledgeBase, LvefCutoffs,
};

use std::path::Path;
use std::sync::LazyLock;

use thiserror::Error;

use types::RawGuidelineTable;

/// Guideline table shipped with the crate.
const BUNDLED_GUIDELINES: &str = include_str!("../../resources/guidelines.json");

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Guideline table could not be read ({path}): {message}")]
    Io { path: String, message: String },

    #[error("Guideline table is not valid JSON: {0}")]
    Parse(String),

    #[error("{context}: missing required field `{field}`")]
    MissingField { context: String, field: String },

    #[error("Unknown guideline partition: {0}")]
    UnknownPartition(String),

    #[error("Guideline partition {0} is missing")]
    MissingPartition(String),

    #[error("Guideline partition {0} has no rules")]
    EmptyPartition(String),

    #[error("Duplicate priority_rank {rank} in {partition}: {first} and {second}")]
    DuplicatePriority {
        partition: String,
        rank: u32,
        first: String,
        second: String,
    },

    #[error("Duplicate rule id: {0}")]
    DuplicateRuleId(String),

    #[error("{context}: predicate references unknown field `{field}`")]
    UnknownField { context: String, field: String },

    #[error("{context}: unknown drug class `{class}`")]
    UnknownDrugClass { context: String, class: String },

    #[error("{context}: unknown comorbidity tag `{tag}`")]
    UnknownComorbidity { context: String, tag: String },

    #[error("{context}: unknown agent `{agent}`")]
    UnknownAgent { context: String, agent: String },

    #[error("{0}: no preferred agents")]
    NoAgents(String),

    #[error("Invalid LVEF cutoffs: {0}")]
    InvalidCutoffs(String),
}

/// Parse and validate a guideline table.
pub fn load_from_str(json: &str) -> Result<KnowledgeBase, SchemaError> {
    let raw: RawGuidelineTable =
        serde_json::from_str(json).map_err(|e| SchemaError::Parse(e.to_string()))?;
    let kb = validation::build_knowledge_base(raw)?;

    tracing::info!(
        version = %kb.version,
        rules = kb.rule_count(),
        advisories = kb.advisories.len(),
        "Guideline knowledge base loaded"
    );

    Ok(kb)
}

/// Load a guideline table from disk.
pub fn load_from_path(path: &Path) -> Result<KnowledgeBase, SchemaError> {
    let json = std::fs::read_to_string(path).map_err(|e| SchemaError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    load_from_str(&json)
}

static BUNDLED: LazyLock<Result<KnowledgeBase, SchemaError>> =
    LazyLock::new(|| load_from_str(BUNDLED_GUIDELINES));

/// The bundled table, parsed once per process and shared read-only.
pub fn bundled() -> Result<&'static KnowledgeBase, SchemaError> {
    BUNDLED.as_ref().map_err(Clone::clone)
}
