use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "HF Guide";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variables
pub const ENV_ENTITY_SERVICE_URL: &str = "HFGUIDE_ENTITY_SERVICE_URL";
pub const ENV_ENTITY_SERVICE_TOKEN: &str = "HFGUIDE_ENTITY_SERVICE_TOKEN";
pub const ENV_ENTITY_SERVICE_TIMEOUT: &str = "HFGUIDE_ENTITY_SERVICE_TIMEOUT_SECS";
pub const ENV_GUIDELINES: &str = "HFGUIDE_GUIDELINES";

/// Bound on a single collaborator call.
pub const DEFAULT_ENTITY_SERVICE_TIMEOUT_SECS: u64 = 10;

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "hfguide=info,warn"
}

/// Settings for the optional external entity extraction collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityServiceConfig {
    pub url: Option<String>,
    pub token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for EntityServiceConfig {
    fn default() -> Self {
        Self {
            url: None,
            token: None,
            timeout_secs: DEFAULT_ENTITY_SERVICE_TIMEOUT_SECS,
        }
    }
}

impl EntityServiceConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset; an
    /// unparseable timeout falls back to the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let timeout_secs = non_blank(ENV_ENTITY_SERVICE_TIMEOUT)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_ENTITY_SERVICE_TIMEOUT_SECS);

        Self {
            url: non_blank(ENV_ENTITY_SERVICE_URL),
            token: non_blank(ENV_ENTITY_SERVICE_TOKEN),
            timeout_secs,
        }
    }

    /// Both endpoint and credential present. Anything less means the
    /// collaborator is unavailable.
    pub fn is_complete(&self) -> bool {
        self.url.is_some() && self.token.is_some()
    }
}

/// Guideline table override from the environment, if any.
pub fn guidelines_path_from_env() -> Option<PathBuf> {
    std::env::var_os(ENV_GUIDELINES)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}
