//! Skip configuration stored as TOML (default `.skipcheck.toml`).

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::concurrency::ConcurrencyPolicy;
use crate::core::filter::{BacktrackLimit, Filter, GLOBAL_FILTER_NAME};
use crate::core::glob::PathMatcher;
use crate::core::types::TriggerEvent;

pub const DEFAULT_CONFIG_FILE: &str = ".skipcheck.toml";

/// Skip decision configuration (TOML).
///
/// Unknown keys, trigger kinds and policies are rejected when parsing so that
/// typos fail loudly instead of silently disabling a check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct SkipConfig {
    /// Include globs of the global filter.
    pub paths: Vec<String>,

    /// Ignore globs of the global filter.
    pub paths_ignore: Vec<String>,

    /// Named filters reported alongside the global one.
    pub paths_filter: BTreeMap<String, FilterConfig>,

    /// Trigger kinds that always run.
    pub do_not_skip: Vec<TriggerEvent>,

    pub concurrent_skipping: ConcurrencyPolicy,

    pub skip_after_successful_duplicate: bool,

    /// Cancel older in-flight runs on the same branch before deciding.
    pub cancel_others: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct FilterConfig {
    pub paths: Vec<String>,
    pub paths_ignore: Vec<String>,
    pub backtracking: BacktrackLimit,
}

impl Default for SkipConfig {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            paths_ignore: Vec::new(),
            paths_filter: BTreeMap::new(),
            do_not_skip: vec![TriggerEvent::WorkflowDispatch, TriggerEvent::Schedule],
            concurrent_skipping: ConcurrencyPolicy::Never,
            skip_after_successful_duplicate: true,
            cancel_others: false,
        }
    }
}

impl SkipConfig {
    pub fn validate(&self) -> Result<()> {
        self.filters().map(|_| ())
    }

    /// Compile the global filter followed by every named filter.
    pub fn filters(&self) -> Result<Vec<Filter>> {
        let mut filters = Vec::with_capacity(self.paths_filter.len() + 1);
        filters.push(Filter::global(
            PathMatcher::new(&self.paths).context("paths")?,
            PathMatcher::new(&self.paths_ignore).context("paths_ignore")?,
        ));
        for (name, cfg) in &self.paths_filter {
            if name.trim().is_empty() {
                return Err(anyhow!("paths_filter names must be non-empty"));
            }
            if name == GLOBAL_FILTER_NAME {
                return Err(anyhow!(
                    "paths_filter.{GLOBAL_FILTER_NAME} is reserved for the top-level paths"
                ));
            }
            filters.push(Filter::named(
                name.clone(),
                PathMatcher::new(&cfg.paths)
                    .with_context(|| format!("paths_filter.{name}.paths"))?,
                PathMatcher::new(&cfg.paths_ignore)
                    .with_context(|| format!("paths_filter.{name}.paths_ignore"))?,
                cfg.backtracking,
            ));
        }
        Ok(filters)
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `SkipConfig::default()`.
pub fn load_config(path: &Path) -> Result<SkipConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "config missing, using defaults");
        let cfg = SkipConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg = parse_config(&contents).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}

/// Parse and validate config from TOML text.
pub fn parse_config(contents: &str) -> Result<SkipConfig> {
    let cfg: SkipConfig = toml::from_str(contents)?;
    cfg.validate()?;
    Ok(cfg)
}
