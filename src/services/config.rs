use crate::domain::constants::{MAX_DEDUP_WINDOW_SECS, MAX_PROPOSAL_TTL_HOURS};
use crate::domain::errors::FeedbackError;
use crate::domain::models::ConfigFile;
use crate::services::storage::config_path;
use std::path::Path;

pub fn load_config() -> anyhow::Result<ConfigFile> {
    load_config_from(&config_path()?)
}

pub fn load_config_from(path: &Path) -> anyhow::Result<ConfigFile> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(ConfigFile::default());
    }
    let raw = std::fs::read_to_string(path)?;
    let cfg: ConfigFile = toml::from_str(&raw)?;
    check_config(&cfg)?;
    Ok(cfg)
}

fn check_config(cfg: &ConfigFile) -> Result<(), FeedbackError> {
    if cfg.triage.min_cluster_size == 0 {
        return Err(FeedbackError::InvalidConfig(
            "triage.min_cluster_size must be at least 1".to_string(),
        ));
    }
    if !(0..=MAX_DEDUP_WINDOW_SECS).contains(&cfg.triage.dedup_window_secs) {
        return Err(FeedbackError::InvalidConfig(format!(
            "triage.dedup_window_secs must be within 0..={}",
            MAX_DEDUP_WINDOW_SECS
        )));
    }
    if !(1..=MAX_PROPOSAL_TTL_HOURS).contains(&cfg.proposals.ttl_hours) {
        return Err(FeedbackError::InvalidConfig(format!(
            "proposals.ttl_hours must be within 1..={}",
            MAX_PROPOSAL_TTL_HOURS
        )));
    }
    let p = &cfg.proposals;
    if !(0.0..=1.0).contains(&p.low_satisfaction)
        || !(0.0..=1.0).contains(&p.high_satisfaction)
        || p.low_satisfaction > p.high_satisfaction
    {
        return Err(FeedbackError::InvalidConfig(
            "proposals.low_satisfaction <= high_satisfaction, both within [0, 1]".to_string(),
        ));
    }
    if cfg.redaction.secret_env.trim().is_empty() {
        return Err(FeedbackError::InvalidConfig(
            "redaction.secret_env must name an environment variable".to_string(),
        ));
    }
    Ok(())
}
