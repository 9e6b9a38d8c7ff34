use crate::domain::constants::STATE_DIR_ENV;
use crate::domain::models::{AppliedPolicy, FeedbackCard};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

pub fn audit(action: &str, data: serde_json::Value) {
    audit_at(audit_path(), action, data)
}

fn audit_at(path: anyhow::Result<PathBuf>, action: &str, data: serde_json::Value) {
    let path = match path {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(action, error = %e, "audit skipped: no state directory");
            return;
        }
    };
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let event = serde_json::json!({
        "ts": chrono::Utc::now().to_rfc3339(),
        "action": action,
        "data": data
    });
    if let Err(e) = append_line(&path, &event.to_string()) {
        tracing::warn!(action, error = %e, "audit append failed");
    }
}

/// `$LUKHAS_STATE_DIR`, falling back to `~/.lukhas/state`.
pub fn state_dir() -> anyhow::Result<PathBuf> {
    if let Ok(dir) = std::env::var(STATE_DIR_ENV) {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let home = std::env::var("HOME")?;
    Ok(PathBuf::from(home).join(".lukhas").join("state"))
}

pub fn config_path() -> anyhow::Result<PathBuf> {
    Ok(state_dir()?.join("feedgate.toml"))
}

pub fn feedback_path() -> anyhow::Result<PathBuf> {
    Ok(state_dir()?.join("feedback.jsonl"))
}

pub fn clusters_path() -> anyhow::Result<PathBuf> {
    Ok(state_dir()?.join("clusters.json"))
}

pub fn proposals_dir() -> anyhow::Result<PathBuf> {
    Ok(state_dir()?.join("proposals"))
}

pub fn digests_dir() -> anyhow::Result<PathBuf> {
    Ok(state_dir()?.join("digests"))
}

pub fn keys_dir() -> anyhow::Result<PathBuf> {
    Ok(state_dir()?.join("keys"))
}

pub fn applied_policy_path() -> anyhow::Result<PathBuf> {
    Ok(state_dir()?.join("applied_policy.json"))
}

fn audit_path() -> anyhow::Result<PathBuf> {
    Ok(state_dir()?.join("audit.jsonl"))
}

/// Appends one line with a single write on an append-mode handle so
/// concurrent writers cannot interleave inside a record.
fn append_line(path: &Path, line: &str) -> anyhow::Result<()> {
    let mut buf = String::with_capacity(line.len() + 1);
    buf.push_str(line);
    buf.push('\n');
    let mut f = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    f.write_all(buf.as_bytes())?;
    Ok(())
}

pub fn append_card_to(path: &Path, card: &FeedbackCard) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    append_line(path, &serde_json::to_string(card)?)
}

pub fn load_cards_from(path: &Path) -> anyhow::Result<Vec<FeedbackCard>> {
    if !path.exists() {
        return Ok(vec![]);
    }
    let raw = std::fs::read_to_string(path)?;
    let mut cards = Vec::new();
    for (idx, line) in raw.lines().enumerate() {
        let l = line.trim();
        if l.is_empty() {
            continue;
        }
        let card: FeedbackCard = serde_json::from_str(l).map_err(|e| {
            anyhow::anyhow!("{}:{}: malformed card: {}", path.display(), idx + 1, e)
        })?;
        cards.push(card);
    }
    Ok(cards)
}

pub fn append_card(card: &FeedbackCard) -> anyhow::Result<()> {
    append_card_to(&feedback_path()?, card)
}

pub fn load_cards() -> anyhow::Result<Vec<FeedbackCard>> {
    load_cards_from(&feedback_path()?)
}

/// Writes to a sibling temp file and renames it over `path`.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("path has no parent: {}", path.display()))?;
    std::fs::create_dir_all(parent)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let tmp = parent.join(format!(".{}.{}.tmp", file_name, std::process::id()));
    std::fs::write(&tmp, serde_json::to_string_pretty(value)?)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("read {}: {}", path.display(), e))?;
    Ok(serde_json::from_str(&raw)?)
}

pub fn load_applied_policy() -> anyhow::Result<AppliedPolicy> {
    let p = applied_policy_path()?;
    if !p.exists() {
        return Ok(AppliedPolicy::default());
    }
    read_json(&p)
}

pub fn save_applied_policy(policy: &AppliedPolicy) -> anyhow::Result<()> {
    write_json_atomic(&applied_policy_path()?, policy)
}
