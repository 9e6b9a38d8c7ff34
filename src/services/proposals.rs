use crate::domain::constants::*;
use crate::domain::errors::FeedbackError;
use crate::domain::models::{
    AppliedEntry, AppliedPolicy, ChangeProposal, FeedbackCard, FeedbackCluster, PolicySafePatch,
    ProposalConfig, ProposalSource, ProposalStatus, RiskTier, StatusChange, Style, TriageReport,
};
use crate::services::policy::{validate_patch, Guardrails};
use crate::services::storage::{read_json, write_json_atomic};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::Path;

const CONCISE_TAGS: [&str; 2] = ["too_verbose", "too_long"];
const DETAIL_TAGS: [&str; 3] = ["unclear", "too_short", "needs_detail"];
const EMPATHY_TAGS: [&str; 3] = ["tone", "rude", "cold"];
const TECHNICAL_TAGS: [&str; 2] = ["inaccurate", "wrong_answer"];

fn has_any(tags: &[String], wanted: &[&str]) -> bool {
    tags.iter().any(|t| wanted.contains(&t.as_str()))
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

fn pick_style(tags: &[String], guardrails: &Guardrails) -> Style {
    let wanted = if has_any(tags, &CONCISE_TAGS) {
        Style::Concise
    } else if has_any(tags, &DETAIL_TAGS) {
        Style::Detailed
    } else if has_any(tags, &EMPATHY_TAGS) {
        Style::Empathetic
    } else if has_any(tags, &TECHNICAL_TAGS) {
        Style::Technical
    } else {
        Style::Balanced
    };
    if guardrails.style_allowed(wanted) {
        return wanted;
    }
    if guardrails.style_allowed(Style::Balanced) {
        return Style::Balanced;
    }
    guardrails
        .allowed_styles
        .first()
        .copied()
        .unwrap_or(Style::Balanced)
}

/// Maps cluster statistics to a capped patch. `None` when the cluster is
/// within the satisfaction band with no common issues and no regression.
pub fn map_cluster(
    cluster: &FeedbackCluster,
    cfg: &ProposalConfig,
    guardrails: &Guardrails,
) -> Option<(PolicySafePatch, Vec<String>)> {
    let m = cluster.mean_satisfaction;
    let drifting = cluster.drift_delta.map(|d| d < DRIFT_ALERT).unwrap_or(false);
    let low = m < cfg.low_satisfaction;
    let high = m > cfg.high_satisfaction && cluster.common_issues.is_empty();
    if !low && !high && cluster.common_issues.is_empty() && !drifting {
        return None;
    }

    let mut rationale = Vec::new();
    let raw_delta = if low {
        rationale.push("low_satisfaction".to_string());
        cfg.low_satisfaction - m
    } else if high {
        rationale.push("high_satisfaction".to_string());
        -(m - cfg.high_satisfaction) / 2.0
    } else {
        0.0
    };
    for tag in &cluster.common_issues {
        rationale.push(format!("issue:{}", tag));
    }
    if let Some(d) = cluster.drift_delta.filter(|_| drifting) {
        rationale.push(format!("drift:{:.4}", d));
    }

    let mut depth = BASE_EXPLANATION_DEPTH as i32;
    if has_any(&cluster.common_issues, &DETAIL_TAGS) {
        depth += 1;
    }
    if has_any(&cluster.common_issues, &CONCISE_TAGS) {
        depth -= 1;
    }
    if drifting {
        depth += 1;
    }
    let depth = depth.clamp(MIN_EXPLANATION_DEPTH as i32, MAX_EXPLANATION_DEPTH as i32) as u8;

    let patch = PolicySafePatch {
        style: pick_style(&cluster.common_issues, guardrails),
        threshold_delta: guardrails.clamp_shift(round4(raw_delta)),
        explanation_depth: depth,
    };
    let noop = patch.style == Style::Balanced
        && patch.threshold_delta == 0.0
        && patch.explanation_depth == BASE_EXPLANATION_DEPTH;
    if noop {
        return None;
    }
    Some((patch, rationale))
}

/// Shift is rated against `max_shift`, the cap in force, so a patch at a
/// narrowed cap rates the same as one at the fixed cap.
pub fn risk_tier(patch: &PolicySafePatch, variance: f64, max_shift: f64) -> RiskTier {
    let max = max_shift.min(MAX_THRESHOLD_SHIFT);
    let shift = patch.threshold_delta.abs();
    let at_least = |share: f64| max > 0.0 && shift >= share * max;
    if at_least(0.75) || variance > HIGH_RISK_VARIANCE {
        RiskTier::High
    } else if at_least(0.25) || patch.style != Style::Balanced {
        RiskTier::Medium
    } else {
        RiskTier::Low
    }
}

#[derive(Serialize)]
struct ProposalIdentity<'a> {
    author: &'a str,
    source: &'a ProposalSource,
    patch: &'a PolicySafePatch,
}

fn proposal_id(author: &str, source: &ProposalSource, patch: &PolicySafePatch) -> anyhow::Result<String> {
    let bytes = serde_json::to_vec(&ProposalIdentity {
        author,
        source,
        patch,
    })?;
    let full = hex::encode(Sha256::digest(&bytes));
    Ok(full[..16].to_string())
}

#[allow(clippy::too_many_arguments)]
fn new_proposal(
    author: String,
    source: ProposalSource,
    patch: PolicySafePatch,
    rationale: Vec<String>,
    variance: f64,
    cfg: &ProposalConfig,
    guardrails: &Guardrails,
    now: DateTime<Utc>,
) -> anyhow::Result<ChangeProposal> {
    validate_patch(&patch, guardrails)?;
    let expires_at = Duration::try_hours(cfg.ttl_hours)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| {
            FeedbackError::InvalidConfig(format!(
                "proposals.ttl_hours {} is out of range",
                cfg.ttl_hours
            ))
        })?;
    Ok(ChangeProposal {
        proposal_id: proposal_id(&author, &source, &patch)?,
        risk_tier: risk_tier(&patch, variance, guardrails.max_threshold_shift),
        author,
        source,
        patch,
        rationale,
        created_at: now,
        expires_at,
        status: ProposalStatus::Pending,
        history: vec![],
    })
}

pub fn proposal_for_cluster(
    cluster: &FeedbackCluster,
    cfg: &ProposalConfig,
    guardrails: &Guardrails,
    now: DateTime<Utc>,
) -> anyhow::Result<Option<ChangeProposal>> {
    let Some((patch, rationale)) = map_cluster(cluster, cfg, guardrails) else {
        return Ok(None);
    };
    let source = ProposalSource::Cluster {
        task: cluster.task.clone(),
        jurisdiction: cluster.jurisdiction.clone(),
        size: cluster.size,
        mean_satisfaction: round4(cluster.mean_satisfaction),
    };
    new_proposal(
        TRIAGE_AUTHOR.to_string(),
        source,
        patch,
        rationale,
        cluster.variance,
        cfg,
        guardrails,
        now,
    )
    .map(Some)
}

pub fn proposal_for_card(
    card: &FeedbackCard,
    cfg: &ProposalConfig,
    guardrails: &Guardrails,
    now: DateTime<Utc>,
) -> anyhow::Result<ChangeProposal> {
    let Some(patch) = card.proposed_tuning.clone() else {
        anyhow::bail!("card carries no proposed tuning: {}", card.card_id);
    };
    let prefix: String = card.card_id.chars().take(12).collect();
    let source = ProposalSource::Card {
        card_id: card.card_id.clone(),
        task: card.task.clone(),
        jurisdiction: card.jurisdiction.clone(),
    };
    new_proposal(
        format!("card:{}", prefix),
        source,
        patch,
        vec!["user_proposed_tuning".to_string()],
        0.0,
        cfg,
        guardrails,
        now,
    )
}

/// Proposals for every cluster that needs one, plus the keys of clusters
/// that were left alone.
pub fn proposals_for_report(
    report: &TriageReport,
    cfg: &ProposalConfig,
    guardrails: &Guardrails,
    now: DateTime<Utc>,
) -> anyhow::Result<(Vec<ChangeProposal>, Vec<String>)> {
    let mut proposals = Vec::new();
    let mut satisfied = Vec::new();
    for cluster in &report.clusters {
        match proposal_for_cluster(cluster, cfg, guardrails, now)? {
            Some(p) => proposals.push(p),
            None => satisfied.push(cluster.key()),
        }
    }
    Ok((proposals, satisfied))
}

fn require_actor(actor: &str) -> Result<(), FeedbackError> {
    if actor.trim().is_empty() {
        return Err(FeedbackError::MissingField("actor"));
    }
    Ok(())
}

fn record(
    p: &mut ChangeProposal,
    to: ProposalStatus,
    actor: &str,
    reason: Option<String>,
    now: DateTime<Utc>,
) {
    p.history.push(StatusChange {
        ts: now,
        from: p.status,
        to,
        actor: actor.trim().to_string(),
        reason,
    });
    p.status = to;
}

pub fn approve(
    p: &mut ChangeProposal,
    guardrails: &Guardrails,
    actor: &str,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    require_actor(actor)?;
    if p.status != ProposalStatus::Pending {
        return Err(FeedbackError::InvalidTransition {
            from: p.status,
            to: ProposalStatus::Approved,
        }
        .into());
    }
    if p.is_expired(now) {
        return Err(FeedbackError::ProposalExpired(p.proposal_id.clone()).into());
    }
    validate_patch(&p.patch, guardrails)?;
    record(p, ProposalStatus::Approved, actor, None, now);
    Ok(())
}

pub fn reject(
    p: &mut ChangeProposal,
    actor: &str,
    reason: Option<String>,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    require_actor(actor)?;
    if !matches!(p.status, ProposalStatus::Pending | ProposalStatus::Approved) {
        return Err(FeedbackError::InvalidTransition {
            from: p.status,
            to: ProposalStatus::Rejected,
        }
        .into());
    }
    record(p, ProposalStatus::Rejected, actor, reason, now);
    Ok(())
}

/// Moves an approved proposal to `applied` and folds its patch into the
/// applied policy. The cumulative threshold offset stays within the cap.
/// If the policy already carries this proposal's entry (the policy write
/// landed but the proposal write did not), the entry is reused rather than
/// folded in twice.
pub fn apply(
    p: &mut ChangeProposal,
    policy: &mut AppliedPolicy,
    guardrails: &Guardrails,
    actor: &str,
    now: DateTime<Utc>,
) -> anyhow::Result<AppliedEntry> {
    require_actor(actor)?;
    if p.status != ProposalStatus::Approved {
        return Err(FeedbackError::InvalidTransition {
            from: p.status,
            to: ProposalStatus::Applied,
        }
        .into());
    }
    validate_patch(&p.patch, guardrails)?;

    let key = p.source.policy_key();
    if let Some(existing) = policy
        .entries
        .get(&key)
        .filter(|e| e.proposal_id == p.proposal_id)
        .cloned()
    {
        tracing::warn!(proposal = %p.proposal_id, "policy entry already present, completing apply");
        record(p, ProposalStatus::Applied, actor, None, now);
        return Ok(existing);
    }
    let previous = policy
        .entries
        .get(&key)
        .map(|e| e.threshold_offset)
        .unwrap_or(0.0);
    let entry = AppliedEntry {
        style: p.patch.style,
        threshold_offset: guardrails.clamp_shift(round4(previous + p.patch.threshold_delta)),
        explanation_depth: p.patch.explanation_depth,
        proposal_id: p.proposal_id.clone(),
        applied_at: now,
        applied_by: actor.trim().to_string(),
    };
    policy.entries.insert(key, entry.clone());
    record(p, ProposalStatus::Applied, actor, None, now);
    Ok(entry)
}

pub fn proposal_path(dir: &Path, id: &str) -> std::path::PathBuf {
    dir.join(format!("{}.json", id))
}

pub fn save_proposal(dir: &Path, p: &ChangeProposal) -> anyhow::Result<()> {
    write_json_atomic(&proposal_path(dir, &p.proposal_id), p)
}

pub fn load_proposal(dir: &Path, id: &str) -> anyhow::Result<ChangeProposal> {
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(FeedbackError::ProposalNotFound(id.to_string()).into());
    }
    let path = proposal_path(dir, id);
    if !path.exists() {
        return Err(FeedbackError::ProposalNotFound(id.to_string()).into());
    }
    read_json(&path)
}

pub fn list_proposals(dir: &Path) -> anyhow::Result<Vec<ChangeProposal>> {
    if !dir.exists() {
        return Ok(vec![]);
    }
    let mut out: Vec<ChangeProposal> = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_json = path.extension().map(|e| e == "json").unwrap_or(false);
        let hidden = path
            .file_name()
            .map(|n| n.to_string_lossy().starts_with('.'))
            .unwrap_or(true);
        if !is_json || hidden {
            continue;
        }
        out.push(read_json(&path)?);
    }
    out.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.proposal_id.cmp(&b.proposal_id))
    });
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 8, 0, 0).unwrap()
    }

    fn cluster(mean: f64, issues: &[&str], drift: Option<f64>) -> FeedbackCluster {
        FeedbackCluster {
            task: "summarize".to_string(),
            jurisdiction: "EU".to_string(),
            size: 4,
            mean_satisfaction: mean,
            variance: 0.01,
            common_issues: issues.iter().map(|s| s.to_string()).collect(),
            drift_delta: drift,
            card_ids: vec!["a".into(), "b".into(), "c".into(), "d".into()],
        }
    }

    fn cfg() -> ProposalConfig {
        ProposalConfig::default()
    }

    #[test]
    fn satisfied_cluster_gets_no_patch() {
        assert!(map_cluster(&cluster(0.7, &[], Some(0.0)), &cfg(), &Guardrails::default()).is_none());
    }

    #[test]
    fn low_satisfaction_shift_is_capped() {
        let (patch, rationale) =
            map_cluster(&cluster(0.2, &["too_verbose"], None), &cfg(), &Guardrails::default())
                .unwrap();
        assert_eq!(patch.style, Style::Concise);
        assert_eq!(patch.threshold_delta, 0.10);
        assert_eq!(patch.explanation_depth, 2);
        assert_eq!(
            rationale,
            vec!["low_satisfaction".to_string(), "issue:too_verbose".to_string()]
        );
    }

    #[test]
    fn small_deficit_maps_proportionally() {
        let (patch, _) =
            map_cluster(&cluster(0.45, &[], None), &cfg(), &Guardrails::default()).unwrap();
        assert_eq!(patch.style, Style::Balanced);
        assert_eq!(patch.threshold_delta, 0.05);
        assert_eq!(patch.explanation_depth, 3);
    }

    #[test]
    fn high_satisfaction_relaxes_threshold() {
        let (patch, rationale) =
            map_cluster(&cluster(0.9, &[], None), &cfg(), &Guardrails::default()).unwrap();
        assert_eq!(patch.threshold_delta, -0.05);
        assert_eq!(rationale, vec!["high_satisfaction".to_string()]);
    }

    #[test]
    fn drift_deepens_explanations() {
        let (patch, rationale) = map_cluster(
            &cluster(0.6, &["unclear"], Some(-0.3)),
            &cfg(),
            &Guardrails::default(),
        )
        .unwrap();
        assert_eq!(patch.style, Style::Detailed);
        assert_eq!(patch.threshold_delta, 0.0);
        assert_eq!(patch.explanation_depth, 5);
        assert!(rationale.contains(&"drift:-0.3000".to_string()));
    }

    #[test]
    fn disallowed_style_falls_back() {
        let g = Guardrails {
            max_threshold_shift: 0.02,
            allowed_styles: vec![Style::Balanced, Style::Technical],
        };
        let (patch, _) = map_cluster(&cluster(0.2, &["tone"], None), &cfg(), &g).unwrap();
        assert_eq!(patch.style, Style::Balanced);
        assert_eq!(patch.threshold_delta, 0.02);
    }

    #[test]
    fn risk_tiers() {
        let p = |style, d| PolicySafePatch {
            style,
            threshold_delta: d,
            explanation_depth: 3,
        };
        let max = MAX_THRESHOLD_SHIFT;
        assert_eq!(risk_tier(&p(Style::Balanced, 0.01), 0.0, max), RiskTier::Low);
        assert_eq!(risk_tier(&p(Style::Concise, 0.0), 0.0, max), RiskTier::Medium);
        assert_eq!(risk_tier(&p(Style::Balanced, 0.03), 0.0, max), RiskTier::Medium);
        assert_eq!(risk_tier(&p(Style::Balanced, -0.08), 0.0, max), RiskTier::High);
        assert_eq!(risk_tier(&p(Style::Balanced, 0.0), 0.2, max), RiskTier::High);
        assert_eq!(risk_tier(&p(Style::Balanced, 0.0), 0.0, 0.0), RiskTier::Low);
    }

    #[test]
    fn risk_follows_narrowed_cap() {
        let at_cap = PolicySafePatch {
            style: Style::Balanced,
            threshold_delta: 0.02,
            explanation_depth: 3,
        };
        assert_eq!(risk_tier(&at_cap, 0.0, MAX_THRESHOLD_SHIFT), RiskTier::Low);
        assert_eq!(risk_tier(&at_cap, 0.0, 0.02), RiskTier::High);

        let tight = Guardrails {
            max_threshold_shift: 0.02,
            allowed_styles: vec![Style::Balanced],
        };
        let p = proposal_for_cluster(&cluster(0.2, &[], None), &cfg(), &tight, now())
            .unwrap()
            .unwrap();
        assert_eq!(p.patch.threshold_delta, 0.02);
        assert_eq!(p.risk_tier, RiskTier::High);
    }

    #[test]
    fn ttl_out_of_range_is_a_config_error() {
        let mut huge = cfg();
        huge.ttl_hours = 9_000_000_000_000;
        let err = proposal_for_cluster(
            &cluster(0.2, &[], None),
            &huge,
            &Guardrails::default(),
            now(),
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FeedbackError>(),
            Some(FeedbackError::InvalidConfig(_))
        ));
    }

    #[test]
    fn proposal_ids_are_stable_for_same_input() {
        let c = cluster(0.2, &["too_verbose"], None);
        let g = Guardrails::default();
        let a = proposal_for_cluster(&c, &cfg(), &g, now()).unwrap().unwrap();
        let b = proposal_for_cluster(&c, &cfg(), &g, now() + Duration::hours(1))
            .unwrap()
            .unwrap();
        assert_eq!(a.proposal_id, b.proposal_id);
        assert_eq!(a.proposal_id.len(), 16);
        assert_eq!(a.status, ProposalStatus::Pending);
        assert_eq!(a.expires_at - a.created_at, Duration::hours(72));
    }

    #[test]
    fn lifecycle_approve_apply() {
        let g = Guardrails::default();
        let mut p = proposal_for_cluster(&cluster(0.2, &[], None), &cfg(), &g, now())
            .unwrap()
            .unwrap();
        let mut policy = AppliedPolicy::default();

        let err = apply(&mut p, &mut policy, &g, "ops", now()).unwrap_err();
        assert_eq!(
            err.downcast_ref::<FeedbackError>(),
            Some(&FeedbackError::InvalidTransition {
                from: ProposalStatus::Pending,
                to: ProposalStatus::Applied
            })
        );

        approve(&mut p, &g, "reviewer", now()).unwrap();
        let entry = apply(&mut p, &mut policy, &g, "ops", now()).unwrap();
        assert_eq!(p.status, ProposalStatus::Applied);
        assert_eq!(p.history.len(), 2);
        assert_eq!(entry.threshold_offset, 0.10);
        assert!(policy.entries.contains_key("summarize/EU"));
        assert!(reject(&mut p, "reviewer", None, now()).is_err());
    }

    #[test]
    fn interrupted_apply_completes_without_double_counting() {
        let g = Guardrails::default();
        let mut c = cluster(0.45, &[], None);
        c.size = 5;
        let mut p = proposal_for_cluster(&c, &cfg(), &g, now()).unwrap().unwrap();
        approve(&mut p, &g, "reviewer", now()).unwrap();
        let approved = p.clone();

        let mut policy = AppliedPolicy::default();
        let first = apply(&mut p, &mut policy, &g, "ops", now()).unwrap();
        assert_eq!(first.threshold_offset, 0.05);

        // The proposal file still says approved; the policy already has the entry.
        let mut retry = approved;
        let second = apply(&mut retry, &mut policy, &g, "ops", now()).unwrap();
        assert_eq!(second, first);
        assert_eq!(retry.status, ProposalStatus::Applied);
        assert_eq!(policy.entries["summarize/EU"].threshold_offset, 0.05);
    }

    #[test]
    fn cumulative_offset_is_clamped() {
        let g = Guardrails::default();
        let mut policy = AppliedPolicy::default();
        for hour in 0..3 {
            let mut c = cluster(0.2, &[], None);
            c.size = 4 + hour as usize;
            let t = now() + Duration::hours(hour);
            let mut p = proposal_for_cluster(&c, &cfg(), &g, t).unwrap().unwrap();
            approve(&mut p, &g, "r", t).unwrap();
            apply(&mut p, &mut policy, &g, "r", t).unwrap();
        }
        assert_eq!(policy.entries["summarize/EU"].threshold_offset, 0.10);
    }

    #[test]
    fn expired_proposal_cannot_be_approved() {
        let g = Guardrails::default();
        let mut p = proposal_for_cluster(&cluster(0.2, &[], None), &cfg(), &g, now())
            .unwrap()
            .unwrap();
        let later = now() + Duration::hours(73);
        let err = approve(&mut p, &g, "r", later).unwrap_err();
        assert!(err.to_string().contains("expired"), "{}", err);
        reject(&mut p, "r", Some("stale".to_string()), later).unwrap();
        assert_eq!(p.history[0].reason.as_deref(), Some("stale"));
    }

    #[test]
    fn approval_rechecks_tightened_guardrails() {
        let mut p = proposal_for_cluster(
            &cluster(0.2, &["too_verbose"], None),
            &cfg(),
            &Guardrails::default(),
            now(),
        )
        .unwrap()
        .unwrap();
        let tight = Guardrails {
            max_threshold_shift: 0.05,
            allowed_styles: vec![Style::Balanced],
        };
        assert!(approve(&mut p, &tight, "r", now()).is_err());
        assert_eq!(p.status, ProposalStatus::Pending);
    }

    #[test]
    fn blank_actor_is_rejected() {
        let g = Guardrails::default();
        let mut p = proposal_for_cluster(&cluster(0.2, &[], None), &cfg(), &g, now())
            .unwrap()
            .unwrap();
        assert!(approve(&mut p, &g, "  ", now()).is_err());
    }

    #[test]
    fn store_round_trip_and_listing() {
        let tmp = tempfile::TempDir::new().unwrap();
        let g = Guardrails::default();
        let p = proposal_for_cluster(&cluster(0.2, &[], None), &cfg(), &g, now())
            .unwrap()
            .unwrap();
        save_proposal(tmp.path(), &p).unwrap();
        assert_eq!(load_proposal(tmp.path(), &p.proposal_id).unwrap(), p);
        assert_eq!(list_proposals(tmp.path()).unwrap().len(), 1);
        assert!(load_proposal(tmp.path(), "../etc").is_err());
        assert!(load_proposal(tmp.path(), "deadbeef").is_err());
    }

    #[test]
    fn card_without_tuning_is_not_promotable() {
        let card = FeedbackCard {
            card_id: "ab".repeat(32),
            ts: now(),
            user_hash: "u".into(),
            session_hash: "s".into(),
            task: "qa".into(),
            jurisdiction: "US".into(),
            satisfaction: 0.1,
            issues: vec![],
            note: None,
            proposed_tuning: None,
            attestation: None,
        };
        assert!(proposal_for_card(&card, &cfg(), &Guardrails::default(), now()).is_err());

        let mut tuned = card.clone();
        tuned.proposed_tuning = Some(PolicySafePatch {
            style: Style::Technical,
            threshold_delta: -0.02,
            explanation_depth: 4,
        });
        let p = proposal_for_card(&tuned, &cfg(), &Guardrails::default(), now()).unwrap();
        assert_eq!(p.author, format!("card:{}", &tuned.card_id[..12]));
        assert_eq!(p.source.policy_key(), "qa/US");
    }
}
