use crate::cli::{Cli, Commands, ConfigCommands, DigestCommands, KeyCommands, ProposalCommands};
use crate::domain::models::{ChangeProposal, ConfigFile, FeedbackDigest, KeyStatus};
use crate::services::digest::{build_digest, prove, verify_digest, verify_proof};
use crate::services::output::{print_checked, print_one, print_out};
use crate::services::policy::Guardrails;
use crate::services::proposals::{apply, approve, list_proposals, load_proposal, reject, save_proposal};
use crate::services::storage::{
    audit, digests_dir, load_applied_policy, load_cards, proposals_dir, read_json,
    save_applied_policy, state_dir, write_json_atomic,
};
use crate::services::trust::{is_trusted, keys_init, list_pubkeys, load_signing_key, public_key_hex, trust_add};
use chrono::Utc;
use serde::Serialize;

fn proposal_row(p: &ChangeProposal) -> String {
    format!(
        "{}\t{}\t{}\t{}\t{:+.4}\tdepth={}\trisk={:?}\texpires={}",
        p.proposal_id,
        p.status,
        p.source.policy_key(),
        p.patch.style,
        p.patch.threshold_delta,
        p.patch.explanation_depth,
        p.risk_tier,
        p.expires_at.to_rfc3339()
    )
}

pub fn handle_proposal_commands(cli: &Cli, guardrails: &Guardrails) -> anyhow::Result<bool> {
    let Commands::Proposals { command } = &cli.command else {
        return Ok(false);
    };
    let dir = proposals_dir()?;
    let now = Utc::now();

    match command {
        ProposalCommands::List { status } => {
            let items: Vec<ChangeProposal> = list_proposals(&dir)?
                .into_iter()
                .filter(|p| status.map(|s| p.status == s).unwrap_or(true))
                .collect();
            print_out(cli.json, &items, proposal_row)?;
        }
        ProposalCommands::Show { id } => {
            let p = load_proposal(&dir, id)?;
            print_one(cli.json, p, |p| {
                let mut lines = vec![proposal_row(p), format!("author: {}", p.author)];
                lines.push(format!("rationale: {}", p.rationale.join(", ")));
                for h in &p.history {
                    lines.push(format!(
                        "{}\t{} -> {}\tby {}{}",
                        h.ts.to_rfc3339(),
                        h.from,
                        h.to,
                        h.actor,
                        h.reason
                            .as_deref()
                            .map(|r| format!(" ({})", r))
                            .unwrap_or_default()
                    ));
                }
                lines.join("\n")
            })?;
        }
        ProposalCommands::Approve { id, actor } => {
            let mut p = load_proposal(&dir, id)?;
            approve(&mut p, guardrails, actor, now)?;
            save_proposal(&dir, &p)?;
            audit(
                "proposal_approve",
                serde_json::json!({"proposal": p.proposal_id, "actor": actor}),
            );
            print_one(cli.json, p, |p| format!("approved {}", p.proposal_id))?;
        }
        ProposalCommands::Reject { id, actor, reason } => {
            let mut p = load_proposal(&dir, id)?;
            reject(&mut p, actor, reason.clone(), now)?;
            save_proposal(&dir, &p)?;
            audit(
                "proposal_reject",
                serde_json::json!({"proposal": p.proposal_id, "actor": actor, "reason": reason}),
            );
            print_one(cli.json, p, |p| format!("rejected {}", p.proposal_id))?;
        }
        ProposalCommands::Apply { id, actor } => {
            let mut p = load_proposal(&dir, id)?;
            let mut policy = load_applied_policy()?;
            let entry = apply(&mut p, &mut policy, guardrails, actor, now)?;
            // Policy first: a retry after a failed proposal write reuses the entry.
            save_applied_policy(&policy)?;
            save_proposal(&dir, &p)?;
            audit(
                "proposal_apply",
                serde_json::json!({
                    "proposal": p.proposal_id,
                    "actor": actor,
                    "key": p.source.policy_key(),
                    "threshold_offset": entry.threshold_offset,
                }),
            );
            let data = serde_json::json!({"proposal": p, "applied": entry});
            print_one(cli.json, data, |_| {
                format!(
                    "applied {} to {} (offset {:+.4})",
                    p.proposal_id,
                    p.source.policy_key(),
                    entry.threshold_offset
                )
            })?;
        }
        ProposalCommands::Applied => {
            let policy = load_applied_policy()?;
            print_one(cli.json, &policy, |p| {
                if p.entries.is_empty() {
                    return "(none)".to_string();
                }
                p.entries
                    .iter()
                    .map(|(k, e)| {
                        format!(
                            "{}\t{}\t{:+.4}\tdepth={}\tfrom={}",
                            k, e.style, e.threshold_offset, e.explanation_depth, e.proposal_id
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })?;
        }
    }

    Ok(true)
}

pub fn handle_digest_commands(cli: &Cli) -> anyhow::Result<bool> {
    let Commands::Digest { command } = &cli.command else {
        return Ok(false);
    };

    match command {
        DigestCommands::Build => {
            let cards = load_cards()?;
            let key = load_signing_key()?;
            let digest = build_digest(&cards, &key, Utc::now());
            let dir = digests_dir()?;
            write_json_atomic(&dir.join(format!("{}.json", &digest.root[..16])), &digest)?;
            write_json_atomic(&dir.join("latest.json"), &digest)?;
            audit(
                "digest_build",
                serde_json::json!({"root": digest.root, "count": digest.count}),
            );
            tracing::info!(root = %digest.root, count = digest.count, "digest signed");
            print_one(cli.json, digest, |d| {
                format!("digest {} over {} cards", d.root, d.count)
            })?;
        }
        DigestCommands::Verify { file } => {
            let path = match file {
                Some(p) => p.clone(),
                None => digests_dir()?.join("latest.json"),
            };
            if !path.exists() {
                anyhow::bail!(
                    "no digest at {}: run `feedgate digest build` first",
                    path.display()
                );
            }
            let digest: FeedbackDigest = read_json(&path)?;
            let cards = load_cards()?;
            let check = verify_digest(&digest, &cards, is_trusted(&digest.public_key)?);
            let ok = check.root_matches && check.signature_ok && check.trusted_key;
            print_checked(cli.json, ok, check, |c| {
                format!(
                    "digest {}: root_matches={} signature_ok={} trusted_key={}",
                    if ok { "valid" } else { "INVALID" },
                    c.root_matches,
                    c.signature_ok,
                    c.trusted_key
                )
            })?;
            if !ok {
                std::process::exit(1);
            }
        }
        DigestCommands::Prove { card_id } => {
            let ids: Vec<String> = load_cards()?.into_iter().map(|c| c.card_id).collect();
            let proof = prove(&ids, card_id.trim())?;
            let ok = verify_proof(&proof);
            print_checked(cli.json, ok, proof, |p| {
                format!(
                    "card {} at index {} under root {} ({} steps)",
                    p.card_id,
                    p.index,
                    p.root,
                    p.path.len()
                )
            })?;
        }
    }

    Ok(true)
}

pub fn handle_key_commands(cli: &Cli) -> anyhow::Result<bool> {
    let Commands::Keys { command } = &cli.command else {
        return Ok(false);
    };

    match command {
        KeyCommands::Init { force } => {
            let public = keys_init(*force)?;
            audit("keys_init", serde_json::json!({"public_key": public, "rotated": force}));
            print_one(cli.json, public, |k| format!("signing key ready: {}", k))?;
        }
        KeyCommands::Show => {
            let status = KeyStatus {
                public_key: public_key_hex()?,
                trusted: list_pubkeys()?,
            };
            print_one(cli.json, status, |s| {
                let mut lines = vec![format!(
                    "signing key: {}",
                    s.public_key.as_deref().unwrap_or("none")
                )];
                lines.extend(s.trusted.iter().map(|k| format!("trusted: {}", k)));
                lines.join("\n")
            })?;
        }
        KeyCommands::Trust { public_key } => {
            let added = trust_add(public_key)?;
            if added {
                audit("keys_trust", serde_json::json!({"public_key": public_key}));
            }
            print_one(cli.json, added, |a| {
                if *a {
                    "key trusted".to_string()
                } else {
                    "key already trusted".to_string()
                }
            })?;
        }
    }

    Ok(true)
}

#[derive(Serialize)]
struct ConfigView<'a> {
    state_dir: String,
    config: &'a ConfigFile,
    effective_guardrails: &'a Guardrails,
}

pub fn handle_config_commands(
    cli: &Cli,
    cfg: &ConfigFile,
    guardrails: &Guardrails,
) -> anyhow::Result<bool> {
    let Commands::Config { command } = &cli.command else {
        return Ok(false);
    };

    match command {
        ConfigCommands::Show => {
            let view = ConfigView {
                state_dir: state_dir()?.to_string_lossy().to_string(),
                config: cfg,
                effective_guardrails: guardrails,
            };
            let text = toml::to_string_pretty(cfg)?;
            print_one(cli.json, view, |v| format!("# state: {}\n{}", v.state_dir, text))?;
        }
    }

    Ok(true)
}
