use crate::cli::{Cli, Commands, FeedbackCommands, IngestArgs};
use crate::domain::errors::FeedbackError;
use crate::domain::models::{
    CardInput, ConfigFile, FeedbackCard, IngestReport, PolicySafePatch, PromoteReport,
};
use crate::services::ingest::{build_card, parse_inputs, sign_card, verify_card};
use crate::services::output::{print_checked, print_one, print_out};
use crate::services::policy::Guardrails;
use crate::services::proposals::{
    proposal_for_card, proposal_path, proposals_for_report, save_proposal,
};
use crate::services::redact::redaction_secret;
use crate::services::storage::{
    append_card, audit, clusters_path, load_cards, proposals_dir, write_json_atomic,
};
use crate::services::triage::run_triage;
use crate::services::trust::{is_trusted, load_signing_key};
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;

pub fn handle_feedback_commands(
    cli: &Cli,
    cfg: &ConfigFile,
    guardrails: &Guardrails,
) -> anyhow::Result<bool> {
    match &cli.command {
        Commands::Ingest(args) => run_ingest(cli.json, args, cfg, guardrails)?,
        Commands::Feedback { command } => match command {
            FeedbackCommands::List { task, jurisdiction } => {
                let task = task.as_deref().map(|t| t.trim().to_ascii_lowercase());
                let jurisdiction = jurisdiction
                    .as_deref()
                    .map(|j| j.trim().to_ascii_uppercase());
                let cards: Vec<FeedbackCard> = load_cards()?
                    .into_iter()
                    .filter(|c| task.as_ref().map(|t| &c.task == t).unwrap_or(true))
                    .filter(|c| {
                        jurisdiction
                            .as_ref()
                            .map(|j| &c.jurisdiction == j)
                            .unwrap_or(true)
                    })
                    .collect();
                print_out(cli.json, &cards, |c| {
                    format!(
                        "{}\t{}\t{}/{}\t{:.2}\t{}",
                        short(&c.card_id),
                        c.ts.to_rfc3339(),
                        c.task,
                        c.jurisdiction,
                        c.satisfaction,
                        c.issues.join(",")
                    )
                })?;
            }
            FeedbackCommands::Verify => run_verify(cli.json)?,
        },
        Commands::Cluster => {
            let cards = load_cards()?;
            let report = run_triage(&cards, &cfg.triage, Utc::now());
            write_json_atomic(&clusters_path()?, &report)?;
            audit(
                "cluster",
                serde_json::json!({"total": report.total, "clusters": report.clusters.len()}),
            );
            print_one(cli.json, report, |r| {
                let mut lines = vec![format!(
                    "total={} deduplicated={} clustered={} unclustered={}",
                    r.total, r.deduplicated, r.clustered, r.unclustered
                )];
                for c in &r.clusters {
                    lines.push(format!(
                        "{}\tsize={}\tmean={:.3}\tvar={:.4}\tdrift={}\tissues={}",
                        c.key(),
                        c.size,
                        c.mean_satisfaction,
                        c.variance,
                        c.drift_delta
                            .map(|d| format!("{:+.3}", d))
                            .unwrap_or_else(|| "n/a".to_string()),
                        c.common_issues.join(",")
                    ));
                }
                lines.join("\n")
            })?;
        }
        Commands::Promote { card } => run_promote(cli.json, card.as_deref(), cfg, guardrails)?,
        _ => return Ok(false),
    }
    Ok(true)
}

fn short(id: &str) -> &str {
    id.get(..12).unwrap_or(id)
}

fn parse_ts(raw: &str) -> anyhow::Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw.trim())
        .with_context(|| format!("invalid --ts: {}", raw))?
        .with_timezone(&Utc))
}

fn input_from_args(args: &IngestArgs) -> anyhow::Result<CardInput> {
    let proposed_tuning = match args.style {
        Some(style) => Some(PolicySafePatch {
            style,
            threshold_delta: args
                .threshold_delta
                .ok_or(FeedbackError::MissingField("threshold_delta"))?,
            explanation_depth: args.depth.ok_or(FeedbackError::MissingField("depth"))?,
        }),
        None => None,
    };
    Ok(CardInput {
        user_id: args.user.clone().ok_or(FeedbackError::MissingField("user"))?,
        session_id: args
            .session
            .clone()
            .ok_or(FeedbackError::MissingField("session"))?,
        task: args.task.clone().ok_or(FeedbackError::MissingField("task"))?,
        jurisdiction: args
            .jurisdiction
            .clone()
            .ok_or(FeedbackError::MissingField("jurisdiction"))?,
        satisfaction: args
            .satisfaction
            .ok_or(FeedbackError::MissingField("satisfaction"))?,
        issues: args.issues.clone(),
        note: args.note.clone(),
        proposed_tuning,
        ts: args.ts.as_deref().map(parse_ts).transpose()?,
    })
}

fn run_ingest(
    json: bool,
    args: &IngestArgs,
    cfg: &ConfigFile,
    guardrails: &Guardrails,
) -> anyhow::Result<()> {
    let secret = redaction_secret(cfg)?;
    let inputs = match &args.file {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("read {}", path.display()))?;
            parse_inputs(&raw)?
        }
        None => vec![input_from_args(args)?],
    };
    if inputs.is_empty() {
        anyhow::bail!("no feedback records in input");
    }
    let key = if args.sign {
        Some(load_signing_key()?)
    } else {
        None
    };

    // Validate the whole batch before appending anything.
    let now = Utc::now();
    let mut cards = Vec::with_capacity(inputs.len());
    for (idx, input) in inputs.iter().enumerate() {
        let mut card = build_card(input, &secret, guardrails, now)
            .with_context(|| format!("feedback record {}", idx + 1))?;
        if let Some(k) = &key {
            sign_card(&mut card, k)?;
        }
        cards.push(card);
    }
    for card in &cards {
        append_card(card)?;
    }
    tracing::info!(count = cards.len(), signed = key.is_some(), "feedback ingested");

    let report = IngestReport {
        ingested: cards.len(),
        signed: if key.is_some() { cards.len() } else { 0 },
        card_ids: cards.iter().map(|c| c.card_id.clone()).collect(),
    };
    audit(
        "ingest",
        serde_json::json!({"count": report.ingested, "signed": report.signed}),
    );
    print_one(json, report, |r| {
        format!("ingested {} cards ({} signed)", r.ingested, r.signed)
    })
}

#[derive(Serialize)]
struct VerifyReport {
    checked: usize,
    signed: usize,
    invalid: Vec<String>,
    untrusted: Vec<String>,
}

fn run_verify(json: bool) -> anyhow::Result<()> {
    let cards = load_cards()?;
    let mut report = VerifyReport {
        checked: cards.len(),
        signed: 0,
        invalid: vec![],
        untrusted: vec![],
    };
    for card in &cards {
        if !verify_card(card)? {
            report.invalid.push(card.card_id.clone());
            continue;
        }
        if let Some(a) = &card.attestation {
            report.signed += 1;
            if !is_trusted(&a.public_key)? {
                report.untrusted.push(card.card_id.clone());
            }
        }
    }
    let ok = report.invalid.is_empty();
    print_checked(json, ok, &report, |r| {
        format!(
            "checked={} signed={} invalid={} untrusted={}",
            r.checked,
            r.signed,
            r.invalid.len(),
            r.untrusted.len()
        )
    })?;
    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

fn find_card<'a>(cards: &'a [FeedbackCard], id: &str) -> anyhow::Result<&'a FeedbackCard> {
    let id = id.trim().to_ascii_lowercase();
    if let Some(exact) = cards.iter().find(|c| c.card_id == id) {
        return Ok(exact);
    }
    let matches: Vec<&FeedbackCard> = cards
        .iter()
        .filter(|c| !id.is_empty() && c.card_id.starts_with(&id))
        .collect();
    match matches.as_slice() {
        [one] => Ok(*one),
        [] => Err(FeedbackError::CardNotFound(id).into()),
        _ => anyhow::bail!("card id prefix is ambiguous: {}", id),
    }
}

fn run_promote(
    json: bool,
    card: Option<&str>,
    cfg: &ConfigFile,
    guardrails: &Guardrails,
) -> anyhow::Result<()> {
    let cards = load_cards()?;
    let now = Utc::now();
    let (candidates, satisfied) = match card {
        Some(id) => {
            let c = find_card(&cards, id)?;
            (vec![proposal_for_card(c, &cfg.proposals, guardrails, now)?], vec![])
        }
        None => {
            let report = run_triage(&cards, &cfg.triage, now);
            proposals_for_report(&report, &cfg.proposals, guardrails, now)?
        }
    };

    let dir = proposals_dir()?;
    let mut report = PromoteReport {
        created: vec![],
        skipped_existing: vec![],
        satisfied_clusters: satisfied,
    };
    for p in candidates {
        if proposal_path(&dir, &p.proposal_id).exists() {
            tracing::debug!(proposal = %p.proposal_id, "proposal already queued");
            report.skipped_existing.push(p.proposal_id);
            continue;
        }
        save_proposal(&dir, &p)?;
        report.created.push(p);
    }
    audit(
        "promote",
        serde_json::json!({
            "created": report.created.iter().map(|p| &p.proposal_id).collect::<Vec<_>>(),
            "skipped": report.skipped_existing.len(),
        }),
    );
    print_one(json, report, |r| {
        let mut lines: Vec<String> = r
            .created
            .iter()
            .map(|p| {
                format!(
                    "queued {}\t{}\t{}\t{:+.4}\tdepth={}\trisk={:?}",
                    p.proposal_id,
                    p.source.policy_key(),
                    p.patch.style,
                    p.patch.threshold_delta,
                    p.patch.explanation_depth,
                    p.risk_tier
                )
            })
            .collect();
        for id in &r.skipped_existing {
            lines.push(format!("exists {}", id));
        }
        for key in &r.satisfied_clusters {
            lines.push(format!("satisfied {}", key));
        }
        if lines.is_empty() {
            lines.push("no clusters to promote".to_string());
        }
        lines.join("\n")
    })
}
