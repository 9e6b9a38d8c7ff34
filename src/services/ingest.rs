use crate::domain::constants::SIGNATURE_ALGORITHM;
use crate::domain::errors::FeedbackError;
use crate::domain::models::{Attestation, CardInput, FeedbackCard, PolicySafePatch};
use crate::services::policy::{validate_patch, Guardrails};
use crate::services::redact::{hmac_hex, scrub_note};
use crate::services::trust::{sign_hex, verify_hex};
use chrono::{DateTime, Utc};
use ed25519_dalek::SigningKey;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Fields covered by `card_id`. Attestation is excluded so signing does not
/// change the identity of a card.
#[derive(Serialize)]
struct CardBody<'a> {
    ts: &'a DateTime<Utc>,
    user_hash: &'a str,
    session_hash: &'a str,
    task: &'a str,
    jurisdiction: &'a str,
    satisfaction: f64,
    issues: &'a [String],
    note: &'a Option<String>,
    proposed_tuning: &'a Option<PolicySafePatch>,
}

pub fn compute_card_id(card: &FeedbackCard) -> anyhow::Result<String> {
    let body = CardBody {
        ts: &card.ts,
        user_hash: &card.user_hash,
        session_hash: &card.session_hash,
        task: &card.task,
        jurisdiction: &card.jurisdiction,
        satisfaction: card.satisfaction,
        issues: &card.issues,
        note: &card.note,
        proposed_tuning: &card.proposed_tuning,
    };
    let bytes = serde_json::to_vec(&body)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

fn normalize_tags(raw: &[String]) -> Vec<String> {
    let mut tags: Vec<String> = raw
        .iter()
        .map(|t| t.trim().to_ascii_lowercase().replace([' ', '-'], "_"))
        .filter(|t| !t.is_empty())
        .collect();
    tags.sort();
    tags.dedup();
    tags
}

pub fn build_card(
    input: &CardInput,
    secret: &[u8],
    guardrails: &Guardrails,
    now: DateTime<Utc>,
) -> anyhow::Result<FeedbackCard> {
    if !input.satisfaction.is_finite() || !(0.0..=1.0).contains(&input.satisfaction) {
        return Err(FeedbackError::SatisfactionOutOfRange(input.satisfaction).into());
    }
    let task = input.task.trim().to_ascii_lowercase();
    if task.is_empty() {
        return Err(FeedbackError::MissingField("task").into());
    }
    let jurisdiction = input.jurisdiction.trim().to_ascii_uppercase();
    if jurisdiction.is_empty() {
        return Err(FeedbackError::MissingField("jurisdiction").into());
    }
    if input.user_id.trim().is_empty() {
        return Err(FeedbackError::MissingField("user_id").into());
    }
    if input.session_id.trim().is_empty() {
        return Err(FeedbackError::MissingField("session_id").into());
    }
    if let Some(patch) = &input.proposed_tuning {
        validate_patch(patch, guardrails)?;
    }

    let note = input
        .note
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(scrub_note);

    let mut card = FeedbackCard {
        card_id: String::new(),
        ts: input.ts.unwrap_or(now),
        user_hash: hmac_hex(secret, input.user_id.trim())?,
        session_hash: hmac_hex(secret, input.session_id.trim())?,
        task,
        jurisdiction,
        satisfaction: input.satisfaction,
        issues: normalize_tags(&input.issues),
        note,
        proposed_tuning: input.proposed_tuning.clone(),
        attestation: None,
    };
    card.card_id = compute_card_id(&card)?;
    Ok(card)
}

pub fn sign_card(card: &mut FeedbackCard, key: &SigningKey) -> anyhow::Result<()> {
    if card.attestation.is_some() {
        return Err(FeedbackError::AlreadySigned(card.card_id.clone()).into());
    }
    card.attestation = Some(Attestation {
        algorithm: SIGNATURE_ALGORITHM.to_string(),
        public_key: hex::encode(key.verifying_key().to_bytes()),
        signature: sign_hex(key, card.card_id.as_bytes()),
    });
    Ok(())
}

/// Checks the id still matches the body and, when present, that the
/// attestation signs that id.
pub fn verify_card(card: &FeedbackCard) -> anyhow::Result<bool> {
    if compute_card_id(card)? != card.card_id {
        return Ok(false);
    }
    Ok(match &card.attestation {
        None => true,
        Some(a) => {
            a.algorithm == SIGNATURE_ALGORITHM
                && verify_hex(&a.public_key, card.card_id.as_bytes(), &a.signature)
        }
    })
}

/// Reads one JSON object, a JSON array, or JSON lines.
pub fn parse_inputs(raw: &str) -> anyhow::Result<Vec<CardInput>> {
    let trimmed = raw.trim_start();
    if trimmed.starts_with('[') {
        return Ok(serde_json::from_str(trimmed)?);
    }
    if let Ok(one) = serde_json::from_str::<CardInput>(trimmed) {
        return Ok(vec![one]);
    }
    let mut out = Vec::new();
    for (idx, line) in raw.lines().enumerate() {
        let l = line.trim();
        if l.is_empty() {
            continue;
        }
        let input = serde_json::from_str(l)
            .map_err(|e| anyhow::anyhow!("line {}: invalid feedback input: {}", idx + 1, e))?;
        out.push(input);
    }
    Ok(out)
}
