use crate::domain::constants::{DEFAULT_MIN_CLUSTER_SIZE, MAX_DEDUP_WINDOW_SECS};
use crate::domain::models::{FeedbackCard, FeedbackCluster, TriageConfig, TriageReport};
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, HashMap};

/// Drops repeat submissions of the same (session, task, jurisdiction) that
/// arrive within `window` of the last kept card for that key. Output is in
/// time order.
pub fn dedup(cards: &[FeedbackCard], window: Duration) -> Vec<FeedbackCard> {
    let mut ordered: Vec<&FeedbackCard> = cards.iter().collect();
    ordered.sort_by(|a, b| a.ts.cmp(&b.ts).then_with(|| a.card_id.cmp(&b.card_id)));

    let mut last_kept: HashMap<(&str, &str, &str), DateTime<Utc>> = HashMap::new();
    let mut out = Vec::with_capacity(ordered.len());
    for card in ordered {
        let key = (
            card.session_hash.as_str(),
            card.task.as_str(),
            card.jurisdiction.as_str(),
        );
        if let Some(prev) = last_kept.get(&key) {
            if card.ts - *prev < window {
                continue;
            }
        }
        last_kept.insert(key, card.ts);
        out.push(card.clone());
    }
    out
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn population_variance(values: &[f64], m: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// Tags present on at least half of the cards.
fn common_issues(members: &[&FeedbackCard]) -> Vec<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for card in members {
        for tag in &card.issues {
            *counts.entry(tag.as_str()).or_default() += 1;
        }
    }
    counts
        .into_iter()
        .filter(|(_, n)| n * 2 >= members.len())
        .map(|(t, _)| t.to_string())
        .collect()
}

fn drift_delta(scores: &[f64]) -> Option<f64> {
    if scores.len() < 4 {
        return None;
    }
    let half = scores.len() / 2;
    let older = &scores[..half];
    let newer = &scores[scores.len() - half..];
    Some(mean(newer) - mean(older))
}

pub fn cluster(cards: &[FeedbackCard], min_size: usize) -> Vec<FeedbackCluster> {
    let min_size = min_size.max(1);
    let mut groups: BTreeMap<(&str, &str), Vec<&FeedbackCard>> = BTreeMap::new();
    for card in cards {
        groups
            .entry((card.task.as_str(), card.jurisdiction.as_str()))
            .or_default()
            .push(card);
    }

    let mut out = Vec::new();
    for ((task, jurisdiction), mut members) in groups {
        if members.len() < min_size {
            tracing::debug!(task, jurisdiction, size = members.len(), "group below minimum size");
            continue;
        }
        members.sort_by(|a, b| a.ts.cmp(&b.ts).then_with(|| a.card_id.cmp(&b.card_id)));
        let scores: Vec<f64> = members.iter().map(|c| c.satisfaction).collect();
        let m = mean(&scores);
        out.push(FeedbackCluster {
            task: task.to_string(),
            jurisdiction: jurisdiction.to_string(),
            size: members.len(),
            mean_satisfaction: m,
            variance: population_variance(&scores, m),
            common_issues: common_issues(&members),
            drift_delta: drift_delta(&scores),
            card_ids: members.iter().map(|c| c.card_id.clone()).collect(),
        });
    }
    out
}

pub fn run_triage(
    cards: &[FeedbackCard],
    cfg: &TriageConfig,
    now: DateTime<Utc>,
) -> TriageReport {
    let window = Duration::seconds(cfg.dedup_window_secs.clamp(0, MAX_DEDUP_WINDOW_SECS));
    let unique = dedup(cards, window);
    let min_size = if cfg.min_cluster_size == 0 {
        DEFAULT_MIN_CLUSTER_SIZE
    } else {
        cfg.min_cluster_size
    };
    let clusters = cluster(&unique, min_size);
    let clustered: usize = clusters.iter().map(|c| c.size).sum();
    tracing::info!(
        total = cards.len(),
        unique = unique.len(),
        clusters = clusters.len(),
        "triage complete"
    );
    TriageReport {
        generated_at: now,
        total: cards.len(),
        deduplicated: cards.len() - unique.len(),
        clustered,
        unclustered: unique.len() - clustered,
        clusters,
    }
}
