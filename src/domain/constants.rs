use crate::domain::models::Style;

/// Largest threshold shift a single patch may carry, in either direction.
pub const MAX_THRESHOLD_SHIFT: f64 = 0.10;

/// Styles a patch may select. Configuration can narrow this list, never extend it.
pub const ALLOWED_STYLES: [Style; 5] = [
    Style::Concise,
    Style::Balanced,
    Style::Detailed,
    Style::Empathetic,
    Style::Technical,
];

pub const MIN_EXPLANATION_DEPTH: u8 = 1;
pub const MAX_EXPLANATION_DEPTH: u8 = 5;
pub const BASE_EXPLANATION_DEPTH: u8 = 3;

pub const DEFAULT_MIN_CLUSTER_SIZE: usize = 3;
pub const DEFAULT_DEDUP_WINDOW_SECS: i64 = 3600;
pub const DEFAULT_PROPOSAL_TTL_HOURS: i64 = 72;
pub const DEFAULT_LOW_SATISFACTION: f64 = 0.5;
pub const DEFAULT_HIGH_SATISFACTION: f64 = 0.8;

pub const MAX_PROPOSAL_TTL_HOURS: i64 = 24 * 366;
pub const MAX_DEDUP_WINDOW_SECS: i64 = 30 * 24 * 3600;

/// Drift below this (newer half worse than older half) counts as a regression.
pub const DRIFT_ALERT: f64 = -0.1;
pub const HIGH_RISK_VARIANCE: f64 = 0.08;

pub const DEFAULT_SECRET_ENV: &str = "LUKHAS_HMAC_SECRET";
pub const STATE_DIR_ENV: &str = "LUKHAS_STATE_DIR";
pub const LOG_FILTER_ENV: &str = "FEEDGATE_LOG";

pub const SIGNATURE_ALGORITHM: &str = "ed25519";
pub const DIGEST_DOMAIN: &str = "feedgate-digest:v1";
pub const EMPTY_TREE_LABEL: &[u8] = b"empty_feedback_tree";

pub const TRIAGE_AUTHOR: &str = "triage";
