use crate::domain::constants::*;
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Serialize)]
pub struct JsonOut<T: Serialize> {
    pub ok: bool,
    pub data: T,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    Concise,
    Balanced,
    Detailed,
    Empathetic,
    Technical,
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Style::Concise => "concise",
            Style::Balanced => "balanced",
            Style::Detailed => "detailed",
            Style::Empathetic => "empathetic",
            Style::Technical => "technical",
        };
        f.write_str(s)
    }
}

/// Bounded configuration delta. Every instance that reaches the proposal
/// queue has passed `services::policy::validate_patch`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolicySafePatch {
    pub style: Style,
    pub threshold_delta: f64,
    pub explanation_depth: u8,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attestation {
    pub algorithm: String,
    pub public_key: String,
    pub signature: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeedbackCard {
    pub card_id: String,
    pub ts: DateTime<Utc>,
    pub user_hash: String,
    pub session_hash: String,
    pub task: String,
    pub jurisdiction: String,
    pub satisfaction: f64,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposed_tuning: Option<PolicySafePatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attestation: Option<Attestation>,
}

/// Raw, unredacted feedback as submitted. Never persisted.
#[derive(Clone, Debug, Deserialize)]
pub struct CardInput {
    pub user_id: String,
    pub session_id: String,
    pub task: String,
    pub jurisdiction: String,
    pub satisfaction: f64,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub proposed_tuning: Option<PolicySafePatch>,
    #[serde(default)]
    pub ts: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeedbackCluster {
    pub task: String,
    pub jurisdiction: String,
    pub size: usize,
    pub mean_satisfaction: f64,
    pub variance: f64,
    pub common_issues: Vec<String>,
    pub drift_delta: Option<f64>,
    pub card_ids: Vec<String>,
}

impl FeedbackCluster {
    pub fn key(&self) -> String {
        format!("{}/{}", self.task, self.jurisdiction)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TriageReport {
    pub generated_at: DateTime<Utc>,
    pub total: usize,
    pub deduplicated: usize,
    pub clustered: usize,
    pub unclustered: usize,
    pub clusters: Vec<FeedbackCluster>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    Pending,
    Approved,
    Rejected,
    Applied,
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProposalStatus::Pending => "pending",
            ProposalStatus::Approved => "approved",
            ProposalStatus::Rejected => "rejected",
            ProposalStatus::Applied => "applied",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProposalSource {
    Cluster {
        task: String,
        jurisdiction: String,
        size: usize,
        mean_satisfaction: f64,
    },
    Card {
        card_id: String,
        task: String,
        jurisdiction: String,
    },
}

impl ProposalSource {
    /// Key under which an applied patch is recorded.
    pub fn policy_key(&self) -> String {
        match self {
            ProposalSource::Cluster {
                task, jurisdiction, ..
            }
            | ProposalSource::Card {
                task, jurisdiction, ..
            } => format!("{}/{}", task, jurisdiction),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub ts: DateTime<Utc>,
    pub from: ProposalStatus,
    pub to: ProposalStatus,
    pub actor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChangeProposal {
    pub proposal_id: String,
    pub author: String,
    pub source: ProposalSource,
    pub patch: PolicySafePatch,
    pub rationale: Vec<String>,
    pub risk_tier: RiskTier,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: ProposalStatus,
    #[serde(default)]
    pub history: Vec<StatusChange>,
}

impl ChangeProposal {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppliedEntry {
    pub style: Style,
    pub threshold_offset: f64,
    pub explanation_depth: u8,
    pub proposal_id: String,
    pub applied_at: DateTime<Utc>,
    pub applied_by: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AppliedPolicy {
    #[serde(default)]
    pub entries: BTreeMap<String, AppliedEntry>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProofDirection {
    Left,
    Right,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStep {
    pub sibling: String,
    pub direction: ProofDirection,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InclusionProof {
    pub card_id: String,
    pub index: usize,
    pub path: Vec<ProofStep>,
    pub root: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackDigest {
    pub version: u32,
    pub count: usize,
    pub first_ts: Option<DateTime<Utc>>,
    pub last_ts: Option<DateTime<Utc>>,
    pub root: String,
    pub algorithm: String,
    pub public_key: String,
    pub signature: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct DigestCheck {
    pub root_matches: bool,
    pub signature_ok: bool,
    pub trusted_key: bool,
    pub count: usize,
}

#[derive(Serialize)]
pub struct IngestReport {
    pub ingested: usize,
    pub signed: usize,
    pub card_ids: Vec<String>,
}

#[derive(Serialize)]
pub struct PromoteReport {
    pub created: Vec<ChangeProposal>,
    pub skipped_existing: Vec<String>,
    pub satisfied_clusters: Vec<String>,
}

#[derive(Serialize)]
pub struct KeyStatus {
    pub public_key: Option<String>,
    pub trusted: Vec<String>,
}

fn default_allowed_styles() -> Vec<Style> {
    ALLOWED_STYLES.to_vec()
}

fn default_max_threshold_shift() -> f64 {
    MAX_THRESHOLD_SHIFT
}

fn default_min_cluster_size() -> usize {
    DEFAULT_MIN_CLUSTER_SIZE
}

fn default_dedup_window_secs() -> i64 {
    DEFAULT_DEDUP_WINDOW_SECS
}

fn default_ttl_hours() -> i64 {
    DEFAULT_PROPOSAL_TTL_HOURS
}

fn default_low_satisfaction() -> f64 {
    DEFAULT_LOW_SATISFACTION
}

fn default_high_satisfaction() -> f64 {
    DEFAULT_HIGH_SATISFACTION
}

fn default_secret_env() -> String {
    DEFAULT_SECRET_ENV.to_string()
}

/// `feedgate.toml` under the state directory.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub guardrails: GuardrailConfig,
    #[serde(default)]
    pub triage: TriageConfig,
    #[serde(default)]
    pub proposals: ProposalConfig,
    #[serde(default)]
    pub redaction: RedactionConfig,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct GuardrailConfig {
    #[serde(default = "default_max_threshold_shift")]
    pub max_threshold_shift: f64,
    #[serde(default = "default_allowed_styles")]
    pub allowed_styles: Vec<Style>,
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            max_threshold_shift: default_max_threshold_shift(),
            allowed_styles: default_allowed_styles(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TriageConfig {
    #[serde(default = "default_min_cluster_size")]
    pub min_cluster_size: usize,
    #[serde(default = "default_dedup_window_secs")]
    pub dedup_window_secs: i64,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            min_cluster_size: default_min_cluster_size(),
            dedup_window_secs: default_dedup_window_secs(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ProposalConfig {
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: i64,
    #[serde(default = "default_low_satisfaction")]
    pub low_satisfaction: f64,
    #[serde(default = "default_high_satisfaction")]
    pub high_satisfaction: f64,
}

impl Default for ProposalConfig {
    fn default() -> Self {
        Self {
            ttl_hours: default_ttl_hours(),
            low_satisfaction: default_low_satisfaction(),
            high_satisfaction: default_high_satisfaction(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RedactionConfig {
    #[serde(default = "default_secret_env")]
    pub secret_env: String,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            secret_env: default_secret_env(),
        }
    }
}
