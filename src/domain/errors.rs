use crate::domain::models::{ProposalStatus, Style};

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum FeedbackError {
    #[error("satisfaction must be within [0, 1], got {0}")]
    SatisfactionOutOfRange(f64),
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("guardrail violation: style `{0}` is not allowed")]
    StyleNotAllowed(Style),
    #[error("guardrail violation: threshold delta {delta} exceeds max shift {max}")]
    ThresholdShiftExceeded { delta: f64, max: f64 },
    #[error("guardrail violation: explanation depth {0} outside 1..=5")]
    DepthOutOfRange(u8),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("card not found: {0}")]
    CardNotFound(String),
    #[error("proposal not found: {0}")]
    ProposalNotFound(String),
    #[error("invalid proposal transition: {from} -> {to}")]
    InvalidTransition {
        from: ProposalStatus,
        to: ProposalStatus,
    },
    #[error("proposal expired: {0}")]
    ProposalExpired(String),
    #[error("signed card is immutable: {0}")]
    AlreadySigned(String),
}
