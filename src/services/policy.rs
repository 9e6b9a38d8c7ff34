use crate::domain::constants::{
    ALLOWED_STYLES, MAX_EXPLANATION_DEPTH, MAX_THRESHOLD_SHIFT, MIN_EXPLANATION_DEPTH,
};
use crate::domain::errors::FeedbackError;
use crate::domain::models::{ConfigFile, PolicySafePatch, Style};
use serde::Serialize;

/// Guardrails in force after intersecting the configured values with the
/// fixed allow-lists. Configuration can only tighten them.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Guardrails {
    pub max_threshold_shift: f64,
    pub allowed_styles: Vec<Style>,
}

impl Default for Guardrails {
    fn default() -> Self {
        Self {
            max_threshold_shift: MAX_THRESHOLD_SHIFT,
            allowed_styles: ALLOWED_STYLES.to_vec(),
        }
    }
}

impl Guardrails {
    pub fn effective(cfg: &ConfigFile) -> Result<Self, FeedbackError> {
        let shift = cfg.guardrails.max_threshold_shift;
        if !shift.is_finite() || shift < 0.0 {
            return Err(FeedbackError::InvalidConfig(format!(
                "guardrails.max_threshold_shift must be a non-negative number, got {}",
                shift
            )));
        }
        if shift > MAX_THRESHOLD_SHIFT {
            return Err(FeedbackError::InvalidConfig(format!(
                "guardrails.max_threshold_shift {} exceeds fixed cap {}",
                shift, MAX_THRESHOLD_SHIFT
            )));
        }
        let mut allowed = Vec::new();
        for s in &cfg.guardrails.allowed_styles {
            if !ALLOWED_STYLES.contains(s) {
                return Err(FeedbackError::InvalidConfig(format!(
                    "guardrails.allowed_styles contains `{}`",
                    s
                )));
            }
            if !allowed.contains(s) {
                allowed.push(*s);
            }
        }
        if allowed.is_empty() {
            return Err(FeedbackError::InvalidConfig(
                "guardrails.allowed_styles must not be empty".to_string(),
            ));
        }
        Ok(Self {
            max_threshold_shift: shift,
            allowed_styles: allowed,
        })
    }

    pub fn style_allowed(&self, style: Style) -> bool {
        ALLOWED_STYLES.contains(&style) && self.allowed_styles.contains(&style)
    }

    pub fn clamp_shift(&self, delta: f64) -> f64 {
        delta.clamp(-self.max_threshold_shift, self.max_threshold_shift)
    }
}

pub fn validate_patch(patch: &PolicySafePatch, guardrails: &Guardrails) -> Result<(), FeedbackError> {
    if !guardrails.style_allowed(patch.style) {
        return Err(FeedbackError::StyleNotAllowed(patch.style));
    }
    let max = guardrails.max_threshold_shift.min(MAX_THRESHOLD_SHIFT);
    if !patch.threshold_delta.is_finite() || patch.threshold_delta.abs() > max + f64::EPSILON {
        return Err(FeedbackError::ThresholdShiftExceeded {
            delta: patch.threshold_delta,
            max,
        });
    }
    if !(MIN_EXPLANATION_DEPTH..=MAX_EXPLANATION_DEPTH).contains(&patch.explanation_depth) {
        return Err(FeedbackError::DepthOutOfRange(patch.explanation_depth));
    }
    Ok(())
}
