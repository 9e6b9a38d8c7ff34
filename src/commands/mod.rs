//! Command handler layer.
//!
//! This module owns CLI-oriented orchestration and output wiring.
//!
//! ## Files
//! - `feedback.rs` — ingest / feedback / cluster / promote.
//! - `governance.rs` — proposals lifecycle, digests, keys, config.
//!
//! ## Principles
//! - Parse/match CLI inputs here.
//! - Delegate business logic to `services/*`.
//! - Each handler returns `Ok(false)` for commands it does not own.

pub mod feedback;
pub mod governance;

pub use feedback::handle_feedback_commands;
pub use governance::{
    handle_config_commands, handle_digest_commands, handle_key_commands,
    handle_proposal_commands,
};
