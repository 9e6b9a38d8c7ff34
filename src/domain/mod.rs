//! Shared data model layer (structs/constants only).
//!
//! ## Purpose
//! - Keep card/cluster/proposal/digest records in one place.
//! - Avoid cyclic imports between services.
//! - Make on-disk and `--json` schema changes explicit and reviewable.
//!
//! ## Files
//! - `models.rs` — feedback cards, clusters, patches, proposals, digests, config.
//! - `constants.rs` — fixed guardrails and stable names (env vars, file names).
//! - `errors.rs` — typed domain errors.
//!
//! ## Rule of thumb
//! Domain types should be data-only: no filesystem side effects.
//!
//! ## Compatibility note
//! Cards are append-only in `feedback.jsonl` and proposals live as JSON files;
//! field renames break existing state. Keep `docs/contracts/*` in sync.

pub mod constants;
pub mod errors;
pub mod models;
