//! Service layer containing business logic and side-effect helpers.
//!
//! ## Service map
//! - `ingest.rs` — card construction, ids, attestation, input parsing.
//! - `redact.rs` — HMAC pseudonyms and free-text scrubbing.
//! - `triage.rs` — dedup window and (task, jurisdiction) clustering.
//! - `proposals.rs` — cluster/card → patch mapping, risk tiers, lifecycle, proposal files.
//! - `policy.rs` — guardrail allow-lists and patch validation.
//! - `digest.rs` — Merkle roots, inclusion proofs, signed digests.
//! - `trust.rs` — signing key and trusted key storage, ed25519 helpers.
//! - `config.rs` — `feedgate.toml` loading and sanity checks.
//! - `storage.rs` — state paths, JSONL store, atomic writes, audit log.
//! - `output.rs` — JSON/text output helpers.
//!
//! ## Conventions
//! - Prefer pure helpers that take `now` and explicit inputs.
//! - Side effects should be explicit and localized in `storage.rs`.
//! - Keep command handlers thin; delegate to services.

pub mod config;
pub mod digest;
pub mod ingest;
pub mod output;
pub mod policy;
pub mod proposals;
pub mod redact;
pub mod storage;
pub mod triage;
pub mod trust;
