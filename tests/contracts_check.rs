mod common;

use common::TestEnv;
use jsonschema::JSONSchema;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;

fn load_schema(name: &str) -> Value {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let raw = fs::read_to_string(root.join("docs/contracts").join(name)).unwrap();
    serde_json::from_str(&raw).unwrap()
}

fn validate(schema_name: &str, data: &Value) {
    let schema = load_schema(schema_name);
    let validator = JSONSchema::compile(&schema).expect("compile schema");
    let msgs: Vec<String> = match validator.validate(data) {
        Ok(()) => return,
        Err(errors) => errors.map(|e| e.to_string()).collect(),
    };
    panic!("schema validation failed: {}", msgs.join(" | "));
}

#[test]
fn stored_cards_match_contract() {
    let env = TestEnv::new();
    env.run_json(&["keys", "init"]);
    env.seed_unhappy_cluster();
    env.cmd()
        .args([
            "ingest",
            "--user",
            "u",
            "--session",
            "s",
            "--task",
            "qa",
            "--jurisdiction",
            "us",
            "--satisfaction",
            "0.6",
            "--note",
            "fine overall",
            "--style",
            "detailed",
            "--threshold-delta",
            "0.02",
            "--depth",
            "4",
            "--sign",
        ])
        .assert()
        .success();

    for line in env.feedback_store().lines() {
        let card: Value = serde_json::from_str(line).unwrap();
        validate("feedback_card.schema.json", &card);
    }
    let listed = env.run_json(&["feedback", "list", "--task", "qa"]);
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);
    validate("feedback_card.schema.json", &listed["data"][0]);
}

#[test]
fn triage_report_matches_contract() {
    let env = TestEnv::new();
    env.seed_unhappy_cluster();
    let out = env.run_json(&["cluster"]);
    validate("triage_report.schema.json", &out["data"]);

    let raw = fs::read_to_string(env.state.join("clusters.json")).unwrap();
    let on_disk: Value = serde_json::from_str(&raw).unwrap();
    validate("triage_report.schema.json", &on_disk);
}

#[test]
fn proposals_match_contract_through_lifecycle() {
    let env = TestEnv::new();
    env.seed_unhappy_cluster();
    let promoted = env.run_json(&["promote"]);
    let proposal = &promoted["data"]["created"][0];
    validate("proposal.schema.json", proposal);

    let id = proposal["proposal_id"].as_str().unwrap().to_string();
    let approved = env.run_json(&["proposals", "approve", &id, "--actor", "reviewer"]);
    validate("proposal.schema.json", &approved["data"]);
    let applied = env.run_json(&["proposals", "apply", &id, "--actor", "operator"]);
    validate("proposal.schema.json", &applied["data"]["proposal"]);

    let raw = fs::read_to_string(env.state.join(format!("proposals/{}.json", id))).unwrap();
    let on_disk: Value = serde_json::from_str(&raw).unwrap();
    validate("proposal.schema.json", &on_disk);
}

#[test]
fn digests_match_contract() {
    let env = TestEnv::new();
    env.run_json(&["keys", "init"]);

    let empty = env.run_json(&["digest", "build"]);
    validate("digest.schema.json", &empty["data"]);
    assert_eq!(empty["data"]["count"], 0);
    assert!(empty["data"]["first_ts"].is_null());

    env.seed_unhappy_cluster();
    let full = env.run_json(&["digest", "build"]);
    validate("digest.schema.json", &full["data"]);
    assert_eq!(full["data"]["first_ts"], "2026-05-01T09:00:00Z");

    let raw = fs::read_to_string(env.state.join("digests/latest.json")).unwrap();
    let latest: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(latest["root"], full["data"]["root"]);
}
