#![allow(dead_code)]

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub const SECRET: &str = "integration-secret";

pub struct TestEnv {
    _tmp: TempDir,
    pub home: PathBuf,
    pub state: PathBuf,
    cargo_home: PathBuf,
    rustup_home: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        let home = tmp.path().join("home");
        fs::create_dir_all(&home).expect("create isolated home");
        let state = home.join(".lukhas/state");

        let orig_home = std::env::var("HOME").unwrap_or_default();
        let cargo_home = PathBuf::from(&orig_home).join(".cargo");
        let rustup_home = PathBuf::from(&orig_home).join(".rustup");

        Self {
            _tmp: tmp,
            home,
            state,
            cargo_home,
            rustup_home,
        }
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("feedgate");
        cmd.env("HOME", &self.home)
            .env("CARGO_HOME", &self.cargo_home)
            .env("RUSTUP_HOME", &self.rustup_home)
            .env("LUKHAS_HMAC_SECRET", SECRET)
            .env_remove("LUKHAS_STATE_DIR")
            .env_remove("FEEDGATE_LOG");
        cmd
    }

    pub fn run_json(&self, args: &[&str]) -> Value {
        let mut cmd = self.cmd();
        let out = cmd
            .arg("--json")
            .args(args)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&out).expect("valid json output")
    }

    /// Ingests one card through CLI flags and returns its id.
    pub fn ingest(
        &self,
        session: &str,
        task: &str,
        jurisdiction: &str,
        satisfaction: f64,
        issues: &[&str],
        ts: &str,
    ) -> String {
        let sat = satisfaction.to_string();
        let mut args = vec![
            "ingest",
            "--user",
            "user-42",
            "--session",
            session,
            "--task",
            task,
            "--jurisdiction",
            jurisdiction,
            "--satisfaction",
            sat.as_str(),
            "--ts",
            ts,
        ];
        for issue in issues {
            args.push("--issue");
            args.push(issue);
        }
        let v = self.run_json(&args);
        v["data"]["card_ids"][0]
            .as_str()
            .expect("card id")
            .to_string()
    }

    /// Four low-satisfaction summarize/EU cards sharing `too_verbose`.
    pub fn seed_unhappy_cluster(&self) -> Vec<String> {
        (0..4)
            .map(|i| {
                self.ingest(
                    &format!("sess-{}", i),
                    "summarize",
                    "eu",
                    0.2,
                    &["too_verbose"],
                    &format!("2026-05-01T09:0{}:00Z", i),
                )
            })
            .collect()
    }

    pub fn feedback_store(&self) -> String {
        fs::read_to_string(self.state.join("feedback.jsonl")).unwrap_or_default()
    }
}
