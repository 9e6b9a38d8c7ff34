use clap::Parser;

mod cli;
mod commands;
mod domain;
mod logging;
mod services;

use cli::Cli;
use commands::{
    handle_config_commands, handle_digest_commands, handle_feedback_commands,
    handle_key_commands, handle_proposal_commands,
};
use services::config::load_config;
use services::policy::Guardrails;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);

    let cfg = load_config()?;
    let guardrails = Guardrails::effective(&cfg)?;
    tracing::debug!(?guardrails, "effective guardrails");

    if handle_feedback_commands(&cli, &cfg, &guardrails)? {
        return Ok(());
    }
    if handle_proposal_commands(&cli, &guardrails)? {
        return Ok(());
    }
    if handle_digest_commands(&cli)? {
        return Ok(());
    }
    if handle_key_commands(&cli)? {
        return Ok(());
    }
    if handle_config_commands(&cli, &cfg, &guardrails)? {
        return Ok(());
    }
    anyhow::bail!("unhandled command")
}
