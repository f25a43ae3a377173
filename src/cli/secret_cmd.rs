//! create / consume / confirm / sweep commands

use super::output::{self, OutputFormat};
use crate::domain::SecretId;
use crate::engine::{ConfirmOutcome, SecretEngine};
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;
use std::io::Read;
use std::time::Duration;

#[derive(Subcommand)]
pub enum SecretCommands {
    /// Store a secret and print its id
    Create(CreateArgs),

    /// Print a secret's content exactly once
    Consume {
        /// Secret id
        id: String,

        #[arg(short, long, value_enum, default_value_t)]
        output: OutputFormat,
    },

    /// Confirm a two-phase delivery
    Confirm {
        /// Secret id
        id: String,
    },

    /// Delete expired secrets now
    Sweep,
}

#[derive(Args)]
pub struct CreateArgs {
    /// Seconds until the secret expires (defaults to engine.default_ttl_seconds)
    #[arg(long)]
    pub ttl_secs: Option<u64>,

    #[arg(short, long, value_enum, default_value_t)]
    pub output: OutputFormat,

    /// Secret content; read from stdin when omitted
    pub content: Option<String>,
}

#[derive(Serialize)]
struct CreatedSecret<'a> {
    id: &'a str,
    ttl_secs: Option<u64>,
}

#[derive(Serialize)]
struct ConsumedSecret<'a> {
    id: &'a str,
    content: &'a str,
}

pub async fn handle_secret_command(command: SecretCommands, engine: &SecretEngine) -> Result<()> {
    match command {
        SecretCommands::Create(args) => create(args, engine).await,
        SecretCommands::Consume { id, output } => consume(&id, output, engine).await,
        SecretCommands::Confirm { id } => confirm(&id, engine).await,
        SecretCommands::Sweep => {
            let deleted = engine.sweep_expired().await?;
            println!("{}", deleted);
            Ok(())
        }
    }
}

async fn create(args: CreateArgs, engine: &SecretEngine) -> Result<()> {
    let content = match args.content {
        Some(content) => content,
        None => read_stdin()?,
    };

    let ttl = args.ttl_secs.map(Duration::from_secs);
    let id = engine.create(&content, ttl).await?;

    match args.output {
        OutputFormat::Plain => println!("{}", id),
        OutputFormat::Json => {
            output::print_json(&CreatedSecret { id: id.as_str(), ttl_secs: args.ttl_secs })?
        }
    }

    Ok(())
}

async fn consume(raw_id: &str, format: OutputFormat, engine: &SecretEngine) -> Result<()> {
    let id = parse_id(raw_id);

    let Some(content) = engine.consume(&id).await? else {
        anyhow::bail!("secret not found");
    };

    match format {
        OutputFormat::Plain => println!("{}", content.expose()),
        OutputFormat::Json => {
            output::print_json(&ConsumedSecret { id: id.as_str(), content: content.expose() })?
        }
    }

    Ok(())
}

async fn confirm(raw_id: &str, engine: &SecretEngine) -> Result<()> {
    match engine.confirm(&parse_id(raw_id)).await? {
        ConfirmOutcome::Confirmed => {
            println!("confirmed");
            Ok(())
        }
        ConfirmOutcome::NotFound => anyhow::bail!("secret not found"),
    }
}

/// Canonicalise well-formed UUIDs; anything else is looked up as given and
/// simply reports not found.
fn parse_id(raw: &str) -> SecretId {
    SecretId::parse(raw.trim()).unwrap_or_else(|_| SecretId::from_str_unchecked(raw))
}

fn read_stdin() -> Result<String> {
    let mut content = String::new();
    std::io::stdin().read_to_string(&mut content).context("Failed to read secret from stdin")?;

    let trimmed_len = content.trim_end_matches(['\n', '\r']).len();
    content.truncate(trimmed_len);
    Ok(content)
}
