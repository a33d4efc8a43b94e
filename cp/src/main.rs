//! careplan - CLI entry point
//!
//! Stands in for the record view: each subcommand drives one orchestrator
//! flow and prints what the view would show.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use colored::*;
use eyre::{Context, Result, bail};
use tracing::{debug, info};

use careplan::cli::{Cli, Command, RecordCommand, UserCommand};
use careplan::config::Config;
use careplan::domain::{BoardPayload, ColumnId};
use careplan::encoder::{DocumentUpload, EncodedDocument, encode_file};
use careplan::error::PlanError;
use careplan::llm::create_session_client;
use careplan::orchestrator::PlanOrchestrator;
use careplan::state::{RecordStore, StateManager};

fn parse_level(level: Option<&str>) -> tracing::Level {
    match level.map(|s| s.to_uppercase()).as_deref() {
        Some("TRACE") => tracing::Level::TRACE,
        Some("DEBUG") => tracing::Level::DEBUG,
        Some("INFO") | None => tracing::Level::INFO,
        Some("WARN") | Some("WARNING") => tracing::Level::WARN,
        Some("ERROR") => tracing::Level::ERROR,
        Some(other) => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", other);
            tracing::Level::INFO
        }
    }
}

fn setup_logging(cli_log_level: Option<&str>) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("careplan")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let level = parse_level(cli_log_level);
    let log_file = fs::File::create(log_dir.join("careplan.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.effective_log_level()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    let current_user = cli.user.clone().or_else(|| config.session.user_email.clone());

    debug!(command = ?cli.command, ?current_user, "main: dispatching command");
    match cli.command {
        Command::User {
            command: UserCommand::Add { email, name },
        } => {
            let state = StateManager::spawn(&config.storage.store_dir, current_user)?;
            let user = state.create_user(&email, &name).await?;
            println!("{} Added user: {} ({})", "✓".green(), user.email.cyan(), user.name);
        }
        Command::Record { command } => {
            let state = StateManager::spawn(&config.storage.store_dir, current_user)?;
            cmd_record(&state, command).await?;
        }
        Command::Upload { record_id, file } => {
            let state = StateManager::spawn(&config.storage.store_dir, current_user)?;
            cmd_upload(&config, state, &record_id, &file).await?;
        }
        Command::Structure { record_id } => {
            let state = StateManager::spawn(&config.storage.store_dir, current_user)?;
            cmd_structure(&config, state, &record_id).await?;
        }
        Command::Describe { image } => {
            cmd_describe(&config, &image).await?;
        }
    }

    Ok(())
}

async fn cmd_record(state: &StateManager, command: RecordCommand) -> Result<()> {
    debug!(?command, "cmd_record: called");
    match command {
        RecordCommand::New { name } => {
            let record = state.create_for_current_user(&name).await?;
            println!("{} Created record: {}", "✓".green(), record.id.cyan());
        }
        RecordCommand::List => {
            let records = state.list_for_current_user().await?;
            if records.is_empty() {
                println!("{}", "No records".dimmed());
            }
            for record in records {
                let status = match (record.narrative(), record.board_text()) {
                    (_, Some(_)) => "structured",
                    (Some(_), None) => "analyzed",
                    (None, None) => "new",
                };
                println!("{} {} {}", record.id.yellow(), record.record_name, status.dimmed());
            }
        }
        RecordCommand::Show { id } => {
            let Some(record) = state.get(&id).await? else {
                bail!("Record not found: {}", id);
            };
            println!("{} {}", record.record_name.bold(), record.id.dimmed());
            match record.narrative() {
                Some(narrative) => println!("\n{}", narrative),
                None => println!("\n{}", "Not analysed yet".dimmed()),
            }
            if let Some(text) = record.board_text() {
                match BoardPayload::parse(text) {
                    Ok(board) => print_board(&board),
                    Err(e) => println!("\n{} {}", "Stored board is unreadable:".yellow(), e),
                }
            }
        }
    }
    Ok(())
}

async fn open_orchestrator(config: &Config, state: StateManager, record_id: &str) -> Result<PlanOrchestrator> {
    let Some(record) = state.get(record_id).await? else {
        bail!("Record not found: {}", record_id);
    };
    let client = create_session_client(config);
    Ok(PlanOrchestrator::new(&record, client, Arc::new(state)))
}

async fn cmd_upload(config: &Config, state: StateManager, record_id: &str, file: &Path) -> Result<()> {
    debug!(%record_id, file = %file.display(), "cmd_upload: called");
    let orchestrator = open_orchestrator(config, state, record_id).await?;
    let document = DocumentUpload::read(file).await.map_err(PlanError::from)?;

    println!("{} Uploading {} ...", "→".cyan(), document.filename);
    match orchestrator.initiate_upload(document).await {
        Ok(outcome) => {
            println!("{} Analysis complete\n", "✓".green());
            println!("{}", outcome.narrative);
            if !outcome.citations.is_empty() {
                println!("\n{}", "Sources".bold());
                for citation in &outcome.citations {
                    println!("  {}", citation.to_string().dimmed());
                }
            }
            Ok(())
        }
        Err(e) => {
            let view = orchestrator.view();
            if matches!(e, PlanError::Persistence(_)) && !view.narrative.is_empty() {
                println!("{}\n", view.narrative);
                println!("{} Analysis was not saved", "✗".red());
            }
            Err(e.into())
        }
    }
}

async fn cmd_structure(config: &Config, state: StateManager, record_id: &str) -> Result<()> {
    debug!(%record_id, "cmd_structure: called");
    let orchestrator = open_orchestrator(config, state, record_id).await?;

    println!("{} Structuring treatment plan ...", "→".cyan());
    let handoff = orchestrator.request_structuring().await?;
    println!("{} Board saved ({})", "✓".green(), handoff.route.dimmed());
    print_board(&handoff.board);
    Ok(())
}

async fn cmd_describe(config: &Config, image: &str) -> Result<()> {
    debug!(image_len = image.len(), "cmd_describe: called");
    let encoded = if image.starts_with("data:") {
        EncodedDocument::from_data_url(image, "inline-image")
    } else {
        encode_file(image).await
    }
    .map_err(PlanError::from)?;
    let client = create_session_client(config);
    let description = client.describe_image(&encoded).await?;
    println!("{}", description);
    Ok(())
}

fn print_board(board: &BoardPayload) {
    for column in ColumnId::ALL {
        let tasks = board.tasks_in(column);
        println!("\n{} ({})", board.column_title(column).bold(), tasks.len());
        for task in tasks {
            println!("  {} {}", format!("#{}", task.id).dimmed(), task.content);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level(None), tracing::Level::INFO);
        assert_eq!(parse_level(Some("debug")), tracing::Level::DEBUG);
        assert_eq!(parse_level(Some("Warning")), tracing::Level::WARN);
        assert_eq!(parse_level(Some("nonsense")), tracing::Level::INFO);
    }
}
