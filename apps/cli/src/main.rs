//! Auditkit operator CLI for audit sessions and query overrides.

#![forbid(unsafe_code)]

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use auditkit_application::{
    ApiTransport, AuditSessionService, QueryEditorService, RequestPoller,
};
use auditkit_core::{AppError, AppResult, describe_failures};
use auditkit_domain::{AuditEngine, AuditSession, QueryLevel, ScopeSelector};
use auditkit_infrastructure::{HttpApiTransport, TransportProjectDirectory};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{CliConfig, SessionTarget};

#[derive(Parser)]
#[command(name = "auditkit")]
#[command(about = "Work with query-editor audit sessions", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Opens a session, prints its capabilities and closes it.
    Session,
    /// Lists the queries visible to a session.
    Queries,
    /// Compiles a query source file against an existing editor key.
    Validate {
        editor_key: String,
        source_file: PathBuf,
    },
}

struct Services {
    sessions: AuditSessionService,
    editor: QueryEditorService,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = CliConfig::load()?;
    let services = build_services(&config)?;

    info!(
        engine = %config.engine,
        target = ?config.target,
        delay_seconds = config.polling.delay_seconds,
        max_seconds = config.polling.max_seconds,
        "auditkit-cli started"
    );

    let session = open_session(&services.sessions, &config).await?;
    let outcome = run_command(&services, &session, cli.command).await;

    if let Err(error) = services.sessions.teardown(Some(session)).await {
        warn!(error = %error, "failed to close audit session");
    }

    outcome
}

fn build_services(config: &CliConfig) -> AppResult<Services> {
    let transport: Arc<dyn ApiTransport> =
        Arc::new(HttpApiTransport::new(config.transport.clone())?);
    let project_directory = Arc::new(TransportProjectDirectory::new(transport.clone()));
    let poller = RequestPoller::new(transport.clone(), config.polling);

    Ok(Services {
        sessions: AuditSessionService::new(transport.clone(), project_directory, poller.clone()),
        editor: QueryEditorService::new(transport, poller),
    })
}

async fn open_session(sessions: &AuditSessionService, config: &CliConfig) -> AppResult<AuditSession> {
    match &config.target {
        SessionTarget::Project {
            project_id,
            scan_id,
        } => {
            sessions
                .open_project_session(&config.engine, project_id, scan_id)
                .await
        }
        SessionTarget::Tenant { filter } => {
            sessions
                .create_session(&config.engine, ScopeSelector::tenant(filter.as_str()))
                .await
        }
    }
}

async fn run_command(
    services: &Services,
    session: &AuditSession,
    command: Commands,
) -> AppResult<()> {
    match command {
        Commands::Session => {
            println!("{session}");
            println!("{}: {}", capability_label(session), session.capabilities().join(", "));
            Ok(())
        }
        Commands::Queries => list_queries(&services.editor, session).await,
        Commands::Validate {
            editor_key,
            source_file,
        } => {
            let source = tokio::fs::read_to_string(&source_file).await.map_err(|error| {
                AppError::Validation(format!(
                    "failed to read query source '{}': {error}",
                    source_file.display()
                ))
            })?;

            match services
                .editor
                .validate_source(session, &editor_key, &source)
                .await
            {
                Ok(()) => {
                    println!("{editor_key}: source compiles");
                    Ok(())
                }
                Err(error) if !error.query_failures().is_empty() => {
                    println!("{}", describe_failures(error.query_failures()));
                    Err(error)
                }
                Err(error) => Err(error),
            }
        }
    }
}

async fn list_queries(editor: &QueryEditorService, session: &AuditSession) -> AppResult<()> {
    let (level, level_id) = if session.project_id().is_empty() {
        (QueryLevel::Tenant, String::new())
    } else {
        (QueryLevel::Project, session.project_id().to_owned())
    };

    let (summary, lines) = match session.engine() {
        AuditEngine::Sast => {
            let collection = editor.fetch_sast_queries(session, level, &level_id).await?;
            let lines: Vec<String> = collection.iter().map(ToString::to_string).collect();
            (collection.count_by_level(), lines)
        }
        AuditEngine::Iac => {
            let mut collection = editor.fetch_iac_queries(session, level, &level_id).await?;
            let refreshed = editor
                .enrich_iac_collection(session, &mut collection, true)
                .await?;
            info!(session = %session, refreshed, "loaded custom iac query details");
            let lines: Vec<String> = collection.iter().map(ToString::to_string).collect();
            (collection.count_by_level(), lines)
        }
    };

    for line in &lines {
        println!("{line}");
    }
    for (level, count) in summary {
        println!("{level}: {count}");
    }

    Ok(())
}

fn capability_label(session: &AuditSession) -> &'static str {
    match session.engine() {
        AuditEngine::Sast => "languages",
        AuditEngine::Iac => "platforms",
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
