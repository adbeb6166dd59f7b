use std::{fs, path::PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use material_flow_documents::{
    config::{self, AppConfig},
    db::{self, with_unit_of_work, DbPool, TransactionOutcome},
    models::{Document, DocumentType, Location, PositionDraft, User},
    services::{DocumentBuilder, DocumentManagementService},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = CliContext::initialize().await?;

    match cli.command {
        Commands::Migrate => handle_migrate(&context).await?,
        Commands::Build(args) => handle_build(&context, args, cli.json).await?,
    }

    Ok(())
}

#[derive(Parser)]
#[command(name = "document-cli", about = "Build and persist warehouse documents", version)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply the embedded schema migrations
    Migrate,
    /// Build a document from a JSON request file
    Build(BuildArgs),
}

#[derive(Args)]
struct BuildArgs {
    #[arg(long, help = "Path to the JSON document request")]
    file: PathBuf,
    #[arg(
        long,
        action = ArgAction::SetTrue,
        help = "Fail instead of returning an invalid document"
    )]
    strict: bool,
}

/// Document request as read from `--file`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DocumentRequest {
    document_type: DocumentType,
    #[serde(default)]
    location_from: Option<Location>,
    #[serde(default)]
    location_to: Option<Location>,
    /// Author; the configured operator when absent
    #[serde(default)]
    user: Option<User>,
    #[serde(default)]
    accepted: bool,
    #[serde(default)]
    attributes: Map<String, Value>,
    #[serde(default)]
    positions: Vec<PositionDraft>,
}

#[derive(Serialize)]
struct BuildReport {
    outcome: TransactionOutcome,
    valid: bool,
    messages: Vec<String>,
    document: Document,
}

struct CliContext {
    config: AppConfig,
    db: DbPool,
    documents: DocumentManagementService,
}

impl CliContext {
    async fn initialize() -> Result<Self> {
        let config = config::load_config().context("failed to load application config")?;
        config::init_tracing(config.log_level(), config.log_json);

        let db = db::establish_connection_from_app_config(&config)
            .await
            .context("failed to connect to database")?;
        if config.auto_migrate {
            db::run_migrations(&db)
                .await
                .context("failed to run migrations")?;
        }

        let documents = DocumentManagementService::from_config(&config);
        Ok(Self {
            config,
            db,
            documents,
        })
    }
}

async fn handle_migrate(context: &CliContext) -> Result<()> {
    db::run_migrations(&context.db)
        .await
        .context("failed to run migrations")?;
    println!("Migrations applied to {}", context.config.database_url());
    Ok(())
}

async fn handle_build(context: &CliContext, args: BuildArgs, json: bool) -> Result<()> {
    let raw = fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let request: DocumentRequest =
        serde_json::from_str(&raw).context("document request is not valid JSON")?;

    let builder = prepare_builder(&context.documents, request).await?;
    let documents = context.documents.clone();
    let strict = args.strict;

    let (document, outcome) = with_unit_of_work(&context.db, |uow| {
        Box::pin(async move {
            if strict {
                builder.build_with_entity_error(uow).await
            } else {
                documents.build(builder, uow).await
            }
        })
    })
    .await
    .map_err(|e| match e.as_document_build() {
        Some(failure) => anyhow!("{}", failure),
        None => anyhow!(e),
    })?;

    info!(document_id = ?document.id, %outcome, "Document request processed");

    let report = BuildReport {
        outcome,
        valid: document.is_valid(),
        messages: document
            .errors()
            .messages()
            .map(|m| m.message.clone())
            .collect(),
        document,
    };

    if json {
        print_json(&report)?;
    } else {
        render_report(&report);
    }
    Ok(())
}

async fn prepare_builder(documents: &DocumentManagementService, request: DocumentRequest) -> Result<DocumentBuilder> {
    let mut builder = match &request.user {
        Some(user) => documents.document_builder_for(user),
        None => documents.document_builder().await?,
    };

    let kind = request.document_type;
    let to = || {
        request
            .location_to
            .clone()
            .ok_or_else(|| anyhow!("location_to is required for {} documents", kind))
    };
    let from = || {
        request
            .location_from
            .clone()
            .ok_or_else(|| anyhow!("location_from is required for {} documents", kind))
    };

    match kind {
        DocumentType::Receipt => builder.receipt(to()?),
        DocumentType::InternalInbound => builder.internal_inbound(to()?),
        DocumentType::Return => builder.returned(to()?),
        DocumentType::InternalOutbound => builder.internal_outbound(from()?),
        DocumentType::Release => builder.release(from()?),
        DocumentType::Transfer => builder.transfer(to()?, from()?),
    };

    for (name, value) in request.attributes {
        builder.set_attribute(name, value);
    }
    for (index, draft) in request.positions.into_iter().enumerate() {
        builder
            .add_position(draft)
            .with_context(|| format!("position {} is incomplete", index + 1))?;
    }
    if request.accepted {
        builder.set_accepted();
    }

    Ok(builder)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn render_report(report: &BuildReport) {
    let document = &report.document;
    let kind = document
        .document_type
        .map(|t| t.to_string())
        .unwrap_or_else(|| "untyped".to_string());
    let id = document
        .id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "-".to_string());

    println!(
        "{} document {} • state {} • {} positions • {}",
        kind,
        id,
        document.state,
        document.positions.len(),
        report.outcome
    );
    for message in &report.messages {
        println!("  ! {}", message);
    }
}
