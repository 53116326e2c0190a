//! task-tree command line entry point.

use clap::Parser;
use serde::Serialize;
use serde_json::json;
use std::process::ExitCode;
use std::sync::Arc;
use task_tree::advice::{self, AdviceCredentials, AdviceRequest, GeminiAdvisor, SettingsView};
use task_tree::cli::{self, Cli, Command};
use task_tree::clock::{Clock, SystemClock};
use task_tree::codec::TaskNodeDto;
use task_tree::config::Config;
use task_tree::db::Database;
use task_tree::error::{TreeError, TreeResult};
use task_tree::format::{self, OutputFormat};
use task_tree::logging::{LogTarget, init_logging};
use task_tree::tree::TaskTreeService;
use tracing::{debug, info};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&LogTarget::parse(&cli.log), cli.verbose) {
        eprintln!("Failed to initialize logging: {:#}", e);
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            print_error(&err);
            ExitCode::FAILURE
        }
    }
}

fn print_error(err: &TreeError) {
    let body = json!({
        "code": err.code,
        "message": err.public_message(),
        "field": err.field,
        "details": err.details,
    });
    eprintln!("{}", body);
}

/// Print a result in the selected format. `text` renders the text form.
fn emit<T: Serialize>(format: OutputFormat, value: &T, text: impl FnOnce() -> String) -> TreeResult<()> {
    match format {
        OutputFormat::Json => println!("{}", format::to_json(value).map_err(TreeError::internal)?),
        OutputFormat::Text => print!("{}", text()),
    }
    Ok(())
}

fn emit_done(format: OutputFormat, action: &str, id: &str) -> TreeResult<()> {
    emit(format, &json!({ "ok": true, "id": id }), || {
        format!("{} {}\n", action, id)
    })
}

async fn run(cli: Cli) -> TreeResult<()> {
    let mut config = Config::discover(cli.config.as_deref())
        .map_err(|e| TreeError::invalid_value("config", format!("{:#}", e)))?;
    if let Some(db_path) = cli.database {
        config.store.db_path = db_path;
    }
    debug!(db = %config.store.db_path.display(), "Opening database");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let db = Database::open(&config.store.db_path)?;
    db.migrate_retired_model(&config.advice.model, clock.now())?;

    let fmt = cli.format;
    match cli.command {
        Command::Tree => {
            let service = TaskTreeService::new(db, clock);
            let nodes = service.list_tree()?;
            emit(fmt, &nodes, || format::format_tree_text(&nodes))
        }
        Command::Deleted => {
            let service = TaskTreeService::new(db, clock);
            let nodes = service.list_deleted()?;
            emit(fmt, &nodes, || format::format_deleted_text(&nodes))
        }
        Command::Create { json } => {
            let service = TaskTreeService::new(db, clock);
            let dto: TaskNodeDto = cli::parse_json_arg("json", &json)?;
            let created = service.create(dto)?;
            emit(fmt, &created, || format::format_tree_text(std::slice::from_ref(&created)))
        }
        Command::Update { id, json } => {
            let service = TaskTreeService::new(db, clock);
            let dto: TaskNodeDto = cli::parse_json_arg("json", &json)?;
            let updated = service.update(&id, dto)?;
            emit(fmt, &updated, || format::format_tree_text(std::slice::from_ref(&updated)))
        }
        Command::Sync { file } => {
            let service = TaskTreeService::new(db, clock);
            let raw = cli::read_source(&file)?;
            let dtos: Vec<TaskNodeDto> = cli::parse_json_arg("file", &raw)?;
            let count = dtos.len();
            service.sync_tree(dtos)?;
            emit(fmt, &json!({ "ok": true, "count": count }), || {
                format!("Synced {} nodes\n", count)
            })
        }
        Command::Delete { id } => {
            TaskTreeService::new(db, clock).soft_delete(&id)?;
            emit_done(fmt, "Deleted", &id)
        }
        Command::Restore { id } => {
            TaskTreeService::new(db, clock).restore(&id)?;
            emit_done(fmt, "Restored", &id)
        }
        Command::Purge { id } => {
            TaskTreeService::new(db, clock).permanent_delete(&id)?;
            emit_done(fmt, "Purged", &id)
        }
        Command::Advice { title, content, kind } => {
            let settings = db.get_advice_settings(&config.advice.model, clock.now())?;
            let credentials = AdviceCredentials::resolve(Some(&settings), &config.advice);
            let provider = GeminiAdvisor::new(&config.advice).map_err(TreeError::internal)?;
            let request = AdviceRequest {
                task_title: title,
                task_content: content,
                request_type: kind,
            };
            let response = advice::get_advice(&provider, &credentials, &request).await?;
            emit(fmt, &response, || format!("{}\n", response.advice))
        }
        Command::Settings { api_key, model } => {
            let now = clock.now();
            let settings = if api_key.is_some() || model.is_some() {
                info!("Updating advice settings");
                db.update_advice_settings(api_key, model, &config.advice.model, now)?
            } else {
                db.get_advice_settings(&config.advice.model, now)?
            };
            let view = SettingsView::from(&settings);
            emit(fmt, &view, || {
                format!(
                    "model: {}\napi key: {}\n",
                    view.model,
                    if view.has_api_key { view.api_key.as_str() } else { "(not set)" }
                )
            })
        }
    }
}
