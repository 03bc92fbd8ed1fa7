use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use grader::config::{CliArgs, Config};
use grader::execution::ExecutionClient;
use grader::grader::Grader;
use grader::template::InMemoryTemplateStore;
use grader::web_server::build_server;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let cli = CliArgs::parse();
    let Config {
        server: server_config,
        execution: execution_config,
        questions,
    } = cli
        .to_config()
        .with_context(|| format!("Failed to load configuration from {}", cli.config_path))?;

    log::info!("Loaded {} questions", questions.len());
    let store = Arc::new(InMemoryTemplateStore::from_questions(questions));
    let client = ExecutionClient::new(execution_config).context("Failed to build execution client")?;
    if let Err(e) = client.ensure_configured() {
        log::warn!("Execution service not usable, submissions will be reviewed heuristically: {e}");
    }

    let server = build_server(server_config, Grader::new(store, client))
        .context("Failed to build server")?;
    let server_handle = server.handle();
    let server_task = actix_web::rt::spawn(server);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            log::info!("Ctrl-c received, shutting down...");
        }
        res_server = server_task => {
            log::error!("Server terminated unexpectedly: {:?}", res_server);
        }
    }

    server_handle.stop(true).await;

    log::info!("Shutdown complete");
    Ok(())
}
