use std::process;
use std::sync::Arc;

use mealie_search::{
    application::{
        error::AppError,
        recipes::RecipeService,
        tools::{RecipeTools, ToolRequest},
    },
    cache::{CacheConfig, GroupSlugResolver, RecipeCache},
    config::{self, Command, Settings},
    infra::{http::ApiClient, telemetry},
};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

type Tools = RecipeTools<ApiClient, ApiClient>;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;
    telemetry::init(&settings.logging)?;

    let tools = build_tools(&settings)?;
    let command = cli_args.command.unwrap_or(Command::Serve);

    // `health` reports connectivity itself instead of refusing to start.
    if !matches!(command, Command::Health) {
        validate_connectivity(&tools, &settings).await?;
    }

    match command {
        Command::Serve => serve(&tools).await,
        Command::Search(args) => {
            let query = args.query.join(" ");
            emit(&tools.search_recipes(&query, args.limit).await).await
        }
        Command::Recipe(args) => emit(&tools.get_recipe(&args.slug).await).await,
        Command::List(args) => emit(&tools.list_recipes(args.limit, args.page).await).await,
        Command::Random => emit(&tools.get_random_recipe().await).await,
        Command::Health => emit(&tools.health_check().await).await,
    }
}

fn build_tools(settings: &Settings) -> Result<Tools, AppError> {
    let client = ApiClient::from_settings(&settings.api)?;
    let cache = Arc::new(RecipeCache::new(CacheConfig::from(&settings.cache)));

    let recipes = RecipeService::new(client.clone(), cache, settings.api.page_size);
    let group_slug = GroupSlugResolver::new(
        client.clone(),
        settings.api.credentials.clone(),
        settings.cache.group_slug_ttl,
    );
    Ok(RecipeTools::new(recipes, group_slug, client.base_url()))
}

/// Fail fast on an unreachable API, then warm the group slug so the first
/// request does not pay for the login round-trip.
async fn validate_connectivity(tools: &Tools, settings: &Settings) -> Result<(), AppError> {
    info!(url = %settings.api.base_url, "Testing connection to Mealie");
    tools.check_connectivity().await?;
    info!("Mealie API connection successful");

    let group_slug = tools.group_slug().await;
    info!(group_slug = %group_slug, "Group slug ready");
    Ok(())
}

/// JSON-lines loop: one `{"tool", "args"}` request per line, one
/// `{"result"}` line back, strictly in order.
async fn serve(tools: &Tools) -> Result<(), AppError> {
    info!("Serving tool requests on stdin");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<ToolRequest>(line) {
            Ok(request) => json!({ "result": tools.call(request).await }),
            Err(err) => {
                warn!(error = %err, "Malformed tool request");
                json!({ "error": format!("invalid request: {err}") })
            }
        };

        let mut payload = response.to_string();
        payload.push('\n');
        stdout.write_all(payload.as_bytes()).await?;
        stdout.flush().await?;
    }

    info!("stdin closed, shutting down");
    Ok(())
}

async fn emit(text: &str) -> Result<(), AppError> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(text.as_bytes()).await?;
    if !text.ends_with('\n') {
        stdout.write_all(b"\n").await?;
    }
    stdout.flush().await?;
    Ok(())
}
