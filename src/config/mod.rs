//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    fmt, fs,
    num::{NonZeroU32, NonZeroUsize},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "mealie-search";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_RETRIES: u32 = 2;
const DEFAULT_RETRY_DELAY_MS: u64 = 1000;
const DEFAULT_PAGE_SIZE: u32 = 100;
pub(crate) const DEFAULT_CACHE_TTL_SECS: u64 = 300;
pub(crate) const DEFAULT_CACHE_MAX_RECIPES: usize = 500;
pub(crate) const DEFAULT_GROUP_SLUG_TTL_SECS: u64 = 3600;

/// Command-line arguments for the `mealie-search` binary.
#[derive(Debug, Parser)]
#[command(
    name = "mealie-search",
    version,
    about = "Natural-language recipe search for Mealie"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "MEALIE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Answer JSON-lines tool requests on stdin, one at a time.
    Serve,
    /// Search recipes with a natural-language query.
    Search(SearchArgs),
    /// Show one recipe by slug.
    Recipe(RecipeArgs),
    /// List recipes page by page.
    List(ListArgs),
    /// Show a random recipe.
    Random,
    /// Check API connectivity and cache state.
    Health,
}

#[derive(Debug, Args, Clone)]
pub struct SearchArgs {
    /// Free-text query, e.g. "quick dinners under 30 min".
    #[arg(value_name = "QUERY", num_args = 1.., required = true)]
    pub query: Vec<String>,

    /// Maximum number of results.
    #[arg(long, default_value_t = 15)]
    pub limit: usize,
}

#[derive(Debug, Args, Clone)]
pub struct RecipeArgs {
    /// Recipe slug, as shown in search results or recipe URLs.
    #[arg(value_name = "SLUG")]
    pub slug: String,
}

#[derive(Debug, Args, Clone)]
pub struct ListArgs {
    /// Recipes per page.
    #[arg(long, default_value_t = 20)]
    pub limit: u32,

    /// Page number, starting at 1.
    #[arg(long, default_value_t = 1)]
    pub page: u32,
}

#[derive(Debug, Args, Default, Clone)]
pub struct Overrides {
    /// Mealie base URL, e.g. <https://mealie.example.com>
    #[arg(long = "url", env = "MEALIE_URL", value_name = "URL")]
    pub base_url: Option<String>,

    /// Path to a file containing the API key (takes precedence over env).
    #[arg(long = "api-key-file", env = "MEALIE_API_KEY_FILE", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub api_key_file: Option<PathBuf>,

    /// API key from env; hidden so it does not end up in shell history.
    #[arg(long = "api-key", hide = true, env = "MEALIE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Username for group-slug resolution.
    #[arg(long = "username", env = "MEALIE_USERNAME", value_name = "NAME")]
    pub username: Option<String>,

    /// Password for group-slug resolution.
    #[arg(long = "password", hide = true, env = "MEALIE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Append logs to this file instead of stderr.
    #[arg(long = "log-file", env = "MCP_LOG_FILE", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub log_file: Option<PathBuf>,

    /// Override the recipe cache TTL.
    #[arg(long = "cache-ttl-seconds", value_name = "SECONDS")]
    pub cache_ttl_seconds: Option<u64>,

    /// Override the recipe cache capacity.
    #[arg(long = "cache-max-recipes", value_name = "COUNT")]
    pub cache_max_recipes: Option<usize>,
}

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api: ApiSettings,
    pub cache: CacheSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: Url,
    pub api_key: String,
    pub credentials: Option<Credentials>,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub page_size: NonZeroU32,
}

/// Username/password pair used only for group-slug resolution.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub ttl: Duration,
    pub max_recipes: NonZeroUsize,
    pub group_slug_ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("failed to read API key file: {0}")]
    KeyFile(std::io::Error),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("MEALIE").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(&cli.overrides)?;

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    api: RawApiSettings,
    cache: RawCacheSettings,
    logging: RawLoggingSettings,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &Overrides) -> Result<(), LoadError> {
        if let Some(url) = overrides.base_url.as_ref() {
            self.api.url = Some(url.clone());
        }
        if let Some(path) = overrides.api_key_file.as_ref() {
            let key = fs::read_to_string(path).map_err(LoadError::KeyFile)?;
            self.api.api_key = Some(key.trim().to_string());
        } else if let Some(key) = overrides.api_key.as_ref() {
            self.api.api_key = Some(key.clone());
        }
        if let Some(username) = overrides.username.as_ref() {
            self.api.username = Some(username.clone());
        }
        if let Some(password) = overrides.password.as_ref() {
            self.api.password = Some(password.clone());
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(file) = overrides.log_file.as_ref() {
            self.logging.file = Some(file.clone());
        }
        if let Some(ttl) = overrides.cache_ttl_seconds {
            self.cache.ttl_seconds = Some(ttl);
        }
        if let Some(max) = overrides.cache_max_recipes {
            self.cache.max_recipes = Some(max);
        }
        Ok(())
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            api,
            cache,
            logging,
        } = raw;

        Ok(Self {
            api: build_api_settings(api)?,
            cache: build_cache_settings(cache)?,
            logging: build_logging_settings(logging)?,
        })
    }
}

fn build_api_settings(api: RawApiSettings) -> Result<ApiSettings, LoadError> {
    let url = non_blank(api.url)
        .ok_or_else(|| LoadError::invalid("api.url", "MEALIE_URL must be set"))?;
    let base_url = Url::parse(url.trim_end_matches('/'))
        .map_err(|err| LoadError::invalid("api.url", format!("failed to parse: {err}")))?;
    if base_url.cannot_be_a_base() {
        return Err(LoadError::invalid("api.url", "must be an http(s) base URL"));
    }

    let api_key = non_blank(api.api_key)
        .ok_or_else(|| LoadError::invalid("api.api_key", "MEALIE_API_KEY must be set"))?;

    let credentials = match (non_blank(api.username), non_blank(api.password)) {
        (Some(username), Some(password)) => Some(Credentials { username, password }),
        _ => None,
    };

    let timeout_secs = api.timeout_seconds.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "api.timeout_seconds",
            "must be greater than zero",
        ));
    }

    let page_size = api.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
    let page_size = NonZeroU32::new(page_size)
        .ok_or_else(|| LoadError::invalid("api.page_size", "must be greater than zero"))?;

    Ok(ApiSettings {
        base_url,
        api_key,
        credentials,
        timeout: Duration::from_secs(timeout_secs),
        max_retries: api.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
        retry_delay: Duration::from_millis(api.retry_delay_ms.unwrap_or(DEFAULT_RETRY_DELAY_MS)),
        page_size,
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let ttl_secs = cache.ttl_seconds.unwrap_or(DEFAULT_CACHE_TTL_SECS);
    if ttl_secs == 0 {
        return Err(LoadError::invalid(
            "cache.ttl_seconds",
            "must be greater than zero",
        ));
    }

    let max_recipes = cache.max_recipes.unwrap_or(DEFAULT_CACHE_MAX_RECIPES);
    let max_recipes = NonZeroUsize::new(max_recipes)
        .ok_or_else(|| LoadError::invalid("cache.max_recipes", "must be greater than zero"))?;

    let group_ttl_secs = cache
        .group_slug_ttl_seconds
        .unwrap_or(DEFAULT_GROUP_SLUG_TTL_SECS);
    if group_ttl_secs == 0 {
        return Err(LoadError::invalid(
            "cache.group_slug_ttl_seconds",
            "must be greater than zero",
        ));
    }

    Ok(CacheSettings {
        ttl: Duration::from_secs(ttl_secs),
        max_recipes,
        group_slug_ttl: Duration::from_secs(group_ttl_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    let file = logging.file.filter(|path| !path.as_os_str().is_empty());

    Ok(LoggingSettings {
        level,
        format,
        file,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawApiSettings {
    url: Option<String>,
    api_key: Option<String>,
    username: Option<String>,
    password: Option<String>,
    timeout_seconds: Option<u64>,
    max_retries: Option<u32>,
    retry_delay_ms: Option<u64>,
    page_size: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    ttl_seconds: Option<u64>,
    max_recipes: Option<usize>,
    group_slug_ttl_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
    file: Option<PathBuf>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
