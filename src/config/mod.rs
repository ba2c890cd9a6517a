//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    net::SocketAddr,
    num::NonZeroU32,
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
const LOCAL_CONFIG_BASENAME: &str = "vetrina";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_ADMIN_HOST: &str = "127.0.0.1";
const DEFAULT_PUBLIC_PORT: u16 = 8080;
const DEFAULT_ADMIN_PORT: u16 = 8081;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_STORE_PATH: &str = "vetrina-state.json";
const DEFAULT_SHEET_ENDPOINT: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const DEFAULT_SHEET_NAME: &str = "Hoja 1";
const DEFAULT_COLUMN_SPAN: &str = "A:J";
const DEFAULT_CONTENT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_CONTENT_FRESH_SECS: u64 = 60;
const DEFAULT_RELAY_URL: &str = "https://api.web3forms.com/submit";
const DEFAULT_CONTACT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 900;
const DEFAULT_RATE_LIMIT_MAX_REQUESTS: u64 = 100;
const DEFAULT_LOGIN_MAX_ATTEMPTS: u64 = 3;
const DEFAULT_LOGIN_WINDOW_SECS: u64 = 300;
const DEFAULT_SESSION_TTL_SECS: u64 = 3600;

/// Command-line arguments for the vetrina binary.
#[derive(Debug, Parser)]
#[command(name = "vetrina", version, about = "vetrina portfolio & blog content server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "VETRINA_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the public and admin HTTP services.
    Serve(ServeArgs),
    /// Export locally edited content to a TOML archive.
    #[command(name = "export")]
    Export(ExportArgs),
    /// Import content from a TOML archive into the local store.
    #[command(name = "import")]
    Import(ImportArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct StoreOverride {
    /// Override the state file path.
    #[arg(long = "store-path", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub store_path: Option<PathBuf>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub store: StoreOverride,

    /// Override the public listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the administrative listener host.
    #[arg(long = "server-admin-host", value_name = "HOST")]
    pub server_admin_host: Option<String>,

    /// Override the public listener port.
    #[arg(long = "server-public-port", value_name = "PORT")]
    pub public_port: Option<u16>,

    /// Override the administrative listener port.
    #[arg(long = "server-admin-port", value_name = "PORT")]
    pub admin_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

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

    /// Override the spreadsheet id posts are pulled from.
    #[arg(long = "content-spreadsheet-id", value_name = "ID")]
    pub content_spreadsheet_id: Option<String>,

    /// Override the read-only spreadsheet API key.
    #[arg(long = "content-api-key", value_name = "KEY")]
    pub content_api_key: Option<String>,

    /// Override the sheet tab name within the spreadsheet.
    #[arg(long = "content-sheet-name", value_name = "NAME")]
    pub content_sheet_name: Option<String>,

    /// Override the spreadsheet values endpoint.
    #[arg(long = "content-sheet-endpoint", value_name = "URL")]
    pub content_sheet_endpoint: Option<String>,

    /// Override the freshness window for ingested posts.
    #[arg(long = "content-fresh-seconds", value_name = "SECONDS")]
    pub content_fresh_seconds: Option<u64>,

    /// Override the spreadsheet request timeout.
    #[arg(long = "content-timeout-seconds", value_name = "SECONDS")]
    pub content_timeout_seconds: Option<u64>,

    /// Override the contact form relay URL.
    #[arg(long = "contact-relay-url", value_name = "URL")]
    pub contact_relay_url: Option<String>,

    /// Override the contact form relay access key.
    #[arg(long = "contact-access-key", value_name = "KEY")]
    pub contact_access_key: Option<String>,

    /// Override the relay request timeout.
    #[arg(long = "contact-timeout-seconds", value_name = "SECONDS")]
    pub contact_timeout_seconds: Option<u64>,

    /// Override the public rate limit window size.
    #[arg(long = "rate-limit-window-seconds", value_name = "SECONDS")]
    pub rate_limit_window_seconds: Option<u64>,

    /// Override the public rate limit request ceiling.
    #[arg(long = "rate-limit-max-requests", value_name = "COUNT")]
    pub rate_limit_max_requests: Option<u64>,

    /// Override the login attempt ceiling per backoff window.
    #[arg(long = "login-max-attempts", value_name = "COUNT")]
    pub login_max_attempts: Option<u64>,

    /// Override the base login backoff window.
    #[arg(long = "login-window-seconds", value_name = "SECONDS")]
    pub login_window_seconds: Option<u64>,

    /// Override the admin session lifetime.
    #[arg(long = "session-ttl-seconds", value_name = "SECONDS")]
    pub session_ttl_seconds: Option<u64>,
}

#[derive(Debug, Args, Clone)]
pub struct ExportArgs {
    #[command(flatten)]
    pub store: StoreOverride,

    /// Path to the archive file to write.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct ImportArgs {
    #[command(flatten)]
    pub store: StoreOverride,

    /// Path to the archive to import.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: PathBuf,
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub store: StoreSettings,
    pub content: ContentSettings,
    pub contact: ContactSettings,
    pub rate_limit: RateLimitSettings,
    pub login: LoginSettings,
    pub session: SessionSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub public_addr: SocketAddr,
    pub admin_addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ContentSettings {
    pub sheet_endpoint: Url,
    pub spreadsheet_id: Option<String>,
    pub api_key: Option<String>,
    pub sheet_name: String,
    pub column_span: String,
    pub http_timeout: Duration,
    /// How long an ingested post list stays fresh; zero disables the memo.
    pub fresh_window: Duration,
}

#[derive(Debug, Clone)]
pub struct ContactSettings {
    pub relay_url: Url,
    pub access_key: Option<String>,
    pub http_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct RateLimitSettings {
    pub window_seconds: NonZeroU32,
    pub max_requests: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct LoginSettings {
    pub max_attempts: NonZeroU32,
    pub window_seconds: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub ttl: Duration,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
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

    builder = builder.add_source(Environment::with_prefix("VETRINA").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Export(args)) => raw.apply_store_override(&args.store),
        Some(Command::Import(args)) => raw.apply_store_override(&args.store),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    store: RawStoreSettings,
    content: RawContentSettings,
    contact: RawContactSettings,
    rate_limit: RawRateLimitSettings,
    login: RawLoginSettings,
    session: RawSessionSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        self.apply_store_override(&overrides.store);

        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(host) = overrides.server_admin_host.as_ref() {
            self.server.admin_host = Some(host.clone());
        }
        if let Some(port) = overrides.public_port {
            self.server.public_port = Some(port);
        }
        if let Some(port) = overrides.admin_port {
            self.server.admin_port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(id) = overrides.content_spreadsheet_id.as_ref() {
            self.content.spreadsheet_id = Some(id.clone());
        }
        if let Some(key) = overrides.content_api_key.as_ref() {
            self.content.api_key = Some(key.clone());
        }
        if let Some(name) = overrides.content_sheet_name.as_ref() {
            self.content.sheet_name = Some(name.clone());
        }
        if let Some(endpoint) = overrides.content_sheet_endpoint.as_ref() {
            self.content.sheet_endpoint = Some(endpoint.clone());
        }
        if let Some(seconds) = overrides.content_fresh_seconds {
            self.content.fresh_seconds = Some(seconds);
        }
        if let Some(seconds) = overrides.content_timeout_seconds {
            self.content.timeout_seconds = Some(seconds);
        }
        if let Some(relay) = overrides.contact_relay_url.as_ref() {
            self.contact.relay_url = Some(relay.clone());
        }
        if let Some(key) = overrides.contact_access_key.as_ref() {
            self.contact.access_key = Some(key.clone());
        }
        if let Some(seconds) = overrides.contact_timeout_seconds {
            self.contact.timeout_seconds = Some(seconds);
        }
        if let Some(window) = overrides.rate_limit_window_seconds {
            self.rate_limit.window_seconds = Some(window);
        }
        if let Some(max) = overrides.rate_limit_max_requests {
            self.rate_limit.max_requests = Some(max);
        }
        if let Some(max) = overrides.login_max_attempts {
            self.login.max_attempts = Some(max);
        }
        if let Some(window) = overrides.login_window_seconds {
            self.login.window_seconds = Some(window);
        }
        if let Some(ttl) = overrides.session_ttl_seconds {
            self.session.ttl_seconds = Some(ttl);
        }
    }

    fn apply_store_override(&mut self, overrides: &StoreOverride) {
        if let Some(path) = overrides.store_path.as_ref() {
            self.store.path = Some(path.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            store,
            content,
            contact,
            rate_limit,
            login,
            session,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            store: build_store_settings(store)?,
            content: build_content_settings(content)?,
            contact: build_contact_settings(contact)?,
            rate_limit: build_rate_limit_settings(rate_limit)?,
            login: build_login_settings(login)?,
            session: build_session_settings(session)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
    let admin_host = server
        .admin_host
        .unwrap_or_else(|| DEFAULT_ADMIN_HOST.to_string());

    let public_port = server.public_port.unwrap_or(DEFAULT_PUBLIC_PORT);
    if public_port == 0 {
        return Err(LoadError::invalid(
            "server.public_port",
            "port must be greater than zero",
        ));
    }

    let admin_port = server.admin_port.unwrap_or(DEFAULT_ADMIN_PORT);
    if admin_port == 0 {
        return Err(LoadError::invalid(
            "server.admin_port",
            "port must be greater than zero",
        ));
    }

    let public_addr = parse_socket_addr(&host, public_port)
        .map_err(|reason| LoadError::invalid("server.public_addr", reason))?;
    let admin_addr = parse_socket_addr(&admin_host, admin_port)
        .map_err(|reason| LoadError::invalid("server.admin_addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        public_addr,
        admin_addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
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

    Ok(LoggingSettings { level, format })
}

fn build_store_settings(store: RawStoreSettings) -> Result<StoreSettings, LoadError> {
    let path = store
        .path
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH));
    if path.as_os_str().is_empty() {
        return Err(LoadError::invalid("store.path", "path must not be empty"));
    }
    Ok(StoreSettings { path })
}

fn build_content_settings(content: RawContentSettings) -> Result<ContentSettings, LoadError> {
    let endpoint_raw = content
        .sheet_endpoint
        .unwrap_or_else(|| DEFAULT_SHEET_ENDPOINT.to_string());
    let sheet_endpoint = Url::parse(&endpoint_raw).map_err(|err| {
        LoadError::invalid("content.sheet_endpoint", format!("failed to parse: {err}"))
    })?;

    let sheet_name = content
        .sheet_name
        .unwrap_or_else(|| DEFAULT_SHEET_NAME.to_string());
    if sheet_name.is_empty() {
        return Err(LoadError::invalid(
            "content.sheet_name",
            "name must not be empty",
        ));
    }

    let column_span = content
        .column_span
        .unwrap_or_else(|| DEFAULT_COLUMN_SPAN.to_string());
    if column_span.is_empty() {
        return Err(LoadError::invalid(
            "content.column_span",
            "span must not be empty",
        ));
    }

    let timeout_secs = content
        .timeout_seconds
        .unwrap_or(DEFAULT_CONTENT_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "content.timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ContentSettings {
        sheet_endpoint,
        spreadsheet_id: trimmed_non_empty(content.spreadsheet_id),
        api_key: trimmed_non_empty(content.api_key),
        sheet_name,
        column_span,
        http_timeout: Duration::from_secs(timeout_secs),
        fresh_window: Duration::from_secs(
            content.fresh_seconds.unwrap_or(DEFAULT_CONTENT_FRESH_SECS),
        ),
    })
}

fn build_contact_settings(contact: RawContactSettings) -> Result<ContactSettings, LoadError> {
    let relay_raw = contact
        .relay_url
        .unwrap_or_else(|| DEFAULT_RELAY_URL.to_string());
    let relay_url = Url::parse(&relay_raw).map_err(|err| {
        LoadError::invalid("contact.relay_url", format!("failed to parse: {err}"))
    })?;

    let timeout_secs = contact
        .timeout_seconds
        .unwrap_or(DEFAULT_CONTACT_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "contact.timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ContactSettings {
        relay_url,
        access_key: trimmed_non_empty(contact.access_key),
        http_timeout: Duration::from_secs(timeout_secs),
    })
}

fn build_rate_limit_settings(
    rate_limit: RawRateLimitSettings,
) -> Result<RateLimitSettings, LoadError> {
    let window_seconds_val = rate_limit
        .window_seconds
        .unwrap_or(DEFAULT_RATE_LIMIT_WINDOW_SECS);
    let window_seconds = non_zero_u32(window_seconds_val, "rate_limit.window_seconds")?;

    let max_requests_val = rate_limit
        .max_requests
        .unwrap_or(DEFAULT_RATE_LIMIT_MAX_REQUESTS);
    let max_requests = non_zero_u32(max_requests_val, "rate_limit.max_requests")?;

    Ok(RateLimitSettings {
        window_seconds,
        max_requests,
    })
}

fn build_login_settings(login: RawLoginSettings) -> Result<LoginSettings, LoadError> {
    let max_attempts_val = login.max_attempts.unwrap_or(DEFAULT_LOGIN_MAX_ATTEMPTS);
    let max_attempts = non_zero_u32(max_attempts_val, "login.max_attempts")?;

    let window_seconds_val = login.window_seconds.unwrap_or(DEFAULT_LOGIN_WINDOW_SECS);
    let window_seconds = non_zero_u32(window_seconds_val, "login.window_seconds")?;

    Ok(LoginSettings {
        max_attempts,
        window_seconds,
    })
}

fn build_session_settings(session: RawSessionSettings) -> Result<SessionSettings, LoadError> {
    let ttl_seconds = session.ttl_seconds.unwrap_or(DEFAULT_SESSION_TTL_SECS);
    if ttl_seconds == 0 {
        return Err(LoadError::invalid(
            "session.ttl_seconds",
            "must be greater than zero",
        ));
    }
    Ok(SessionSettings {
        ttl: Duration::from_secs(ttl_seconds),
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    admin_host: Option<String>,
    public_port: Option<u16>,
    admin_port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawStoreSettings {
    path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawContentSettings {
    sheet_endpoint: Option<String>,
    spreadsheet_id: Option<String>,
    api_key: Option<String>,
    sheet_name: Option<String>,
    column_span: Option<String>,
    timeout_seconds: Option<u64>,
    fresh_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawContactSettings {
    relay_url: Option<String>,
    access_key: Option<String>,
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRateLimitSettings {
    window_seconds: Option<u64>,
    max_requests: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoginSettings {
    max_attempts: Option<u64>,
    window_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSessionSettings {
    ttl_seconds: Option<u64>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

fn trimmed_non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|raw| {
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
