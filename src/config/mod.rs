//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{net::SocketAddr, num::NonZeroU32, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::application::render::{DEFAULT_COPY_TOGGLE_MS, DEFAULT_DARK_THEME, DEFAULT_LIGHT_THEME};

pub use cli::{CliArgs, Command, RenderArgs, RenderOverrides, ServeArgs, ServeOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "quire";
const ENV_PREFIX: &str = "QUIRE";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_CONTENT_SOURCE_URL: &str = "http://localhost:7080/api";
const DEFAULT_CONTENT_SOURCE_TIMEOUT_SECS: u64 = 30;

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub content_source: ContentSourceSettings,
    pub render: RenderSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
    /// Whether error payloads carry diagnostic details.
    pub expose_error_details: bool,
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
pub struct ContentSourceSettings {
    pub base_url: Url,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub light_theme: String,
    pub dark_theme: String,
    pub copy_toggle_ms: NonZeroU32,
    pub public_site_url: Option<Url>,
    pub sanitize: bool,
    pub derive_toc_from_headings: bool,
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

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_command(cli.command.as_ref());

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    content_source: RawContentSourceSettings,
    render: RawRenderSettings,
}

impl RawSettings {
    fn apply_command(&mut self, command: Option<&Command>) {
        match command {
            Some(Command::Serve(args)) => self.apply_serve_overrides(&args.overrides),
            Some(Command::Render(args)) => {
                self.apply_render_overrides(&args.render);
                if args.no_sanitize {
                    self.render.sanitize = Some(false);
                }
            }
            None => self.apply_serve_overrides(&ServeOverrides::default()),
        }
    }

    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(expose) = overrides.expose_error_details {
            self.server.expose_error_details = Some(expose);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.content_source_url.as_ref() {
            self.content_source.base_url = Some(url.clone());
        }
        if let Some(seconds) = overrides.content_source_timeout_seconds {
            self.content_source.timeout_seconds = Some(seconds);
        }

        self.apply_render_overrides(&overrides.render);
    }

    fn apply_render_overrides(&mut self, overrides: &RenderOverrides) {
        if let Some(theme) = overrides.light_theme.as_ref() {
            self.render.light_theme = Some(theme.clone());
        }
        if let Some(theme) = overrides.dark_theme.as_ref() {
            self.render.dark_theme = Some(theme.clone());
        }
        if let Some(ms) = overrides.copy_toggle_ms {
            self.render.copy_toggle_ms = Some(ms);
        }
        if let Some(url) = overrides.public_site_url.as_ref() {
            self.render.public_site_url = Some(url.clone());
        }
        if let Some(derive) = overrides.derive_toc_from_headings {
            self.render.derive_toc_from_headings = Some(derive);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            content_source,
            render,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            content_source: build_content_source_settings(content_source)?,
            render: build_render_settings(render)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

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
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
        expose_error_details: server
            .expose_error_details
            .unwrap_or(cfg!(debug_assertions)),
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

fn build_content_source_settings(
    source: RawContentSourceSettings,
) -> Result<ContentSourceSettings, LoadError> {
    let raw_url = source
        .base_url
        .unwrap_or_else(|| DEFAULT_CONTENT_SOURCE_URL.to_string());
    let base_url = parse_http_url(&raw_url, "content_source.base_url")?;

    let timeout_secs = source
        .timeout_seconds
        .unwrap_or(DEFAULT_CONTENT_SOURCE_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "content_source.timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ContentSourceSettings {
        base_url,
        timeout: Duration::from_secs(timeout_secs),
    })
}

fn build_render_settings(render: RawRenderSettings) -> Result<RenderSettings, LoadError> {
    let light_theme = non_empty(render.light_theme, DEFAULT_LIGHT_THEME, "render.light_theme")?;
    let dark_theme = non_empty(render.dark_theme, DEFAULT_DARK_THEME, "render.dark_theme")?;

    let copy_toggle_ms = non_zero_u32(
        render
            .copy_toggle_ms
            .unwrap_or(u64::from(DEFAULT_COPY_TOGGLE_MS)),
        "render.copy_toggle_ms",
    )?;

    let public_site_url = match render.public_site_url {
        Some(value) if !value.trim().is_empty() => {
            Some(parse_http_url(value.trim(), "render.public_site_url")?)
        }
        _ => None,
    };

    Ok(RenderSettings {
        light_theme,
        dark_theme,
        copy_toggle_ms,
        public_site_url,
        sanitize: render.sanitize.unwrap_or(true),
        derive_toc_from_headings: render.derive_toc_from_headings.unwrap_or(false),
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
    expose_error_details: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawContentSourceSettings {
    base_url: Option<String>,
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRenderSettings {
    light_theme: Option<String>,
    dark_theme: Option<String>,
    copy_toggle_ms: Option<u64>,
    public_site_url: Option<String>,
    sanitize: Option<bool>,
    derive_toc_from_headings: Option<bool>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn parse_http_url(value: &str, key: &'static str) -> Result<Url, LoadError> {
    let url = Url::parse(value).map_err(|err| LoadError::invalid(key, err.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(LoadError::invalid(
            key,
            format!("unsupported scheme `{other}`"),
        )),
    }
}

fn non_empty(
    value: Option<String>,
    default: &str,
    key: &'static str,
) -> Result<String, LoadError> {
    match value {
        Some(value) if value.trim().is_empty() => {
            Err(LoadError::invalid(key, "must not be empty"))
        }
        Some(value) => Ok(value.trim().to_string()),
        None => Ok(default.to_string()),
    }
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

#[cfg(test)]
mod tests;
