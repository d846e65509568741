use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the quire binary.
#[derive(Debug, Parser)]
#[command(name = "quire", version, about = "Quire article reader")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "QUIRE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP reader.
    Serve(Box<ServeArgs>),
    /// Render a local Markdown file and print the result.
    Render(RenderArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub render: RenderOverrides,

    /// Markdown file to render; frontmatter is honoured.
    #[arg(value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub path: PathBuf,

    /// Print the whole rendered document as JSON instead of bare HTML.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub json: bool,

    /// Skip the sanitisation stage.
    #[arg(long = "no-sanitize", action = clap::ArgAction::SetTrue)]
    pub no_sanitize: bool,
}

#[derive(Debug, Args, Default, Clone)]
pub struct RenderOverrides {
    /// Override the syntect theme used for light mode.
    #[arg(long = "render-light-theme", value_name = "THEME")]
    pub light_theme: Option<String>,

    /// Override the syntect theme used for dark mode.
    #[arg(long = "render-dark-theme", value_name = "THEME")]
    pub dark_theme: Option<String>,

    /// Override how long copy buttons show their success state.
    #[arg(long = "render-copy-toggle-ms", value_name = "MILLIS")]
    pub copy_toggle_ms: Option<u64>,

    /// Override the public site URL used to tell internal links from external ones.
    #[arg(long = "render-public-site-url", value_name = "URL")]
    pub public_site_url: Option<String>,

    /// Derive a table of contents from h2/h3 headings when the article has none.
    #[arg(
        long = "render-derive-toc",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub derive_toc_from_headings: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub render: RenderOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Include diagnostic details in error payloads.
    #[arg(
        long = "server-expose-error-details",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub expose_error_details: Option<bool>,

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

    /// Override the content backend base URL.
    #[arg(long = "content-source-url", value_name = "URL")]
    pub content_source_url: Option<String>,

    /// Override the content backend request timeout.
    #[arg(long = "content-source-timeout-seconds", value_name = "SECONDS")]
    pub content_source_timeout_seconds: Option<u64>,
}
