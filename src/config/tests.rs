use std::path::Path;

use super::*;

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn defaults_cover_every_section() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.addr.to_string(), "127.0.0.1:3000");
    assert_eq!(settings.server.graceful_shutdown, Duration::from_secs(30));
    assert_eq!(
        settings.server.expose_error_details,
        cfg!(debug_assertions)
    );
    assert!(matches!(settings.logging.format, LogFormat::Compact));
    assert_eq!(
        settings.content_source.base_url.as_str(),
        "http://localhost:7080/api"
    );
    assert_eq!(settings.content_source.timeout, Duration::from_secs(30));
    assert_eq!(settings.render.light_theme, "InspiredGitHub");
    assert_eq!(settings.render.dark_theme, "base16-ocean.dark");
    assert_eq!(settings.render.copy_toggle_ms.get(), 1200);
    assert!(settings.render.public_site_url.is_none());
    assert!(settings.render.sanitize);
    assert!(!settings.render.derive_toc_from_headings);
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn zero_values_are_rejected() {
    let mut raw = RawSettings::default();
    raw.render.copy_toggle_ms = Some(0);
    let err = Settings::from_raw(raw).expect_err("zero toggle");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "render.copy_toggle_ms",
            ..
        }
    ));

    let mut raw = RawSettings::default();
    raw.content_source.timeout_seconds = Some(0);
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn content_source_url_must_be_http() {
    let mut raw = RawSettings::default();
    raw.content_source.base_url = Some("ftp://backend.example".to_string());
    let err = Settings::from_raw(raw).expect_err("bad scheme");
    assert!(err.to_string().contains("content_source.base_url"));
}

#[test]
fn blank_public_site_url_is_treated_as_unset() {
    let mut raw = RawSettings::default();
    raw.render.public_site_url = Some("  ".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.render.public_site_url.is_none());
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["quire"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "quire",
        "serve",
        "--server-host",
        "0.0.0.0",
        "--content-source-url",
        "https://backend.example/api",
        "--render-public-site-url",
        "https://blog.example",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
            assert_eq!(
                serve.overrides.content_source_url.as_deref(),
                Some("https://backend.example/api")
            );
            assert_eq!(
                serve.overrides.render.public_site_url.as_deref(),
                Some("https://blog.example")
            );
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn render_command_can_disable_sanitisation() {
    let args = CliArgs::parse_from(["quire", "render", "--json", "--no-sanitize", "post.md"]);

    let mut raw = RawSettings::default();
    raw.apply_command(args.command.as_ref());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(!settings.render.sanitize);

    match args.command.expect("render command") {
        Command::Render(render) => {
            assert!(render.json);
            assert_eq!(render.path, Path::new("post.md"));
        }
        _ => panic!("wrong command parsed"),
    }
}
