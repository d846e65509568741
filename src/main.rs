use std::{process, sync::Arc, time::Duration};

use quire::{
    application::{
        article::ArticleService,
        error::AppError,
        render::{ContentPipeline, PipelineConfig, RenderService, RenderedDocument},
    },
    config,
    domain::article::RawContent,
    infra::{
        content_source::HttpContentSource,
        error::InfraError,
        http::{self, HttpState},
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

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
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    let pipeline = ContentPipeline::new(PipelineConfig::from(&settings.render))
        .map_err(|err| AppError::unexpected(format!("failed to build render pipeline: {err}")))?;
    let pipeline = Arc::new(pipeline);

    match command {
        config::Command::Serve(_) => run_serve(settings, pipeline).await,
        config::Command::Render(args) => run_render(&settings, &pipeline, args).await,
    }
}

async fn run_serve(
    settings: config::Settings,
    pipeline: Arc<ContentPipeline>,
) -> Result<(), AppError> {
    let source = HttpContentSource::new(
        &settings.content_source.base_url,
        settings.content_source.timeout,
    )?;
    info!(
        endpoint = %source.endpoint(),
        timeout_secs = settings.content_source.timeout.as_secs(),
        "Content source configured"
    );

    let articles = ArticleService::new(
        Arc::new(source),
        pipeline,
        settings.server.expose_error_details,
    );
    let router = http::build_router(HttpState::new(Arc::new(articles)));

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(addr = %settings.server.addr, "Listening");

    let grace = settings.server.graceful_shutdown;
    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal());

    tokio::select! {
        result = server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        () = shutdown_deadline(grace) => {
            warn!(grace_secs = grace.as_secs(), "Graceful shutdown timed out");
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Resolves `grace` after the shutdown signal, bounding connection draining.
async fn shutdown_deadline(grace: Duration) {
    shutdown_signal().await;
    tokio::time::sleep(grace).await;
}

async fn run_render(
    settings: &config::Settings,
    pipeline: &ContentPipeline,
    args: config::RenderArgs,
) -> Result<(), AppError> {
    let text = tokio::fs::read_to_string(&args.path)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    let slug = args
        .path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "article".to_string());
    let content = RawContent::new(slug, text);

    let result = if settings.render.sanitize {
        pipeline.render(&content)
    } else {
        pipeline.render_unsanitized(&content)
    };
    let document = RenderedDocument::from_result(result, true);

    if args.json {
        let json = serde_json::to_string_pretty(&document)
            .map_err(|err| AppError::unexpected(format!("failed to encode document: {err}")))?;
        println!("{json}");
        return Ok(());
    }

    match document {
        RenderedDocument::Rendered { html, .. } => {
            println!("{html}");
            Ok(())
        }
        RenderedDocument::Failed(error) => Err(AppError::unexpected(format!(
            "{}: {}",
            error.code,
            error.details.unwrap_or(error.message)
        ))),
    }
}
