use std::{future::IntoFuture, process, sync::Arc};

use folio::{
    application::{
        error::AppError,
        publish::{PublicationConfig, PublicationService, PublishDeadline},
        render::{RenderService, render_service},
        repos::ContentStore,
    },
    config,
    domain::context::{HostEnvironment, RequestContext},
    infra::{
        error::InfraError,
        http::{self, HttpState},
        render_client::HttpRenderTransport,
        storage::FsContentStore,
        telemetry,
    },
};
use tokio::sync::Notify;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;
use url::Url;

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

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Publish(args) => run_publish(settings, args).await,
    }
}

fn build_publication_service(
    settings: &config::Settings,
) -> Result<Arc<PublicationService>, AppError> {
    let store: Arc<dyn ContentStore> = Arc::new(FsContentStore::new());
    let renderer: Arc<dyn RenderService> = render_service();
    let transport = HttpRenderTransport::new(settings.content.theme.clone(), settings.render.timeout)
        .map_err(|err| {
            AppError::from(InfraError::configuration(format!(
                "failed to build render client: {err}"
            )))
        })?;

    Ok(Arc::new(PublicationService::new(
        PublicationConfig::from(&settings.content),
        store,
        renderer,
        Arc::new(transport),
    )))
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let state = HttpState {
        publication: build_publication_service(&settings)?,
        renderer: render_service(),
        environment: Arc::new(HostEnvironment::new(settings.content.root.clone())),
        publish_timeout: settings.render.timeout,
    };
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "folio::serve",
        addr = %settings.server.addr,
        content_root = %settings.content.root.display(),
        "listening"
    );

    let shutdown = Arc::new(Notify::new());
    let drain = Arc::clone(&shutdown);
    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move { drain.notified().await })
        .into_future();
    let mut server = std::pin::pin!(server);

    tokio::select! {
        result = &mut server => {
            return result.map_err(|err| AppError::unexpected(format!("server error: {err}")));
        }
        signal = tokio::signal::ctrl_c() => {
            signal.map_err(|err| AppError::from(InfraError::from(err)))?;
            info!(target = "folio::serve", "shutdown requested, draining connections");
            shutdown.notify_one();
        }
    }

    tokio::time::timeout(settings.server.graceful_shutdown, server)
        .await
        .map_err(|_| AppError::unexpected("graceful shutdown timed out"))?
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))
}

async fn run_publish(
    settings: config::Settings,
    args: config::PublishArgs,
) -> Result<(), AppError> {
    let site = Url::parse(&args.site)
        .map_err(|err| AppError::validation(format!("invalid site URL `{}`: {err}", args.site)))?;
    let request = RequestContext::from_url(&site)?;
    let markdown = tokio::fs::read_to_string(&args.file)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    let service = build_publication_service(&settings)?;
    let environment = HostEnvironment::new(settings.content.root.clone());

    info!(
        target = "folio::publish",
        file = %args.file.display(),
        site = %site,
        "publishing post"
    );

    let paths = service
        .publish_post(
            &markdown,
            Some(&environment),
            Some(&request),
            PublishDeadline::after(settings.render.timeout),
        )
        .await?;

    let output = serde_json::to_string_pretty(&paths)
        .map_err(|err| AppError::unexpected(err.to_string()))?;
    println!("{output}");
    Ok(())
}
