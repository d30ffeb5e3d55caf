use std::{process, sync::Arc};

use axum::middleware;
use balera::{
    application::{error::AppError, events::EventService, repos::EventsRepo},
    cache::{CacheConfig, CacheState, PageCache, StaleMarker, page_cache_layer},
    config,
    infra::{
        db::{MemoryEventsRepo, PostgresEventsRepo},
        error::InfraError,
        http::{AdminState, PublicState, build_admin_router, build_public_router},
        telemetry,
    },
    revalidate::{ChangeNotifier, RevalidateState, RevalidationConfig, revalidate_router},
};
use tokio::try_join;
use tracing::{Dispatch, Level, debug, dispatcher, error, info, warn};
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

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repo = init_repo(&settings).await?;

    let cache_config = CacheConfig::from(&settings.cache);
    let pages = Arc::new(PageCache::new(&cache_config));

    let revalidation = RevalidationConfig::from(&settings.revalidation);
    let notifier = Arc::new(
        ChangeNotifier::from_config(&revalidation)
            .map_err(|err| AppError::unexpected(err.to_string()))?,
    );

    let events = Arc::new(EventService::new(repo, notifier));

    // Sweep expired cache entries so the freshness window holds even for
    // paths nobody requests.
    let sweeper_handle = if cache_config.enabled {
        let pages = pages.clone();
        let interval = cache_config.sweep_interval();
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // Skip the first immediate tick
            loop {
                ticker.tick().await;
                let purged = pages.purge_expired();
                if purged > 0 {
                    debug!(purged, "swept expired cache entries");
                }
            }
        }))
    } else {
        None
    };

    let result = serve_http(&settings, events, pages, cache_config).await;

    if let Some(handle) = sweeper_handle {
        handle.abort();
        let _ = handle.await;
    }

    result
}

async fn init_repo(settings: &config::Settings) -> Result<Arc<dyn EventsRepo>, AppError> {
    match settings.database.url.as_ref() {
        Some(url) => {
            let pool =
                PostgresEventsRepo::connect(url, settings.database.max_connections.get())
                    .await
                    .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

            PostgresEventsRepo::run_migrations(&pool)
                .await
                .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

            Ok(Arc::new(PostgresEventsRepo::new(pool)))
        }
        None => {
            warn!("database url not configured; using the in-memory record store");
            Ok(Arc::new(MemoryEventsRepo::new()))
        }
    }
}

async fn serve_http(
    settings: &config::Settings,
    events: Arc<EventService>,
    pages: Arc<PageCache>,
    cache_config: CacheConfig,
) -> Result<(), AppError> {
    let marker: Arc<dyn StaleMarker> = pages.clone();

    let public_router = build_public_router(PublicState {
        events: events.clone(),
    })
    .layer(middleware::from_fn_with_state(
        CacheState {
            config: cache_config,
            pages,
        },
        page_cache_layer,
    ))
    .merge(revalidate_router(RevalidateState::new(
        settings.revalidation.token.clone(),
        marker,
    )));

    let admin_router = build_admin_router(AdminState::new(events, settings.admin.token.clone()));

    let public_listener = tokio::net::TcpListener::bind(settings.server.public_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    let admin_listener = tokio::net::TcpListener::bind(settings.server.admin_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        public_addr = %settings.server.public_addr,
        admin_addr = %settings.server.admin_addr,
        revalidation_enabled = settings.revalidation.token.is_some(),
        "Balera listening"
    );

    let public_server = axum::serve(public_listener, public_router.into_make_service());
    let admin_server = axum::serve(admin_listener, admin_router.into_make_service());

    try_join!(public_server, admin_server)
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}
