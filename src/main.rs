use std::{fs, process, sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use tokio::try_join;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

use vetrina::{
    application::{
        auth::{AdminAuthService, LoginRateLimiter},
        contact::ContactService,
        content::ContentService,
        error::AppError,
    },
    config,
    domain::entities::{ExperienceRecord, PostRecord},
    infra::{
        error::InfraError,
        http::{self, AdminState, ClientRateLimiter, PublicState},
        relay::FormRelayClient,
        sheets::SheetContentClient,
        store::{LocalStore, keys},
        telemetry,
    },
};

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
        .unwrap_or(config::Command::Serve(config::ServeArgs::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Export(args) => run_export(&settings, &args),
        config::Command::Import(args) => run_import(&settings, &args),
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let store = Arc::new(LocalStore::open(&settings.store.path)?);

    let sheet_client = SheetContentClient::new(&settings.content)
        .map_err(|err| AppError::unexpected(format!("failed to build sheet client: {err}")))?;
    let relay_client = FormRelayClient::new(&settings.contact)
        .map_err(|err| AppError::unexpected(format!("failed to build relay client: {err}")))?;

    let content = Arc::new(ContentService::new(
        store.clone(),
        Arc::new(sheet_client),
        settings.content.fresh_window,
    ));
    let contact = Arc::new(ContactService::new(Arc::new(relay_client)));

    let login_limiter = LoginRateLimiter::new(
        settings.login.max_attempts.get(),
        Duration::from_secs(settings.login.window_seconds.get().into()),
    );
    let auth = Arc::new(AdminAuthService::new(
        store.clone(),
        login_limiter,
        settings.session.ttl,
    ));

    let rate_limiter = Arc::new(ClientRateLimiter::new(
        Duration::from_secs(settings.rate_limit.window_seconds.get().into()),
        settings.rate_limit.max_requests.get(),
    ));

    let public_state = PublicState {
        content: content.clone(),
        contact,
        store,
        rate_limiter,
    };
    let admin_state = AdminState { auth, content };

    serve_http(&settings, public_state, admin_state).await
}

async fn serve_http(
    settings: &config::Settings,
    public_state: PublicState,
    admin_state: AdminState,
) -> Result<(), AppError> {
    let public_router = http::build_public_router(public_state);
    let admin_router = http::build_admin_router(admin_state);

    let public_listener = tokio::net::TcpListener::bind(settings.server.public_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    let admin_listener = tokio::net::TcpListener::bind(settings.server.admin_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "vetrina::serve",
        public = %settings.server.public_addr,
        admin = %settings.server.admin_addr,
        "listening"
    );

    let public_server = axum::serve(public_listener, public_router.into_make_service())
        .with_graceful_shutdown(shutdown_signal());
    let admin_server = axum::serve(admin_listener, admin_router.into_make_service())
        .with_graceful_shutdown(shutdown_signal());

    try_join!(public_server, admin_server)
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

/// Portable snapshot of the locally edited content lists.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ContentArchive {
    #[serde(default)]
    posts: Vec<PostRecord>,
    #[serde(default)]
    experience: Vec<ExperienceRecord>,
}

fn run_export(settings: &config::Settings, args: &config::ExportArgs) -> Result<(), AppError> {
    let store = LocalStore::open(&settings.store.path)?;
    let archive = ContentArchive {
        posts: store.get_json(keys::POSTS).unwrap_or_default(),
        experience: store.get_json(keys::EXPERIENCE).unwrap_or_default(),
    };

    let raw = toml::to_string_pretty(&archive)
        .map_err(|err| AppError::unexpected(format!("failed to encode archive: {err}")))?;
    fs::write(&args.file, raw).map_err(|err| AppError::from(InfraError::Io(err)))?;

    info!(
        target = "vetrina::export",
        file = %args.file.display(),
        posts = archive.posts.len(),
        experience = archive.experience.len(),
        "Exported content archive"
    );
    Ok(())
}

fn run_import(settings: &config::Settings, args: &config::ImportArgs) -> Result<(), AppError> {
    let raw = fs::read_to_string(&args.file).map_err(|err| AppError::from(InfraError::Io(err)))?;
    let archive: ContentArchive = toml::from_str(&raw)
        .map_err(|err| AppError::unexpected(format!("failed to parse archive: {err}")))?;

    let store = LocalStore::open(&settings.store.path)?;
    store.set_json(keys::POSTS, &archive.posts).map_err(AppError::from)?;
    store
        .set_json(keys::EXPERIENCE, &archive.experience)
        .map_err(AppError::from)?;

    info!(
        target = "vetrina::import",
        file = %args.file.display(),
        posts = archive.posts.len(),
        experience = archive.experience.len(),
        "Imported content archive"
    );
    Ok(())
}
