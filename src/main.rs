use std::{process, sync::Arc};

use tokio::{signal, sync::watch, try_join};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;
use yatube::{
    application::{
        accounts::{AccountService, SignupForm, SignupOutcome},
        error::AppError,
        feed::FeedService,
        follows::FollowService,
        groups::{CreateGroupCommand, GroupService},
        pagination::Paginator,
        posts::PostService,
        repos::RepositorySet,
    },
    cache::{PageCache, PageCacheConfig},
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, AdminState, HttpState, SessionCookie},
        telemetry,
        uploads::MediaStorage,
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
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Groups(args) => run_groups(settings, args.command).await,
        config::Command::Users(args) => run_users(settings, args.command).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let (http_state, admin_state) = build_states(repositories, &settings)?;
    serve_http(&settings, http_state, admin_state).await
}

async fn run_groups(
    settings: config::Settings,
    command: config::GroupsCommand,
) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let groups = GroupService::new(repositories.groups);

    match command {
        config::GroupsCommand::Create(args) => {
            let group = groups
                .create(CreateGroupCommand {
                    title: args.title,
                    slug: args.slug,
                    description: args.description,
                })
                .await?;
            println!("{}\t{}", group.slug, group.title);
        }
        config::GroupsCommand::List => {
            for group in groups.list().await? {
                println!("{}\t{}", group.slug, group.title);
            }
        }
    }

    Ok(())
}

async fn run_users(
    settings: config::Settings,
    command: config::UsersCommand,
) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let accounts = account_service(&repositories, &settings)?;

    match command {
        config::UsersCommand::Create(args) => {
            let form = SignupForm {
                username: args.username,
                first_name: args.first_name,
                last_name: args.last_name,
                email: args.email,
                password1: args.password.clone(),
                password2: args.password,
            };
            match accounts.create_user(form).await? {
                SignupOutcome::Created(user) => {
                    println!("{}\t{}", user.id, user.username);
                    Ok(())
                }
                SignupOutcome::Invalid(errors) => {
                    let message = errors
                        .iter()
                        .map(|(field, message)| format!("{field}: {message}"))
                        .collect::<Vec<_>>()
                        .join("; ");
                    Err(AppError::validation(message))
                }
            }
        }
    }
}

async fn init_repositories(settings: &config::Settings) -> Result<RepositorySet, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool =
        PostgresRepositories::connect(database_url, settings.database.max_connections.get())
            .await
            .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    info!(
        target = "yatube::startup",
        max_connections = settings.database.max_connections.get(),
        "database ready"
    );

    Ok(RepositorySet::from_shared(Arc::new(
        PostgresRepositories::new(pool),
    )))
}

fn account_service(
    repositories: &RepositorySet,
    settings: &config::Settings,
) -> Result<AccountService, AppError> {
    let session_ttl = time::Duration::try_from(settings.auth.session_ttl)
        .map_err(|err| AppError::unexpected(format!("session ttl out of range: {err}")))?;
    Ok(AccountService::new(
        repositories.users.clone(),
        repositories.sessions.clone(),
        session_ttl,
    ))
}

fn build_states(
    repositories: RepositorySet,
    settings: &config::Settings,
) -> Result<(HttpState, AdminState), AppError> {
    let paginator = Paginator::new(settings.pagination.page_size);
    let feed = FeedService::new(
        repositories.posts.clone(),
        repositories.groups.clone(),
        repositories.users.clone(),
        repositories.follows.clone(),
        paginator,
    );
    let posts = PostService::new(
        repositories.posts.clone(),
        repositories.groups.clone(),
        repositories.comments.clone(),
    );
    let follows = FollowService::new(repositories.follows.clone(), repositories.users.clone());
    let accounts = account_service(&repositories, settings)?;

    let media = MediaStorage::new(settings.media.directory.clone())
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    let page_cache = settings
        .cache
        .enabled
        .then(|| Arc::new(PageCache::new(PageCacheConfig::from(&settings.cache))));

    let body_limit_bytes = usize::try_from(settings.media.max_request_bytes.get())
        .map_err(|_| AppError::validation("media.max_request_bytes does not fit in memory"))?;

    let http_state = HttpState {
        feed: Arc::new(feed),
        posts: Arc::new(posts),
        follows: Arc::new(follows),
        accounts: Arc::new(accounts),
        health: repositories.health.clone(),
        media: Arc::new(media),
        page_cache: page_cache.clone(),
        session_cookie: SessionCookie {
            name: settings.auth.session_cookie.clone(),
            secure: settings.auth.secure_cookies,
        },
        body_limit_bytes,
    };

    let admin_state = AdminState {
        health: repositories.health,
        page_cache,
    };

    Ok((http_state, admin_state))
}

async fn serve_http(
    settings: &config::Settings,
    http_state: HttpState,
    admin_state: AdminState,
) -> Result<(), AppError> {
    let public_router = http::build_router(http_state);
    let admin_router = http::build_admin_router(admin_state);

    let public_listener = tokio::net::TcpListener::bind(settings.server.public_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    let admin_listener = tokio::net::TcpListener::bind(settings.server.admin_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "yatube::startup",
        public_addr = %settings.server.public_addr,
        admin_addr = %settings.server.admin_addr,
        "listening"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let public_server = axum::serve(public_listener, public_router.into_make_service())
        .with_graceful_shutdown(wait_for_shutdown(shutdown_rx.clone()));
    let admin_server = axum::serve(admin_listener, admin_router.into_make_service())
        .with_graceful_shutdown(wait_for_shutdown(shutdown_rx));

    try_join!(public_server, admin_server)
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    info!(target = "yatube::shutdown", "listeners stopped");
    Ok(())
}

async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(target = "yatube::shutdown", error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(target = "yatube::shutdown", error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!(target = "yatube::shutdown", "received Ctrl+C"),
        _ = terminate => info!(target = "yatube::shutdown", "received SIGTERM"),
    }
}
