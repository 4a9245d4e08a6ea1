use std::{future::IntoFuture, process, sync::Arc, time::Duration};

use tokio::sync::Notify;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;
use yatube::{
    application::{
        authoring::PostService,
        directory::{AddGroupCommand, DirectoryService, GroupCreation},
        error::AppError,
        follows::FollowService,
        pagination::Paginator,
        posts::PostQueryService,
        repos::{
            CommentsRepo, FollowsRepo, GroupsRepo, HealthProbe, PostsRepo, PostsWriteRepo,
            SessionsRepo, UsersRepo,
        },
        sessions::SessionService,
    },
    cache::{PageCache, PageCacheConfig, SystemClock},
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, HttpState},
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
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Users(args) => match args.command {
            config::UsersCommand::Add(add) => run_add_user(settings, add).await,
        },
        config::Command::Groups(args) => match args.command {
            config::GroupsCommand::Add(add) => run_add_group(settings, add).await,
        },
        config::Command::Sessions(args) => match args.command {
            config::SessionsCommand::Issue(issue) => run_issue_session(settings, issue).await,
            config::SessionsCommand::Revoke(revoke) => run_revoke_session(settings, revoke).await,
        },
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let http_state = build_http_state(repositories, &settings);
    serve_http(&settings, http_state).await
}

async fn run_add_user(
    settings: config::Settings,
    args: config::AddUserArgs,
) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let directory = build_directory(&repositories);

    let user = directory.add_user(&args.username).await?;
    info!(
        target = "yatube::cli",
        user_id = user.id,
        username = %user.username,
        "user created"
    );
    println!("{}\t{}", user.id, user.username);
    Ok(())
}

async fn run_add_group(
    settings: config::Settings,
    args: config::AddGroupArgs,
) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let directory = build_directory(&repositories);

    let outcome = directory
        .add_group(AddGroupCommand {
            title: args.title,
            slug: args.slug,
            description: args.description,
        })
        .await?;

    let status = match &outcome {
        GroupCreation::Created(_) => "created",
        GroupCreation::Existing(_) => "exists",
    };
    let group = outcome.group();
    info!(
        target = "yatube::cli",
        group_id = group.id,
        slug = %group.slug,
        status,
        "group add"
    );
    println!("{status}\t{}\t{}\t{}", group.id, group.slug, group.title);
    Ok(())
}

async fn run_issue_session(
    settings: config::Settings,
    args: config::IssueSessionArgs,
) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let sessions = build_sessions(&repositories);

    let ttl = args
        .ttl_hours
        .map(|hours| time::Duration::hours(i64::from(hours)));
    let issued = sessions.issue(&args.username, ttl).await?;

    info!(
        target = "yatube::cli",
        user_id = issued.user.id,
        prefix = %issued.record.prefix,
        "session issued"
    );
    println!("{}", issued.token);
    Ok(())
}

async fn run_revoke_session(
    settings: config::Settings,
    args: config::RevokeSessionArgs,
) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let sessions = build_sessions(&repositories);

    let record = sessions.revoke(&args.prefix).await?;
    info!(
        target = "yatube::cli",
        prefix = %record.prefix,
        "session revoked"
    );
    println!("revoked\t{}", record.prefix);
    Ok(())
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

fn build_directory(repositories: &Arc<PostgresRepositories>) -> DirectoryService {
    let users_repo: Arc<dyn UsersRepo> = repositories.clone();
    let groups_repo: Arc<dyn GroupsRepo> = repositories.clone();
    DirectoryService::new(users_repo, groups_repo)
}

fn build_sessions(repositories: &Arc<PostgresRepositories>) -> SessionService {
    let users_repo: Arc<dyn UsersRepo> = repositories.clone();
    let sessions_repo: Arc<dyn SessionsRepo> = repositories.clone();
    SessionService::new(users_repo, sessions_repo)
}

fn build_http_state(
    repositories: Arc<PostgresRepositories>,
    settings: &config::Settings,
) -> HttpState {
    let users_repo: Arc<dyn UsersRepo> = repositories.clone();
    let groups_repo: Arc<dyn GroupsRepo> = repositories.clone();
    let posts_repo: Arc<dyn PostsRepo> = repositories.clone();
    let posts_write_repo: Arc<dyn PostsWriteRepo> = repositories.clone();
    let comments_repo: Arc<dyn CommentsRepo> = repositories.clone();
    let follows_repo: Arc<dyn FollowsRepo> = repositories.clone();
    let health: Arc<dyn HealthProbe> = repositories.clone();

    let paginator = Paginator::new(settings.pagination.page_size);
    let posts = PostQueryService::new(
        users_repo.clone(),
        groups_repo.clone(),
        posts_repo.clone(),
        comments_repo.clone(),
        paginator,
    );
    let authoring = PostService::new(groups_repo, posts_repo, posts_write_repo, comments_repo);
    let follows = FollowService::new(users_repo, follows_repo);

    let cache_config = PageCacheConfig::from(&settings.cache);
    let page_cache = cache_config
        .enabled
        .then(|| Arc::new(PageCache::new(cache_config, Arc::new(SystemClock))));

    HttpState {
        posts: Arc::new(posts),
        authoring: Arc::new(authoring),
        follows: Arc::new(follows),
        sessions: Arc::new(build_sessions(&repositories)),
        health,
        page_cache,
        auth: settings.auth.clone(),
    }
}

async fn serve_http(settings: &config::Settings, http_state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(http_state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(target = "yatube::server", addr = %settings.server.addr, "listening");

    let shutdown = Arc::new(Notify::new());
    let server = axum::serve(listener, router.into_make_service()).with_graceful_shutdown({
        let shutdown = shutdown.clone();
        async move { shutdown.notified().await }
    });
    let mut server = tokio::spawn(server.into_future());

    tokio::select! {
        result = &mut server => return server_result(result),
        () = shutdown_signal() => {
            info!(target = "yatube::server", "shutdown requested; draining connections");
            shutdown.notify_one();
        }
    }

    drain(server, settings.server.graceful_shutdown).await
}

async fn drain(
    server: tokio::task::JoinHandle<std::io::Result<()>>,
    grace: Duration,
) -> Result<(), AppError> {
    match tokio::time::timeout(grace, server).await {
        Ok(result) => server_result(result),
        Err(_) => {
            warn!(
                target = "yatube::server",
                grace_seconds = grace.as_secs(),
                "graceful shutdown timed out"
            );
            Ok(())
        }
    }
}

fn server_result(
    result: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Result<(), AppError> {
    match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(AppError::from(InfraError::from(err))),
        Err(err) => Err(AppError::unexpected(format!("server task failed: {err}"))),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(target = "yatube::server", error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(target = "yatube::server", error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
