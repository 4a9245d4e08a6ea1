use super::*;

#[test]
fn defaults_match_documented_values() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
    assert_eq!(settings.pagination.page_size.get(), 10);
    assert!(settings.cache.enabled);
    assert_eq!(settings.cache.page_ttl_seconds.get(), 20);
    assert_eq!(settings.cache.max_entries.get(), 256);
    assert_eq!(settings.auth.login_path, "/auth/login/");
    assert_eq!(settings.auth.session_cookie, "yatube_session");
    assert!(settings.database.url.is_none());
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());
    raw.cache.page_ttl_seconds = Some(60);

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        cache_page_ttl_seconds: Some(5),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert_eq!(settings.cache.page_ttl_seconds.get(), 5);
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
fn zero_page_size_is_rejected() {
    let mut raw = RawSettings::default();
    raw.pagination.page_size = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero page size must fail");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "pagination.page_size",
            ..
        }
    ));
}

#[test]
fn zero_cache_ttl_is_rejected() {
    let mut raw = RawSettings::default();
    raw.cache.page_ttl_seconds = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero ttl must fail");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "cache.page_ttl_seconds",
            ..
        }
    ));
}

#[test]
fn relative_login_path_is_rejected() {
    let mut raw = RawSettings::default();
    raw.auth.login_path = Some("auth/login/".to_string());

    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn blank_database_url_is_treated_as_missing() {
    let mut raw = RawSettings::default();
    raw.database.url = Some("   ".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.database.url.is_none());
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["yatube"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "yatube",
        "serve",
        "--server-host",
        "0.0.0.0",
        "--database-url",
        "postgres://override",
        "--page-size",
        "5",
        "--cache-enabled",
        "false",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
            assert_eq!(
                serve.overrides.database_url.as_deref(),
                Some("postgres://override")
            );
            assert_eq!(serve.overrides.page_size, Some(5));
            assert_eq!(serve.overrides.cache_enabled, Some(false));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_groups_add_arguments() {
    let args = CliArgs::parse_from([
        "yatube",
        "groups",
        "add",
        "Test group",
        "--slug",
        "test_slug",
        "--description",
        "Group for tests",
        "--database-url",
        "postgres://example",
    ]);

    match args.command.expect("groups command") {
        Command::Groups(groups) => match groups.command {
            GroupsCommand::Add(add) => {
                assert_eq!(add.title, "Test group");
                assert_eq!(add.slug.as_deref(), Some("test_slug"));
                assert_eq!(add.description, "Group for tests");
                assert_eq!(
                    add.database.database_url.as_deref(),
                    Some("postgres://example")
                );
            }
        },
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_sessions_issue_arguments() {
    let args = CliArgs::parse_from(["yatube", "sessions", "issue", "leo", "--ttl-hours", "24"]);

    match args.command.expect("sessions command") {
        Command::Sessions(sessions) => match sessions.command {
            SessionsCommand::Issue(issue) => {
                assert_eq!(issue.username, "leo");
                assert_eq!(issue.ttl_hours, Some(24));
            }
            SessionsCommand::Revoke(_) => panic!("wrong subcommand parsed"),
        },
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn admin_commands_only_override_database_url() {
    let args = CliArgs::parse_from([
        "yatube",
        "users",
        "add",
        "leo",
        "--database-url",
        "postgres://admin",
    ]);
    let command = args.command.as_ref().expect("users command");
    let database = command.database_override().expect("database override");
    assert_eq!(database.database_url.as_deref(), Some("postgres://admin"));

    let mut raw = RawSettings::default();
    raw.apply_database_override(database);
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.database.url.as_deref(), Some("postgres://admin"));
}
