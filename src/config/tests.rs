use super::*;

#[test]
fn defaults_are_valid() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
    assert_eq!(settings.content.markdown_path, DEFAULT_MARKDOWN_PATH);
    assert_eq!(settings.content.html_path, DEFAULT_HTML_PATH);
    assert_eq!(settings.content.theme, DEFAULT_THEME);
    assert_eq!(settings.render.timeout, Duration::from_secs(30));
    assert_eq!(settings.logging.level, LevelFilter::INFO);
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());
    raw.content.theme = Some("light".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        content: ContentOverrides {
            theme: Some("dark".to_string()),
            ..Default::default()
        },
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert_eq!(settings.content.theme, "dark");
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
fn logical_keys_must_stay_inside_content_root() {
    for bad in ["/etc/posts", "../posts", "posts/../../x", "   "] {
        let mut raw = RawSettings::default();
        raw.content.markdown_path = Some(bad.to_string());
        let err = Settings::from_raw(raw).expect_err("invalid key rejected");
        assert!(
            matches!(
                err,
                LoadError::Invalid {
                    key: "content.markdown_path",
                    ..
                }
            ),
            "`{bad}` should be rejected"
        );
    }
}

#[test]
fn trailing_slashes_are_trimmed_from_logical_keys() {
    let mut raw = RawSettings::default();
    raw.content.html_path = Some("public/posts/".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.content.html_path, "public/posts");
}

#[test]
fn current_dir_segments_are_removed_from_logical_keys() {
    let mut raw = RawSettings::default();
    raw.content.markdown_path = Some("./App_Data/./posts/markdown".to_string());
    raw.content.html_path = Some("App_Data//posts/html/.".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.content.markdown_path, "App_Data/posts/markdown");
    assert_eq!(settings.content.html_path, "App_Data/posts/html");

    let mut raw = RawSettings::default();
    raw.content.markdown_path = Some("./.".to_string());
    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "content.markdown_path",
            ..
        })
    ));
}

#[test]
fn markdown_and_html_roots_must_differ() {
    let mut raw = RawSettings::default();
    raw.content.markdown_path = Some("posts".to_string());
    raw.content.html_path = Some("./posts/".to_string());
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn zero_render_timeout_is_rejected() {
    let mut raw = RawSettings::default();
    raw.render.timeout_seconds = Some(0);
    let err = Settings::from_raw(raw).expect_err("zero timeout");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "render.timeout_seconds",
            ..
        }
    ));
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["folio"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_publish_arguments() {
    let args = CliArgs::parse_from([
        "folio",
        "publish",
        "--site",
        "http://127.0.0.1:3000",
        "--content-root",
        "/srv/site",
        "/tmp/post.md",
    ]);

    match args.command.expect("publish command") {
        Command::Publish(publish) => {
            assert_eq!(publish.site, "http://127.0.0.1:3000");
            assert_eq!(
                publish.content.root.as_deref(),
                Some(std::path::Path::new("/srv/site"))
            );
            assert_eq!(publish.file, std::path::Path::new("/tmp/post.md"));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "folio",
        "serve",
        "--server-host",
        "0.0.0.0",
        "--content-markdown-path",
        "data/md",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
            assert_eq!(
                serve.overrides.content.markdown_path.as_deref(),
                Some("data/md")
            );
        }
        _ => panic!("wrong command parsed"),
    }
}
