//! CLI Command Tests
//!
//! Argument parsing, JSON output format, exit codes and command handlers
//! against a mocked media server.

// =============================================================================
// CLI Argument Parsing Tests
// =============================================================================

mod cli_parsing {
    use clap::Parser;
    use tvshows::cli::{Cli, Command, HostsAction};

    #[test]
    fn test_parts_command() {
        let cli = Cli::parse_from(["tvshows", "parts", "Star Plus", "Anupamaa", "Episode 512"]);
        match cli.command {
            Command::Parts(args) => {
                let episode = args.episode_ref();
                assert_eq!(episode.channel, "Star Plus");
                assert_eq!(episode.episode, "Episode 512");
            }
            _ => panic!("Expected Parts command"),
        }
    }

    #[test]
    fn test_aliases() {
        let cli = Cli::parse_from(["tvshows", "ep", "Star", "Show"]);
        assert!(matches!(cli.command, Command::Episodes(_)));

        let cli = Cli::parse_from(["tvshows", "n", "Star", "Show", "E4"]);
        assert!(matches!(cli.command, Command::Next(_)));

        let cli = Cli::parse_from(["tvshows", "w", "Star", "Show", "E4", "--autoplay"]);
        match cli.command {
            Command::Watch(cmd) => {
                assert!(cmd.autoplay);
                assert_eq!(cmd.part_index(), None);
            }
            _ => panic!("Expected Watch command"),
        }
    }

    #[test]
    fn test_hosts_advance() {
        let cli = Cli::parse_from(["tvshows", "--json", "hosts", "advance"]);
        assert!(cli.json);
        match cli.command {
            Command::Hosts(cmd) => assert_eq!(cmd.action, Some(HostsAction::Advance)),
            _ => panic!("Expected Hosts command"),
        }
    }

    #[test]
    fn test_missing_episode_is_invalid() {
        let err = Cli::try_parse_from(["tvshows", "parts", "Star", "Show"]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_config_path_flag() {
        let cli = Cli::parse_from(["tvshows", "-c", "/tmp/tv.toml", "home"]);
        assert_eq!(
            cli.config.as_deref(),
            Some(std::path::Path::new("/tmp/tv.toml"))
        );
    }
}

// =============================================================================
// JSON Output Tests
// =============================================================================

mod json_output {
    use tvshows::cli::{ExitCode, HostsStatus, JsonOutput, NextResponse};
    use tvshows::models::EpisodeRef;

    #[test]
    fn test_json_output_success() {
        let output = JsonOutput::success("test data");
        let json = serde_json::to_string(&output).unwrap();

        assert!(json.contains("\"data\":\"test data\""));
        assert!(!json.contains("error"));
        assert!(!json.contains("exit_code"));
    }

    #[test]
    fn test_json_output_error() {
        let output = JsonOutput::<()>::error_msg("All 2 hosts unreachable", ExitCode::NetworkError);
        let json = serde_json::to_string(&output).unwrap();

        assert!(json.contains("\"error\":\"All 2 hosts unreachable\""));
        assert!(json.contains("\"exit_code\":3"));
        assert!(!json.contains("\"data\""));
    }

    #[test]
    fn test_next_response_without_next() {
        let response = NextResponse {
            current: EpisodeRef::new("Star", "Show", "E1"),
            next: None,
            outcome: "oldest",
        };
        let json: serde_json::Value = serde_json::to_value(&response).unwrap();
        assert!(json["next"].is_null());
        assert_eq!(json["outcome"], "oldest");
        assert_eq!(json["current"]["episode"], "E1");
    }

    #[test]
    fn test_hosts_status_format() {
        let status = HostsStatus {
            hosts: vec!["a:3000".into(), "b:3000".into()],
            index: 1,
            current: "b:3000".into(),
        };
        let json = serde_json::to_string(&status).unwrap();
        assert_eq!(
            json,
            r#"{"hosts":["a:3000","b:3000"],"index":1,"current":"b:3000"}"#
        );
    }
}

// =============================================================================
// Output Helper Tests
// =============================================================================

mod output_helpers {
    use clap::Parser;
    use tvshows::cli::{Cli, ExitCode, Output};

    #[test]
    fn test_output_json_mode() {
        let cli = Cli::parse_from(["tvshows", "--json", "home"]);
        let output = Output::new(&cli);
        assert!(output.json);
    }

    #[test]
    fn test_output_quiet_mode() {
        let cli = Cli::parse_from(["tvshows", "--quiet", "home"]);
        let output = Output::new(&cli);
        assert!(output.quiet);
    }

    #[test]
    fn test_error_returns_code() {
        let output = Output {
            json: true,
            quiet: true,
        };
        assert_eq!(output.error("nope", ExitCode::EmptyResult), ExitCode::EmptyResult);
    }
}

// =============================================================================
// Command Handler Tests
// =============================================================================

mod handlers {
    use mockito::{Matcher, Server, ServerGuard};
    use std::sync::Arc;
    use tvshows::api::HostRegistry;
    use tvshows::cli::{EpisodeArgs, EpisodesCmd, ExitCode, Output};
    use tvshows::commands::{self, AppContext};
    use tvshows::config::Config;
    use tvshows::models::Host;

    fn quiet_json() -> Output {
        Output {
            json: true,
            quiet: true,
        }
    }

    fn context(hosts: Vec<Host>) -> AppContext {
        let registry = Arc::new(HostRegistry::in_memory(hosts).unwrap());
        AppContext::with_registry(Config::default(), registry)
    }

    fn server_context(server: &ServerGuard) -> AppContext {
        context(vec![Host::new(server.url())])
    }

    fn episode_args(episode: &str) -> EpisodeArgs {
        EpisodeArgs {
            channel: "Star".into(),
            show: "Show".into(),
            episode: episode.into(),
        }
    }

    #[tokio::test]
    async fn test_home_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/home")
            .with_status(200)
            .with_body(r#"{"Star":[{"title":"Show"}]}"#)
            .create_async()
            .await;

        let code = commands::home_cmd(&server_context(&server), &quiet_json()).await;

        mock.assert_async().await;
        assert_eq!(code, ExitCode::Success);
    }

    #[tokio::test]
    async fn test_unreachable_hosts_exit_with_network_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let ctx = context(vec![Host::new(format!("127.0.0.1:{}", port))]);
        let code = commands::home_cmd(&ctx, &quiet_json()).await;
        assert_eq!(code, ExitCode::NetworkError);
    }

    #[tokio::test]
    async fn test_http_error_exit_code() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/episodes/Star/Show")
            .match_query(Matcher::Any)
            .with_status(503)
            .with_body("busy")
            .create_async()
            .await;

        let cmd = EpisodesCmd {
            channel: "Star".into(),
            show: "Show".into(),
            all: false,
        };
        let code = commands::episodes_cmd(cmd, &server_context(&server), &quiet_json()).await;
        assert_eq!(code, ExitCode::HttpStatus);
    }

    #[tokio::test]
    async fn test_empty_parts_exit_code() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/episode/Star/Show/E1")
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let code =
            commands::parts_cmd(episode_args("E1"), &server_context(&server), &quiet_json()).await;
        assert_eq!(code, ExitCode::EmptyResult);
    }

    #[tokio::test]
    async fn test_next_command() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/episodes/Star/Show")
            .match_query(Matcher::UrlEncoded("load_more".into(), "false".into()))
            .with_status(200)
            .with_body(r#"{"episodes":["E5","E4","E3"],"has_more":false}"#)
            .create_async()
            .await;

        let code =
            commands::next_cmd(episode_args("E4"), &server_context(&server), &quiet_json()).await;
        assert_eq!(code, ExitCode::Success);
    }
}
