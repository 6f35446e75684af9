//! CLI tests

use clap::{CommandFactory, Parser};

use crate::{Cli, Commands, ConfigAction, OutputFormat};

#[test]
fn test_cli_definition_is_valid() {
    Cli::command().debug_assert();
}

#[test]
fn test_parse_simulate() {
    let cli = Cli::try_parse_from([
        "hostpool",
        "simulate",
        "--backend",
        "a:10",
        "--backend",
        "b:200:0.5",
        "--requests",
        "20",
        "--seed",
        "4",
    ])
    .unwrap();

    match cli.command {
        Commands::Simulate {
            backends,
            requests,
            concurrency,
            seed,
        } => {
            assert_eq!(backends.len(), 2);
            assert_eq!(backends[1].failure_rate, 0.5);
            assert_eq!(requests, 20);
            assert_eq!(concurrency, 1);
            assert_eq!(seed, Some(4));
        }
        _ => panic!("expected simulate"),
    }
}

#[test]
fn test_simulate_requires_backend() {
    assert!(Cli::try_parse_from(["hostpool", "simulate"]).is_err());
    assert!(Cli::try_parse_from(["hostpool", "simulate", "--backend", "nope"]).is_err());
}

#[test]
fn test_parse_route_hosts_list() {
    let cli = Cli::try_parse_from(["hostpool", "route", "--hosts", "a:1,b:2", "--format", "json"])
        .unwrap();
    assert_eq!(cli.format, OutputFormat::Json);
    match cli.command {
        Commands::Route { hosts, path, .. } => {
            assert_eq!(hosts, vec!["a:1", "b:2"]);
            assert_eq!(path, "/");
        }
        _ => panic!("expected route"),
    }
}

#[test]
fn test_parse_config_set() {
    let cli = Cli::try_parse_from(["hostpool", "-q", "config", "set", "pool.seed", "9"]).unwrap();
    assert!(cli.quiet);
    assert!(matches!(
        cli.command,
        Commands::Config { action: ConfigAction::Set { ref key, ref value } } if key == "pool.seed" && value == "9"
    ));
}
