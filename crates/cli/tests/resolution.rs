//! Flag-level tests driving command selection, connection settings and input
//! resolution through the real resolvers. Nothing here needs a node or a
//! compiler binary: the precedence and capacity checks fire first.

use anyhow::Result;
use argus_cli::commands::{self, CommandKind};
use argus_cli::input::{self, InputKind};
use argus_cli::{connection, Args, Config};
use argus_core::{indexed_address, ContractSource};
use argus_utils::errors::LoadError;
use clap::Parser;
use std::path::PathBuf;

fn parse(argv: &[&str]) -> Args {
    Args::parse_from(argv)
}

fn test_config() -> Config {
    Config {
        db_dir: PathBuf::from("/tmp/argus-test-db"),
        solc: "solc".to_string(),
        home: PathBuf::from("/tmp"),
    }
}

#[test]
fn command_precedence_is_fixed() {
    let args = parse(&["argus", "-d", "-t", "--xrefs"]);
    assert_eq!(CommandKind::select(&args), CommandKind::Disassemble);

    let args = parse(&["argus", "--hash", "f()", "-d"]);
    assert_eq!(CommandKind::select(&args), CommandKind::Hash("f()".into()));

    let args = parse(&["argus", "-s", "bal>0", "--hash", "f()"]);
    assert_eq!(CommandKind::select(&args), CommandKind::Search("bal>0".into()));

    // Graph wins when both state-space modes are given.
    let args = parse(&["argus", "-g", "out.html", "-x"]);
    assert_eq!(
        CommandKind::select(&args),
        CommandKind::Graph("out.html".into())
    );

    let args = parse(&["argus"]);
    assert_eq!(CommandKind::select(&args), CommandKind::Help);
}

#[tokio::test]
async fn inline_code_beats_address_and_needs_no_connection() -> Result<()> {
    let args = parse(&[
        "argus",
        "-d",
        "-c",
        "0x00",
        "-a",
        "0xdeadbeefdeadbeefdeadbeefdeadbeefdeadbeef",
    ]);
    let input = InputKind::select(&args)?;
    assert!(!input.needs_connection());
    assert!(!connection::needs_connection(
        &input,
        &CommandKind::select(&args),
        args.dynld
    ));

    let contracts = input::resolve(input, None, &test_config()).await?;
    assert_eq!(contracts.len(), 1);
    assert_eq!(contracts[0].name, "MAIN");
    assert_eq!(contracts[0].address, indexed_address(0));
    assert_eq!(contracts[0].code, vec![0x00]);
    Ok(())
}

#[test]
fn missing_input_is_reported() {
    let args = parse(&["argus", "-d"]);
    assert!(matches!(
        InputKind::select(&args),
        Err(LoadError::NoInput)
    ));
}

#[test]
fn address_input_needs_a_connection() {
    let args = parse(&["argus", "-d", "-a", "0x0"]);
    let input = InputKind::select(&args).unwrap();
    assert!(connection::needs_connection(
        &input,
        &CommandKind::Disassemble,
        false
    ));
}

#[test]
fn dynld_needs_a_connection_only_for_state_space_modes() {
    let input = InputKind::Code("0x00".into());
    assert!(connection::needs_connection(
        &input,
        &CommandKind::FireLasers,
        true
    ));
    assert!(connection::needs_connection(
        &input,
        &CommandKind::Graph("out.html".into()),
        true
    ));
    assert!(!connection::needs_connection(
        &input,
        &CommandKind::Trace,
        true
    ));
    assert!(!connection::needs_connection(
        &input,
        &CommandKind::FireLasers,
        false
    ));
}

#[tokio::test]
async fn capacity_violation_fires_before_compilation() {
    let mut argv: Vec<String> = vec!["argus".into(), "-d".into()];
    for i in 0..17 {
        argv.push(format!("contract{i}.sol"));
    }
    let args = Args::parse_from(&argv);
    let input = InputKind::select(&args).unwrap();

    // A compiler binary that cannot exist: resolution must fail on the
    // capacity check, never by reaching the compiler.
    let config = Config {
        solc: "/nonexistent/solc".to_string(),
        ..test_config()
    };
    let err = input::resolve(input, None, &config).await.unwrap_err();
    assert!(matches!(
        err,
        LoadError::TooManySources { max: 16, given: 17 }
    ));
}

#[test]
fn preset_overrides_raw_host_flags() {
    let args = parse(&[
        "argus",
        "--infura-mainnet",
        "--rpchost",
        "1.2.3.4",
        "--rpcport",
        "9",
        "-a",
        "0x0",
        "-d",
    ]);
    let settings = connection::rpc_settings(&args);
    assert_eq!(settings.host, "mainnet.infura.io");
    assert_eq!(settings.port, 443);
    assert!(settings.tls);
}

#[test]
fn raw_host_flags_apply_without_preset() {
    let args = parse(&["argus", "--rpchost", "1.2.3.4", "--rpcport", "9", "-d"]);
    let settings = connection::rpc_settings(&args);
    assert_eq!(settings.host, "1.2.3.4");
    assert_eq!(settings.port, 9);
    assert!(!settings.tls);

    let args = parse(&["argus", "-d"]);
    assert_eq!(connection::rpc_settings(&args).url(), "http://localhost:8545");
}

#[tokio::test]
async fn graph_write_failure_is_reported_not_fatal() -> Result<()> {
    let contracts = vec![ContractSource::new("MAIN", indexed_address(0), vec![0x00])];
    commands::graph::run(
        &contracts,
        None,
        false,
        false,
        "/definitely/not/writable/out.html",
    )
    .await?;
    Ok(())
}

#[tokio::test]
async fn graph_document_lands_on_disk() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let out = dir.path().join("out.html");
    let contracts = vec![ContractSource::new(
        "MAIN",
        indexed_address(0),
        hex::decode("600160020100")?,
    )];
    commands::graph::run(&contracts, None, false, true, out.to_str().unwrap()).await?;

    let document = std::fs::read_to_string(&out)?;
    assert!(document.contains("vis.Network"));
    assert!(document.contains("enabled: true"));
    Ok(())
}
