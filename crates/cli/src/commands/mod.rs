//! Command selection and dispatch.
//!
//! Exactly one analysis mode runs per invocation. Selection is computed once
//! into a [`CommandKind`] with a fixed precedence, so simultaneous flags
//! resolve deterministically instead of depending on scattered checks:
//! database operations first (they never touch connections or contracts),
//! then the signature hash, then the contract-consuming modes, graph before
//! lasers, and finally help when nothing was asked for.

pub mod db;
pub mod disassemble;
pub mod graph;
pub mod hash;
pub mod lasers;
pub mod trace;
pub mod xrefs;

use crate::args::Args;
use crate::config::Config;
use crate::{connection, input};
use argus_utils::errors::CliError;
use clap::CommandFactory;

/// The selected analysis mode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandKind {
    Search(String),
    InitDb,
    Hash(String),
    Disassemble,
    Trace,
    Xrefs,
    Graph(String),
    FireLasers,
    Help,
}

impl CommandKind {
    /// Fixed command precedence, first match wins.
    pub fn select(args: &Args) -> Self {
        if let Some(expr) = &args.search {
            return Self::Search(expr.clone());
        }
        if args.init_db {
            return Self::InitDb;
        }
        if let Some(signature) = &args.hash {
            return Self::Hash(signature.clone());
        }
        if args.disassemble {
            return Self::Disassemble;
        }
        if args.trace {
            return Self::Trace;
        }
        if args.xrefs {
            return Self::Xrefs;
        }
        if let Some(path) = &args.graph {
            return Self::Graph(path.clone());
        }
        if args.fire_lasers {
            return Self::FireLasers;
        }
        Self::Help
    }
}

/// Runs the selected command to completion.
pub async fn dispatch(args: &Args, config: &Config) -> Result<(), CliError> {
    match CommandKind::select(args) {
        // Database operations and the signature hash short-circuit before
        // any connection or contract resolution.
        CommandKind::Search(expr) => db::run_search(&expr, config),
        CommandKind::InitDb => db::run_init(args, config).await,
        CommandKind::Hash(signature) => {
            hash::run(&signature);
            Ok(())
        }
        CommandKind::Help => {
            let _ = Args::command().print_help();
            Ok(())
        }
        kind => {
            let input = input::InputKind::select(args)?;
            let client = if connection::needs_connection(&input, &kind, args.dynld) {
                Some(connection::resolve(args, config).await?)
            } else {
                None
            };
            let contracts = input::resolve(input, client.as_ref(), config).await?;

            match kind {
                CommandKind::Disassemble => {
                    disassemble::run(&contracts);
                    Ok(())
                }
                CommandKind::Trace => trace::run(&contracts, args.data.as_deref()),
                CommandKind::Xrefs => {
                    xrefs::run(&contracts);
                    Ok(())
                }
                CommandKind::Graph(path) => {
                    graph::run(
                        &contracts,
                        client.as_ref(),
                        args.dynld,
                        args.enable_physics,
                        &path,
                    )
                    .await
                }
                CommandKind::FireLasers => {
                    lasers::run(&contracts, client.as_ref(), args.dynld).await
                }
                _ => unreachable!("short-circuiting commands are handled above"),
            }
        }
    }
}
