//! Command-line surface.
//!
//! The analysis modes are mutually exclusive flags, not subcommands; when
//! several are given, a fixed precedence decides (see
//! [`crate::commands::CommandKind`]).

use clap::Parser;

/// argus: EVM smart contract security analyzer.
#[derive(Parser, Debug)]
#[command(name = "argus")]
#[command(about = "argus: EVM smart contract security analyzer")]
pub struct Args {
    /// Solidity source files to compile and analyze, in order
    #[arg(value_name = "SOLIDITY_FILE")]
    pub solidity_files: Vec<String>,

    /// Print disassembly of the input contract
    #[arg(short = 'd', long)]
    pub disassemble: bool,

    /// Write a state-space graph document to FILE
    #[arg(short = 'g', long, value_name = "FILE")]
    pub graph: Option<String>,

    /// Run the vulnerability detection suite on the input contracts
    #[arg(short = 'x', long = "fire-lasers")]
    pub fire_lasers: bool,

    /// Concretely execute the input contract, printing one line per step
    #[arg(short = 't', long)]
    pub trace: bool,

    /// Search the contract database
    #[arg(short = 's', long, value_name = "EXPR")]
    pub search: Option<String>,

    /// Print cross-references of the input contract, one per line
    #[arg(long)]
    pub xrefs: bool,

    /// Print the 4-byte hash of a function signature
    #[arg(long, value_name = "SIGNATURE")]
    pub hash: Option<String>,

    /// Synchronize the contract database against a node
    #[arg(long = "init-db")]
    pub init_db: bool,

    /// Bytecode to analyze, as a hex string
    #[arg(short = 'c', long, value_name = "BYTECODE")]
    pub code: Option<String>,

    /// On-chain address of the contract to analyze
    #[arg(short = 'a', long, value_name = "ADDRESS")]
    pub address: Option<String>,

    /// Resolve on-chain dependencies during state-space construction
    #[arg(short = 'l', long)]
    pub dynld: bool,

    /// Transaction calldata for --trace, as a hex string
    #[arg(long, value_name = "CALLDATA")]
    pub data: Option<String>,

    /// RPC host (ignored when a preset or --ipc is given)
    #[arg(long, value_name = "HOST")]
    pub rpchost: Option<String>,

    /// RPC port (ignored when a preset or --ipc is given)
    #[arg(long, value_name = "PORT")]
    pub rpcport: Option<u16>,

    /// Use TLS for the RPC connection
    #[arg(long)]
    pub rpctls: bool,

    /// Connect through the local node's IPC socket
    #[arg(long)]
    pub ipc: bool,

    /// Use the Infura mainnet endpoint
    #[arg(long = "infura-mainnet")]
    pub infura_mainnet: bool,

    /// Use the Infura rinkeby endpoint
    #[arg(long = "infura-rinkeby")]
    pub infura_rinkeby: bool,

    /// Use the Infura kovan endpoint
    #[arg(long = "infura-kovan")]
    pub infura_kovan: bool,

    /// Use the Infura ropsten endpoint
    #[arg(long = "infura-ropsten")]
    pub infura_ropsten: bool,

    /// Include zero-balance contracts during --init-db
    #[arg(long = "sync-all")]
    pub sync_all: bool,

    /// Enable physics in the rendered graph
    #[arg(long = "enable-physics")]
    pub enable_physics: bool,

    /// Log verbosity: 0 = silent, 1 = info, 2 = debug (out of range: ignored)
    #[arg(short = 'v', value_name = "LEVEL")]
    pub verbosity: Option<u8>,
}
