use thiserror::Error;

/// Errors raised while turning raw input into bytecode bytes.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("hex decode failed: {0}")]
    HexDecode(#[from] hex::FromHexError),

    #[error("could not read file '{path}': {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// RPC/IPC setup and transport failures. Every one of these is fatal for the
/// run; nothing in argus retries a connection.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("could not connect to IPC socket '{path}': {source}")]
    Ipc {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("RPC transport failure: {0}")]
    Transport(String),

    #[error("RPC error response: {0}")]
    Rpc(String),

    #[error("malformed RPC response: {0}")]
    Response(String),
}

/// Errors raised while resolving command-line input into contracts.
#[derive(Debug, Error)]
pub enum LoadError {
    /// None of --code, --address or a Solidity source file was given.
    #[error("no input bytecode (expected --code, --address or Solidity source files)")]
    NoInput,

    /// The indexed address space holds at most 16 locally supplied contracts.
    #[error("too many source files: at most {max} per run, got {given}")]
    TooManySources { max: usize, given: usize },

    #[error("could not invoke compiler '{binary}': {source}")]
    CompilerSpawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("compilation of '{path}' failed: {message}")]
    Compiler { path: String, message: String },

    #[error("no deployable contract found in '{path}'")]
    EmptyArtifact { path: String },

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

/// Errors raised by the concrete tracer.
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("stack underflow at pc={pc:#x} ({op})")]
    StackUnderflow { pc: usize, op: String },

    #[error("invalid jump target {target:#x} at pc={pc:#x}")]
    InvalidJump { pc: usize, target: usize },

    #[error("memory limit exceeded at pc={pc:#x}")]
    MemoryLimit { pc: usize },
}

/// Contract database failures, including malformed search expressions.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("syntax error in search expression: {0}")]
    Syntax(String),

    #[error("database error: {0}")]
    Storage(String),

    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

/// Top-level error surfaced by the argus binary. The binary prints the
/// message and exits; no variant carries a machine-readable code.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Trace(#[from] TraceError),

    #[error(transparent)]
    Db(#[from] DbError),
}
