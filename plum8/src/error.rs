use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

/// Failures of host-facing operations
///
/// Programs stopping on their own (illegal opcodes, stack faults, ...) are reported through
/// [`Halt`](crate::machine::Halt) instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("program of {size} bytes does not fit into {max} bytes of program memory")]
    ProgramTooLarge { size: usize, max: usize },
    #[error("neither program nor snapshot provided")]
    MissingProgram,
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
    #[error("snapshot encoding failed")]
    Serde(#[from] serde_json::Error),
    #[error("unknown quirk `{0}`")]
    UnknownQuirk(String),
    #[error("malformed quirk entry `{0}`")]
    MalformedQuirk(String),
}
