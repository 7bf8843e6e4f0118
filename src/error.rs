use thiserror::Error;

/// Fatal conditions surfaced by the interpreter. Non-fatal anomalies (unknown opcodes) only go to
/// the log.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Chip8Error {
    #[error("program is too large ({size} bytes), max size is {max_size} bytes")]
    ProgramTooLarge { size: usize, max_size: usize },

    #[error("program counter {pc:#06X} is out of memory bounds")]
    PcOutOfBounds { pc: u16 },

    #[error("memory access out of bounds at address {address:#06X}")]
    MemoryOutOfBounds { address: usize },

    #[error("stack overflow: too many nested CALLs")]
    StackOverflow,

    #[error("stack underflow: RET without CALL")]
    StackUnderflow,

    #[error("key index {0} is out of range (0-15)")]
    InvalidKey(usize),
}
