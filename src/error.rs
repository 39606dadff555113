use std::collections::TryReserveError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Keys must be between 1 and 64 bits wide.
    #[error("key width must be in 1..=64, got {0}")]
    InvalidKeyWidth(u32),
    #[error("splitter bits ({splitter_bits}) must be in 1..={total_bits}")]
    InvalidSplitterBits { splitter_bits: u32, total_bits: u32 },
    #[error("counting sort cannot address a bucket space of 2^{0}")]
    BucketSpaceTooLarge(u32),
    #[error("sub-index {id} does not exist (permutation has {len})")]
    UnknownSubIndex { id: usize, len: usize },
    #[error("invalid block layout: {0}")]
    InvalidBlocks(String),
    #[error("allocation failed: {0}")]
    Allocation(#[from] TryReserveError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt data: {0}")]
    CorruptData(&'static str),
}
