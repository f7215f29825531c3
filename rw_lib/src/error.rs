use std::io::ErrorKind;

use thiserror::Error;

/// Errors while reading a [Clump](crate::clump::Clump) from a file or bytes.
#[derive(Debug, Error)]
pub enum ReadFileError {
    #[error("expected chunk not found at offset {pos}, found {found}")]
    StructuralMismatch { pos: u64, found: String },

    #[error("unexpected end of stream: {0}")]
    TruncatedStream(std::io::Error),

    #[error("failed to allocate memory: {0}")]
    Allocation(std::io::Error),

    #[error("error reading file: {0}")]
    Io(std::io::Error),

    #[error("error reading data: {0}")]
    Binrw(binrw::Error),
}

impl From<std::io::Error> for ReadFileError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            ErrorKind::UnexpectedEof => Self::TruncatedStream(e),
            ErrorKind::OutOfMemory => Self::Allocation(e),
            _ => Self::Io(e),
        }
    }
}

impl From<binrw::Error> for ReadFileError {
    fn from(e: binrw::Error) -> Self {
        match e {
            binrw::Error::BadMagic { pos, found } => Self::StructuralMismatch {
                pos,
                found: format!("{found:?}"),
            },
            binrw::Error::Io(e) => e.into(),
            // Derived readers add context to the underlying error.
            binrw::Error::Backtrace(backtrace) => (*backtrace.error).into(),
            e => Self::Binrw(e),
        }
    }
}
