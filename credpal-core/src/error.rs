use thiserror::Error;

use crate::fs::FatCode;

/// Result type for credential store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for entropy operations.
pub type EntropyResult<T> = Result<T, EntropyError>;

/// Unrecoverable failure to bring up the credential volume.
///
/// Dependent initialization (the PKCS#11 layer, the TLS stack) must not
/// proceed after this error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FatalError {
    /// The volume did not mount and could not be formatted.
    #[error("mount failed ({mount}) and format failed ({format})")]
    FormatFailed {
        /// Status of the initial mount.
        mount: FatCode,
        /// Status of the format attempt.
        format: FatCode,
    },
    /// The volume was formatted but did not mount afterwards.
    #[error("mount failed ({mount}), volume formatted, remount failed ({remount})")]
    RemountFailed {
        /// Status of the initial mount.
        mount: FatCode,
        /// Status of the post-format mount.
        remount: FatCode,
    },
}

/// Errors raised by the credential store.
///
/// Driver status codes are logged where they occur and are deliberately not
/// carried here: callers only learn which step failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The name does not belong to any allowlisted credential slot.
    #[error("'{name}' is not an allowlisted credential slot")]
    PolicyViolation {
        /// Name that was rejected.
        name: String,
    },
    /// The slot file could not be opened (missing or inaccessible).
    #[error("unable to open {file}")]
    OpenFailure {
        /// File that failed to open.
        file: &'static str,
    },
    /// Fewer bytes were written than requested, or the write reported an error.
    #[error("write to {file} failed: {written} of {requested} bytes written")]
    ShortWrite {
        /// File being written.
        file: &'static str,
        /// Bytes the driver accepted.
        written: usize,
        /// Bytes requested.
        requested: usize,
    },
    /// The file content could not be read in full.
    #[error("read from {file} failed: {read} of {expected} bytes read")]
    ShortRead {
        /// File being read.
        file: &'static str,
        /// Bytes the driver returned.
        read: usize,
        /// File size at open time.
        expected: usize,
    },
    /// Closing the file after a write failed, so the content may not be durable.
    #[error("closing {file} failed")]
    CloseFailure {
        /// File being closed.
        file: &'static str,
    },
    /// No memory was available for the read buffer.
    #[error("cannot allocate {requested} bytes ({available} available)")]
    AllocationFailure {
        /// Bytes requested.
        requested: usize,
        /// Bytes left in the heap budget at the time of the request.
        available: usize,
    },
    /// A buffer handed to `release` was not issued by this store.
    #[error("buffer was not issued by this store")]
    ForeignBuffer,
    /// The critical section could not be entered.
    #[error("critical section error: {0}")]
    Lock(String),
}

/// Coarse classification of a [`StoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Name rejected by the slot allowlist; no I/O happened.
    PolicyViolation,
    /// Open, read, write or close failed after the volume was mounted.
    Io,
    /// Memory exhaustion; retrying later may succeed.
    Allocation,
    /// Misuse of the store API or of its critical section.
    Contract,
}

impl StoreError {
    /// Returns the coarse category of the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::PolicyViolation { .. } => ErrorKind::PolicyViolation,
            Self::OpenFailure { .. }
            | Self::ShortWrite { .. }
            | Self::ShortRead { .. }
            | Self::CloseFailure { .. } => ErrorKind::Io,
            Self::AllocationFailure { .. } => ErrorKind::Allocation,
            Self::ForeignBuffer | Self::Lock(_) => ErrorKind::Contract,
        }
    }

    /// Returns `true` for device I/O failures.
    #[must_use]
    pub const fn is_io(&self) -> bool {
        matches!(self.kind(), ErrorKind::Io)
    }
}

/// Errors raised by the entropy adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntropyError {
    /// The underlying generator failed to produce a word.
    #[error("random generator failed: {0}")]
    Generator(String),
    /// A software generator was supplied without opting into the fallback.
    #[error("software random generator refused: enable the software fallback explicitly")]
    WeakSource,
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration document could not be parsed.
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
    /// The heap budget is zero, so no credential could ever be read.
    #[error("heap budget must be non-zero")]
    ZeroHeapBudget,
}
