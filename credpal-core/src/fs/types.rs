//! Value types shared by every FAT driver implementation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Status codes reported by the FAT driver.
///
/// The discriminants match the numeric result codes of the driver so that
/// log lines can be correlated with driver-side traces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[repr(u8)]
pub enum FatCode {
    /// A hard error occurred in the low level disk I/O layer.
    #[error("disk error")]
    DiskError = 1,
    /// Assertion failed inside the driver.
    #[error("internal error")]
    InternalError = 2,
    /// The physical drive cannot work.
    #[error("drive not ready")]
    NotReady = 3,
    /// Could not find the file.
    #[error("no such file")]
    NoFile = 4,
    /// Could not find the path.
    #[error("no such path")]
    NoPath = 5,
    /// The path name format is invalid.
    #[error("invalid name")]
    InvalidName = 6,
    /// Access denied, or the directory is full.
    #[error("access denied")]
    Denied = 7,
    /// The object already exists.
    #[error("already exists")]
    Exist = 8,
    /// The file or directory object is invalid.
    #[error("invalid object")]
    InvalidObject = 9,
    /// The physical drive is write protected.
    #[error("write protected")]
    WriteProtected = 10,
    /// The logical drive number is invalid.
    #[error("invalid drive")]
    InvalidDrive = 11,
    /// The volume has no work area.
    #[error("volume not enabled")]
    NotEnabled = 12,
    /// There is no valid FAT volume.
    #[error("no filesystem")]
    NoFilesystem = 13,
    /// Formatting was aborted.
    #[error("mkfs aborted")]
    MkfsAborted = 14,
    /// Could not get a grant to access the volume in time.
    #[error("timeout")]
    Timeout = 15,
    /// The operation is rejected by the file sharing policy.
    #[error("locked")]
    Locked = 16,
    /// The driver could not allocate a working buffer.
    #[error("not enough core")]
    NotEnoughCore = 17,
    /// Too many files are open at once.
    #[error("too many open files")]
    TooManyOpenFiles = 18,
    /// A parameter is invalid.
    #[error("invalid parameter")]
    InvalidParameter = 19,
}

impl FatCode {
    /// Returns the numeric driver code.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }
}

/// Result of a single driver primitive.
pub type FatResult<T> = Result<T, FatCode>;

/// Outcome of a read or write: bytes moved plus the driver status.
///
/// A driver can report a partial transfer with a success status (a full
/// volume on write, end of file on read), so the count and the status must
/// both be checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    /// Number of bytes actually transferred.
    pub count: usize,
    /// Driver status for the call.
    pub status: FatResult<()>,
}

impl Transfer {
    /// A transfer that completed with a success status.
    #[must_use]
    pub const fn ok(count: usize) -> Self {
        Self {
            count,
            status: Ok(()),
        }
    }

    /// A transfer that stopped with a driver error after `count` bytes.
    #[must_use]
    pub const fn failed(count: usize, code: FatCode) -> Self {
        Self {
            count,
            status: Err(code),
        }
    }

    /// Returns `true` when exactly `expected` bytes moved without error.
    #[must_use]
    pub const fn is_complete(&self, expected: usize) -> bool {
        self.status.is_ok() && self.count == expected
    }
}

/// Logical drive identifier, e.g. `0:/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VolumeId(String);

impl VolumeId {
    /// Creates a volume identifier from a drive string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the drive string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for VolumeId {
    fn default() -> Self {
        Self::new("0:/")
    }
}

impl fmt::Display for VolumeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How eagerly a mount touches the medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MountMode {
    /// Probe the medium and validate the filesystem now.
    Immediate,
    /// Register the work area only; the medium is probed on first access.
    Deferred,
}

/// Mode a file is opened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpenMode {
    /// Open an existing file for reading.
    Read,
    /// Create the file, truncating any existing content, and open it for writing.
    CreateAlways,
}

/// Partitioning rule applied when formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionRule {
    /// Create a partition table and a single partition.
    #[default]
    Fdisk,
    /// Place the filesystem directly on the medium without a partition table.
    SuperFloppy,
}

/// Parameters passed to the driver's format primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FormatOptions {
    /// Partitioning rule.
    pub partition: PartitionRule,
    /// Allocation unit size in bytes; `0` lets the driver choose.
    pub allocation_unit: u32,
}
