//! FAT filesystem driver boundary.
//!
//! The credential store never talks to a block device directly. Everything
//! it needs from the filesystem is expressed by [`FatDriver`], a thin,
//! blocking mirror of the driver primitives: mount, format, open, size,
//! read, write and close.
//!
//! # Implementations
//!
//! - [`memory::MemoryFat`]: in-memory volume with fault injection and a
//!   call journal, used by the test suites.
//! - [`host::HostFat`]: a directory on the host standing in for a volume,
//!   used by the developer CLI.
//!
//! A firmware build provides its own implementation over the vendor driver.

pub mod host;
pub mod memory;
mod types;

pub use types::{
    FatCode, FatResult, FormatOptions, MountMode, OpenMode, PartitionRule, Transfer, VolumeId,
};

/// Blocking FAT driver primitives.
///
/// Implementations are not required to be safe for concurrent use; the
/// store serializes every call through a single critical section.
pub trait FatDriver: Send {
    /// Driver-specific open file object.
    type File: Send;

    /// Mounts `volume`.
    ///
    /// # Errors
    ///
    /// Returns the driver status when the volume cannot be mounted, e.g.
    /// [`FatCode::NoFilesystem`] for an unformatted medium.
    fn mount(&mut self, volume: &VolumeId, mode: MountMode) -> FatResult<()>;

    /// Creates a fresh, empty filesystem on `volume`, destroying its content.
    ///
    /// # Errors
    ///
    /// Returns the driver status when formatting fails.
    fn format(&mut self, volume: &VolumeId, options: &FormatOptions) -> FatResult<()>;

    /// Opens `path` at the root of the mounted volume.
    ///
    /// # Errors
    ///
    /// Returns the driver status, e.g. [`FatCode::NoFile`] when reading a
    /// file that does not exist.
    fn open(&mut self, path: &str, mode: OpenMode) -> FatResult<Self::File>;

    /// Size of the file in bytes as of open time.
    fn size(&self, file: &Self::File) -> u64;

    /// Reads up to `buf.len()` bytes from the current position.
    fn read(&mut self, file: &mut Self::File, buf: &mut [u8]) -> Transfer;

    /// Writes `data` at the current position.
    fn write(&mut self, file: &mut Self::File, data: &[u8]) -> Transfer;

    /// Closes the file, flushing any cached data.
    ///
    /// # Errors
    ///
    /// Returns the driver status when the flush fails.
    fn close(&mut self, file: Self::File) -> FatResult<()>;
}
