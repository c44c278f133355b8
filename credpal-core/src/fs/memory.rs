//! In-memory FAT driver for testing.
//!
//! This driver is NOT backed by any medium. It exists so that the bootstrap
//! state machine and the credential store can be exercised against a driver
//! that fails on demand and records every call it receives.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use super::{FatCode, FatDriver, FatResult, FormatOptions, MountMode, OpenMode, Transfer, VolumeId};

// =============================================================================
// Fault plan
// =============================================================================

/// Faults the driver injects.
///
/// Mount and format faults are consumed by the call they fail; I/O faults
/// stay armed until the plan is replaced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FaultPlan {
    /// Fail the next immediate mount with this code.
    pub mount: Option<FatCode>,
    /// Fail the next format with this code.
    pub format: Option<FatCode>,
    /// Fail the next deferred mount with this code.
    pub remount: Option<FatCode>,
    /// Fail every open with this code.
    pub open: Option<FatCode>,
    /// Accept at most this many bytes per write, reporting success.
    pub short_write_at: Option<usize>,
    /// Fail every write with this code.
    pub write: Option<FatCode>,
    /// Fail every read with this code.
    pub read: Option<FatCode>,
    /// Make every read return zero bytes with a success status.
    pub empty_read: bool,
    /// Fail every close with this code.
    pub close: Option<FatCode>,
}

// =============================================================================
// Call journal
// =============================================================================

/// Driver primitive recorded in the journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverOp {
    /// `mount`
    Mount(MountMode),
    /// `format`
    Format,
    /// `open`
    Open(OpenMode),
    /// `read`
    Read,
    /// `write`
    Write,
    /// `close`
    Close,
}

impl DriverOp {
    /// Returns `true` for file-level primitives (open, read, write, close).
    #[must_use]
    pub const fn is_file_io(self) -> bool {
        matches!(self, Self::Open(_) | Self::Read | Self::Write | Self::Close)
    }
}

/// One journal entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverCall {
    /// Primitive invoked.
    pub op: DriverOp,
    /// File path for file-level primitives.
    pub path: Option<String>,
    /// Thread that issued the call.
    pub thread: ThreadId,
}

// =============================================================================
// Shared state
// =============================================================================

#[derive(Debug, Default)]
struct Shared {
    formatted: bool,
    mounted: bool,
    files: HashMap<String, Vec<u8>>,
    faults: FaultPlan,
    calls: Vec<DriverCall>,
    open_files: usize,
    format_calls: usize,
}

impl Shared {
    fn record(&mut self, op: DriverOp, path: Option<&str>) {
        self.calls.push(DriverCall {
            op,
            path: path.map(str::to_owned),
            thread: thread::current().id(),
        });
    }
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    // A panicking test thread must not hide the journal from the others.
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// Driver
// =============================================================================

/// In-memory volume.
#[derive(Debug)]
pub struct MemoryFat {
    shared: Arc<Mutex<Shared>>,
}

/// Open file on a [`MemoryFat`] volume.
#[derive(Debug)]
pub struct MemoryFile {
    path: String,
    mode: OpenMode,
    cursor: usize,
    size: u64,
}

impl MemoryFat {
    /// Creates a formatted, empty volume.
    #[must_use]
    pub fn new() -> Self {
        Self::with_state(true)
    }

    /// Creates a volume whose medium carries no filesystem yet.
    #[must_use]
    pub fn unformatted() -> Self {
        Self::with_state(false)
    }

    fn with_state(formatted: bool) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                formatted,
                ..Shared::default()
            })),
        }
    }

    /// Arms `faults` and returns the driver.
    #[must_use]
    pub fn with_faults(self, faults: FaultPlan) -> Self {
        lock(&self.shared).faults = faults;
        self
    }

    /// Pre-populates a file, as if written by an earlier boot.
    #[must_use]
    pub fn with_file(self, path: &str, bytes: &[u8]) -> Self {
        lock(&self.shared)
            .files
            .insert(path.to_owned(), bytes.to_vec());
        self
    }

    /// Returns a probe that observes this driver after it has been moved
    /// into a volume.
    #[must_use]
    pub fn probe(&self) -> MemoryProbe {
        MemoryProbe {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Default for MemoryFat {
    fn default() -> Self {
        Self::new()
    }
}

impl FatDriver for MemoryFat {
    type File = MemoryFile;

    fn mount(&mut self, _volume: &VolumeId, mode: MountMode) -> FatResult<()> {
        let mut state = lock(&self.shared);
        state.record(DriverOp::Mount(mode), None);
        match mode {
            MountMode::Immediate => {
                if let Some(code) = state.faults.mount.take() {
                    return Err(code);
                }
                if !state.formatted {
                    return Err(FatCode::NoFilesystem);
                }
            }
            MountMode::Deferred => {
                if let Some(code) = state.faults.remount.take() {
                    return Err(code);
                }
            }
        }
        state.mounted = true;
        Ok(())
    }

    fn format(&mut self, _volume: &VolumeId, _options: &FormatOptions) -> FatResult<()> {
        let mut state = lock(&self.shared);
        state.record(DriverOp::Format, None);
        state.format_calls += 1;
        if let Some(code) = state.faults.format.take() {
            return Err(code);
        }
        state.files.clear();
        state.formatted = true;
        state.mounted = false;
        Ok(())
    }

    fn open(&mut self, path: &str, mode: OpenMode) -> FatResult<MemoryFile> {
        let mut state = lock(&self.shared);
        state.record(DriverOp::Open(mode), Some(path));
        if !state.mounted {
            return Err(FatCode::NotEnabled);
        }
        if !state.formatted {
            return Err(FatCode::NoFilesystem);
        }
        if let Some(code) = state.faults.open {
            return Err(code);
        }
        let size = match mode {
            OpenMode::Read => state.files.get(path).ok_or(FatCode::NoFile)?.len(),
            OpenMode::CreateAlways => {
                state.files.insert(path.to_owned(), Vec::new());
                0
            }
        };
        state.open_files += 1;
        Ok(MemoryFile {
            path: path.to_owned(),
            mode,
            cursor: 0,
            size: size as u64,
        })
    }

    fn size(&self, file: &MemoryFile) -> u64 {
        file.size
    }

    fn read(&mut self, file: &mut MemoryFile, buf: &mut [u8]) -> Transfer {
        let mut state = lock(&self.shared);
        state.record(DriverOp::Read, Some(&file.path));
        if file.mode != OpenMode::Read {
            return Transfer::failed(0, FatCode::Denied);
        }
        if let Some(code) = state.faults.read {
            return Transfer::failed(0, code);
        }
        if state.faults.empty_read {
            return Transfer::ok(0);
        }
        let Some(content) = state.files.get(&file.path) else {
            return Transfer::failed(0, FatCode::InvalidObject);
        };
        let remaining = content.get(file.cursor..).unwrap_or_default();
        let count = remaining.len().min(buf.len());
        buf[..count].copy_from_slice(&remaining[..count]);
        file.cursor += count;
        Transfer::ok(count)
    }

    fn write(&mut self, file: &mut MemoryFile, data: &[u8]) -> Transfer {
        let mut state = lock(&self.shared);
        state.record(DriverOp::Write, Some(&file.path));
        if file.mode != OpenMode::CreateAlways {
            return Transfer::failed(0, FatCode::Denied);
        }
        if let Some(code) = state.faults.write {
            return Transfer::failed(0, code);
        }
        let count = state
            .faults
            .short_write_at
            .map_or(data.len(), |limit| limit.min(data.len()));
        let cursor = file.cursor;
        let Some(content) = state.files.get_mut(&file.path) else {
            return Transfer::failed(0, FatCode::InvalidObject);
        };
        content.truncate(cursor);
        content.extend_from_slice(&data[..count]);
        file.cursor += count;
        file.size = content.len() as u64;
        Transfer::ok(count)
    }

    fn close(&mut self, file: MemoryFile) -> FatResult<()> {
        let mut state = lock(&self.shared);
        state.record(DriverOp::Close, Some(&file.path));
        state.open_files = state.open_files.saturating_sub(1);
        state.faults.close.map_or(Ok(()), Err)
    }
}

// =============================================================================
// Probe
// =============================================================================

/// Observer handle for a [`MemoryFat`] volume.
#[derive(Debug, Clone)]
pub struct MemoryProbe {
    shared: Arc<Mutex<Shared>>,
}

impl MemoryProbe {
    /// Returns a copy of the call journal.
    #[must_use]
    pub fn calls(&self) -> Vec<DriverCall> {
        lock(&self.shared).calls.clone()
    }

    /// Returns the file-level calls only (open, read, write, close).
    #[must_use]
    pub fn file_calls(&self) -> Vec<DriverCall> {
        lock(&self.shared)
            .calls
            .iter()
            .filter(|call| call.op.is_file_io())
            .cloned()
            .collect()
    }

    /// Clears the call journal.
    pub fn clear_calls(&self) {
        lock(&self.shared).calls.clear();
    }

    /// Number of format calls received, successful or not.
    #[must_use]
    pub fn format_calls(&self) -> usize {
        lock(&self.shared).format_calls
    }

    /// Number of files currently open.
    #[must_use]
    pub fn open_files(&self) -> usize {
        lock(&self.shared).open_files
    }

    /// Returns the stored content of `path`.
    #[must_use]
    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        lock(&self.shared).files.get(path).cloned()
    }

    /// Returns the names of all stored files, sorted.
    #[must_use]
    pub fn file_names(&self) -> Vec<String> {
        let mut names: Vec<String> = lock(&self.shared).files.keys().cloned().collect();
        names.sort();
        names
    }

    /// Replaces the armed fault plan.
    pub fn set_faults(&self, faults: FaultPlan) {
        lock(&self.shared).faults = faults;
    }
}
