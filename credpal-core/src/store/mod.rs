//! Credential store.
//!
//! Saves and reads the allowlisted credential blobs on the mounted volume.
//! Every operation:
//!
//! 1. resolves the requested name to a [`CredentialSlot`], rejecting any
//!    other name before the device is touched;
//! 2. enters the volume's critical section;
//! 3. opens the slot file, transfers the whole blob and closes the file,
//!    closing it on the error paths as well.
//!
//! There is no transactional guarantee across a power loss: a failed save
//! leaves the slot file closed with indeterminate content.

mod buffer;
mod file;
mod slot;

use std::sync::Arc;

pub use buffer::{CredentialBuffer, HeapBudget};
pub use slot::{CredentialSlot, CERTIFICATE_FILE_NAME, KEY_FILE_NAME};

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::fs::{FatDriver, OpenMode};
use crate::volume::MountedVolume;
use file::OpenFile;

/// Credential store over a mounted volume.
///
/// The store is `Sync` whenever the driver is `Send`; share it between
/// tasks behind an [`Arc`].
#[derive(Debug)]
pub struct CredentialStore<D> {
    volume: Arc<MountedVolume<D>>,
    heap: Arc<HeapBudget>,
}

impl<D: FatDriver> CredentialStore<D> {
    /// Creates a store with a fresh heap budget sized by `config.heap_budget`.
    #[must_use]
    pub fn new(volume: Arc<MountedVolume<D>>, config: &StoreConfig) -> Self {
        Self::with_heap(volume, HeapBudget::new(config.heap_budget))
    }

    /// Creates a store drawing read buffers from `heap`.
    #[must_use]
    pub const fn with_heap(volume: Arc<MountedVolume<D>>, heap: Arc<HeapBudget>) -> Self {
        Self { volume, heap }
    }

    /// Heap budget backing read buffers.
    #[must_use]
    pub const fn heap(&self) -> &Arc<HeapBudget> {
        &self.heap
    }

    /// Volume the store operates on.
    #[must_use]
    pub fn volume(&self) -> &MountedVolume<D> {
        &self.volume
    }

    /// Writes `data` as the full content of the slot named by `name`.
    ///
    /// # Errors
    ///
    /// - [`StoreError::PolicyViolation`] if `name` is not allowlisted;
    /// - [`StoreError::OpenFailure`] if the slot file cannot be created;
    /// - [`StoreError::ShortWrite`] if the driver accepts fewer bytes than
    ///   requested or reports a write error;
    /// - [`StoreError::CloseFailure`] if the final flush fails.
    pub fn save(&self, name: &str, data: &[u8]) -> StoreResult<()> {
        let file_name = slot_file(name, "save")?;

        let mut driver = self.volume.section().enter()?;
        let mut file = OpenFile::open(&mut *driver, file_name, OpenMode::CreateAlways)
            .map_err(|code| {
                log::error!(
                    "unable to open {file_name} for writing ({code}, code {})",
                    code.code()
                );
                StoreError::OpenFailure { file: file_name }
            })?;

        let transfer = file.write(data);
        if !transfer.is_complete(data.len()) {
            match transfer.status {
                Err(code) => log::error!(
                    "write to {file_name} failed after {} of {} bytes ({code}, code {})",
                    transfer.count,
                    data.len(),
                    code.code()
                ),
                Ok(()) => log::error!(
                    "write to {file_name} failed: {} of {} bytes written",
                    transfer.count,
                    data.len()
                ),
            }
            return Err(StoreError::ShortWrite {
                file: file_name,
                written: transfer.count,
                requested: data.len(),
            });
        }

        file.close().map_err(|code| {
            log::error!("closing {file_name} failed ({code}, code {})", code.code());
            StoreError::CloseFailure { file: file_name }
        })?;
        log::debug!("saved {} bytes to {file_name}", data.len());
        Ok(())
    }

    /// Reads the full content of the slot named by `name`.
    ///
    /// The returned buffer is exactly as long as the file was at open time.
    /// Hand it back with [`CredentialStore::release`] once done.
    ///
    /// # Errors
    ///
    /// - [`StoreError::PolicyViolation`] if `name` is not allowlisted;
    /// - [`StoreError::OpenFailure`] if the slot file is missing or inaccessible;
    /// - [`StoreError::AllocationFailure`] if the heap budget cannot hold the file;
    /// - [`StoreError::ShortRead`] if the content cannot be read in full.
    pub fn read(&self, name: &str) -> StoreResult<CredentialBuffer> {
        let file_name = slot_file(name, "read")?;

        let mut driver = self.volume.section().enter()?;
        let mut file = OpenFile::open(&mut *driver, file_name, OpenMode::Read).map_err(|code| {
            log::error!(
                "unable to open {file_name} for reading ({code}, code {})",
                code.code()
            );
            StoreError::OpenFailure { file: file_name }
        })?;

        let size = file.size();
        let mut buffer = usize::try_from(size)
            .map_err(|_| StoreError::AllocationFailure {
                requested: usize::MAX,
                available: self.heap.available(),
            })
            .and_then(|len| self.heap.allocate(len))
            .inspect_err(|err| {
                log::error!("buffer for {file_name} ({size} bytes) not allocated: {err}");
            })?;

        let expected = buffer.len();
        let transfer = file.read(buffer.as_mut_slice());
        if !transfer.is_complete(expected) {
            match transfer.status {
                Err(code) => log::error!(
                    "read from {file_name} failed after {} of {expected} bytes ({code}, code {})",
                    transfer.count,
                    code.code()
                ),
                Ok(()) => log::error!(
                    "read from {file_name} failed: {} of {expected} bytes read",
                    transfer.count
                ),
            }
            return Err(StoreError::ShortRead {
                file: file_name,
                read: transfer.count,
                expected,
            });
        }

        if let Err(code) = file.close() {
            log::warn!(
                "closing {file_name} after a complete read failed ({code}, code {})",
                code.code()
            );
        }
        log::debug!("read {expected} bytes from {file_name}");
        Ok(buffer)
    }

    /// Returns a buffer obtained from [`CredentialStore::read`].
    ///
    /// The buffer is consumed, so it cannot be released twice. Its bytes are
    /// zeroized and its lease goes back to the heap it came from.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ForeignBuffer`] if the buffer was issued by a
    /// different store. The buffer is freed to its own heap regardless.
    pub fn release(&self, buffer: CredentialBuffer) -> StoreResult<()> {
        if !buffer.is_leased_from(&self.heap) {
            log::error!(
                "release of a {} byte buffer not issued by this store",
                buffer.len()
            );
            return Err(StoreError::ForeignBuffer);
        }
        log::debug!("released {} byte credential buffer", buffer.len());
        drop(buffer);
        Ok(())
    }
}

/// Resolves `name` to its slot's file, logging names that are redirected.
fn slot_file(name: &str, op: &str) -> StoreResult<&'static str> {
    let slot = CredentialSlot::resolve(name).inspect_err(|_| {
        log::debug!("did not {op} '{name}': not an allowlisted credential slot");
    })?;
    let file_name = slot.file_name();
    if name != file_name {
        log::warn!("'{name}' is served by the {slot} slot; {op} targets {file_name}");
    }
    Ok(file_name)
}
