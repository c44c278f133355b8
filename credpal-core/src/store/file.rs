//! Scoped open file.

use crate::fs::{FatCode, FatDriver, FatResult, OpenMode, Transfer};

/// An open file that is closed on every exit path.
///
/// The guard borrows the driver from the critical-section guard, so it can
/// neither outlive the section nor be held across two store operations.
/// [`OpenFile::close`] reports the close status; dropping the guard without
/// closing it closes the file and logs a failure.
pub(crate) struct OpenFile<'d, D: FatDriver> {
    driver: &'d mut D,
    file: Option<D::File>,
    name: &'static str,
}

impl<'d, D: FatDriver> OpenFile<'d, D> {
    pub(crate) fn open(driver: &'d mut D, name: &'static str, mode: OpenMode) -> FatResult<Self> {
        let file = driver.open(name, mode)?;
        Ok(Self {
            driver,
            file: Some(file),
            name,
        })
    }

    pub(crate) fn size(&self) -> u64 {
        self.file.as_ref().map_or(0, |file| self.driver.size(file))
    }

    pub(crate) fn read(&mut self, buf: &mut [u8]) -> Transfer {
        match self.file.as_mut() {
            Some(file) => self.driver.read(file, buf),
            None => Transfer::failed(0, FatCode::InvalidObject),
        }
    }

    pub(crate) fn write(&mut self, data: &[u8]) -> Transfer {
        match self.file.as_mut() {
            Some(file) => self.driver.write(file, data),
            None => Transfer::failed(0, FatCode::InvalidObject),
        }
    }

    pub(crate) fn close(mut self) -> FatResult<()> {
        self.file
            .take()
            .map_or(Err(FatCode::InvalidObject), |file| self.driver.close(file))
    }
}

impl<D: FatDriver> Drop for OpenFile<'_, D> {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            if let Err(code) = self.driver.close(file) {
                log::error!(
                    "closing {} on an error path failed ({code}, code {})",
                    self.name,
                    code.code()
                );
            }
        }
    }
}
