//! Allowlisted credential slots.

use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::error::{StoreError, StoreResult};

/// File name of the device certificate.
pub const CERTIFICATE_FILE_NAME: &str = "FreeRTOS_P11_Certificate.dat";

/// File name of the device private key.
pub const KEY_FILE_NAME: &str = "FreeRTOS_P11_Key.dat";

/// A named object the store is allowed to persist.
///
/// This is the complete set: any other name is rejected before the device
/// is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum CredentialSlot {
    /// Device certificate.
    Certificate,
    /// Device private key.
    Key,
}

impl CredentialSlot {
    /// File holding this slot at the root of the volume.
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Certificate => CERTIFICATE_FILE_NAME,
            Self::Key => KEY_FILE_NAME,
        }
    }

    /// Maps a requested object name onto its slot.
    ///
    /// A name belongs to a slot when it starts with the slot's file name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::PolicyViolation`] when no slot matches.
    pub fn resolve(name: &str) -> StoreResult<Self> {
        Self::iter()
            .find(|slot| name.starts_with(slot.file_name()))
            .ok_or_else(|| StoreError::PolicyViolation {
                name: name.to_owned(),
            })
    }
}
