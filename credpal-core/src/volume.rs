//! Volume bootstrap.
//!
//! Brings the credential volume up once per boot:
//!
//! ```text
//! Unmounted -> MountAttempted -> Mounted
//!                            \-> FormatAttempted -> Mounted
//!                                                \-> FatalFailure
//! ```
//!
//! Formatting is destructive and only happens after the immediate mount has
//! failed; a volume that mounts is never touched. There is no fallback after
//! a failed format or a failed post-format mount.

use strum::Display;

use crate::config::StoreConfig;
use crate::error::FatalError;
use crate::fs::{FatDriver, FormatOptions, MountMode, VolumeId};
use crate::lock::CriticalSection;

/// Step of the bootstrap state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum BootState {
    /// Nothing attempted yet.
    Unmounted,
    /// Immediate mount in progress.
    MountAttempted,
    /// Mount failed; format and deferred remount in progress.
    FormatAttempted,
    /// The volume is usable.
    Mounted,
    /// Recovery exhausted.
    FatalFailure,
}

/// Runs the bootstrap state machine over an owned driver.
#[derive(Debug)]
pub struct Bootstrapper<D> {
    driver: D,
    volume: VolumeId,
    format: FormatOptions,
    state: BootState,
    trail: Vec<BootState>,
}

impl<D: FatDriver> Bootstrapper<D> {
    /// Prepares a bootstrap of `config.volume` over `driver`.
    pub fn new(driver: D, config: &StoreConfig) -> Self {
        Self {
            driver,
            volume: config.volume.clone(),
            format: config.format,
            state: BootState::Unmounted,
            trail: vec![BootState::Unmounted],
        }
    }

    /// Current state.
    pub const fn state(&self) -> BootState {
        self.state
    }

    fn advance(&mut self, next: BootState) {
        log::debug!("volume {}: {} -> {next}", self.volume, self.state);
        self.state = next;
        self.trail.push(next);
    }

    /// Mounts the volume, formatting and remounting it if the first mount fails.
    ///
    /// # Errors
    ///
    /// Returns a [`FatalError`] when the format or the post-format mount
    /// fails. The credential subsystem is unusable afterwards.
    pub fn run(mut self) -> Result<MountedVolume<D>, FatalError> {
        self.advance(BootState::MountAttempted);
        let mount = match self.driver.mount(&self.volume, MountMode::Immediate) {
            Ok(()) => return Ok(self.finish(false)),
            Err(code) => code,
        };
        log::warn!(
            "failed to mount FAT volume {} ({mount}, code {}); formatting",
            self.volume,
            mount.code()
        );

        self.advance(BootState::FormatAttempted);
        if let Err(format) = self.driver.format(&self.volume, &self.format) {
            log::error!(
                "failed to format FAT volume {} ({format}, code {})",
                self.volume,
                format.code()
            );
            self.advance(BootState::FatalFailure);
            return Err(FatalError::FormatFailed { mount, format });
        }

        if let Err(remount) = self.driver.mount(&self.volume, MountMode::Deferred) {
            log::error!(
                "failed to mount FAT volume {} after format ({remount}, code {})",
                self.volume,
                remount.code()
            );
            self.advance(BootState::FatalFailure);
            return Err(FatalError::RemountFailed { mount, remount });
        }

        Ok(self.finish(true))
    }

    fn finish(mut self, formatted: bool) -> MountedVolume<D> {
        self.advance(BootState::Mounted);
        log::info!("file system initialization successful on {}", self.volume);
        MountedVolume {
            section: CriticalSection::new(self.driver),
            volume: self.volume,
            formatted,
            trail: self.trail,
        }
    }
}

/// Brings up the credential volume.
///
/// This is the only way to obtain a [`MountedVolume`], so every credential
/// store operation is statically preceded by a successful bootstrap.
///
/// # Errors
///
/// Returns a [`FatalError`] when recovery by format and remount fails.
pub fn initialize_storage<D: FatDriver>(
    driver: D,
    config: &StoreConfig,
) -> Result<MountedVolume<D>, FatalError> {
    Bootstrapper::new(driver, config).run()
}

/// A mounted volume, with its driver placed under the critical section.
#[derive(Debug)]
pub struct MountedVolume<D> {
    section: CriticalSection<D>,
    volume: VolumeId,
    formatted: bool,
    trail: Vec<BootState>,
}

impl<D> MountedVolume<D> {
    /// Logical drive that was mounted.
    #[must_use]
    pub const fn volume(&self) -> &VolumeId {
        &self.volume
    }

    /// Returns `true` if bootstrap had to format the volume, i.e. any
    /// previously stored credentials are gone.
    #[must_use]
    pub const fn was_formatted(&self) -> bool {
        self.formatted
    }

    /// States visited during bootstrap, starting with [`BootState::Unmounted`].
    #[must_use]
    pub fn boot_trail(&self) -> &[BootState] {
        &self.trail
    }

    pub(crate) const fn section(&self) -> &CriticalSection<D> {
        &self.section
    }
}
