//! Random word sources.

use rand::rngs::{OsRng, StdRng};
use rand::{RngCore, SeedableRng};
use strum::Display;

use crate::error::{EntropyError, EntropyResult};

/// Width of one generator word in bytes; the adapter fills output in chunks
/// of this size.
pub const WORD_BYTES: usize = std::mem::size_of::<u32>();

/// Where a source's randomness comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum SourceKind {
    /// A hardware entropy source (TRNG).
    Hardware,
    /// The operating system CSPRNG.
    OperatingSystem,
    /// A seeded software pseudo-random generator.
    Software,
}

impl SourceKind {
    /// Returns `true` for sources that must not be relied upon for key
    /// generation without an explicit opt-in.
    #[must_use]
    pub const fn is_weak(self) -> bool {
        matches!(self, Self::Software)
    }
}

/// Platform random generator producing one word at a time.
pub trait WordSource: Send {
    /// Produces the next word.
    ///
    /// # Errors
    ///
    /// Returns [`EntropyError::Generator`] when the generator fails.
    fn next_word(&mut self) -> EntropyResult<u32>;

    /// Provenance of the words.
    fn kind(&self) -> SourceKind;
}

/// Words from the operating system CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsWordSource;

impl WordSource for OsWordSource {
    fn next_word(&mut self) -> EntropyResult<u32> {
        let mut word = [0u8; WORD_BYTES];
        OsRng
            .try_fill_bytes(&mut word)
            .map_err(|err| EntropyError::Generator(err.to_string()))?;
        Ok(u32::from_ne_bytes(word))
    }

    fn kind(&self) -> SourceKind {
        SourceKind::OperatingSystem
    }
}

/// Words from a seeded software generator.
///
/// **Known-weak fallback.** Its output is only as unpredictable as its seed;
/// a device without a hardware entropy source that relies on it can end up
/// generating predictable keys. The adapter refuses it unless the software
/// fallback is enabled in configuration.
#[derive(Debug, Clone)]
pub struct SoftwareWordSource {
    rng: StdRng,
}

impl SoftwareWordSource {
    /// Creates a generator with a fixed seed. Output is fully reproducible.
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Creates a generator seeded once from the operating system.
    #[must_use]
    pub fn from_os_seed() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl WordSource for SoftwareWordSource {
    fn next_word(&mut self) -> EntropyResult<u32> {
        Ok(self.rng.next_u32())
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Software
    }
}
