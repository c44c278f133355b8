//! Entropy source adapter.
//!
//! Adapts a word-at-a-time platform generator to the byte-buffer contract of
//! the cryptographic stack: fill `len` bytes, report `len` on success.
//!
//! Output is produced in [`WORD_BYTES`] chunks; a trailing partial chunk
//! uses the leading bytes of one more word. A word of all zeros is a
//! legitimate generator output and is used as-is, but it is logged and
//! recorded as an [`EntropyAnomaly`]: from a software generator under load
//! it usually means the generator was never seeded.
//!
//! The production source is a hardware (or operating system) generator. The
//! software generator is accepted only when
//! [`EntropyConfig::allow_software_fallback`] is set.

mod source;

use rand::RngCore;

pub use source::{OsWordSource, SoftwareWordSource, SourceKind, WordSource, WORD_BYTES};

use crate::config::EntropyConfig;
use crate::error::{EntropyError, EntropyResult};

/// Upper bound on anomalies kept for inspection; further ones are counted only.
pub const MAX_RECORDED_ANOMALIES: usize = 64;

/// An all-zero word observed in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntropyAnomaly {
    /// Byte offset of the word within the buffer being filled.
    pub offset: usize,
    /// Kind of source that produced it.
    pub kind: SourceKind,
}

/// Byte-oriented entropy over a [`WordSource`].
#[derive(Debug)]
pub struct EntropyAdapter<S> {
    source: S,
    anomalies: Vec<EntropyAnomaly>,
    zero_words: u64,
}

impl<S: WordSource> EntropyAdapter<S> {
    /// Wraps `source`.
    ///
    /// # Errors
    ///
    /// Returns [`EntropyError::WeakSource`] for a software source unless
    /// `config` allows the fallback.
    pub fn new(source: S, config: &EntropyConfig) -> EntropyResult<Self> {
        let kind = source.kind();
        if kind.is_weak() {
            if !config.allow_software_fallback {
                log::error!("refusing {kind} random generator as entropy source");
                return Err(EntropyError::WeakSource);
            }
            log::warn!(
                "entropy is served by a {kind} random generator; replace it with a hardware source"
            );
        }
        Ok(Self {
            source,
            anomalies: Vec::new(),
            zero_words: 0,
        })
    }

    /// Kind of the wrapped source.
    pub fn source_kind(&self) -> SourceKind {
        self.source.kind()
    }

    /// Fills `output` completely and returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns [`EntropyError::Generator`] if the source fails; `output` is
    /// then partially filled and must not be used.
    pub fn fill_random(&mut self, output: &mut [u8]) -> EntropyResult<usize> {
        for (index, chunk) in output.chunks_mut(WORD_BYTES).enumerate() {
            let word = self.source.next_word().inspect_err(|err| {
                log::error!("random generator failed at offset {}: {err}", index * WORD_BYTES);
            })?;
            if word == 0 {
                self.record_zero_word(index * WORD_BYTES);
            }
            chunk.copy_from_slice(&word.to_ne_bytes()[..chunk.len()]);
        }
        Ok(output.len())
    }

    fn record_zero_word(&mut self, offset: usize) {
        let kind = self.source.kind();
        if kind.is_weak() {
            log::error!("{kind} random generator returned 0 at offset {offset}; it may be unseeded");
        } else {
            log::warn!("{kind} random generator returned 0 at offset {offset}");
        }
        self.zero_words += 1;
        if self.anomalies.len() < MAX_RECORDED_ANOMALIES {
            self.anomalies.push(EntropyAnomaly { offset, kind });
        }
    }

    /// Total all-zero words seen since creation.
    pub const fn zero_words(&self) -> u64 {
        self.zero_words
    }

    /// Drains the recorded anomalies.
    pub fn take_anomalies(&mut self) -> Vec<EntropyAnomaly> {
        std::mem::take(&mut self.anomalies)
    }
}

impl<S: WordSource> RngCore for EntropyAdapter<S> {
    fn next_u32(&mut self) -> u32 {
        let mut bytes = [0u8; 4];
        self.fill_bytes(&mut bytes);
        u32::from_ne_bytes(bytes)
    }

    fn next_u64(&mut self) -> u64 {
        let mut bytes = [0u8; 8];
        self.fill_bytes(&mut bytes);
        u64::from_ne_bytes(bytes)
    }

    /// # Panics
    ///
    /// Panics if the source fails, like the other infallible `RngCore`
    /// entry points. Use `try_fill_bytes` to observe the failure.
    fn fill_bytes(&mut self, dest: &mut [u8]) {
        if let Err(err) = self.fill_random(dest) {
            panic!("entropy source failed: {err}");
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_random(dest).map(|_| ()).map_err(rand::Error::new)
    }
}
