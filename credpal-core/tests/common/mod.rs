#![allow(dead_code)]

//! Common test utilities shared across integration tests.

use std::sync::{Arc, Once};

use credpal_core::fs::memory::{MemoryFat, MemoryProbe};
use credpal_core::{initialize_storage, CredentialStore, StoreConfig};

/// Routes `log` records from the crate under test to the test output.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("credpal_core=debug")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Boots `fat` with `config` and wraps it in a store.
pub fn boot_with(fat: MemoryFat, config: &StoreConfig) -> (CredentialStore<MemoryFat>, MemoryProbe) {
    init_tracing();
    let probe = fat.probe();
    let volume = initialize_storage(fat, config).expect("bootstrap");
    (CredentialStore::new(Arc::new(volume), config), probe)
}

/// Boots a fresh formatted volume with the default configuration.
pub fn booted_store() -> (CredentialStore<MemoryFat>, MemoryProbe) {
    boot_with(MemoryFat::new(), &StoreConfig::default())
}

/// Deterministic test payload of `len` bytes.
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}
