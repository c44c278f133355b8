//! Developer CLI for provisioning and inspecting a directory-backed credential volume.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use credpal_core::entropy::{OsWordSource, SoftwareWordSource};
use credpal_core::fs::host::HostFat;
use credpal_core::{
    initialize_storage, CredentialSlot, CredentialStore, EntropyAdapter, MountedVolume,
    StoreConfig, WordSource,
};
use eyre::{Result, WrapErr};
use tracing_subscriber::EnvFilter;

/// Top-level command-line options shared by every subcommand.
#[derive(Parser, Debug)]
#[command(
    name = "credpal",
    version,
    about = "Provision and inspect a directory-backed credential volume."
)]
struct Cli {
    /// Directory standing in for the FAT volume.
    #[arg(long, env = "CREDPAL_VOLUME")]
    volume: PathBuf,

    /// JSON configuration file; defaults apply when omitted.
    #[arg(long, env = "CREDPAL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Mount the volume, formatting it if it does not mount, and print the boot trail.
    Init,

    /// Store the content of a file in a credential slot.
    Save {
        /// Slot label (`certificate`, `key`) or file name, e.g. `FreeRTOS_P11_Key.dat`.
        name: String,
        /// File holding the credential bytes.
        input: PathBuf,
    },

    /// Read a credential slot.
    Read {
        /// Slot label (`certificate`, `key`) or file name.
        name: String,
        /// Write the raw bytes here instead of printing hex.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Draw random bytes from the entropy adapter.
    Random {
        /// Number of bytes.
        len: usize,
        /// Use the seeded software generator instead of the OS generator.
        #[arg(long)]
        allow_software: bool,
    },
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // Also installs the `log` bridge, which carries the core crate's records.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(path: Option<&Path>) -> Result<StoreConfig> {
    let Some(path) = path else {
        return Ok(StoreConfig::default());
    };
    let json = fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read configuration from {}", path.display()))?;
    StoreConfig::from_json(&json)
        .wrap_err_with(|| format!("invalid configuration in {}", path.display()))
}

fn boot(volume: &Path, config: &StoreConfig) -> Result<MountedVolume<HostFat>> {
    let mounted = initialize_storage(HostFat::new(volume), config)
        .wrap_err_with(|| format!("credential volume at {} is unusable", volume.display()))?;
    tracing::debug!(trail = ?mounted.boot_trail(), "bootstrap finished");
    Ok(mounted)
}

fn open_store(volume: &Path, config: &StoreConfig) -> Result<CredentialStore<HostFat>> {
    Ok(CredentialStore::new(Arc::new(boot(volume, config)?), config))
}

/// Expands a slot label to its file name; anything else goes to the store as typed.
fn slot_name(name: &str) -> &str {
    match name.parse::<CredentialSlot>() {
        Ok(slot) => slot.file_name(),
        Err(_) => name,
    }
}

fn run() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Init => {
            let mounted = boot(&cli.volume, &config)?;
            let trail: Vec<String> = mounted.boot_trail().iter().map(ToString::to_string).collect();
            println!("{}", trail.join(" -> "));
            if mounted.was_formatted() {
                println!("volume {} was formatted", mounted.volume());
            }
        }
        Commands::Save { name, input } => {
            let data = fs::read(&input)
                .wrap_err_with(|| format!("failed to read {}", input.display()))?;
            let store = open_store(&cli.volume, &config)?;
            store.save(slot_name(&name), &data)?;
            println!("saved {} bytes to {name}", data.len());
        }
        Commands::Read { name, out } => {
            let store = open_store(&cli.volume, &config)?;
            let buffer = store.read(slot_name(&name))?;
            match out {
                Some(path) => {
                    fs::write(&path, buffer.as_slice())
                        .wrap_err_with(|| format!("failed to write {}", path.display()))?;
                    println!("wrote {} bytes to {}", buffer.len(), path.display());
                }
                None => println!("{}", hex::encode(buffer.as_slice())),
            }
            store.release(buffer)?;
        }
        Commands::Random {
            len,
            allow_software,
        } => {
            if allow_software {
                let mut entropy = config.entropy;
                entropy.allow_software_fallback = true;
                let adapter = EntropyAdapter::new(SoftwareWordSource::from_os_seed(), &entropy)?;
                print_random(adapter, len)?;
            } else {
                let adapter = EntropyAdapter::new(OsWordSource, &config.entropy)?;
                print_random(adapter, len)?;
            }
        }
    }

    Ok(())
}

fn print_random<S: WordSource>(mut adapter: EntropyAdapter<S>, len: usize) -> Result<()> {
    let mut bytes = vec![0u8; len];
    let filled = adapter.fill_random(&mut bytes)?;
    println!("{}", hex::encode(&bytes[..filled]));
    for anomaly in adapter.take_anomalies() {
        eprintln!(
            "warning: {} source produced a zero word at offset {}",
            anomaly.kind, anomaly.offset
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_commands() {
        let cli = Cli::try_parse_from(["credpal", "--volume", "/tmp/vol", "read", "FreeRTOS_P11_Key.dat"])
            .expect("parse");
        assert!(matches!(cli.command, Commands::Read { out: None, .. }));

        let cli = Cli::try_parse_from(["credpal", "--volume", "v", "random", "16", "--allow-software"])
            .expect("parse");
        assert!(matches!(
            cli.command,
            Commands::Random {
                len: 16,
                allow_software: true
            }
        ));
    }

    #[test]
    fn test_save_then_read_through_host_volume() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = StoreConfig::default();
        let store = open_store(dir.path(), &config).expect("store");
        store.save("FreeRTOS_P11_Certificate.dat", b"cert").expect("save");
        drop(store);

        let store = open_store(dir.path(), &config).expect("reopen");
        assert!(!store.volume().was_formatted());
        let buffer = store.read("FreeRTOS_P11_Certificate.dat").expect("read");
        assert_eq!(buffer.as_slice(), b"cert");
    }

    #[test]
    fn test_slot_labels_expand_to_file_names() {
        assert_eq!(slot_name("key"), "FreeRTOS_P11_Key.dat");
        assert_eq!(slot_name("certificate"), "FreeRTOS_P11_Certificate.dat");
        assert_eq!(slot_name("seedfile.dat"), "seedfile.dat");
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(load_config(Some(&dir.path().join("absent.json"))).is_err());
        assert_eq!(load_config(None).expect("defaults"), StoreConfig::default());
    }
}
