//! Host directory standing in for a FAT volume.
//!
//! The directory plays the role of the medium: it is "formatted" when it
//! carries the volume marker file, and credential files live directly in it.
//! Formatting a marked directory wipes its regular files before writing a
//! new marker, which mirrors the destructive semantics of a real format.
//! A directory without the marker is only formatted while it is empty; any
//! other directory is not ours to wipe and the format fails with
//! [`FatCode::Denied`].

use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use super::{FatCode, FatDriver, FatResult, FormatOptions, MountMode, OpenMode, Transfer, VolumeId};

/// Name of the marker file that makes a directory a formatted volume.
pub const VOLUME_MARKER: &str = ".credpal-volume";

/// Directory-backed FAT driver.
#[derive(Debug, Clone)]
pub struct HostFat {
    root: PathBuf,
    mounted: bool,
}

/// Open file on a [`HostFat`] volume.
#[derive(Debug)]
pub struct HostFile {
    file: File,
    size: u64,
}

impl HostFat {
    /// Creates a driver over `root`. Nothing is touched until mount or format.
    #[must_use]
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            mounted: false,
        }
    }

    /// Returns the directory backing the volume.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn marker_path(&self) -> PathBuf {
        self.root.join(VOLUME_MARKER)
    }

    fn file_path(&self, name: &str) -> FatResult<PathBuf> {
        let valid = !name.is_empty()
            && name != VOLUME_MARKER
            && !name.contains(['/', '\\'])
            && name != "."
            && name != "..";
        if valid {
            Ok(self.root.join(name))
        } else {
            Err(FatCode::InvalidName)
        }
    }

    fn is_empty_dir(&self) -> io::Result<bool> {
        Ok(fs::read_dir(&self.root)?.next().is_none())
    }

    fn wipe(&self) -> io::Result<()> {
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                fs::remove_file(entry.path())?;
            }
        }
        Ok(())
    }
}

fn map_io_err(err: &io::Error) -> FatCode {
    match err.kind() {
        ErrorKind::NotFound => FatCode::NoFile,
        ErrorKind::PermissionDenied => FatCode::Denied,
        ErrorKind::AlreadyExists => FatCode::Exist,
        ErrorKind::InvalidInput => FatCode::InvalidParameter,
        ErrorKind::TimedOut => FatCode::Timeout,
        _ => FatCode::DiskError,
    }
}

impl FatDriver for HostFat {
    type File = HostFile;

    fn mount(&mut self, _volume: &VolumeId, mode: MountMode) -> FatResult<()> {
        if mode == MountMode::Immediate {
            if !self.root.is_dir() {
                return Err(FatCode::NotReady);
            }
            if !self.marker_path().is_file() {
                return Err(FatCode::NoFilesystem);
            }
        }
        self.mounted = true;
        Ok(())
    }

    fn format(&mut self, volume: &VolumeId, options: &FormatOptions) -> FatResult<()> {
        self.mounted = false;
        fs::create_dir_all(&self.root).map_err(|err| map_io_err(&err))?;
        let unmarked = !self.marker_path().is_file();
        if unmarked && !self.is_empty_dir().map_err(|err| map_io_err(&err))? {
            return Err(FatCode::Denied);
        }
        self.wipe().map_err(|_| FatCode::MkfsAborted)?;
        let marker = format!(
            "volume={volume}\npartition={:?}\nallocation_unit={}\n",
            options.partition, options.allocation_unit
        );
        fs::write(self.marker_path(), marker).map_err(|_| FatCode::MkfsAborted)
    }

    fn open(&mut self, path: &str, mode: OpenMode) -> FatResult<HostFile> {
        if !self.mounted {
            return Err(FatCode::NotEnabled);
        }
        if !self.marker_path().is_file() {
            return Err(FatCode::NoFilesystem);
        }
        let path = self.file_path(path)?;
        let file = match mode {
            OpenMode::Read => File::open(&path),
            OpenMode::CreateAlways => OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&path),
        }
        .map_err(|err| map_io_err(&err))?;
        let size = file.metadata().map_err(|err| map_io_err(&err))?.len();
        Ok(HostFile { file, size })
    }

    fn size(&self, file: &HostFile) -> u64 {
        file.size
    }

    fn read(&mut self, file: &mut HostFile, buf: &mut [u8]) -> Transfer {
        let mut count = 0;
        while count < buf.len() {
            match file.file.read(&mut buf[count..]) {
                Ok(0) => break,
                Ok(n) => count += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) => return Transfer::failed(count, map_io_err(&err)),
            }
        }
        Transfer::ok(count)
    }

    fn write(&mut self, file: &mut HostFile, data: &[u8]) -> Transfer {
        let mut count = 0;
        while count < data.len() {
            match file.file.write(&data[count..]) {
                Ok(0) => break,
                Ok(n) => count += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) => return Transfer::failed(count, map_io_err(&err)),
            }
        }
        file.size = file.size.max(count as u64);
        Transfer::ok(count)
    }

    fn close(&mut self, file: HostFile) -> FatResult<()> {
        file.file.sync_all().map_err(|err| map_io_err(&err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mount_requires_marker() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut fat = HostFat::new(dir.path());
        let volume = VolumeId::default();
        assert_eq!(
            fat.mount(&volume, MountMode::Immediate),
            Err(FatCode::NoFilesystem)
        );
        fat.format(&volume, &FormatOptions::default()).expect("format");
        fat.mount(&volume, MountMode::Immediate).expect("mount");
    }

    #[test]
    fn test_missing_directory_is_not_ready() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut fat = HostFat::new(dir.path().join("absent"));
        assert_eq!(
            fat.mount(&VolumeId::default(), MountMode::Immediate),
            Err(FatCode::NotReady)
        );
    }

    #[test]
    fn test_reformat_wipes_volume_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut fat = HostFat::new(dir.path());
        let volume = VolumeId::default();
        fat.format(&volume, &FormatOptions::default()).expect("format");
        fs::write(dir.path().join("stale.dat"), b"old").expect("seed");
        fat.format(&volume, &FormatOptions::default()).expect("reformat");
        assert!(!dir.path().join("stale.dat").exists());
        assert!(dir.path().join(VOLUME_MARKER).is_file());
    }

    #[test]
    fn test_unmarked_directory_with_files_is_not_formatted() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("thesis.tex"), b"chapter one").expect("seed");
        let mut fat = HostFat::new(dir.path());
        assert_eq!(
            fat.format(&VolumeId::default(), &FormatOptions::default()),
            Err(FatCode::Denied)
        );
        assert_eq!(
            fs::read(dir.path().join("thesis.tex")).expect("untouched"),
            b"chapter one"
        );
        assert!(!dir.path().join(VOLUME_MARKER).exists());
    }

    #[test]
    fn test_missing_directory_is_created_by_format() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().join("fresh");
        let mut fat = HostFat::new(&root);
        fat.format(&VolumeId::default(), &FormatOptions::default())
            .expect("format");
        assert!(root.join(VOLUME_MARKER).is_file());
    }

    #[test]
    fn test_rejects_paths_outside_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut fat = HostFat::new(dir.path());
        let volume = VolumeId::default();
        fat.format(&volume, &FormatOptions::default()).expect("format");
        fat.mount(&volume, MountMode::Deferred).expect("mount");
        let err = fat
            .open("../escape.dat", OpenMode::CreateAlways)
            .expect_err("invalid name");
        assert_eq!(err, FatCode::InvalidName);
        let err = fat
            .open(VOLUME_MARKER, OpenMode::Read)
            .expect_err("marker is reserved");
        assert_eq!(err, FatCode::InvalidName);
    }

    #[test]
    fn test_open_missing_file_for_read() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut fat = HostFat::new(dir.path());
        let volume = VolumeId::default();
        fat.format(&volume, &FormatOptions::default()).expect("format");
        fat.mount(&volume, MountMode::Immediate).expect("mount");
        let err = fat.open("absent.dat", OpenMode::Read).expect_err("missing");
        assert_eq!(err, FatCode::NoFile);
    }
}
