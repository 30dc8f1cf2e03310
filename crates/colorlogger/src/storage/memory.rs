//! In-memory volume with fault injection.
//!
//! Keeps what has been written separately from what has been synced, so
//! callers can see exactly which rows would survive a power cut. Faults can be
//! switched on to drive every failure path of the storage lifecycle.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::volume::{LogFile, Volume};

/// Failures to inject into a [`MemoryVolume`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Faults {
    /// Every mount call fails.
    pub mount: bool,
    /// Every unmount call fails.
    pub unmount: bool,
    /// Every file creation fails.
    pub create: bool,
    /// Write calls fail once this many have succeeded (across all files).
    pub write_after: Option<usize>,
    /// Every sync fails.
    pub sync: bool,
}

#[derive(Debug, Default)]
struct FileData {
    written: Vec<u8>,
    durable: Vec<u8>,
    syncs: usize,
}

#[derive(Debug, Default)]
struct Disk {
    drives: Vec<String>,
    mounted: Option<String>,
    files: BTreeMap<String, FileData>,
    faults: Faults,
    writes: usize,
}

/// A volume held entirely in memory.
///
/// Cloning yields another handle onto the same disk.
#[derive(Debug, Clone, Default)]
pub struct MemoryVolume {
    disk: Arc<Mutex<Disk>>,
}

impl MemoryVolume {
    /// Create a volume exposing the given drive names.
    #[must_use]
    pub fn new<I, S>(drives: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let disk = Disk {
            drives: drives.into_iter().map(Into::into).collect(),
            ..Disk::default()
        };
        Self {
            disk: Arc::new(Mutex::new(disk)),
        }
    }

    /// Replace the active fault set.
    pub fn set_faults(&self, faults: Faults) {
        self.lock().faults = faults;
    }

    /// Everything written to a file, synced or not.
    #[must_use]
    pub fn contents(&self, file_name: &str) -> Option<String> {
        self.lock()
            .files
            .get(file_name)
            .map(|f| String::from_utf8_lossy(&f.written).into_owned())
    }

    /// What a file would contain after a power cut right now.
    #[must_use]
    pub fn durable_contents(&self, file_name: &str) -> Option<String> {
        self.lock()
            .files
            .get(file_name)
            .map(|f| String::from_utf8_lossy(&f.durable).into_owned())
    }

    /// Number of successful syncs on a file.
    #[must_use]
    pub fn sync_count(&self, file_name: &str) -> usize {
        self.lock().files.get(file_name).map_or(0, |f| f.syncs)
    }

    /// The drive the disk itself considers mounted.
    #[must_use]
    pub fn mounted_drive(&self) -> Option<String> {
        self.lock().mounted.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Disk> {
        self.disk.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn injected(what: &str) -> io::Error {
    io::Error::new(io::ErrorKind::Other, format!("injected {what} fault"))
}

impl Volume for MemoryVolume {
    type File = MemoryFile;

    fn has_drive(&self, drive: &str) -> bool {
        self.lock().drives.iter().any(|d| d == drive)
    }

    fn mount(&mut self, drive: &str) -> io::Result<()> {
        let mut disk = self.lock();
        if disk.faults.mount {
            return Err(injected("mount"));
        }
        disk.mounted = Some(drive.to_string());
        Ok(())
    }

    fn unmount(&mut self, _drive: &str) -> io::Result<()> {
        let mut disk = self.lock();
        if disk.faults.unmount {
            return Err(injected("unmount"));
        }
        disk.mounted = None;
        Ok(())
    }

    fn create(&mut self, drive: &str, file_name: &str) -> io::Result<MemoryFile> {
        let mut disk = self.lock();
        if disk.faults.create {
            return Err(injected("create"));
        }
        if disk.mounted.as_deref() != Some(drive) {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                format!("drive '{drive}' is not mounted"),
            ));
        }
        disk.files.insert(file_name.to_string(), FileData::default());
        Ok(MemoryFile {
            disk: Arc::clone(&self.disk),
            name: file_name.to_string(),
        })
    }
}

/// A file on a [`MemoryVolume`].
#[derive(Debug)]
pub struct MemoryFile {
    disk: Arc<Mutex<Disk>>,
    name: String,
}

impl MemoryFile {
    fn lock(&self) -> MutexGuard<'_, Disk> {
        self.disk.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Write for MemoryFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let name = self.name.clone();
        let mut disk = self.lock();
        if disk.faults.write_after.is_some_and(|limit| disk.writes >= limit) {
            return Err(injected("write"));
        }
        disk.writes += 1;
        disk.files
            .entry(name)
            .or_default()
            .written
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl LogFile for MemoryFile {
    fn sync(&mut self) -> io::Result<()> {
        let name = self.name.clone();
        let mut disk = self.lock();
        if disk.faults.sync {
            return Err(injected("sync"));
        }
        let file = disk.files.entry(name).or_default();
        file.durable.clone_from(&file.written);
        file.syncs += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsynced_writes_are_not_durable() {
        let mut volume = MemoryVolume::new(["sd0"]);
        volume.mount("sd0").unwrap();
        let mut file = volume.create("sd0", "log.txt").unwrap();

        file.write_all(b"row\n").unwrap();
        assert_eq!(volume.contents("log.txt").unwrap(), "row\n");
        assert_eq!(volume.durable_contents("log.txt").unwrap(), "");

        file.sync().unwrap();
        assert_eq!(volume.durable_contents("log.txt").unwrap(), "row\n");
        assert_eq!(volume.sync_count("log.txt"), 1);
    }

    #[test]
    fn test_write_fault_after_limit() {
        let mut volume = MemoryVolume::new(["sd0"]);
        volume.mount("sd0").unwrap();
        volume.set_faults(Faults {
            write_after: Some(1),
            ..Faults::default()
        });
        let mut file = volume.create("sd0", "log.txt").unwrap();

        assert!(file.write_all(b"first\n").is_ok());
        assert!(file.write_all(b"second\n").is_err());
        assert_eq!(volume.contents("log.txt").unwrap(), "first\n");
    }

    #[test]
    fn test_create_requires_mounted_drive() {
        let mut volume = MemoryVolume::new(["sd0"]);
        assert!(volume.create("sd0", "log.txt").is_err());
    }

    #[test]
    fn test_clones_share_disk() {
        let mut volume = MemoryVolume::new(["sd0"]);
        let observer = volume.clone();
        volume.mount("sd0").unwrap();
        assert_eq!(observer.mounted_drive().as_deref(), Some("sd0"));
    }
}
