//! Removable volume abstraction.
//!
//! The storage manager talks to the filesystem driver only through [`Volume`]
//! and [`LogFile`]. [`DirVolume`] backs each logical drive with a host
//! directory, which is how the logger runs on a development machine.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

/// An open, writable log file on a mounted volume.
pub trait LogFile: Write + fmt::Debug {
    /// Force everything written so far onto stable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if buffered data cannot be flushed or synced.
    fn sync(&mut self) -> io::Result<()>;

    /// Flush, sync and release the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the final sync fails. The handle is released
    /// either way.
    fn close(mut self) -> io::Result<()>
    where
        Self: Sized,
    {
        self.sync()
    }
}

/// The filesystem driver for a set of named logical drives.
pub trait Volume: fmt::Debug {
    /// The file handle type produced by [`Volume::create`].
    type File: LogFile;

    /// Whether a logical drive with this name exists.
    fn has_drive(&self, drive: &str) -> bool;

    /// Mount the named drive.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium is missing or unreadable.
    fn mount(&mut self, drive: &str) -> io::Result<()>;

    /// Unmount the named drive.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver refuses to release the drive.
    fn unmount(&mut self, drive: &str) -> io::Result<()>;

    /// Create (or truncate) a file on a mounted drive.
    ///
    /// # Errors
    ///
    /// Returns an error if the drive is not mounted or the file cannot be
    /// created.
    fn create(&mut self, drive: &str, file_name: &str) -> io::Result<Self::File>;
}

/// A log file backed by a host file.
#[derive(Debug)]
pub struct DirFile {
    writer: BufWriter<File>,
}

impl Write for DirFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

impl LogFile for DirFile {
    fn sync(&mut self) -> io::Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_data()
    }
}

/// A volume whose logical drives are directories on the host.
///
/// A drive can be mounted only while its directory exists, which mirrors a
/// card being present in the slot.
#[derive(Debug, Default)]
pub struct DirVolume {
    drives: BTreeMap<String, PathBuf>,
    mounted: BTreeSet<String>,
}

impl DirVolume {
    /// Create a volume with no drives.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a volume with a single drive.
    #[must_use]
    pub fn single(drive: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self::new().with_drive(drive, root)
    }

    /// Register a drive backed by `root`.
    #[must_use]
    pub fn with_drive(mut self, drive: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        self.drives.insert(drive.into(), root.into());
        self
    }

    /// The directory backing a drive.
    #[must_use]
    pub fn root(&self, drive: &str) -> Option<&Path> {
        self.drives.get(drive).map(PathBuf::as_path)
    }

    /// Whether a drive is currently mounted.
    #[must_use]
    pub fn is_mounted(&self, drive: &str) -> bool {
        self.mounted.contains(drive)
    }

    fn unknown(drive: &str) -> io::Error {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("unknown logical drive '{drive}'"),
        )
    }
}

impl Volume for DirVolume {
    type File = DirFile;

    fn has_drive(&self, drive: &str) -> bool {
        self.drives.contains_key(drive)
    }

    fn mount(&mut self, drive: &str) -> io::Result<()> {
        let root = self.drives.get(drive).ok_or_else(|| Self::unknown(drive))?;
        let meta = std::fs::metadata(root)?;
        if !meta.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a directory", root.display()),
            ));
        }
        debug!(drive, root = %root.display(), "Mounted directory volume");
        self.mounted.insert(drive.to_string());
        Ok(())
    }

    fn unmount(&mut self, drive: &str) -> io::Result<()> {
        if !self.mounted.remove(drive) {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                format!("drive '{drive}' is not mounted"),
            ));
        }
        debug!(drive, "Unmounted directory volume");
        Ok(())
    }

    fn create(&mut self, drive: &str, file_name: &str) -> io::Result<DirFile> {
        if !self.mounted.contains(drive) {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                format!("drive '{drive}' is not mounted"),
            ));
        }
        let root = self.drives.get(drive).ok_or_else(|| Self::unknown(drive))?;
        let path = root.join(file_name);
        trace!(path = %path.display(), "Creating log file");
        let file = File::create(&path)?;
        Ok(DirFile {
            writer: BufWriter::new(file),
        })
    }
}
