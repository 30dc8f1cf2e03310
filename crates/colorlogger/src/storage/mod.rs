//! Storage lifecycle for colorlogger.
//!
//! [`StorageManager`] owns the mount state of the removable volume and the one
//! log file that may be open on it. States run
//! `Unmounted -> Mounted -> Recording -> Mounted -> Unmounted`; recording is
//! only possible while mounted, and the manager refuses to unmount while a
//! session is open.

pub mod memory;
pub mod session;
pub mod volume;

use std::io::Write;

use tracing::{debug, info, warn};

use crate::error::{MountError, SessionError, UnmountError, WriteError};
use crate::sample::{ColorLabel, ColorSample, LogRow, CSV_HEADER};

pub use memory::{Faults, MemoryFile, MemoryVolume};
pub use session::RecordingSession;
pub use volume::{DirFile, DirVolume, LogFile, Volume};

/// Rows between durability syncs unless configured otherwise.
pub const DEFAULT_FLUSH_EVERY: u32 = 10;

/// Owner of the volume mount and the active recording session.
#[derive(Debug)]
pub struct StorageManager<V: Volume> {
    volume: V,
    mounted: Option<String>,
    session: Option<RecordingSession<V::File>>,
    flush_every: u32,
}

impl<V: Volume> StorageManager<V> {
    /// Create a manager over an unmounted volume.
    #[must_use]
    pub fn new(volume: V) -> Self {
        Self::with_flush_every(volume, DEFAULT_FLUSH_EVERY)
    }

    /// Create a manager that syncs after every `flush_every` rows.
    ///
    /// A value of zero is treated as one.
    #[must_use]
    pub fn with_flush_every(volume: V, flush_every: u32) -> Self {
        Self {
            volume,
            mounted: None,
            session: None,
            flush_every: flush_every.max(1),
        }
    }

    /// Mount the named drive.
    ///
    /// # Errors
    ///
    /// Returns an error if a drive is already mounted, the drive is unknown,
    /// or the driver fails. The manager stays unmounted on failure.
    pub fn mount(&mut self, drive: &str) -> Result<(), MountError> {
        if let Some(current) = &self.mounted {
            return Err(MountError::AlreadyMounted(current.clone()));
        }
        if !self.volume.has_drive(drive) {
            return Err(MountError::UnknownDrive(drive.to_string()));
        }
        self.volume
            .mount(drive)
            .map_err(|source| MountError::Failed {
                drive: drive.to_string(),
                source,
            })?;

        self.mounted = Some(drive.to_string());
        info!(drive, "Volume mounted");
        Ok(())
    }

    /// Unmount the named drive.
    ///
    /// Does not stop an open session; the caller must call
    /// [`StorageManager::stop_session`] first.
    ///
    /// # Errors
    ///
    /// Returns an error if the drive is not mounted, a session is open, or the
    /// driver fails. State is unchanged on failure.
    pub fn unmount(&mut self, drive: &str) -> Result<(), UnmountError> {
        if self.mounted.as_deref() != Some(drive) {
            return Err(UnmountError::NotMounted(drive.to_string()));
        }
        if self.session.is_some() {
            return Err(UnmountError::SessionOpen(drive.to_string()));
        }
        self.volume
            .unmount(drive)
            .map_err(|source| UnmountError::Failed {
                drive: drive.to_string(),
                source,
            })?;

        self.mounted = None;
        info!(drive, "Volume unmounted");
        Ok(())
    }

    /// Open a fresh log file and write the CSV header.
    ///
    /// # Errors
    ///
    /// Returns an error if a session is already open, nothing is mounted, or
    /// the file or its header cannot be written. No session is left open on
    /// failure.
    pub fn start_session(&mut self, file_name: &str) -> Result<(), SessionError> {
        if let Some(session) = &self.session {
            return Err(SessionError::AlreadyOpen(session.file_name.clone()));
        }
        let Some(drive) = self.mounted.as_deref() else {
            return Err(SessionError::NotMounted(file_name.to_string()));
        };

        let mut file =
            self.volume
                .create(drive, file_name)
                .map_err(|source| SessionError::Create {
                    file: file_name.to_string(),
                    source,
                })?;

        let header = format!("{CSV_HEADER}\n");
        if let Err(err) = file.write_all(header.as_bytes()) {
            if let Err(close_err) = file.close() {
                debug!(error = %close_err, "Closing log file after header failure also failed");
            }
            return Err(SessionError::Header {
                file: file_name.to_string(),
                source: WriteError::Write(err),
            });
        }

        self.session = Some(RecordingSession::new(file_name, file));
        info!(file = file_name, drive, "Recording session started");
        Ok(())
    }

    /// Stamp and append one row to the open log file.
    ///
    /// Every `flush_every`-th row is followed by a durability sync.
    ///
    /// # Errors
    ///
    /// Returns an error if no session is open or the write or sync fails. The
    /// caller should treat any error as fatal for the session.
    pub fn append_row(
        &mut self,
        sample: ColorSample,
        label: ColorLabel,
    ) -> Result<LogRow, WriteError> {
        let session = self.session.as_mut().ok_or(WriteError::NoSession)?;
        let row = LogRow {
            index: session.sample_count + 1,
            sample,
            label,
        };

        let mut line = row.to_csv_line();
        line.push('\n');
        session
            .file
            .write_all(line.as_bytes())
            .map_err(WriteError::Write)?;
        session.sample_count += 1;

        if session.sample_count % self.flush_every == 0 {
            session.file.sync().map_err(WriteError::Sync)?;
            debug!(rows = session.sample_count, "Log file synced");
        }

        Ok(row)
    }

    /// Close the open log file and return how many rows it holds.
    ///
    /// Returns `None` without side effects if no session is open.
    pub fn stop_session(&mut self) -> Option<u32> {
        let session = self.session.take()?;
        let count = session.sample_count;
        if let Err(err) = session.file.close() {
            warn!(file = %session.file_name, error = %err, "Final sync on close failed");
        }
        info!(
            file = %session.file_name,
            samples = count,
            started_at = %session.started_at.to_rfc3339(),
            "Recording session stopped"
        );
        Some(count)
    }

    /// Whether a drive is mounted.
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.mounted.is_some()
    }

    /// The mounted drive, if any.
    #[must_use]
    pub fn mounted_drive(&self) -> Option<&str> {
        self.mounted.as_deref()
    }

    /// Whether a session is open.
    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.session.is_some()
    }

    /// The open session, if any.
    #[must_use]
    pub fn session(&self) -> Option<&RecordingSession<V::File>> {
        self.session.as_ref()
    }

    /// Rows between durability syncs.
    #[must_use]
    pub fn flush_every(&self) -> u32 {
        self.flush_every
    }

    /// The underlying volume.
    #[must_use]
    pub fn volume(&self) -> &V {
        &self.volume
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FILE: &str = "t.txt";

    fn mounted_manager() -> (StorageManager<MemoryVolume>, MemoryVolume) {
        let volume = MemoryVolume::new(["sd0"]);
        let mut storage = StorageManager::new(volume.clone());
        storage.mount("sd0").unwrap();
        (storage, volume)
    }

    fn sample(i: u16) -> ColorSample {
        ColorSample::new(100 + i, 10 + i, 20 + i, 30 + i)
    }

    #[test]
    fn test_new_is_unmounted() {
        let storage = StorageManager::new(MemoryVolume::new(["sd0"]));
        assert!(!storage.is_mounted());
        assert!(!storage.is_recording());
        assert_eq!(storage.flush_every(), DEFAULT_FLUSH_EVERY);
    }

    #[test]
    fn test_zero_flush_interval_is_clamped() {
        let storage = StorageManager::with_flush_every(MemoryVolume::new(["sd0"]), 0);
        assert_eq!(storage.flush_every(), 1);
    }

    #[test]
    fn test_mount_and_unmount() {
        let (mut storage, volume) = mounted_manager();
        assert_eq!(storage.mounted_drive(), Some("sd0"));
        assert_eq!(volume.mounted_drive().as_deref(), Some("sd0"));

        storage.unmount("sd0").unwrap();
        assert!(!storage.is_mounted());
        assert!(volume.mounted_drive().is_none());
    }

    #[test]
    fn test_mount_unknown_drive() {
        let mut storage = StorageManager::new(MemoryVolume::new(["sd0"]));
        let err = storage.mount("sd7").unwrap_err();
        assert!(matches!(err, MountError::UnknownDrive(ref d) if d == "sd7"));
        assert!(!storage.is_mounted());
    }

    #[test]
    fn test_mount_driver_failure_leaves_unmounted() {
        let volume = MemoryVolume::new(["sd0"]);
        volume.set_faults(Faults {
            mount: true,
            ..Faults::default()
        });
        let mut storage = StorageManager::new(volume);
        assert!(matches!(
            storage.mount("sd0"),
            Err(MountError::Failed { .. })
        ));
        assert!(!storage.is_mounted());
    }

    #[test]
    fn test_mount_twice_is_rejected() {
        let (mut storage, _) = mounted_manager();
        assert!(matches!(
            storage.mount("sd0"),
            Err(MountError::AlreadyMounted(_))
        ));
        assert!(storage.is_mounted());
    }

    #[test]
    fn test_unmount_refused_while_recording() {
        let (mut storage, _) = mounted_manager();
        storage.start_session(FILE).unwrap();

        assert!(matches!(
            storage.unmount("sd0"),
            Err(UnmountError::SessionOpen(_))
        ));
        assert!(storage.is_mounted());
        assert!(storage.is_recording());
    }

    #[test]
    fn test_unmount_failure_keeps_state() {
        let (mut storage, volume) = mounted_manager();
        volume.set_faults(Faults {
            unmount: true,
            ..Faults::default()
        });
        assert!(matches!(
            storage.unmount("sd0"),
            Err(UnmountError::Failed { .. })
        ));
        assert!(storage.is_mounted());
    }

    #[test]
    fn test_unmount_wrong_drive() {
        let (mut storage, _) = mounted_manager();
        assert!(matches!(
            storage.unmount("sd1"),
            Err(UnmountError::NotMounted(_))
        ));
    }

    #[test]
    fn test_start_session_requires_mount() {
        let mut storage = StorageManager::new(MemoryVolume::new(["sd0"]));
        assert!(matches!(
            storage.start_session(FILE),
            Err(SessionError::NotMounted(_))
        ));
        assert!(!storage.is_recording());
    }

    #[test]
    fn test_start_session_twice_is_rejected() {
        let (mut storage, _) = mounted_manager();
        storage.start_session(FILE).unwrap();
        assert!(matches!(
            storage.start_session(FILE),
            Err(SessionError::AlreadyOpen(_))
        ));
    }

    #[test]
    fn test_start_session_create_failure() {
        let (mut storage, volume) = mounted_manager();
        volume.set_faults(Faults {
            create: true,
            ..Faults::default()
        });
        assert!(matches!(
            storage.start_session(FILE),
            Err(SessionError::Create { .. })
        ));
        assert!(!storage.is_recording());
    }

    #[test]
    fn test_start_session_header_failure() {
        let (mut storage, volume) = mounted_manager();
        volume.set_faults(Faults {
            write_after: Some(0),
            ..Faults::default()
        });
        let err = storage.start_session(FILE).unwrap_err();
        assert!(matches!(
            err,
            SessionError::Header {
                source: WriteError::Write(_),
                ..
            }
        ));
        assert!(!storage.is_recording());
    }

    #[test]
    fn test_start_session_writes_header() {
        let (mut storage, volume) = mounted_manager();
        storage.start_session(FILE).unwrap();
        assert_eq!(
            volume.contents(FILE).unwrap(),
            "Amostra,Clear,Red,Green,Blue,cor\n"
        );
        let session = storage.session().unwrap();
        assert_eq!(session.file_name(), FILE);
        assert_eq!(session.sample_count(), 0);
    }

    #[test]
    fn test_append_without_session() {
        let (mut storage, _) = mounted_manager();
        assert!(matches!(
            storage.append_row(sample(0), ColorLabel::Red),
            Err(WriteError::NoSession)
        ));
    }

    #[test]
    fn test_append_stamps_sequential_indices() {
        let (mut storage, volume) = mounted_manager();
        storage.start_session(FILE).unwrap();

        let first = storage.append_row(sample(0), ColorLabel::Red).unwrap();
        let second = storage.append_row(sample(1), ColorLabel::Blue).unwrap();
        assert_eq!(first.index, 1);
        assert_eq!(second.index, 2);

        let contents = volume.contents(FILE).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[1], "1,100,10,20,30,red");
        assert_eq!(lines[2], "2,101,11,21,31,blue");
    }

    #[test]
    fn test_sync_every_tenth_row() {
        let (mut storage, volume) = mounted_manager();
        storage.start_session(FILE).unwrap();

        for i in 0..9 {
            storage.append_row(sample(i), ColorLabel::Gray).unwrap();
        }
        assert_eq!(volume.sync_count(FILE), 0);
        assert_eq!(volume.durable_contents(FILE).unwrap(), "");

        storage.append_row(sample(9), ColorLabel::Gray).unwrap();
        assert_eq!(volume.sync_count(FILE), 1);
        assert_eq!(volume.durable_contents(FILE).unwrap().lines().count(), 11);
    }

    #[test]
    fn test_durable_rows_bound_after_power_loss() {
        let (mut storage, volume) = mounted_manager();
        storage.start_session(FILE).unwrap();

        for n in 1..=37u32 {
            storage
                .append_row(sample(u16::try_from(n).unwrap()), ColorLabel::Gray)
                .unwrap();
            let durable_rows = volume
                .durable_contents(FILE)
                .unwrap()
                .lines()
                .skip(1)
                .count();
            assert_eq!(durable_rows, usize::try_from(n - n % 10).unwrap());
            assert!(n as usize - durable_rows <= 9);
        }
    }

    #[test]
    fn test_write_failure_is_reported() {
        let (mut storage, volume) = mounted_manager();
        storage.start_session(FILE).unwrap();
        storage.append_row(sample(0), ColorLabel::Red).unwrap();

        volume.set_faults(Faults {
            write_after: Some(0),
            ..Faults::default()
        });
        assert!(matches!(
            storage.append_row(sample(1), ColorLabel::Red),
            Err(WriteError::Write(_))
        ));
        assert_eq!(storage.session().unwrap().sample_count(), 1);
    }

    #[test]
    fn test_sync_failure_is_reported() {
        let volume = MemoryVolume::new(["sd0"]);
        let mut storage = StorageManager::with_flush_every(volume.clone(), 1);
        storage.mount("sd0").unwrap();
        storage.start_session(FILE).unwrap();
        volume.set_faults(Faults {
            sync: true,
            ..Faults::default()
        });
        assert!(matches!(
            storage.append_row(sample(0), ColorLabel::Red),
            Err(WriteError::Sync(_))
        ));
    }

    #[test]
    fn test_stop_session_returns_count_and_is_idempotent() {
        let (mut storage, _) = mounted_manager();
        storage.start_session(FILE).unwrap();
        for i in 0..3 {
            storage.append_row(sample(i), ColorLabel::Green).unwrap();
        }

        assert_eq!(storage.stop_session(), Some(3));
        assert!(!storage.is_recording());
        assert!(storage.is_mounted());
        assert_eq!(storage.stop_session(), None);
        assert_eq!(storage.stop_session(), None);
    }

    #[test]
    fn test_stop_session_syncs_remaining_rows() {
        let (mut storage, volume) = mounted_manager();
        storage.start_session(FILE).unwrap();
        for i in 0..3 {
            storage.append_row(sample(i), ColorLabel::Green).unwrap();
        }
        storage.stop_session();
        assert_eq!(volume.durable_contents(FILE).unwrap().lines().count(), 4);
    }

    #[test]
    fn test_stop_session_tolerates_close_failure() {
        let (mut storage, volume) = mounted_manager();
        storage.start_session(FILE).unwrap();
        volume.set_faults(Faults {
            sync: true,
            ..Faults::default()
        });
        assert_eq!(storage.stop_session(), Some(0));
        assert!(!storage.is_recording());
    }

    #[test]
    fn test_new_session_resets_count_and_truncates() {
        let (mut storage, volume) = mounted_manager();
        storage.start_session(FILE).unwrap();
        storage.append_row(sample(0), ColorLabel::Red).unwrap();
        storage.stop_session();

        storage.start_session(FILE).unwrap();
        assert_eq!(storage.session().unwrap().sample_count(), 0);
        let row = storage.append_row(sample(5), ColorLabel::Blue).unwrap();
        assert_eq!(row.index, 1);
        assert_eq!(volume.contents(FILE).unwrap().lines().count(), 2);
    }

    #[test]
    fn test_end_to_end_twenty_three_samples() {
        let (mut storage, volume) = mounted_manager();
        storage.start_session(FILE).unwrap();
        for i in 0..23 {
            storage.append_row(sample(i), ColorLabel::Yellow).unwrap();
        }
        assert_eq!(storage.stop_session(), Some(23));

        let contents = volume.durable_contents(FILE).unwrap();
        let mut lines = contents.lines();
        assert_eq!(lines.next(), Some(CSV_HEADER));
        let indices: Vec<u32> = lines
            .map(|l| l.parse::<LogRow>().unwrap().index)
            .collect();
        assert_eq!(indices, (1..=23).collect::<Vec<_>>());
    }
}
