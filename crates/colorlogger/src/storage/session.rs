//! The single open log file.

use chrono::{DateTime, Utc};

use super::volume::LogFile;

/// One open, actively written log file.
#[derive(Debug)]
pub struct RecordingSession<F: LogFile> {
    pub(super) file_name: String,
    pub(super) sample_count: u32,
    pub(super) started_at: DateTime<Utc>,
    pub(super) file: F,
}

impl<F: LogFile> RecordingSession<F> {
    pub(super) fn new(file_name: &str, file: F) -> Self {
        Self {
            file_name: file_name.to_string(),
            sample_count: 0,
            started_at: Utc::now(),
            file,
        }
    }

    /// Name of the log file on the volume.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Rows written in this session so far.
    #[must_use]
    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    /// Wall-clock time the session was opened.
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}
