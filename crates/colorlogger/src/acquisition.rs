//! The acquisition loop.
//!
//! [`Controller`] runs one reconciliation pass per tick: take a sample if a
//! session is open and the sampling period has elapsed, then bring the
//! session and the mount in line with the user's desired state. Every
//! I/O-bearing transition happens here, never in the input path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::classifier::classify;
use crate::config::Config;
use crate::input::DebouncedInput;
use crate::sensor::ColorSensor;
use crate::status::{StatusEvent, StatusSink};
use crate::storage::{StorageManager, Volume};

/// Log file name used for every session.
pub const LOG_FILE_NAME: &str = "test.txt";

/// Settings for the acquisition loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Drive to mount when the mount toggle is on.
    pub drive: String,
    /// Log file created for each session.
    pub file_name: String,
    /// Period of the reconciliation loop.
    pub tick_interval: Duration,
    /// Minimum spacing between samples.
    pub sample_period: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            drive: "sd0".to_string(),
            file_name: LOG_FILE_NAME.to_string(),
            tick_interval: Duration::from_millis(100),
            sample_period: Duration::from_millis(100),
        }
    }
}

impl From<&Config> for ControllerConfig {
    fn from(config: &Config) -> Self {
        Self {
            drive: config.storage.drive.clone(),
            file_name: LOG_FILE_NAME.to_string(),
            tick_interval: config.tick_interval(),
            sample_period: config.sample_period(),
        }
    }
}

/// The data-acquisition state machine.
#[derive(Debug)]
pub struct Controller<V: Volume, S, K> {
    config: ControllerConfig,
    storage: StorageManager<V>,
    sensor: S,
    sink: K,
    input: Arc<DebouncedInput>,
    last_sample: Option<Duration>,
    running: Arc<AtomicBool>,
    stop_requested: Arc<AtomicBool>,
}

impl<V, S, K> Controller<V, S, K>
where
    V: Volume,
    S: ColorSensor,
    K: StatusSink,
{
    /// Assemble a controller from its collaborators.
    #[must_use]
    pub fn new(
        config: ControllerConfig,
        storage: StorageManager<V>,
        sensor: S,
        sink: K,
        input: Arc<DebouncedInput>,
    ) -> Self {
        Self {
            config,
            storage,
            sensor,
            sink,
            input,
            last_sample: None,
            running: Arc::new(AtomicBool::new(false)),
            stop_requested: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Run one reconciliation pass at monotonic time `now`.
    pub fn tick(&mut self, now: Duration) {
        if self.storage.is_recording() {
            self.sample_if_due(now);
        }

        let desired = self.input.desired();
        self.reconcile_recording(desired.want_recording);
        self.reconcile_mount(desired.want_mounted);

        debug_assert!(
            self.storage.is_mounted() || !self.storage.is_recording(),
            "recording while unmounted"
        );
    }

    fn sample_if_due(&mut self, now: Duration) {
        if let Some(last) = self.last_sample {
            if now.saturating_sub(last) < self.config.sample_period {
                return;
            }
        }
        self.last_sample = Some(now);

        let sample = self.sensor.read_sample();
        let label = classify(sample);
        match self.storage.append_row(sample, label) {
            Ok(row) => {
                debug!(index = row.index, %sample, %label, "Sample logged");
                if row.index % self.storage.flush_every() == 0 {
                    info!(samples = row.index, "Samples collected");
                }
                self.sink.notify(StatusEvent::sampling(&row));
            }
            Err(err) => {
                let samples = self.storage.session().map_or(0, |s| s.sample_count());
                warn!(error = %err, samples, "Write failed, stopping recording");
                self.sink.notify(StatusEvent::WriteFailed { samples });
                self.stop_recording();
                self.input.clear_recording();
            }
        }
    }

    fn reconcile_recording(&mut self, want_recording: bool) {
        match (want_recording, self.storage.is_recording()) {
            (true, false) => match self.storage.start_session(&self.config.file_name) {
                Ok(()) => {
                    self.last_sample = None;
                    self.sink.notify(StatusEvent::RecordingStarted);
                }
                Err(err) => {
                    warn!(error = %err, "Could not start recording");
                    self.sink.notify(StatusEvent::SessionFailed);
                    self.input.clear_recording();
                }
            },
            (false, true) => self.stop_recording(),
            _ => {}
        }
    }

    fn reconcile_mount(&mut self, want_mounted: bool) {
        match (want_mounted, self.storage.is_mounted()) {
            (true, false) => {
                self.sink.notify(StatusEvent::Mounting);
                match self.storage.mount(&self.config.drive) {
                    Ok(()) => self.sink.notify(StatusEvent::Mounted),
                    Err(err) => {
                        warn!(error = %err, "Mount failed");
                        self.sink.notify(StatusEvent::MountFailed);
                        self.input.clear_mounted();
                    }
                }
            }
            (false, true) => {
                if self.storage.is_recording() {
                    debug!("Stopping recording before unmount");
                    self.stop_recording();
                    self.input.clear_recording();
                }
                self.unmount_current();
            }
            _ => {}
        }
    }

    fn unmount_current(&mut self) {
        let Some(drive) = self.storage.mounted_drive().map(str::to_owned) else {
            return;
        };
        match self.storage.unmount(&drive) {
            Ok(()) => self.sink.notify(StatusEvent::Unmounted),
            Err(err) => {
                warn!(error = %err, "Unmount failed");
                self.sink.notify(StatusEvent::UnmountFailed);
                self.input.restore_mounted();
            }
        }
    }

    fn stop_recording(&mut self) {
        if let Some(samples) = self.storage.stop_session() {
            self.sink.notify(StatusEvent::RecordingStopped { samples });
        }
    }

    /// Close any open session and unmount, leaving the medium safe to remove.
    pub fn shutdown(&mut self) {
        if self.storage.is_recording() {
            self.stop_recording();
        }
        if self.storage.is_mounted() {
            self.unmount_current();
        }
    }

    /// Drive [`Controller::tick`] from a timer until stopped, then shut down.
    ///
    /// Returns immediately if the loop is already running. A stop requested
    /// through a [`ControllerHandle`] before the call still applies: the loop
    /// shuts down without ticking.
    pub async fn run(&mut self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Acquisition loop already running");
            return;
        }

        info!(
            tick_ms = self.config.tick_interval.as_millis(),
            sample_ms = self.config.sample_period.as_millis(),
            drive = %self.config.drive,
            "Starting acquisition loop"
        );
        self.sink.notify(StatusEvent::Idle);

        let epoch = Instant::now();
        let mut ticker = interval(self.config.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while !self.stop_requested.load(Ordering::SeqCst) {
            ticker.tick().await;
            if self.stop_requested.load(Ordering::SeqCst) {
                break;
            }
            self.tick(epoch.elapsed());
        }

        self.shutdown();
        self.running.store(false, Ordering::SeqCst);
        info!("Acquisition loop stopped");
    }

    /// Get a handle that can stop the loop from another task.
    #[must_use]
    pub fn stop_handle(&self) -> ControllerHandle {
        ControllerHandle {
            running: Arc::clone(&self.running),
            stop_requested: Arc::clone(&self.stop_requested),
        }
    }

    /// Whether the loop is currently running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// The shared input source.
    #[must_use]
    pub fn input(&self) -> &Arc<DebouncedInput> {
        &self.input
    }

    /// The storage manager.
    #[must_use]
    pub fn storage(&self) -> &StorageManager<V> {
        &self.storage
    }

    /// The status sink.
    #[must_use]
    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// The loop settings.
    #[must_use]
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }
}

/// A handle to stop a running controller.
///
/// This can be cloned and sent to other tasks.
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    running: Arc<AtomicBool>,
    stop_requested: Arc<AtomicBool>,
}

impl ControllerHandle {
    /// Ask the loop to stop after the current tick.
    ///
    /// The request is sticky: it also stops a loop that has not started yet.
    pub fn stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }

    /// Whether a stop has been requested.
    #[must_use]
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    /// Whether the loop is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}
