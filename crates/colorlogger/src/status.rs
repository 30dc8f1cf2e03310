//! Status notifications.
//!
//! The acquisition loop reports every state change as a [`StatusEvent`]. A
//! [`StatusSink`] turns those into indicator lights and display text; sinks
//! must never block the loop.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::sample::{ColorLabel, ColorSample, LogRow};

/// A state change worth showing to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StatusEvent {
    /// The controller is up and waiting for input.
    Idle,
    /// A mount attempt is in progress.
    Mounting,
    /// The mount attempt failed.
    MountFailed,
    /// The volume is mounted.
    Mounted,
    /// The volume was unmounted.
    Unmounted,
    /// The unmount attempt failed; the volume stays mounted.
    UnmountFailed,
    /// A recording session was opened.
    RecordingStarted,
    /// A recording session could not be opened.
    SessionFailed,
    /// A row write failed after `samples` rows; the session is being closed.
    WriteFailed {
        /// Rows successfully written before the failure.
        samples: u32,
    },
    /// A recording session was closed.
    RecordingStopped {
        /// Rows written in the session.
        samples: u32,
    },
    /// A sample was taken, classified and logged.
    Sampling {
        /// Row index within the session.
        index: u32,
        /// Classifier output.
        label: ColorLabel,
        /// The raw reading.
        sample: ColorSample,
    },
}

impl StatusEvent {
    /// Build a sampling event from a written row.
    #[must_use]
    pub fn sampling(row: &LogRow) -> Self {
        Self::Sampling {
            index: row.index,
            label: row.label,
            sample: row.sample,
        }
    }

    /// Whether this event reports a failure.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::MountFailed | Self::UnmountFailed | Self::SessionFailed | Self::WriteFailed { .. }
        )
    }

    /// How the RGB indicator should react.
    #[must_use]
    pub fn indicator(&self) -> Indicator {
        match self {
            Self::Idle | Self::Mounting | Self::Unmounted => Indicator::steady(Led::Yellow),
            Self::Mounted => Indicator::steady(Led::Green),
            Self::RecordingStarted | Self::Sampling { .. } => Indicator::steady(Led::Red),
            Self::MountFailed => Indicator {
                flash: Some(Led::Purple),
                steady: Some(Led::Off),
            },
            Self::RecordingStopped { .. } => Indicator {
                flash: Some(Led::Purple),
                steady: Some(Led::Green),
            },
            Self::UnmountFailed | Self::SessionFailed | Self::WriteFailed { .. } => Indicator {
                flash: Some(Led::Purple),
                steady: None,
            },
        }
    }

    /// Text for a 16-column status display, one entry per line.
    #[must_use]
    pub fn display_lines(&self) -> Vec<String> {
        match self {
            Self::Idle => vec!["Waiting...".to_string()],
            Self::Mounting => vec!["Mounting SD...".to_string()],
            Self::MountFailed => vec!["SD card".to_string(), "not detected".to_string()],
            Self::Mounted => vec!["Mount complete".to_string(), "Waiting...".to_string()],
            Self::Unmounted => vec!["SD card".to_string(), "unmounted".to_string()],
            Self::UnmountFailed => vec!["Unmount failed".to_string()],
            Self::RecordingStarted => vec!["Recording...".to_string()],
            Self::SessionFailed => vec!["Cannot open log".to_string(), "Mount the card".to_string()],
            Self::WriteFailed { samples } => {
                vec!["Write failed".to_string(), format!("after {samples}")]
            }
            Self::RecordingStopped { samples } => vec![
                "Recording".to_string(),
                "stopped".to_string(),
                format!("Saved: {samples}"),
            ],
            Self::Sampling {
                index,
                label,
                sample,
            } => vec![
                "Recording...".to_string(),
                label.to_string(),
                format!("Samples: {index}"),
                format!("C: {} R: {}", sample.clear, sample.red),
                format!("G: {} B: {}", sample.green, sample.blue),
            ],
        }
    }
}

impl std::fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Mounting => write!(f, "mounting"),
            Self::MountFailed => write!(f, "mount failed"),
            Self::Mounted => write!(f, "mounted"),
            Self::Unmounted => write!(f, "unmounted"),
            Self::UnmountFailed => write!(f, "unmount failed"),
            Self::RecordingStarted => write!(f, "recording started"),
            Self::SessionFailed => write!(f, "session failed"),
            Self::WriteFailed { samples } => write!(f, "write failed after {samples} samples"),
            Self::RecordingStopped { samples } => write!(f, "recording stopped ({samples} samples)"),
            Self::Sampling {
                index,
                label,
                sample,
            } => write!(f, "sample {index}: {label} ({sample})"),
        }
    }
}

/// Colour of the RGB indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Led {
    /// All channels off.
    Off,
    /// Red only.
    Red,
    /// Green only.
    Green,
    /// Blue only.
    Blue,
    /// Red and green.
    Yellow,
    /// Red and blue.
    Purple,
}

impl Led {
    /// Channel states as `(red, green, blue)`.
    #[must_use]
    pub const fn rgb(&self) -> (bool, bool, bool) {
        match self {
            Self::Off => (false, false, false),
            Self::Red => (true, false, false),
            Self::Green => (false, true, false),
            Self::Blue => (false, false, true),
            Self::Yellow => (true, true, false),
            Self::Purple => (true, false, true),
        }
    }
}

/// Indicator reaction to an event: an optional short flash, then an optional
/// steady colour (`None` leaves the current colour alone).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Indicator {
    /// Colour flashed three times before settling.
    pub flash: Option<Led>,
    /// Colour to settle on.
    pub steady: Option<Led>,
}

impl Indicator {
    /// A plain colour change with no flash.
    #[must_use]
    pub const fn steady(led: Led) -> Self {
        Self {
            flash: None,
            steady: Some(led),
        }
    }
}

/// Receiver of status notifications.
pub trait StatusSink {
    /// Deliver an event. Must return promptly.
    fn notify(&mut self, event: StatusEvent);
}

impl StatusSink for Vec<StatusEvent> {
    fn notify(&mut self, event: StatusEvent) {
        self.push(event);
    }
}

/// A sink that only writes events to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl StatusSink for TracingSink {
    fn notify(&mut self, event: StatusEvent) {
        let indicator = event.indicator();
        match event {
            StatusEvent::Sampling { .. } => debug!(%event, ?indicator, "Status"),
            _ if event.is_failure() => warn!(%event, ?indicator, "Status"),
            _ => info!(%event, ?indicator, "Status"),
        }
    }
}

/// A sink that forwards events to another task.
///
/// Events are dropped rather than waited on when the channel is full or
/// closed.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<StatusEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiving end of its channel.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<StatusEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl StatusSink for ChannelSink {
    fn notify(&mut self, event: StatusEvent) {
        if let Err(err) = self.tx.try_send(event) {
            trace!(error = %err, "Dropping status event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indicator_colours_follow_lifecycle() {
        assert_eq!(StatusEvent::Idle.indicator(), Indicator::steady(Led::Yellow));
        assert_eq!(
            StatusEvent::Mounted.indicator(),
            Indicator::steady(Led::Green)
        );
        assert_eq!(
            StatusEvent::RecordingStarted.indicator(),
            Indicator::steady(Led::Red)
        );
        assert_eq!(
            StatusEvent::Unmounted.indicator(),
            Indicator::steady(Led::Yellow)
        );
    }

    #[test]
    fn test_failures_flash_purple() {
        for event in [
            StatusEvent::MountFailed,
            StatusEvent::UnmountFailed,
            StatusEvent::SessionFailed,
            StatusEvent::WriteFailed { samples: 4 },
        ] {
            assert!(event.is_failure());
            assert_eq!(event.indicator().flash, Some(Led::Purple));
        }
        assert!(!StatusEvent::Mounted.is_failure());
    }

    #[test]
    fn test_stop_flashes_then_returns_to_green() {
        let indicator = StatusEvent::RecordingStopped { samples: 3 }.indicator();
        assert_eq!(indicator.flash, Some(Led::Purple));
        assert_eq!(indicator.steady, Some(Led::Green));
    }

    #[test]
    fn test_led_rgb() {
        assert_eq!(Led::Yellow.rgb(), (true, true, false));
        assert_eq!(Led::Purple.rgb(), (true, false, true));
        assert_eq!(Led::Off.rgb(), (false, false, false));
    }

    #[test]
    fn test_sampling_display_lines() {
        let row = LogRow {
            index: 12,
            sample: ColorSample::new(700, 120, 80, 60),
            label: ColorLabel::Red,
        };
        let lines = StatusEvent::sampling(&row).display_lines();
        assert_eq!(lines[1], "red");
        assert_eq!(lines[2], "Samples: 12");
        assert_eq!(lines[3], "C: 700 R: 120");
        assert_eq!(lines[4], "G: 80 B: 60");
    }

    #[test]
    fn test_display_lines_fit_display() {
        let events = [
            StatusEvent::Idle,
            StatusEvent::Mounting,
            StatusEvent::MountFailed,
            StatusEvent::Mounted,
            StatusEvent::Unmounted,
            StatusEvent::UnmountFailed,
            StatusEvent::RecordingStarted,
            StatusEvent::SessionFailed,
            StatusEvent::WriteFailed { samples: 99_999 },
            StatusEvent::RecordingStopped { samples: 99_999 },
        ];
        for event in events {
            for line in event.display_lines() {
                assert!(line.len() <= 16, "{line:?} too wide");
            }
        }
    }

    #[test]
    fn test_event_display() {
        assert_eq!(
            StatusEvent::RecordingStopped { samples: 23 }.to_string(),
            "recording stopped (23 samples)"
        );
    }

    #[test]
    fn test_event_serialization() {
        let json = serde_json::to_string(&StatusEvent::RecordingStopped { samples: 2 }).unwrap();
        assert_eq!(json, r#"{"event":"recording_stopped","samples":2}"#);
    }

    #[test]
    fn test_vec_sink_collects() {
        let mut sink: Vec<StatusEvent> = Vec::new();
        sink.notify(StatusEvent::Idle);
        sink.notify(StatusEvent::Mounting);
        assert_eq!(sink, vec![StatusEvent::Idle, StatusEvent::Mounting]);
    }

    #[test]
    fn test_tracing_sink_does_not_panic() {
        let mut sink = TracingSink;
        sink.notify(StatusEvent::MountFailed);
        sink.notify(StatusEvent::Mounted);
    }

    #[tokio::test]
    async fn test_channel_sink_forwards() {
        let (mut sink, mut rx) = ChannelSink::channel(4);
        sink.notify(StatusEvent::Mounted);
        assert_eq!(rx.recv().await, Some(StatusEvent::Mounted));
    }

    #[test]
    fn test_channel_sink_drops_when_full() {
        let (mut sink, mut rx) = ChannelSink::channel(1);
        sink.notify(StatusEvent::Mounting);
        sink.notify(StatusEvent::Mounted);
        assert_eq!(rx.try_recv().ok(), Some(StatusEvent::Mounting));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_channel_sink_survives_closed_receiver() {
        let (mut sink, rx) = ChannelSink::channel(1);
        drop(rx);
        sink.notify(StatusEvent::Idle);
    }
}
