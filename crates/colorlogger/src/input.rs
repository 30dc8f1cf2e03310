//! Debounced button input.
//!
//! Raw falling edges from the two buttons arrive through [`DebouncedInput::on_edge`],
//! which may run in interrupt context (or, on a host, in any task or thread).
//! Accepted edges flip one of two atomic "desired state" flags that the
//! acquisition loop reconciles once per tick. The flags and the debounce
//! timestamp are the only state shared between the two contexts.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default minimum spacing between accepted edges.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Marker for "no edge accepted yet".
const NEVER: u64 = u64::MAX;

/// The two physical buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Button {
    /// Toggles recording.
    A,
    /// Toggles the volume mount.
    B,
}

impl std::fmt::Display for Button {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::A => write!(f, "capture-toggle"),
            Self::B => write!(f, "mount-toggle"),
        }
    }
}

/// A snapshot of user intent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredState {
    /// The user wants a recording session open.
    pub want_recording: bool,
    /// The user wants the volume mounted.
    pub want_mounted: bool,
}

/// Debounced source of the two toggle events.
///
/// One debounce clock is shared by both buttons: an edge on either button
/// within the window of the last accepted edge is dropped.
#[derive(Debug)]
pub struct DebouncedInput {
    debounce_ms: u64,
    last_accepted_ms: AtomicU64,
    want_recording: AtomicBool,
    want_mounted: AtomicBool,
}

impl DebouncedInput {
    /// Create an input source with the default 500 ms window.
    #[must_use]
    pub fn new() -> Self {
        Self::with_debounce(DEFAULT_DEBOUNCE)
    }

    /// Create an input source with a custom debounce window.
    #[must_use]
    pub fn with_debounce(debounce: Duration) -> Self {
        Self {
            debounce_ms: u64::try_from(debounce.as_millis()).unwrap_or(u64::MAX),
            last_accepted_ms: AtomicU64::new(NEVER),
            want_recording: AtomicBool::new(false),
            want_mounted: AtomicBool::new(false),
        }
    }

    /// Handle a falling edge on `button` observed at `timestamp` (monotonic).
    ///
    /// Returns `true` if the edge was accepted and toggled a flag. Rejected
    /// edges leave no trace. Never blocks and never allocates.
    pub fn on_edge(&self, button: Button, timestamp: Duration) -> bool {
        let now_ms = u64::try_from(timestamp.as_millis()).unwrap_or(NEVER - 1);
        let last = self.last_accepted_ms.load(Ordering::Acquire);
        if last != NEVER && now_ms.saturating_sub(last) < self.debounce_ms {
            return false;
        }
        if self
            .last_accepted_ms
            .compare_exchange(last, now_ms, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            // another edge won the race inside the same window
            return false;
        }

        self.flag(button).fetch_xor(true, Ordering::AcqRel);
        true
    }

    /// Read both flags.
    #[must_use]
    pub fn desired(&self) -> DesiredState {
        DesiredState {
            want_recording: self.want_recording.load(Ordering::Acquire),
            want_mounted: self.want_mounted.load(Ordering::Acquire),
        }
    }

    /// Withdraw a recording request after a failed or forced transition.
    ///
    /// Only clears the flag if it is still set, so a toggle that lands
    /// concurrently is not overwritten.
    pub fn clear_recording(&self) {
        let _ = self.want_recording.compare_exchange(
            true,
            false,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Withdraw a mount request after a failed mount.
    pub fn clear_mounted(&self) {
        let _ =
            self.want_mounted
                .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire);
    }

    /// Re-assert the mount request after an unmount failed.
    pub fn restore_mounted(&self) {
        let _ =
            self.want_mounted
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire);
    }

    /// The debounce window in use.
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    fn flag(&self, button: Button) -> &AtomicBool {
        match button {
            Button::A => &self.want_recording,
            Button::B => &self.want_mounted,
        }
    }
}

impl Default for DebouncedInput {
    fn default() -> Self {
        Self::new()
    }
}
