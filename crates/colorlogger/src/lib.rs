//! `colorlogger` - A colour sensor data logger
//!
//! Samples a four-channel colour sensor, classifies each reading into a colour
//! category and appends it to a CSV log on a removable volume. Two debounced
//! buttons toggle recording and mounting; a reconciliation loop applies the
//! requested state and reports every change to a status sink.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod acquisition;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod error;
pub mod input;
pub mod logging;
pub mod sample;
pub mod sensor;
pub mod status;
pub mod storage;
pub mod summary;

pub use acquisition::{Controller, ControllerConfig, ControllerHandle};
pub use classifier::classify;
pub use config::Config;
pub use error::{Error, Result};
pub use input::{Button, DebouncedInput};
pub use logging::init_logging;
pub use sample::{ColorLabel, ColorSample, LogRow};
pub use status::{StatusEvent, StatusSink};
pub use storage::{StorageManager, Volume};
pub use summary::LogSummary;
