//! Core sample types for colorlogger.
//!
//! This module defines the raw sensor reading, the closed set of colour labels
//! the classifier can produce, and the log row written for every sample.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Header line written at the top of every log file.
pub const CSV_HEADER: &str = "Amostra,Clear,Red,Green,Blue,cor";

/// A raw reading from the colour sensor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColorSample {
    /// Unfiltered (clear) channel intensity.
    pub clear: u16,
    /// Red channel intensity.
    pub red: u16,
    /// Green channel intensity.
    pub green: u16,
    /// Blue channel intensity.
    pub blue: u16,
}

impl ColorSample {
    /// Create a sample from its four channels.
    #[must_use]
    pub const fn new(clear: u16, red: u16, green: u16, blue: u16) -> Self {
        Self {
            clear,
            red,
            green,
            blue,
        }
    }

    /// Sum of the three colour channels (clear excluded).
    #[must_use]
    pub fn rgb_total(&self) -> u32 {
        u32::from(self.red) + u32::from(self.green) + u32::from(self.blue)
    }
}

impl fmt::Display for ColorSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "C:{} R:{} G:{} B:{}",
            self.clear, self.red, self.green, self.blue
        )
    }
}

/// A colour category assigned to a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColorLabel {
    /// Too little light to tell anything.
    UndeterminedDark,
    /// Light present but all colour channels read zero.
    UndeterminedNoData,
    /// Red-dominant with little blue.
    Orange,
    /// Red-dominant.
    Red,
    /// Red and green balanced, bright.
    Gold,
    /// Red and green balanced.
    Yellow,
    /// Green-dominant.
    Green,
    /// Blue-dominant.
    Blue,
    /// Blue and red high, green low.
    Violet,
    /// Dim red-dominant.
    Brown,
    /// Balanced and very bright.
    White,
    /// Balanced and bright.
    Silver,
    /// Balanced and moderately lit.
    Gray,
    /// No rule matched.
    Unknown,
}

impl ColorLabel {
    /// Every label, in rule order.
    pub const ALL: [Self; 14] = [
        Self::UndeterminedDark,
        Self::UndeterminedNoData,
        Self::Orange,
        Self::Red,
        Self::Gold,
        Self::Yellow,
        Self::Green,
        Self::Blue,
        Self::Violet,
        Self::Brown,
        Self::White,
        Self::Silver,
        Self::Gray,
        Self::Unknown,
    ];

    /// The tag written to the log file.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::UndeterminedDark => "undetermined-dark",
            Self::UndeterminedNoData => "undetermined-no-data",
            Self::Orange => "orange",
            Self::Red => "red",
            Self::Gold => "gold",
            Self::Yellow => "yellow",
            Self::Green => "green",
            Self::Blue => "blue",
            Self::Violet => "violet",
            Self::Brown => "brown",
            Self::White => "white",
            Self::Silver => "silver",
            Self::Gray => "gray",
            Self::Unknown => "unknown",
        }
    }

    /// Whether the classifier could not decide on a colour at all.
    #[must_use]
    pub const fn is_undetermined(&self) -> bool {
        matches!(self, Self::UndeterminedDark | Self::UndeterminedNoData)
    }
}

impl fmt::Display for ColorLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColorLabel {
    type Err = RowParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|label| label.as_str() == s)
            .ok_or_else(|| RowParseError::UnknownLabel(s.to_string()))
    }
}

/// Errors produced when reading a log row back from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowParseError {
    /// The line did not have six comma-separated fields.
    #[error("expected 6 fields, found {0}")]
    FieldCount(usize),

    /// A numeric field could not be parsed.
    #[error("invalid {field} value '{value}'")]
    InvalidNumber {
        /// Column name.
        field: &'static str,
        /// Raw text of the field.
        value: String,
    },

    /// The label column held an unknown tag.
    #[error("unknown colour label '{0}'")]
    UnknownLabel(String),
}

/// One line of the log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRow {
    /// 1-based position of the row within its session.
    pub index: u32,
    /// The reading.
    pub sample: ColorSample,
    /// The classifier output for the reading.
    pub label: ColorLabel,
}

impl LogRow {
    /// Render the row as a CSV line, without the trailing newline.
    #[must_use]
    pub fn to_csv_line(&self) -> String {
        format!(
            "{},{},{},{},{},{}",
            self.index,
            self.sample.clear,
            self.sample.red,
            self.sample.green,
            self.sample.blue,
            self.label
        )
    }
}

impl FromStr for LogRow {
    type Err = RowParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split(',').collect();
        if fields.len() != 6 {
            return Err(RowParseError::FieldCount(fields.len()));
        }

        let index = parse_field::<u32>("index", fields[0])?;
        let sample = ColorSample {
            clear: parse_field("clear", fields[1])?,
            red: parse_field("red", fields[2])?,
            green: parse_field("green", fields[3])?,
            blue: parse_field("blue", fields[4])?,
        };
        let label = fields[5].trim().parse()?;

        Ok(Self {
            index,
            sample,
            label,
        })
    }
}

fn parse_field<T: FromStr>(field: &'static str, value: &str) -> Result<T, RowParseError> {
    value
        .trim()
        .parse()
        .map_err(|_| RowParseError::InvalidNumber {
            field,
            value: value.to_string(),
        })
}
