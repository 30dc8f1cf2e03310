//! Log file summaries.
//!
//! Reads a log written by a recording session back in, checks it, and reports
//! per-label counts and per-channel statistics.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::sample::{ColorLabel, LogRow, CSV_HEADER};

/// Number of rows carrying each label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LabelCount {
    /// The label.
    pub label: ColorLabel,
    /// Rows carrying it.
    pub count: u32,
}

/// Minimum, maximum and mean of one sensor channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChannelStats {
    /// Smallest reading.
    pub min: u16,
    /// Largest reading.
    pub max: u16,
    /// Mean reading.
    pub mean: f64,
}

/// Statistics for all four channels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SampleStats {
    /// Clear channel.
    pub clear: ChannelStats,
    /// Red channel.
    pub red: ChannelStats,
    /// Green channel.
    pub green: ChannelStats,
    /// Blue channel.
    pub blue: ChannelStats,
}

/// A place where the row index did not follow on from the previous row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexGap {
    /// 1-based line number in the file.
    pub line: usize,
    /// Index that should have appeared.
    pub expected: u32,
    /// Index that did appear.
    pub found: u32,
}

/// Summary of one log file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogSummary {
    /// Number of data rows.
    pub rows: u32,
    /// Label counts in label order, zero counts omitted.
    pub labels: Vec<LabelCount>,
    /// Channel statistics, absent for an empty log.
    pub stats: Option<SampleStats>,
    /// Index discontinuities.
    pub gaps: Vec<IndexGap>,
}

#[derive(Debug, Default)]
struct ChannelAccumulator {
    min: u16,
    max: u16,
    sum: u64,
}

impl ChannelAccumulator {
    fn push(&mut self, value: u16, first: bool) {
        if first {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.sum += u64::from(value);
    }

    #[allow(clippy::cast_precision_loss)]
    fn finish(&self, rows: u32) -> ChannelStats {
        ChannelStats {
            min: self.min,
            max: self.max,
            mean: self.sum as f64 / f64::from(rows),
        }
    }
}

impl LogSummary {
    /// Summarise the log file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, does not start with the
    /// log header, or contains a malformed row.
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file), path)
    }

    /// Summarise a log read from `reader`. `path` is only used in errors.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails, the header is missing, or a row is
    /// malformed.
    pub fn from_reader<R: BufRead>(reader: R, path: &Path) -> Result<Self> {
        let mut lines = reader.lines();

        let header = lines.next().transpose()?;
        if header.as_deref().map(str::trim_end) != Some(CSV_HEADER) {
            return Err(Error::LogHeader {
                path: path.to_path_buf(),
            });
        }

        let mut counts = [0u32; ColorLabel::ALL.len()];
        let mut channels: [ChannelAccumulator; 4] = Default::default();
        let mut gaps = Vec::new();
        let mut rows = 0u32;
        let mut expected = 1u32;

        for (offset, line) in lines.enumerate() {
            let line = line?;
            let line_number = offset + 2;
            if line.trim().is_empty() {
                continue;
            }

            let row: LogRow = line.parse().map_err(|source| Error::LogParse {
                path: path.to_path_buf(),
                line: line_number,
                source,
            })?;

            if row.index != expected {
                debug!(line = line_number, expected, found = row.index, "Index gap");
                gaps.push(IndexGap {
                    line: line_number,
                    expected,
                    found: row.index,
                });
            }
            expected = row.index.saturating_add(1);

            if let Some(slot) = ColorLabel::ALL.iter().position(|l| *l == row.label) {
                counts[slot] += 1;
            }

            let first = rows == 0;
            let sample = row.sample;
            for (acc, value) in channels
                .iter_mut()
                .zip([sample.clear, sample.red, sample.green, sample.blue])
            {
                acc.push(value, first);
            }
            rows += 1;
        }

        let labels = ColorLabel::ALL
            .iter()
            .zip(counts)
            .filter(|(_, count)| *count > 0)
            .map(|(label, count)| LabelCount {
                label: *label,
                count,
            })
            .collect();

        let stats = (rows > 0).then(|| {
            let [clear, red, green, blue] = &channels;
            SampleStats {
                clear: clear.finish(rows),
                red: red.finish(rows),
                green: green.finish(rows),
                blue: blue.finish(rows),
            }
        });

        Ok(Self {
            rows,
            labels,
            stats,
            gaps,
        })
    }

    /// Whether indices run 1, 2, 3, ... without gaps.
    #[must_use]
    pub fn is_contiguous(&self) -> bool {
        self.gaps.is_empty()
    }

    /// Count for a single label.
    #[must_use]
    pub fn count(&self, label: ColorLabel) -> u32 {
        self.labels
            .iter()
            .find(|c| c.label == label)
            .map_or(0, |c| c.count)
    }

    /// Rows the classifier could not assign a colour to.
    #[must_use]
    pub fn undetermined(&self) -> u32 {
        self.labels
            .iter()
            .filter(|c| c.label.is_undetermined())
            .map(|c| c.count)
            .sum()
    }

    /// The most frequent label, ties going to the earlier label.
    #[must_use]
    pub fn dominant(&self) -> Option<ColorLabel> {
        self.labels
            .iter()
            .fold(None::<LabelCount>, |best, c| match best {
                Some(b) if b.count >= c.count => Some(b),
                _ => Some(*c),
            })
            .map(|c| c.label)
    }

    /// Time covered by the log at the given sampling period, saturating at
    /// [`Duration::MAX`].
    #[must_use]
    pub fn duration(&self, sample_period: Duration) -> Duration {
        sample_period
            .checked_mul(self.rows)
            .unwrap_or(Duration::MAX)
    }
}
