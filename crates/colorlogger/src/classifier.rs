//! Colour classification heuristic.
//!
//! Maps a raw [`ColorSample`] to a [`ColorLabel`] by walking an ordered list of
//! rules over the normalized colour channels. The first matching rule wins and
//! the final fallback is [`ColorLabel::Unknown`], so the function is total.

use crate::sample::{ColorLabel, ColorSample};

/// Below this clear-channel reading the scene is considered dark.
pub const DARK_THRESHOLD: u16 = 30;

/// Red/green ratio substituted when the green channel reads zero.
pub const RATIO_SENTINEL: f64 = 99.0;

/// Maximum spread between normalized channels for an achromatic reading.
const BALANCE_TOLERANCE: f64 = 0.15;

/// Classify a sensor reading.
///
/// Pure and deterministic: the same sample always yields the same label.
#[must_use]
pub fn classify(sample: ColorSample) -> ColorLabel {
    let clear = sample.clear;
    if clear < DARK_THRESHOLD {
        return ColorLabel::UndeterminedDark;
    }

    let total = sample.rgb_total();
    if total == 0 {
        return ColorLabel::UndeterminedNoData;
    }

    let total = f64::from(total);
    let rn = f64::from(sample.red) / total;
    let gn = f64::from(sample.green) / total;
    let bn = f64::from(sample.blue) / total;
    let ratio = if sample.green > 0 {
        f64::from(sample.red) / f64::from(sample.green)
    } else {
        RATIO_SENTINEL
    };

    if ratio > 1.15 {
        return if bn < 0.23 {
            ColorLabel::Orange
        } else {
            ColorLabel::Red
        };
    }
    if ratio > 0.85 && ratio <= 1.15 {
        return if clear > 400 {
            ColorLabel::Gold
        } else {
            ColorLabel::Yellow
        };
    }
    if gn > rn && gn > bn {
        return ColorLabel::Green;
    }
    if bn > rn && bn > gn {
        return ColorLabel::Blue;
    }
    if bn > 0.4 && rn > 0.3 && gn < 0.3 {
        return ColorLabel::Violet;
    }
    if ratio > 1.2 && clear > 30 && clear < 80 {
        return ColorLabel::Brown;
    }

    if is_balanced(rn, gn, bn) {
        if clear > 600 {
            return ColorLabel::White;
        }
        if clear > 300 {
            return ColorLabel::Silver;
        }
        if clear > 80 {
            return ColorLabel::Gray;
        }
    }

    ColorLabel::Unknown
}

fn is_balanced(rn: f64, gn: f64, bn: f64) -> bool {
    (rn - gn).abs() < BALANCE_TOLERANCE
        && (gn - bn).abs() < BALANCE_TOLERANCE
        && (rn - bn).abs() < BALANCE_TOLERANCE
}
