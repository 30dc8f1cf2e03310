//! Colour sensor abstraction.
//!
//! The real device is read over I2C; the controller only needs
//! [`ColorSensor::read_sample`]. A bus fault is indistinguishable from an
//! all-zero reading at this interface.

use crate::sample::ColorSample;

/// Source of raw colour readings.
pub trait ColorSensor {
    /// Take one reading. Blocks briefly on the bus.
    fn read_sample(&mut self) -> ColorSample;
}

impl<F> ColorSensor for F
where
    F: FnMut() -> ColorSample,
{
    fn read_sample(&mut self) -> ColorSample {
        self()
    }
}

/// A sensor that replays a fixed list of readings in a loop.
///
/// Each reading is repeated `hold` times before moving on, which looks like a
/// sensor being held over a series of coloured cards.
#[derive(Debug, Clone)]
pub struct ScriptedSensor {
    samples: Vec<ColorSample>,
    hold: u32,
    position: usize,
    repeat: u32,
}

impl ScriptedSensor {
    /// Replay `samples`, one per read.
    #[must_use]
    pub fn new(samples: Vec<ColorSample>) -> Self {
        Self::with_hold(samples, 1)
    }

    /// Replay `samples`, each held for `hold` reads.
    #[must_use]
    pub fn with_hold(samples: Vec<ColorSample>, hold: u32) -> Self {
        Self {
            samples,
            hold: hold.max(1),
            position: 0,
            repeat: 0,
        }
    }

    /// A demonstration sequence covering the main colour categories.
    #[must_use]
    pub fn palette(hold: u32) -> Self {
        Self::with_hold(
            vec![
                ColorSample::new(12, 3, 4, 3),
                ColorSample::new(520, 310, 110, 60),
                ColorSample::new(480, 260, 120, 190),
                ColorSample::new(620, 210, 200, 90),
                ColorSample::new(240, 160, 150, 70),
                ColorSample::new(300, 70, 190, 80),
                ColorSample::new(280, 50, 90, 200),
                ColorSample::new(720, 170, 210, 210),
                ColorSample::new(380, 85, 105, 105),
                ColorSample::new(150, 30, 36, 36),
            ],
            hold,
        )
    }
}

impl ColorSensor for ScriptedSensor {
    fn read_sample(&mut self) -> ColorSample {
        let Some(sample) = self.samples.get(self.position).copied() else {
            return ColorSample::default();
        };
        self.repeat += 1;
        if self.repeat >= self.hold {
            self.repeat = 0;
            self.position = (self.position + 1) % self.samples.len();
        }
        sample
    }
}
