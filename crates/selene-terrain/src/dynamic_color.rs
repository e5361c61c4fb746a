//! Time-oscillating colors substituted for sentinel voxels at read time.

use std::f64::consts::TAU;

use selene_config::{DynamicColorConfig, TerrainConfig};
use serde::{Deserialize, Serialize};

/// Which dynamic color a sentinel voxel selects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DynamicSlot {
    /// Slot 0: red sentinel (full color) or white `0xFF` (monochrome).
    Primary,
    /// Slot 1: green sentinel (full color) or white `0xFD`/`0xFE` (monochrome).
    Secondary,
}

impl DynamicSlot {
    fn index(self) -> usize {
        match self {
            DynamicSlot::Primary => 0,
            DynamicSlot::Secondary => 1,
        }
    }
}

/// A color oscillating sinusoidally between `min` and `max`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DynamicColor {
    pub min: [u8; 3],
    pub max: [u8; 3],
    /// Full period in seconds. A period `<= 0` pins the color at `min`.
    pub period_seconds: f32,
    current: [u8; 3],
}

impl DynamicColor {
    pub fn new(min: [u8; 3], max: [u8; 3], period_seconds: f32) -> Self {
        Self {
            min,
            max,
            period_seconds,
            current: min,
        }
    }

    pub fn from_config(config: &DynamicColorConfig) -> Self {
        Self::new(config.min, config.max, config.period_seconds)
    }

    /// Oscillator position in `[0, 1]` at `now_millis`.
    pub fn progress(&self, now_millis: u64) -> f64 {
        let period_ms = self.period_seconds as f64 * 1000.0;
        if period_ms.is_nan() || period_ms <= 0.0 {
            return 0.0;
        }
        let phase = (now_millis as f64).rem_euclid(period_ms) / period_ms;
        ((phase * TAU).sin() + 1.0) / 2.0
    }

    /// Color at `now_millis`, truncated per channel.
    pub fn evaluate(&self, now_millis: u64) -> [u8; 3] {
        let progress = self.progress(now_millis);
        std::array::from_fn(|c| {
            let min = self.min[c] as f64;
            let max = self.max[c] as f64;
            (min + progress * (max - min)) as u8
        })
    }

    /// Recompute the current color.
    pub fn update(&mut self, now_millis: u64) {
        self.current = self.evaluate(now_millis);
    }

    /// Color as of the last [`update`](Self::update).
    pub fn current(&self) -> [u8; 3] {
        self.current
    }
}

/// The two dynamic color slots.
#[derive(Clone, Debug, PartialEq)]
pub struct DynamicPalette {
    slots: [DynamicColor; 2],
}

impl DynamicPalette {
    pub fn new(primary: DynamicColor, secondary: DynamicColor) -> Self {
        Self {
            slots: [primary, secondary],
        }
    }

    pub fn from_config(config: &TerrainConfig) -> Self {
        Self::new(
            DynamicColor::from_config(&config.dynamic_primary),
            DynamicColor::from_config(&config.dynamic_secondary),
        )
    }

    pub fn slot(&self, slot: DynamicSlot) -> &DynamicColor {
        &self.slots[slot.index()]
    }

    /// Replace one oscillator. The new color applies from the next update.
    pub fn set_slot(&mut self, slot: DynamicSlot, min: [u8; 3], max: [u8; 3], period_seconds: f32) {
        let current = self.slots[slot.index()].current;
        self.slots[slot.index()] = DynamicColor {
            current,
            ..DynamicColor::new(min, max, period_seconds)
        };
    }

    pub fn update(&mut self, now_millis: u64) {
        for slot in &mut self.slots {
            slot.update(now_millis);
        }
    }

    /// Current color of `slot`.
    pub fn color(&self, slot: DynamicSlot) -> [u8; 3] {
        self.slots[slot.index()].current()
    }
}

impl Default for DynamicPalette {
    fn default() -> Self {
        Self::from_config(&TerrainConfig::default())
    }
}
