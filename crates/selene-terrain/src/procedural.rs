//! Procedural tile source: multi-octave fBm simplex noise with banded colors.

use noise::{NoiseFn, Simplex};
use selene_config::TileFormat;

use crate::source::{FetchError, TileRequest, TileSource};

/// Noise parameters for [`ProceduralSource`].
#[derive(Clone, Debug)]
pub struct ProceduralParams {
    /// Seed for deterministic generation.
    pub seed: u32,
    /// Number of octaves to composite.
    pub octaves: u32,
    /// Frequency multiplier between successive octaves.
    pub lacunarity: f64,
    /// Amplitude multiplier between successive octaves.
    pub persistence: f64,
    /// Frequency of the first octave, in cycles per voxel.
    pub base_frequency: f64,
}

impl Default for ProceduralParams {
    fn default() -> Self {
        Self {
            seed: 0,
            octaves: 5,
            lacunarity: 2.0,
            persistence: 0.5,
            base_frequency: 0.004,
        }
    }
}

/// Synthesizes tile payloads from fBm noise.
pub struct ProceduralSource {
    noise: Simplex,
    params: ProceduralParams,
    format: TileFormat,
    edge: u32,
}

impl ProceduralSource {
    pub fn new(params: ProceduralParams, format: TileFormat, edge: u32) -> Self {
        Self {
            noise: Simplex::new(params.seed),
            params,
            format,
            edge,
        }
    }

    /// Elevation byte at voxel `(x, y)` in world coordinates.
    pub fn elevation_at(&self, x: f64, y: f64) -> u8 {
        let mut total = 0.0;
        let mut amplitude_sum = 0.0;
        let mut frequency = self.params.base_frequency;
        let mut amplitude = 1.0;

        for _ in 0..self.params.octaves {
            total += self.noise.get([x * frequency, y * frequency]) * amplitude;
            amplitude_sum += amplitude;
            frequency *= self.params.lacunarity;
            amplitude *= self.params.persistence;
        }

        if amplitude_sum == 0.0 {
            return 0;
        }
        let normalized = (total / amplitude_sum + 1.0) * 0.5;
        (normalized.clamp(0.0, 1.0) * 255.0) as u8
    }

    /// Record bytes for one voxel. Colors never hit a dynamic sentinel.
    fn record(&self, elevation: u8, out: &mut Vec<u8>) {
        match self.format {
            TileFormat::FullColor => {
                let [r, g, b] = band_color(elevation);
                out.extend_from_slice(&[elevation, r, g, b]);
            }
            TileFormat::Monochrome => {
                let white = 0x40 + elevation / 2;
                out.extend_from_slice(&[elevation, white.min(0xFC)]);
            }
        }
    }
}

/// Color by elevation band: lowland dust, regolith, highland, peaks.
fn band_color(elevation: u8) -> [u8; 3] {
    match elevation {
        0..=63 => [0x50, 0x4C, 0x48],
        64..=127 => [0x78, 0x74, 0x6E],
        128..=191 => [0xA0, 0x9C, 0x94],
        _ => [0xD8, 0xD4, 0xCC],
    }
}

impl TileSource for ProceduralSource {
    fn fetch(&self, request: &TileRequest) -> Result<Vec<u8>, FetchError> {
        let edge = self.edge as usize;
        let mut payload = Vec::with_capacity(edge * edge * self.format.bytes_per_voxel());
        let base_x = request.coord.column as f64 * self.edge as f64;
        let base_y = request.coord.row as f64 * self.edge as f64;

        for ly in 0..self.edge {
            for lx in 0..self.edge {
                let elevation = self.elevation_at(base_x + lx as f64, base_y + ly as f64);
                self.record(elevation, &mut payload);
            }
        }

        Ok(payload)
    }
}
