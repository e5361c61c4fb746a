//! Raymarch distance bands and far-band fog.

use selene_config::BandConfig;

/// Near/mid/far band boundaries in world units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bands {
    pub near: f32,
    pub mid: f32,
    pub far: f32,
}

impl Bands {
    pub fn new(near: f32, mid: f32, far: f32) -> Self {
        Self { near, mid, far }
    }

    /// Default boundaries for a projection with the given screen distance.
    pub fn from_screen_distance(screen_distance: f32) -> Self {
        Self {
            near: (screen_distance * 0.2).trunc(),
            mid: (screen_distance * 1.5).trunc(),
            far: (screen_distance * 4.5).trunc(),
        }
    }
}

impl From<BandConfig> for Bands {
    fn from(config: BandConfig) -> Self {
        Self::new(config.near, config.mid, config.far)
    }
}

/// Linear fog over `[start, start + length]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fog {
    pub start: f32,
    pub length: f32,
}

impl Fog {
    pub fn new(start: f32, length: f32) -> Self {
        Self { start, length }
    }

    /// Fog over the last fifth of the far band.
    pub fn from_bands(bands: &Bands) -> Self {
        let start = (bands.mid + 0.8 * (bands.far - bands.mid)).trunc();
        Self {
            start,
            length: bands.far - start,
        }
    }

    /// Fog weight at `distance`: 0 before `start`, 1 or more once fully fogged.
    pub fn weight(&self, distance: f32) -> f32 {
        if distance <= self.start {
            0.0
        } else if self.length <= 0.0 {
            1.0
        } else {
            (distance - self.start) / self.length
        }
    }

    /// `color·(1−w) + fog·w`, rounded. `w` is clamped to `[0, 1]`.
    pub fn blend(color: [u8; 3], fog_color: [u8; 3], weight: f32) -> [u8; 3] {
        let w = weight.clamp(0.0, 1.0);
        std::array::from_fn(|c| {
            (color[c] as f32 * (1.0 - w) + fog_color[c] as f32 * w).round() as u8
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bands_truncate() {
        let bands = Bands::from_screen_distance(190.7);
        assert_eq!(bands, Bands::new(38.0, 286.0, 858.0));
    }

    #[test]
    fn test_fog_from_bands() {
        let fog = Fog::from_bands(&Bands::new(10.0, 100.0, 400.0));
        assert_eq!(fog, Fog::new(340.0, 60.0));
    }

    #[test]
    fn test_fog_weight() {
        let fog = Fog::new(10.0, 5.0);
        assert_eq!(fog.weight(8.0), 0.0);
        assert_eq!(fog.weight(10.0), 0.0);
        assert!((fog.weight(12.0) - 0.4).abs() < 1e-6);
        assert!(fog.weight(15.0) >= 1.0);
        assert!(fog.weight(30.0) >= 1.0);
    }

    #[test]
    fn test_zero_length_fog_is_a_wall() {
        let fog = Fog::new(10.0, 0.0);
        assert_eq!(fog.weight(9.0), 0.0);
        assert_eq!(fog.weight(10.5), 1.0);
    }

    #[test]
    fn test_fog_blend() {
        assert_eq!(Fog::blend([100, 200, 0], [0, 0, 0], 0.4), [60, 120, 0]);
        assert_eq!(Fog::blend([100, 200, 0], [255, 255, 255], 0.0), [100, 200, 0]);
        assert_eq!(Fog::blend([100, 200, 0], [50, 50, 50], 1.0), [50, 50, 50]);
    }

    #[test]
    fn test_band_config_conversion() {
        let bands: Bands = BandConfig {
            near: 1.0,
            mid: 2.0,
            far: 4.0,
        }
        .into();
        assert_eq!(bands, Bands::new(1.0, 2.0, 4.0));
    }
}
