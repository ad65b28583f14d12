//! Configuration types for genome breeding, mutation, crossover and animation.

use serde::{Deserialize, Serialize};

use super::{GenomeTemplate, LineageInfo};

/// Top-level breeder configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BreederConfig {
    /// Seed triple for the random source. Drawn from the OS when absent.
    #[serde(default)]
    pub seed: Option<[u32; 3]>,
    /// Mutation settings.
    #[serde(default)]
    pub mutation: MutationConfig,
    /// Crossover settings.
    #[serde(default)]
    pub crossover: CrossoverConfig,
    /// Animation (spin / interpolate) settings.
    #[serde(default)]
    pub animation: AnimationConfig,
    /// Bounding box estimation settings.
    #[serde(default)]
    pub bounds: BoundsConfig,
    /// Author stamped on lineage records.
    #[serde(default)]
    pub lineage: LineageInfo,
}

/// Mutation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationConfig {
    /// Blend factor for the all-coefficients mutation.
    #[serde(default = "default_speed")]
    pub speed: f64,
    /// Color improvement tries when only coordinates change.
    #[serde(default = "default_coord_tries")]
    pub color_coord_tries: usize,
    /// Color improvement tries when the palette may change too.
    #[serde(default = "default_palette_tries")]
    pub color_palette_tries: usize,
    /// Per-channel bucket count for color scoring.
    #[serde(default = "default_color_resolution")]
    pub color_resolution: usize,
    /// Retry guard for the all-variations mutation.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            speed: default_speed(),
            color_coord_tries: default_coord_tries(),
            color_palette_tries: default_palette_tries(),
            color_resolution: default_color_resolution(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_speed() -> f64 {
    1.0
}
fn default_coord_tries() -> usize {
    100
}
fn default_palette_tries() -> usize {
    25
}
fn default_color_resolution() -> usize {
    10
}
fn default_max_attempts() -> usize {
    100
}

/// Crossover settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossoverConfig {
    /// Retry guard for the alternate crossover.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
}

impl Default for CrossoverConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
        }
    }
}

/// Animation settings for spin / interpolation frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimationConfig {
    /// Interpolate edges with a smoothstep curve.
    #[serde(default = "default_smooth")]
    pub smooth: bool,
    /// Per-xform stagger in [0, 1].
    #[serde(default)]
    pub stagger: f64,
    /// Sub-pixel center jitter, in pixels.
    #[serde(default)]
    pub offset_x: f64,
    #[serde(default)]
    pub offset_y: f64,
    /// Template applied to every frame.
    #[serde(default)]
    pub template: Option<GenomeTemplate>,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            smooth: default_smooth(),
            stagger: 0.0,
            offset_x: 0.0,
            offset_y: 0.0,
            template: None,
        }
    }
}

fn default_smooth() -> bool {
    true
}

/// Bounding box estimation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundsConfig {
    /// Fraction of outlying samples trimmed from each side.
    #[serde(default = "default_eps")]
    pub eps: f64,
    /// Number of orbit samples.
    #[serde(default = "default_bounds_samples")]
    pub samples: usize,
}

impl Default for BoundsConfig {
    fn default() -> Self {
        Self {
            eps: default_eps(),
            samples: default_bounds_samples(),
        }
    }
}

fn default_eps() -> f64 {
    0.01
}
fn default_bounds_samples() -> usize {
    10_000
}

impl BreederConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.mutation.speed.is_finite() {
            return Err(ConfigError::InvalidSpeed);
        }
        if self.mutation.color_resolution == 0 || self.mutation.color_resolution > 256 {
            return Err(ConfigError::InvalidColorResolution(
                self.mutation.color_resolution,
            ));
        }
        if self.mutation.max_attempts == 0 || self.crossover.max_attempts == 0 {
            return Err(ConfigError::InvalidMaxAttempts);
        }
        if !(0.0..=1.0).contains(&self.animation.stagger) {
            return Err(ConfigError::InvalidStagger(self.animation.stagger));
        }
        if !(0.0..=0.5).contains(&self.bounds.eps) {
            return Err(ConfigError::InvalidEps(self.bounds.eps));
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Mutation speed must be finite")]
    InvalidSpeed,
    #[error("Color resolution must be in 1..=256, got {0}")]
    InvalidColorResolution(usize),
    #[error("Retry guards must allow at least one attempt")]
    InvalidMaxAttempts,
    #[error("Stagger must be in [0, 1], got {0}")]
    InvalidStagger(f64),
    #[error("Bounds eps must be in [0, 0.5], got {0}")]
    InvalidEps(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(BreederConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: BreederConfig =
            serde_json::from_str(r#"{"seed":[1,2,3],"mutation":{"speed":0.25}}"#).unwrap();
        assert_eq!(config.seed, Some([1, 2, 3]));
        assert_eq!(config.mutation.speed, 0.25);
        assert_eq!(config.mutation.color_coord_tries, 100);
        assert!(config.animation.smooth);
    }

    #[test]
    fn test_invalid_resolution() {
        let mut config = BreederConfig::default();
        config.mutation.color_resolution = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidColorResolution(0))
        ));
    }
}
