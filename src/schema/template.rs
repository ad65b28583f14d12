//! Genome templates: render-parameter overrides applied to generated frames.

use serde::{Deserialize, Serialize};

use super::{Genome, Interpolation};

/// Sentinel for an unset zoom in sentinel-coded templates.
pub const UNSET_ZOOM: f64 = 999_999_999.0;
/// Sentinel for an unset temporal filter exponent.
pub const UNSET_TEMPORAL_EXP: f64 = -999.0;

/// Overrides applied on top of a genome. `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenomeTemplate {
    pub background: [Option<f64>; 3],
    pub zoom: Option<f64>,
    pub supersample: Option<usize>,
    pub width: Option<usize>,
    pub height: Option<usize>,
    pub de_max_radius: Option<f64>,
    pub de_min_radius: Option<f64>,
    pub de_curve: Option<f64>,
    pub gamma_threshold: Option<f64>,
    pub quality: Option<f64>,
    pub spatial_filter_radius: Option<f64>,
    pub temporal_samples: Option<usize>,
    pub temporal_filter_width: Option<f64>,
    pub temporal_filter_exp: Option<f64>,
    pub highlight_power: Option<f64>,
    pub interpolation: Option<Interpolation>,
}

fn set_if<T: Copy>(value: T, is_set: impl Fn(T) -> bool) -> Option<T> {
    is_set(value).then_some(value)
}

impl GenomeTemplate {
    /// Read a template from a sentinel-coded genome.
    ///
    /// A field counts as set when it passes its test:
    ///
    /// | field                   | set when          |
    /// |-------------------------|-------------------|
    /// | background channel      | `>= 0`            |
    /// | zoom                    | `< 999999998`     |
    /// | supersample             | `> 0`             |
    /// | width, height           | `> 0`             |
    /// | DE max/min radius, curve| `>= 0`            |
    /// | gamma threshold         | `>= 0`            |
    /// | quality                 | `> 0`             |
    /// | spatial filter radius   | `>= 0`            |
    /// | temporal samples        | `> 0`             |
    /// | temporal filter width   | `> 0`             |
    /// | temporal filter exponent| `> -900`          |
    /// | highlight power         | `>= 0`            |
    ///
    /// Interpolation is always taken from the template genome.
    pub fn from_sentinels(templ: &Genome) -> Self {
        Self {
            background: templ.background.map(|c| set_if(c, |v| v >= 0.0)),
            zoom: set_if(templ.zoom, |v| v < 999_999_998.0),
            supersample: set_if(templ.supersample, |v| v > 0),
            width: set_if(templ.width, |v| v > 0),
            height: set_if(templ.height, |v| v > 0),
            de_max_radius: set_if(templ.de_max_radius, |v| v >= 0.0),
            de_min_radius: set_if(templ.de_min_radius, |v| v >= 0.0),
            de_curve: set_if(templ.de_curve, |v| v >= 0.0),
            gamma_threshold: set_if(templ.gamma_threshold, |v| v >= 0.0),
            quality: set_if(templ.quality, |v| v > 0.0),
            spatial_filter_radius: set_if(templ.spatial_filter_radius, |v| v >= 0.0),
            temporal_samples: set_if(templ.temporal_samples, |v| v > 0),
            temporal_filter_width: set_if(templ.temporal_filter_width, |v| v > 0.0),
            temporal_filter_exp: set_if(templ.temporal_filter_exp, |v| v > -900.0),
            highlight_power: set_if(templ.highlight_power, |v| v >= 0.0),
            interpolation: Some(templ.interpolation),
        }
    }

    /// A genome with every templated field holding its "unset" sentinel.
    pub fn sentinel_genome() -> Genome {
        Genome {
            background: [-1.0; 3],
            zoom: UNSET_ZOOM,
            supersample: 0,
            width: 0,
            height: 0,
            de_max_radius: -1.0,
            de_min_radius: -1.0,
            de_curve: -1.0,
            gamma_threshold: -1.0,
            quality: 0.0,
            spatial_filter_radius: -1.0,
            temporal_samples: 0,
            temporal_filter_width: 0.0,
            temporal_filter_exp: UNSET_TEMPORAL_EXP,
            highlight_power: -1.0,
            ..Default::default()
        }
    }

    /// Override `genome` with every set field. A width change keeps the image scale.
    pub fn apply(&self, genome: &mut Genome) {
        for (dst, src) in genome.background.iter_mut().zip(self.background) {
            if let Some(v) = src {
                *dst = v;
            }
        }
        if let Some(v) = self.zoom {
            genome.zoom = v;
        }
        if let Some(v) = self.supersample {
            genome.supersample = v;
        }
        if let Some(w) = self.width {
            if genome.width > 0 {
                genome.pixels_per_unit = genome.pixels_per_unit / genome.width as f64 * w as f64;
            }
            genome.width = w;
        }
        if let Some(v) = self.height {
            genome.height = v;
        }
        if let Some(v) = self.de_max_radius {
            genome.de_max_radius = v;
        }
        if let Some(v) = self.de_min_radius {
            genome.de_min_radius = v;
        }
        if let Some(v) = self.de_curve {
            genome.de_curve = v;
        }
        if let Some(v) = self.gamma_threshold {
            genome.gamma_threshold = v;
        }
        if let Some(v) = self.quality {
            genome.quality = v;
        }
        if let Some(v) = self.spatial_filter_radius {
            genome.spatial_filter_radius = v;
        }
        if let Some(v) = self.temporal_samples {
            genome.temporal_samples = v;
        }
        if let Some(v) = self.temporal_filter_width {
            genome.temporal_filter_width = v;
        }
        if let Some(v) = self.temporal_filter_exp {
            genome.temporal_filter_exp = v;
        }
        if let Some(v) = self.highlight_power {
            genome.highlight_power = v;
        }
        if let Some(v) = self.interpolation {
            genome.interpolation = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_genome_sets_nothing() {
        let mut templ = GenomeTemplate::from_sentinels(&GenomeTemplate::sentinel_genome());
        templ.interpolation = None;
        assert_eq!(templ, GenomeTemplate::default());
    }

    #[test]
    fn test_only_valid_fields_override() {
        let mut sentinel = GenomeTemplate::sentinel_genome();
        sentinel.background = [0.2, -1.0, 0.0];
        sentinel.zoom = 1.5;
        sentinel.supersample = 3;
        sentinel.temporal_filter_exp = -950.0;

        let templ = GenomeTemplate::from_sentinels(&sentinel);
        let mut g = Genome {
            background: [0.9, 0.9, 0.9],
            temporal_filter_exp: 0.5,
            ..Default::default()
        };
        templ.apply(&mut g);

        assert_eq!(g.background, [0.2, 0.9, 0.0]);
        assert_eq!(g.zoom, 1.5);
        assert_eq!(g.supersample, 3);
        assert_eq!(g.temporal_filter_exp, 0.5);
    }

    #[test]
    fn test_width_preserves_scale() {
        let templ = GenomeTemplate {
            width: Some(200),
            ..Default::default()
        };
        let mut g = Genome::default();
        templ.apply(&mut g);
        assert_eq!(g.width, 200);
        assert!((g.pixels_per_unit - 100.0).abs() < 1e-12);
    }
}
