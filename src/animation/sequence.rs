//! Per-frame genomes for animated sequences: rotation loops and
//! interpolated edges between two genomes.

use log::debug;

use crate::compute::evolution::Breeder;
use crate::schema::{AnimationConfig, EditRecord, Genome};

use super::{Interpolate, apply_genome_motion, smoother};

/// Offsets smaller than this are not applied.
const OFFSET_TOLERANCE: f64 = 1e-8;

/// `genome` at position `blend` of one full rotation loop. Motion is
/// applied then stripped; animated affines turn by `-blend * 360` degrees.
pub fn loop_genome(genome: &Genome, blend: f64) -> Genome {
    let mut out = genome.clone();
    apply_genome_motion(&mut out, blend);
    out.rotate_affines(-blend * 360.0);
    out
}

/// Genome at `blend` along the edge from `pair[0]` to `pair[1]`, both
/// keyframes spinning as they blend.
///
/// At a sequence boundary with `blend == 0` the first genome is returned
/// as is (after motion), keeping its own interpolation settings.
pub fn edge<I: Interpolate>(
    interpolator: &I,
    pair: &[Genome; 2],
    blend: f64,
    boundary: bool,
    smooth: bool,
    stagger: f64,
) -> Genome {
    let mut keys = pair.clone();
    for g in &mut keys {
        apply_genome_motion(g, blend);
    }
    if boundary && blend == 0.0 {
        let [first, _] = keys;
        return first;
    }

    keys[0].time = 0.0;
    keys[1].time = 1.0;
    let mut aligned = interpolator.align(&keys);
    interpolator.establish_reference_angles(&mut aligned);
    for g in &mut aligned {
        g.rotate_affines(-blend * 360.0);
    }

    let t = if smooth { smoother(blend) } else { blend };
    let mut out = interpolator.interpolate(&aligned, t, stagger);
    out.delete_motion_elements();
    out
}

/// Template, frame time, sub-pixel jitter and name shared by spin frames.
fn finish_frame(genome: &mut Genome, frame: f64, anim: &AnimationConfig) {
    if let Some(template) = &anim.template {
        template.apply(genome);
    }
    genome.time = frame;

    let scale = genome.pixels_per_unit * genome.supersample.max(1) as f64;
    if scale > 0.0 {
        if anim.offset_x.abs() > OFFSET_TOLERANCE {
            genome.center_x += anim.offset_x / scale;
        }
        if anim.offset_y.abs() > OFFSET_TOLERANCE {
            genome.center_y += anim.offset_y / scale;
        }
    }
    genome.name = format!("{frame}");
}

impl<R, I> Breeder<R, I> {
    /// Frame `frame` of a rotation loop of `genome` at `blend` in [0, 1).
    pub fn spin(&self, frame: f64, genome: &Genome, blend: f64) -> Genome {
        let mut out = loop_genome(genome, blend);
        let action = format!("rotate {blend}");
        out.edits = Some(EditRecord::new(
            action.as_str(),
            Some(genome),
            None,
            &self.config().lineage,
        ));
        finish_frame(&mut out, frame, &self.config().animation);
        debug!("spin frame {frame}: {action}");
        out
    }
}

impl<R, I: Interpolate> Breeder<R, I> {
    /// Frame `frame` of the transition from `pair[0]` to `pair[1]` at `blend`.
    pub fn spin_inter(
        &self,
        frame: f64,
        pair: &[Genome; 2],
        blend: f64,
        boundary: bool,
    ) -> Genome {
        let anim = &self.config().animation;
        let mut out = edge(
            self.interpolator(),
            pair,
            blend,
            boundary,
            anim.smooth,
            anim.stagger,
        );
        let action = format!("interpolate {blend}");
        out.edits = Some(EditRecord::new(
            action.as_str(),
            Some(&pair[0]),
            Some(&pair[1]),
            &self.config().lineage,
        ));
        finish_frame(&mut out, frame, anim);
        debug!("spin_inter frame {frame}: {action}");
        out
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::animation::LinearInterpolator;
    use crate::compute::evolution::testing::{MockRenderer, linear_genome};
    use crate::compute::{PaletteCatalog, VariationCatalog};
    use crate::schema::{Affine2D, BreederConfig, GenomeTemplate, Motion};

    fn breeder_with(anim: AnimationConfig) -> Breeder<MockRenderer, LinearInterpolator> {
        let config = BreederConfig {
            seed: Some([1, 2, 3]),
            animation: anim,
            ..Default::default()
        };
        Breeder::new(
            config,
            Arc::new(VariationCatalog::builtin()),
            Arc::new(PaletteCatalog::builtin()),
            MockRenderer::default(),
            LinearInterpolator,
        )
        .unwrap()
    }

    #[test]
    fn test_loop_quarter_turn() {
        let mut g = linear_genome(2);
        g.xforms[0].affine = Affine2D::identity();
        let out = loop_genome(&g, 0.25);
        let a = out.xforms[0].affine;
        assert!(a.a.abs() < 1e-12);
        assert!((a.d + 1.0).abs() < 1e-12);
        assert_eq!(out.xforms[0].affine.c, g.xforms[0].affine.c);
    }

    #[test]
    fn test_loop_strips_motion() {
        let mut g = linear_genome(2);
        g.xforms[1].motion.push(Motion {
            color_x: 0.5,
            ..Default::default()
        });
        let out = loop_genome(&g, 0.0);
        assert!(!out.has_motion());
        assert_eq!(out.xforms[0].affine, g.xforms[0].affine);
    }

    #[test]
    fn test_edge_boundary_returns_first() {
        let mut a = linear_genome(2);
        a.brightness = 7.0;
        let b = linear_genome(3);
        let out = edge(&LinearInterpolator, &[a.clone(), b], 0.0, true, true, 0.0);
        assert_eq!(out, a);
    }

    #[test]
    fn test_edge_endpoints_match_keys() {
        let mut a = linear_genome(2);
        let mut b = linear_genome(2);
        a.brightness = 2.0;
        b.brightness = 6.0;
        let pair = [a, b];
        let start = edge(&LinearInterpolator, &pair, 0.0, false, true, 0.0);
        let mid = edge(&LinearInterpolator, &pair, 0.5, false, true, 0.0);
        assert!((start.brightness - 2.0).abs() < 1e-12);
        assert!((mid.brightness - 4.0).abs() < 1e-12);
        assert!(!mid.has_motion());
    }

    #[test]
    fn test_spin_stamps_frame() {
        let b = breeder_with(AnimationConfig::default());
        let g = linear_genome(2);
        let out = b.spin(12.0, &g, 0.5);
        assert_eq!(out.time, 12.0);
        assert_eq!(out.name, "12");
        let edits = out.edits.unwrap();
        assert_eq!(edits.action, "rotate 0.5");
        assert_eq!(edits.parents.len(), 1);
    }

    #[test]
    fn test_spin_applies_template_and_offset() {
        let anim = AnimationConfig {
            offset_x: 5.0,
            template: Some(GenomeTemplate {
                supersample: Some(2),
                quality: Some(500.0),
                ..Default::default()
            }),
            ..Default::default()
        };
        let b = breeder_with(anim);
        let g = linear_genome(2);
        let out = b.spin(0.0, &g, 0.0);
        assert_eq!(out.supersample, 2);
        assert_eq!(out.quality, 500.0);
        assert!((out.center_x - 5.0 / (g.pixels_per_unit * 2.0)).abs() < 1e-12);
        assert_eq!(out.center_y, g.center_y);
    }

    #[test]
    fn test_offset_axes_use_tolerance_separately() {
        let anim = AnimationConfig {
            offset_x: 4.0,
            offset_y: 1e-9,
            ..Default::default()
        };
        let mut g = linear_genome(2);
        g.center_y = 0.125;
        let scale = g.pixels_per_unit * g.supersample.max(1) as f64;
        finish_frame(&mut g, 1.0, &anim);
        assert!((g.center_x - 4.0 / scale).abs() < 1e-12);
        assert_eq!(g.center_y, 0.125);

        let anim = AnimationConfig {
            offset_x: 1e-9,
            offset_y: -2.0,
            ..Default::default()
        };
        let mut g = linear_genome(2);
        finish_frame(&mut g, 2.0, &anim);
        assert_eq!(g.center_x, 0.0);
        assert!((g.center_y + 2.0 / scale).abs() < 1e-12);
    }

    #[test]
    fn test_spin_inter_records_both_parents() {
        let b = breeder_with(AnimationConfig::default());
        let pair = [linear_genome(2), linear_genome(3)];
        let out = b.spin_inter(3.0, &pair, 0.25, false);
        assert_eq!(out.time, 3.0);
        assert_eq!(out.xforms.len(), 3);
        assert_eq!(out.edits.map(|e| e.parents.len()), Some(2));
    }
}
