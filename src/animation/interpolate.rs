//! Structural alignment and keyframe interpolation of genomes.
//!
//! Keyframes are first [aligned](Interpolate::align) so that every genome has
//! the same xforms with the same variation sets, then blended with per-key
//! coefficients. Polar affine blending needs reference angles so that
//! rotations take the short way round.

use std::f64::consts::{PI, TAU};

use crate::compute::{hsv_to_rgb, rgb_to_hsv};
use crate::schema::{
    Affine2D, AffineInterp, Genome, Interpolation, LINEAR, PALETTE_SIZE, Palette, PaletteInterp,
    Rgba, Variation, Xform,
};

/// Structural interpolation between keyframe genomes.
pub trait Interpolate {
    /// Copies of `genomes` padded to identical structure.
    fn align(&self, genomes: &[Genome]) -> Vec<Genome>;

    /// Record winding offsets so polar blending of aligned keyframes never
    /// turns more than half a revolution between neighbours.
    fn establish_reference_angles(&self, genomes: &mut [Genome]);

    /// The genome at `time` between keyframes ordered by their `time`.
    /// `stagger` in [0, 1] offsets when each xform starts moving.
    fn interpolate(&self, genomes: &[Genome], time: f64, stagger: f64) -> Genome;
}

/// Cubic ease with zero slope at both ends.
pub fn smoother(t: f64) -> f64 {
    t * t * (3.0 - 2.0 * t)
}

/// Per-xform progress for staggered transitions: with `count` xforms, later
/// xforms start moving first and each moves over a shortened window.
pub fn stagger_coef(t: f64, stagger: f64, count: usize, index: usize) -> f64 {
    if count <= 1 || stagger <= 0.0 {
        return t;
    }
    let span = (count - 1) as f64;
    let scaled = stagger.min(1.0) * span / count as f64;
    let start = scaled * (span - index as f64) / span;
    let end = start + (1.0 - scaled);
    if t <= start {
        0.0
    } else if t >= end {
        1.0
    } else {
        smoother((t - start) / (1.0 - scaled))
    }
}

/// Keyframe indices and blend coefficients at `time`.
fn key_weights(genomes: &[Genome], time: f64) -> (usize, f64, Vec<(usize, f64)>) {
    let last = genomes.len() - 1;
    if last == 0 {
        return (0, 0.0, vec![(0, 1.0)]);
    }

    let i = genomes[..last]
        .iter()
        .rposition(|g| g.time <= time)
        .unwrap_or(0);
    let (t0, t1) = (genomes[i].time, genomes[i + 1].time);
    let t = if t1 > t0 {
        ((time - t0) / (t1 - t0)).clamp(0.0, 1.0)
    } else {
        0.0
    };

    if genomes[i].interpolation != Interpolation::Smooth {
        return (i, t, vec![(i, 1.0 - t), (i + 1, t)]);
    }

    // Catmull-Rom with clamped neighbours.
    let (t2, t3) = (t * t, t * t * t);
    let basis = [
        0.5 * (-t3 + 2.0 * t2 - t),
        0.5 * (3.0 * t3 - 5.0 * t2 + 2.0),
        0.5 * (-3.0 * t3 + 4.0 * t2 + t),
        0.5 * (t3 - t2),
    ];
    let idx = [i.saturating_sub(1), i, i + 1, (i + 2).min(last)];
    let mut weights: Vec<(usize, f64)> = Vec::with_capacity(4);
    for (k, c) in idx.into_iter().zip(basis) {
        match weights.iter_mut().find(|(j, _)| *j == k) {
            Some((_, w)) => *w += c,
            None => weights.push((k, c)),
        }
    }
    (i, t, weights)
}

fn mix<T>(parts: &[(&T, f64)], f: impl Fn(&T) -> f64) -> f64 {
    parts.iter().map(|(v, c)| c * f(*v)).sum()
}

fn column_angle((x, y): (f64, f64)) -> f64 {
    y.atan2(x)
}

fn blend_affine(parts: &[(&Affine2D, [f64; 2], f64)], polar: bool) -> Affine2D {
    let first = parts[0].0;
    if parts.iter().all(|(a, _, _)| *a == first) {
        return *first;
    }

    let mut coefs = [0.0; 6];
    for (a, _, c) in parts {
        for (acc, v) in coefs.iter_mut().zip(a.coefs()) {
            *acc += c * v;
        }
    }
    let mut out = Affine2D::from_coefs(coefs);

    if polar {
        let mut cols = [(0.0, 0.0); 2];
        for (col, slot) in cols.iter_mut().enumerate() {
            let (mut angle, mut mag) = (0.0, 0.0);
            for (a, wind, c) in parts {
                let v = a.columns()[col];
                angle += c * (column_angle(v) + wind[col]);
                mag += c * v.0.hypot(v.1);
            }
            *slot = (mag * angle.cos(), mag * angle.sin());
        }
        out.set_columns(cols);
    }
    out
}

fn blend_variations(parts: &[(&Xform, f64)]) -> Vec<Variation> {
    let mut out: Vec<Variation> = Vec::new();
    for (x, _) in parts {
        for v in &x.variations {
            if out.iter().all(|o| o.id != v.id) {
                out.push(v.clone());
            }
        }
    }

    for var in &mut out {
        let id = var.id;
        var.weight = mix(parts, |x| x.variation(id).map_or(0.0, |v| v.weight));
        let holder = var.clone();
        for (name, value) in var.params.iter_mut() {
            *value = mix(parts, |x| {
                x.variation(holder.id)
                    .and_then(|v| v.param(name))
                    .unwrap_or_else(|| holder.param_or(name, 0.0))
            });
        }
    }
    out
}

fn blend_xforms(parts: &[(&Xform, f64)], polar: bool) -> Xform {
    let mut out = parts[0].0.clone();
    out.weight = mix(parts, |x| x.weight).max(0.0);
    out.color_x = mix(parts, |x| x.color_x).clamp(0.0, 1.0);
    out.color_y = mix(parts, |x| x.color_y).clamp(0.0, 1.0);
    out.color_speed = mix(parts, |x| x.color_speed);
    out.opacity = mix(parts, |x| x.opacity).clamp(0.0, 1.0);

    let affines: Vec<_> = parts.iter().map(|(x, c)| (&x.affine, x.wind, *c)).collect();
    out.affine = blend_affine(&affines, polar);
    let posts: Vec<_> = parts.iter().map(|(x, c)| (&x.post, x.wind, *c)).collect();
    out.post = blend_affine(&posts, polar);

    out.variations = blend_variations(parts);

    let n = parts.iter().map(|(x, _)| x.xaos.len()).max().unwrap_or(0);
    out.xaos = (0..n)
        .map(|j| mix(parts, |x| x.xaos_to(j)).max(0.0))
        .collect();

    out.motion.clear();
    out.padding = false;
    out.wind = [0.0; 2];
    out
}

fn blend_palettes(parts: &[(&Genome, f64)], mode: PaletteInterp) -> Palette {
    let mut out = parts[0].0.palette.clone();
    out.index = None;
    for i in 0..PALETTE_SIZE {
        let alpha = mix(parts, |g| g.palette.get(i).a).clamp(0.0, 1.0);
        let [r, g, b] = match mode {
            PaletteInterp::Rgb => {
                [0, 1, 2].map(|c| mix(parts, |g| g.palette.get(i).channels()[c]))
            }
            PaletteInterp::Hsv => {
                let hsv =
                    [0, 1, 2].map(|c| mix(parts, |g| rgb_to_hsv(g.palette.get(i).channels())[c]));
                hsv_to_rgb([hsv[0], hsv[1].clamp(0.0, 1.0), hsv[2].clamp(0.0, 1.0)])
            }
        };
        out.set(
            i,
            Rgba::new(r.clamp(0.0, 1.0), g.clamp(0.0, 1.0), b.clamp(0.0, 1.0), alpha),
        );
    }
    out
}

/// Identity xform that fades in from zero weight.
fn padding_xform() -> Xform {
    let mut x = Xform::new(0.0);
    x.padding = true;
    x
}

/// Reference interpolator: padding-based alignment, linear or polar affine
/// blending, HSV or RGB palette blending and staggered transitions.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearInterpolator;

impl Interpolate for LinearInterpolator {
    fn align(&self, genomes: &[Genome]) -> Vec<Genome> {
        let mut out = genomes.to_vec();
        let count = out.iter().map(|g| g.xforms.len()).max().unwrap_or(0);
        let any_final = out.iter().any(|g| g.final_xform.is_some());

        for g in &mut out {
            while g.xforms.len() < count {
                g.add_xform(padding_xform());
            }
            if any_final && g.final_xform.is_none() {
                g.set_final_xform(Some(padding_xform()));
            }
        }

        let slots = count + usize::from(any_final);
        for slot in 0..slots {
            let mut union: Vec<Variation> = Vec::new();
            for g in &out {
                if let Some(x) = g.total_xform(slot) {
                    for v in &x.variations {
                        if union.iter().all(|u| u.id != v.id) {
                            union.push(v.clone());
                        }
                    }
                }
            }

            for g in &mut out {
                let Some(x) = g.total_xform_mut(slot) else {
                    continue;
                };
                for u in &union {
                    if x.variation(u.id).is_none() {
                        let mut v = u.clone();
                        v.weight = 0.0;
                        x.variations.push(v);
                    }
                }
                if x.padding && x.variations.iter().all(|v| v.weight == 0.0) {
                    match x.variation_mut(LINEAR) {
                        Some(v) => v.weight = 1.0,
                        None => x.variations.push(Variation::new(LINEAR, "linear", 1.0)),
                    }
                }
            }
        }
        out
    }

    fn establish_reference_angles(&self, genomes: &mut [Genome]) {
        let Some(slots) = genomes.iter().map(|g| g.total_xform_count()).max() else {
            return;
        };
        for slot in 0..slots {
            for col in 0..2 {
                let mut prev: Option<f64> = None;
                for g in genomes.iter_mut() {
                    let Some(x) = g.total_xform_mut(slot) else {
                        continue;
                    };
                    let angle = column_angle(x.affine.columns()[col]);
                    let mut wind = 0.0;
                    if let Some(p) = prev {
                        while angle + wind - p > PI {
                            wind -= TAU;
                        }
                        while angle + wind - p < -PI {
                            wind += TAU;
                        }
                    }
                    x.wind[col] = wind;
                    prev = Some(angle + wind);
                }
            }
        }
    }

    fn interpolate(&self, genomes: &[Genome], time: f64, stagger: f64) -> Genome {
        if genomes.is_empty() {
            return Genome::default();
        }

        let aligned;
        let keys = if genomes
            .windows(2)
            .all(|w| w[0].total_xform_count() == w[1].total_xform_count())
            && genomes
                .windows(2)
                .all(|w| w[0].final_xform.is_some() == w[1].final_xform.is_some())
        {
            genomes
        } else {
            aligned = self.align(genomes);
            &aligned[..]
        };

        let (base, t, weights) = key_weights(keys, time);
        let parts: Vec<(&Genome, f64)> = weights.iter().map(|&(k, c)| (&keys[k], c)).collect();
        let base_key = &keys[base];

        let mut out = base_key.clone();
        out.time = time;
        out.edits = None;
        out.hue = mix(&parts, |g| g.hue).rem_euclid(1.0);
        out.center_x = mix(&parts, |g| g.center_x);
        out.center_y = mix(&parts, |g| g.center_y);
        out.rotate = mix(&parts, |g| g.rotate);
        out.pixels_per_unit = mix(&parts, |g| g.pixels_per_unit);
        out.zoom = mix(&parts, |g| g.zoom);
        out.quality = mix(&parts, |g| g.quality);
        out.spatial_filter_radius = mix(&parts, |g| g.spatial_filter_radius);
        out.de_max_radius = mix(&parts, |g| g.de_max_radius);
        out.de_min_radius = mix(&parts, |g| g.de_min_radius);
        out.de_curve = mix(&parts, |g| g.de_curve);
        out.gamma = mix(&parts, |g| g.gamma);
        out.gamma_threshold = mix(&parts, |g| g.gamma_threshold);
        out.brightness = mix(&parts, |g| g.brightness);
        out.vibrancy = mix(&parts, |g| g.vibrancy);
        out.highlight_power = mix(&parts, |g| g.highlight_power);
        out.temporal_filter_width = mix(&parts, |g| g.temporal_filter_width);
        out.temporal_filter_exp = mix(&parts, |g| g.temporal_filter_exp);
        for c in 0..3 {
            out.background[c] = mix(&parts, |g| g.background[c]);
        }
        out.palette = blend_palettes(&parts, base_key.palette_interp);

        let polar = base_key.affine_interp == AffineInterp::Polar;
        let staggered = stagger > 0.0 && weights.len() == 2;
        let count = base_key.xforms.len();

        out.xforms = (0..count)
            .map(|j| {
                let xparts: Vec<(&Xform, f64)> = if staggered {
                    let s = stagger_coef(t, stagger, count, j);
                    vec![
                        (&keys[weights[0].0].xforms[j], 1.0 - s),
                        (&keys[weights[1].0].xforms[j], s),
                    ]
                } else {
                    parts.iter().map(|(g, c)| (&g.xforms[j], *c)).collect()
                };
                blend_xforms(&xparts, polar)
            })
            .collect();

        let finals: Vec<(&Xform, f64)> = parts
            .iter()
            .filter_map(|(g, c)| g.final_xform.as_ref().map(|x| (x, *c)))
            .collect();
        if finals.len() == parts.len() && !finals.is_empty() {
            out.set_final_xform(Some(blend_xforms(&finals, polar)));
        }
        out
    }
}
