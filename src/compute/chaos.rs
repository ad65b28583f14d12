//! Reference chaos-game oracle: orbit sampling, histogram accumulation and
//! tone mapping.
//!
//! Sampling is split over rayon workers, each driving its own ISAAC source
//! seeded from the master generator, and histograms are summed in worker
//! order so a seeded render is reproducible.

use std::borrow::Cow;
use std::sync::Arc;

use rayon::prelude::*;

use crate::schema::{Genome, Xform};

use super::{
    EvalFn, OracleError, Point, PointIterator, RandomSource, RenderSettings, RenderedImage,
    Renderer, VarPoint, VariationCatalog, calc_alpha, calc_new_rgb, make_hue_adjusted_palette,
};

/// Iterations discarded by each render worker before plotting.
const RENDER_WARMUP: usize = 20;
/// Consecutive escapes tolerated before an escaped point is recorded anyway.
const MAX_CONSECUTIVE_ESCAPES: usize = 5;

#[inline]
fn escaped(x: f64, y: f64) -> bool {
    !(x.is_finite() && y.is_finite()) || x.abs() > 1e10 || y.abs() > 1e10
}

/// A genome prepared for iteration: resolved variation functions and
/// cumulative selection tables.
struct Orbit<'a> {
    genome: &'a Genome,
    evals: Vec<Vec<EvalFn>>,
    /// Row 0 is the plain weight table; rows `1..=n` follow xaos from xform `i - 1`.
    tables: Vec<Vec<f64>>,
}

impl<'a> Orbit<'a> {
    fn new(genome: &'a Genome, catalog: &VariationCatalog) -> Result<Self, OracleError> {
        if genome.xforms.is_empty() {
            return Err(OracleError::EmptyGenome);
        }
        if genome.xform_weight_sum() <= 0.0 {
            return Err(OracleError::ZeroWeight);
        }

        let evals = genome
            .total_xforms()
            .map(|xf| {
                xf.variations
                    .iter()
                    .map(|v| {
                        catalog
                            .get(v.id)
                            .map(|s| s.eval)
                            .ok_or(OracleError::UnknownVariation(v.id))
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        let cumulative = |weights: Vec<f64>| {
            weights
                .into_iter()
                .scan(0.0, |acc, w| {
                    *acc += w.max(0.0);
                    Some(*acc)
                })
                .collect::<Vec<_>>()
        };

        let mut tables = vec![cumulative(genome.xforms.iter().map(|x| x.weight).collect())];
        if genome.uses_xaos() {
            for from in &genome.xforms {
                tables.push(cumulative(
                    genome
                        .xforms
                        .iter()
                        .enumerate()
                        .map(|(j, x)| x.weight * from.xaos_to(j))
                        .collect(),
                ));
            }
        }

        Ok(Self {
            genome,
            evals,
            tables,
        })
    }

    #[inline]
    fn pick(&self, last: usize, rng: &mut RandomSource) -> usize {
        let mut table = self.tables.get(last + 1).unwrap_or(&self.tables[0]);
        if table.last().copied().unwrap_or(0.0) <= 0.0 {
            table = &self.tables[0];
        }
        let total = table.last().copied().unwrap_or(0.0);
        let r = rng.next_float01() * total;
        table.partition_point(|&c| c <= r).min(table.len() - 1)
    }

    #[inline]
    fn transform(
        &self,
        xf: &Xform,
        evals: &[EvalFn],
        x: f64,
        y: f64,
        rng: &mut RandomSource,
    ) -> (f64, f64) {
        let (tx, ty) = xf.affine.apply(x, y);
        let p = VarPoint::new(tx, ty);
        let (mut nx, mut ny) = (0.0, 0.0);
        for (v, eval) in xf.variations.iter().zip(evals) {
            let (dx, dy) = eval(v, &p, rng);
            nx += dx;
            ny += dy;
        }
        if xf.post.is_identity() {
            (nx, ny)
        } else {
            xf.post.apply(nx, ny)
        }
    }

    /// Run `warmup + count` iterations, handing each plotted point to `plot`
    /// as `(x, y, color, opacity)`. Returns escapes during plotting.
    fn run<F: FnMut(f64, f64, f64, f64)>(
        &self,
        count: usize,
        warmup: usize,
        rng: &mut RandomSource,
        mut plot: F,
    ) -> usize {
        let xforms = &self.genome.xforms;
        let final_xform = self.genome.final_xform.as_ref();
        let final_evals = self.evals.get(xforms.len()).map(Vec::as_slice).unwrap_or(&[]);

        let (mut x, mut y) = (rng.next_float11(), rng.next_float11());
        let mut color = rng.next_float01();
        let mut last = 0;
        let mut escapes = 0;
        let mut consecutive = 0;
        let mut i = 0;

        while i < warmup + count {
            let k = self.pick(last, rng);
            let xf = &xforms[k];
            let (nx, ny) = self.transform(xf, &self.evals[k], x, y, rng);
            color = color * (1.0 - xf.color_speed) + xf.color_x * xf.color_speed;

            if escaped(nx, ny) {
                x = rng.next_float11();
                y = rng.next_float11();
                if i >= warmup {
                    escapes += 1;
                }
                consecutive += 1;
                if consecutive < MAX_CONSECUTIVE_ESCAPES {
                    continue;
                }
            } else {
                x = nx;
                y = ny;
            }
            consecutive = 0;
            last = k;

            if i >= warmup {
                match final_xform {
                    Some(fx) => {
                        let (fx_x, fx_y) = self.transform(fx, final_evals, x, y, rng);
                        let fc = color * (1.0 - fx.color_speed) + fx.color_x * fx.color_speed;
                        if escaped(fx_x, fx_y) {
                            escapes += 1;
                            plot(x, y, color, xf.opacity);
                        } else {
                            plot(fx_x, fx_y, fc, xf.opacity * fx.opacity);
                        }
                    }
                    None => plot(x, y, color, xf.opacity),
                }
            }
            i += 1;
        }

        escapes
    }
}

/// Maps world coordinates onto histogram buckets.
struct Camera {
    cx: f64,
    cy: f64,
    scale: f64,
    sin: f64,
    cos: f64,
    width: usize,
    height: usize,
}

impl Camera {
    fn new(genome: &Genome, width: usize, height: usize, supersample: usize) -> Self {
        let (sin, cos) = (-genome.rotate.to_radians()).sin_cos();
        Self {
            cx: genome.center_x,
            cy: genome.center_y,
            scale: genome.pixels_per_unit * genome.zoom.exp2() * supersample as f64,
            sin,
            cos,
            width,
            height,
        }
    }

    #[inline]
    fn bucket(&self, x: f64, y: f64) -> Option<usize> {
        let (dx, dy) = (x - self.cx, y - self.cy);
        let rx = dx * self.cos - dy * self.sin;
        let ry = dx * self.sin + dy * self.cos;
        let px = rx * self.scale + self.width as f64 / 2.0;
        let py = ry * self.scale + self.height as f64 / 2.0;
        if px >= 0.0 && py >= 0.0 && px < self.width as f64 && py < self.height as f64 {
            Some(py as usize * self.width + px as usize)
        } else {
            None
        }
    }
}

/// Log-density tone mapping of a `[r, g, b, count]` histogram down to 8-bit RGB.
fn tone_map(
    hist: &[[f64; 4]],
    genome: &Genome,
    supersample: usize,
    quality: f64,
) -> Vec<u8> {
    let (w, h) = (genome.width, genome.height);
    let hw = w * supersample;
    let k1 = genome.brightness * 268.0 / 256.0;
    let k2 = (supersample * supersample) as f64 / quality.max(f64::EPSILON);
    let g = if genome.gamma > 0.0 { 1.0 / genome.gamma } else { 1.0 };
    let vib = genome.vibrancy;
    let area = (supersample * supersample) as f64;

    let mut acc = vec![[0.0f64; 3]; w * h];
    for (i, b) in hist.iter().enumerate() {
        let count = b[3];
        let rgb = if count > 0.0 {
            let ls = k1 * (1.0 + count * k2).ln() / count;
            let density = count * ls;
            let alpha = calc_alpha(density, g, genome.gamma_threshold);
            let base = [b[0] * ls * 255.0, b[1] * ls * 255.0, b[2] * ls * 255.0];
            let ls2 = if density > 0.0 { vib * alpha / density } else { 0.0 };
            let scaled = calc_new_rgb(base, ls2, genome.highlight_power);
            let bg_weight = (1.0 - alpha).clamp(0.0, 1.0);
            [0, 1, 2].map(|c| {
                scaled[c]
                    + (1.0 - vib) * 255.0 * (base[c] / 255.0).max(0.0).powf(g)
                    + bg_weight * genome.background[c] * 255.0
            })
        } else {
            genome.background.map(|c| c * 255.0)
        };

        let (x, y) = (i % hw, i / hw);
        let px = &mut acc[(y / supersample) * w + x / supersample];
        for c in 0..3 {
            px[c] += rgb[c] / area;
        }
    }

    acc.iter()
        .flat_map(|px| px.map(|c| c.round().clamp(0.0, 255.0) as u8))
        .collect()
}

/// Reference oracle implementing both [`Renderer`] and [`PointIterator`].
pub struct ChaosGame {
    variations: Arc<VariationCatalog>,
    rng: RandomSource,
    threads: usize,
}

impl ChaosGame {
    pub fn new(variations: Arc<VariationCatalog>, seed: [u32; 3]) -> Self {
        Self {
            variations,
            rng: RandomSource::new(seed[0], seed[1], seed[2]),
            threads: rayon::current_num_threads(),
        }
    }

    /// Set the number of sampling workers per render.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }
}

impl Renderer for ChaosGame {
    fn render(
        &mut self,
        genome: &Genome,
        settings: &RenderSettings,
    ) -> Result<RenderedImage, OracleError> {
        let (w, h) = (genome.width, genome.height);
        if w == 0 || h == 0 {
            return Err(OracleError::InvalidRaster {
                width: w,
                height: h,
            });
        }
        let orbit = Orbit::new(genome, &self.variations)?;

        let (quality, ss) = if settings.proxy {
            (1.0, 1)
        } else {
            (genome.quality.max(f64::EPSILON), genome.supersample.max(1))
        };
        let (hw, hh) = (w * ss, h * ss);

        let mut samples = ((quality * (w * h) as f64).ceil() as usize).max(1);
        if let Some(cap) = settings.max_samples {
            samples = samples.min(cap.max(1));
        }

        let palette = if genome.hue != 0.0 {
            Cow::Owned(make_hue_adjusted_palette(&genome.palette, genome.hue))
        } else {
            Cow::Borrowed(&genome.palette)
        };
        let camera = Camera::new(genome, hw, hh, ss);

        let workers = self.threads.clamp(1, samples);
        let seeds: Vec<(u32, u32, u32)> = (0..workers).map(|_| self.rng.next_seed()).collect();
        let per_worker = samples / workers;
        let remainder = samples % workers;

        let partials: Vec<Vec<[f64; 4]>> = seeds
            .into_par_iter()
            .enumerate()
            .map(|(t, (a, b, c))| {
                let mut rng = RandomSource::new(a, b, c);
                let n = per_worker + usize::from(t < remainder);
                let mut buckets = vec![[0.0f64; 4]; hw * hh];
                orbit.run(n, RENDER_WARMUP, &mut rng, |x, y, color, opacity| {
                    if let Some(i) = camera.bucket(x, y) {
                        let e = palette.lookup(color);
                        let b = &mut buckets[i];
                        b[0] += e.r * opacity;
                        b[1] += e.g * opacity;
                        b[2] += e.b * opacity;
                        b[3] += opacity;
                    }
                });
                buckets
            })
            .collect();

        let mut hist = vec![[0.0f64; 4]; hw * hh];
        for part in &partials {
            for (dst, src) in hist.iter_mut().zip(part) {
                for c in 0..4 {
                    dst[c] += src[c];
                }
            }
        }

        Ok(RenderedImage {
            width: w,
            height: h,
            channels: 3,
            pixels: tone_map(&hist, genome, ss, quality),
        })
    }

    fn thread_count(&self) -> usize {
        self.threads
    }

    fn channels(&self) -> usize {
        3
    }
}

impl PointIterator for ChaosGame {
    fn iterate(
        &mut self,
        genome: &Genome,
        count: usize,
        warmup: usize,
        rng: &mut RandomSource,
        out: &mut Vec<Point>,
    ) -> Result<usize, OracleError> {
        let orbit = Orbit::new(genome, &self.variations)?;
        out.clear();
        out.reserve(count);
        Ok(orbit.run(count, warmup, rng, |x, y, _, _| out.push(Point { x, y })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Affine2D, Palette, Rgba, VariationId};

    fn sierpinski() -> Genome {
        let mut g = Genome {
            width: 32,
            height: 32,
            pixels_per_unit: 24.0,
            center_x: 0.5,
            center_y: 0.5,
            palette: Palette::filled("white", Rgba::WHITE),
            ..Default::default()
        };
        for (c, f) in [(0.0, 0.0), (0.5, 0.0), (0.0, 0.5)] {
            let mut x = Xform::linear(1.0);
            x.affine = Affine2D {
                a: 0.5,
                e: 0.5,
                c,
                f,
                ..Affine2D::identity()
            };
            g.add_xform(x);
        }
        g
    }

    fn game() -> ChaosGame {
        ChaosGame::new(Arc::new(VariationCatalog::builtin()), [1, 2, 3]).with_threads(2)
    }

    #[test]
    fn test_iterate_stays_in_attractor() {
        let mut rng = RandomSource::new(1, 2, 3);
        let mut out = Vec::new();
        let escapes = game()
            .iterate(&sierpinski(), 500, 20, &mut rng, &mut out)
            .unwrap();
        assert_eq!(escapes, 0);
        assert_eq!(out.len(), 500);
        let inside = -1e-4..=1.0 + 1e-4;
        assert!(out.iter().all(|p| inside.contains(&p.x) && inside.contains(&p.y)));
    }

    #[test]
    fn test_iterate_is_seeded() {
        let g = sierpinski();
        let (mut a, mut b) = (Vec::new(), Vec::new());
        game().iterate(&g, 100, 5, &mut RandomSource::new(4, 5, 6), &mut a).unwrap();
        game().iterate(&g, 100, 5, &mut RandomSource::new(4, 5, 6), &mut b).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_render_reproducible() {
        let g = sierpinski();
        let a = game().render(&g, &RenderSettings::proxy()).unwrap();
        let b = game().render(&g, &RenderSettings::proxy()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.pixels.len(), 32 * 32 * 3);
        assert!(a.pixels.iter().any(|&p| p > 0));
    }

    #[test]
    fn test_empty_genome_rejected() {
        let g = Genome::default();
        assert!(matches!(
            game().render(&g, &RenderSettings::default()),
            Err(OracleError::EmptyGenome)
        ));
    }

    #[test]
    fn test_unknown_variation_rejected() {
        let mut g = sierpinski();
        g.xforms[0].variations[0].id = VariationId(999);
        let mut rng = RandomSource::new(1, 2, 3);
        let mut out = Vec::new();
        assert!(matches!(
            game().iterate(&g, 10, 0, &mut rng, &mut out),
            Err(OracleError::UnknownVariation(VariationId(999)))
        ));
    }

    #[test]
    fn test_zero_raster_rejected() {
        let mut g = sierpinski();
        g.width = 0;
        assert!(matches!(
            game().render(&g, &RenderSettings::proxy()),
            Err(OracleError::InvalidRaster { .. })
        ));
    }

    #[test]
    fn test_divergent_genome_counts_escapes() {
        let mut g = sierpinski();
        for x in &mut g.xforms {
            x.affine = Affine2D {
                a: 1e6,
                e: 1e6,
                ..Affine2D::identity()
            };
        }
        let mut rng = RandomSource::new(1, 2, 3);
        let mut out = Vec::new();
        let escapes = game().iterate(&g, 50, 0, &mut rng, &mut out).unwrap();
        assert!(escapes > 0);
        assert_eq!(out.len(), 50);
    }
}
