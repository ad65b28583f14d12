//! Color improvement: hill-climbing on the color diversity of a proxy render.

use log::{debug, warn};

use crate::compute::{OracleError, RenderSettings, Renderer, make_hue_adjusted_palette};
use crate::schema::{Genome, Palette};

use super::Breeder;

/// Pixel count the proxy render is scaled to.
const PROXY_PIXELS: f64 = 10_000.0;
/// Retries when looking for a random eligible xform.
const RANDOM_XFORM_TRIES: usize = 100;

impl<R: Renderer, I> Breeder<R, I> {
    /// Hill-climb color coordinates (and optionally the palette) for `tries`
    /// steps, keeping only strict improvements. `genome` is replaced by the
    /// best candidate and its score returned.
    ///
    /// Fails only if the starting genome cannot be scored; a later render
    /// failure stops the climb and keeps the best candidate so far.
    pub fn improve_colors(
        &mut self,
        genome: &mut Genome,
        tries: usize,
        change_palette: bool,
        resolution: usize,
    ) -> Result<f64, OracleError> {
        let mut best_score = self.try_colors(genome, resolution)?;
        let mut best = genome.clone();

        for i in 0..tries {
            let mut trial = best.clone();
            self.change_colors(&mut trial, change_palette);
            match self.try_colors(&trial, resolution) {
                Ok(score) if score > best_score => {
                    best_score = score;
                    best = trial;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("color try {i} failed: {e}; keeping best so far");
                    break;
                }
            }
        }

        debug!("color improvement reached {best_score:.4}");
        *genome = best;
        Ok(best_score)
    }

    /// Fraction of `resolution³` color buckets hit by a fast proxy render.
    pub fn try_colors(&mut self, genome: &Genome, resolution: usize) -> Result<f64, OracleError> {
        let mut proxy = genome.clone();
        proxy.quality = 1.0;
        proxy.supersample = 1;
        proxy.de_max_radius = 0.0;

        let area = (proxy.width * proxy.height) as f64;
        if area > 0.0 {
            let scalar = (PROXY_PIXELS / area).sqrt();
            proxy.width = ((proxy.width as f64 * scalar) as usize).max(1);
            proxy.height = ((proxy.height as f64 * scalar) as usize).max(1);
            proxy.pixels_per_unit *= scalar;
        }

        let image = self.renderer.render(&proxy, &RenderSettings::proxy())?;

        let res = resolution.clamp(1, 256);
        let mut hits = vec![false; res * res * res];
        for [r, g, b] in image.rgb() {
            let bucket = |c: u8| c as usize * res / 256;
            hits[(bucket(r) * res + bucket(g)) * res + bucket(b)] = true;
        }

        let occupied = hits.iter().filter(|&&h| h).count();
        Ok(occupied as f64 / hits.len() as f64)
    }
}

impl<R, I> Breeder<R, I> {
    /// Randomize every xform's color coordinates, optionally draw a new
    /// palette, then maybe anchor one xform at (0, 0) and another at (1, 1).
    pub fn change_colors(&mut self, genome: &mut Genome, change_palette: bool) {
        if change_palette {
            genome.hue = 0.0;
            genome.palette = match self.palettes.random_palette(&mut self.rng) {
                Ok(p) => {
                    let hue = self.rng.next_float01();
                    make_hue_adjusted_palette(&p, hue)
                }
                Err(e) => {
                    warn!("color change: {e}; using white palette");
                    Palette::white()
                }
            };
        }

        for x in genome.total_xforms_mut() {
            x.color_x = self.rng.next_float01();
            x.color_y = self.rng.next_float01();
        }

        let x0 = self.random_xform(genome, None);
        let x1 = self.random_xform(genome, x0);

        if let Some(i) = x0
            && self.rng.next_bit()
            && let Some(x) = genome.total_xform_mut(i)
        {
            x.color_x = 0.0;
            x.color_y = 0.0;
        }
        if let Some(i) = x1
            && self.rng.next_bit()
            && let Some(x) = genome.total_xform_mut(i)
        {
            x.color_x = 1.0;
            x.color_y = 1.0;
        }
    }

    /// A random xform with positive weight other than `excluded`.
    /// Gives up with `None` after a bounded number of draws.
    pub fn random_xform(&mut self, genome: &Genome, excluded: Option<usize>) -> Option<usize> {
        let n = genome.total_xform_count();
        if n == 0 {
            return None;
        }
        (0..RANDOM_XFORM_TRIES)
            .map(|_| self.rng.next_index(n))
            .find(|&i| {
                Some(i) != excluded && genome.total_xform(i).is_some_and(|x| x.weight > 0.0)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{MockRenderer, breeder, breeder_with, linear_genome};
    use super::*;
    use crate::schema::Xform;

    #[test]
    fn test_try_colors_counts_buckets() {
        let mut b = breeder([1, 2, 3]);
        let mut g = linear_genome(2);
        g.palette = crate::schema::Palette::gradient(
            "bw",
            &[crate::schema::Rgba::BLACK, crate::schema::Rgba::WHITE],
        );
        g.xforms[0].color_x = 0.0;
        g.xforms[1].color_x = 1.0;
        let score = b.try_colors(&g, 10).unwrap();
        assert!((score - 2.0 / 1000.0).abs() < 1e-12);

        g.xforms[1].color_x = 0.0;
        let score = b.try_colors(&g, 10).unwrap();
        assert!((score - 1.0 / 1000.0).abs() < 1e-12);
    }

    #[test]
    fn test_try_colors_scales_to_proxy_size() {
        #[derive(Default)]
        struct SizeProbe(Vec<(usize, usize)>);
        impl Renderer for SizeProbe {
            fn render(
                &mut self,
                genome: &Genome,
                settings: &RenderSettings,
            ) -> Result<crate::compute::RenderedImage, OracleError> {
                assert!(settings.proxy);
                assert_eq!((genome.quality, genome.supersample), (1.0, 1));
                self.0.push((genome.width, genome.height));
                Ok(crate::compute::RenderedImage::filled(1, 1, &[0, 0, 0]))
            }
            fn thread_count(&self) -> usize {
                1
            }
            fn channels(&self) -> usize {
                3
            }
        }

        let mut b = Breeder::new(
            crate::schema::BreederConfig::default(),
            std::sync::Arc::new(crate::compute::VariationCatalog::builtin()),
            std::sync::Arc::new(crate::compute::PaletteCatalog::builtin()),
            SizeProbe::default(),
            crate::animation::LinearInterpolator,
        )
        .unwrap();
        let mut g = linear_genome(2);
        g.width = 400;
        g.height = 100;
        g.supersample = 3;
        b.try_colors(&g, 10).unwrap();
        assert_eq!(b.renderer().0, vec![(200, 50)]);
    }

    #[test]
    fn test_improve_never_worsens() {
        let mut b = breeder([4, 5, 6]);
        let mut g = linear_genome(4);
        let start = b.try_colors(&g, 10).unwrap();
        let best = b.improve_colors(&mut g, 50, true, 10).unwrap();
        assert!(best >= start);
        assert_eq!(b.try_colors(&g, 10).unwrap(), best);
    }

    #[test]
    fn test_improve_fails_when_unscorable() {
        let renderer = MockRenderer {
            fail_after: Some(0),
            ..Default::default()
        };
        let mut b = breeder_with([1, 1, 1], renderer);
        let mut g = linear_genome(2);
        let before = g.clone();
        assert!(b.improve_colors(&mut g, 10, false, 10).is_err());
        assert_eq!(g, before);
    }

    #[test]
    fn test_improve_stops_at_first_failure() {
        let renderer = MockRenderer {
            fail_after: Some(3),
            ..Default::default()
        };
        let mut b = breeder_with([1, 1, 1], renderer);
        let mut g = linear_genome(3);
        assert!(b.improve_colors(&mut g, 50, false, 10).is_ok());
        assert_eq!(b.renderer().calls, 4);
    }

    #[test]
    fn test_random_xform_skips_excluded_and_zero_weight() {
        let mut b = breeder([7, 8, 9]);
        let mut g = linear_genome(3);
        g.xforms[1].weight = 0.0;
        g.set_final_xform(Some(Xform::linear(1.0)));
        for _ in 0..200 {
            let i = b.random_xform(&g, Some(0));
            assert_eq!(i, Some(2));
        }
    }

    #[test]
    fn test_random_xform_gives_up() {
        let mut b = breeder([7, 8, 9]);
        let g = linear_genome(1);
        assert_eq!(b.random_xform(&g, Some(0)), None);
        assert_eq!(b.random_xform(&Genome::default(), None), None);
    }

    #[test]
    fn test_change_colors_stays_in_unit_square() {
        let mut b = breeder([3, 3, 3]);
        let mut g = linear_genome(5);
        g.hue = 0.4;
        for _ in 0..50 {
            b.change_colors(&mut g, true);
            assert_eq!(g.hue, 0.0);
            for x in &g.xforms {
                assert!((0.0..=1.0).contains(&x.color_x));
                assert!((0.0..=1.0).contains(&x.color_y));
            }
        }
    }
}
