//! Trimmed bounding box of a genome's attractor.

use log::debug;

use crate::compute::{OracleError, Point, PointIterator};
use crate::schema::Genome;

use super::Breeder;

/// Iterations discarded before sampling.
const BOUNDS_WARMUP: usize = 20;
/// Sample count used when zero is requested.
const DEFAULT_SAMPLES: usize = 10_000;
/// Upper limit on the trimmed fraction after adaptive widening.
const MAX_EPS: f64 = 0.3;

/// Axis-aligned box in genome space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Point,
    pub max: Point,
}

impl BoundingBox {
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Point {
        Point {
            x: (self.min.x + self.max.x) * 0.5,
            y: (self.min.y + self.max.y) * 0.5,
        }
    }

    /// Center the camera on the box and pick a scale that fits it in the raster.
    pub fn frame(&self, genome: &mut Genome) {
        let c = self.center();
        genome.center_x = c.x;
        genome.center_y = c.y;

        let sx = if self.width() > 0.0 {
            genome.width as f64 / self.width()
        } else {
            f64::INFINITY
        };
        let sy = if self.height() > 0.0 {
            genome.height as f64 / self.height()
        } else {
            f64::INFINITY
        };
        let ppu = sx.min(sy);
        if ppu.is_finite() {
            genome.pixels_per_unit = ppu;
        }
    }

    fn enclosing(points: &[Point]) -> Self {
        let mut min = Point {
            x: f64::INFINITY,
            y: f64::INFINITY,
        };
        let mut max = Point {
            x: f64::NEG_INFINITY,
            y: f64::NEG_INFINITY,
        };
        for p in points {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        Self { min, max }
    }
}

impl<R: PointIterator, I> Breeder<R, I> {
    /// Order-statistic bounding box of `samples` orbit points, trimming a
    /// fraction `eps` from each end of each axis. `eps` triples (up to 0.3)
    /// when the escape ratio exceeds it.
    pub fn estimate_bounding_box(
        &mut self,
        genome: &Genome,
        eps: f64,
        samples: usize,
    ) -> Result<BoundingBox, OracleError> {
        let n = if samples == 0 { DEFAULT_SAMPLES } else { samples };

        let mut points = std::mem::take(&mut self.samples);
        let escapes =
            self.renderer
                .iterate(genome, n, BOUNDS_WARMUP, &mut self.rng, &mut points);
        let escapes = match escapes {
            Ok(e) => e,
            Err(e) => {
                self.samples = points;
                return Err(e);
            }
        };
        points.truncate(n);
        let n = points.len();
        if n == 0 {
            self.samples = points;
            return Err(OracleError::Failed("iterator returned no points".to_string()));
        }

        let mut eps = eps;
        if escapes as f64 / n as f64 > eps {
            eps = (3.0 * escapes as f64 / n as f64).min(MAX_EPS);
        }
        let low = (n as f64 * eps).floor() as usize;
        let high = n.saturating_sub(low).min(n - 1);
        debug!("bounds: {n} samples, {escapes} escaped, trimming {low} per side");

        let bounds = if low == 0 {
            BoundingBox::enclosing(&points)
        } else {
            points.sort_unstable_by(|a, b| a.x.total_cmp(&b.x));
            let (min_x, max_x) = (points[low].x, points[high].x);
            points.sort_unstable_by(|a, b| a.y.total_cmp(&b.y));
            let (min_y, max_y) = (points[low].y, points[high].y);
            BoundingBox {
                min: Point { x: min_x, y: min_y },
                max: Point { x: max_x, y: max_y },
            }
        };

        self.samples = points;
        Ok(bounds)
    }

    /// [`Self::estimate_bounding_box`] with the configured `eps` and sample count.
    pub fn estimate_bounds(&mut self, genome: &Genome) -> Result<BoundingBox, OracleError> {
        let (eps, samples) = (self.config.bounds.eps, self.config.bounds.samples);
        self.estimate_bounding_box(genome, eps, samples)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{MockRenderer, breeder, breeder_with, linear_genome};
    use super::*;

    fn grid(n: usize) -> Vec<Point> {
        (0..n)
            .map(|i| Point {
                x: i as f64,
                y: -(i as f64),
            })
            .collect()
    }

    #[test]
    fn test_untrimmed_is_min_max() {
        let renderer = MockRenderer {
            points: grid(50),
            ..Default::default()
        };
        let mut b = breeder_with([1, 2, 3], renderer);
        let bb = b.estimate_bounding_box(&linear_genome(2), 0.01, 50).unwrap();
        assert_eq!(bb.min, Point { x: 0.0, y: -49.0 });
        assert_eq!(bb.max, Point { x: 49.0, y: 0.0 });
    }

    #[test]
    fn test_trims_outliers() {
        let mut points = grid(100);
        points[3] = Point { x: 1e6, y: 1e6 };
        points[7] = Point { x: -1e6, y: -1e6 };
        let renderer = MockRenderer {
            points,
            ..Default::default()
        };
        let mut b = breeder_with([1, 2, 3], renderer);
        let bb = b.estimate_bounding_box(&linear_genome(2), 0.05, 100).unwrap();
        assert!(bb.min.x > -1e6 && bb.max.x < 1e6);
        assert!(bb.min.y > -1e6 && bb.max.y < 1e6);
        assert!(bb.width() > 0.0 && bb.height() > 0.0);
    }

    #[test]
    fn test_escapes_widen_trim() {
        let renderer = MockRenderer {
            points: grid(100),
            escapes: 10,
            ..Default::default()
        };
        let mut b = breeder_with([1, 2, 3], renderer);
        // 10% escaped > eps, so eps becomes 0.3: indices 30 and 70.
        let bb = b.estimate_bounding_box(&linear_genome(2), 0.01, 100).unwrap();
        assert_eq!((bb.min.x, bb.max.x), (30.0, 70.0));
    }

    #[test]
    fn test_zero_samples_uses_default() {
        let renderer = MockRenderer {
            points: grid(10),
            ..Default::default()
        };
        let mut b = breeder_with([1, 2, 3], renderer);
        b.estimate_bounding_box(&linear_genome(2), 0.0, 0).unwrap();
        assert_eq!(b.samples.len(), DEFAULT_SAMPLES);
    }

    #[test]
    fn test_iterator_failure_propagates() {
        let mut b = breeder([1, 2, 3]);
        assert!(b.estimate_bounds(&linear_genome(2)).is_err());
    }

    #[test]
    fn test_frame_fits_box() {
        let bb = BoundingBox {
            min: Point { x: -1.0, y: -0.5 },
            max: Point { x: 3.0, y: 0.5 },
        };
        let mut g = linear_genome(1);
        g.width = 200;
        g.height = 100;
        bb.frame(&mut g);
        assert_eq!((g.center_x, g.center_y), (1.0, 0.0));
        assert_eq!(g.pixels_per_unit, 50.0);
    }
}
