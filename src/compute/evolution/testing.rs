//! Deterministic fake oracles for operator tests.

use std::sync::Arc;

use crate::animation::LinearInterpolator;
use crate::compute::{
    OracleError, PaletteCatalog, Point, PointIterator, RandomSource, RenderSettings,
    RenderedImage, Renderer, VariationCatalog,
};
use crate::schema::{BreederConfig, Genome, Xform};

use super::Breeder;

/// Renders one pixel per xform, colored by the palette at the xform's color
/// coordinate. Iteration replays `points`.
#[derive(Debug, Default)]
pub(crate) struct MockRenderer {
    pub calls: usize,
    /// Calls after this many succeed fail.
    pub fail_after: Option<usize>,
    pub points: Vec<Point>,
    pub escapes: usize,
}

impl Renderer for MockRenderer {
    fn render(
        &mut self,
        genome: &Genome,
        _settings: &RenderSettings,
    ) -> Result<RenderedImage, OracleError> {
        self.calls += 1;
        if let Some(n) = self.fail_after
            && self.calls > n
        {
            return Err(OracleError::Failed("mock failure".to_string()));
        }

        let pixels: Vec<u8> = genome
            .total_xforms()
            .flat_map(|x| {
                let c = genome.palette.lookup(x.color_x);
                [c.r, c.g, c.b].map(|v| (v * 255.0).round() as u8)
            })
            .collect();
        Ok(RenderedImage {
            width: pixels.len() / 3,
            height: 1,
            channels: 3,
            pixels,
        })
    }

    fn thread_count(&self) -> usize {
        1
    }

    fn channels(&self) -> usize {
        3
    }
}

impl PointIterator for MockRenderer {
    fn iterate(
        &mut self,
        _genome: &Genome,
        count: usize,
        _warmup: usize,
        _rng: &mut RandomSource,
        out: &mut Vec<Point>,
    ) -> Result<usize, OracleError> {
        if self.points.is_empty() {
            return Err(OracleError::Failed("no points".to_string()));
        }
        out.clear();
        out.extend(self.points.iter().cycle().take(count));
        Ok(self.escapes)
    }
}

pub(crate) fn breeder_with(
    seed: [u32; 3],
    renderer: MockRenderer,
) -> Breeder<MockRenderer, LinearInterpolator> {
    let config = BreederConfig {
        seed: Some(seed),
        ..Default::default()
    };
    match Breeder::new(
        config,
        Arc::new(VariationCatalog::builtin()),
        Arc::new(PaletteCatalog::builtin()),
        renderer,
        LinearInterpolator,
    ) {
        Ok(b) => b,
        Err(e) => panic!("test breeder: {e}"),
    }
}

pub(crate) fn breeder(seed: [u32; 3]) -> Breeder<MockRenderer, LinearInterpolator> {
    breeder_with(seed, MockRenderer::default())
}

/// `n` linear xforms of equal weight with distinct translations.
pub(crate) fn linear_genome(n: usize) -> Genome {
    let mut g = Genome::default();
    for i in 0..n {
        let mut x = Xform::linear(1.0 / n as f64);
        x.affine.a = 0.5;
        x.affine.e = 0.5;
        x.affine.c = i as f64 * 0.25;
        g.add_xform(x);
    }
    g
}
