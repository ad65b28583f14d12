//! Structurally random genomes.

use log::warn;

use crate::compute::{RandomSource, VariationCatalog};
use crate::schema::{Affine2D, EditRecord, Genome, Palette, Xform};

use super::Breeder;

/// Xform counts drawn when the count is not forced.
const XFORM_DISTRIB: [usize; 14] = [2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 5, 5, 6];

fn random_affine(rng: &mut RandomSource) -> Affine2D {
    Affine2D {
        a: rng.next_float11(),
        b: rng.next_float11(),
        c: rng.next_float11(),
        d: rng.next_float11(),
        e: rng.next_float11(),
        f: rng.next_float11(),
    }
}

/// Add `count` randomly chosen variations with weights in (0.001, 1], then
/// normalize. Repeated picks of one variation overwrite each other.
fn add_weighted_variations(
    xform: &mut Xform,
    count: usize,
    catalog: &VariationCatalog,
    rng: &mut RandomSource,
) {
    for _ in 0..count {
        let weight = rng.next_float(0.001, 1.0);
        if let Some(v) = catalog.random_variation(weight, rng) {
            xform.add_variation(v);
        }
    }
    xform.normalize_variation_weights();
}

impl<R, I> Breeder<R, I> {
    /// Build a random genome.
    ///
    /// `count` forces the number of xforms; a forced count also suppresses
    /// the final xform and symmetry so the result has exactly `count` xforms.
    pub fn random_genome(&mut self, count: Option<usize>) -> Genome {
        let rng = &mut self.rng;
        let catalog = &*self.variations;

        let same_variation = rng.next_bit();
        let multi_variation = rng.next_bit();
        let identity_post = rng.next_float01() < 0.6;
        let same_post = rng.next_bit();
        let add_final = count.is_none() && rng.next_float01() < 0.15;
        let n = match count {
            Some(n) => n,
            None => XFORM_DISTRIB[rng.next_index(XFORM_DISTRIB.len())],
        };

        let palette = match self.palettes.random_palette(rng) {
            Ok(p) => p,
            Err(e) => {
                warn!("random genome: {e}; using white palette");
                Palette::white()
            }
        };
        let shared = catalog.random_variation(1.0, rng);

        let mut genome = Genome {
            palette,
            ..Default::default()
        };

        for _ in 0..n {
            let mut xform = Xform::new(1.0 / n as f64);
            xform.affine = random_affine(rng);
            xform.color_x = rng.next_float01();
            xform.color_y = rng.next_float01();

            if !identity_post {
                xform.post = match genome.xforms.first() {
                    Some(first) if same_post => first.post,
                    _ => random_affine(rng),
                };
            }

            if multi_variation {
                let mut nvars = 2;
                while nvars < catalog.len() && rng.next_bit() {
                    nvars += 1;
                }
                add_weighted_variations(&mut xform, nvars, catalog, rng);
            } else {
                let single = if same_variation {
                    shared.clone()
                } else {
                    catalog.random_variation(1.0, rng)
                };
                xform.variations.extend(single);
            }

            genome.add_xform(xform);
        }

        if add_final {
            let mut final_xform = Xform::new(0.0);
            final_xform.affine = random_affine(rng);
            final_xform.color_x = rng.next_float01();
            final_xform.color_y = rng.next_float01();
            let nvars = 1 + usize::from(rng.next_bit());
            add_weighted_variations(&mut final_xform, nvars, catalog, rng);
            genome.set_final_xform(Some(final_xform));
        }

        if count.is_none() && !add_final && rng.next_bounded(4) == 0 {
            genome.add_symmetry(0, rng);
        }

        genome.normalize_weights();
        genome.edits = Some(EditRecord::new("random", None, None, &self.config.lineage));
        genome
    }
}
