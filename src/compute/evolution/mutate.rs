//! Genome mutation.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::compute::{Renderer, make_hue_adjusted_palette};
use crate::schema::{Affine2D, EditRecord, Genome, Palette, Xform};

use super::{Breeder, BreederError};

/// Mutation modes, in the order of their selection thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationMode {
    AllVariations,
    OneXformCoefs,
    AddSymmetry,
    PostXforms,
    ColorPalette,
    DeleteXform,
    AllCoefs,
}

impl MutationMode {
    pub const ALL: [MutationMode; 7] = [
        MutationMode::AllVariations,
        MutationMode::OneXformCoefs,
        MutationMode::AddSymmetry,
        MutationMode::PostXforms,
        MutationMode::ColorPalette,
        MutationMode::DeleteXform,
        MutationMode::AllCoefs,
    ];

    /// Map a uniform draw in [0, 1] onto a mode.
    pub fn from_draw(r: f64) -> Self {
        match r {
            r if r < 0.1 => MutationMode::AllVariations,
            r if r < 0.3 => MutationMode::OneXformCoefs,
            r if r < 0.5 => MutationMode::AddSymmetry,
            r if r < 0.6 => MutationMode::PostXforms,
            r if r < 0.7 => MutationMode::ColorPalette,
            r if r < 0.8 => MutationMode::DeleteXform,
            _ => MutationMode::AllCoefs,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MutationMode::AllVariations => "all_variations",
            MutationMode::OneXformCoefs => "one_xform_coefs",
            MutationMode::AddSymmetry => "add_symmetry",
            MutationMode::PostXforms => "post_xforms",
            MutationMode::ColorPalette => "color_palette",
            MutationMode::DeleteXform => "delete_xform",
            MutationMode::AllCoefs => "all_coefs",
        }
    }
}

impl fmt::Display for MutationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MutationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| format!("unknown mutation mode '{s}'"))
    }
}

impl<R: Renderer, I> Breeder<R, I> {
    /// Mutate `genome` in place and return a description of what changed.
    ///
    /// `mode` is drawn when `None`. `sym` is passed to the symmetry mutation
    /// (0 picks an order at random). Fails only when color improvement cannot
    /// score the starting genome.
    pub fn mutate(
        &mut self,
        genome: &mut Genome,
        mode: Option<MutationMode>,
        sym: i32,
    ) -> Result<String, BreederError> {
        let mode = mode.unwrap_or_else(|| MutationMode::from_draw(self.rng.next_float01()));
        let mut record = EditRecord::new(String::new(), Some(&*genome), None, &self.config.lineage);

        let description = match mode {
            MutationMode::AllVariations => self.mutate_all_variations(genome),
            MutationMode::OneXformCoefs => self.mutate_one_xform_coefs(genome),
            MutationMode::AddSymmetry => {
                let applied = genome.add_symmetry(sym, &mut self.rng);
                format!("mutate symmetry {applied}")
            }
            MutationMode::PostXforms => self.mutate_post_xforms(genome),
            MutationMode::ColorPalette => self.mutate_color_palette(genome)?,
            MutationMode::DeleteXform => {
                if genome.xforms.len() > 1 {
                    let nx = self.rng.next_index(genome.xforms.len());
                    genome.delete_xform(nx);
                    format!("mutate delete xform {nx}")
                } else {
                    "mutate delete xform none".to_string()
                }
            }
            MutationMode::AllCoefs => self.mutate_all_coefs(genome),
        };

        debug!("{description}");
        record.action = description.clone();
        genome.edits = Some(record);
        Ok(description)
    }

    fn mutate_all_variations(&mut self, genome: &mut Genome) -> String {
        let n = genome.xforms.len();
        let max_attempts = self.config.mutation.max_attempts;

        let mut attempts = 0;
        let candidate = loop {
            let candidate = self.random_genome(Some(n));
            attempts += 1;
            let differs = genome
                .xforms
                .iter()
                .zip(&candidate.xforms)
                .any(|(a, b)| a.variation_ids() != b.variation_ids());
            if differs {
                break candidate;
            }
            if attempts >= max_attempts {
                warn!("all-variations mutation found no new variation set in {attempts} attempts");
                break candidate;
            }
        };

        let replaced = replace_differing_variations(&mut genome.xforms, candidate.xforms);
        debug!("all-variations mutation replaced {replaced} variation sets");
        "mutate all variations".to_string()
    }

    fn mutate_one_xform_coefs(&mut self, genome: &mut Genome) -> String {
        let donor = self.random_genome(Some(2));
        if genome.xforms.is_empty() {
            return "mutate xform none coefs".to_string();
        }

        let x = self.rng.next_index(genome.xforms.len());
        let source = donor.xforms[0].affine;
        let single = genome.xforms.len() < 2;
        let target = &mut genome.xforms[x].affine;
        if single {
            target.c = source.c;
            target.f = source.f;
        } else {
            *target = source;
        }
        format!("mutate xform {x} coefs")
    }

    fn mutate_post_xforms(&mut self, genome: &mut Genome) -> String {
        let b = 1 + self.rng.next_index(6);
        let same = self.rng.next_bit();
        let rng = &mut self.rng;

        for i in 0..genome.xforms.len() {
            if i > 0 && same {
                genome.xforms[i].post = genome.xforms[0].post;
                continue;
            }

            let xf = &mut genome.xforms[i];
            if b & 1 != 0 {
                let f = PI * rng.next_float11();
                xf.affine.rotate_rad(f);
                xf.post.rotate_rad(-f);
            }

            if b & 2 != 0 {
                let mut f = 0.2 + rng.next_float01();
                if rng.next_bit() {
                    f = 1.0 / f;
                }
                let mut g = if rng.next_bit() {
                    0.2 + rng.next_float01()
                } else {
                    f
                };
                if rng.next_bit() {
                    g = 1.0 / g;
                }

                let [(ax, ay), (bx, by)] = xf.affine.columns();
                xf.affine.set_columns([(ax / f, ay / f), (bx / g, by / g)]);
                xf.post.a *= f;
                xf.post.b *= f;
                xf.post.d *= g;
                xf.post.e *= g;
            }

            if b & 4 != 0 {
                let f = rng.next_float11();
                let g = rng.next_float11();
                xf.affine.c -= f;
                xf.affine.f -= g;
                xf.post.c += f;
                xf.post.f += g;
            }
        }

        format!("mutate post xforms {b}{}", if same { " same" } else { "" })
    }

    fn mutate_color_palette(&mut self, genome: &mut Genome) -> Result<String, BreederError> {
        let s = self.rng.next_float01();
        let resolution = self.config.mutation.color_resolution;

        if s < 0.4 {
            let tries = self.config.mutation.color_coord_tries;
            self.improve_colors(genome, tries, false, resolution)?;
            Ok("mutate color coords".to_string())
        } else if s < 0.8 {
            let tries = self.config.mutation.color_palette_tries;
            self.improve_colors(genome, tries, true, resolution)?;
            Ok("mutate color all".to_string())
        } else {
            genome.palette = match self.palettes.random_palette(&mut self.rng) {
                Ok(p) => make_hue_adjusted_palette(&p, genome.hue),
                Err(e) => {
                    warn!("palette mutation: {e}; using white palette");
                    Palette::white()
                }
            };
            Ok("mutate color palette".to_string())
        }
    }

    fn mutate_all_coefs(&mut self, genome: &mut Genome) -> String {
        let donor = self.random_genome(Some(genome.xforms.len()));
        let speed = self.config.mutation.speed;
        for (x, d) in genome.xforms.iter_mut().zip(&donor.xforms) {
            let mut coefs = x.affine.coefs();
            for (c, dc) in coefs.iter_mut().zip(d.affine.coefs()) {
                *c += speed * dc;
            }
            x.affine = Affine2D::from_coefs(coefs);
        }
        "mutate all coefs".to_string()
    }
}

/// Take the candidate's variation set for every xform whose set of ids
/// differs; matching xforms keep their own weights and params.
fn replace_differing_variations(xforms: &mut [Xform], candidate: Vec<Xform>) -> usize {
    let mut replaced = 0;
    for (x, c) in xforms.iter_mut().zip(candidate) {
        if x.variation_ids() != c.variation_ids() {
            x.variations = c.variations;
            replaced += 1;
        }
    }
    replaced
}
