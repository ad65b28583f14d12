//! Genome crossover.

use std::fmt;
use std::str::FromStr;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::animation::Interpolate;
use crate::schema::{EditRecord, Genome, PALETTE_SIZE};

use super::Breeder;

/// Crossover modes, in the order of their selection thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossMode {
    Union,
    Interpolate,
    Alternate,
}

impl CrossMode {
    pub const ALL: [CrossMode; 3] = [CrossMode::Union, CrossMode::Interpolate, CrossMode::Alternate];

    /// Map a uniform draw in [0, 1] onto a mode.
    pub fn from_draw(r: f64) -> Self {
        if r < 0.1 {
            CrossMode::Union
        } else if r < 0.2 {
            CrossMode::Interpolate
        } else {
            CrossMode::Alternate
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CrossMode::Union => "union",
            CrossMode::Interpolate => "interpolate",
            CrossMode::Alternate => "alternate",
        }
    }
}

impl fmt::Display for CrossMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CrossMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| format!("unknown cross mode '{s}'"))
    }
}

impl<R, I: Interpolate> Breeder<R, I> {
    /// Breed a child from two parents. Returns the child and a description.
    pub fn cross(
        &mut self,
        parent0: &Genome,
        parent1: &Genome,
        mode: Option<CrossMode>,
    ) -> (Genome, String) {
        let mode = mode.unwrap_or_else(|| CrossMode::from_draw(self.rng.next_float01()));

        let (mut child, mut description) = match mode {
            CrossMode::Union => {
                let mut child = parent0.clone();
                for x in &parent1.xforms {
                    let mut x = x.clone();
                    x.xaos.clear();
                    child.add_xform(x);
                }
                (child, "cross union".to_string())
            }
            CrossMode::Interpolate => {
                let t = self.rng.next_float01();
                let mut keys = [parent0.clone(), parent1.clone()];
                keys[0].time = 0.0;
                keys[1].time = 1.0;
                let mut aligned = self.interpolator.align(&keys);
                self.interpolator.establish_reference_angles(&mut aligned);
                let mut child = self.interpolator.interpolate(&aligned, t, 0.0);
                child.delete_motion_elements();
                (child, format!("cross interpolate {t}"))
            }
            CrossMode::Alternate => self.cross_alternate(parent0, parent1),
        };

        // Parity coloring keeps seeded crosses reproducible.
        for (i, x) in child.xforms.iter_mut().enumerate() {
            let c = (i & 1) as f64;
            x.color_x = c;
            x.color_y = c;
        }

        if self.rng.next_float01() < 0.4 {
            let mut from_second = self.rng.next_bit();
            description.push_str(&format!(" cmap_cross {}:", u8::from(from_second)));
            for ci in 0..PALETTE_SIZE {
                if self.rng.next_float01() < 0.01 {
                    from_second = !from_second;
                    description.push_str(&format!(" {ci}"));
                }
                let src = if from_second { parent1 } else { parent0 };
                child.palette.set(ci, src.palette.get(ci));
            }
        }

        debug!("{description}");
        child.edits = Some(EditRecord::new(
            description.clone(),
            Some(parent0),
            Some(parent1),
            &self.config.lineage,
        ));
        (child, description)
    }

    /// Start from a coin-chosen parent and swap in the other parent's xforms
    /// by coin flip, until both parents contribute (or the retry guard runs out).
    fn cross_alternate(&mut self, parent0: &Genome, parent1: &Genome) -> (Genome, String) {
        let parents = [parent0, parent1];
        let max_attempts = self.config.crossover.max_attempts;
        let mut attempts = 0;

        loop {
            attempts += 1;
            let mut got = [false; 2];
            let base = usize::from(self.rng.next_bit());
            let donor = 1 - base;
            let mut child = parents[base].clone();
            let mut bits = String::new();

            for i in 0..child.xforms.len() {
                let swap = self.rng.next_bit();
                if swap {
                    match parents[donor].xforms.get(i) {
                        Some(x) if x.weight > 0.0 => {
                            child.xforms[i] = x.clone();
                            got[donor] = true;
                        }
                        _ => got[base] = true,
                    }
                } else {
                    got[base] = true;
                }
                bits.push(if swap { '1' } else { '0' });
            }

            let count = child.xforms.len();
            let satisfied = count <= 1 || (got[0] && got[1]);
            if satisfied || attempts >= max_attempts {
                if !satisfied {
                    warn!("alternate crossover kept one parent only after {attempts} attempts");
                }
                return (child, format!("cross alternate {base}:{bits}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{breeder, linear_genome};
    use super::*;
    use crate::schema::{Palette, Rgba, Xform};

    fn parent(n: usize, tag: f64) -> Genome {
        let mut g = linear_genome(n);
        for x in &mut g.xforms {
            x.affine.f = tag;
        }
        g
    }

    #[test]
    fn test_from_draw_thresholds() {
        assert_eq!(CrossMode::from_draw(0.0), CrossMode::Union);
        assert_eq!(CrossMode::from_draw(0.15), CrossMode::Interpolate);
        assert_eq!(CrossMode::from_draw(0.2), CrossMode::Alternate);
    }

    #[test]
    fn test_union_counts_and_final() {
        let mut b = breeder([1, 2, 3]);
        let mut p0 = parent(3, 1.0);
        p0.set_final_xform(Some(Xform::linear(0.0)));
        let p1 = parent(2, 2.0);

        let (child, desc) = b.cross(&p0, &p1, Some(CrossMode::Union));
        assert!(desc.starts_with("cross union"));
        assert_eq!(child.xforms.len(), 5);
        assert_eq!(child.final_xform, p0.final_xform);
    }

    #[test]
    fn test_alternate_draws_from_both_parents() {
        let mut b = breeder([4, 5, 6]);
        let p0 = parent(4, 1.0);
        let p1 = parent(4, 2.0);
        for _ in 0..50 {
            let (child, desc) = b.cross(&p0, &p1, Some(CrossMode::Alternate));
            assert!(desc.starts_with("cross alternate"));
            assert_eq!(child.xforms.len(), 4);
            assert!(child.xforms.iter().any(|x| x.affine.f == 1.0));
            assert!(child.xforms.iter().any(|x| x.affine.f == 2.0));
        }
    }

    #[test]
    fn test_alternate_single_xform_terminates() {
        let mut b = breeder([7, 8, 9]);
        let p0 = parent(1, 1.0);
        let p1 = parent(1, 2.0);
        let (child, _) = b.cross(&p0, &p1, Some(CrossMode::Alternate));
        assert_eq!(child.xforms.len(), 1);
    }

    #[test]
    fn test_alternate_gives_up_without_usable_donor() {
        let mut b = breeder([7, 8, 9]);
        let mut p0 = parent(3, 1.0);
        let mut p1 = parent(3, 2.0);
        for x in p0.xforms.iter_mut().chain(p1.xforms.iter_mut()) {
            x.weight = 0.0;
        }
        let (child, _) = b.cross(&p0, &p1, Some(CrossMode::Alternate));
        let from_p0 = child.xforms.iter().filter(|x| x.affine.f == 1.0).count();
        let from_p1 = child.xforms.iter().filter(|x| x.affine.f == 2.0).count();
        assert!(from_p0 == 3 || from_p1 == 3);
    }

    #[test]
    fn test_colors_reset_by_parity() {
        let mut b = breeder([1, 1, 1]);
        let (child, _) = b.cross(&parent(4, 1.0), &parent(4, 2.0), None);
        for (i, x) in child.xforms.iter().enumerate() {
            assert_eq!(x.color_x, (i & 1) as f64);
            assert_eq!(x.color_y, (i & 1) as f64);
        }
    }

    #[test]
    fn test_palette_entries_come_from_parents() {
        let mut b = breeder([2, 2, 2]);
        let mut p0 = parent(2, 1.0);
        let mut p1 = parent(2, 2.0);
        p0.palette = Palette::filled("red", Rgba::rgb(1.0, 0.0, 0.0));
        p1.palette = Palette::filled("blue", Rgba::rgb(0.0, 0.0, 1.0));

        let mut saw_cmap_cross = false;
        for _ in 0..20 {
            let (child, desc) = b.cross(&p0, &p1, Some(CrossMode::Union));
            saw_cmap_cross |= desc.contains("cmap_cross");
            for e in child.palette.entries() {
                assert!(*e == p0.palette.get(0) || *e == p1.palette.get(0));
            }
        }
        assert!(saw_cmap_cross);
    }

    #[test]
    fn test_interpolate_lands_between_parents() {
        let mut b = breeder([3, 3, 3]);
        let p0 = parent(2, 0.0);
        let p1 = parent(2, 1.0);
        let (child, desc) = b.cross(&p0, &p1, Some(CrossMode::Interpolate));
        let t: f64 = desc
            .trim_start_matches("cross interpolate ")
            .split_whitespace()
            .next()
            .unwrap()
            .parse()
            .unwrap();
        assert!((child.xforms[0].affine.f - t).abs() < 1e-9);
        assert!(!child.has_motion());
    }

    #[test]
    fn test_cross_records_both_parents() {
        let mut b = breeder([5, 5, 5]);
        let (child, _) = b.cross(&parent(2, 1.0), &parent(2, 2.0), None);
        assert_eq!(child.edits.map(|e| e.parents.len()), Some(2));
    }
}
