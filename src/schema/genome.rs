//! Genome types: transforms, affine maps, motion elements and the flame genome itself.

use std::collections::BTreeSet;
use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use super::{EditRecord, Palette, Variation, VariationId};
use crate::compute::RandomSource;

/// Catalog id of the linear variation; symmetry and padding xforms use it.
pub const LINEAR: VariationId = VariationId(0);

/// A 2x3 affine map: `x' = a*x + b*y + c`, `y' = d*x + e*y + f`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Affine2D {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for Affine2D {
    fn default() -> Self {
        Self::identity()
    }
}

impl Affine2D {
    pub const fn identity() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 0.0,
            e: 1.0,
            f: 0.0,
        }
    }

    pub const fn zero() -> Self {
        Self {
            a: 0.0,
            b: 0.0,
            c: 0.0,
            d: 0.0,
            e: 0.0,
            f: 0.0,
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }

    #[inline]
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.b * y + self.c,
            self.d * x + self.e * y + self.f,
        )
    }

    /// Coefficients in `[a, b, c, d, e, f]` order.
    pub fn coefs(&self) -> [f64; 6] {
        [self.a, self.b, self.c, self.d, self.e, self.f]
    }

    pub fn from_coefs(c: [f64; 6]) -> Self {
        Self {
            a: c[0],
            b: c[1],
            c: c[2],
            d: c[3],
            e: c[4],
            f: c[5],
        }
    }

    /// Images of the x and y unit vectors: `(a, d)` and `(b, e)`.
    pub fn columns(&self) -> [(f64, f64); 2] {
        [(self.a, self.d), (self.b, self.e)]
    }

    pub fn set_columns(&mut self, cols: [(f64, f64); 2]) {
        (self.a, self.d) = cols[0];
        (self.b, self.e) = cols[1];
    }

    pub fn determinant(&self) -> f64 {
        self.a * self.e - self.b * self.d
    }

    /// Rotate the linear part about the origin by `radians`; translation is kept.
    pub fn rotate_rad(&mut self, radians: f64) {
        let (s, c) = radians.sin_cos();
        let cols = self
            .columns()
            .map(|(x, y)| (x * c - y * s, x * s + y * c));
        self.set_columns(cols);
    }

    /// Rotate the linear part by `degrees`.
    pub fn rotate(&mut self, degrees: f64) {
        self.rotate_rad(degrees.to_radians());
    }
}

/// Periodic function driving a motion element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MotionFunc {
    #[default]
    Sin,
    Triangle,
    Hill,
    Saw,
}

impl MotionFunc {
    /// Evaluate at `t` (one period per unit of `t`). Output range [-1, 1], or [0, 1] for `Hill`.
    pub fn eval(self, t: f64) -> f64 {
        match self {
            MotionFunc::Sin => (2.0 * PI * t).sin(),
            MotionFunc::Triangle => {
                let fr = t.rem_euclid(1.0);
                if fr <= 0.25 {
                    4.0 * fr
                } else if fr <= 0.75 {
                    -4.0 * fr + 2.0
                } else {
                    4.0 * fr - 4.0
                }
            }
            MotionFunc::Hill => (1.0 - (2.0 * PI * t).cos()) * 0.5,
            MotionFunc::Saw => 2.0 * t.rem_euclid(1.0) - 1.0,
        }
    }
}

fn default_motion_freq() -> f64 {
    1.0
}

/// An authored motion element: per-field deltas scaled by a periodic function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Motion {
    #[serde(default)]
    pub func: MotionFunc,
    #[serde(default = "default_motion_freq")]
    pub freq: f64,
    #[serde(default)]
    pub weight: f64,
    #[serde(default)]
    pub color_x: f64,
    #[serde(default)]
    pub color_y: f64,
    #[serde(default)]
    pub color_speed: f64,
    #[serde(default)]
    pub opacity: f64,
    #[serde(default = "Affine2D::zero")]
    pub affine: Affine2D,
    #[serde(default = "Affine2D::zero")]
    pub post: Affine2D,
    /// Variation weight deltas (the variation's `weight` is the delta).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variations: Vec<Variation>,
}

impl Default for Motion {
    fn default() -> Self {
        Self {
            func: MotionFunc::Sin,
            freq: default_motion_freq(),
            weight: 0.0,
            color_x: 0.0,
            color_y: 0.0,
            color_speed: 0.0,
            opacity: 0.0,
            affine: Affine2D::zero(),
            post: Affine2D::zero(),
            variations: Vec::new(),
        }
    }
}

fn default_color_speed() -> f64 {
    0.5
}
fn default_opacity() -> f64 {
    1.0
}
fn default_animate() -> bool {
    true
}

/// A transform: affine map plus weighted variations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Xform {
    /// Selection weight (>= 0). Forced to 0 for the final transform.
    pub weight: f64,
    pub affine: Affine2D,
    #[serde(default)]
    pub post: Affine2D,
    pub color_x: f64,
    #[serde(default)]
    pub color_y: f64,
    #[serde(default = "default_color_speed")]
    pub color_speed: f64,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    /// Whether animation rotates this transform (symmetry transforms don't).
    #[serde(default = "default_animate")]
    pub animate: bool,
    pub variations: Vec<Variation>,
    /// Transition weights to each xform; empty means uniform.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub xaos: Vec<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub motion: Vec<Motion>,
    /// Inserted by alignment, not authored.
    #[serde(skip)]
    pub padding: bool,
    /// Reference angles of the two affine columns, set before polar interpolation.
    #[serde(skip)]
    pub wind: [f64; 2],
}

impl Default for Xform {
    fn default() -> Self {
        Self {
            weight: 0.0,
            affine: Affine2D::identity(),
            post: Affine2D::identity(),
            color_x: 0.0,
            color_y: 0.0,
            color_speed: default_color_speed(),
            opacity: default_opacity(),
            animate: true,
            variations: Vec::new(),
            xaos: Vec::new(),
            motion: Vec::new(),
            padding: false,
            wind: [0.0; 2],
        }
    }
}

impl Xform {
    pub fn new(weight: f64) -> Self {
        Self {
            weight,
            ..Default::default()
        }
    }

    /// Identity xform with a single linear variation.
    pub fn linear(weight: f64) -> Self {
        let mut xform = Self::new(weight);
        xform.variations.push(Variation::new(LINEAR, "linear", 1.0));
        xform
    }

    pub fn variation(&self, id: VariationId) -> Option<&Variation> {
        self.variations.iter().find(|v| v.id == id)
    }

    pub fn variation_mut(&mut self, id: VariationId) -> Option<&mut Variation> {
        self.variations.iter_mut().find(|v| v.id == id)
    }

    /// Add a variation, replacing any existing one with the same id.
    pub fn add_variation(&mut self, variation: Variation) {
        match self.variation_mut(variation.id) {
            Some(existing) => *existing = variation,
            None => self.variations.push(variation),
        }
    }

    pub fn variation_ids(&self) -> BTreeSet<VariationId> {
        self.variations.iter().map(|v| v.id).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.variations.is_empty()
    }

    /// Scale variation weights to sum to 1. Returns false if they sum to 0.
    pub fn normalize_variation_weights(&mut self) -> bool {
        let sum: f64 = self.variations.iter().map(|v| v.weight).sum();
        if sum == 0.0 {
            return false;
        }
        for v in &mut self.variations {
            v.weight /= sum;
        }
        true
    }

    /// Transition weight to xform `to`.
    pub fn xaos_to(&self, to: usize) -> f64 {
        self.xaos.get(to).copied().unwrap_or(1.0)
    }

    pub fn delete_motion_elements(&mut self) {
        self.motion.clear();
    }
}

/// Interpolation curve between keyframes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    #[default]
    Linear,
    Smooth,
}

/// Color space for palette interpolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaletteInterp {
    #[default]
    Hsv,
    Rgb,
}

/// How affine coefficients are blended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AffineInterp {
    #[default]
    Linear,
    /// Interpolate column angles and log-magnitudes.
    Polar,
}

/// A complete flame genome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Genome {
    pub name: String,
    pub time: f64,
    pub xforms: Vec<Xform>,
    pub final_xform: Option<Xform>,
    pub palette: Palette,
    /// Hue rotation applied to the palette, in [0, 1).
    pub hue: f64,
    pub width: usize,
    pub height: usize,
    pub center_x: f64,
    pub center_y: f64,
    /// Camera rotation in degrees.
    pub rotate: f64,
    pub pixels_per_unit: f64,
    pub zoom: f64,
    pub quality: f64,
    pub supersample: usize,
    pub spatial_filter_radius: f64,
    pub de_max_radius: f64,
    pub de_min_radius: f64,
    pub de_curve: f64,
    pub gamma: f64,
    pub gamma_threshold: f64,
    pub brightness: f64,
    pub vibrancy: f64,
    pub highlight_power: f64,
    pub background: [f64; 3],
    pub temporal_samples: usize,
    pub temporal_filter_width: f64,
    pub temporal_filter_exp: f64,
    pub interpolation: Interpolation,
    pub palette_interp: PaletteInterp,
    pub affine_interp: AffineInterp,
    /// Symmetry order added by `add_symmetry` (0 when none).
    pub symmetry: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edits: Option<EditRecord>,
}

impl Default for Genome {
    fn default() -> Self {
        Self {
            name: String::new(),
            time: 0.0,
            xforms: Vec::new(),
            final_xform: None,
            palette: Palette::default(),
            hue: 0.0,
            width: 100,
            height: 100,
            center_x: 0.0,
            center_y: 0.0,
            rotate: 0.0,
            pixels_per_unit: 50.0,
            zoom: 0.0,
            quality: 1.0,
            supersample: 1,
            spatial_filter_radius: 0.5,
            de_max_radius: 9.0,
            de_min_radius: 0.0,
            de_curve: 0.4,
            gamma: 4.0,
            gamma_threshold: 0.01,
            brightness: 4.0,
            vibrancy: 1.0,
            highlight_power: -1.0,
            background: [0.0; 3],
            temporal_samples: 1000,
            temporal_filter_width: 1.0,
            temporal_filter_exp: 0.0,
            interpolation: Interpolation::Linear,
            palette_interp: PaletteInterp::Hsv,
            affine_interp: AffineInterp::Linear,
            symmetry: 0,
            edits: None,
        }
    }
}

impl Genome {
    /// Number of xforms including the final xform.
    pub fn total_xform_count(&self) -> usize {
        self.xforms.len() + usize::from(self.final_xform.is_some())
    }

    /// Xform by total index; the final xform sits after the regular ones.
    pub fn total_xform(&self, i: usize) -> Option<&Xform> {
        if i < self.xforms.len() {
            self.xforms.get(i)
        } else if i == self.xforms.len() {
            self.final_xform.as_ref()
        } else {
            None
        }
    }

    pub fn total_xform_mut(&mut self, i: usize) -> Option<&mut Xform> {
        if i < self.xforms.len() {
            self.xforms.get_mut(i)
        } else if i == self.xforms.len() {
            self.final_xform.as_mut()
        } else {
            None
        }
    }

    pub fn total_xforms(&self) -> impl Iterator<Item = &Xform> {
        self.xforms.iter().chain(self.final_xform.iter())
    }

    pub fn total_xforms_mut(&mut self) -> impl Iterator<Item = &mut Xform> {
        self.xforms.iter_mut().chain(self.final_xform.iter_mut())
    }

    /// Install a final xform; its weight is forced to 0.
    pub fn set_final_xform(&mut self, xform: Option<Xform>) {
        self.final_xform = xform.map(|mut x| {
            x.weight = 0.0;
            x.xaos.clear();
            x
        });
    }

    /// True if any xform carries a non-uniform transition row.
    pub fn uses_xaos(&self) -> bool {
        self.xforms
            .iter()
            .any(|x| x.xaos.iter().any(|&w| w != 1.0))
    }

    /// Keep xaos rows square after structural edits.
    fn resize_xaos(&mut self) {
        if !self.xforms.iter().any(|x| !x.xaos.is_empty()) {
            return;
        }
        let n = self.xforms.len();
        for x in &mut self.xforms {
            x.xaos.resize(n, 1.0);
        }
    }

    /// Append a non-final xform, padding transition rows with 1.
    pub fn add_xform(&mut self, xform: Xform) {
        self.xforms.push(xform);
        self.resize_xaos();
    }

    /// Remove non-final xform `i` and its transition column. Returns the removed xform.
    pub fn delete_xform(&mut self, i: usize) -> Option<Xform> {
        if i >= self.xforms.len() {
            return None;
        }
        let removed = self.xforms.remove(i);
        for x in &mut self.xforms {
            if i < x.xaos.len() {
                x.xaos.remove(i);
            }
        }
        Some(removed)
    }

    pub fn xform_weight_sum(&self) -> f64 {
        self.xforms.iter().map(|x| x.weight).sum()
    }

    /// Scale non-final weights to sum to 1.
    pub fn normalize_weights(&mut self) {
        let sum = self.xform_weight_sum();
        if sum > 0.0 {
            for x in &mut self.xforms {
                x.weight /= sum;
            }
        }
    }

    pub fn delete_motion_elements(&mut self) {
        for x in self.total_xforms_mut() {
            x.delete_motion_elements();
        }
    }

    pub fn has_motion(&self) -> bool {
        self.total_xforms().any(|x| !x.motion.is_empty())
    }

    /// Rotate the pre and post affines of every animated xform by `degrees`.
    pub fn rotate_affines(&mut self, degrees: f64) {
        for x in self.total_xforms_mut().filter(|x| x.animate) {
            x.affine.rotate(degrees);
            x.post.rotate(degrees);
        }
    }

    /// Add rotational (and, for negative orders, reflective) symmetry.
    ///
    /// `sym == 0` picks an order at random; orders 0 and 1 are no-ops.
    /// Returns the order actually applied.
    pub fn add_symmetry(&mut self, sym: i32, rng: &mut RandomSource) -> i32 {
        const SYM_DISTRIB: [i32; 15] = [-4, -3, -2, -2, -2, -1, -1, -1, 2, 2, 2, 3, 3, 4, 4];

        let mut sym = sym;
        if sym == 0 {
            sym = if rng.next_bit() {
                SYM_DISTRIB[rng.next_index(SYM_DISTRIB.len())]
            } else if rng.next_bounded(32) != 0 {
                rng.next_index(13) as i32 - 6
            } else {
                rng.next_index(51) as i32 - 25
            };
        }

        if sym == 0 || sym == 1 {
            return sym;
        }
        self.symmetry = sym;

        if sym < 0 {
            let mut x = symmetry_xform(1.0);
            x.affine = Affine2D {
                a: -1.0,
                ..Affine2D::identity()
            };
            self.add_xform(x);
            sym = -sym;
        }

        let step = 2.0 * PI / sym as f64;
        for k in 1..sym {
            let color = if sym < 3 {
                0.0
            } else {
                (k as f64 - 1.0) / (sym as f64 - 2.0)
            };
            let mut x = symmetry_xform(color);
            let (s, c) = (k as f64 * step).sin_cos();
            x.affine = Affine2D {
                a: round6(c),
                b: round6(-s),
                c: 0.0,
                d: round6(s),
                e: round6(c),
                f: 0.0,
            };
            self.add_xform(x);
        }

        self.symmetry
    }
}

fn symmetry_xform(color: f64) -> Xform {
    let mut x = Xform::linear(1.0);
    x.color_speed = 0.0;
    x.animate = false;
    x.color_x = color;
    x.color_y = color;
    x
}

fn round6(x: f64) -> f64 {
    (x * 1e6).round() / 1e6
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_xform_genome() -> Genome {
        let mut g = Genome::default();
        g.add_xform(Xform::linear(0.5));
        g.add_xform(Xform::linear(0.5));
        g
    }

    #[test]
    fn test_affine_rotate_keeps_translation() {
        let mut a = Affine2D {
            c: 0.3,
            f: -0.2,
            ..Affine2D::identity()
        };
        a.rotate(90.0);
        assert!((a.a - 0.0).abs() < 1e-12);
        assert!((a.d - 1.0).abs() < 1e-12);
        assert!((a.b + 1.0).abs() < 1e-12);
        assert_eq!((a.c, a.f), (0.3, -0.2));
        assert!((a.determinant() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_motion_funcs() {
        assert!(MotionFunc::Sin.eval(0.25) > 0.999);
        assert!((MotionFunc::Triangle.eval(0.25) - 1.0).abs() < 1e-12);
        assert!((MotionFunc::Triangle.eval(0.75) + 1.0).abs() < 1e-12);
        assert!((MotionFunc::Hill.eval(0.5) - 1.0).abs() < 1e-12);
        assert!((MotionFunc::Saw.eval(0.0) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_final_xform_weight_forced_zero() {
        let mut g = two_xform_genome();
        g.set_final_xform(Some(Xform::linear(3.0)));
        assert_eq!(g.final_xform.as_ref().map(|x| x.weight), Some(0.0));
        assert_eq!(g.total_xform_count(), 3);
        assert!(g.total_xform(2).is_some());
        assert!(g.total_xform(3).is_none());
    }

    #[test]
    fn test_xaos_rows_stay_square() {
        let mut g = two_xform_genome();
        g.xforms[0].xaos = vec![0.0, 2.0];
        g.xforms[1].xaos = vec![1.0, 1.0];
        g.add_xform(Xform::linear(1.0));
        assert!(g.xforms.iter().all(|x| x.xaos.len() == 3));

        g.delete_xform(1);
        assert_eq!(g.xforms[0].xaos, vec![0.0, 1.0]);
        assert!(g.uses_xaos());
    }

    #[test]
    fn test_symmetry_rotation_adds_xforms() {
        let mut g = two_xform_genome();
        let mut rng = RandomSource::new(1, 2, 3);
        assert_eq!(g.add_symmetry(4, &mut rng), 4);
        assert_eq!(g.xforms.len(), 5);
        assert!(g.xforms[2..].iter().all(|x| !x.animate && x.weight == 1.0));
    }

    #[test]
    fn test_symmetry_reflection() {
        let mut g = two_xform_genome();
        let mut rng = RandomSource::new(1, 2, 3);
        g.add_symmetry(-2, &mut rng);
        assert_eq!(g.xforms.len(), 4);
        assert_eq!(g.xforms[2].affine.a, -1.0);
    }

    #[test]
    fn test_symmetry_one_is_noop() {
        let mut g = two_xform_genome();
        let mut rng = RandomSource::new(1, 2, 3);
        g.add_symmetry(1, &mut rng);
        assert_eq!(g.xforms.len(), 2);
    }

    #[test]
    fn test_rotate_affines_skips_symmetry() {
        let mut g = two_xform_genome();
        let mut rng = RandomSource::new(1, 2, 3);
        g.add_symmetry(2, &mut rng);
        let sym_before = g.xforms[2].affine;
        g.rotate_affines(45.0);
        assert_eq!(g.xforms[2].affine, sym_before);
        assert!(g.xforms[0].affine != Affine2D::identity());
    }
}
