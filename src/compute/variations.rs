//! Variation catalog: an explicitly constructed registry mapping variation ids
//! to pure evaluation and self-randomization functions.

use std::f64::consts::PI;

use crate::schema::{Variation, VariationId};

use super::RandomSource;

const EPS: f64 = 1e-10;

/// Pre-variation point after the affine map, with the polar quantities most
/// variations share.
#[derive(Debug, Clone, Copy)]
pub struct VarPoint {
    pub x: f64,
    pub y: f64,
    /// `x² + y²`
    pub sumsq: f64,
    /// `sqrt(sumsq)`
    pub sqrt: f64,
    /// `atan2(x, y)`
    pub atan_xy: f64,
    /// `atan2(y, x)`
    pub atan_yx: f64,
}

impl VarPoint {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        let sumsq = x * x + y * y;
        Self {
            x,
            y,
            sumsq,
            sqrt: sumsq.sqrt(),
            atan_xy: x.atan2(y),
            atan_yx: y.atan2(x),
        }
    }

    /// `(x/r, y/r)` with a guard against division by zero.
    #[inline]
    fn sin_cos_a(&self) -> (f64, f64) {
        let r = self.sqrt + EPS;
        (self.x / r, self.y / r)
    }
}

/// Weighted contribution of a variation at a point.
pub type EvalFn = fn(&Variation, &VarPoint, &mut RandomSource) -> (f64, f64);

/// A named parameter and the range it is randomized over.
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub default: f64,
    pub lo: f64,
    pub hi: f64,
    /// Randomized values are floored to integers.
    pub integer: bool,
}

const fn param(name: &'static str, default: f64, lo: f64, hi: f64) -> ParamSpec {
    ParamSpec {
        name,
        default,
        lo,
        hi,
        integer: false,
    }
}

/// Catalog entry for one variation.
#[derive(Debug, Clone, Copy)]
pub struct VariationSpec {
    pub id: VariationId,
    pub name: &'static str,
    pub params: &'static [ParamSpec],
    pub eval: EvalFn,
}

impl VariationSpec {
    /// Fresh variation with default parameters.
    pub fn prototype(&self, weight: f64) -> Variation {
        let mut v = Variation::new(self.id, self.name, weight);
        for p in self.params {
            v.params.insert(p.name.to_string(), p.default);
        }
        v
    }

    /// Redraw every parameter of `v` within its range.
    pub fn randomize(&self, v: &mut Variation, rng: &mut RandomSource) {
        for p in self.params {
            let mut value = rng.next_float(p.lo, p.hi);
            if p.integer {
                value = value.floor();
            }
            v.params.insert(p.name.to_string(), value);
        }
    }
}

/// Read-only registry of variations, indexed by position and by id.
#[derive(Debug, Clone)]
pub struct VariationCatalog {
    specs: Vec<VariationSpec>,
}

impl Default for VariationCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl VariationCatalog {
    pub fn new(specs: Vec<VariationSpec>) -> Self {
        Self { specs }
    }

    /// The classic variations, ids 0 through 20.
    pub fn builtin() -> Self {
        Self::new(BUILTIN.to_vec())
    }

    /// Only the named variations, in catalog order.
    pub fn subset(&self, names: &[&str]) -> Self {
        Self::new(
            self.specs
                .iter()
                .filter(|s| names.contains(&s.name))
                .copied()
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn specs(&self) -> &[VariationSpec] {
        &self.specs
    }

    pub fn get(&self, id: VariationId) -> Option<&VariationSpec> {
        self.specs.iter().find(|s| s.id == id)
    }

    pub fn by_name(&self, name: &str) -> Option<&VariationSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    /// Uniformly chosen entry; `None` only for an empty catalog.
    pub fn random_spec(&self, rng: &mut RandomSource) -> Option<&VariationSpec> {
        if self.specs.is_empty() {
            return None;
        }
        self.specs.get(rng.next_index(self.specs.len()))
    }

    /// Uniformly chosen variation with randomized parameters.
    pub fn random_variation(&self, weight: f64, rng: &mut RandomSource) -> Option<Variation> {
        let spec = *self.random_spec(rng)?;
        let mut v = spec.prototype(weight);
        spec.randomize(&mut v, rng);
        Some(v)
    }

    /// Evaluate `v` at `p`. `None` if the id is not in the catalog.
    #[inline]
    pub fn eval(&self, v: &Variation, p: &VarPoint, rng: &mut RandomSource) -> Option<(f64, f64)> {
        self.get(v.id).map(|s| (s.eval)(v, p, rng))
    }
}

fn linear(v: &Variation, p: &VarPoint, _: &mut RandomSource) -> (f64, f64) {
    (v.weight * p.x, v.weight * p.y)
}

fn sinusoidal(v: &Variation, p: &VarPoint, _: &mut RandomSource) -> (f64, f64) {
    (v.weight * p.x.sin(), v.weight * p.y.sin())
}

fn spherical(v: &Variation, p: &VarPoint, _: &mut RandomSource) -> (f64, f64) {
    let r = v.weight / (p.sumsq + EPS);
    (r * p.x, r * p.y)
}

fn swirl(v: &Variation, p: &VarPoint, _: &mut RandomSource) -> (f64, f64) {
    let (s, c) = p.sumsq.sin_cos();
    (v.weight * (s * p.x - c * p.y), v.weight * (c * p.x + s * p.y))
}

fn horseshoe(v: &Variation, p: &VarPoint, _: &mut RandomSource) -> (f64, f64) {
    let r = v.weight / (p.sqrt + EPS);
    (r * (p.x - p.y) * (p.x + p.y), r * 2.0 * p.x * p.y)
}

fn polar(v: &Variation, p: &VarPoint, _: &mut RandomSource) -> (f64, f64) {
    (v.weight * p.atan_xy / PI, v.weight * (p.sqrt - 1.0))
}

fn handkerchief(v: &Variation, p: &VarPoint, _: &mut RandomSource) -> (f64, f64) {
    let (a, r) = (p.atan_xy, p.sqrt);
    (v.weight * r * (a + r).sin(), v.weight * r * (a - r).cos())
}

fn heart(v: &Variation, p: &VarPoint, _: &mut RandomSource) -> (f64, f64) {
    let r = p.sqrt;
    let (s, c) = (p.atan_xy * r).sin_cos();
    (v.weight * r * s, -v.weight * r * c)
}

fn disc(v: &Variation, p: &VarPoint, _: &mut RandomSource) -> (f64, f64) {
    let a = p.atan_xy / PI;
    let (s, c) = (PI * p.sqrt).sin_cos();
    (v.weight * a * s, v.weight * a * c)
}

fn spiral(v: &Variation, p: &VarPoint, _: &mut RandomSource) -> (f64, f64) {
    let r = p.sqrt + EPS;
    let (sina, cosa) = p.sin_cos_a();
    let (sr, cr) = r.sin_cos();
    let r1 = v.weight / r;
    (r1 * (cosa + sr), r1 * (sina - cr))
}

fn hyperbolic(v: &Variation, p: &VarPoint, _: &mut RandomSource) -> (f64, f64) {
    let r = p.sqrt + EPS;
    let (sina, cosa) = p.sin_cos_a();
    (v.weight * sina / r, v.weight * cosa * r)
}

fn diamond(v: &Variation, p: &VarPoint, _: &mut RandomSource) -> (f64, f64) {
    let (sina, cosa) = p.sin_cos_a();
    let (sr, cr) = p.sqrt.sin_cos();
    (v.weight * sina * cr, v.weight * cosa * sr)
}

fn julia(v: &Variation, p: &VarPoint, rng: &mut RandomSource) -> (f64, f64) {
    let mut a = 0.5 * p.atan_yx;
    if rng.next_bit() {
        a += PI;
    }
    let r = v.weight * p.sqrt.sqrt();
    let (s, c) = a.sin_cos();
    (r * c, r * s)
}

fn bent(v: &Variation, p: &VarPoint, _: &mut RandomSource) -> (f64, f64) {
    let nx = if p.x < 0.0 { p.x * 2.0 } else { p.x };
    let ny = if p.y < 0.0 { p.y / 2.0 } else { p.y };
    (v.weight * nx, v.weight * ny)
}

fn fisheye(v: &Variation, p: &VarPoint, _: &mut RandomSource) -> (f64, f64) {
    let r = 2.0 * v.weight / (p.sqrt + 1.0);
    (r * p.y, r * p.x)
}

fn bubble(v: &Variation, p: &VarPoint, _: &mut RandomSource) -> (f64, f64) {
    let r = v.weight / (0.25 * p.sumsq + 1.0);
    (r * p.x, r * p.y)
}

fn cylinder(v: &Variation, p: &VarPoint, _: &mut RandomSource) -> (f64, f64) {
    (v.weight * p.x.sin(), v.weight * p.y)
}

fn blob(v: &Variation, p: &VarPoint, _: &mut RandomSource) -> (f64, f64) {
    let high = v.param_or("blob_high", 1.0);
    let low = v.param_or("blob_low", 0.0);
    let waves = v.param_or("blob_waves", 1.0);
    let (sina, cosa) = p.sin_cos_a();
    let r = p.sqrt * (low + (high - low) * (0.5 + 0.5 * (waves * p.atan_xy).sin()));
    (v.weight * sina * r, v.weight * cosa * r)
}

fn pdj(v: &Variation, p: &VarPoint, _: &mut RandomSource) -> (f64, f64) {
    let a = v.param_or("pdj_a", 0.0);
    let b = v.param_or("pdj_b", 0.0);
    let c = v.param_or("pdj_c", 0.0);
    let d = v.param_or("pdj_d", 0.0);
    let nx1 = (b * p.x).cos();
    let nx2 = (c * p.x).sin();
    let ny1 = (a * p.y).sin();
    let ny2 = (d * p.y).cos();
    (v.weight * (ny1 - nx1), v.weight * (nx2 - ny2))
}

fn rings2(v: &Variation, p: &VarPoint, _: &mut RandomSource) -> (f64, f64) {
    let val = v.param_or("rings2_val", 0.0);
    let dx = val * val + EPS;
    let mut r = p.sqrt;
    r += -2.0 * dx * ((r + dx) / (2.0 * dx)).trunc() + r * (1.0 - dx);
    let (sina, cosa) = p.sin_cos_a();
    (v.weight * sina * r, v.weight * cosa * r)
}

fn curl(v: &Variation, p: &VarPoint, _: &mut RandomSource) -> (f64, f64) {
    let c1 = v.param_or("curl_c1", 1.0);
    let c2 = v.param_or("curl_c2", 0.0);
    let re = 1.0 + c1 * p.x + c2 * (p.x * p.x - p.y * p.y);
    let im = c1 * p.y + 2.0 * c2 * p.x * p.y;
    let r = v.weight / (re * re + im * im + EPS);
    ((p.x * re + p.y * im) * r, (p.y * re - p.x * im) * r)
}

const BLOB_PARAMS: &[ParamSpec] = &[
    param("blob_high", 1.0, 0.8, 1.2),
    param("blob_low", 0.0, 0.2, 0.7),
    ParamSpec {
        name: "blob_waves",
        default: 1.0,
        lo: 2.0,
        hi: 7.0,
        integer: true,
    },
];

const PDJ_PARAMS: &[ParamSpec] = &[
    param("pdj_a", 0.0, -3.0, 3.0),
    param("pdj_b", 0.0, -3.0, 3.0),
    param("pdj_c", 0.0, -3.0, 3.0),
    param("pdj_d", 0.0, -3.0, 3.0),
];

const RINGS2_PARAMS: &[ParamSpec] = &[param("rings2_val", 0.0, 0.0, 2.0)];

const CURL_PARAMS: &[ParamSpec] = &[
    param("curl_c1", 1.0, 0.0, 1.0),
    param("curl_c2", 0.0, 0.0, 1.0),
];

macro_rules! spec {
    ($id:expr, $name:ident) => {
        spec!($id, $name, &[])
    };
    ($id:expr, $name:ident, $params:expr) => {
        VariationSpec {
            id: VariationId($id),
            name: stringify!($name),
            params: $params,
            eval: $name,
        }
    };
}

const BUILTIN: [VariationSpec; 21] = [
    spec!(0, linear),
    spec!(1, sinusoidal),
    spec!(2, spherical),
    spec!(3, swirl),
    spec!(4, horseshoe),
    spec!(5, polar),
    spec!(6, handkerchief),
    spec!(7, heart),
    spec!(8, disc),
    spec!(9, spiral),
    spec!(10, hyperbolic),
    spec!(11, diamond),
    spec!(13, julia),
    spec!(14, bent),
    spec!(16, fisheye),
    spec!(28, bubble),
    spec!(29, cylinder),
    spec!(23, blob, BLOB_PARAMS),
    spec!(24, pdj, PDJ_PARAMS),
    spec!(26, rings2, RINGS2_PARAMS),
    spec!(39, curl, CURL_PARAMS),
];
