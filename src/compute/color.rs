//! Color pipeline: HSV conversion, palette adjustment and tone mapping.
//!
//! Hue is expressed on a `[0, 6)` scale (one unit per 60° sector). Palette
//! entries are normalized to [0, 1]; `calc_new_rgb` works on the 0..255 scale
//! of accumulated histogram colors.

use crate::schema::{PALETTE_SIZE, Palette, Rgba};

/// Largest blur radius; wider windows would wrap onto the center entry.
pub const MAX_BLUR: usize = 127;

/// Convert RGB in [0, 1] to HSV with `h` in [0, 6), `s` and `v` in [0, 1].
pub fn rgb_to_hsv(rgb: [f64; 3]) -> [f64; 3] {
    let [r, g, b] = rgb;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let v = max;
    let s = if max != 0.0 { delta / max } else { 0.0 };
    let mut h = 0.0;

    if s != 0.0 {
        let rc = (max - r) / delta;
        let gc = (max - g) / delta;
        let bc = (max - b) / delta;

        h = if r == max {
            bc - gc
        } else if g == max {
            2.0 + rc - bc
        } else {
            4.0 + gc - rc
        };
    }

    if h < 0.0 {
        h += 6.0;
    }
    [h, s, v]
}

/// Convert HSV (`h` wrapped into [0, 6)) back to RGB.
pub fn hsv_to_rgb(hsv: [f64; 3]) -> [f64; 3] {
    let [h, s, v] = hsv;
    let h = h.rem_euclid(6.0);
    let sector = h.floor();
    let f = h - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));

    match sector as u8 {
        0 => [v, t, p],
        1 => [q, v, p],
        2 => [p, v, t],
        3 => [p, q, v],
        4 => [t, p, v],
        5 => [v, p, q],
        _ => [v, t, p],
    }
}

/// Copy of `palette` with every entry's hue shifted by `hue * 6`. Alpha is forced to 1.
pub fn make_hue_adjusted_palette(palette: &Palette, hue: f64) -> Palette {
    let mut out = palette.clone();
    for entry in out.entries_mut().iter_mut() {
        let mut hsv = rgb_to_hsv(entry.channels());
        hsv[0] += hue * 6.0;
        let [r, g, b] = hsv_to_rgb(hsv);
        *entry = Rgba::rgb(r, g, b);
    }
    out
}

/// Parameters for [`make_adjusted_palette`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PaletteAdjustment {
    /// Index rotation, wrapping mod 256.
    pub rotate: i32,
    /// Hue shift in hue units.
    pub hue: f64,
    pub saturation: f64,
    pub brightness: f64,
    /// Contrast in [-1, 2].
    pub contrast: f64,
    /// Blur radius, capped at [`MAX_BLUR`].
    pub blur: usize,
    /// Band repeat count in [1, 10].
    pub frequency: usize,
}

/// Apply the full adjustment pipeline to a copy of `palette`.
///
/// Order: frequency resample, rotation, hue, saturation, brightness,
/// contrast, then blur over the adjusted result.
pub fn make_adjusted_palette(palette: &Palette, adj: &PaletteAdjustment) -> Palette {
    let freq = adj.frequency.max(1);
    let mut source = palette.clone();
    if freq > 1 {
        // `freq` bands, each the palette sampled at every freq-th entry;
        // entries past the last whole band keep their colour
        let band = PALETTE_SIZE / freq;
        for i in 0..band * freq {
            source.set(i, palette.get((i % band) * freq));
        }
    }

    let mut out = source.clone();
    let rot = adj.rotate.rem_euclid(PALETTE_SIZE as i32) as usize;
    for i in 0..PALETTE_SIZE {
        let src = source.get(i + PALETTE_SIZE - rot);
        let mut hsv = rgb_to_hsv(src.channels());
        hsv[0] += adj.hue * 6.0;
        hsv[1] = (hsv[1] + adj.saturation).clamp(0.0, 1.0);

        let rgb = hsv_to_rgb(hsv).map(|c| {
            let c = (c + adj.brightness).clamp(0.0, 1.0);
            ((c - 0.5) * (adj.contrast + 1.0) + 0.5).clamp(0.0, 1.0)
        });
        out.set(i, Rgba::new(rgb[0], rgb[1], rgb[2], src.a));
    }

    let blur = adj.blur.min(MAX_BLUR);
    if blur > 0 {
        let adjusted = out.clone();
        let n = (2 * blur) as f64;
        for i in 0..PALETTE_SIZE {
            let mut acc = [0.0; 4];
            for k in 1..=blur {
                for e in [adjusted.get(i + k), adjusted.get(i + PALETTE_SIZE - k)] {
                    acc[0] += e.r;
                    acc[1] += e.g;
                    acc[2] += e.b;
                    acc[3] += e.a;
                }
            }
            out.set(i, Rgba::new(acc[0] / n, acc[1] / n, acc[2] / n, acc[3] / n));
        }
    }

    out
}

/// Density to alpha curve with a linear segment below `linrange`.
///
/// `gamma` is the exponent applied to density (the reciprocal of a genome's
/// display gamma).
#[inline]
pub fn calc_alpha(density: f64, gamma: f64, linrange: f64) -> f64 {
    if density <= 0.0 {
        return 0.0;
    }
    if density < linrange {
        let funcval = linrange.powf(gamma);
        let frac = density / linrange;
        (1.0 - frac) * density * (funcval / linrange) + frac * density.powf(gamma)
    } else {
        density.powf(gamma)
    }
}

/// Scale an accumulated color by `ls`, handling channels that clip past 255.
///
/// A non-negative `highlight_power` desaturates clipped colors instead of
/// shifting their hue; a negative one blends toward the full-scale color.
pub fn calc_new_rgb(rgb: [f64; 3], ls: f64, highlight_power: f64) -> [f64; 3] {
    if ls == 0.0 || rgb == [0.0; 3] {
        return [0.0; 3];
    }

    let maxc = rgb[0].max(rgb[1]).max(rgb[2]);
    let maxa = ls * maxc;
    let newls = 255.0 / maxc;

    if maxa > 255.0 && highlight_power >= 0.0 {
        let lsratio = (newls / ls).powf(highlight_power);
        let scaled = rgb.map(|c| newls * c / 255.0);
        let mut hsv = rgb_to_hsv(scaled);
        hsv[1] *= lsratio;
        hsv_to_rgb(hsv).map(|c| c * 255.0)
    } else {
        let adjhlp = if maxa <= 255.0 {
            1.0
        } else {
            (-highlight_power).min(1.0)
        };
        rgb.map(|c| ((1.0 - adjhlp) * newls + adjhlp * ls) * c)
    }
}
