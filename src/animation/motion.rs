//! Motion elements: periodic perturbations of xform fields over a loop.

use crate::schema::{Affine2D, Genome, Variation, Xform};

fn add_scaled(target: &mut Affine2D, delta: &Affine2D, scale: f64) {
    let mut coefs = target.coefs();
    for (c, d) in coefs.iter_mut().zip(delta.coefs()) {
        *c += d * scale;
    }
    *target = Affine2D::from_coefs(coefs);
}

/// Perturb `xform` by each of its motion elements evaluated at `blend`
/// (one loop per unit). Motion entries are left in place.
pub fn apply_motion(xform: &mut Xform, blend: f64) {
    let motion = std::mem::take(&mut xform.motion);

    for m in &motion {
        let v = m.func.eval(m.freq * blend);
        xform.weight += v * m.weight;
        xform.color_x += v * m.color_x;
        xform.color_y += v * m.color_y;
        xform.color_speed += v * m.color_speed;
        xform.opacity += v * m.opacity;
        add_scaled(&mut xform.affine, &m.affine, v);
        add_scaled(&mut xform.post, &m.post, v);

        for dv in &m.variations {
            match xform.variation_mut(dv.id) {
                Some(existing) => existing.weight += v * dv.weight,
                None => {
                    let mut added = Variation::new(dv.id, dv.name.clone(), v * dv.weight);
                    added.params = dv.params.clone();
                    xform.variations.push(added);
                }
            }
        }
    }

    if !motion.is_empty() {
        xform.weight = xform.weight.max(0.0);
        xform.color_x = xform.color_x.clamp(0.0, 1.0);
        xform.color_y = xform.color_y.clamp(0.0, 1.0);
        xform.opacity = xform.opacity.clamp(0.0, 1.0);
    }
    xform.motion = motion;
}

/// Apply every xform's motion at `blend`, then strip all motion entries.
pub fn apply_genome_motion(genome: &mut Genome, blend: f64) {
    for x in genome.total_xforms_mut() {
        apply_motion(x, blend);
    }
    genome.delete_motion_elements();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{LINEAR, Motion, MotionFunc, VariationId};

    fn moving_xform() -> Xform {
        let mut x = Xform::linear(0.5);
        x.color_x = 0.5;
        x.motion.push(Motion {
            func: MotionFunc::Sin,
            freq: 1.0,
            color_x: 0.25,
            affine: Affine2D {
                c: 1.0,
                ..Affine2D::zero()
            },
            ..Default::default()
        });
        x
    }

    #[test]
    fn test_quarter_loop_applies_full_delta() {
        let mut x = moving_xform();
        apply_motion(&mut x, 0.25);
        assert!((x.color_x - 0.75).abs() < 1e-12);
        assert!((x.affine.c - 1.0).abs() < 1e-12);
        assert_eq!(x.motion.len(), 1);
    }

    #[test]
    fn test_whole_loop_is_identity() {
        let mut x = moving_xform();
        let before = x.clone();
        apply_motion(&mut x, 1.0);
        assert!((x.color_x - before.color_x).abs() < 1e-12);
        assert!((x.affine.c - before.affine.c).abs() < 1e-12);
    }

    #[test]
    fn test_variation_deltas_added() {
        let mut x = Xform::linear(1.0);
        x.motion.push(Motion {
            func: MotionFunc::Hill,
            variations: vec![
                Variation::new(LINEAR, "linear", 0.5),
                Variation::new(VariationId(1), "sinusoidal", 0.3),
            ],
            ..Default::default()
        });
        apply_motion(&mut x, 0.5);
        assert!((x.variation(LINEAR).map_or(0.0, |v| v.weight) - 1.5).abs() < 1e-12);
        assert!((x.variation(VariationId(1)).map_or(0.0, |v| v.weight) - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_genome_motion_stripped() {
        let mut g = Genome::default();
        g.add_xform(moving_xform());
        apply_genome_motion(&mut g, 0.25);
        assert!(!g.has_motion());
        assert!((g.xforms[0].color_x - 0.75).abs() < 1e-12);
    }
}
