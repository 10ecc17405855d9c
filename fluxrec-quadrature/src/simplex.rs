//! Symmetric quadrature rules for the reference triangle and tetrahedron.
use crate::{Error, Point2, Point3, Rule2d, Rule3d};

/// Maximum strength supported by [`triangle`].
pub const TRIANGLE_MAX_STRENGTH: usize = 4;

/// Maximum strength supported by [`tetrahedron`].
pub const TETRAHEDRON_MAX_STRENGTH: usize = 3;

/// Returns a quadrature rule for the reference triangle that integrates polynomials of
/// total degree `strength` exactly.
///
/// Strength 3 is served by the strength 4 rule.
pub fn triangle(strength: usize) -> Result<Rule2d, Error> {
    match strength {
        0 | 1 => Ok((vec![0.5], vec![[1.0 / 3.0, 1.0 / 3.0]])),
        2 => {
            let w = 1.0 / 6.0;
            let points = vec![[1.0 / 6.0, 1.0 / 6.0], [2.0 / 3.0, 1.0 / 6.0], [1.0 / 6.0, 2.0 / 3.0]];
            Ok((vec![w; 3], points))
        }
        3 | 4 => {
            // Six-point rule of Dunavant
            let orbits = [
                (0.22338158967801146570, 0.44594849091596488632),
                (0.10995174365532186764, 0.09157621350977074346),
            ];
            let mut weights = Vec::with_capacity(6);
            let mut points = Vec::with_capacity(6);
            for (w, a) in orbits {
                let b = 1.0 - 2.0 * a;
                for p in triangle_orbit(a, b) {
                    weights.push(0.5 * w);
                    points.push(p);
                }
            }
            Ok((weights, points))
        }
        _ => Err(Error::NoRuleAvailable {
            requested_strength: strength,
            max_strength: TRIANGLE_MAX_STRENGTH,
        }),
    }
}

/// Returns a quadrature rule for the reference tetrahedron that integrates polynomials of
/// total degree `strength` exactly.
///
/// The strength 3 rule contains a negative weight.
pub fn tetrahedron(strength: usize) -> Result<Rule3d, Error> {
    let volume = 1.0 / 6.0;
    match strength {
        0 | 1 => Ok((vec![volume], vec![[0.25, 0.25, 0.25]])),
        2 => {
            let a = 0.5854101966249685;
            let b = 0.1381966011250105;
            let points = tetrahedron_orbit(a, b).to_vec();
            Ok((vec![0.25 * volume; 4], points))
        }
        3 => {
            let mut weights = vec![-0.8 * volume];
            let mut points = vec![[0.25, 0.25, 0.25]];
            for p in tetrahedron_orbit(0.5, 1.0 / 6.0) {
                weights.push(0.45 * volume);
                points.push(p);
            }
            Ok((weights, points))
        }
        _ => Err(Error::NoRuleAvailable {
            requested_strength: strength,
            max_strength: TETRAHEDRON_MAX_STRENGTH,
        }),
    }
}

/// Points with barycentric coordinates `(b, a, a)` and permutations.
fn triangle_orbit(a: f64, b: f64) -> [Point2; 3] {
    [[a, a], [b, a], [a, b]]
}

/// Points with barycentric coordinates `(a, b, b, b)` and permutations.
fn tetrahedron_orbit(a: f64, b: f64) -> [Point3; 4] {
    [[b, b, b], [a, b, b], [b, a, b], [b, b, a]]
}
