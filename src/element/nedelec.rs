//! Lowest-order Nédélec (Whitney) edge element on the reference tetrahedron.
use crate::element::SimplexGeometry;
use nalgebra::{Point3, Vector3};

/// Local edges of a tetrahedron, as pairs of local vertex indices.
pub const TETRAHEDRON_EDGES: [[usize; 2]; 6] = [[0, 1], [0, 2], [0, 3], [1, 2], [1, 3], [2, 3]];

/// Number of basis functions of the element.
pub const NUM_EDGE_DOFS: usize = 6;

fn barycentric_gradients() -> [Vector3<f64>; 4] {
    [
        Vector3::new(-1.0, -1.0, -1.0),
        Vector3::x(),
        Vector3::y(),
        Vector3::z(),
    ]
}

fn barycentric_coordinates(xi: &Point3<f64>) -> [f64; 4] {
    [1.0 - xi.x - xi.y - xi.z, xi.x, xi.y, xi.z]
}

/// Evaluates the basis `W_ab = λ_a ∇λ_b - λ_b ∇λ_a` of every local edge `(a, b)`.
///
/// The result is expressed in reference coordinates and multiplied by the edge's
/// orientation sign.
pub fn reference_basis(xi: &Point3<f64>, signs: &[f64; NUM_EDGE_DOFS], output: &mut [Vector3<f64>; NUM_EDGE_DOFS]) {
    let lambda = barycentric_coordinates(xi);
    let grads = barycentric_gradients();
    for ((w, &[a, b]), &sign) in output.iter_mut().zip(&TETRAHEDRON_EDGES).zip(signs) {
        *w = (grads[b] * lambda[a] - grads[a] * lambda[b]) * sign;
    }
}

/// Reference curls `curl W_ab = 2 ∇λ_a × ∇λ_b`, multiplied by the orientation signs.
///
/// The curls are constant over the element.
pub fn reference_curls(signs: &[f64; NUM_EDGE_DOFS], output: &mut [Vector3<f64>; NUM_EDGE_DOFS]) {
    let grads = barycentric_gradients();
    for ((c, &[a, b]), &sign) in output.iter_mut().zip(&TETRAHEDRON_EDGES).zip(signs) {
        *c = grads[a].cross(&grads[b]) * (2.0 * sign);
    }
}

/// Maps reference basis values to physical space with the covariant transformation `J^{-T} v`.
pub fn map_basis(geometry: &SimplexGeometry<3>, values: &mut [Vector3<f64>; NUM_EDGE_DOFS]) {
    for value in values.iter_mut() {
        *value = geometry.inverse_transpose() * *value;
    }
}

/// Maps reference curls to physical space with the transformation `J c / det J`.
pub fn map_curls(geometry: &SimplexGeometry<3>, curls: &mut [Vector3<f64>; NUM_EDGE_DOFS]) {
    let scale = 1.0 / geometry.determinant();
    for curl in curls.iter_mut() {
        *curl = geometry.jacobian() * *curl * scale;
    }
}
