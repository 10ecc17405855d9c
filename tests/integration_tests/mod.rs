use fluxrec::config::SolverSettings;
use fluxrec::mesh::procedural::{create_unit_box_uniform_tet_mesh_3d, create_unit_square_uniform_tri_mesh_2d};
use fluxrec::mesh::ParMesh;
use fluxrec::space::{LagrangeSpace, NedelecSpace};
use nalgebra::{Point3, Vector3};
use std::sync::Arc;

mod curl_estimator;
mod gradient_estimator;

pub fn unit_square_space(cells_per_dim: usize) -> LagrangeSpace<2> {
    let mesh = Arc::new(create_unit_square_uniform_tri_mesh_2d(cells_per_dim));
    LagrangeSpace::new(ParMesh::serial(mesh)).unwrap()
}

pub fn unit_box_nedelec_space(cells_per_dim: usize) -> NedelecSpace {
    let mesh = Arc::new(create_unit_box_uniform_tet_mesh_3d(cells_per_dim));
    NedelecSpace::new(ParMesh::serial(mesh)).unwrap()
}

/// Solver settings tight enough that solver error is negligible compared to test tolerances.
pub fn tight_settings() -> SolverSettings {
    SolverSettings {
        tol: 1e-12,
        ..Default::default()
    }
}

/// A field with constant curl `(0, 0, 1)` that lies in the lowest-order Nédélec space.
pub fn rotation_field(x: &Point3<f64>) -> Vector3<f64> {
    Vector3::new(-0.5 * x.y, 0.5 * x.x, 0.0)
}

/// A smooth field whose curl is not representable in the lowest-order Nédélec space.
pub fn nonpolynomial_field(x: &Point3<f64>) -> Vector3<f64> {
    Vector3::new((2.0 * x.y).sin(), x.x * x.z, x.x * x.x + x.y)
}
