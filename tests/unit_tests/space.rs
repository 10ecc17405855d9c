use fluxrec::element::nedelec::TETRAHEDRON_EDGES;
use fluxrec::mesh::procedural::{create_unit_box_uniform_tet_mesh_3d, create_unit_square_uniform_tri_mesh_2d};
use fluxrec::mesh::ParMesh;
use fluxrec::space::{FiniteElementSpace, LagrangeSpace, NedelecSpace, RangeType};
use matrixcompare::assert_scalar_eq;
use nalgebra::{Point3, Vector3};
use num::complex::Complex64;
use std::sync::Arc;

fn unit_square_space(cells_per_dim: usize) -> LagrangeSpace<2> {
    let mesh = Arc::new(create_unit_square_uniform_tri_mesh_2d(cells_per_dim));
    LagrangeSpace::new(ParMesh::serial(mesh)).unwrap()
}

fn unit_box_nedelec_space(cells_per_dim: usize) -> NedelecSpace {
    let mesh = Arc::new(create_unit_box_uniform_tet_mesh_3d(cells_per_dim));
    NedelecSpace::new(ParMesh::serial(mesh)).unwrap()
}

#[test]
fn lagrange_space_dofs_are_ordered_by_nodes() {
    let space = unit_square_space(2);
    assert_eq!(space.num_nodes(), 9);
    assert_eq!(space.num_dofs(), 9);
    assert_eq!(space.range_type(), RangeType::Scalar);
    assert_eq!(space.order(), 1);
    assert_eq!(space.quadrature_strength(), 2);

    let vector_space = space.with_vdim(2).unwrap();
    assert_eq!(vector_space.num_dofs(), 18);
    assert_eq!(vector_space.element_dof_count(), 6);
    assert!(space.with_vdim(0).is_err());

    let nodes = vector_space.element_nodes(3).to_vec();
    let mut dofs = vec![0; 6];
    vector_space.populate_element_dofs(&mut dofs, 3);
    let expected: Vec<_> = (0..2)
        .flat_map(|k| nodes.iter().map(move |&n| k * 9 + n))
        .collect();
    assert_eq!(dofs, expected);
}

#[test]
fn lagrange_interpolation_evaluates_at_nodes() {
    let space = unit_square_space(3).with_vdim(2).unwrap();
    let u = space.interpolate(|x, k| if k == 0 { x.x } else { 2.0 * x.y });
    let vertices = space.par_mesh().global_mesh().vertices();
    for (n, v) in vertices.iter().enumerate() {
        assert_eq!(u[n], v.x);
        assert_eq!(u[space.num_nodes() + n], 2.0 * v.y);
    }

    let scalar = unit_square_space(1);
    let z = scalar.interpolate(|x, _| Complex64::new(x.x, x.y));
    assert_eq!(z.len(), 4);
}

#[test]
fn nedelec_space_has_one_dof_per_edge() {
    let space = unit_box_nedelec_space(2);
    let mesh = space.par_mesh().global_mesh();
    assert_eq!(space.num_dofs(), mesh.edges().len());
    assert_eq!(space.range_type(), RangeType::Vector);
    assert_eq!(space.vdim(), 1);
}

#[test]
fn nedelec_element_signs_follow_global_vertex_order() {
    let space = unit_box_nedelec_space(2);
    for e in 0..space.num_elements() {
        let vertices = space.par_mesh().element_vertices(e);
        let dofs = space.element_dofs(e);
        let signs = space.element_signs(e);
        for (local, &[a, b]) in TETRAHEDRON_EDGES.iter().enumerate() {
            let (ga, gb) = (vertices[a], vertices[b]);
            assert_eq!(space.edges()[dofs[local]], [ga.min(gb), ga.max(gb)]);
            let expected = if ga < gb { 1.0 } else { -1.0 };
            assert_eq!(signs[local], expected);
        }
    }
}

#[test]
fn nedelec_interpolation_computes_tangential_components() {
    let space = unit_box_nedelec_space(1);
    let field = |x: &Point3<f64>| Vector3::new(1.0 + x.y, 2.0, -x.x);
    let u = space.interpolate(field);
    let vertices = space.par_mesh().global_mesh().vertices();
    for (dof, &[a, b]) in space.edges().iter().enumerate() {
        let tangent = vertices[b] - vertices[a];
        let midpoint = Point3::from((vertices[a].coords + vertices[b].coords) * 0.5);
        assert_scalar_eq!(u[dof], field(&midpoint).dot(&tangent), comp = abs, tol = 1e-14);
    }
}
