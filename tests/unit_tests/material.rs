use fluxrec::config::{Coefficient, MaterialConfig};
use fluxrec::material::{ElementCoefficients, MaterialProperty, MaterialProvider, MaterialTable};
use fluxrec::mesh::procedural::create_unit_square_uniform_tri_mesh_2d;
use fluxrec::mesh::ParMesh;
use fluxrec::EstimatorError;
use matrixcompare::assert_matrix_eq;
use nalgebra::Matrix2;
use std::sync::Arc;

fn two_material_configs() -> Vec<MaterialConfig> {
    vec![
        MaterialConfig {
            attributes: vec![1],
            ..Default::default()
        },
        MaterialConfig {
            attributes: vec![2, 3],
            permeability: Coefficient::Diagonal(vec![2.0, 4.0]),
            permittivity: Coefficient::Isotropic(5.0),
        },
    ]
}

#[test]
fn material_table_maps_attributes_to_tensors() {
    let table = MaterialTable::<2>::from_config(&two_material_configs()).unwrap();
    assert!(table.has_attribute(1));
    assert!(table.has_attribute(3));
    assert!(!table.has_attribute(4));

    assert_matrix_eq!(*table.inv_permeability(1).unwrap(), Matrix2::identity());
    assert_matrix_eq!(
        *table.inv_permeability(3).unwrap(),
        Matrix2::new(0.5, 0.0, 0.0, 0.25)
    );
    assert_matrix_eq!(*table.permittivity_real(2).unwrap(), Matrix2::identity() * 5.0);
    assert_matrix_eq!(
        table.material(2).unwrap().permeability,
        Matrix2::new(2.0, 0.0, 0.0, 4.0)
    );
    assert!(table.inv_permeability(4).is_none());
}

#[test]
fn material_table_rejects_invalid_configs() {
    let mut duplicated = two_material_configs();
    duplicated[1].attributes.push(1);
    assert!(matches!(
        MaterialTable::<2>::from_config(&duplicated),
        Err(EstimatorError::InvalidMaterial(_))
    ));

    let empty = vec![MaterialConfig::default()];
    assert!(matches!(
        MaterialTable::<2>::from_config(&empty),
        Err(EstimatorError::InvalidMaterial(_))
    ));

    let mut wrong_dimension = two_material_configs();
    wrong_dimension[1].permeability = Coefficient::Diagonal(vec![1.0, 1.0, 1.0]);
    assert!(MaterialTable::<2>::from_config(&wrong_dimension).is_err());
}

#[test]
fn element_coefficients_follow_cell_attributes() {
    let mut mesh = create_unit_square_uniform_tri_mesh_2d(2);
    mesh.set_attributes_by_centroid(|x| if x.y < 0.5 { 1 } else { 2 });
    let par_mesh = ParMesh::serial(Arc::new(mesh));
    let table = MaterialTable::<2>::from_config(&two_material_configs()).unwrap();

    let coefficients = ElementCoefficients::from_material(&table, &par_mesh, MaterialProperty::Permittivity).unwrap();
    assert_eq!(coefficients.len(), par_mesh.num_elements());
    for e in 0..par_mesh.num_elements() {
        let expected = if par_mesh.element_attribute(e) == 1 { 1.0 } else { 5.0 };
        assert_matrix_eq!(*coefficients.element_coefficient(e), Matrix2::identity() * expected);
    }
}

#[test]
fn element_coefficients_require_every_attribute() {
    let mut mesh = create_unit_square_uniform_tri_mesh_2d(2);
    mesh.set_attributes_by_centroid(|x| if x.x < 0.5 { 1 } else { 7 });
    let par_mesh = ParMesh::serial(Arc::new(mesh));
    let table = MaterialTable::<2>::vacuum([1]);
    let result = ElementCoefficients::from_material(&table, &par_mesh, MaterialProperty::InvPermeability);
    assert!(matches!(result, Err(EstimatorError::MissingMaterial { attribute: 7 })));
}
