use crate::integration_tests::{tight_settings, unit_square_space};
use fluxrec::config::{Coefficient, MaterialConfig, SolverSettings};
use fluxrec::estimator::{CombinationRule, ErrorIndicator, GradFluxErrorEstimator};
use fluxrec::material::MaterialTable;
use fluxrec::mesh::procedural::{create_unit_box_uniform_tet_mesh_3d, create_unit_square_uniform_tri_mesh_2d};
use fluxrec::mesh::{ParMesh, DEFAULT_ATTRIBUTE};
use fluxrec::space::{FiniteElementSpace, LagrangeSpace};
use fluxrec::EstimatorError;
use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use nalgebra::DVector;
use std::sync::Arc;

fn vacuum<const D: usize>() -> MaterialTable<D> {
    MaterialTable::vacuum([DEFAULT_ATTRIBUTE])
}

#[test]
fn linear_field_has_vanishing_error() {
    let space = unit_square_space(4);
    let material = vacuum::<2>();
    let estimator = GradFluxErrorEstimator::new(&material, &space, &tight_settings()).unwrap();
    assert_eq!(estimator.flux_space().num_dofs(), 2 * space.num_dofs());

    let u = space.interpolate(|x, _| x.x);
    let (estimates, report) = estimator.estimate(&u).unwrap();
    assert_eq!(estimates.len(), space.num_elements());
    assert!(estimates.iter().all(|&eta| eta.abs() < 1e-8));
    assert_scalar_eq!(report.reference_norm_squared, 1.0, comp = abs, tol = 1e-12);

    // One solve per component of the flux
    assert_eq!(report.solves.len(), 2);
    assert!(report.converged());
}

#[test]
fn linear_field_in_three_dimensions() {
    let mesh = Arc::new(create_unit_box_uniform_tet_mesh_3d(2));
    let space = LagrangeSpace::new(ParMesh::serial(mesh)).unwrap();
    let material = vacuum::<3>();
    let estimator = GradFluxErrorEstimator::new(&material, &space, &tight_settings()).unwrap();

    let u = space.interpolate(|x, _| x.x + 2.0 * x.y + 3.0 * x.z);
    let (estimates, report) = estimator.estimate(&u).unwrap();
    assert!(estimates.iter().all(|&eta| eta.abs() < 1e-8));
    assert_scalar_eq!(report.reference_norm_squared, 14.0, comp = abs, tol = 1e-10);
    assert_eq!(report.solves.len(), 3);
}

#[test]
fn zero_field_has_zero_error() {
    let space = unit_square_space(3);
    let material = vacuum::<2>();
    let estimator = GradFluxErrorEstimator::new(&material, &space, &tight_settings()).unwrap();

    let (estimates, report) = estimator.estimate(&DVector::zeros(space.num_dofs())).unwrap();
    assert_eq!(report.reference_norm_squared, 0.0);
    assert!(estimates.iter().all(|&eta| eta == 0.0));
}

#[test]
fn estimates_are_invariant_to_field_and_material_scaling() {
    let space = unit_square_space(4);
    let u = space.interpolate(|x, _| x.x * x.x + (3.0 * x.y).sin());

    let material = vacuum::<2>();
    let estimator = GradFluxErrorEstimator::new(&material, &space, &tight_settings()).unwrap();
    let (reference, reference_report) = estimator.estimate(&u).unwrap();
    assert!(reference.iter().all(|eta| eta.is_finite()));
    assert!(reference.max() > 1e-3);

    let (scaled, scaled_report) = estimator.estimate(&(&u * 3.0)).unwrap();
    assert_matrix_eq!(scaled, reference, comp = abs, tol = 1e-9);
    assert_scalar_eq!(
        scaled_report.reference_norm_squared,
        9.0 * reference_report.reference_norm_squared,
        comp = abs,
        tol = 1e-10
    );

    let dense_material = MaterialTable::<2>::from_config(&[MaterialConfig {
        attributes: vec![DEFAULT_ATTRIBUTE],
        permeability: Coefficient::Isotropic(1.0),
        permittivity: Coefficient::Isotropic(4.0),
    }])
    .unwrap();
    let dense_estimator = GradFluxErrorEstimator::new(&dense_material, &space, &tight_settings()).unwrap();
    let (weighted, weighted_report) = dense_estimator.estimate(&u).unwrap();
    assert_matrix_eq!(weighted, reference, comp = abs, tol = 1e-9);
    assert_scalar_eq!(
        weighted_report.reference_norm_squared,
        16.0 * reference_report.reference_norm_squared,
        comp = abs,
        tol = 1e-10
    );
}

#[test]
fn permittivity_jump_concentrates_error_at_interface() {
    let mut mesh = create_unit_square_uniform_tri_mesh_2d(8);
    mesh.set_attributes_by_centroid(|x| if x.x < 0.5 { 1 } else { 2 });
    let mesh = Arc::new(mesh);
    let space = LagrangeSpace::new(ParMesh::serial(Arc::clone(&mesh))).unwrap();
    let material = MaterialTable::<2>::from_config(&[
        MaterialConfig {
            attributes: vec![1],
            ..Default::default()
        },
        MaterialConfig {
            attributes: vec![2],
            permittivity: Coefficient::Isotropic(4.0),
            ..Default::default()
        },
    ])
    .unwrap();
    let estimator = GradFluxErrorEstimator::new(&material, &space, &tight_settings()).unwrap();

    let u = space.interpolate(|x, _| x.x);
    let (estimates, report) = estimator.estimate(&u).unwrap();
    // ∫ ε² dx = 0.5 * 1 + 0.5 * 16
    assert_scalar_eq!(report.reference_norm_squared, 8.5, comp = abs, tol = 1e-10);

    let (worst, _) = estimates
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .unwrap();
    let touches_interface = mesh
        .cell_vertices(worst)
        .iter()
        .any(|&v| (mesh.vertices()[v].x - 0.5).abs() < 1e-12);
    assert!(touches_interface);
}

#[test]
fn repeated_contributions_combine_in_indicator() {
    let space = unit_square_space(3);
    let material = vacuum::<2>();
    let estimator = GradFluxErrorEstimator::new(&material, &space, &tight_settings()).unwrap();
    let u = space.interpolate(|x, _| x.x * x.y);
    let (estimates, _) = estimator.estimate(&u).unwrap();

    let mut rss = ErrorIndicator::new(CombinationRule::RootSumSquares);
    let mut rms = ErrorIndicator::new(CombinationRule::RootMeanSquare);
    for _ in 0..2 {
        estimator.add_error_indicator(&u, &mut rss).unwrap();
        estimator.add_error_indicator(&u, &mut rms).unwrap();
    }
    assert_matrix_eq!(rss.local().clone(), &estimates * 2.0f64.sqrt(), comp = abs, tol = 1e-12);
    assert_matrix_eq!(rms.local().clone(), estimates, comp = abs, tol = 1e-12);
}

#[test]
fn non_converged_projection_is_reported() {
    let space = unit_square_space(6);
    let material = vacuum::<2>();
    let settings = SolverSettings {
        tol: 1e-14,
        max_it: 1,
        verbosity: 0,
    };
    let estimator = GradFluxErrorEstimator::new(&material, &space, &settings).unwrap();
    let u = space.interpolate(|x, _| (2.0 * x.x).sin() * x.y);
    let (estimates, report) = estimator.estimate(&u).unwrap();
    assert!(!report.converged());
    assert!(report.solves.iter().all(|s| s.iterations <= 1));
    assert!(estimates.iter().all(|eta| eta.is_finite()));
}

#[test]
fn invalid_inputs_are_rejected() {
    let space = unit_square_space(2);
    let material = vacuum::<2>();
    let estimator = GradFluxErrorEstimator::new(&material, &space, &tight_settings()).unwrap();
    assert!(matches!(
        estimator.estimate(&DVector::zeros(space.num_dofs() + 1)),
        Err(EstimatorError::InputSizeMismatch { .. })
    ));

    let vector_space = space.with_vdim(2).unwrap();
    assert!(matches!(
        GradFluxErrorEstimator::new(&material, &vector_space, &tight_settings()),
        Err(EstimatorError::SpaceMismatch(_))
    ));

    let settings = SolverSettings {
        tol: -1.0,
        ..Default::default()
    };
    assert!(matches!(
        GradFluxErrorEstimator::new(&material, &space, &settings),
        Err(EstimatorError::InvalidSettings(_))
    ));

    let no_material = MaterialTable::<2>::vacuum([DEFAULT_ATTRIBUTE + 1]);
    assert!(matches!(
        GradFluxErrorEstimator::new(&no_material, &space, &tight_settings()),
        Err(EstimatorError::MissingMaterial { attribute: DEFAULT_ATTRIBUTE })
    ));
}
