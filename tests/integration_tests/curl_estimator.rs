use crate::integration_tests::{nonpolynomial_field, rotation_field, tight_settings, unit_box_nedelec_space};
use fluxrec::config::{Coefficient, MaterialConfig};
use fluxrec::estimator::{CurlFluxErrorEstimator, ErrorIndicator};
use fluxrec::material::MaterialTable;
use fluxrec::mesh::DEFAULT_ATTRIBUTE;
use fluxrec::space::FiniteElementSpace;
use fluxrec::EstimatorError;
use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use nalgebra::DVector;
use num::complex::Complex64;

fn vacuum() -> MaterialTable<3> {
    MaterialTable::vacuum([DEFAULT_ATTRIBUTE])
}

#[test]
fn field_with_constant_curl_has_vanishing_error() {
    let space = unit_box_nedelec_space(2);
    let material = vacuum();
    let estimator = CurlFluxErrorEstimator::<f64, _>::new(&material, &space, &tight_settings()).unwrap();

    let u = space.interpolate(rotation_field);
    let (estimates, report) = estimator.estimate(&u).unwrap();
    assert_eq!(estimates.len(), space.num_elements());
    assert!(estimates.iter().all(|&eta| eta.abs() < 1e-8));
    assert_scalar_eq!(report.reference_norm_squared, 1.0, comp = abs, tol = 1e-12);
    assert_eq!(report.solves.len(), 1);
    assert!(report.converged());
}

#[test]
fn recovered_flux_reproduces_constant_curl() {
    let space = unit_box_nedelec_space(2);
    let material = vacuum();
    let estimator = CurlFluxErrorEstimator::<f64, _>::new(&material, &space, &tight_settings()).unwrap();

    let u = space.interpolate(rotation_field);
    let mut flux = DVector::zeros(estimator.projector().output_dim());
    estimator.projector().apply(&u, &mut flux).unwrap();
    let expected = space.interpolate(|_| nalgebra::Vector3::new(0.0, 0.0, 1.0));
    assert_matrix_eq!(flux, expected, comp = abs, tol = 1e-9);
}

#[test]
fn anisotropic_permeability_scales_reference_norm() {
    let space = unit_box_nedelec_space(2);
    let material = MaterialTable::<3>::from_config(&[MaterialConfig {
        attributes: vec![DEFAULT_ATTRIBUTE],
        permeability: Coefficient::Diagonal(vec![1.0, 1.0, 0.5]),
        permittivity: Coefficient::Isotropic(1.0),
    }])
    .unwrap();
    let estimator = CurlFluxErrorEstimator::<f64, _>::new(&material, &space, &tight_settings()).unwrap();

    // μ⁻¹ curl u = (0, 0, 2)
    let (estimates, report) = estimator.estimate(&space.interpolate(rotation_field)).unwrap();
    assert!(estimates.iter().all(|&eta| eta.abs() < 1e-8));
    assert_scalar_eq!(report.reference_norm_squared, 4.0, comp = abs, tol = 1e-10);
}

#[test]
fn zero_field_has_zero_error() {
    let space = unit_box_nedelec_space(1);
    let material = vacuum();
    let estimator = CurlFluxErrorEstimator::<Complex64, _>::new(&material, &space, &tight_settings()).unwrap();

    let zero = DVector::from_element(space.num_dofs(), Complex64::new(0.0, 0.0));
    let (estimates, report) = estimator.estimate(&zero).unwrap();
    assert_eq!(report.reference_norm_squared, 0.0);
    assert!(estimates.iter().all(|&eta| eta == 0.0));
}

#[test]
fn complex_field_combines_real_and_imaginary_errors() {
    let space = unit_box_nedelec_space(2);
    let material = vacuum();
    let settings = tight_settings();
    let real_estimator = CurlFluxErrorEstimator::<f64, _>::new(&material, &space, &settings).unwrap();
    let complex_estimator = CurlFluxErrorEstimator::<Complex64, _>::new(&material, &space, &settings).unwrap();

    let u_re = space.interpolate(nonpolynomial_field);
    let u_im = space.interpolate(rotation_field);
    let u = u_re.zip_map(&u_im, Complex64::new);

    let (eta_re, report_re) = real_estimator.estimate(&u_re).unwrap();
    let (eta_im, report_im) = real_estimator.estimate(&u_im).unwrap();
    let (eta, report) = complex_estimator.estimate(&u).unwrap();

    // One solve each for the real and imaginary parts
    assert_eq!(report.solves.len(), 2);
    let norm_squared = report_re.reference_norm_squared + report_im.reference_norm_squared;
    assert_scalar_eq!(report.reference_norm_squared, norm_squared, comp = abs, tol = 1e-10);

    let expected = DVector::from_fn(eta.len(), |e, _| {
        let re = eta_re[e].powi(2) * report_re.reference_norm_squared;
        let im = eta_im[e].powi(2) * report_im.reference_norm_squared;
        ((re + im) / norm_squared).sqrt()
    });
    assert_matrix_eq!(eta, expected, comp = abs, tol = 1e-8);
    assert!(eta.max() > 1e-3);
}

#[test]
fn purely_imaginary_field_matches_real_field() {
    let space = unit_box_nedelec_space(2);
    let material = vacuum();
    let settings = tight_settings();
    let real_estimator = CurlFluxErrorEstimator::<f64, _>::new(&material, &space, &settings).unwrap();
    let complex_estimator = CurlFluxErrorEstimator::<Complex64, _>::new(&material, &space, &settings).unwrap();

    let u = space.interpolate(nonpolynomial_field);
    let (eta_real, report_real) = real_estimator.estimate(&u).unwrap();
    let (eta_complex, report_complex) = complex_estimator
        .estimate(&u.map(|v| Complex64::new(0.0, v)))
        .unwrap();
    assert_matrix_eq!(eta_complex, eta_real, comp = abs, tol = 1e-10);
    assert_scalar_eq!(
        report_complex.reference_norm_squared,
        report_real.reference_norm_squared,
        comp = abs,
        tol = 1e-10
    );
}

#[test]
fn estimator_contributes_to_indicator() {
    let space = unit_box_nedelec_space(2);
    let material = vacuum();
    let estimator = CurlFluxErrorEstimator::<f64, _>::new(&material, &space, &tight_settings()).unwrap();
    let u = space.interpolate(nonpolynomial_field);

    let mut indicator = ErrorIndicator::default();
    let report = estimator.add_error_indicator(&u, &mut indicator).unwrap();
    assert!(report.converged());
    assert_eq!(indicator.num_contributions(), 1);
    assert_eq!(indicator.local().len(), space.num_elements());

    let (estimates, _) = estimator.estimate(&u).unwrap();
    assert_matrix_eq!(indicator.local().clone(), estimates, comp = abs, tol = 1e-14);
}

#[test]
fn invalid_inputs_are_rejected() {
    let space = unit_box_nedelec_space(1);
    let material = vacuum();
    let estimator = CurlFluxErrorEstimator::<f64, _>::new(&material, &space, &tight_settings()).unwrap();
    assert!(matches!(
        estimator.estimate(&DVector::zeros(3)),
        Err(EstimatorError::InputSizeMismatch { .. })
    ));

    let no_material = MaterialTable::<3>::vacuum([]);
    assert!(matches!(
        CurlFluxErrorEstimator::<f64, _>::new(&no_material, &space, &tight_settings()),
        Err(EstimatorError::MissingMaterial { .. })
    ));
}
