use fluxrec::quadrature::{QuadratureError, QuadratureRule};
use matrixcompare::assert_scalar_eq;

#[test]
fn reference_rules_integrate_volume_and_linear_functions() {
    for strength in 0..=2 {
        let triangle = QuadratureRule::<2>::reference_simplex(strength).unwrap();
        let area: f64 = triangle.weights().iter().sum();
        assert_scalar_eq!(area, 0.5, comp = abs, tol = 1e-14);
        // ∫ x dx over the reference triangle
        let moment: f64 = triangle.iter().map(|(w, p)| w * p.x).sum();
        assert_scalar_eq!(moment, 1.0 / 6.0, comp = abs, tol = 1e-14);

        let tetrahedron = QuadratureRule::<3>::reference_simplex(strength).unwrap();
        let volume: f64 = tetrahedron.weights().iter().sum();
        assert_scalar_eq!(volume, 1.0 / 6.0, comp = abs, tol = 1e-14);
        assert_eq!(tetrahedron.num_points(), tetrahedron.points().len());
    }
}

#[test]
fn strength_two_rules_integrate_quadratics() {
    let tetrahedron = QuadratureRule::<3>::reference_simplex(2).unwrap();
    // ∫ x y dx over the reference tetrahedron is 1/120
    let integral: f64 = tetrahedron.iter().map(|(w, p)| w * p.x * p.y).sum();
    assert_scalar_eq!(integral, 1.0 / 120.0, comp = abs, tol = 1e-14);
}

#[test]
fn unavailable_rules_are_reported() {
    assert!(matches!(
        QuadratureRule::<2>::reference_simplex(100),
        Err(QuadratureError::NoRuleAvailable { .. })
    ));
    assert!(matches!(
        QuadratureRule::<4>::reference_simplex(1),
        Err(QuadratureError::NoRuleAvailable { .. })
    ));
}
