use fluxrec::config::{Coefficient, EstimatorConfig, MaterialConfig, SolverSettings};
use fluxrec::EstimatorError;
use nalgebra::Vector3;

#[test]
fn solver_settings_defaults() {
    let settings = SolverSettings::default();
    assert_eq!(settings.tol, 1e-6);
    assert_eq!(settings.max_it, 10000);
    assert_eq!(settings.verbosity, 0);
    assert!(settings.validate().is_ok());
}

#[test]
fn solver_settings_validation() {
    let invalid = [
        SolverSettings {
            tol: 0.0,
            ..Default::default()
        },
        SolverSettings {
            tol: f64::NAN,
            ..Default::default()
        },
        SolverSettings {
            max_it: 0,
            ..Default::default()
        },
    ];
    for settings in &invalid {
        assert!(matches!(settings.validate(), Err(EstimatorError::InvalidSettings(_))));
    }
}

#[test]
fn estimator_config_parses_from_json_with_defaults() {
    let json = r#"{
        "solver": { "tol": 1e-10, "verbosity": 1 },
        "materials": [
            { "attributes": [1, 2] },
            { "attributes": [3], "permeability": 2.0, "permittivity": [1.0, 2.0, 3.0] }
        ]
    }"#;
    let config: EstimatorConfig = serde_json::from_str(json).unwrap();
    assert_eq!(config.solver.tol, 1e-10);
    assert_eq!(config.solver.max_it, 10000);
    assert_eq!(config.solver.verbosity, 1);
    assert_eq!(
        config.materials[0],
        MaterialConfig {
            attributes: vec![1, 2],
            permeability: Coefficient::Isotropic(1.0),
            permittivity: Coefficient::Isotropic(1.0),
        }
    );
    assert_eq!(config.materials[1].permeability, Coefficient::Isotropic(2.0));
    assert_eq!(config.materials[1].permittivity, Coefficient::Diagonal(vec![1.0, 2.0, 3.0]));

    let empty: EstimatorConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(empty, EstimatorConfig::default());
}

#[test]
fn unknown_config_fields_are_rejected() {
    assert!(serde_json::from_str::<SolverSettings>(r#"{ "tolerance": 1e-8 }"#).is_err());
    assert!(serde_json::from_str::<MaterialConfig>(r#"{ "attributes": [1], "sigma": 1.0 }"#).is_err());
}

#[test]
fn coefficients_expand_to_positive_diagonals() {
    assert_eq!(
        Coefficient::Isotropic(2.0).to_diagonal::<3>("mu").unwrap(),
        Vector3::new(2.0, 2.0, 2.0)
    );
    assert_eq!(
        Coefficient::Diagonal(vec![1.0, 2.0, 3.0]).to_diagonal::<3>("mu").unwrap(),
        Vector3::new(1.0, 2.0, 3.0)
    );
    assert!(matches!(
        Coefficient::Diagonal(vec![1.0, 2.0]).to_diagonal::<3>("mu"),
        Err(EstimatorError::InvalidMaterial(_))
    ));
    assert!(matches!(
        Coefficient::Isotropic(-1.0).to_diagonal::<2>("eps"),
        Err(EstimatorError::InvalidMaterial(_))
    ));
}
