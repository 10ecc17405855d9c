//! Material coefficients looked up by element attribute.
use crate::config::{Coefficient, MaterialConfig};
use crate::error::EstimatorError;
use crate::mesh::ParMesh;
use nalgebra::SMatrix;
use std::collections::BTreeMap;

/// Per-attribute material coefficient tensors.
pub trait MaterialProvider<const D: usize>: Sync {
    fn has_attribute(&self, attribute: usize) -> bool;

    /// The inverse magnetic permeability `μ⁻¹`.
    fn inv_permeability(&self, attribute: usize) -> Option<&SMatrix<f64, D, D>>;

    /// The real part of the electric permittivity `ε`.
    fn permittivity_real(&self, attribute: usize) -> Option<&SMatrix<f64, D, D>>;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MaterialProperty {
    InvPermeability,
    Permittivity,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material<const D: usize> {
    pub permeability: SMatrix<f64, D, D>,
    pub inv_permeability: SMatrix<f64, D, D>,
    pub permittivity: SMatrix<f64, D, D>,
}

impl<const D: usize> Material<D> {
    /// A material with diagonal permeability and permittivity tensors.
    pub fn diagonal(permeability: &Coefficient, permittivity: &Coefficient) -> Result<Self, EstimatorError> {
        let mu = permeability.to_diagonal::<D>("permeability")?;
        let eps = permittivity.to_diagonal::<D>("permittivity")?;
        Ok(Self {
            permeability: SMatrix::from_diagonal(&mu),
            inv_permeability: SMatrix::from_diagonal(&mu.map(|m| 1.0 / m)),
            permittivity: SMatrix::from_diagonal(&eps),
        })
    }
}

/// Materials of a mesh, each assigned to a set of element attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialTable<const D: usize> {
    materials: Vec<Material<D>>,
    attribute_to_material: BTreeMap<usize, usize>,
}

impl<const D: usize> MaterialTable<D> {
    /// A single vacuum material (`μ = ε = 1`) for all the given attributes.
    pub fn vacuum(attributes: impl IntoIterator<Item = usize>) -> Self {
        let vacuum = Material {
            permeability: SMatrix::identity(),
            inv_permeability: SMatrix::identity(),
            permittivity: SMatrix::identity(),
        };
        Self {
            materials: vec![vacuum],
            attribute_to_material: attributes.into_iter().map(|attr| (attr, 0)).collect(),
        }
    }

    pub fn from_config(configs: &[MaterialConfig]) -> Result<Self, EstimatorError> {
        let mut materials = Vec::with_capacity(configs.len());
        let mut attribute_to_material = BTreeMap::new();
        for (idx, config) in configs.iter().enumerate() {
            if config.attributes.is_empty() {
                return Err(EstimatorError::InvalidMaterial(format!(
                    "material {} does not list any attributes",
                    idx
                )));
            }
            materials.push(Material::diagonal(&config.permeability, &config.permittivity)?);
            for &attribute in &config.attributes {
                if attribute_to_material.insert(attribute, idx).is_some() {
                    return Err(EstimatorError::InvalidMaterial(format!(
                        "attribute {} is assigned to more than one material",
                        attribute
                    )));
                }
            }
        }
        Ok(Self {
            materials,
            attribute_to_material,
        })
    }

    pub fn material(&self, attribute: usize) -> Option<&Material<D>> {
        self.attribute_to_material
            .get(&attribute)
            .map(|&idx| &self.materials[idx])
    }
}

impl<const D: usize> MaterialProvider<D> for MaterialTable<D> {
    fn has_attribute(&self, attribute: usize) -> bool {
        self.attribute_to_material.contains_key(&attribute)
    }

    fn inv_permeability(&self, attribute: usize) -> Option<&SMatrix<f64, D, D>> {
        self.material(attribute).map(|m| &m.inv_permeability)
    }

    fn permittivity_real(&self, attribute: usize) -> Option<&SMatrix<f64, D, D>> {
        self.material(attribute).map(|m| &m.permittivity)
    }
}

/// A material coefficient tensor for each local element of a mesh.
#[derive(Debug, Clone)]
pub struct ElementCoefficients<const D: usize> {
    tensors: Vec<SMatrix<f64, D, D>>,
}

impl<const D: usize> ElementCoefficients<D> {
    /// Looks up the coefficient of every local element.
    ///
    /// Fails if any attribute of the global mesh has no material, so that all ranks agree
    /// on the outcome.
    pub fn from_material<M>(material: &M, mesh: &ParMesh<D>, property: MaterialProperty) -> Result<Self, EstimatorError>
    where
        M: ?Sized + MaterialProvider<D>,
    {
        if let Some(attribute) = mesh
            .global_mesh()
            .distinct_attributes()
            .into_iter()
            .find(|&attr| !material.has_attribute(attr))
        {
            return Err(EstimatorError::MissingMaterial { attribute });
        }

        let tensors = (0..mesh.num_elements())
            .map(|e| {
                let attribute = mesh.element_attribute(e);
                let tensor = match property {
                    MaterialProperty::InvPermeability => material.inv_permeability(attribute),
                    MaterialProperty::Permittivity => material.permittivity_real(attribute),
                };
                tensor
                    .copied()
                    .ok_or(EstimatorError::MissingMaterial { attribute })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { tensors })
    }

    pub fn element_coefficient(&self, element_index: usize) -> &SMatrix<f64, D, D> {
        &self.tensors[element_index]
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }
}
