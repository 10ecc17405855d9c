use crate::assembly::local::NedelecMassAssembler;
use crate::assembly::ElementMatrixAssembler;
use crate::element::nedelec::{NUM_EDGE_DOFS, TETRAHEDRON_EDGES};
use crate::element::SimplexGeometry;
use crate::error::EstimatorError;
use crate::field::FieldScalar;
use crate::mesh::ParMesh;
use crate::space::{FiniteElementSpace, RangeType};
use eyre::eyre;
use nalgebra::{DVector, Point3, Vector3};

/// Lowest-order Nédélec space of the first kind on a tetrahedral mesh.
///
/// There is one dof per global mesh edge. Global edges are oriented from the lower to the
/// higher vertex index, and the basis function of a local edge is negated when its local
/// orientation disagrees with the global one.
#[derive(Debug, Clone)]
pub struct NedelecSpace {
    mesh: ParMesh<3>,
    geometries: Vec<SimplexGeometry<3>>,
    edges: Vec<[usize; 2]>,
    element_edges: Vec<[usize; NUM_EDGE_DOFS]>,
    element_signs: Vec<[f64; NUM_EDGE_DOFS]>,
}

impl NedelecSpace {
    pub fn new(mesh: ParMesh<3>) -> eyre::Result<Self> {
        let edge_indices = mesh.global_mesh().edge_index_map();
        let vertices = mesh.global_mesh().vertices();

        let mut geometries = Vec::with_capacity(mesh.num_elements());
        let mut element_edges = Vec::with_capacity(mesh.num_elements());
        let mut element_signs = Vec::with_capacity(mesh.num_elements());
        for e in 0..mesh.num_elements() {
            let cell = mesh.element_vertices(e);
            let cell_vertices: Vec<_> = cell.iter().map(|&v| vertices[v]).collect();
            geometries.push(SimplexGeometry::from_vertices(&cell_vertices)?);

            let mut edges = [0; NUM_EDGE_DOFS];
            let mut signs = [1.0; NUM_EDGE_DOFS];
            for (local_edge, &[a, b]) in TETRAHEDRON_EDGES.iter().enumerate() {
                let (ga, gb) = (cell[a], cell[b]);
                let key = [ga.min(gb), ga.max(gb)];
                edges[local_edge] = *edge_indices
                    .get(&key)
                    .ok_or_else(|| eyre!("Edge {:?} missing from edge enumeration", key))?;
                if ga > gb {
                    signs[local_edge] = -1.0;
                }
            }
            element_edges.push(edges);
            element_signs.push(signs);
        }

        Ok(Self {
            edges: edge_indices.into_keys().collect(),
            mesh,
            geometries,
            element_edges,
            element_signs,
        })
    }

    /// Global edges, each given by its vertex indices in ascending order.
    pub fn edges(&self) -> &[[usize; 2]] {
        &self.edges
    }

    pub fn element_dofs(&self, element_index: usize) -> &[usize; NUM_EDGE_DOFS] {
        &self.element_edges[element_index]
    }

    /// Orientation signs of the element's local basis functions.
    pub fn element_signs(&self, element_index: usize) -> &[f64; NUM_EDGE_DOFS] {
        &self.element_signs[element_index]
    }

    pub fn geometry(&self, element_index: usize) -> &SimplexGeometry<3> {
        &self.geometries[element_index]
    }

    /// Interpolates `f` through its tangential components along the edges.
    ///
    /// The tangential moment of every edge is approximated with the midpoint rule, which
    /// reproduces fields in the span of the basis exactly.
    pub fn interpolate<T: FieldScalar>(&self, f: impl Fn(&Point3<f64>) -> Vector3<T>) -> DVector<T> {
        let vertices = self.mesh.global_mesh().vertices();
        DVector::from_iterator(
            self.edges.len(),
            self.edges.iter().map(|&[a, b]| {
                let tangent = vertices[b] - vertices[a];
                let midpoint = vertices[a] + tangent * 0.5;
                let value = f(&midpoint);
                (0..3).fold(T::zero(), |acc, i| acc.plus(&value[i].scaled(tangent[i])))
            }),
        )
    }
}

impl FiniteElementSpace<3> for NedelecSpace {
    fn par_mesh(&self) -> &ParMesh<3> {
        &self.mesh
    }

    fn num_dofs(&self) -> usize {
        self.edges.len()
    }

    fn vdim(&self) -> usize {
        1
    }

    fn range_type(&self) -> RangeType {
        RangeType::Vector
    }

    fn order(&self) -> usize {
        1
    }

    fn mass_assembler(&self) -> Result<Box<dyn ElementMatrixAssembler + '_>, EstimatorError> {
        Ok(Box::new(NedelecMassAssembler::new(self)?))
    }
}
