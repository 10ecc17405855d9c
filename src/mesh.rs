use crate::comm::{Communicator, SerialCommunicator};
use eyre::{ensure, eyre};
use nalgebra::{Point, SVector};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

pub mod procedural;

/// Attribute assigned to cells created without explicit attributes.
pub const DEFAULT_ATTRIBUTE: usize = 1;

/// Index-based conforming simplex mesh.
///
/// Each cell of a `D`-dimensional mesh is a simplex given by `D + 1` vertex indices, and
/// carries an integer attribute used to look up its material.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh<const D: usize> {
    vertices: Vec<Point<f64, D>>,
    cells: Vec<usize>,
    attributes: Vec<usize>,
}

/// Triangle mesh in two dimensions.
pub type Mesh2d = Mesh<2>;
/// Tetrahedral mesh in three dimensions.
pub type Mesh3d = Mesh<3>;

impl<const D: usize> Mesh<D> {
    /// Constructs a mesh from vertices and a flattened list of cells.
    ///
    /// Every chunk of `D + 1` indices in `cells` describes a cell. All cells receive
    /// [`DEFAULT_ATTRIBUTE`].
    pub fn from_vertices_and_cells(vertices: Vec<Point<f64, D>>, cells: Vec<usize>) -> eyre::Result<Self> {
        let vertices_per_cell = D + 1;
        ensure!(
            cells.len() % vertices_per_cell == 0,
            "Cell index list of length {} is not a multiple of {} vertices per cell",
            cells.len(),
            vertices_per_cell
        );
        if let Some(&idx) = cells.iter().find(|&&idx| idx >= vertices.len()) {
            return Err(eyre!(
                "Cell references vertex {} but mesh has only {} vertices",
                idx,
                vertices.len()
            ));
        }
        for (cell_idx, cell) in cells.chunks_exact(vertices_per_cell).enumerate() {
            let distinct: BTreeSet<_> = cell.iter().collect();
            ensure!(
                distinct.len() == vertices_per_cell,
                "Cell {} has repeated vertex indices {:?}",
                cell_idx,
                cell
            );
        }

        let num_cells = cells.len() / vertices_per_cell;
        Ok(Self {
            vertices,
            cells,
            attributes: vec![DEFAULT_ATTRIBUTE; num_cells],
        })
    }

    /// Replaces the attributes of all cells.
    pub fn with_attributes(mut self, attributes: Vec<usize>) -> eyre::Result<Self> {
        ensure!(
            attributes.len() == self.num_cells(),
            "Got {} attributes for a mesh with {} cells",
            attributes.len(),
            self.num_cells()
        );
        self.attributes = attributes;
        Ok(self)
    }

    /// Assigns every cell the attribute returned by `attribute_fn` at its centroid.
    pub fn set_attributes_by_centroid(&mut self, attribute_fn: impl Fn(&Point<f64, D>) -> usize) {
        let attributes: Vec<_> = (0..self.num_cells())
            .map(|cell| attribute_fn(&self.cell_centroid(cell)))
            .collect();
        self.attributes = attributes;
    }

    pub fn vertices(&self) -> &[Point<f64, D>] {
        &self.vertices
    }

    pub fn vertices_per_cell(&self) -> usize {
        D + 1
    }

    pub fn num_cells(&self) -> usize {
        self.attributes.len()
    }

    pub fn cell_vertices(&self, cell_index: usize) -> &[usize] {
        let n = self.vertices_per_cell();
        &self.cells[n * cell_index..n * (cell_index + 1)]
    }

    pub fn attribute(&self, cell_index: usize) -> usize {
        self.attributes[cell_index]
    }

    pub fn attributes(&self) -> &[usize] {
        &self.attributes
    }

    /// The set of distinct cell attributes, in ascending order.
    pub fn distinct_attributes(&self) -> BTreeSet<usize> {
        self.attributes.iter().copied().collect()
    }

    pub fn cell_centroid(&self, cell_index: usize) -> Point<f64, D> {
        let cell = self.cell_vertices(cell_index);
        let sum = cell
            .iter()
            .fold(SVector::<f64, D>::zeros(), |acc, &v| acc + self.vertices[v].coords);
        Point::from(sum / cell.len() as f64)
    }

    /// Unique edges of the mesh, each given by its vertex indices in ascending order.
    ///
    /// Edges are returned sorted lexicographically, so that the position of an edge in the
    /// returned list is a stable global edge index.
    pub fn edges(&self) -> Vec<[usize; 2]> {
        self.edge_index_map().into_keys().collect()
    }

    pub(crate) fn edge_index_map(&self) -> BTreeMap<[usize; 2], usize> {
        let mut edges = BTreeSet::new();
        for cell_index in 0..self.num_cells() {
            let cell = self.cell_vertices(cell_index);
            for (i, &a) in cell.iter().enumerate() {
                for &b in &cell[i + 1..] {
                    edges.insert([a.min(b), a.max(b)]);
                }
            }
        }
        edges
            .into_iter()
            .enumerate()
            .map(|(idx, edge)| (edge, idx))
            .collect()
    }
}

/// A mesh together with the subset of cells owned by the current rank.
///
/// The global mesh is shared between all ranks, while element-local work is restricted to
/// the local cells. Local element `e` corresponds to global cell
/// [`global_element_index(e)`](Self::global_element_index).
#[derive(Debug, Clone)]
pub struct ParMesh<const D: usize> {
    mesh: Arc<Mesh<D>>,
    local_cells: Vec<usize>,
    comm: Arc<dyn Communicator>,
}

impl<const D: usize> ParMesh<D> {
    /// A mesh owned entirely by a single rank.
    pub fn serial(mesh: Arc<Mesh<D>>) -> Self {
        let local_cells = (0..mesh.num_cells()).collect();
        Self {
            mesh,
            local_cells,
            comm: Arc::new(SerialCommunicator),
        }
    }

    /// Partitions the cells into contiguous, nearly equal-sized ranges, one per rank.
    pub fn partitioned(mesh: Arc<Mesh<D>>, comm: Arc<dyn Communicator>) -> Self {
        let range = contiguous_range(mesh.num_cells(), comm.rank(), comm.size());
        Self {
            mesh,
            local_cells: range.collect(),
            comm,
        }
    }

    /// Uses an explicitly given set of local cells.
    pub fn from_local_cells(
        mesh: Arc<Mesh<D>>,
        local_cells: Vec<usize>,
        comm: Arc<dyn Communicator>,
    ) -> eyre::Result<Self> {
        if let Some(&cell) = local_cells.iter().find(|&&cell| cell >= mesh.num_cells()) {
            return Err(eyre!(
                "Local cell {} is out of bounds for mesh with {} cells",
                cell,
                mesh.num_cells()
            ));
        }
        let distinct: BTreeSet<_> = local_cells.iter().collect();
        ensure!(distinct.len() == local_cells.len(), "Local cells must be unique");
        Ok(Self {
            mesh,
            local_cells,
            comm,
        })
    }

    pub fn global_mesh(&self) -> &Mesh<D> {
        &self.mesh
    }

    /// Number of local elements.
    pub fn num_elements(&self) -> usize {
        self.local_cells.len()
    }

    pub fn global_element_index(&self, element_index: usize) -> usize {
        self.local_cells[element_index]
    }

    pub fn local_cells(&self) -> &[usize] {
        &self.local_cells
    }

    pub fn element_vertices(&self, element_index: usize) -> &[usize] {
        self.mesh.cell_vertices(self.global_element_index(element_index))
    }

    pub fn element_attribute(&self, element_index: usize) -> usize {
        self.mesh.attribute(self.global_element_index(element_index))
    }

    pub fn comm(&self) -> &dyn Communicator {
        self.comm.as_ref()
    }

    pub fn shared_comm(&self) -> Arc<dyn Communicator> {
        Arc::clone(&self.comm)
    }

    pub(crate) fn shares_mesh_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.mesh, &other.mesh) && self.local_cells == other.local_cells
    }
}

fn contiguous_range(n: usize, rank: usize, size: usize) -> std::ops::Range<usize> {
    let base = n / size;
    let remainder = n % size;
    let begin = rank * base + rank.min(remainder);
    let len = base + usize::from(rank < remainder);
    begin..begin + len
}
