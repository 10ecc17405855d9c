//! Basic procedural mesh generation routines.
use crate::mesh::{Mesh2d, Mesh3d};
use nalgebra::{Point2, Point3, Vector2, Vector3};

pub fn create_unit_square_uniform_tri_mesh_2d(cells_per_dim: usize) -> Mesh2d {
    create_rectangular_uniform_tri_mesh_2d(&Vector2::new(1.0, 1.0), [cells_per_dim; 2])
}

pub fn create_unit_box_uniform_tet_mesh_3d(cells_per_dim: usize) -> Mesh3d {
    create_rectangular_uniform_tet_mesh_3d(&Vector3::new(1.0, 1.0, 1.0), [cells_per_dim; 3])
}

/// Generates a uniform triangle mesh of the rectangle `[0, extents.x] x [0, extents.y]`.
///
/// Each of the `cells[0] x cells[1]` rectangular cells is split into two positively
/// oriented triangles.
pub fn create_rectangular_uniform_tri_mesh_2d(extents: &Vector2<f64>, cells: [usize; 2]) -> Mesh2d {
    let [nx, ny] = cells;
    let mut vertices = Vec::with_capacity((nx + 1) * (ny + 1));
    for j in 0..=ny {
        for i in 0..=nx {
            let x = extents.x * i as f64 / nx.max(1) as f64;
            let y = extents.y * j as f64 / ny.max(1) as f64;
            vertices.push(Point2::new(x, y));
        }
    }

    let vertex_index = |i: usize, j: usize| (nx + 1) * j + i;
    let mut connectivity = Vec::with_capacity(6 * nx * ny);
    for j in 0..ny {
        for i in 0..nx {
            let v00 = vertex_index(i, j);
            let v10 = vertex_index(i + 1, j);
            let v01 = vertex_index(i, j + 1);
            let v11 = vertex_index(i + 1, j + 1);
            connectivity.extend_from_slice(&[v00, v10, v11]);
            connectivity.extend_from_slice(&[v00, v11, v01]);
        }
    }

    Mesh2d::from_vertices_and_cells(vertices, connectivity)
        .expect("Procedurally generated connectivity is always valid")
}

/// Generates a uniform tetrahedral mesh of an axis-aligned box with one corner at the origin.
///
/// Every hexahedral cell is split into six tetrahedra sharing the cell diagonal
/// (Kuhn subdivision), which gives a conforming mesh.
pub fn create_rectangular_uniform_tet_mesh_3d(extents: &Vector3<f64>, cells: [usize; 3]) -> Mesh3d {
    let [nx, ny, nz] = cells;
    let mut vertices = Vec::with_capacity((nx + 1) * (ny + 1) * (nz + 1));
    for k in 0..=nz {
        for j in 0..=ny {
            for i in 0..=nx {
                let x = extents.x * i as f64 / nx.max(1) as f64;
                let y = extents.y * j as f64 / ny.max(1) as f64;
                let z = extents.z * k as f64 / nz.max(1) as f64;
                vertices.push(Point3::new(x, y, z));
            }
        }
    }

    let vertex_index = |[i, j, k]: [usize; 3]| i + (nx + 1) * (j + (ny + 1) * k);
    // Paths from the cell origin to the opposite corner, one unit step per axis
    const AXIS_PERMUTATIONS: [[usize; 3]; 6] = [[0, 1, 2], [1, 2, 0], [2, 0, 1], [0, 2, 1], [2, 1, 0], [1, 0, 2]];

    let mut connectivity = Vec::with_capacity(24 * nx * ny * nz);
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                for (perm_index, permutation) in AXIS_PERMUTATIONS.iter().enumerate() {
                    let mut corner = [i, j, k];
                    let mut tet = [vertex_index(corner); 4];
                    for (step, &axis) in permutation.iter().enumerate() {
                        corner[axis] += 1;
                        tet[step + 1] = vertex_index(corner);
                    }
                    // Odd permutations produce negatively oriented tetrahedra
                    if perm_index >= 3 {
                        tet.swap(2, 3);
                    }
                    connectivity.extend_from_slice(&tet);
                }
            }
        }
    }

    Mesh3d::from_vertices_and_cells(vertices, connectivity)
        .expect("Procedurally generated connectivity is always valid")
}
