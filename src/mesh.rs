//! Flat in-memory cell blocks.
//!
//! A [`CellBlock`] is the array contract through which a mesh provider hands cells to the
//! assembly layer: vertex coordinates, cell connectivity and per-cell material identifiers, all
//! stored as flat, explicitly sized sequences. How the mesh itself is stored, tagged or
//! distributed is of no concern here.
use crate::element::CellGeometry;
use crate::error::Error;
use crate::nalgebra::Scalar;
use serde::{Deserialize, Serialize};

/// Index base used by the connectivity supplied to [`CellBlock::from_arrays`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexBase {
    Zero,
    One,
}

/// A block of cells of a single kind.
///
/// Each cell references `nodes_per_cell` vertices. The first `num_corners` of them are the
/// corners that define the cell geometry; any further nodes (e.g. edge midpoints of quadratic
/// cells) only carry field values.
///
/// Deserialization goes through [`CellBlock::from_arrays`] with zero-based connectivity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "CellBlockArrays<T>",
    bound(deserialize = "T: Scalar + Deserialize<'de>")
)]
pub struct CellBlock<T> {
    geometry: CellGeometry,
    nodes_per_cell: usize,
    coordinates: Vec<T>,
    connectivity: Vec<usize>,
    material_ids: Vec<i32>,
}

#[derive(Deserialize)]
struct CellBlockArrays<T> {
    geometry: CellGeometry,
    nodes_per_cell: usize,
    coordinates: Vec<T>,
    connectivity: Vec<usize>,
    material_ids: Vec<i32>,
}

impl<T: Scalar> TryFrom<CellBlockArrays<T>> for CellBlock<T> {
    type Error = Error;

    fn try_from(arrays: CellBlockArrays<T>) -> Result<Self, Error> {
        CellBlock::from_arrays(
            arrays.geometry,
            arrays.nodes_per_cell,
            arrays.coordinates,
            arrays.connectivity,
            arrays.material_ids,
            IndexBase::Zero,
        )
    }
}

impl<T: Scalar> CellBlock<T> {
    /// Validates and takes ownership of the supplied arrays.
    ///
    /// `coordinates` holds `num_vertices * space_dim` entries, `connectivity` holds
    /// `num_cells * nodes_per_cell` vertex indices and `material_ids` holds one identifier per cell.
    pub fn from_arrays(
        geometry: CellGeometry,
        nodes_per_cell: usize,
        coordinates: Vec<T>,
        mut connectivity: Vec<usize>,
        material_ids: Vec<i32>,
        index_base: IndexBase,
    ) -> Result<Self, Error> {
        let d = geometry.space_dim();
        if nodes_per_cell < geometry.num_corners() {
            return Err(Error::dimension_mismatch(
                "nodes per cell",
                geometry.num_corners(),
                nodes_per_cell,
            ));
        }
        if coordinates.len() % d != 0 {
            let expected = d * (coordinates.len() / d + 1);
            return Err(Error::dimension_mismatch("vertex coordinates", expected, coordinates.len()));
        }
        if connectivity.len() != material_ids.len() * nodes_per_cell {
            return Err(Error::dimension_mismatch(
                "cell connectivity",
                material_ids.len() * nodes_per_cell,
                connectivity.len(),
            ));
        }

        if index_base == IndexBase::One {
            for index in &mut connectivity {
                // Zero is not a valid one-based index, map it out of range
                *index = index.checked_sub(1).unwrap_or(usize::MAX);
            }
        }

        let num_vertices = coordinates.len() / d;
        if let Some(&index) = connectivity.iter().find(|&&index| index >= num_vertices) {
            return Err(Error::dimension_mismatch("vertex index bound", num_vertices, index));
        }

        Ok(Self {
            geometry,
            nodes_per_cell,
            coordinates,
            connectivity,
            material_ids,
        })
    }

    pub fn geometry(&self) -> &CellGeometry {
        &self.geometry
    }

    pub fn space_dim(&self) -> usize {
        self.geometry.space_dim()
    }

    pub fn nodes_per_cell(&self) -> usize {
        self.nodes_per_cell
    }

    pub fn num_vertices(&self) -> usize {
        self.coordinates.len() / self.space_dim()
    }

    pub fn num_cells(&self) -> usize {
        self.material_ids.len()
    }

    pub fn coordinates(&self) -> &[T] {
        &self.coordinates
    }

    pub fn connectivity(&self) -> &[usize] {
        &self.connectivity
    }

    pub fn material_ids(&self) -> &[i32] {
        &self.material_ids
    }

    pub fn vertex(&self, index: usize) -> &[T] {
        let d = self.space_dim();
        &self.coordinates[d * index..d * (index + 1)]
    }

    /// Vertex indices of all nodes of the given cell.
    pub fn cell_nodes(&self, cell: usize) -> &[usize] {
        let n = self.nodes_per_cell;
        &self.connectivity[n * cell..n * (cell + 1)]
    }

    pub fn material_id(&self, cell: usize) -> i32 {
        self.material_ids[cell]
    }

    /// Indices of the cells tagged with the given material identifier.
    pub fn cells_with_material(&self, material_id: i32) -> impl Iterator<Item = usize> + '_ {
        self.material_ids
            .iter()
            .enumerate()
            .filter(move |&(_, &id)| id == material_id)
            .map(|(cell, _)| cell)
    }

    /// Copies the corner coordinates of the given cell into `vertices`.
    ///
    /// # Panics
    ///
    /// Panics if `vertices` does not have `num_corners * space_dim` entries.
    pub fn populate_cell_vertices(&self, vertices: &mut [T], cell: usize) {
        let d = self.space_dim();
        assert_eq!(vertices.len(), self.geometry.num_corners() * d, "Vertex buffer size mismatch");
        for (vertex, &index) in vertices.chunks_exact_mut(d).zip(self.cell_nodes(cell)) {
            vertex.clone_from_slice(self.vertex(index));
        }
    }

    /// Gathers node-major values of the given cell from a global node-major array with
    /// `components` entries per vertex.
    ///
    /// # Panics
    ///
    /// Panics if `local` does not have `nodes_per_cell * components` entries.
    pub fn gather_cell_values(&self, local: &mut [T], global: &[T], components: usize, cell: usize) {
        assert_eq!(local.len(), self.nodes_per_cell * components, "Local buffer size mismatch");
        for (local_node, &index) in local.chunks_exact_mut(components).zip(self.cell_nodes(cell)) {
            local_node.clone_from_slice(&global[components * index..components * (index + 1)]);
        }
    }
}
