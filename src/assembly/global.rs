//! Parallel computation of local contributions over a block of cells.
//!
//! The [`ParallelCellAssembler`] computes the local residual and/or Jacobian of every cell in a
//! [`CellBlock`]. Cells are processed independently on rayon worker threads, each of which owns
//! private scratch buffers. Scattering the local contributions into global structures is left to
//! the caller.
use crate::assembly::buffers::CellQuadratureData;
use crate::assembly::local::{assemble_element_jacobian, assemble_element_residual, ElementFields, ElementKernel};
use crate::error::Error;
use crate::mesh::CellBlock;
use crate::nalgebra::{DMatrix, DVector};
use crate::quadrature::QuadratureTable;
use crate::workspace::{with_thread_local_workspace, Workspace};
use crate::Real;
use eyre::WrapErr;
use log::{debug, warn};
use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use thread_local::ThreadLocal;

/// What to do when the contribution of a cell cannot be computed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// Abort the whole pass with the error of the lowest-indexed failing cell.
    Abort,
    /// Log a warning and leave the cell out of the result.
    SkipWithWarning,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        Self::Abort
    }
}

/// Which local quantities to compute.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Contributions {
    Residual,
    Jacobian,
    ResidualAndJacobian,
}

impl Contributions {
    fn residual(&self) -> bool {
        matches!(self, Self::Residual | Self::ResidualAndJacobian)
    }

    fn jacobian(&self) -> bool {
        matches!(self, Self::Jacobian | Self::ResidualAndJacobian)
    }
}

/// Global node-major field values of a cell block.
#[derive(Debug, Clone, Copy)]
pub struct NodalFields<'a, T> {
    /// The solution at time `t`.
    pub solution: &'a [T],
    /// The solution increment from `t` to `t + dt`.
    pub increment: &'a [T],
    /// The solution at time `t - dt`.
    pub previous: Option<&'a [T]>,
}

/// The local contribution of a single cell.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalContribution<T> {
    pub cell: usize,
    /// Vertex indices of the cell's nodes, defining the global position of local degrees of freedom.
    pub nodes: Vec<usize>,
    pub residual: Option<DVector<T>>,
    pub jacobian: Option<DMatrix<T>>,
}

struct CellWorkspace<T, P> {
    vertices: Vec<T>,
    solution: Vec<T>,
    increment: Vec<T>,
    previous: Vec<T>,
    quadrature_data: CellQuadratureData<T>,
    parameters: Vec<P>,
    residual: DVector<T>,
    jacobian: DMatrix<T>,
}

impl<T: Real, P> Default for CellWorkspace<T, P> {
    fn default() -> Self {
        Self {
            vertices: Vec::new(),
            solution: Vec::new(),
            increment: Vec::new(),
            previous: Vec::new(),
            quadrature_data: CellQuadratureData::default(),
            parameters: Vec::new(),
            residual: DVector::zeros(0),
            jacobian: DMatrix::zeros(0, 0),
        }
    }
}

/// Computes local contributions of all cells of a block in parallel.
#[derive(Debug, Default)]
pub struct ParallelCellAssembler {
    workspace: ThreadLocal<RefCell<Workspace>>,
    policy: FailurePolicy,
}

impl ParallelCellAssembler {
    pub fn with_policy(policy: FailurePolicy) -> Self {
        Self {
            workspace: ThreadLocal::new(),
            policy,
        }
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Computes the requested local contributions of every cell in the block.
    ///
    /// `parameters(cell, point)` resolves the kernel parameters of the given cell at the physical
    /// coordinates of a quadrature point. It typically wraps a material query.
    ///
    /// Under [`FailurePolicy::Abort`] the error of the lowest-indexed failing cell is returned,
    /// with the cell index attached as context whether or not the error itself records it.
    /// Under [`FailurePolicy::SkipWithWarning`] failing cells are left out of the result, which
    /// is otherwise ordered by cell index.
    pub fn assemble<T, K, F>(
        &self,
        block: &CellBlock<T>,
        table: &QuadratureTable<T>,
        kernel: &K,
        fields: NodalFields<T>,
        parameters: F,
        contributions: Contributions,
    ) -> eyre::Result<Vec<LocalContribution<T>>>
    where
        T: Real,
        K: ElementKernel<T> + Sync,
        K::Parameters: Send + 'static,
        F: Fn(usize, &[T]) -> Result<K::Parameters, Error> + Sync,
    {
        let s = kernel.solution_dim(block.space_dim());
        let num_dofs = s * block.num_vertices();
        check_global_field("solution", fields.solution, num_dofs)?;
        check_global_field("increment", fields.increment, num_dofs)?;
        if let Some(previous) = fields.previous {
            check_global_field("previous solution", previous, num_dofs)?;
        }
        if table.num_basis() != block.nodes_per_cell() {
            return Err(Error::dimension_mismatch("basis functions per cell", block.nodes_per_cell(), table.num_basis()))
                .wrap_err("Quadrature table does not match the cell block");
        }

        let results: Vec<_> = (0..block.num_cells())
            .into_par_iter()
            .with_min_len(16)
            .map(|cell| {
                with_thread_local_workspace(&self.workspace, |ws: &mut CellWorkspace<T, K::Parameters>| {
                    compute_cell_contribution(ws, block, table, kernel, &fields, &parameters, contributions, cell)
                        .map_err(|err| err.in_cell(cell))
                })
            })
            .collect();

        let mut accepted = Vec::with_capacity(results.len());
        let mut num_skipped = 0;
        for (cell, result) in results.into_iter().enumerate() {
            match (result, self.policy) {
                (Ok(contribution), _) => accepted.push(contribution),
                (Err(err), FailurePolicy::Abort) => {
                    return Err(err)
                        .wrap_err_with(|| format!("Failed to compute local contributions of cell {}", cell));
                }
                (Err(err), FailurePolicy::SkipWithWarning) => {
                    warn!("Skipping cell {}: {}", cell, err);
                    num_skipped += 1;
                }
            }
        }

        debug!(
            "Computed local contributions of {} cells ({} skipped).",
            accepted.len(),
            num_skipped
        );
        Ok(accepted)
    }
}

fn check_global_field<T>(name: &'static str, values: &[T], expected: usize) -> eyre::Result<()> {
    if values.len() != expected {
        return Err(Error::dimension_mismatch("global field", expected, values.len()))
            .wrap_err_with(|| format!("Global {} has the wrong size", name));
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn compute_cell_contribution<T, K, F>(
    ws: &mut CellWorkspace<T, K::Parameters>,
    block: &CellBlock<T>,
    table: &QuadratureTable<T>,
    kernel: &K,
    fields: &NodalFields<T>,
    parameters: &F,
    contributions: Contributions,
    cell: usize,
) -> Result<LocalContribution<T>, Error>
where
    T: Real,
    K: ElementKernel<T>,
    F: Fn(usize, &[T]) -> Result<K::Parameters, Error>,
{
    let geometry = block.geometry();
    let s = kernel.solution_dim(geometry.space_dim());
    let num_local = s * block.nodes_per_cell();

    ws.vertices
        .resize(geometry.num_corners() * geometry.space_dim(), T::zero());
    block.populate_cell_vertices(&mut ws.vertices, cell);
    ws.quadrature_data.populate(geometry, &ws.vertices, table)?;

    ws.parameters.clear();
    for q in 0..ws.quadrature_data.num_points() {
        ws.parameters
            .push(parameters(cell, ws.quadrature_data.point(q))?);
    }

    ws.solution.resize(num_local, T::zero());
    ws.increment.resize(num_local, T::zero());
    block.gather_cell_values(&mut ws.solution, fields.solution, s, cell);
    block.gather_cell_values(&mut ws.increment, fields.increment, s, cell);
    let mut local_fields = ElementFields::new(&ws.solution, &ws.increment);
    if let Some(previous) = fields.previous {
        ws.previous.resize(num_local, T::zero());
        block.gather_cell_values(&mut ws.previous, previous, s, cell);
        local_fields = local_fields.with_previous(&ws.previous);
    }

    let residual = if contributions.residual() {
        assemble_element_residual(
            &mut ws.residual,
            kernel,
            &ws.quadrature_data,
            table,
            &local_fields,
            &ws.parameters,
        )?;
        Some(ws.residual.clone())
    } else {
        None
    };

    let jacobian = if contributions.jacobian() {
        assemble_element_jacobian(
            &mut ws.jacobian,
            kernel,
            &ws.quadrature_data,
            table,
            &local_fields,
            &ws.parameters,
        )?;
        Some(ws.jacobian.clone())
    } else {
        None
    };

    Ok(LocalContribution {
        cell,
        nodes: block.cell_nodes(cell).to_vec(),
        residual,
        jacobian,
    })
}
