//! Local element residuals and Jacobians.
//!
//! An [`ElementKernel`] supplies the physical-space integrand of a weak form at a single
//! quadrature point. The functions [`assemble_element_residual`] and
//! [`assemble_element_jacobian`] run the quadrature loop
//! $$
//! \sum_q w_q \, |\det J_q| \, (\text{integrand at } q)
//! $$
//! over the precomputed [`CellQuadratureData`] of one cell.
//!
//! Local degrees of freedom are node-major: the `j`-th component of the field at local node `i`
//! has index `i * solution_dim + j`.
use crate::assembly::buffers::CellQuadratureData;
use crate::error::Error;
use crate::nalgebra::{DMatrix, DVector};
use crate::quadrature::QuadratureTable;
use crate::Real;

/// Everything a kernel can see at a single quadrature point.
#[derive(Debug, Clone, Copy)]
pub struct QuadraturePoint<'a, T> {
    pub index: usize,
    /// Quadrature weight multiplied by $|\det J|$.
    pub weight: T,
    /// Physical coordinates of the point.
    pub coordinates: &'a [T],
    /// Basis function values.
    pub basis: &'a [T],
    /// Physical basis gradients, basis-major with `space_dim` entries per basis function.
    pub basis_gradients: &'a [T],
}

impl<'a, T: Real> QuadraturePoint<'a, T> {
    pub fn space_dim(&self) -> usize {
        self.coordinates.len()
    }

    pub fn num_basis(&self) -> usize {
        self.basis.len()
    }

    /// Physical gradient of basis function `i`.
    pub fn basis_gradient(&self, i: usize) -> &'a [T] {
        let d = self.space_dim();
        &self.basis_gradients[i * d..(i + 1) * d]
    }

    /// Interpolates component `component` of a node-major field with `solution_dim` components.
    pub fn interpolate(&self, field: &[T], solution_dim: usize, component: usize) -> T {
        self.basis
            .iter()
            .enumerate()
            .fold(T::zero(), |acc, (i, &phi)| acc + phi * field[i * solution_dim + component])
    }
}

/// Local nodal field values of a single cell.
///
/// All slices are node-major with `num_basis * solution_dim` entries.
#[derive(Debug, Clone, Copy)]
pub struct ElementFields<'a, T> {
    /// The solution at time `t`.
    pub solution: &'a [T],
    /// The solution increment from `t` to `t + dt`.
    pub increment: &'a [T],
    /// The solution at time `t - dt`, required by explicit time stepping.
    pub previous: Option<&'a [T]>,
}

impl<'a, T: Real> ElementFields<'a, T> {
    pub fn new(solution: &'a [T], increment: &'a [T]) -> Self {
        Self {
            solution,
            increment,
            previous: None,
        }
    }

    pub fn with_previous(self, previous: &'a [T]) -> Self {
        Self {
            previous: Some(previous),
            ..self
        }
    }

    /// The value of local degree of freedom `dof` at time `t + dt`.
    pub fn updated(&self, dof: usize) -> T {
        self.solution[dof] + self.increment[dof]
    }

    fn validate(&self, num_dofs: usize) -> Result<(), Error> {
        if self.solution.len() != num_dofs {
            return Err(Error::dimension_mismatch("local solution", num_dofs, self.solution.len()));
        }
        if self.increment.len() != num_dofs {
            return Err(Error::dimension_mismatch("local increment", num_dofs, self.increment.len()));
        }
        if let Some(previous) = self.previous {
            if previous.len() != num_dofs {
                return Err(Error::dimension_mismatch("local previous solution", num_dofs, previous.len()));
            }
        }
        Ok(())
    }
}

/// The integrand of a weak form at a single quadrature point.
///
/// Implementations add `weight * integrand` to the outputs; the outputs are zeroed once per cell
/// before the quadrature loop starts.
pub trait ElementKernel<T: Real> {
    /// Per-quadrature-point material parameters.
    type Parameters;

    /// Number of field components per node for the given space dimension.
    fn solution_dim(&self, space_dim: usize) -> usize;

    /// Whether the kernel reads the solution at `t - dt`.
    fn requires_previous_solution(&self) -> bool {
        false
    }

    fn accumulate_residual(
        &self,
        residual: &mut DVector<T>,
        point: &QuadraturePoint<T>,
        fields: &ElementFields<T>,
        parameters: &Self::Parameters,
    );

    fn accumulate_jacobian(
        &self,
        jacobian: &mut DMatrix<T>,
        point: &QuadraturePoint<T>,
        fields: &ElementFields<T>,
        parameters: &Self::Parameters,
    );
}

fn check_inputs<T, K>(
    kernel: &K,
    data: &CellQuadratureData<T>,
    table: &QuadratureTable<T>,
    fields: &ElementFields<T>,
    parameters: &[K::Parameters],
) -> Result<usize, Error>
where
    T: Real,
    K: ElementKernel<T>,
{
    if data.num_points() != table.num_points() {
        return Err(Error::dimension_mismatch("quadrature points", table.num_points(), data.num_points()));
    }
    if parameters.len() != table.num_points() {
        return Err(Error::dimension_mismatch("quadrature parameters", table.num_points(), parameters.len()));
    }
    let num_dofs = kernel.solution_dim(data.space_dim()) * table.num_basis();
    fields.validate(num_dofs)?;
    if kernel.requires_previous_solution() && fields.previous.is_none() {
        return Err(Error::dimension_mismatch("local previous solution", num_dofs, 0));
    }
    Ok(num_dofs)
}

fn quadrature_point<'a, T: Real>(
    data: &'a CellQuadratureData<T>,
    table: &'a QuadratureTable<T>,
    q: usize,
) -> QuadraturePoint<'a, T> {
    QuadraturePoint {
        index: q,
        weight: data.weights()[q],
        coordinates: data.point(q),
        basis: table.basis(q),
        basis_gradients: data.basis_gradients(q),
    }
}

/// Assembles the local residual vector of a single cell.
///
/// The output is resized to `num_basis * solution_dim` entries.
pub fn assemble_element_residual<T, K>(
    residual: &mut DVector<T>,
    kernel: &K,
    data: &CellQuadratureData<T>,
    table: &QuadratureTable<T>,
    fields: &ElementFields<T>,
    parameters: &[K::Parameters],
) -> Result<(), Error>
where
    T: Real,
    K: ElementKernel<T>,
{
    let num_dofs = check_inputs(kernel, data, table, fields, parameters)?;
    residual.resize_vertically_mut(num_dofs, T::zero());
    residual.fill(T::zero());

    for (q, point_parameters) in parameters.iter().enumerate() {
        let point = quadrature_point(data, table, q);
        kernel.accumulate_residual(residual, &point, fields, point_parameters);
    }
    Ok(())
}

/// Assembles the local Jacobian matrix of a single cell.
///
/// The output is resized to a square matrix with `num_basis * solution_dim` rows.
pub fn assemble_element_jacobian<T, K>(
    jacobian: &mut DMatrix<T>,
    kernel: &K,
    data: &CellQuadratureData<T>,
    table: &QuadratureTable<T>,
    fields: &ElementFields<T>,
    parameters: &[K::Parameters],
) -> Result<(), Error>
where
    T: Real,
    K: ElementKernel<T>,
{
    let num_dofs = check_inputs(kernel, data, table, fields, parameters)?;
    jacobian.resize_mut(num_dofs, num_dofs, T::zero());
    jacobian.fill(T::zero());

    for (q, point_parameters) in parameters.iter().enumerate() {
        let point = quadrature_point(data, table, q);
        kernel.accumulate_jacobian(jacobian, &point, fields, point_parameters);
    }
    Ok(())
}
