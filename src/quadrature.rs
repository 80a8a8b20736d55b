//! Quadrature tables supplied by the caller.
//!
//! The tabulation of quadrature rules and basis functions is the responsibility of the caller.
//! A [`QuadratureTable`] only validates the sizes of the supplied arrays and offers indexed access
//! per quadrature point. The single exception is [`QuadratureTable::linear_lagrange`], which
//! tabulates the linear basis of a reference cell at supplied points, the basis that also defines
//! the cell's geometric map.
//!
//! Layout for `n` points, `b` basis functions and reference dimension `c`:
//!
//! - points: `n * c` entries, point-major,
//! - weights: `n` entries,
//! - basis values: `n * b` entries, point-major,
//! - basis derivatives: `n * b * c` entries, entry `(q * b + i) * c + k` holding
//!   $\partial N_i / \partial \xi_k$ at point `q`.
use crate::element::CellShape;
use crate::error::Error;
use crate::Real;
use serde::{Deserialize, Serialize};

/// A quadrature rule together with the basis tabulated at its points.
///
/// Deserialization validates the array sizes like [`QuadratureTable::from_parts`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "QuadratureTableParts<T>",
    bound(deserialize = "T: Real + Deserialize<'de>")
)]
pub struct QuadratureTable<T> {
    cell_dim: usize,
    num_basis: usize,
    points: Vec<T>,
    weights: Vec<T>,
    basis: Vec<T>,
    basis_derivatives: Vec<T>,
}

#[derive(Deserialize)]
struct QuadratureTableParts<T> {
    cell_dim: usize,
    num_basis: usize,
    points: Vec<T>,
    weights: Vec<T>,
    basis: Vec<T>,
    basis_derivatives: Vec<T>,
}

impl<T: Real> TryFrom<QuadratureTableParts<T>> for QuadratureTable<T> {
    type Error = Error;

    fn try_from(parts: QuadratureTableParts<T>) -> Result<Self, Error> {
        QuadratureTable::from_parts(
            parts.cell_dim,
            parts.num_basis,
            parts.points,
            parts.weights,
            parts.basis,
            parts.basis_derivatives,
        )
    }
}

impl<T: Real> QuadratureTable<T> {
    pub fn from_parts(
        cell_dim: usize,
        num_basis: usize,
        points: Vec<T>,
        weights: Vec<T>,
        basis: Vec<T>,
        basis_derivatives: Vec<T>,
    ) -> Result<Self, Error> {
        let n = weights.len();
        if points.len() != n * cell_dim {
            return Err(Error::dimension_mismatch("quadrature points", n * cell_dim, points.len()));
        }
        if basis.len() != n * num_basis {
            return Err(Error::dimension_mismatch("basis values", n * num_basis, basis.len()));
        }
        if basis_derivatives.len() != n * num_basis * cell_dim {
            return Err(Error::dimension_mismatch(
                "basis derivatives",
                n * num_basis * cell_dim,
                basis_derivatives.len(),
            ));
        }
        Ok(Self {
            cell_dim,
            num_basis,
            points,
            weights,
            basis,
            basis_derivatives,
        })
    }

    /// Tabulates the linear Lagrange basis of the given reference cell at the given points.
    pub fn linear_lagrange(shape: CellShape, points: Vec<T>, weights: Vec<T>) -> Result<Self, Error> {
        let c = shape.cell_dim();
        let b = shape.num_corners();
        let n = weights.len();
        if points.len() != n * c {
            return Err(Error::dimension_mismatch("quadrature points", n * c, points.len()));
        }

        let mut basis = vec![T::zero(); n * b];
        let mut basis_derivatives = vec![T::zero(); n * b * c];
        for q in 0..n {
            let xi = &points[q * c..(q + 1) * c];
            shape.populate_basis(&mut basis[q * b..(q + 1) * b], xi);
            shape.populate_basis_gradients(&mut basis_derivatives[q * b * c..(q + 1) * b * c], xi);
        }

        Self::from_parts(c, b, points, weights, basis, basis_derivatives)
    }

    pub fn cell_dim(&self) -> usize {
        self.cell_dim
    }

    pub fn num_basis(&self) -> usize {
        self.num_basis
    }

    pub fn num_points(&self) -> usize {
        self.weights.len()
    }

    pub fn points(&self) -> &[T] {
        &self.points
    }

    pub fn weights(&self) -> &[T] {
        &self.weights
    }

    /// Reference coordinates of quadrature point `q`.
    pub fn point(&self, q: usize) -> &[T] {
        &self.points[q * self.cell_dim..(q + 1) * self.cell_dim]
    }

    /// Basis function values at quadrature point `q`.
    pub fn basis(&self, q: usize) -> &[T] {
        &self.basis[q * self.num_basis..(q + 1) * self.num_basis]
    }

    /// Reference basis derivatives at quadrature point `q`, basis-major.
    pub fn basis_derivatives(&self, q: usize) -> &[T] {
        let stride = self.num_basis * self.cell_dim;
        &self.basis_derivatives[q * stride..(q + 1) * stride]
    }
}
