use crate::element::CellGeometry;
use crate::error::Error;
use crate::flops::log_flops;
use crate::nalgebra::Matrix3;
use crate::quadrature::QuadratureTable;
use crate::Real;

/// Physical quadrature data of a single cell.
///
/// The buffer is filled by [`CellQuadratureData::populate`] for one cell at a time and reused
/// across cells, so that the quadrature loop does not allocate once the buffers have grown to
/// their final size.
///
/// Physical basis gradients are stored per quadrature point and basis-major: entry
/// `(q * b + i) * d + k` holds $\partial N_i / \partial x_k$ at point `q`.
#[derive(Debug, Clone)]
pub struct CellQuadratureData<T> {
    space_dim: usize,
    num_basis: usize,
    points: Vec<T>,
    jacobians: Vec<T>,
    determinants: Vec<T>,
    weights: Vec<T>,
    basis_gradients: Vec<T>,
}

impl<T> Default for CellQuadratureData<T> {
    fn default() -> Self {
        Self {
            space_dim: 0,
            num_basis: 0,
            points: Vec::new(),
            jacobians: Vec::new(),
            determinants: Vec::new(),
            weights: Vec::new(),
            basis_gradients: Vec::new(),
        }
    }
}

impl<T: Real> CellQuadratureData<T> {
    /// Computes the physical quadrature data of the cell with the given vertices.
    ///
    /// Only volume cells (`cell_dim == space_dim`) can be integrated this way. Fails with
    /// [`Error::DegenerateGeometry`] at the first quadrature point whose Jacobian determinant is
    /// not strictly positive.
    pub fn populate(
        &mut self,
        geometry: &CellGeometry,
        vertices: &[T],
        table: &QuadratureTable<T>,
    ) -> Result<(), Error> {
        let (d, c) = (geometry.space_dim(), geometry.cell_dim());
        if c != d {
            return Err(Error::UnsupportedShape {
                shape: geometry.shape(),
                space_dim: d,
                operation: "volume integration",
            });
        }
        if table.cell_dim() != c {
            return Err(Error::dimension_mismatch("quadrature table dimension", c, table.cell_dim()));
        }

        let n = table.num_points();
        let b = table.num_basis();
        self.space_dim = d;
        self.num_basis = b;
        self.points.resize(n * d, T::zero());
        self.jacobians.resize(n * d * d, T::zero());
        self.determinants.resize(n, T::zero());
        self.weights.resize(n, T::zero());
        self.basis_gradients.resize(n * b * d, T::zero());

        geometry.map_reference_to_global(&mut self.points, table.points(), vertices, n)?;
        geometry.compute_jacobians(&mut self.jacobians, &mut self.determinants, vertices, table.points(), n)?;

        for q in 0..n {
            let det = self.determinants[q];
            CellGeometry::check_determinant(det, q)?;
            self.weights[q] = table.weights()[q] * det.abs();

            // Lower-dimensional Jacobians are embedded in the leading block of the identity
            let mut jacobian = Matrix3::identity();
            for i in 0..d {
                for k in 0..d {
                    jacobian[(i, k)] = self.jacobians[(q * d + i) * d + k];
                }
            }
            let inverse = jacobian.try_inverse().ok_or(Error::DegenerateGeometry {
                cell: None,
                point: q,
                determinant: crate::to_f64(det),
            })?;

            // grad N = J^{-T} grad_ref N
            let reference_gradients = table.basis_derivatives(q).chunks_exact(d);
            let gradients = self.basis_gradients[q * b * d..(q + 1) * b * d].chunks_exact_mut(d);
            for (gradient, reference_gradient) in gradients.zip(reference_gradients) {
                for (k, g) in gradient.iter_mut().enumerate() {
                    *g = (0..d).fold(T::zero(), |acc, m| acc + inverse[(m, k)] * reference_gradient[m]);
                }
            }
        }

        log_flops("cell quadrature data", n * (1 + 2 * b * d * d));
        Ok(())
    }

    pub fn space_dim(&self) -> usize {
        self.space_dim
    }

    pub fn num_points(&self) -> usize {
        self.weights.len()
    }

    /// Physical coordinates of all quadrature points, point-major.
    pub fn points(&self) -> &[T] {
        &self.points
    }

    pub fn point(&self, q: usize) -> &[T] {
        &self.points[q * self.space_dim..(q + 1) * self.space_dim]
    }

    pub fn jacobians(&self) -> &[T] {
        &self.jacobians
    }

    pub fn determinants(&self) -> &[T] {
        &self.determinants
    }

    /// Quadrature weights multiplied by $|\det J|$.
    pub fn weights(&self) -> &[T] {
        &self.weights
    }

    /// Physical basis gradients at quadrature point `q`, basis-major.
    pub fn basis_gradients(&self, q: usize) -> &[T] {
        let stride = self.num_basis * self.space_dim;
        &self.basis_gradients[q * stride..(q + 1) * stride]
    }
}
