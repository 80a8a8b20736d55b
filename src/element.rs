//! Reference-to-physical cell geometry.
//!
//! A [`CellGeometry`] describes one kind of cell (a [`CellShape`] embedded in a space of a given
//! dimension). It is created once per distinct kind of cell and reused for every cell of that kind:
//! the physical vertices of a particular cell are passed to each operation. The geometry maps
//! reference coordinates to physical coordinates and computes the Jacobian of that map.
//!
//! All flat arrays are point-major. For `n` points,
//!
//! - reference coordinates have `n * cell_dim` entries,
//! - physical coordinates have `n * space_dim` entries,
//! - Jacobians have `n * space_dim * cell_dim` entries, each one a row-major
//!   `space_dim x cell_dim` matrix with entry `(i, j)` equal to $\partial x_i / \partial \xi_j$,
//! - cell vertices have `num_corners * space_dim` entries.
use crate::error::Error;
use crate::flops::log_flops;
use crate::nalgebra::{DMatrix, Matrix3, Scalar, Vector3};
use crate::Real;
use itertools::izip;
use numeric_literals::replace_float_literals;
use serde::{Deserialize, Serialize};

mod hexahedron;
mod quadrilateral;
mod reference;
mod simplex;

/// The shape of a reference cell.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellShape {
    Point,
    Line,
    Triangle,
    Quadrilateral,
    Tetrahedron,
    Hexahedron,
}

impl CellShape {
    pub const ALL: [CellShape; 6] = [
        CellShape::Point,
        CellShape::Line,
        CellShape::Triangle,
        CellShape::Quadrilateral,
        CellShape::Tetrahedron,
        CellShape::Hexahedron,
    ];

    /// The intrinsic (reference) dimension of the cell.
    pub fn cell_dim(&self) -> usize {
        match self {
            CellShape::Point => 0,
            CellShape::Line => 1,
            CellShape::Triangle | CellShape::Quadrilateral => 2,
            CellShape::Tetrahedron | CellShape::Hexahedron => 3,
        }
    }

    pub fn num_corners(&self) -> usize {
        match self {
            CellShape::Point => 1,
            CellShape::Line => 2,
            CellShape::Triangle => 3,
            CellShape::Quadrilateral => 4,
            CellShape::Tetrahedron => 4,
            CellShape::Hexahedron => 8,
        }
    }

    /// Whether the reference-to-physical map is affine, i.e. the Jacobian is constant over a cell.
    pub fn is_simplex(&self) -> bool {
        match self {
            CellShape::Point | CellShape::Line | CellShape::Triangle | CellShape::Tetrahedron => true,
            CellShape::Quadrilateral | CellShape::Hexahedron => false,
        }
    }

    /// Canonical reference vertices, `num_corners * cell_dim` entries with coordinates in `[-1, 1]`.
    pub fn reference_vertices(&self) -> &'static [f64] {
        reference::vertices(*self)
    }

    /// The shape of the facets on the boundary of the cell, if any.
    pub fn boundary_shape(&self) -> Option<CellShape> {
        match self {
            CellShape::Point => None,
            CellShape::Line => Some(CellShape::Point),
            CellShape::Triangle | CellShape::Quadrilateral => Some(CellShape::Line),
            CellShape::Tetrahedron => Some(CellShape::Triangle),
            CellShape::Hexahedron => Some(CellShape::Quadrilateral),
        }
    }

    /// Whether a geometry for this shape is implemented in the given space dimension.
    pub fn supports_space_dim(&self, space_dim: usize) -> bool {
        match self {
            CellShape::Point | CellShape::Line => (1..=3).contains(&space_dim),
            CellShape::Triangle | CellShape::Quadrilateral => (2..=3).contains(&space_dim),
            CellShape::Tetrahedron | CellShape::Hexahedron => space_dim == 3,
        }
    }

    /// Evaluates the linear Lagrange basis functions of the reference cell at `xi`.
    ///
    /// # Panics
    ///
    /// Panics if `xi` does not have `cell_dim` entries or `basis` does not have `num_corners`
    /// entries.
    pub fn populate_basis<T: Real>(&self, basis: &mut [T], xi: &[T]) {
        assert_eq!(xi.len(), self.cell_dim(), "Reference point dimension mismatch");
        assert_eq!(basis.len(), self.num_corners(), "Basis buffer size mismatch");
        reference::populate_basis(*self, basis, xi);
    }

    /// Evaluates the reference gradients of the linear Lagrange basis functions at `xi`.
    ///
    /// The output is basis-major: entry `b * cell_dim + k` holds $\partial N_b / \partial \xi_k$.
    ///
    /// # Panics
    ///
    /// Panics if `xi` does not have `cell_dim` entries or `gradients` does not have
    /// `num_corners * cell_dim` entries.
    pub fn populate_basis_gradients<T: Real>(&self, gradients: &mut [T], xi: &[T]) {
        assert_eq!(xi.len(), self.cell_dim(), "Reference point dimension mismatch");
        assert_eq!(
            gradients.len(),
            self.num_corners() * self.cell_dim(),
            "Gradient buffer size mismatch"
        );
        reference::populate_basis_gradients(*self, gradients, xi);
    }
}

/// The Jacobian of the reference-to-physical map at a single location.
#[derive(Debug, Clone, PartialEq)]
pub struct Jacobian<T: Scalar> {
    /// `space_dim x cell_dim` matrix of partial derivatives.
    pub matrix: DMatrix<T>,
    pub determinant: T,
}

/// Geometry of a cell shape embedded in a space of fixed dimension.
///
/// The geometry is an immutable value; copies are independent and may be freely shared between
/// threads.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "GeometryDescription")]
pub struct CellGeometry {
    shape: CellShape,
    space_dim: usize,
}

/// Unvalidated serialized form of a [`CellGeometry`].
#[derive(Deserialize)]
struct GeometryDescription {
    shape: CellShape,
    space_dim: usize,
}

impl TryFrom<GeometryDescription> for CellGeometry {
    type Error = Error;

    fn try_from(description: GeometryDescription) -> Result<Self, Error> {
        CellGeometry::new(description.shape, description.space_dim)
    }
}

impl CellGeometry {
    /// Creates the geometry for the given shape and space dimension.
    ///
    /// Fails with [`Error::UnsupportedShape`] if the combination is not implemented.
    pub fn new(shape: CellShape, space_dim: usize) -> Result<Self, Error> {
        if shape.supports_space_dim(space_dim) {
            Ok(Self { shape, space_dim })
        } else {
            Err(Error::UnsupportedShape {
                shape,
                space_dim,
                operation: "geometry",
            })
        }
    }

    pub fn shape(&self) -> CellShape {
        self.shape
    }

    pub fn cell_dim(&self) -> usize {
        self.shape.cell_dim()
    }

    pub fn space_dim(&self) -> usize {
        self.space_dim
    }

    pub fn num_corners(&self) -> usize {
        self.shape.num_corners()
    }

    pub fn reference_vertices(&self) -> &'static [f64] {
        self.shape.reference_vertices()
    }

    pub fn is_affine(&self) -> bool {
        self.shape.is_simplex()
    }

    /// Returns the geometry of the co-dimension one facets of this cell.
    ///
    /// The boundary geometry lives in the same space dimension, e.g. the boundary of a triangle
    /// in 2-D is a line in 2-D.
    pub fn boundary_geometry(&self) -> Result<CellGeometry, Error> {
        let boundary_shape = self.shape.boundary_shape().ok_or(Error::UnsupportedShape {
            shape: self.shape,
            space_dim: self.space_dim,
            operation: "boundary geometry",
        })?;
        CellGeometry::new(boundary_shape, self.space_dim)
    }

    fn check_vertices<T>(&self, vertices: &[T]) -> Result<(), Error> {
        let expected = self.num_corners() * self.space_dim;
        if vertices.len() != expected {
            return Err(Error::dimension_mismatch("cell vertices", expected, vertices.len()));
        }
        Ok(())
    }

    /// Maps `num_points` reference points to physical points of the cell with the given vertices.
    pub fn map_reference_to_global<T: Real>(
        &self,
        global_points: &mut [T],
        reference_points: &[T],
        vertices: &[T],
        num_points: usize,
    ) -> Result<(), Error> {
        self.check_vertices(vertices)?;
        let (d, c) = (self.space_dim, self.cell_dim());
        if reference_points.len() != num_points * c {
            return Err(Error::dimension_mismatch(
                "reference points",
                num_points * c,
                reference_points.len(),
            ));
        }
        if global_points.len() != num_points * d {
            return Err(Error::dimension_mismatch(
                "global points",
                num_points * d,
                global_points.len(),
            ));
        }

        match self.shape {
            CellShape::Point | CellShape::Line | CellShape::Triangle | CellShape::Tetrahedron => {
                simplex::map_reference_to_global(global_points, reference_points, vertices, d, c, num_points)
            }
            CellShape::Quadrilateral => {
                quadrilateral::map_reference_to_global(global_points, reference_points, vertices, d, num_points)
            }
            CellShape::Hexahedron => {
                hexahedron::map_reference_to_global(global_points, reference_points, vertices, num_points)
            }
        }
        Ok(())
    }

    /// Computes the Jacobian of the reference-to-physical map at a single reference location.
    ///
    /// The determinant is returned as computed: a non-positive value indicates a degenerate or
    /// inverted cell, which callers may check with [`CellGeometry::check_determinant`].
    pub fn compute_jacobian<T: Real>(&self, vertices: &[T], location: &[T]) -> Result<Jacobian<T>, Error> {
        let (d, c) = (self.space_dim, self.cell_dim());
        let mut entries = [T::zero(); 9];
        let entries = &mut entries[..d * c];
        let mut determinant = [T::zero()];
        self.compute_jacobians(entries, &mut determinant, vertices, location, 1)?;
        Ok(Jacobian {
            matrix: DMatrix::from_row_slice(d, c, entries),
            determinant: determinant[0],
        })
    }

    /// Computes Jacobians and determinants at `num_points` reference locations.
    ///
    /// For affine shapes the Jacobian is computed once and broadcast to every point.
    pub fn compute_jacobians<T: Real>(
        &self,
        jacobians: &mut [T],
        determinants: &mut [T],
        vertices: &[T],
        locations: &[T],
        num_points: usize,
    ) -> Result<(), Error> {
        self.check_vertices(vertices)?;
        let (d, c) = (self.space_dim, self.cell_dim());
        if locations.len() != num_points * c {
            return Err(Error::dimension_mismatch("reference locations", num_points * c, locations.len()));
        }
        if jacobians.len() != num_points * d * c {
            return Err(Error::dimension_mismatch("jacobians", num_points * d * c, jacobians.len()));
        }
        if determinants.len() != num_points {
            return Err(Error::dimension_mismatch("determinants", num_points, determinants.len()));
        }

        match self.shape {
            CellShape::Point | CellShape::Line | CellShape::Triangle | CellShape::Tetrahedron => {
                if num_points == 0 {
                    return Ok(());
                }
                let (first, rest) = jacobians.split_at_mut(d * c);
                simplex::jacobian(first, vertices, d, c);
                let det = jacobian_determinant(first, d, c);
                // Points have an empty Jacobian, so there is nothing to broadcast
                if c > 0 {
                    for jacobian in rest.chunks_exact_mut(d * c) {
                        jacobian.copy_from_slice(first);
                    }
                }
                determinants.fill(det);
            }
            CellShape::Quadrilateral => {
                let jacobians = jacobians.chunks_exact_mut(d * c);
                for (jacobian, xi, det) in izip!(jacobians, locations.chunks_exact(c), determinants.iter_mut()) {
                    quadrilateral::jacobian(jacobian, vertices, xi, d);
                    *det = jacobian_determinant(jacobian, d, c);
                }
            }
            CellShape::Hexahedron => {
                let jacobians = jacobians.chunks_exact_mut(d * c);
                for (jacobian, xi, det) in izip!(jacobians, locations.chunks_exact(c), determinants.iter_mut()) {
                    hexahedron::jacobian(jacobian, vertices, xi);
                    *det = jacobian_determinant(jacobian, d, c);
                }
            }
        }
        Ok(())
    }

    /// Turns a non-positive Jacobian determinant into [`Error::DegenerateGeometry`].
    pub fn check_determinant<T: Real>(determinant: T, point: usize) -> Result<(), Error> {
        if determinant > T::zero() {
            Ok(())
        } else {
            Err(Error::DegenerateGeometry {
                cell: None,
                point,
                determinant: crate::to_f64(determinant),
            })
        }
    }
}

/// Determinant of a row-major `space_dim x cell_dim` Jacobian.
///
/// For square Jacobians this is the signed determinant. For cells embedded in a higher-dimensional
/// space it is the non-negative measure $\sqrt{\det(J^T J)}$.
#[replace_float_literals(T::from_f64(literal).expect("literal must fit in T"))]
fn jacobian_determinant<T: Real>(j: &[T], space_dim: usize, cell_dim: usize) -> T {
    match (space_dim, cell_dim) {
        (_, 0) => 1.0,
        (1, 1) => j[0],
        (_, 1) => {
            log_flops("jacobian determinant", 2 * space_dim);
            j.iter().fold(0.0, |acc: T, &x| acc + x * x).sqrt()
        }
        (2, 2) => {
            log_flops("jacobian determinant", 3);
            j[0] * j[3] - j[1] * j[2]
        }
        (3, 2) => {
            log_flops("jacobian determinant", 14);
            let c0 = Vector3::new(j[0], j[2], j[4]);
            let c1 = Vector3::new(j[1], j[3], j[5]);
            c0.cross(&c1).norm()
        }
        (3, 3) => {
            log_flops("jacobian determinant", 17);
            Matrix3::from_row_slice(j).determinant()
        }
        _ => unreachable!("Geometry construction rejects unsupported dimensions"),
    }
}
