//! Errors reported by geometry evaluation, material queries and element assembly.
//!
//! Every failure is returned to the immediate caller. Nothing in this crate substitutes a default
//! value for a failed computation.
use crate::element::CellShape;
use itertools::Itertools;
use std::fmt;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// The Jacobian determinant at a quadrature point is not strictly positive.
    DegenerateGeometry {
        cell: Option<usize>,
        point: usize,
        determinant: f64,
    },
    /// The shape/space dimension combination is not implemented, or the requested operation
    /// does not exist for the shape (e.g. the boundary of a point).
    UnsupportedShape {
        shape: CellShape,
        space_dim: usize,
        operation: &'static str,
    },
    /// The spatial database could not resolve the requested fields at a location.
    DatabaseLookup {
        cell: Option<usize>,
        fields: Vec<String>,
        location: Vec<f64>,
        database: String,
    },
    /// The spatial database returned a non-positive density or wave speed.
    InvalidMaterialValue {
        cell: Option<usize>,
        field: String,
        value: f64,
        location: Vec<f64>,
        database: String,
    },
    /// A caller-supplied array does not have the size implied by the geometry or table.
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    /// A non-dimensionalization scale is zero, negative or not finite.
    InvalidScale { name: &'static str, value: f64 },
}

impl Error {
    pub fn dimension_mismatch(what: &'static str, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { what, expected, actual }
    }

    /// Attaches the index of the cell whose contribution failed.
    pub fn in_cell(mut self, cell_index: usize) -> Self {
        match &mut self {
            Self::DegenerateGeometry { cell, .. }
            | Self::DatabaseLookup { cell, .. }
            | Self::InvalidMaterialValue { cell, .. } => *cell = Some(cell_index),
            _ => {}
        }
        self
    }

    /// The cell associated with the error, if known.
    pub fn cell(&self) -> Option<usize> {
        match self {
            Self::DegenerateGeometry { cell, .. }
            | Self::DatabaseLookup { cell, .. }
            | Self::InvalidMaterialValue { cell, .. } => *cell,
            _ => None,
        }
    }
}

struct Location<'a>(&'a [f64]);

impl<'a> Display for Location<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.0.iter().join(", "))
    }
}

struct CellSuffix(Option<usize>);

impl Display for CellSuffix {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(cell) => write!(f, " (cell {})", cell),
            None => Ok(()),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::DegenerateGeometry {
                cell,
                point,
                determinant,
            } => write!(
                f,
                "Degenerate or inverted cell geometry: Jacobian determinant {:e} at quadrature point {}{}.",
                determinant,
                point,
                CellSuffix(*cell)
            ),
            Self::UnsupportedShape {
                shape,
                space_dim,
                operation,
            } => write!(
                f,
                "Operation '{}' is not supported for {:?} cells in {}-D space.",
                operation, shape, space_dim
            ),
            Self::DatabaseLookup {
                cell,
                fields,
                location,
                database,
            } => write!(
                f,
                "Could not find {} at {} in spatial database '{}'{}.",
                fields.join(", "),
                Location(location),
                database,
                CellSuffix(*cell)
            ),
            Self::InvalidMaterialValue {
                cell,
                field,
                value,
                location,
                database,
            } => write!(
                f,
                "Found non-positive {} ({:e}) at location {} in spatial database '{}'{}.",
                field,
                value,
                Location(location),
                database,
                CellSuffix(*cell)
            ),
            Self::DimensionMismatch { what, expected, actual } => {
                write!(f, "Dimension mismatch for {}: expected {}, got {}.", what, expected, actual)
            }
            Self::InvalidScale { name, value } => {
                write!(f, "Scale '{}' must be strictly positive and finite, got {:e}.", name, value)
            }
        }
    }
}

impl std::error::Error for Error {}
