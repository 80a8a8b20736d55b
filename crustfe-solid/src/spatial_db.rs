//! Spatial databases resolving named material fields at physical locations.
//!
//! Material queries only depend on the narrow [`SpatialDatabase`] contract. Two in-memory
//! implementations are provided: [`UniformDatabase`], which returns the same values everywhere,
//! and [`PointDatabase`], which returns the values of the nearest sample point.
use crustfe::nalgebra::convert;
use crustfe::{to_f64, Error, Real};
use log::debug;
use rstar::primitives::GeomWithData;
use rstar::{PointDistance, RTree};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::{Display, Formatter};

/// A Cartesian coordinate system.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoordinateSystem {
    space_dim: usize,
    to_meters: f64,
}

impl CoordinateSystem {
    /// A Cartesian coordinate system with coordinates in meters.
    pub fn cartesian(space_dim: usize) -> Self {
        Self {
            space_dim,
            to_meters: 1.0,
        }
    }

    /// Sets the factor converting coordinates of this system to meters, e.g. `1000.0` for kilometers.
    pub fn with_to_meters(self, to_meters: f64) -> Self {
        Self { to_meters, ..self }
    }

    pub fn space_dim(&self) -> usize {
        self.space_dim
    }

    pub fn to_meters(&self) -> f64 {
        self.to_meters
    }

    /// The factor converting coordinates of this system to coordinates of `other`.
    pub fn conversion_factor(&self, other: &CoordinateSystem) -> f64 {
        self.to_meters / other.to_meters
    }
}

/// The reason a database could not resolve a query.
#[derive(Clone, Debug, PartialEq)]
pub enum LookupFailure {
    UnknownField(String),
    DimensionMismatch { expected: usize, actual: usize },
    OutOfRange { distance: f64, max_distance: f64 },
    Empty,
}

impl Display for LookupFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownField(name) => write!(f, "Unknown field '{}'.", name),
            Self::DimensionMismatch { expected, actual } => write!(
                f,
                "Query location has dimension {}, but the database is {}-dimensional.",
                actual, expected
            ),
            Self::OutOfRange { distance, max_distance } => write!(
                f,
                "Nearest sample point is at distance {:e}, beyond the maximum search distance {:e}.",
                distance, max_distance
            ),
            Self::Empty => write!(f, "The database has no sample points."),
        }
    }
}

impl std::error::Error for LookupFailure {}

/// Resolves named fields at physical locations.
///
/// Implementations are shared read-only between assembly threads, so a query must not depend
/// on state set by a previous call.
pub trait SpatialDatabase<T>: Sync {
    /// Human-readable name used in diagnostics.
    fn label(&self) -> &str;

    /// Announces the fields that subsequent queries will request.
    ///
    /// Databases may use this to prepare their lookup. The default does nothing.
    fn declare_fields(&self, fields: &[&str]) {
        let _ = fields;
    }

    /// Writes the values of `fields` at `location` into `values`.
    ///
    /// `location` is given in physical units of `coordinate_system`.
    fn query(
        &self,
        values: &mut [T],
        fields: &[&str],
        location: &[T],
        coordinate_system: &CoordinateSystem,
    ) -> Result<(), LookupFailure>;
}

fn check_query_dimension<T>(location: &[T], coordinate_system: &CoordinateSystem) -> Result<(), LookupFailure> {
    if location.len() != coordinate_system.space_dim() {
        return Err(LookupFailure::DimensionMismatch {
            expected: coordinate_system.space_dim(),
            actual: location.len(),
        });
    }
    Ok(())
}

/// A database with spatially uniform values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UniformDatabase {
    label: String,
    values: Vec<(String, f64)>,
}

impl UniformDatabase {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            values: Vec::new(),
        }
    }

    /// Sets the value of a field, replacing any previous value.
    pub fn with_value(mut self, name: impl Into<String>, value: f64) -> Self {
        let name = name.into();
        match self.values.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, existing_value)) => *existing_value = value,
            None => self.values.push((name, value)),
        }
        self
    }

    pub fn value(&self, name: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|&(_, value)| value)
    }
}

impl<T: Real> SpatialDatabase<T> for UniformDatabase {
    fn label(&self) -> &str {
        &self.label
    }

    fn query(
        &self,
        values: &mut [T],
        fields: &[&str],
        location: &[T],
        coordinate_system: &CoordinateSystem,
    ) -> Result<(), LookupFailure> {
        check_query_dimension(location, coordinate_system)?;
        for (value, &field) in values.iter_mut().zip(fields) {
            let v = self
                .value(field)
                .ok_or_else(|| LookupFailure::UnknownField(field.to_string()))?;
            *value = convert(v);
        }
        Ok(())
    }
}

/// A database of scattered sample points returning the values of the nearest point.
///
/// Sample locations are given in the database's own coordinate system. Query locations are
/// converted to it before the lookup. With a maximum search distance, queries farther than that
/// from every sample point fail.
#[derive(Clone, Debug)]
pub struct PointDatabase {
    label: String,
    coordinate_system: CoordinateSystem,
    field_names: Vec<String>,
    values: Vec<f64>,
    max_distance: Option<f64>,
    tree: RTree<GeomWithData<[f64; 3], usize>>,
}

impl PointDatabase {
    /// Builds the database from point-major sample locations and values.
    ///
    /// `locations` holds `num_points * space_dim` coordinates and `values` holds
    /// `num_points * field_names.len()` values, point-major.
    pub fn from_points(
        label: impl Into<String>,
        coordinate_system: CoordinateSystem,
        field_names: Vec<String>,
        locations: &[f64],
        values: Vec<f64>,
    ) -> Result<Self, Error> {
        let d = coordinate_system.space_dim();
        if !(1..=3).contains(&d) {
            return Err(Error::dimension_mismatch("database dimension", 3, d));
        }
        if locations.len() % d != 0 {
            return Err(Error::dimension_mismatch(
                "sample locations",
                d * (locations.len() / d + 1),
                locations.len(),
            ));
        }
        let num_points = locations.len() / d;
        if values.len() != num_points * field_names.len() {
            return Err(Error::dimension_mismatch(
                "sample values",
                num_points * field_names.len(),
                values.len(),
            ));
        }

        let points = locations
            .chunks_exact(d)
            .enumerate()
            .map(|(i, x)| GeomWithData::new(pad_to_3d(x.iter().copied()), i))
            .collect();
        let label = label.into();
        debug!("Built point database '{}' with {} sample points.", label, num_points);

        Ok(Self {
            label,
            coordinate_system,
            field_names,
            values,
            max_distance: None,
            tree: RTree::bulk_load(points),
        })
    }

    /// Sets the maximum distance, in database coordinates, between a query and its nearest point.
    pub fn with_max_distance(self, max_distance: f64) -> Self {
        Self {
            max_distance: Some(max_distance),
            ..self
        }
    }

    pub fn coordinate_system(&self) -> &CoordinateSystem {
        &self.coordinate_system
    }

    pub fn num_points(&self) -> usize {
        self.tree.size()
    }

    fn field_index(&self, name: &str) -> Result<usize, LookupFailure> {
        self.field_names
            .iter()
            .position(|existing| existing == name)
            .ok_or_else(|| LookupFailure::UnknownField(name.to_string()))
    }
}

fn pad_to_3d(coordinates: impl Iterator<Item = f64>) -> [f64; 3] {
    let mut padded = [0.0; 3];
    for (p, x) in padded.iter_mut().zip(coordinates) {
        *p = x;
    }
    padded
}

impl<T: Real> SpatialDatabase<T> for PointDatabase {
    fn label(&self) -> &str {
        &self.label
    }

    fn query(
        &self,
        values: &mut [T],
        fields: &[&str],
        location: &[T],
        coordinate_system: &CoordinateSystem,
    ) -> Result<(), LookupFailure> {
        check_query_dimension(location, coordinate_system)?;
        if coordinate_system.space_dim() != self.coordinate_system.space_dim() {
            return Err(LookupFailure::DimensionMismatch {
                expected: self.coordinate_system.space_dim(),
                actual: coordinate_system.space_dim(),
            });
        }

        let factor = coordinate_system.conversion_factor(&self.coordinate_system);
        let x = pad_to_3d(location.iter().map(|&x_i| to_f64(x_i) * factor));
        let nearest = self.tree.nearest_neighbor(&x).ok_or(LookupFailure::Empty)?;
        if let Some(max_distance) = self.max_distance {
            let distance = nearest.distance_2(&x).sqrt();
            if distance > max_distance {
                return Err(LookupFailure::OutOfRange { distance, max_distance });
            }
        }

        let offset = nearest.data * self.field_names.len();
        for (value, &field) in values.iter_mut().zip(fields) {
            let index = self.field_index(field)?;
            *value = convert(self.values[offset + index]);
        }
        Ok(())
    }
}
