//! Non-dimensional material queries at quadrature points.
//!
//! Every query follows the same steps:
//!
//! 1. declare the required fields to the spatial database,
//! 2. dimensionalize the query location with the length scale,
//! 3. look the fields up in the database,
//! 4. check that density and wave speeds are strictly positive,
//! 5. combine the raw fields into the requested quantity,
//! 6. divide the result by the value scale.
//!
//! Failures are returned as [`Error::DatabaseLookup`] or [`Error::InvalidMaterialValue`], carrying
//! the dimensional location and the database label. A query never returns partially filled
//! values.
use crate::materials::{check_positive, LameParameters, NonPositiveProperty};
use crate::scales::Scales;
use crate::spatial_db::{CoordinateSystem, SpatialDatabase};
use crustfe::{to_f64, Error, Real};
use log::debug;
use numeric_literals::replace_float_literals;

/// Immutable context shared by all queries of an assembly pass.
#[derive(Clone, Copy)]
pub struct QueryContext<'a, T> {
    database: &'a dyn SpatialDatabase<T>,
    coordinate_system: CoordinateSystem,
    scales: Scales<T>,
}

impl<'a, T: Real> QueryContext<'a, T> {
    /// Fails with [`Error::InvalidScale`] if a scale is not strictly positive and finite.
    pub fn new(
        database: &'a dyn SpatialDatabase<T>,
        coordinate_system: CoordinateSystem,
        scales: Scales<T>,
    ) -> Result<Self, Error> {
        scales.validate()?;
        let d = coordinate_system.space_dim();
        if !(1..=3).contains(&d) {
            return Err(Error::dimension_mismatch("coordinate system dimension", 3, d));
        }
        Ok(Self {
            database,
            coordinate_system,
            scales,
        })
    }

    pub fn database(&self) -> &'a dyn SpatialDatabase<T> {
        self.database
    }

    pub fn coordinate_system(&self) -> &CoordinateSystem {
        &self.coordinate_system
    }

    pub fn scales(&self) -> &Scales<T> {
        &self.scales
    }

    pub fn space_dim(&self) -> usize {
        self.coordinate_system.space_dim()
    }

    /// Runs steps 1-3 for the given fields and returns the raw values together with the
    /// dimensional location.
    fn lookup(&self, raw: &mut [T], fields: &[&str], location: &[T]) -> Result<[T; 3], Error> {
        let d = self.space_dim();
        if location.len() != d {
            return Err(Error::dimension_mismatch("query location", d, location.len()));
        }

        self.database.declare_fields(fields);

        let mut x = [T::zero(); 3];
        for (x_i, &location_i) in x.iter_mut().zip(location) {
            *x_i = self.scales.dimensionalize_length(location_i);
        }

        self.database
            .query(raw, fields, &x[..d], &self.coordinate_system)
            .map_err(|failure| {
                debug!("Query of '{}' failed: {}", self.database.label(), failure);
                Error::DatabaseLookup {
                    cell: None,
                    fields: fields.iter().map(|field| field.to_string()).collect(),
                    location: x[..d].iter().map(|&x_i| to_f64(x_i)).collect(),
                    database: self.database.label().to_string(),
                }
            })?;
        Ok(x)
    }

    fn invalid_value(&self, property: NonPositiveProperty<T>, x: &[T]) -> Error {
        Error::InvalidMaterialValue {
            cell: None,
            field: property.name.to_string(),
            value: to_f64(property.value),
            location: x[..self.space_dim()].iter().map(|&x_i| to_f64(x_i)).collect(),
            database: self.database.label().to_string(),
        }
    }
}

/// The closed set of material queries.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MaterialQuery {
    /// Density $\rho$.
    Density,
    /// Shear modulus $\mu = \rho v_s^2$.
    ShearModulus,
    /// Lamé's constant $\lambda = \rho v_p^2 - 2 \mu$.
    LameLambda,
    /// Body force vector, returned as stored.
    BodyForce,
}

const BODY_FORCE_FIELDS: [&str; 3] = ["body-force-x", "body-force-y", "body-force-z"];

impl MaterialQuery {
    /// Names of the database fields the query reads in the given dimension.
    pub fn field_names(&self, dim: usize) -> &'static [&'static str] {
        match self {
            Self::Density => &["density"],
            Self::ShearModulus => &["density", "vs"],
            Self::LameLambda => &["density", "vs", "vp"],
            Self::BodyForce => &BODY_FORCE_FIELDS[..dim.min(3)],
        }
    }

    /// Number of values the query produces in the given dimension.
    pub fn num_values(&self, dim: usize) -> usize {
        match self {
            Self::Density | Self::ShearModulus | Self::LameLambda => 1,
            Self::BodyForce => dim,
        }
    }

    /// Resolves the non-dimensional values of the query at a non-dimensional location.
    ///
    /// The time is accepted for compatibility with time-dependent databases; the database
    /// contract itself is time-independent.
    #[replace_float_literals(T::from_f64(literal).expect("literal must fit in T"))]
    pub fn evaluate<T: Real>(
        &self,
        context: &QueryContext<T>,
        values: &mut [T],
        location: &[T],
        time: T,
    ) -> Result<(), Error> {
        let _ = time;
        let d = context.space_dim();
        let num_values = self.num_values(d);
        if values.len() != num_values {
            return Err(Error::dimension_mismatch("query values", num_values, values.len()));
        }

        let fields = self.field_names(d);
        let mut raw = [T::zero(); 3];
        let raw = &mut raw[..fields.len()];
        let x = context.lookup(raw, fields, location)?;

        let scales = context.scales();
        match self {
            Self::Density => {
                let density = check_positive("density", raw[0]).map_err(|p| context.invalid_value(p, &x))?;
                values[0] = scales.nondimensionalize_value(density);
            }
            Self::ShearModulus => {
                let density = check_positive("density", raw[0]).map_err(|p| context.invalid_value(p, &x))?;
                let vs = check_positive("vs", raw[1]).map_err(|p| context.invalid_value(p, &x))?;
                let mu = density * vs * vs;
                debug_assert!(mu > 0.0);
                values[0] = scales.nondimensionalize_value(mu);
            }
            Self::LameLambda => {
                let lame = LameParameters::from_wave_speeds(raw[0], raw[1], raw[2])
                    .map_err(|p| context.invalid_value(p, &x))?;
                values[0] = scales.nondimensionalize_value(lame.lambda);
            }
            Self::BodyForce => {
                for (value, &f) in values.iter_mut().zip(raw.iter()) {
                    *value = scales.nondimensionalize_value(f);
                }
            }
        }
        Ok(())
    }
}

pub fn query_density<T: Real>(context: &QueryContext<T>, location: &[T], time: T) -> Result<T, Error> {
    let mut value = [T::zero()];
    MaterialQuery::Density.evaluate(context, &mut value, location, time)?;
    Ok(value[0])
}

pub fn query_shear_modulus<T: Real>(context: &QueryContext<T>, location: &[T], time: T) -> Result<T, Error> {
    let mut value = [T::zero()];
    MaterialQuery::ShearModulus.evaluate(context, &mut value, location, time)?;
    Ok(value[0])
}

pub fn query_lame_lambda<T: Real>(context: &QueryContext<T>, location: &[T], time: T) -> Result<T, Error> {
    let mut value = [T::zero()];
    MaterialQuery::LameLambda.evaluate(context, &mut value, location, time)?;
    Ok(value[0])
}

/// Writes the body force vector, one component per space dimension, into `values`.
pub fn query_body_force<T: Real>(
    context: &QueryContext<T>,
    values: &mut [T],
    location: &[T],
    time: T,
) -> Result<(), Error> {
    MaterialQuery::BodyForce.evaluate(context, values, location, time)
}

/// Non-dimensional density and Lamé parameters at a point.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ElasticProperties<T> {
    pub density: T,
    pub lame: LameParameters<T>,
}

/// Resolves density, shear modulus and Lamé's constant with a single database lookup.
pub fn query_elastic_properties<T: Real>(
    context: &QueryContext<T>,
    location: &[T],
    time: T,
) -> Result<ElasticProperties<T>, Error> {
    let _ = time;
    let fields = MaterialQuery::LameLambda.field_names(context.space_dim());
    let mut raw = [T::zero(); 3];
    let x = context.lookup(&mut raw, fields, location)?;
    let lame = LameParameters::from_wave_speeds(raw[0], raw[1], raw[2]).map_err(|p| context.invalid_value(p, &x))?;

    let scales = context.scales();
    Ok(ElasticProperties {
        density: scales.nondimensionalize_value(raw[0]),
        lame: lame.nondimensionalize(scales.value_scale),
    })
}
