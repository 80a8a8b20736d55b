//! Material queries and elasticity kernels for `crustfe`.
//!
//! - [`spatial_db`]: the narrow contract through which material values are looked up at physical
//!   locations, together with two in-memory databases,
//! - [`query`]: the closed set of material queries resolving non-dimensional material values,
//! - [`materials`]: Lamé parameters and the elastic constitutive laws,
//! - [`elasticity`]: element kernels for quasi-static and dynamic elasticity,
//! - [`gravity`]: the gravitational body force.
pub mod elasticity;
pub mod gravity;
pub mod materials;
pub mod query;
pub mod scales;
pub mod spatial_db;

pub use elasticity::{
    ExplicitElasticity, ImplicitElasticity, ImplicitLargeDeformationElasticity, MaterialPoint, QuasistaticElasticity,
};
pub use gravity::GravityField;
pub use materials::{HyperelasticMaterial, LameParameters, LinearElasticMaterial, StVKMaterial, YoungPoisson};
pub use query::{MaterialQuery, QueryContext};
pub use scales::Scales;
pub use spatial_db::{CoordinateSystem, PointDatabase, SpatialDatabase, UniformDatabase};
