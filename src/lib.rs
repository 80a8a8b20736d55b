//! Cell geometry and local element computations for crustal deformation models.
//!
//! The crate provides the numerically load-bearing layer of a finite element engine for
//! quasi-static and dynamic elasticity:
//!
//! - [`element`]: reference-to-physical maps and Jacobians for every supported cell shape,
//! - [`quadrature`]: validated, externally supplied quadrature tables,
//! - [`assembly`]: the per-cell quadrature loop producing local residuals and Jacobians,
//! - [`mesh`]: the flat in-memory array contract through which cells are supplied.
//!
//! Material evaluation and the elasticity kernels live in the companion crate `crustfe-solid`.
use nalgebra::RealField;

pub mod assembly;
pub mod element;
pub mod error;
pub mod flops;
pub mod mesh;
pub mod quadrature;

#[cfg(feature = "proptest-support")]
pub mod proptest;

pub(crate) mod workspace;

pub extern crate nalgebra;

pub use error::Error;

/// Trait alias for the scalar types supported by `crustfe`.
pub trait Real: RealField + Copy {}

impl<T: RealField + Copy> Real for T {}

/// Converts a scalar to `f64` for diagnostics.
///
/// Used to attach offending values to errors without making the error type generic.
pub fn to_f64<T: Real>(value: T) -> f64 {
    nalgebra::try_convert::<T, f64>(value).unwrap_or(f64::NAN)
}
