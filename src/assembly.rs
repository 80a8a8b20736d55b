//! Element assembly: the per-cell quadrature loop and a parallel driver over cell blocks.
pub mod buffers;
pub mod global;
pub mod local;

pub use buffers::CellQuadratureData;
