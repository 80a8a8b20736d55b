//! Proptest strategies for reference points and cells.
use crate::element::{CellGeometry, CellShape};
use ::proptest::collection::vec;
use ::proptest::prelude::*;

/// Points in the closed reference domain of the given shape, with `cell_dim` entries each.
pub fn reference_point(shape: CellShape) -> impl Strategy<Value = Vec<f64>> {
    let simplex = shape.is_simplex();
    vec(0.0..=1.0f64, shape.cell_dim()).prop_map(move |mut p| {
        if simplex {
            // Pull points outside the simplex back onto its slanted face
            let sum: f64 = p.iter().sum();
            if sum > 1.0 {
                p.iter_mut().for_each(|p_k| *p_k /= sum);
            }
        }
        p.into_iter().map(|p_k| 2.0 * p_k - 1.0).collect()
    })
}

/// Vertices of well-shaped cells of the given geometry.
///
/// The cells are images of the reference cell under a diagonally dominant affine map with
/// positive diagonal, so volume cells are positively oriented. Vertices of tensor-product cells
/// are additionally perturbed slightly, giving non-affine cells.
pub fn well_shaped_cell(geometry: CellGeometry) -> impl Strategy<Value = Vec<f64>> {
    let d = geometry.space_dim();
    let c = geometry.cell_dim();
    let n = geometry.num_corners();
    let perturbation = if geometry.is_affine() { 0.0 } else { 0.05 };
    (
        vec(0.5..2.0f64, d),
        vec(-0.1..0.1f64, d * c),
        vec(-10.0..10.0f64, d),
        vec(-1.0..=1.0f64, n * d),
    )
        .prop_map(move |(diagonal, off_diagonal, translation, noise)| {
            let reference = geometry.reference_vertices();
            let mut vertices = vec![0.0; n * d];
            for (vertex, v) in vertices.chunks_exact_mut(d).enumerate() {
                let xi = &reference[vertex * c..(vertex + 1) * c];
                for i in 0..d {
                    v[i] = translation[i];
                    for k in 0..c {
                        let a_ik = if i == k { diagonal[i] } else { off_diagonal[i * c + k] };
                        v[i] += a_ik * xi[k];
                    }
                }
            }
            for (x, eps) in vertices.iter_mut().zip(noise) {
                *x += perturbation * eps;
            }
            vertices
        })
}
