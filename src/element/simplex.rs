//! Affine maps for points, lines, triangles and tetrahedra.
//!
//! A simplex with vertices $v_0, \dots, v_c$ is the image of the reference simplex under
//! $$
//! x(\xi) = v_0 + \sum_k (v_{k+1} - v_0) \frac{1 + \xi_k}{2},
//! $$
//! so the Jacobian has constant columns $(v_{k+1} - v_0) / 2$.
use crate::flops::log_flops;
use crate::Real;
use numeric_literals::replace_float_literals;

/// Edge vectors $v_{k+1} - v_0$, stored per reference axis.
fn edge_vectors<T: Real>(vertices: &[T], space_dim: usize, cell_dim: usize) -> [[T; 3]; 3] {
    let mut edges = [[T::zero(); 3]; 3];
    let origin = &vertices[..space_dim];
    for (k, edge) in edges.iter_mut().enumerate().take(cell_dim) {
        let v = &vertices[(k + 1) * space_dim..(k + 2) * space_dim];
        for i in 0..space_dim {
            edge[i] = v[i] - origin[i];
        }
    }
    edges
}

#[replace_float_literals(T::from_f64(literal).expect("literal must fit in T"))]
pub(super) fn map_reference_to_global<T: Real>(
    global_points: &mut [T],
    reference_points: &[T],
    vertices: &[T],
    space_dim: usize,
    cell_dim: usize,
    num_points: usize,
) {
    let origin = &vertices[..space_dim];
    let edges = edge_vectors(vertices, space_dim, cell_dim);

    for q in 0..num_points {
        let xi = &reference_points[q * cell_dim..(q + 1) * cell_dim];
        let x = &mut global_points[q * space_dim..(q + 1) * space_dim];
        x.copy_from_slice(origin);
        for (edge, &xi_k) in edges.iter().zip(xi) {
            let p = 0.5 * (1.0 + xi_k);
            for i in 0..space_dim {
                x[i] += edge[i] * p;
            }
        }
    }

    log_flops(
        "simplex map",
        space_dim * cell_dim + num_points * cell_dim * (2 + 2 * space_dim),
    );
}

#[replace_float_literals(T::from_f64(literal).expect("literal must fit in T"))]
pub(super) fn jacobian<T: Real>(jacobian: &mut [T], vertices: &[T], space_dim: usize, cell_dim: usize) {
    let edges = edge_vectors(vertices, space_dim, cell_dim);
    for i in 0..space_dim {
        for k in 0..cell_dim {
            jacobian[i * cell_dim + k] = edges[k][i] / 2.0;
        }
    }
    log_flops("simplex jacobian", 2 * space_dim * cell_dim);
}
