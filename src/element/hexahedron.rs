//! Trilinear map for hexahedra in 3-D.
//!
//! The map is expanded in the monomials of $p = (1 + \xi) / 2$:
//! $$
//! x(p) = v_0 + f_1 p_0 + f_2 p_1 + f_3 p_2 + f_4 p_0 p_1 + f_5 p_1 p_2 + f_6 p_0 p_2 + f_7 p_0 p_1 p_2.
//! $$
//! Vertices are ordered counter-clockwise on the bottom face $\xi_2 = -1$, followed by the top face
//! in the same order.
use crate::flops::log_flops;
use crate::Real;
use numeric_literals::replace_float_literals;

/// Rows: $v_0, f_1, \dots, f_7$.
fn coefficients<T: Real>(vertices: &[T]) -> [[T; 3]; 8] {
    let v = |corner: usize, i: usize| vertices[3 * corner + i];
    let mut f = [[T::zero(); 3]; 8];
    for i in 0..3 {
        f[0][i] = v(0, i);
        f[1][i] = v(1, i) - v(0, i);
        f[2][i] = v(3, i) - v(0, i);
        f[3][i] = v(4, i) - v(0, i);
        f[4][i] = v(2, i) - v(1, i) - v(3, i) + v(0, i);
        f[5][i] = v(7, i) - v(3, i) - v(4, i) + v(0, i);
        f[6][i] = v(5, i) - v(1, i) - v(4, i) + v(0, i);
        f[7][i] = v(6, i) - v(2, i) - v(5, i) - v(7, i) + v(1, i) + v(3, i) + v(4, i) - v(0, i);
    }
    f
}

#[replace_float_literals(T::from_f64(literal).expect("literal must fit in T"))]
pub(super) fn map_reference_to_global<T: Real>(
    global_points: &mut [T],
    reference_points: &[T],
    vertices: &[T],
    num_points: usize,
) {
    let f = coefficients(vertices);
    let points = global_points
        .chunks_exact_mut(3)
        .zip(reference_points.chunks_exact(3));
    for (x, xi) in points {
        let p0 = 0.5 * (1.0 + xi[0]);
        let p1 = 0.5 * (1.0 + xi[1]);
        let p2 = 0.5 * (1.0 + xi[2]);
        for i in 0..3 {
            x[i] = f[0][i]
                + f[1][i] * p0
                + f[2][i] * p1
                + f[3][i] * p2
                + f[4][i] * p0 * p1
                + f[5][i] * p1 * p2
                + f[6][i] * p0 * p2
                + f[7][i] * p0 * p1 * p2;
        }
    }

    log_flops("hexahedron map", 57 + num_points * 81);
}

#[replace_float_literals(T::from_f64(literal).expect("literal must fit in T"))]
pub(super) fn jacobian<T: Real>(jacobian: &mut [T], vertices: &[T], xi: &[T]) {
    let f = coefficients(vertices);
    let p0 = 0.5 * (1.0 + xi[0]);
    let p1 = 0.5 * (1.0 + xi[1]);
    let p2 = 0.5 * (1.0 + xi[2]);
    for i in 0..3 {
        jacobian[3 * i] = 0.5 * (f[1][i] + f[4][i] * p1 + f[6][i] * p2 + f[7][i] * p1 * p2);
        jacobian[3 * i + 1] = 0.5 * (f[2][i] + f[4][i] * p0 + f[5][i] * p2 + f[7][i] * p0 * p2);
        jacobian[3 * i + 2] = 0.5 * (f[3][i] + f[5][i] * p1 + f[6][i] * p0 + f[7][i] * p0 * p1);
    }

    log_flops("hexahedron jacobian", 57 + 6 + 3 * 27);
}
