//! Bilinear map for quadrilaterals in 2-D and 3-D.
//!
//! With $p = (1 + \xi) / 2$ and vertices ordered counter-clockwise from the reference corner
//! $(-1, -1)$, the map reads
//! $$
//! x(p) = v_0 + f_1 p_0 + f_2 p_1 + f_3 p_0 p_1,
//! $$
//! where $f_1 = v_1 - v_0$, $f_2 = v_3 - v_0$ and $f_3 = v_2 - v_3 - v_1 + v_0$.
use crate::flops::log_flops;
use crate::Real;
use numeric_literals::replace_float_literals;

struct Coefficients<T> {
    origin: [T; 3],
    f: [[T; 3]; 3],
}

fn coefficients<T: Real>(vertices: &[T], space_dim: usize) -> Coefficients<T> {
    let v = |corner: usize, i: usize| vertices[corner * space_dim + i];
    let mut origin = [T::zero(); 3];
    let mut f = [[T::zero(); 3]; 3];
    for i in 0..space_dim {
        origin[i] = v(0, i);
        f[0][i] = v(1, i) - v(0, i);
        f[1][i] = v(3, i) - v(0, i);
        f[2][i] = v(2, i) - v(3, i) - v(1, i) + v(0, i);
    }
    Coefficients { origin, f }
}

#[replace_float_literals(T::from_f64(literal).expect("literal must fit in T"))]
pub(super) fn map_reference_to_global<T: Real>(
    global_points: &mut [T],
    reference_points: &[T],
    vertices: &[T],
    space_dim: usize,
    num_points: usize,
) {
    let Coefficients { origin, f } = coefficients(vertices, space_dim);
    let points = global_points
        .chunks_exact_mut(space_dim)
        .zip(reference_points.chunks_exact(2));
    for (x, xi) in points {
        let p0 = 0.5 * (1.0 + xi[0]);
        let p1 = 0.5 * (1.0 + xi[1]);
        let p01 = p0 * p1;
        for i in 0..space_dim {
            x[i] = origin[i] + f[0][i] * p0 + f[1][i] * p1 + f[2][i] * p01;
        }
    }

    log_flops("quadrilateral map", 4 * space_dim + num_points * (5 + 6 * space_dim));
}

#[replace_float_literals(T::from_f64(literal).expect("literal must fit in T"))]
pub(super) fn jacobian<T: Real>(jacobian: &mut [T], vertices: &[T], xi: &[T], space_dim: usize) {
    let Coefficients { f, .. } = coefficients(vertices, space_dim);
    let p0 = 0.5 * (1.0 + xi[0]);
    let p1 = 0.5 * (1.0 + xi[1]);
    for i in 0..space_dim {
        jacobian[2 * i] = 0.5 * (f[0][i] + f[2][i] * p1);
        jacobian[2 * i + 1] = 0.5 * (f[1][i] + f[2][i] * p0);
    }

    log_flops("quadrilateral jacobian", 4 + 10 * space_dim);
}
