//! Reference cells and their linear Lagrange basis functions.
use super::CellShape;
use crate::Real;
use numeric_literals::replace_float_literals;

const POINT_VERTICES: [f64; 0] = [];

const LINE_VERTICES: [f64; 2] = [-1.0, 1.0];

#[rustfmt::skip]
const TRIANGLE_VERTICES: [f64; 6] = [
    -1.0, -1.0,
     1.0, -1.0,
    -1.0,  1.0,
];

#[rustfmt::skip]
const QUADRILATERAL_VERTICES: [f64; 8] = [
    -1.0, -1.0,
     1.0, -1.0,
     1.0,  1.0,
    -1.0,  1.0,
];

#[rustfmt::skip]
const TETRAHEDRON_VERTICES: [f64; 12] = [
    -1.0, -1.0, -1.0,
     1.0, -1.0, -1.0,
    -1.0,  1.0, -1.0,
    -1.0, -1.0,  1.0,
];

#[rustfmt::skip]
const HEXAHEDRON_VERTICES: [f64; 24] = [
    -1.0, -1.0, -1.0,
     1.0, -1.0, -1.0,
     1.0,  1.0, -1.0,
    -1.0,  1.0, -1.0,
    -1.0, -1.0,  1.0,
     1.0, -1.0,  1.0,
     1.0,  1.0,  1.0,
    -1.0,  1.0,  1.0,
];

pub(super) fn vertices(shape: CellShape) -> &'static [f64] {
    match shape {
        CellShape::Point => &POINT_VERTICES,
        CellShape::Line => &LINE_VERTICES,
        CellShape::Triangle => &TRIANGLE_VERTICES,
        CellShape::Quadrilateral => &QUADRILATERAL_VERTICES,
        CellShape::Tetrahedron => &TETRAHEDRON_VERTICES,
        CellShape::Hexahedron => &HEXAHEDRON_VERTICES,
    }
}

/// Sign of reference vertex `corner` along axis `axis` for tensor-product shapes.
fn corner_sign<T: Real>(shape: CellShape, corner: usize, axis: usize) -> T {
    let c = shape.cell_dim();
    T::from_f64(vertices(shape)[corner * c + axis]).expect("literal must fit in T")
}

#[replace_float_literals(T::from_f64(literal).expect("literal must fit in T"))]
pub(super) fn populate_basis<T: Real>(shape: CellShape, basis: &mut [T], xi: &[T]) {
    match shape {
        CellShape::Point => basis[0] = 1.0,
        // The simplex basis is N_0 = 1 - sum_k p_k, N_{k+1} = p_k with p_k = (1 + xi_k) / 2
        CellShape::Line | CellShape::Triangle | CellShape::Tetrahedron => {
            basis[0] = 1.0;
            for (k, &xi_k) in xi.iter().enumerate() {
                let p = 0.5 * (1.0 + xi_k);
                basis[k + 1] = p;
                basis[0] -= p;
            }
        }
        CellShape::Quadrilateral | CellShape::Hexahedron => {
            let c = shape.cell_dim();
            let scale = 1.0 / T::from_usize(1 << c).expect("literal must fit in T");
            for (b, phi) in basis.iter_mut().enumerate() {
                *phi = (0..c).fold(scale, |acc, k| acc * (1.0 + corner_sign::<T>(shape, b, k) * xi[k]));
            }
        }
    }
}

#[replace_float_literals(T::from_f64(literal).expect("literal must fit in T"))]
pub(super) fn populate_basis_gradients<T: Real>(shape: CellShape, gradients: &mut [T], xi: &[T]) {
    let c = shape.cell_dim();
    match shape {
        CellShape::Point => {}
        CellShape::Line | CellShape::Triangle | CellShape::Tetrahedron => {
            gradients.fill(0.0);
            for k in 0..c {
                gradients[k] = -0.5;
                gradients[(k + 1) * c + k] = 0.5;
            }
        }
        CellShape::Quadrilateral | CellShape::Hexahedron => {
            let scale = 1.0 / T::from_usize(1 << c).expect("literal must fit in T");
            for (b, gradient) in gradients.chunks_exact_mut(c).enumerate() {
                for (k, dphi) in gradient.iter_mut().enumerate() {
                    *dphi = (0..c).fold(scale, |acc, m| {
                        let sign = corner_sign::<T>(shape, b, m);
                        if m == k {
                            acc * sign
                        } else {
                            acc * (1.0 + sign * xi[m])
                        }
                    });
                }
            }
        }
    }
}
