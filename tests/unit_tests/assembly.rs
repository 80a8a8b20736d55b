use crustfe::assembly::global::{
    Contributions, FailurePolicy, LocalContribution, NodalFields, ParallelCellAssembler,
};
use crustfe::assembly::local::{
    assemble_element_jacobian, assemble_element_residual, ElementFields, ElementKernel, QuadraturePoint,
};
use crustfe::assembly::CellQuadratureData;
use crustfe::element::{CellGeometry, CellShape};
use crustfe::mesh::{CellBlock, IndexBase};
use crustfe::quadrature::QuadratureTable;
use crustfe::Error;
use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use nalgebra::{dmatrix, DMatrix, DVector};

/// The scalar Laplace operator $-\nabla \cdot (k \nabla u)$ with conductivity $k$.
struct LaplaceKernel;

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(a, b)| a * b).sum()
}

impl ElementKernel<f64> for LaplaceKernel {
    type Parameters = f64;

    fn solution_dim(&self, _space_dim: usize) -> usize {
        1
    }

    fn accumulate_residual(
        &self,
        residual: &mut DVector<f64>,
        point: &QuadraturePoint<f64>,
        fields: &ElementFields<f64>,
        &conductivity: &f64,
    ) {
        let d = point.space_dim();
        let mut grad_u = [0.0; 3];
        for j in 0..point.num_basis() {
            for (k, &g) in point.basis_gradient(j).iter().enumerate() {
                grad_u[k] += fields.updated(j) * g;
            }
        }
        for i in 0..point.num_basis() {
            residual[i] -= point.weight * conductivity * dot(point.basis_gradient(i), &grad_u[..d]);
        }
    }

    fn accumulate_jacobian(
        &self,
        jacobian: &mut DMatrix<f64>,
        point: &QuadraturePoint<f64>,
        _fields: &ElementFields<f64>,
        &conductivity: &f64,
    ) {
        for i in 0..point.num_basis() {
            for j in 0..point.num_basis() {
                jacobian[(i, j)] +=
                    point.weight * conductivity * dot(point.basis_gradient(i), point.basis_gradient(j));
            }
        }
    }
}

/// The scalar mass operator with density $\rho$.
struct MassKernel;

impl ElementKernel<f64> for MassKernel {
    type Parameters = f64;

    fn solution_dim(&self, _space_dim: usize) -> usize {
        1
    }

    fn accumulate_residual(
        &self,
        residual: &mut DVector<f64>,
        point: &QuadraturePoint<f64>,
        fields: &ElementFields<f64>,
        &density: &f64,
    ) {
        let u = point.interpolate(fields.solution, 1, 0);
        for i in 0..point.num_basis() {
            residual[i] += point.weight * density * point.basis[i] * u;
        }
    }

    fn accumulate_jacobian(
        &self,
        jacobian: &mut DMatrix<f64>,
        point: &QuadraturePoint<f64>,
        _fields: &ElementFields<f64>,
        &density: &f64,
    ) {
        for i in 0..point.num_basis() {
            for j in 0..point.num_basis() {
                jacobian[(i, j)] += point.weight * density * point.basis[i] * point.basis[j];
            }
        }
    }
}

/// A kernel that needs the solution at the previous time step but contributes nothing.
struct TimeDependentKernel;

impl ElementKernel<f64> for TimeDependentKernel {
    type Parameters = ();

    fn solution_dim(&self, _space_dim: usize) -> usize {
        1
    }

    fn requires_previous_solution(&self) -> bool {
        true
    }

    fn accumulate_residual(&self, _: &mut DVector<f64>, _: &QuadraturePoint<f64>, _: &ElementFields<f64>, _: &()) {}

    fn accumulate_jacobian(&self, _: &mut DMatrix<f64>, _: &QuadraturePoint<f64>, _: &ElementFields<f64>, _: &()) {}
}

fn triangle_centroid_rule() -> QuadratureTable<f64> {
    let xi = -1.0 / 3.0;
    QuadratureTable::linear_lagrange(CellShape::Triangle, vec![xi, xi], vec![2.0]).unwrap()
}

fn quadrilateral_gauss_rule() -> QuadratureTable<f64> {
    let a = 1.0 / 3.0f64.sqrt();
    let points = vec![-a, -a, a, -a, a, a, -a, a];
    QuadratureTable::linear_lagrange(CellShape::Quadrilateral, points, vec![1.0; 4]).unwrap()
}

fn triangle_geometry() -> CellGeometry {
    CellGeometry::new(CellShape::Triangle, 2).unwrap()
}

#[test]
fn quadrature_data_of_triangle() {
    let vertices = [0.0, 0.0, 2.0, 0.0, 0.0, 2.0];
    let mut data = CellQuadratureData::default();
    data.populate(&triangle_geometry(), &vertices, &triangle_centroid_rule())
        .unwrap();

    assert_eq!(data.num_points(), 1);
    assert_matrix_eq!(
        DVector::from_row_slice(data.point(0)),
        DVector::from_row_slice(&[2.0 / 3.0, 2.0 / 3.0]),
        comp = float
    );
    // The weights integrate to the area of the cell
    assert_scalar_eq!(data.weights()[0], 2.0, comp = float);
    assert_scalar_eq!(data.determinants()[0], 1.0, comp = float);
    assert_matrix_eq!(
        DVector::from_row_slice(data.basis_gradients(0)),
        DVector::from_row_slice(&[-0.5, -0.5, 0.5, 0.0, 0.0, 0.5]),
        comp = float
    );
}

#[test]
fn quadrature_data_rejects_inverted_cell() {
    let vertices = [0.0, 0.0, 0.0, 2.0, 2.0, 0.0];
    let mut data = CellQuadratureData::default();
    let result = data.populate(&triangle_geometry(), &vertices, &triangle_centroid_rule());
    assert_eq!(
        result,
        Err(Error::DegenerateGeometry {
            cell: None,
            point: 0,
            determinant: -1.0
        })
    );
}

#[test]
fn quadrature_data_rejects_embedded_cells_and_mismatched_tables() {
    let mut data = CellQuadratureData::default();
    let embedded = CellGeometry::new(CellShape::Triangle, 3).unwrap();
    let vertices = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    assert_eq!(
        data.populate(&embedded, &vertices, &triangle_centroid_rule()),
        Err(Error::UnsupportedShape {
            shape: CellShape::Triangle,
            space_dim: 3,
            operation: "volume integration"
        })
    );

    let quad = CellGeometry::new(CellShape::Quadrilateral, 2).unwrap();
    let line_rule = QuadratureTable::linear_lagrange(CellShape::Line, vec![0.0], vec![2.0]).unwrap();
    assert_eq!(
        data.populate(&quad, &[0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0], &line_rule),
        Err(Error::dimension_mismatch("quadrature table dimension", 2, 1))
    );
}

#[test]
fn laplace_stiffness_of_reference_triangle() {
    let vertices = [0.0, 0.0, 1.0, 0.0, 0.0, 1.0];
    let table = triangle_centroid_rule();
    let mut data = CellQuadratureData::default();
    data.populate(&triangle_geometry(), &vertices, &table).unwrap();

    let u = [1.0, 2.0, 3.0];
    let du = [0.5, 0.0, -0.5];
    let fields = ElementFields::new(&u, &du);

    let mut jacobian = DMatrix::zeros(0, 0);
    assemble_element_jacobian(&mut jacobian, &LaplaceKernel, &data, &table, &fields, &[1.0]).unwrap();
    #[rustfmt::skip]
    let expected = dmatrix![ 1.0, -0.5, -0.5;
                            -0.5,  0.5,  0.0;
                            -0.5,  0.0,  0.5];
    assert_matrix_eq!(jacobian, expected, comp = abs, tol = 1e-14);

    // The operator is linear, so the residual is the negated stiffness applied to the updated field
    let mut residual = DVector::zeros(0);
    assemble_element_residual(&mut residual, &LaplaceKernel, &data, &table, &fields, &[1.0]).unwrap();
    let updated = DVector::from_row_slice(&[1.5, 2.0, 2.5]);
    assert_matrix_eq!(residual, -(&expected * updated), comp = abs, tol = 1e-14);
}

#[test]
fn mass_matrix_of_unit_square() {
    let geometry = CellGeometry::new(CellShape::Quadrilateral, 2).unwrap();
    let vertices = [0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0];
    let table = quadrilateral_gauss_rule();
    let mut data = CellQuadratureData::default();
    data.populate(&geometry, &vertices, &table).unwrap();

    let u = [1.0; 4];
    let du = [0.0; 4];
    let fields = ElementFields::new(&u, &du);
    let density = [3.0; 4];

    let mut jacobian = DMatrix::zeros(0, 0);
    assemble_element_jacobian(&mut jacobian, &MassKernel, &data, &table, &fields, &density).unwrap();
    assert_scalar_eq!(jacobian.sum(), 3.0, comp = abs, tol = 1e-14);
    assert_matrix_eq!(jacobian, jacobian.transpose(), comp = float);
    assert_scalar_eq!(jacobian[(0, 0)], 3.0 / 9.0, comp = abs, tol = 1e-14);

    let mut residual = DVector::zeros(0);
    assemble_element_residual(&mut residual, &MassKernel, &data, &table, &fields, &density).unwrap();
    assert_matrix_eq!(residual, DVector::from_element(4, 0.75), comp = abs, tol = 1e-14);
}

#[test]
fn outputs_are_overwritten() {
    let vertices = [0.0, 0.0, 1.0, 0.0, 0.0, 1.0];
    let table = triangle_centroid_rule();
    let mut data = CellQuadratureData::default();
    data.populate(&triangle_geometry(), &vertices, &table).unwrap();
    let u = [1.0, 2.0, 3.0];
    let fields = ElementFields::new(&u, &u);

    let mut first = DMatrix::repeat(5, 2, 42.0);
    assemble_element_jacobian(&mut first, &LaplaceKernel, &data, &table, &fields, &[1.0]).unwrap();
    let mut second = DMatrix::zeros(0, 0);
    assemble_element_jacobian(&mut second, &LaplaceKernel, &data, &table, &fields, &[1.0]).unwrap();
    assert_eq!(first, second);
}

#[test]
fn local_assembly_validates_inputs() {
    let vertices = [0.0, 0.0, 1.0, 0.0, 0.0, 1.0];
    let table = triangle_centroid_rule();
    let mut data = CellQuadratureData::default();
    data.populate(&triangle_geometry(), &vertices, &table).unwrap();
    let u = [0.0; 3];
    let mut residual = DVector::zeros(0);

    assert_eq!(
        assemble_element_residual(&mut residual, &LaplaceKernel, &data, &table, &ElementFields::new(&u, &u), &[]),
        Err(Error::dimension_mismatch("quadrature parameters", 1, 0))
    );
    assert_eq!(
        assemble_element_residual(
            &mut residual,
            &LaplaceKernel,
            &data,
            &table,
            &ElementFields::new(&u[..2], &u),
            &[1.0]
        ),
        Err(Error::dimension_mismatch("local solution", 3, 2))
    );
    assert_eq!(
        assemble_element_residual(
            &mut residual,
            &TimeDependentKernel,
            &data,
            &table,
            &ElementFields::new(&u, &u),
            &[()]
        ),
        Err(Error::dimension_mismatch("local previous solution", 3, 0))
    );
    assert!(assemble_element_residual(
        &mut residual,
        &TimeDependentKernel,
        &data,
        &table,
        &ElementFields::new(&u, &u).with_previous(&u),
        &[()]
    )
    .is_ok());
}

/// A strip of `num_squares` unit squares along the x-axis, each split into two triangles.
///
/// Bottom vertex `i` is at `(i, 0)` with index `2 * i`, top vertex `i` at `(i, 1)` with index
/// `2 * i + 1`.
fn triangle_strip(num_squares: usize) -> (Vec<f64>, Vec<usize>) {
    let coordinates = (0..=num_squares)
        .flat_map(|i| [i as f64, 0.0, i as f64, 1.0])
        .collect();
    let connectivity = (0..num_squares)
        .flat_map(|i| {
            let (b0, t0, b1, t1) = (2 * i, 2 * i + 1, 2 * i + 2, 2 * i + 3);
            [b0, b1, t1, b0, t1, t0]
        })
        .collect();
    (coordinates, connectivity)
}

fn strip_block(num_squares: usize, degenerate_cells: &[usize]) -> CellBlock<f64> {
    let (coordinates, mut connectivity) = triangle_strip(num_squares);
    for &cell in degenerate_cells {
        // Three collinear vertices along the bottom edge
        connectivity[3 * cell..3 * cell + 3].copy_from_slice(&[0, 2, 4]);
    }
    let num_cells = 2 * num_squares;
    CellBlock::from_arrays(triangle_geometry(), 3, coordinates, connectivity, vec![0; num_cells], IndexBase::Zero)
        .unwrap()
}

fn linear_field(block: &CellBlock<f64>) -> Vec<f64> {
    (0..block.num_vertices())
        .map(|v| 2.0 * block.vertex(v)[0] - block.vertex(v)[1])
        .collect()
}

#[test]
fn parallel_assembly_of_triangle_strip() {
    let block = strip_block(20, &[]);
    let u = linear_field(&block);
    let du = vec![0.0; u.len()];
    let fields = NodalFields {
        solution: &u,
        increment: &du,
        previous: None,
    };

    let assembler = ParallelCellAssembler::default();
    assert_eq!(assembler.policy(), FailurePolicy::Abort);
    let contributions = assembler
        .assemble(
            &block,
            &triangle_centroid_rule(),
            &LaplaceKernel,
            fields,
            |_, _| Ok(1.0),
            Contributions::ResidualAndJacobian,
        )
        .unwrap();

    assert_eq!(contributions.len(), 40);
    for (cell, contribution) in contributions.iter().enumerate() {
        assert_eq!(contribution.cell, cell);
        assert_eq!(contribution.nodes, block.cell_nodes(cell));

        let jacobian = contribution.jacobian.as_ref().unwrap();
        let residual = contribution.residual.as_ref().unwrap();
        let local_u = DVector::from_iterator(3, contribution.nodes.iter().map(|&v| u[v]));
        assert_matrix_eq!(residual.clone(), -(jacobian * local_u), comp = abs, tol = 1e-12);
        assert_matrix_eq!(jacobian * DVector::repeat(3, 1.0), DVector::zeros(3), comp = abs, tol = 1e-12);
    }

    // The lower right triangle of the first square
    #[rustfmt::skip]
    let expected = dmatrix![ 0.5, -0.5,  0.0;
                            -0.5,  1.0, -0.5;
                             0.0, -0.5,  0.5];
    assert_matrix_eq!(contributions[0].jacobian.clone().unwrap(), expected, comp = abs, tol = 1e-14);
}

#[test]
fn parallel_assembly_computes_only_requested_contributions() {
    let block = strip_block(2, &[]);
    let u = vec![0.0; block.num_vertices()];
    let fields = NodalFields {
        solution: &u,
        increment: &u,
        previous: None,
    };
    let assembler = ParallelCellAssembler::default();
    let table = triangle_centroid_rule();

    let residuals = assembler
        .assemble(&block, &table, &LaplaceKernel, fields, |_, _| Ok(1.0), Contributions::Residual)
        .unwrap();
    assert!(residuals
        .iter()
        .all(|c| c.residual.is_some() && c.jacobian.is_none()));

    let jacobians = assembler
        .assemble(&block, &table, &LaplaceKernel, fields, |_, _| Ok(1.0), Contributions::Jacobian)
        .unwrap();
    assert!(jacobians
        .iter()
        .all(|c| c.residual.is_none() && c.jacobian.is_some()));
}

#[test]
fn abort_policy_reports_lowest_failing_cell() {
    let block = strip_block(20, &[17, 5]);
    let u = vec![0.0; block.num_vertices()];
    let fields = NodalFields {
        solution: &u,
        increment: &u,
        previous: None,
    };

    let report = ParallelCellAssembler::with_policy(FailurePolicy::Abort)
        .assemble(
            &block,
            &triangle_centroid_rule(),
            &LaplaceKernel,
            fields,
            |_, _| Ok(1.0),
            Contributions::Jacobian,
        )
        .unwrap_err();
    let error = report.downcast_ref::<Error>().unwrap();
    assert!(matches!(error, Error::DegenerateGeometry { cell: Some(5), point: 0, .. }));
}

#[test]
fn skip_policy_leaves_out_failing_cells() {
    let block = strip_block(20, &[17, 5]);
    let u = vec![0.0; block.num_vertices()];
    let fields = NodalFields {
        solution: &u,
        increment: &u,
        previous: None,
    };

    let contributions: Vec<LocalContribution<f64>> = ParallelCellAssembler::with_policy(FailurePolicy::SkipWithWarning)
        .assemble(
            &block,
            &triangle_centroid_rule(),
            &LaplaceKernel,
            fields,
            |_, _| Ok(1.0),
            Contributions::Jacobian,
        )
        .unwrap();
    let cells: Vec<_> = contributions.iter().map(|c| c.cell).collect();
    let expected: Vec<_> = (0..40).filter(|&cell| cell != 5 && cell != 17).collect();
    assert_eq!(cells, expected);
}

#[test]
fn parameter_failures_carry_cell_index() {
    let block = strip_block(20, &[]);
    let u = vec![0.0; block.num_vertices()];
    let fields = NodalFields {
        solution: &u,
        increment: &u,
        previous: None,
    };

    // Cells whose quadrature point lies beyond x = 12 have no valid material
    let parameters = |_cell: usize, x: &[f64]| {
        if x[0] > 12.0 {
            Err(Error::InvalidMaterialValue {
                cell: None,
                field: "density".to_string(),
                value: -1.0,
                location: x.to_vec(),
                database: "test".to_string(),
            })
        } else {
            Ok(1.0)
        }
    };

    let report = ParallelCellAssembler::default()
        .assemble(
            &block,
            &triangle_centroid_rule(),
            &MassKernel,
            fields,
            parameters,
            Contributions::Residual,
        )
        .unwrap_err();
    let error = report.downcast_ref::<Error>().unwrap();
    assert_eq!(error.cell(), Some(24));
}

#[test]
fn cell_index_is_attached_to_errors_without_cell_field() {
    let block = strip_block(20, &[]);
    let u = vec![0.0; block.num_vertices()];
    let fields = NodalFields {
        solution: &u,
        increment: &u,
        previous: None,
    };

    // A material query returning the wrong number of values for cells beyond x = 12
    let parameters = |_cell: usize, x: &[f64]| {
        if x[0] > 12.0 {
            Err(Error::dimension_mismatch("query values", 2, 1))
        } else {
            Ok(1.0)
        }
    };

    let report = ParallelCellAssembler::default()
        .assemble(
            &block,
            &triangle_centroid_rule(),
            &MassKernel,
            fields,
            parameters,
            Contributions::Residual,
        )
        .unwrap_err();
    assert_eq!(report.to_string(), "Failed to compute local contributions of cell 24");
    let error = report.downcast_ref::<Error>().unwrap();
    assert_eq!(error, &Error::dimension_mismatch("query values", 2, 1));
    assert_eq!(error.cell(), None);
}

#[test]
fn parallel_assembly_validates_global_fields() {
    let block = strip_block(2, &[]);
    let u = vec![0.0; block.num_vertices()];
    let short = vec![0.0; block.num_vertices() - 1];
    let assembler = ParallelCellAssembler::default();
    let table = triangle_centroid_rule();

    let fields = NodalFields {
        solution: &u,
        increment: &short,
        previous: None,
    };
    let report = assembler
        .assemble(&block, &table, &LaplaceKernel, fields, |_, _| Ok(1.0), Contributions::Residual)
        .unwrap_err();
    assert_eq!(
        report.downcast_ref::<Error>(),
        Some(&Error::dimension_mismatch("global field", u.len(), short.len()))
    );

    let fields = NodalFields {
        solution: &u,
        increment: &u,
        previous: None,
    };
    let report = assembler
        .assemble(&block, &table, &TimeDependentKernel, fields, |_, _| Ok(()), Contributions::Residual)
        .unwrap_err();
    assert_eq!(report.to_string(), "Failed to compute local contributions of cell 0");
    assert!(matches!(
        report.downcast_ref::<Error>(),
        Some(Error::DimensionMismatch {
            what: "local previous solution",
            ..
        })
    ));
}

#[test]
fn failure_policy_serde_roundtrip() {
    let json = serde_json::to_string(&FailurePolicy::SkipWithWarning).unwrap();
    assert_eq!(json, "\"SkipWithWarning\"");
    let policy: FailurePolicy = serde_json::from_str(&json).unwrap();
    assert_eq!(policy, FailurePolicy::SkipWithWarning);
}
