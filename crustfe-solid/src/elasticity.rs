//! Element kernels for elasticity.
//!
//! The kernels implement [`ElementKernel`] for vector-valued displacement fields with one
//! component per space dimension. Residuals follow the convention
//! $$
//! \vec r = \vec f_{\text{ext}} - \vec f_{\text{int}},
//! $$
//! and the Jacobians are the (positive) tangent stiffness, or the mass matrix scaled by
//! $1 / \Delta t^2$ for explicit time stepping.
//!
//! Displacement gradients are embedded in 3x3 matrices, so 1-D problems are in uniaxial strain
//! and 2-D problems are in plane strain.
use crate::gravity::GravityField;
use crate::materials::{HyperelasticMaterial, LameParameters, LinearElasticMaterial, StVKMaterial};
use crate::query::ElasticProperties;
use crustfe::assembly::local::{ElementFields, ElementKernel, QuadraturePoint};
use crustfe::nalgebra::{DMatrix, DVector, Matrix3, Vector3};
use crustfe::{to_f64, Error, Real};
use numeric_literals::replace_float_literals;

/// Material parameters of an elasticity kernel at a quadrature point.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MaterialPoint<T: Real> {
    pub density: T,
    pub lame: LameParameters<T>,
    /// External body force per unit volume.
    pub body_force: Vector3<T>,
}

impl<T: Real> MaterialPoint<T> {
    pub fn new(density: T, lame: LameParameters<T>) -> Self {
        Self {
            density,
            lame,
            body_force: Vector3::zeros(),
        }
    }

    /// Sets the body force from a vector with one component per space dimension.
    ///
    /// # Panics
    ///
    /// Panics if `body_force` has more than three components.
    pub fn with_body_force(mut self, body_force: &[T]) -> Self {
        self.body_force.fill(T::zero());
        self.body_force.as_mut_slice()[..body_force.len()].copy_from_slice(body_force);
        self
    }
}

impl<T: Real> From<ElasticProperties<T>> for MaterialPoint<T> {
    fn from(properties: ElasticProperties<T>) -> Self {
        Self::new(properties.density, properties.lame)
    }
}

fn embed<T: Real>(v: &[T]) -> Vector3<T> {
    let mut embedded = Vector3::zeros();
    embedded.as_mut_slice()[..v.len()].copy_from_slice(v);
    embedded
}

/// Deformation gradient $\vec F = \vec I + \nabla \vec u$ of a node-major displacement field.
fn deformation_gradient<T: Real>(point: &QuadraturePoint<T>, displacement: impl Fn(usize) -> T) -> Matrix3<T> {
    let d = point.space_dim();
    let mut f = Matrix3::identity();
    for node in 0..point.num_basis() {
        let gradient = point.basis_gradient(node);
        for i in 0..d {
            let u_i = displacement(node * d + i);
            for k in 0..d {
                f[(i, k)] += u_i * gradient[k];
            }
        }
    }
    f
}

/// Adds $w \left( N_I \vec f - \vec P \nabla N_I \right)$ to every node block of the residual.
fn accumulate_force_residual<T: Real>(
    residual: &mut DVector<T>,
    point: &QuadraturePoint<T>,
    stress: &Matrix3<T>,
    force_density: &Vector3<T>,
) {
    let d = point.space_dim();
    for node in 0..point.num_basis() {
        let phi = point.basis[node];
        let p_grad = stress * embed(point.basis_gradient(node));
        for i in 0..d {
            residual[node * d + i] += point.weight * (phi * force_density[i] - p_grad[i]);
        }
    }
}

/// Adds the weighted stress contraction $w \, \mathcal{C}_{\vec P}(\vec F, \nabla N_I, \nabla N_J)$
/// to every block of the Jacobian.
fn accumulate_stiffness<T, M>(
    jacobian: &mut DMatrix<T>,
    point: &QuadraturePoint<T>,
    material: &M,
    deformation_gradient: &Matrix3<T>,
    lame: &LameParameters<T>,
) where
    T: Real,
    M: HyperelasticMaterial<T>,
{
    let d = point.space_dim();
    let n = point.num_basis();
    for a in 0..n {
        let grad_a = embed(point.basis_gradient(a));
        for b in 0..n {
            let grad_b = embed(point.basis_gradient(b));
            let contraction = material.compute_stress_contraction(deformation_gradient, &grad_a, &grad_b, lame);
            for i in 0..d {
                for j in 0..d {
                    jacobian[(a * d + i, b * d + j)] += point.weight * contraction[(i, j)];
                }
            }
        }
    }
}

/// Quasi-static elasticity integrated implicitly in time.
///
/// The residual and Jacobian are evaluated at the displacement $\vec u_t + \Delta \vec u$:
/// <div>$$
/// \vec r_I = \int_\Omega N_I (\vec f + \rho \vec g) - \vec P(\vec F) \nabla N_I \, \mathrm{d}\vec X,
/// \qquad
/// \vec K_{IJ} = \int_\Omega \mathcal{C}_{\vec P}(\vec F, \nabla N_I, \nabla N_J) \, \mathrm{d}\vec X.
/// $$</div>
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct QuasistaticElasticity<T: Real, M> {
    material: M,
    gravity: Option<GravityField<T>>,
}

/// Small strain, linear isotropic elasticity.
pub type ImplicitElasticity<T> = QuasistaticElasticity<T, LinearElasticMaterial>;

/// Total Lagrangian large deformation elasticity with the Saint Venant-Kirchhoff material.
pub type ImplicitLargeDeformationElasticity<T> = QuasistaticElasticity<T, StVKMaterial>;

impl<T: Real, M> QuasistaticElasticity<T, M> {
    pub fn from_material(material: M) -> Self {
        Self { material, gravity: None }
    }

    pub fn with_gravity(self, gravity: GravityField<T>) -> Self {
        Self {
            gravity: Some(gravity),
            ..self
        }
    }

    pub fn material(&self) -> &M {
        &self.material
    }
}

impl<T: Real> ImplicitElasticity<T> {
    pub fn new() -> Self {
        Self::from_material(LinearElasticMaterial)
    }
}

impl<T: Real> ImplicitLargeDeformationElasticity<T> {
    pub fn new() -> Self {
        Self::from_material(StVKMaterial)
    }
}

fn force_density<T: Real>(gravity: &Option<GravityField<T>>, parameters: &MaterialPoint<T>) -> Vector3<T> {
    match gravity {
        Some(gravity) => parameters.body_force + gravity.force_density(parameters.density),
        None => parameters.body_force,
    }
}

impl<T, M> ElementKernel<T> for QuasistaticElasticity<T, M>
where
    T: Real,
    M: HyperelasticMaterial<T>,
{
    type Parameters = MaterialPoint<T>;

    fn solution_dim(&self, space_dim: usize) -> usize {
        space_dim
    }

    fn accumulate_residual(
        &self,
        residual: &mut DVector<T>,
        point: &QuadraturePoint<T>,
        fields: &ElementFields<T>,
        parameters: &Self::Parameters,
    ) {
        let f = deformation_gradient(point, |dof| fields.updated(dof));
        let stress = self.material.compute_stress_tensor(&f, &parameters.lame);
        accumulate_force_residual(residual, point, &stress, &force_density(&self.gravity, parameters));
    }

    fn accumulate_jacobian(
        &self,
        jacobian: &mut DMatrix<T>,
        point: &QuadraturePoint<T>,
        fields: &ElementFields<T>,
        parameters: &Self::Parameters,
    ) {
        let f = deformation_gradient(point, |dof| fields.updated(dof));
        accumulate_stiffness(jacobian, point, &self.material, &f, &parameters.lame);
    }
}

/// Dynamic elasticity integrated explicitly with central differences.
///
/// With the acceleration $\vec a = (\vec u_{t + \Delta t} - 2 \vec u_t + \vec u_{t - \Delta t}) / \Delta t^2$
/// and $\vec u_{t + \Delta t} = \vec u_t + \Delta \vec u$,
/// <div>$$
/// \vec r_I = \int_\Omega N_I (\vec f + \rho \vec g) - \vec P(\vec F_t) \nabla N_I
///     - \rho N_I \sum_J N_J \vec a_J \, \mathrm{d}\vec X,
/// \qquad
/// \vec K_{IJ} = \frac{1}{\Delta t^2} \int_\Omega \rho N_I N_J \, \mathrm{d}\vec X \, \vec I.
/// $$</div>
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ExplicitElasticity<T: Real, M = LinearElasticMaterial> {
    material: M,
    time_step: T,
    gravity: Option<GravityField<T>>,
}

impl<T: Real, M> ExplicitElasticity<T, M> {
    /// Fails with [`Error::InvalidScale`] if the time step is not strictly positive and finite.
    pub fn from_material(material: M, time_step: T) -> Result<Self, Error> {
        if !(time_step > T::zero() && time_step.is_finite()) {
            return Err(Error::InvalidScale {
                name: "time_step",
                value: to_f64(time_step),
            });
        }
        Ok(Self {
            material,
            time_step,
            gravity: None,
        })
    }

    pub fn with_gravity(self, gravity: GravityField<T>) -> Self {
        Self {
            gravity: Some(gravity),
            ..self
        }
    }

    pub fn time_step(&self) -> T {
        self.time_step
    }
}

impl<T: Real> ExplicitElasticity<T> {
    pub fn new(time_step: T) -> Result<Self, Error> {
        Self::from_material(LinearElasticMaterial, time_step)
    }
}

impl<T, M> ElementKernel<T> for ExplicitElasticity<T, M>
where
    T: Real,
    M: HyperelasticMaterial<T>,
{
    type Parameters = MaterialPoint<T>;

    fn solution_dim(&self, space_dim: usize) -> usize {
        space_dim
    }

    fn requires_previous_solution(&self) -> bool {
        true
    }

    #[replace_float_literals(T::from_f64(literal).expect("literal must fit in T"))]
    fn accumulate_residual(
        &self,
        residual: &mut DVector<T>,
        point: &QuadraturePoint<T>,
        fields: &ElementFields<T>,
        parameters: &Self::Parameters,
    ) {
        let d = point.space_dim();
        let f = deformation_gradient(point, |dof| fields.solution[dof]);
        let stress = self.material.compute_stress_tensor(&f, &parameters.lame);
        accumulate_force_residual(residual, point, &stress, &force_density(&self.gravity, parameters));

        // The previous solution is checked to be present before any kernel runs
        let previous = fields.previous.unwrap_or(fields.solution);
        let dt2 = self.time_step * self.time_step;
        let mut acceleration = Vector3::zeros();
        for i in 0..d {
            let component = |dof: usize| (fields.updated(dof) - 2.0 * fields.solution[dof] + previous[dof]) / dt2;
            acceleration[i] = (0..point.num_basis())
                .fold(0.0, |acc, node| acc + point.basis[node] * component(node * d + i));
        }

        for node in 0..point.num_basis() {
            let scale = point.weight * parameters.density * point.basis[node];
            for i in 0..d {
                residual[node * d + i] -= scale * acceleration[i];
            }
        }
    }

    fn accumulate_jacobian(
        &self,
        jacobian: &mut DMatrix<T>,
        point: &QuadraturePoint<T>,
        _fields: &ElementFields<T>,
        parameters: &Self::Parameters,
    ) {
        let d = point.space_dim();
        let n = point.num_basis();
        let scale = point.weight * parameters.density / (self.time_step * self.time_step);
        for a in 0..n {
            for b in 0..n {
                let m_ab = scale * point.basis[a] * point.basis[b];
                for i in 0..d {
                    jacobian[(a * d + i, b * d + i)] += m_ab;
                }
            }
        }
    }
}
