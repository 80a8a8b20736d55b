//! Lamé parameters and elastic constitutive laws.
//!
//! Constitutive laws operate on 3x3 deformation gradients. Problems in one and two space
//! dimensions embed their deformation gradient in the leading block of the identity, which
//! corresponds to uniaxial strain in 1-D and plane strain in 2-D.
use crustfe::nalgebra::{Matrix3, Vector3};
use crustfe::Real;
use numeric_literals::replace_float_literals;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::{Display, Formatter};

/// A material property that must be strictly positive but is not.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct NonPositiveProperty<T> {
    pub name: &'static str,
    pub value: T,
}

impl<T: Display> Display for NonPositiveProperty<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Found non-positive {} ({}).", self.name, self.value)
    }
}

impl<T: fmt::Debug + Display> std::error::Error for NonPositiveProperty<T> {}

/// Returns an error naming the property if `value` is not strictly positive.
pub fn check_positive<T: Real>(name: &'static str, value: T) -> Result<T, NonPositiveProperty<T>> {
    if value > T::zero() {
        Ok(value)
    } else {
        Err(NonPositiveProperty { name, value })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LameParameters<T> {
    pub mu: T,
    pub lambda: T,
}

impl<T: Real> LameParameters<T> {
    /// Lamé parameters of an isotropic material with the given density and wave speeds.
    ///
    /// The shear modulus is $\mu = \rho v_s^2$ and Lamé's constant is $\lambda = \rho v_p^2 - 2 \mu$.
    /// The density and both wave speeds must be strictly positive, and are checked in that order.
    #[replace_float_literals(T::from_f64(literal).expect("literal must fit in T"))]
    pub fn from_wave_speeds(density: T, vs: T, vp: T) -> Result<Self, NonPositiveProperty<T>> {
        let density = check_positive("density", density)?;
        let vs = check_positive("vs", vs)?;
        let vp = check_positive("vp", vp)?;
        let mu = density * vs * vs;
        debug_assert!(mu > 0.0);
        let lambda = density * vp * vp - 2.0 * mu;
        Ok(Self { mu, lambda })
    }

    /// The P-wave modulus $\lambda + 2 \mu$, the stiffness under uniaxial strain.
    #[replace_float_literals(T::from_f64(literal).expect("literal must fit in T"))]
    pub fn p_wave_modulus(&self) -> T {
        self.lambda + 2.0 * self.mu
    }

    /// Scales both parameters by `1 / scale`.
    pub fn nondimensionalize(&self, scale: T) -> Self {
        Self {
            mu: self.mu / scale,
            lambda: self.lambda / scale,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct YoungPoisson<T> {
    pub young: T,
    pub poisson: T,
}

impl<T: Real> From<YoungPoisson<T>> for LameParameters<T> {
    #[replace_float_literals(T::from_f64(literal).expect("literal must fit in T"))]
    fn from(params: YoungPoisson<T>) -> Self {
        let YoungPoisson { young, poisson } = params;
        let mu = 0.5 * young / (1.0 + poisson);
        let lambda = 2.0 * mu * poisson / (1.0 - 2.0 * poisson);
        Self { mu, lambda }
    }
}

impl<T: Real> From<LameParameters<T>> for YoungPoisson<T> {
    /// Young's modulus is the stiffness under uniaxial stress.
    #[replace_float_literals(T::from_f64(literal).expect("literal must fit in T"))]
    fn from(params: LameParameters<T>) -> Self {
        let LameParameters { mu, lambda } = params;
        let young = mu * (3.0 * lambda + 2.0 * mu) / (lambda + mu);
        let poisson = 0.5 * lambda / (lambda + mu);
        Self { young, poisson }
    }
}

/// An elastic material characterized by a strain energy density $\psi(\vec F)$.
pub trait HyperelasticMaterial<T: Real> {
    /// Compute the energy density $\psi = \psi(\vec F)$ associated with the material.
    fn compute_energy_density(&self, deformation_gradient: &Matrix3<T>, parameters: &LameParameters<T>) -> T;

    /// Compute the First Piola-Kirchhoff stress tensor $\vec P = \vec P(\vec F)$.
    fn compute_stress_tensor(&self, deformation_gradient: &Matrix3<T>, parameters: &LameParameters<T>)
        -> Matrix3<T>;

    /// Compute the stress contraction operator $\mathcal{C}_{\vec P}(\vec F, \vec a, \vec b)$.
    ///
    /// The contraction operator is defined by
    /// $$
    /// \mathcal{C}_{\vec P} (\vec F, \vec a, \vec b)
    ///     := a_k \frac{\partial P_{ik}}{\partial F_{jm}} (\vec F) \, b_m \enspace \vec e_i \otimes \vec e_j.
    /// $$
    fn compute_stress_contraction(
        &self,
        deformation_gradient: &Matrix3<T>,
        a: &Vector3<T>,
        b: &Vector3<T>,
        parameters: &LameParameters<T>,
    ) -> Matrix3<T>;
}

/// The linear elastic (small strain) material model.
///
/// Given Lamé parameters $\mu$ and $\lambda$, the strain energy density is
/// $$
/// \psi(\vec F) = \mu \vec \epsilon : \vec \epsilon + \frac{\lambda}{2} \operatorname{tr}^2(\vec \epsilon),
/// $$
/// where $\vec \epsilon = \frac{1}{2}(\vec F + \vec F^T) - \vec I$ is the infinitesimal strain tensor.
/// The stress is $2 \mu \vec \epsilon + \lambda \operatorname{tr}(\vec \epsilon) \vec I$ and the
/// contraction operator is
/// $$
/// \mathcal{C}_{\vec P}(\vec F, \vec a, \vec b) =
///     \mu \left[ (\vec a \cdot \vec b) \vec I + \vec b \vec a^T \right] + \lambda \vec a \vec b^T.
/// $$
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinearElasticMaterial;

fn infinitesimal_strain_tensor<T: Real>(deformation_gradient: &Matrix3<T>) -> Matrix3<T> {
    deformation_gradient.symmetric_part() - Matrix3::identity()
}

#[replace_float_literals(T::from_f64(literal).expect("literal must fit in T"))]
impl<T: Real> HyperelasticMaterial<T> for LinearElasticMaterial {
    fn compute_energy_density(&self, deformation_gradient: &Matrix3<T>, parameters: &LameParameters<T>) -> T {
        let &LameParameters { mu, lambda } = parameters;
        let eps = infinitesimal_strain_tensor(deformation_gradient);
        mu * eps.dot(&eps) + 0.5 * lambda * eps.trace().powi(2)
    }

    fn compute_stress_tensor(&self, deformation_gradient: &Matrix3<T>, parameters: &LameParameters<T>) -> Matrix3<T> {
        let &LameParameters { mu, lambda } = parameters;
        let eps = infinitesimal_strain_tensor(deformation_gradient);
        let eps_tr = eps.trace();
        eps * (2.0 * mu) + Matrix3::from_diagonal_element(lambda * eps_tr)
    }

    #[allow(non_snake_case)]
    fn compute_stress_contraction(
        &self,
        _deformation_gradient: &Matrix3<T>,
        a: &Vector3<T>,
        b: &Vector3<T>,
        parameters: &LameParameters<T>,
    ) -> Matrix3<T> {
        let &LameParameters { mu, lambda } = parameters;
        let I = Matrix3::<T>::identity();
        (I * a.dot(b) + b * a.transpose()) * mu + a * b.transpose() * lambda
    }
}

/// The Saint Venant-Kirchhoff material model.
///
/// This material model is characterized by the strain energy density
/// $$
/// \psi(\vec F) = \mu \vec E : \vec E + \frac{\lambda}{2} \operatorname{tr}^2(\vec E)
/// $$
/// where $\vec E = \frac{1}{2} \left( \vec F^T \vec F - \vec I \right)$ is the Green strain tensor.
/// The stress tensor is $\vec P(\vec F) = \vec F \vec S$ with the second Piola-Kirchhoff stress
/// $\vec S = 2 \mu \vec E + \lambda \operatorname{tr}(\vec E) \vec I$, and the contraction operator is
/// $$
/// \mathcal{C}_{\vec P}(\vec F, \vec a, \vec b) =
///     \left[ 2 \mu \vec a^T \vec E \vec b + \lambda \operatorname{tr}(\vec E) (\vec a \cdot \vec b) \right] \vec I
///     + \mu (\vec F \vec b) (\vec F \vec a)^T
///     + \lambda (\vec F \vec a) (\vec F \vec b)^T
///     + \mu (\vec a \cdot \vec b) \vec F \vec F^T.
/// $$
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StVKMaterial;

#[replace_float_literals(T::from_f64(literal).expect("literal must fit in T"))]
fn green_strain_tensor<T: Real>(deformation_gradient: &Matrix3<T>) -> Matrix3<T> {
    let f = deformation_gradient;
    (f.transpose() * f - Matrix3::identity()) * 0.5
}

#[allow(non_snake_case)]
#[replace_float_literals(T::from_f64(literal).expect("literal must fit in T"))]
impl<T: Real> HyperelasticMaterial<T> for StVKMaterial {
    fn compute_energy_density(&self, deformation_gradient: &Matrix3<T>, parameters: &LameParameters<T>) -> T {
        let &LameParameters { mu, lambda } = parameters;
        let E = green_strain_tensor(deformation_gradient);
        mu * E.dot(&E) + 0.5 * lambda * E.trace().powi(2)
    }

    fn compute_stress_tensor(&self, deformation_gradient: &Matrix3<T>, parameters: &LameParameters<T>) -> Matrix3<T> {
        let &LameParameters { mu, lambda } = parameters;
        let F = deformation_gradient;
        let E = green_strain_tensor(F);
        let S = E * (2.0 * mu) + Matrix3::from_diagonal_element(lambda * E.trace());
        F * S
    }

    fn compute_stress_contraction(
        &self,
        deformation_gradient: &Matrix3<T>,
        a: &Vector3<T>,
        b: &Vector3<T>,
        parameters: &LameParameters<T>,
    ) -> Matrix3<T> {
        let &LameParameters { mu, lambda } = parameters;
        let I = Matrix3::<T>::identity();
        let F = deformation_gradient;
        let E = green_strain_tensor(F);
        let a_dot_b = a.dot(b);

        let Fa = F * a;
        let Fb = F * b;
        let Eb = E * b;

        I * (2.0 * mu * a.dot(&Eb) + lambda * E.trace() * a_dot_b)
            + Fb * Fa.transpose() * mu
            + Fa * Fb.transpose() * lambda
            + F * F.transpose() * (mu * a_dot_b)
    }
}
