use crustfe::nalgebra::Vector3;
use crustfe::{Error, Real};
use serde::{Deserialize, Serialize};

/// A uniform gravitational field.
///
/// The field contributes the force density
/// <div>$$
/// \rho \vec g,
/// $$</div>
/// where $\rho$ is the density and $\vec g$ the gravitational acceleration, corresponding to the
/// weak form term
/// <div>$$
///  \int_\Omega \rho \vec g \cdot \vec w \, \mathrm{d}\vec X
/// $$</div>
/// for a test function $\vec w$.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GravityField<T: Real> {
    acceleration: Vector3<T>,
}

impl<T: Real> GravityField<T> {
    /// Creates the field from an acceleration vector with one component per space dimension.
    pub fn from_acceleration(acceleration: &[T]) -> Result<Self, Error> {
        if acceleration.is_empty() || acceleration.len() > 3 {
            return Err(Error::dimension_mismatch("gravitational acceleration", 3, acceleration.len()));
        }
        let mut padded = Vector3::zeros();
        padded.as_mut_slice()[..acceleration.len()].copy_from_slice(acceleration);
        Ok(Self { acceleration: padded })
    }

    pub fn acceleration(&self) -> &Vector3<T> {
        &self.acceleration
    }

    pub fn force_density(&self, density: T) -> Vector3<T> {
        self.acceleration * density
    }
}
