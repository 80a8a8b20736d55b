use crustfe::{to_f64, Error, Real};
use serde::{Deserialize, Serialize};

/// Characteristic scales used for non-dimensionalization.
///
/// Locations handed to material queries are non-dimensional and are multiplied by
/// `length_scale` before they reach a spatial database. Resolved material values are divided by
/// `value_scale`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scales<T> {
    pub length_scale: T,
    pub value_scale: T,
}

impl<T: Real> Scales<T> {
    pub fn new(length_scale: T, value_scale: T) -> Result<Self, Error> {
        let scales = Self {
            length_scale,
            value_scale,
        };
        scales.validate()?;
        Ok(scales)
    }

    /// Unit scales, i.e. no scaling at all.
    pub fn unit() -> Self {
        Self {
            length_scale: T::one(),
            value_scale: T::one(),
        }
    }

    /// Checks that both scales are strictly positive and finite.
    pub fn validate(&self) -> Result<(), Error> {
        check_scale("length_scale", self.length_scale)?;
        check_scale("value_scale", self.value_scale)
    }

    pub fn dimensionalize_length(&self, value: T) -> T {
        value * self.length_scale
    }

    pub fn nondimensionalize_value(&self, value: T) -> T {
        value / self.value_scale
    }
}

impl<T: Real> Default for Scales<T> {
    fn default() -> Self {
        Self::unit()
    }
}

fn check_scale<T: Real>(name: &'static str, value: T) -> Result<(), Error> {
    if value > T::zero() && value.is_finite() {
        Ok(())
    } else {
        Err(Error::InvalidScale {
            name,
            value: to_f64(value),
        })
    }
}
