/*
    Kinematic filters, recursive estimation of planar motion
    Copyright (C) 2018-onwards Christopher Rabotin <christopher.rabotin@gmail.com>

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use crate::angle::Angle;
use crate::linalg::SVector;

/// Describes which components of a state vector are angles.
///
/// Angle components are combined through [`Angle`], so sums, differences and weighted means of states
/// keep those components in (-pi, pi] and never jump by a full turn across the seam.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StateSpace<const N: usize> {
    angles: &'static [usize],
}

impl<const N: usize> StateSpace<N> {
    /// A state space without any angle component.
    pub const fn euclidean() -> Self {
        Self { angles: &[] }
    }

    /// A state space where the provided indexes are angles. Indexes must be lower than N.
    pub const fn with_angles(angles: &'static [usize]) -> Self {
        Self { angles }
    }

    pub fn angles(&self) -> &'static [usize] {
        self.angles
    }

    /// Wraps the angle components of the provided state.
    pub fn normalize(&self, mut x: SVector<f64, N>) -> SVector<f64, N> {
        for &i in self.angles {
            x[i] = Angle::from_radians(x[i]).radians();
        }
        x
    }

    /// Returns a + b.
    pub fn add(&self, a: &SVector<f64, N>, b: &SVector<f64, N>) -> SVector<f64, N> {
        let mut sum = a + b;
        for &i in self.angles {
            sum[i] = (Angle::from_radians(a[i]) + Angle::from_radians(b[i])).radians();
        }
        sum
    }

    /// Returns a - b, i.e. the residual of a with respect to b.
    pub fn subtract(&self, a: &SVector<f64, N>, b: &SVector<f64, N>) -> SVector<f64, N> {
        let mut diff = a - b;
        for &i in self.angles {
            diff[i] = (Angle::from_radians(a[i]) - Angle::from_radians(b[i])).radians();
        }
        diff
    }

    /// Weighted mean of the provided points, with weights summing to one.
    ///
    /// The mean is accumulated as residuals with respect to the first point, which is the center of a
    /// sigma point set, so angle components are averaged on the correct side of the seam.
    pub fn mean(&self, points: &[SVector<f64, N>], weights: &[f64]) -> SVector<f64, N> {
        let Some(reference) = points.first() else {
            return SVector::zeros();
        };
        let mut delta = SVector::<f64, N>::zeros();
        for (point, w) in points.iter().zip(weights) {
            delta += *w * self.subtract(point, reference);
        }
        self.add(reference, &delta)
    }
}

#[cfg(test)]
mod ut_state_space {
    use super::*;
    use crate::linalg::Vector3;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    const SPACE: StateSpace<3> = StateSpace::with_angles(&[2]);

    #[test]
    fn add_subtract_wrap() {
        let a = Vector3::new(1.0, 2.0, PI - 0.1);
        let b = Vector3::new(0.5, -1.0, 0.3);
        let sum = SPACE.add(&a, &b);
        assert_abs_diff_eq!(sum, Vector3::new(1.5, 1.0, -PI + 0.2), epsilon = 1e-12);
        let back = SPACE.subtract(&sum, &a);
        assert_abs_diff_eq!(back, b, epsilon = 1e-12);
    }

    #[test]
    fn mean_across_seam() {
        let points = [
            Vector3::new(0.0, 0.0, PI - 0.05),
            Vector3::new(2.0, 0.0, -PI + 0.05),
            Vector3::new(-2.0, 0.0, PI - 0.15),
        ];
        let weights = [0.5, 0.25, 0.25];
        let mean = SPACE.mean(&points, &weights);
        assert_abs_diff_eq!(mean[0], 0.0, epsilon = 1e-12);
        // A naive mean would be close to zero degrees, the wrapped mean stays near pi
        assert_abs_diff_eq!(mean[2], PI - 0.05, epsilon = 1e-12);
        let plain = StateSpace::<3>::euclidean().mean(&points, &weights);
        assert!(plain[2].abs() < 2.0);
    }
}
