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

use crate::linalg::{SMatrix, SVector};
use crate::utils::factorial;

/// Transition matrix of a D-th order kinematic polynomial (value, first derivative, ...) over `dt`.
///
/// Each component is propagated as the Taylor expansion of the higher order components, e.g. for
/// D = 3: p' = p + v dt + a dt^2 / 2, v' = v + a dt, a' = a.
pub fn kinematic_transition<const D: usize>(dt: f64) -> SMatrix<f64, D, D> {
    let mut f = SMatrix::<f64, D, D>::zeros();
    for i in 0..D {
        for j in i..D {
            let k = j - i;
            f[(i, j)] = dt.powi(k as i32) / factorial(k);
        }
    }
    f
}

/// Process noise of a D-th order kinematic polynomial driven by continuous white noise of the provided
/// spectral density on its highest order component.
///
/// This is the closed form of the Van Loan integral: Q[i][j] = q dt^(2D-1-i-j) / ((D-1-i)! (D-1-j)! (2D-1-i-j)).
pub fn continuous_white_noise<const D: usize>(dt: f64, spectral_density: f64) -> SMatrix<f64, D, D> {
    let mut q = SMatrix::<f64, D, D>::zeros();
    for i in 0..D {
        for j in 0..D {
            let power = 2 * D - 1 - i - j;
            q[(i, j)] = spectral_density * dt.powi(power as i32)
                / (factorial(D - 1 - i) * factorial(D - 1 - j) * power as f64);
        }
    }
    q
}

/// Process noise of a D-th order kinematic polynomial where a discrete white noise of the provided
/// variance is applied to the highest order component and held constant over `dt`.
///
/// This is g g^T variance, with g = [dt^D / D!, ..., dt^2 / 2, dt].
pub fn discrete_white_noise<const D: usize>(dt: f64, variance: f64) -> SMatrix<f64, D, D> {
    let g = discrete_noise_gain::<D>(dt);
    variance * g * g.transpose()
}

/// Returns g = [dt^D / D!, ..., dt], the effect of a unit constant highest order input held over dt.
pub fn discrete_noise_gain<const D: usize>(dt: f64) -> SVector<f64, D> {
    let mut g = SVector::<f64, D>::zeros();
    for i in 0..D {
        let power = D - i;
        g[i] = dt.powi(power as i32) / factorial(power);
    }
    g
}

#[cfg(test)]
mod ut_kinematic {
    use super::*;
    use crate::linalg::{Matrix1, Matrix2, Matrix3, Vector3};
    use approx::assert_abs_diff_eq;

    #[test]
    fn transition() {
        let dt = 0.3;
        let f = kinematic_transition::<3>(dt);
        let x = Vector3::new(1.0, 2.0, 3.0);
        let expected = Vector3::new(1.0 + 2.0 * dt + 3.0 * dt * dt / 2.0, 2.0 + 3.0 * dt, 3.0);
        assert_abs_diff_eq!(f * x, expected, epsilon = 1e-14);
        assert_eq!(kinematic_transition::<1>(dt), Matrix1::new(1.0));
    }

    #[test]
    fn continuous_closed_forms() {
        let (dt, q) = (2.0_f64, 0.5);
        assert_abs_diff_eq!(continuous_white_noise::<1>(dt, q), Matrix1::new(q * dt));
        #[rustfmt::skip]
        let expected2 = q * Matrix2::new(
            dt.powi(3) / 3.0, dt.powi(2) / 2.0,
            dt.powi(2) / 2.0, dt,
        );
        assert_abs_diff_eq!(continuous_white_noise::<2>(dt, q), expected2, epsilon = 1e-12);
        #[rustfmt::skip]
        let expected3 = q * Matrix3::new(
            dt.powi(5) / 20.0, dt.powi(4) / 8.0, dt.powi(3) / 6.0,
            dt.powi(4) / 8.0, dt.powi(3) / 3.0, dt.powi(2) / 2.0,
            dt.powi(3) / 6.0, dt.powi(2) / 2.0, dt,
        );
        assert_abs_diff_eq!(continuous_white_noise::<3>(dt, q), expected3, epsilon = 1e-12);
    }

    #[test]
    fn discrete_closed_forms() {
        let (dt, var) = (0.5_f64, 4.0);
        let g = Vector3::new(dt.powi(3) / 6.0, dt.powi(2) / 2.0, dt);
        assert_abs_diff_eq!(discrete_noise_gain::<3>(dt), g, epsilon = 1e-15);
        assert_abs_diff_eq!(
            discrete_white_noise::<3>(dt, var),
            var * g * g.transpose(),
            epsilon = 1e-15
        );
        assert_abs_diff_eq!(discrete_white_noise::<1>(dt, var), Matrix1::new(var * dt * dt));
    }
}
