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

use crate::errors::{
    FilterError, InvalidDtSnafu, InvalidParameterSnafu, InvalidVarianceSnafu, NonFiniteSnafu,
    NonPositiveDefiniteSnafu,
};
use crate::linalg::{SMatrix, SVector};
use crate::utils::is_symmetric;
use snafu::ensure;

/// Relative tolerance on the symmetry of a covariance.
pub const SYMMETRY_TOLERANCE: f64 = 1e-6;

/// Checks that the time step is finite and non negative.
pub fn check_dt(dt: f64) -> Result<(), FilterError> {
    ensure!(dt.is_finite() && dt >= 0.0, InvalidDtSnafu { dt });
    Ok(())
}

/// Checks that a variance is finite and strictly positive.
pub fn check_variance(what: &'static str, value: f64) -> Result<(), FilterError> {
    ensure!(
        value.is_finite() && value > 0.0,
        InvalidVarianceSnafu { what, value }
    );
    Ok(())
}

/// Checks every component of a variance vector.
pub fn check_variances<const M: usize>(
    what: &'static str,
    values: &SVector<f64, M>,
) -> Result<(), FilterError> {
    for value in values.iter() {
        check_variance(what, *value)?;
    }
    Ok(())
}

/// Checks the fading memory factor, which must be at least one.
pub fn check_fading_memory(alpha: f64) -> Result<(), FilterError> {
    ensure!(
        alpha.is_finite() && alpha >= 1.0,
        InvalidParameterSnafu {
            param: "fading memory alpha",
            value: alpha
        }
    );
    Ok(())
}

/// Checks the Mahalanobis gate, which must be finite and positive if provided.
pub fn check_gate(gate: Option<f64>) -> Result<(), FilterError> {
    if let Some(gate) = gate {
        ensure!(
            gate.is_finite() && gate > 0.0,
            InvalidParameterSnafu {
                param: "gate",
                value: gate
            }
        );
    }
    Ok(())
}

/// Checks that the provided square matrix admits a Cholesky decomposition.
pub fn check_positive_definite<const N: usize>(
    action: &'static str,
    m: &SMatrix<f64, N, N>,
) -> Result<(), FilterError> {
    ensure!(
        m.iter().all(|v| v.is_finite()),
        NonFiniteSnafu { action }
    );
    ensure!(
        m.cholesky().is_some(),
        NonPositiveDefiniteSnafu { action }
    );
    Ok(())
}

/// Checks a state and its covariance after a reset, a prediction or an update.
///
/// The state must be finite; the covariance must be finite, symmetric, with a positive diagonal and
/// positive definite.
pub fn check_x_p<const N: usize>(
    action: &'static str,
    x: &SVector<f64, N>,
    p: &SMatrix<f64, N, N>,
) -> Result<(), FilterError> {
    ensure!(
        x.iter().chain(p.iter()).all(|v| v.is_finite()),
        NonFiniteSnafu { action }
    );
    ensure!(
        p.diagonal().iter().all(|v| *v > 0.0) && is_symmetric(p, SYMMETRY_TOLERANCE),
        NonPositiveDefiniteSnafu { action }
    );
    check_positive_definite(action, p)
}

#[cfg(test)]
mod ut_checks {
    use super::*;
    use crate::linalg::{Matrix2, Vector2};

    #[test]
    fn scalars() {
        assert!(check_dt(0.0).is_ok());
        assert_eq!(check_dt(-1.0), Err(FilterError::InvalidDt { dt: -1.0 }));
        assert!(check_dt(f64::NAN).is_err());
        assert!(check_variance("position", 1e-9).is_ok());
        assert!(check_variance("position", 0.0).is_err());
        assert!(check_variance("position", f64::INFINITY).is_err());
        assert!(check_fading_memory(1.0).is_ok());
        assert!(check_fading_memory(0.99).is_err());
        assert!(check_gate(None).is_ok());
        assert!(check_gate(Some(0.0)).is_err());
    }

    #[test]
    fn state_and_covariance() {
        let x = Vector2::new(1.0, 2.0);
        assert!(check_x_p("test", &x, &Matrix2::new(2.0, 0.5, 0.5, 1.0)).is_ok());
        assert_eq!(
            check_x_p("test", &x, &Matrix2::new(1.0, 2.0, 2.0, 1.0)),
            Err(FilterError::NonPositiveDefinite { action: "test" })
        );
        assert_eq!(
            check_x_p("test", &Vector2::new(f64::NAN, 0.0), &Matrix2::identity()),
            Err(FilterError::NonFinite { action: "test" })
        );
        assert!(check_x_p("test", &x, &Matrix2::new(1.0, 0.1, 0.2, 1.0)).is_err());
    }
}
