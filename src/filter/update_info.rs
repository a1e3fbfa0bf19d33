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

use crate::errors::{FilterError, SingularInnovationSnafu};
use crate::linalg::{SMatrix, SVector};
use snafu::{ensure, OptionExt};
use std::f64::consts::TAU;
use std::fmt;

/// Result of a single measurement update.
///
/// When the update is gated, the filter state was left untouched and the innovation covariance is not
/// reported.
#[derive(Clone, Debug, PartialEq)]
pub struct UpdateInfo<const M: usize> {
    /// Measurement minus predicted measurement
    pub residual: SVector<f64, M>,
    /// Innovation covariance, None if gated
    pub s: Option<SMatrix<f64, M, M>>,
    /// Whether this update was rejected by the gate
    pub gated: bool,
    /// r^T S^-1 r, if requested or if a gate was provided
    pub normalized_innovation_squared: Option<f64>,
    /// Gaussian log-likelihood of the residual under S, if requested
    pub log_likelihood: Option<f64>,
}

impl<const M: usize> UpdateInfo<M> {
    /// Number of degrees of freedom of the normalized innovation squared
    pub const DOF: usize = M;

    pub fn accepted(&self) -> bool {
        !self.gated
    }
}

/// Builds the update information from the residual and the innovation covariance.
///
/// The gate is a Mahalanobis distance: the update is rejected if and only if r^T S^-1 r > gate^2, so a
/// residual exactly on the gate is accepted.
pub fn make_update_info<const M: usize>(
    residual: &SVector<f64, M>,
    s: &SMatrix<f64, M, M>,
    s_inv: &SMatrix<f64, M, M>,
    gate: Option<f64>,
    normalized_innovation: bool,
    likelihood: bool,
) -> Result<UpdateInfo<M>, FilterError> {
    let d2 = if gate.is_some() || normalized_innovation || likelihood {
        Some((residual.transpose() * s_inv * residual)[(0, 0)])
    } else {
        None
    };

    let gated = match (gate, d2) {
        (Some(gate), Some(d2)) => d2 > gate * gate,
        _ => false,
    };

    if gated {
        return Ok(UpdateInfo {
            residual: *residual,
            s: None,
            gated: true,
            normalized_innovation_squared: d2,
            log_likelihood: None,
        });
    }

    let log_likelihood = match (likelihood, d2) {
        (true, Some(d2)) => {
            // ln det(2 pi S) from the Cholesky factor, S must be positive definite
            let chol = (TAU * s).cholesky().context(SingularInnovationSnafu {
                action: "log-likelihood",
            })?;
            let ln_det = 2.0 * chol.l().diagonal().iter().map(|v| v.ln()).sum::<f64>();
            ensure!(
                ln_det.is_finite(),
                SingularInnovationSnafu {
                    action: "log-likelihood"
                }
            );
            Some(-0.5 * (d2 + ln_det))
        }
        _ => None,
    };

    Ok(UpdateInfo {
        residual: *residual,
        s: Some(*s),
        gated: false,
        normalized_innovation_squared: if normalized_innovation || gate.is_some() {
            d2
        } else {
            None
        },
        log_likelihood,
    })
}

impl<const M: usize> fmt::Display for UpdateInfo<M> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let status = if self.gated { "gated" } else { "accepted" };
        write!(f, "{status} update, residual = {}", self.residual.transpose())?;
        if let Some(nis) = self.normalized_innovation_squared {
            write!(f, " NIS = {nis:.3}")?;
        }
        if let Some(ll) = self.log_likelihood {
            write!(f, " log-likelihood = {ll:.3}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod ut_update_info {
    use super::*;
    use crate::linalg::{Matrix1, Matrix2, Vector1, Vector2};
    use approx::assert_abs_diff_eq;

    #[test]
    fn gate_boundary() {
        // S = 4, so d = |r| / 2
        let s = Matrix1::new(4.0);
        let s_inv = Matrix1::new(0.25);

        let below = make_update_info(&Vector1::new(5.999), &s, &s_inv, Some(3.0), false, false)
            .unwrap();
        assert!(!below.gated);
        assert!(below.s.is_some());

        let above = make_update_info(&Vector1::new(6.001), &s, &s_inv, Some(3.0), false, false)
            .unwrap();
        assert!(above.gated);
        assert!(above.s.is_none());
        assert_abs_diff_eq!(
            above.normalized_innovation_squared.unwrap(),
            6.001f64.powi(2) / 4.0
        );

        let on = make_update_info(&Vector1::new(6.0), &s, &s_inv, Some(3.0), false, false)
            .unwrap();
        assert!(!on.gated, "a residual exactly on the gate is accepted");
    }

    #[test]
    fn nis_and_likelihood() {
        let s = Matrix2::new(2.0, 0.0, 0.0, 0.5);
        let s_inv = s.try_inverse().unwrap();
        let r = Vector2::new(1.0, 1.0);
        let info = make_update_info(&r, &s, &s_inv, None, true, true).unwrap();
        assert_abs_diff_eq!(info.normalized_innovation_squared.unwrap(), 2.5, epsilon = 1e-12);
        // det(2 pi S) = (2 pi)^2 * 1
        let expected = -0.5 * (2.5 + (TAU * TAU).ln());
        assert_abs_diff_eq!(info.log_likelihood.unwrap(), expected, epsilon = 1e-12);

        let plain = make_update_info(&r, &s, &s_inv, None, false, false).unwrap();
        assert!(plain.normalized_innovation_squared.is_none());
        assert!(plain.log_likelihood.is_none());
    }

    #[test]
    fn singular_likelihood() {
        let s = Matrix1::new(0.0);
        let s_inv = Matrix1::new(1.0);
        assert_eq!(
            make_update_info(&Vector1::new(1.0), &s, &s_inv, None, false, true),
            Err(FilterError::SingularInnovation {
                action: "log-likelihood"
            })
        );
    }
}
