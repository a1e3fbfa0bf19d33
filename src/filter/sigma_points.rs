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

use super::StateSpace;
use crate::errors::{FilterError, InvalidParameterSnafu, NonPositiveDefiniteSnafu};
use crate::linalg::{SMatrix, SVector};
use snafu::{ensure, OptionExt};
use std::fmt;

/// Scaled sigma points (Van der Merwe) for a state of dimension N.
///
/// The 2N+1 points are the mean, and the mean plus and minus each column of the lower Cholesky factor
/// of (N + lambda) P, where lambda = alpha^2 (N + kappa) - N. The weights are such that the weighted
/// mean and covariance of the points are exactly the input mean and covariance.
#[derive(Clone, Debug, PartialEq)]
pub struct SigmaPoints<const N: usize> {
    alpha: f64,
    beta: f64,
    kappa: f64,
    lambda: f64,
    wm: Vec<f64>,
    wc: Vec<f64>,
}

impl<const N: usize> SigmaPoints<N> {
    /// Default sigma points with beta = 2 (optimal for Gaussian distributions) and kappa = 3 - N.
    pub fn new(alpha: f64) -> Result<Self, FilterError> {
        Self::with_parameters(alpha, 2.0, 3.0 - N as f64)
    }

    pub fn with_parameters(alpha: f64, beta: f64, kappa: f64) -> Result<Self, FilterError> {
        ensure!(
            N > 0 && alpha.is_finite() && alpha > 0.0,
            InvalidParameterSnafu {
                param: "sigma points alpha",
                value: alpha
            }
        );

        let n = N as f64;
        let lambda = alpha.powi(2) * (n + kappa) - n;
        ensure!(
            lambda.is_finite() && n + lambda > 0.0,
            InvalidParameterSnafu {
                param: "sigma points scaling (N + lambda)",
                value: n + lambda
            }
        );

        let count = 2 * N + 1;
        let w = 1.0 / (2.0 * (n + lambda));
        let mut wm = vec![w; count];
        let mut wc = vec![w; count];
        wm[0] = lambda / (n + lambda);
        wc[0] = wm[0] + (1.0 - alpha.powi(2) + beta);

        Ok(Self {
            alpha,
            beta,
            kappa,
            lambda,
            wm,
            wc,
        })
    }

    /// Number of points, always 2N+1.
    pub fn count(&self) -> usize {
        2 * N + 1
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Mean weights.
    pub fn wm(&self) -> &[f64] {
        &self.wm
    }

    /// Covariance weights.
    pub fn wc(&self) -> &[f64] {
        &self.wc
    }

    /// Generates the sigma points of the provided mean and covariance.
    pub fn points(
        &self,
        x: &SVector<f64, N>,
        p: &SMatrix<f64, N, N>,
        space: &StateSpace<N>,
    ) -> Result<Vec<SVector<f64, N>>, FilterError> {
        let scaled = (N as f64 + self.lambda) * p;
        let l = scaled.cholesky().context(NonPositiveDefiniteSnafu {
            action: "sigma points scaling",
        })?;
        let l = l.l();

        let mut points = Vec::with_capacity(self.count());
        points.push(*x);
        for i in 0..N {
            let column: SVector<f64, N> = l.column(i).into_owned();
            points.push(space.add(x, &column));
        }
        for i in 0..N {
            let column: SVector<f64, N> = l.column(i).into_owned();
            points.push(space.add(x, &-column));
        }
        Ok(points)
    }
}

impl<const N: usize> fmt::Display for SigmaPoints<N> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} sigma points (alpha = {}, beta = {}, kappa = {})",
            self.count(),
            self.alpha,
            self.beta,
            self.kappa
        )
    }
}

#[cfg(test)]
mod ut_sigma_points {
    use super::*;
    use crate::linalg::{Matrix4, Vector4};
    use approx::assert_abs_diff_eq;

    fn reconstruct<const N: usize>(
        sp: &SigmaPoints<N>,
        points: &[SVector<f64, N>],
    ) -> (SVector<f64, N>, SMatrix<f64, N, N>) {
        let mut x = SVector::<f64, N>::zeros();
        for (p, w) in points.iter().zip(sp.wm()) {
            x += *w * p;
        }
        let mut cov = SMatrix::<f64, N, N>::zeros();
        for (p, w) in points.iter().zip(sp.wc()) {
            let d = p - x;
            cov += *w * d * d.transpose();
        }
        (x, cov)
    }

    #[test]
    fn weights() {
        for alpha in [0.1, 0.5, 1.0] {
            let sp = SigmaPoints::<4>::new(alpha).unwrap();
            assert_eq!(sp.count(), 9);
            assert_abs_diff_eq!(sp.wm().iter().sum::<f64>(), 1.0, epsilon = 1e-9);
            // The covariance weights sum to 1 + (1 - alpha^2 + beta)
            assert_abs_diff_eq!(
                sp.wc().iter().sum::<f64>(),
                1.0 + (1.0 - alpha * alpha + 2.0),
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn identity_reconstruction() {
        let x = Vector4::new(1.0, -2.0, 3.0, 0.5);
        #[rustfmt::skip]
        let p = Matrix4::new(
            4.0, 0.5, 0.1, 0.0,
            0.5, 2.0, 0.0, 0.2,
            0.1, 0.0, 1.0, 0.3,
            0.0, 0.2, 0.3, 0.5,
        );
        for alpha in [0.1, 0.3, 1.0] {
            let sp = SigmaPoints::<4>::new(alpha).unwrap();
            let points = sp.points(&x, &p, &StateSpace::euclidean()).unwrap();
            assert_eq!(points.len(), 9);
            let (mean, cov) = reconstruct(&sp, &points);
            assert_abs_diff_eq!(mean, x, epsilon = 1e-9);
            assert_abs_diff_eq!(cov, p, epsilon = 1e-9);
        }
    }

    #[test]
    fn invalid_parameters() {
        assert!(SigmaPoints::<3>::new(0.0).is_err());
        assert!(SigmaPoints::<3>::new(-1.0).is_err());
        assert!(SigmaPoints::<3>::new(f64::NAN).is_err());
        // kappa = -N gives a zero scaling
        assert!(SigmaPoints::<3>::with_parameters(1.0, 2.0, -3.0).is_err());

        let sp = SigmaPoints::<4>::new(1.0).unwrap();
        let not_pd = -Matrix4::<f64>::identity();
        assert_eq!(
            sp.points(&Vector4::zeros(), &not_pd, &StateSpace::euclidean()),
            Err(FilterError::NonPositiveDefinite {
                action: "sigma points scaling"
            })
        );
    }
}
