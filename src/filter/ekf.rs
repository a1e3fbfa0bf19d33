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

use super::checks::{check_fading_memory, check_gate, check_positive_definite, check_x_p};
use super::{make_update_info, FilterStage, StateSpace, UpdateInfo};
use crate::errors::{
    FilterError, HInfinityConditionSnafu, InvalidParameterSnafu, NotInitializedSnafu,
    SingularInnovationSnafu, UpdateBeforePredictSnafu,
};
use crate::linalg::{SMatrix, SVector};
use crate::utils::symmetrize;
use snafu::{ensure, OptionExt};

/// Extended Kalman filter of a state of dimension N.
///
/// The covariance is propagated with the Jacobian of the process function evaluated at the prior
/// state, and updated in Joseph form. An optional H infinity parameter theta replaces the Kalman gain
/// by the H infinity gain, which bounds the worst case estimation error instead of minimizing its
/// variance.
#[derive(Clone, Debug)]
pub struct Ekf<const N: usize> {
    space: StateSpace<N>,
    /// State mean
    x: SVector<f64, N>,
    /// State covariance
    p: SMatrix<f64, N, N>,
    stage: FilterStage,
}

impl<const N: usize> Ekf<N> {
    /// Creates an uninitialized filter, which must be reset before use.
    pub fn new(space: StateSpace<N>) -> Self {
        Self {
            space,
            x: SVector::zeros(),
            p: SMatrix::zeros(),
            stage: FilterStage::Uninitialized,
        }
    }

    pub fn x(&self) -> &SVector<f64, N> {
        &self.x
    }

    pub fn p(&self) -> &SMatrix<f64, N, N> {
        &self.p
    }

    pub fn stage(&self) -> FilterStage {
        self.stage
    }

    /// Initializes (or reinitializes) the state and its covariance, discarding any history.
    pub fn reset(&mut self, x: SVector<f64, N>, p: SMatrix<f64, N, N>) -> Result<(), FilterError> {
        let x = self.space.normalize(x);
        check_x_p("EKF reset", &x, &p)?;
        self.x = x;
        self.p = p;
        self.stage = FilterStage::Reset;
        Ok(())
    }

    /// Propagates the state through `f` and the covariance through its Jacobian `fj`.
    pub fn predict<F, FJ>(
        &mut self,
        f: F,
        fj: FJ,
        q: &SMatrix<f64, N, N>,
        fading_memory_alpha: f64,
    ) -> Result<(), FilterError>
    where
        F: Fn(&SVector<f64, N>) -> SVector<f64, N>,
        FJ: Fn(&SVector<f64, N>) -> SMatrix<f64, N, N>,
    {
        ensure!(
            self.stage.is_initialized(),
            NotInitializedSnafu {
                action: "EKF predict"
            }
        );
        check_fading_memory(fading_memory_alpha)?;

        let fjx = fj(&self.x);
        let x = self.space.normalize(f(&self.x));
        let covar = fjx * self.p * fjx.transpose();

        let p = if fading_memory_alpha == 1.0 {
            covar + q
        } else {
            fading_memory_alpha.powi(2) * covar + q
        };
        let p = symmetrize(&p);

        check_x_p("EKF predict", &x, &p)?;
        self.x = x;
        self.p = p;
        self.stage = FilterStage::Predicted;
        Ok(())
    }

    /// Updates the state with the measurement `z` of covariance `r`, predicted by `h` of Jacobian `hj`.
    ///
    /// If `theta` is provided, the H infinity gain is used instead of the Kalman gain. If the update is
    /// gated, the state and covariance are left untouched.
    #[allow(clippy::too_many_arguments)]
    pub fn update<const M: usize, H, HJ, RZ>(
        &mut self,
        h: H,
        hj: HJ,
        r: &SMatrix<f64, M, M>,
        z: &SVector<f64, M>,
        residual_z: RZ,
        theta: Option<f64>,
        gate: Option<f64>,
        normalized_innovation: bool,
        likelihood: bool,
    ) -> Result<UpdateInfo<M>, FilterError>
    where
        H: Fn(&SVector<f64, N>) -> SVector<f64, M>,
        HJ: Fn(&SVector<f64, N>) -> SMatrix<f64, M, N>,
        RZ: Fn(&SVector<f64, M>, &SVector<f64, M>) -> SVector<f64, M>,
    {
        ensure!(
            self.stage.is_initialized(),
            NotInitializedSnafu {
                action: "EKF update"
            }
        );
        ensure!(self.stage.can_update(), UpdateBeforePredictSnafu);
        check_gate(gate)?;

        let hjx = hj(&self.x);
        let p_hjxt = self.p * hjx.transpose();

        // Compute the innovation matrix (S_k)
        let s = symmetrize(&(hjx * p_hjxt + r));
        let s_inv = s.try_inverse().context(SingularInnovationSnafu {
            action: "EKF update",
        })?;

        let residual = residual_z(z, &h(&self.x));

        let info = make_update_info(
            &residual,
            &s,
            &s_inv,
            gate,
            normalized_innovation,
            likelihood,
        )?;

        if info.gated {
            return Ok(info);
        }

        let gain = match theta {
            None => p_hjxt * s_inv,
            Some(theta) => h_infinity_gain(theta, &self.p, &hjx, r)?,
        };

        let x = self.space.add(&self.x, &(gain * residual));

        // Compute covariance (Joseph update)
        let i_kh = SMatrix::<f64, N, N>::identity() - gain * hjx;
        let p = symmetrize(&(i_kh * self.p * i_kh.transpose() + gain * r * gain.transpose()));

        check_x_p("EKF update", &x, &p)?;
        self.x = x;
        self.p = p;
        self.stage = FilterStage::Updated;
        Ok(info)
    }
}

/// H infinity gain K = P (I - theta P + H^T R^-1 H P)^-1 H^T R^-1.
///
/// Requires P^-1 - theta I + H^T R^-1 H to be positive definite. With theta = 0 this is the Kalman gain.
pub fn h_infinity_gain<const N: usize, const M: usize>(
    theta: f64,
    p: &SMatrix<f64, N, N>,
    h: &SMatrix<f64, M, N>,
    r: &SMatrix<f64, M, M>,
) -> Result<SMatrix<f64, N, M>, FilterError> {
    ensure!(
        theta.is_finite() && theta >= 0.0,
        InvalidParameterSnafu {
            param: "H infinity theta",
            value: theta
        }
    );

    let identity = SMatrix::<f64, N, N>::identity();
    let r_inv = r.try_inverse().context(SingularInnovationSnafu {
        action: "H infinity measurement noise",
    })?;
    let ht_ri = h.transpose() * r_inv;

    let p_inv = p.try_inverse().context(HInfinityConditionSnafu)?;
    let condition = symmetrize(&(p_inv - theta * identity + ht_ri * h));
    if check_positive_definite("H infinity condition", &condition).is_err() {
        return HInfinityConditionSnafu.fail();
    }

    let inner = (identity - theta * p + ht_ri * h * p)
        .try_inverse()
        .context(HInfinityConditionSnafu)?;
    Ok(p * inner * ht_ri)
}

#[cfg(test)]
mod ut_ekf {
    use super::*;
    use crate::filter::kinematic::{continuous_white_noise, kinematic_transition};
    use crate::linalg::{Matrix1, Matrix1x2, Matrix2, Matrix2x1, Vector1, Vector2};
    use approx::assert_abs_diff_eq;

    fn h(x: &Vector2<f64>) -> Vector1<f64> {
        Vector1::new(x[0])
    }

    fn hj(_x: &Vector2<f64>) -> Matrix1x2<f64> {
        Matrix1x2::new(1.0, 0.0)
    }

    fn sub(a: &Vector1<f64>, b: &Vector1<f64>) -> Vector1<f64> {
        a - b
    }

    #[test]
    fn linear_predict() {
        let dt = 1.5;
        let f = kinematic_transition::<2>(dt);
        let mut ekf = Ekf::new(StateSpace::euclidean());
        ekf.reset(Vector2::new(0.0, 3.0), Matrix2::identity()).unwrap();
        let q = continuous_white_noise::<2>(dt, 0.1);
        ekf.predict(|x| f * x, |_| f, &q, 1.0).unwrap();
        assert_abs_diff_eq!(ekf.x(), &Vector2::new(4.5, 3.0), epsilon = 1e-12);
        let expected = f * Matrix2::identity() * f.transpose() + q;
        assert_abs_diff_eq!(ekf.p(), &expected, epsilon = 1e-12);
    }

    #[test]
    fn update_matches_closed_form() {
        let mut ekf = Ekf::new(StateSpace::euclidean());
        let p0 = Matrix2::new(4.0, 1.0, 1.0, 2.0);
        ekf.reset(Vector2::new(1.0, 0.0), p0).unwrap();
        ekf.predict(|x| *x, |_| Matrix2::identity(), &Matrix2::zeros(), 1.0)
            .unwrap();
        let r = 1.0;
        let info = ekf
            .update(h, hj, &Matrix1::new(r), &Vector1::new(3.0), sub, None, None, true, false)
            .unwrap();
        // S = 4 + 1, K = P H^T / S
        let k = Matrix2x1::new(4.0 / 5.0, 1.0 / 5.0);
        assert_abs_diff_eq!(info.normalized_innovation_squared.unwrap(), 4.0 / 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(ekf.x(), &(Vector2::new(1.0, 0.0) + k * 2.0), epsilon = 1e-12);
        let expected_p = p0 - k * Matrix1x2::new(1.0, 0.0) * p0;
        assert_abs_diff_eq!(ekf.p(), &expected_p, epsilon = 1e-12);
    }

    #[test]
    fn h_infinity_zero_theta_is_kalman() {
        let p = Matrix2::new(4.0, 1.0, 1.0, 2.0);
        let hjx = Matrix1x2::new(1.0, 0.0);
        let r = Matrix1::new(0.5);
        let s = hjx * p * hjx.transpose() + r;
        let kalman = p * hjx.transpose() * s.try_inverse().unwrap();
        let hinf = h_infinity_gain(0.0, &p, &hjx, &r).unwrap();
        assert_abs_diff_eq!(hinf, kalman, epsilon = 1e-12);

        // A large theta breaks the positive definiteness condition
        assert_eq!(
            h_infinity_gain(10.0, &p, &hjx, &r),
            Err(FilterError::HInfinityCondition)
        );
        assert!(h_infinity_gain(-1.0, &p, &hjx, &r).is_err());
    }

    #[test]
    fn gated_update_is_bit_identical() {
        let mut ekf = Ekf::new(StateSpace::euclidean());
        ekf.reset(Vector2::new(1.0, 0.0), Matrix2::identity()).unwrap();
        ekf.predict(|x| *x, |_| Matrix2::identity(), &Matrix2::zeros(), 1.0)
            .unwrap();
        let (x, p) = (*ekf.x(), *ekf.p());
        let info = ekf
            .update(h, hj, &Matrix1::new(1.0), &Vector1::new(50.0), sub, None, Some(5.0), false, false)
            .unwrap();
        assert!(info.gated);
        assert_eq!(ekf.x(), &x);
        assert_eq!(ekf.p(), &p);
    }
}
