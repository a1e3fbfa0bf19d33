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

use super::checks::{check_fading_memory, check_gate, check_x_p};
use super::{make_update_info, FilterStage, SigmaPoints, StateSpace, UpdateInfo};
use crate::errors::{
    FilterError, NotInitializedSnafu, SingularInnovationSnafu, UpdateBeforePredictSnafu,
};
use crate::linalg::{SMatrix, SVector};
use crate::utils::symmetrize;
use snafu::{ensure, OptionExt};

/// Unscented Kalman filter of a state of dimension N.
///
/// The process and measurement functions are provided at each call, so a single filter can be driven
/// by several measurement models of different dimensions. Angle components of the state are handled
/// by the [`StateSpace`], measurement functions are expected to unwrap their angle outputs around the
/// measured value so the weighted mean of the measurement sigma points is meaningful.
#[derive(Clone, Debug)]
pub struct Ukf<const N: usize> {
    sigma_points: SigmaPoints<N>,
    space: StateSpace<N>,
    /// State mean
    x: SVector<f64, N>,
    /// State covariance
    p: SMatrix<f64, N, N>,
    stage: FilterStage,
}

impl<const N: usize> Ukf<N> {
    /// Creates an uninitialized filter, which must be reset before use.
    pub fn new(sigma_points: SigmaPoints<N>, space: StateSpace<N>) -> Self {
        Self {
            sigma_points,
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

    pub fn sigma_points(&self) -> &SigmaPoints<N> {
        &self.sigma_points
    }

    /// Initializes (or reinitializes) the state and its covariance, discarding any history.
    pub fn reset(&mut self, x: SVector<f64, N>, p: SMatrix<f64, N, N>) -> Result<(), FilterError> {
        let x = self.space.normalize(x);
        check_x_p("UKF reset", &x, &p)?;
        self.x = x;
        self.p = p;
        self.stage = FilterStage::Reset;
        Ok(())
    }

    /// Propagates the state through `f`, adds the process noise `q`.
    ///
    /// If `fading_memory_alpha` is greater than one, the propagated covariance is multiplied by its
    /// square before adding the process noise.
    pub fn predict<F>(
        &mut self,
        f: F,
        q: &SMatrix<f64, N, N>,
        fading_memory_alpha: f64,
    ) -> Result<(), FilterError>
    where
        F: Fn(&SVector<f64, N>) -> SVector<f64, N>,
    {
        ensure!(
            self.stage.is_initialized(),
            NotInitializedSnafu {
                action: "UKF predict"
            }
        );
        check_fading_memory(fading_memory_alpha)?;

        let sigmas_f = self
            .sigma_points
            .points(&self.x, &self.p, &self.space)?
            .iter()
            .map(|point| self.space.normalize(f(point)))
            .collect::<Vec<_>>();

        let x = self.space.mean(&sigmas_f, self.sigma_points.wm());

        let mut covar = SMatrix::<f64, N, N>::zeros();
        for (point, wc) in sigmas_f.iter().zip(self.sigma_points.wc()) {
            let v = self.space.subtract(point, &x);
            covar += *wc * v * v.transpose();
        }

        let p = if fading_memory_alpha == 1.0 {
            covar + q
        } else {
            fading_memory_alpha.powi(2) * covar + q
        };
        let p = symmetrize(&p);

        check_x_p("UKF predict", &x, &p)?;
        self.x = x;
        self.p = p;
        self.stage = FilterStage::Predicted;
        Ok(())
    }

    /// Updates the state with the measurement `z` of covariance `r`, predicted by `h`.
    ///
    /// `residual_z` computes the difference between two measurements (e.g. wrapping angles). If the
    /// update is gated, the state and covariance are left untouched.
    #[allow(clippy::too_many_arguments)]
    pub fn update<const M: usize, H, RZ>(
        &mut self,
        h: H,
        r: &SMatrix<f64, M, M>,
        z: &SVector<f64, M>,
        residual_z: RZ,
        gate: Option<f64>,
        normalized_innovation: bool,
        likelihood: bool,
    ) -> Result<UpdateInfo<M>, FilterError>
    where
        H: Fn(&SVector<f64, N>) -> SVector<f64, M>,
        RZ: Fn(&SVector<f64, M>, &SVector<f64, M>) -> SVector<f64, M>,
    {
        ensure!(
            self.stage.is_initialized(),
            NotInitializedSnafu {
                action: "UKF update"
            }
        );
        ensure!(self.stage.can_update(), UpdateBeforePredictSnafu);
        check_gate(gate)?;

        let sigmas_f = self.sigma_points.points(&self.x, &self.p, &self.space)?;
        let sigmas_h = sigmas_f.iter().map(&h).collect::<Vec<_>>();

        // Predicted measurement and innovation covariance
        let mut x_z = SVector::<f64, M>::zeros();
        for (point, wm) in sigmas_h.iter().zip(self.sigma_points.wm()) {
            x_z += *wm * point;
        }

        let mut s = *r;
        let mut p_xz = SMatrix::<f64, N, M>::zeros();
        for ((point_f, point_h), wc) in sigmas_f
            .iter()
            .zip(sigmas_h.iter())
            .zip(self.sigma_points.wc())
        {
            let dz = point_h - x_z;
            let dx = self.space.subtract(point_f, &self.x);
            s += *wc * dz * dz.transpose();
            p_xz += *wc * dx * dz.transpose();
        }
        let s = symmetrize(&s);

        let s_inv = s.try_inverse().context(SingularInnovationSnafu {
            action: "UKF update",
        })?;

        let residual = residual_z(z, &x_z);

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

        let gain = p_xz * s_inv;
        let x = self.space.add(&self.x, &(gain * residual));
        let p = symmetrize(&(self.p - p_xz * gain.transpose()));

        check_x_p("UKF update", &x, &p)?;
        self.x = x;
        self.p = p;
        self.stage = FilterStage::Updated;
        Ok(info)
    }
}
