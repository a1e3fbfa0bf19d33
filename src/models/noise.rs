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

use crate::errors::{FilterError, InvalidParameterSnafu, UnsupportedDimensionSnafu};
use crate::filter::kinematic::{continuous_white_noise, discrete_white_noise};
use crate::linalg::SMatrix;
use serde_derive::{Deserialize, Serialize};
use snafu::ensure;
use std::fmt;
use typed_builder::TypedBuilder;

/// White noise driving the highest order component of a kinematic block.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum NoiseModel {
    /// Continuous white noise of the provided spectral density, integrated over the time step.
    Continuous { spectral_density: f64 },
    /// Discrete white noise of the provided variance, held constant over the time step.
    Discrete { variance: f64 },
}

impl NoiseModel {
    pub fn validate(&self) -> Result<(), FilterError> {
        let (param, value) = match *self {
            Self::Continuous { spectral_density } => ("spectral density", spectral_density),
            Self::Discrete { variance } => ("process noise variance", variance),
        };
        ensure!(
            value.is_finite() && value >= 0.0,
            InvalidParameterSnafu { param, value }
        );
        Ok(())
    }

    /// Noise covariance of a block of D components over `dt`.
    pub fn matrix<const D: usize>(&self, dt: f64) -> SMatrix<f64, D, D> {
        match *self {
            Self::Continuous { spectral_density } => continuous_white_noise::<D>(dt, spectral_density),
            Self::Discrete { variance } => discrete_white_noise::<D>(dt, variance),
        }
    }

    /// Adds the noise covariance of a block of `len` components starting at `start`.
    pub(crate) fn place<const N: usize>(
        &self,
        q: &mut SMatrix<f64, N, N>,
        start: usize,
        len: usize,
        dt: f64,
    ) -> Result<(), FilterError> {
        match len {
            1 => q
                .fixed_view_mut::<1, 1>(start, start)
                .copy_from(&self.matrix::<1>(dt)),
            2 => q
                .fixed_view_mut::<2, 2>(start, start)
                .copy_from(&self.matrix::<2>(dt)),
            3 => q
                .fixed_view_mut::<3, 3>(start, start)
                .copy_from(&self.matrix::<3>(dt)),
            _ => return UnsupportedDimensionSnafu { dim: len }.fail(),
        }
        Ok(())
    }
}

impl fmt::Display for NoiseModel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Continuous { spectral_density } => write!(f, "continuous (q = {spectral_density})"),
            Self::Discrete { variance } => write!(f, "discrete (variance = {variance})"),
        }
    }
}

/// Process noise of each block of a model: both position axes, the angle and the direction bias.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[builder(doc)]
pub struct ProcessNoise {
    pub position: NoiseModel,
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub angle: Option<NoiseModel>,
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub angle_r: Option<NoiseModel>,
}

impl ProcessNoise {
    /// No process noise at all, as used for the standing pseudo-measurement.
    pub const fn none() -> Self {
        Self {
            position: NoiseModel::Discrete { variance: 0.0 },
            angle: Some(NoiseModel::Discrete { variance: 0.0 }),
            angle_r: Some(NoiseModel::Discrete { variance: 0.0 }),
        }
    }
}

impl Default for ProcessNoise {
    fn default() -> Self {
        Self {
            position: NoiseModel::Continuous {
                spectral_density: 4.0,
            },
            angle: Some(NoiseModel::Discrete {
                variance: 0.001_f64.to_radians().powi(2),
            }),
            angle_r: Some(NoiseModel::Discrete {
                variance: 0.001_f64.to_radians().powi(2),
            }),
        }
    }
}
