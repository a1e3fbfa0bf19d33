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

use crate::time::Epoch;
use snafu::prelude::*;

/// Errors of the estimation engines and of the measurement fusion.
///
/// None of these are recoverable from within the filter: they either signal a caller contract violation
/// (e.g. non increasing measurement times) or a numerical degeneracy of the recursion. The filter state
/// must be considered lost once any of these is returned.
#[derive(Debug, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum FilterError {
    #[snafu(display("measurement time does not increase; from {from} to {to}"))]
    NonIncreasingTime { from: Epoch, to: Epoch },
    #[snafu(display("filter must be reset before {action}"))]
    NotInitialized { action: &'static str },
    #[snafu(display("update requested before any prediction following a reset"))]
    UpdateBeforePredict,
    #[snafu(display("time step must be finite and non negative, got {dt} s"))]
    InvalidDt { dt: f64 },
    #[snafu(display("{what} variance must be finite and positive, got {value}"))]
    InvalidVariance { what: &'static str, value: f64 },
    #[snafu(display("invalid {param}: {value}"))]
    InvalidParameter { param: &'static str, value: f64 },
    #[snafu(display("{action} produced non finite values"))]
    NonFinite { action: &'static str },
    #[snafu(display("{action} produced a matrix which is not positive definite"))]
    NonPositiveDefinite { action: &'static str },
    #[snafu(display("{action}: innovation covariance is singular"))]
    SingularInnovation { action: &'static str },
    #[snafu(display("H infinity condition does not hold: P^-1 - theta I + H^T R^-1 H is not positive definite"))]
    HInfinityCondition,
    #[snafu(display("{kind} noise not configured"))]
    NoiseNotConfigured { kind: &'static str },
    #[snafu(display("a prediction cannot be requested with a usable position, use an update"))]
    PositionInPrediction,
    #[snafu(display("linear fit of the measurement queue is singular"))]
    SingularFit,
    #[snafu(display("unsupported stacked measurement dimension {dim}"))]
    UnsupportedDimension { dim: usize },
}
